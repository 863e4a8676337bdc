//! Steam Play Together browser bindings
//!
//! Wires the core controllers to the browser: `localStorage` for snapshots,
//! fetch against the backend proxy for Steam data, and the document root for
//! the theme. The page drives everything through [`app::PlayTogetherApp`].

#![cfg(target_arch = "wasm32")]

mod app;
mod http_client;
mod storage;
mod theme;

pub use app::PlayTogetherApp;

use wasm_bindgen::prelude::*;

#[wasm_bindgen(start)]
pub fn main() {
    // Set up panic hook for better error messages
    console_error_panic_hook::set_once();

    // Initialize tracing for WASM
    tracing_wasm::set_as_global_default();
}
