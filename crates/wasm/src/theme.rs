//! Theme applied to the document root

use playtogether_core::ThemeEnvironment;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{MediaQueryList, MediaQueryListEvent};

const DARK_CLASS: &str = "dark";
const DARK_QUERY: &str = "(prefers-color-scheme: dark)";

fn set_root_dark(dark: bool) {
    let root = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.document_element());
    if let Some(root) = root {
        let _ = root.class_list().toggle_with_force(DARK_CLASS, dark);
    }
}

fn dark_query() -> Option<MediaQueryList> {
    web_sys::window()?.match_media(DARK_QUERY).ok().flatten()
}

/// Toggles the `dark` class on `<html>` and follows the OS preference while
/// the System theme is selected
#[derive(Default)]
pub struct DomTheme {
    listener: Option<(MediaQueryList, Closure<dyn FnMut(MediaQueryListEvent)>)>,
}

impl ThemeEnvironment for DomTheme {
    fn set_dark(&mut self, dark: bool) {
        set_root_dark(dark);
    }

    fn system_prefers_dark(&self) -> bool {
        dark_query().is_some_and(|q| q.matches())
    }

    fn watch_system_preference(&mut self) {
        if self.listener.is_some() {
            return;
        }
        let Some(query) = dark_query() else {
            return;
        };
        let callback = Closure::<dyn FnMut(MediaQueryListEvent)>::new(|event: MediaQueryListEvent| {
            set_root_dark(event.matches());
        });
        if query
            .add_event_listener_with_callback("change", callback.as_ref().unchecked_ref())
            .is_ok()
        {
            self.listener = Some((query, callback));
        }
    }

    fn unwatch_system_preference(&mut self) {
        if let Some((query, callback)) = self.listener.take() {
            let _ = query.remove_event_listener_with_callback("change", callback.as_ref().unchecked_ref());
        }
    }
}

impl Drop for DomTheme {
    fn drop(&mut self) {
        self.unwatch_system_preference();
    }
}
