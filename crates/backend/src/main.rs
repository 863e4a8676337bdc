//! Steam Play Together proxy server

use playtogether_backend::{config::Config, create_app};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Reads .env before anything looks at the environment
    let config = Config::from_env();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "playtogether_backend=debug,playtogether_core=info,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if config.production {
        tracing::info!("Production mode: auth cookies are secure-only");
    }
    tracing::info!(app_url = %config.app_url, "Steam sign-in returns to {}", config.auth_return_url());

    let addr = config.bind_address.clone();
    let app = create_app(config);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind server address");
    axum::serve(listener, app).await.expect("Server error");
}
