//! # paneflow
//!
//! Pane-driven multi-step checkout server.
//!
//! ## Usage
//!
//! ```bash
//! # Optional: explicit catalog (defaults to config/checkout.toml)
//! export CHECKOUT_CONFIG=config/checkout.toml
//!
//! # Run the server
//! paneflow
//! ```

use checkout_api::{routes, state::AppConfig, state::AppState};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let is_prod = AppConfig::from_env().is_production();

    // Initialize logging, JSON lines in production
    tracing_subscriber::registry()
        .with((!is_prod).then(fmt::layer))
        .with(is_prod.then(|| fmt::layer().json()))
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Print banner
    print_banner();

    // Initialize application state
    let state = AppState::new()?;

    let addr = state.config.socket_addr()?;

    info!("Environment: {}", state.config.environment);
    info!("Orders loaded: {}", state.orders.len());
    info!(
        "Flow types: {:?}",
        state
            .flow_types
            .definitions()
            .map(|definition| definition.id.as_str())
            .collect::<Vec<_>>()
    );

    // Create router
    let app = routes::create_router(state);

    // Start server
    info!("Paneflow starting on http://{}", addr);

    if !is_prod {
        info!("Health: http://{}/health", addr);
        info!("Checkout: GET http://{}/checkout/{{order_id}}", addr);
        info!("Flow admin: GET http://{}/admin/flows", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
  paneflow
  ━━━━━━━━━━━━━━━━━━━━━━━
  Multi-step checkout engine
  Version: {}

"#,
        env!("CARGO_PKG_VERSION")
    );
}
