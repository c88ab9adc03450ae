//! # checkout-api
//!
//! HTTP API layer for paneflow-rs.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - Checkout endpoints driving the step state machine
//! - Admin endpoints for the pane overview editor
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | POST | `/orders` | Create order |
//! | GET | `/orders/{order_id}` | Get order |
//! | GET | `/checkout/{order_id}` | Form of the current step |
//! | GET | `/checkout/{order_id}/{step}` | Form of a step |
//! | POST | `/checkout/{order_id}/{step}` | Submit a step |
//! | GET | `/admin/flows` | List flows |
//! | GET | `/admin/flows/{flow_id}` | Pane overview |
//! | PUT | `/admin/flows/{flow_id}` | Save pane overview |
//! | POST | `/admin/flows/{flow_id}/panes/{pane_id}/{op}` | Row edit/update/cancel |

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
