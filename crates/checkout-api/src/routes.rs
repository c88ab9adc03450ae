//! # Routes
//!
//! Axum router configuration for the checkout and flow admin API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - Orders:
///   - POST /orders - Create an order
///   - GET  /orders/{order_id} - Get an order
///
/// - Checkout:
///   - GET  /checkout/{order_id} - Form of the current step
///   - GET  /checkout/{order_id}/{step} - Form of a step
///   - POST /checkout/{order_id}/{step} - Submit a step (next/previous)
///
/// - Flow admin:
///   - GET  /admin/flows - List flows
///   - GET  /admin/flows/{flow_id} - Pane overview with editor state
///   - PUT  /admin/flows/{flow_id} - Save the pane overview
///   - POST /admin/flows/{flow_id}/panes/{pane_id}/{op} - Row edit/update/cancel
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let checkout_routes = Router::new()
        .route("/{order_id}", get(handlers::get_checkout))
        .route(
            "/{order_id}/{step}",
            get(handlers::get_checkout_step).post(handlers::post_checkout_step),
        );

    let admin_routes = Router::new()
        .route("/flows", get(handlers::list_flows))
        .route(
            "/flows/{flow_id}",
            get(handlers::get_flow_overview).put(handlers::put_flow),
        )
        .route(
            "/flows/{flow_id}/panes/{pane_id}/{op}",
            post(handlers::post_pane_op),
        );

    Router::new()
        // Health check at root
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        // Orders
        .route("/orders", post(handlers::create_order))
        .route("/orders/{order_id}", get(handlers::get_order))
        .nest("/checkout", checkout_routes)
        .nest("/admin", admin_routes)
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        // State
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppConfig;
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use checkout_panes::CheckoutCatalog;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const CATALOG: &str = r#"
[[accounts]]
uid = 4
name = "ada"
email = "ada@example.com"
password = "secret"

[[orders]]
id = "1001"
order_type = "default"
"#;

    fn test_state() -> AppState {
        let config = AppConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            environment: "test".to_string(),
            checkout_config: None,
        };
        let catalog = CheckoutCatalog::from_toml(CATALOG).unwrap();
        AppState::from_catalog(config, catalog).unwrap()
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    fn summary<'a>(overview: &'a Value, pane_id: &str) -> &'a Value {
        overview["overview"]["regions"]
            .as_object()
            .unwrap()
            .values()
            .flat_map(|region| region["rows"].as_array().unwrap())
            .find(|row| row["pane_id"] == pane_id)
            .map(|row| &row["summary"])
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = create_router(test_state());
        let (status, body) = send(&app, Method::GET, "/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "paneflow");
    }

    #[tokio::test]
    async fn test_checkout_starts_on_login_and_assigns_flow() {
        let state = test_state();
        let app = create_router(state.clone());

        let (status, body) = send(&app, Method::GET, "/checkout/1001", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["type"], "render");
        assert_eq!(body["step_id"], "login");
        assert_eq!(
            state.orders.get("1001").unwrap().checkout_flow.as_deref(),
            Some("default")
        );
    }

    #[tokio::test]
    async fn test_guest_login_advances_to_review() {
        let state = test_state();
        let app = create_router(state.clone());

        let (status, body) = send(
            &app,
            Method::POST,
            "/checkout/1001/login",
            Some(json!({ "op": "next", "values": { "login": { "email": "guest@example.com" } } })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["type"], "redirect");
        assert_eq!(body["redirect"]["step_id"], "review");

        let order = state.orders.get("1001").unwrap();
        assert_eq!(order.email(), Some("guest@example.com"));
        assert_eq!(order.checkout_step.as_deref(), Some("review"));

        let (_, body) = send(&app, Method::GET, "/checkout/1001", None).await;
        assert_eq!(body["step_id"], "review");
    }

    #[tokio::test]
    async fn test_offsite_payment_ignores_navigation_ops() {
        let state = test_state();
        let app = create_router(state.clone());

        for op in ["next", "previous"] {
            let (status, body) = send(
                &app,
                Method::POST,
                "/checkout/1001/offsite_payment",
                Some(json!({ "op": op, "values": {} })),
            )
            .await;

            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["type"], "render");
            assert_eq!(body["step_id"], "offsite_payment");
            assert!(body.get("redirect").is_none());
        }

        assert_eq!(state.orders.get("1001").unwrap().checkout_step, None);
    }

    #[tokio::test]
    async fn test_account_login_sets_owner() {
        let state = test_state();
        let app = create_router(state.clone());

        let (_, body) = send(
            &app,
            Method::POST,
            "/checkout/1001/login",
            Some(json!({ "op": "next", "values": { "login": { "name": "ada", "pass": "secret" } } })),
        )
        .await;

        assert_eq!(body["type"], "redirect");
        let order = state.orders.get("1001").unwrap();
        assert_eq!(order.owner().account().map(|a| a.uid), Some(4));
    }

    #[tokio::test]
    async fn test_invalid_email_rerenders_with_errors() {
        let state = test_state();
        let app = create_router(state.clone());

        let (status, body) = send(
            &app,
            Method::POST,
            "/checkout/1001/login",
            Some(json!({ "op": "next", "values": { "login": { "email": "nope" } } })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["type"], "render");
        assert_eq!(body["errors"]["login][email"], "The email address nope is not valid.");
        assert!(state.orders.get("1001").unwrap().checkout_step.is_none());
    }

    #[tokio::test]
    async fn test_unknown_step_redirects_to_resolved_step() {
        let app = create_router(test_state());

        let (status, body) = send(&app, Method::GET, "/checkout/1001/bogus", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["type"], "redirect");
        assert_eq!(body["redirect"]["step_id"], "login");
    }

    #[tokio::test]
    async fn test_missing_order_is_not_found() {
        let app = create_router(test_state());

        let (status, body) = send(&app, Method::GET, "/checkout/404", None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], 404);
    }

    #[tokio::test]
    async fn test_create_order_then_checkout() {
        let app = create_router(test_state());

        let (status, order) = send(
            &app,
            Method::POST,
            "/orders",
            Some(json!({ "email": "new@example.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(order["checkout_flow"], "default");

        let uri = format!("/checkout/{}", order["id"].as_str().unwrap());
        let (status, body) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["step_id"], "login");
    }

    #[tokio::test]
    async fn test_list_flows() {
        let app = create_router(test_state());

        let (status, body) = send(&app, Method::GET, "/admin/flows", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["id"], "default");
        assert_eq!(body[0]["plugin"], "multistep_default");
    }

    #[tokio::test]
    async fn test_flow_overview_regions() {
        let app = create_router(test_state());

        let (status, body) = send(&app, Method::GET, "/admin/flows/default", None).await;

        assert_eq!(status, StatusCode::OK);
        let regions = &body["overview"]["regions"];
        assert_eq!(regions["login"]["rows"][0]["pane_id"], "login");
        assert_eq!(regions["order_information"]["status"], "empty");
        assert_eq!(regions["_disabled"]["message"], "No pane is hidden.");
        assert_eq!(body["table"][0]["type"], "region");
        assert_eq!(body["values"]["panes"]["login"]["step"], "login");
    }

    #[tokio::test]
    async fn test_edit_update_save_round_trip() {
        let state = test_state();
        let app = create_router(state.clone());

        let (status, body) = send(
            &app,
            Method::POST,
            "/admin/flows/default/panes/login/edit",
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["overview"]["editor"]["editing"], "login");

        let (_, body) = send(
            &app,
            Method::POST,
            "/admin/flows/default/panes/login/update",
            Some(json!({ "values": { "panes": { "login": { "settings": { "allow_guest_checkout": false } } } } })),
        )
        .await;
        assert_eq!(body["overview"]["editor"]["pending_update"], "login");
        assert_eq!(summary(&body, "login")[0], "Guest checkout: Not allowed");

        let values = body["values"].clone();
        let (status, body) = send(
            &app,
            Method::PUT,
            "/admin/flows/default",
            Some(json!({ "values": values })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["overview"]["editor"]["pending_update"].is_null());
        assert_eq!(summary(&body, "login")[0], "Guest checkout: Not allowed");
        assert!(state.editor_sessions.is_empty());

        let (_, body) = send(&app, Method::GET, "/admin/flows/default", None).await;
        assert_eq!(summary(&body, "login")[0], "Guest checkout: Not allowed");
    }

    #[tokio::test]
    async fn test_failed_update_keeps_row_open() {
        let state = test_state();
        let app = create_router(state.clone());

        send(
            &app,
            Method::POST,
            "/admin/flows/default/panes/complete_message/edit",
            Some(json!({})),
        )
        .await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/admin/flows/default/panes/complete_message/update",
            Some(json!({ "values": { "panes": { "complete_message": { "settings": { "message": "" } } } } })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["errors"]["panes][complete_message][settings][message"].is_string());
        assert_eq!(body["overview"]["editor"]["editing"], "complete_message");
        assert_eq!(
            state.editor_session("default").editing.as_deref(),
            Some("complete_message")
        );
    }

    #[tokio::test]
    async fn test_disabling_a_pane_hides_its_step() {
        let state = test_state();
        let app = create_router(state.clone());

        let (_, body) = send(&app, Method::GET, "/admin/flows/default", None).await;
        let mut values = body["values"].clone();
        values["panes"]["review"]["step"] = json!("_disabled");

        let (status, body) = send(
            &app,
            Method::PUT,
            "/admin/flows/default",
            Some(json!({ "values": values })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["overview"]["regions"]["_disabled"]["rows"][0]["pane_id"], "review");

        send(
            &app,
            Method::POST,
            "/checkout/1001/login",
            Some(json!({ "op": "next", "values": { "login": { "email": "guest@example.com" } } })),
        )
        .await;
        let order = state.orders.get("1001").unwrap();
        assert_eq!(order.checkout_step.as_deref(), Some("offsite_payment"));
    }

    #[tokio::test]
    async fn test_bad_editor_requests() {
        let app = create_router(test_state());

        let (status, _) = send(
            &app,
            Method::POST,
            "/admin/flows/default/panes/login/explode",
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            Method::POST,
            "/admin/flows/default/panes/missing/edit",
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, Method::GET, "/admin/flows/missing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
