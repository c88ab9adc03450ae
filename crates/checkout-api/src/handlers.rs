//! # Request Handlers
//!
//! Axum request handlers for the checkout and flow admin API.
//! The checkout core is synchronous; handlers wrap one core call each and
//! convert `CheckoutError` into JSON error responses.

use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use checkout_core::{
    build_overview, multistep_submit, process_form, validate_row, BoxedFlow, CheckoutError,
    CheckoutFlow, CheckoutResult, EditorOp, FlowConfig, FlowRepository, FormElement, FormOutcome,
    FormState, Order, PaneFlow, PaneOverview, Redirect, Settings, TableRow,
};
use checkout_panes::DEFAULT_ORDER_TYPE;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// ID of the placeholder order the flow editor renders against
const PREVIEW_ORDER_ID: &str = "preview";

// =============================================================================
// Request/Response Types
// =============================================================================

/// Create order request
#[derive(Debug, Default, Deserialize)]
pub struct CreateOrderRequest {
    /// Order type (defaults to "default")
    #[serde(default)]
    pub order_type: Option<String>,
    /// Contact email (optional)
    #[serde(default)]
    pub email: Option<String>,
}

/// Checkout form submission
#[derive(Debug, Deserialize)]
pub struct CheckoutSubmitRequest {
    /// Button operation: "next" or "previous"
    pub op: String,
    /// Submitted values, nested by pane ID
    #[serde(default)]
    pub values: Settings,
}

/// Checkout page response: the rendered step or where to go next
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order_id: String,
    /// Step the request was handled on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    #[serde(flatten)]
    pub outcome: FormOutcome,
    /// Field errors keyed by element path
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub errors: IndexMap<String, String>,
}

impl CheckoutResponse {
    fn new(flow: &dyn CheckoutFlow, outcome: FormOutcome, form_state: &FormState) -> Self {
        Self {
            order_id: flow.order().id().to_string(),
            step_id: flow.step_id().map(str::to_string),
            outcome,
            errors: form_state.errors().clone(),
        }
    }
}

/// Flow as listed in the admin
#[derive(Debug, Serialize)]
pub struct FlowSummary {
    pub id: String,
    pub label: String,
    pub plugin: String,
}

impl From<&FlowConfig> for FlowSummary {
    fn from(config: &FlowConfig) -> Self {
        Self {
            id: config.id.clone(),
            label: config.label.clone(),
            plugin: config.plugin.clone(),
        }
    }
}

/// Pane editor row operation or flow save
#[derive(Debug, Default, Deserialize)]
pub struct FlowEditRequest {
    /// Submitted overview values, `panes[pane_id][step|weight|settings]`
    #[serde(default)]
    pub values: Settings,
}

/// Pane overview of a flow with its editor state
#[derive(Debug, Serialize)]
pub struct OverviewResponse {
    pub flow: FlowSummary,
    pub overview: PaneOverview,
    /// Rows for the drag-and-drop table
    pub table: Vec<TableRow>,
    pub form: FormElement,
    /// Values reproducing the current assignment, ready to submit
    pub values: Settings,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub errors: IndexMap<String, String>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

fn checkout_error_to_response(err: CheckoutError) -> (StatusCode, Json<ErrorResponse>) {
    let code = err.status_code();
    let mut response = ErrorResponse::new(err.to_string(), code);
    if err.is_configuration_error() {
        warn!("Checkout configuration error: {}", err);
        response = response.with_details("Check the checkout flow configuration");
    }
    (StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR), Json(response))
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "paneflow",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Create an order ready for checkout
#[instrument(skip(state, request))]
pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), (StatusCode, Json<ErrorResponse>)> {
    let order_type = request.order_type.unwrap_or_else(|| DEFAULT_ORDER_TYPE.to_string());
    let mut order = Order::new(order_type);
    if let Some(email) = request.email {
        order.set_email(email);
    }

    // Resolving the flow validates the order type and assigns its flow
    state
        .entry()
        .resolve_flow(&mut order)
        .map_err(checkout_error_to_response)?;

    info!(order_id = %order.id(), order_type = %order.bundle(), "Created order");
    Ok((StatusCode::CREATED, Json(order)))
}

/// Get an order by ID
#[instrument(skip(state))]
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<Order>, (StatusCode, Json<ErrorResponse>)> {
    state
        .orders
        .get(&order_id)
        .map(Json)
        .map_err(checkout_error_to_response)
}

/// Form of the order's current step
#[instrument(skip(state))]
pub async fn get_checkout(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<CheckoutResponse>, (StatusCode, Json<ErrorResponse>)> {
    run_checkout(&state, &order_id, None, FormState::new())
        .map(Json)
        .map_err(checkout_error_to_response)
}

/// Form of a specific step
#[instrument(skip(state))]
pub async fn get_checkout_step(
    State(state): State<AppState>,
    Path((order_id, step_id)): Path<(String, String)>,
) -> Result<Json<CheckoutResponse>, (StatusCode, Json<ErrorResponse>)> {
    run_checkout(&state, &order_id, Some(&step_id), FormState::new())
        .map(Json)
        .map_err(checkout_error_to_response)
}

/// Submit a step
#[instrument(skip(state, request), fields(op = %request.op))]
pub async fn post_checkout_step(
    State(state): State<AppState>,
    Path((order_id, step_id)): Path<(String, String)>,
    Json(request): Json<CheckoutSubmitRequest>,
) -> Result<Json<CheckoutResponse>, (StatusCode, Json<ErrorResponse>)> {
    let form_state = FormState::submitted(request.op, request.values);
    run_checkout(&state, &order_id, Some(&step_id), form_state)
        .map(Json)
        .map_err(checkout_error_to_response)
}

/// Open the order's flow on `step_id` and process one request.
///
/// A step that cannot be shown redirects to the step the flow resolved to.
fn run_checkout(
    state: &AppState,
    order_id: &str,
    step_id: Option<&str>,
    mut form_state: FormState,
) -> CheckoutResult<CheckoutResponse> {
    let order = state.orders.get(order_id)?;
    let mut flow = state.entry().open(order, step_id)?;

    if let Some(requested) = step_id {
        if flow.step_id() != Some(requested) {
            let resolved = flow.step_id().unwrap_or_default().to_string();
            let outcome = FormOutcome::Redirect {
                redirect: Redirect::new(order_id, resolved),
            };
            return Ok(CheckoutResponse::new(flow.as_ref(), outcome, &FormState::new()));
        }
    }

    let outcome = process_form(flow.as_mut(), &mut form_state, state.orders.as_ref())?;
    Ok(CheckoutResponse::new(flow.as_ref(), outcome, &form_state))
}

/// List all checkout flows
#[instrument(skip(state))]
pub async fn list_flows(State(state): State<AppState>) -> Json<Vec<FlowSummary>> {
    let flows = state
        .flows
        .list_flows()
        .iter()
        .map(FlowSummary::from)
        .collect();
    Json(flows)
}

/// Pane overview of a flow, with the open editor session if any
#[instrument(skip(state))]
pub async fn get_flow_overview(
    State(state): State<AppState>,
    Path(flow_id): Path<String>,
) -> Result<Json<OverviewResponse>, (StatusCode, Json<ErrorResponse>)> {
    let (config, flow) = open_flow(&state, &flow_id).map_err(checkout_error_to_response)?;
    let mut form_state = FormState::new();
    form_state.pane_editor = state.editor_session(&flow_id);

    overview_response(&config, flow.as_ref(), &form_state)
        .map(Json)
        .map_err(checkout_error_to_response)
}

/// Row button of the pane overview: edit, update or cancel
#[instrument(skip(state, request))]
pub async fn post_pane_op(
    State(state): State<AppState>,
    Path((flow_id, pane_id, op)): Path<(String, String, String)>,
    Json(request): Json<FlowEditRequest>,
) -> Result<Json<OverviewResponse>, (StatusCode, Json<ErrorResponse>)> {
    let op: EditorOp = op.parse().map_err(checkout_error_to_response)?;
    pane_op_internal(&state, &flow_id, &pane_id, op, request.values)
        .map(Json)
        .map_err(checkout_error_to_response)
}

/// Apply a row operation to the flow's editor session.
///
/// A failed `update` keeps the row open and reports its errors.
fn pane_op_internal(
    state: &AppState,
    flow_id: &str,
    pane_id: &str,
    op: EditorOp,
    values: Settings,
) -> CheckoutResult<OverviewResponse> {
    let (config, flow) = open_flow(state, flow_id)?;
    let pane_flow = pane_flow(flow.as_ref())?;
    let pane = pane_flow.pane(pane_id).ok_or_else(|| CheckoutError::PaneNotFound {
        pane_id: pane_id.to_string(),
    })?;
    if op == EditorOp::Edit && pane.build_configuration_form().is_empty() {
        return Err(CheckoutError::InvalidConfiguration(format!(
            "pane {pane_id} has no settings"
        )));
    }

    let mut form_state = FormState::submitted(op.as_str(), values);
    form_state.pane_editor = state.editor_session(flow_id);

    if op == EditorOp::Update {
        validate_row(pane_flow, &mut form_state, pane_id)?;
    }
    if !form_state.has_errors() {
        multistep_submit(&mut form_state, op, pane_id);
        state.store_editor_session(flow_id, form_state.pane_editor.clone());
    }
    overview_response(&config, flow.as_ref(), &form_state)
}

/// Save the pane overview into the flow configuration
#[instrument(skip(state, request))]
pub async fn put_flow(
    State(state): State<AppState>,
    Path(flow_id): Path<String>,
    Json(request): Json<FlowEditRequest>,
) -> Result<Json<OverviewResponse>, (StatusCode, Json<ErrorResponse>)> {
    save_flow_internal(&state, &flow_id, request.values)
        .map(Json)
        .map_err(checkout_error_to_response)
}

/// Validate the open or pending row, then reconcile and store the flow.
///
/// With validation errors nothing is saved and the session stays open.
fn save_flow_internal(
    state: &AppState,
    flow_id: &str,
    values: Settings,
) -> CheckoutResult<OverviewResponse> {
    let (mut config, mut flow) = open_flow(state, flow_id)?;
    let mut form_state = FormState::submitted("save", values);
    form_state.pane_editor = state.editor_session(flow_id);

    flow.validate_configuration_form(&mut form_state)?;
    if form_state.has_errors() {
        return overview_response(&config, flow.as_ref(), &form_state);
    }

    flow.submit_configuration_form(&mut form_state)?;
    config.configuration = flow.configuration().clone();
    state.flows.save_flow(config.clone());
    state.store_editor_session(flow_id, form_state.pane_editor.clone());
    info!(flow_id = %config.id, "Saved checkout flow");

    overview_response(&config, flow.as_ref(), &FormState::new())
}

/// Load a flow and instantiate it against a placeholder order
fn open_flow(state: &AppState, flow_id: &str) -> CheckoutResult<(FlowConfig, BoxedFlow)> {
    let config = state.flows.load_flow(flow_id)?;
    let order = Order::new(DEFAULT_ORDER_TYPE)
        .with_id(PREVIEW_ORDER_ID)
        .with_checkout_flow(flow_id);
    let flow = state.flow_types.create(&config, order)?;
    pane_flow(flow.as_ref())?;
    Ok((config, flow))
}

fn pane_flow(flow: &dyn CheckoutFlow) -> CheckoutResult<&PaneFlow> {
    flow.as_pane_flow().ok_or_else(|| {
        CheckoutError::InvalidConfiguration(format!("flow type {} has no panes", flow.form_id()))
    })
}

fn overview_response(
    config: &FlowConfig,
    flow: &dyn CheckoutFlow,
    form_state: &FormState,
) -> CheckoutResult<OverviewResponse> {
    let overview = build_overview(pane_flow(flow)?, form_state)?;
    Ok(OverviewResponse {
        flow: FlowSummary::from(config),
        table: overview.table_rows(),
        form: flow.build_configuration_form(form_state)?,
        values: overview.submission(),
        overview,
        errors: form_state.errors().clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_status() {
        let (status, Json(body)) = checkout_error_to_response(CheckoutError::OrderNotFound {
            order_id: "9".into(),
        });
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.code, 404);
        assert_eq!(body.error, "Order not found: 9");
        assert!(body.details.is_none());
    }

    #[test]
    fn test_configuration_errors_carry_details() {
        let (status, Json(body)) = checkout_error_to_response(CheckoutError::FlowTypeNotFound {
            plugin: "single_page".into(),
        });
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.details.is_some());
    }

    #[test]
    fn test_checkout_response_flattens_outcome() {
        let response = CheckoutResponse {
            order_id: "1".into(),
            step_id: Some("login".into()),
            outcome: FormOutcome::Redirect {
                redirect: Redirect::new("1", "review"),
            },
            errors: IndexMap::new(),
        };
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["type"], "redirect");
        assert_eq!(json["redirect"]["step_id"], "review");
        assert!(json.get("errors").is_none());
    }
}
