//! # Application State
//!
//! Shared state for the Axum application.
//! Contains the in-memory stores, flow types, and open editor sessions.

use checkout_core::{
    CheckoutEntry, CheckoutError, CheckoutResult, FlowConfig, FlowRepository, FlowTypeRegistry,
    LoggingSubscriber, Order, OrderStorage, OrderType, OrderTypeRepository, PaneEditorState,
};
use checkout_panes::{builtin_flow_types, builtin_pane_registry, CheckoutCatalog};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Explicit catalog path, searched for when unset
    pub checkout_config: Option<String>,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            checkout_config: std::env::var("CHECKOUT_CONFIG").ok(),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid socket address {}:{}: {}", self.host, self.port, e))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Orders keyed by ID
#[derive(Debug, Default)]
pub struct OrderStore {
    orders: DashMap<String, Order>,
}

impl OrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, order: Order) {
        self.orders.insert(order.id().to_string(), order);
    }

    pub fn get(&self, order_id: &str) -> CheckoutResult<Order> {
        self.orders
            .get(order_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| CheckoutError::OrderNotFound {
                order_id: order_id.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

impl OrderStorage for OrderStore {
    fn save(&self, order: &Order) -> CheckoutResult<()> {
        self.orders.insert(order.id().to_string(), order.clone());
        Ok(())
    }
}

/// Flow configurations and order types
#[derive(Debug, Default)]
pub struct FlowStore {
    flows: DashMap<String, FlowConfig>,
    order_types: DashMap<String, OrderType>,
}

impl FlowStore {
    pub fn from_catalog(catalog: &CheckoutCatalog) -> Self {
        let store = Self::default();
        for flow in &catalog.flows {
            store.save_flow(flow.clone());
        }
        for order_type in &catalog.order_types {
            store
                .order_types
                .insert(order_type.id.clone(), order_type.clone());
        }
        store
    }

    pub fn save_flow(&self, flow: FlowConfig) {
        self.flows.insert(flow.id.clone(), flow);
    }

    /// All flows, sorted by ID
    pub fn list_flows(&self) -> Vec<FlowConfig> {
        let mut flows: Vec<FlowConfig> = self.flows.iter().map(|entry| entry.value().clone()).collect();
        flows.sort_by(|a, b| a.id.cmp(&b.id));
        flows
    }
}

impl FlowRepository for FlowStore {
    fn load_flow(&self, flow_id: &str) -> CheckoutResult<FlowConfig> {
        self.flows
            .get(flow_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| CheckoutError::FlowNotFound {
                flow_id: flow_id.to_string(),
            })
    }
}

impl OrderTypeRepository for FlowStore {
    fn load_order_type(&self, order_type: &str) -> CheckoutResult<OrderType> {
        self.order_types
            .get(order_type)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| CheckoutError::OrderTypeNotFound {
                order_type: order_type.to_string(),
            })
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Orders going through checkout
    pub orders: Arc<OrderStore>,
    /// Flow configurations and order types
    pub flows: Arc<FlowStore>,
    /// Registered flow types
    pub flow_types: Arc<FlowTypeRegistry>,
    /// Pane overview editor state per flow, until the flow is saved
    pub editor_sessions: Arc<DashMap<String, PaneEditorState>>,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Create a new AppState from the environment and the checkout catalog
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();
        let catalog = load_checkout_catalog(config.checkout_config.as_deref())?;
        Self::from_catalog(config, catalog)
    }

    /// Create an AppState around an already loaded catalog
    pub fn from_catalog(config: AppConfig, catalog: CheckoutCatalog) -> anyhow::Result<Self> {
        let catalog = catalog.with_defaults();

        let panes = builtin_pane_registry(Arc::new(catalog.authenticator()))
            .map_err(|e| anyhow::anyhow!("Failed to discover checkout panes: {}", e))?;
        let flow_types = builtin_flow_types(Arc::new(panes))
            .with_subscriber(Arc::new(LoggingSubscriber));

        for flow in &catalog.flows {
            if !flow_types.has_flow_type(&flow.plugin) {
                anyhow::bail!("Flow {} uses unknown flow type {}", flow.id, flow.plugin);
            }
        }

        let orders = OrderStore::new();
        for order in &catalog.orders {
            orders.insert(order.clone());
        }

        Ok(Self {
            orders: Arc::new(orders),
            flows: Arc::new(FlowStore::from_catalog(&catalog)),
            flow_types: Arc::new(flow_types),
            editor_sessions: Arc::new(DashMap::new()),
            config,
        })
    }

    /// Checkout entry point wired to the stores
    pub fn entry(&self) -> CheckoutEntry<'_> {
        CheckoutEntry::new(
            self.orders.as_ref(),
            self.flows.as_ref(),
            self.flows.as_ref(),
            self.flow_types.as_ref(),
        )
    }

    /// Editor state of an open session, idle when none is open
    pub fn editor_session(&self, flow_id: &str) -> PaneEditorState {
        self.editor_sessions
            .get(flow_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Store the session, dropping it once it is idle
    pub fn store_editor_session(&self, flow_id: &str, editor: PaneEditorState) {
        if editor.is_idle() {
            self.editor_sessions.remove(flow_id);
        } else {
            self.editor_sessions.insert(flow_id.to_string(), editor);
        }
    }
}

/// Load the checkout catalog from `path`, or from config/checkout.toml
fn load_checkout_catalog(path: Option<&str>) -> anyhow::Result<CheckoutCatalog> {
    if let Some(path) = path {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path, e))?;
        return parse_catalog(&content, path);
    }

    let config_paths = [
        "config/checkout.toml",
        "../config/checkout.toml",
        "../../config/checkout.toml",
    ];

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            return parse_catalog(&content, path);
        }
    }

    tracing::warn!("No checkout catalog found, using the built-in default flow");
    Ok(CheckoutCatalog::new())
}

fn parse_catalog(content: &str, path: &str) -> anyhow::Result<CheckoutCatalog> {
    let catalog = CheckoutCatalog::from_toml(content)
        .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
    tracing::info!(
        "Loaded {} flows and {} orders from {}",
        catalog.flows.len(),
        catalog.orders.len(),
        path
    );
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig {
            host: "0.0.0.0".to_string(),
            port: 3000,
            environment: "test".to_string(),
            checkout_config: None,
        }
    }

    #[test]
    fn test_socket_addr() {
        let addr = config().socket_addr().unwrap();
        assert_eq!(addr.to_string(), "0.0.0.0:3000");

        let bad = AppConfig {
            host: "not a host".to_string(),
            ..config()
        };
        assert!(bad.socket_addr().is_err());
    }

    #[test]
    fn test_empty_catalog_gets_default_flow() {
        let state = AppState::from_catalog(config(), CheckoutCatalog::new()).unwrap();

        let flows = state.flows.list_flows();
        assert_eq!(flows.len(), 1);
        assert_eq!(flows[0].id, "default");
        assert_eq!(state.flows.load_order_type("default").unwrap().checkout_flow, "default");
        assert!(state.orders.is_empty());
    }

    #[test]
    fn test_unknown_flow_type_fails_bootstrap() {
        let catalog = CheckoutCatalog::from_toml(
            r#"
[[flows]]
id = "odd"
label = "Odd"
plugin = "single_page"
"#,
        )
        .unwrap();

        assert!(AppState::from_catalog(config(), catalog).is_err());
    }

    #[test]
    fn test_order_store_round_trip() {
        let store = OrderStore::new();
        let order = Order::new("default").with_id("42");
        store.save(&order).unwrap();

        assert_eq!(store.get("42").unwrap(), order);
        assert!(matches!(store.get("43"), Err(CheckoutError::OrderNotFound { .. })));
    }

    #[test]
    fn test_idle_editor_session_is_dropped() {
        let state = AppState::from_catalog(config(), CheckoutCatalog::new()).unwrap();

        let mut editor = PaneEditorState::default();
        editor.editing = Some("login".to_string());
        state.store_editor_session("default", editor.clone());
        assert_eq!(state.editor_session("default"), editor);

        state.store_editor_session("default", PaneEditorState::default());
        assert!(state.editor_sessions.is_empty());
    }

    #[test]
    fn test_catalog_path_must_exist() {
        assert!(load_checkout_catalog(Some("/nonexistent/checkout.toml")).is_err());
    }
}
