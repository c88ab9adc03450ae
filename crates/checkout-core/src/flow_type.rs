//! # Flow Types
//!
//! Stored flow configurations and the registry that turns them into flow
//! instances by plugin tag.

use crate::error::{CheckoutError, CheckoutResult};
use crate::flow::{BoxedFlow, FlowBase};
use crate::merge::Settings;
use crate::order::{Order, OrderType};
use crate::subscriber::BoxedSubscriber;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// A stored checkout flow: which plugin drives it and how it is configured
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowConfig {
    pub id: String,

    pub label: String,

    /// Flow type tag, resolved through [`FlowTypeRegistry`]
    pub plugin: String,

    /// Plugin configuration; for pane flows `{step_id: {pane_id: {...}}}`
    #[serde(default)]
    pub configuration: Settings,
}

impl FlowConfig {
    pub fn new(id: impl Into<String>, label: impl Into<String>, plugin: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            plugin: plugin.into(),
            configuration: Settings::new(),
        }
    }

    pub fn with_configuration(mut self, configuration: Settings) -> Self {
        self.configuration = configuration;
        self
    }
}

/// Loads stored flows
pub trait FlowRepository: Send + Sync {
    /// Fails with [`CheckoutError::FlowNotFound`] for unknown IDs
    fn load_flow(&self, flow_id: &str) -> CheckoutResult<FlowConfig>;
}

/// Loads order types
pub trait OrderTypeRepository: Send + Sync {
    /// Fails with [`CheckoutError::OrderTypeNotFound`] for unknown IDs
    fn load_order_type(&self, order_type: &str) -> CheckoutResult<OrderType>;
}

/// Builds a flow from its base state (plugin ID, order, configuration)
pub type FlowFactory = Arc<dyn Fn(FlowBase) -> BoxedFlow + Send + Sync>;

/// Descriptive metadata of a flow type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowTypeDefinition {
    pub id: String,
    pub label: String,
}

#[derive(Clone)]
struct FlowTypeEntry {
    definition: FlowTypeDefinition,
    factory: FlowFactory,
}

/// Registry of flow types, keyed by plugin tag
#[derive(Clone, Default)]
pub struct FlowTypeRegistry {
    entries: IndexMap<String, FlowTypeEntry>,
    subscribers: Vec<BoxedSubscriber>,
}

impl std::fmt::Debug for FlowTypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowTypeRegistry")
            .field("flow_types", &self.entries.keys().collect::<Vec<_>>())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl FlowTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, definition: FlowTypeDefinition, factory: F)
    where
        F: Fn(FlowBase) -> BoxedFlow + Send + Sync + 'static,
    {
        debug!(plugin = %definition.id, "registered checkout flow type");
        self.entries.insert(
            definition.id.clone(),
            FlowTypeEntry {
                definition,
                factory: Arc::new(factory),
            },
        );
    }

    /// Register with builder pattern
    pub fn with_flow_type<F>(mut self, definition: FlowTypeDefinition, factory: F) -> Self
    where
        F: Fn(FlowBase) -> BoxedFlow + Send + Sync + 'static,
    {
        self.register(definition, factory);
        self
    }

    /// Subscriber handed to every flow created from now on
    pub fn with_subscriber(mut self, subscriber: BoxedSubscriber) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    pub fn definitions(&self) -> impl Iterator<Item = &FlowTypeDefinition> {
        self.entries.values().map(|entry| &entry.definition)
    }

    pub fn has_flow_type(&self, plugin: &str) -> bool {
        self.entries.contains_key(plugin)
    }

    /// Instantiate the flow plugin of `config` for `order`
    pub fn create(&self, config: &FlowConfig, order: Order) -> CheckoutResult<BoxedFlow> {
        let entry = self
            .entries
            .get(&config.plugin)
            .ok_or_else(|| CheckoutError::FlowTypeNotFound {
                plugin: config.plugin.clone(),
            })?;

        let base = FlowBase::new(config.plugin.clone(), order)
            .with_configuration(config.configuration.clone())
            .with_subscribers(self.subscribers.clone());
        Ok((entry.factory)(base))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::BasicFlow;
    use crate::merge::settings;
    use crate::step::{Step, StepMap};
    use serde_json::json;

    fn registry() -> FlowTypeRegistry {
        FlowTypeRegistry::new().with_flow_type(
            FlowTypeDefinition {
                id: "single_page".into(),
                label: "Single page".into(),
            },
            |base| {
                let mut steps = StepMap::new();
                steps.insert("checkout".into(), Step::new("Checkout"));
                Box::new(BasicFlow::new(base, steps)) as BoxedFlow
            },
        )
    }

    #[test]
    fn test_create_passes_configuration_and_order() {
        let config = FlowConfig::new("quick", "Quick", "single_page")
            .with_configuration(settings(json!({ "display_checkout_progress": true })));

        let flow = registry()
            .create(&config, Order::new("default").with_id("9"))
            .unwrap();

        assert_eq!(flow.form_id(), "single_page");
        assert_eq!(flow.order().id(), "9");
        assert_eq!(flow.configuration()["display_checkout_progress"], json!(true));
        assert!(flow.steps().contains_key("complete"));
    }

    #[test]
    fn test_unknown_plugin_is_reported() {
        let config = FlowConfig::new("x", "X", "missing");
        let result = registry().create(&config, Order::new("default"));

        assert!(matches!(
            result,
            Err(CheckoutError::FlowTypeNotFound { ref plugin }) if plugin == "missing"
        ));
    }

    #[test]
    fn test_flow_config_deserializes_without_configuration() {
        let config: FlowConfig =
            serde_json::from_value(json!({ "id": "default", "label": "Default", "plugin": "multistep_default" }))
                .unwrap();
        assert!(config.configuration.is_empty());
    }
}
