//! # Checkout Pane Trait
//!
//! Panes are configurable sub-forms embedded into the checkout flow form.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                       Pane (trait)                       │
//! │  ├── weight() / step_id()        ordering + membership   │
//! │  ├── is_visible(order)                                   │
//! │  ├── build / validate / submit   pane form (checkout)    │
//! │  └── build / validate / submit   configuration (admin)   │
//! └──────────────────────────────────────────────────────────┘
//!                            ▲
//!      ┌──────────────┬──────┴───────┬──────────────────┐
//!   Login          Review    PaymentRedirect    CompletionMessage
//! ```

use crate::error::CheckoutResult;
use crate::form::{FormElement, FormState};
use crate::merge::Settings;
use crate::order::Order;
use crate::step::DISABLED;
use serde_json::Value;
use std::cmp::Ordering;

/// Configuration keys owned by the flow rather than by the pane type
pub const STEP_KEY: &str = "step";
pub const WEIGHT_KEY: &str = "weight";

/// Weight from a configuration value; numeric strings (as submitted by
/// weight fields) are accepted
pub fn parse_weight(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|w| i32::try_from(w).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// State shared by every pane: identity and configuration
#[derive(Debug, Clone, PartialEq)]
pub struct PaneBase {
    id: String,
    label: String,
    configuration: Settings,
}

impl PaneBase {
    pub fn new(id: impl Into<String>, label: impl Into<String>, configuration: Settings) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            configuration,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn configuration(&self) -> &Settings {
        &self.configuration
    }

    pub fn weight(&self) -> i32 {
        self.configuration
            .get(WEIGHT_KEY)
            .and_then(parse_weight)
            .unwrap_or(0)
    }

    pub fn set_weight(&mut self, weight: i32) {
        self.configuration
            .insert(WEIGHT_KEY.to_string(), Value::from(weight));
    }

    /// Assigned step, `_disabled` when unassigned
    pub fn step_id(&self) -> &str {
        self.configuration
            .get(STEP_KEY)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(DISABLED)
    }

    pub fn set_step_id(&mut self, step_id: impl Into<String>) {
        self.configuration
            .insert(STEP_KEY.to_string(), Value::String(step_id.into()));
    }

    pub fn setting(&self, key: &str) -> Option<&Value> {
        self.configuration.get(key)
    }

    pub fn set_setting(&mut self, key: impl Into<String>, value: Value) {
        self.configuration.insert(key.into(), value);
    }

    /// Pane-type settings, i.e. the configuration without step and weight
    pub fn settings(&self) -> Settings {
        self.configuration
            .iter()
            .filter(|(key, _)| key.as_str() != STEP_KEY && key.as_str() != WEIGHT_KEY)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

/// Capability set every pane variant implements.
///
/// Side effects are confined to the order and the pane's own configuration.
#[allow(unused_variables)]
pub trait Pane: Send + Sync {
    fn base(&self) -> &PaneBase;

    fn base_mut(&mut self) -> &mut PaneBase;

    fn id(&self) -> &str {
        self.base().id()
    }

    fn label(&self) -> &str {
        self.base().label()
    }

    fn configuration(&self) -> &Settings {
        self.base().configuration()
    }

    fn weight(&self) -> i32 {
        self.base().weight()
    }

    fn set_weight(&mut self, weight: i32) {
        self.base_mut().set_weight(weight);
    }

    fn step_id(&self) -> &str {
        self.base().step_id()
    }

    fn set_step_id(&mut self, step_id: &str) {
        self.base_mut().set_step_id(step_id);
    }

    /// Short human-readable summary of the configuration
    fn configuration_summary(&self) -> Vec<String> {
        Vec::new()
    }

    /// Settings sub-form; an empty container means the pane has no settings
    fn build_configuration_form(&self) -> FormElement {
        FormElement::container()
    }

    fn validate_configuration_form(&self, values: &Settings, state: &mut FormState) {}

    /// Apply submitted settings
    fn submit_configuration_form(&mut self, values: &Settings) {
        for (key, value) in values {
            self.base_mut().set_setting(key.clone(), value.clone());
        }
    }

    fn is_visible(&self, order: &Order) -> bool {
        true
    }

    /// Build the pane form. `pane_form` arrives with `parents = [pane_id]`.
    fn build_pane_form(&self, pane_form: FormElement, state: &FormState, order: &Order)
        -> FormElement;

    fn validate_pane_form(&self, pane_form: &FormElement, state: &mut FormState, order: &Order) {}

    fn submit_pane_form(
        &mut self,
        pane_form: &FormElement,
        state: &mut FormState,
        order: &mut Order,
    ) -> CheckoutResult<()> {
        Ok(())
    }
}

/// Type alias for a boxed pane (dynamic dispatch)
pub type BoxedPane = Box<dyn Pane>;

/// Paint order: weight ascending, then ID ascending
pub fn compare_panes(a: &dyn Pane, b: &dyn Pane) -> Ordering {
    a.weight()
        .cmp(&b.weight())
        .then_with(|| a.id().cmp(b.id()))
}

/// Sort panes into paint order
pub fn sort_panes(panes: &mut [BoxedPane]) {
    panes.sort_by(|a, b| compare_panes(a.as_ref(), b.as_ref()));
}
