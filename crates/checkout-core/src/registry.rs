//! # Pane Registry
//!
//! Maps pane IDs to their definition and factory. Definitions are validated
//! once, when the registry is built; a bad definition is a startup failure.

use crate::error::{CheckoutError, CheckoutResult};
use crate::merge::{merge_deep, Settings};
use crate::pane::{BoxedPane, PaneBase, STEP_KEY, WEIGHT_KEY};
use crate::step::DISABLED;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

fn default_step() -> String {
    DISABLED.to_string()
}

/// Descriptive metadata of a pane type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaneDefinition {
    pub id: String,

    pub label: String,

    /// Step new instances are assigned to
    #[serde(default = "default_step")]
    pub default_step: String,

    /// Default settings of the pane type
    #[serde(default)]
    pub default_configuration: Settings,
}

impl PaneDefinition {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            default_step: default_step(),
            default_configuration: Settings::new(),
        }
    }

    pub fn with_default_step(mut self, step_id: impl Into<String>) -> Self {
        self.default_step = step_id.into();
        self
    }

    pub fn with_default_configuration(mut self, configuration: Settings) -> Self {
        self.default_configuration = configuration;
        self
    }

    /// Full configuration of a fresh instance: step, weight, settings
    pub fn instance_defaults(&self) -> Settings {
        let mut defaults = Settings::new();
        defaults.insert(STEP_KEY.to_string(), Value::String(self.default_step.clone()));
        defaults.insert(WEIGHT_KEY.to_string(), Value::from(0));
        merge_deep(&mut defaults, &self.default_configuration);
        defaults
    }
}

/// Constructor of a pane variant
pub type PaneFactory = Arc<dyn Fn(PaneBase) -> BoxedPane + Send + Sync>;

/// A pane type offered to the registry
#[derive(Clone)]
pub struct PaneRegistration {
    pub definition: PaneDefinition,
    pub factory: PaneFactory,
}

impl PaneRegistration {
    pub fn new<F>(definition: PaneDefinition, factory: F) -> Self
    where
        F: Fn(PaneBase) -> BoxedPane + Send + Sync + 'static,
    {
        Self {
            definition,
            factory: Arc::new(factory),
        }
    }
}

type DefinitionAlter = Box<dyn Fn(&mut PaneDefinition)>;

/// Collects registrations and alter hooks, then discovers the registry
#[derive(Default)]
pub struct PaneRegistryBuilder {
    registrations: Vec<PaneRegistration>,
    alters: Vec<DefinitionAlter>,
}

impl PaneRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, registration: PaneRegistration) {
        self.registrations.push(registration);
    }

    /// Register with builder pattern
    pub fn with_pane(mut self, registration: PaneRegistration) -> Self {
        self.register(registration);
        self
    }

    /// Alter hook run over every definition before validation
    pub fn with_alter(mut self, alter: impl Fn(&mut PaneDefinition) + 'static) -> Self {
        self.alters.push(Box::new(alter));
        self
    }

    pub fn build(self) -> CheckoutResult<PaneRegistry> {
        let alters = self.alters;
        let registrations = self.registrations.into_iter().map(|mut registration| {
            for alter in &alters {
                alter(&mut registration.definition);
            }
            registration
        });
        PaneRegistry::discover(registrations)
    }
}

/// Registry of pane types
#[derive(Clone, Default)]
pub struct PaneRegistry {
    entries: IndexMap<String, PaneRegistration>,
}

impl std::fmt::Debug for PaneRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaneRegistry")
            .field("panes", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl PaneRegistry {
    pub fn builder() -> PaneRegistryBuilder {
        PaneRegistryBuilder::new()
    }

    /// Validate and index pane registrations.
    ///
    /// Every definition must have a non-empty `id` and `label`. A later
    /// registration with the same ID replaces the earlier one.
    pub fn discover(
        registrations: impl IntoIterator<Item = PaneRegistration>,
    ) -> CheckoutResult<Self> {
        let mut entries = IndexMap::new();
        for registration in registrations {
            validate_definition(&registration.definition)?;
            let pane_id = registration.definition.id.clone();
            if entries.contains_key(&pane_id) {
                warn!(pane_id = %pane_id, "pane definition replaced by a later registration");
            }
            entries.insert(pane_id, registration);
        }
        debug!("Discovered {} checkout panes", entries.len());
        Ok(Self { entries })
    }

    /// All definitions, in discovery order
    pub fn definitions(&self) -> impl Iterator<Item = &PaneDefinition> {
        self.entries.values().map(|entry| &entry.definition)
    }

    pub fn definition(&self, pane_id: &str) -> CheckoutResult<&PaneDefinition> {
        self.entry(pane_id).map(|entry| &entry.definition)
    }

    /// Default settings of a pane type
    pub fn default_settings(&self, pane_id: &str) -> CheckoutResult<&Settings> {
        self.definition(pane_id)
            .map(|definition| &definition.default_configuration)
    }

    /// Instantiate a pane, deep-merging `configuration` over its defaults
    pub fn create_instance(&self, pane_id: &str, configuration: &Settings) -> CheckoutResult<BoxedPane> {
        let entry = self.entry(pane_id)?;
        let mut merged = entry.definition.instance_defaults();
        merge_deep(&mut merged, configuration);
        let base = PaneBase::new(
            entry.definition.id.clone(),
            entry.definition.label.clone(),
            merged,
        );
        Ok((entry.factory)(base))
    }

    pub fn pane_ids(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, pane_id: &str) -> CheckoutResult<&PaneRegistration> {
        self.entries
            .get(pane_id)
            .ok_or_else(|| CheckoutError::PaneNotFound {
                pane_id: pane_id.to_string(),
            })
    }
}

fn validate_definition(definition: &PaneDefinition) -> CheckoutResult<()> {
    for (property, value) in [("id", &definition.id), ("label", &definition.label)] {
        if value.trim().is_empty() {
            return Err(CheckoutError::Definition {
                pane_id: definition.id.clone(),
                property: property.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{FormElement, FormState};
    use crate::merge::settings;
    use crate::order::Order;
    use crate::pane::Pane;
    use serde_json::json;

    struct Plain(PaneBase);

    impl Pane for Plain {
        fn base(&self) -> &PaneBase {
            &self.0
        }

        fn base_mut(&mut self) -> &mut PaneBase {
            &mut self.0
        }

        fn build_pane_form(&self, pane_form: FormElement, _: &FormState, _: &Order) -> FormElement {
            pane_form
        }
    }

    fn registration(definition: PaneDefinition) -> PaneRegistration {
        PaneRegistration::new(definition, |base| Box::new(Plain(base)) as BoxedPane)
    }

    #[test]
    fn test_discovery_rejects_missing_label() {
        let result = PaneRegistry::discover([
            registration(PaneDefinition::new("login", "Login")),
            registration(PaneDefinition::new("shipping", "")),
        ]);

        match result {
            Err(CheckoutError::Definition { pane_id, property }) => {
                assert_eq!(pane_id, "shipping");
                assert_eq!(property, "label");
            }
            other => panic!("expected definition error, got {:?}", other.map(|r| r.len())),
        }
    }

    #[test]
    fn test_discovery_rejects_missing_id() {
        let result = PaneRegistry::discover([registration(PaneDefinition::new(" ", "Nameless"))]);
        assert!(matches!(
            result,
            Err(CheckoutError::Definition { ref property, .. }) if property == "id"
        ));
    }

    #[test]
    fn test_unknown_pane_is_not_found() {
        let registry = PaneRegistry::discover([]).unwrap();
        assert!(matches!(
            registry.definition("nope"),
            Err(CheckoutError::PaneNotFound { .. })
        ));
        assert!(registry.create_instance("nope", &Settings::new()).is_err());
    }

    #[test]
    fn test_create_instance_merges_over_defaults() {
        let registry = PaneRegistry::discover([registration(
            PaneDefinition::new("login", "Login")
                .with_default_step("login")
                .with_default_configuration(settings(json!({
                    "allow_guest_checkout": true,
                    "texts": { "title": "Sign in", "help": "" }
                }))),
        )])
        .unwrap();

        let pane = registry
            .create_instance(
                "login",
                &settings(json!({ "weight": 3, "texts": { "help": "Need an account?" } })),
            )
            .unwrap();

        assert_eq!(pane.step_id(), "login");
        assert_eq!(pane.weight(), 3);
        assert_eq!(pane.label(), "Login");
        assert_eq!(
            pane.configuration()["texts"],
            json!({ "title": "Sign in", "help": "Need an account?" })
        );
        assert_eq!(pane.configuration()["allow_guest_checkout"], json!(true));
    }

    #[test]
    fn test_default_step_is_disabled() {
        let registry =
            PaneRegistry::discover([registration(PaneDefinition::new("coupon", "Coupon"))]).unwrap();
        let pane = registry.create_instance("coupon", &Settings::new()).unwrap();
        assert_eq!(pane.step_id(), DISABLED);
    }

    #[test]
    fn test_alter_hook_runs_before_validation() {
        let registry = PaneRegistry::builder()
            .with_pane(registration(PaneDefinition::new("review", "")))
            .with_alter(|definition| {
                if definition.label.is_empty() {
                    definition.label = "Review".to_string();
                }
            })
            .build()
            .unwrap();

        assert_eq!(registry.definition("review").unwrap().label, "Review");
    }

    #[test]
    fn test_definitions_keep_discovery_order() {
        let registry = PaneRegistry::discover([
            registration(PaneDefinition::new("b", "B")),
            registration(PaneDefinition::new("a", "A")),
        ])
        .unwrap();
        assert_eq!(registry.pane_ids(), ["b", "a"]);
    }
}
