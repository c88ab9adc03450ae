//! # Pane-Driven Flow
//!
//! A flow whose steps are filled with panes. Step labels come from the
//! declared step metadata; the panes only decide which steps are shown.
//!
//! Flow configuration layout:
//!
//! ```text
//! { step_id: { pane_id: { step, weight, ...settings } } }
//! ```

use crate::error::CheckoutResult;
use crate::flow::{finish_submission, step_form, CheckoutFlow, FlowBase};
use crate::form::{FormElement, FormState};
use crate::merge::Settings;
use crate::order::OrderStorage;
use crate::overview::{build_overview, reconcile, validate_row};
use crate::pane::{sort_panes, BoxedPane, Pane, STEP_KEY};
use crate::registry::PaneRegistry;
use crate::step::{with_builtin_steps, StepMap, DISABLED};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Flow with configurable panes per step
pub struct PaneFlow {
    base: FlowBase,
    declared: StepMap,
    registry: Arc<PaneRegistry>,
    /// All pane instances, in paint order
    panes: Vec<BoxedPane>,
}

impl PaneFlow {
    /// Instantiate every registered pane from the flow configuration in `base`
    pub fn new(base: FlowBase, declared: StepMap, registry: Arc<PaneRegistry>) -> Self {
        let mut flow = Self {
            base,
            declared,
            registry,
            panes: Vec::new(),
        };
        flow.panes = flow.instantiate_panes();
        flow
    }

    pub fn registry(&self) -> &PaneRegistry {
        &self.registry
    }

    /// All panes, disabled ones included, in paint order
    pub fn panes(&self) -> &[BoxedPane] {
        &self.panes
    }

    pub fn pane(&self, pane_id: &str) -> Option<&dyn Pane> {
        self.panes
            .iter()
            .find(|pane| pane.id() == pane_id)
            .map(|pane| pane.as_ref())
    }

    pub fn pane_mut(&mut self, pane_id: &str) -> Option<&mut BoxedPane> {
        self.panes.iter_mut().find(|pane| pane.id() == pane_id)
    }

    /// Panes assigned to `step_id`, in paint order
    pub fn step_panes<'a>(&'a self, step_id: &'a str) -> impl Iterator<Item = &'a BoxedPane> + 'a {
        self.panes.iter().filter(move |pane| pane.step_id() == step_id)
    }

    /// Panes of `step_id` that are shown for the current order
    pub fn visible_panes<'a>(&'a self, step_id: &'a str) -> impl Iterator<Item = &'a BoxedPane> + 'a {
        let order = self.base.order();
        self.step_panes(step_id)
            .filter(move |pane| pane.is_visible(order))
    }

    fn has_visible_pane(&self, step_id: &str) -> bool {
        self.visible_panes(step_id).next().is_some()
    }

    /// True once any step of the flow has a configuration entry
    pub fn is_configured(&self) -> bool {
        let configuration = self.base.configuration();
        self.steps()
            .keys()
            .any(|step_id| configuration.contains_key(step_id))
    }

    /// Stored configuration of a pane, searched across all steps
    fn stored_pane_configuration(&self, pane_id: &str) -> Option<Settings> {
        let configuration = self.base.configuration();
        self.steps().keys().find_map(|step_id| {
            let mut stored = configuration
                .get(step_id)?
                .as_object()?
                .get(pane_id)?
                .as_object()?
                .clone();
            // Location wins over a stale step value
            stored.insert(STEP_KEY.to_string(), Value::String(step_id.clone()));
            Some(stored)
        })
    }

    fn instantiate_panes(&self) -> Vec<BoxedPane> {
        let configured = self.is_configured();
        let mut panes: Vec<BoxedPane> = self
            .registry
            .definitions()
            .filter_map(|definition| {
                let configuration = match self.stored_pane_configuration(&definition.id) {
                    Some(stored) => stored,
                    None if configured => {
                        let mut disabled = Settings::new();
                        disabled.insert(STEP_KEY.to_string(), Value::String(DISABLED.to_string()));
                        disabled
                    }
                    None => Settings::new(),
                };
                match self.registry.create_instance(&definition.id, &configuration) {
                    Ok(pane) => Some(pane),
                    Err(e) => {
                        warn!(pane_id = %definition.id, error = %e, "pane could not be instantiated");
                        None
                    }
                }
            })
            .collect();
        sort_panes(&mut panes);
        debug!(
            flow = self.base.plugin_id(),
            configured,
            "instantiated {} checkout panes",
            panes.len()
        );
        panes
    }

    /// Restore paint order after weights or steps changed
    pub fn resort(&mut self) {
        sort_panes(&mut self.panes);
    }
}

impl CheckoutFlow for PaneFlow {
    fn base(&self) -> &FlowBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut FlowBase {
        &mut self.base
    }

    fn set_configuration(&mut self, configuration: Settings) {
        self.base.set_configuration(configuration);
        self.panes = self.instantiate_panes();
    }

    fn steps(&self) -> StepMap {
        with_builtin_steps(self.declared.clone())
    }

    /// Steps with at least one visible pane. The current step stays visible
    /// while its own submission changes the order.
    fn visible_steps(&self) -> StepMap {
        let current = self.base.step_id();
        self.steps()
            .into_iter()
            .filter(|(step_id, _)| {
                current == Some(step_id.as_str()) || self.has_visible_pane(step_id)
            })
            .collect()
    }

    fn build_form(&self, state: &FormState) -> CheckoutResult<FormElement> {
        let mut form = step_form(self)?;
        let step_id = self.step_id().unwrap_or_default();
        for pane in self.visible_panes(step_id) {
            let pane_form = FormElement::fieldset()
                .with_title(pane.label())
                .with_parents([pane.id()]);
            form.set_child(
                pane.id(),
                pane.build_pane_form(pane_form, state, self.order()),
            );
        }
        form.set_child("actions", self.actions());
        Ok(form)
    }

    fn validate_form(&mut self, form: &FormElement, state: &mut FormState) {
        let step_id = self.step_id().unwrap_or_default();
        for pane in self.visible_panes(step_id) {
            if let Some(pane_form) = form.child(pane.id()) {
                pane.validate_pane_form(pane_form, state, self.base.order());
            }
        }
    }

    #[instrument(skip_all, fields(order_id = %self.base.order().id(), step = self.base.step_id().unwrap_or_default()))]
    fn submit_form(
        &mut self,
        form: &FormElement,
        state: &mut FormState,
        storage: &dyn OrderStorage,
    ) -> CheckoutResult<()> {
        if state.has_errors() {
            return Ok(());
        }

        // Visibility is fixed before any pane touches the order
        let step_id = self.step_id().unwrap_or_default().to_string();
        let order = self.base.order();
        let visible: Vec<usize> = self
            .panes
            .iter()
            .enumerate()
            .filter(|(_, pane)| pane.step_id() == step_id && pane.is_visible(order))
            .map(|(index, _)| index)
            .collect();

        for index in visible {
            let pane = &mut self.panes[index];
            let Some(pane_form) = form.child(pane.id()) else {
                continue;
            };
            pane.submit_pane_form(pane_form, state, self.base.order_mut())?;
        }

        finish_submission(self, state, storage)
    }

    fn build_configuration_form(&self, state: &FormState) -> CheckoutResult<FormElement> {
        Ok(build_overview(self, state)?.to_form())
    }

    fn validate_configuration_form(&self, state: &mut FormState) -> CheckoutResult<()> {
        let editor = &state.pane_editor;
        let Some(pane_id) = editor.editing.clone().or_else(|| editor.pending_update.clone()) else {
            return Ok(());
        };
        validate_row(self, state, &pane_id)
    }

    fn submit_configuration_form(&mut self, state: &mut FormState) -> CheckoutResult<()> {
        let submission = state.values().clone();
        reconcile(&submission, state, self)?;
        Ok(())
    }

    fn as_pane_flow(&self) -> Option<&PaneFlow> {
        Some(self)
    }

    fn as_pane_flow_mut(&mut self) -> Option<&mut PaneFlow> {
        Some(self)
    }
}

impl std::fmt::Debug for PaneFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaneFlow")
            .field("plugin_id", &self.base.plugin_id())
            .field("step_id", &self.base.step_id())
            .field("panes", &self.panes.iter().map(|p| p.id()).collect::<Vec<_>>())
            .finish()
    }
}
