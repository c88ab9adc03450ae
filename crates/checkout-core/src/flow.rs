//! # Checkout Flow State Machine
//!
//! A flow places an order through a series of steps. States are step IDs,
//! transitions follow the order of [`CheckoutFlow::visible_steps`], and
//! `complete` is terminal.
//!
//! Two families of flows exist:
//! - [`BasicFlow`]: steps declared in code, no panes.
//! - [`PaneFlow`](crate::flow_panes::PaneFlow): steps filled with configurable panes.

use crate::error::{CheckoutError, CheckoutResult};
use crate::flow_panes::PaneFlow;
use crate::form::{ElementKind, FormElement, FormState, Redirect};
use crate::merge::{merged, Settings};
use crate::order::{Order, OrderStorage};
use crate::step::{adjacent_step_id, with_builtin_steps, StepMap, COMPLETE, OFFSITE_PAYMENT};
use crate::subscriber::{dispatch_checkout_complete, BoxedSubscriber};
use serde::Serialize;
use tracing::{debug, error, info, warn};

/// Operation of the "next" button
pub const OP_NEXT: &str = "next";

/// Operation of the "previous" button
pub const OP_PREVIOUS: &str = "previous";

/// State shared by every flow: plugin identity, configuration, the order
/// being checked out and the current step
pub struct FlowBase {
    plugin_id: String,
    configuration: Settings,
    order: Order,
    step_id: Option<String>,
    subscribers: Vec<BoxedSubscriber>,
}

impl FlowBase {
    pub fn new(plugin_id: impl Into<String>, order: Order) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            configuration: Settings::new(),
            order,
            step_id: None,
            subscribers: Vec::new(),
        }
    }

    pub fn with_configuration(mut self, configuration: Settings) -> Self {
        self.configuration = configuration;
        self
    }

    pub fn with_subscribers(mut self, subscribers: Vec<BoxedSubscriber>) -> Self {
        self.subscribers = subscribers;
        self
    }

    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    pub fn configuration(&self) -> &Settings {
        &self.configuration
    }

    pub fn set_configuration(&mut self, configuration: Settings) {
        self.configuration = configuration;
    }

    pub fn order(&self) -> &Order {
        &self.order
    }

    pub fn order_mut(&mut self) -> &mut Order {
        &mut self.order
    }

    pub fn step_id(&self) -> Option<&str> {
        self.step_id.as_deref()
    }

    pub fn set_step_id(&mut self, step_id: Option<String>) {
        self.step_id = step_id;
    }

    pub fn subscribers(&self) -> &[BoxedSubscriber] {
        &self.subscribers
    }
}

/// Places an order through a series of steps.
///
/// Navigation is recomputed on every call: visibility may depend on order
/// state that changes within a single request.
#[allow(unused_variables)]
pub trait CheckoutFlow: Send + Sync {
    fn base(&self) -> &FlowBase;

    fn base_mut(&mut self) -> &mut FlowBase;

    /// Form ID, the plugin ID of the flow
    fn form_id(&self) -> &str {
        self.base().plugin_id()
    }

    fn order(&self) -> &Order {
        self.base().order()
    }

    fn step_id(&self) -> Option<&str> {
        self.base().step_id()
    }

    fn default_configuration(&self) -> Settings {
        Settings::new()
    }

    fn configuration(&self) -> &Settings {
        self.base().configuration()
    }

    /// Replace the configuration, deep-merged over the defaults
    fn set_configuration(&mut self, configuration: Settings) {
        let configuration = merged(&self.default_configuration(), &configuration);
        self.base_mut().set_configuration(configuration);
    }

    /// All steps, keyed by step ID, built-in steps included
    fn steps(&self) -> StepMap;

    /// Order-preserving subset of [`steps`](Self::steps) shown for the order
    fn visible_steps(&self) -> StepMap {
        self.steps()
    }

    fn previous_step_id(&self) -> Option<String> {
        let current = self.step_id()?;
        adjacent_step_id(&self.visible_steps(), current, -1)
    }

    fn next_step_id(&self) -> Option<String> {
        let current = self.step_id()?;
        adjacent_step_id(&self.visible_steps(), current, 1)
    }

    /// Pick the current step: the requested one if visible, else the
    /// order's stored step if visible, else the first visible step.
    fn resolve_step(&mut self, requested: Option<&str>) -> CheckoutResult<String> {
        self.base_mut().set_step_id(None);
        let visible = self.visible_steps();
        let stored = self.order().checkout_step.clone();

        let step_id = requested
            .filter(|step_id| visible.contains_key(*step_id))
            .map(str::to_string)
            .or_else(|| stored.filter(|step_id| visible.contains_key(step_id)))
            .or_else(|| visible.keys().next().cloned())
            .ok_or_else(|| CheckoutError::StepNotFound {
                step_id: requested.unwrap_or_default().to_string(),
            })?;

        if requested.is_some_and(|r| r != step_id) {
            warn!(
                requested = requested.unwrap_or_default(),
                resolved = %step_id,
                "requested checkout step is not available"
            );
        }
        debug!(order_id = %self.order().id(), step_id = %step_id, "resolved checkout step");
        self.base_mut().set_step_id(Some(step_id.clone()));
        Ok(step_id)
    }

    /// Build the form of the current step
    fn build_form(&self, state: &FormState) -> CheckoutResult<FormElement> {
        let mut form = step_form(self)?;
        form.set_child("actions", self.actions());
        Ok(form)
    }

    fn validate_form(&mut self, form: &FormElement, state: &mut FormState) {}

    /// Save the order and move to the next step
    fn submit_form(
        &mut self,
        form: &FormElement,
        state: &mut FormState,
        storage: &dyn OrderStorage,
    ) -> CheckoutResult<()> {
        finish_submission(self, state, storage)
    }

    /// Go back one step. Nothing is saved.
    fn previous_form(&self, state: &mut FormState) {
        if let Some(previous_step_id) = self.previous_step_id() {
            state.set_redirect(Redirect::new(self.order().id(), previous_step_id));
        }
    }

    /// Navigation buttons of the current step
    fn actions(&self) -> FormElement {
        navigation_actions(self)
    }

    fn build_configuration_form(&self, state: &FormState) -> CheckoutResult<FormElement> {
        Ok(FormElement::container())
    }

    fn validate_configuration_form(&self, state: &mut FormState) -> CheckoutResult<()> {
        Ok(())
    }

    fn submit_configuration_form(&mut self, state: &mut FormState) -> CheckoutResult<()> {
        Ok(())
    }

    /// Downcast to a pane-driven flow, for the overview editor
    fn as_pane_flow(&self) -> Option<&PaneFlow> {
        None
    }

    fn as_pane_flow_mut(&mut self) -> Option<&mut PaneFlow> {
        None
    }
}

/// Type alias for a boxed flow (dynamic dispatch)
pub type BoxedFlow = Box<dyn CheckoutFlow>;

/// Form skeleton of the current step, titled with the step label
pub fn step_form<F: CheckoutFlow + ?Sized>(flow: &F) -> CheckoutResult<FormElement> {
    let step_id = flow.step_id().unwrap_or_default();
    let steps = flow.visible_steps();
    let step = steps.get(step_id).ok_or_else(|| CheckoutError::StepNotFound {
        step_id: step_id.to_string(),
    })?;
    Ok(FormElement::container().with_title(step.label.clone()))
}

/// Buttons are shown when the target step exists and defines a label for
/// them. The customer cannot leave `offsite_payment` by navigation.
pub fn navigation_actions<F: CheckoutFlow + ?Sized>(flow: &F) -> FormElement {
    let mut actions = FormElement::new(ElementKind::Actions);
    let steps = flow.visible_steps();

    let previous_label = flow
        .previous_step_id()
        .and_then(|step_id| steps.get(&step_id))
        .and_then(|step| step.previous_label.clone());
    if let Some(label) = previous_label {
        actions.set_child("previous", FormElement::submit(label, OP_PREVIOUS));
    }

    let next_label = flow
        .next_step_id()
        .and_then(|step_id| steps.get(&step_id))
        .and_then(|step| step.next_label.clone());
    if let Some(label) = next_label {
        actions.set_child(
            "next",
            FormElement::submit(label, OP_NEXT).with_class("button--primary"),
        );
    }

    actions.access = !actions.children.is_empty();
    if flow.step_id() == Some(OFFSITE_PAYMENT) {
        actions.access = false;
    }
    actions
}

/// Advance the order: record the next step, save, redirect, and fire the
/// completion hook when the next step is `complete`.
///
/// Does nothing while the form state holds validation errors. The order is
/// already saved when the completion hook runs, so a failing subscriber is
/// logged and the redirect stands.
pub fn finish_submission<F: CheckoutFlow + ?Sized>(
    flow: &mut F,
    state: &mut FormState,
    storage: &dyn OrderStorage,
) -> CheckoutResult<()> {
    if state.has_errors() {
        debug!("submission blocked by {} form errors", state.errors().len());
        return Ok(());
    }

    let next_step_id = flow.next_step_id();
    if let Some(next_step_id) = &next_step_id {
        flow.base_mut().order_mut().checkout_step = Some(next_step_id.clone());
    }
    storage.save(flow.order())?;

    let Some(next_step_id) = next_step_id else {
        debug!(order_id = %flow.order().id(), "no next step, checkout flow ends");
        return Ok(());
    };

    info!(
        order_id = %flow.order().id(),
        from = flow.step_id().unwrap_or_default(),
        to = %next_step_id,
        "checkout step advanced"
    );
    state.set_redirect(Redirect::new(flow.order().id(), next_step_id.clone()));

    if next_step_id == COMPLETE {
        if let Err(e) = dispatch_checkout_complete(flow.base().subscribers(), flow.order()) {
            error!(order_id = %flow.order().id(), error = %e, "checkout completion subscriber failed");
        }
    }
    Ok(())
}

/// Result of one checkout request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FormOutcome {
    /// Show the (re)built form; errors stay in the form state
    Render { form: FormElement },
    /// Send the customer to another step
    Redirect { redirect: Redirect },
}

/// Run one request/response cycle of a checkout form.
///
/// Without a triggering operation the current step is rendered. `previous`
/// redirects without saving; `next` validates, and only an error-free state
/// reaches submission.
pub fn process_form(
    flow: &mut dyn CheckoutFlow,
    state: &mut FormState,
    storage: &dyn OrderStorage,
) -> CheckoutResult<FormOutcome> {
    let form = flow.build_form(state)?;
    let Some(op) = state.triggering_op().map(str::to_string) else {
        return Ok(FormOutcome::Render { form });
    };

    if form.find_op(&op).is_none() {
        warn!(op = %op, step_id = flow.step_id().unwrap_or_default(), "operation not available on this step");
        return Ok(FormOutcome::Render { form });
    }

    match op.as_str() {
        OP_PREVIOUS => flow.previous_form(state),
        OP_NEXT => {
            flow.validate_form(&form, state);
            if state.has_errors() {
                return Ok(FormOutcome::Render {
                    form: flow.build_form(state)?,
                });
            }
            flow.submit_form(&form, state, storage)?;
        }
        _ => {}
    }

    match state.redirect() {
        Some(redirect) => Ok(FormOutcome::Redirect {
            redirect: redirect.clone(),
        }),
        None => Ok(FormOutcome::Render {
            form: flow.build_form(state)?,
        }),
    }
}

/// Flow whose steps are declared in code and carry no panes
pub struct BasicFlow {
    base: FlowBase,
    declared: StepMap,
}

impl BasicFlow {
    pub fn new(base: FlowBase, declared: StepMap) -> Self {
        Self { base, declared }
    }
}

impl CheckoutFlow for BasicFlow {
    fn base(&self) -> &FlowBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut FlowBase {
        &mut self.base
    }

    fn steps(&self) -> StepMap {
        with_builtin_steps(self.declared.clone())
    }
}
