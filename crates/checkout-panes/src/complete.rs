//! # Completion Message Pane

use checkout_core::{
    BoxedPane, ElementKind, FormElement, FormState, Order, Pane, PaneBase, PaneDefinition,
    PaneRegistration, Settings, COMPLETE,
};
use serde_json::Value;

pub const COMPLETION_MESSAGE_PANE: &str = "complete_message";

const MESSAGE: &str = "message";
const DEFAULT_MESSAGE: &str = "You did it!";

/// Message shown once the order is placed
pub struct CompletionMessagePane {
    base: PaneBase,
}

impl CompletionMessagePane {
    pub fn new(base: PaneBase) -> Self {
        Self { base }
    }

    pub fn definition() -> PaneDefinition {
        let mut defaults = Settings::new();
        defaults.insert(MESSAGE.to_string(), Value::String(DEFAULT_MESSAGE.to_string()));
        PaneDefinition::new(COMPLETION_MESSAGE_PANE, "Completion message")
            .with_default_step(COMPLETE)
            .with_default_configuration(defaults)
    }

    pub fn registration() -> PaneRegistration {
        PaneRegistration::new(Self::definition(), |base| {
            Box::new(CompletionMessagePane::new(base)) as BoxedPane
        })
    }

    pub fn message(&self) -> &str {
        self.base
            .setting(MESSAGE)
            .and_then(Value::as_str)
            .filter(|message| !message.trim().is_empty())
            .unwrap_or(DEFAULT_MESSAGE)
    }
}

impl Pane for CompletionMessagePane {
    fn base(&self) -> &PaneBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut PaneBase {
        &mut self.base
    }

    fn configuration_summary(&self) -> Vec<String> {
        vec![format!("Message: {}", self.message())]
    }

    fn build_configuration_form(&self) -> FormElement {
        FormElement::container().with_child(
            MESSAGE,
            FormElement::field(ElementKind::Textfield, "Message")
                .with_default(self.message())
                .required(),
        )
    }

    fn validate_configuration_form(&self, values: &Settings, state: &mut FormState) {
        let blank = values
            .get(MESSAGE)
            .and_then(Value::as_str)
            .map_or(true, |message| message.trim().is_empty());
        if blank {
            state.set_error(
                &["panes", self.base.id(), "settings", MESSAGE],
                "Message field is required.",
            );
        }
    }

    fn build_pane_form(&self, pane_form: FormElement, _state: &FormState, order: &Order) -> FormElement {
        pane_form
            .with_child("message", FormElement::markup(self.message()))
            .with_child(
                "order_number",
                FormElement::markup(format!("Your order number is {}.", order.id())),
            )
    }
}
