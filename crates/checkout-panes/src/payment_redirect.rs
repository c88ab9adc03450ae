//! # Payment Redirect Pane
//!
//! Sits on `offsite_payment` and hands the customer over to an external
//! payment page. The gateway itself is out of reach of this crate: the pane
//! only describes where and how to go.

use checkout_core::{
    BoxedPane, ElementKind, FormElement, FormState, Order, Pane, PaneBase, PaneDefinition,
    PaneRegistration, Settings, OFFSITE_PAYMENT,
};
use serde_json::Value;

pub const PAYMENT_REDIRECT_PANE: &str = "payment_redirect";

const REDIRECT_METHOD: &str = "redirect_method";
const REDIRECT_URL: &str = "redirect_url";

/// Offsite payment hand-over
pub struct PaymentRedirectPane {
    base: PaneBase,
}

impl PaymentRedirectPane {
    pub fn new(base: PaneBase) -> Self {
        Self { base }
    }

    pub fn definition() -> PaneDefinition {
        let mut defaults = Settings::new();
        defaults.insert(REDIRECT_METHOD.to_string(), Value::String("post".to_string()));
        defaults.insert(REDIRECT_URL.to_string(), Value::String(String::new()));
        PaneDefinition::new(PAYMENT_REDIRECT_PANE, "Payment redirect")
            .with_default_step(OFFSITE_PAYMENT)
            .with_default_configuration(defaults)
    }

    pub fn registration() -> PaneRegistration {
        PaneRegistration::new(Self::definition(), |base| {
            Box::new(PaymentRedirectPane::new(base)) as BoxedPane
        })
    }

    pub fn redirect_method(&self) -> &str {
        self.base
            .setting(REDIRECT_METHOD)
            .and_then(Value::as_str)
            .unwrap_or("post")
    }

    pub fn redirect_url(&self) -> &str {
        self.base
            .setting(REDIRECT_URL)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }
}

impl Pane for PaymentRedirectPane {
    fn base(&self) -> &PaneBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut PaneBase {
        &mut self.base
    }

    fn configuration_summary(&self) -> Vec<String> {
        let mut summary = vec![format!(
            "Redirect method: {}",
            self.redirect_method().to_uppercase()
        )];
        if !self.redirect_url().is_empty() {
            summary.push(format!("Redirect URL: {}", self.redirect_url()));
        }
        summary
    }

    fn build_configuration_form(&self) -> FormElement {
        FormElement::container()
            .with_child(
                REDIRECT_METHOD,
                FormElement::field(ElementKind::Select, "Redirect method")
                    .with_options([("get", "Redirect via GET"), ("post", "Redirect via POST")])
                    .with_default(self.redirect_method()),
            )
            .with_child(
                REDIRECT_URL,
                FormElement::field(ElementKind::Textfield, "Redirect URL")
                    .with_default(self.redirect_url()),
            )
    }

    fn validate_configuration_form(&self, values: &Settings, state: &mut FormState) {
        let pane_id = self.base.id();
        if let Some(method) = values.get(REDIRECT_METHOD).and_then(Value::as_str) {
            if !matches!(method, "get" | "post") {
                state.set_error(
                    &["panes", pane_id, "settings", REDIRECT_METHOD],
                    "The redirect method must be GET or POST.",
                );
            }
        }
        if let Some(url) = values.get(REDIRECT_URL).and_then(Value::as_str) {
            if !url.is_empty() && !url.starts_with("https://") && !url.starts_with("http://") {
                state.set_error(
                    &["panes", pane_id, "settings", REDIRECT_URL],
                    "The redirect URL must be an absolute http(s) URL.",
                );
            }
        }
    }

    fn build_pane_form(&self, pane_form: FormElement, _state: &FormState, order: &Order) -> FormElement {
        let mut form = pane_form.with_child(
            "notice",
            FormElement::markup(
                "Please wait while you are redirected to the payment server. If nothing happens within 10 seconds, please click on the button below.",
            ),
        );
        form.set_child(
            "order_id",
            FormElement::new(ElementKind::Hidden).with_default(order.id()),
        );
        form.set_child(
            "redirect",
            FormElement::container()
                .with_class(format!("redirect-{}", self.redirect_method()))
                .with_default(self.redirect_url()),
        );
        form
    }
}
