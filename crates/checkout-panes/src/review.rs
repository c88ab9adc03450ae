//! # Review Pane
//!
//! Read-only recap of the order before payment.

use checkout_core::{BoxedPane, FormElement, FormState, Order, Owner, Pane, PaneBase, PaneDefinition, PaneRegistration};

pub const REVIEW_PANE: &str = "review";

/// Order recap shown on the review step
pub struct ReviewPane {
    base: PaneBase,
}

impl ReviewPane {
    pub fn new(base: PaneBase) -> Self {
        Self { base }
    }

    pub fn definition() -> PaneDefinition {
        PaneDefinition::new(REVIEW_PANE, "Review").with_default_step("review")
    }

    pub fn registration() -> PaneRegistration {
        PaneRegistration::new(Self::definition(), |base| {
            Box::new(ReviewPane::new(base)) as BoxedPane
        })
    }
}

impl Pane for ReviewPane {
    fn base(&self) -> &PaneBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut PaneBase {
        &mut self.base
    }

    fn build_pane_form(&self, pane_form: FormElement, _state: &FormState, order: &Order) -> FormElement {
        let customer = match order.owner() {
            Owner::Anonymous => "Guest".to_string(),
            Owner::User(account) => account.name.clone(),
        };
        pane_form
            .with_child(
                "contact",
                FormElement::markup(order.email().unwrap_or("No email address provided"))
                    .with_title("Contact information"),
            )
            .with_child("customer", FormElement::markup(customer).with_title("Customer"))
            .with_child(
                "order",
                FormElement::markup(format!("Order {}", order.id())).with_title("Order"),
            )
    }
}
