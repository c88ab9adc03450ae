//! # checkout-panes
//!
//! Built-in checkout panes and flow types for paneflow-rs.
//!
//! | Pane               | Default step      | Settings                              |
//! |--------------------|-------------------|---------------------------------------|
//! | `login`            | `login`           | `allow_guest_checkout`                |
//! | `review`           | `review`          |                                       |
//! | `payment_redirect` | `offsite_payment` | `redirect_method`, `redirect_url`     |
//! | `complete_message` | `complete`        | `message`                             |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use checkout_panes::{builtin_flow_types, builtin_pane_registry, CheckoutCatalog};
//!
//! let catalog = CheckoutCatalog::from_toml(&content)?.with_defaults();
//! let panes = Arc::new(builtin_pane_registry(Arc::new(catalog.authenticator()))?);
//! let flow_types = builtin_flow_types(panes);
//! ```

pub mod catalog;
pub mod complete;
pub mod flow_types;
pub mod login;
pub mod payment_redirect;
pub mod review;

// Re-exports
pub use catalog::{AccountRecord, CatalogAuthenticator, CheckoutCatalog, DEFAULT_FLOW, DEFAULT_ORDER_TYPE};
pub use complete::{CompletionMessagePane, COMPLETION_MESSAGE_PANE};
pub use flow_types::{builtin_flow_types, multistep_default_steps, MULTISTEP_DEFAULT};
pub use login::{is_valid_email, LoginPane, LOGIN_PANE};
pub use payment_redirect::{PaymentRedirectPane, PAYMENT_REDIRECT_PANE};
pub use review::{ReviewPane, REVIEW_PANE};

use checkout_core::{Authenticator, CheckoutResult, PaneRegistry, PaneRegistryBuilder};
use std::sync::Arc;

/// Registry builder preloaded with the built-in panes
pub fn builtin_panes(authenticator: Arc<dyn Authenticator>) -> PaneRegistryBuilder {
    PaneRegistry::builder()
        .with_pane(LoginPane::registration(authenticator))
        .with_pane(ReviewPane::registration())
        .with_pane(PaymentRedirectPane::registration())
        .with_pane(CompletionMessagePane::registration())
}

/// Pane registry with only the built-in panes
pub fn builtin_pane_registry(authenticator: Arc<dyn Authenticator>) -> CheckoutResult<PaneRegistry> {
    builtin_panes(authenticator).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkout_core::{
        build_overview, merge::settings, multistep_submit, process_form, reconcile,
        CheckoutSubscriber, EditorOp, FlowConfig, FormOutcome, FormState, NullStorage, Order,
        Redirect, RegionStatus,
    };
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn flow_types(subscriber: Option<Arc<dyn CheckoutSubscriber>>) -> checkout_core::FlowTypeRegistry {
        let panes = Arc::new(builtin_pane_registry(Arc::new(CatalogAuthenticator::default())).unwrap());
        let registry = builtin_flow_types(panes);
        match subscriber {
            Some(subscriber) => registry.with_subscriber(subscriber),
            None => registry,
        }
    }

    fn open(order: Order, step: Option<&str>) -> checkout_core::BoxedFlow {
        let mut flow = flow_types(None)
            .create(&FlowConfig::new("default", "Default", MULTISTEP_DEFAULT), order)
            .unwrap();
        flow.resolve_step(step).unwrap();
        flow
    }

    #[test]
    fn test_builtin_registry_order() {
        let registry = builtin_pane_registry(Arc::new(CatalogAuthenticator::default())).unwrap();
        assert_eq!(
            registry.pane_ids(),
            ["login", "review", "payment_redirect", "complete_message"]
        );
    }

    #[test]
    fn test_default_flow_steps() {
        let flow = open(Order::new("default"), None);
        let visible: Vec<String> = flow.visible_steps().keys().cloned().collect();

        // order_information has no built-in pane
        assert_eq!(visible, ["login", "review", "offsite_payment", "complete"]);
        assert_eq!(flow.step_id(), Some("login"));
    }

    #[test]
    fn test_guest_walks_to_review() {
        let mut flow = open(Order::new("default").with_id("100"), Some("login"));
        let mut state = FormState::submitted(
            "next",
            settings(json!({ "login": { "email": "guest@example.com" } })),
        );

        let outcome = process_form(flow.as_mut(), &mut state, &NullStorage).unwrap();

        assert_eq!(
            outcome,
            FormOutcome::Redirect {
                redirect: Redirect::new("100", "review")
            }
        );
        assert_eq!(flow.order().email(), Some("guest@example.com"));
    }

    #[test]
    fn test_offsite_payment_to_complete_fires_subscribers() {
        struct Counter(AtomicUsize);
        impl CheckoutSubscriber for Counter {
            fn on_checkout_complete(&self, _order: &Order) -> CheckoutResult<()> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }

        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        let mut flow = flow_types(Some(counter.clone() as Arc<dyn CheckoutSubscriber>))
            .create(&FlowConfig::new("default", "Default", MULTISTEP_DEFAULT), Order::new("default"))
            .unwrap();
        flow.resolve_step(Some("offsite_payment")).unwrap();

        let form = flow.build_form(&FormState::new()).unwrap();
        assert!(!form.child("actions").unwrap().access);
        assert!(form.child("payment_redirect").is_some());

        let mut state = FormState::new();
        flow.submit_form(&form, &mut state, &NullStorage).unwrap();

        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        assert_eq!(flow.order().checkout_step.as_deref(), Some("complete"));
    }

    #[test]
    fn test_login_settings_round_trip_through_editor() {
        let mut flow = open(Order::new("default"), None);
        let pane_flow = flow.as_pane_flow_mut().unwrap();

        let mut state = FormState::new();
        multistep_submit(&mut state, EditorOp::Edit, "login");
        let mut submission = build_overview(pane_flow, &state).unwrap().submission();
        submission["panes"]["login"]["settings"] = json!({ "allow_guest_checkout": "1", "foo": "bar" });

        let configuration = reconcile(&submission, &mut state, pane_flow).unwrap();

        assert_eq!(
            configuration["login"]["login"],
            json!({ "step": "login", "weight": 0, "allow_guest_checkout": "1" })
        );
        assert_eq!(configuration["order_information"], json!({}));

        let overview = build_overview(pane_flow, &FormState::new()).unwrap();
        assert_eq!(overview.region("order_information").unwrap().status, RegionStatus::Empty);
        assert_eq!(
            overview.row("login").unwrap().mode,
            checkout_core::RowMode::Viewing {
                summary: vec!["Guest checkout: Allowed".into()],
                editable: true
            }
        );
    }
}
