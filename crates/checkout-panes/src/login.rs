//! # Login Pane
//!
//! Lets an anonymous customer continue as a guest (contact email) or sign
//! in to an existing account. Hidden once the order has an owner.
//!
//! Fieldsets do not nest values: the pane's fields submit as
//! `values[login][email]`, `values[login][name]` and `values[login][pass]`.

use checkout_core::{
    is_truthy, Account, Authenticator, BoxedPane, CheckoutResult, ElementKind, FormElement,
    FormState, Order, Pane, PaneBase, PaneDefinition, PaneRegistration, Settings,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const LOGIN_PANE: &str = "login";

const ALLOW_GUEST_CHECKOUT: &str = "allow_guest_checkout";

/// Form state key carrying the authenticated account from validation to submission
const AUTHENTICATED_ACCOUNT: &str = "login_account";

/// Login / guest checkout pane
pub struct LoginPane {
    base: PaneBase,
    authenticator: Arc<dyn Authenticator>,
}

impl LoginPane {
    pub fn new(base: PaneBase, authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            base,
            authenticator,
        }
    }

    pub fn definition() -> PaneDefinition {
        let mut defaults = Settings::new();
        defaults.insert(ALLOW_GUEST_CHECKOUT.to_string(), Value::Bool(true));
        PaneDefinition::new(LOGIN_PANE, "Login or continue as guest")
            .with_default_step("login")
            .with_default_configuration(defaults)
    }

    /// Registration whose factory shares `authenticator` with every instance
    pub fn registration(authenticator: Arc<dyn Authenticator>) -> PaneRegistration {
        PaneRegistration::new(Self::definition(), move |base| {
            Box::new(LoginPane::new(base, authenticator.clone())) as BoxedPane
        })
    }

    pub fn allows_guest_checkout(&self) -> bool {
        is_truthy(self.base.setting(ALLOW_GUEST_CHECKOUT))
    }

    fn field<'a>(&self, state: &'a FormState, name: &str) -> Option<&'a str> {
        state.value_str(&[self.base.id(), name])
    }
}

/// Loose syntactic check: one `@`, a non-empty local part, a dotted domain
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

impl Pane for LoginPane {
    fn base(&self) -> &PaneBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut PaneBase {
        &mut self.base
    }

    fn configuration_summary(&self) -> Vec<String> {
        if self.allows_guest_checkout() {
            vec!["Guest checkout: Allowed".to_string()]
        } else {
            vec!["Guest checkout: Not allowed".to_string()]
        }
    }

    fn build_configuration_form(&self) -> FormElement {
        FormElement::container().with_child(
            ALLOW_GUEST_CHECKOUT,
            FormElement::field(ElementKind::Checkbox, "Allow guest checkout")
                .with_default(self.allows_guest_checkout()),
        )
    }

    fn is_visible(&self, order: &Order) -> bool {
        order.owner().is_anonymous()
    }

    fn build_pane_form(&self, pane_form: FormElement, _state: &FormState, order: &Order) -> FormElement {
        let mut guest = FormElement::fieldset().with_title("Guest checkout").with_child(
            "email",
            FormElement::field(ElementKind::Email, "Email address")
                .with_description("We will email your order confirmation to this address")
                .with_default(order.email().unwrap_or_default()),
        );
        guest.access = self.allows_guest_checkout();

        let existing = FormElement::fieldset()
            .with_title("Returning customer")
            .with_child("name", FormElement::field(ElementKind::Textfield, "Username"))
            .with_child(
                "pass",
                FormElement::field(ElementKind::Password, "Password")
                    .with_description("Enter the password that accompanies your username."),
            );

        pane_form
            .with_child("guest", guest)
            .with_child("existing", existing)
    }

    fn validate_pane_form(&self, _pane_form: &FormElement, state: &mut FormState, _order: &Order) {
        let pane_id = self.base.id();
        let name = self.field(state, "name").map(str::to_string);
        let pass = self.field(state, "pass").map(str::to_string);

        if name.is_some() || pass.is_some() {
            let Some(name) = name else {
                state.set_error(&[pane_id, "name"], "Username field is required.");
                return;
            };
            match self.authenticator.authenticate(&name, pass.as_deref().unwrap_or_default()) {
                Some(account) => match serde_json::to_value(&account) {
                    Ok(account_value) => {
                        debug!(uid = account.uid, "checkout login accepted");
                        state.set(AUTHENTICATED_ACCOUNT, account_value);
                    }
                    Err(e) => {
                        warn!(error = %e, "authenticated account could not be stored");
                        state.set_error(&[pane_id, "name"], "Unrecognized username or password.");
                    }
                },
                None => {
                    state.set_error(&[pane_id, "name"], "Unrecognized username or password.");
                }
            }
            return;
        }

        if !self.allows_guest_checkout() {
            state.set_error(&[pane_id, "name"], "Log in to continue checkout.");
            return;
        }
        match self.field(state, "email").map(str::to_string) {
            Some(email) if is_valid_email(&email) => {}
            Some(email) => {
                let message = format!("The email address {email} is not valid.");
                state.set_error(&[pane_id, "email"], message);
            }
            None => state.set_error(&[pane_id, "email"], "Email address field is required."),
        }
    }

    fn submit_pane_form(
        &mut self,
        _pane_form: &FormElement,
        state: &mut FormState,
        order: &mut Order,
    ) -> CheckoutResult<()> {
        if let Some(account) = state.get(AUTHENTICATED_ACCOUNT).cloned() {
            let account: Account = serde_json::from_value(account)?;
            info!(order_id = %order.id(), uid = account.uid, "order assigned to customer");
            order.set_owner(account);
        } else if let Some(email) = self.field(state, "email") {
            order.set_email(email);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use checkout_core::{merge::settings, PaneRegistry};

    struct Accounts;

    impl Authenticator for Accounts {
        fn authenticate(&self, name: &str, password: &str) -> Option<Account> {
            (name == "ada" && password == "secret")
                .then(|| Account::new(5, "ada").with_email("ada@example.com"))
        }
    }

    fn pane(configuration: Value) -> BoxedPane {
        PaneRegistry::discover([LoginPane::registration(Arc::new(Accounts))])
            .unwrap()
            .create_instance(LOGIN_PANE, &settings(configuration))
            .unwrap()
    }

    fn submit(pane: &mut BoxedPane, values: Value, order: &mut Order) -> FormState {
        let mut state = FormState::submitted("next", settings(json!({ "login": values })));
        let form = pane.build_pane_form(FormElement::fieldset(), &state, order);
        pane.validate_pane_form(&form, &mut state, order);
        if !state.has_errors() {
            pane.submit_pane_form(&form, &mut state, order).unwrap();
        }
        state
    }

    #[test]
    fn test_defaults_and_summary() {
        let pane = pane(json!({}));

        assert_eq!(pane.step_id(), "login");
        assert!(pane.is_visible(&Order::new("default")));
        assert_eq!(pane.configuration_summary(), ["Guest checkout: Allowed"]);
    }

    #[test]
    fn test_summary_when_guests_not_allowed() {
        let pane = pane(json!({ "allow_guest_checkout": false }));
        assert_eq!(pane.configuration_summary(), ["Guest checkout: Not allowed"]);
    }

    #[test]
    fn test_hidden_for_owned_orders() {
        let pane = pane(json!({}));
        let order = Order::new("default").with_owner(checkout_core::Owner::User(Account::new(1, "x")));
        assert!(!pane.is_visible(&order));
    }

    #[test]
    fn test_guest_email_is_set() {
        let mut pane = pane(json!({}));
        let mut order = Order::new("default");

        let state = submit(&mut pane, json!({ "email": "guest@example.com" }), &mut order);

        assert!(!state.has_errors());
        assert_eq!(order.email(), Some("guest@example.com"));
        assert!(order.owner().is_anonymous());
    }

    #[test]
    fn test_invalid_guest_email_is_rejected() {
        let mut pane = pane(json!({}));
        let mut order = Order::new("default");

        let state = submit(&mut pane, json!({ "email": "not-an-email" }), &mut order);

        assert!(state.errors().contains_key("login][email"));
        assert_eq!(order.email(), None);
    }

    #[test]
    fn test_existing_account_login_sets_owner() {
        let mut pane = pane(json!({}));
        let mut order = Order::new("default");

        let state = submit(&mut pane, json!({ "name": "ada", "pass": "secret" }), &mut order);

        assert!(!state.has_errors());
        assert_eq!(order.owner().account().map(|a| a.uid), Some(5));
        assert_eq!(order.email(), Some("ada@example.com"));
    }

    #[test]
    fn test_wrong_password_is_rejected() {
        let mut pane = pane(json!({}));
        let mut order = Order::new("default");

        let state = submit(&mut pane, json!({ "name": "ada", "pass": "nope" }), &mut order);

        assert_eq!(
            state.errors().get("login][name").map(String::as_str),
            Some("Unrecognized username or password.")
        );
        assert!(order.owner().is_anonymous());
    }

    #[test]
    fn test_guest_checkout_disabled_requires_login() {
        let mut pane = pane(json!({ "allow_guest_checkout": false }));
        let mut order = Order::new("default");

        let form = pane.build_pane_form(FormElement::fieldset(), &FormState::new(), &order);
        assert!(!form.child("guest").unwrap().access);

        let state = submit(&mut pane, json!({ "email": "guest@example.com" }), &mut order);
        assert!(state.errors().contains_key("login][name"));
        assert_eq!(order.email(), None);
    }

    #[test]
    fn test_email_syntax() {
        assert!(is_valid_email("a@b.io"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("@b.io"));
        assert!(!is_valid_email("a@@b.io"));
        assert!(!is_valid_email("a b@c.io"));
    }
}
