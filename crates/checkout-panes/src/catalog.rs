//! # Checkout Catalog
//!
//! Order types, flows, customer accounts and sample orders loaded from
//! `config/checkout.toml`.
//!
//! ```toml
//! [[order_types]]
//! id = "default"
//! checkout_flow = "default"
//!
//! [[flows]]
//! id = "default"
//! label = "Default"
//! plugin = "multistep_default"
//!
//! [flows.configuration.review.review]
//! step = "review"
//! weight = 0
//! ```

use crate::flow_types::MULTISTEP_DEFAULT;
use checkout_core::{Account, Authenticator, FlowConfig, Order, OrderType};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// ID of the flow present in every catalog
pub const DEFAULT_FLOW: &str = "default";

/// ID of the order type present in every catalog, checked out through
/// [`DEFAULT_FLOW`]
pub const DEFAULT_ORDER_TYPE: &str = "default";

/// A customer account with its password, for the in-memory authenticator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRecord {
    #[serde(flatten)]
    pub account: Account,
    pub password: String,
}

/// Catalog of checkout configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutCatalog {
    #[serde(default)]
    pub order_types: Vec<OrderType>,

    #[serde(default)]
    pub flows: Vec<FlowConfig>,

    #[serde(default)]
    pub accounts: Vec<AccountRecord>,

    /// Orders to seed the store with
    #[serde(default)]
    pub orders: Vec<Order>,
}

impl CheckoutCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load catalog from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    pub fn flow(&self, flow_id: &str) -> Option<&FlowConfig> {
        self.flows.iter().find(|flow| flow.id == flow_id)
    }

    pub fn order_type(&self, order_type: &str) -> Option<&OrderType> {
        self.order_types.iter().find(|t| t.id == order_type)
    }

    /// Add the `default` flow and order type unless the catalog defines them
    pub fn with_defaults(mut self) -> Self {
        if self.flow(DEFAULT_FLOW).is_none() {
            debug!("adding built-in default checkout flow");
            self.flows
                .push(FlowConfig::new(DEFAULT_FLOW, "Default", MULTISTEP_DEFAULT));
        }
        if self.order_type(DEFAULT_ORDER_TYPE).is_none() {
            self.order_types.push(OrderType {
                id: DEFAULT_ORDER_TYPE.to_string(),
                checkout_flow: DEFAULT_FLOW.to_string(),
            });
        }
        self
    }

    pub fn authenticator(&self) -> CatalogAuthenticator {
        CatalogAuthenticator {
            accounts: self.accounts.clone(),
        }
    }
}

/// Authenticates against the catalog's accounts
#[derive(Debug, Clone, Default)]
pub struct CatalogAuthenticator {
    accounts: Vec<AccountRecord>,
}

impl Authenticator for CatalogAuthenticator {
    fn authenticate(&self, name: &str, password: &str) -> Option<Account> {
        self.accounts
            .iter()
            .find(|record| record.account.name == name && record.password == password)
            .map(|record| record.account.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CATALOG: &str = r#"
[[order_types]]
id = "digital"
checkout_flow = "express"

[[flows]]
id = "express"
label = "Express"
plugin = "multistep_default"

[flows.configuration.login.login]
step = "login"
weight = 0
allow_guest_checkout = false

[flows.configuration.review]

[[accounts]]
uid = 4
name = "ada"
email = "ada@example.com"
password = "secret"

[[orders]]
id = "1001"
order_type = "digital"
"#;

    #[test]
    fn test_parse_catalog() {
        let catalog = CheckoutCatalog::from_toml(CATALOG).unwrap();

        let express = catalog.flow("express").unwrap();
        assert_eq!(express.plugin, "multistep_default");
        assert_eq!(
            express.configuration["login"]["login"]["allow_guest_checkout"],
            json!(false)
        );
        assert_eq!(express.configuration["review"], json!({}));
        assert_eq!(catalog.order_type("digital").unwrap().checkout_flow, "express");
        assert_eq!(catalog.orders[0].id(), "1001");
        assert!(catalog.orders[0].owner().is_anonymous());
    }

    #[test]
    fn test_defaults_added_once() {
        let catalog = CheckoutCatalog::from_toml(CATALOG).unwrap().with_defaults().with_defaults();

        assert_eq!(catalog.flows.len(), 2);
        assert_eq!(catalog.flow(DEFAULT_FLOW).unwrap().plugin, MULTISTEP_DEFAULT);
        assert_eq!(catalog.order_types.len(), 2);
        assert_eq!(
            catalog.order_type(DEFAULT_ORDER_TYPE).unwrap().checkout_flow,
            DEFAULT_FLOW
        );
    }

    #[test]
    fn test_authenticator_checks_password() {
        let authenticator = CheckoutCatalog::from_toml(CATALOG).unwrap().authenticator();

        assert_eq!(authenticator.authenticate("ada", "secret").map(|a| a.uid), Some(4));
        assert!(authenticator.authenticate("ada", "wrong").is_none());
        assert!(authenticator.authenticate("bob", "secret").is_none());
    }
}
