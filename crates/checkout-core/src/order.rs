//! # Order Types
//!
//! The order as seen by checkout. Orders belong to the host application:
//! checkout reads them, lets panes mutate them, and saves them through
//! [`OrderStorage`]. It never creates or deletes them on its own.

use crate::error::CheckoutResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered customer account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// User ID
    pub uid: u64,
    /// Account name
    pub name: String,
    /// Account email
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Account {
    pub fn new(uid: u64, name: impl Into<String>) -> Self {
        Self {
            uid,
            name: name.into(),
            email: None,
        }
    }

    /// Builder: set account email
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Who owns an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Owner {
    /// Guest checkout (no account yet)
    #[default]
    Anonymous,
    /// Authenticated customer
    User(Account),
}

impl Owner {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Owner::Anonymous)
    }

    pub fn account(&self) -> Option<&Account> {
        match self {
            Owner::Anonymous => None,
            Owner::User(account) => Some(account),
        }
    }
}

/// An order going through checkout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Unique order ID
    pub id: String,

    /// Order type (bundle), used to resolve the default checkout flow
    pub order_type: String,

    /// Contact email
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Order owner
    #[serde(default)]
    pub owner: Owner,

    /// Assigned checkout flow ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkout_flow: Option<String>,

    /// Current checkout step ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkout_step: Option<String>,

    /// Created timestamp
    #[serde(default = "chrono::Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Create a new anonymous order with generated ID
    pub fn new(order_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            order_type: order_type.into(),
            email: None,
            owner: Owner::Anonymous,
            checkout_flow: None,
            checkout_step: None,
            created_at: Utc::now(),
        }
    }

    /// Builder: set a fixed ID
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Builder: set the owner
    pub fn with_owner(mut self, owner: Owner) -> Self {
        self.owner = owner;
        self
    }

    /// Builder: assign a checkout flow
    pub fn with_checkout_flow(mut self, flow_id: impl Into<String>) -> Self {
        self.checkout_flow = Some(flow_id.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The order type (bundle)
    pub fn bundle(&self) -> &str {
        &self.order_type
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn set_email(&mut self, email: impl Into<String>) {
        self.email = Some(email.into());
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    /// Assign an account as owner. The account email becomes the contact
    /// email when the order has none yet.
    pub fn set_owner(&mut self, account: Account) {
        if self.email.is_none() {
            self.email = account.email.clone();
        }
        self.owner = Owner::User(account);
    }
}

/// An order type and its checkout settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderType {
    pub id: String,
    /// Flow assigned to new orders of this type
    pub checkout_flow: String,
}

/// Persistence collaborator for orders
pub trait OrderStorage: Send + Sync {
    /// Persist the order (last write wins)
    fn save(&self, order: &Order) -> CheckoutResult<()>;
}

/// Credential check used by the login pane
pub trait Authenticator: Send + Sync {
    /// The account matching the credentials, if any
    fn authenticate(&self, name: &str, password: &str) -> Option<Account>;
}

/// Storage that keeps nothing (render-only contexts, tests)
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStorage;

impl OrderStorage for NullStorage {
    fn save(&self, _order: &Order) -> CheckoutResult<()> {
        Ok(())
    }
}
