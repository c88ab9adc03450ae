//! # Checkout Error Types
//!
//! Typed error handling for the checkout state machine.
//! Field validation problems are not errors: they live in `FormState`.

use thiserror::Error;

/// Core error type for all checkout operations
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// A pane definition is missing a required property (discovery time)
    #[error("The checkout pane {pane_id} must define the {property} property.")]
    Definition { pane_id: String, property: String },

    /// Pane type not known to the registry
    #[error("Checkout pane not found: {pane_id}")]
    PaneNotFound { pane_id: String },

    /// Step not part of the flow
    #[error("Checkout step not found: {step_id}")]
    StepNotFound { step_id: String },

    /// Flow configuration not found
    #[error("Checkout flow not found: {flow_id}")]
    FlowNotFound { flow_id: String },

    /// Flow plugin (type tag) not registered
    #[error("Checkout flow type not found: {plugin}")]
    FlowTypeNotFound { plugin: String },

    /// Order not found in storage
    #[error("Order not found: {order_id}")]
    OrderNotFound { order_id: String },

    /// Order type (bundle) not found
    #[error("Order type not found: {order_type}")]
    OrderTypeNotFound { order_type: String },

    /// Malformed configuration tree or submission
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Storage collaborator failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CheckoutError {
    /// Returns true for errors caused by configuration rather than by input
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            CheckoutError::Definition { .. }
                | CheckoutError::FlowTypeNotFound { .. }
                | CheckoutError::InvalidConfiguration(_)
        )
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            CheckoutError::Definition { .. } => 500,
            CheckoutError::PaneNotFound { .. } => 404,
            CheckoutError::StepNotFound { .. } => 404,
            CheckoutError::FlowNotFound { .. } => 404,
            CheckoutError::FlowTypeNotFound { .. } => 500,
            CheckoutError::OrderNotFound { .. } => 404,
            CheckoutError::OrderTypeNotFound { .. } => 500,
            CheckoutError::InvalidConfiguration(_) => 400,
            CheckoutError::Storage(_) => 503,
            CheckoutError::Serialization(_) => 500,
        }
    }
}

impl From<serde_json::Error> for CheckoutError {
    fn from(err: serde_json::Error) -> Self {
        CheckoutError::Serialization(err.to_string())
    }
}

/// Result type alias for checkout operations
pub type CheckoutResult<T> = Result<T, CheckoutError>;
