//! # Checkout Subscribers
//!
//! Hooks fired by the flow at its transition points. The flow only invokes
//! them; what they do (mails, fulfillment) belongs to the host.

use crate::error::CheckoutResult;
use crate::order::Order;
use std::sync::Arc;
use tracing::info;

/// Checkout event subscriber
///
/// Implement this trait to react to checkout transitions.
#[allow(unused_variables)]
pub trait CheckoutSubscriber: Send + Sync {
    /// Called when an order moves into the `complete` step
    fn on_checkout_complete(&self, order: &Order) -> CheckoutResult<()> {
        info!(
            "Checkout completed: order={}, email={:?}",
            order.id(),
            order.email()
        );
        Ok(())
    }
}

/// Default subscriber (just logs events)
pub struct LoggingSubscriber;

impl CheckoutSubscriber for LoggingSubscriber {}

/// Type alias for a shared subscriber
pub type BoxedSubscriber = Arc<dyn CheckoutSubscriber>;

/// Notify every subscriber of a completed checkout, stopping at the first error
pub fn dispatch_checkout_complete(subscribers: &[BoxedSubscriber], order: &Order) -> CheckoutResult<()> {
    for subscriber in subscribers {
        subscriber.on_checkout_complete(order)?;
    }
    Ok(())
}
