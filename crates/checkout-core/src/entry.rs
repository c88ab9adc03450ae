//! # Checkout Entry Point
//!
//! Resolves an order to its checkout flow and opens the flow on the right
//! step. Orders without a flow get their order type's default flow, saved
//! once.

use crate::error::CheckoutResult;
use crate::flow::BoxedFlow;
use crate::flow_type::{FlowConfig, FlowRepository, FlowTypeRegistry, OrderTypeRepository};
use crate::order::{Order, OrderStorage};
use tracing::{debug, info};

/// Collaborators needed to open a checkout
pub struct CheckoutEntry<'a> {
    orders: &'a dyn OrderStorage,
    flows: &'a dyn FlowRepository,
    order_types: &'a dyn OrderTypeRepository,
    flow_types: &'a FlowTypeRegistry,
}

impl<'a> CheckoutEntry<'a> {
    pub fn new(
        orders: &'a dyn OrderStorage,
        flows: &'a dyn FlowRepository,
        order_types: &'a dyn OrderTypeRepository,
        flow_types: &'a FlowTypeRegistry,
    ) -> Self {
        Self {
            orders,
            flows,
            order_types,
            flow_types,
        }
    }

    /// Flow configuration of the order, assigning the order type's default
    /// flow first if the order has none
    pub fn resolve_flow(&self, order: &mut Order) -> CheckoutResult<FlowConfig> {
        let flow_id = match &order.checkout_flow {
            Some(flow_id) => flow_id.clone(),
            None => {
                let order_type = self.order_types.load_order_type(order.bundle())?;
                info!(
                    order_id = %order.id(),
                    flow_id = %order_type.checkout_flow,
                    "assigning default checkout flow"
                );
                order.checkout_flow = Some(order_type.checkout_flow.clone());
                self.orders.save(order)?;
                order_type.checkout_flow
            }
        };
        self.flows.load_flow(&flow_id)
    }

    /// Instantiate the order's flow and resolve its current step
    pub fn open(&self, mut order: Order, route_step: Option<&str>) -> CheckoutResult<BoxedFlow> {
        let config = self.resolve_flow(&mut order)?;
        let mut flow = self.flow_types.create(&config, order)?;
        let step_id = flow.resolve_step(route_step)?;
        debug!(flow_id = %config.id, step_id = %step_id, "checkout opened");
        Ok(flow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CheckoutError;
    use crate::flow::BasicFlow;
    use crate::flow_type::FlowTypeDefinition;
    use crate::order::OrderType;
    use crate::step::{Step, StepMap};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Orders {
        saved: Mutex<Vec<Order>>,
    }

    impl OrderStorage for Orders {
        fn save(&self, order: &Order) -> CheckoutResult<()> {
            self.saved.lock().unwrap().push(order.clone());
            Ok(())
        }
    }

    struct Catalog;

    impl FlowRepository for Catalog {
        fn load_flow(&self, flow_id: &str) -> CheckoutResult<FlowConfig> {
            match flow_id {
                "default" => Ok(FlowConfig::new("default", "Default", "basic")),
                _ => Err(CheckoutError::FlowNotFound {
                    flow_id: flow_id.to_string(),
                }),
            }
        }
    }

    impl OrderTypeRepository for Catalog {
        fn load_order_type(&self, order_type: &str) -> CheckoutResult<OrderType> {
            match order_type {
                "default" => Ok(OrderType {
                    id: "default".into(),
                    checkout_flow: "default".into(),
                }),
                "broken" => Ok(OrderType {
                    id: "broken".into(),
                    checkout_flow: "gone".into(),
                }),
                _ => Err(CheckoutError::OrderTypeNotFound {
                    order_type: order_type.to_string(),
                }),
            }
        }
    }

    fn flow_types() -> FlowTypeRegistry {
        FlowTypeRegistry::new().with_flow_type(
            FlowTypeDefinition {
                id: "basic".into(),
                label: "Basic".into(),
            },
            |base| {
                let mut steps = StepMap::new();
                steps.insert("login".into(), Step::new("Login"));
                steps.insert("review".into(), Step::new("Review"));
                Box::new(BasicFlow::new(base, steps)) as BoxedFlow
            },
        )
    }

    #[test]
    fn test_default_flow_assigned_and_saved_once() {
        let orders = Orders::default();
        let registry = flow_types();
        let entry = CheckoutEntry::new(&orders, &Catalog, &Catalog, &registry);
        let mut order = Order::new("default");

        let config = entry.resolve_flow(&mut order).unwrap();
        assert_eq!(config.id, "default");
        assert_eq!(order.checkout_flow.as_deref(), Some("default"));

        entry.resolve_flow(&mut order).unwrap();
        assert_eq!(orders.saved.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_open_resolves_route_step() {
        let orders = Orders::default();
        let registry = flow_types();
        let entry = CheckoutEntry::new(&orders, &Catalog, &Catalog, &registry);

        let flow = entry.open(Order::new("default"), Some("review")).unwrap();
        assert_eq!(flow.step_id(), Some("review"));
        assert_eq!(flow.order().checkout_flow.as_deref(), Some("default"));

        let flow = entry.open(Order::new("default"), None).unwrap();
        assert_eq!(flow.step_id(), Some("login"));
    }

    #[test]
    fn test_missing_order_type_and_flow_are_not_found() {
        let orders = Orders::default();
        let registry = flow_types();
        let entry = CheckoutEntry::new(&orders, &Catalog, &Catalog, &registry);

        let err = entry.open(Order::new("unknown"), None).err().unwrap();
        assert!(matches!(err, CheckoutError::OrderTypeNotFound { .. }));

        let err = entry.open(Order::new("broken"), None).err().unwrap();
        assert!(matches!(err, CheckoutError::FlowNotFound { .. }));
        assert_eq!(err.status_code(), 404);
    }
}
