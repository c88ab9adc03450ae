//! # Built-in Flow Types

use checkout_core::{
    BoxedFlow, FlowTypeDefinition, FlowTypeRegistry, PaneFlow, PaneRegistry, Step, StepMap,
};
use std::sync::Arc;

/// Plugin tag of the default multi-step flow
pub const MULTISTEP_DEFAULT: &str = "multistep_default";

/// Declared steps of `multistep_default`; the built-in steps follow them
pub fn multistep_default_steps() -> StepMap {
    let mut steps = StepMap::new();
    steps.insert(
        "login".to_string(),
        Step::new("Login").with_previous_label("Go back"),
    );
    steps.insert(
        "order_information".to_string(),
        Step::new("Order information")
            .with_previous_label("Go back")
            .with_next_label("Continue to order information"),
    );
    steps.insert(
        "review".to_string(),
        Step::new("Review")
            .with_previous_label("Go back")
            .with_next_label("Continue to review"),
    );
    steps
}

/// Flow types shipped with the crate, all backed by `panes`
pub fn builtin_flow_types(panes: Arc<PaneRegistry>) -> FlowTypeRegistry {
    FlowTypeRegistry::new().with_flow_type(
        FlowTypeDefinition {
            id: MULTISTEP_DEFAULT.to_string(),
            label: "Multistep - Default".to_string(),
        },
        move |base| Box::new(PaneFlow::new(base, multistep_default_steps(), panes.clone())) as BoxedFlow,
    )
}
