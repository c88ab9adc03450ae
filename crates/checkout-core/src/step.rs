//! # Checkout Steps
//!
//! Step metadata and the ordered step map. Map order is navigation order.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Built-in step the customer leaves only through a payment redirect
pub const OFFSITE_PAYMENT: &str = "offsite_payment";

/// Built-in terminal step
pub const COMPLETE: &str = "complete";

/// Pseudo-step for panes that are not part of any step
pub const DISABLED: &str = "_disabled";

/// A named stage of checkout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Page title of the step
    pub label: String,

    /// Label of the button that returns the customer to this step.
    /// Without it no "previous" button targets this step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_label: Option<String>,

    /// Label of the button that sends the customer to this step.
    /// Without it no "next" button targets this step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_label: Option<String>,
}

impl Step {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            previous_label: None,
            next_label: None,
        }
    }

    pub fn with_previous_label(mut self, label: impl Into<String>) -> Self {
        self.previous_label = Some(label.into());
        self
    }

    pub fn with_next_label(mut self, label: impl Into<String>) -> Self {
        self.next_label = Some(label.into());
        self
    }
}

/// Ordered mapping of step ID to step metadata
pub type StepMap = IndexMap<String, Step>;

/// The steps every flow has
pub fn builtin_steps() -> StepMap {
    let mut steps = StepMap::new();
    steps.insert(
        OFFSITE_PAYMENT.to_string(),
        Step::new("Payment").with_next_label("Continue to payment"),
    );
    steps.insert(
        COMPLETE.to_string(),
        Step::new("Complete").with_next_label("Pay and complete purchase"),
    );
    steps
}

/// Complete a flow's declared steps with the built-in ones.
///
/// Declared built-ins keep their position and metadata. A missing
/// `offsite_payment` goes right before a declared `complete` (or at the
/// end), and a missing `complete` is always last.
pub fn with_builtin_steps(declared: StepMap) -> StepMap {
    let mut steps = declared;
    for step_id in [OFFSITE_PAYMENT, COMPLETE] {
        if steps.contains_key(step_id) {
            debug!(step_id, "flow overrides built-in step");
        }
    }

    let mut builtins = builtin_steps();
    if !steps.contains_key(OFFSITE_PAYMENT) {
        if let Some(step) = builtins.shift_remove(OFFSITE_PAYMENT) {
            match steps.get_index_of(COMPLETE) {
                Some(index) => {
                    steps.shift_insert(index, OFFSITE_PAYMENT.to_string(), step);
                }
                None => {
                    steps.insert(OFFSITE_PAYMENT.to_string(), step);
                }
            }
        }
    }
    if !steps.contains_key(COMPLETE) {
        if let Some(step) = builtins.shift_remove(COMPLETE) {
            steps.insert(COMPLETE.to_string(), step);
        }
    }
    steps
}

/// Step ID adjacent to `current` in `steps`, `offset` positions away
pub fn adjacent_step_id(steps: &StepMap, current: &str, offset: isize) -> Option<String> {
    let index = steps.get_index_of(current)? as isize + offset;
    if index < 0 {
        return None;
    }
    steps
        .get_index(index as usize)
        .map(|(step_id, _)| step_id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(steps: &StepMap) -> Vec<&str> {
        steps.keys().map(String::as_str).collect()
    }

    #[test]
    fn test_builtins_appended_to_custom_steps() {
        let mut declared = StepMap::new();
        declared.insert("login".into(), Step::new("Login"));
        declared.insert("review".into(), Step::new("Review"));

        let steps = with_builtin_steps(declared);

        assert_eq!(keys(&steps), ["login", "review", "offsite_payment", "complete"]);
    }

    #[test]
    fn test_offsite_payment_inserted_before_declared_complete() {
        let mut declared = StepMap::new();
        declared.insert("review".into(), Step::new("Review"));
        declared.insert("complete".into(), Step::new("Thank you"));

        let steps = with_builtin_steps(declared);

        assert_eq!(keys(&steps), ["review", "offsite_payment", "complete"]);
        assert_eq!(steps["complete"].label, "Thank you");
    }

    #[test]
    fn test_adjacent_step_ids() {
        let steps = with_builtin_steps(StepMap::new());

        assert_eq!(adjacent_step_id(&steps, "offsite_payment", -1), None);
        assert_eq!(
            adjacent_step_id(&steps, "offsite_payment", 1).as_deref(),
            Some("complete")
        );
        assert_eq!(adjacent_step_id(&steps, "complete", 1), None);
        assert_eq!(adjacent_step_id(&steps, "unknown", 1), None);
    }
}
