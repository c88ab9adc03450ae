//! # checkout-core
//!
//! Core types and traits for the paneflow checkout state machine.
//!
//! This crate provides:
//! - `CheckoutFlow` trait with `BasicFlow` and the pane-driven `PaneFlow`
//! - `Pane` trait and `PaneRegistry` for pluggable checkout panes
//! - `FlowTypeRegistry` and `CheckoutEntry` to open a checkout for an order
//! - The pane overview editor (`build_overview`, `TableDrag`, `reconcile`)
//! - `CheckoutError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use checkout_core::{process_form, CheckoutEntry, FormOutcome, FormState};
//!
//! let entry = CheckoutEntry::new(&orders, &flows, &order_types, &flow_types);
//! let mut flow = entry.open(order, Some("review"))?;
//!
//! let mut state = FormState::submitted("next", values);
//! match process_form(flow.as_mut(), &mut state, &orders)? {
//!     FormOutcome::Render { form } => render(form, state.errors()),
//!     FormOutcome::Redirect { redirect } => redirect_to(&redirect.order_id, &redirect.step_id),
//! }
//! ```

pub mod entry;
pub mod error;
pub mod flow;
pub mod flow_panes;
pub mod flow_type;
pub mod form;
pub mod merge;
pub mod order;
pub mod overview;
pub mod pane;
pub mod registry;
pub mod step;
pub mod subscriber;

// Re-exports for convenience
pub use entry::CheckoutEntry;
pub use error::{CheckoutError, CheckoutResult};
pub use flow::{
    finish_submission, navigation_actions, process_form, step_form, BasicFlow, BoxedFlow,
    CheckoutFlow, FlowBase, FormOutcome, OP_NEXT, OP_PREVIOUS,
};
pub use flow_panes::PaneFlow;
pub use flow_type::{
    FlowConfig, FlowFactory, FlowRepository, FlowTypeDefinition, FlowTypeRegistry,
    OrderTypeRepository,
};
pub use form::{ElementKind, FormElement, FormState, Redirect};
pub use merge::{intersect_keys, is_truthy, merge_deep, merged, Settings};
pub use order::{Account, Authenticator, NullStorage, Order, OrderStorage, OrderType, Owner};
pub use overview::{
    build_overview, multistep_submit, reconcile, region_status, submitted_settings, validate_row,
    EditorOp, PaneAssignment, PaneEditorState, PaneOverview, PaneRow, Region, RegionStatus,
    RowMode, RowState, TableDrag, TableRow,
};
pub use pane::{compare_panes, sort_panes, BoxedPane, Pane, PaneBase};
pub use registry::{PaneDefinition, PaneFactory, PaneRegistration, PaneRegistry, PaneRegistryBuilder};
pub use step::{Step, StepMap, COMPLETE, DISABLED, OFFSITE_PAYMENT};
pub use subscriber::{dispatch_checkout_complete, BoxedSubscriber, CheckoutSubscriber, LoggingSubscriber};
