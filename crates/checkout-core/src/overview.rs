//! # Pane Overview Editor
//!
//! Admin editor of a pane-driven flow: a table with one region per step
//! (plus `_disabled`), drag-and-drop rows, and an inline settings editor.
//!
//! ```text
//! Viewing ──edit──▶ Editing ──update──▶ ApplyingUpdate ──save──▶ Viewing
//!                      │
//!                      └──cancel──▶ Viewing
//! ```
//!
//! Only one row can be in `Editing` at a time. The editor state travels in
//! [`FormState::pane_editor`] between requests.

use crate::error::{CheckoutError, CheckoutResult};
use crate::flow::CheckoutFlow;
use crate::flow_panes::PaneFlow;
use crate::form::{ElementKind, FormElement, FormState};
use crate::merge::{intersect_keys, Settings};
use crate::pane::{parse_weight, Pane, STEP_KEY, WEIGHT_KEY};
use crate::step::DISABLED;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Submitted values of the overview live under `panes[pane_id]`
pub const PANES_KEY: &str = "panes";

/// Row settings live under `panes[pane_id][settings]`
pub const SETTINGS_KEY: &str = "settings";

const STEP_EMPTY_MESSAGE: &str = "No pane is displayed.";
const DISABLED_TITLE: &str = "Disabled";
const DISABLED_EMPTY_MESSAGE: &str = "No pane is hidden.";

// ============================================================================
// Editor state
// ============================================================================

/// Session-scoped state of the inline settings editor.
///
/// There is a single pending slot: updating a second row before saving
/// replaces the first row's pending settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaneEditorState {
    /// Row whose settings form is open
    #[serde(default)]
    pub editing: Option<String>,

    /// Row whose settings are applied on the next save
    #[serde(default)]
    pub pending_update: Option<String>,

    /// Settings submitted with the pending row's `Update`
    #[serde(default)]
    pub pending_settings: Option<Settings>,
}

impl PaneEditorState {
    pub fn row_state(&self, pane_id: &str) -> RowState {
        if self.editing.as_deref() == Some(pane_id) {
            RowState::Editing
        } else if self.pending_update.as_deref() == Some(pane_id) {
            RowState::ApplyingUpdate
        } else {
            RowState::Viewing
        }
    }

    pub fn is_idle(&self) -> bool {
        self.editing.is_none() && self.pending_update.is_none()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn mark_pending(&mut self, pane_id: &str, submitted: Option<Settings>) {
        if self.editing.as_deref() == Some(pane_id) {
            self.editing = None;
        }
        if let Some(previous) = self.pending_update.replace(pane_id.to_string()) {
            if previous != pane_id {
                warn!(pane_id = %previous, "pending pane settings replaced by another row");
            }
        }
        self.pending_settings = submitted;
    }
}

/// Row state in the overview editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowState {
    Viewing,
    Editing,
    ApplyingUpdate,
}

/// Operation of a row button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditorOp {
    Edit,
    Update,
    Cancel,
}

impl EditorOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            EditorOp::Edit => "edit",
            EditorOp::Update => "update",
            EditorOp::Cancel => "cancel",
        }
    }
}

impl fmt::Display for EditorOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EditorOp {
    type Err = CheckoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "edit" => Ok(EditorOp::Edit),
            "update" => Ok(EditorOp::Update),
            "cancel" => Ok(EditorOp::Cancel),
            other => Err(CheckoutError::InvalidConfiguration(format!(
                "unknown pane editor operation: {other}"
            ))),
        }
    }
}

/// Settings submitted for a row, `values.panes[pane_id].settings`
pub fn submitted_settings(values: &Settings, pane_id: &str) -> Option<Settings> {
    values
        .get(PANES_KEY)?
        .as_object()?
        .get(pane_id)?
        .as_object()?
        .get(SETTINGS_KEY)?
        .as_object()
        .cloned()
}

/// Apply a row button press to the editor state and request a rebuild.
///
/// `Edit` opens the row, `Update` closes it and marks it pending, `Cancel`
/// closes it without changes.
pub fn multistep_submit(state: &mut FormState, op: EditorOp, pane_id: &str) {
    match op {
        EditorOp::Edit => {
            if let Some(open) = state.pane_editor.editing.replace(pane_id.to_string()) {
                if open != pane_id {
                    debug!(pane_id = %open, "closing open row without changes");
                }
            }
        }
        EditorOp::Update => {
            let submitted = submitted_settings(state.values(), pane_id);
            state.pane_editor.mark_pending(pane_id, submitted);
        }
        EditorOp::Cancel => {
            if state.pane_editor.editing.as_deref() == Some(pane_id) {
                state.pane_editor.editing = None;
            }
        }
    }
    debug!(pane_id, op = %op, "pane editor operation");
    state.set_rebuild();
}

/// Run the settings validation of one row against its submitted settings
pub fn validate_row(flow: &PaneFlow, state: &mut FormState, pane_id: &str) -> CheckoutResult<()> {
    let pane = flow.pane(pane_id).ok_or_else(|| CheckoutError::PaneNotFound {
        pane_id: pane_id.to_string(),
    })?;
    let settings = submitted_settings(state.values(), pane_id)
        .or_else(|| {
            (state.pane_editor.pending_update.as_deref() == Some(pane_id))
                .then(|| state.pane_editor.pending_settings.clone())
                .flatten()
        })
        .unwrap_or_default();
    pane.validate_configuration_form(&settings, state);
    Ok(())
}

// ============================================================================
// Overview model
// ============================================================================

/// Whether a region currently holds any pane row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionStatus {
    Empty,
    Populated,
}

impl RegionStatus {
    pub fn class(&self) -> &'static str {
        match self {
            RegionStatus::Empty => "region-empty",
            RegionStatus::Populated => "region-populated",
        }
    }
}

/// What a row shows in its configuration cell
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RowMode {
    /// Summary, plus an edit button when the pane has settings
    Viewing { summary: Vec<String>, editable: bool },
    /// Open settings form with update and cancel buttons
    Editing { settings_form: FormElement },
}

/// One pane row of the overview table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaneRow {
    pub pane_id: String,
    pub label: String,
    pub step_id: String,
    pub weight: i32,
    pub state: RowState,
    #[serde(flatten)]
    pub mode: RowMode,
}

impl PaneRow {
    fn to_form(&self, step_options: &IndexMap<String, String>) -> FormElement {
        let mut row = FormElement::container()
            .with_class("draggable")
            .with_parents([PANES_KEY, self.pane_id.as_str()])
            .with_child("label", FormElement::markup(self.label.clone()))
            .with_child(
                WEIGHT_KEY,
                FormElement::field(ElementKind::Textfield, format!("Weight for {}", self.label))
                    .with_default(self.weight)
                    .with_class("pane-weight"),
            )
            .with_child(
                STEP_KEY,
                FormElement::field(ElementKind::Select, format!("Step for {}", self.label))
                    .with_options(step_options.clone())
                    .with_default(self.step_id.clone())
                    .with_class("pane-step")
                    .with_class(format!("pane-step-{}", self.step_id.replace('_', "-"))),
            );

        match &self.mode {
            RowMode::Viewing { summary, editable } => {
                if !summary.is_empty() {
                    row.set_child(
                        "configuration_summary",
                        FormElement::markup(summary.join(", ")).with_class("pane-configuration-summary"),
                    );
                }
                if *editable {
                    row.set_child(
                        "configuration_edit",
                        FormElement::submit("Edit", EditorOp::Edit.as_str()),
                    );
                }
            }
            RowMode::Editing { settings_form } => {
                row.set_child(SETTINGS_KEY, settings_form.clone());
                row.set_child(
                    "actions",
                    FormElement::new(ElementKind::Actions)
                        .with_child("update", FormElement::submit("Update", EditorOp::Update.as_str()))
                        .with_child("cancel", FormElement::submit("Cancel", EditorOp::Cancel.as_str())),
                );
            }
        }
        row
    }
}

/// Rows of one step (or of `_disabled`) in the overview table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Region {
    pub step_id: String,
    pub title: String,
    /// Empty-state message, shown while the region has no rows
    pub message: String,
    pub status: RegionStatus,
    pub rows: Vec<PaneRow>,
}

impl Region {
    fn new(step_id: impl Into<String>, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            title: title.into(),
            message: message.into(),
            status: RegionStatus::Empty,
            rows: Vec::new(),
        }
    }
}

/// The admin overview of a pane-driven flow
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaneOverview {
    pub regions: IndexMap<String, Region>,
    pub editor: PaneEditorState,
}

impl PaneOverview {
    pub fn region(&self, step_id: &str) -> Option<&Region> {
        self.regions.get(step_id)
    }

    pub fn rows(&self) -> impl Iterator<Item = &PaneRow> {
        self.regions.values().flat_map(|region| region.rows.iter())
    }

    pub fn row(&self, pane_id: &str) -> Option<&PaneRow> {
        self.rows().find(|row| row.pane_id == pane_id)
    }

    /// Step choices for the per-row step select
    pub fn step_options(&self) -> IndexMap<String, String> {
        self.regions
            .values()
            .map(|region| (region.step_id.clone(), region.title.clone()))
            .collect()
    }

    /// Client-side table rows: region header, region message, pane rows
    pub fn table_rows(&self) -> Vec<TableRow> {
        let mut rows = Vec::new();
        for region in self.regions.values() {
            rows.push(TableRow::Region {
                step_id: region.step_id.clone(),
            });
            rows.push(TableRow::Message {
                step_id: region.step_id.clone(),
            });
            rows.extend(region.rows.iter().map(|row| TableRow::Pane {
                pane_id: row.pane_id.clone(),
            }));
        }
        rows
    }

    /// Submission values reproducing the current assignment
    pub fn submission(&self) -> Settings {
        let mut panes = Settings::new();
        for row in self.rows() {
            let mut entry = Settings::new();
            entry.insert(STEP_KEY.to_string(), Value::String(row.step_id.clone()));
            entry.insert(WEIGHT_KEY.to_string(), Value::from(row.weight));
            panes.insert(row.pane_id.clone(), Value::Object(entry));
        }
        let mut values = Settings::new();
        values.insert(PANES_KEY.to_string(), Value::Object(panes));
        values
    }

    /// Render the overview as a form table
    pub fn to_form(&self) -> FormElement {
        let step_options = self.step_options();
        let mut table = FormElement::new(ElementKind::Table)
            .with_class("checkout-pane-overview")
            .with_parents([PANES_KEY]);

        for region in self.regions.values() {
            let region_class = region.step_id.replace('_', "-");
            table.set_child(
                format!("region-{}", region.step_id),
                FormElement::markup(region.title.clone())
                    .with_class("region-title")
                    .with_class(format!("region-title-{region_class}")),
            );
            table.set_child(
                format!("region-{}-message", region.step_id),
                FormElement::markup(region.message.clone())
                    .with_class("region-message")
                    .with_class(format!("region-{region_class}-message"))
                    .with_class(region.status.class()),
            );
            for row in &region.rows {
                table.set_child(row.pane_id.clone(), row.to_form(&step_options));
            }
        }

        FormElement::container()
            .with_child(PANES_KEY, table)
            .with_child(
                "actions",
                FormElement::new(ElementKind::Actions)
                    .with_child("submit", FormElement::submit("Save", "save")),
            )
    }
}

/// Build the overview of a flow for the current editor state
pub fn build_overview(flow: &PaneFlow, state: &FormState) -> CheckoutResult<PaneOverview> {
    let mut regions: IndexMap<String, Region> = flow
        .steps()
        .into_iter()
        .map(|(step_id, step)| {
            let region = Region::new(step_id.clone(), step.label, STEP_EMPTY_MESSAGE);
            (step_id, region)
        })
        .collect();
    regions.insert(
        DISABLED.to_string(),
        Region::new(DISABLED, DISABLED_TITLE, DISABLED_EMPTY_MESSAGE),
    );

    for pane in flow.panes() {
        let step_id = if regions.contains_key(pane.step_id()) {
            pane.step_id()
        } else {
            warn!(pane_id = pane.id(), step_id = pane.step_id(), "pane assigned to unknown step, listed as disabled");
            DISABLED
        };
        let row = build_row(flow, pane.as_ref(), step_id, state)?;
        if let Some(region) = regions.get_mut(step_id) {
            region.rows.push(row);
        }
    }

    for region in regions.values_mut() {
        region.status = if region.rows.is_empty() {
            RegionStatus::Empty
        } else {
            RegionStatus::Populated
        };
    }

    Ok(PaneOverview {
        regions,
        editor: state.pane_editor.clone(),
    })
}

fn build_row(
    flow: &PaneFlow,
    pane: &dyn Pane,
    step_id: &str,
    state: &FormState,
) -> CheckoutResult<PaneRow> {
    let editor = &state.pane_editor;
    let row_state = editor.row_state(pane.id());

    let mode = match row_state {
        RowState::Editing => RowMode::Editing {
            settings_form: pane.build_configuration_form().with_parents([
                PANES_KEY,
                pane.id(),
                SETTINGS_KEY,
            ]),
        },
        RowState::ApplyingUpdate => {
            let summary = match &editor.pending_settings {
                Some(pending) => {
                    // Summarize a throwaway instance carrying the pending settings
                    let defaults = flow.registry().default_settings(pane.id())?;
                    let mut preview = flow
                        .registry()
                        .create_instance(pane.id(), pane.configuration())?;
                    preview.submit_configuration_form(&intersect_keys(pending, defaults));
                    preview.configuration_summary()
                }
                None => pane.configuration_summary(),
            };
            RowMode::Viewing {
                summary,
                editable: !pane.build_configuration_form().is_empty(),
            }
        }
        RowState::Viewing => RowMode::Viewing {
            summary: pane.configuration_summary(),
            editable: !pane.build_configuration_form().is_empty(),
        },
    };

    Ok(PaneRow {
        pane_id: pane.id().to_string(),
        label: pane.label().to_string(),
        step_id: step_id.to_string(),
        weight: pane.weight(),
        state: row_state,
        mode,
    })
}

// ============================================================================
// Client-side table model
// ============================================================================

/// One row of the drag-and-drop table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TableRow {
    /// Region header
    Region { step_id: String },
    /// Empty-state message of a region
    Message { step_id: String },
    /// A draggable pane row
    Pane { pane_id: String },
}

impl TableRow {
    pub fn is_draggable(&self) -> bool {
        matches!(self, TableRow::Pane { .. })
    }
}

/// Status of every region in a row sequence.
///
/// A region is empty when the row right after its message row is not
/// draggable.
pub fn region_status(rows: &[TableRow]) -> IndexMap<String, RegionStatus> {
    rows.iter()
        .enumerate()
        .filter_map(|(index, row)| match row {
            TableRow::Message { step_id } => {
                let populated = rows.get(index + 1).is_some_and(TableRow::is_draggable);
                let status = if populated {
                    RegionStatus::Populated
                } else {
                    RegionStatus::Empty
                };
                Some((step_id.clone(), status))
            }
            _ => None,
        })
        .collect()
}

/// Region and renumbered weight of a pane after dragging
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaneAssignment {
    pub step_id: String,
    pub weight: i32,
}

/// The overview table as the browser sees it while rows are dragged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDrag {
    rows: Vec<TableRow>,
}

impl TableDrag {
    pub fn new(rows: Vec<TableRow>) -> Self {
        let mut drag = Self { rows };
        drag.settle_rows();
        drag
    }

    pub fn from_overview(overview: &PaneOverview) -> Self {
        Self::new(overview.table_rows())
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn status(&self) -> IndexMap<String, RegionStatus> {
        region_status(&self.rows)
    }

    /// Move the pane row at `from` to position `to`.
    ///
    /// Returns the regions whose status changed. Only pane rows move, and
    /// nothing lands above the first region header.
    pub fn swap(&mut self, from: usize, to: usize) -> Vec<(String, RegionStatus)> {
        let movable = self.rows.get(from).is_some_and(TableRow::is_draggable);
        if !movable || to == 0 || to >= self.rows.len() || from == to {
            debug!(from, to, "ignored table row move");
            return Vec::new();
        }

        let before = self.status();
        let row = self.rows.remove(from);
        self.rows.insert(to, row);
        self.settle_rows();

        let after = self.status();
        after
            .into_iter()
            .filter(|(step_id, status)| before.get(step_id) != Some(status))
            .collect()
    }

    /// Pane rows dropped between a region header and its message row go
    /// below the message row
    fn settle_rows(&mut self) {
        let mut index = 0;
        while index < self.rows.len() {
            if let TableRow::Region { step_id } = &self.rows[index] {
                let message = TableRow::Message {
                    step_id: step_id.clone(),
                };
                let panes = self.rows[index + 1..]
                    .iter()
                    .take_while(|row| row.is_draggable())
                    .count();
                let message_at = index + 1 + panes;
                if panes > 0 && self.rows.get(message_at) == Some(&message) {
                    self.rows[index + 1..=message_at].rotate_right(1);
                }
            }
            index += 1;
        }
    }

    /// Region and weight of every pane row, weights renumbered per region
    pub fn assignments(&self) -> IndexMap<String, PaneAssignment> {
        let mut assignments = IndexMap::new();
        let mut region = DISABLED.to_string();
        let mut weight = 0;
        for row in &self.rows {
            match row {
                TableRow::Region { step_id } => {
                    region = step_id.clone();
                    weight = 0;
                }
                TableRow::Message { .. } => {}
                TableRow::Pane { pane_id } => {
                    assignments.insert(
                        pane_id.clone(),
                        PaneAssignment {
                            step_id: region.clone(),
                            weight,
                        },
                    );
                    weight += 1;
                }
            }
        }
        assignments
    }

    /// Submission values for the current row placement
    pub fn submission(&self) -> Settings {
        let panes: Settings = self
            .assignments()
            .into_iter()
            .map(|(pane_id, assignment)| {
                let mut entry = Settings::new();
                entry.insert(STEP_KEY.to_string(), Value::String(assignment.step_id));
                entry.insert(WEIGHT_KEY.to_string(), Value::from(assignment.weight));
                (pane_id, Value::Object(entry))
            })
            .collect();
        let mut values = Settings::new();
        values.insert(PANES_KEY.to_string(), Value::Object(panes));
        values
    }
}

// ============================================================================
// Final submission
// ============================================================================

/// Write the submitted overview back into the flow configuration.
///
/// A save while a row is still open counts as `Update` for that row. Every
/// step gets an entry, possibly empty; disabled panes get none. The pending
/// row takes only submitted settings known to its pane type.
pub fn reconcile(
    submission: &Settings,
    state: &mut FormState,
    flow: &mut PaneFlow,
) -> CheckoutResult<Settings> {
    if let Some(editing) = state.pane_editor.editing.clone() {
        debug!(pane_id = %editing, "saving with an open row, applying its settings");
        state
            .pane_editor
            .mark_pending(&editing, submitted_settings(submission, &editing));
    }

    let steps = flow.steps();
    let rows = submission.get(PANES_KEY).and_then(Value::as_object);
    let pending = state.pane_editor.pending_update.clone();
    let pending_settings = state.pane_editor.pending_settings.clone();
    let pane_ids: Vec<String> = flow.panes().iter().map(|p| p.id().to_string()).collect();

    for pane_id in &pane_ids {
        let row = rows.and_then(|rows| rows.get(pane_id)).and_then(Value::as_object);
        let defaults = flow.registry().default_settings(pane_id)?.clone();
        let Some(pane) = flow.pane_mut(pane_id) else {
            continue;
        };

        if let Some(step_id) = row.and_then(|row| row.get(STEP_KEY)).and_then(Value::as_str) {
            if step_id == DISABLED || steps.contains_key(step_id) {
                pane.set_step_id(step_id);
            } else {
                warn!(pane_id = %pane_id, step_id, "unknown step submitted, pane disabled");
                pane.set_step_id(DISABLED);
            }
        }
        if let Some(weight) = row.and_then(|row| row.get(WEIGHT_KEY)).and_then(parse_weight) {
            pane.set_weight(weight);
        }

        if pending.as_deref() == Some(pane_id.as_str()) {
            let submitted = row
                .and_then(|row| row.get(SETTINGS_KEY))
                .and_then(Value::as_object)
                .cloned()
                .or_else(|| pending_settings.clone());
            if let Some(submitted) = submitted {
                for key in submitted.keys().filter(|key| !defaults.contains_key(key.as_str())) {
                    warn!(pane_id = %pane_id, key = %key, "dropping unknown pane setting");
                }
                pane.submit_configuration_form(&intersect_keys(&submitted, &defaults));
            }
        }
    }
    flow.resort();

    let mut configuration: Settings = steps
        .keys()
        .map(|step_id| (step_id.clone(), Value::Object(Settings::new())))
        .collect();
    for pane in flow.panes() {
        let step_id = pane.step_id();
        if step_id == DISABLED {
            continue;
        }
        let mut entry = Settings::new();
        entry.insert(STEP_KEY.to_string(), Value::String(step_id.to_string()));
        entry.insert(WEIGHT_KEY.to_string(), Value::from(pane.weight()));
        entry.extend(pane.base().settings());
        if let Some(Value::Object(step_entries)) = configuration.get_mut(step_id) {
            step_entries.insert(pane.id().to_string(), Value::Object(entry));
        }
    }

    state.pane_editor.clear();
    flow.set_configuration(configuration.clone());
    info!(flow = flow.base().plugin_id(), "checkout pane overview saved");
    Ok(configuration)
}
