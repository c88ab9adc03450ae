//! # checkout-wasm
//!
//! WebAssembly bindings for the pane overview table of paneflow-rs.
//!
//! The browser keeps the table rows (region headers, region messages and
//! pane rows) and asks this module which regions are empty after each drag.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { region_status, swap_rows } from 'paneflow-wasm';
//!
//! await init();
//!
//! const { rows, changed, values } = swap_rows(overview.table, 4, 9);
//! for (const change of changed) {
//!   repaint(change.step_id, change.class);
//! }
//! ```
//!
//! ## Building
//!
//! ```bash
//! wasm-pack build --target web
//! ```

use checkout_core::{region_status as table_region_status, RegionStatus, Settings, TableDrag, TableRow};
use serde::Serialize;
use wasm_bindgen::prelude::*;

/// A region whose empty/populated status changed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionChange {
    pub step_id: String,
    pub status: RegionStatus,
    /// CSS class for the region message row
    pub class: &'static str,
}

/// Rows after a move, with the repaint list and the values to submit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwapResult {
    pub rows: Vec<TableRow>,
    pub changed: Vec<RegionChange>,
    pub values: Settings,
}

/// Move the pane row at `from` to `to`; invalid moves leave the rows as they are
pub fn swap_table_rows(rows: Vec<TableRow>, from: usize, to: usize) -> SwapResult {
    let mut drag = TableDrag::new(rows);
    let changed = drag
        .swap(from, to)
        .into_iter()
        .map(|(step_id, status)| RegionChange {
            step_id,
            status,
            class: status.class(),
        })
        .collect();

    SwapResult {
        rows: drag.rows().to_vec(),
        changed,
        values: drag.submission(),
    }
}

fn parse_rows(rows: JsValue) -> Result<Vec<TableRow>, JsValue> {
    serde_wasm_bindgen::from_value(rows)
        .map_err(|e| JsValue::from_str(&format!("Invalid table rows: {}", e)))
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Status of every region, keyed by step ID
#[wasm_bindgen]
pub fn region_status(rows: JsValue) -> Result<JsValue, JsValue> {
    let rows = parse_rows(rows)?;
    to_js(&table_region_status(&rows))
}

/// Move a pane row and report which regions need repainting
#[wasm_bindgen]
pub fn swap_rows(rows: JsValue, from: usize, to: usize) -> Result<JsValue, JsValue> {
    let rows = parse_rows(rows)?;
    to_js(&swap_table_rows(rows, from, to))
}

/// Drag-and-drop table kept on the module side between moves
#[wasm_bindgen]
pub struct WasmPaneTable {
    drag: TableDrag,
}

#[wasm_bindgen]
impl WasmPaneTable {
    #[wasm_bindgen(constructor)]
    pub fn new(rows: JsValue) -> Result<WasmPaneTable, JsValue> {
        Ok(Self {
            drag: TableDrag::new(parse_rows(rows)?),
        })
    }

    /// Move a row, returning the changed regions
    #[wasm_bindgen]
    pub fn swap(&mut self, from: usize, to: usize) -> Result<JsValue, JsValue> {
        let changed: Vec<RegionChange> = self
            .drag
            .swap(from, to)
            .into_iter()
            .map(|(step_id, status)| RegionChange {
                step_id,
                status,
                class: status.class(),
            })
            .collect();
        to_js(&changed)
    }

    #[wasm_bindgen]
    pub fn rows(&self) -> Result<JsValue, JsValue> {
        to_js(&self.drag.rows())
    }

    /// Submission values for the current placement
    #[wasm_bindgen]
    pub fn values(&self) -> Result<JsValue, JsValue> {
        to_js(&self.drag.submission())
    }
}

/// Log to browser console
#[wasm_bindgen]
pub fn log(message: &str) {
    web_sys::console::log_1(&JsValue::from_str(message));
}

/// Get library version
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
