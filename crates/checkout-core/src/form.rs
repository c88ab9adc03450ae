//! # Form Model
//!
//! A minimal, renderer-agnostic form tree and the per-request form state.
//! Panes and flows build [`FormElement`] trees; the host renders them and
//! feeds submitted values back through [`FormState`].

use crate::merge::Settings;
use crate::overview::PaneEditorState;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of form element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    #[default]
    Container,
    Fieldset,
    Markup,
    Textfield,
    Email,
    Password,
    Checkbox,
    Select,
    Hidden,
    Submit,
    Actions,
    Table,
}

fn is_true(b: &bool) -> bool {
    *b
}

fn is_false(b: &bool) -> bool {
    !*b
}

fn default_true() -> bool {
    true
}

/// One node of a form tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormElement {
    pub kind: ElementKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Static text (markup elements, button values)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markup: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,

    /// Select options, keyed by value
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub options: IndexMap<String, String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,

    /// Hidden elements are neither rendered nor processed
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub access: bool,

    /// Position of the element's values within `FormState::values`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,

    /// Operation a submit button triggers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub children: IndexMap<String, FormElement>,
}

impl Default for FormElement {
    fn default() -> Self {
        Self::new(ElementKind::Container)
    }
}

impl FormElement {
    pub fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            title: None,
            description: None,
            markup: None,
            default_value: None,
            options: IndexMap::new(),
            required: false,
            access: true,
            parents: Vec::new(),
            op: None,
            classes: Vec::new(),
            children: IndexMap::new(),
        }
    }

    pub fn container() -> Self {
        Self::new(ElementKind::Container)
    }

    pub fn fieldset() -> Self {
        Self::new(ElementKind::Fieldset)
    }

    pub fn markup(text: impl Into<String>) -> Self {
        let mut element = Self::new(ElementKind::Markup);
        element.markup = Some(text.into());
        element
    }

    /// An input field with a title
    pub fn field(kind: ElementKind, title: impl Into<String>) -> Self {
        let mut element = Self::new(kind);
        element.title = Some(title.into());
        element
    }

    /// A submit button with its label and operation
    pub fn submit(value: impl Into<String>, op: impl Into<String>) -> Self {
        let mut element = Self::new(ElementKind::Submit);
        element.markup = Some(value.into());
        element.op = Some(op.into());
        element
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_options<K, V>(mut self, options: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.options = options
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    pub fn with_parents<S: Into<String>>(mut self, parents: impl IntoIterator<Item = S>) -> Self {
        self.parents = parents.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_child(mut self, key: impl Into<String>, child: FormElement) -> Self {
        self.children.insert(key.into(), child);
        self
    }

    pub fn set_child(&mut self, key: impl Into<String>, child: FormElement) {
        self.children.insert(key.into(), child);
    }

    pub fn child(&self, key: &str) -> Option<&FormElement> {
        self.children.get(key)
    }

    /// True for a bare container without content
    pub fn is_empty(&self) -> bool {
        self.kind == ElementKind::Container && self.children.is_empty() && self.markup.is_none()
    }

    /// Depth-first search for a submit button with the given op
    pub fn find_op(&self, op: &str) -> Option<&FormElement> {
        if !self.access {
            return None;
        }
        if self.kind == ElementKind::Submit && self.op.as_deref() == Some(op) {
            return Some(self);
        }
        self.children.values().find_map(|child| child.find_op(op))
    }
}

/// Where to send the customer after a successful submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    pub order_id: String,
    pub step_id: String,
}

impl Redirect {
    pub fn new(order_id: impl Into<String>, step_id: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            step_id: step_id.into(),
        }
    }
}

/// Per-request form state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormState {
    /// Submitted values, nested by element parents
    #[serde(default)]
    values: Settings,

    /// Field errors keyed by element path (`parent][child`)
    #[serde(default)]
    errors: IndexMap<String, String>,

    /// Operation of the button that submitted the form
    #[serde(default)]
    triggering_op: Option<String>,

    #[serde(default)]
    redirect: Option<Redirect>,

    #[serde(default)]
    rebuild: bool,

    /// Scratch values handed from validation to submission
    #[serde(default)]
    temporary: Settings,

    /// Admin overview editor state (edit slot, pending update)
    #[serde(default)]
    pub pane_editor: PaneEditorState,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State for a submission triggered by `op` with the given values
    pub fn submitted(op: impl Into<String>, values: Settings) -> Self {
        Self {
            values,
            triggering_op: Some(op.into()),
            ..Default::default()
        }
    }

    pub fn values(&self) -> &Settings {
        &self.values
    }

    /// Nested value lookup, e.g. `value(&["login", "email"])`
    pub fn value(&self, path: &[&str]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        let mut current = self.values.get(*first)?;
        for key in rest {
            current = current.as_object()?.get(*key)?;
        }
        Some(current)
    }

    /// Nested string value; empty strings count as missing
    pub fn value_str(&self, path: &[&str]) -> Option<&str> {
        self.value(path)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn set_error(&mut self, path: &[&str], message: impl Into<String>) {
        self.errors.insert(path.join("]["), message.into());
    }

    pub fn errors(&self) -> &IndexMap<String, String> {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn triggering_op(&self) -> Option<&str> {
        self.triggering_op.as_deref()
    }

    pub fn redirect(&self) -> Option<&Redirect> {
        self.redirect.as_ref()
    }

    pub fn set_redirect(&mut self, redirect: Redirect) {
        self.redirect = Some(redirect);
    }

    pub fn is_rebuilding(&self) -> bool {
        self.rebuild
    }

    pub fn set_rebuild(&mut self) {
        self.rebuild = true;
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.temporary.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.temporary.insert(key.into(), value.into());
    }
}
