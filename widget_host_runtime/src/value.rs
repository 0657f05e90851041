use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Committed value of a single widget.
///
/// Scalar kinds carry an `Option` because several controls (number inputs,
/// text areas) can be committed empty, which is distinct from never having
/// been committed at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum WidgetValue {
    Bool(bool),
    Int(Option<i64>),
    Double(Option<f64>),
    String(Option<String>),
    StringArray(Vec<String>),
    IntArray(Vec<i64>),
    DoubleArray(Vec<f64>),
    Json(Value),
    Trigger(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Int,
    Double,
    String,
    StringArray,
    IntArray,
    DoubleArray,
    Json,
    Trigger,
}

impl WidgetValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            WidgetValue::Bool(_) => ValueKind::Bool,
            WidgetValue::Int(_) => ValueKind::Int,
            WidgetValue::Double(_) => ValueKind::Double,
            WidgetValue::String(_) => ValueKind::String,
            WidgetValue::StringArray(_) => ValueKind::StringArray,
            WidgetValue::IntArray(_) => ValueKind::IntArray,
            WidgetValue::DoubleArray(_) => ValueKind::DoubleArray,
            WidgetValue::Json(_) => ValueKind::Json,
            WidgetValue::Trigger(_) => ValueKind::Trigger,
        }
    }
}

/// Origin of a commit. `from_ui` commits are user initiated and may trigger
/// a rerun; framework commits (mount sync, programmatic resets) only update
/// the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Source {
    pub from_ui: bool,
}

impl Source {
    pub const UI: Source = Source { from_ui: true };
    pub const FRAMEWORK: Source = Source { from_ui: false };
}

/// One entry of a rerun notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetState {
    pub id: String,
    #[serde(flatten)]
    pub value: WidgetValue,
}
