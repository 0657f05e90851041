//! Interactive controls and the reconciliation state they share.
//!
//! Each control arbitrates between three values: the committed value in the
//! [`WidgetStateManager`](crate::manager::WidgetStateManager), its own local
//! edit buffer, and values pushed by the server on re-render. Keystrokes only
//! touch the edit buffer; blur, apply keys and stepper actions commit it.

pub mod checkbox;
pub mod instructions;
pub mod number_format;
pub mod number_input;
pub mod submit_button;
pub mod text_area;
pub mod text_field;
pub mod text_input;

pub use checkbox::{Checkbox, CheckboxElement, CheckboxView};
pub use instructions::{InputInstructions, InputKind, InstructionMessage, Platform};
pub use number_format::{Number, NumberDataType};
pub use number_input::{NumberInput, NumberInputElement, NumberInputView};
pub use submit_button::{FormSubmitButton, FormSubmitButtonElement, FormSubmitButtonView};
pub use text_area::{TextArea, TextAreaElement, TextAreaView};
pub use text_field::{TextElement, TextField};
pub use text_input::{TextInput, TextInputElement, TextInputType, TextInputView};

use crate::manager::WidgetStateManager;
use crate::transport::Transport;
use crate::widget_id::WidgetKey;
use serde::{Deserialize, Serialize};

/// Value the server wants applied now, consumed exactly once.
///
/// Replaces the descriptor-level "set value" flag: the element descriptor
/// stays immutable and the push travels as a separate event.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerPush<V> {
    pub value: V,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Uninitialized,
    Synced,
    Editing,
}

/// Control-local edit buffer. Discarded on unmount.
#[derive(Debug, Clone, PartialEq)]
pub struct EditState<V> {
    pub value: V,
    pub formatted: Option<String>,
    pub dirty: bool,
    pub focused: bool,
}

impl<V> EditState<V> {
    pub fn new(value: V, formatted: Option<String>) -> Self {
        Self {
            value,
            formatted,
            dirty: false,
            focused: false,
        }
    }

    pub fn phase(&self, mounted: bool) -> SyncPhase {
        match (mounted, self.dirty) {
            (false, _) => SyncPhase::Uninitialized,
            (true, false) => SyncPhase::Synced,
            (true, true) => SyncPhase::Editing,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelVisibility {
    #[default]
    Visible,
    Hidden,
    Collapsed,
}

/// Label attached to a control; `for_id` points at the control's DOM id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WidgetLabel {
    pub text: String,
    pub for_id: String,
    pub visibility: LabelVisibility,
    pub help: Option<String>,
    pub disabled: bool,
}

/// Keyboard event as delivered by the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct KeyEvent {
    pub key: String,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub meta: bool,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_meta(mut self) -> Self {
        self.meta = true;
        self
    }

    pub fn is_enter(&self) -> bool {
        self.key == "Enter"
    }
}

/// A control asking its owner to submit the form it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequest {
    pub form_id: String,
    pub fragment_id: Option<String>,
}

/// Session-wide inputs to rendering.
#[derive(Debug, Clone, Copy, Default)]
pub struct ViewContext {
    pub platform: Platform,
    pub inputs_disabled: bool,
}

/// Follows a mounted control whose update moved it to another form. The
/// old key loses its values and form-cleared subscription; the new key is
/// subscribed. Returns whether the key changed.
fn move_widget_key<T: Transport>(
    previous: &WidgetKey,
    current: &WidgetKey,
    mgr: &mut WidgetStateManager<T>,
) -> bool {
    if previous == current {
        return false;
    }

    log::debug!("widget {previous} moved to {current}");
    mgr.remove_form_cleared_listener(previous);
    mgr.forget(previous);
    mgr.add_form_cleared_listener(current);
    true
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_follows_mount_and_dirty() {
        let mut edit = EditState::new(false, None);
        assert_eq!(edit.phase(false), SyncPhase::Uninitialized);
        assert_eq!(edit.phase(true), SyncPhase::Synced);
        edit.dirty = true;
        assert_eq!(edit.phase(true), SyncPhase::Editing);
    }

    #[test]
    fn key_event_deserializes_with_default_modifiers() {
        let key: KeyEvent = serde_json::from_str(r#"{"key":"Enter","meta":true}"#)
            .expect("decode key event");
        assert!(key.is_enter());
        assert!(key.meta);
        assert!(!key.ctrl);
    }
}
