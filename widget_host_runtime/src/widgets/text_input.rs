use super::instructions::{InputKind, InstructionMessage};
use super::text_field::{TextElement, TextField};
use super::{LabelVisibility, ServerPush, ViewContext, WidgetLabel};
use crate::manager::WidgetStateManager;
use crate::transport::Transport;
use crate::widget_id::WidgetRef;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextInputType {
    #[default]
    Default,
    Password,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TextInputElement {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub set_value: bool,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub max_chars: Option<usize>,
    #[serde(default)]
    pub input_type: TextInputType,
    #[serde(default)]
    pub form_id: String,
    #[serde(default)]
    pub help: Option<String>,
    #[serde(default)]
    pub label_visibility: LabelVisibility,
    #[serde(default)]
    pub disabled: bool,
}

impl TextInputElement {
    pub fn take_server_push(&mut self) -> Option<ServerPush<Option<String>>> {
        std::mem::take(&mut self.set_value).then(|| ServerPush {
            value: self.value.clone(),
        })
    }
}

impl TextElement for TextInputElement {
    const KIND: InputKind = InputKind::SingleLine;

    fn widget_ref(&self) -> WidgetRef<'_> {
        WidgetRef::new(&self.id, &self.form_id)
    }

    fn default_value(&self) -> Option<&str> {
        self.default.as_deref()
    }

    fn max_chars(&self) -> Option<usize> {
        self.max_chars.filter(|max| *max > 0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextInputView {
    pub label: WidgetLabel,
    pub text: String,
    pub input_type: TextInputType,
    pub placeholder: Option<String>,
    pub focused: bool,
    pub disabled: bool,
    pub instructions: Option<Vec<InstructionMessage>>,
}

/// Single-line text control; Enter applies.
pub type TextInput = TextField<TextInputElement>;

impl TextField<TextInputElement> {
    pub fn view<T: Transport>(
        &self,
        ctx: ViewContext,
        mgr: &WidgetStateManager<T>,
    ) -> TextInputView {
        let disabled = self.element.disabled || ctx.inputs_disabled;
        TextInputView {
            label: WidgetLabel {
                text: self.element.label.clone(),
                for_id: self.dom_id().to_string(),
                visibility: self.element.label_visibility,
                help: self.element.help.clone(),
                disabled,
            },
            text: self.text().to_string(),
            input_type: self.element.input_type,
            placeholder: self.element.placeholder.clone(),
            focused: self.is_focused(),
            disabled,
            instructions: self.instructions(ctx, mgr),
        }
    }
}
