use super::instructions::{InputKind, InstructionMessage};
use super::text_field::{TextElement, TextField};
use super::{LabelVisibility, ServerPush, ViewContext, WidgetLabel};
use crate::manager::WidgetStateManager;
use crate::transport::Transport;
use crate::widget_id::WidgetRef;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TextAreaElement {
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
    pub height: Option<u32>,
    #[serde(default)]
    pub form_id: String,
    #[serde(default)]
    pub help: Option<String>,
    #[serde(default)]
    pub label_visibility: LabelVisibility,
    #[serde(default)]
    pub disabled: bool,
}

impl TextAreaElement {
    pub fn take_server_push(&mut self) -> Option<ServerPush<Option<String>>> {
        std::mem::take(&mut self.set_value).then(|| ServerPush {
            value: self.value.clone(),
        })
    }
}

impl TextElement for TextAreaElement {
    const KIND: InputKind = InputKind::MultiLine;

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
pub struct TextAreaView {
    pub label: WidgetLabel,
    pub text: String,
    pub placeholder: Option<String>,
    pub height: Option<u32>,
    pub focused: bool,
    pub disabled: bool,
    pub instructions: Option<Vec<InstructionMessage>>,
}

/// Multi-line text control; Ctrl/⌘+Enter applies.
pub type TextArea = TextField<TextAreaElement>;

impl TextField<TextAreaElement> {
    pub fn view<T: Transport>(
        &self,
        ctx: ViewContext,
        mgr: &WidgetStateManager<T>,
    ) -> TextAreaView {
        let disabled = self.element.disabled || ctx.inputs_disabled;
        TextAreaView {
            label: WidgetLabel {
                text: self.element.label.clone(),
                for_id: self.dom_id().to_string(),
                visibility: self.element.label_visibility,
                help: self.element.help.clone(),
                disabled,
            },
            text: self.text().to_string(),
            placeholder: self.element.placeholder.clone(),
            height: self.element.height,
            focused: self.is_focused(),
            disabled,
            instructions: self.instructions(ctx, mgr),
        }
    }
}
