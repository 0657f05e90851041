use super::instructions::{InputInstructions, InputKind, InstructionMessage};
use super::{EditState, KeyEvent, ServerPush, SubmitRequest, SyncPhase, ViewContext};
use crate::error::Result;
use crate::manager::WidgetStateManager;
use crate::transport::Transport;
use crate::value::Source;
use crate::widget_id::{WidgetKey, WidgetRef};

/// Element descriptor of a free-text control.
pub trait TextElement {
    const KIND: InputKind;

    fn widget_ref(&self) -> WidgetRef<'_>;

    fn default_value(&self) -> Option<&str>;

    fn max_chars(&self) -> Option<usize>;
}

/// Edit/commit core shared by single-line and multi-line text controls.
///
/// Keystrokes only replace the buffer. The buffer is committed on blur and
/// on the apply key: plain Enter for single-line inputs, Ctrl/⌘+Enter for
/// multi-line ones.
#[derive(Debug)]
pub struct TextField<E> {
    pub(super) element: E,
    dom_id: String,
    fragment_id: Option<String>,
    edit: EditState<Option<String>>,
    mounted: bool,
}

impl<E: TextElement> TextField<E> {
    pub fn new<T: Transport>(
        element: E,
        dom_id: String,
        fragment_id: Option<String>,
        mgr: &WidgetStateManager<T>,
    ) -> Self {
        let value = mgr
            .get_string_value(element.widget_ref())
            .or_else(|| element.default_value().map(str::to_string));

        Self {
            element,
            dom_id,
            fragment_id,
            edit: EditState::new(value, None),
            mounted: false,
        }
    }

    pub fn key(&self) -> WidgetKey {
        self.element.widget_ref().key()
    }

    pub fn dom_id(&self) -> &str {
        &self.dom_id
    }

    pub fn value(&self) -> Option<&str> {
        self.edit.value.as_deref()
    }

    pub fn text(&self) -> &str {
        self.value().unwrap_or_default()
    }

    pub fn is_dirty(&self) -> bool {
        self.edit.dirty
    }

    pub fn is_focused(&self) -> bool {
        self.edit.focused
    }

    pub fn phase(&self) -> SyncPhase {
        self.edit.phase(self.mounted)
    }

    pub fn mount<T: Transport>(
        &mut self,
        push: Option<ServerPush<Option<String>>>,
        mgr: &mut WidgetStateManager<T>,
    ) -> Result<()> {
        if let Some(push) = push {
            self.edit.value = push.value;
        }
        self.commit(Source::FRAMEWORK, mgr)?;
        mgr.add_form_cleared_listener(&self.key());
        self.mounted = true;
        Ok(())
    }

    pub fn update<T: Transport>(
        &mut self,
        element: E,
        fragment_id: Option<String>,
        push: Option<ServerPush<Option<String>>>,
        mgr: &mut WidgetStateManager<T>,
    ) -> Result<()> {
        let previous = self.key();
        self.element = element;
        self.fragment_id = fragment_id;
        let moved = super::move_widget_key(&previous, &self.key(), mgr);

        match push {
            Some(push) => {
                self.edit.value = push.value;
                self.commit(Source::FRAMEWORK, mgr)
            }
            None if moved => self.commit(Source::FRAMEWORK, mgr),
            None => Ok(()),
        }
    }

    pub fn focus(&mut self) {
        self.edit.focused = true;
    }

    pub fn blur<T: Transport>(&mut self, mgr: &mut WidgetStateManager<T>) -> Result<()> {
        if self.edit.dirty {
            self.commit(Source::UI, mgr)?;
        }
        self.edit.focused = false;
        Ok(())
    }

    /// Replaces the buffer. Text longer than `max_chars` is refused and the
    /// previous buffer kept.
    pub fn input(&mut self, text: &str) {
        if let Some(max_chars) = self.element.max_chars() {
            if text.chars().count() > max_chars {
                return;
            }
        }
        self.edit.value = Some(text.to_string());
        self.edit.dirty = true;
    }

    pub fn key_press<T: Transport>(
        &mut self,
        key: &KeyEvent,
        mgr: &mut WidgetStateManager<T>,
    ) -> Result<Option<SubmitRequest>> {
        if !Self::is_apply_key(key) {
            return Ok(None);
        }

        if self.edit.dirty {
            self.commit(Source::UI, mgr)?;
        }

        let widget = self.element.widget_ref();
        if mgr.allow_form_enter_to_submit(widget.form_id) {
            return Ok(Some(SubmitRequest {
                form_id: widget.form_id.to_string(),
                fragment_id: self.fragment_id.clone(),
            }));
        }

        Ok(None)
    }

    pub fn on_form_cleared<T: Transport>(&mut self, mgr: &mut WidgetStateManager<T>) -> Result<()> {
        self.edit.value = self.element.default_value().map(str::to_string);
        self.commit(Source::UI, mgr)
    }

    pub fn unmount<T: Transport>(&mut self, mgr: &mut WidgetStateManager<T>) {
        mgr.remove_form_cleared_listener(&self.key());
        self.mounted = false;
    }

    /// Instruction line, present only while focused.
    pub fn instructions<T: Transport>(
        &self,
        ctx: ViewContext,
        mgr: &WidgetStateManager<T>,
    ) -> Option<Vec<InstructionMessage>> {
        if !self.edit.focused {
            return None;
        }

        let widget = self.element.widget_ref();
        let allow_enter_to_submit = if widget.in_form() {
            mgr.allow_form_enter_to_submit(widget.form_id)
        } else {
            self.edit.dirty
        };

        let hint = InputInstructions {
            dirty: self.edit.dirty,
            value: self.text(),
            in_form: widget.in_form(),
            max_length: self.element.max_chars(),
            kind: E::KIND,
            allow_enter_to_submit,
            platform: ctx.platform,
        };
        Some(hint.messages())
    }

    fn is_apply_key(key: &KeyEvent) -> bool {
        match E::KIND {
            InputKind::SingleLine => key.is_enter(),
            InputKind::MultiLine => key.is_enter() && (key.ctrl || key.meta),
        }
    }

    fn commit<T: Transport>(
        &mut self,
        source: Source,
        mgr: &mut WidgetStateManager<T>,
    ) -> Result<()> {
        mgr.set_string_value(
            self.element.widget_ref(),
            self.edit.value.clone(),
            source,
            self.fragment_id.as_deref(),
        )?;
        self.edit.dirty = false;
        Ok(())
    }
}
