use super::instructions::{InputInstructions, InputKind, InstructionMessage};
use super::number_format::{
    Number, NumberDataType, can_decrement, can_increment, format_value, get_step,
    parse_float_text, parse_int_text, step_down, step_up,
};
use super::{
    EditState, KeyEvent, LabelVisibility, ServerPush, SubmitRequest, SyncPhase, ViewContext,
    WidgetLabel,
};
use crate::error::Result;
use crate::manager::WidgetStateManager;
use crate::transport::Transport;
use crate::value::Source;
use crate::widget_id::{WidgetKey, WidgetRef};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NumberInputElement {
    pub id: String,
    pub label: String,
    pub data_type: NumberDataType,
    #[serde(default)]
    pub default: Option<Number>,
    #[serde(default)]
    pub value: Option<Number>,
    #[serde(default)]
    pub set_value: bool,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub step: Option<f64>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub form_id: String,
    #[serde(default)]
    pub help: Option<String>,
    #[serde(default)]
    pub label_visibility: LabelVisibility,
    #[serde(default)]
    pub disabled: bool,
}

impl NumberInputElement {
    pub fn widget_ref(&self) -> WidgetRef<'_> {
        WidgetRef::new(&self.id, &self.form_id)
    }

    pub fn take_server_push(&mut self) -> Option<ServerPush<Option<Number>>> {
        std::mem::take(&mut self.set_value).then_some(ServerPush { value: self.value })
    }

    fn default_value(&self) -> Option<Number> {
        self.default.map(|value| value.coerce(self.data_type))
    }

    fn in_bounds(&self, value: Number) -> bool {
        let value = value.to_f64();
        value >= self.min() && value <= self.max()
    }

    fn min(&self) -> f64 {
        self.min.unwrap_or(f64::NEG_INFINITY)
    }

    fn max(&self) -> f64 {
        self.max.unwrap_or(f64::INFINITY)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumberInputView {
    pub label: WidgetLabel,
    pub display: String,
    pub placeholder: Option<String>,
    pub focused: bool,
    pub invalid: bool,
    pub disabled: bool,
    pub clearable: bool,
    pub can_increment: bool,
    pub can_decrement: bool,
    pub instructions: Option<Vec<InstructionMessage>>,
}

#[derive(Debug)]
pub struct NumberInput {
    element: NumberInputElement,
    dom_id: String,
    fragment_id: Option<String>,
    step: f64,
    edit: EditState<Option<Number>>,
    invalid: bool,
    mounted: bool,
}

impl NumberInput {
    /// Seeds the edit buffer from the store, falling back to the default.
    pub fn new<T: Transport>(
        element: NumberInputElement,
        dom_id: String,
        fragment_id: Option<String>,
        mgr: &WidgetStateManager<T>,
    ) -> Self {
        let step = get_step(element.step, element.data_type);
        let stored = match element.data_type {
            NumberDataType::Int => mgr.get_int_value(element.widget_ref()).map(Number::Int),
            NumberDataType::Float => mgr.get_double_value(element.widget_ref()).map(Number::Float),
        };
        let value = stored.or(element.default_value());
        let formatted = format_value(value, element.data_type, element.format.as_deref(), step);

        Self {
            element,
            dom_id,
            fragment_id,
            step,
            edit: EditState::new(value, formatted),
            invalid: false,
            mounted: false,
        }
    }

    pub fn key(&self) -> WidgetKey {
        self.element.widget_ref().key()
    }

    pub fn dom_id(&self) -> &str {
        &self.dom_id
    }

    pub fn value(&self) -> Option<f64> {
        self.edit.value.map(Number::to_f64)
    }

    pub fn number(&self) -> Option<Number> {
        self.edit.value
    }

    pub fn is_dirty(&self) -> bool {
        self.edit.dirty
    }

    pub fn is_invalid(&self) -> bool {
        self.invalid
    }

    pub fn phase(&self) -> SyncPhase {
        self.edit.phase(self.mounted)
    }

    /// Mount-time sync: adopt a server push if there is one, otherwise
    /// register the current value so the store knows this widget.
    pub fn mount<T: Transport>(
        &mut self,
        push: Option<ServerPush<Option<Number>>>,
        mgr: &mut WidgetStateManager<T>,
    ) -> Result<()> {
        match push {
            Some(push) => self.apply_push(push, mgr)?,
            None => {
                self.commit_value(self.edit.value, Source::FRAMEWORK, mgr)?;
            }
        }
        mgr.add_form_cleared_listener(&self.key());
        self.mounted = true;
        Ok(())
    }

    pub fn update<T: Transport>(
        &mut self,
        element: NumberInputElement,
        fragment_id: Option<String>,
        push: Option<ServerPush<Option<Number>>>,
        mgr: &mut WidgetStateManager<T>,
    ) -> Result<()> {
        let step_changed =
            element.step != self.element.step || element.data_type != self.element.data_type;
        let previous = self.key();
        self.element = element;
        self.fragment_id = fragment_id;
        let moved = super::move_widget_key(&previous, &self.key(), mgr);

        if step_changed {
            self.step = get_step(self.element.step, self.element.data_type);
        }

        match push {
            Some(push) => self.apply_push(push, mgr),
            None if moved => {
                self.commit_value(self.edit.value, Source::FRAMEWORK, mgr)?;
                Ok(())
            }
            None => Ok(()),
        }
    }

    pub fn focus(&mut self) {
        self.edit.focused = true;
    }

    pub fn blur<T: Transport>(&mut self, mgr: &mut WidgetStateManager<T>) -> Result<()> {
        if self.edit.dirty {
            self.commit_value(self.edit.value, Source::UI, mgr)?;
        }
        self.edit.focused = false;
        Ok(())
    }

    /// Keystroke: only the edit buffer changes.
    pub fn input(&mut self, text: &str) {
        self.edit.dirty = true;

        if text.is_empty() {
            self.edit.value = None;
            self.edit.formatted = None;
            return;
        }

        self.edit.value = match self.element.data_type {
            NumberDataType::Int => parse_int_text(text).map(Number::Int),
            NumberDataType::Float => parse_float_text(text).map(Number::Float),
        };
        self.edit.formatted = Some(text.to_string());
    }

    pub fn increment<T: Transport>(&mut self, mgr: &mut WidgetStateManager<T>) -> Result<()> {
        if let Some(next) = self.edit.value.and_then(|value| step_up(value, self.step)) {
            if next.to_f64() <= self.element.max() {
                self.edit.dirty = true;
                self.commit_value(Some(next), Source::UI, mgr)?;
            }
        }
        Ok(())
    }

    pub fn decrement<T: Transport>(&mut self, mgr: &mut WidgetStateManager<T>) -> Result<()> {
        if let Some(next) = self.edit.value.and_then(|value| step_down(value, self.step)) {
            if next.to_f64() >= self.element.min() {
                self.edit.dirty = true;
                self.commit_value(Some(next), Source::UI, mgr)?;
            }
        }
        Ok(())
    }

    pub fn key_down<T: Transport>(
        &mut self,
        key: &KeyEvent,
        mgr: &mut WidgetStateManager<T>,
    ) -> Result<()> {
        match key.key.as_str() {
            "ArrowUp" => self.increment(mgr),
            "ArrowDown" => self.decrement(mgr),
            _ => Ok(()),
        }
    }

    /// Enter applies a dirty value and, inside a form that allows it, asks
    /// for the form to be submitted.
    pub fn key_press<T: Transport>(
        &mut self,
        key: &KeyEvent,
        mgr: &mut WidgetStateManager<T>,
    ) -> Result<Option<SubmitRequest>> {
        if !key.is_enter() {
            return Ok(None);
        }

        if self.edit.dirty {
            self.commit_value(self.edit.value, Source::UI, mgr)?;
        }

        if mgr.allow_form_enter_to_submit(&self.element.form_id) {
            return Ok(Some(SubmitRequest {
                form_id: self.element.form_id.clone(),
                fragment_id: self.fragment_id.clone(),
            }));
        }

        Ok(None)
    }

    pub fn on_form_cleared<T: Transport>(&mut self, mgr: &mut WidgetStateManager<T>) -> Result<()> {
        let default = self.element.default_value();
        self.edit.value = default;
        self.commit_value(default, Source::UI, mgr)?;
        Ok(())
    }

    pub fn unmount<T: Transport>(&mut self, mgr: &mut WidgetStateManager<T>) {
        mgr.remove_form_cleared_listener(&self.key());
        self.mounted = false;
    }

    pub fn view<T: Transport>(
        &self,
        ctx: ViewContext,
        mgr: &WidgetStateManager<T>,
    ) -> NumberInputView {
        let disabled = self.element.disabled || ctx.inputs_disabled;
        let display = self.edit.formatted.clone().unwrap_or_default();
        let in_form = self.element.widget_ref().in_form();
        let allow_enter_to_submit = if in_form {
            mgr.allow_form_enter_to_submit(&self.element.form_id)
        } else {
            self.edit.dirty
        };

        let instructions = self.edit.focused.then(|| {
            InputInstructions {
                dirty: self.edit.dirty,
                value: &display,
                in_form,
                max_length: None,
                kind: InputKind::SingleLine,
                allow_enter_to_submit,
                platform: ctx.platform,
            }
            .messages()
        });

        NumberInputView {
            label: WidgetLabel {
                text: self.element.label.clone(),
                for_id: self.dom_id.clone(),
                visibility: self.element.label_visibility,
                help: self.element.help.clone(),
                disabled,
            },
            placeholder: self.element.placeholder.clone(),
            focused: self.edit.focused,
            invalid: self.invalid,
            disabled,
            clearable: self.element.default.is_none() && !disabled,
            can_increment: can_increment(self.edit.value, self.step, self.element.max()),
            can_decrement: can_decrement(self.edit.value, self.step, self.element.min()),
            instructions,
            display,
        }
    }

    /// A pushed value outside the bounds is ignored and the buffer kept. On
    /// mount the kept value is still registered with the store.
    fn apply_push<T: Transport>(
        &mut self,
        push: ServerPush<Option<Number>>,
        mgr: &mut WidgetStateManager<T>,
    ) -> Result<()> {
        let value = push.value.map(|value| value.coerce(self.element.data_type));

        if let Some(value) = value {
            if !self.element.in_bounds(value) {
                log::warn!(
                    "number input {} ignored pushed value {value}: outside [{}, {}]",
                    self.element.id,
                    self.element.min(),
                    self.element.max()
                );
                if !self.mounted {
                    self.commit_value(self.edit.value, Source::FRAMEWORK, mgr)?;
                }
                return Ok(());
            }
        }

        self.edit.value = value;
        self.edit.formatted = self.format(value);
        self.commit_value(value, Source::FRAMEWORK, mgr)?;
        Ok(())
    }

    /// Writes `value` to the store unless it is out of bounds, in which case
    /// the buffer stays dirty and the control is flagged invalid. Returns
    /// whether the commit happened.
    fn commit_value<T: Transport>(
        &mut self,
        value: Option<Number>,
        source: Source,
        mgr: &mut WidgetStateManager<T>,
    ) -> Result<bool> {
        if let Some(candidate) = value {
            if !self.element.in_bounds(candidate) {
                log::debug!(
                    "number input {} rejected {candidate}: outside [{}, {}]",
                    self.element.id,
                    self.element.min(),
                    self.element.max()
                );
                self.invalid = true;
                return Ok(false);
            }
        }

        let data_type = self.element.data_type;
        let new_value = value
            .map(|value| value.coerce(data_type))
            .or(self.element.default_value());
        let widget = self.element.widget_ref();
        let fragment_id = self.fragment_id.as_deref();

        match data_type {
            NumberDataType::Int => {
                let value = new_value.map(Number::to_i64);
                mgr.set_int_value(widget, value, source, fragment_id)?
            }
            NumberDataType::Float => {
                let value = new_value.map(Number::to_f64);
                mgr.set_double_value(widget, value, source, fragment_id)?
            }
        }

        self.invalid = false;
        self.edit.dirty = false;
        self.edit.value = new_value;
        self.edit.formatted = self.format(new_value);
        Ok(true)
    }

    fn format(&self, value: Option<Number>) -> Option<String> {
        format_value(
            value,
            self.element.data_type,
            self.element.format.as_deref(),
            self.step,
        )
    }
}
