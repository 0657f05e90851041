use super::{SubmitRequest, ViewContext};
use crate::error::Result;
use crate::forms::SubmitButton;
use crate::manager::WidgetStateManager;
use crate::transport::Transport;
use crate::value::Source;
use crate::widget_id::WidgetRef;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FormSubmitButtonElement {
    pub id: String,
    pub label: String,
    pub form_id: String,
    #[serde(default)]
    pub help: Option<String>,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormSubmitButtonView {
    pub id: String,
    pub label: String,
    pub help: Option<String>,
    pub disabled: bool,
}

/// Submit button of a form. Registering it is what lets Enter submit the
/// form; clicking it records a trigger and asks for the submit.
#[derive(Debug)]
pub struct FormSubmitButton {
    element: FormSubmitButtonElement,
    dom_id: String,
    fragment_id: Option<String>,
}

impl FormSubmitButton {
    pub fn new(
        element: FormSubmitButtonElement,
        dom_id: String,
        fragment_id: Option<String>,
    ) -> Self {
        Self {
            element,
            dom_id,
            fragment_id,
        }
    }

    pub fn dom_id(&self) -> &str {
        &self.dom_id
    }

    pub fn form_id(&self) -> &str {
        &self.element.form_id
    }

    pub fn mount<T: Transport>(&mut self, mgr: &mut WidgetStateManager<T>) {
        mgr.add_submit_button(&self.element.form_id, self.registration());
    }

    pub fn update<T: Transport>(
        &mut self,
        element: FormSubmitButtonElement,
        fragment_id: Option<String>,
        mgr: &mut WidgetStateManager<T>,
    ) {
        if element.form_id != self.element.form_id {
            mgr.remove_submit_button(&self.element.form_id, &self.element.id);
        }
        self.element = element;
        self.fragment_id = fragment_id;
        mgr.add_submit_button(&self.element.form_id, self.registration());
    }

    pub fn unmount<T: Transport>(&mut self, mgr: &mut WidgetStateManager<T>) {
        mgr.remove_submit_button(&self.element.form_id, &self.element.id);
    }

    pub fn click<T: Transport>(
        &mut self,
        mgr: &mut WidgetStateManager<T>,
    ) -> Result<Option<SubmitRequest>> {
        if self.element.disabled {
            return Ok(None);
        }

        // Committed without notifying; the form submit carries it.
        mgr.set_trigger_value(
            WidgetRef::new(&self.element.id, ""),
            Source::FRAMEWORK,
            self.fragment_id.as_deref(),
        )?;

        Ok(Some(SubmitRequest {
            form_id: self.element.form_id.clone(),
            fragment_id: self.fragment_id.clone(),
        }))
    }

    pub fn view(&self, ctx: ViewContext) -> FormSubmitButtonView {
        FormSubmitButtonView {
            id: self.dom_id.clone(),
            label: self.element.label.clone(),
            help: self.element.help.clone(),
            disabled: self.element.disabled || ctx.inputs_disabled,
        }
    }

    fn registration(&self) -> SubmitButton {
        SubmitButton {
            id: self.element.id.clone(),
            disabled: self.element.disabled,
        }
    }
}
