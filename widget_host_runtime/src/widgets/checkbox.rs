use super::{EditState, LabelVisibility, ServerPush, SyncPhase, ViewContext, WidgetLabel};
use crate::error::Result;
use crate::manager::WidgetStateManager;
use crate::transport::Transport;
use crate::value::Source;
use crate::widget_id::{WidgetKey, WidgetRef};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CheckboxElement {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub value: bool,
    #[serde(default)]
    pub set_value: bool,
    #[serde(default)]
    pub form_id: String,
    #[serde(default)]
    pub help: Option<String>,
    #[serde(default)]
    pub label_visibility: LabelVisibility,
    #[serde(default)]
    pub disabled: bool,
}

impl CheckboxElement {
    pub fn widget_ref(&self) -> WidgetRef<'_> {
        WidgetRef::new(&self.id, &self.form_id)
    }

    pub fn take_server_push(&mut self) -> Option<ServerPush<bool>> {
        std::mem::take(&mut self.set_value).then_some(ServerPush { value: self.value })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckboxView {
    pub label: WidgetLabel,
    pub checked: bool,
    pub disabled: bool,
}

/// Toggle control. A click is both the edit and the commit.
#[derive(Debug)]
pub struct Checkbox {
    element: CheckboxElement,
    dom_id: String,
    fragment_id: Option<String>,
    edit: EditState<bool>,
    mounted: bool,
}

impl Checkbox {
    pub fn new<T: Transport>(
        element: CheckboxElement,
        dom_id: String,
        fragment_id: Option<String>,
        mgr: &WidgetStateManager<T>,
    ) -> Self {
        let value = mgr
            .get_bool_value(element.widget_ref())
            .unwrap_or(element.default);

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

    pub fn value(&self) -> bool {
        self.edit.value
    }

    pub fn phase(&self) -> SyncPhase {
        self.edit.phase(self.mounted)
    }

    pub fn mount<T: Transport>(
        &mut self,
        push: Option<ServerPush<bool>>,
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
        element: CheckboxElement,
        fragment_id: Option<String>,
        push: Option<ServerPush<bool>>,
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

    pub fn toggle<T: Transport>(
        &mut self,
        checked: bool,
        mgr: &mut WidgetStateManager<T>,
    ) -> Result<()> {
        self.edit.value = checked;
        self.edit.dirty = true;
        self.commit(Source::UI, mgr)
    }

    pub fn on_form_cleared<T: Transport>(&mut self, mgr: &mut WidgetStateManager<T>) -> Result<()> {
        self.edit.value = self.element.default;
        self.commit(Source::UI, mgr)
    }

    pub fn unmount<T: Transport>(&mut self, mgr: &mut WidgetStateManager<T>) {
        mgr.remove_form_cleared_listener(&self.key());
        self.mounted = false;
    }

    pub fn view(&self, ctx: ViewContext) -> CheckboxView {
        let disabled = self.element.disabled || ctx.inputs_disabled;
        CheckboxView {
            label: WidgetLabel {
                text: self.element.label.clone(),
                for_id: self.dom_id.clone(),
                visibility: self.element.label_visibility,
                help: self.element.help.clone(),
                disabled,
            },
            checked: self.edit.value,
            disabled,
        }
    }

    fn commit<T: Transport>(
        &mut self,
        source: Source,
        mgr: &mut WidgetStateManager<T>,
    ) -> Result<()> {
        mgr.set_bool_value(
            self.element.widget_ref(),
            self.edit.value,
            source,
            self.fragment_id.as_deref(),
        )?;
        self.edit.dirty = false;
        Ok(())
    }
}
