use crate::error::Result;
use crate::store::WidgetStates;
use crate::value::WidgetValue;
use crate::widget_id::WidgetKey;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormPhase {
    #[default]
    Clean,
    Dirty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitButton {
    pub id: String,
    pub disabled: bool,
}

/// Form summary published to the transport whenever it changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormsData {
    pub forms_with_pending_changes: BTreeSet<String>,
    pub submit_buttons: BTreeMap<String, Vec<SubmitButton>>,
}

#[derive(Debug, Clone)]
pub struct FormState {
    pub pending: WidgetStates,
    pub clear_on_submit: bool,
    pub enter_to_submit: bool,
    phase: FormPhase,
    cleared_listeners: BTreeSet<WidgetKey>,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            pending: WidgetStates::new(),
            clear_on_submit: false,
            enter_to_submit: true,
            phase: FormPhase::Clean,
            cleared_listeners: BTreeSet::new(),
        }
    }
}

impl FormState {
    pub fn phase(&self) -> FormPhase {
        self.phase
    }
}

/// Widgets whose controls must reset to their defaults after a form was
/// submitted with `clear_on_submit`, or explicitly cleared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormClear {
    pub form_id: String,
    pub widgets: Vec<WidgetKey>,
}

#[derive(Debug, Default)]
pub struct Forms {
    forms: HashMap<String, FormState>,
    submit_buttons: BTreeMap<String, Vec<SubmitButton>>,
    published: FormsData,
}

impl Forms {
    pub fn get(&self, form_id: &str) -> Option<&FormState> {
        self.forms.get(form_id)
    }

    pub fn get_or_create(&mut self, form_id: &str) -> &mut FormState {
        self.forms.entry(form_id.to_string()).or_default()
    }

    pub fn phase(&self, form_id: &str) -> FormPhase {
        self.forms
            .get(form_id)
            .map(FormState::phase)
            .unwrap_or_default()
    }

    pub fn pending_value(&self, key: &WidgetKey) -> Option<&WidgetValue> {
        self.forms.get(&key.form_id)?.pending.get(key)
    }

    /// Buffers a user commit. `mark_dirty` is false while the form is being
    /// reset after a submit or clear.
    pub fn stage(&mut self, key: &WidgetKey, value: WidgetValue, mark_dirty: bool) -> Result<()> {
        let form = self.get_or_create(&key.form_id);
        form.pending.set(key, value)?;
        if mark_dirty && form.phase == FormPhase::Clean {
            log::debug!("form {} is dirty", key.form_id);
            form.phase = FormPhase::Dirty;
        }
        Ok(())
    }

    /// Moves the pending values out of the form, leaving it clean.
    pub fn take_pending(&mut self, form_id: &str) -> WidgetStates {
        let form = self.get_or_create(form_id);
        form.phase = FormPhase::Clean;
        std::mem::take(&mut form.pending)
    }

    /// Drops one pending value. The form turns clean once nothing is left.
    pub fn remove_pending(&mut self, key: &WidgetKey) -> Option<WidgetValue> {
        let form = self.forms.get_mut(&key.form_id)?;
        let removed = form.pending.remove(key);
        if form.pending.is_empty() {
            form.phase = FormPhase::Clean;
        }
        removed
    }

    pub fn pending(&self, form_id: &str) -> Option<&WidgetStates> {
        self.forms.get(form_id).map(|form| &form.pending)
    }

    pub fn set_submit_behaviors(
        &mut self,
        form_id: &str,
        clear_on_submit: bool,
        enter_to_submit: bool,
    ) {
        let form = self.get_or_create(form_id);
        form.clear_on_submit = clear_on_submit;
        form.enter_to_submit = enter_to_submit;
    }

    pub fn add_submit_button(&mut self, form_id: &str, button: SubmitButton) {
        let buttons = self.submit_buttons.entry(form_id.to_string()).or_default();
        match buttons.iter_mut().find(|existing| existing.id == button.id) {
            Some(existing) => *existing = button,
            None => buttons.push(button),
        }
    }

    pub fn remove_submit_button(&mut self, form_id: &str, button_id: &str) {
        if let Some(buttons) = self.submit_buttons.get_mut(form_id) {
            buttons.retain(|button| button.id != button_id);
            if buttons.is_empty() {
                self.submit_buttons.remove(form_id);
            }
        }
    }

    pub fn allow_enter_to_submit(&self, form_id: &str) -> bool {
        let Some(form) = self.forms.get(form_id) else {
            return false;
        };

        let first_button = self
            .submit_buttons
            .get(form_id)
            .and_then(|buttons| buttons.first());

        form.enter_to_submit && first_button.is_some_and(|button| !button.disabled)
    }

    pub fn add_cleared_listener(&mut self, key: &WidgetKey) {
        let form = self.get_or_create(&key.form_id);
        if !form.cleared_listeners.insert(key.clone()) {
            log::debug!("form-cleared listener for {key} already registered");
        }
    }

    pub fn remove_cleared_listener(&mut self, key: &WidgetKey) {
        let removed = self
            .forms
            .get_mut(&key.form_id)
            .is_some_and(|form| form.cleared_listeners.remove(key));

        if !removed {
            log::warn!("could not remove unregistered form-cleared listener for {key}");
        }
    }

    pub fn cleared_listeners(&self, form_id: &str) -> Vec<WidgetKey> {
        self.forms
            .get(form_id)
            .map(|form| form.cleared_listeners.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn clear_on_submit(&self, form_id: &str) -> bool {
        self.forms
            .get(form_id)
            .is_some_and(|form| form.clear_on_submit)
    }

    pub fn retain_active(&mut self, active: &HashSet<WidgetKey>) {
        for form in self.forms.values_mut() {
            form.pending.retain_active(active);
            if form.pending.is_empty() {
                form.phase = FormPhase::Clean;
            }
        }
    }

    pub fn summary(&self) -> FormsData {
        FormsData {
            forms_with_pending_changes: self
                .forms
                .iter()
                .filter(|(_, form)| form.phase == FormPhase::Dirty)
                .map(|(id, _)| id.clone())
                .collect(),
            submit_buttons: self.submit_buttons.clone(),
        }
    }

    /// Returns the new summary when it differs from the last published one.
    pub fn take_changed_summary(&mut self) -> Option<FormsData> {
        let summary = self.summary();
        if summary == self.published {
            return None;
        }

        self.published = summary.clone();
        Some(summary)
    }
}
