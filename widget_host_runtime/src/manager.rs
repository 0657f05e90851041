use crate::error::Result;
use crate::forms::{FormClear, FormPhase, Forms, FormsData, SubmitButton};
use crate::store::WidgetStates;
use crate::transport::{RerunRequest, Transport};
use crate::value::{Source, WidgetState, WidgetValue};
use crate::widget_id::{WidgetKey, WidgetRef, is_valid_form_id};
use serde_json::Value;
use std::collections::HashSet;

/// Committed widget values plus form buffering, in front of a transport.
///
/// Every write is synchronous. A user commit on a standalone widget sends one
/// rerun request carrying the full committed snapshot; a user commit on a
/// widget inside a form is buffered until the form is submitted.
#[derive(Debug)]
pub struct WidgetStateManager<T: Transport> {
    committed: WidgetStates,
    forms: Forms,
    clearing_form: Option<String>,
    transport: T,
}

impl<T: Transport> WidgetStateManager<T> {
    pub fn new(transport: T) -> Self {
        Self {
            committed: WidgetStates::new(),
            forms: Forms::default(),
            clearing_form: None,
            transport,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn set_bool_value(
        &mut self,
        widget: WidgetRef<'_>,
        value: bool,
        source: Source,
        fragment_id: Option<&str>,
    ) -> Result<()> {
        self.commit(widget, WidgetValue::Bool(value), source, fragment_id)
    }

    pub fn set_int_value(
        &mut self,
        widget: WidgetRef<'_>,
        value: Option<i64>,
        source: Source,
        fragment_id: Option<&str>,
    ) -> Result<()> {
        self.commit(widget, WidgetValue::Int(value), source, fragment_id)
    }

    pub fn set_double_value(
        &mut self,
        widget: WidgetRef<'_>,
        value: Option<f64>,
        source: Source,
        fragment_id: Option<&str>,
    ) -> Result<()> {
        self.commit(widget, WidgetValue::Double(value), source, fragment_id)
    }

    pub fn set_string_value(
        &mut self,
        widget: WidgetRef<'_>,
        value: Option<String>,
        source: Source,
        fragment_id: Option<&str>,
    ) -> Result<()> {
        self.commit(widget, WidgetValue::String(value), source, fragment_id)
    }

    pub fn set_string_array_value(
        &mut self,
        widget: WidgetRef<'_>,
        value: Vec<String>,
        source: Source,
        fragment_id: Option<&str>,
    ) -> Result<()> {
        self.commit(widget, WidgetValue::StringArray(value), source, fragment_id)
    }

    pub fn set_int_array_value(
        &mut self,
        widget: WidgetRef<'_>,
        value: Vec<i64>,
        source: Source,
        fragment_id: Option<&str>,
    ) -> Result<()> {
        self.commit(widget, WidgetValue::IntArray(value), source, fragment_id)
    }

    pub fn set_double_array_value(
        &mut self,
        widget: WidgetRef<'_>,
        value: Vec<f64>,
        source: Source,
        fragment_id: Option<&str>,
    ) -> Result<()> {
        self.commit(widget, WidgetValue::DoubleArray(value), source, fragment_id)
    }

    pub fn set_json_value(
        &mut self,
        widget: WidgetRef<'_>,
        value: Value,
        source: Source,
        fragment_id: Option<&str>,
    ) -> Result<()> {
        self.commit(widget, WidgetValue::Json(value), source, fragment_id)
    }

    /// Sets a one-shot trigger. It rides along with exactly one rerun
    /// request and is dropped from the store afterwards.
    pub fn set_trigger_value(
        &mut self,
        widget: WidgetRef<'_>,
        source: Source,
        fragment_id: Option<&str>,
    ) -> Result<()> {
        self.commit(widget, WidgetValue::Trigger(true), source, fragment_id)
    }

    pub fn get_bool_value(&self, widget: WidgetRef<'_>) -> Option<bool> {
        match self.lookup(widget)? {
            WidgetValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn get_int_value(&self, widget: WidgetRef<'_>) -> Option<i64> {
        match self.lookup(widget)? {
            WidgetValue::Int(value) => *value,
            _ => None,
        }
    }

    pub fn get_double_value(&self, widget: WidgetRef<'_>) -> Option<f64> {
        match self.lookup(widget)? {
            WidgetValue::Double(value) => *value,
            _ => None,
        }
    }

    pub fn get_string_value(&self, widget: WidgetRef<'_>) -> Option<String> {
        match self.lookup(widget)? {
            WidgetValue::String(value) => value.clone(),
            _ => None,
        }
    }

    pub fn get_string_array_value(&self, widget: WidgetRef<'_>) -> Option<Vec<String>> {
        match self.lookup(widget)? {
            WidgetValue::StringArray(value) => Some(value.clone()),
            _ => None,
        }
    }

    pub fn get_int_array_value(&self, widget: WidgetRef<'_>) -> Option<Vec<i64>> {
        match self.lookup(widget)? {
            WidgetValue::IntArray(value) => Some(value.clone()),
            _ => None,
        }
    }

    pub fn get_double_array_value(&self, widget: WidgetRef<'_>) -> Option<Vec<f64>> {
        match self.lookup(widget)? {
            WidgetValue::DoubleArray(value) => Some(value.clone()),
            _ => None,
        }
    }

    pub fn get_json_value(&self, widget: WidgetRef<'_>) -> Option<Value> {
        match self.lookup(widget)? {
            WidgetValue::Json(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// Raw stored value, pending form value first.
    pub fn value_of(&self, widget: WidgetRef<'_>) -> Option<&WidgetValue> {
        self.lookup(widget)
    }

    pub fn allow_form_enter_to_submit(&self, form_id: &str) -> bool {
        is_valid_form_id(form_id) && self.forms.allow_enter_to_submit(form_id)
    }

    pub fn set_form_submit_behaviors(
        &mut self,
        form_id: &str,
        clear_on_submit: bool,
        enter_to_submit: bool,
    ) {
        self.forms
            .set_submit_behaviors(form_id, clear_on_submit, enter_to_submit);
    }

    pub fn add_submit_button(&mut self, form_id: &str, button: SubmitButton) {
        self.forms.add_submit_button(form_id, button);
        self.publish_forms_data();
    }

    pub fn remove_submit_button(&mut self, form_id: &str, button_id: &str) {
        self.forms.remove_submit_button(form_id, button_id);
        self.publish_forms_data();
    }

    pub fn form_phase(&self, form_id: &str) -> FormPhase {
        self.forms.phase(form_id)
    }

    pub fn forms_data(&self) -> FormsData {
        self.forms.summary()
    }

    pub fn add_form_cleared_listener(&mut self, key: &WidgetKey) {
        if key.in_form() {
            self.forms.add_cleared_listener(key);
        }
    }

    pub fn remove_form_cleared_listener(&mut self, key: &WidgetKey) {
        if key.in_form() {
            self.forms.remove_cleared_listener(key);
        }
    }

    pub fn form_cleared_listeners(&self, form_id: &str) -> Vec<WidgetKey> {
        self.forms.cleared_listeners(form_id)
    }

    /// Commits every pending value of the form and sends one rerun request.
    ///
    /// Returns the widgets that must reset to their defaults when the form
    /// clears on submit. Resets committed between this call and
    /// [`end_form_clear`](Self::end_form_clear) are buffered without making
    /// the form dirty again.
    pub fn submit_form(
        &mut self,
        form_id: &str,
        fragment_id: Option<&str>,
    ) -> Result<Option<FormClear>> {
        if !is_valid_form_id(form_id) {
            log::warn!("ignoring submit for empty form id");
            return Ok(None);
        }

        if let Some(pending) = self.forms.pending(form_id) {
            self.committed.check_merge(pending)?;
        }
        let pending = self.forms.take_pending(form_id);
        self.committed.copy_from(&pending)?;
        log::debug!("submitting form {form_id} with {} pending value(s)", pending.len());
        self.send_rerun(fragment_id);
        self.publish_forms_data();

        if self.forms.clear_on_submit(form_id) {
            Ok(Some(self.begin_form_clear(form_id)))
        } else {
            Ok(None)
        }
    }

    /// Drops the form's pending values without notifying the transport.
    pub fn clear_form(&mut self, form_id: &str) -> FormClear {
        let discarded = self.forms.take_pending(form_id);
        log::debug!("clearing form {form_id}; discarded {} value(s)", discarded.len());
        self.publish_forms_data();
        self.begin_form_clear(form_id)
    }

    pub fn end_form_clear(&mut self) {
        self.clearing_form = None;
    }

    /// Forgets values of elements the finished run no longer rendered.
    pub fn remove_inactive(&mut self, active: &HashSet<WidgetKey>) {
        self.committed.retain_active(active);
        self.forms.retain_active(active);
        self.publish_forms_data();
    }

    /// Drops every value held for one widget, committed or pending.
    pub fn forget(&mut self, key: &WidgetKey) {
        self.committed.remove(key);
        if key.in_form() {
            self.forms.remove_pending(key);
            self.publish_forms_data();
        }
    }

    pub fn widget_states_snapshot(&self) -> Vec<WidgetState> {
        self.committed.snapshot()
    }

    fn begin_form_clear(&mut self, form_id: &str) -> FormClear {
        self.clearing_form = Some(form_id.to_string());
        FormClear {
            form_id: form_id.to_string(),
            widgets: self.forms.cleared_listeners(form_id),
        }
    }

    fn commit(
        &mut self,
        widget: WidgetRef<'_>,
        value: WidgetValue,
        source: Source,
        fragment_id: Option<&str>,
    ) -> Result<()> {
        let key = widget.key();

        if widget.in_form() && source.from_ui {
            // A kind clash with the committed value fails here, not at submit.
            self.committed.check_kind(&key, value.kind())?;
            let resetting = self.clearing_form.as_deref() == Some(widget.form_id);
            self.forms.stage(&key, value, !resetting)?;
            self.publish_forms_data();
            return Ok(());
        }

        self.committed.set(&key, value)?;

        // A framework write supersedes any unsubmitted edit of the widget.
        if widget.in_form() && self.forms.remove_pending(&key).is_some() {
            log::debug!("framework value for {key} replaced its pending edit");
            self.publish_forms_data();
        }

        if source.from_ui {
            self.send_rerun(fragment_id);
        }

        Ok(())
    }

    fn lookup(&self, widget: WidgetRef<'_>) -> Option<&WidgetValue> {
        let key = widget.key();
        if widget.in_form() {
            if let Some(value) = self.forms.pending_value(&key) {
                return Some(value);
            }
        }
        self.committed.get(&key)
    }

    fn send_rerun(&mut self, fragment_id: Option<&str>) {
        let request = RerunRequest {
            widget_states: self.committed.snapshot(),
            fragment_id: fragment_id.map(str::to_string),
        };
        self.transport.send_rerun(request);
        self.committed.remove_triggers();
    }

    fn publish_forms_data(&mut self) {
        if let Some(summary) = self.forms.take_changed_summary() {
            self.transport.forms_data_changed(&summary);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{ChannelTransport, TransportEvent};
    use std::sync::mpsc::{self, Receiver};

    fn manager() -> (WidgetStateManager<ChannelTransport>, Receiver<TransportEvent>) {
        let (tx, rx) = mpsc::channel();
        (WidgetStateManager::new(ChannelTransport::new(tx)), rx)
    }

    fn reruns(rx: &Receiver<TransportEvent>) -> Vec<RerunRequest> {
        rx.try_iter()
            .filter_map(|event| match event {
                TransportEvent::Rerun(request) => Some(request),
                TransportEvent::FormsDataChanged(_) => None,
            })
            .collect()
    }

    #[test]
    fn framework_commit_does_not_notify() {
        let (mut mgr, rx) = manager();
        let widget = WidgetRef::new("w1", "");

        mgr.set_bool_value(widget, true, Source::FRAMEWORK, None)
            .expect("commit");

        assert_eq!(mgr.get_bool_value(widget), Some(true));
        assert!(reruns(&rx).is_empty());
    }

    #[test]
    fn ui_commit_sends_snapshot_with_fragment() {
        let (mut mgr, rx) = manager();
        let widget = WidgetRef::new("w1", "");

        mgr.set_int_value(widget, Some(7), Source::UI, Some("frag"))
            .expect("commit");

        let sent = reruns(&rx);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].fragment_id.as_deref(), Some("frag"));
        assert_eq!(
            sent[0].state_of("w1").map(|state| &state.value),
            Some(&WidgetValue::Int(Some(7)))
        );
    }

    #[test]
    fn repeated_ui_commits_each_notify() {
        let (mut mgr, rx) = manager();
        let widget = WidgetRef::new("w1", "");

        mgr.set_string_value(widget, Some("a".to_string()), Source::UI, None)
            .expect("first");
        mgr.set_string_value(widget, Some("a".to_string()), Source::UI, None)
            .expect("second");

        assert_eq!(reruns(&rx).len(), 2);
        assert_eq!(mgr.get_string_value(widget).as_deref(), Some("a"));
    }

    #[test]
    fn unset_widget_reads_as_none() {
        let (mgr, _rx) = manager();
        let widget = WidgetRef::new("missing", "");
        assert_eq!(mgr.get_bool_value(widget), None);
        assert_eq!(mgr.get_double_value(widget), None);
        assert_eq!(mgr.get_string_array_value(widget), None);
    }

    #[test]
    fn kind_mismatch_fails_fast() {
        let (mut mgr, _rx) = manager();
        let widget = WidgetRef::new("w1", "");
        mgr.set_bool_value(widget, true, Source::FRAMEWORK, None)
            .expect("commit bool");

        assert!(
            mgr.set_double_value(widget, Some(1.0), Source::UI, None)
                .is_err()
        );
    }

    #[test]
    fn form_commits_are_buffered_until_submit() {
        let (mut mgr, rx) = manager();
        let widget = WidgetRef::new("w1", "form");

        mgr.set_string_value(widget, Some("draft".to_string()), Source::UI, None)
            .expect("commit");

        assert_eq!(mgr.get_string_value(widget).as_deref(), Some("draft"));
        assert_eq!(mgr.form_phase("form"), FormPhase::Dirty);
        assert!(reruns(&rx).is_empty());

        let cleared = mgr.submit_form("form", None).expect("submit");
        assert!(cleared.is_none());
        assert_eq!(mgr.form_phase("form"), FormPhase::Clean);

        let sent = reruns(&rx);
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].state_of("w1").map(|state| &state.value),
            Some(&WidgetValue::String(Some("draft".to_string())))
        );
    }

    #[test]
    fn framework_commit_in_form_goes_straight_to_store() {
        let (mut mgr, rx) = manager();
        let widget = WidgetRef::new("w1", "form");

        mgr.set_bool_value(widget, false, Source::FRAMEWORK, None)
            .expect("mount sync");

        assert_eq!(mgr.form_phase("form"), FormPhase::Clean);
        assert_eq!(mgr.widget_states_snapshot().len(), 1);
        assert!(rx.try_iter().next().is_none());
    }

    #[test]
    fn forms_data_tracks_pending_changes() {
        let (mut mgr, rx) = manager();
        mgr.set_bool_value(WidgetRef::new("w1", "form"), true, Source::UI, None)
            .expect("commit");

        let updates: Vec<FormsData> = rx
            .try_iter()
            .filter_map(|event| match event {
                TransportEvent::FormsDataChanged(data) => Some(data),
                TransportEvent::Rerun(_) => None,
            })
            .collect();
        assert_eq!(updates.len(), 1);
        assert!(updates[0].forms_with_pending_changes.contains("form"));
    }

    #[test]
    fn clear_on_submit_returns_listeners_and_resets_stay_clean() {
        let (mut mgr, rx) = manager();
        let key = WidgetKey::new("w1", "form");
        mgr.set_form_submit_behaviors("form", true, true);
        mgr.add_form_cleared_listener(&key);

        mgr.set_bool_value(key.widget_ref(), true, Source::UI, None)
            .expect("edit");
        let clear = mgr
            .submit_form("form", None)
            .expect("submit")
            .expect("form clears on submit");
        assert_eq!(clear.widgets, vec![key.clone()]);

        mgr.set_bool_value(key.widget_ref(), false, Source::UI, None)
            .expect("reset");
        mgr.end_form_clear();

        assert_eq!(mgr.get_bool_value(key.widget_ref()), Some(false));
        assert_eq!(mgr.form_phase("form"), FormPhase::Clean);

        let sent = reruns(&rx);
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].state_of("w1").map(|state| &state.value),
            Some(&WidgetValue::Bool(true))
        );
    }

    #[test]
    fn clear_form_discards_pending_without_notifying() {
        let (mut mgr, rx) = manager();
        let widget = WidgetRef::new("w1", "form");
        mgr.set_int_value(widget, Some(1), Source::FRAMEWORK, None)
            .expect("mount");
        mgr.set_int_value(widget, Some(5), Source::UI, None)
            .expect("edit");

        let clear = mgr.clear_form("form");
        mgr.end_form_clear();

        assert_eq!(clear.form_id, "form");
        assert_eq!(mgr.get_int_value(widget), Some(1));
        assert_eq!(mgr.form_phase("form"), FormPhase::Clean);
        assert!(reruns(&rx).is_empty());
    }

    #[test]
    fn trigger_is_sent_once() {
        let (mut mgr, rx) = manager();
        let button = WidgetRef::new("button", "");
        let other = WidgetRef::new("other", "");

        mgr.set_trigger_value(button, Source::UI, None)
            .expect("trigger");
        mgr.set_bool_value(other, true, Source::UI, None)
            .expect("other");

        let sent = reruns(&rx);
        assert_eq!(sent.len(), 2);
        assert!(sent[0].state_of("button").is_some());
        assert!(sent[1].state_of("button").is_none());
    }

    #[test]
    fn remove_inactive_prunes_committed_values() {
        let (mut mgr, _rx) = manager();
        mgr.set_bool_value(WidgetRef::new("a", ""), true, Source::FRAMEWORK, None)
            .expect("a");
        mgr.set_bool_value(WidgetRef::new("b", ""), true, Source::FRAMEWORK, None)
            .expect("b");

        let active: HashSet<WidgetKey> = [WidgetKey::new("a", "")].into_iter().collect();
        mgr.remove_inactive(&active);

        assert_eq!(mgr.get_bool_value(WidgetRef::new("a", "")), Some(true));
        assert_eq!(mgr.get_bool_value(WidgetRef::new("b", "")), None);
    }

    #[test]
    fn standalone_widget_never_allows_enter_to_submit() {
        let (mut mgr, _rx) = manager();
        mgr.add_submit_button(
            "form",
            SubmitButton {
                id: "submit".to_string(),
                disabled: false,
            },
        );
        mgr.set_form_submit_behaviors("form", false, true);

        assert!(mgr.allow_form_enter_to_submit("form"));
        assert!(!mgr.allow_form_enter_to_submit(""));
    }

    #[test]
    fn forget_allows_a_new_kind_under_the_same_id() {
        let (mut mgr, _rx) = manager();
        let widget = WidgetRef::new("w1", "form");
        mgr.set_bool_value(widget, true, Source::UI, None)
            .expect("stage bool");
        assert_eq!(mgr.form_phase("form"), FormPhase::Dirty);

        mgr.forget(&widget.key());
        assert_eq!(mgr.form_phase("form"), FormPhase::Clean);

        mgr.set_string_value(widget, Some("text".to_string()), Source::UI, None)
            .expect("stage string");
        assert_eq!(mgr.get_string_value(widget).as_deref(), Some("text"));
    }

    #[test]
    fn same_element_id_in_another_form_is_another_widget() {
        let (mut mgr, _rx) = manager();
        mgr.set_bool_value(WidgetRef::new("w1", ""), true, Source::FRAMEWORK, None)
            .expect("standalone");

        assert_eq!(mgr.get_bool_value(WidgetRef::new("w1", "form")), None);

        mgr.set_string_value(
            WidgetRef::new("w1", "form"),
            Some("x".to_string()),
            Source::FRAMEWORK,
            None,
        )
        .expect("different widget, different kind");
        assert_eq!(mgr.get_bool_value(WidgetRef::new("w1", "")), Some(true));
        assert_eq!(mgr.widget_states_snapshot().len(), 2);
    }

    #[test]
    fn framework_commit_replaces_pending_form_edit() {
        let (mut mgr, rx) = manager();
        let widget = WidgetRef::new("name", "form");
        mgr.set_string_value(widget, Some("draft".to_string()), Source::UI, None)
            .expect("edit");
        assert_eq!(mgr.form_phase("form"), FormPhase::Dirty);

        mgr.set_string_value(widget, Some("pushed".to_string()), Source::FRAMEWORK, None)
            .expect("push");

        assert_eq!(mgr.get_string_value(widget).as_deref(), Some("pushed"));
        assert_eq!(mgr.form_phase("form"), FormPhase::Clean);
        assert!(mgr.forms_data().forms_with_pending_changes.is_empty());

        mgr.submit_form("form", None).expect("submit");
        let sent = reruns(&rx);
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].state_of("name").map(|state| &state.value),
            Some(&WidgetValue::String(Some("pushed".to_string())))
        );
    }

    #[test]
    fn staging_a_different_kind_than_committed_fails_at_commit() {
        let (mut mgr, rx) = manager();
        let widget = WidgetRef::new("w1", "form");
        mgr.set_int_value(widget, Some(1), Source::FRAMEWORK, None)
            .expect("mount");

        assert!(
            mgr.set_bool_value(widget, true, Source::UI, None)
                .is_err()
        );
        assert_eq!(mgr.form_phase("form"), FormPhase::Clean);

        mgr.set_int_value(widget, Some(2), Source::UI, None)
            .expect("edit");
        mgr.submit_form("form", None).expect("submit");
        assert_eq!(mgr.get_int_value(widget), Some(2));
        assert_eq!(reruns(&rx).len(), 1);
    }
}
