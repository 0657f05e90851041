//! Mounted controls of one app session and the routing of renders, user
//! events and form actions to them.

use crate::error::Result;
use crate::forms::FormClear;
use crate::manager::WidgetStateManager;
use crate::transport::Transport;
use crate::widget_id::{DomIdAllocator, WidgetKey, is_valid_form_id};
use crate::widgets::{
    Checkbox, CheckboxElement, CheckboxView, FormSubmitButton, FormSubmitButtonElement,
    FormSubmitButtonView, KeyEvent, NumberInput, NumberInputElement, NumberInputView, Platform,
    SubmitRequest, TextArea, TextAreaElement, TextAreaView, TextElement, TextInput,
    TextInputElement, TextInputView, ViewContext,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Form container declared by a render.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FormElement {
    pub form_id: String,
    #[serde(default)]
    pub clear_on_submit: bool,
    #[serde(default = "default_enter_to_submit")]
    pub enter_to_submit: bool,
}

fn default_enter_to_submit() -> bool {
    true
}

/// Element descriptor as sent by the script host.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
    Form(FormElement),
    Checkbox(CheckboxElement),
    NumberInput(NumberInputElement),
    TextArea(TextAreaElement),
    TextInput(TextInputElement),
    FormSubmitButton(FormSubmitButtonElement),
}

impl Element {
    fn kind(&self) -> &'static str {
        match self {
            Element::Form(_) => "form",
            Element::Checkbox(_) => "checkbox",
            Element::NumberInput(_) => "number_input",
            Element::TextArea(_) => "text_area",
            Element::TextInput(_) => "text_input",
            Element::FormSubmitButton(_) => "form_submit_button",
        }
    }

    fn control_key(&self) -> Option<WidgetKey> {
        match self {
            Element::Form(_) => None,
            Element::Checkbox(element) => Some(element.widget_ref().key()),
            Element::NumberInput(element) => Some(element.widget_ref().key()),
            Element::TextArea(element) => Some(element.widget_ref().key()),
            Element::TextInput(element) => Some(element.widget_ref().key()),
            Element::FormSubmitButton(element) => {
                Some(WidgetKey::new(&element.id, &element.form_id))
            }
        }
    }
}

/// Interaction reported by the renderer for one control.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UserEvent {
    Focus,
    Blur,
    Input { text: String },
    KeyDown(KeyEvent),
    KeyPress(KeyEvent),
    Toggle { checked: bool },
    Increment,
    Decrement,
    Click,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlView {
    Checkbox(CheckboxView),
    NumberInput(NumberInputView),
    TextArea(TextAreaView),
    TextInput(TextInputView),
    FormSubmitButton(FormSubmitButtonView),
}

#[derive(Debug)]
enum Control {
    Checkbox(Checkbox),
    NumberInput(NumberInput),
    TextArea(TextArea),
    TextInput(TextInput),
    FormSubmitButton(FormSubmitButton),
}

impl Control {
    fn key(&self) -> Option<WidgetKey> {
        match self {
            Control::Checkbox(control) => Some(control.key()),
            Control::NumberInput(control) => Some(control.key()),
            Control::TextArea(control) => Some(control.key()),
            Control::TextInput(control) => Some(control.key()),
            Control::FormSubmitButton(_) => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Control::Checkbox(_) => "checkbox",
            Control::NumberInput(_) => "number_input",
            Control::TextArea(_) => "text_area",
            Control::TextInput(_) => "text_input",
            Control::FormSubmitButton(_) => "form_submit_button",
        }
    }

    fn unmount<T: Transport>(&mut self, mgr: &mut WidgetStateManager<T>) {
        match self {
            Control::Checkbox(control) => control.unmount(mgr),
            Control::NumberInput(control) => control.unmount(mgr),
            Control::TextArea(control) => control.unmount(mgr),
            Control::TextInput(control) => control.unmount(mgr),
            Control::FormSubmitButton(control) => control.unmount(mgr),
        }
    }

    fn on_form_cleared<T: Transport>(&mut self, mgr: &mut WidgetStateManager<T>) -> Result<()> {
        match self {
            Control::Checkbox(control) => control.on_form_cleared(mgr),
            Control::NumberInput(control) => control.on_form_cleared(mgr),
            Control::TextArea(control) => control.on_form_cleared(mgr),
            Control::TextInput(control) => control.on_form_cleared(mgr),
            Control::FormSubmitButton(_) => Ok(()),
        }
    }
}

/// Owns the widget state manager, the DOM id allocator and every mounted
/// control. Server pushes reach controls only through [`apply_render`].
///
/// [`apply_render`]: WidgetSession::apply_render
#[derive(Debug)]
pub struct WidgetSession<T: Transport> {
    mgr: WidgetStateManager<T>,
    dom_ids: DomIdAllocator,
    controls: BTreeMap<WidgetKey, Control>,
    platform: Platform,
    inputs_disabled: bool,
}

impl<T: Transport> WidgetSession<T> {
    pub fn new(transport: T, platform: Platform) -> Self {
        Self {
            mgr: WidgetStateManager::new(transport),
            dom_ids: DomIdAllocator::new(),
            controls: BTreeMap::new(),
            platform,
            inputs_disabled: false,
        }
    }

    pub fn manager(&self) -> &WidgetStateManager<T> {
        &self.mgr
    }

    pub fn manager_mut(&mut self) -> &mut WidgetStateManager<T> {
        &mut self.mgr
    }

    pub fn set_inputs_disabled(&mut self, disabled: bool) {
        self.inputs_disabled = disabled;
    }

    pub fn inputs_disabled(&self) -> bool {
        self.inputs_disabled
    }

    pub fn is_mounted(&self, id: &str) -> bool {
        self.controls.keys().any(|key| key.element_id == id)
    }

    pub fn control_keys(&self) -> impl Iterator<Item = &WidgetKey> {
        self.controls.keys()
    }

    /// The mounted control with element id `id`, when exactly one matches.
    /// The same id under two forms needs the form to tell them apart.
    pub fn resolve(&self, id: &str) -> Option<&WidgetKey> {
        let mut matches = self.controls.keys().filter(|key| key.element_id == id);
        let key = matches.next()?;
        if matches.next().is_some() {
            log::warn!("element id {id} is mounted in several forms; a form id is needed");
            return None;
        }
        Some(key)
    }

    /// Applies the element tree of a finished script run.
    ///
    /// New elements are mounted, known ones updated (a pending server push
    /// is delivered exactly once), and on a full run everything the run did
    /// not render is unmounted and its committed value forgotten. Fragment
    /// runs only touch the elements they carry.
    pub fn apply_render(
        &mut self,
        elements: Vec<Element>,
        fragment_id: Option<&str>,
    ) -> Result<()> {
        let mut active: HashSet<WidgetKey> = HashSet::new();

        for element in elements {
            if let Some(key) = element.control_key() {
                if active.contains(&key) {
                    log::warn!("duplicate widget {key} in render; keeping the first");
                    continue;
                }
                self.retire_if_kind_changed(&key, element.kind());
                active.insert(key);
            }
            self.apply_element(element, fragment_id.map(str::to_string))?;
        }

        if fragment_id.is_none() {
            let gone: Vec<WidgetKey> = self
                .controls
                .keys()
                .filter(|key| !active.contains(*key))
                .cloned()
                .collect();
            for key in gone {
                if let Some(mut control) = self.controls.remove(&key) {
                    log::debug!("unmounting {} {key}", control.kind());
                    control.unmount(&mut self.mgr);
                }
            }
            self.mgr.remove_inactive(&active);
        }

        Ok(())
    }

    /// Routes a user interaction to the control with element id `id`.
    /// Events for unknown or ambiguous ids and events the control does not
    /// understand are dropped.
    pub fn dispatch(&mut self, id: &str, event: UserEvent) -> Result<()> {
        match self.resolve(id).cloned() {
            Some(key) => self.dispatch_to(&key, event),
            None => {
                log::warn!("no single widget with id {id}; dropping {event:?}");
                Ok(())
            }
        }
    }

    pub fn dispatch_to(&mut self, key: &WidgetKey, event: UserEvent) -> Result<()> {
        if self.inputs_disabled {
            log::debug!("inputs disabled; ignoring {event:?} for {key}");
            return Ok(());
        }

        let Some(control) = self.controls.get_mut(key) else {
            log::warn!("event for unknown widget {key}");
            return Ok(());
        };

        let mgr = &mut self.mgr;
        let submit = match (control, event) {
            (Control::Checkbox(checkbox), UserEvent::Toggle { checked }) => {
                checkbox.toggle(checked, mgr)?;
                None
            }
            (Control::NumberInput(input), UserEvent::Focus) => {
                input.focus();
                None
            }
            (Control::NumberInput(input), UserEvent::Blur) => {
                input.blur(mgr)?;
                None
            }
            (Control::NumberInput(input), UserEvent::Input { text }) => {
                input.input(&text);
                None
            }
            (Control::NumberInput(input), UserEvent::KeyDown(key)) => {
                input.key_down(&key, mgr)?;
                None
            }
            (Control::NumberInput(input), UserEvent::KeyPress(key)) => input.key_press(&key, mgr)?,
            (Control::NumberInput(input), UserEvent::Increment) => {
                input.increment(mgr)?;
                None
            }
            (Control::NumberInput(input), UserEvent::Decrement) => {
                input.decrement(mgr)?;
                None
            }
            (Control::TextArea(area), event) => text_event(area, event, mgr)?,
            (Control::TextInput(input), event) => text_event(input, event, mgr)?,
            (Control::FormSubmitButton(button), UserEvent::Click) => button.click(mgr)?,
            (control, event) => {
                log::debug!("{} {key} ignores {event:?}", control.kind());
                None
            }
        };

        match submit {
            Some(request) => self.submit_form(&request.form_id, request.fragment_id.as_deref()),
            None => Ok(()),
        }
    }

    /// Submits the form and, when it clears on submit, resets its controls.
    pub fn submit_form(&mut self, form_id: &str, fragment_id: Option<&str>) -> Result<()> {
        match self.mgr.submit_form(form_id, fragment_id)? {
            Some(clear) => self.reset_form(clear),
            None => Ok(()),
        }
    }

    pub fn clear_form(&mut self, form_id: &str) -> Result<()> {
        if !is_valid_form_id(form_id) {
            return Ok(());
        }
        let clear = self.mgr.clear_form(form_id);
        self.reset_form(clear)
    }

    pub fn view(&self, id: &str) -> Option<ControlView> {
        self.view_of(self.resolve(id)?)
    }

    pub fn view_of(&self, key: &WidgetKey) -> Option<ControlView> {
        let ctx = ViewContext {
            platform: self.platform,
            inputs_disabled: self.inputs_disabled,
        };

        let view = match self.controls.get(key)? {
            Control::Checkbox(control) => ControlView::Checkbox(control.view(ctx)),
            Control::NumberInput(control) => ControlView::NumberInput(control.view(ctx, &self.mgr)),
            Control::TextArea(control) => ControlView::TextArea(control.view(ctx, &self.mgr)),
            Control::TextInput(control) => ControlView::TextInput(control.view(ctx, &self.mgr)),
            Control::FormSubmitButton(control) => ControlView::FormSubmitButton(control.view(ctx)),
        };
        Some(view)
    }

    /// A different element type under a known id starts from scratch: the
    /// old control is unmounted and its value forgotten.
    fn retire_if_kind_changed(&mut self, key: &WidgetKey, kind: &str) {
        let changed = self
            .controls
            .get(key)
            .is_some_and(|control| control.kind() != kind);
        if !changed {
            return;
        }

        if let Some(mut control) = self.controls.remove(key) {
            log::debug!("widget {key} changed from {} to {kind}; remounting", control.kind());
            control.unmount(&mut self.mgr);
            if control.key().is_some() {
                self.mgr.forget(key);
            }
        }
    }

    fn reset_form(&mut self, clear: FormClear) -> Result<()> {
        log::debug!(
            "resetting {} widget(s) of form {}",
            clear.widgets.len(),
            clear.form_id
        );

        let result = clear.widgets.iter().try_for_each(|key| {
            match self.controls.get_mut(key) {
                Some(control) => control.on_form_cleared(&mut self.mgr),
                None => {
                    log::warn!("form-cleared listener {key} has no mounted control");
                    Ok(())
                }
            }
        });

        self.mgr.end_form_clear();
        result
    }

    fn apply_element(&mut self, element: Element, fragment_id: Option<String>) -> Result<()> {
        let mgr = &mut self.mgr;

        match element {
            Element::Form(form) => {
                mgr.set_form_submit_behaviors(
                    &form.form_id,
                    form.clear_on_submit,
                    form.enter_to_submit,
                );
            }
            Element::Checkbox(mut element) => {
                let push = element.take_server_push();
                let key = element.widget_ref().key();
                match self.controls.get_mut(&key) {
                    Some(Control::Checkbox(control)) => {
                        control.update(element, fragment_id, push, mgr)?
                    }
                    _ => {
                        let dom_id = self.dom_ids.allocate("checkbox_");
                        let mut control = Checkbox::new(element, dom_id, fragment_id, mgr);
                        control.mount(push, mgr)?;
                        self.controls.insert(key, Control::Checkbox(control));
                    }
                }
            }
            Element::NumberInput(mut element) => {
                let push = element.take_server_push();
                let key = element.widget_ref().key();
                match self.controls.get_mut(&key) {
                    Some(Control::NumberInput(control)) => {
                        control.update(element, fragment_id, push, mgr)?
                    }
                    _ => {
                        let dom_id = self.dom_ids.allocate("number_input_");
                        let mut control = NumberInput::new(element, dom_id, fragment_id, mgr);
                        control.mount(push, mgr)?;
                        self.controls.insert(key, Control::NumberInput(control));
                    }
                }
            }
            Element::TextArea(mut element) => {
                let push = element.take_server_push();
                let key = element.widget_ref().key();
                match self.controls.get_mut(&key) {
                    Some(Control::TextArea(control)) => {
                        control.update(element, fragment_id, push, mgr)?
                    }
                    _ => {
                        let dom_id = self.dom_ids.allocate("text_area_");
                        let mut control = TextArea::new(element, dom_id, fragment_id, mgr);
                        control.mount(push, mgr)?;
                        self.controls.insert(key, Control::TextArea(control));
                    }
                }
            }
            Element::TextInput(mut element) => {
                let push = element.take_server_push();
                let key = element.widget_ref().key();
                match self.controls.get_mut(&key) {
                    Some(Control::TextInput(control)) => {
                        control.update(element, fragment_id, push, mgr)?
                    }
                    _ => {
                        let dom_id = self.dom_ids.allocate("text_input_");
                        let mut control = TextInput::new(element, dom_id, fragment_id, mgr);
                        control.mount(push, mgr)?;
                        self.controls.insert(key, Control::TextInput(control));
                    }
                }
            }
            Element::FormSubmitButton(element) => {
                let key = WidgetKey::new(&element.id, &element.form_id);
                match self.controls.get_mut(&key) {
                    Some(Control::FormSubmitButton(control)) => {
                        control.update(element, fragment_id, mgr)
                    }
                    _ => {
                        let dom_id = self.dom_ids.allocate("form_submit_button_");
                        let mut control = FormSubmitButton::new(element, dom_id, fragment_id);
                        control.mount(mgr);
                        self.controls.insert(key, Control::FormSubmitButton(control));
                    }
                }
            }
        }

        Ok(())
    }
}

fn text_event<E, T>(
    field: &mut crate::widgets::TextField<E>,
    event: UserEvent,
    mgr: &mut WidgetStateManager<T>,
) -> Result<Option<SubmitRequest>>
where
    E: crate::widgets::TextElement,
    T: Transport,
{
    match event {
        UserEvent::Focus => field.focus(),
        UserEvent::Blur => field.blur(mgr)?,
        UserEvent::Input { text } => field.input(&text),
        UserEvent::KeyPress(key) => return field.key_press(&key, mgr),
        other => log::debug!("text control {} ignores {other:?}", field.dom_id()),
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::FormPhase;
    use crate::transport::{ChannelTransport, RerunRequest, TransportEvent};
    use crate::widget_id::WidgetRef;
    use serde_json::json;
    use std::sync::mpsc::{self, Receiver};

    fn session() -> (WidgetSession<ChannelTransport>, Receiver<TransportEvent>) {
        let (tx, rx) = mpsc::channel();
        (WidgetSession::new(ChannelTransport::new(tx), Platform::Other), rx)
    }

    fn reruns(rx: &Receiver<TransportEvent>) -> Vec<RerunRequest> {
        rx.try_iter()
            .filter_map(|event| match event {
                TransportEvent::Rerun(request) => Some(request),
                TransportEvent::FormsDataChanged(_) => None,
            })
            .collect()
    }

    fn elements(value: serde_json::Value) -> Vec<Element> {
        serde_json::from_value(value).expect("decode elements")
    }

    fn form_page(clear_on_submit: bool) -> Vec<Element> {
        elements(json!([
            {"type": "form", "form_id": "f", "clear_on_submit": clear_on_submit},
            {"type": "text_input", "id": "name", "label": "Name", "default": "", "form_id": "f"},
            {"type": "checkbox", "id": "agree", "label": "Agree", "form_id": "f"},
            {"type": "form_submit_button", "id": "go", "label": "Go", "form_id": "f"},
        ]))
    }

    #[test]
    fn render_mounts_controls_without_notifying() {
        let (mut session, rx) = session();
        session
            .apply_render(
                elements(json!([
                    {"type": "checkbox", "id": "c", "label": "C", "default": true},
                    {"type": "number_input", "id": "n", "label": "N", "data_type": "int", "default": 2.0},
                ])),
                None,
            )
            .expect("render");

        assert!(session.is_mounted("c"));
        assert!(session.is_mounted("n"));
        assert_eq!(session.manager().get_bool_value(WidgetRef::new("c", "")), Some(true));
        assert_eq!(session.manager().get_int_value(WidgetRef::new("n", "")), Some(2));
        assert!(reruns(&rx).is_empty());
    }

    #[test]
    fn server_push_is_applied_once_per_render() {
        let (mut session, _rx) = session();
        let plain = json!([{"type": "checkbox", "id": "c", "label": "C"}]);
        let pushed = json!([{"type": "checkbox", "id": "c", "label": "C", "value": true, "set_value": true}]);

        session.apply_render(elements(plain.clone()), None).expect("mount");
        session.apply_render(elements(pushed), None).expect("push");
        assert_eq!(session.manager().get_bool_value(WidgetRef::new("c", "")), Some(true));

        session
            .dispatch("c", UserEvent::Toggle { checked: false })
            .expect("toggle");
        session.apply_render(elements(plain), None).expect("rerender");
        assert_eq!(session.manager().get_bool_value(WidgetRef::new("c", "")), Some(false));
    }

    #[test]
    fn vanished_elements_are_unmounted_and_forgotten() {
        let (mut session, _rx) = session();
        session.apply_render(form_page(false), None).expect("render");
        assert_eq!(session.manager().form_cleared_listeners("f").len(), 2);

        session
            .apply_render(
                elements(json!([{"type": "form", "form_id": "f"}])),
                None,
            )
            .expect("rerender");

        assert!(!session.is_mounted("name"));
        assert!(session.manager().form_cleared_listeners("f").is_empty());
        assert!(session.manager().get_bool_value(WidgetRef::new("agree", "")).is_none());
        assert!(!session.manager().allow_form_enter_to_submit("f"));
    }

    #[test]
    fn fragment_render_keeps_other_controls() {
        let (mut session, _rx) = session();
        session.apply_render(form_page(false), None).expect("render");

        session
            .apply_render(
                elements(json!([{"type": "checkbox", "id": "solo", "label": "Solo"}])),
                Some("frag"),
            )
            .expect("fragment");

        assert!(session.is_mounted("name"));
        assert!(session.is_mounted("solo"));
    }

    #[test]
    fn submit_button_click_sends_one_rerun_and_clears_form() {
        let (mut session, rx) = session();
        session.apply_render(form_page(true), None).expect("render");

        session
            .dispatch("name", UserEvent::Input { text: "ada".to_string() })
            .expect("type");
        session.dispatch("name", UserEvent::Blur).expect("blur");
        session
            .dispatch("agree", UserEvent::Toggle { checked: true })
            .expect("toggle");
        assert!(reruns(&rx).is_empty());
        assert_eq!(session.manager().form_phase("f"), FormPhase::Dirty);

        session.dispatch("go", UserEvent::Click).expect("click");

        let sent = reruns(&rx);
        assert_eq!(sent.len(), 1);
        let name = sent[0].state_of("name").expect("name submitted");
        assert_eq!(
            name.value,
            crate::value::WidgetValue::String(Some("ada".to_string()))
        );
        assert!(sent[0].state_of("go").is_some());

        assert_eq!(session.manager().form_phase("f"), FormPhase::Clean);
        assert_eq!(
            session.manager().get_string_value(WidgetRef::new("name", "f")).as_deref(),
            Some("")
        );
        assert_eq!(session.manager().get_bool_value(WidgetRef::new("agree", "f")), Some(false));
    }

    #[test]
    fn enter_in_text_input_submits_form() {
        let (mut session, rx) = session();
        session.apply_render(form_page(false), None).expect("render");

        session.dispatch("name", UserEvent::Focus).expect("focus");
        session
            .dispatch("name", UserEvent::Input { text: "bob".to_string() })
            .expect("type");
        session
            .dispatch("name", UserEvent::KeyPress(KeyEvent::new("Enter")))
            .expect("enter");

        let sent = reruns(&rx);
        assert_eq!(sent.len(), 1);
        assert!(sent[0].state_of("name").is_some());
    }

    #[test]
    fn clear_form_resets_without_notifying() {
        let (mut session, rx) = session();
        session.apply_render(form_page(false), None).expect("render");
        session
            .dispatch("agree", UserEvent::Toggle { checked: true })
            .expect("toggle");

        session.clear_form("f").expect("clear");

        assert!(reruns(&rx).is_empty());
        assert_eq!(session.manager().form_phase("f"), FormPhase::Clean);
        assert_eq!(session.manager().get_bool_value(WidgetRef::new("agree", "f")), Some(false));
    }

    #[test]
    fn disabled_inputs_ignore_events() {
        let (mut session, rx) = session();
        session
            .apply_render(elements(json!([{"type": "checkbox", "id": "c", "label": "C"}])), None)
            .expect("render");

        session.set_inputs_disabled(true);
        session
            .dispatch("c", UserEvent::Toggle { checked: true })
            .expect("toggle");

        assert!(reruns(&rx).is_empty());
        match session.view("c") {
            Some(ControlView::Checkbox(view)) => assert!(view.disabled && !view.checked),
            other => panic!("unexpected view {other:?}"),
        }
    }

    #[test]
    fn changing_element_type_remounts() {
        let (mut session, _rx) = session();
        session
            .apply_render(elements(json!([{"type": "checkbox", "id": "w", "label": "W"}])), None)
            .expect("checkbox");
        session
            .apply_render(
                elements(json!([{"type": "text_input", "id": "w", "label": "W", "default": "x"}])),
                None,
            )
            .expect("text input");

        assert!(matches!(session.view("w"), Some(ControlView::TextInput(_))));
        assert_eq!(
            session.manager().get_string_value(WidgetRef::new("w", "")).as_deref(),
            Some("x")
        );
    }

    #[test]
    fn dom_ids_are_stable_and_per_session() {
        let (mut first, _rx1) = session();
        let (mut second, _rx2) = session();
        let page = json!([{"type": "text_area", "id": "t", "label": "T"}]);

        first.apply_render(elements(page.clone()), None).expect("first");
        first.apply_render(elements(page.clone()), None).expect("again");
        second.apply_render(elements(page), None).expect("second");

        let for_id = |session: &WidgetSession<ChannelTransport>| match session.view("t") {
            Some(ControlView::TextArea(view)) => view.label.for_id,
            other => panic!("unexpected view {other:?}"),
        };
        assert_eq!(for_id(&first), "text_area_1");
        assert_eq!(for_id(&second), "text_area_1");
    }

    #[test]
    fn unknown_widget_events_are_dropped() {
        let (mut session, rx) = session();
        session.dispatch("missing", UserEvent::Click).expect("dropped");
        assert!(reruns(&rx).is_empty());
    }

    #[test]
    fn server_push_replaces_pending_form_edit() {
        let (mut session, rx) = session();
        session.apply_render(form_page(false), None).expect("render");
        session
            .dispatch("name", UserEvent::Input { text: "draft".to_string() })
            .expect("type");
        session.dispatch("name", UserEvent::Blur).expect("blur");
        assert_eq!(session.manager().form_phase("f"), FormPhase::Dirty);

        session
            .apply_render(
                elements(json!([
                    {"type": "form", "form_id": "f"},
                    {"type": "text_input", "id": "name", "label": "Name", "default": "",
                     "form_id": "f", "value": "pushed", "set_value": true},
                    {"type": "checkbox", "id": "agree", "label": "Agree", "form_id": "f"},
                    {"type": "form_submit_button", "id": "go", "label": "Go", "form_id": "f"},
                ])),
                None,
            )
            .expect("push");

        match session.view("name") {
            Some(ControlView::TextInput(view)) => assert_eq!(view.text, "pushed"),
            other => panic!("unexpected view {other:?}"),
        }
        assert_eq!(
            session.manager().get_string_value(WidgetRef::new("name", "f")).as_deref(),
            Some("pushed")
        );
        assert_eq!(session.manager().form_phase("f"), FormPhase::Clean);

        session.submit_form("f", None).expect("submit");
        let sent = reruns(&rx);
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].state_of("name").map(|state| &state.value),
            Some(&crate::value::WidgetValue::String(Some("pushed".to_string())))
        );
    }

    #[test]
    fn same_id_in_two_forms_mounts_two_controls() {
        let (mut session, rx) = session();
        session
            .apply_render(
                elements(json!([
                    {"type": "form", "form_id": "form"},
                    {"type": "checkbox", "id": "w1", "label": "Alone", "default": true},
                    {"type": "checkbox", "id": "w1", "label": "In form", "form_id": "form"},
                ])),
                None,
            )
            .expect("render");

        let standalone = WidgetKey::new("w1", "");
        let in_form = WidgetKey::new("w1", "form");
        assert_eq!(session.control_keys().count(), 2);
        assert_eq!(session.manager().get_bool_value(standalone.widget_ref()), Some(true));
        assert_eq!(session.manager().get_bool_value(in_form.widget_ref()), Some(false));

        // The bare id is ambiguous and the event is dropped.
        session
            .dispatch("w1", UserEvent::Toggle { checked: true })
            .expect("dropped");
        assert!(session.view("w1").is_none());
        assert_eq!(session.manager().form_phase("form"), FormPhase::Clean);

        session
            .dispatch_to(&in_form, UserEvent::Toggle { checked: true })
            .expect("toggle in form");
        assert_eq!(session.manager().get_bool_value(in_form.widget_ref()), Some(true));
        assert_eq!(session.manager().form_phase("form"), FormPhase::Dirty);
        match session.view_of(&standalone) {
            Some(ControlView::Checkbox(view)) => assert!(view.checked),
            other => panic!("unexpected view {other:?}"),
        }
        assert!(reruns(&rx).is_empty());
    }

    #[test]
    fn moving_a_control_to_another_form_resets_with_that_form() {
        let (mut session, rx) = session();
        let page = |form_id: &str| {
            elements(json!([
                {"type": "form", "form_id": "a", "clear_on_submit": true},
                {"type": "form", "form_id": "b", "clear_on_submit": true},
                {"type": "checkbox", "id": "c", "label": "C", "form_id": form_id},
            ]))
        };
        session.apply_render(page("a"), None).expect("in a");
        session.apply_render(page("b"), None).expect("in b");

        assert!(session.manager().form_cleared_listeners("a").is_empty());
        assert_eq!(
            session.manager().form_cleared_listeners("b"),
            vec![WidgetKey::new("c", "b")]
        );

        session
            .dispatch("c", UserEvent::Toggle { checked: true })
            .expect("toggle");
        session.submit_form("b", None).expect("submit");

        assert_eq!(reruns(&rx).len(), 1);
        assert_eq!(session.manager().get_bool_value(WidgetRef::new("c", "b")), Some(false));
        assert_eq!(session.manager().get_bool_value(WidgetRef::new("c", "a")), None);
    }
}
