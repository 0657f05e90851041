pub mod components;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod forms;
pub mod host_comm;
pub mod manager;
pub mod protocol;
pub mod session;
pub mod store;
pub mod theme_cache;
pub mod transport;
pub mod value;
pub mod widget_id;
pub mod widgets;

pub use config::HostConfig;
pub use error::{Result, WidgetError};
pub use forms::{FormClear, FormPhase, FormsData, SubmitButton};
pub use manager::WidgetStateManager;
pub use session::{ControlView, Element, UserEvent, WidgetSession};
pub use transport::{ChannelTransport, RerunRequest, Transport, TransportEvent};
pub use value::{Source, ValueKind, WidgetState, WidgetValue};
pub use widget_id::{DomIdAllocator, WidgetKey, WidgetRef};

use crate::components::{
    ComponentMessageListener, ComponentRegistry, MessageEvent, MessageSource,
};
use crate::endpoints::BaseUrlEndpoints;
use crate::host_comm::{
    AppConfig, GuestToHostMessage, HostAction, HostCommunicationManager, HostSink, Versioned,
};
use crate::protocol::{
    GuestEnvelope, ServerEnvelope, decode_elements, reader_loop, ready_envelope, writer_loop,
};
use crate::theme_cache::{CachedTheme, InMemoryStorage, ThemeCache};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

const CUSTOM_THEME_NAME: &str = "Custom Theme";

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let started_at = unix_millis();
    let config = HostConfig::from_env();
    let (tx, rx) = mpsc::sync_channel(config.outbound_queue_cap);

    let writer_handle = thread::spawn(move || writer_loop(rx));

    tx.send(ready_envelope())
        .map_err(|_| "failed to queue ready envelope")?;

    let mut runtime = GuestRuntime::new(&config, Outbound::new(tx, config.outbound_queue_cap));
    runtime.announce_ready(started_at, unix_millis());

    let read_result = reader_loop(|envelope| runtime.handle(envelope));
    if let Err(err) = &read_result {
        log::error!("reader loop terminated with error: {err}");
    }

    // Drop the runtime so every queue sender is released and the writer drains.
    runtime.dispose();
    drop(runtime);

    match writer_handle.join() {
        Ok(Ok(())) => {}
        Ok(Err(err)) => log::error!("writer thread returned error: {err}"),
        Err(err) => log::error!("writer thread join failed: {err:?}"),
    }

    read_result.map_err(Into::into)
}

/// Sending half of the bounded queue drained by the writer thread.
///
/// Reruns and form state wait for room; everything else is chrome and is
/// dropped when the queue is full.
#[derive(Debug, Clone)]
pub struct Outbound {
    tx: SyncSender<GuestEnvelope>,
    dropped: Arc<AtomicU64>,
    capacity: usize,
}

impl Outbound {
    pub fn new(tx: SyncSender<GuestEnvelope>, capacity: usize) -> Self {
        Self {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
            capacity,
        }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn send(&self, envelope: GuestEnvelope) {
        if self.tx.send(envelope).is_err() {
            log::error!("writer is gone; dropping outbound envelope");
        }
    }

    fn try_send(&self, envelope: GuestEnvelope) {
        match self.tx.try_send(envelope) {
            Ok(()) => {}
            Err(TrySendError::Full(_envelope)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if dropped == 1 || dropped.is_power_of_two() {
                    log::warn!(
                        "outbound queue full (cap={}); dropped {dropped} envelope(s)",
                        self.capacity
                    );
                }
            }
            Err(TrySendError::Disconnected(_envelope)) => {
                log::error!("writer is gone; dropping outbound envelope");
            }
        }
    }
}

impl Transport for Outbound {
    fn send_rerun(&mut self, request: RerunRequest) {
        self.send(GuestEnvelope::Rerun(request));
    }

    fn forms_data_changed(&mut self, forms: &FormsData) {
        self.send(GuestEnvelope::Forms(forms.clone()));
    }
}

impl HostSink for Outbound {
    fn post(&mut self, message: GuestToHostMessage) {
        self.try_send(GuestEnvelope::Host {
            message: Versioned::new(message),
        });
    }
}

/// Everything the guest owns for one app session. All of it lives on the
/// reader thread; the writer only sees envelopes.
#[derive(Debug)]
pub struct GuestRuntime {
    session: WidgetSession<Outbound>,
    host: HostCommunicationManager<Outbound>,
    components: ComponentRegistry<BaseUrlEndpoints>,
    theme: ThemeCache<InMemoryStorage>,
    out: Outbound,
}

impl GuestRuntime {
    pub fn new(config: &HostConfig, out: Outbound) -> Self {
        let mut host = HostCommunicationManager::new(out.clone());
        host.init(AppConfig {
            allowed_origins: config.allowed_origins.clone(),
            ..AppConfig::default()
        });

        Self {
            session: WidgetSession::new(out.clone(), config.platform),
            host,
            components: ComponentRegistry::new(BaseUrlEndpoints::new(config.base_url.clone())),
            theme: ThemeCache::new(InMemoryStorage::new(), config.base_url.path()),
            out,
        }
    }

    pub fn session(&self) -> &WidgetSession<Outbound> {
        &self.session
    }

    pub fn host(&self) -> &HostCommunicationManager<Outbound> {
        &self.host
    }

    pub fn cached_theme(&self) -> Option<CachedTheme> {
        self.theme.get()
    }

    pub fn announce_ready(&mut self, execution_started_at: u64, guest_ready_at: u64) {
        self.host.send_guest_ready(execution_started_at, guest_ready_at);
    }

    pub fn dispose(&mut self) {
        self.components.dispose();
        self.host.dispose();
    }

    pub fn handle(&mut self, envelope: ServerEnvelope) {
        if let Err(err) = self.apply(envelope) {
            log::error!("failed to apply server envelope: {err}");
        }
    }

    fn apply(&mut self, envelope: ServerEnvelope) -> Result<()> {
        match envelope {
            ServerEnvelope::Render {
                elements,
                fragment_id,
            } => {
                self.session
                    .apply_render(decode_elements(elements), fragment_id.as_deref())?;
                self.publish_views();
            }
            ServerEnvelope::Event { id, form_id, event } => {
                match form_id {
                    Some(form_id) => self
                        .session
                        .dispatch_to(&WidgetKey::new(id, form_id), event)?,
                    None => self.session.dispatch(&id, event)?,
                }
                self.publish_views();
            }
            ServerEnvelope::Submit {
                form_id,
                fragment_id,
            } => {
                self.session.submit_form(&form_id, fragment_id.as_deref())?;
                self.publish_views();
            }
            ServerEnvelope::Clear { form_id } => {
                self.session.clear_form(&form_id)?;
                self.publish_views();
            }
            ServerEnvelope::Host { origin, data } => {
                if let Some(action) = self.host.receive_host_message(&origin, &data) {
                    self.on_host_action(action);
                }
            }
            ServerEnvelope::Component {
                source,
                origin,
                data,
            } => {
                self.components.on_message_event(&MessageEvent {
                    data,
                    source,
                    origin,
                });
            }
            ServerEnvelope::ComponentRegister { source } => {
                let forwarder = self.component_forwarder(source);
                self.components.register_listener(source, forwarder);
            }
            ServerEnvelope::ComponentDeregister { source } => {
                self.components.deregister_listener(source);
            }
            ServerEnvelope::ScriptRunState { state } => {
                self.host.on_script_run_state_changed(state);
            }
            ServerEnvelope::Connection { state } => {
                self.host.on_connection_state_changed(state);
            }
            ServerEnvelope::Page { title, favicon } => {
                if let Some(title) = title {
                    self.host.set_page_title(&title);
                }
                if let Some(favicon) = favicon {
                    self.host.set_page_favicon(&favicon);
                }
            }
            ServerEnvelope::CustomParentMessage { message } => {
                self.host.send_custom_parent_message(&message);
            }
        }
        Ok(())
    }

    fn on_host_action(&mut self, action: HostAction) {
        match action {
            HostAction::SetInputsDisabled { disabled } => {
                self.session.set_inputs_disabled(disabled);
                self.publish_views();
            }
            HostAction::RerunScript => {
                self.out.send(GuestEnvelope::Rerun(RerunRequest {
                    widget_states: self.session.manager().widget_states_snapshot(),
                    fragment_id: None,
                }));
            }
            HostAction::ApplyCustomTheme(theme) => {
                self.theme.set(CachedTheme {
                    name: theme
                        .name
                        .clone()
                        .unwrap_or_else(|| CUSTOM_THEME_NAME.to_string()),
                    theme_input: theme.info.clone(),
                });
                self.out
                    .try_send(GuestEnvelope::HostAction(HostAction::ApplyCustomTheme(theme)));
            }
            other => self.out.try_send(GuestEnvelope::HostAction(other)),
        }
    }

    fn component_forwarder(&self, source: MessageSource) -> ComponentMessageListener {
        let out = self.out.clone();
        Box::new(move |message_type, data| {
            out.try_send(GuestEnvelope::Component {
                source,
                message_type: message_type.clone(),
                data: data.clone(),
            });
        })
    }

    fn publish_views(&self) {
        for key in self.session.control_keys() {
            if let Some(view) = self.session.view_of(key) {
                self.out.try_send(GuestEnvelope::View {
                    id: key.element_id.clone(),
                    form_id: key.form_id.clone(),
                    view,
                });
            }
        }
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}
