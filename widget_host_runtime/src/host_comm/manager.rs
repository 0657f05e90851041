use super::messages::{
    DeployedAppMetadata, GuestToHostMessage, HOST_COMM_VERSION, HostToGuestMessage, MenuItem,
    ScriptRunState, ToolbarItem,
};
use super::origin::{OriginPattern, is_allowed_origin};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where guest messages go. The host loop forwards them to the embedding
/// frame; tests collect them in a `Vec`.
pub trait HostSink {
    fn post(&mut self, message: GuestToHostMessage);
}

impl HostSink for Vec<GuestToHostMessage> {
    fn post(&mut self, message: GuestToHostMessage) {
        self.push(message);
    }
}

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub allowed_origins: Vec<OriginPattern>,
    pub use_external_auth_token: bool,
    pub enable_custom_parent_messages: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomThemeConfig {
    pub name: Option<String>,
    pub info: Option<Value>,
}

/// Chrome state the host has pushed so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostState {
    pub inputs_disabled: bool,
    pub auth_token: Option<String>,
    pub is_owner: bool,
    pub menu_items: Vec<MenuItem>,
    pub toolbar_items: Vec<ToolbarItem>,
    pub metadata: DeployedAppMetadata,
    pub page_link_base_url: Option<String>,
    pub sidebar_chevron_downshift: f64,
    pub sidebar_nav_hidden: bool,
    pub custom_theme: Option<CustomThemeConfig>,
}

/// Something the app must do in response to a host message, beyond the
/// bookkeeping already recorded in [`HostState`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum HostAction {
    CloseModals,
    RequestPageChange { page_script_hash: String },
    SetInputsDisabled { disabled: bool },
    UpdateFromQueryParams { query_params: String },
    UpdateHash { hash: String },
    StopScript,
    RerunScript,
    ClearCache,
    ApplyCustomTheme(CustomThemeConfig),
    SendAppHeartbeat,
    RestartWebsocketConnection,
    TerminateWebsocketConnection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Initial,
    Connecting,
    Connected,
    PingingServer,
    DisconnectedFromServer,
}

/// Guest side of the host/guest channel.
///
/// Constructed per app instance and explicitly initialized with the host's
/// configuration; nothing is accepted or sent before [`init`](Self::init)
/// or after [`dispose`](Self::dispose).
#[derive(Debug)]
pub struct HostCommunicationManager<S: HostSink> {
    sink: S,
    config: AppConfig,
    state: HostState,
    initialized: bool,
    favicon: Option<String>,
    title: Option<String>,
    connection: ConnectionState,
    script_run_state: Option<ScriptRunState>,
}

impl<S: HostSink> HostCommunicationManager<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            config: AppConfig::default(),
            state: HostState::default(),
            initialized: false,
            favicon: None,
            title: None,
            connection: ConnectionState::default(),
            script_run_state: None,
        }
    }

    pub fn init(&mut self, config: AppConfig) {
        log::debug!(
            "host comm initialized with {} allowed origin(s)",
            config.allowed_origins.len()
        );
        self.config = config;
        self.initialized = true;
    }

    pub fn dispose(&mut self) {
        self.initialized = false;
        self.config = AppConfig::default();
        self.state = HostState::default();
        self.favicon = None;
        self.title = None;
        self.script_run_state = None;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn state(&self) -> &HostState {
        &self.state
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Validates and applies one raw message from the host frame.
    ///
    /// Messages from origins outside the allow list, without an integer
    /// `stCommVersion`, of an unknown type or with a malformed payload are
    /// logged and dropped.
    pub fn receive_host_message(&mut self, origin: &str, data: &Value) -> Option<HostAction> {
        if !self.initialized {
            log::debug!("host comm not initialized; dropping message from {origin}");
            return None;
        }

        if !is_allowed_origin(&self.config.allowed_origins, origin) {
            log::warn!("dropping host message from disallowed origin {origin}");
            return None;
        }

        let Some(version) = data.get("stCommVersion").and_then(Value::as_i64) else {
            log::warn!("dropping host message without stCommVersion: {data}");
            return None;
        };
        if version != i64::from(HOST_COMM_VERSION) {
            log::debug!("host speaks comm version {version}, guest {HOST_COMM_VERSION}");
        }

        let message = match HostToGuestMessage::deserialize(data) {
            Ok(message) => message,
            Err(err) => {
                log::warn!("dropping malformed host message: {err}");
                return None;
            }
        };

        self.apply(message)
    }

    fn apply(&mut self, message: HostToGuestMessage) -> Option<HostAction> {
        let state = &mut self.state;
        match message {
            HostToGuestMessage::CloseModals => Some(HostAction::CloseModals),
            HostToGuestMessage::RequestPageChange { page_script_hash } => {
                Some(HostAction::RequestPageChange { page_script_hash })
            }
            HostToGuestMessage::SetInputsDisabled { disabled } => {
                state.inputs_disabled = disabled;
                Some(HostAction::SetInputsDisabled { disabled })
            }
            HostToGuestMessage::SetAuthToken { auth_token } => {
                if !self.config.use_external_auth_token {
                    log::warn!("host sent an auth token but external auth is not enabled");
                }
                state.auth_token = Some(auth_token);
                None
            }
            HostToGuestMessage::SetIsOwner { is_owner } => {
                state.is_owner = is_owner;
                None
            }
            HostToGuestMessage::SetMenuItems { items } => {
                state.menu_items = items;
                None
            }
            HostToGuestMessage::SetMetadata { metadata } => {
                state.metadata = metadata;
                None
            }
            HostToGuestMessage::SetPageLinkBaseUrl { page_link_base_url } => {
                state.page_link_base_url = Some(page_link_base_url);
                None
            }
            HostToGuestMessage::SetSidebarChevronDownshift {
                sidebar_chevron_downshift,
            } => {
                state.sidebar_chevron_downshift = sidebar_chevron_downshift;
                None
            }
            HostToGuestMessage::SetSidebarNavVisibility { hidden } => {
                state.sidebar_nav_hidden = hidden;
                None
            }
            HostToGuestMessage::SetToolbarItems { items } => {
                state.toolbar_items = items;
                None
            }
            HostToGuestMessage::UpdateFromQueryParams { query_params } => {
                Some(HostAction::UpdateFromQueryParams { query_params })
            }
            HostToGuestMessage::UpdateHash { hash } => Some(HostAction::UpdateHash { hash }),
            HostToGuestMessage::StopScript => Some(HostAction::StopScript),
            HostToGuestMessage::RerunScript => Some(HostAction::RerunScript),
            HostToGuestMessage::ClearCache => Some(HostAction::ClearCache),
            HostToGuestMessage::SetCustomThemeConfig {
                theme_name,
                theme_info,
            } => {
                let theme = CustomThemeConfig {
                    name: theme_name,
                    info: theme_info,
                };
                state.custom_theme = Some(theme.clone());
                Some(HostAction::ApplyCustomTheme(theme))
            }
            HostToGuestMessage::SendAppHeartbeat => Some(HostAction::SendAppHeartbeat),
            HostToGuestMessage::RestartWebsocketConnection => {
                Some(HostAction::RestartWebsocketConnection)
            }
            HostToGuestMessage::TerminateWebsocketConnection => {
                Some(HostAction::TerminateWebsocketConnection)
            }
            HostToGuestMessage::Unknown => {
                log::warn!("ignoring unknown host message type");
                None
            }
        }
    }

    pub fn send_message(&mut self, message: GuestToHostMessage) {
        if !self.initialized {
            log::debug!("host comm not initialized; not sending {message:?}");
            return;
        }
        self.sink.post(message);
    }

    pub fn send_guest_ready(&mut self, execution_started_at: u64, guest_ready_at: u64) {
        self.send_message(GuestToHostMessage::GuestReady {
            streamlit_execution_started_at: execution_started_at,
            guest_ready_at,
        });
    }

    pub fn set_page_favicon(&mut self, favicon: &str) {
        if self.favicon.as_deref() == Some(favicon) {
            return;
        }
        self.favicon = Some(favicon.to_string());
        self.send_message(GuestToHostMessage::SetPageFavicon {
            favicon: favicon.to_string(),
        });
    }

    pub fn set_page_title(&mut self, title: &str) {
        if self.title.as_deref() == Some(title) {
            return;
        }
        self.title = Some(title.to_string());
        self.send_message(GuestToHostMessage::SetPageTitle {
            title: title.to_string(),
        });
    }

    pub fn on_script_run_state_changed(&mut self, script_run_state: ScriptRunState) {
        if self.script_run_state == Some(script_run_state) {
            return;
        }
        self.script_run_state = Some(script_run_state);
        self.send_message(GuestToHostMessage::ScriptRunStateChanged { script_run_state });
    }

    /// Reports websocket transitions: entering `Connected`, and leaving it.
    pub fn on_connection_state_changed(&mut self, next: ConnectionState) {
        let previous = std::mem::replace(&mut self.connection, next);
        if previous == next {
            return;
        }

        if next == ConnectionState::Connected {
            self.send_message(GuestToHostMessage::WebsocketConnected);
        } else if previous == ConnectionState::Connected {
            self.send_message(GuestToHostMessage::WebsocketDisconnected {
                attempting_to_reconnect: next != ConnectionState::DisconnectedFromServer,
            });
        }
    }

    pub fn send_custom_parent_message(&mut self, message: &str) {
        if !self.config.enable_custom_parent_messages {
            log::warn!("custom parent messages are not enabled by the host");
            return;
        }
        self.send_message(GuestToHostMessage::CustomParentMessage {
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host_comm::origin::parse_allowed_origins;
    use serde_json::json;

    const HOST: &str = "https://host.example.com";

    fn manager() -> HostCommunicationManager<Vec<GuestToHostMessage>> {
        let mut mgr = HostCommunicationManager::new(Vec::new());
        mgr.init(AppConfig {
            allowed_origins: parse_allowed_origins(HOST),
            ..AppConfig::default()
        });
        mgr
    }

    #[test]
    fn applies_state_and_returns_actions() {
        let mut mgr = manager();

        let action = mgr.receive_host_message(
            HOST,
            &json!({"stCommVersion": 1, "type": "SET_INPUTS_DISABLED", "disabled": true}),
        );
        assert_eq!(action, Some(HostAction::SetInputsDisabled { disabled: true }));
        assert!(mgr.state().inputs_disabled);

        let action = mgr.receive_host_message(
            HOST,
            &json!({"stCommVersion": 1, "type": "SET_SIDEBAR_NAV_VISIBILITY", "hidden": true}),
        );
        assert_eq!(action, None);
        assert!(mgr.state().sidebar_nav_hidden);
    }

    #[test]
    fn drops_disallowed_unversioned_and_malformed_messages() {
        let mut mgr = manager();

        let disabled = json!({"stCommVersion": 1, "type": "SET_INPUTS_DISABLED", "disabled": true});
        assert_eq!(mgr.receive_host_message("https://evil.example.com", &disabled), None);
        assert!(!mgr.state().inputs_disabled);

        let unversioned = json!({"type": "SET_INPUTS_DISABLED", "disabled": true});
        assert_eq!(mgr.receive_host_message(HOST, &unversioned), None);

        let stringly = json!({"stCommVersion": "1", "type": "STOP_SCRIPT"});
        assert_eq!(mgr.receive_host_message(HOST, &stringly), None);

        let malformed = json!({"stCommVersion": 1, "type": "SET_INPUTS_DISABLED"});
        assert_eq!(mgr.receive_host_message(HOST, &malformed), None);

        assert!(!mgr.state().inputs_disabled);
    }

    #[test]
    fn unknown_type_is_ignored() {
        let mut mgr = manager();
        let action =
            mgr.receive_host_message(HOST, &json!({"stCommVersion": 7, "type": "NEW_THING"}));
        assert_eq!(action, None);
        assert_eq!(mgr.state(), &HostState::default());
    }

    #[test]
    fn nothing_flows_before_init_or_after_dispose() {
        let mut mgr = HostCommunicationManager::new(Vec::new());
        mgr.set_page_title("early");
        assert!(
            mgr.receive_host_message(HOST, &json!({"stCommVersion": 1, "type": "STOP_SCRIPT"}))
                .is_none()
        );
        assert!(mgr.sink().is_empty());

        let mut mgr = manager();
        mgr.dispose();
        mgr.send_guest_ready(1, 2);
        assert!(mgr.sink().is_empty());
    }

    #[test]
    fn favicon_and_title_are_sent_only_on_change() {
        let mut mgr = manager();
        mgr.set_page_favicon("🎈");
        mgr.set_page_favicon("🎈");
        mgr.set_page_title("Home");
        mgr.set_page_title("Home");
        mgr.set_page_title("About");

        assert_eq!(
            mgr.sink(),
            &vec![
                GuestToHostMessage::SetPageFavicon {
                    favicon: "🎈".to_string()
                },
                GuestToHostMessage::SetPageTitle {
                    title: "Home".to_string()
                },
                GuestToHostMessage::SetPageTitle {
                    title: "About".to_string()
                },
            ]
        );
    }

    #[test]
    fn connection_transitions_are_reported() {
        let mut mgr = manager();
        mgr.on_connection_state_changed(ConnectionState::Connecting);
        mgr.on_connection_state_changed(ConnectionState::Connected);
        mgr.on_connection_state_changed(ConnectionState::Connected);
        mgr.on_connection_state_changed(ConnectionState::PingingServer);
        mgr.on_connection_state_changed(ConnectionState::Connected);
        mgr.on_connection_state_changed(ConnectionState::DisconnectedFromServer);

        assert_eq!(
            mgr.sink(),
            &vec![
                GuestToHostMessage::WebsocketConnected,
                GuestToHostMessage::WebsocketDisconnected {
                    attempting_to_reconnect: true
                },
                GuestToHostMessage::WebsocketConnected,
                GuestToHostMessage::WebsocketDisconnected {
                    attempting_to_reconnect: false
                },
            ]
        );
    }

    #[test]
    fn custom_parent_messages_need_opt_in() {
        let mut mgr = manager();
        mgr.send_custom_parent_message("hi");
        assert!(mgr.sink().is_empty());

        mgr.init(AppConfig {
            enable_custom_parent_messages: true,
            ..AppConfig::default()
        });
        mgr.send_custom_parent_message("hi");
        assert_eq!(
            mgr.sink(),
            &vec![GuestToHostMessage::CustomParentMessage {
                message: "hi".to_string()
            }]
        );
    }

    #[test]
    fn script_run_state_changes_are_deduplicated() {
        let mut mgr = manager();
        mgr.on_script_run_state_changed(ScriptRunState::Running);
        mgr.on_script_run_state_changed(ScriptRunState::Running);
        mgr.on_script_run_state_changed(ScriptRunState::NotRunning);
        assert_eq!(mgr.sink().len(), 2);
    }
}
