use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Version stamped on every message exchanged with the host frame.
pub const HOST_COMM_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MenuItem {
    Text { label: String, key: String },
    Separator,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolbarItem {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default)]
    pub borderless: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeployedAppMetadata {
    pub hosted_at: Option<String>,
    pub creator_id: Option<String>,
    pub owner: Option<String>,
    pub branch: Option<String>,
    pub repo: Option<String>,
    pub main_module: Option<String>,
    pub is_owner: Option<bool>,
}

/// Control message sent by the embedding frame.
///
/// Types this guest does not know decode as [`Unknown`](Self::Unknown) so a
/// newer host never breaks an older guest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HostToGuestMessage {
    CloseModals,
    #[serde(rename_all = "camelCase")]
    RequestPageChange {
        page_script_hash: String,
    },
    SetInputsDisabled {
        disabled: bool,
    },
    #[serde(rename_all = "camelCase")]
    SetAuthToken {
        auth_token: String,
    },
    #[serde(rename_all = "camelCase")]
    SetIsOwner {
        is_owner: bool,
    },
    SetMenuItems {
        items: Vec<MenuItem>,
    },
    SetMetadata {
        metadata: DeployedAppMetadata,
    },
    #[serde(rename_all = "camelCase")]
    SetPageLinkBaseUrl {
        page_link_base_url: String,
    },
    #[serde(rename_all = "camelCase")]
    SetSidebarChevronDownshift {
        sidebar_chevron_downshift: f64,
    },
    SetSidebarNavVisibility {
        hidden: bool,
    },
    SetToolbarItems {
        items: Vec<ToolbarItem>,
    },
    #[serde(rename_all = "camelCase")]
    UpdateFromQueryParams {
        query_params: String,
    },
    UpdateHash {
        hash: String,
    },
    StopScript,
    RerunScript,
    ClearCache,
    #[serde(rename_all = "camelCase")]
    SetCustomThemeConfig {
        #[serde(default)]
        theme_name: Option<String>,
        #[serde(default)]
        theme_info: Option<Value>,
    },
    SendAppHeartbeat,
    RestartWebsocketConnection,
    TerminateWebsocketConnection,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScriptRunState {
    NotRunning,
    Running,
    RerunRequested,
    StopRequested,
    CompilationError,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppPage {
    pub page_script_hash: String,
    pub page_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_pathname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

/// Status or event message posted to the embedding frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GuestToHostMessage {
    #[serde(rename_all = "camelCase")]
    GuestReady {
        streamlit_execution_started_at: u64,
        guest_ready_at: u64,
    },
    MenuItemCallback {
        key: String,
    },
    ToolbarItemCallback {
        key: String,
    },
    #[serde(rename_all = "camelCase")]
    SetAppPages {
        app_pages: Vec<AppPage>,
    },
    #[serde(rename_all = "camelCase")]
    SetCurrentPageName {
        current_page_name: String,
        current_page_script_hash: String,
    },
    SetPageFavicon {
        favicon: String,
    },
    SetPageTitle {
        title: String,
    },
    #[serde(rename_all = "camelCase")]
    SetQueryParam {
        query_params: String,
    },
    #[serde(rename_all = "camelCase")]
    SetThemeConfig {
        theme_info: Value,
    },
    UpdateHash {
        hash: String,
    },
    #[serde(rename_all = "camelCase")]
    ScriptRunStateChanged {
        script_run_state: ScriptRunState,
    },
    RedirectToUrl {
        url: String,
    },
    CustomParentMessage {
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    WebsocketDisconnected {
        attempting_to_reconnect: bool,
    },
    WebsocketConnected,
    #[serde(rename_all = "camelCase")]
    MetricsEvent {
        event_name: String,
        data: Value,
    },
}

/// A message together with the protocol version it was written against.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Versioned<M> {
    #[serde(rename = "stCommVersion")]
    pub st_comm_version: u32,
    #[serde(flatten)]
    pub message: M,
}

impl<M> Versioned<M> {
    pub fn new(message: M) -> Self {
        Self {
            st_comm_version: HOST_COMM_VERSION,
            message,
        }
    }
}
