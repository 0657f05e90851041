//! Versioned message channel between the app and the frame embedding it.

pub mod manager;
pub mod messages;
pub mod origin;

pub use manager::{
    AppConfig, ConnectionState, CustomThemeConfig, HostAction, HostCommunicationManager,
    HostSink, HostState,
};
pub use messages::{
    AppPage, DeployedAppMetadata, GuestToHostMessage, HOST_COMM_VERSION, HostToGuestMessage,
    MenuItem, ScriptRunState, ToolbarItem, Versioned,
};
pub use origin::{OriginPattern, is_allowed_origin, parse_allowed_origins};
