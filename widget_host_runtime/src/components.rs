//! Routing of messages posted by custom-component frames to the component
//! instance that owns each frame.

use crate::endpoints::Endpoints;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Marker every component message must carry.
pub const STREAMLIT_MESSAGE_MARKER: &str = "isStreamlitMessage";

/// Identity of the frame a message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageSource(pub u64);

impl fmt::Display for MessageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentMessageType {
    ComponentReady,
    SetComponentValue,
    SetFrameHeight,
    Other(String),
}

impl ComponentMessageType {
    pub fn parse(name: &str) -> Self {
        match name {
            "streamlit:componentReady" => ComponentMessageType::ComponentReady,
            "streamlit:setComponentValue" => ComponentMessageType::SetComponentValue,
            "streamlit:setFrameHeight" => ComponentMessageType::SetFrameHeight,
            other => ComponentMessageType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ComponentMessageType::ComponentReady => "streamlit:componentReady",
            ComponentMessageType::SetComponentValue => "streamlit:setComponentValue",
            ComponentMessageType::SetFrameHeight => "streamlit:setFrameHeight",
            ComponentMessageType::Other(name) => name,
        }
    }
}

impl Serialize for ComponentMessageType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A window message as seen by the guest.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEvent {
    pub data: Value,
    pub source: Option<MessageSource>,
    pub origin: String,
}

pub type ComponentMessageListener = Box<dyn FnMut(&ComponentMessageType, &Value) + Send>;

/// Per-session registry of component listeners, keyed by frame.
pub struct ComponentRegistry<E: Endpoints> {
    endpoints: E,
    listeners: HashMap<MessageSource, ComponentMessageListener>,
}

impl<E: Endpoints> fmt::Debug for ComponentRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sources: Vec<_> = self.listeners.keys().collect();
        sources.sort();
        f.debug_struct("ComponentRegistry")
            .field("sources", &sources)
            .finish_non_exhaustive()
    }
}

impl<E: Endpoints> ComponentRegistry<E> {
    pub fn new(endpoints: E) -> Self {
        Self {
            endpoints,
            listeners: HashMap::new(),
        }
    }

    /// Registers the listener for `source`, replacing (with a warning) any
    /// listener already registered for it.
    pub fn register_listener(&mut self, source: MessageSource, listener: ComponentMessageListener) {
        if self.listeners.insert(source, listener).is_some() {
            log::warn!("message source {source} registered multiple times");
        }
    }

    pub fn deregister_listener(&mut self, source: MessageSource) {
        if self.listeners.remove(&source).is_none() {
            log::warn!("could not deregister unregistered message source {source}");
        }
    }

    pub fn is_registered(&self, source: MessageSource) -> bool {
        self.listeners.contains_key(&source)
    }

    pub fn get_component_url(&self, component_name: &str, path: &str) -> String {
        self.endpoints.build_component_url(component_name, path)
    }

    /// Forwards a component message to its listener. Returns whether a
    /// listener was invoked; anything unroutable is dropped.
    pub fn on_message_event(&mut self, event: &MessageEvent) -> bool {
        let is_component_message = event
            .data
            .as_object()
            .is_some_and(|data| data.contains_key(STREAMLIT_MESSAGE_MARKER));
        if !is_component_message {
            return false;
        }

        let Some(source) = event.source else {
            log::warn!("received component message with no source: {}", event.data);
            return false;
        };

        let Some(listener) = self.listeners.get_mut(&source) else {
            log::warn!(
                "received component message for unregistered source {source}: {}",
                event.data
            );
            return false;
        };

        let Some(message_type) = event.data.get("type").and_then(Value::as_str) else {
            log::warn!("received component message with no type: {}", event.data);
            return false;
        };

        listener(&ComponentMessageType::parse(message_type), &event.data);
        true
    }

    /// Drops every listener. The registry stays usable afterwards.
    pub fn dispose(&mut self) {
        if !self.listeners.is_empty() {
            log::debug!("disposing {} component listener(s)", self.listeners.len());
        }
        self.listeners.clear();
    }
}
