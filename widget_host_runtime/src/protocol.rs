use crate::components::{ComponentMessageType, MessageSource};
use crate::forms::FormsData;
use crate::host_comm::{
    ConnectionState, GuestToHostMessage, HOST_COMM_VERSION, HostAction, ScriptRunState, Versioned,
};
use crate::session::{ControlView, Element, UserEvent};
use crate::transport::RerunRequest;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{self, Read, Write};
use std::sync::mpsc::Receiver;

pub const GUEST_TO_SERVER_CAP: usize = 65_536;
pub const SERVER_TO_GUEST_CAP: usize = 1_048_576;

/// Everything the guest writes to stdout.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "t")]
pub enum GuestEnvelope {
    #[serde(rename = "ready")]
    Ready { capabilities: Value },

    #[serde(rename = "rerun")]
    Rerun(RerunRequest),

    #[serde(rename = "forms")]
    Forms(FormsData),

    #[serde(rename = "view")]
    View {
        id: String,
        #[serde(skip_serializing_if = "String::is_empty")]
        form_id: String,
        view: ControlView,
    },

    #[serde(rename = "host")]
    Host {
        message: Versioned<GuestToHostMessage>,
    },

    #[serde(rename = "host_action")]
    HostAction(HostAction),

    #[serde(rename = "component")]
    Component {
        source: MessageSource,
        #[serde(rename = "type")]
        message_type: ComponentMessageType,
        data: Value,
    },
}

/// Everything the script server writes to the guest's stdin.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "t")]
pub enum ServerEnvelope {
    /// Element tree of a finished run. Elements are decoded one by one so a
    /// widget type this guest does not know only drops that element.
    #[serde(rename = "render")]
    Render {
        elements: Vec<Value>,
        #[serde(default)]
        fragment_id: Option<String>,
    },

    #[serde(rename = "event")]
    Event {
        id: String,
        /// Needed only when the id is mounted in more than one form.
        #[serde(default)]
        form_id: Option<String>,
        event: UserEvent,
    },

    #[serde(rename = "submit")]
    Submit {
        form_id: String,
        #[serde(default)]
        fragment_id: Option<String>,
    },

    #[serde(rename = "clear")]
    Clear { form_id: String },

    #[serde(rename = "host")]
    Host { origin: String, data: Value },

    #[serde(rename = "component")]
    Component {
        #[serde(default)]
        source: Option<MessageSource>,
        #[serde(default)]
        origin: String,
        data: Value,
    },

    #[serde(rename = "component_register")]
    ComponentRegister { source: MessageSource },

    #[serde(rename = "component_deregister")]
    ComponentDeregister { source: MessageSource },

    #[serde(rename = "script_run_state")]
    ScriptRunState { state: ScriptRunState },

    #[serde(rename = "connection")]
    Connection { state: ConnectionState },

    #[serde(rename = "page")]
    Page {
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        favicon: Option<String>,
    },

    #[serde(rename = "custom_parent_message")]
    CustomParentMessage { message: String },
}

pub fn ready_envelope() -> GuestEnvelope {
    GuestEnvelope::Ready {
        capabilities: serde_json::json!({
            "host_comm_version": HOST_COMM_VERSION,
            "transport": "stdio-packet-4"
        }),
    }
}

/// Decodes render elements, dropping (with a warning) any that do not parse.
pub fn decode_elements(elements: Vec<Value>) -> Vec<Element> {
    elements
        .into_iter()
        .filter_map(|raw| match serde_json::from_value::<Element>(raw) {
            Ok(element) => Some(element),
            Err(err) => {
                log::warn!("dropping undecodable element: {err}");
                None
            }
        })
        .collect()
}

pub fn writer_loop(rx: Receiver<GuestEnvelope>) -> io::Result<()> {
    let stdout = io::stdout();
    let mut writer = stdout.lock();

    for envelope in rx {
        let payload = encode_guest_envelope(&envelope)?;
        write_frame(&mut writer, &payload, GUEST_TO_SERVER_CAP)?;
        writer.flush()?;
    }

    Ok(())
}

pub fn reader_loop<F>(on_envelope: F) -> io::Result<()>
where
    F: FnMut(ServerEnvelope),
{
    let stdin = io::stdin();
    read_envelopes(&mut stdin.lock(), on_envelope)
}

/// Reads frames until EOF. Frames that are not valid envelopes are skipped;
/// a framing error ends the loop.
pub fn read_envelopes<R, F>(reader: &mut R, mut on_envelope: F) -> io::Result<()>
where
    R: Read,
    F: FnMut(ServerEnvelope),
{
    loop {
        match read_frame(reader, SERVER_TO_GUEST_CAP) {
            Ok(payload) => match decode_server_envelope(&payload) {
                Ok(envelope) => on_envelope(envelope),
                Err(err) => log::warn!("dropping invalid envelope: {err}"),
            },
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(err) => return Err(err),
        }
    }
}

pub fn encode_guest_envelope(envelope: &GuestEnvelope) -> io::Result<Vec<u8>> {
    serde_json::to_vec(envelope).map_err(json_error)
}

fn decode_server_envelope(payload: &[u8]) -> io::Result<ServerEnvelope> {
    serde_json::from_slice(payload).map_err(json_error)
}

pub fn read_frame(reader: &mut impl Read, max_payload: usize) -> io::Result<Vec<u8>> {
    let mut len_buf = [0_u8; 4];
    reader.read_exact(&mut len_buf)?;

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > max_payload {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame too large: {len} > {max_payload}"),
        ));
    }

    let mut payload = vec![0_u8; len];
    reader.read_exact(&mut payload)?;
    Ok(payload)
}

pub fn write_frame(writer: &mut impl Write, payload: &[u8], max_payload: usize) -> io::Result<()> {
    if payload.len() > max_payload {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame too large: {} > {}", payload.len(), max_payload),
        ));
    }

    let len = u32::try_from(payload.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "payload exceeds u32"))?;

    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(payload)?;
    Ok(())
}

fn json_error(err: serde_json::Error) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, err)
}
