use crate::forms::FormsData;
use crate::value::WidgetState;
use serde::Serialize;
use std::sync::mpsc::Sender;

/// Notification asking the script host to rerun with the given widget
/// states. Fire and forget: the store never waits for an acknowledgment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RerunRequest {
    pub widget_states: Vec<WidgetState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fragment_id: Option<String>,
}

impl RerunRequest {
    pub fn state_of(&self, id: &str) -> Option<&WidgetState> {
        self.widget_states.iter().find(|state| state.id == id)
    }
}

/// Opaque "send" capability towards the script host.
pub trait Transport {
    fn send_rerun(&mut self, request: RerunRequest);

    fn forms_data_changed(&mut self, forms: &FormsData);
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Rerun(RerunRequest),
    FormsDataChanged(FormsData),
}

/// Forwards every notification into an mpsc channel.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: Sender<TransportEvent>,
}

impl ChannelTransport {
    pub fn new(tx: Sender<TransportEvent>) -> Self {
        Self { tx }
    }
}

impl Transport for ChannelTransport {
    fn send_rerun(&mut self, request: RerunRequest) {
        if self.tx.send(TransportEvent::Rerun(request)).is_err() {
            log::warn!("transport channel closed; dropping rerun request");
        }
    }

    fn forms_data_changed(&mut self, forms: &FormsData) {
        if self
            .tx
            .send(TransportEvent::FormsDataChanged(forms.clone()))
            .is_err()
        {
            log::warn!("transport channel closed; dropping forms update");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::WidgetValue;
    use std::sync::mpsc;

    #[test]
    fn channel_transport_forwards_reruns() {
        let (tx, rx) = mpsc::channel();
        let mut transport = ChannelTransport::new(tx);

        transport.send_rerun(RerunRequest {
            widget_states: vec![WidgetState {
                id: "w1".to_string(),
                value: WidgetValue::Bool(true),
            }],
            fragment_id: Some("frag".to_string()),
        });

        match rx.try_recv().expect("rerun forwarded") {
            TransportEvent::Rerun(request) => {
                assert_eq!(request.fragment_id.as_deref(), Some("frag"));
                assert_eq!(
                    request.state_of("w1").map(|state| &state.value),
                    Some(&WidgetValue::Bool(true))
                );
            }
            other => panic!("expected rerun, got {other:?}"),
        }
    }

    #[test]
    fn closed_channel_does_not_panic() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let mut transport = ChannelTransport::new(tx);
        transport.forms_data_changed(&FormsData::default());
    }
}
