use fray_core::PeerId;

use crate::{
    envelope::{encode_envelope, EnvelopeView},
    error::ProtoError,
    event::EventKind,
    messages::Message,
};

/// A decoded inbound message together with its envelope metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    pub sender: PeerId,
    pub sent_ms: u64,
    pub message: Message,
}

/// Encode a message into one envelope line.
///
/// This is the only place outgoing payloads are serialized. `sent_ms` is
/// the sender's wall clock at send time; receivers use it both for delay
/// measurement and to order out-of-order arrivals.
pub fn encode_message(
    message: &Message,
    sender: &PeerId,
    sent_ms: u64,
) -> Result<String, ProtoError> {
    let payload = match message {
        Message::Pos(m) => serde_json::to_string(m)?,
        Message::NewProj(m) => serde_json::to_string(m)?,
        Message::ProjPos(m) => serde_json::to_string(m)?,
        Message::ProjDel(m) => serde_json::to_string(m)?,
        Message::Hit(m) => serde_json::to_string(m)?,
        Message::Laser(m) => serde_json::to_string(m)?,
        Message::Input(m) => serde_json::to_string(m)?,
        Message::InitialSync(m) => serde_json::to_string(m)?,
        Message::Pong(m) => serde_json::to_string(m)?,
        Message::Left | Message::ForceUpdate => String::new(),
    };
    Ok(encode_envelope(message.kind(), sender.as_str(), sent_ms, &payload))
}

/// Decode one envelope line into a typed message.
///
/// The envelope shape is validated first; the payload is only parsed once
/// the tag, sender and timestamp all check out. Payload-free events ignore
/// whatever sits in the payload field.
pub fn decode_message(line: &str) -> Result<Inbound, ProtoError> {
    let view = EnvelopeView::parse(line)?;
    let message = match view.kind {
        EventKind::Pos => Message::Pos(serde_json::from_str(view.payload)?),
        EventKind::NewProj => Message::NewProj(serde_json::from_str(view.payload)?),
        EventKind::ProjPos => Message::ProjPos(serde_json::from_str(view.payload)?),
        EventKind::ProjDel => Message::ProjDel(serde_json::from_str(view.payload)?),
        EventKind::Hit => Message::Hit(serde_json::from_str(view.payload)?),
        EventKind::Left => Message::Left,
        EventKind::Laser => Message::Laser(serde_json::from_str(view.payload)?),
        EventKind::Input => Message::Input(serde_json::from_str(view.payload)?),
        EventKind::InitialSync => Message::InitialSync(serde_json::from_str(view.payload)?),
        EventKind::Pong => Message::Pong(serde_json::from_str(view.payload)?),
        EventKind::ForceUpdate => Message::ForceUpdate,
    };
    Ok(Inbound {
        sender: PeerId::from(view.sender),
        sent_ms: view.sent_ms,
        message,
    })
}
