use crate::{
    constants::{ENVELOPE_FIELDS, FIELD_SEPARATOR, MAX_ENVELOPE_LEN},
    error::ProtoError,
    event::EventKind,
};

/// Borrowed view of one envelope (wire format).
///
/// Encoding rules:
/// - Text, four fields joined by [`FIELD_SEPARATOR`]:
///   `eventType|senderPeerId|sendTimestampMs|jsonPayload`.
/// - The payload is always last and is carried verbatim, so it may itself
///   contain separators. Payload-free events still end with a separator.
///
/// Parse rules (current implementation):
/// - Requires `line.len() <= MAX_ENVELOPE_LEN`.
/// - Requires exactly `ENVELOPE_FIELDS` fields.
/// - Requires a known event tag, a non-empty sender, and a timestamp that
///   parses as unsigned milliseconds.
/// - The payload is not interpreted here; message decoding happens above
///   this layer, after the envelope shape has been validated.
#[derive(Debug, Clone, Copy)]
pub struct EnvelopeView<'a> {
    pub kind: EventKind,
    pub sender: &'a str,
    pub sent_ms: u64,
    pub payload: &'a str,
}

impl<'a> EnvelopeView<'a> {
    pub fn parse(line: &'a str) -> Result<Self, ProtoError> {
        if line.len() > MAX_ENVELOPE_LEN {
            return Err(ProtoError::EnvelopeTooLarge(line.len()));
        }
        let fields: Vec<&str> = line.splitn(ENVELOPE_FIELDS, FIELD_SEPARATOR).collect();
        if fields.len() != ENVELOPE_FIELDS {
            return Err(ProtoError::WrongFieldCount(fields.len()));
        }
        let kind: EventKind = fields[0]
            .parse()
            .map_err(|_| ProtoError::UnknownEvent(fields[0].to_owned()))?;
        let sender = fields[1];
        if sender.is_empty() {
            return Err(ProtoError::EmptySender);
        }
        let sent_ms: u64 = fields[2]
            .parse()
            .map_err(|_| ProtoError::BadTimestamp(fields[2].to_owned()))?;
        Ok(Self {
            kind,
            sender,
            sent_ms,
            payload: fields[3],
        })
    }
}

/// Encode one envelope line. The inverse of [`EnvelopeView::parse`].
pub fn encode_envelope(kind: EventKind, sender: &str, sent_ms: u64, payload: &str) -> String {
    let mut out = String::with_capacity(
        kind.to_string().len() + sender.len() + payload.len() + 24,
    );
    out.push_str(&kind.to_string());
    out.push(FIELD_SEPARATOR);
    out.push_str(sender);
    out.push(FIELD_SEPARATOR);
    out.push_str(&sent_ms.to_string());
    out.push(FIELD_SEPARATOR);
    out.push_str(payload);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_field_order_is_locked() {
        let line = encode_envelope(EventKind::Pos, "alice", 1234, r#"{"x":1.0,"y":2.0}"#);
        assert_eq!(line, r#"pos|alice|1234|{"x":1.0,"y":2.0}"#);

        let view = EnvelopeView::parse(&line).unwrap();
        assert_eq!(view.kind, EventKind::Pos);
        assert_eq!(view.sender, "alice");
        assert_eq!(view.sent_ms, 1234);
        assert_eq!(view.payload, r#"{"x":1.0,"y":2.0}"#);
    }

    #[test]
    fn payload_may_contain_separators() {
        let view = EnvelopeView::parse(r#"hit|bob|99|{"note":"a|b|c"}"#).unwrap();
        assert_eq!(view.payload, r#"{"note":"a|b|c"}"#);
    }

    #[test]
    fn payload_free_events_keep_four_fields() {
        let line = encode_envelope(EventKind::Left, "alice", 5, "");
        assert_eq!(line, "left|alice|5|");
        let view = EnvelopeView::parse(&line).unwrap();
        assert_eq!(view.kind, EventKind::Left);
        assert_eq!(view.payload, "");
    }

    #[test]
    fn wrong_field_count_is_rejected() {
        assert!(matches!(
            EnvelopeView::parse("pos|alice"),
            Err(ProtoError::WrongFieldCount(2))
        ));
        assert!(matches!(
            EnvelopeView::parse("left|alice|123"),
            Err(ProtoError::WrongFieldCount(3))
        ));
        assert!(matches!(
            EnvelopeView::parse(""),
            Err(ProtoError::WrongFieldCount(1))
        ));
    }

    #[test]
    fn bad_fields_are_rejected() {
        assert!(matches!(
            EnvelopeView::parse("warp|alice|123|{}"),
            Err(ProtoError::UnknownEvent(_))
        ));
        assert!(matches!(
            EnvelopeView::parse("pos||123|{}"),
            Err(ProtoError::EmptySender)
        ));
        assert!(matches!(
            EnvelopeView::parse("pos|alice|soon|{}"),
            Err(ProtoError::BadTimestamp(_))
        ));
        assert!(matches!(
            EnvelopeView::parse("pos|alice|-5|{}"),
            Err(ProtoError::BadTimestamp(_))
        ));
    }

    #[test]
    fn oversized_envelope_is_rejected() {
        let line = format!("pos|alice|1|{}", "x".repeat(MAX_ENVELOPE_LEN));
        assert!(matches!(
            EnvelopeView::parse(&line),
            Err(ProtoError::EnvelopeTooLarge(_))
        ));
    }
}
