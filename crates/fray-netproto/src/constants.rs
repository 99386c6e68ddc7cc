/// Field separator in the message envelope.
/// The payload is always the last field, so it may contain separators itself.
pub const FIELD_SEPARATOR: char = '|';

/// Number of envelope fields: event type, sender, send timestamp, payload.
pub const ENVELOPE_FIELDS: usize = 4;

/// Maximum accepted length of a single envelope, in bytes.
/// This limit is enforced to avoid unbounded allocations; a full-state sync
/// for a busy session fits comfortably below it.
pub const MAX_ENVELOPE_LEN: usize = 64 * 1024;
