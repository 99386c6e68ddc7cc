pub mod codec;
pub mod constants;
pub mod envelope;
pub mod error;
pub mod event;
pub mod messages;

// Re-export commonly used types
pub use codec::{decode_message, encode_message, Inbound};
pub use envelope::{encode_envelope, EnvelopeView};
pub use error::ProtoError;
pub use event::EventKind;
pub use messages::Message;
