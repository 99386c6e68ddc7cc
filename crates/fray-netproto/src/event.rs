use strum::{Display, EnumString};

/// Tag in the first envelope field.
///
/// Tags are part of the wire format; renaming a variant here is a protocol
/// break for every peer on an older build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum EventKind {
    /// Authoritative player position update.
    Pos,
    /// Projectile spawned.
    NewProj,
    /// Projectile position update.
    ProjPos,
    /// Projectile removed by its owner.
    ProjDel,
    /// Damage notification addressed to a specific victim.
    Hit,
    /// Peer leaving or defeated. No payload.
    Left,
    /// Instantaneous hitscan beam.
    Laser,
    /// Per-frame input broadcast (rollback strategy).
    Input,
    /// Full-state bootstrap from the elected host.
    #[strum(serialize = "initialSync")]
    InitialSync,
    /// Per-peer measured delay feedback (delay strategy).
    Pong,
    /// Request for an immediate position resend. No payload.
    ForceUpdate,
}
