use crate::event::EventKind;

pub mod combat;
pub mod input;
pub mod session;
pub mod state;

use combat::{Hit, Laser};
use input::InputFrame;
use session::{InitialSync, Pong};
use state::{NewProjectile, PosUpdate, ProjectileGone, ProjectilePos};

/// Every message the protocol can carry, as a tagged union.
///
/// Parsing and serializing happen only at the transport edge (see
/// [`codec`]); everything above it works with these typed values.
///
/// [`codec`]: crate::codec
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Pos(PosUpdate),
    NewProj(NewProjectile),
    ProjPos(ProjectilePos),
    ProjDel(ProjectileGone),
    Hit(Hit),
    Left,
    Laser(Laser),
    Input(InputFrame),
    InitialSync(InitialSync),
    Pong(Pong),
    ForceUpdate,
}

impl Message {
    /// The envelope tag this message travels under.
    pub fn kind(&self) -> EventKind {
        match self {
            Message::Pos(_) => EventKind::Pos,
            Message::NewProj(_) => EventKind::NewProj,
            Message::ProjPos(_) => EventKind::ProjPos,
            Message::ProjDel(_) => EventKind::ProjDel,
            Message::Hit(_) => EventKind::Hit,
            Message::Left => EventKind::Left,
            Message::Laser(_) => EventKind::Laser,
            Message::Input(_) => EventKind::Input,
            Message::InitialSync(_) => EventKind::InitialSync,
            Message::Pong(_) => EventKind::Pong,
            Message::ForceUpdate => EventKind::ForceUpdate,
        }
    }
}
