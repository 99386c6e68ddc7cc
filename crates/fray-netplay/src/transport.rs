//! Transport seam between a session and its peers.
//!
//! A session only ever broadcasts encoded lines and polls for inbound ones;
//! the trait hides whether those lines cross a real network or an
//! in-process hub. [`LoopbackHub`] is the in-process implementation used by
//! the simulator and the tests: every joined peer gets a mailbox, and a
//! send fans out to every mailbox but the sender's own.

use std::collections::BTreeMap;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use fray_core::PeerId;
use parking_lot::Mutex;

use crate::error::NetcodeError;

/// Connection fabric as the session sees it: broadcast-only sends, polled
/// receives, and a membership list derived from live connections.
pub trait PeerTransport {
    /// Broadcasts one encoded line to every other peer.
    fn send(&self, line: &str) -> Result<(), NetcodeError>;

    /// Next inbound line, if one is waiting. Never blocks.
    fn try_recv(&self) -> Option<String>;

    /// Every currently connected peer, the local one included.
    fn roster(&self) -> Vec<PeerId>;
}

#[derive(Default)]
struct HubInner {
    mailboxes: BTreeMap<PeerId, Sender<String>>,
}

/// Shared in-process fabric. Cloning shares the same membership, so one hub
/// wires any number of transports together.
#[derive(Clone, Default)]
pub struct LoopbackHub {
    inner: Arc<Mutex<HubInner>>,
}

impl LoopbackHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connects a peer and hands back its transport endpoint.
    pub fn join(&self, peer: PeerId) -> LoopbackTransport {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.inner.lock().mailboxes.insert(peer.clone(), tx);
        LoopbackTransport {
            local: peer,
            hub: self.clone(),
            rx,
        }
    }

    /// Disconnects a peer. Anything still queued in its mailbox is lost,
    /// the same as a closed socket.
    pub fn drop_peer(&self, peer: &PeerId) {
        self.inner.lock().mailboxes.remove(peer);
    }

    pub fn contains(&self, peer: &PeerId) -> bool {
        self.inner.lock().mailboxes.contains_key(peer)
    }
}

/// One peer's endpoint on a [`LoopbackHub`].
pub struct LoopbackTransport {
    local: PeerId,
    hub: LoopbackHub,
    rx: Receiver<String>,
}

impl LoopbackTransport {
    pub fn local(&self) -> &PeerId {
        &self.local
    }
}

impl PeerTransport for LoopbackTransport {
    fn send(&self, line: &str) -> Result<(), NetcodeError> {
        let inner = self.hub.inner.lock();
        if !inner.mailboxes.contains_key(&self.local) {
            return Err(NetcodeError::TransportClosed);
        }
        for (peer, tx) in &inner.mailboxes {
            if peer == &self.local {
                continue;
            }
            // A receiver dropped mid-broadcast is a peer mid-disconnect;
            // the next roster poll reconciles it.
            let _ = tx.send(line.to_owned());
        }
        Ok(())
    }

    fn try_recv(&self) -> Option<String> {
        self.rx.try_recv().ok()
    }

    fn roster(&self) -> Vec<PeerId> {
        self.hub.inner.lock().mailboxes.keys().cloned().collect()
    }
}
