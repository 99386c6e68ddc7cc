//! Per-peer input history with prediction.
//!
//! Stores each peer's inputs keyed by frame inside a bounded window, and a
//! per-peer prediction used whenever a frame has no recorded input yet. The
//! predictor is "last input persists": the input at the peer's highest
//! recorded frame. Cheaper than velocity extrapolation and wrong more
//! often, which rollback absorbs anyway.

use std::collections::BTreeMap;

use fray_core::{Frame, Input, PeerId};

#[derive(Debug)]
pub struct InputBuffer {
    /// peer -> (frame -> input), bounded to `window` frames per peer.
    buffer: BTreeMap<PeerId, BTreeMap<Frame, Input>>,
    /// peer -> fallback input for frames with no record.
    predictions: BTreeMap<PeerId, Input>,
    window: usize,
}

impl InputBuffer {
    pub fn new(window: usize) -> Self {
        Self {
            buffer: BTreeMap::new(),
            predictions: BTreeMap::new(),
            window: window.max(1),
        }
    }

    /// Stores an input, overwriting a duplicate for the same (peer, frame),
    /// then evicts the peer's oldest frames while over the window.
    pub fn record(&mut self, peer: PeerId, frame: Frame, input: Input) {
        let frames = self.buffer.entry(peer).or_default();
        frames.insert(frame, input);
        while frames.len() > self.window {
            frames.pop_first();
        }
    }

    /// The input the simulation should use for (peer, frame): the recorded
    /// value if present, else the peer's prediction, else no-op.
    pub fn input_for(&self, peer: &PeerId, frame: Frame) -> Input {
        if let Some(input) = self.buffer.get(peer).and_then(|frames| frames.get(&frame)) {
            return *input;
        }
        self.prediction(peer)
    }

    /// The peer's current prediction (no-op if none recorded yet).
    pub fn prediction(&self, peer: &PeerId) -> Input {
        self.predictions.get(peer).copied().unwrap_or(Input::NONE)
    }

    /// Sets the peer's prediction to its most-recently-recorded input, by
    /// frame number rather than arrival order.
    pub fn update_prediction(&mut self, peer: &PeerId) {
        if let Some((_, input)) = self.buffer.get(peer).and_then(|frames| frames.last_key_value())
        {
            self.predictions.insert(peer.clone(), *input);
        }
    }

    /// The highest frame recorded for a peer.
    pub fn latest_frame(&self, peer: &PeerId) -> Option<Frame> {
        self.buffer
            .get(peer)
            .and_then(|frames| frames.last_key_value())
            .map(|(frame, _)| *frame)
    }

    /// Frames currently recorded for a peer.
    pub fn frames_recorded(&self, peer: &PeerId) -> usize {
        self.buffer.get(peer).map_or(0, BTreeMap::len)
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Drops all state for a departed peer.
    pub fn remove_peer(&mut self, peer: &PeerId) {
        self.buffer.remove(peer);
        self.predictions.remove(peer);
    }
}
