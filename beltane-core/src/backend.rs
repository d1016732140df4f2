//! Collaborator seams: the playback pool and the platform haptic device.
//!
//! The core never owns playback resources or device access; it talks to
//! these traits and compares the opaque handles they mint.

use beltane_types::{AudioItem, HandleId};

/// The external pooling collaborator that owns playback resources.
pub trait PlaybackSink {
    /// Begin playback of an item; returns the pool's opaque handle.
    fn spawn(&mut self, item: &AudioItem) -> HandleId;
    /// Stop and recycle a still-live handle.
    fn despawn(&mut self, handle: HandleId);
    fn set_volume(&mut self, handle: HandleId, volume: f32);
    fn set_muted(&mut self, handle: HandleId, muted: bool);
}

/// Platform haptic primitive. Pulse commands are fire-and-forget.
pub trait HapticDevice {
    /// Queried once per timeline activation.
    fn is_capable(&self) -> bool;
    fn set_pulse(&mut self, on: bool);
}

/// Sink that mints handles and discards every command, for headless runs
/// and for hosts with no audio layer attached.
#[derive(Debug)]
pub struct NullSink {
    next_handle: u64,
}

impl NullSink {
    pub fn new() -> Self {
        Self { next_handle: 0 }
    }
}

impl Default for NullSink {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackSink for NullSink {
    fn spawn(&mut self, item: &AudioItem) -> HandleId {
        self.next_handle += 1;
        log::debug!(target: "playback", "null spawn {} -> handle {}", item.source, self.next_handle);
        HandleId::new(self.next_handle)
    }

    fn despawn(&mut self, _handle: HandleId) {}

    fn set_volume(&mut self, _handle: HandleId, _volume: f32) {}

    fn set_muted(&mut self, _handle: HandleId, _muted: bool) {}
}

/// Capable device that swallows pulses, for headless runs.
#[derive(Debug, Default)]
pub struct NullHaptics;

impl HapticDevice for NullHaptics {
    fn is_capable(&self) -> bool {
        true
    }

    fn set_pulse(&mut self, _on: bool) {}
}
