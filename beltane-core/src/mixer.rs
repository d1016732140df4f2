//! Per-channel volume and mute state, applied to in-flight sounds.
//!
//! The bank's channel records are the initial levels; from then on this is
//! the authority. A change updates the stored level and is forwarded to
//! every handle currently live on that channel, so the pool's sounds track
//! the channel without being re-spawned.

use beltane_types::{BusEvent, ChannelId, CueBank};

use crate::backend::PlaybackSink;
use crate::playback::SoundRegistry;

/// Current runtime level for one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelLevel {
    pub id: ChannelId,
    pub volume: f32,
    pub muted: bool,
}

#[derive(Debug, Default)]
pub struct ChannelMixer {
    levels: Vec<ChannelLevel>,
}

impl ChannelMixer {
    /// Seed runtime levels from the bank's channel records.
    pub fn new(bank: &CueBank) -> Self {
        Self {
            levels: bank
                .channels
                .iter()
                .map(|c| ChannelLevel {
                    id: c.id,
                    volume: c.volume.clamp(0.0, 1.0),
                    muted: c.muted,
                })
                .collect(),
        }
    }

    pub fn level(&self, id: ChannelId) -> Option<&ChannelLevel> {
        self.levels.iter().find(|l| l.id == id)
    }

    pub fn volume_of(&self, id: ChannelId) -> Option<f32> {
        self.level(id).map(|l| l.volume)
    }

    pub fn is_muted(&self, id: ChannelId) -> Option<bool> {
        self.level(id).map(|l| l.muted)
    }

    /// Route one bus event to the matching level change.
    pub fn handle(&mut self, ev: &BusEvent, sounds: &SoundRegistry, sink: &mut dyn PlaybackSink) {
        match ev {
            BusEvent::SetChannelVolume { channel, volume } => {
                self.change_volume(*channel, *volume, sounds, sink)
            }
            BusEvent::SetChannelMuted { channel, muted } => {
                self.change_muted(*channel, *muted, sounds, sink)
            }
            _ => {}
        }
    }

    fn change_volume(
        &mut self,
        channel: ChannelId,
        volume: f32,
        sounds: &SoundRegistry,
        sink: &mut dyn PlaybackSink,
    ) {
        let Some(level) = self.levels.iter_mut().find(|l| l.id == channel) else {
            log::warn!(target: "mixer", "volume change for unknown channel {}", channel);
            return;
        };
        let volume = volume.clamp(0.0, 1.0);
        level.volume = volume;
        for handle in sounds.handles_on(channel) {
            sink.set_volume(handle, volume);
        }
    }

    fn change_muted(
        &mut self,
        channel: ChannelId,
        muted: bool,
        sounds: &SoundRegistry,
        sink: &mut dyn PlaybackSink,
    ) {
        let Some(level) = self.levels.iter_mut().find(|l| l.id == channel) else {
            log::warn!(target: "mixer", "mute change for unknown channel {}", channel);
            return;
        };
        level.muted = muted;
        for handle in sounds.handles_on(channel) {
            sink.set_muted(handle, muted);
        }
    }
}
