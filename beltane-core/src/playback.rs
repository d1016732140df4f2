//! In-flight sound bookkeeping in front of the pooling collaborator.
//!
//! The pool owns the actual playback resources; this registry tracks which
//! handles are live, which item and channel each one belongs to, and the
//! continuation to resolve when one finishes naturally. Stale completions
//! (the pool reporting a handle that was already stopped) are ignored here,
//! which is half of the late-callback defense; the sequencer's active-set
//! check is the other half.

use std::sync::mpsc::Sender;

use beltane_types::{AudioItem, BusEvent, ChannelId, Continuation, Feedback, HandleId, ItemId};

use crate::backend::PlaybackSink;
use crate::mixer::ChannelMixer;

/// One sound the pool is currently playing on the core's behalf.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveSound {
    pub handle: HandleId,
    pub item: ItemId,
    pub channel: ChannelId,
    pub cont: Continuation,
}

/// Registry of live handles, in spawn order.
#[derive(Debug, Default)]
pub struct SoundRegistry {
    live: Vec<LiveSound>,
}

impl SoundRegistry {
    pub fn new() -> Self {
        Self { live: Vec::new() }
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn is_live(&self, handle: HandleId) -> bool {
        self.live.iter().any(|s| s.handle == handle)
    }

    /// Handles currently sounding on a channel, in spawn order.
    pub fn handles_on(&self, channel: ChannelId) -> Vec<HandleId> {
        self.live
            .iter()
            .filter(|s| s.channel == channel)
            .map(|s| s.handle)
            .collect()
    }

    /// Route one bus event to the matching pool operation.
    pub fn handle(
        &mut self,
        ev: &BusEvent,
        mixer: &ChannelMixer,
        sink: &mut dyn PlaybackSink,
        feedback: &Sender<Feedback>,
    ) {
        match ev {
            BusEvent::PlayItem { item, cont } => self.play(item, *cont, mixer, sink, feedback),
            BusEvent::StopItem { item } => self.stop(*item, sink, feedback),
            _ => {}
        }
    }

    /// Spawn an item and record its handle. The channel's current level is
    /// applied right away so a preceding mute or volume change covers the
    /// new sound from its first sample.
    fn play(
        &mut self,
        item: &AudioItem,
        cont: Continuation,
        mixer: &ChannelMixer,
        sink: &mut dyn PlaybackSink,
        feedback: &Sender<Feedback>,
    ) {
        let handle = sink.spawn(item);
        if let Some(level) = mixer.level(item.channel) {
            sink.set_volume(handle, level.volume);
            if level.muted {
                sink.set_muted(handle, true);
            }
        } else {
            log::debug!(target: "playback", "item {} references unknown channel {}", item.id, item.channel);
        }
        self.live.push(LiveSound {
            handle,
            item: item.id,
            channel: item.channel,
            cont,
        });
        let _ = feedback.send(Feedback::ItemStarted {
            item: item.id,
            handle,
        });
    }

    /// Despawn every live handle playing the item. No match means the sound
    /// already ended on its own; nothing to do.
    fn stop(&mut self, item: ItemId, sink: &mut dyn PlaybackSink, feedback: &Sender<Feedback>) {
        let (stopped, keep): (Vec<LiveSound>, Vec<LiveSound>) =
            self.live.drain(..).partition(|s| s.item == item);
        self.live = keep;
        for s in stopped {
            sink.despawn(s.handle);
            let _ = feedback.send(Feedback::ItemStopped(s.item));
        }
    }

    /// The pool's completion callback: a handle finished naturally. Returns
    /// the continuation to resolve, or None for a stale handle.
    pub fn finished(&mut self, handle: HandleId, feedback: &Sender<Feedback>) -> Option<Continuation> {
        let Some(idx) = self.live.iter().position(|s| s.handle == handle) else {
            log::debug!(target: "playback", "stale completion for handle {}", handle);
            return None;
        };
        let s = self.live.remove(idx);
        let _ = feedback.send(Feedback::ItemFinished(s.item));
        Some(s.cont)
    }

    /// Despawn everything still live. For shutdown.
    pub fn stop_all(&mut self, sink: &mut dyn PlaybackSink, feedback: &Sender<Feedback>) {
        for s in self.live.drain(..) {
            sink.despawn(s.handle);
            let _ = feedback.send(Feedback::ItemStopped(s.item));
        }
    }
}
