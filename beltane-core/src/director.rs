//! Ownership root and dispatch loop for the audio core.
//!
//! The director owns the bus, the bank, every component, and the two device
//! seams. `publish` appends to a pending queue and drains it before
//! returning: each dequeued event snapshots its channel's subscribers, then
//! is handed to each endpoint in subscription order. Follow-up events queued
//! by handlers are dispatched in turn, so by the time the outermost
//! `publish` returns the queue is empty.
//!
//! Components never call each other; cross-component effects travel through
//! the pending queue, so delivery is never re-entrant.

use std::collections::VecDeque;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::time::Duration;

use beltane_types::{
    BusEvent, Channel, ChannelId, ClusterId, Continuation, CueBank, Feedback, HandleId, TimelineId,
};

use crate::backend::{HapticDevice, PlaybackSink};
use crate::bus::{Endpoint, EventBus, SubscriptionId};
use crate::haptics::TimelineRunner;
use crate::mixer::ChannelMixer;
use crate::playback::SoundRegistry;
use crate::sequencer::ClusterSequencer;

/// Subscriptions installed at construction and torn down exactly once at
/// shutdown.
#[derive(Debug)]
struct Wiring {
    ids: Vec<SubscriptionId>,
}

fn install_wiring(bus: &mut EventBus) -> Wiring {
    let routes = [
        (Channel::StartCluster, Endpoint::Sequencer),
        (Channel::StopCluster, Endpoint::Sequencer),
        (Channel::AdvanceCluster, Endpoint::Sequencer),
        (Channel::ClusterFinished, Endpoint::Sequencer),
        (Channel::PlayItem, Endpoint::Playback),
        (Channel::StopItem, Endpoint::Playback),
        (Channel::StartTimeline, Endpoint::Haptics),
        (Channel::StopTimeline, Endpoint::Haptics),
        (Channel::SetChannelVolume, Endpoint::Mixer),
        (Channel::SetChannelMuted, Endpoint::Mixer),
    ];
    let ids = routes
        .iter()
        .filter_map(|&(channel, endpoint)| bus.subscribe(channel, endpoint))
        .collect::<Vec<_>>();
    log::debug!(target: "director", "installed {} bus routes", ids.len());
    Wiring { ids }
}

pub struct Director {
    bus: EventBus,
    bank: CueBank,
    clusters: ClusterSequencer,
    haptics: TimelineRunner,
    mixer: ChannelMixer,
    sounds: SoundRegistry,
    sink: Box<dyn PlaybackSink>,
    device: Box<dyn HapticDevice>,
    pending: VecDeque<BusEvent>,
    feedback_tx: Sender<Feedback>,
    wiring: Option<Wiring>,
    suspended: bool,
}

impl Director {
    /// Build a director over a bank and the two device seams. The feedback
    /// receiver is returned alongside so the embedder can observe outcomes.
    pub fn new(
        bank: CueBank,
        sink: Box<dyn PlaybackSink>,
        device: Box<dyn HapticDevice>,
    ) -> (Self, Receiver<Feedback>) {
        let (feedback_tx, feedback_rx) = channel();
        let mut bus = EventBus::new();
        let wiring = install_wiring(&mut bus);
        let mixer = ChannelMixer::new(&bank);
        let director = Self {
            bus,
            bank,
            clusters: ClusterSequencer::new(),
            haptics: TimelineRunner::new(),
            mixer,
            sounds: SoundRegistry::new(),
            sink,
            device,
            pending: VecDeque::new(),
            feedback_tx,
            wiring: Some(wiring),
            suspended: false,
        };
        (director, feedback_rx)
    }

    pub fn bank(&self) -> &CueBank {
        &self.bank
    }

    pub fn is_cluster_active(&self, id: ClusterId) -> bool {
        self.clusters.is_active(id)
    }

    pub fn is_timeline_running(&self, id: TimelineId) -> bool {
        self.haptics.is_running(id)
    }

    pub fn live_sound_count(&self) -> usize {
        self.sounds.live_count()
    }

    /// Publish one event and run dispatch to completion. Any follow-up
    /// events queued during delivery are drained before this returns.
    pub fn publish(&mut self, ev: BusEvent) {
        self.pending.push_back(ev);
        self.drain();
    }

    pub fn start_cluster(&mut self, cluster: ClusterId) {
        self.publish(BusEvent::StartCluster { cluster });
    }

    pub fn stop_cluster(&mut self, cluster: ClusterId) {
        self.publish(BusEvent::StopCluster { cluster });
    }

    pub fn start_timeline(&mut self, timeline: TimelineId) {
        self.publish(BusEvent::StartTimeline { timeline });
    }

    pub fn stop_timeline(&mut self, timeline: TimelineId) {
        self.publish(BusEvent::StopTimeline { timeline });
    }

    pub fn set_channel_volume(&mut self, channel: ChannelId, volume: f32) {
        self.publish(BusEvent::SetChannelVolume { channel, volume });
    }

    pub fn set_channel_muted(&mut self, channel: ChannelId, muted: bool) {
        self.publish(BusEvent::SetChannelMuted { channel, muted });
    }

    /// Completion callback from the pool: the sound for `handle` ended on
    /// its own. Resolves the continuation recorded at spawn time; a stale
    /// handle resolves to nothing.
    pub fn item_finished(&mut self, handle: HandleId) {
        match self.sounds.finished(handle, &self.feedback_tx) {
            Some(Continuation::Advance(cluster)) => {
                self.publish(BusEvent::AdvanceCluster { cluster })
            }
            Some(Continuation::None) | None => {}
        }
    }

    /// Advance time-driven components by the elapsed wall time. Gated while
    /// suspended; event publication is not.
    pub fn tick(&mut self, elapsed: Duration) {
        if self.suspended {
            return;
        }
        self.haptics.tick(
            elapsed,
            &self.bank,
            &mut *self.device,
            &mut self.pending,
            &self.feedback_tx,
        );
        self.drain();
    }

    pub fn suspend(&mut self) {
        if !self.suspended {
            log::debug!(target: "director", "suspended");
        }
        self.suspended = true;
    }

    pub fn resume(&mut self) {
        if self.suspended {
            log::debug!(target: "director", "resumed");
        }
        self.suspended = false;
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Stop everything and tear down the wiring. Idempotent; publishing
    /// after shutdown finds no subscribers and falls through as a no-op.
    pub fn shutdown(&mut self) {
        let Some(wiring) = self.wiring.take() else {
            log::debug!(target: "director", "shutdown: already down");
            return;
        };
        for cluster in self.clusters.active_ids() {
            self.publish(BusEvent::StopCluster { cluster });
        }
        self.haptics.cancel_all(&mut *self.device, &self.feedback_tx);
        self.sounds.stop_all(&mut *self.sink, &self.feedback_tx);
        for id in wiring.ids {
            self.bus.unsubscribe(id);
        }
        log::info!(target: "director", "shut down");
    }

    fn drain(&mut self) {
        while let Some(ev) = self.pending.pop_front() {
            let channel = ev.channel();
            let endpoints = self.bus.subscribers(channel);
            if endpoints.is_empty() {
                log::debug!(target: "bus", "no subscribers for {:?}", channel);
                continue;
            }
            for endpoint in endpoints {
                self.deliver(endpoint, &ev);
            }
        }
    }

    fn deliver(&mut self, endpoint: Endpoint, ev: &BusEvent) {
        match endpoint {
            Endpoint::Sequencer => {
                self.clusters
                    .handle(ev, &self.bank, &mut self.pending, &self.feedback_tx)
            }
            Endpoint::Playback => {
                self.sounds
                    .handle(ev, &self.mixer, &mut *self.sink, &self.feedback_tx)
            }
            Endpoint::Haptics => self.haptics.handle(
                ev,
                &self.bank,
                &mut *self.device,
                &mut self.pending,
                &self.feedback_tx,
            ),
            Endpoint::Mixer => self.mixer.handle(ev, &self.sounds, &mut *self.sink),
        }
    }
}
