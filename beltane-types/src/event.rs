//! Event vocabulary shared between the bus, its components, and the host.

use crate::cue::AudioItem;
use crate::{ChannelId, ClusterId, HandleId, ItemId, TimelineId};

/// Typed multicast slots on the event bus. One slot per `BusEvent` variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    StartCluster,
    StopCluster,
    AdvanceCluster,
    ClusterFinished,
    PlayItem,
    StopItem,
    StartTimeline,
    StopTimeline,
    TimelineFinished,
    SetChannelVolume,
    SetChannelMuted,
}

/// What to do when a playback item finishes naturally.
/// Stored per live sound instead of capturing closures, so a stale
/// completion resolves against current state and can be ignored safely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    /// The sound simply ends.
    None,
    /// Advance the named cluster past its current item.
    Advance(ClusterId),
}

/// Payloads published on the bus, one variant per channel.
#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent {
    StartCluster { cluster: ClusterId },
    StopCluster { cluster: ClusterId },
    AdvanceCluster { cluster: ClusterId },
    ClusterFinished { cluster: ClusterId },
    PlayItem { item: AudioItem, cont: Continuation },
    StopItem { item: ItemId },
    StartTimeline { timeline: TimelineId },
    StopTimeline { timeline: TimelineId },
    TimelineFinished { timeline: TimelineId },
    SetChannelVolume { channel: ChannelId, volume: f32 },
    SetChannelMuted { channel: ChannelId, muted: bool },
}

impl BusEvent {
    /// The channel this event is published on.
    pub fn channel(&self) -> Channel {
        match self {
            BusEvent::StartCluster { .. } => Channel::StartCluster,
            BusEvent::StopCluster { .. } => Channel::StopCluster,
            BusEvent::AdvanceCluster { .. } => Channel::AdvanceCluster,
            BusEvent::ClusterFinished { .. } => Channel::ClusterFinished,
            BusEvent::PlayItem { .. } => Channel::PlayItem,
            BusEvent::StopItem { .. } => Channel::StopItem,
            BusEvent::StartTimeline { .. } => Channel::StartTimeline,
            BusEvent::StopTimeline { .. } => Channel::StopTimeline,
            BusEvent::TimelineFinished { .. } => Channel::TimelineFinished,
            BusEvent::SetChannelVolume { .. } => Channel::SetChannelVolume,
            BusEvent::SetChannelMuted { .. } => Channel::SetChannelMuted,
        }
    }
}

/// Feedback messages from the director to the hosting layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Feedback {
    ItemStarted {
        item: ItemId,
        handle: HandleId,
    },
    /// A non-looping item reached its natural end.
    ItemFinished(ItemId),
    /// An item was stopped by a cluster transition or an external stop.
    ItemStopped(ItemId),
    ClusterFinished(ClusterId),
    TimelineFinished {
        timeline: TimelineId,
        cancelled: bool,
    },
}
