use serde::{Deserialize, Serialize};

use crate::{ChannelId, ClusterId, ItemId, TimelineId};

/// A single playable clip: content reference, loop flag, channel identity.
/// Value description only; playback resources stay with the pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioItem {
    pub id: ItemId,
    pub source: String,
    #[serde(rename = "loop", default)]
    pub looped: bool,
    pub channel: ChannelId,
}

/// Ordered group of items played in sequence while the cluster is active.
/// The playback cursor lives with the sequencer's active record, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioCluster {
    pub id: ClusterId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub items: Vec<AudioItem>,
}

/// Kind of a timeline step: wait silently or vibrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Delay,
    Pulse,
}

/// One timed step of a vibration timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub kind: SegmentKind,
    pub secs: f32,
}

/// Ordered delay/pulse segments describing one haptic pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VibrationTimeline {
    pub id: TimelineId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

impl VibrationTimeline {
    /// Sum of declared segment durations.
    pub fn total_secs(&self) -> f32 {
        self.segments.iter().map(|s| s.secs).sum()
    }
}

fn default_volume() -> f32 {
    1.0
}

/// Initial volume/mute configuration for one output channel.
/// The mixer seeds its runtime levels from these records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioChannel {
    pub id: ChannelId,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default)]
    pub muted: bool,
}

/// Immutable cue configuration handed to the director at construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CueBank {
    #[serde(default)]
    pub channels: Vec<AudioChannel>,
    #[serde(default)]
    pub clusters: Vec<AudioCluster>,
    #[serde(default)]
    pub timelines: Vec<VibrationTimeline>,
}

impl CueBank {
    /// Get a cluster by ID
    pub fn cluster(&self, id: ClusterId) -> Option<&AudioCluster> {
        self.clusters.iter().find(|c| c.id == id)
    }

    /// Get a timeline by ID
    pub fn timeline(&self, id: TimelineId) -> Option<&VibrationTimeline> {
        self.timelines.iter().find(|t| t.id == id)
    }

    /// Get a channel by ID
    pub fn channel(&self, id: ChannelId) -> Option<&AudioChannel> {
        self.channels.iter().find(|c| c.id == id)
    }

    /// Find an item by ID across all clusters
    pub fn item(&self, id: ItemId) -> Option<&AudioItem> {
        self.clusters
            .iter()
            .flat_map(|c| c.items.iter())
            .find(|i| i.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_bank() -> CueBank {
        CueBank {
            channels: vec![AudioChannel {
                id: ChannelId::new(1),
                name: "music".into(),
                volume: 0.8,
                muted: false,
            }],
            clusters: vec![AudioCluster {
                id: ClusterId::new(10),
                name: "combat".into(),
                items: vec![
                    AudioItem {
                        id: ItemId::new(100),
                        source: "combat_intro.ogg".into(),
                        looped: false,
                        channel: ChannelId::new(1),
                    },
                    AudioItem {
                        id: ItemId::new(101),
                        source: "combat_loop.ogg".into(),
                        looped: true,
                        channel: ChannelId::new(1),
                    },
                ],
            }],
            timelines: vec![VibrationTimeline {
                id: TimelineId::new(20),
                name: "heartbeat".into(),
                segments: vec![
                    Segment {
                        kind: SegmentKind::Delay,
                        secs: 1.0,
                    },
                    Segment {
                        kind: SegmentKind::Pulse,
                        secs: 0.5,
                    },
                ],
            }],
        }
    }

    #[test]
    fn cluster_lookup_by_id() {
        let bank = make_bank();
        assert!(bank.cluster(ClusterId::new(10)).is_some());
        assert!(bank.cluster(ClusterId::new(99)).is_none());
    }

    #[test]
    fn item_lookup_searches_all_clusters() {
        let bank = make_bank();
        assert_eq!(
            bank.item(ItemId::new(101)).map(|i| i.source.as_str()),
            Some("combat_loop.ogg")
        );
        assert!(bank.item(ItemId::new(999)).is_none());
    }

    #[test]
    fn timeline_total_secs() {
        let bank = make_bank();
        let t = bank.timeline(TimelineId::new(20)).unwrap();
        assert!((t.total_secs() - 1.5).abs() < f32::EPSILON);
    }

    #[test]
    fn item_loop_field_renames() {
        let item: AudioItem = toml::from_str(
            r#"
            id = 1
            source = "drone.ogg"
            loop = true
            channel = 2
            "#,
        )
        .unwrap();
        assert!(item.looped);
        assert_eq!(item.channel, ChannelId::new(2));
    }

    #[test]
    fn segment_kind_parses_lowercase() {
        let seg: Segment = toml::from_str(
            r#"
            kind = "pulse"
            secs = 0.25
            "#,
        )
        .unwrap();
        assert_eq!(seg.kind, SegmentKind::Pulse);
        let seg: Segment = toml::from_str(
            r#"
            kind = "delay"
            secs = 1.0
            "#,
        )
        .unwrap();
        assert_eq!(seg.kind, SegmentKind::Delay);
    }

    #[test]
    fn channel_volume_defaults_to_unity() {
        let ch: AudioChannel = toml::from_str("id = 3").unwrap();
        assert!((ch.volume - 1.0).abs() < f32::EPSILON);
        assert!(!ch.muted);
        assert!(ch.name.is_empty());
    }
}
