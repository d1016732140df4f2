use std::path::{Path, PathBuf};

use serde::Deserialize;

use beltane_types::CueBank;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    runtime: RuntimeConfig,
}

#[derive(Deserialize, Default)]
struct RuntimeConfig {
    tick_hz: Option<u32>,
    sim_item_secs: Option<f32>,
    haptics: Option<bool>,
    bank: Option<PathBuf>,
}

pub struct Config {
    runtime: RuntimeConfig,
}

impl Config {
    pub fn load() -> Self {
        let mut base: ConfigFile =
            toml::from_str(DEFAULT_CONFIG).expect("Failed to parse embedded config.toml");

        if let Some(path) = user_config_path() {
            if path.exists() {
                match std::fs::read_to_string(&path) {
                    Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                        Ok(user) => merge_runtime(&mut base.runtime, user.runtime),
                        Err(e) => {
                            log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e)
                        }
                    },
                    Err(e) => {
                        log::warn!(target: "config", "could not read config {}: {}", path.display(), e)
                    }
                }
            }
        }

        Config {
            runtime: base.runtime,
        }
    }

    /// Host loop rate in Hz (clamped to 10..1000).
    pub fn tick_hz(&self) -> u32 {
        self.runtime.tick_hz.unwrap_or(60).clamp(10, 1_000)
    }

    /// Simulated clip duration in seconds (clamped to 0.1..600).
    pub fn sim_item_secs(&self) -> f32 {
        self.runtime.sim_item_secs.unwrap_or(2.0).clamp(0.1, 600.0)
    }

    /// Whether a haptic device should be offered at all.
    pub fn haptics_enabled(&self) -> bool {
        self.runtime.haptics.unwrap_or(true)
    }

    /// Bank file to load instead of the embedded demo bank.
    pub fn bank_path(&self) -> Option<&Path> {
        self.runtime.bank.as_deref()
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("beltane").join("config.toml"))
}

fn merge_runtime(base: &mut RuntimeConfig, user: RuntimeConfig) {
    if user.tick_hz.is_some() {
        base.tick_hz = user.tick_hz;
    }
    if user.sim_item_secs.is_some() {
        base.sim_item_secs = user.sim_item_secs;
    }
    if user.haptics.is_some() {
        base.haptics = user.haptics;
    }
    if user.bank.is_some() {
        base.bank = user.bank;
    }
}

/// Parse a cue bank from TOML text and validate it. Duplicate identities
/// and negative durations are errors; dangling references and empty
/// definitions only warn, since the runtime degrades them to no-ops.
pub fn parse_bank(text: &str) -> Result<CueBank, String> {
    let bank: CueBank = toml::from_str(text).map_err(|e| format!("bank parse error: {}", e))?;
    validate_bank(&bank)?;
    Ok(bank)
}

/// Load a cue bank from a TOML file on disk.
pub fn load_bank_file(path: &Path) -> Result<CueBank, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Cannot read {}: {}", path.display(), e))?;
    parse_bank(&text)
}

fn validate_bank(bank: &CueBank) -> Result<(), String> {
    let mut channel_ids = Vec::new();
    for channel in &bank.channels {
        if channel_ids.contains(&channel.id) {
            return Err(format!("duplicate channel id {}", channel.id));
        }
        channel_ids.push(channel.id);
    }
    let mut cluster_ids = Vec::new();
    let mut item_ids = Vec::new();
    for cluster in &bank.clusters {
        if cluster_ids.contains(&cluster.id) {
            return Err(format!("duplicate cluster id {}", cluster.id));
        }
        cluster_ids.push(cluster.id);
        if cluster.items.is_empty() {
            log::warn!(target: "config", "cluster {} has no items", cluster.id);
        }
        for item in &cluster.items {
            if item_ids.contains(&item.id) {
                return Err(format!("duplicate item id {}", item.id));
            }
            item_ids.push(item.id);
            if bank.channel(item.channel).is_none() {
                log::warn!(
                    target: "config",
                    "item {} references unknown channel {}",
                    item.id,
                    item.channel
                );
            }
        }
    }
    let mut timeline_ids = Vec::new();
    for timeline in &bank.timelines {
        if timeline_ids.contains(&timeline.id) {
            return Err(format!("duplicate timeline id {}", timeline.id));
        }
        timeline_ids.push(timeline.id);
        if timeline.segments.is_empty() {
            log::warn!(target: "config", "timeline {} has no segments", timeline.id);
        }
        for segment in &timeline.segments {
            if segment.secs < 0.0 {
                return Err(format!(
                    "timeline {} has a negative segment duration",
                    timeline.id
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use beltane_types::{ChannelId, ClusterId, ItemId, TimelineId};
    use std::io::Write;

    const BANK: &str = r#"
        [[channels]]
        id = 1
        name = "music"
        volume = 0.8

        [[clusters]]
        id = 1
        name = "intro"

        [[clusters.items]]
        id = 10
        source = "a.ogg"
        channel = 1

        [[clusters.items]]
        id = 11
        source = "b.ogg"
        loop = true
        channel = 1

        [[timelines]]
        id = 1
        name = "heartbeat"

        [[timelines.segments]]
        kind = "delay"
        secs = 1.0

        [[timelines.segments]]
        kind = "pulse"
        secs = 0.5
    "#;

    #[test]
    fn test_load_embedded_config() {
        let config = Config::load();
        assert_eq!(config.tick_hz(), 60);
        assert!((config.sim_item_secs() - 2.0).abs() < f32::EPSILON);
        assert!(config.haptics_enabled());
        assert!(config.bank_path().is_none());
    }

    #[test]
    fn test_runtime_values_are_clamped() {
        let file: ConfigFile = toml::from_str(
            r#"
            [runtime]
            tick_hz = 5
            sim_item_secs = 10000.0
            "#,
        )
        .unwrap();
        let config = Config {
            runtime: file.runtime,
        };
        assert_eq!(config.tick_hz(), 10);
        assert!((config.sim_item_secs() - 600.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_user_override_merges_only_set_fields() {
        let mut base: ConfigFile = toml::from_str(DEFAULT_CONFIG).unwrap();
        let user: ConfigFile = toml::from_str(
            r#"
            [runtime]
            tick_hz = 120
            bank = "custom.toml"
            "#,
        )
        .unwrap();
        merge_runtime(&mut base.runtime, user.runtime);
        let config = Config {
            runtime: base.runtime,
        };
        // Fields the user set win; the rest keep the embedded defaults
        assert_eq!(config.tick_hz(), 120);
        assert!((config.sim_item_secs() - 2.0).abs() < f32::EPSILON);
        assert!(config.haptics_enabled());
        assert_eq!(config.bank_path(), Some(Path::new("custom.toml")));
    }

    #[test]
    fn test_parse_bank() {
        let bank = parse_bank(BANK).unwrap();
        assert_eq!(bank.channels.len(), 1);
        assert!((bank.channel(ChannelId::new(1)).unwrap().volume - 0.8).abs() < f32::EPSILON);
        let cluster = bank.cluster(ClusterId::new(1)).unwrap();
        assert_eq!(cluster.items.len(), 2);
        assert!(cluster.items[1].looped);
        assert!(bank.item(ItemId::new(10)).is_some());
        let timeline = bank.timeline(TimelineId::new(1)).unwrap();
        assert!((timeline.total_secs() - 1.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_duplicate_item_id_rejected() {
        let text = r#"
            [[clusters]]
            id = 1

            [[clusters.items]]
            id = 10
            source = "a.ogg"
            channel = 1

            [[clusters]]
            id = 2

            [[clusters.items]]
            id = 10
            source = "b.ogg"
            channel = 1
        "#;
        let err = parse_bank(text).unwrap_err();
        assert!(err.contains("duplicate item id"));
    }

    #[test]
    fn test_duplicate_channel_id_rejected() {
        let text = r#"
            [[channels]]
            id = 1

            [[channels]]
            id = 1
        "#;
        let err = parse_bank(text).unwrap_err();
        assert!(err.contains("duplicate channel id"));
    }

    #[test]
    fn test_duplicate_cluster_id_rejected() {
        let text = r#"
            [[clusters]]
            id = 1

            [[clusters]]
            id = 1
        "#;
        let err = parse_bank(text).unwrap_err();
        assert!(err.contains("duplicate cluster id"));
    }

    #[test]
    fn test_duplicate_timeline_id_rejected() {
        let text = r#"
            [[timelines]]
            id = 7

            [[timelines]]
            id = 7
        "#;
        let err = parse_bank(text).unwrap_err();
        assert!(err.contains("duplicate timeline id"));
    }

    #[test]
    fn test_dangling_channel_reference_still_loads() {
        let text = r#"
            [[clusters]]
            id = 1

            [[clusters.items]]
            id = 10
            source = "a.ogg"
            channel = 42
        "#;
        assert!(parse_bank(text).is_ok());
    }

    #[test]
    fn test_negative_segment_duration_rejected() {
        let text = r#"
            [[timelines]]
            id = 1

            [[timelines.segments]]
            kind = "pulse"
            secs = -0.5
        "#;
        let err = parse_bank(text).unwrap_err();
        assert!(err.contains("negative segment duration"));
    }

    #[test]
    fn test_load_bank_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(BANK.as_bytes()).unwrap();
        let bank = load_bank_file(file.path()).unwrap();
        assert!(bank.cluster(ClusterId::new(1)).is_some());
    }

    #[test]
    fn test_load_missing_bank_file() {
        let err = load_bank_file(Path::new("/nonexistent/cues.toml")).unwrap_err();
        assert!(err.contains("Cannot read"));
    }
}
