//! # beltane-core
//!
//! Event-driven audio and haptics sequencing core. Owns cluster playback,
//! vibration timelines, and channel mixing behind a synchronous event bus,
//! independent of any actual audio backend.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use beltane_core::{Director, NullHaptics, NullSink};
//! use beltane_core::config::{load_bank_file, Config};
//!
//! // 1. Load runtime settings and a cue bank
//! let config = Config::load();
//! let bank = load_bank_file(std::path::Path::new("cues.toml"))?;
//!
//! // 2. Build the director over the two device seams
//! let (mut director, feedback_rx) =
//!     Director::new(bank, Box::new(NullSink::new()), Box::new(NullHaptics));
//!
//! // 3. Publish commands; dispatch completes before each call returns
//! director.start_cluster(beltane_types::ClusterId::new(1));
//!
//! // 4. Drive time from the host loop and report pool completions
//! director.tick(std::time::Duration::from_millis(16));
//! // director.item_finished(handle) when the pool says a sound ended
//!
//! // 5. Drain feedback_rx for started/finished/stopped notifications
//! ```
//!
//! ## Module Overview
//!
//! - [`bus`] — `EventBus`: ordered channel-to-endpoint routing registry
//! - [`director`] — `Director`: ownership root, publish/drain dispatch loop
//! - [`sequencer`] — active clusters and their item-to-item transitions
//! - [`haptics`] — resumable vibration timeline executions, tick-driven
//! - [`mixer`] — per-channel volume/mute applied to in-flight sounds
//! - [`playback`] — live handle registry in front of the pooling collaborator
//! - [`backend`] — `PlaybackSink`/`HapticDevice` seams plus null impls
//! - [`config`] — TOML runtime settings (embedded + user override) and
//!   cue bank loading

pub mod backend;
pub mod bus;
pub mod config;
pub mod director;
pub mod haptics;
pub mod mixer;
pub mod playback;
pub mod sequencer;

pub use backend::{HapticDevice, NullHaptics, NullSink, PlaybackSink};
pub use bus::{Endpoint, EventBus, SubscriptionId};
pub use config::Config;
pub use director::Director;
