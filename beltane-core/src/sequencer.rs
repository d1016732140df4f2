//! Cluster playback sequencing: which clusters are active, where their
//! cursors sit, and which transition fires when an item completes.
//!
//! Transitions publish follow-up events through the caller's queue instead
//! of dispatching inline, so ordering stays explicit and re-entry is
//! impossible. Every operation is defensive: stale or unknown identities
//! degrade to no-ops because completion continuations can race deactivation.

use std::collections::VecDeque;
use std::sync::mpsc::Sender;

use beltane_types::{BusEvent, ClusterId, Continuation, CueBank, Feedback};

/// Per-activation record. Created on Activate, destroyed on Deactivate.
/// Invariant: 0 <= cursor <= items.len() for the referenced cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveCluster {
    pub cluster: ClusterId,
    pub cursor: usize,
}

/// Owns the active-cluster set.
#[derive(Debug, Default)]
pub struct ClusterSequencer {
    active: Vec<ActiveCluster>,
}

impl ClusterSequencer {
    pub fn new() -> Self {
        Self { active: Vec::new() }
    }

    pub fn is_active(&self, id: ClusterId) -> bool {
        self.active.iter().any(|a| a.cluster == id)
    }

    /// Cursor of an active cluster, if it is playing.
    pub fn cursor(&self, id: ClusterId) -> Option<usize> {
        self.active.iter().find(|a| a.cluster == id).map(|a| a.cursor)
    }

    /// IDs of all currently playing clusters, in activation order.
    pub fn active_ids(&self) -> Vec<ClusterId> {
        self.active.iter().map(|a| a.cluster).collect()
    }

    /// Route one bus event to the matching transition.
    pub fn handle(
        &mut self,
        ev: &BusEvent,
        bank: &CueBank,
        out: &mut VecDeque<BusEvent>,
        feedback: &Sender<Feedback>,
    ) {
        match ev {
            BusEvent::StartCluster { cluster } => self.activate(*cluster, bank, out, feedback),
            BusEvent::StopCluster { cluster } => self.deactivate(*cluster, bank, out),
            BusEvent::AdvanceCluster { cluster } => self.advance(*cluster, bank, out, feedback),
            BusEvent::ClusterFinished { cluster } => self.deactivate(*cluster, bank, out),
            _ => {}
        }
    }

    /// Start playing a cluster from its first item. Idempotent: a cluster
    /// already in the active set is left undisturbed.
    fn activate(
        &mut self,
        id: ClusterId,
        bank: &CueBank,
        out: &mut VecDeque<BusEvent>,
        feedback: &Sender<Feedback>,
    ) {
        let Some(cluster) = bank.cluster(id) else {
            log::warn!(target: "cluster", "activate: unknown cluster {}", id);
            return;
        };
        if self.is_active(id) {
            log::debug!(target: "cluster", "activate: cluster {} already playing", id);
            return;
        }
        if cluster.items.is_empty() {
            // Nothing playable; report the terminal transition right away.
            log::warn!(target: "cluster", "activate: cluster {} has no items", id);
            out.push_back(BusEvent::ClusterFinished { cluster: id });
            let _ = feedback.send(Feedback::ClusterFinished(id));
            return;
        }
        self.active.push(ActiveCluster {
            cluster: id,
            cursor: 0,
        });
        out.push_back(BusEvent::PlayItem {
            item: cluster.items[0].clone(),
            cont: Continuation::Advance(id),
        });
    }

    /// Completion continuation: loop the current item, or stop it and move
    /// on, or finish the cluster when the last item is done.
    fn advance(
        &mut self,
        id: ClusterId,
        bank: &CueBank,
        out: &mut VecDeque<BusEvent>,
        feedback: &Sender<Feedback>,
    ) {
        let Some(entry) = self.active.iter_mut().find(|a| a.cluster == id) else {
            // Stale continuation after deactivation; expected under
            // cooperative scheduling.
            log::debug!(target: "cluster", "advance: cluster {} not active", id);
            return;
        };
        let Some(cluster) = bank.cluster(id) else {
            log::warn!(target: "cluster", "advance: cluster {} missing from bank", id);
            return;
        };
        let Some(current) = cluster.items.get(entry.cursor) else {
            log::warn!(
                target: "cluster",
                "advance: cursor {} out of range for cluster {}",
                entry.cursor,
                id
            );
            return;
        };
        if current.looped {
            // A looping item replays itself until the cluster is stopped.
            out.push_back(BusEvent::PlayItem {
                item: current.clone(),
                cont: Continuation::Advance(id),
            });
            return;
        }
        out.push_back(BusEvent::StopItem { item: current.id });
        entry.cursor += 1;
        if let Some(next) = cluster.items.get(entry.cursor) {
            out.push_back(BusEvent::PlayItem {
                item: next.clone(),
                cont: Continuation::Advance(id),
            });
        } else {
            out.push_back(BusEvent::ClusterFinished { cluster: id });
            let _ = feedback.send(Feedback::ClusterFinished(id));
        }
    }

    /// Drop the activation record and stop whatever is still sounding.
    /// At a natural finish the cursor already sits past the end, so no
    /// extra stop is published.
    fn deactivate(&mut self, id: ClusterId, bank: &CueBank, out: &mut VecDeque<BusEvent>) {
        let Some(idx) = self.active.iter().position(|a| a.cluster == id) else {
            log::debug!(target: "cluster", "deactivate: cluster {} not active", id);
            return;
        };
        let entry = self.active.remove(idx);
        if let Some(cluster) = bank.cluster(id) {
            if let Some(current) = cluster.items.get(entry.cursor) {
                out.push_back(BusEvent::StopItem { item: current.id });
            }
        }
    }
}
