//! Ordered publish/subscribe routing registry.
//!
//! The bus maps typed event channels to subscriber endpoints and nothing
//! else: it holds no domain state and performs no delivery of its own.
//! Delivery is the director's job; the bus answers "who gets this, in what
//! order". Dispatch always iterates a snapshot of the subscriber list, so
//! structural changes can never corrupt an iteration in progress.

use beltane_types::Channel;

/// Subscriber endpoints the director can deliver to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Sequencer,
    Playback,
    Haptics,
    Mixer,
}

/// Identity of one registered route, held for symmetric teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy)]
struct Route {
    id: SubscriptionId,
    channel: Channel,
    endpoint: Endpoint,
}

/// Process-scoped subscription registry, insertion-ordered.
#[derive(Debug)]
pub struct EventBus {
    routes: Vec<Route>,
    /// Next route ID to assign (never reused, always increments)
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            next_id: 1,
        }
    }

    /// Register an endpoint on a channel. A duplicate (channel, endpoint)
    /// pair is refused: double registration means double delivery, and
    /// init/teardown must stay symmetric exactly once per lifecycle.
    pub fn subscribe(&mut self, channel: Channel, endpoint: Endpoint) -> Option<SubscriptionId> {
        if self
            .routes
            .iter()
            .any(|r| r.channel == channel && r.endpoint == endpoint)
        {
            log::warn!(target: "bus", "refusing duplicate subscription: {:?} on {:?}", endpoint, channel);
            return None;
        }
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.routes.push(Route {
            id,
            channel,
            endpoint,
        });
        Some(id)
    }

    /// Remove a route by ID. Returns true if the route was found and removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        if let Some(idx) = self.routes.iter().position(|r| r.id == id) {
            self.routes.remove(idx);
            true
        } else {
            false
        }
    }

    /// Snapshot of the endpoints subscribed to a channel, in subscription
    /// order. Callers iterate this copy, never the live list.
    pub fn subscribers(&self, channel: Channel) -> Vec<Endpoint> {
        self.routes
            .iter()
            .filter(|r| r.channel == channel)
            .map(|r| r.endpoint)
            .collect()
    }

    pub fn subscriber_count(&self, channel: Channel) -> usize {
        self.routes.iter().filter(|r| r.channel == channel).count()
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
