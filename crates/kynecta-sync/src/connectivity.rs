//! Connectivity state machine.
//!
//! Two states, driven by platform-level online/offline notifications.
//! Each Offline -> Online edge yields exactly one [`LinkTransition::WentOnline`],
//! which is what triggers an outbox drain; repeated observations of the same
//! state yield nothing.  Rapid flapping produces one transition per edge,
//! and the drain guard in the coordinator makes overlapping triggers safe.

/// Whether the device currently has a network path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Online,
    Offline,
}

/// An observed edge between the two link states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkTransition {
    /// Offline -> Online: trigger one drain attempt.
    WentOnline,
    /// Online -> Offline: update UI affordances only.
    WentOffline,
}

/// Tracks the current link state and detects edges.
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    state: LinkState,
}

impl ConnectivityMonitor {
    pub fn new(initial: LinkState) -> Self {
        Self { state: initial }
    }

    /// Current link state.
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Feed a platform connectivity notification into the machine.
    /// Returns the transition this observation caused, if any.
    pub fn observe(&mut self, online: bool) -> Option<LinkTransition> {
        let next = if online {
            LinkState::Online
        } else {
            LinkState::Offline
        };

        if next == self.state {
            return None;
        }

        self.state = next;
        match next {
            LinkState::Online => Some(LinkTransition::WentOnline),
            LinkState::Offline => Some(LinkTransition::WentOffline),
        }
    }
}

impl Default for ConnectivityMonitor {
    /// Starts online; the embedder feeds the real platform signal promptly
    /// after construction.
    fn default() -> Self {
        Self::new(LinkState::Online)
    }
}
