//! Typed messages for actor communication

use std::sync::Arc;

use ractor::{Message, RpcReplyPort};

use crate::domain::{
    event::{GroupId, InboundEvent},
    session::SessionSnapshot
};

/// Messages for Lane actors (one serial consumer per lane)
#[derive(Debug)]
pub enum LaneMessage {
    /// Hand an event to the session of `group_id`, creating the session on first sight.
    /// Fanned-out direct messages share one event between several lanes.
    Deliver { group_id: GroupId, event: Arc<InboundEvent> },
    /// Read the state of one session held by this lane
    Snapshot { group_id: GroupId, reply: RpcReplyPort<Option<SessionSnapshot>> },
    /// Lane statistics; answered only after everything queued before it was handled
    Stats { reply: RpcReplyPort<LaneStats> }
}

/// Lane information for monitoring
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaneStats {
    pub lane:           usize,
    pub sessions:       usize,
    pub events_handled: u64,
    pub uptime_seconds: u64
}

/// Router-wide information for monitoring
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterStats {
    pub groups: usize,
    pub lanes:  Vec<LaneStats>
}

impl RouterStats {
    pub fn events_handled(&self) -> u64 {
        self.lanes.iter().map(|lane| lane.events_handled).sum()
    }
}

// Implement Message trait for Ractor
impl Message for LaneMessage {}
