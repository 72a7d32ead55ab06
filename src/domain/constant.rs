//! Structured event names for tracing, and the fixed texts the bot sends

/// GroupRouter Events
pub mod router {
    pub const ROUTER_STARTED: &str = "router.started";
    pub const LANE_SPAWNED: &str = "lane.spawned";
    pub const SESSION_CREATED: &str = "session.created";
    pub const EVENT_DISPATCHED: &str = "event.dispatched";
    pub const EVENT_DROPPED: &str = "event.dropped";
    pub const ENQUEUE_FAILED: &str = "enqueue.failed";
    pub const SHUTDOWN_STARTED: &str = "shutdown.started";
    pub const LANE_JOIN_FAILED: &str = "lane.join_failed";
    pub const SHUTDOWN_COMPLETED: &str = "shutdown.completed";
}

/// Lane Actor Events
pub mod lane {
    pub const LANE_STARTED: &str = "lane.started";
    pub const LANE_STOPPED: &str = "lane.stopped";
    pub const SESSION_OPENED: &str = "session.opened";
    pub const EVENT_HANDLED: &str = "event.handled";
    pub const EVENT_REJECTED: &str = "event.rejected";
    pub const REPLY_FAILED: &str = "reply.failed";
}

/// GroupSession Events
pub mod session {
    pub const SETUP_STARTED: &str = "setup.started";
    pub const SETUP_REJECTED: &str = "setup.rejected";
    pub const ROUND_STARTED: &str = "round.started";
    pub const GUESS_ACCEPTED: &str = "guess.accepted";
    pub const CHEAT_BLOCKED: &str = "cheat.blocked";
    pub const ROUND_FINISHED: &str = "round.finished";
    pub const SESSION_RESET: &str = "session.reset";
    pub const ENGINE_FAULT: &str = "engine.fault";
}

/// Texts sent to chat
pub mod text {
    pub const RESET_ACK: &str = "I've been reset!";
    pub const SETUP_COMPLETE: &str = "Setup complete, game starting...";
    pub const GAME_WON: &str = "Game won!";
}

/// Console Transport Events
pub mod console {
    pub const OUTBOX_CLOSED: &str = "outbox.closed";
    pub const ENCODE_FAILED: &str = "encode.failed";
    pub const WRITE_FAILED: &str = "write.failed";
}

/// Binary Events
pub mod app {
    pub const STARTED: &str = "app.started";
    pub const INPUT_REJECTED: &str = "input.rejected";
    pub const INPUT_CLOSED: &str = "input.closed";
    pub const INTERRUPTED: &str = "app.interrupted";
    pub const STOPPED: &str = "app.stopped";
}
