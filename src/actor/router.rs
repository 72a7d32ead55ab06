//! GroupRouter - routes inbound events to per-guild sessions
//!
//! The router owns a fixed pool of lanes and the guild → lane registry:
//! - Every guild gets a lane on first sight, round-robin, and keeps it for good
//! - Guild messages go to that one guild; direct messages fan out to every mutual guild
//! - Registry inserts are atomic per guild, lookups of known guilds never block on other lanes

use std::{
    collections::HashSet,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering}
    },
    time::Duration
};

use dashmap::DashMap;
use ractor::{
    Actor, ActorRef, MessagingErr,
    concurrency::JoinHandle,
    rpc::{CallResult, call}
};
use tracing::{Level, event};

use crate::{
    actor::{
        lane::{Lane, LaneArgs},
        message::{LaneMessage, LaneStats, RouterStats}
    },
    config::Settings,
    domain::{
        constant::router,
        error::HangmanError,
        event::{ChannelKind, GroupId, InboundEvent},
        session::SessionSnapshot,
        stages::StageSet
    },
    port::transport::Transport
};

const RPC_TIMEOUT: Duration = Duration::from_secs(10);

/// Where a guild's session lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionHandle {
    pub group_id: GroupId,
    pub lane:     usize
}

pub struct GroupRouter {
    registry:  DashMap<GroupId, SessionHandle>,
    lanes:     Vec<ActorRef<LaneMessage>>,
    handles:   Vec<JoinHandle<()>>,
    next_lane: AtomicUsize
}

impl GroupRouter {
    /// Spawn `settings.lane_count()` lanes sharing one transport and stage set
    pub async fn spawn(
        settings: &Settings,
        transport: Arc<dyn Transport>,
        stages: StageSet
    ) -> Result<Self, HangmanError> {
        let lane_count = settings.lane_count();
        let commands = Arc::new(settings.commands());
        let stages = Arc::new(stages);

        let mut lanes = Vec::with_capacity(lane_count);
        let mut handles = Vec::with_capacity(lane_count);
        for index in 0..lane_count {
            let args =
                LaneArgs { index, transport: transport.clone(), commands: commands.clone(), stages: stages.clone() };
            match Actor::spawn(None, Lane, args).await {
                Ok((lane_ref, handle)) => {
                    event!(Level::DEBUG, event = router::LANE_SPAWNED, lane = %index);
                    lanes.push(lane_ref);
                    handles.push(handle);
                }
                Err(e) => {
                    for lane_ref in &lanes {
                        lane_ref.stop(None);
                    }
                    return Err(HangmanError::from(e));
                }
            }
        }

        event!(Level::INFO, event = router::ROUTER_STARTED, lanes = %lane_count,
               max_allowed_fails = %stages.max_allowed_fails());

        Ok(Self { registry: DashMap::new(), lanes, handles, next_lane: AtomicUsize::new(0) })
    }

    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// Number of guilds seen so far
    pub fn group_count(&self) -> usize {
        self.registry.len()
    }

    pub fn lane_of(&self, group_id: GroupId) -> Option<usize> {
        self.registry.get(&group_id).map(|handle| handle.lane)
    }

    /// Return the session handle of a guild, registering the guild on its next lane if it
    /// has never been seen. Concurrent calls for the same new guild agree on one lane.
    pub fn resolve_session(&self, group_id: GroupId) -> SessionHandle {
        if let Some(handle) = self.registry.get(&group_id) {
            return *handle;
        }

        *self.registry.entry(group_id).or_insert_with(|| {
            let lane = self.next_lane.fetch_add(1, Ordering::Relaxed) % self.lanes.len();
            event!(Level::DEBUG, event = router::SESSION_CREATED, group_id = %group_id, lane = %lane);
            SessionHandle { group_id, lane }
        })
    }

    /// Enqueue an event on the lane of every guild it targets and return how many copies were
    /// queued. Failures are logged, never returned to the transport.
    pub fn dispatch(&self, event: InboundEvent) -> usize {
        let targets = target_groups(&event);
        if targets.is_empty() {
            event!(Level::TRACE, event = router::EVENT_DROPPED, author_id = %event.author_id);
            return 0;
        }

        let event = Arc::new(event);
        let mut enqueued = 0;
        for group_id in targets {
            let handle = self.resolve_session(group_id);
            match self.lanes[handle.lane].cast(LaneMessage::Deliver { group_id, event: event.clone() }) {
                Ok(()) => enqueued += 1,
                Err(e) => {
                    event!(Level::ERROR, event = router::ENQUEUE_FAILED, group_id = %group_id,
                           lane = %handle.lane, error = %describe(&e));
                }
            }
        }

        event!(Level::TRACE, event = router::EVENT_DISPATCHED, author_id = %event.author_id, copies = %enqueued);
        enqueued
    }

    /// State of a guild's session, or `None` if the guild has not produced a session yet
    pub async fn snapshot(&self, group_id: GroupId) -> Result<Option<SessionSnapshot>, HangmanError> {
        let Some(lane) = self.lane_of(group_id) else {
            return Ok(None);
        };
        let result = call(&self.lanes[lane], |reply| LaneMessage::Snapshot { group_id, reply }, Some(RPC_TIMEOUT)).await;
        unwrap_call(result, lane)
    }

    /// Statistics of every lane. Each lane answers after the events queued before the
    /// request, so awaiting this also waits for everything dispatched so far.
    pub async fn stats(&self) -> Result<RouterStats, HangmanError> {
        let mut lanes: Vec<LaneStats> = Vec::with_capacity(self.lanes.len());
        for (index, lane_ref) in self.lanes.iter().enumerate() {
            let result = call(lane_ref, |reply| LaneMessage::Stats { reply }, Some(RPC_TIMEOUT)).await;
            lanes.push(unwrap_call(result, index)?);
        }
        Ok(RouterStats { groups: self.registry.len(), lanes })
    }

    /// Stop every lane and wait for them to exit. Events still queued are dropped; call
    /// [`GroupRouter::stats`] first to let the lanes drain.
    pub async fn shutdown(self) {
        event!(Level::DEBUG, event = router::SHUTDOWN_STARTED, lanes = %self.lanes.len());

        for lane_ref in &self.lanes {
            lane_ref.stop(None);
        }
        for handle in self.handles {
            if let Err(e) = handle.await {
                event!(Level::WARN, event = router::LANE_JOIN_FAILED, error = %e);
            }
        }

        event!(Level::INFO, event = router::SHUTDOWN_COMPLETED, groups = %self.registry.len());
    }
}

/// Guilds an event is meant for: its own guild, every mutual guild of a direct message
/// (each once), or none for other channel types
pub fn target_groups(event: &InboundEvent) -> Vec<GroupId> {
    match &event.channel {
        ChannelKind::Group { group_id, .. } => vec![*group_id],
        ChannelKind::Private { mutual_group_ids } => {
            let mut seen = HashSet::with_capacity(mutual_group_ids.len());
            mutual_group_ids.iter().copied().filter(|group_id| seen.insert(*group_id)).collect()
        }
        ChannelKind::Other => Vec::new()
    }
}

fn unwrap_call<T>(result: Result<CallResult<T>, MessagingErr<LaneMessage>>, lane: usize) -> Result<T, HangmanError> {
    match result {
        Ok(CallResult::Success(value)) => Ok(value),
        Ok(CallResult::Timeout) => Err(HangmanError::Dispatch(format!("lane {} did not answer in time", lane))),
        Ok(CallResult::SenderError) => Err(HangmanError::Dispatch(format!("lane {} dropped the reply", lane))),
        Err(e) => Err(HangmanError::Dispatch(format!("lane {} is unreachable: {}", lane, describe(&e))))
    }
}

fn describe(error: &MessagingErr<LaneMessage>) -> String {
    match error {
        MessagingErr::SendErr(_) => "mailbox closed".to_string(),
        other => other.to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Condvar, Mutex, atomic::AtomicBool};

    use super::*;
    use crate::{
        adapter::memory::InMemoryTransport,
        domain::{
            event::{ChannelId, UserId},
            session::SessionPhase
        }
    };

    /// Records like `InMemoryTransport`, but holds the calling lane inside sends to one channel
    /// until the gate is opened
    struct GatedTransport {
        inner:  InMemoryTransport,
        gated:  ChannelId,
        open:   Mutex<bool>,
        opened: Condvar,
        parked: AtomicBool
    }

    impl GatedTransport {
        fn new(gated: ChannelId) -> Self {
            Self {
                inner: InMemoryTransport::new(),
                gated,
                open: Mutex::new(false),
                opened: Condvar::new(),
                parked: AtomicBool::new(false)
            }
        }

        fn release(&self) {
            *self.open.lock().unwrap() = true;
            self.opened.notify_all();
        }
    }

    impl Transport for GatedTransport {
        fn send_to_channel(&self, channel_id: ChannelId, text: &str) {
            if channel_id == self.gated {
                self.parked.store(true, Ordering::SeqCst);
                let open = self.open.lock().unwrap();
                let _open = self.opened.wait_timeout_while(open, Duration::from_secs(10), |open| !*open).unwrap();
            }
            self.inner.send_to_channel(channel_id, text);
        }

        fn send_private_to_user(&self, user_id: UserId, text: &str) {
            self.inner.send_private_to_user(user_id, text);
        }
    }

    const HOST: UserId = UserId(1);
    const PLAYER: UserId = UserId(2);

    async fn router_with(lanes: usize) -> (GroupRouter, Arc<InMemoryTransport>) {
        let transport = Arc::new(InMemoryTransport::new());
        let settings = Settings { lanes: Some(lanes), ..Settings::default() };
        let router = GroupRouter::spawn(&settings, transport.clone(), StageSet::builtin().unwrap()).await.unwrap();
        (router, transport)
    }

    fn channel_of(group_id: GroupId) -> ChannelId {
        ChannelId(group_id.0 * 100)
    }

    fn said(group_id: GroupId, user: UserId, text: &str) -> InboundEvent {
        InboundEvent::in_group(group_id, channel_of(group_id), user, format!("user{}", user), text)
    }

    fn start_round(router: &GroupRouter, group_id: GroupId, setup: &str) {
        assert_eq!(router.dispatch(said(group_id, HOST, "!hangman-start")), 1);
        assert_eq!(router.dispatch(InboundEvent::private(HOST, "user1", vec![group_id], setup)), 1);
    }

    #[tokio::test]
    async fn test_lanes_assigned_round_robin() {
        let (router, _transport) = router_with(2).await;
        assert_eq!(router.lane_count(), 2);

        let lanes: Vec<usize> = (1..=4).map(|g| router.resolve_session(GroupId(g)).lane).collect();
        assert_eq!(lanes, vec![0, 1, 0, 1]);
        assert_eq!(router.resolve_session(GroupId(2)).lane, 1);
        assert_eq!(router.lane_of(GroupId(3)), Some(0));
        assert_eq!(router.lane_of(GroupId(99)), None);
        assert_eq!(router.group_count(), 4);

        router.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_resolution_creates_one_session() {
        let (router, _transport) = router_with(3).await;
        let router = Arc::new(router);

        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let router = router.clone();
                tokio::spawn(async move { router.resolve_session(GroupId(7)) })
            })
            .collect();

        let mut handles = Vec::new();
        for task in tasks {
            handles.push(task.await.unwrap());
        }
        assert!(handles.iter().all(|h| *h == handles[0]));
        assert_eq!(router.group_count(), 1);
        assert_eq!(router.resolve_session(GroupId(8)).lane, 1);
    }

    #[tokio::test]
    async fn test_full_round_through_router() {
        let (router, transport) = router_with(2).await;
        let guild = GroupId(1);

        start_round(&router, guild, "2 cat");
        router.dispatch(said(guild, PLAYER, "c"));
        router.dispatch(said(guild, PLAYER, "a"));
        router.dispatch(said(guild, PLAYER, "t"));
        router.stats().await.unwrap();

        let texts = transport.channel_texts(channel_of(guild));
        assert_eq!(texts[0], "Let's go! Send me a private message with the details, user1.");
        assert_eq!(texts[1], "Setup complete, game starting...");
        assert_eq!(texts.last().map(String::as_str), Some("Game won!"));
        assert_eq!(transport.user_texts(HOST).len(), 1);

        let snapshot = router.snapshot(guild).await.unwrap().unwrap();
        assert_eq!(snapshot.phase, SessionPhase::Idle);

        router.shutdown().await;
    }

    #[tokio::test]
    async fn test_private_message_fans_out_to_mutual_groups() {
        let (router, transport) = router_with(2).await;
        let guilds = vec![GroupId(1), GroupId(2), GroupId(3), GroupId(2)];

        let copies = router.dispatch(InboundEvent::private(PLAYER, "p", guilds, "!hangman-reset"));
        assert_eq!(copies, 3);

        let stats = router.stats().await.unwrap();
        assert_eq!(stats.groups, 3);
        assert_eq!(stats.events_handled(), 3);
        assert_eq!(stats.lanes.iter().map(|l| l.sessions).sum::<usize>(), 3);
        assert_eq!(transport.user_texts(PLAYER), vec!["I've been reset!".to_string(); 3]);

        router.shutdown().await;
    }

    #[tokio::test]
    async fn test_setup_reply_reaches_only_the_waiting_guild() {
        let (router, transport) = router_with(2).await;

        router.dispatch(said(GroupId(1), HOST, "!hangman-start"));
        router.dispatch(InboundEvent::private(HOST, "user1", vec![GroupId(1), GroupId(2)], "3 fan out"));
        router.stats().await.unwrap();

        assert_eq!(router.snapshot(GroupId(1)).await.unwrap().unwrap().phase, SessionPhase::Playing);
        assert_eq!(router.snapshot(GroupId(2)).await.unwrap().unwrap().phase, SessionPhase::Idle);
        assert!(transport.channel_texts(channel_of(GroupId(2))).is_empty());

        router.shutdown().await;
    }

    #[tokio::test]
    async fn test_other_channels_are_not_routed() {
        let (router, _transport) = router_with(1).await;
        let voice = InboundEvent {
            author_id:   PLAYER,
            author_name: "p".to_string(),
            is_bot:      false,
            channel:     ChannelKind::Other,
            text:        "!hangman-start".to_string()
        };

        assert_eq!(router.dispatch(voice), 0);
        assert_eq!(router.dispatch(InboundEvent::private(PLAYER, "p", vec![], "hi")), 0);
        assert_eq!(router.group_count(), 0);
        assert_eq!(router.snapshot(GroupId(1)).await.unwrap(), None);

        router.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_events_of_a_group_keep_dispatch_order() {
        let (router, transport) = router_with(2).await;
        let router = Arc::new(router);
        let guilds: Vec<GroupId> = (1..=4).map(GroupId).collect();
        let guesses: Vec<char> = "ZYXWVUTSRQ".chars().collect();

        for guild in &guilds {
            start_round(&router, *guild, "7 abcdefghijklmnop");
        }

        let producers: Vec<_> = guilds
            .iter()
            .map(|guild| {
                let router = router.clone();
                let guesses = guesses.clone();
                let guild = *guild;
                tokio::spawn(async move {
                    for guess in guesses {
                        router.dispatch(said(guild, PLAYER, &guess.to_string()));
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.await.unwrap();
        }
        router.stats().await.unwrap();

        for guild in &guilds {
            let seen: Vec<String> = transport
                .channel_texts(channel_of(*guild))
                .into_iter()
                .filter_map(|text| text.strip_prefix("You guessed: ").map(str::to_string))
                .collect();
            let expected: Vec<String> = guesses.iter().take(8).map(char::to_string).collect();
            assert_eq!(seen, expected);
            assert!(transport.channel_texts(channel_of(*guild)).iter().any(|t| t.starts_with("Game lost!")));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_busy_guild_does_not_hold_up_other_lane() {
        let (busy, free) = (GroupId(1), GroupId(2));
        let transport = Arc::new(GatedTransport::new(channel_of(busy)));
        let settings = Settings { lanes: Some(2), ..Settings::default() };
        let router = GroupRouter::spawn(&settings, transport.clone(), StageSet::builtin().unwrap()).await.unwrap();
        assert_ne!(router.resolve_session(busy).lane, router.resolve_session(free).lane);

        router.dispatch(said(busy, HOST, "!hangman-start"));
        tokio::time::timeout(Duration::from_secs(5), async {
            while !transport.parked.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        start_round(&router, free, "1 ox");
        router.dispatch(said(free, PLAYER, "ox"));
        let snapshot = router.snapshot(free).await.unwrap().unwrap();

        assert_eq!(snapshot.phase, SessionPhase::Idle);
        assert_eq!(transport.inner.channel_texts(channel_of(free)).last().map(String::as_str), Some("Game won!"));
        assert!(transport.inner.channel_texts(channel_of(busy)).is_empty());

        transport.release();
        router.stats().await.unwrap();
        assert_eq!(transport.inner.channel_texts(channel_of(busy)).len(), 1);
        assert_eq!(router.snapshot(busy).await.unwrap().unwrap().phase, SessionPhase::Setup);

        router.shutdown().await;
    }
}
