//! Lane Actor - one serial work queue
//!
//! A lane owns the sessions of every guild assigned to it and handles their events one at a
//! time, in mailbox order. That is what keeps a guild's session free of races without any
//! locking: only its lane ever touches it.

use std::{collections::HashMap, sync::Arc, time::SystemTime};

use ractor::{Actor, ActorProcessingErr, ActorRef};
use tracing::{Level, event};

use crate::{
    actor::message::{LaneMessage, LaneStats},
    domain::{
        command::CommandSet,
        constant::lane,
        event::{GroupId, InboundEvent},
        session::GroupSession,
        stages::StageSet
    },
    port::transport::Transport
};

/// Everything a lane needs to build and serve sessions
#[derive(Clone)]
pub struct LaneArgs {
    pub index:     usize,
    pub transport: Arc<dyn Transport>,
    pub commands:  Arc<CommandSet>,
    pub stages:    Arc<StageSet>
}

/// Lane Actor State - the sessions of this lane's guilds
pub struct LaneState {
    index:          usize,
    sessions:       HashMap<GroupId, GroupSession>,
    transport:      Arc<dyn Transport>,
    commands:       Arc<CommandSet>,
    stages:         Arc<StageSet>,
    events_handled: u64,
    startup_time:   SystemTime
}

pub struct Lane;

#[async_trait::async_trait]
impl Actor for Lane {
    type Arguments = LaneArgs;
    type Msg = LaneMessage;
    type State = LaneState;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments
    ) -> Result<Self::State, ActorProcessingErr> {
        event!(Level::DEBUG, event = lane::LANE_STARTED, lane = %args.index);

        Ok(LaneState {
            index:          args.index,
            sessions:       HashMap::new(),
            transport:      args.transport,
            commands:       args.commands,
            stages:         args.stages,
            events_handled: 0,
            startup_time:   SystemTime::now()
        })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State
    ) -> Result<(), ActorProcessingErr> {
        match message {
            LaneMessage::Deliver { group_id, event } => self.handle_deliver(group_id, &event, state),
            LaneMessage::Snapshot { group_id, reply } => {
                let snapshot = state.sessions.get(&group_id).map(GroupSession::snapshot);
                if let Err(e) = reply.send(snapshot) {
                    event!(Level::ERROR, event = lane::REPLY_FAILED, lane = %state.index, error = %e);
                }
            }
            LaneMessage::Stats { reply } => {
                let stats = LaneStats {
                    lane:           state.index,
                    sessions:       state.sessions.len(),
                    events_handled: state.events_handled,
                    uptime_seconds: state.startup_time.elapsed().unwrap_or_default().as_secs()
                };
                if let Err(e) = reply.send(stats) {
                    event!(Level::ERROR, event = lane::REPLY_FAILED, lane = %state.index, error = %e);
                }
            }
        }
        // Errors never stop the lane: other guilds share it
        Ok(())
    }

    async fn post_stop(&self, _myself: ActorRef<Self::Msg>, state: &mut Self::State) -> Result<(), ActorProcessingErr> {
        event!(Level::DEBUG, event = lane::LANE_STOPPED, lane = %state.index,
               sessions = %state.sessions.len(), events_handled = %state.events_handled);
        Ok(())
    }
}

impl Lane {
    fn handle_deliver(&self, group_id: GroupId, inbound: &InboundEvent, state: &mut LaneState) {
        let session = state.sessions.entry(group_id).or_insert_with(|| {
            event!(Level::DEBUG, event = lane::SESSION_OPENED, lane = %state.index, group_id = %group_id);
            GroupSession::new(group_id, state.commands.clone(), state.stages.clone())
        });
        state.events_handled += 1;

        match session.handle(inbound) {
            Ok(outbound) => {
                event!(Level::TRACE, event = lane::EVENT_HANDLED, lane = %state.index,
                       group_id = %group_id, replies = %outbound.len());
                for message in &outbound {
                    state.transport.deliver(message);
                }
            }
            Err(e) => {
                event!(Level::ERROR, event = lane::EVENT_REJECTED, lane = %state.index,
                       group_id = %group_id, error = %e);
            }
        }
    }
}
