//! Per-guild session: the Idle → Setup → Playing state machine around one guessing round.
//!
//! A session never talks to the transport. Handling an event mutates the session and returns
//! the messages to send, which keeps every transition testable on its own. Sessions are not
//! synchronised; the lane that owns a session is the only one that ever touches it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{Level, event};

use crate::domain::{
    command::{Command, CommandSet, parse_setup},
    constant::{session, text},
    engine::{GuessEngine, Outcome},
    error::HangmanError,
    event::{ChannelId, ChannelKind, GroupId, InboundEvent, Outbound, UserId},
    stages::StageSet
};

/// The user who started the current setup or round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Initiator {
    pub id:   UserId,
    pub name: String
}

/// Session state; each phase carries only the data that exists in it
#[derive(Debug, Clone)]
pub enum SessionState {
    Idle,
    /// Waiting for the initiator to send the fail limit and phrase privately
    Setup { initiator: Initiator, channel: ChannelId },
    /// A round is running in `channel`
    Playing { initiator: Initiator, channel: ChannelId, engine: GuessEngine }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Setup,
    Playing
}

/// Read-only view of a session for monitoring and tests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub group_id:        GroupId,
    pub phase:           SessionPhase,
    pub initiator:       Option<UserId>,
    pub channel:         Option<ChannelId>,
    pub fails_remaining: Option<i64>
}

pub struct GroupSession {
    group_id: GroupId,
    state:    SessionState,
    commands: Arc<CommandSet>,
    stages:   Arc<StageSet>
}

impl GroupSession {
    pub fn new(group_id: GroupId, commands: Arc<CommandSet>, stages: Arc<StageSet>) -> Self {
        Self { group_id, state: SessionState::Idle, commands, stages }
    }

    pub fn group_id(&self) -> GroupId {
        self.group_id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> SessionPhase {
        match self.state {
            SessionState::Idle => SessionPhase::Idle,
            SessionState::Setup { .. } => SessionPhase::Setup,
            SessionState::Playing { .. } => SessionPhase::Playing
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let (initiator, channel, fails_remaining) = match &self.state {
            SessionState::Idle => (None, None, None),
            SessionState::Setup { initiator, channel } => (Some(initiator.id), Some(*channel), None),
            SessionState::Playing { initiator, channel, engine } => {
                (Some(initiator.id), Some(*channel), Some(engine.fails_remaining()))
            }
        };
        SessionSnapshot { group_id: self.group_id, phase: self.phase(), initiator, channel, fails_remaining }
    }

    /// Handle one event for this guild and return the messages it produces.
    ///
    /// The only error is a guild mismatch, which means the event was routed to the wrong
    /// session. Everything a user can get wrong is answered with a chat message instead.
    pub fn handle(&mut self, event: &InboundEvent) -> Result<Vec<Outbound>, HangmanError> {
        if should_ignore(event) {
            return Ok(Vec::new());
        }
        if let Some(actual) = event.group_id().filter(|g| *g != self.group_id) {
            return Err(HangmanError::GroupMismatch { expected: self.group_id, actual });
        }

        let mut out = Vec::new();
        if self.commands.classify(&event.text) == Some(Command::Reset) {
            self.reset(event, &mut out);
            return Ok(out);
        }

        let state = std::mem::replace(&mut self.state, SessionState::Idle);
        self.state = match state {
            SessionState::Idle => self.on_idle(event, &mut out),
            SessionState::Setup { initiator, channel } => self.on_setup(initiator, channel, event, &mut out),
            SessionState::Playing { initiator, channel, engine } => {
                self.on_playing(initiator, channel, engine, event, &mut out)
            }
        };
        Ok(out)
    }

    fn reset(&mut self, event: &InboundEvent, out: &mut Vec<Outbound>) {
        event!(Level::INFO, event = session::SESSION_RESET, group_id = %self.group_id,
               author_id = %event.author_id, phase = ?self.phase());

        if let Some(destination) = event.reply_destination() {
            out.push(Outbound { destination, text: text::RESET_ACK.to_string() });
        }
        self.state = SessionState::Idle;
    }

    fn on_idle(&self, event: &InboundEvent, out: &mut Vec<Outbound>) -> SessionState {
        let Some(channel) = event.channel_id() else {
            return SessionState::Idle;
        };
        if self.commands.classify(&event.text) != Some(Command::Start) {
            return SessionState::Idle;
        }

        let initiator = Initiator { id: event.author_id, name: display_name(event) };
        event!(Level::INFO, event = session::SETUP_STARTED, group_id = %self.group_id,
               initiator = %initiator.id, channel = %channel);

        out.push(Outbound::to_channel(
            channel,
            format!("Let's go! Send me a private message with the details, {}.", initiator.name)
        ));
        out.push(Outbound::to_user(
            initiator.id,
            format!(
                "Please respond with a single number in the range 1 to {} of allowed fails followed by a space \
                 and a word or sentence to guess.",
                self.stages.max_allowed_fails()
            )
        ));
        SessionState::Setup { initiator, channel }
    }

    fn on_setup(
        &self,
        initiator: Initiator,
        channel: ChannelId,
        event: &InboundEvent,
        out: &mut Vec<Outbound>
    ) -> SessionState {
        if !is_setup_reply(&initiator, event) {
            return SessionState::Setup { initiator, channel };
        }

        let max_allowed = self.stages.max_allowed_fails();
        let engine = parse_setup(&event.text, max_allowed)
            .map_err(|rejection| rejection.to_string())
            .and_then(|request| {
                GuessEngine::new(&request.secret, request.max_fails, max_allowed).map_err(|e| e.to_string())
            });

        match engine {
            Ok(engine) => {
                event!(Level::INFO, event = session::ROUND_STARTED, group_id = %self.group_id,
                       channel = %channel, max_fails = %engine.max_fails());

                out.push(Outbound::to_channel(channel, text::SETUP_COMPLETE));
                out.push(Outbound::to_channel(channel, self.stages.board(&engine.render())));
                SessionState::Playing { initiator, channel, engine }
            }
            Err(reason) => {
                event!(Level::DEBUG, event = session::SETUP_REJECTED, group_id = %self.group_id,
                       initiator = %initiator.id, reason = %reason);

                out.push(Outbound::to_user(initiator.id, reason));
                SessionState::Setup { initiator, channel }
            }
        }
    }

    fn on_playing(
        &self,
        initiator: Initiator,
        channel: ChannelId,
        mut engine: GuessEngine,
        event: &InboundEvent,
        out: &mut Vec<Outbound>
    ) -> SessionState {
        if !is_round_channel(channel, event) {
            return SessionState::Playing { initiator, channel, engine };
        }
        if is_initiator(&initiator, event) {
            event!(Level::DEBUG, event = session::CHEAT_BLOCKED, group_id = %self.group_id,
                   initiator = %initiator.id);

            out.push(Outbound::to_channel(channel, format!("No cheating, {}! :angry:", initiator.name)));
            return SessionState::Playing { initiator, channel, engine };
        }

        // Classify before folding: some letters upper-case to more than one character
        let guess = event.text.trim();
        let mut letters = guess.chars();
        let result = match (letters.next(), letters.next()) {
            (None, _) => return SessionState::Playing { initiator, channel, engine },
            (Some(letter), None) => engine.guess_letter(letter),
            _ => engine.guess_word(guess)
        };
        if let Err(e) = result {
            return self.fault(e);
        }

        event!(Level::DEBUG, event = session::GUESS_ACCEPTED, group_id = %self.group_id,
               author_id = %event.author_id, fails_remaining = %engine.fails_remaining());

        out.push(Outbound::to_channel(channel, format!("You guessed: {}", guess.to_uppercase())));
        out.push(Outbound::to_channel(channel, self.stages.board(&engine.render())));

        match engine.outcome() {
            Ok(Outcome::InProgress) => SessionState::Playing { initiator, channel, engine },
            Ok(outcome) => {
                event!(Level::INFO, event = session::ROUND_FINISHED, group_id = %self.group_id,
                       outcome = ?outcome, fails = %engine.fail_count());

                let announcement = match outcome {
                    Outcome::Won => text::GAME_WON.to_string(),
                    _ => format!("Game lost! The answer was: {}", engine.secret())
                };
                out.push(Outbound::to_channel(channel, announcement));
                SessionState::Idle
            }
            Err(e) => self.fault(e)
        }
    }

    /// Engine faults are internal bugs: log them and drop the round without telling players
    fn fault(&self, error: HangmanError) -> SessionState {
        event!(Level::ERROR, event = session::ENGINE_FAULT, group_id = %self.group_id, error = %error);
        SessionState::Idle
    }
}

/// Bots and channels other than guild text channels and direct messages are never handled
pub fn should_ignore(event: &InboundEvent) -> bool {
    event.is_bot || matches!(event.channel, ChannelKind::Other)
}

pub fn is_setup_reply(initiator: &Initiator, event: &InboundEvent) -> bool {
    event.is_private() && event.author_id == initiator.id
}

pub fn is_round_channel(channel: ChannelId, event: &InboundEvent) -> bool {
    event.channel_id() == Some(channel)
}

pub fn is_initiator(initiator: &Initiator, event: &InboundEvent) -> bool {
    event.author_id == initiator.id
}

fn display_name(event: &InboundEvent) -> String {
    if event.author_name.trim().is_empty() { format!("<@{}>", event.author_id) } else { event.author_name.clone() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::Destination;

    const GUILD: GroupId = GroupId(1);
    const GAME_CHANNEL: ChannelId = ChannelId(10);
    const OTHER_CHANNEL: ChannelId = ChannelId(11);
    const HOST: UserId = UserId(100);
    const PLAYER: UserId = UserId(200);

    fn new_session() -> GroupSession {
        GroupSession::new(GUILD, Arc::new(CommandSet::default()), Arc::new(StageSet::builtin().unwrap()))
    }

    fn said(user: UserId, text: &str) -> InboundEvent {
        InboundEvent::in_group(GUILD, GAME_CHANNEL, user, format!("user{}", user), text)
    }

    fn whispered(user: UserId, text: &str) -> InboundEvent {
        InboundEvent::private(user, format!("user{}", user), vec![GUILD], text)
    }

    fn texts(out: &[Outbound]) -> Vec<&str> {
        out.iter().map(|o| o.text.as_str()).collect()
    }

    fn playing(secret_setup: &str) -> GroupSession {
        let mut session = new_session();
        session.handle(&said(HOST, "!hangman-start")).unwrap();
        session.handle(&whispered(HOST, secret_setup)).unwrap();
        assert_eq!(session.phase(), SessionPhase::Playing);
        session
    }

    #[test]
    fn test_start_prompts_publicly_and_privately() {
        let mut session = new_session();
        let out = session.handle(&said(HOST, "!hangman-start")).unwrap();

        assert_eq!(session.phase(), SessionPhase::Setup);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].destination, Destination::Channel(GAME_CHANNEL));
        assert_eq!(out[0].text, "Let's go! Send me a private message with the details, user100.");
        assert_eq!(out[1].destination, Destination::User(HOST));
        assert!(out[1].text.contains("range 1 to 7"));

        let snapshot = session.snapshot();
        assert_eq!(snapshot.initiator, Some(HOST));
        assert_eq!(snapshot.channel, Some(GAME_CHANNEL));
    }

    #[test]
    fn test_idle_ignores_other_messages() {
        let mut session = new_session();
        assert!(session.handle(&said(HOST, "hello")).unwrap().is_empty());
        assert!(session.handle(&whispered(HOST, "!hangman-start")).unwrap().is_empty());
        assert_eq!(session.phase(), SessionPhase::Idle);
    }

    #[test]
    fn test_invalid_setup_stays_in_setup() {
        let mut session = new_session();
        session.handle(&said(HOST, "!hangman-start")).unwrap();

        let out = session.handle(&whispered(HOST, "0 cat")).unwrap();
        assert_eq!(session.phase(), SessionPhase::Setup);
        assert_eq!(out, vec![Outbound::to_user(
            HOST,
            "Failed to read your message. Start with a number in the range 1 to 7. "
        )]);

        session.handle(&whispered(HOST, "2 cat")).unwrap();
        assert_eq!(session.phase(), SessionPhase::Playing);
    }

    #[test]
    fn test_setup_only_accepts_initiator_in_private() {
        let mut session = new_session();
        session.handle(&said(HOST, "!hangman-start")).unwrap();

        assert!(session.handle(&whispered(PLAYER, "3 dog")).unwrap().is_empty());
        assert!(session.handle(&said(HOST, "3 dog")).unwrap().is_empty());
        assert_eq!(session.phase(), SessionPhase::Setup);
    }

    #[test]
    fn test_setup_complete_posts_board() {
        let mut session = new_session();
        session.handle(&said(HOST, "!hangman-start")).unwrap();
        let out = session.handle(&whispered(HOST, "3 Hi there")).unwrap();

        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|o| o.destination == Destination::Channel(GAME_CHANNEL)));
        assert_eq!(out[0].text, "Setup complete, game starting...");
        assert!(out[1].text.starts_with("`Status: _ _   _ _ _ _ _ `"));
        assert_eq!(session.snapshot().fails_remaining, Some(3));
    }

    #[test]
    fn test_full_round_won() {
        let mut session = playing("2 cat");

        let out = session.handle(&said(PLAYER, " c ")).unwrap();
        assert_eq!(texts(&out)[0], "You guessed: C");
        assert_eq!(session.phase(), SessionPhase::Playing);

        let out = session.handle(&said(PLAYER, "Cat")).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(texts(&out)[0], "You guessed: CAT");
        assert_eq!(texts(&out)[2], "Game won!");
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert_eq!(session.snapshot().initiator, None);
    }

    #[test]
    fn test_full_round_lost() {
        let mut session = playing("1 cat");

        session.handle(&said(PLAYER, "x")).unwrap();
        let out = session.handle(&said(PLAYER, "y")).unwrap();
        assert_eq!(texts(&out).last(), Some(&"Game lost! The answer was: CAT"));
        assert_eq!(session.phase(), SessionPhase::Idle);
    }

    #[test]
    fn test_initiator_cannot_guess() {
        let mut session = playing("3 cat");

        let out = session.handle(&said(HOST, "cat")).unwrap();
        assert_eq!(out, vec![Outbound::to_channel(GAME_CHANNEL, "No cheating, user100! :angry:")]);
        assert_eq!(session.phase(), SessionPhase::Playing);
        assert_eq!(session.snapshot().fails_remaining, Some(3));
    }

    #[test]
    fn test_playing_ignores_other_channels_and_blank_guesses() {
        let mut session = playing("3 cat");

        let elsewhere = InboundEvent::in_group(GUILD, OTHER_CHANNEL, PLAYER, "p", "x");
        assert!(session.handle(&elsewhere).unwrap().is_empty());
        assert!(session.handle(&whispered(PLAYER, "x")).unwrap().is_empty());
        assert!(session.handle(&said(PLAYER, "   ")).unwrap().is_empty());
        assert_eq!(session.snapshot().fails_remaining, Some(3));
    }

    #[test]
    fn test_reset_from_any_state() {
        let mut session = new_session();
        let out = session.handle(&said(PLAYER, "!hangman-reset")).unwrap();
        assert_eq!(out, vec![Outbound::to_channel(GAME_CHANNEL, "I've been reset!")]);

        let mut session = playing("3 cat");
        let out = session.handle(&whispered(PLAYER, "!HANGMAN-RESET")).unwrap();
        assert_eq!(out, vec![Outbound::to_user(PLAYER, "I've been reset!")]);
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert_eq!(session.snapshot(), SessionSnapshot {
            group_id:        GUILD,
            phase:           SessionPhase::Idle,
            initiator:       None,
            channel:         None,
            fails_remaining: None
        });
    }

    #[test]
    fn test_bots_and_other_channels_are_ignored() {
        let mut session = new_session();

        assert!(session.handle(&said(PLAYER, "!hangman-start").from_bot()).unwrap().is_empty());
        let voice = InboundEvent {
            author_id:   PLAYER,
            author_name: "p".to_string(),
            is_bot:      false,
            channel:     ChannelKind::Other,
            text:        "!hangman-reset".to_string()
        };
        assert!(session.handle(&voice).unwrap().is_empty());
        assert_eq!(session.phase(), SessionPhase::Idle);
    }

    #[test]
    fn test_foreign_group_is_a_contract_violation() {
        let mut session = new_session();
        let foreign = InboundEvent::in_group(GroupId(2), GAME_CHANNEL, PLAYER, "p", "!hangman-start");

        assert_eq!(
            session.handle(&foreign),
            Err(HangmanError::GroupMismatch { expected: GUILD, actual: GroupId(2) })
        );
        assert_eq!(session.phase(), SessionPhase::Idle);
    }

    #[test]
    fn test_letter_that_folds_to_two_characters_is_a_letter_guess() {
        let mut session = playing("2 cat");

        let out = session.handle(&said(PLAYER, "ß")).unwrap();
        assert_eq!(texts(&out)[0], "You guessed: SS");
        assert!(texts(&out)[1].contains("Guessed letters: [ß]"));
        assert!(texts(&out)[1].contains("Guessed words: []"));
        assert_eq!(session.snapshot().fails_remaining, Some(1));
    }

    #[test]
    fn test_engine_fault_resets_silently() {
        let mut session = new_session();
        let mut engine = GuessEngine::new("A", 1, 7).unwrap();
        engine.guess_letter('A').unwrap();
        session.state = SessionState::Playing {
            initiator: Initiator { id: HOST, name: "host".to_string() },
            channel: GAME_CHANNEL,
            engine
        };

        let out = session.handle(&said(PLAYER, "b")).unwrap();
        assert!(out.is_empty());
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert_eq!(session.snapshot().channel, None);
    }

    #[test]
    fn test_guard_predicates() {
        let initiator = Initiator { id: HOST, name: "host".to_string() };

        assert!(is_setup_reply(&initiator, &whispered(HOST, "1 a")));
        assert!(!is_setup_reply(&initiator, &said(HOST, "1 a")));
        assert!(is_round_channel(GAME_CHANNEL, &said(PLAYER, "a")));
        assert!(!is_round_channel(OTHER_CHANNEL, &said(PLAYER, "a")));
        assert!(is_initiator(&initiator, &said(HOST, "a")));
        assert!(should_ignore(&said(HOST, "a").from_bot()));
    }

    #[test]
    fn test_anonymous_author_is_mentioned_by_id() {
        let mut session = new_session();
        let out = session.handle(&InboundEvent::in_group(GUILD, GAME_CHANNEL, HOST, "", "!hangman-start")).unwrap();
        assert_eq!(out[0].text, "Let's go! Send me a private message with the details, <@100>.");
    }
}
