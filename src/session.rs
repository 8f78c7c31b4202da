//! Trivia session
//!
//! A [`Session`] runs one game in one channel. It loads its question pool,
//! asks each question in turn and races the answer timeout against the
//! first correct response, then posts the final standings. The session is
//! the only writer of its scoreboard and question queue.

use std::{
    collections::VecDeque,
    fmt::{Debug, Display},
    ops::{Deref, DerefMut},
    sync::Arc,
};

use enum_map::{Enum, EnumMap};
use itertools::Itertools;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    chat::{Author, ChannelId, Chat, Message, Reply, TransportError},
    checker::AnswerChecker,
    config::GameOptions,
    constants::messages::{NOBODY_ANSWERED, NOBODY_SCORED, STARTING},
    loader::{self, QuestionLoader},
    question::Question,
    scoreboard::{Scoreboard, Standing, format_points},
};

/// A unique identifier for a session, used to correlate logs
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Creates a new random session ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum State {
    /// Created, not started yet
    #[default]
    Idle,
    /// The game loop is executing
    Running,
    /// The game loop has ended, normally or not
    Finished,
}

/// How a single question was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum, Serialize)]
pub enum Outcome {
    /// Someone answered correctly in time
    Answered,
    /// The answer timeout elapsed first
    TimedOut,
}

/// Result of a completed session
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Final totals, highest first
    pub standings: Vec<Standing>,
    /// How many questions ended each way
    pub outcomes: EnumMap<Outcome, usize>,
}

impl Report {
    /// Number of questions that were asked
    pub fn questions_asked(&self) -> usize {
        self.outcomes.values().sum()
    }
}

/// Errors that end a session
#[derive(Error, Debug)]
pub enum Error {
    /// `start` was called on a session that is not idle
    #[error("session already started")]
    AlreadyStarted,
    /// The question pool could not be loaded
    #[error("failed to load questions")]
    Load(#[from] loader::Error),
    /// Talking to the chat platform failed
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// The services a session is built from
#[derive(Clone)]
pub struct Collaborators {
    /// Where text goes and answers come from
    pub chat: Arc<dyn Chat>,
    /// Where the question pool comes from
    pub loader: Arc<dyn QuestionLoader>,
    /// What decides if a response is correct
    pub checker: Arc<dyn AnswerChecker>,
}

/// One trivia game scoped to a channel
pub struct Session {
    id: SessionId,
    channel: ChannelId,
    collaborators: Collaborators,
    options: GameOptions,
    scoreboard: Scoreboard,
    queue: VecDeque<Question>,
    state: State,
}

impl Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("channel", &self.channel)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Marks a session as running for as long as it lives
///
/// Dropping the guard finishes the session, whether the game loop returned,
/// failed, panicked or was cancelled.
struct Active<'a>(&'a mut Session);

impl<'a> Active<'a> {
    fn enter(session: &'a mut Session) -> Self {
        session.state = State::Running;
        Self(session)
    }
}

impl Drop for Active<'_> {
    fn drop(&mut self) {
        self.0.state = State::Finished;
        self.0.queue.clear();
    }
}

impl Deref for Active<'_> {
    type Target = Session;

    fn deref(&self) -> &Session {
        self.0
    }
}

impl DerefMut for Active<'_> {
    fn deref_mut(&mut self) -> &mut Session {
        self.0
    }
}

impl Session {
    /// Creates an idle session for `channel`
    pub fn new(
        id: SessionId,
        channel: ChannelId,
        collaborators: Collaborators,
        options: GameOptions,
    ) -> Self {
        Self {
            id,
            channel,
            collaborators,
            options,
            scoreboard: Scoreboard::default(),
            queue: VecDeque::new(),
            state: State::Idle,
        }
    }

    /// The session's identifier
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The channel the session plays in
    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    /// Current lifecycle state
    pub fn state(&self) -> State {
        self.state
    }

    /// Whether the game loop is executing
    pub fn is_active(&self) -> bool {
        self.state == State::Running
    }

    /// Scores earned so far
    pub fn scoreboard(&self) -> &Scoreboard {
        &self.scoreboard
    }

    /// Questions not asked yet
    pub fn remaining_questions(&self) -> usize {
        self.queue.len()
    }

    /// Runs the game to completion
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyStarted`] unless the session is idle,
    /// [`Error::Load`] before anything is posted if the questions cannot be
    /// loaded, and [`Error::Transport`] if the chat fails mid-game. The
    /// session is finished afterwards in every case.
    #[tracing::instrument(name = "trivia", skip(self), fields(session = %self.id, channel = %self.channel))]
    pub async fn start(&mut self) -> Result<Report, Error> {
        if self.state != State::Idle {
            return Err(Error::AlreadyStarted);
        }

        let result = Active::enter(self).play().await;

        match &result {
            Ok(report) => info!(
                asked = report.questions_asked(),
                answered = report.outcomes[Outcome::Answered],
                players = report.standings.len(),
                "session finished"
            ),
            Err(error) => warn!(%error, "session aborted"),
        }

        result
    }

    async fn play(&mut self) -> Result<Report, Error> {
        let questions = self
            .collaborators
            .loader
            .load(self.options.category.as_deref(), self.options.question_count)?;
        self.queue = questions.into();

        self.say(STARTING).await?;

        let mut outcomes: EnumMap<Outcome, usize> = EnumMap::default();
        while let Some(question) = self.queue.pop_front() {
            let outcome = self.ask(&question).await?;
            outcomes[outcome] += 1;
        }

        let standings = self.scoreboard.standings();
        if standings.is_empty() {
            self.say(NOBODY_SCORED).await?;
        } else {
            self.say(&standings.iter().join("\n")).await?;
        }

        Ok(Report {
            standings,
            outcomes,
        })
    }

    async fn ask(&mut self, question: &Question) -> Result<Outcome, Error> {
        self.say(question.content()).await?;

        let checker = &self.collaborators.checker;
        let threshold = self.options.fuzzy_threshold;
        let accepts =
            |message: &Message| checker.is_correct(&message.content, question, threshold);
        let reply = self
            .collaborators
            .chat
            .wait_for_message(self.channel, &accepts, self.options.answer_timeout)
            .await?;

        match reply {
            Reply::Answered(message) => {
                let points = question.points();
                let total = self.scoreboard.credit(&message.author, points);
                info!(author = %message.author, points, total, "question answered");
                self.say(&correct_answer(&message.author, points)).await?;
                Ok(Outcome::Answered)
            }
            Reply::TimedOut => {
                debug!(question = question.content(), "question timed out");
                self.say(NOBODY_ANSWERED).await?;
                Ok(Outcome::TimedOut)
            }
        }
    }

    async fn say(&self, text: &str) -> Result<(), TransportError> {
        self.collaborators.chat.send_text(self.channel, text).await
    }
}

/// Announcement for a correct answer, e.g. `ana got it! +10 points`
pub fn correct_answer(author: &Author, points: u64) -> String {
    format!("{author} got it! +{}", format_points(points))
}
