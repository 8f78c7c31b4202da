//! Question records and the question file format
//!
//! A [`QuestionRecord`] is what a question file stores. Loading turns each
//! record into an immutable [`Question`], which additionally carries the
//! lowercase form of its answers so that checking a response never has to
//! recompute them.

use garde::Validate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::constants::question::*;

/// A question as stored in a question file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct QuestionRecord {
    /// The question or hint to be shown
    #[garde(length(chars, min = 1, max = MAX_CONTENT_LENGTH))]
    pub content: String,
    /// How many points answering correctly grants
    #[garde(skip)]
    pub points: u64,
    /// Correct answers to the question, as displayed
    #[garde(
        length(min = 1, max = MAX_ANSWER_COUNT),
        inner(length(chars, min = 1, max = MAX_ANSWER_LENGTH))
    )]
    pub answers: Vec<String>,
    /// Whether a response must match one of the answers exactly
    #[garde(skip)]
    #[serde(default)]
    pub perfect: bool,
}

/// The contents of one question file
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct QuestionSet {
    /// Every question in the file
    #[garde(dive)]
    pub questions: Vec<QuestionRecord>,
}

/// A question ready to be asked in a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    content: String,
    points: u64,
    answers: Vec<String>,
    lowercase_answers: Vec<String>,
    perfect_match_required: bool,
}

impl Question {
    /// Creates a question, deriving the lowercase answers once
    pub fn new(
        content: impl Into<String>,
        points: u64,
        answers: Vec<String>,
        perfect_match_required: bool,
    ) -> Self {
        let lowercase_answers = answers.iter().map(|a| a.to_lowercase()).collect_vec();

        Self {
            content: content.into(),
            points,
            answers,
            lowercase_answers,
            perfect_match_required,
        }
    }

    /// The text broadcast to the channel
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Points credited to the first correct responder
    pub fn points(&self) -> u64 {
        self.points
    }

    /// Accepted answers as written in the source
    pub fn answers(&self) -> &[String] {
        &self.answers
    }

    /// Accepted answers in lowercase, in the same order as [`Self::answers`]
    pub fn lowercase_answers(&self) -> &[String] {
        &self.lowercase_answers
    }

    /// Whether only an exact (case-insensitive) answer counts
    pub fn perfect_match_required(&self) -> bool {
        self.perfect_match_required
    }
}

impl From<QuestionRecord> for Question {
    fn from(record: QuestionRecord) -> Self {
        Self::new(record.content, record.points, record.answers, record.perfect)
    }
}

impl From<&QuestionRecord> for Question {
    fn from(record: &QuestionRecord) -> Self {
        record.clone().into()
    }
}
