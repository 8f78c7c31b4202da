//! Configuration constants for the trivia game
//!
//! This module contains the limits and defaults used throughout the crate
//! to validate question files and game options and to provide consistent
//! boundaries for a game session.

/// Question record constants
pub mod question {
    /// Maximum length of a question's display text in characters
    pub const MAX_CONTENT_LENGTH: usize = 500;
    /// Maximum number of accepted answers for a single question
    pub const MAX_ANSWER_COUNT: usize = 16;
    /// Maximum length of a single accepted answer in characters
    pub const MAX_ANSWER_LENGTH: usize = 200;
}

/// Game session constants
pub mod game {
    /// Minimum time in seconds a question stays open for answers
    pub const MIN_ANSWER_TIMEOUT: u64 = 1;
    /// Maximum time in seconds a question stays open for answers
    pub const MAX_ANSWER_TIMEOUT: u64 = 300;
    /// Default time in seconds a question stays open for answers
    pub const DEFAULT_ANSWER_TIMEOUT: u64 = 15;
    /// Default similarity a fuzzy answer must strictly exceed
    pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.8;
    /// Default number of questions drawn for one session
    pub const DEFAULT_QUESTION_COUNT: usize = 2;
    /// Maximum number of questions drawn for one session
    pub const MAX_QUESTION_COUNT: usize = 100;
}

/// Question file naming
pub mod files {
    /// Stem shared by every question file
    pub const STEM: &str = "questions";
    /// Extension shared by every question file
    pub const EXTENSION: &str = "json";
}

/// Text posted to the channel during a session
pub mod messages {
    /// Posted once the questions are loaded
    pub const STARTING: &str = "Starting trivia!";
    /// Posted when a question times out
    pub const NOBODY_ANSWERED: &str = "Nobody answered.";
    /// Posted instead of standings when no one scored
    pub const NOBODY_SCORED: &str = "Nobody scored.";
}
