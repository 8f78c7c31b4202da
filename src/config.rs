//! Game options and service settings
//!
//! [`GameOptions`] configures a single session; [`Settings`] configures the
//! whole service (which channels may play and where question files live).
//! Both are plain serde structures validated with `garde` after parsing.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use garde::Validate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{chat::ChannelId, constants::game::*};

/// Validates that a duration falls within bounds given in seconds
///
/// Custom validation function for `garde`; both bounds are inclusive.
///
/// # Errors
///
/// Returns a `garde::Error` if the duration is outside the bounds.
pub fn validate_duration<const MIN_SECONDS: u64, const MAX_SECONDS: u64>(
    val: &Duration,
    _ctx: &(),
) -> garde::Result {
    if (Duration::from_secs(MIN_SECONDS)..=Duration::from_secs(MAX_SECONDS)).contains(val) {
        Ok(())
    } else {
        Err(garde::Error::new(format!(
            "outside of bounds [{MIN_SECONDS},{MAX_SECONDS}]",
        )))
    }
}

/// Options for one trivia session
#[serde_with::serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct GameOptions {
    /// How long each question stays open for answers
    #[garde(custom(validate_duration::<MIN_ANSWER_TIMEOUT, MAX_ANSWER_TIMEOUT>))]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub answer_timeout: Duration,
    /// Similarity a fuzzy answer must strictly exceed
    #[garde(range(min = 0.0, max = 1.0))]
    pub fuzzy_threshold: f64,
    /// Number of questions drawn for the session
    #[garde(range(min = 1, max = MAX_QUESTION_COUNT))]
    pub question_count: usize,
    /// Question collection tag, `None` for the default collection
    #[garde(skip)]
    pub category: Option<String>,
}

impl Default for GameOptions {
    fn default() -> Self {
        Self {
            answer_timeout: Duration::from_secs(DEFAULT_ANSWER_TIMEOUT),
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            question_count: DEFAULT_QUESTION_COUNT,
            category: None,
        }
    }
}

/// Errors reading service settings
#[derive(Error, Debug)]
pub enum Error {
    /// The settings file could not be read
    #[error("failed to read settings from {}", path.display())]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },
    /// The settings are not valid JSON of the expected shape
    #[error("failed to parse settings")]
    Parse(#[from] serde_json::Error),
    /// The settings break a limit
    #[error("invalid settings: {0}")]
    Invalid(garde::Report),
}

/// Settings for the trivia service
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Settings {
    /// Channels where games may be started
    #[garde(skip)]
    pub allowed_channels: Vec<ChannelId>,
    /// Directory holding the question files
    #[garde(skip)]
    pub questions_dir: PathBuf,
    /// Options applied to every session
    #[garde(dive)]
    #[serde(default)]
    pub game: GameOptions,
}

impl Settings {
    /// Parses and validates settings from JSON text
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] or [`Error::Invalid`].
    pub fn from_json(text: &str) -> Result<Self, Error> {
        let settings: Self = serde_json::from_str(text)?;
        settings.validate().map_err(Error::Invalid)?;
        Ok(settings)
    }

    /// Reads, parses and validates a settings file
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, otherwise as
    /// [`Settings::from_json`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_json(&text)
    }
}
