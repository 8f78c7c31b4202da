//! Question pool loading
//!
//! A loader resolves a question collection by category tag and draws the
//! pool for one session from it. Drawing is distinct-then-repeat: as many
//! distinct questions as the collection allows come first, and only when
//! more questions are requested than exist are further ones drawn with
//! repetition.

use std::{
    collections::HashMap,
    io,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use fastrand::Rng;
use garde::Validate;
use itertools::Itertools;
use thiserror::Error;
use tracing::debug;

use crate::{
    constants::files::{EXTENSION, STEM},
    question::{Question, QuestionRecord, QuestionSet},
};

/// Name used in errors and logs for the collection without a tag
const DEFAULT_CATEGORY_NAME: &str = "default";

/// Configuration errors raised while resolving a question collection
#[derive(Error, Debug)]
pub enum Error {
    /// The category tag cannot name a collection
    #[error("invalid question category {0:?}")]
    InvalidCategory(String),
    /// No collection exists for the category
    #[error("question set {0:?} not found")]
    NotFound(String),
    /// The collection exists but could not be read
    #[error("failed to read {}", path.display())]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: io::Error,
    },
    /// The collection is not valid JSON of the expected shape
    #[error("failed to parse {}", path.display())]
    Parse {
        /// File that failed
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: serde_json::Error,
    },
    /// Some record in the collection breaks the question limits
    #[error("invalid question set {category:?}: {report}")]
    Invalid {
        /// Category of the collection
        category: String,
        /// Every violation found
        report: garde::Report,
    },
    /// The collection has no questions to draw from
    #[error("question set {0:?} is empty")]
    Empty(String),
    /// Zero questions were requested
    #[error("at least one question must be requested")]
    ZeroCount,
}

/// Source of question pools for sessions
pub trait QuestionLoader: Send + Sync {
    /// Draws exactly `count` questions from the collection tagged `category`
    ///
    /// `None` or an empty tag selects the default collection.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] if the collection cannot be found, read,
    /// parsed or validated, if it is empty, or if `count` is zero.
    fn load(&self, category: Option<&str>, count: usize) -> Result<Vec<Question>, Error>;
}

/// Draws `count` indices into a collection of `len` items
///
/// The first `min(len, count)` indices are distinct; the rest are drawn with
/// repetition from the whole range. Nothing can be drawn from an empty
/// collection, so `len == 0` yields no indices.
pub fn sample_indices(rng: &mut Rng, len: usize, count: usize) -> Vec<usize> {
    if len == 0 {
        return Vec::new();
    }

    let distinct = len.min(count);
    let mut indices = (0..len).collect_vec();
    for i in 0..distinct {
        let j = rng.usize(i..len);
        indices.swap(i, j);
    }
    indices.truncate(distinct);

    indices.extend((distinct..count).map(|_| rng.usize(0..len)));
    indices
}

fn category_name(category: Option<&str>) -> &str {
    match category {
        Some(tag) if !tag.is_empty() => tag,
        _ => DEFAULT_CATEGORY_NAME,
    }
}

fn draw(
    rng: &Mutex<Rng>,
    records: &[QuestionRecord],
    category: &str,
    count: usize,
) -> Result<Vec<Question>, Error> {
    if count == 0 {
        return Err(Error::ZeroCount);
    }
    if records.is_empty() {
        return Err(Error::Empty(category.to_owned()));
    }

    let indices = {
        let mut rng = rng.lock().unwrap_or_else(PoisonError::into_inner);
        sample_indices(&mut rng, records.len(), count)
    };

    debug!(
        category,
        available = records.len(),
        count,
        "drew question pool"
    );

    Ok(indices
        .into_iter()
        .map(|index| Question::from(&records[index]))
        .collect_vec())
}

/// Loads question files from a directory
///
/// The default collection lives in `questions.json`; a collection tagged
/// `tag` lives in `questions.<tag>.json`. Files are read on every load.
#[derive(Debug)]
pub struct JsonDirectoryLoader {
    dir: PathBuf,
    rng: Mutex<Rng>,
}

impl JsonDirectoryLoader {
    /// Creates a loader reading from `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            rng: Mutex::new(Rng::new()),
        }
    }

    /// Makes draws reproducible
    #[must_use]
    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(Rng::with_seed(seed)),
            ..self
        }
    }

    /// Directory the question files are read from
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding the collection tagged `category`
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCategory`] unless the tag only contains
    /// ASCII letters, digits, `-` and `_`.
    pub fn path_for(&self, category: Option<&str>) -> Result<PathBuf, Error> {
        let file_name = match category {
            None | Some("") => format!("{STEM}.{EXTENSION}"),
            Some(tag)
                if tag
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') =>
            {
                format!("{STEM}.{tag}.{EXTENSION}")
            }
            Some(tag) => return Err(Error::InvalidCategory(tag.to_owned())),
        };

        Ok(self.dir.join(file_name))
    }

    fn read_set(&self, category: Option<&str>) -> Result<QuestionSet, Error> {
        let path = self.path_for(category)?;
        let name = category_name(category);

        let text = std::fs::read_to_string(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                Error::NotFound(name.to_owned())
            } else {
                Error::Io {
                    path: path.clone(),
                    source,
                }
            }
        })?;

        let set: QuestionSet =
            serde_json::from_str(&text).map_err(|source| Error::Parse { path, source })?;

        set.validate().map_err(|report| Error::Invalid {
            category: name.to_owned(),
            report,
        })?;

        Ok(set)
    }
}

impl QuestionLoader for JsonDirectoryLoader {
    fn load(&self, category: Option<&str>, count: usize) -> Result<Vec<Question>, Error> {
        let set = self.read_set(category)?;
        draw(&self.rng, &set.questions, category_name(category), count)
    }
}

/// Keeps question collections in memory
#[derive(Debug)]
pub struct InMemoryLoader {
    sets: HashMap<String, QuestionSet>,
    rng: Mutex<Rng>,
}

impl Default for InMemoryLoader {
    fn default() -> Self {
        Self {
            sets: HashMap::new(),
            rng: Mutex::new(Rng::new()),
        }
    }
}

impl InMemoryLoader {
    /// Creates a loader without any collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the collection tagged `category`; an empty tag is the default
    #[must_use]
    pub fn with_set(mut self, category: impl Into<String>, questions: Vec<QuestionRecord>) -> Self {
        self.sets.insert(category.into(), QuestionSet { questions });
        self
    }

    /// Makes draws reproducible
    #[must_use]
    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(Rng::with_seed(seed)),
            ..self
        }
    }
}

impl QuestionLoader for InMemoryLoader {
    fn load(&self, category: Option<&str>, count: usize) -> Result<Vec<Question>, Error> {
        let name = category_name(category);
        let set = self
            .sets
            .get(category.unwrap_or_default())
            .ok_or_else(|| Error::NotFound(name.to_owned()))?;

        set.validate().map_err(|report| Error::Invalid {
            category: name.to_owned(),
            report,
        })?;

        draw(&self.rng, &set.questions, name, count)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn record(content: &str) -> QuestionRecord {
        QuestionRecord {
            content: content.to_string(),
            points: 1,
            answers: vec![content.to_lowercase()],
            perfect: false,
        }
    }

    fn records(count: usize) -> Vec<QuestionRecord> {
        (0..count).map(|i| record(&format!("Q{i}"))).collect()
    }

    fn write_set(dir: &Path, file_name: &str, contents: &str) {
        std::fs::write(dir.join(file_name), contents).unwrap();
    }

    #[test]
    fn test_sample_distinct_when_enough_items() {
        let mut rng = Rng::with_seed(1);
        for count in 1..=10 {
            let indices = sample_indices(&mut rng, 10, count);
            assert_eq!(indices.len(), count);
            assert_eq!(indices.iter().unique().count(), count);
            assert!(indices.iter().all(|i| *i < 10));
        }
    }

    #[test]
    fn test_sample_distinct_then_repeat() {
        let mut rng = Rng::with_seed(2);
        for _ in 0..50 {
            let indices = sample_indices(&mut rng, 3, 8);

            // Shuffle-and-take would stop at three items
            assert_eq!(indices.len(), 8);
            let head: HashSet<_> = indices[..3].iter().copied().collect();
            assert_eq!(head, HashSet::from([0, 1, 2]));
            assert!(indices[3..].iter().all(|i| *i < 3));
        }
    }

    #[test]
    fn test_sample_repeats_only_after_distinct_prefix() {
        let mut rng = Rng::with_seed(3);
        let indices = sample_indices(&mut rng, 1, 4);
        assert_eq!(indices, [0, 0, 0, 0]);
    }

    #[test]
    fn test_sample_from_empty_collection() {
        let mut rng = Rng::with_seed(4);
        assert!(sample_indices(&mut rng, 0, 3).is_empty());
    }

    #[test]
    fn test_sample_is_reproducible_with_seed() {
        let first = sample_indices(&mut Rng::with_seed(42), 20, 25);
        let second = sample_indices(&mut Rng::with_seed(42), 20, 25);
        assert_eq!(first, second);
    }

    #[test]
    fn test_in_memory_default_set() {
        let loader = InMemoryLoader::new().with_set("", records(5)).with_seed(9);

        let questions = loader.load(None, 5).unwrap();
        let contents: HashSet<_> = questions.iter().map(Question::content).collect();
        assert_eq!(contents.len(), 5);

        assert_eq!(loader.load(Some(""), 2).unwrap().len(), 2);
    }

    #[test]
    fn test_in_memory_more_than_available() {
        let loader = InMemoryLoader::new().with_set("es", records(2));

        let questions = loader.load(Some("es"), 5).unwrap();
        assert_eq!(questions.len(), 5);
        assert_ne!(questions[0], questions[1]);
    }

    #[test]
    fn test_in_memory_unknown_category() {
        let loader = InMemoryLoader::new().with_set("", records(2));
        assert!(matches!(
            loader.load(Some("fr"), 1),
            Err(Error::NotFound(name)) if name == "fr"
        ));
    }

    #[test]
    fn test_in_memory_empty_set_and_zero_count() {
        let loader = InMemoryLoader::new().with_set("", Vec::new());
        assert!(matches!(loader.load(None, 1), Err(Error::Empty(_))));

        let loader = InMemoryLoader::new().with_set("", records(1));
        assert!(matches!(loader.load(None, 0), Err(Error::ZeroCount)));
    }

    #[test]
    fn test_path_for_categories() {
        let loader = JsonDirectoryLoader::new("/data");

        assert_eq!(
            loader.path_for(None).unwrap(),
            PathBuf::from("/data/questions.json")
        );
        assert_eq!(
            loader.path_for(Some("")).unwrap(),
            PathBuf::from("/data/questions.json")
        );
        assert_eq!(
            loader.path_for(Some("es")).unwrap(),
            PathBuf::from("/data/questions.es.json")
        );
        assert!(matches!(
            loader.path_for(Some("../secrets")),
            Err(Error::InvalidCategory(_))
        ));
    }

    #[test]
    fn test_json_loader_reads_default_and_tagged_files() {
        let dir = tempfile::tempdir().unwrap();
        write_set(
            dir.path(),
            "questions.json",
            r#"{"questions": [{"content": "2 + 2?", "points": 1, "answers": ["4", "four"]}]}"#,
        );
        write_set(
            dir.path(),
            "questions.es.json",
            r#"{"questions": [{"content": "¿Capital de Francia?", "points": 3, "answers": ["París"], "perfect": true}]}"#,
        );
        let loader = JsonDirectoryLoader::new(dir.path());

        let default = loader.load(None, 1).unwrap();
        assert_eq!(default[0].content(), "2 + 2?");
        assert_eq!(default[0].lowercase_answers(), ["4", "four"]);

        let spanish = loader.load(Some("es"), 3).unwrap();
        assert_eq!(spanish.len(), 3);
        assert!(spanish.iter().all(|q| q.points() == 3 && q.perfect_match_required()));
    }

    #[test]
    fn test_json_loader_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let loader = JsonDirectoryLoader::new(dir.path());

        assert!(matches!(loader.load(None, 1), Err(Error::NotFound(name)) if name == "default"));
    }

    #[test]
    fn test_json_loader_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        write_set(dir.path(), "questions.json", "{\"questions\": [");
        let loader = JsonDirectoryLoader::new(dir.path());

        assert!(matches!(loader.load(None, 1), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_json_loader_invalid_record() {
        let dir = tempfile::tempdir().unwrap();
        write_set(
            dir.path(),
            "questions.json",
            r#"{"questions": [{"content": "No answers", "points": 1, "answers": []}]}"#,
        );
        let loader = JsonDirectoryLoader::new(dir.path());

        assert!(matches!(loader.load(None, 1), Err(Error::Invalid { .. })));
    }

    #[test]
    fn test_json_loader_seeded_draws_repeat() {
        let dir = tempfile::tempdir().unwrap();
        let set = QuestionSet {
            questions: records(10),
        };
        write_set(
            dir.path(),
            "questions.json",
            &serde_json::to_string(&set).unwrap(),
        );

        let first = JsonDirectoryLoader::new(dir.path()).with_seed(5);
        let second = JsonDirectoryLoader::new(dir.path()).with_seed(5);
        assert_eq!(first.load(None, 6).unwrap(), second.load(None, 6).unwrap());
    }
}
