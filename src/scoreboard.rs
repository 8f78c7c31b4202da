//! Session scoring
//!
//! This module tracks the points each participant earns during a session
//! and produces the final standings. Participants are keyed by their stable
//! author id and only appear once they score.

use std::{cmp::Reverse, collections::HashMap, fmt::Display};

use itertools::Itertools;
use serde::Serialize;

use crate::chat::Author;

/// A participant's total at the end of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Standing {
    /// The participant
    pub author: Author,
    /// Total points earned
    pub points: u64,
}

impl Display for Standing {
    /// Formats the standing as `name: N points`
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.author, format_points(self.points))
    }
}

/// Formats a point count with the right plural, e.g. `1 point`, `10 points`
pub fn format_points(points: u64) -> String {
    pluralizer::pluralize("point", isize::try_from(points).unwrap_or(isize::MAX), true)
}

/// Points earned by each participant of a session
#[derive(Debug, Clone, Default)]
pub struct Scoreboard {
    /// Totals in the order participants first scored
    entries: Vec<Standing>,
    /// Author id to index into `entries`
    positions: HashMap<u64, usize>,
}

impl Scoreboard {
    /// Adds `points` to `author`'s total, creating the entry at zero first
    ///
    /// # Returns
    ///
    /// The author's new total
    pub fn credit(&mut self, author: &Author, points: u64) -> u64 {
        let index = *self.positions.entry(author.id).or_insert_with(|| {
            self.entries.push(Standing {
                author: author.clone(),
                points: 0,
            });
            self.entries.len() - 1
        });

        let entry = &mut self.entries[index];
        entry.points = entry.points.saturating_add(points);
        entry.points
    }

    /// Current total of the participant with this author id
    pub fn points(&self, author_id: u64) -> Option<u64> {
        self.positions
            .get(&author_id)
            .map(|index| self.entries[*index].points)
    }

    /// Number of participants who scored
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nobody has scored yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Totals sorted by points descending
    ///
    /// Participants with equal totals keep the order in which they first
    /// scored.
    pub fn standings(&self) -> Vec<Standing> {
        self.entries
            .iter()
            .cloned()
            .sorted_by_key(|standing| Reverse(standing.points))
            .collect_vec()
    }
}
