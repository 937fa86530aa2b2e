//! Idea snapshots and their scoring helpers.
//!
//! Ideas are the sub-entities of a board. Each carries three 1-10 scores
//! (ease, confidence, impact); ranking by those scores is display logic,
//! so the helpers here are plain functions with no engine involvement.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::identifiers::{BoardId, IdeaId};

/// An immutable snapshot of an idea.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Idea {
    /// Stable identity assigned by the remote store on creation.
    pub id: IdeaId,
    /// The board this idea belongs to.
    pub board_id: BoardId,
    /// Short title.
    pub name: String,
    /// Optional longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// How easy the idea is to execute, 1-10.
    pub ease: u8,
    /// How confident the author is, 1-10.
    pub confidence: u8,
    /// Expected impact, 1-10.
    pub impact: u8,
}

impl Idea {
    /// Mean of the three scores.
    pub fn average(&self) -> f32 {
        (f32::from(self.ease) + f32::from(self.confidence) + f32::from(self.impact)) / 3.0
    }
}

/// Which score a list of ideas is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdeaSort {
    /// Mean of the three scores (the default view).
    #[default]
    Average,
    /// Ease score only.
    Ease,
    /// Confidence score only.
    Confidence,
    /// Impact score only.
    Impact,
}

impl IdeaSort {
    fn value(self, idea: &Idea) -> f32 {
        match self {
            Self::Average => idea.average(),
            Self::Ease => f32::from(idea.ease),
            Self::Confidence => f32::from(idea.confidence),
            Self::Impact => f32::from(idea.impact),
        }
    }
}

/// Sort direction for idea lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Highest score first (the default view).
    #[default]
    Descending,
    /// Lowest score first.
    Ascending,
}

impl SortDirection {
    /// Flip the direction.
    pub fn toggled(self) -> Self {
        match self {
            Self::Descending => Self::Ascending,
            Self::Ascending => Self::Descending,
        }
    }
}

/// Sort ideas in place by the given score and direction.
///
/// The sort is stable, so ideas with equal scores keep their incoming
/// order.
pub fn sort_ideas(ideas: &mut [Idea], sort: IdeaSort, direction: SortDirection) {
    ideas.sort_by(|a, b| {
        let ordering = sort
            .value(a)
            .partial_cmp(&sort.value(b))
            .unwrap_or(Ordering::Equal);
        match direction {
            SortDirection::Descending => ordering.reverse(),
            SortDirection::Ascending => ordering,
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idea(name: &str, ease: u8, confidence: u8, impact: u8) -> Idea {
        Idea {
            id: IdeaId::new(),
            board_id: BoardId::new(),
            name: name.to_string(),
            description: None,
            ease,
            confidence,
            impact,
        }
    }

    #[test]
    fn test_average() {
        let i = idea("a", 3, 6, 9);
        assert!((i.average() - 6.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_sort_by_average_descending() {
        let mut ideas = vec![idea("low", 1, 1, 1), idea("high", 9, 9, 9), idea("mid", 5, 5, 5)];
        sort_ideas(&mut ideas, IdeaSort::Average, SortDirection::Descending);
        let names: Vec<_> = ideas.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["high", "mid", "low"]);
    }

    #[test]
    fn test_sort_by_single_score_ascending() {
        let mut ideas = vec![idea("b", 8, 1, 1), idea("a", 2, 9, 9)];
        sort_ideas(&mut ideas, IdeaSort::Ease, SortDirection::Ascending);
        let names: Vec<_> = ideas.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn test_sort_is_stable_on_ties() {
        let mut ideas = vec![idea("first", 5, 5, 5), idea("second", 5, 5, 5)];
        sort_ideas(&mut ideas, IdeaSort::Average, SortDirection::Descending);
        let names: Vec<_> = ideas.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["first", "second"]);
    }

    #[test]
    fn test_direction_toggle() {
        assert_eq!(SortDirection::Descending.toggled(), SortDirection::Ascending);
        assert_eq!(SortDirection::Ascending.toggled(), SortDirection::Descending);
    }
}
