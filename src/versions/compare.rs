use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::EssayVersion;
use crate::rubric::RubricCategory;

/// Score differences below this count as unchanged.
const SCORE_EPSILON: f64 = 1e-9;

/// Which way a score moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Score went up.
    Up,
    /// Score went down.
    Down,
    /// No change.
    Same,
}

impl Direction {
    fn of(delta: f64) -> Self {
        if delta > SCORE_EPSILON {
            Direction::Up
        } else if delta < -SCORE_EPSILON {
            Direction::Down
        } else {
            Direction::Same
        }
    }
}

/// Score change for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDelta {
    /// Compared category.
    pub category: RubricCategory,
    /// Score in the older version.
    pub from_score: f64,
    /// Score in the newer version.
    pub to_score: f64,
    /// `to_score - from_score`.
    pub delta: f64,
    /// Sign of `delta`.
    pub direction: Direction,
}

/// Aggregate character counts between two texts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextDelta {
    /// Characters only in the newer text.
    pub added: usize,
    /// Characters only in the older text.
    pub removed: usize,
    /// Length change in characters.
    pub net: i64,
}

impl TextDelta {
    /// Trim the common prefix and suffix and count what is left on each side.
    pub fn between(from: &str, to: &str) -> Self {
        let a: Vec<char> = from.chars().collect();
        let b: Vec<char> = to.chars().collect();

        let prefix = a.iter().zip(&b).take_while(|(x, y)| x == y).count();
        let max_suffix = a.len().min(b.len()) - prefix;
        let suffix = a
            .iter()
            .rev()
            .zip(b.iter().rev())
            .take(max_suffix)
            .take_while(|(x, y)| x == y)
            .count();

        Self {
            added: b.len() - prefix - suffix,
            removed: a.len() - prefix - suffix,
            net: b.len() as i64 - a.len() as i64,
        }
    }
}

/// Differences between two versions of one activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionComparison {
    /// Baseline version.
    pub from_id: String,
    /// Compared version.
    pub to_id: String,
    /// NQI change from baseline.
    pub nqi_delta: f64,
    /// One entry per category present in either version, in rubric order.
    pub category_deltas: Vec<CategoryDelta>,
    /// Character-level text change.
    pub text: TextDelta,
}

impl VersionComparison {
    /// Compare two versions; categories missing on one side count as zero.
    pub fn between(from: &EssayVersion, to: &EssayVersion) -> Self {
        let categories: BTreeSet<RubricCategory> = from
            .category_scores
            .keys()
            .chain(to.category_scores.keys())
            .copied()
            .collect();

        let category_deltas = categories
            .into_iter()
            .map(|category| {
                let from_score = from.category_scores.get(&category).map_or(0.0, |s| s.score);
                let to_score = to.category_scores.get(&category).map_or(0.0, |s| s.score);
                let delta = to_score - from_score;
                CategoryDelta {
                    category,
                    from_score,
                    to_score,
                    delta,
                    direction: Direction::of(delta),
                }
            })
            .collect();

        Self {
            from_id: from.id.clone(),
            to_id: to.id.clone(),
            nqi_delta: to.nqi - from.nqi,
            category_deltas,
            text: TextDelta::between(&from.text, &to.text),
        }
    }

    /// Categories that moved in `direction`
    pub fn moved(&self, direction: Direction) -> impl Iterator<Item = &CategoryDelta> {
        self.category_deltas
            .iter()
            .filter(move |d| d.direction == direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_delta_insertion() {
        let delta = TextDelta::between("I ran home.", "I ran all the way home.");
        assert_eq!(delta.added, 12);
        assert_eq!(delta.removed, 0);
        assert_eq!(delta.net, 12);
    }

    #[test]
    fn test_text_delta_replacement() {
        let delta = TextDelta::between("The cat sat.", "The dog sat.");
        assert_eq!(delta.added, 3);
        assert_eq!(delta.removed, 3);
        assert_eq!(delta.net, 0);
    }

    #[test]
    fn test_text_delta_repeated_characters() {
        // prefix and suffix must not overlap
        let delta = TextDelta::between("aaa", "aaaa");
        assert_eq!(delta.added, 1);
        assert_eq!(delta.removed, 0);
    }

    #[test]
    fn test_text_delta_identical_and_empty() {
        assert_eq!(
            TextDelta::between("same", "same"),
            TextDelta {
                added: 0,
                removed: 0,
                net: 0
            }
        );
        assert_eq!(TextDelta::between("", "abc").added, 3);
        assert_eq!(TextDelta::between("abc", "").removed, 3);
    }

    #[test]
    fn test_direction_threshold() {
        assert_eq!(Direction::of(0.5), Direction::Up);
        assert_eq!(Direction::of(-0.5), Direction::Down);
        assert_eq!(Direction::of(0.0), Direction::Same);
    }
}
