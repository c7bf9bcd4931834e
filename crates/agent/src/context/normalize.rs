//! Score normalisation applied before ranking.
//!
//! Stores report scores on their own scales, so a raw cross-source sort can
//! favour whichever store is more generous. `MinMax` rescales each source's
//! scores to `0.0..=1.0` independently. The default leaves scores untouched.

use std::collections::HashMap;

use crate::retrieval::RetrievedPassage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoreNormalizer {
    #[default]
    None,
    /// Per-source `(s - min) / (max - min)`; a source whose scores are all
    /// equal maps every passage to 1.0.
    MinMax,
}

impl ScoreNormalizer {
    /// Parse a `retrieval.score_normalization` setting.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "none" | "" => Some(Self::None),
            "min_max" | "minmax" => Some(Self::MinMax),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::MinMax => "min_max",
        }
    }

    pub fn apply(&self, passages: &mut [RetrievedPassage]) {
        if *self == Self::None {
            return;
        }

        let mut ranges: HashMap<&str, (f32, f32)> = HashMap::new();
        for p in passages.iter() {
            let range = ranges
                .entry(p.source.as_str())
                .or_insert((p.relevance_score, p.relevance_score));
            range.0 = range.0.min(p.relevance_score);
            range.1 = range.1.max(p.relevance_score);
        }
        let ranges: HashMap<String, (f32, f32)> = ranges
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();

        for p in passages.iter_mut() {
            let (min, max) = ranges[&p.source];
            p.relevance_score = if max > min {
                (p.relevance_score - min) / (max - min)
            } else {
                1.0
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passage(source: &str, score: f32) -> RetrievedPassage {
        RetrievedPassage {
            text: format!("{source} {score}"),
            relevance_score: score,
            source_label: format!("{source}_Chunk_1"),
            source: source.into(),
            location: None,
        }
    }

    #[test]
    fn none_is_identity() {
        let mut passages = vec![passage("A", 0.9), passage("B", 12.0)];
        ScoreNormalizer::None.apply(&mut passages);
        assert_eq!(passages[0].relevance_score, 0.9);
        assert_eq!(passages[1].relevance_score, 12.0);
    }

    #[test]
    fn min_max_is_per_source() {
        let mut passages = vec![
            passage("A", 0.9),
            passage("A", 0.5),
            passage("A", 0.7),
            passage("B", 20.0),
            passage("B", 10.0),
        ];
        ScoreNormalizer::MinMax.apply(&mut passages);
        let scores: Vec<f32> = passages.iter().map(|p| p.relevance_score).collect();
        assert_eq!(scores[0], 1.0);
        assert_eq!(scores[1], 0.0);
        assert!((scores[2] - 0.5).abs() < 1e-6);
        assert_eq!(scores[3], 1.0);
        assert_eq!(scores[4], 0.0);
    }

    #[test]
    fn single_passage_source_maps_to_one() {
        let mut passages = vec![passage("Global", 0.2)];
        ScoreNormalizer::MinMax.apply(&mut passages);
        assert_eq!(passages[0].relevance_score, 1.0);
    }

    #[test]
    fn names_parse() {
        assert_eq!(ScoreNormalizer::from_name("none"), Some(ScoreNormalizer::None));
        assert_eq!(ScoreNormalizer::from_name("min_max"), Some(ScoreNormalizer::MinMax));
        assert_eq!(ScoreNormalizer::from_name("softmax"), None);
        assert_eq!(ScoreNormalizer::MinMax.name(), "min_max");
    }
}
