//! Intent classification by regular-expression cue families.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Classified purpose of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Search,
    Knowledge,
    Computation,
    Analysis,
    /// More than one family matched.
    Mixed,
}

impl Intent {
    /// Single-purpose intents in tiebreak order.
    pub const FAMILIES: [Intent; 4] = [
        Intent::Search,
        Intent::Knowledge,
        Intent::Computation,
        Intent::Analysis,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Knowledge => "knowledge",
            Self::Computation => "computation",
            Self::Analysis => "analysis",
            Self::Mixed => "mixed",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const SEARCH_CUES: &[&str] = &[
    r"(?i)what is happening",
    r"(?i)latest news",
    r"(?i)current",
    r"(?i)recent",
    r"(?i)search for",
    r"(?i)find information",
    r"(?i)look up",
];

const KNOWLEDGE_CUES: &[&str] = &[
    r"(?i)what is",
    r"(?i)define",
    r"(?i)explain",
    r"(?i)tell me about",
    r"(?i)wikipedia",
    r"(?i)definition of",
    r"(?i)meaning of",
];

const COMPUTATION_CUES: &[&str] = &[
    r"(?i)calculate",
    r"(?i)compute",
    r"(?i)math",
    r"\d+[+\-*/]\d+",
    r"(?i)statistics",
    r"(?i)mean|median|average",
    r"(?i)standard deviation",
];

const ANALYSIS_CUES: &[&str] = &[
    r"(?i)analyze",
    r"(?i)compare",
    r"(?i)contrast",
    r"(?i)evaluate",
    r"(?i)assess",
];

fn cue_source(intent: Intent) -> &'static [&'static str] {
    match intent {
        Intent::Search => SEARCH_CUES,
        Intent::Knowledge => KNOWLEDGE_CUES,
        Intent::Computation => COMPUTATION_CUES,
        Intent::Analysis => ANALYSIS_CUES,
        Intent::Mixed => &[],
    }
}

static CUES: LazyLock<Vec<(Intent, Vec<Regex>)>> = LazyLock::new(|| {
    Intent::FAMILIES
        .iter()
        .map(|&intent| {
            let patterns = cue_source(intent)
                .iter()
                .filter_map(|p| Regex::new(p).ok())
                .collect();
            (intent, patterns)
        })
        .collect()
});

/// Number of cue patterns of each family that match `query`, in
/// [`Intent::FAMILIES`] order.
pub fn cue_counts(query: &str) -> [(Intent, usize); 4] {
    let mut counts = Intent::FAMILIES.map(|intent| (intent, 0));
    for (slot, (intent, patterns)) in counts.iter_mut().zip(CUES.iter()) {
        debug_assert_eq!(slot.0, *intent);
        slot.1 = patterns.iter().filter(|re| re.is_match(query)).count();
    }
    counts
}

/// Intent and confidence of a query.
///
/// Several matching families give [`Intent::Mixed`] at 0.8. No match
/// defaults to [`Intent::Search`] at 0.5. A single family gives
/// `min(0.9, 0.6 + 0.1 * matches)`.
pub fn classify(query: &str) -> (Intent, f64) {
    let counts = cue_counts(query);
    let active = counts.iter().filter(|(_, n)| *n > 0).count();
    if active > 1 {
        return (Intent::Mixed, 0.8);
    }
    // First family with the highest count; FAMILIES order breaks ties.
    let (intent, max) = counts
        .iter()
        .copied()
        .fold((Intent::Search, 0), |best, cur| if cur.1 > best.1 { cur } else { best });
    if max == 0 {
        return (Intent::Search, 0.5);
    }
    (intent, (0.6 + 0.1 * max as f64).min(0.9))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_for(query: &str, intent: Intent) -> usize {
        cue_counts(query)
            .iter()
            .find(|(i, _)| *i == intent)
            .map(|(_, n)| *n)
            .unwrap()
    }

    #[test]
    fn every_cue_pattern_compiles() {
        for (intent, patterns) in CUES.iter() {
            assert_eq!(patterns.len(), cue_source(*intent).len(), "{intent}");
        }
    }

    #[test]
    fn knowledge_question() {
        let (intent, confidence) = classify("What is the capital of France?");
        assert_eq!(intent, Intent::Knowledge);
        assert!((0.6..=0.9).contains(&confidence));
    }

    #[test]
    fn no_cues_defaults_to_search() {
        assert_eq!(classify("capital of France"), (Intent::Search, 0.5));
    }

    #[test]
    fn confidence_grows_with_matches_and_caps() {
        let (intent, c) = classify("calculate the mean");
        assert_eq!(intent, Intent::Computation);
        assert!((c - 0.8).abs() < 1e-9);

        let (_, c) = classify("calculate and compute the math statistics mean, 2+2");
        assert!((c - 0.9).abs() < 1e-9);
    }

    #[test]
    fn multiple_families_are_mixed() {
        assert_eq!(
            classify("Calculate 5 + 3 and tell me about gravity"),
            (Intent::Mixed, 0.8)
        );
    }

    #[test]
    fn arithmetic_pattern_needs_adjacent_operands() {
        assert_eq!(count_for("2+2", Intent::Computation), 1);
        assert_eq!(count_for("2 + 2", Intent::Computation), 0);
        assert_eq!(count_for("10/5", Intent::Computation), 1);
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(count_for("LATEST NEWS", Intent::Search), 1);
        assert_eq!(count_for("Compare A with B", Intent::Analysis), 1);
    }
}
