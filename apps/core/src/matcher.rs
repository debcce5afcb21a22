/// Shared fuzzy-match primitive used by the live result providers and the
/// threshold-filtered surfaces (history, context menu).
///
/// Scoring is deterministic and case-insensitive. A contiguous occurrence of
/// the pattern always outscores a scattered subsequence match; matches that
/// start at the front of the text score higher than late matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuzzyMatch {
    pub score: i64,
    /// Char indices of the matched characters in the original text, for
    /// highlight rendering.
    pub indices: Vec<usize>,
}

/// Minimum score a match must reach to be included in threshold-filtered
/// lists. Contiguous matches always pass `Regular`; low-quality scattered
/// subsequences do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPrecision {
    Regular,
    Low,
    None,
}

impl SearchPrecision {
    pub fn threshold(self) -> i64 {
        match self {
            Self::Regular => 5_000,
            Self::Low => 2_500,
            Self::None => 1,
        }
    }

    pub fn met_by(self, score: i64) -> bool {
        score >= self.threshold()
    }
}

/// Returns `None` when `pattern` is not a subsequence of `text`.
pub fn fuzzy_match(pattern: &str, text: &str) -> Option<FuzzyMatch> {
    let pattern: Vec<char> = pattern.chars().flat_map(|c| c.to_lowercase()).collect();
    let text: Vec<char> = text.chars().flat_map(|c| c.to_lowercase()).collect();
    if pattern.is_empty() || text.is_empty() {
        return None;
    }

    if let Some(position) = find_contiguous(&text, &pattern) {
        let prefix_bonus = if position == 0 { 400 } else { 0 };
        let compact_bonus = (pattern.len() as i64) * 40;
        let position_penalty = position as i64;
        let length_penalty = (text.len() as i64 - pattern.len() as i64).abs();
        let score = 10_000 + prefix_bonus + compact_bonus - position_penalty - length_penalty;
        return Some(FuzzyMatch {
            score,
            indices: (position..position + pattern.len()).collect(),
        });
    }

    let positions = subsequence_positions(&text, &pattern)?;
    let start_penalty = positions[0] as i64;
    let gap_penalty: i64 = positions
        .windows(2)
        .map(|pair| (pair[1] - pair[0] - 1) as i64)
        .sum();
    let length_penalty = (text.len() as i64 - pattern.len() as i64).max(0);
    let score = 5_000 + (pattern.len() as i64) * 30 - gap_penalty * 6 - start_penalty - length_penalty;

    Some(FuzzyMatch {
        score,
        indices: positions,
    })
}

fn find_contiguous(text: &[char], pattern: &[char]) -> Option<usize> {
    if pattern.len() > text.len() {
        return None;
    }
    (0..=text.len() - pattern.len()).find(|&start| text[start..start + pattern.len()] == *pattern)
}

fn subsequence_positions(text: &[char], pattern: &[char]) -> Option<Vec<usize>> {
    let mut positions = Vec::with_capacity(pattern.len());
    let mut next_start = 0;

    for &wanted in pattern {
        let found = text[next_start..]
            .iter()
            .position(|&c| c == wanted)
            .map(|offset| next_start + offset)?;
        positions.push(found);
        next_start = found + 1;
    }

    Some(positions)
}

#[cfg(test)]
mod tests {
    use super::{fuzzy_match, SearchPrecision};

    #[test]
    fn contiguous_match_outscores_scattered_match() {
        let contiguous = fuzzy_match("term", "terminal").expect("should match");
        let scattered = fuzzy_match("term", "text_reorder_map").expect("should match");
        assert!(contiguous.score > scattered.score);
    }

    #[test]
    fn prefix_match_outscores_mid_string_match() {
        let prefix = fuzzy_match("note", "notes.txt").expect("should match");
        let middle = fuzzy_match("note", "my notes.txt").expect("should match");
        assert!(prefix.score > middle.score);
    }

    #[test]
    fn match_is_case_insensitive() {
        let lower = fuzzy_match("code", "Visual Studio Code").expect("should match");
        let upper = fuzzy_match("CODE", "Visual Studio Code").expect("should match");
        assert_eq!(lower.score, upper.score);
        assert_eq!(lower.indices, upper.indices);
    }

    #[test]
    fn non_subsequence_yields_no_match() {
        assert!(fuzzy_match("xyz", "terminal").is_none());
        assert!(fuzzy_match("ba", "ab").is_none());
    }

    #[test]
    fn empty_pattern_or_text_yields_no_match() {
        assert!(fuzzy_match("", "terminal").is_none());
        assert!(fuzzy_match("term", "").is_none());
    }

    #[test]
    fn matched_indices_cover_the_pattern() {
        let result = fuzzy_match("vsc", "Visual Studio Code").expect("should match");
        assert_eq!(result.indices.len(), 3);
        assert_eq!(result.indices[0], 0);
    }

    #[test]
    fn scoring_is_deterministic() {
        let first = fuzzy_match("rep", "Q4_Report.xlsx").expect("should match");
        let second = fuzzy_match("rep", "Q4_Report.xlsx").expect("should match");
        assert_eq!(first, second);
    }

    #[test]
    fn regular_precision_passes_contiguous_and_rejects_poor_scatter() {
        let contiguous = fuzzy_match("log", "logs folder").expect("should match");
        assert!(SearchPrecision::Regular.met_by(contiguous.score));

        let scattered = fuzzy_match("lgr", "a long and meandering title for a folder")
            .expect("should match");
        assert!(!SearchPrecision::Regular.met_by(scattered.score));
        assert!(SearchPrecision::None.met_by(scattered.score));
    }
}
