//! Choosing among overlapping matches
//!
//! Candidates can match overlapping spans of one segment ("Home" inside
//! "Welcome home page", two fragments sharing a clause). The resolver selects
//! the non-overlapping subset covering the most bytes, preferring fewer and
//! longer replacements when the coverage is equal, then higher-priority
//! candidates, and splices the chosen replacements into the segment.

use crate::matcher::MatchInterval;

/// Best selection found over a prefix of the sorted intervals
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Score {
    weight: usize,
    /// Priorities of the selected intervals, ascending
    priorities: Vec<usize>,
}

impl Score {
    fn count(&self) -> usize {
        self.priorities.len()
    }

    fn extend(&self, interval: &MatchInterval) -> Score {
        let mut priorities = self.priorities.clone();
        let at = priorities.partition_point(|&p| p <= interval.priority);
        priorities.insert(at, interval.priority);
        Score {
            weight: self.weight + interval.weight(),
            priorities,
        }
    }

    fn beats(&self, other: &Score) -> bool {
        self.weight
            .cmp(&other.weight)
            .then_with(|| other.count().cmp(&self.count()))
            .then_with(|| other.priorities.cmp(&self.priorities))
            .is_gt()
    }
}

/// Select a maximum-weight set of non-overlapping intervals
///
/// Intervals are half-open, so `(0, 4)` and `(4, 8)` do not overlap. On equal
/// total weight the selection with fewer intervals wins, then the one whose
/// priorities, compared in ascending order, are lower. On a full tie the
/// selection built from earlier intervals (by end, start, priority) is kept.
/// The result is ordered by start offset.
pub fn select(mut intervals: Vec<MatchInterval>) -> Vec<MatchInterval> {
    if intervals.len() <= 1 {
        return intervals;
    }
    intervals.sort_by(|a, b| {
        a.end
            .cmp(&b.end)
            .then(a.start.cmp(&b.start))
            .then(a.priority.cmp(&b.priority))
    });

    let ends: Vec<usize> = intervals.iter().map(|i| i.end).collect();
    // predecessor[i]: number of intervals ending at or before intervals[i] starts
    let predecessor: Vec<usize> = intervals
        .iter()
        .map(|interval| ends.partition_point(|&end| end <= interval.start))
        .collect();

    let n = intervals.len();
    let mut best = vec![Score::default(); n + 1];
    let mut take = vec![false; n + 1];
    for j in 1..=n {
        let i = j - 1;
        let with = best[predecessor[i]].extend(&intervals[i]);
        if with.beats(&best[j - 1]) {
            best[j] = with;
            take[j] = true;
        } else {
            best[j] = best[j - 1].clone();
        }
    }

    let mut chosen = Vec::new();
    let mut j = n;
    while j > 0 {
        if take[j] {
            chosen.push(j - 1);
            j = predecessor[j - 1];
        } else {
            j -= 1;
        }
    }
    chosen.reverse();

    let mut slots: Vec<Option<MatchInterval>> = intervals.into_iter().map(Some).collect();
    let mut selected: Vec<MatchInterval> = chosen
        .into_iter()
        .filter_map(|index| slots[index].take())
        .collect();
    selected.sort_by_key(|interval| interval.start);
    selected
}

/// Replace the selected intervals of `segment` with their replacements
///
/// `selected` must be non-overlapping and ordered by start.
pub fn splice(segment: &str, selected: &[MatchInterval]) -> String {
    if selected.is_empty() {
        return segment.to_string();
    }
    let mut out = String::with_capacity(segment.len());
    let mut cursor = 0;
    for interval in selected {
        out.push_str(&segment[cursor..interval.start]);
        out.push_str(&interval.replacement);
        cursor = interval.end;
    }
    out.push_str(&segment[cursor..]);
    out
}

/// Resolve overlaps and produce the rewritten segment
pub fn resolve(segment: &str, intervals: Vec<MatchInterval>) -> String {
    let selected = select(intervals);
    splice(segment, &selected)
}
