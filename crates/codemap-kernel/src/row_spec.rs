//! Row specifications: compact text encoding of row-index sets.
//!
//! A row specification selects rows of a code set by their 1-based source
//! index. The canonical text form is an ascending, merged, comma-separated
//! list of single indices and inclusive `lo-hi` ranges, or `*` for every
//! row:
//!
//! ```text
//! "5,4,5-10,3,2"   parse →   RangeSet::Bounded([2, 11))   serialize →   "2-10"
//! "*"              parse →   RangeSet::All                serialize →   "*"
//! ```
//!
//! Internally a single index `v` is the half-open range `[v, v+1)` and a
//! `lo-hi` range is `[lo, hi+1)`. Ranges are kept sorted, disjoint and
//! non-adjacent so two specifications that select the same rows always
//! serialize identically.

use crate::error::{FormatProblem, RowSpecError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::sync::OnceLock;

/// 1-based ordinal position of a source code within its code set.
pub type RowIndex = u64;

/// Largest index a specification may name.
pub const MAX_ROW_INDEX: RowIndex = i64::MAX as RowIndex;

/// Text form of the "every row" marker.
pub const ALL_ROWS: &str = "*";

fn fragment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([0-9]+)(?:\s*-\s*([0-9]+))?$").expect("fragment regex should compile")
    })
}

/// Half-open interval `[start, end)` of row indices. Never empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowRange {
    start: RowIndex,
    end: RowIndex,
}

impl RowRange {
    /// Inclusive range `lower..=upper`; endpoints are swapped if reversed.
    pub fn closed(lower: RowIndex, upper: RowIndex) -> Self {
        let (lower, upper) = if lower <= upper {
            (lower, upper)
        } else {
            (upper, lower)
        };
        Self {
            start: lower,
            end: upper.saturating_add(1),
        }
    }

    /// The single index `[value, value + 1)`.
    pub fn single(value: RowIndex) -> Self {
        Self::closed(value, value)
    }

    /// First index in the range.
    pub fn lower(&self) -> RowIndex {
        self.start
    }

    /// Last index in the range (inclusive).
    pub fn upper(&self) -> RowIndex {
        self.end - 1
    }

    /// Number of indices in the range.
    pub fn count(&self) -> u64 {
        self.end - self.start
    }

    pub fn contains(&self, index: RowIndex) -> bool {
        self.start <= index && index < self.end
    }

    fn is_single(&self) -> bool {
        self.count() == 1
    }

    fn intersect(&self, lower: RowIndex, end: RowIndex) -> Option<Self> {
        let start = self.start.max(lower);
        let end = self.end.min(end);
        (start < end).then_some(Self { start, end })
    }
}

impl Display for RowRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_single() {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.lower(), self.upper())
        }
    }
}

/// A canonical set of row indices.
///
/// `Bounded` always holds at least one range, sorted ascending, with no two
/// ranges overlapping or touching. `All` is the unbounded "every row"
/// marker; it only becomes concrete against a code-set limit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RangeSet {
    #[default]
    Empty,
    Bounded(Vec<RowRange>),
    All,
}

impl RangeSet {
    /// Parse a row specification.
    ///
    /// Accepts `*`, a single index, or a comma-separated mix of indices and
    /// `lo-hi` ranges (reversed endpoints are swapped). Whitespace around
    /// elements is ignored.
    pub fn parse(text: &str) -> Result<Self, RowSpecError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(RowSpecError::format(text, FormatProblem::Blank));
        }

        let fragments: Vec<&str> = trimmed.split(',').map(str::trim).collect();
        if fragments.len() == 1 && fragments[0] == ALL_ROWS {
            return Ok(Self::All);
        }

        let mut ranges = Vec::with_capacity(fragments.len());
        for fragment in fragments {
            ranges.push(parse_fragment(fragment)?);
        }
        Ok(Self::from_ranges(ranges))
    }

    /// Build the canonical set covering every given range.
    pub fn from_ranges(ranges: impl IntoIterator<Item = RowRange>) -> Self {
        let mut ranges: Vec<RowRange> = ranges.into_iter().collect();
        if ranges.is_empty() {
            return Self::Empty;
        }
        ranges.sort();

        let mut merged: Vec<RowRange> = Vec::with_capacity(ranges.len());
        for range in ranges {
            match merged.last_mut() {
                Some(last) if range.start <= last.end => last.end = last.end.max(range.end),
                _ => merged.push(range),
            }
        }
        Self::Bounded(merged)
    }

    /// Build the canonical set of discrete indices.
    pub fn from_indices<'a>(indices: impl IntoIterator<Item = &'a RowIndex>) -> Self {
        let sorted: BTreeSet<RowIndex> = indices.into_iter().copied().collect();
        let mut ranges: Vec<RowRange> = Vec::new();
        for index in sorted {
            match ranges.last_mut() {
                Some(last) if last.end == index => last.end = index.saturating_add(1),
                _ => ranges.push(RowRange::single(index)),
            }
        }
        Self::from_ranges(ranges)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// Concrete ranges; empty for `Empty` and `All`.
    pub fn ranges(&self) -> &[RowRange] {
        match self {
            Self::Bounded(ranges) => ranges,
            Self::Empty | Self::All => &[],
        }
    }

    pub fn contains(&self, index: RowIndex) -> bool {
        match self {
            Self::Empty => false,
            Self::All => index >= 1,
            Self::Bounded(ranges) => {
                let at = ranges.partition_point(|range| range.end <= index);
                ranges.get(at).is_some_and(|range| range.contains(index))
            }
        }
    }

    /// Number of indices selected; `All` counts as exactly `limit`.
    pub fn cardinality(&self, limit: u64) -> u64 {
        match self {
            Self::Empty => 0,
            Self::All => limit,
            Self::Bounded(ranges) => ranges.iter().map(RowRange::count).sum(),
        }
    }

    /// Restrict to `[1, limit]`. `All` stays `All` while the limit is non-zero.
    pub fn clip(&self, limit: u64) -> Self {
        if limit == 0 {
            return Self::Empty;
        }
        match self {
            Self::Empty => Self::Empty,
            Self::All => Self::All,
            Self::Bounded(ranges) => {
                let end = limit.saturating_add(1);
                Self::from_ranges(ranges.iter().filter_map(|range| range.intersect(1, end)))
            }
        }
    }

    /// Replace `All` with the concrete range `[1, limit]`.
    pub fn materialize(&self, limit: u64) -> Self {
        match self {
            Self::All if limit == 0 => Self::Empty,
            Self::All => Self::Bounded(vec![RowRange::closed(1, limit)]),
            other => other.clone(),
        }
    }

    pub fn union(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::All, _) | (_, Self::All) => Self::All,
            (Self::Empty, set) | (set, Self::Empty) => set.clone(),
            (Self::Bounded(left), Self::Bounded(right)) => {
                Self::from_ranges(left.iter().chain(right.iter()).copied())
            }
        }
    }

    /// Indices in `self` but not in `removed`, both taken within `[1, limit]`.
    pub fn difference(&self, removed: &Self, limit: u64) -> Self {
        let base = self.materialize(limit);
        let removed = removed.materialize(limit);
        if base.is_empty() || removed.is_empty() {
            return base;
        }
        Self::from_ranges(subtract_ranges(base.ranges(), removed.ranges()))
    }

    /// Every selected index in ascending order, with `All` read as `[1, limit]`.
    pub fn iter(&self, limit: u64) -> impl Iterator<Item = RowIndex> + '_ {
        let all = match self {
            Self::All => Some(1..limit.saturating_add(1)),
            _ => None,
        };
        all.into_iter()
            .flatten()
            .chain(self.ranges().iter().flat_map(|range| range.start..range.end))
    }

    /// Split into bulk-bind operations: every multi-index range becomes one
    /// range bind, and all single indices are gathered into one id-set bind.
    pub fn partition_for_binding(&self, limit: u64) -> BindingPartition {
        let mut partition = BindingPartition::default();
        for range in self.materialize(limit).ranges() {
            if range.is_single() {
                partition.singles.insert(range.start);
            } else {
                partition.ranges.push((range.lower(), range.upper()));
            }
        }
        partition
    }
}

/// Plain canonical text: `*` only for the `All` marker, empty for `Empty`.
impl Display for RangeSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::All => f.write_str(ALL_ROWS),
            Self::Bounded(ranges) => {
                for (at, range) in ranges.iter().enumerate() {
                    if at > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{range}")?;
                }
                Ok(())
            }
        }
    }
}

/// Bulk-bind plan produced by [`RangeSet::partition_for_binding`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingPartition {
    /// Inclusive `(lower, upper)` pairs, each spanning at least two indices.
    pub ranges: Vec<(RowIndex, RowIndex)>,
    /// Isolated indices.
    pub singles: BTreeSet<RowIndex>,
}

/// Canonical text plus the number of rows it selects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowSpecification {
    pub text: String,
    pub count: u64,
}

/// Row-specification operations in the context of one code set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowSpecCodec {
    limit: u64,
}

impl RowSpecCodec {
    /// `limit` is the number of codes in the code set (the largest valid index).
    pub fn new(limit: u64) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn parse(&self, text: &str) -> Result<RangeSet, RowSpecError> {
        RangeSet::parse(text)
    }

    /// Canonical text; a set covering exactly `[1, limit]` is written `*`.
    pub fn serialize(&self, set: &RangeSet) -> String {
        if self.covers_all(set) {
            return ALL_ROWS.to_string();
        }
        set.to_string()
    }

    /// Parse and clip to `[1, limit]`; fails if nothing remains.
    pub fn normalize_set(&self, text: &str) -> Result<RangeSet, RowSpecError> {
        let clipped = self.parse(text)?.clip(self.limit);
        if clipped.is_empty() {
            return Err(RowSpecError::EmptySpecification {
                specification: text.trim().to_string(),
                limit: self.limit,
            });
        }
        Ok(clipped)
    }

    pub fn normalize(&self, text: &str) -> Result<String, RowSpecError> {
        Ok(self.normalize_set(text)?.to_string())
    }

    /// Canonical specification of a discrete index set.
    pub fn from_indices<'a>(
        &self,
        indices: impl IntoIterator<Item = &'a RowIndex>,
    ) -> Result<RowSpecification, RowSpecError> {
        let set = RangeSet::from_indices(indices);
        let text = set.to_string();
        let normalized = self.normalize_set(&text).map_err(|err| match err {
            RowSpecError::SpecificationFormat {
                problem: FormatProblem::Blank,
                ..
            } => RowSpecError::EmptySpecification {
                specification: text.clone(),
                limit: self.limit,
            },
            other => other,
        })?;
        Ok(self.specification(&normalized))
    }

    /// Remove every index named in any of `subtractions` from `text`.
    ///
    /// `*` is materialized to `[1, limit]` first. Returns `None` when no
    /// index remains.
    pub fn subtract(
        &self,
        text: &str,
        subtractions: &[&BTreeSet<RowIndex>],
    ) -> Result<Option<RowSpecification>, RowSpecError> {
        let base = self.normalize_set(text)?.materialize(self.limit);
        let removed = RangeSet::from_indices(subtractions.iter().flat_map(|set| set.iter()));
        let remaining = base.difference(&removed, self.limit);
        if remaining.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.specification(&remaining)))
    }

    /// Plain canonical text and cardinality of `set`.
    pub fn specification(&self, set: &RangeSet) -> RowSpecification {
        RowSpecification {
            text: set.to_string(),
            count: set.cardinality(self.limit),
        }
    }

    fn covers_all(&self, set: &RangeSet) -> bool {
        match set {
            RangeSet::All => true,
            RangeSet::Bounded(ranges) => {
                self.limit > 0
                    && ranges.len() == 1
                    && ranges[0].lower() == 1
                    && ranges[0].upper() == self.limit
            }
            RangeSet::Empty => false,
        }
    }
}

fn parse_fragment(fragment: &str) -> Result<RowRange, RowSpecError> {
    if fragment.is_empty() {
        return Err(RowSpecError::format(fragment, FormatProblem::EmptyElement));
    }
    if fragment.contains('*') {
        return Err(RowSpecError::format(fragment, FormatProblem::WildcardMixed));
    }

    let Some(captures) = fragment_re().captures(fragment) else {
        let problem = if fragment.starts_with('-') {
            FormatProblem::NonPositive
        } else {
            FormatProblem::Malformed
        };
        return Err(RowSpecError::format(fragment, problem));
    };

    let lower = parse_index(fragment, &captures[1])?;
    let upper = match captures.get(2) {
        Some(digits) => parse_index(fragment, digits.as_str())?,
        None => lower,
    };
    Ok(RowRange::closed(lower, upper))
}

fn parse_index(fragment: &str, digits: &str) -> Result<RowIndex, RowSpecError> {
    // Digits only, so the only possible parse failure is overflow.
    let value: RowIndex = digits
        .parse()
        .map_err(|_| RowSpecError::format(fragment, FormatProblem::Overflow))?;
    if value == 0 {
        return Err(RowSpecError::format(fragment, FormatProblem::NonPositive));
    }
    if value > MAX_ROW_INDEX {
        return Err(RowSpecError::format(fragment, FormatProblem::Overflow));
    }
    Ok(value)
}

fn subtract_ranges(base: &[RowRange], removed: &[RowRange]) -> Vec<RowRange> {
    let mut out = Vec::with_capacity(base.len());
    let mut cut_at = 0;

    for range in base {
        while cut_at < removed.len() && removed[cut_at].end <= range.start {
            cut_at += 1;
        }

        let mut start = range.start;
        let mut cursor = cut_at;
        while start < range.end && cursor < removed.len() && removed[cursor].start < range.end {
            let cut = removed[cursor];
            if cut.start > start {
                out.push(RowRange {
                    start,
                    end: cut.start,
                });
            }
            start = start.max(cut.end);
            cursor += 1;
        }
        if start < range.end {
            out.push(RowRange {
                start,
                end: range.end,
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format_problem(result: Result<RangeSet, RowSpecError>) -> (String, FormatProblem) {
        match result {
            Err(RowSpecError::SpecificationFormat { fragment, problem }) => (fragment, problem),
            other => panic!("expected a format error, got {other:?}"),
        }
    }

    #[test]
    fn parse_merges_overlapping_and_adjacent_elements() {
        let set = RangeSet::parse("5,4,5-10,3,2").expect("spec should parse");
        assert_eq!(set.to_string(), "2-10");
        assert_eq!(set.cardinality(100), 9);
    }

    #[test]
    fn parse_swaps_reversed_endpoints() {
        let set = RangeSet::parse("10-4").expect("reversed range should parse");
        assert_eq!(set.to_string(), "4-10");
    }

    #[test]
    fn parse_keeps_gaps_between_ranges() {
        let set = RangeSet::parse(" 20-25 , 1,3-4 ").expect("spec should parse");
        assert_eq!(set.to_string(), "1,3-4,20-25");
        assert!(set.contains(3));
        assert!(!set.contains(2));
        assert!(set.contains(25));
        assert!(!set.contains(26));
    }

    #[test]
    fn parse_accepts_wildcard_alone() {
        assert_eq!(RangeSet::parse("*").expect("wildcard"), RangeSet::All);
        assert_eq!(RangeSet::parse(" * ").expect("wildcard"), RangeSet::All);
    }

    #[test]
    fn parse_rejects_blank_input() {
        let (_, problem) = format_problem(RangeSet::parse("   "));
        assert_eq!(problem, FormatProblem::Blank);
    }

    #[test]
    fn parse_rejects_zero_and_negative_indices() {
        let (fragment, problem) = format_problem(RangeSet::parse("1,0"));
        assert_eq!(fragment, "0");
        assert_eq!(problem, FormatProblem::NonPositive);

        let (fragment, problem) = format_problem(RangeSet::parse("-3"));
        assert_eq!(fragment, "-3");
        assert_eq!(problem, FormatProblem::NonPositive);
    }

    #[test]
    fn parse_rejects_malformed_separators() {
        let (_, problem) = format_problem(RangeSet::parse("1,,2"));
        assert_eq!(problem, FormatProblem::EmptyElement);

        let (_, problem) = format_problem(RangeSet::parse("1,"));
        assert_eq!(problem, FormatProblem::EmptyElement);

        let (fragment, problem) = format_problem(RangeSet::parse("1--4"));
        assert_eq!(fragment, "1--4");
        assert_eq!(problem, FormatProblem::Malformed);

        let (_, problem) = format_problem(RangeSet::parse("3-"));
        assert_eq!(problem, FormatProblem::Malformed);

        let (_, problem) = format_problem(RangeSet::parse("1;2"));
        assert_eq!(problem, FormatProblem::Malformed);
    }

    #[test]
    fn parse_rejects_overflow() {
        let (_, problem) = format_problem(RangeSet::parse("99999999999999999999"));
        assert_eq!(problem, FormatProblem::Overflow);

        let past_max = (MAX_ROW_INDEX + 1).to_string();
        let (fragment, problem) = format_problem(RangeSet::parse(&past_max));
        assert_eq!(fragment, past_max);
        assert_eq!(problem, FormatProblem::Overflow);

        let at_max = MAX_ROW_INDEX.to_string();
        assert!(RangeSet::parse(&at_max).is_ok());
    }

    #[test]
    fn parse_rejects_wildcard_mixed_with_indices() {
        let (fragment, problem) = format_problem(RangeSet::parse("*,4"));
        assert_eq!(fragment, "*");
        assert_eq!(problem, FormatProblem::WildcardMixed);

        let (_, problem) = format_problem(RangeSet::parse("1-3,*"));
        assert_eq!(problem, FormatProblem::WildcardMixed);
    }

    #[test]
    fn all_marker_counts_limit_without_materializing() {
        assert_eq!(RangeSet::All.cardinality(1_000_000_000_000), 1_000_000_000_000);
        assert_eq!(RangeSet::All.iter(3).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn normalize_clips_to_limit() {
        let codec = RowSpecCodec::new(3);
        assert_eq!(codec.normalize("1-5").expect("clipped spec"), "1-3");
        assert_eq!(codec.normalize("*").expect("wildcard"), "*");
        assert_eq!(codec.normalize("2,7-9").expect("partially clipped"), "2");
    }

    #[test]
    fn normalize_fails_when_nothing_remains() {
        let codec = RowSpecCodec::new(3);
        let err = codec.normalize("6-9").expect_err("out-of-range spec must fail");
        assert_eq!(
            err,
            RowSpecError::EmptySpecification {
                specification: "6-9".to_string(),
                limit: 3
            }
        );
    }

    #[test]
    fn serialize_writes_full_cover_as_wildcard() {
        let codec = RowSpecCodec::new(10);
        let full = RangeSet::parse("1-4,5-10").expect("spec should parse");
        assert_eq!(codec.serialize(&full), "*");
        assert_eq!(full.to_string(), "1-10");

        let partial = RangeSet::parse("1-9").expect("spec should parse");
        assert_eq!(codec.serialize(&partial), "1-9");
        assert_eq!(codec.serialize(&RangeSet::All), "*");
        assert_eq!(codec.serialize(&RangeSet::Empty), "");
    }

    #[test]
    fn from_indices_reports_text_and_count() {
        let codec = RowSpecCodec::new(50);
        let indices: BTreeSet<RowIndex> = [7, 3, 4, 5, 12, 60].into_iter().collect();
        let spec = codec.from_indices(&indices).expect("indices should encode");
        assert_eq!(spec.text, "3-5,7,12");
        assert_eq!(spec.count, 5);
    }

    #[test]
    fn from_indices_rejects_empty_input() {
        let codec = RowSpecCodec::new(50);
        let err = codec
            .from_indices(&BTreeSet::new())
            .expect_err("empty index set has no specification");
        assert!(matches!(err, RowSpecError::EmptySpecification { .. }));
    }

    #[test]
    fn subtract_materializes_wildcard() {
        let codec = RowSpecCodec::new(10);
        let first: BTreeSet<RowIndex> = [1, 2, 5].into_iter().collect();
        let second: BTreeSet<RowIndex> = [5, 10].into_iter().collect();
        let rest = codec
            .subtract("*", &[&first, &second])
            .expect("subtract should succeed")
            .expect("rows should remain");
        assert_eq!(rest.text, "3-4,6-9");
        assert_eq!(rest.count, 6);
    }

    #[test]
    fn subtract_returns_none_when_exhausted() {
        let codec = RowSpecCodec::new(10);
        let all: BTreeSet<RowIndex> = (2..=4).collect();
        assert_eq!(codec.subtract("2-4", &[&all]).expect("subtract"), None);
    }

    #[test]
    fn difference_splits_ranges_around_cuts() {
        let base = RangeSet::parse("1-10,20-30").expect("base");
        let cuts = RangeSet::parse("3,5-6,10-21,30").expect("cuts");
        assert_eq!(base.difference(&cuts, 100).to_string(), "1-2,4,7-9,22-29");
    }

    #[test]
    fn partition_separates_ranges_from_singletons() {
        let set = RangeSet::parse("1-4,6,8,10-11").expect("spec should parse");
        let partition = set.partition_for_binding(20);
        assert_eq!(partition.ranges, vec![(1, 4), (10, 11)]);
        assert_eq!(partition.singles, [6, 8].into_iter().collect());

        let all = RangeSet::All.partition_for_binding(1);
        assert!(all.ranges.is_empty());
        assert_eq!(all.singles, [1].into_iter().collect());
    }

    #[test]
    fn union_absorbs_into_wildcard() {
        let left = RangeSet::parse("1-3").expect("left");
        let right = RangeSet::parse("4,9").expect("right");
        assert_eq!(left.union(&right).to_string(), "1-4,9");
        assert_eq!(left.union(&RangeSet::All), RangeSet::All);
        assert_eq!(RangeSet::Empty.union(&right), right);
    }
}
