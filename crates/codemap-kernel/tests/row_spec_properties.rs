//! Property tests for the row-specification codec.
//!
//! Specifications are generated as random element lists (single indices and
//! ranges, in any order, possibly overlapping or reversed) and checked
//! against a brute-force model of the selected index set.

use codemap_kernel::{RangeSet, RowIndex, RowSpecCodec};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn element() -> impl Strategy<Value = (RowIndex, Option<RowIndex>)> {
    (1u64..200, proptest::option::of(1u64..200))
}

fn render(elements: &[(RowIndex, Option<RowIndex>)]) -> String {
    elements
        .iter()
        .map(|(lower, upper)| match upper {
            Some(upper) => format!("{lower}-{upper}"),
            None => lower.to_string(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn model(elements: &[(RowIndex, Option<RowIndex>)]) -> BTreeSet<RowIndex> {
    let mut out = BTreeSet::new();
    for (lower, upper) in elements {
        let upper = upper.unwrap_or(*lower);
        let (lower, upper) = if *lower <= upper {
            (*lower, upper)
        } else {
            (upper, *lower)
        };
        out.extend(lower..=upper);
    }
    out
}

/// Canonical text built straight from the model, independent of the codec.
fn canonical(indices: &BTreeSet<RowIndex>) -> String {
    let mut runs: Vec<(RowIndex, RowIndex)> = Vec::new();
    for index in indices {
        match runs.last_mut() {
            Some((_, upper)) if *upper + 1 == *index => *upper = *index,
            _ => runs.push((*index, *index)),
        }
    }
    runs.into_iter()
        .map(|(lower, upper)| {
            if lower == upper {
                lower.to_string()
            } else {
                format!("{lower}-{upper}")
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

proptest! {
    #[test]
    fn prop_round_trip_yields_canonical_form(elements in prop::collection::vec(element(), 1..12)) {
        let text = render(&elements);
        let set = RangeSet::parse(&text).expect("generated spec should parse");
        prop_assert_eq!(set.to_string(), canonical(&model(&elements)));
    }

    #[test]
    fn prop_canonical_text_is_a_fixed_point(elements in prop::collection::vec(element(), 1..12)) {
        let once = RangeSet::parse(&render(&elements)).expect("parse").to_string();
        let twice = RangeSet::parse(&once).expect("reparse").to_string();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_cardinality_matches_model(elements in prop::collection::vec(element(), 1..12)) {
        let set = RangeSet::parse(&render(&elements)).expect("parse");
        prop_assert_eq!(set.cardinality(1_000), model(&elements).len() as u64);
    }

    #[test]
    fn prop_normalize_is_idempotent(
        elements in prop::collection::vec(element(), 1..12),
        limit in 1u64..250,
    ) {
        let codec = RowSpecCodec::new(limit);
        let text = render(&elements);
        match codec.normalize(&text) {
            Ok(once) => {
                let twice = codec.normalize(&once).expect("normalized spec stays valid");
                prop_assert_eq!(once, twice);
            }
            Err(_) => {
                prop_assert!(model(&elements).iter().all(|index| *index > limit));
            }
        }
    }

    #[test]
    fn prop_subtract_removes_exactly_the_given_indices(
        elements in prop::collection::vec(element(), 1..8),
        removed in prop::collection::btree_set(1u64..200, 0..40),
        limit in 1u64..250,
    ) {
        let codec = RowSpecCodec::new(limit);
        let text = render(&elements);
        prop_assume!(codec.normalize(&text).is_ok());

        let expected: BTreeSet<RowIndex> = model(&elements)
            .into_iter()
            .filter(|index| *index <= limit && !removed.contains(index))
            .collect();
        let result = codec.subtract(&text, &[&removed]).expect("subtract");
        match result {
            Some(spec) => {
                prop_assert_eq!(spec.text, canonical(&expected));
                prop_assert_eq!(spec.count, expected.len() as u64);
            }
            None => prop_assert!(expected.is_empty()),
        }
    }
}

#[test]
fn wildcard_denotes_every_row_up_to_limit() {
    let codec = RowSpecCodec::new(7);
    let all = codec.parse("*").expect("wildcard");
    assert_eq!(all.iter(7).collect::<Vec<_>>(), (1..=7).collect::<Vec<_>>());
    assert_eq!(all.cardinality(7), 7);

    let explicit = RangeSet::from_indices(&(1..=7).collect::<BTreeSet<RowIndex>>());
    assert_eq!(codec.serialize(&explicit), "*");
}

#[test]
fn scenario_merges_mixed_elements() {
    let codec = RowSpecCodec::new(100);
    let set = codec.parse("5,4,5-10,3,2").expect("parse");
    assert_eq!(codec.serialize(&set), "2-10");
}
