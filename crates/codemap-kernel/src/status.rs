//! Mapping status machine.
//!
//! A row's status moves through an author phase (UNMAPPED, DRAFT, MAPPED),
//! a review phase (INREVIEW, ACCEPTED, REJECTED) and, in dual-map projects,
//! a RECONCILE holding state. A requested move is legal only when the
//! global table allows it *and* the destination belongs to the acting
//! role's status set.
//!
//! RECONCILE is entered only by the reconciler component (never by a user
//! request) and left only by a reconciler.

use crate::error::TransitionError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum MapStatus {
    #[default]
    Unmapped,
    Draft,
    Mapped,
    InReview,
    Accepted,
    Rejected,
    Reconcile,
}

use MapStatus::{Accepted, Draft, InReview, Mapped, Reconcile, Rejected, Unmapped};

const AUTHOR_STATES: &[MapStatus] = &[Unmapped, Draft, Mapped];
const REVIEWER_STATES: &[MapStatus] = &[InReview, Accepted, Rejected];
const RECONCILER_STATES: &[MapStatus] = &[Reconcile, Mapped];

impl MapStatus {
    pub const ALL: [MapStatus; 7] = [
        Unmapped, Draft, Mapped, InReview, Accepted, Rejected, Reconcile,
    ];

    /// Statuses reachable from `self` in one move, including staying put.
    pub fn allowed_transitions(self) -> &'static [MapStatus] {
        match self {
            Unmapped => &[Unmapped, Draft, Mapped],
            Draft => &[Draft, Unmapped, Mapped],
            Mapped => &[Unmapped, Draft, InReview, Accepted, Rejected, Mapped],
            InReview => &[InReview, Accepted, Rejected],
            Accepted => &[InReview, Rejected, Accepted],
            Rejected => &[Unmapped, Draft, InReview, Accepted, Rejected, Mapped],
            Reconcile => &[Reconcile, Mapped],
        }
    }

    /// Statuses in which a reviewer works on the row.
    pub fn is_review_family(self) -> bool {
        matches!(self, Mapped | InReview | Accepted | Rejected)
    }

    /// Statuses in which the author may edit targets.
    pub fn is_author_editable(self) -> bool {
        is_author_state(self) || self == Rejected
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Unmapped => "UNMAPPED",
            Draft => "DRAFT",
            Mapped => "MAPPED",
            InReview => "INREVIEW",
            Accepted => "ACCEPTED",
            Rejected => "REJECTED",
            Reconcile => "RECONCILE",
        }
    }
}

impl Display for MapStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MapStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown map status: {wanted}"))
    }
}

/// The capacity in which a user acts on a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Author,
    Reviewer,
    Reconciler,
}

impl Role {
    /// Destinations this role may move a row into.
    pub fn statuses(self) -> &'static [MapStatus] {
        match self {
            Role::Author => AUTHOR_STATES,
            Role::Reviewer => REVIEWER_STATES,
            Role::Reconciler => RECONCILER_STATES,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Author => "author",
            Role::Reviewer => "reviewer",
            Role::Reconciler => "reconciler",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether `status` belongs to the author phase.
///
/// Decides whether a mutation stamps `last_author` or `last_reviewer`.
pub fn is_author_state(status: MapStatus) -> bool {
    AUTHOR_STATES.contains(&status)
}

/// Global table check, independent of who is asking.
pub fn is_valid_transition(from: MapStatus, to: MapStatus) -> bool {
    from.allowed_transitions().contains(&to)
}

/// Global table check followed by role gating.
///
/// Only a reconciler may move a row out of RECONCILE, and a reconciler has
/// no say over rows outside RECONCILE.
pub fn is_valid_transition_for_role(from: MapStatus, to: MapStatus, role: Role) -> bool {
    if !is_valid_transition(from, to) {
        return false;
    }
    if (from == Reconcile) != (role == Role::Reconciler) {
        return false;
    }
    role.statuses().contains(&to)
}

pub fn check_transition(from: MapStatus, to: MapStatus, role: Role) -> Result<(), TransitionError> {
    if is_valid_transition_for_role(from, to, role) {
        Ok(())
    } else {
        Err(TransitionError::InvalidStateTransition {
            from,
            to,
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_table_matches_reference() {
        let expected: &[(MapStatus, &[MapStatus])] = &[
            (Unmapped, &[Unmapped, Draft, Mapped]),
            (Draft, &[Draft, Unmapped, Mapped]),
            (
                Mapped,
                &[Unmapped, Draft, InReview, Accepted, Rejected, Mapped],
            ),
            (InReview, &[InReview, Accepted, Rejected]),
            (Accepted, &[InReview, Rejected, Accepted]),
            (
                Rejected,
                &[Unmapped, Draft, InReview, Accepted, Rejected, Mapped],
            ),
            (Reconcile, &[Reconcile, Mapped]),
        ];

        for (from, allowed) in expected {
            for to in MapStatus::ALL {
                assert_eq!(
                    is_valid_transition(*from, to),
                    allowed.contains(&to),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn role_check_implies_global_check() {
        for from in MapStatus::ALL {
            for to in MapStatus::ALL {
                for role in [Role::Author, Role::Reviewer, Role::Reconciler] {
                    if is_valid_transition_for_role(from, to, role) {
                        assert!(is_valid_transition(from, to), "{from} -> {to} as {role}");
                    }
                }
            }
        }
    }

    #[test]
    fn author_moves_stay_in_author_set() {
        assert!(is_valid_transition_for_role(Draft, Mapped, Role::Author));
        assert!(is_valid_transition_for_role(Rejected, Draft, Role::Author));
        assert!(!is_valid_transition_for_role(Mapped, Accepted, Role::Author));
    }

    #[test]
    fn reviewer_moves_stay_in_review_set() {
        assert!(is_valid_transition_for_role(Mapped, InReview, Role::Reviewer));
        assert!(is_valid_transition_for_role(InReview, Rejected, Role::Reviewer));
        assert!(!is_valid_transition_for_role(Mapped, Draft, Role::Reviewer));
        // Globally illegal regardless of role set.
        assert!(!is_valid_transition_for_role(Draft, Accepted, Role::Reviewer));
    }

    #[test]
    fn only_reconciler_leaves_reconcile() {
        assert!(!is_valid_transition_for_role(Reconcile, Mapped, Role::Author));
        assert!(!is_valid_transition_for_role(Reconcile, Reconcile, Role::Reviewer));
        assert!(is_valid_transition_for_role(Reconcile, Mapped, Role::Reconciler));
        assert!(!is_valid_transition_for_role(Draft, Mapped, Role::Reconciler));
    }

    #[test]
    fn nothing_enters_reconcile_through_the_table() {
        for from in MapStatus::ALL.into_iter().filter(|s| *s != Reconcile) {
            assert!(!is_valid_transition(from, Reconcile), "{from} -> RECONCILE");
        }
    }

    #[test]
    fn check_transition_reports_endpoints() {
        let err = check_transition(Accepted, Draft, Role::Author).expect_err("must reject");
        assert_eq!(
            err,
            TransitionError::InvalidStateTransition {
                from: Accepted,
                to: Draft,
                role: Role::Author,
            }
        );
        assert_eq!(
            err.to_string(),
            "invalid status transition from ACCEPTED to DRAFT for author"
        );
    }

    #[test]
    fn author_state_predicate() {
        let author: Vec<MapStatus> = MapStatus::ALL
            .into_iter()
            .filter(|s| is_author_state(*s))
            .collect();
        assert_eq!(author, vec![Unmapped, Draft, Mapped]);
    }

    #[test]
    fn status_parses_case_insensitively_and_serializes_uppercase() {
        assert_eq!("inreview".parse::<MapStatus>(), Ok(InReview));
        assert!("done".parse::<MapStatus>().is_err());
        assert_eq!(
            serde_json::to_string(&InReview).expect("serialize"),
            "\"INREVIEW\""
        );
    }
}
