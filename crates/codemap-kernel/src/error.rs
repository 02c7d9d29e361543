//! Error types for kernel operations.

use std::fmt::{Display, Formatter};

use crate::status::{MapStatus, Role};

/// Errors raised while reading or normalizing a row specification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowSpecError {
    /// The text is not a well-formed row specification.
    #[error("invalid row specification fragment `{fragment}`: {problem}")]
    SpecificationFormat {
        fragment: String,
        problem: FormatProblem,
    },

    /// The specification selects nothing once clipped to the code set.
    #[error("row specification `{specification}` selects no rows within 1-{limit}")]
    EmptySpecification { specification: String, limit: u64 },
}

impl RowSpecError {
    pub(crate) fn format(fragment: impl Into<String>, problem: FormatProblem) -> Self {
        Self::SpecificationFormat {
            fragment: fragment.into(),
            problem,
        }
    }
}

/// Why a fragment of a row specification was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatProblem {
    /// Empty or whitespace-only input.
    Blank,
    /// An empty element between separators (`1,,2`, trailing comma).
    EmptyElement,
    /// Not an integer or `lo-hi` pair.
    Malformed,
    /// Zero or negative row index.
    NonPositive,
    /// Larger than the largest representable row index.
    Overflow,
    /// `*` combined with other elements.
    WildcardMixed,
}

impl Display for FormatProblem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Blank => "specification is empty",
            Self::EmptyElement => "empty element between separators",
            Self::Malformed => "expected an index or an index range `lo-hi`",
            Self::NonPositive => "row indices start at 1",
            Self::Overflow => "row index is out of range",
            Self::WildcardMixed => "`*` cannot be combined with other elements",
        };
        f.write_str(text)
    }
}

/// A status move rejected by the transition table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("invalid status transition from {from} to {to} for {role}")]
    InvalidStateTransition {
        from: MapStatus,
        to: MapStatus,
        role: Role,
    },
}
