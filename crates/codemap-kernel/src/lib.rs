//! # Codemap Kernel
//!
//! The two pure building blocks of the mapping workflow:
//!
//! - **Row specifications**: a compact, canonical text encoding of an
//!   arbitrarily large set of 1-based row indices (`2-10,14,20-25` or `*`),
//!   with parse / serialize / normalize / subtract over a code-set limit.
//! - **Status machine**: the table of legal `MapStatus` moves, globally and
//!   per acting role.
//!
//! ## Architecture
//!
//! ```text
//! RowSpecCodec          ← text ⇄ RangeSet under a code-set limit
//!     │
//! RangeSet              ← Empty | Bounded(disjoint ranges) | All
//!     │
//! RowRange              ← half-open [start, end) over RowIndex
//!
//! MapStatus × Role      ← transition table + role gating
//! ```
//!
//! Everything here is deterministic and allocation-light; the store and
//! workflow crates build on it.

pub mod error;
pub mod row_spec;
pub mod status;

pub use error::{FormatProblem, RowSpecError, TransitionError};
pub use row_spec::{
    ALL_ROWS, BindingPartition, MAX_ROW_INDEX, RangeSet, RowIndex, RowRange, RowSpecCodec,
    RowSpecification,
};
pub use status::{
    MapStatus, Role, check_transition, is_author_state, is_valid_transition,
    is_valid_transition_for_role,
};
