//! Difference bound matrices for the symbolic state space of timed automata.
//!
//! A zone over `n` clocks is stored as an `(n + 1) x (n + 1)` matrix of
//! [`zones::constraint::Relation`]s where clock 0 is the reference clock.
//! Operations consume a [`zones::dbm::DBM`] in one state and return it in
//! another, so an empty zone can never be used where a closed one is expected.

pub mod error;
pub mod zones;

pub use error::{DbmError, Result};
pub use zones::{
    algebra::ZoneRelation,
    bounds::Bounds,
    constraint::{Clock, Constraint, Limit, Relation, Strictness, INFINITY, REFERENCE, ZERO},
    dbm::{Canonical, Dirty, Unsafe, DBM},
};
