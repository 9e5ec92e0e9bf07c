use std::fmt;

use itertools::iproduct;
use log::trace;

use super::{
    constraint::{REFERENCE, ZERO},
    dbm::{Canonical, DBMState, Unsafe, DBM},
};

/// How the valuations of two zones relate.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ZoneRelation {
    Different,
    Superset,
    Subset,
    Equal,
}

impl ZoneRelation {
    pub const fn from_inclusions(subset: bool, superset: bool) -> Self {
        match (subset, superset) {
            (true, true) => ZoneRelation::Equal,
            (true, false) => ZoneRelation::Subset,
            (false, true) => ZoneRelation::Superset,
            (false, false) => ZoneRelation::Different,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            ZoneRelation::Different => "different",
            ZoneRelation::Superset => "superset",
            ZoneRelation::Subset => "subset",
            ZoneRelation::Equal => "equal",
        }
    }

    /// The relation seen from the other zone.
    pub const fn inverse(&self) -> Self {
        match self {
            ZoneRelation::Superset => ZoneRelation::Subset,
            ZoneRelation::Subset => ZoneRelation::Superset,
            other => *other,
        }
    }
}

impl fmt::Display for ZoneRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl DBM<Canonical> {
    fn assert_same_dimensions(&self, other: &Self) {
        if self.dimensions() != other.dimensions() {
            panic!("inconsistent DBM cardinality")
        }
    }

    /// Compares every relation pairwise. As both DBMs are closed, a
    /// pointwise comparison decides inclusion.
    pub fn relation(&self, other: &Self) -> ZoneRelation {
        self.assert_same_dimensions(other);
        let mut subset = true;
        let mut superset = true;

        for (i, j) in iproduct!(REFERENCE..self.dimensions(), REFERENCE..self.dimensions()) {
            if !subset && !superset {
                break;
            }

            let lhs = self[(i, j)];
            let rhs = other[(i, j)];

            subset = subset && (lhs <= rhs);
            superset = superset && (lhs >= rhs);
        }

        ZoneRelation::from_inclusions(subset, superset)
    }

    /// Returns true if self is a subset of other.
    pub fn is_subset_eq(&self, other: &Self) -> bool {
        self.assert_same_dimensions(other);
        self.relations()
            .iter()
            .zip(other.relations().iter())
            .all(|(lhs, rhs)| lhs <= rhs)
    }

    /// Returns true if self is a superset of other.
    pub fn is_superset_eq(&self, other: &Self) -> bool {
        other.is_subset_eq(self)
    }

    /// Returns true if all valuations of self are also in other and vice versa.
    pub fn are_equal(&self, other: &Self) -> bool {
        self == other
    }

    pub fn is_different(&self, other: &Self) -> bool {
        self.relation(other) == ZoneRelation::Different
    }

    /// The smallest zone including both. This over-approximates the set union
    /// when the union is not convex.
    pub fn convex_union(mut self, other: &Self) -> Self {
        self.assert_same_dimensions(other);
        for (i, j) in iproduct!(REFERENCE..self.dimensions(), REFERENCE..other.dimensions()) {
            if self[(i, j)] < other[(i, j)] {
                self.set(i, j, other[(i, j)]);
            }
        }
        self
    }

    // Returns false only if the zones are known to be disjoint. It may return
    // true for disjoint zones when the disjointness needs a longer cycle.
    pub fn have_intersection(&self, other: &Self) -> bool {
        self.assert_same_dimensions(other);

        for i in REFERENCE + 1..self.dimensions() {
            for j in 0..i {
                if self[(i, j)].addition(&other[(j, i)]) < ZERO {
                    return false;
                }

                if other[(i, j)].addition(&self[(j, i)]) < ZERO {
                    return false;
                }
            }
        }

        true
    }

    pub fn intersection(self, src: &Self) -> Result<Self, DBM<Unsafe>> {
        self.assert_same_dimensions(src);

        let mut dst = self.dirty();

        for i in REFERENCE..dst.dimensions() {
            for j in REFERENCE..dst.dimensions() {
                if !dst.constrain(i, j, src[(i, j)]) {
                    trace!("intersection is empty at ({}, {})", i, j);
                    return Err(dst.contradiction(i, j));
                }
            }
        }

        dst.clean()
    }

    pub fn intersects(&self, other: &Self) -> bool {
        self.have_intersection(other) && self.clone().intersection(other).is_ok()
    }

    /// Intersects the zones after making every bound of both weak. The
    /// result is written into the storage of `dst`.
    pub fn relaxed_intersection<S: DBMState>(
        dst: DBM<S>,
        lhs: &Self,
        rhs: &Self,
    ) -> Result<Self, DBM<Unsafe>> {
        lhs.assert_same_dimensions(rhs);
        assert_eq!(
            dst.dimensions(),
            lhs.dimensions(),
            "inconsistent DBM cardinality"
        );

        let mut dst = dst.into_dirty();
        for (i, j) in iproduct!(REFERENCE..lhs.dimensions(), REFERENCE..lhs.dimensions()) {
            let relation = if i == j {
                ZERO
            } else {
                let tightest = lhs[(i, j)].min(rhs[(i, j)]);
                if tightest.is_infinity() {
                    tightest
                } else {
                    tightest.as_weak()
                }
            };
            dst[(i, j)] = relation;
        }

        dst.close()
    }
}
