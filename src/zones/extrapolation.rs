use log::debug;

use super::{
    bounds::Bounds,
    constraint::{Clock, Limit, Relation, INFINITY, REFERENCE, ZERO},
    dbm::{Canonical, DBM},
};

/// True if the relation allows values beyond the constant, where a
/// negative constant is never compared against.
fn exceeds(relation: Relation, limit: Limit) -> bool {
    limit < 0 || relation > Relation::weak(limit)
}

/// True if the lower bound (0, i) forces the clock strictly above the constant.
fn lower_exceeds(lower: Relation, limit: Limit) -> bool {
    limit < 0 || lower < Relation::weak(-limit)
}

/// The loosest relation still telling the clock is above the constant.
fn floor(limit: Limit) -> Relation {
    if limit < 0 {
        return INFINITY;
    }
    Relation::strict(-limit)
}

impl DBM<Canonical> {
    /// Rewrites every finite relation off the diagonal with the rule and
    /// closes again. The rule sees the lower bounds as they were before.
    fn extrapolate_with<F>(self, bounds: &Bounds, rule: F) -> Self
    where
        F: Fn(Clock, Clock, Relation, &[Relation]) -> Relation,
    {
        assert_eq!(
            bounds.dimensions(),
            self.dimensions(),
            "inconsistent bounds dimension"
        );

        let lower = self.lower_relations();
        let mut dbm = self.dirty();
        let mut loosened = 0;
        for i in REFERENCE..dbm.dimensions() {
            for j in REFERENCE..dbm.dimensions() {
                let relation = dbm[(i, j)];
                if i == j || relation.is_infinity() {
                    continue;
                }

                let mut extrapolated = rule(i, j, relation, &lower[..]);
                if i == REFERENCE {
                    extrapolated = extrapolated.min(ZERO);
                }
                if dbm.loosens(i, j, extrapolated) {
                    dbm.loosen(i, j, extrapolated);
                    loosened += 1;
                }
            }
        }

        debug!("extrapolation loosened {} relations", loosened);
        dbm.close_loosened()
    }

    /// Classical maximum bounds extrapolation.
    pub fn extrapolate_max_bounds(self, bounds: &Bounds) -> Self {
        self.extrapolate_with(bounds, |i, j, relation, _| {
            if exceeds(relation, bounds.maximum(i)) {
                INFINITY
            } else if relation < floor(bounds.maximum(j)) {
                floor(bounds.maximum(j))
            } else {
                relation
            }
        })
    }

    /// Maximum bounds extrapolation which also drops the relations of
    /// clocks already above their constant.
    pub fn diagonal_extrapolate_max_bounds(self, bounds: &Bounds) -> Self {
        self.extrapolate_with(bounds, |i, j, relation, lower| {
            let above_j = lower_exceeds(lower[j as usize], bounds.maximum(j));
            if exceeds(relation, bounds.maximum(i)) {
                INFINITY
            } else if i != REFERENCE
                && (lower_exceeds(lower[i as usize], bounds.maximum(i)) || above_j)
            {
                INFINITY
            } else if i == REFERENCE && above_j {
                floor(bounds.maximum(j))
            } else {
                relation
            }
        })
    }

    /// Extrapolation with separate lower and upper bound constants.
    pub fn extrapolate_lu_bounds(self, bounds: &Bounds) -> Self {
        self.extrapolate_with(bounds, |i, j, relation, _| {
            if exceeds(relation, bounds.lower(i)) {
                INFINITY
            } else if relation < floor(bounds.upper(j)) {
                floor(bounds.upper(j))
            } else {
                relation
            }
        })
    }

    /// The coarsest of the extrapolations.
    pub fn diagonal_extrapolate_lu_bounds(self, bounds: &Bounds) -> Self {
        self.extrapolate_with(bounds, |i, j, relation, lower| {
            let above_j = lower_exceeds(lower[j as usize], bounds.upper(j));
            if exceeds(relation, bounds.lower(i)) {
                INFINITY
            } else if i != REFERENCE
                && (lower_exceeds(lower[i as usize], bounds.lower(i)) || above_j)
            {
                INFINITY
            } else if i == REFERENCE && above_j {
                floor(bounds.upper(j))
            } else {
                relation
            }
        })
    }
}
