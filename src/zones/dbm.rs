use std::{
    collections::hash_map::DefaultHasher,
    fmt,
    hash::{Hash, Hasher},
    ops::{Index, IndexMut},
};

use bitset::BitSet;
use itertools::Itertools;
use log::{debug, trace};

use crate::error::{self, DbmError};

use super::constraint::{Clock, Constraint, Limit, Relation, INFINITY, REFERENCE, ZERO};

pub trait DBMState: Sized {}

/// Tests the bit of a clock set. Bits past the end of the set are unset.
pub(crate) fn is_set(bits: &BitSet, index: usize) -> bool {
    index < bits.size() && bits.test(index)
}

#[derive(Clone, Debug)]
pub struct DBM<State: DBMState> {
    /// The number of clocks inside the DBM including the reference clock.
    clocks: Clock,
    /// The relations between the clocks stored row by row.
    relations: Box<[Relation]>,
    /// The internal state important for the current type of DBM.
    state: State,
}

impl<State: DBMState> DBM<State> {
    /// Returns the number of clocks excluding the reference clock.
    pub const fn clocks(&self) -> Clock {
        self.clocks - 1
    }

    /// Returns the number of clocks including the reference clock.
    pub const fn dimensions(&self) -> Clock {
        self.clocks
    }

    pub const fn constraints(&self) -> usize {
        self.clocks as usize * self.clocks as usize
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn into_relations(self) -> Box<[Relation]> {
        self.relations
    }

    /// Uses the row-wise indexing and not the layered approach since we have the clock set in the DBM.
    ///
    /// Eg. 3 clocks (including the reference clock) DBM indexing "(row; column)-index":
    ///
    /// [(0; 0)-0, (0; 1)-1, (0; 2)-2]
    ///
    /// [(1; 0)-3, (1; 1)-4, (1; 2)-5]
    ///
    /// [(2; 0)-6, (2; 1)-7, (2; 2)-8]
    #[inline]
    pub const fn index(&self, i: Clock, j: Clock) -> usize {
        i as usize * self.clocks as usize + j as usize
    }

    #[inline]
    pub const fn coordinates(&self, index: usize) -> (Clock, Clock) {
        let i = (index / self.clocks as usize) as Clock;
        let j = (index % self.clocks as usize) as Clock;
        (i, j)
    }

    #[inline]
    pub(crate) fn get(&self, i: Clock, j: Clock) -> Relation {
        self.relations[self.index(i, j)]
    }

    #[inline]
    pub(crate) fn set(&mut self, i: Clock, j: Clock, relation: Relation) {
        let index = self.index(i, j);
        self.relations[index] = relation
    }

    /// Returns true if the relation is tighter than the current one on (i, j).
    #[inline]
    pub fn tightens(&self, i: Clock, j: Clock, relation: Relation) -> bool {
        relation < self.get(i, j)
    }

    #[inline]
    pub fn loosens(&self, i: Clock, j: Clock, relation: Relation) -> bool {
        relation > self.get(i, j)
    }

    #[inline]
    pub fn upper(&self, clock: Clock) -> Relation {
        self.get(clock, REFERENCE)
    }

    #[inline]
    pub fn lower(&self, clock: Clock) -> Relation {
        self.get(REFERENCE, clock)
    }

    pub fn lower_relations(&self) -> Vec<Relation> {
        (REFERENCE..self.dimensions())
            .map(|clock| self.lower(clock))
            .collect()
    }

    pub fn upper_relations(&self) -> Vec<Relation> {
        (REFERENCE..self.dimensions())
            .map(|clock| self.upper(clock))
            .collect()
    }

    fn assert_clocks(&self, i: Clock, j: Clock) {
        assert!(
            i < self.dimensions() && j < self.dimensions(),
            "clocks ({}, {}) are outside a DBM of dimension {}",
            i,
            j,
            self.dimensions()
        );
    }

    /// A DBM is empty when a clock is not at distance zero from itself.
    #[inline]
    pub fn is_empty(&self) -> bool {
        (REFERENCE..self.dimensions()).any(|c| self.get(c, c) < ZERO)
    }

    /// Returns true if every diagonal entry is exactly (0, ≤).
    pub fn is_diagonal_ok(&self) -> bool {
        (REFERENCE..self.dimensions()).all(|c| self.get(c, c) == ZERO)
    }

    /// Returns true if the DBM is the one created by [`DBM::init`].
    pub fn is_init(&self) -> bool {
        (REFERENCE..self.dimensions())
            .cartesian_product(REFERENCE..self.dimensions())
            .all(|(i, j)| {
                let expected = if i == j || i == REFERENCE {
                    ZERO
                } else {
                    INFINITY
                };
                self.get(i, j) == expected
            })
    }

    /// Returns true if the DBM is the one created by [`DBM::zero`].
    pub fn is_zero(&self) -> bool {
        self.relations.iter().all(|relation| relation.is_zero())
    }

    /// Returns true if the origin, where all clocks are zero, is included.
    pub fn has_zero(&self) -> bool {
        self.relations.iter().all(|relation| *relation >= ZERO)
    }

    /// Returns true if some clock has no upper bound.
    pub fn is_unbounded(&self) -> bool {
        (REFERENCE + 1..self.dimensions()).any(|clock| self.upper(clock).is_infinity())
    }

    /// The largest absolute finite limit, or zero if none is finite.
    pub fn max_range(&self) -> Limit {
        self.relations
            .iter()
            .filter(|relation| !relation.is_infinity())
            .map(|relation| relation.limit().abs())
            .max()
            .unwrap_or(0)
    }

    /// Structural validity: the diagonal is (0, ≤), every finite relation is
    /// representable, clocks are non-negative and the matrix is closed.
    pub fn is_valid(&self) -> bool {
        self.is_diagonal_ok()
            && self.relations.iter().all(Relation::is_valid)
            && (REFERENCE..self.dimensions()).all(|clock| self.lower(clock) <= ZERO)
            && self.is_closed()
    }

    pub fn is_closed(&self) -> bool {
        let dbm: DBM<Dirty> = DBM {
            clocks: self.clocks,
            relations: self.relations.clone(),
            state: Dirty::all(self.clocks),
        };
        match dbm.close() {
            Ok(cleaned) => self.relations == cleaned.relations,
            Err(_) => false,
        }
    }

    pub fn satisfies(&self, i: Clock, j: Clock, relation: Relation) -> bool {
        let ij = self.get(i, j);
        let ji = self.get(j, i);
        ij <= relation || ji > relation.negation()
    }

    pub fn satisfies_constraint(&self, constraint: &Constraint) -> bool {
        self.satisfies(constraint.i(), constraint.j(), constraint.relation())
    }

    /// Returns true if the integer valuation is inside the zone. The first
    /// entry is the reference clock and must be zero.
    pub fn is_point_included(&self, point: &[Limit]) -> bool {
        assert_eq!(point.len(), self.dimensions() as usize, "inconsistent point dimension");
        (REFERENCE..self.dimensions())
            .cartesian_product(REFERENCE..self.dimensions())
            .all(|(i, j)| {
                let difference = point[i as usize] as i64 - point[j as usize] as i64;
                let relation = self.get(i, j);
                relation.is_infinity() || difference < relation.limit() as i64
                    || (difference == relation.limit() as i64 && relation.is_weak())
            })
    }

    /// Returns true if the real valuation is inside the zone.
    pub fn is_real_point_included(&self, point: &[f64]) -> bool {
        assert_eq!(point.len(), self.dimensions() as usize, "inconsistent point dimension");
        (REFERENCE..self.dimensions())
            .cartesian_product(REFERENCE..self.dimensions())
            .all(|(i, j)| {
                let difference = point[i as usize] - point[j as usize];
                let relation = self.get(i, j);
                let limit = relation.limit() as f64;
                relation.is_infinity()
                    || difference < limit
                    || (difference == limit && relation.is_weak())
            })
    }

    /// A stable fingerprint of the dimension and all relations.
    pub fn hash_value(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    fn empty(self) -> DBM<Unsafe> {
        debug_assert!(self.is_empty());
        debug!("DBM of dimension {} is empty", self.dimensions());
        DBM {
            clocks: self.clocks,
            relations: self.relations,
            state: Unsafe {},
        }
    }

    /// Records that i -> j -> i is a negative cycle before giving up the zone.
    pub(crate) fn contradiction(mut self, i: Clock, j: Clock) -> DBM<Unsafe> {
        let cycle = self.get(i, j).addition(&self.get(j, i));
        trace!("negative cycle {} -> {} -> {} of {}", i, j, i, cycle);
        self.set(i, i, cycle);
        self.empty()
    }

    /// Reuses the storage for rewriting, no clock is touched yet.
    pub(crate) fn into_dirty(self) -> DBM<Dirty> {
        let clocks = self.dimensions();
        DBM {
            clocks: self.clocks,
            relations: self.relations,
            state: Dirty::new(clocks),
        }
    }

    fn into_canonical(self) -> DBM<Canonical> {
        DBM {
            clocks: self.clocks,
            relations: self.relations,
            state: Canonical {},
        }
    }

    pub fn fmt_conjunctions(&self, labels: &[&str]) -> String {
        let mut conjunctions: Vec<String> = Vec::new();

        for i in REFERENCE + 1..self.dimensions() {
            // Lower bound: 0 - c R N.
            let lower = self.lower(i);
            if !lower.is_infinity() {
                conjunctions.push(format!(
                    "-{} {} {}",
                    labels[(i - 1) as usize],
                    lower.strictness(),
                    lower.limit()
                ));
            }

            // Upper bound: c - 0 R N.
            let upper = self.upper(i);
            if !upper.is_infinity() {
                conjunctions.push(format!(
                    "{} {} {}",
                    labels[(i - 1) as usize],
                    upper.strictness(),
                    upper.limit()
                ));
            }

            for j in REFERENCE + 1..self.dimensions() {
                if i == j {
                    continue;
                }

                let relation = self.get(i, j);
                if relation.is_infinity() {
                    continue;
                }

                // Difference constraints: c0 - c1 R N.
                conjunctions.push(format!(
                    "{} - {} {} {}",
                    labels[(i - 1) as usize],
                    labels[(j - 1) as usize],
                    relation.strictness(),
                    relation.limit()
                ));
            }
        }

        conjunctions.join(" ∧ ")
    }
}

impl<State: DBMState> Index<(Clock, Clock)> for DBM<State> {
    type Output = Relation;

    fn index(&self, index: (Clock, Clock)) -> &Self::Output {
        let (i, j) = index;
        &self.relations[self.index(i, j)]
    }
}

impl<State: DBMState> PartialEq for DBM<State> {
    fn eq(&self, other: &Self) -> bool {
        self.clocks == other.clocks && self.relations == other.relations
    }
}

impl<State: DBMState> Eq for DBM<State> {}

impl<State: DBMState> Hash for DBM<State> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.clocks.hash(state);
        self.relations.hash(state);
    }
}

impl<State: DBMState> fmt::Display for DBM<State> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in REFERENCE..self.dimensions() {
            let row = (REFERENCE..self.dimensions())
                .map(|j| self.get(i, j))
                .join(" ");
            writeln!(f, "{}", row)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct Canonical {}
impl DBMState for Canonical {}

impl DBM<Canonical> {
    fn filled(dimensions: Clock, relation: Relation) -> Self {
        assert!(dimensions > 0, "a DBM needs at least the reference clock");
        let size = dimensions as usize * dimensions as usize;
        Self {
            clocks: dimensions,
            relations: vec![relation; size].into_boxed_slice(),
            state: Canonical {},
        }
    }

    /// Returns the most strictly constrained DBM where every clock is zero.
    pub fn zero(dimensions: Clock) -> Self {
        Self::filled(dimensions, ZERO)
    }

    /// Returns an unconstrained DBM where every clock is non-negative.
    pub fn init(dimensions: Clock) -> Self {
        let mut dbm = Self::filled(dimensions, INFINITY);
        for i in REFERENCE..dimensions {
            dbm.set(REFERENCE, i, ZERO);
            dbm.set(i, i, ZERO);
        }
        dbm
    }

    /// Only if the new relation tightens the existing relation
    /// is the relation updated and closed.
    pub fn constrain(
        mut self,
        i: Clock,
        j: Clock,
        relation: Relation,
    ) -> Result<DBM<Canonical>, DBM<Unsafe>> {
        self.assert_clocks(i, j);
        assert_ne!(i, j, "cannot constrain a clock against itself");
        if !self.tightens(i, j, relation) {
            return Ok(self);
        }

        if relation.addition(&self.get(j, i)) < ZERO {
            self.set(i, j, relation);
            return Err(self.contradiction(i, j));
        }

        self.set(i, j, relation);
        self.close_ij(i, j)
    }

    pub fn constrain_constraint(self, constraint: &Constraint) -> Result<Self, DBM<Unsafe>> {
        self.constrain(constraint.i(), constraint.j(), constraint.relation())
    }

    /// Constrains the clock to exactly the value.
    pub fn constrain_clock(self, clock: Clock, limit: Limit) -> Result<Self, DBM<Unsafe>> {
        assert_ne!(clock, REFERENCE, "cannot constrain the reference clock");
        self.constrain(clock, REFERENCE, Relation::weak(limit))?
            .constrain(REFERENCE, clock, Relation::weak(-limit))
    }

    /// Applies all constraints before closing once.
    pub fn constrain_all(self, constraints: &[Constraint]) -> Result<Self, DBM<Unsafe>> {
        if let [constraint] = constraints {
            return self.constrain_constraint(constraint);
        }

        debug!("constraining with {} constraints", constraints.len());
        let mut dbm = self.dirty();
        for constraint in constraints {
            if !dbm.constrain(constraint.i(), constraint.j(), constraint.relation()) {
                return Err(dbm.contradiction(constraint.i(), constraint.j()));
            }
        }
        dbm.clean()
    }

    /// Same as [`DBM::constrain_all`] but the clocks of the constraints are
    /// positions in the table which holds the actual clocks of the DBM.
    pub fn constrain_indexed(
        self,
        table: &[Clock],
        constraints: &[Constraint],
    ) -> Result<Self, DBM<Unsafe>> {
        let translated: Vec<Constraint> = constraints
            .iter()
            .map(|constraint| {
                Constraint::new(
                    table[constraint.i() as usize],
                    table[constraint.j() as usize],
                    constraint.relation(),
                )
            })
            .collect();
        self.constrain_all(&translated)
    }

    /// Closes the DBM after (i, j) was tightened. The rest of the DBM must be closed.
    pub fn close_ij(mut self, i: Clock, j: Clock) -> Result<DBM<Canonical>, DBM<Unsafe>> {
        let ij = self.get(i, j);
        if ij.is_infinity() {
            return Ok(self);
        }

        for k in REFERENCE..self.dimensions() {
            let jk = self.get(j, k);
            if jk.is_infinity() {
                continue;
            }

            let ik = ij.addition(&jk);
            if self.get(i, k) > ik {
                self.set(i, k, ik);
            }
        }

        for p in REFERENCE..self.dimensions() {
            let pi = self.get(p, i);
            if pi.is_infinity() {
                continue;
            }

            let pj = pi.addition(&ij);
            if self.get(p, j) <= pj {
                continue;
            }

            self.set(p, j, pj);

            for q in REFERENCE..self.dimensions() {
                let jq = self.get(j, q);
                if jq.is_infinity() {
                    continue;
                }

                let pq = pj.addition(&jq);
                if self.get(p, q) > pq {
                    self.set(p, q, pq);
                }
            }
        }

        if self.is_empty() {
            return Err(self.empty());
        }
        Ok(self)
    }

    pub fn dirty(self) -> DBM<Dirty> {
        self.into_dirty()
    }
}

#[derive(Clone, Debug)]
pub struct Unsafe {}
impl DBMState for Unsafe {}

impl DBM<Unsafe> {
    /// Reuses the storage of the empty zone for an unconstrained zone.
    pub fn into_init(self) -> DBM<Canonical> {
        let mut dbm = self.reset(INFINITY);
        for i in REFERENCE..dbm.dimensions() {
            dbm.set(REFERENCE, i, ZERO);
            dbm.set(i, i, ZERO);
        }
        dbm
    }

    /// Reuses the storage of the empty zone for the zero zone.
    pub fn into_zero(self) -> DBM<Canonical> {
        self.reset(ZERO)
    }

    fn reset(mut self, relation: Relation) -> DBM<Canonical> {
        self.relations.fill(relation);
        self.into_canonical()
    }
}

pub struct Dirty {
    flags: BitSet,
}

impl DBMState for Dirty {}

impl Dirty {
    pub fn new(clocks: Clock) -> Self {
        Self {
            flags: BitSet::with_capacity(clocks as usize),
        }
    }

    fn all(clocks: Clock) -> Self {
        let mut dirty = Self::new(clocks);
        for clock in REFERENCE..clocks {
            dirty.touch(clock);
        }
        dirty
    }

    pub fn any_touched(&self) -> bool {
        self.flags.any()
    }

    pub fn is_touched(&self, clock: Clock) -> bool {
        self.flags.test(clock as usize)
    }

    pub fn touched(&self) -> &BitSet {
        &self.flags
    }

    fn touch(&mut self, clock: Clock) {
        self.flags.set(clock as usize, true);
    }
}

impl DBM<Dirty> {
    pub fn from_relations(relations: Box<[Relation]>) -> error::Result<DBM<Dirty>> {
        if relations.is_empty() {
            return Err(DbmError::EmptyUniverse);
        }

        let mut clocks: usize = 0;
        while clocks * clocks < relations.len() {
            clocks += 1;
        }

        if clocks * clocks != relations.len() || clocks > Clock::MAX as usize {
            return Err(DbmError::NotSquare {
                len: relations.len(),
            });
        }

        Ok(Self {
            clocks: clocks as Clock,
            relations,
            state: Dirty::all(clocks as Clock),
        })
    }

    pub fn touch(&mut self, clock: Clock) {
        self.state.touch(clock);
    }

    pub fn is_touched(&self, clock: Clock) -> bool {
        self.state.is_touched(clock)
    }

    /// Tightens (i, j) if the relation is tighter. Returns false if the
    /// tightening forms a negative cycle with (j, i).
    pub fn constrain(&mut self, i: Clock, j: Clock, relation: Relation) -> bool {
        self.assert_clocks(i, j);
        self.tighten(i, j, relation);
        self.get(i, j).addition(&self.get(j, i)) >= ZERO
    }

    pub fn tighten(&mut self, i: Clock, j: Clock, relation: Relation) {
        if self.tightens(i, j, relation) {
            self[(i, j)] = relation
        }
    }

    pub fn loosen(&mut self, i: Clock, j: Clock, relation: Relation) {
        if self.loosens(i, j, relation) {
            self[(i, j)] = relation
        }
    }

    /// Relaxes (i, j) by making it weak.
    pub(crate) fn weaken(&mut self, i: Clock, j: Clock) {
        let relation = self.get(i, j);
        if relation.is_strict() && !relation.is_infinity() {
            self[(i, j)] = relation.as_weak();
        }
    }

    /// Tightens (i, j) by making it strict.
    pub(crate) fn strengthen(&mut self, i: Clock, j: Clock) {
        let relation = self.get(i, j);
        if relation.is_weak() {
            self[(i, j)] = relation.as_strict();
        }
    }

    pub fn clean(self) -> Result<DBM<Canonical>, DBM<Unsafe>> {
        // Nothing to clean? Then it must be already closed and canonical.
        if !self.state.any_touched() {
            return Ok(self.into_canonical());
        }

        self.closex()
    }

    /// Closes through the touched clocks only. The DBM must have been closed
    /// before and the relations of touched clocks may only have been tightened.
    pub fn closex(self) -> Result<DBM<Canonical>, DBM<Unsafe>> {
        let pivots = self.pivots(self.state.touched());
        self.close_through(pivots)
    }

    /// Closes through the clocks in the set.
    pub fn close_with(self, clocks: &BitSet) -> Result<DBM<Canonical>, DBM<Unsafe>> {
        let pivots = self.pivots(clocks);
        self.close_through(pivots)
    }

    fn pivots(&self, clocks: &BitSet) -> Vec<Clock> {
        (REFERENCE..self.dimensions())
            .filter(|clock| is_set(clocks, *clock as usize))
            .collect()
    }

    fn close_through(mut self, pivots: Vec<Clock>) -> Result<DBM<Canonical>, DBM<Unsafe>> {
        trace!(
            "closing through {} of {} clocks",
            pivots.len(),
            self.dimensions()
        );

        for k in pivots {
            if !self.pivot(k) {
                return Err(self.empty());
            }
        }
        Ok(self.into_canonical())
    }

    /// Closes through the single clock. Every relation not involving the
    /// clock must be closed, and so must its row and column with respect
    /// to them. This holds after rewriting the row and column of a clock
    /// from relations of a closed DBM.
    pub fn close1(mut self, k: Clock) -> Result<DBM<Canonical>, DBM<Unsafe>> {
        if !self.pivot(k) {
            return Err(self.empty());
        }
        Ok(self.into_canonical())
    }

    /// Closes all clocks (Floyd-Warshall).
    pub fn close(mut self) -> Result<DBM<Canonical>, DBM<Unsafe>> {
        debug!("closing all {} clocks", self.dimensions());
        if self.is_empty() {
            return Err(self.empty());
        }

        for k in REFERENCE..self.dimensions() {
            if !self.pivot(k) {
                return Err(self.empty());
            }
        }
        Ok(self.into_canonical())
    }

    /// Closes after relations were only loosened, which cannot empty a
    /// zone that was non-empty before. A loosened relation may be tightened
    /// again through any clock so every clock is a pivot.
    pub(crate) fn close_loosened(mut self) -> DBM<Canonical> {
        for k in REFERENCE..self.dimensions() {
            let closed = self.pivot(k);
            debug_assert!(closed, "loosening emptied the zone");
        }
        self.into_canonical()
    }

    /// Shortens every path through k. Returns false on a negative cycle.
    fn pivot(&mut self, k: Clock) -> bool {
        for i in REFERENCE..self.dimensions() {
            if i == k {
                continue;
            }

            let ik = self.get(i, k);
            if ik.is_infinity() {
                continue;
            }

            for j in REFERENCE..self.dimensions() {
                let kj = self.get(k, j);
                if kj.is_infinity() {
                    continue;
                }

                let ikj = ik.addition(&kj);
                if self.get(i, j) > ikj {
                    self.set(i, j, ikj);
                }
            }

            if self.get(i, i) < ZERO {
                return false;
            }
        }
        self.get(k, k) >= ZERO
    }
}

impl IndexMut<(Clock, Clock)> for DBM<Dirty> {
    fn index_mut(&mut self, clocks: (Clock, Clock)) -> &mut Self::Output {
        let (i, j) = clocks;
        self.state.touch(i);
        self.state.touch(j);
        let index = self.index(i, j);
        &mut self.relations[index]
    }
}
