use bitset::BitSet;
use log::trace;

use super::{
    constraint::{Clock, Relation, INFINITY, REFERENCE, ZERO},
    dbm::{is_set, Canonical, Unsafe, DBM},
};

impl DBM<Canonical> {
    /// The up operation computes the strongest postcondition of a zone with respect to delay.
    /// Afterwards the DBM contains the clock assignments that can be reached from by delay.
    /// up(D) = {u + d | u ∈ D, d ∈ ℝ+}.
    /// This operation preserves the canonical form thereby applying it on a canonical DBM
    /// will result in a new canonical DBM.
    pub fn up(mut self) -> Self {
        for i in REFERENCE + 1..self.dimensions() {
            self.set(i, REFERENCE, INFINITY);
        }
        self
    }

    /// Delay where the clocks in `stopped` keep their value. The reference
    /// clock is always stopped. The canonical form is preserved.
    pub fn up_stop(mut self, stopped: &BitSet) -> Self {
        for i in REFERENCE + 1..self.dimensions() {
            if is_set(stopped, i as usize) {
                continue;
            }

            for j in REFERENCE..self.dimensions() {
                if j == REFERENCE || (j != i && is_set(stopped, j as usize)) {
                    self.set(i, j, INFINITY);
                }
            }
        }
        self
    }

    /// In contrast to Up, Down computes the weakest precondition of the DBM with respect to delay.
    /// down(D) = {u | u + d ∈ D, d ∈ ℝ+} such that the set of clock assignments that can reach D
    /// by some delay d. Algorithmically, the lower bound of every clock is
    /// lowered to the tightest difference constraint towards it or (0, ≤).
    pub fn down(mut self) -> Self {
        for j in REFERENCE + 1..self.dimensions() {
            let lower = self.lowest(j);
            self.set(REFERENCE, j, lower);
        }
        self
    }

    /// Down which only lowers the clocks from `first` and onwards. The lower
    /// bounds of the other clocks can tighten the lowered ones again, so the
    /// DBM is closed afterwards.
    pub fn down_from(self, first: Clock) -> Self {
        if first <= REFERENCE + 1 {
            return self.down();
        }

        let mut dbm = self.dirty();
        for j in first..dbm.dimensions() {
            let mut lower = ZERO;
            for i in REFERENCE + 1..dbm.dimensions() {
                lower = lower.min(dbm[(i, j)]);
            }
            dbm.loosen(REFERENCE, j, lower);
        }
        dbm.close_loosened()
    }

    /// The tightest difference constraint towards the clock or (0, ≤).
    fn lowest(&self, clock: Clock) -> Relation {
        (REFERENCE + 1..self.dimensions())
            .map(|i| self[(i, clock)])
            .fold(ZERO, Relation::min)
    }

    /// Down where the clocks in `stopped` keep their value.
    pub fn down_stop(self, stopped: &BitSet) -> Self {
        let running = |clock: Clock| clock != REFERENCE && !is_set(stopped, clock as usize);
        let mut dbm = self.dirty();

        for j in REFERENCE + 1..dbm.dimensions() {
            if !running(j) {
                continue;
            }

            let mut lower = ZERO;
            for i in REFERENCE + 1..dbm.dimensions() {
                if running(i) {
                    lower = lower.min(dbm[(i, j)]);
                }
            }
            dbm.loosen(REFERENCE, j, lower);

            for i in REFERENCE + 1..dbm.dimensions() {
                if !running(i) {
                    let upper = dbm.upper(i);
                    dbm.loosen(i, j, upper);
                }
            }
        }

        dbm.close_loosened()
    }

    /// Makes the upper bounds of the clock weak, i.e., its row.
    pub fn relax_up_clock(self, clock: Clock) -> Self {
        let mut dbm = self.dirty();
        for j in REFERENCE..dbm.dimensions() {
            if j != clock {
                dbm.weaken(clock, j);
            }
        }
        dbm.close_loosened()
    }

    /// Makes the lower bounds of the clock weak, i.e., its column.
    pub fn relax_down_clock(self, clock: Clock) -> Self {
        let mut dbm = self.dirty();
        for i in REFERENCE..dbm.dimensions() {
            if i != clock {
                dbm.weaken(i, clock);
            }
        }
        dbm.close_loosened()
    }

    /// Makes every upper bound weak.
    pub fn relax_up(self) -> Self {
        self.relax_down_clock(REFERENCE)
    }

    /// Makes every lower bound weak.
    pub fn relax_down(self) -> Self {
        self.relax_up_clock(REFERENCE)
    }

    /// Makes every relation weak.
    pub fn relax_all(self) -> Self {
        let mut dbm = self.dirty();
        for i in REFERENCE..dbm.dimensions() {
            for j in REFERENCE..dbm.dimensions() {
                if i != j {
                    dbm.weaken(i, j);
                }
            }
        }
        dbm.close_loosened()
    }

    /// Makes every finite upper bound strict.
    pub fn tighten_up(self) -> Result<Self, DBM<Unsafe>> {
        let mut dbm = self.dirty();
        for i in REFERENCE + 1..dbm.dimensions() {
            if !dbm.upper(i).is_infinity() {
                dbm.strengthen(i, REFERENCE);
            }
        }
        trace!("tightened upper bounds");
        dbm.clean()
    }

    /// Makes every lower bound strict.
    pub fn tighten_down(self) -> Result<Self, DBM<Unsafe>> {
        let mut dbm = self.dirty();
        for j in REFERENCE + 1..dbm.dimensions() {
            dbm.strengthen(REFERENCE, j);
        }
        trace!("tightened lower bounds");
        dbm.clean()
    }
}
