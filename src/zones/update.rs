use log::trace;

use super::{
    constraint::{Clock, Limit, Relation, INFINITY, REFERENCE, ZERO},
    dbm::{Canonical, DBM},
};

impl DBM<Canonical> {
    /// Sets the clock to be assigned to its limit. This is expressed as {u[x=m] | u ∈ D}.
    pub fn update_value(self, clock: Clock, limit: Limit) -> Self {
        assert!(limit >= 0, "clocks cannot be assigned negative values");
        self.update(clock, REFERENCE, limit)
    }

    /// Sets the lhs to be equal to the rhs. This is expressed as {u[x=u(y)] | u ∈ D}
    pub fn update_clock(self, lhs: Clock, rhs: Clock) -> Self {
        if lhs == rhs {
            return self;
        }
        self.update(lhs, rhs, 0)
    }

    /// Compound addition assignment of the clock "clock := clock + limit".
    /// The zone must keep the clock non-negative.
    pub fn update_increment(mut self, clock: Clock, limit: Limit) -> Self {
        assert_ne!(clock, REFERENCE, "cannot update the reference clock");
        let positive = Relation::weak(limit);
        let negative = Relation::weak(-limit);
        for i in REFERENCE..self.dimensions() {
            if i != clock {
                let from = self.get(clock, i);
                self.set(clock, i, from.addition(&positive));
                let to = self.get(i, clock);
                self.set(i, clock, to.addition(&negative));
            }
        }

        debug_assert!(self.lower(clock) <= ZERO, "clock {} became negative", clock);
        self
    }

    /// The general update "lhs := rhs + limit". The zone must keep the
    /// result non-negative.
    pub fn update(mut self, lhs: Clock, rhs: Clock, limit: Limit) -> Self {
        assert_ne!(lhs, REFERENCE, "cannot update the reference clock");
        if lhs == rhs {
            return self.update_increment(lhs, limit);
        }

        trace!("x{} := x{} + {}", lhs, rhs, limit);
        let positive = Relation::weak(limit);
        let negative = Relation::weak(-limit);
        for k in REFERENCE..self.dimensions() {
            if k != lhs {
                self.set(lhs, k, self.get(rhs, k).addition(&positive));
                self.set(k, lhs, self.get(k, rhs).addition(&negative));
            }
        }

        debug_assert!(self.lower(lhs) <= ZERO, "clock {} became negative", lhs);
        self
    }

    /// Removes all constraints on a given clock, i.e., the clock may take any positive value.
    /// This is expressed as {u[x=d] | u ∈ D, d ∈ ℝ+}.
    pub fn free_clock(mut self, clock: Clock) -> Self {
        assert_ne!(clock, REFERENCE, "cannot free the reference clock");
        for i in REFERENCE..self.dimensions() {
            if i != clock {
                self.set(clock, i, INFINITY);
                self.set(i, clock, self.upper(i));
            }
        }
        self
    }

    /// Removes the upper bounds of the clock.
    pub fn free_up(mut self, clock: Clock) -> Self {
        assert_ne!(clock, REFERENCE, "cannot free the reference clock");
        for i in REFERENCE..self.dimensions() {
            if i != clock {
                self.set(clock, i, INFINITY);
            }
        }
        self
    }

    /// Removes the upper bounds of all clocks.
    pub fn free_all_up(mut self) -> Self {
        for i in REFERENCE + 1..self.dimensions() {
            for j in REFERENCE..self.dimensions() {
                if i != j {
                    self.set(i, j, INFINITY);
                }
            }
        }
        self
    }

    pub fn is_freed_all_up(&self) -> bool {
        (REFERENCE + 1..self.dimensions()).all(|i| {
            (REFERENCE..self.dimensions()).all(|j| i == j || self[(i, j)].is_infinity())
        })
    }

    /// Removes the lower bounds of the clock, it may go down to zero.
    pub fn free_down(mut self, clock: Clock) -> Self {
        assert_ne!(clock, REFERENCE, "cannot free the reference clock");
        for i in REFERENCE..self.dimensions() {
            if i != clock {
                self.set(i, clock, self.upper(i));
            }
        }
        self
    }

    /// Removes the lower bounds of all clocks.
    pub fn free_all_down(mut self) -> Self {
        for i in REFERENCE..self.dimensions() {
            for j in REFERENCE + 1..self.dimensions() {
                if i != j {
                    self.set(i, j, self.upper(i));
                }
            }
        }
        self
    }

    /// Returns the first relation which [`DBM::free_all_down`] would change.
    pub fn test_free_all_down(&self) -> Option<(Clock, Clock)> {
        for i in REFERENCE..self.dimensions() {
            for j in REFERENCE + 1..self.dimensions() {
                if i != j && self[(i, j)] != self.upper(i) {
                    return Some((i, j));
                }
            }
        }
        None
    }

    /// Exchanges the rows and columns of the two clocks.
    pub fn swap_clocks(mut self, x: Clock, y: Clock) -> Self {
        if x == y {
            return self;
        }

        for k in REFERENCE..self.dimensions() {
            let xk = self.get(x, k);
            self.set(x, k, self.get(y, k));
            self.set(y, k, xk);
        }
        for k in REFERENCE..self.dimensions() {
            let kx = self.get(k, x);
            self.set(k, x, self.get(k, y));
            self.set(k, y, kx);
        }
        self
    }
}
