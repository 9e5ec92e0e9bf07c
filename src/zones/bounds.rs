use crate::error::{DbmError, Result};

use super::constraint::{Clock, Limit, REFERENCE};

/// The largest constants each clock is compared against, split into lower
/// bound constants (x > c, x ≥ c) and upper bound constants (x < c, x ≤ c).
/// A negative constant means the clock is never compared in that direction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bounds {
    lower: Box<[Limit]>,
    upper: Box<[Limit]>,
}

impl Bounds {
    /// Bounds where no clock is ever compared.
    pub fn unused(dimensions: Clock) -> Self {
        let mut bounds = Self {
            lower: vec![-1; dimensions as usize].into_boxed_slice(),
            upper: vec![-1; dimensions as usize].into_boxed_slice(),
        };
        bounds.fix_reference();
        bounds
    }

    /// The same maximal constant for both directions.
    pub fn max(maximums: &[Limit]) -> Self {
        let mut bounds = Self {
            lower: maximums.into(),
            upper: maximums.into(),
        };
        bounds.fix_reference();
        bounds
    }

    pub fn lu(lower: &[Limit], upper: &[Limit]) -> Result<Self> {
        if lower.len() != upper.len() {
            return Err(DbmError::DimensionMismatch {
                expected: lower.len(),
                found: upper.len(),
            });
        }

        let mut bounds = Self {
            lower: lower.into(),
            upper: upper.into(),
        };
        bounds.fix_reference();
        Ok(bounds)
    }

    fn fix_reference(&mut self) {
        if let Some(lower) = self.lower.first_mut() {
            *lower = 0;
        }
        if let Some(upper) = self.upper.first_mut() {
            *upper = 0;
        }
    }

    /// Returns the number of clocks including the reference clock.
    pub fn dimensions(&self) -> Clock {
        self.lower.len() as Clock
    }

    pub fn lower(&self, clock: Clock) -> Limit {
        self.lower[clock as usize]
    }

    pub fn upper(&self, clock: Clock) -> Limit {
        self.upper[clock as usize]
    }

    /// The larger of the two constants.
    pub fn maximum(&self, clock: Clock) -> Limit {
        self.lower(clock).max(self.upper(clock))
    }

    pub fn is_unused(&self, clock: Clock) -> bool {
        self.lower(clock) < 0 && self.upper(clock) < 0
    }

    /// Raises the lower bound constant of the clock. The reference clock
    /// keeps its zero constants.
    pub fn loosen_lower(&mut self, clock: Clock, limit: Limit) {
        if clock != REFERENCE && limit > self.lower(clock) {
            self.lower[clock as usize] = limit;
        }
    }

    pub fn loosen_upper(&mut self, clock: Clock, limit: Limit) {
        if clock != REFERENCE && limit > self.upper(clock) {
            self.upper[clock as usize] = limit;
        }
    }

    /// Collapses the split constants into one maximum per clock.
    pub fn to_max(&self) -> Self {
        let mut bounds = Self::unused(self.dimensions());
        for clock in REFERENCE..self.dimensions() {
            bounds.loosen_lower(clock, self.maximum(clock));
            bounds.loosen_upper(clock, self.maximum(clock));
        }
        bounds
    }
}
