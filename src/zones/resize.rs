use bitset::BitSet;
use log::debug;

use crate::error::{DbmError, Result};

use super::{
    constraint::{Clock, REFERENCE},
    dbm::{is_set, Canonical, DBMState, Dirty, DBM},
};

/// Position zero is the reference clock and always active.
fn is_active(bits: &BitSet, position: usize) -> bool {
    position == REFERENCE as usize || is_set(bits, position)
}

/// Maps every position of the universe to its index among the active positions.
fn indices(bits: &BitSet, size: usize) -> (Vec<Option<Clock>>, usize) {
    let mut next = 0;
    let table = (0..size)
        .map(|position| {
            if !is_active(bits, position) {
                return None;
            }
            let index = next as Clock;
            next += 1;
            Some(index)
        })
        .collect();
    (table, next)
}

impl DBM<Canonical> {
    /// Moves the zone from the clocks active in `src` to those active in `dst`,
    /// both sets being positions in a universe of `size` clocks. Positions
    /// past the end of a set are inactive. Dropped clocks are projected away
    /// and new clocks are unconstrained. The returned table maps each position to its index in
    /// the new DBM.
    pub fn shrink_expand(
        &self,
        src: &BitSet,
        dst: &BitSet,
        size: usize,
    ) -> Result<(DBM<Canonical>, Vec<Option<Clock>>)> {
        if size == 0 {
            return Err(DbmError::EmptyUniverse);
        }

        let (from, active) = indices(src, size);
        if active != self.dimensions() as usize {
            return Err(DbmError::DimensionMismatch {
                expected: self.dimensions() as usize,
                found: active,
            });
        }

        let (to, dimensions) = indices(dst, size);
        let dimensions = Clock::try_from(dimensions).map_err(|_| DbmError::DimensionMismatch {
            expected: Clock::MAX as usize,
            found: dimensions,
        })?;
        debug!(
            "resizing DBM from {} to {} clocks",
            self.dimensions(),
            dimensions
        );

        let mut dbm = DBM::init(dimensions);
        for p in 0..size {
            let Some(i) = to[p] else { continue };
            for q in 0..size {
                let Some(j) = to[q] else { continue };
                match (from[p], from[q]) {
                    (Some(old_i), Some(old_j)) => dbm.set(i, j, self.get(old_i, old_j)),
                    // x_i - x_j ≤ x_i for the new clock x_j ≥ 0.
                    (Some(old_i), None) if i != REFERENCE => {
                        dbm.set(i, j, self.upper(old_i))
                    }
                    _ => {}
                }
            }
        }

        debug_assert!(dbm.is_closed());
        Ok((dbm, to))
    }
}

impl DBM<Dirty> {
    /// Copies the relations of `src` into the rows and columns given by
    /// `cols`, where `cols[k]` is the clock receiving clock `k` of `src`.
    pub fn update_from<S: DBMState>(&mut self, src: &DBM<S>, cols: &[Option<Clock>]) {
        assert_eq!(
            cols.len(),
            src.dimensions() as usize,
            "inconsistent column table"
        );

        for (i, row) in cols.iter().enumerate() {
            let Some(row) = row else { continue };
            for (j, col) in cols.iter().enumerate() {
                let Some(col) = col else { continue };
                self[(*row, *col)] = src[(i as Clock, j as Clock)];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use bitset::BitSet;
    use rand::Rng;
    use test_log::test;

    use crate::{
        error::DbmError,
        zones::{
            constraint::{Clock, Constraint, Relation, INFINITY, REFERENCE, ZERO},
            dbm::{Canonical, DBM},
            sample::{random_point, random_zone},
        },
    };

    fn bits(size: usize, active: &[usize]) -> BitSet {
        let mut bits = BitSet::with_capacity(size);
        for position in active {
            bits.set(*position, true);
        }
        bits
    }

    fn xyz() -> DBM<Canonical> {
        DBM::init(4)
            .constrain_all(&[
                Constraint::upper(1, Relation::weak(3)),
                Constraint::lower(2, Relation::strict(-1)),
                Constraint::new(3, 1, Relation::weak(2)),
                Constraint::upper(3, Relation::strict(7)),
            ])
            .unwrap()
    }

    #[test]
    fn shrink_projects_clocks_away() {
        let dbm = xyz();
        let (shrunk, table) = dbm
            .shrink_expand(&bits(4, &[1, 2, 3]), &bits(4, &[1, 3]), 4)
            .unwrap();

        assert_eq!(vec![Some(0), Some(1), None, Some(2)], table);
        assert_eq!(3, shrunk.dimensions());
        assert_eq!(dbm.upper(1), shrunk.upper(1));
        assert_eq!(dbm.upper(3), shrunk.upper(2));
        assert_eq!(dbm[(3, 1)], shrunk[(2, 1)]);
        assert_eq!(dbm[(1, 3)], shrunk[(1, 2)]);
        assert!(shrunk.is_closed());
    }

    #[test]
    fn expand_adds_free_clocks() {
        let dbm = DBM::init(2)
            .constrain_all(&[
                Constraint::upper(1, Relation::weak(3)),
                Constraint::lower(1, Relation::weak(-1)),
            ])
            .unwrap();
        let (expanded, table) = dbm
            .shrink_expand(&bits(3, &[1]), &bits(3, &[1, 2]), 3)
            .unwrap();

        assert_eq!(vec![Some(0), Some(1), Some(2)], table);
        assert_eq!(INFINITY, expanded.upper(2));
        assert_eq!(ZERO, expanded.lower(2));
        assert_eq!(Relation::weak(3), expanded[(1, 2)]);
        assert_eq!(INFINITY, expanded[(2, 1)]);
        assert!(expanded.is_closed());
        assert!(expanded.is_point_included(&[0, 2, 100]));

        let (back, _) = expanded
            .shrink_expand(&bits(3, &[1, 2]), &bits(3, &[1]), 3)
            .unwrap();
        assert_eq!(dbm, back);
    }

    #[test]
    fn shrink_expand_errors() {
        struct Case {
            src: BitSet,
            size: usize,
            expected: DbmError,
        }

        let cases = [
            Case {
                src: bits(4, &[1]),
                size: 0,
                expected: DbmError::EmptyUniverse,
            },
            Case {
                src: bits(4, &[1, 2]),
                size: 4,
                expected: DbmError::DimensionMismatch {
                    expected: 4,
                    found: 3,
                },
            },
        ];

        for case in cases {
            let result = xyz().shrink_expand(&case.src, &bits(4, &[1]), case.size);
            assert_eq!(Some(case.expected), result.err());
        }
    }

    #[test]
    fn short_sets_leave_positions_inactive() {
        let (dbm, table) = DBM::init(1)
            .shrink_expand(&BitSet::new(), &BitSet::new(), 3)
            .unwrap();
        assert_eq!(vec![Some(0), None, None], table);
        assert!(dbm.is_init());
        assert_eq!(1, dbm.dimensions());

        let (shrunk, table) = xyz()
            .shrink_expand(&bits(4, &[1, 2, 3]), &bits(2, &[1]), 4)
            .unwrap();
        assert_eq!(vec![Some(0), Some(1), None, None], table);
        assert_eq!(xyz().upper(1), shrunk.upper(1));
        assert_eq!(xyz().lower(1), shrunk.lower(1));
    }

    #[test]
    fn resizing_keeps_points() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let dim: Clock = rng.gen_range(1..5);
            let size = 6;
            let zone = random_zone(&mut rng, dim, 6);

            // The source clocks are the first positions of the universe.
            let src = bits(size, &(1..dim as usize).collect::<Vec<_>>());
            let active: Vec<usize> = (1..size).filter(|_| rng.gen_bool(0.5)).collect();
            let dst = bits(size, &active);
            let (resized, table) = zone.shrink_expand(&src, &dst, size).unwrap();
            assert!(resized.is_closed());

            for _ in 0..20 {
                let point = random_point(&mut rng, dim, 8);
                if !zone.is_point_included(&point) {
                    continue;
                }

                let mut image = random_point(&mut rng, resized.dimensions(), 8);
                for (position, index) in table.iter().enumerate() {
                    if let Some(index) = index {
                        if position < dim as usize {
                            image[*index as usize] = point[position];
                        }
                    }
                }
                assert!(resized.is_point_included(&image));
            }
        }
    }

    #[test]
    fn update_from_copies_rows_and_columns() {
        let src = DBM::init(2).constrain_clock(1, 4).unwrap();
        let mut dbm = DBM::init(3).dirty();
        dbm.update_from(&src, &[Some(REFERENCE), Some(2)]);
        assert!(dbm.is_touched(2));
        assert!(!dbm.is_touched(1));

        let dbm = dbm.close().unwrap();
        assert_eq!(Relation::weak(4), dbm.upper(2));
        assert_eq!(Relation::weak(-4), dbm.lower(2));
        assert_eq!(INFINITY, dbm.upper(1));
        assert_eq!(Relation::weak(4), dbm[(2, 1)]);
    }
}
