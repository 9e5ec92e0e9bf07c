use std::{
    fmt,
    ops::{Add, Neg, Sub},
};

use rand::{
    distributions::{Distribution, Standard},
    Rng,
};

use crate::error::{DbmError, Result};

/// The unique index of a clock. This can be used to directly address the DBM.
pub type Clock = u16;

/// The zero'th (0) clock is the reference clock. Its value is always zero.
pub const REFERENCE: Clock = 0;

/// Describes the strictness (<, <=) of the constraint between two clocks in the DBM.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Strictness {
    Strict,
    Weak,
}

impl Strictness {
    pub const fn opposite(&self) -> Self {
        match self {
            Strictness::Strict => Strictness::Weak,
            Strictness::Weak => Strictness::Strict,
        }
    }

    const fn bit(&self) -> i32 {
        match self {
            Strictness::Strict => 0,
            Strictness::Weak => 1,
        }
    }
}

impl Distribution<Strictness> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Strictness {
        if rng.gen_bool(1.0 / 2.0) {
            return Strictness::Strict;
        }
        Strictness::Weak
    }
}

impl fmt::Display for Strictness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strictness::Strict => write!(f, "<"),
            Strictness::Weak => write!(f, "≤"),
        }
    }
}

pub type Limit = i32;

/// The limit reserved for infinity. Every finite limit is strictly smaller.
pub const INFINITY_LIMIT: Limit = i32::MAX >> 1;
/// Finite limits must stay below this magnitude, otherwise the sum of two
/// bounds along a path can no longer be represented.
pub const OVERFLOW_LIMIT: Limit = INFINITY_LIMIT >> 1;

/// An element optimized for caching which represents a strict or weak
/// relation between two clocks (c0 - c1 RELATION). This encoding uses
/// the least significant bit to represent the strictness and the other
/// bits as the limit. The encoding is [limit] [1 bit strictness].
///
/// Comparing two relations compares their encodings, and a smaller encoding
/// is always the tighter constraint: (5, <) < (5, ≤) < (6, <).
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Relation(i32);

/// Infinity is strict (∞, <). It is the largest relation.
pub const INFINITY: Relation = Relation(INFINITY_LIMIT << 1);
/// Zero is just a relation with limit of 0 but it is weak and thereby includes 0 (0, ≤).
pub const ZERO: Relation = Relation::new(0, Strictness::Weak);
/// Saturation value for sums exceeding the representable range.
pub const OVERFLOW: Relation = Relation::new(OVERFLOW_LIMIT, Strictness::Weak);
/// Saturation value for sums below the representable range.
pub const UNDERFLOW: Relation = Relation(-OVERFLOW.0);

impl Relation {
    /// Encodes the limit and strictness. The limit must be smaller than
    /// [`OVERFLOW_LIMIT`] in magnitude, see [`Relation::try_new`].
    pub const fn new(limit: Limit, strictness: Strictness) -> Self {
        Self((limit << 1) | strictness.bit())
    }

    /// Encodes the limit and strictness, rejecting limits the encoding cannot
    /// represent without overflowing.
    pub fn try_new(limit: Limit, strictness: Strictness) -> Result<Self> {
        let raw = ((limit as i64) << 1) | strictness.bit() as i64;
        if raw >= OVERFLOW.0 as i64 || -raw >= OVERFLOW.0 as i64 {
            return Err(DbmError::Overflow { limit });
        }
        Ok(Self(raw as i32))
    }

    pub const fn weak(limit: Limit) -> Self {
        Self::new(limit, Strictness::Weak)
    }

    pub const fn strict(limit: Limit) -> Self {
        Self::new(limit, Strictness::Strict)
    }

    pub const fn from_bool(limit: Limit, is_strict: bool) -> Self {
        if is_strict {
            Self::strict(limit)
        } else {
            Self::weak(limit)
        }
    }

    /// Wraps an already encoded relation.
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> i32 {
        self.0
    }

    /// Returns the limit of the relation which can be
    /// represented with one less bit than the relation
    /// as the last bit describes the relation's strictness.
    pub const fn limit(&self) -> Limit {
        self.0 >> 1
    }

    /// Returns the strictness of the relation.
    pub const fn strictness(&self) -> Strictness {
        if self.is_strict() {
            return Strictness::Strict;
        }
        Strictness::Weak
    }

    pub const fn as_weak(&self) -> Self {
        Self(self.0 | 1)
    }

    pub const fn as_strict(&self) -> Self {
        Self(self.0 & !1)
    }

    /// Returns true if the strictness of the relation is strict.
    pub const fn is_strict(&self) -> bool {
        (self.0 & 1) == 0
    }

    /// Returns true if the strictness of the relation is weak.
    pub const fn is_weak(&self) -> bool {
        !self.is_strict()
    }

    /// Returns true if the relation represents a infinite relation (∞, <).
    pub const fn is_infinity(&self) -> bool {
        self.0 == INFINITY.0
    }

    /// Returns true if the relation represents a zero relation (0, ≤).
    pub const fn is_zero(&self) -> bool {
        self.0 == ZERO.0
    }

    /// Infinity or a finite relation whose sums cannot overflow.
    pub const fn is_valid(&self) -> bool {
        self.0 == INFINITY.0 || (self.0 < OVERFLOW.0 && -self.0 < OVERFLOW.0)
    }

    /// The complement of the relation seen from the opposite clock pair:
    /// x - y ≤ 5 negates to y - x < -5.
    pub const fn negation(&self) -> Self {
        Self(1 - self.0)
    }

    /// Negation that keeps weak relations weak: x - y ≤ 5 gives y - x ≤ -4.
    /// Used when stepping over the boundary of a discrete grid.
    pub const fn weak_negation(&self) -> Self {
        Self(2 - self.0)
    }

    /// Returns the sum of two relations, i.e., the length of a path through
    /// both constraints. The sum is strict if either operand is strict, as a
    /// single strict edge makes the whole path strict. Infinity absorbs and
    /// sums outside the representable range saturate to [`OVERFLOW`] and
    /// [`UNDERFLOW`] instead of wrapping.
    /// This addition is mostly used to compute the accumulated path when closing a DBM.
    pub const fn addition(&self, other: &Self) -> Self {
        if self.is_infinity() || other.is_infinity() {
            return INFINITY;
        }

        self.add_finite(other)
    }

    /// Addition where only `self` may be infinite.
    pub const fn add_raw_finite(&self, finite: &Self) -> Self {
        if self.is_infinity() {
            return INFINITY;
        }

        self.add_finite(finite)
    }

    /// Addition of two finite relations.
    pub const fn add_finite(&self, other: &Self) -> Self {
        Self::saturate(self.0 as i64 + other.0 as i64 - ((self.0 | other.0) & 1) as i64)
    }

    /// Addition of two finite weak relations.
    pub const fn add_finite_weak(&self, other: &Self) -> Self {
        Self::saturate(self.0 as i64 + other.0 as i64 - 1)
    }

    /// Adds an encoded amount to a finite relation, infinity is kept.
    pub const fn raw_increment(&self, amount: i32) -> Self {
        if self.is_infinity() {
            return INFINITY;
        }
        Self::saturate(self.0 as i64 + amount as i64)
    }

    /// Subtracts an encoded amount from a finite relation, infinity is kept.
    pub const fn raw_decrement(&self, amount: i32) -> Self {
        if self.is_infinity() {
            return INFINITY;
        }
        Self::saturate(self.0 as i64 - amount as i64)
    }

    /// subtract other from self by "self + (-other)".
    pub const fn subtract(&self, other: &Self) -> Self {
        self.addition(&other.negation())
    }

    const fn saturate(raw: i64) -> Self {
        if raw >= OVERFLOW.0 as i64 {
            OVERFLOW
        } else if raw <= UNDERFLOW.0 as i64 {
            UNDERFLOW
        } else {
            Self(raw as i32)
        }
    }
}

impl Distribution<Relation> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Relation {
        let strictness: Strictness = rng.gen();
        let limit: Limit = rng.gen_range(-(OVERFLOW_LIMIT - 1)..OVERFLOW_LIMIT);
        Relation::new(limit, strictness)
    }
}

impl Add for Relation {
    type Output = Relation;

    fn add(self, rhs: Self) -> Self::Output {
        self.addition(&rhs)
    }
}

impl Sub for Relation {
    type Output = Relation;

    fn sub(self, rhs: Self) -> Self::Output {
        self.subtract(&rhs)
    }
}

impl Neg for Relation {
    type Output = Relation;

    fn neg(self) -> Self::Output {
        self.negation()
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_infinity() {
            return write!(f, "(∞, {})", self.strictness());
        }
        write!(f, "({}, {})", self.limit(), self.strictness())
    }
}

/// A difference constraint "x_i - x_j RELATION" between two clocks.
/// Upper bounds are constraints on (clock, REFERENCE) and lower bounds
/// on (REFERENCE, clock) with a negated limit.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Constraint {
    i: Clock,
    j: Clock,
    relation: Relation,
}

impl Constraint {
    pub const fn new(i: Clock, j: Clock, relation: Relation) -> Self {
        Self { i, j, relation }
    }

    pub const fn bound(i: Clock, j: Clock, limit: Limit, strictness: Strictness) -> Self {
        Self::new(i, j, Relation::new(limit, strictness))
    }

    /// clock ⋈ limit.
    pub const fn upper(clock: Clock, relation: Relation) -> Self {
        Self::new(clock, REFERENCE, relation)
    }

    /// -clock ⋈ limit, so x ≥ 4 is `Constraint::lower(x, Relation::weak(-4))`.
    pub const fn lower(clock: Clock, relation: Relation) -> Self {
        Self::new(REFERENCE, clock, relation)
    }

    pub const fn i(&self) -> Clock {
        self.i
    }

    pub const fn j(&self) -> Clock {
        self.j
    }

    pub const fn relation(&self) -> Relation {
        self.relation
    }

    /// The constraint describing the complement: not(x_i - x_j ≤ c) is x_j - x_i < -c.
    pub const fn negation(&self) -> Self {
        Self::new(self.j, self.i, self.relation.negation())
    }
}

impl Neg for Constraint {
    type Output = Constraint;

    fn neg(self) -> Self::Output {
        self.negation()
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} {}", self.i, self.j, self.relation)
    }
}

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;

    use rand::Rng;
    use test_log::test;

    use super::*;

    #[test]
    fn reference_clock_is_zero() {
        assert_eq!(0, REFERENCE)
    }

    #[test]
    fn weak_formatted_is_less_than_or_equal() {
        assert_eq!("≤", Strictness::Weak.to_string())
    }

    #[test]
    fn strict_formatted_is_less_than() {
        assert_eq!("<", Strictness::Strict.to_string())
    }

    #[test]
    fn encoding_matches_raw_layout() {
        assert_eq!(10, Relation::new(5, Strictness::Strict).raw());
        assert_eq!(11, Relation::new(5, Strictness::Weak).raw());
        assert_eq!(10, Relation::from_bool(5, true).raw());
        assert_eq!(11, Relation::from_bool(5, false).raw());
        assert_eq!(1, ZERO.raw());
        assert_eq!(INFINITY_LIMIT * 2, INFINITY.raw());
        assert_eq!(INFINITY.raw() / 2, OVERFLOW.raw());
    }

    #[test]
    fn new_relation_returns_correct_strictness() {
        assert_eq!(Strictness::Weak, Relation::weak(0).strictness());
        assert_eq!(Strictness::Strict, Relation::strict(0).strictness());
        assert_eq!(Strictness::Weak, Relation::weak(-7).strictness());
        assert_eq!(Strictness::Strict, Relation::strict(-7).strictness());
        assert_eq!(Strictness::Weak, Relation::weak(5).as_weak().strictness());
        assert_eq!(Strictness::Strict, Relation::weak(5).as_strict().strictness());
        assert_eq!(11, Relation::from_raw(10).as_weak().raw());
        assert_eq!(10, Relation::from_raw(11).as_strict().raw());
    }

    #[test]
    fn new_relation_returns_correct_limit() {
        assert_eq!(0, Relation::weak(0).limit());
        assert_eq!(10, Relation::weak(10).limit());
        assert_eq!(-10, Relation::weak(-10).limit());
        assert_eq!(5, Relation::from_raw(10).limit());
        assert_eq!(5, Relation::from_raw(11).limit());

        let mut rng = rand::thread_rng();
        for _ in 0..10_000 {
            let limit = rng.gen_range(-(OVERFLOW_LIMIT - 1)..OVERFLOW_LIMIT);
            let relation = Relation::weak(limit);
            assert_eq!(limit, relation.limit());
            assert!(relation.is_valid());
        }
    }

    #[test]
    fn try_new_rejects_overflowing_limits() {
        assert!(Relation::try_new(OVERFLOW_LIMIT - 1, Strictness::Weak).is_ok());
        assert!(Relation::try_new(-(OVERFLOW_LIMIT - 1), Strictness::Strict).is_ok());
        assert!(matches!(
            Relation::try_new(OVERFLOW_LIMIT, Strictness::Weak),
            Err(DbmError::Overflow { limit: OVERFLOW_LIMIT })
        ));
        assert!(Relation::try_new(i32::MAX, Strictness::Strict).is_err());
        assert!(Relation::try_new(i32::MIN, Strictness::Strict).is_err());
    }

    #[test]
    fn validity() {
        assert!(Relation::from_raw(10).is_valid());
        assert!(INFINITY.is_valid());
        assert!(!OVERFLOW.is_valid());
        assert!(!UNDERFLOW.is_valid());
    }

    #[test]
    fn inifinity() {
        assert_eq!(INFINITY_LIMIT, INFINITY.limit());
        assert_eq!(Strictness::Strict, INFINITY.strictness());
        assert_eq!("(∞, <)", INFINITY.to_string());
        assert!(INFINITY.is_infinity());
    }

    #[test]
    fn zero() {
        assert_eq!(0, ZERO.limit());
        assert_eq!(Strictness::Weak, ZERO.strictness());
        assert_eq!("(0, ≤)", ZERO.to_string());
        assert!(ZERO.is_zero())
    }

    #[test]
    fn relation_partial_order() {
        struct Case {
            lhs: Relation,
            rhs: Relation,
            ordering: Ordering,
        }
        let cases: [Case; 6] = [
            Case {
                lhs: Relation::weak(10),
                rhs: Relation::weak(10),
                ordering: Ordering::Equal,
            },
            Case {
                lhs: Relation::strict(10),
                rhs: Relation::weak(10),
                ordering: Ordering::Less,
            },
            Case {
                lhs: Relation::weak(10),
                rhs: Relation::strict(11),
                ordering: Ordering::Less,
            },
            Case {
                lhs: INFINITY,
                rhs: Relation::strict(10),
                ordering: Ordering::Greater,
            },
            Case {
                lhs: Relation::weak(10),
                rhs: INFINITY,
                ordering: Ordering::Less,
            },
            Case {
                lhs: Relation::weak(-3),
                rhs: ZERO,
                ordering: Ordering::Less,
            },
        ];

        for case in cases {
            assert_eq!(
                case.ordering,
                case.lhs.cmp(&case.rhs),
                "{} vs {}",
                case.lhs,
                case.rhs
            );
        }
    }

    #[test]
    fn relation_negation() {
        assert_eq!("(-10, <)", Relation::weak(10).negation().to_string());
        assert_eq!(-9, Relation::from_raw(10).negation().raw());
        assert_eq!(-10, Relation::from_raw(11).negation().raw());
        assert_eq!(-9, Relation::from_raw(11).weak_negation().raw());
        assert_eq!(Relation::weak(10), -(-Relation::weak(10)));
    }

    #[test]
    fn add_relation() {
        struct Case {
            lhs: Relation,
            rhs: Relation,
            expected: Relation,
        }
        let cases: [Case; 8] = [
            Case {
                lhs: Relation::weak(10),
                rhs: Relation::weak(10),
                expected: Relation::weak(20),
            },
            Case {
                lhs: Relation::strict(10),
                rhs: Relation::weak(10),
                expected: Relation::strict(20),
            },
            Case {
                lhs: Relation::weak(10),
                rhs: Relation::strict(10),
                expected: Relation::strict(20),
            },
            Case {
                lhs: Relation::weak(11),
                rhs: Relation::strict(10),
                expected: Relation::strict(21),
            },
            Case {
                lhs: ZERO,
                rhs: Relation::from_raw(10),
                expected: Relation::from_raw(10),
            },
            Case {
                lhs: INFINITY,
                rhs: Relation::weak(10),
                expected: INFINITY,
            },
            Case {
                lhs: Relation::strict(10),
                rhs: INFINITY,
                expected: INFINITY,
            },
            Case {
                lhs: INFINITY,
                rhs: INFINITY,
                expected: INFINITY,
            },
        ];

        for case in cases {
            let actual = case.lhs + case.rhs;
            assert_eq!(
                case.expected, actual,
                "{} + {} = {}",
                case.lhs, case.rhs, actual
            );
        }
    }

    #[test]
    fn specialised_additions() {
        let (ten, eleven) = (Relation::from_raw(10), Relation::from_raw(11));
        assert_eq!(20, ten.add_raw_finite(&eleven).raw());
        assert_eq!(INFINITY, INFINITY.add_raw_finite(&eleven));
        assert_eq!(20, ten.add_finite(&eleven).raw());
        assert_eq!(21, eleven.add_finite_weak(&eleven).raw());
        assert_eq!(15, ten.raw_increment(5).raw());
        assert_eq!(10, Relation::from_raw(15).raw_decrement(5).raw());
        assert_eq!(INFINITY, INFINITY.raw_increment(5));
        assert_eq!(INFINITY, INFINITY.raw_decrement(5));
    }

    #[test]
    fn addition_saturates() {
        let big = Relation::weak(OVERFLOW_LIMIT - 1);
        assert_eq!(OVERFLOW, big + big);
        assert_eq!(UNDERFLOW, big.negation() + big.negation());
        assert!(!(big + big).is_valid());
    }

    #[test]
    fn subtraction() {
        assert_eq!(Relation::strict(2), Relation::weak(5) - Relation::weak(3));
        assert_eq!(Relation::weak(2), Relation::weak(5) - Relation::strict(3));
    }

    #[test]
    fn addition_is_monotone_commutative_and_associative() {
        let relations: Vec<Relation> = (-8..=8)
            .flat_map(|limit| [Relation::strict(limit), Relation::weak(limit)])
            .chain([INFINITY])
            .collect();

        for a in relations.iter() {
            for b in relations.iter() {
                assert_eq!(*a + *b, *b + *a, "{} + {}", a, b);

                for c in relations.iter() {
                    assert_eq!((*a + *b) + *c, *a + (*b + *c), "{} + {} + {}", a, b, c);
                    if a <= b {
                        assert!(*a + *c <= *b + *c, "{} <= {} under + {}", a, b, c);
                    }
                }
            }
        }
    }

    #[test]
    fn constraint_display() {
        assert_eq!(
            "0 - 0 (0, ≤)",
            Constraint::new(REFERENCE, REFERENCE, ZERO).to_string()
        );
        assert_eq!(
            "0 - 2 (0, ≤)",
            Constraint::lower(2, Relation::weak(0)).to_string()
        );
    }

    #[test]
    fn constraint_negation_swaps_clocks() {
        let constraint = Constraint::bound(1, 2, 5, Strictness::Strict);
        assert_eq!(10, constraint.relation().raw());

        let negated = -constraint;
        assert_eq!(2, negated.i());
        assert_eq!(1, negated.j());
        assert_eq!(-9, negated.relation().raw());
    }

    #[test]
    fn constraint_equality() {
        let c1 = Constraint::bound(1, 2, 5, Strictness::Strict);
        let c2 = Constraint::bound(1, 2, 5, Strictness::Strict);
        let c3 = Constraint::bound(1, 2, 5, Strictness::Weak);
        assert_eq!(c1, c2);
        assert_ne!(c1, c3);
    }
}
