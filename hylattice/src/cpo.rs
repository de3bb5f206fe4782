//! Complete partial orders.
//!
//! A [`Cpo`] provides the order relation and the bound operations used by the
//! inequality solver. Every operation is fallible: comparing an element that does
//! not belong to the order is an error rather than a silent `Incomparable`.
use strum::EnumIs;

use crate::utils::{LatticeError, LatticeResult};

/// Result of comparing two elements of a partial order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIs)]
pub enum CpoRelation {
    /// The first element is strictly below the second one.
    Lower,
    /// Both elements are equal.
    Same,
    /// The first element is strictly above the second one.
    Higher,
    /// Neither element is below the other.
    Incomparable,
}

impl CpoRelation {
    /// The relation obtained by swapping both arguments of the comparison.
    ///
    /// ```rust
    /// # use hylattice::cpo::CpoRelation;
    /// assert_eq!(CpoRelation::Lower.inverse(), CpoRelation::Higher);
    /// assert_eq!(CpoRelation::Same.inverse(), CpoRelation::Same);
    /// ```
    pub fn inverse(self) -> Self {
        match self {
            CpoRelation::Lower => CpoRelation::Higher,
            CpoRelation::Higher => CpoRelation::Lower,
            other => other,
        }
    }

    /// Whether the first element is below or equal to the second.
    pub fn is_at_most(self) -> bool {
        matches!(self, CpoRelation::Lower | CpoRelation::Same)
    }

    /// Whether the first element is above or equal to the second.
    pub fn is_at_least(self) -> bool {
        matches!(self, CpoRelation::Higher | CpoRelation::Same)
    }
}

/// A partial order with a bottom, a top and binary bounds.
///
/// Implementations must be consistent: `compare(b, a)` is the
/// [`CpoRelation::inverse`] of `compare(a, b)`, and the bounds returned by
/// [`Cpo::greatest_lower_bound`] and [`Cpo::least_upper_bound`] are respectively
/// below and above both arguments.
pub trait Cpo {
    type Element: Clone;

    fn compare(&self, lhs: &Self::Element, rhs: &Self::Element) -> LatticeResult<CpoRelation>;

    fn greatest_lower_bound(
        &self,
        lhs: &Self::Element,
        rhs: &Self::Element,
    ) -> LatticeResult<Self::Element>;

    fn least_upper_bound(
        &self,
        lhs: &Self::Element,
        rhs: &Self::Element,
    ) -> LatticeResult<Self::Element>;

    fn bottom(&self) -> Self::Element;

    fn top(&self) -> Self::Element;

    /// `lhs <= rhs` in the order.
    fn leq(&self, lhs: &Self::Element, rhs: &Self::Element) -> LatticeResult<bool> {
        Ok(self.compare(lhs, rhs)?.is_at_most())
    }

    /// Greatest lower bound of a non-empty set of elements.
    fn glb_of<'a, I>(&self, elements: I) -> LatticeResult<Self::Element>
    where
        I: IntoIterator<Item = &'a Self::Element>,
        Self::Element: 'a,
    {
        let mut iter = elements.into_iter();
        let first = iter.next().ok_or(LatticeError::EmptyBound)?;
        iter.try_fold(first.clone(), |acc, element| {
            self.greatest_lower_bound(&acc, element)
        })
    }

    /// Least upper bound of a non-empty set of elements.
    fn lub_of<'a, I>(&self, elements: I) -> LatticeResult<Self::Element>
    where
        I: IntoIterator<Item = &'a Self::Element>,
        Self::Element: 'a,
    {
        let mut iter = elements.into_iter();
        let first = iter.next().ok_or(LatticeError::EmptyBound)?;
        iter.try_fold(first.clone(), |acc, element| {
            self.least_upper_bound(&acc, element)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Divisibility order over the divisors of 12.
    struct Divisors;

    impl Cpo for Divisors {
        type Element = u32;

        fn compare(&self, lhs: &u32, rhs: &u32) -> LatticeResult<CpoRelation> {
            Ok(match (lhs == rhs, rhs % lhs == 0, lhs % rhs == 0) {
                (true, _, _) => CpoRelation::Same,
                (_, true, _) => CpoRelation::Lower,
                (_, _, true) => CpoRelation::Higher,
                _ => CpoRelation::Incomparable,
            })
        }

        fn greatest_lower_bound(&self, lhs: &u32, rhs: &u32) -> LatticeResult<u32> {
            let (mut a, mut b) = (*lhs, *rhs);
            while b != 0 {
                (a, b) = (b, a % b);
            }
            Ok(a)
        }

        fn least_upper_bound(&self, lhs: &u32, rhs: &u32) -> LatticeResult<u32> {
            Ok(lhs * rhs / self.greatest_lower_bound(lhs, rhs)?)
        }

        fn bottom(&self) -> u32 {
            1
        }

        fn top(&self) -> u32 {
            12
        }
    }

    #[test]
    fn inverse_is_an_involution() {
        for relation in [
            CpoRelation::Lower,
            CpoRelation::Same,
            CpoRelation::Higher,
            CpoRelation::Incomparable,
        ] {
            assert_eq!(relation.inverse().inverse(), relation);
        }
    }

    #[test]
    fn bounds_over_sets() {
        assert_eq!(Divisors.glb_of(&[12, 4, 6]), Ok(2));
        assert_eq!(Divisors.lub_of(&[2, 3]), Ok(6));
        assert_eq!(Divisors.glb_of(&[]), Err(LatticeError::EmptyBound));
        assert!(Divisors.leq(&3, &6).unwrap());
        assert!(!Divisors.leq(&4, &6).unwrap());
    }
}
