//! Inequality constraints between property terms.
use crate::{
    cpo::Cpo,
    term::{TermId, TermStore},
    utils::LatticeResult,
};

/// The constraint `lesser <= greater`.
///
/// `origin` is free for clients to record where the inequality comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inequality<T = ()> {
    pub lesser: TermId,
    pub greater: TermId,
    pub origin: T,
}

impl<T> Inequality<T> {
    pub fn new(lesser: TermId, greater: TermId, origin: T) -> Self {
        Self {
            lesser,
            greater,
            origin,
        }
    }

    /// Whether the current values of both terms satisfy the inequality.
    pub fn is_satisfied<C, S>(&self, cpo: &C, store: &S) -> LatticeResult<bool>
    where
        C: Cpo,
        S: TermStore<Value = C::Element>,
    {
        let lesser = store.value(self.lesser)?;
        let greater = store.value(self.greater)?;
        cpo.leq(&lesser, &greater)
    }

    /// Inequalities touching an ineffective term are left out of the resolution.
    pub fn is_effective<S: TermStore>(&self, store: &S) -> bool {
        store.is_effective(self.lesser) && store.is_effective(self.greater)
    }
}
