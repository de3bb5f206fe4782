//! Generic inequality solver.
//!
//! [`InequalitySolver`] computes the least (or greatest) simultaneous solution of a
//! set of inequalities with a worklist algorithm. For the least solution every
//! settable variable starts at the bottom of the order; an inequality that does not
//! hold raises its greater side to the least upper bound of both sides, and every
//! inequality whose lesser side depends on the raised variable is checked again.
//! The greatest solution is the dual.
//!
//! Inequalities whose greater (resp. lesser) side is not settable are only
//! checked; if they still do not hold once the worklist is empty they are listed
//! as unsatisfied in the [`SolveReport`].
use std::collections::{BTreeMap, VecDeque};

use log::{debug, trace};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::EnumIs;

use crate::{
    cpo::Cpo,
    inequality::Inequality,
    term::{TermId, TermStore},
    utils::LatticeResult,
};

/// Which fixed point of the inequalities to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumIs)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum FixedPoint {
    #[default]
    Least,
    Greatest,
}

/// Summary of one resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolveReport {
    /// Number of inequalities taken from the worklist.
    pub iterations: usize,
    /// Number of variable assignments.
    pub updates: usize,
    /// Inequalities left out because they touch an ineffective term.
    pub skipped: usize,
    /// Indices of the effective inequalities that do not hold, in declaration order.
    pub unsatisfied: Vec<usize>,
}

pub struct InequalitySolver<'c, C: Cpo> {
    cpo: &'c C,
}

impl<'c, C: Cpo> InequalitySolver<'c, C> {
    pub fn new(cpo: &'c C) -> Self {
        Self { cpo }
    }

    /// Solve `inequalities` in place, assigning the variables of `store`.
    ///
    /// Fails only when the order itself fails (unknown elements) or when the store
    /// rejects an assignment, e.g. a value conflicting with a declaration or a
    /// structure growing past its depth bound.
    pub fn solve<S, T>(
        &self,
        store: &mut S,
        inequalities: &[Inequality<T>],
        fixed_point: FixedPoint,
    ) -> LatticeResult<SolveReport>
    where
        S: TermStore<Value = C::Element>,
    {
        let mut report = SolveReport::default();

        let active: Vec<usize> = (0..inequalities.len())
            .filter(|i| inequalities[*i].is_effective(store))
            .collect();
        report.skipped = inequalities.len() - active.len();

        // Variables to initialize, and the inequalities to revisit when each changes.
        let mut watchers: BTreeMap<TermId, Vec<usize>> = BTreeMap::new();
        let mut variables: Vec<TermId> = Vec::new();
        for &i in active.iter() {
            let inequality = &inequalities[i];
            let (watched, other) = match fixed_point {
                FixedPoint::Least => (inequality.lesser, inequality.greater),
                FixedPoint::Greatest => (inequality.greater, inequality.lesser),
            };
            for variable in store.variables(watched) {
                let list = watchers.entry(variable).or_default();
                if !list.contains(&i) {
                    list.push(i);
                }
                if !variables.contains(&variable) {
                    variables.push(variable);
                }
            }
            for variable in store.variables(other) {
                if !variables.contains(&variable) {
                    variables.push(variable);
                }
            }
        }

        let start = match fixed_point {
            FixedPoint::Least => self.cpo.bottom(),
            FixedPoint::Greatest => self.cpo.top(),
        };
        for variable in variables.iter() {
            store.initialize(*variable, &start)?;
        }

        let mut queued = vec![false; inequalities.len()];
        let mut worklist: VecDeque<usize> = active.iter().copied().collect();
        for &i in active.iter() {
            queued[i] = true;
        }

        while let Some(i) = worklist.pop_front() {
            queued[i] = false;
            report.iterations += 1;

            let inequality = &inequalities[i];
            if inequality.is_satisfied(self.cpo, store)? {
                continue;
            }

            let target = match fixed_point {
                FixedPoint::Least => inequality.greater,
                FixedPoint::Greatest => inequality.lesser,
            };
            if !store.is_settable(target) {
                continue;
            }

            let lesser = store.value(inequality.lesser)?;
            let greater = store.value(inequality.greater)?;
            let updated = match fixed_point {
                FixedPoint::Least => self.cpo.least_upper_bound(&greater, &lesser)?,
                FixedPoint::Greatest => self.cpo.greatest_lower_bound(&lesser, &greater)?,
            };
            trace!("Inequality #{} does not hold, updating term {:?}.", i, target);
            store.set_value(target, updated)?;
            report.updates += 1;

            if let Some(dependents) = watchers.get(&target) {
                for &j in dependents {
                    if !queued[j] {
                        queued[j] = true;
                        worklist.push_back(j);
                    }
                }
            }
        }

        for &i in active.iter() {
            if !inequalities[i].is_satisfied(self.cpo, store)? {
                report.unsatisfied.push(i);
            }
        }

        debug!(
            "Solved {} inequalities ({} skipped) for the {:?} fixed point in {} iterations and {} updates, {} unsatisfied.",
            active.len(),
            report.skipped,
            fixed_point,
            report.iterations,
            report.updates,
            report.unsatisfied.len()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{element::Property, registry::builtin, term::TermArena};

    #[test]
    fn least_solution_of_a_chain() {
        let lattice = Arc::new(builtin::logical_and().unwrap());
        let mut arena = TermArena::new(Arc::clone(&lattice));
        let t = arena.constant(lattice.element("TRUE").unwrap());
        let x = arena.variable("x", lattice.bottom());
        let y = arena.variable("y", lattice.bottom());

        let inequalities = vec![Inequality::new(x, y, ()), Inequality::new(t, x, ())];
        let report = InequalitySolver::new(&*lattice)
            .solve(&mut arena, &inequalities, FixedPoint::Least)
            .unwrap();

        assert!(report.unsatisfied.is_empty());
        assert_eq!(arena.value(x), lattice.element("TRUE"));
        assert_eq!(arena.value(y), lattice.element("TRUE"));
    }

    #[test]
    fn greatest_solution_of_a_chain() {
        let lattice = Arc::new(builtin::logical_and().unwrap());
        let mut arena = TermArena::new(Arc::clone(&lattice));
        let t = arena.constant(lattice.element("TRUE").unwrap());
        let x = arena.variable("x", lattice.bottom());
        let y = arena.variable("y", lattice.bottom());

        let inequalities = vec![Inequality::new(x, y, ()), Inequality::new(y, t, ())];
        InequalitySolver::new(&*lattice)
            .solve(&mut arena, &inequalities, FixedPoint::Greatest)
            .unwrap();

        assert_eq!(arena.value(y), lattice.element("TRUE"));
        assert_eq!(arena.value(x), lattice.element("TRUE"));
    }

    #[test]
    fn fixed_terms_are_reported() {
        let lattice = Arc::new(builtin::logical_and().unwrap());
        let mut arena = TermArena::new(Arc::clone(&lattice));
        let f = arena.variable("f", lattice.element("FALSE").unwrap());
        let t = arena.variable("t", lattice.element("TRUE").unwrap());
        let x = arena.variable("x", lattice.bottom());

        let inequalities = vec![Inequality::new(x, t, ()), Inequality::new(f, x, ())];
        let report = InequalitySolver::new(&*lattice)
            .solve(&mut arena, &inequalities, FixedPoint::Least)
            .unwrap();

        // x is raised to FALSE, which no longer fits below TRUE.
        assert_eq!(report.unsatisfied, vec![0]);
        assert_eq!(arena.value(x), lattice.element("FALSE"));
    }

    #[test]
    fn ineffective_terms_are_skipped() {
        let lattice = Arc::new(builtin::logical_and().unwrap());
        let mut arena = TermArena::new(Arc::clone(&lattice));
        let f = arena.constant(lattice.element("FALSE").unwrap());
        let x = arena.variable("x", lattice.bottom());
        arena.set_effective(x, false).unwrap();

        let inequalities = vec![Inequality::new(f, x, ())];
        let report = InequalitySolver::new(&*lattice)
            .solve(&mut arena, &inequalities, FixedPoint::Least)
            .unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(arena.value(x), Ok(Property::Atom(lattice.bottom_atom())));
    }
}
