//! Finite property lattices.
//!
//! A [`PropertyLattice`] is a finite partial order over named atoms, given by its
//! covering relation. [`LatticeBuilder`] closes the covering relation
//! reflexively and transitively and checks that the result is a lattice: it must
//! be acyclic, have a unique bottom and top, and every pair of atoms must have a
//! unique greatest lower bound and least upper bound.
//!
//! Records mix with atoms as follows: bottom is below every record, top is above
//! every record, and a record is incomparable with every other atom.
use std::{cell::RefCell, collections::BTreeMap};

use bit_set::BitSet;
use log::debug;
use parking_lot::ReentrantMutex;
use petgraph::{algo::toposort, graph::DiGraph, graph::NodeIndex};

use crate::{
    cpo::{Cpo, CpoRelation},
    element::{AtomId, Property},
    record::RecordProperty,
    utils::{LatticeError, LatticeResult},
};

#[derive(Debug, Default)]
struct BoundTables {
    glb: BTreeMap<(AtomId, AtomId), AtomId>,
    lub: BTreeMap<(AtomId, AtomId), AtomId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Lower,
    Upper,
}

impl Bound {
    fn describe(self) -> &'static str {
        match self {
            Bound::Lower => "greatest lower bound",
            Bound::Upper => "least upper bound",
        }
    }
}

/// A finite lattice of named atoms.
///
/// # A note on concurrency
/// Atom bounds are computed on demand and memoized. The memo tables are guarded by
/// a single re-entrant lock so that
///  1) every operation on one lattice instance is serialized, and
///  2) record operations may recurse into atom operations while the lock is held.
///
/// A lattice is usually shared behind an `Arc` obtained from a
/// [`LatticeRegistry`](crate::registry::LatticeRegistry).
#[derive(Debug)]
pub struct PropertyLattice {
    name: String,
    elements: Vec<String>,
    index: BTreeMap<String, AtomId>,
    order: DiGraph<AtomId, ()>,
    up_sets: Vec<BitSet>,
    bottom: AtomId,
    top: AtomId,
    unacceptable: BitSet,
    literal: Option<AtomId>,
    bounds: ReentrantMutex<RefCell<BoundTables>>,
}

impl PropertyLattice {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of atoms.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Atoms in declaration order.
    pub fn atoms(&self) -> impl Iterator<Item = AtomId> + '_ {
        (0..self.elements.len()).map(|i| AtomId(i as u16))
    }

    pub fn atom(&self, name: &str) -> LatticeResult<AtomId> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| LatticeError::UnknownElement {
                lattice: self.name.clone(),
                element: name.to_string(),
            })
    }

    /// The atom named `name` as a [`Property`].
    pub fn element(&self, name: &str) -> LatticeResult<Property> {
        self.atom(name).map(Property::Atom)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn atom_name(&self, atom: AtomId) -> Option<&str> {
        self.elements.get(atom.index()).map(String::as_str)
    }

    pub fn bottom_atom(&self) -> AtomId {
        self.bottom
    }

    pub fn top_atom(&self) -> AtomId {
        self.top
    }

    /// Property of literal constants in expressions, when the lattice defines one.
    pub fn literal(&self) -> Option<Property> {
        self.literal.map(Property::Atom)
    }

    pub fn is_acceptable_atom(&self, atom: AtomId) -> bool {
        !self.unacceptable.contains(atom.index())
    }

    /// The covering relation. Edges go from the lower atom to the higher one.
    pub fn order(&self) -> &DiGraph<AtomId, ()> {
        &self.order
    }

    fn check(&self, atom: AtomId) -> LatticeResult<()> {
        if atom.index() < self.elements.len() {
            Ok(())
        } else {
            Err(LatticeError::UnknownElement {
                lattice: self.name.clone(),
                element: format!("#{}", atom.0),
            })
        }
    }

    fn atom_leq(&self, lhs: AtomId, rhs: AtomId) -> bool {
        self.up_sets[lhs.index()].contains(rhs.index())
    }

    fn compare_atoms(&self, lhs: AtomId, rhs: AtomId) -> LatticeResult<CpoRelation> {
        self.check(lhs)?;
        self.check(rhs)?;
        Ok(match (self.atom_leq(lhs, rhs), self.atom_leq(rhs, lhs)) {
            (true, true) => CpoRelation::Same,
            (true, false) => CpoRelation::Lower,
            (false, true) => CpoRelation::Higher,
            (false, false) => CpoRelation::Incomparable,
        })
    }

    fn atom_bound(&self, lhs: AtomId, rhs: AtomId, bound: Bound) -> LatticeResult<AtomId> {
        self.check(lhs)?;
        self.check(rhs)?;
        let key = (lhs.min(rhs), lhs.max(rhs));

        let guard = self.bounds.lock();
        let cached = {
            let tables = guard.borrow();
            match bound {
                Bound::Lower => tables.glb.get(&key).copied(),
                Bound::Upper => tables.lub.get(&key).copied(),
            }
        };
        if let Some(atom) = cached {
            return Ok(atom);
        }

        let result = self.compute_bound(lhs, rhs, bound)?;
        let mut tables = guard.borrow_mut();
        match bound {
            Bound::Lower => tables.glb.insert(key, result),
            Bound::Upper => tables.lub.insert(key, result),
        };
        Ok(result)
    }

    fn compute_bound(&self, lhs: AtomId, rhs: AtomId, bound: Bound) -> LatticeResult<AtomId> {
        let below = |a: AtomId, b: AtomId| match bound {
            Bound::Lower => self.atom_leq(a, b),
            Bound::Upper => self.atom_leq(b, a),
        };

        if below(lhs, rhs) {
            return Ok(lhs);
        }
        if below(rhs, lhs) {
            return Ok(rhs);
        }

        let candidates: Vec<AtomId> = self
            .atoms()
            .filter(|x| below(*x, lhs) && below(*x, rhs))
            .collect();

        candidates
            .iter()
            .copied()
            .find(|c| candidates.iter().all(|other| below(*other, *c)))
            .ok_or_else(|| LatticeError::NotALattice {
                lattice: self.name.clone(),
                lhs: self.elements[lhs.index()].clone(),
                rhs: self.elements[rhs.index()].clone(),
                bound: bound.describe(),
            })
    }

    /// Compute every pairwise bound once, filling the memo tables.
    fn validate(&self) -> LatticeResult<()> {
        for lhs in self.atoms() {
            for rhs in self.atoms().filter(|rhs| *rhs > lhs) {
                self.atom_bound(lhs, rhs, Bound::Lower)?;
                self.atom_bound(lhs, rhs, Bound::Upper)?;
            }
        }
        Ok(())
    }
}

impl Cpo for PropertyLattice {
    type Element = Property;

    fn compare(&self, lhs: &Property, rhs: &Property) -> LatticeResult<CpoRelation> {
        let _guard = self.bounds.lock();
        match (lhs, rhs) {
            (Property::Atom(a), Property::Atom(b)) => self.compare_atoms(*a, *b),
            (Property::Record(a), Property::Record(b)) => RecordProperty::compare(self, a, b),
            (Property::Atom(a), Property::Record(_)) => {
                self.check(*a)?;
                Ok(if *a == self.bottom {
                    CpoRelation::Lower
                } else if *a == self.top {
                    CpoRelation::Higher
                } else {
                    CpoRelation::Incomparable
                })
            }
            (Property::Record(_), Property::Atom(_)) => Ok(self.compare(rhs, lhs)?.inverse()),
        }
    }

    fn greatest_lower_bound(&self, lhs: &Property, rhs: &Property) -> LatticeResult<Property> {
        let _guard = self.bounds.lock();
        match (lhs, rhs) {
            (Property::Atom(a), Property::Atom(b)) => {
                self.atom_bound(*a, *b, Bound::Lower).map(Property::Atom)
            }
            (Property::Record(a), Property::Record(b)) => {
                RecordProperty::greatest_lower_bound(self, a, b).map(Property::Record)
            }
            (Property::Atom(atom), record @ Property::Record(_))
            | (record @ Property::Record(_), Property::Atom(atom)) => {
                self.check(*atom)?;
                Ok(if *atom == self.top {
                    record.clone()
                } else {
                    self.bottom()
                })
            }
        }
    }

    fn least_upper_bound(&self, lhs: &Property, rhs: &Property) -> LatticeResult<Property> {
        let _guard = self.bounds.lock();
        match (lhs, rhs) {
            (Property::Atom(a), Property::Atom(b)) => {
                self.atom_bound(*a, *b, Bound::Upper).map(Property::Atom)
            }
            (Property::Record(a), Property::Record(b)) => {
                RecordProperty::least_upper_bound(self, a, b).map(Property::Record)
            }
            (Property::Atom(atom), record @ Property::Record(_))
            | (record @ Property::Record(_), Property::Atom(atom)) => {
                self.check(*atom)?;
                Ok(if *atom == self.bottom {
                    record.clone()
                } else {
                    self.top()
                })
            }
        }
    }

    fn bottom(&self) -> Property {
        Property::Atom(self.bottom)
    }

    fn top(&self) -> Property {
        Property::Atom(self.top)
    }
}

/// Declarative construction of a [`PropertyLattice`].
///
/// ```rust
/// # use hylattice::{cpo::{Cpo, CpoRelation}, lattice::LatticeBuilder};
/// let lattice = LatticeBuilder::new("security")
///     .chain(["PUBLIC", "SECRET", "TOP_SECRET"])
///     .build()
///     .unwrap();
/// let public = lattice.element("PUBLIC").unwrap();
/// let secret = lattice.element("SECRET").unwrap();
/// assert_eq!(lattice.compare(&public, &secret), Ok(CpoRelation::Lower));
/// assert_eq!(lattice.least_upper_bound(&public, &secret), Ok(secret));
/// ```
#[derive(Debug, Clone, Default)]
pub struct LatticeBuilder {
    name: String,
    elements: Vec<String>,
    order: Vec<(String, String)>,
    unacceptable: Vec<String>,
    literal: Option<String>,
}

impl LatticeBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn element(mut self, name: impl Into<String>) -> Self {
        self.elements.push(name.into());
        self
    }

    pub fn elements<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.elements.extend(names.into_iter().map(Into::into));
        self
    }

    /// Declare that `lower` is covered by `higher`.
    pub fn order(mut self, lower: impl Into<String>, higher: impl Into<String>) -> Self {
        self.order.push((lower.into(), higher.into()));
        self
    }

    /// Declare a totally ordered chain of new elements, lowest first.
    pub fn chain<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        for pair in names.windows(2) {
            self.order.push((pair[0].clone(), pair[1].clone()));
        }
        self.elements.extend(names);
        self
    }

    /// Mark an element as an unacceptable final resolution.
    pub fn unacceptable(mut self, name: impl Into<String>) -> Self {
        self.unacceptable.push(name.into());
        self
    }

    /// Property given to literal constants.
    pub fn literal(mut self, name: impl Into<String>) -> Self {
        self.literal = Some(name.into());
        self
    }

    pub fn build(self) -> LatticeResult<PropertyLattice> {
        let name = self.name;
        if self.elements.is_empty() {
            return Err(LatticeError::EmptyLattice { lattice: name });
        }
        if self.elements.len() > u16::MAX as usize {
            return Err(LatticeError::NotALattice {
                lattice: name,
                lhs: self.elements[0].clone(),
                rhs: self.elements[self.elements.len() - 1].clone(),
                bound: "index within the supported number of elements",
            });
        }

        let mut index = BTreeMap::new();
        let mut order = DiGraph::with_capacity(self.elements.len(), self.order.len());
        for (i, element) in self.elements.iter().enumerate() {
            let atom = AtomId(i as u16);
            if index.insert(element.clone(), atom).is_some() {
                return Err(LatticeError::DuplicateElement {
                    lattice: name,
                    element: element.clone(),
                });
            }
            order.add_node(atom);
        }

        let lookup = |element: &str| {
            index
                .get(element)
                .copied()
                .ok_or_else(|| LatticeError::UnknownElement {
                    lattice: name.clone(),
                    element: element.to_string(),
                })
        };

        for (lower, higher) in self.order.iter() {
            let (lower, higher) = (lookup(lower)?, lookup(higher)?);
            order.update_edge(
                NodeIndex::new(lower.index()),
                NodeIndex::new(higher.index()),
                (),
            );
        }

        let sorted = toposort(&order, None).map_err(|cycle| LatticeError::Cycle {
            lattice: name.clone(),
            element: self.elements[cycle.node_id().index()].clone(),
        })?;

        // Reflexive-transitive closure, highest atoms first.
        let n = self.elements.len();
        let mut up_sets = vec![BitSet::with_capacity(n); n];
        for node in sorted.iter().rev() {
            let mut up = BitSet::with_capacity(n);
            up.insert(node.index());
            for succ in order.neighbors(*node) {
                up.union_with(&up_sets[succ.index()]);
            }
            up_sets[node.index()] = up;
        }

        let bottom = (0..n)
            .find(|i| up_sets[*i].len() == n)
            .map(|i| AtomId(i as u16))
            .ok_or_else(|| LatticeError::NoUniqueBottom {
                lattice: name.clone(),
            })?;
        let top = (0..n)
            .find(|i| up_sets.iter().all(|up| up.contains(*i)))
            .map(|i| AtomId(i as u16))
            .ok_or_else(|| LatticeError::NoUniqueTop {
                lattice: name.clone(),
            })?;

        let mut unacceptable = BitSet::with_capacity(n);
        for element in self.unacceptable.iter() {
            unacceptable.insert(lookup(element)?.index());
        }
        let literal = self.literal.as_deref().map(lookup).transpose()?;

        let lattice = PropertyLattice {
            name,
            elements: self.elements,
            index,
            order,
            up_sets,
            bottom,
            top,
            unacceptable,
            literal,
            bounds: ReentrantMutex::new(RefCell::new(BoundTables::default())),
        };
        lattice.validate()?;

        debug!(
            "Built lattice `{}` with {} element(s), bottom `{}` and top `{}`.",
            lattice.name,
            lattice.len(),
            lattice.elements[bottom.index()],
            lattice.elements[top.index()],
        );
        Ok(lattice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diamond() -> PropertyLattice {
        LatticeBuilder::new("diamond")
            .elements(["BOT", "A", "B", "TOP"])
            .order("BOT", "A")
            .order("BOT", "B")
            .order("A", "TOP")
            .order("B", "TOP")
            .build()
            .unwrap()
    }

    #[test]
    fn diamond_bounds() {
        let lattice = diamond();
        let a = lattice.element("A").unwrap();
        let b = lattice.element("B").unwrap();

        assert_eq!(lattice.compare(&a, &b), Ok(CpoRelation::Incomparable));
        assert_eq!(lattice.greatest_lower_bound(&a, &b), Ok(lattice.bottom()));
        assert_eq!(lattice.least_upper_bound(&a, &b), Ok(lattice.top()));
        assert_eq!(lattice.compare(&lattice.bottom(), &a), Ok(CpoRelation::Lower));
    }

    #[test]
    fn rejects_cycles() {
        let err = LatticeBuilder::new("cyclic")
            .elements(["A", "B"])
            .order("A", "B")
            .order("B", "A")
            .build()
            .unwrap_err();
        assert!(err.is_cycle());
    }

    #[test]
    fn rejects_missing_bottom() {
        let err = LatticeBuilder::new("two_minimal")
            .elements(["A", "B", "TOP"])
            .order("A", "TOP")
            .order("B", "TOP")
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            LatticeError::NoUniqueBottom {
                lattice: "two_minimal".to_string()
            }
        );
    }

    #[test]
    fn rejects_pairs_without_unique_bounds() {
        // BOT < A, B < C, D < TOP with both A and B below both C and D.
        let err = LatticeBuilder::new("bowtie")
            .elements(["BOT", "A", "B", "C", "D", "TOP"])
            .order("BOT", "A")
            .order("BOT", "B")
            .order("A", "C")
            .order("A", "D")
            .order("B", "C")
            .order("B", "D")
            .order("C", "TOP")
            .order("D", "TOP")
            .build()
            .unwrap_err();
        assert!(err.is_not_a_lattice());
    }

    #[test]
    fn rejects_unknown_and_duplicate_names() {
        let err = LatticeBuilder::new("l")
            .element("A")
            .order("A", "B")
            .build()
            .unwrap_err();
        assert!(err.is_unknown_element());

        let err = LatticeBuilder::new("l")
            .elements(["A", "A"])
            .build()
            .unwrap_err();
        assert!(err.is_duplicate_element());
    }

    #[test]
    fn records_against_atoms() {
        let lattice = diamond();
        let a = lattice.element("A").unwrap();
        let record = Property::from(RecordProperty::new([("x", a.clone())]));

        assert_eq!(
            lattice.compare(&lattice.bottom(), &record),
            Ok(CpoRelation::Lower)
        );
        assert_eq!(
            lattice.compare(&record, &lattice.top()),
            Ok(CpoRelation::Lower)
        );
        assert_eq!(lattice.compare(&record, &a), Ok(CpoRelation::Incomparable));
        assert_eq!(
            lattice.greatest_lower_bound(&record, &a),
            Ok(lattice.bottom())
        );
        assert_eq!(lattice.least_upper_bound(&record, &a), Ok(lattice.top()));
        assert_eq!(
            lattice.least_upper_bound(&record, &lattice.bottom()),
            Ok(record.clone())
        );
    }

    #[test]
    fn unknown_atoms_are_rejected() {
        let lattice = diamond();
        let stray = Property::Atom(AtomId(42));
        assert!(
            lattice
                .compare(&stray, &lattice.bottom())
                .unwrap_err()
                .is_unknown_element()
        );
    }
}
