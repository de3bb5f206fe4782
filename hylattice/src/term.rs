//! Property terms.
//!
//! Terms are the nodes of the constraint graph. They live in a [`TermArena`] and
//! are referred to by [`TermId`]. A term is either a constant, a variable bound to
//! an object of the client (a port, an attribute, an expression node...), or a
//! function of other terms. Resolved values of variables are stored in the arena,
//! next to the terms, so that a whole resolution can be reset at once with
//! [`TermArena::reinitialize`].
use std::{collections::BTreeMap, sync::Arc};

use log::trace;
use slotmap::{SecondaryMap, SlotMap, new_key_type};
use smallvec::SmallVec;

use crate::{
    cpo::Cpo,
    element::Property,
    lattice::PropertyLattice,
    record::{MAX_DEPTH_BOUND, RecordProperty},
    utils::{LatticeError, LatticeResult},
};

new_key_type! {
    /// Identifier of a term inside a [`TermArena`].
    pub struct TermId;
}

/// A variable term bound to an object.
#[derive(Debug, Clone)]
pub struct VariableTerm<O> {
    /// The object whose property this variable stands for.
    pub object: O,
    /// Declared property. A constant declaration fixes the variable.
    pub declared: Property,
    /// Ineffective variables do not take part in the resolution.
    pub effective: bool,
}

/// A term computed from other terms. Evaluation is monotone in the children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionTerm {
    /// Greatest lower bound of the effective children, top when there is none.
    Meet(Vec<TermId>),
    /// Record whose fields are the values of the labelled children.
    Record(BTreeMap<String, TermId>),
}

#[derive(Debug, Clone)]
pub enum PropertyTerm<O> {
    Constant(Property),
    Variable(VariableTerm<O>),
    Function(FunctionTerm),
}

/// What the generic inequality solver needs from a term storage.
pub trait TermStore {
    type Value: Clone;

    /// Current value of a term.
    fn value(&self, term: TermId) -> LatticeResult<Self::Value>;

    /// Whether the solver may assign a value to the term.
    fn is_settable(&self, term: TermId) -> bool;

    /// Whether the term takes part in the resolution.
    fn is_effective(&self, term: TermId) -> bool;

    /// Settable variables the value of `term` depends on.
    fn variables(&self, term: TermId) -> SmallVec<TermId, 4>;

    fn set_value(&mut self, term: TermId, value: Self::Value) -> LatticeResult<()>;

    /// Reset a settable variable to the starting point of a resolution.
    fn initialize(&mut self, term: TermId, value: &Self::Value) -> LatticeResult<()>;

    /// Whether the current value of the term is an acceptable resolution.
    fn is_value_acceptable(&self, term: TermId) -> LatticeResult<bool>;
}

/// Storage of property terms over one lattice.
///
/// `O` is the type of objects variables are bound to.
///
/// ```rust
/// # use hylattice::{registry::builtin, term::{TermArena, TermStore}, cpo::Cpo};
/// # use std::sync::Arc;
/// let lattice = Arc::new(builtin::logical_and().unwrap());
/// let mut arena = TermArena::new(Arc::clone(&lattice));
/// let t = arena.constant(lattice.element("TRUE").unwrap());
/// let x = arena.variable("x", lattice.bottom());
/// let meet = arena.meet(vec![t, x]);
/// assert_eq!(arena.value(meet).unwrap(), lattice.bottom());
/// assert_eq!(arena.variables(meet).as_slice(), &[x]);
/// ```
#[derive(Debug, Clone)]
pub struct TermArena<O> {
    lattice: Arc<PropertyLattice>,
    terms: SlotMap<TermId, PropertyTerm<O>>,
    resolved: SecondaryMap<TermId, Property>,
}

impl<O> TermArena<O> {
    pub fn new(lattice: Arc<PropertyLattice>) -> Self {
        Self {
            lattice,
            terms: SlotMap::with_key(),
            resolved: SecondaryMap::new(),
        }
    }

    pub fn lattice(&self) -> &Arc<PropertyLattice> {
        &self.lattice
    }

    pub fn constant(&mut self, property: Property) -> TermId {
        self.terms.insert(PropertyTerm::Constant(property))
    }

    /// A new effective variable bound to `object`, resolved to its declaration.
    pub fn variable(&mut self, object: O, declared: Property) -> TermId {
        let id = self.terms.insert(PropertyTerm::Variable(VariableTerm {
            object,
            declared: declared.clone(),
            effective: true,
        }));
        self.resolved.insert(id, declared);
        id
    }

    pub fn meet(&mut self, children: Vec<TermId>) -> TermId {
        self.terms
            .insert(PropertyTerm::Function(FunctionTerm::Meet(children)))
    }

    pub fn record(&mut self, fields: BTreeMap<String, TermId>) -> TermId {
        self.terms
            .insert(PropertyTerm::Function(FunctionTerm::Record(fields)))
    }

    pub fn get(&self, term: TermId) -> Option<&PropertyTerm<O>> {
        self.terms.get(term)
    }

    /// Terms in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (TermId, &PropertyTerm<O>)> {
        self.terms.iter()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    fn variable_term(&self, term: TermId) -> LatticeResult<&VariableTerm<O>> {
        match self.terms.get(term) {
            Some(PropertyTerm::Variable(variable)) => Ok(variable),
            Some(_) => Err(LatticeError::NotSettable {
                term: format!("{:?}", term),
            }),
            None => Err(LatticeError::UnknownTerm),
        }
    }

    pub fn set_effective(&mut self, term: TermId, effective: bool) -> LatticeResult<()> {
        match self.terms.get_mut(term) {
            Some(PropertyTerm::Variable(variable)) => {
                variable.effective = effective;
                Ok(())
            }
            Some(_) => Err(LatticeError::NotSettable {
                term: format!("{:?}", term),
            }),
            None => Err(LatticeError::UnknownTerm),
        }
    }

    /// Replace the declaration of a variable and reset its value to it.
    pub fn declare(&mut self, term: TermId, declared: Property) -> LatticeResult<()> {
        match self.terms.get_mut(term) {
            Some(PropertyTerm::Variable(variable)) => {
                variable.declared = declared.clone();
                self.resolved.insert(term, declared);
                Ok(())
            }
            Some(_) => Err(LatticeError::NotSettable {
                term: format!("{:?}", term),
            }),
            None => Err(LatticeError::UnknownTerm),
        }
    }

    /// Reset the resolved value of every variable to its declaration.
    pub fn reinitialize(&mut self) {
        self.resolved.clear();
        for (id, term) in self.terms.iter() {
            if let PropertyTerm::Variable(variable) = term {
                self.resolved.insert(id, variable.declared.clone());
            }
        }
    }

    /// Declared property of a variable, `None` for any other term.
    pub fn declared(&self, term: TermId) -> Option<&Property> {
        match self.terms.get(term) {
            Some(PropertyTerm::Variable(variable)) => Some(&variable.declared),
            _ => None,
        }
    }

    /// The object a variable is bound to.
    pub fn object(&self, term: TermId) -> Option<&O> {
        match self.terms.get(term) {
            Some(PropertyTerm::Variable(variable)) => Some(&variable.object),
            _ => None,
        }
    }

    fn collect_variables(&self, term: TermId, out: &mut SmallVec<TermId, 4>) {
        match self.terms.get(term) {
            Some(PropertyTerm::Variable(_)) if self.is_settable(term) => {
                if !out.contains(&term) {
                    out.push(term);
                }
            }
            Some(PropertyTerm::Function(FunctionTerm::Meet(children))) => {
                for child in children {
                    self.collect_variables(*child, out);
                }
            }
            Some(PropertyTerm::Function(FunctionTerm::Record(fields))) => {
                for child in fields.values() {
                    self.collect_variables(*child, out);
                }
            }
            _ => {}
        }
    }
}

impl<O> TermStore for TermArena<O> {
    type Value = Property;

    fn value(&self, term: TermId) -> LatticeResult<Property> {
        match self.terms.get(term).ok_or(LatticeError::UnknownTerm)? {
            PropertyTerm::Constant(property) => Ok(property.clone()),
            PropertyTerm::Variable(variable) => Ok(self
                .resolved
                .get(term)
                .unwrap_or(&variable.declared)
                .clone()),
            PropertyTerm::Function(FunctionTerm::Meet(children)) => {
                let values = children
                    .iter()
                    .filter(|child| self.is_effective(**child))
                    .map(|child| self.value(*child))
                    .collect::<LatticeResult<Vec<_>>>()?;
                if values.is_empty() {
                    Ok(self.lattice.top())
                } else {
                    self.lattice.glb_of(values.iter())
                }
            }
            PropertyTerm::Function(FunctionTerm::Record(fields)) => {
                let fields = fields
                    .iter()
                    .map(|(label, child)| Ok((label.clone(), self.value(*child)?)))
                    .collect::<LatticeResult<Vec<_>>>()?;
                Ok(Property::Record(RecordProperty::new(fields)))
            }
        }
    }

    fn is_settable(&self, term: TermId) -> bool {
        match self.terms.get(term) {
            Some(PropertyTerm::Variable(variable)) => !variable.declared.is_constant(&self.lattice),
            _ => false,
        }
    }

    fn is_effective(&self, term: TermId) -> bool {
        match self.terms.get(term) {
            Some(PropertyTerm::Constant(_)) => true,
            Some(PropertyTerm::Variable(variable)) => variable.effective,
            Some(PropertyTerm::Function(FunctionTerm::Meet(children))) => {
                children.iter().any(|child| self.is_effective(*child))
            }
            Some(PropertyTerm::Function(FunctionTerm::Record(_))) => true,
            None => false,
        }
    }

    fn variables(&self, term: TermId) -> SmallVec<TermId, 4> {
        let mut out = SmallVec::new();
        self.collect_variables(term, &mut out);
        out
    }

    fn set_value(&mut self, term: TermId, value: Property) -> LatticeResult<()> {
        let depth = value.depth();
        if depth > MAX_DEPTH_BOUND {
            return Err(LatticeError::StructureDivergence {
                depth,
                bound: MAX_DEPTH_BOUND,
            });
        }

        let lattice = Arc::clone(&self.lattice);
        let variable = self.variable_term(term)?;
        if variable.declared.is_constant(&lattice) {
            return Err(LatticeError::NotSettable {
                term: variable.declared.fmt(&lattice).to_string(),
            });
        }
        if !variable.declared.is_substitution_instance(&lattice, &value) {
            return Err(LatticeError::ValueConflict {
                declared: variable.declared.fmt(&lattice).to_string(),
                value: value.fmt(&lattice).to_string(),
            });
        }

        trace!("Set term {:?} to {}.", term, value.fmt(&lattice));
        if variable.declared.is_record() {
            if let (Some(Property::Record(resolved)), Property::Record(value)) =
                (self.resolved.get_mut(term), &value)
            {
                return resolved.update(&lattice, value);
            }
        }
        self.resolved.insert(term, value);
        Ok(())
    }

    fn initialize(&mut self, term: TermId, value: &Property) -> LatticeResult<()> {
        let lattice = Arc::clone(&self.lattice);
        let variable = self.variable_term(term)?;
        if variable.declared.is_constant(&lattice) {
            return Err(LatticeError::NotSettable {
                term: variable.declared.fmt(&lattice).to_string(),
            });
        }

        let initial = match &variable.declared {
            Property::Record(shape) => {
                let mut shape = shape.clone();
                shape.initialize(&lattice, value);
                Property::Record(shape)
            }
            Property::Atom(_) => value.clone(),
        };
        self.resolved.insert(term, initial);
        Ok(())
    }

    fn is_value_acceptable(&self, term: TermId) -> LatticeResult<bool> {
        Ok(self.value(term)?.is_acceptable(&self.lattice))
    }
}
