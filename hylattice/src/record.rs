//! Record properties.
//!
//! A [`RecordProperty`] maps labels to fields. Each field keeps the property it
//! was declared with next to the property it currently resolves to, so that a
//! record used as the declared shape of a variable can be refined field by field
//! while its constant parts stay fixed.
//!
//! The order on records is structural subtyping: a record with more labels is
//! lower, shared fields are compared pointwise. The greatest lower bound takes
//! the union of both label sets and the least upper bound their intersection.
use std::collections::BTreeMap;

use crate::{
    cpo::{Cpo, CpoRelation},
    element::Property,
    lattice::PropertyLattice,
    utils::{LatticeError, LatticeResult},
};

/// Maximum nesting depth of a structured property. Resolutions going deeper are
/// reported as diverging.
pub const MAX_DEPTH_BOUND: usize = 20;

/// A labelled field of a [`RecordProperty`].
#[derive(Debug, Clone)]
pub struct FieldProperty {
    declared: Property,
    resolved: Property,
}

impl FieldProperty {
    pub fn new(declared: Property) -> Self {
        Self {
            resolved: declared.clone(),
            declared,
        }
    }

    pub fn declared(&self) -> &Property {
        &self.declared
    }

    pub fn resolved(&self) -> &Property {
        &self.resolved
    }

    pub fn is_settable(&self, lattice: &PropertyLattice) -> bool {
        !self.declared.is_constant(lattice)
    }

    fn initialize(&mut self, lattice: &PropertyLattice, value: &Property) {
        if !self.is_settable(lattice) {
            return;
        }

        let structured = self.declared.is_record();
        match &mut self.resolved {
            Property::Record(record) if structured => record.initialize(lattice, value),
            resolved => *resolved = value.clone(),
        }
    }

    fn set_value(&mut self, lattice: &PropertyLattice, value: &Property) -> LatticeResult<()> {
        if !self.declared.is_substitution_instance(lattice, value) {
            return Err(LatticeError::ValueConflict {
                declared: self.declared.fmt(lattice).to_string(),
                value: value.fmt(lattice).to_string(),
            });
        }

        let structured = self.declared.is_record();
        match (&mut self.resolved, value) {
            (Property::Record(record), Property::Record(value)) if structured => {
                record.update(lattice, value)
            }
            (resolved, value) => {
                *resolved = value.clone();
                Ok(())
            }
        }
    }
}

/// A structured property made of labelled fields.
#[derive(Debug, Clone, Default)]
pub struct RecordProperty {
    fields: BTreeMap<String, FieldProperty>,
}

impl PartialEq for RecordProperty {
    fn eq(&self, other: &Self) -> bool {
        self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(other.fields.iter())
                .all(|((l1, f1), (l2, f2))| l1 == l2 && f1.resolved == f2.resolved)
    }
}

impl Eq for RecordProperty {}

impl<S: Into<String>> FromIterator<(S, Property)> for RecordProperty {
    fn from_iter<T: IntoIterator<Item = (S, Property)>>(iter: T) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(label, property)| (label.into(), FieldProperty::new(property)))
                .collect(),
        }
    }
}

impl RecordProperty {
    /// Build a record whose fields are declared with the given properties.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, Property)>,
        S: Into<String>,
    {
        fields.into_iter().collect()
    }

    /// The resolved property of the field `label`.
    pub fn get(&self, label: &str) -> Option<&Property> {
        self.fields.get(label).map(FieldProperty::resolved)
    }

    pub fn field(&self, label: &str) -> Option<&FieldProperty> {
        self.fields.get(label)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Iterate over `(label, resolved property)` pairs in label order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Property)> {
        self.fields
            .iter()
            .map(|(label, field)| (label.as_str(), &field.resolved))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// `1 + ` the deepest nested record among the resolved fields.
    pub fn depth(&self) -> usize {
        1 + self
            .fields
            .values()
            .map(|field| field.resolved.depth())
            .max()
            .unwrap_or(0)
    }

    pub fn is_constant(&self, lattice: &PropertyLattice) -> bool {
        self.fields
            .values()
            .all(|field| field.declared.is_constant(lattice))
    }

    pub fn is_instantiable(&self, lattice: &PropertyLattice) -> bool {
        self.fields
            .values()
            .all(|field| field.resolved.is_instantiable(lattice))
    }

    pub fn is_acceptable(&self, lattice: &PropertyLattice) -> bool {
        self.fields
            .values()
            .all(|field| field.resolved.is_acceptable(lattice))
    }

    /// Same labels, and every resolved field of `other` substitutes the declared field of `self`.
    pub fn is_substitution_instance(&self, lattice: &PropertyLattice, other: &RecordProperty) -> bool {
        self.fields.len() == other.fields.len()
            && self.fields.iter().all(|(label, field)| {
                other
                    .get(label)
                    .is_some_and(|value| field.declared.is_substitution_instance(lattice, value))
            })
    }

    /// Reset every settable field to `value`, recursing into declared sub-records.
    pub fn initialize(&mut self, lattice: &PropertyLattice, value: &Property) {
        for field in self.fields.values_mut() {
            field.initialize(lattice, value);
        }
    }

    /// Refine the settable fields of this record with the fields of `value`.
    ///
    /// `value` must have the same labels as `self` and agree with every constant
    /// field, otherwise [`LatticeError::ValueConflict`] is returned. A value nested
    /// deeper than [`MAX_DEPTH_BOUND`] fails with [`LatticeError::StructureDivergence`].
    pub fn update(&mut self, lattice: &PropertyLattice, value: &RecordProperty) -> LatticeResult<()> {
        let depth = value.depth();
        if depth > MAX_DEPTH_BOUND {
            return Err(LatticeError::StructureDivergence {
                depth,
                bound: MAX_DEPTH_BOUND,
            });
        }

        if self.is_constant(lattice) {
            if self == value {
                return Ok(());
            }
            return Err(self.conflict(lattice, value));
        }

        if !self.is_substitution_instance(lattice, value) {
            return Err(self.conflict(lattice, value));
        }

        for (label, field) in self.fields.iter_mut() {
            if !field.is_settable(lattice) {
                continue;
            }
            if let Some(new_value) = value.get(label) {
                field.set_value(lattice, new_value)?;
            }
        }
        Ok(())
    }

    fn conflict(&self, lattice: &PropertyLattice, value: &RecordProperty) -> LatticeError {
        LatticeError::ValueConflict {
            declared: Property::Record(self.clone()).fmt(lattice).to_string(),
            value: Property::Record(value.clone()).fmt(lattice).to_string(),
        }
    }

    /// `lhs <= rhs`: `lhs` has every label of `rhs` and the shared fields are lower or equal.
    fn is_at_most(lattice: &PropertyLattice, lhs: &Self, rhs: &Self) -> LatticeResult<bool> {
        for (label, field) in rhs.fields.iter() {
            let Some(value) = lhs.get(label) else {
                return Ok(false);
            };
            if !lattice.leq(value, &field.resolved)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub(crate) fn compare(
        lattice: &PropertyLattice,
        lhs: &Self,
        rhs: &Self,
    ) -> LatticeResult<CpoRelation> {
        if lhs == rhs {
            Ok(CpoRelation::Same)
        } else if Self::is_at_most(lattice, lhs, rhs)? {
            Ok(CpoRelation::Lower)
        } else if Self::is_at_most(lattice, rhs, lhs)? {
            Ok(CpoRelation::Higher)
        } else {
            Ok(CpoRelation::Incomparable)
        }
    }

    pub(crate) fn greatest_lower_bound(
        lattice: &PropertyLattice,
        lhs: &Self,
        rhs: &Self,
    ) -> LatticeResult<Self> {
        let mut fields = BTreeMap::new();
        for (label, value) in lhs.iter() {
            let bound = match rhs.get(label) {
                Some(other) => lattice.greatest_lower_bound(value, other)?,
                None => value.clone(),
            };
            fields.insert(label.to_string(), bound);
        }
        for (label, value) in rhs.iter() {
            if !fields.contains_key(label) {
                fields.insert(label.to_string(), value.clone());
            }
        }
        Ok(Self::new(fields))
    }

    pub(crate) fn least_upper_bound(
        lattice: &PropertyLattice,
        lhs: &Self,
        rhs: &Self,
    ) -> LatticeResult<Self> {
        let mut fields = BTreeMap::new();
        for (label, value) in lhs.iter() {
            if let Some(other) = rhs.get(label) {
                fields.insert(label.to_string(), lattice.least_upper_bound(value, other)?);
            }
        }
        Ok(Self::new(fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::builtin;

    #[test]
    fn depth_counts_nested_records() {
        let lattice = builtin::logical_and().unwrap();
        let t = lattice.element("TRUE").unwrap();
        let inner = RecordProperty::new([("x", t.clone())]);
        let outer = RecordProperty::new([("a", Property::from(inner)), ("b", t)]);
        assert_eq!(outer.depth(), 2);
        assert_eq!(RecordProperty::default().depth(), 1);
    }

    #[test]
    fn shape_with_unknown_field_is_refined() {
        let lattice = builtin::logical_and().unwrap();
        let unknown = lattice.bottom();
        let f = lattice.element("FALSE").unwrap();
        let t = lattice.element("TRUE").unwrap();

        let mut shape = RecordProperty::new([("a", unknown), ("b", t.clone())]);
        assert!(!shape.is_constant(&lattice));

        shape
            .update(&lattice, &RecordProperty::new([("a", f.clone()), ("b", t.clone())]))
            .unwrap();
        assert_eq!(shape.get("a"), Some(&f));

        // constant field must agree
        let err = shape
            .update(&lattice, &RecordProperty::new([("a", f.clone()), ("b", f)]))
            .unwrap_err();
        assert!(err.is_value_conflict());
    }

    #[test]
    fn update_rejects_different_labels() {
        let lattice = builtin::logical_and().unwrap();
        let mut shape = RecordProperty::new([("a", lattice.bottom())]);
        let err = shape
            .update(
                &lattice,
                &RecordProperty::new([("b", lattice.element("TRUE").unwrap())]),
            )
            .unwrap_err();
        assert_eq!(
            err,
            LatticeError::ValueConflict {
                declared: "{a = UNKNOWN}".to_string(),
                value: "{b = TRUE}".to_string(),
            }
        );
    }

    #[test]
    fn update_rejects_divergent_values() {
        let lattice = builtin::logical_and().unwrap();
        let mut value = Property::from(RecordProperty::default());
        for _ in 0..MAX_DEPTH_BOUND {
            value = Property::from(RecordProperty::new([("a", value)]));
        }
        assert_eq!(value.depth(), MAX_DEPTH_BOUND + 1);

        let mut shape = RecordProperty::new([("a", lattice.bottom())]);
        let Property::Record(value) = value else {
            unreachable!()
        };
        assert_eq!(
            shape.update(&lattice, &value),
            Err(LatticeError::StructureDivergence {
                depth: MAX_DEPTH_BOUND + 1,
                bound: MAX_DEPTH_BOUND
            })
        );
    }

    #[test]
    fn initialize_keeps_constant_fields() {
        let lattice = builtin::logical_and().unwrap();
        let t = lattice.element("TRUE").unwrap();
        let mut shape = RecordProperty::new([("a", lattice.bottom()), ("b", t.clone())]);
        shape.initialize(&lattice, &lattice.top());
        assert_eq!(shape.get("a"), Some(&lattice.top()));
        assert_eq!(shape.get("b"), Some(&t));
    }
}
