//! Lattice values.
//!
//! A [`Property`] is either an atom of a [`PropertyLattice`] or a structured
//! [`RecordProperty`]. Properties do not carry a reference to their lattice, the
//! predicates below take it explicitly. The bottom atom plays the role of
//! "unknown": it is the only non-constant atom and it admits any substitution.
use std::fmt::Display;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::{EnumIs, EnumTryAs};

use crate::{lattice::PropertyLattice, record::RecordProperty};

/// Index of an atom inside its [`PropertyLattice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AtomId(pub(crate) u16);

impl AtomId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A lattice-valued property.
#[derive(Debug, Clone, PartialEq, Eq, EnumIs, EnumTryAs)]
pub enum Property {
    /// A named element of a finite lattice.
    Atom(AtomId),
    /// A record of labelled properties. Records with more fields are lower.
    Record(RecordProperty),
}

impl From<AtomId> for Property {
    fn from(value: AtomId) -> Self {
        Property::Atom(value)
    }
}

impl From<RecordProperty> for Property {
    fn from(value: RecordProperty) -> Self {
        Property::Record(value)
    }
}

impl Property {
    /// Whether this property fixes the value of a term declared with it.
    ///
    /// Atoms other than bottom are constant; a record is constant when every
    /// declared field is constant.
    pub fn is_constant(&self, lattice: &PropertyLattice) -> bool {
        match self {
            Property::Atom(atom) => *atom != lattice.bottom_atom(),
            Property::Record(record) => record.is_constant(lattice),
        }
    }

    /// Whether this property denotes a concrete value, i.e. contains no unknown part.
    pub fn is_instantiable(&self, lattice: &PropertyLattice) -> bool {
        match self {
            Property::Atom(atom) => *atom != lattice.bottom_atom(),
            Property::Record(record) => record.is_instantiable(lattice),
        }
    }

    /// Whether `value` can be obtained from `self` by substituting its unknown parts.
    pub fn is_substitution_instance(&self, lattice: &PropertyLattice, value: &Property) -> bool {
        match (self, value) {
            (Property::Atom(atom), _) if *atom == lattice.bottom_atom() => true,
            (Property::Atom(atom), Property::Atom(other)) => atom == other,
            (Property::Record(record), Property::Record(other)) => {
                record.is_substitution_instance(lattice, other)
            }
            _ => false,
        }
    }

    /// Whether this property is an acceptable final resolution in `lattice`.
    pub fn is_acceptable(&self, lattice: &PropertyLattice) -> bool {
        match self {
            Property::Atom(atom) => lattice.is_acceptable_atom(*atom),
            Property::Record(record) => record.is_acceptable(lattice),
        }
    }

    /// Nesting depth of the property. Atoms have depth 0, a record of atoms depth 1.
    pub fn depth(&self) -> usize {
        match self {
            Property::Atom(_) => 0,
            Property::Record(record) => record.depth(),
        }
    }

    /// Render the property with the element names of `lattice`.
    ///
    /// ```rust
    /// # use hylattice::{registry::builtin, element::Property, record::RecordProperty};
    /// let lattice = builtin::logical_and().unwrap();
    /// let value = lattice.element("TRUE").unwrap();
    /// assert_eq!(value.fmt(&lattice).to_string(), "TRUE");
    /// let record = Property::from(RecordProperty::new([("a", value)]));
    /// assert_eq!(record.fmt(&lattice).to_string(), "{a = TRUE}");
    /// ```
    pub fn fmt<'a>(&'a self, lattice: &'a PropertyLattice) -> impl Display + 'a {
        struct PropertyFmt<'a> {
            property: &'a Property,
            lattice: &'a PropertyLattice,
        }

        impl Display for PropertyFmt<'_> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self.property {
                    Property::Atom(atom) => match self.lattice.atom_name(*atom) {
                        Some(name) => f.write_str(name),
                        None => write!(f, "<unknown atom #{}>", atom.0),
                    },
                    Property::Record(record) => {
                        f.write_str("{")?;
                        for (i, (label, value)) in record.iter().enumerate() {
                            if i != 0 {
                                f.write_str(", ")?;
                            }
                            write!(f, "{} = {}", label, value.fmt(self.lattice))?;
                        }
                        f.write_str("}")
                    }
                }
            }
        }

        PropertyFmt {
            property: self,
            lattice,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cpo::Cpo, registry::builtin};

    #[test]
    fn bottom_is_the_only_non_constant_atom() {
        let lattice = builtin::logical_and().unwrap();
        let unknown = lattice.element("UNKNOWN").unwrap();
        let truth = lattice.element("TRUE").unwrap();

        assert!(!unknown.is_constant(&lattice));
        assert!(truth.is_constant(&lattice));
        assert!(!unknown.is_instantiable(&lattice));
        assert!(unknown.is_substitution_instance(&lattice, &truth));
        assert!(!truth.is_substitution_instance(&lattice, &unknown));
    }

    #[test]
    fn unknown_accepts_records() {
        let lattice = builtin::logical_and().unwrap();
        let record = Property::from(RecordProperty::new([(
            "a",
            lattice.element("FALSE").unwrap(),
        )]));
        assert!(
            lattice
                .bottom()
                .is_substitution_instance(&lattice, &record)
        );
        assert_eq!(record.depth(), 1);
        assert!(record.is_constant(&lattice));
    }

    #[test]
    fn acceptability_follows_the_lattice() {
        let lattice = builtin::dimension().unwrap();
        assert!(lattice.element("TIME").unwrap().is_acceptable(&lattice));
        assert!(!lattice.element("CONFLICT").unwrap().is_acceptable(&lattice));

        let record = Property::from(RecordProperty::new([
            ("t", lattice.element("TIME").unwrap()),
            ("c", lattice.element("CONFLICT").unwrap()),
        ]));
        assert!(!record.is_acceptable(&lattice));
    }
}
