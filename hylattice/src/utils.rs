use strum::EnumIs;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIs, Error)]
pub enum LatticeError {
    /// A name or an atom identifier does not belong to the lattice.
    #[error("Lattice `{lattice}` has no element `{element}`.")]
    UnknownElement { lattice: String, element: String },

    /// A bound was requested over an empty set of properties.
    #[error(
        "Cannot compute a greatest lower bound or least upper bound over an empty set of properties."
    )]
    EmptyBound,

    /// The lattice declaration has no elements at all.
    #[error("Lattice `{lattice}` does not declare any element.")]
    EmptyLattice { lattice: String },

    /// The same element is declared twice.
    #[error("Lattice `{lattice}` declares the element `{element}` more than once.")]
    DuplicateElement { lattice: String, element: String },

    /// The covering relation is not acyclic.
    #[error(
        "The order of lattice `{lattice}` contains a cycle through `{element}`. A partial order must be antisymmetric."
    )]
    Cycle { lattice: String, element: String },

    /// No element is below every other element.
    #[error("Lattice `{lattice}` has no unique bottom element.")]
    NoUniqueBottom { lattice: String },

    /// No element is above every other element.
    #[error("Lattice `{lattice}` has no unique top element.")]
    NoUniqueTop { lattice: String },

    /// Two elements have no unique greatest lower bound or least upper bound.
    #[error(
        "The order of `{lattice}` is not a lattice: elements `{lhs}` and `{rhs}` have no unique {bound}."
    )]
    NotALattice {
        lattice: String,
        lhs: String,
        rhs: String,
        bound: &'static str,
    },

    /// Registry lookup failure.
    #[error("No lattice named `{name}` is registered. Known lattices are: {known:?}.")]
    UnknownLattice { name: String, known: Vec<String> },

    /// A variable was assigned a value that is not a substitution instance of its declaration.
    #[error(
        "Cannot set a property term declared as `{declared}` to `{value}`. The value is not a substitution instance of the declared property."
    )]
    ValueConflict { declared: String, value: String },

    /// Record nesting grew beyond the depth bound.
    #[error(
        "A structured property of depth {depth} exceeds the maximum depth bound of {bound}. The resolution diverges through a recursive record construction."
    )]
    StructureDivergence { depth: usize, bound: usize },

    /// An attempt was made to set or initialize a term that is not settable.
    #[error("The property term `{term}` is not settable.")]
    NotSettable { term: String },

    /// A term identifier does not belong to the arena.
    #[error("The property term identifier does not belong to this term arena.")]
    UnknownTerm,
}

pub type LatticeResult<T> = Result<T, LatticeError>;
