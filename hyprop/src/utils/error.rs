use hylattice::LatticeError;
use strum::EnumIs;
use thiserror::Error;

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("\n  - {}", item))
        .collect()
}

#[derive(Debug, EnumIs, Error)]
pub enum PropError {
    /// Some inequalities do not hold after resolution. Listed in declaration order.
    #[error(
        "Property resolution failed with {} unsatisfied constraint(s):{}",
        .conflicts.len(),
        bullet_list(.conflicts)
    )]
    StructuralConflict { conflicts: Vec<String> },

    /// Every inequality holds but some resolved values are not acceptable.
    #[error(
        "Property resolution produced {} unacceptable value(s):{}",
        .offenders.len(),
        bullet_list(.offenders)
    )]
    UnacceptableResolution { offenders: Vec<String> },

    /// An expression uses a construct no constraint can be derived from.
    #[error("Cannot derive property constraints for {construct} in `{expression}`.")]
    UnsupportedConstruct {
        construct: String,
        expression: String,
    },

    /// Lattice level failure, among which structure divergence and value conflicts.
    #[error(transparent)]
    Lattice(#[from] LatticeError),

    #[error(transparent)]
    Model(#[from] hymodel::Error),

    /// A constraint policy string does not describe any constraint type.
    #[error("Invalid constraint type `{policy}`: {reason}.")]
    InvalidConstraintType { policy: String, reason: &'static str },

    #[error("Unknown lattice `{name}`. Known lattices are: {}.", .known.join(", "))]
    UnknownLattice { name: String, known: Vec<String> },

    /// Solver configuration could not be decoded.
    #[error("Failed to parse solver configuration '{file}': {source}")]
    Config {
        file: String,
        source: toml::de::Error,
    },

    #[error("Failed to encode solver configuration '{file}': {source}")]
    ConfigEncode {
        file: String,
        source: toml::ser::Error,
    },

    #[error("I/O error on '{file}': {source}")]
    Io {
        file: String,
        source: std::io::Error,
    },

    /// Resolved properties differ from the ones recorded by a previous training run.
    #[error(
        "Resolution differs from the trained annotations on {} object(s):{}",
        .mismatches.len(),
        bullet_list(.mismatches)
    )]
    RegressionMismatch { mismatches: Vec<String> },
}

impl PropError {
    pub fn is_structure_divergence(&self) -> bool {
        matches!(self, PropError::Lattice(LatticeError::StructureDivergence { .. }))
    }

    pub fn is_value_conflict(&self) -> bool {
        matches!(self, PropError::Lattice(LatticeError::ValueConflict { .. }))
    }

    pub(crate) fn io(file: impl std::fmt::Display, err: std::io::Error) -> Self {
        PropError::Io {
            file: file.to_string(),
            source: err,
        }
    }
}

pub type PropResult<T> = Result<T, PropError>;
