use strum::{EnumIs, EnumTryAs};
use thiserror::Error;

/// A located expression parse error.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParserError {
    pub message: String,
    pub start: usize,
    pub end: usize,
    /// Name of the object holding the expression, when known.
    pub file: Option<String>,
}

impl std::fmt::Display for ParserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}:{}..{}: {}", file, self.start, self.end, self.message),
            None => write!(f, "{}..{}: {}", self.start, self.end, self.message),
        }
    }
}

fn join_errors(errors: &[ParserError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIs, EnumTryAs, Error)]
pub enum Error {
    /// An expression could not be parsed.
    #[error("Failed to parse expression `{source_text}`: {}", join_errors(.errors))]
    ParserErrors {
        source_text: String,
        errors: Vec<ParserError>,
    },

    /// Entities can only be added to composite entities.
    #[error("Entity `{entity}` is not a composite entity and cannot contain `{child}`.")]
    NotAComposite { entity: String, child: String },

    /// State machine operations on an entity without a state machine body.
    #[error("Entity `{entity}` is not a state machine.")]
    NotAStateMachine { entity: String },

    /// Two objects of the same kind share a name within the same container.
    #[error("Entity `{container}` already contains a {kind} named `{name}`.")]
    DuplicateName {
        container: String,
        kind: &'static str,
        name: String,
    },

    /// A relation may only link ports of its container or of the container's children.
    #[error(
        "Relation `{relation}` cannot link port `{port}`: a relation only links ports of its container and of the entities directly contained in it."
    )]
    IllegalLink { relation: String, port: String },

    /// A path in a manifest does not name any object.
    #[error("`{path}` does not name any {kind} of entity `{container}`.")]
    UnresolvedPath {
        container: String,
        kind: &'static str,
        path: String,
    },

    /// A transition refers to a state that was never declared.
    #[error("State machine `{entity}` has no state named `{state}`.")]
    UnknownState { entity: String, state: String },

    /// An identifier was used where an object key of this model was expected.
    #[error("The {kind} identifier does not belong to this model.")]
    UnknownObject { kind: &'static str },

    /// TOML manifest could not be decoded.
    #[error("Failed to parse model manifest '{file}': {message}")]
    ManifestParseError { file: String, message: String },

    /// Manifest could not be read.
    #[error("I/O error while reading '{file}': {message}")]
    IoError { file: String, message: String },
}

pub type ModelResult<T> = Result<T, Error>;
