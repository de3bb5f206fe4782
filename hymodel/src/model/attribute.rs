use serde::{Deserialize, Serialize};
use strum::EnumIs;

use crate::{
    expr::ParseTree,
    model::EntityId,
    utils::{Error, ModelResult},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, EnumIs, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeRole {
    /// A parameter whose value is given by its expression.
    #[default]
    Parameter,
    /// A constraint annotation such as `out >= in && x == TIME`.
    Constraint,
}

/// Named expression attached to an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attribute {
    pub name: String,
    pub container: EntityId,
    pub expression: String,
    pub role: AttributeRole,
    /// Whether the value may change at run time. Only settable parameters are
    /// mined for constraints.
    pub settable: bool,
}

impl Attribute {
    pub fn parse(&self) -> ModelResult<ParseTree> {
        ParseTree::parse(&self.expression).map_err(|err| match err {
            Error::ParserErrors {
                source_text,
                mut errors,
            } => {
                for error in errors.iter_mut() {
                    error.file = Some(self.name.clone());
                }
                Error::ParserErrors {
                    source_text,
                    errors,
                }
            }
            other => other,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.expression.trim().is_empty()
    }
}
