use std::{
    path::{Path, PathBuf},
    str::FromStr,
};

use hylattice::{registry::LatticeDescription, solver::FixedPoint};
use serde::{Deserialize, Serialize};

use crate::{
    constraint::{ConstraintCategory, ConstraintPolicy, ConstraintType},
    magic::{
        DEFAULT_ACTOR_CONSTRAINT, DEFAULT_AST_CONSTRAINT, DEFAULT_COMPOSITE_CONNECTION_CONSTRAINT,
        DEFAULT_CONNECTION_CONSTRAINT, DEFAULT_FSM_CONSTRAINT, DEFAULT_LATTICE,
        ENV_SOLVER_CONFIG_PATH,
    },
    solver::SolverAction,
    utils::error::{PropError, PropResult},
};

/// Solver configuration, usually read from a TOML file.
///
/// ```toml
/// lattice = "dimension"
/// fixed_point = "least"
/// action = "annotate"
/// actor_constraint_type = "out == meet(in1, in2, ...)"
///
/// [[lattices]]
/// name = "security"
/// elements = ["PUBLIC", "SECRET"]
/// order = [["PUBLIC", "SECRET"]]
/// ```
///
/// Every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Name of the lattice to resolve properties in.
    pub lattice: String,
    pub fixed_point: FixedPoint,
    pub action: SolverAction,
    pub actor_constraint_type: String,
    pub connection_constraint_type: String,
    pub composite_connection_constraint_type: String,
    pub fsm_constraint_type: String,
    pub expression_ast_node_constraint_type: String,
    /// Feed the annotations persisted on the model back as declarations.
    pub manual_annotation: bool,
    /// When set, constraint logs are written to this directory.
    pub log_directory: Option<PathBuf>,
    /// Additional lattices registered before solving.
    pub lattices: Vec<LatticeDescription>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            lattice: DEFAULT_LATTICE.to_string(),
            fixed_point: FixedPoint::Least,
            action: SolverAction::Annotate,
            actor_constraint_type: DEFAULT_ACTOR_CONSTRAINT.to_string(),
            connection_constraint_type: DEFAULT_CONNECTION_CONSTRAINT.to_string(),
            composite_connection_constraint_type: DEFAULT_COMPOSITE_CONNECTION_CONSTRAINT
                .to_string(),
            fsm_constraint_type: DEFAULT_FSM_CONSTRAINT.to_string(),
            expression_ast_node_constraint_type: DEFAULT_AST_CONSTRAINT.to_string(),
            manual_annotation: false,
            log_directory: None,
            lattices: Vec::new(),
        }
    }
}

impl FromStr for SolverConfig {
    type Err = PropError;

    fn from_str(source: &str) -> PropResult<Self> {
        toml::from_str(source).map_err(|source| PropError::Config {
            file: "<string>".to_string(),
            source,
        })
    }
}

impl SolverConfig {
    /// Path of the configuration file, taken from `HYPROP_CONFIG` or
    /// `hyprop.toml` in the working directory.
    pub fn default_path() -> PathBuf {
        std::env::var(ENV_SOLVER_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("hyprop.toml"))
    }

    pub fn from_path(path: &Path) -> PropResult<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| PropError::io(path.display(), e))?;
        toml::from_str(&source).map_err(|source| PropError::Config {
            file: path.display().to_string(),
            source,
        })
    }

    /// Save the configuration as TOML, creating parent directories as needed.
    pub fn save_to_toml(&self, path: &Path) -> PropResult<()> {
        let source = toml::to_string(self).map_err(|source| PropError::ConfigEncode {
            file: path.display().to_string(),
            source,
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PropError::io(parent.display(), e))?;
        }
        std::fs::write(path, source).map_err(|e| PropError::io(path.display(), e))
    }

    /// Classify the five policy strings.
    pub fn policy(&self) -> PropResult<ConstraintPolicy> {
        let mut policy = ConstraintPolicy::default();
        for (category, text) in [
            (ConstraintCategory::Actor, &self.actor_constraint_type),
            (ConstraintCategory::Connection, &self.connection_constraint_type),
            (
                ConstraintCategory::CompositeConnection,
                &self.composite_connection_constraint_type,
            ),
            (ConstraintCategory::Fsm, &self.fsm_constraint_type),
            (
                ConstraintCategory::ExpressionAstNode,
                &self.expression_ast_node_constraint_type,
            ),
        ] {
            policy.set(category, ConstraintType::from_policy_str(text)?);
        }
        Ok(policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_classic_policies() {
        let config = "".parse::<SolverConfig>().unwrap();
        assert_eq!(config, SolverConfig::default());

        let policy = config.policy().unwrap();
        assert_eq!(policy.get(ConstraintCategory::Actor), ConstraintType::SrcLess);
        assert_eq!(
            policy.get(ConstraintCategory::ExpressionAstNode),
            ConstraintType::SrcLess
        );
    }

    #[test]
    fn reads_lattices_and_policies() {
        let config: SolverConfig = r#"
            lattice = "security"
            fixed_point = "greatest"
            action = "training"
            actor_constraint_type = "out == in"

            [[lattices]]
            name = "security"
            elements = ["PUBLIC", "SECRET"]
            order = [["PUBLIC", "SECRET"]]
            "#
        .parse()
        .unwrap();

        assert_eq!(config.fixed_point, FixedPoint::Greatest);
        assert_eq!(config.action, SolverAction::Training);
        assert_eq!(config.lattices[0].elements.len(), 2);
        assert_eq!(
            config.policy().unwrap().get(ConstraintCategory::Actor),
            ConstraintType::Equals
        );
    }

    #[test]
    fn errors_keep_their_source() {
        use std::error::Error as _;

        let err = "fixed_point = 3".parse::<SolverConfig>().unwrap_err();
        assert!(
            err.source()
                .is_some_and(|source| source.is::<toml::de::Error>())
        );

        let missing = std::env::temp_dir().join("hyprop-missing-dir/hyprop.toml");
        let err = SolverConfig::from_path(&missing).unwrap_err();
        let PropError::Io { source, .. } = &err else {
            panic!("expected an I/O error, got {err:?}");
        };
        assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
        assert!(err.to_string().contains("hyprop-missing-dir"));
    }

    #[test]
    fn rejects_malformed_documents() {
        assert!("fixed_point = \"middle\"".parse::<SolverConfig>().unwrap_err().is_config());
        let config = SolverConfig {
            connection_constraint_type: "sink != src".to_string(),
            ..Default::default()
        };
        assert!(config.policy().unwrap_err().is_invalid_constraint_type());
    }
}
