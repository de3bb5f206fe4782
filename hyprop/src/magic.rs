//! Constants shared across the crate.

/// Environment variable overriding the location of the solver configuration.
pub const ENV_SOLVER_CONFIG_PATH: &str = "HYPROP_CONFIG";

pub const DEFAULT_LATTICE: &str = "logicalAND";

pub const DEFAULT_ACTOR_CONSTRAINT: &str = "out >= in";
pub const DEFAULT_CONNECTION_CONSTRAINT: &str = "sink >= src";
pub const DEFAULT_COMPOSITE_CONNECTION_CONSTRAINT: &str = "sink >= src";
pub const DEFAULT_FSM_CONSTRAINT: &str = "sink >= src";
pub const DEFAULT_AST_CONSTRAINT: &str = "parent >= child";

/// Extension of constraint log files.
pub const CONSTRAINT_LOG_EXTENSION: &str = "txt";
