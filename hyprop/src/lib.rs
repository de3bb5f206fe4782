//! Lattice based property resolution over hierarchical models.
//!
//! A [`solver::PropertyConstraintSolver`] walks a [`hymodel::model::Model`] with
//! one helper per entity ([`helper`]), turns connections, actor semantics, state
//! machine actions and attribute expressions into inequalities between property
//! terms ([`manager`]), and solves them over a lattice of `hylattice`.
//!
//! ```rust
//! # use std::sync::Arc;
//! # use hylattice::registry::LatticeRegistry;
//! # use hymodel::model::{EntityKind, Model, PortFlags};
//! # use hyprop::{solver::PropertyConstraintSolver, utils::conf::SolverConfig};
//! let mut model = Model::new("top");
//! let top = model.toplevel();
//! let a = model.add_entity(top, "a", EntityKind::Atomic).unwrap();
//! let b = model.add_entity(top, "b", EntityKind::Atomic).unwrap();
//! let out = model.add_port(a, "out", PortFlags::OUTPUT).unwrap();
//! let input = model.add_port(b, "in", PortFlags::INPUT).unwrap();
//! let r = model.add_relation(top, "r").unwrap();
//! model.link(r, out).unwrap();
//! model.link(r, input).unwrap();
//!
//! let registry = Arc::new(LatticeRegistry::with_builtins());
//! let config = SolverConfig { lattice: "logicalAND".to_string(), ..Default::default() };
//! let mut solver = PropertyConstraintSolver::new(registry, config).unwrap();
//! let lattice = solver.lattice().unwrap();
//! solver.declare(out, lattice.element("TRUE").unwrap());
//!
//! let resolution = solver.resolve_properties(&mut model).unwrap();
//! assert_eq!(resolution.property(input), Some("TRUE"));
//! assert_eq!(model.annotation(input.into(), "logicalAND"), Some("TRUE"));
//! ```

pub mod constraint;
pub mod effectiveness;
pub mod helper;
pub mod magic;
pub mod manager;
pub mod solver;
pub mod stats;
pub mod utils;

pub use utils::error::{PropError, PropResult};
