//! Property lattices and the machinery to solve inequality constraints over them.
//!
//! The crate is organised bottom-up:
//!
//! - [`cpo`]: the [`Cpo`](cpo::Cpo) trait and [`CpoRelation`](cpo::CpoRelation).
//! - [`lattice`]: finite lattices of named atoms ([`PropertyLattice`](lattice::PropertyLattice)).
//! - [`element`] and [`record`]: lattice values, either atoms or depth-bounded records.
//! - [`registry`]: name based lookup and caching of lattice instances.
//! - [`term`], [`inequality`] and [`solver`]: the constraint graph and the generic
//!   fixed-point solver working on it.

pub mod cpo;
pub mod element;
pub mod inequality;
pub mod lattice;
pub mod record;
pub mod registry;
pub mod solver;
pub mod term;
pub mod utils;

pub use utils::{LatticeError, LatticeResult};
