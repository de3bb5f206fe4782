//! Hierarchical models analysed by the property solver.
//!
//! A [`model::Model`] is a tree of entities (atomic actors, composites and state
//! machines) whose ports are linked through relations. Entities carry attributes
//! holding expressions of a small expression language ([`expr`]), parsed with
//! `chumsky` into flat [`expr::ParseTree`]s. Models can be written by hand with the
//! builder methods of [`model::Model`] or loaded from a TOML
//! [`manifest::ModelManifest`].

pub mod expr;
pub mod manifest;
pub mod model;
pub mod utils;

pub use utils::{Error, ModelResult, ParserError};
