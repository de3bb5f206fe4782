//! Name based lookup of property lattices.
//!
//! Lattices are never looked up through global state. A [`LatticeRegistry`] holds
//! an explicit map from lattice names to factories and caches the instance built
//! by each factory, so that every solver sharing the registry also shares the
//! lattice (and its memoized bounds).
use std::{collections::BTreeMap, sync::Arc};

use log::{debug, info};
use parking_lot::RwLock;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    lattice::{LatticeBuilder, PropertyLattice},
    utils::{LatticeError, LatticeResult},
};

/// Constructor of a lattice instance.
pub type LatticeFactory = Arc<dyn Fn() -> LatticeResult<PropertyLattice> + Send + Sync>;

/// Built-in lattices.
pub mod builtin {
    use super::*;

    /// `UNKNOWN < TRUE < FALSE`: whether a value is known to be always true.
    pub fn logical_and() -> LatticeResult<PropertyLattice> {
        LatticeBuilder::new("logicalAND")
            .chain(["UNKNOWN", "TRUE", "FALSE"])
            .build()
    }

    /// `UNKNOWN < STATIC < DYNAMIC`. Literal constants are static.
    pub fn static_dynamic() -> LatticeResult<PropertyLattice> {
        LatticeBuilder::new("staticDynamic")
            .chain(["UNKNOWN", "STATIC", "DYNAMIC"])
            .literal("STATIC")
            .build()
    }

    /// Physical dimensions. `CONFLICT` is the top and is never an acceptable resolution.
    pub fn dimension() -> LatticeResult<PropertyLattice> {
        const DIMENSIONS: [&str; 5] = [
            "TIME",
            "POSITION",
            "VELOCITY",
            "ACCELERATION",
            "DIMENSIONLESS",
        ];

        DIMENSIONS
            .iter()
            .fold(
                LatticeBuilder::new("dimension")
                    .element("UNKNOWN")
                    .elements(DIMENSIONS)
                    .element("CONFLICT")
                    .unacceptable("CONFLICT"),
                |builder, dimension| {
                    builder
                        .order("UNKNOWN", *dimension)
                        .order(*dimension, "CONFLICT")
                },
            )
            .build()
    }
}

/// Serializable description of a user-defined lattice.
///
/// ```toml
/// name = "security"
/// elements = ["PUBLIC", "SECRET", "TOP_SECRET"]
/// order = [["PUBLIC", "SECRET"], ["SECRET", "TOP_SECRET"]]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LatticeDescription {
    pub name: String,
    pub elements: Vec<String>,
    /// Covering pairs `(lower, higher)`.
    #[cfg_attr(feature = "serde", serde(default))]
    pub order: Vec<(String, String)>,
    /// Acceptable resolutions. Every element is acceptable when absent.
    #[cfg_attr(feature = "serde", serde(default))]
    pub acceptable: Option<Vec<String>>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub literal: Option<String>,
}

impl LatticeDescription {
    pub fn build(&self) -> LatticeResult<PropertyLattice> {
        let mut builder = LatticeBuilder::new(&self.name).elements(self.elements.iter().cloned());
        for (lower, higher) in self.order.iter() {
            builder = builder.order(lower, higher);
        }
        if let Some(acceptable) = &self.acceptable {
            for element in self.elements.iter() {
                if !acceptable.contains(element) {
                    builder = builder.unacceptable(element);
                }
            }
            if let Some(unknown) = acceptable.iter().find(|a| !self.elements.contains(a)) {
                return Err(LatticeError::UnknownElement {
                    lattice: self.name.clone(),
                    element: unknown.clone(),
                });
            }
        }
        if let Some(literal) = &self.literal {
            builder = builder.literal(literal);
        }
        builder.build()
    }
}

/// Registry of lattice factories with a cache of built instances.
///
/// Example:
/// ```rust
/// # use hylattice::registry::LatticeRegistry;
/// # use std::sync::Arc;
/// let registry = LatticeRegistry::with_builtins();
/// let first = registry.get("logicalAND").unwrap();
/// let second = registry.get("logicalAND").unwrap();
/// assert!(Arc::ptr_eq(&first, &second));
/// assert!(registry.get("nope").is_err());
/// ```
pub struct LatticeRegistry {
    instances: RwLock<BTreeMap<String, Arc<PropertyLattice>>>,
    factories: RwLock<BTreeMap<String, LatticeFactory>>,
}

impl Default for LatticeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LatticeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            instances: Default::default(),
            factories: Default::default(), // INFO: Always lock instances before factories
        }
    }

    /// A registry knowing `logicalAND`, `staticDynamic` and `dimension`.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register("logicalAND", builtin::logical_and);
        registry.register("staticDynamic", builtin::static_dynamic);
        registry.register("dimension", builtin::dimension);
        registry
    }

    /// Register (or replace) the factory of lattice `name`.
    ///
    /// Replacing a factory evicts the cached instance; solvers holding the old
    /// instance keep it until they look the lattice up again.
    pub fn register<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> LatticeResult<PropertyLattice> + Send + Sync + 'static,
    {
        let name = name.into();
        let mut instances = self.instances.write();
        let mut factories = self.factories.write();

        if instances.remove(&name).is_some() {
            info!("Lattice `{}` is re-registered, evicting the cached instance.", name);
        }
        debug!("Registered lattice factory `{}`.", name);
        factories.insert(name, Arc::new(factory));
    }

    /// Register a lattice described by configuration.
    pub fn register_description(&self, description: LatticeDescription) {
        let name = description.name.clone();
        self.register(name, move || description.build());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.read().contains_key(name)
    }

    /// Names of every registered lattice, in lexicographic order.
    pub fn names(&self) -> Vec<String> {
        self.factories.read().keys().cloned().collect()
    }

    /// Retrieve the lattice `name`, building it on first use.
    ///
    /// # A note on concurrency
    /// The cache uses an "upgradable read lock" pattern: lookups of already built
    /// lattices only take read locks, the first lookup of a lattice upgrades to a
    /// write lock while the factory runs. Factories must not call back into the
    /// registry.
    pub fn get(&self, name: &str) -> LatticeResult<Arc<PropertyLattice>> {
        let mut instances = self.instances.upgradable_read();
        if let Some(lattice) = instances.get(name) {
            return Ok(Arc::clone(lattice));
        }

        let factory = self.factories.read().get(name).cloned();
        let Some(factory) = factory else {
            return Err(LatticeError::UnknownLattice {
                name: name.to_string(),
                known: self.names(),
            });
        };

        let lattice = Arc::new(factory()?);
        instances.with_upgraded(|instances| {
            debug!("Instantiated lattice `{}`.", name);
            instances.insert(name.to_string(), Arc::clone(&lattice));
        });
        Ok(lattice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpo::{Cpo, CpoRelation};

    #[test]
    fn builtins_are_lattices() {
        let registry = LatticeRegistry::with_builtins();
        for name in registry.names() {
            let lattice = registry.get(&name).unwrap();
            assert_eq!(lattice.name(), name);
        }

        let dimension = registry.get("dimension").unwrap();
        let time = dimension.element("TIME").unwrap();
        let position = dimension.element("POSITION").unwrap();
        assert_eq!(
            dimension.compare(&time, &position),
            Ok(CpoRelation::Incomparable)
        );
        assert_eq!(
            dimension.least_upper_bound(&time, &position),
            dimension.element("CONFLICT")
        );

        let sd = registry.get("staticDynamic").unwrap();
        assert_eq!(sd.literal(), Some(sd.element("STATIC").unwrap()));
    }

    #[test]
    fn re_registration_evicts_cache() {
        let registry = LatticeRegistry::with_builtins();
        let before = registry.get("logicalAND").unwrap();
        registry.register("logicalAND", builtin::logical_and);
        let after = registry.get("logicalAND").unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn unknown_lattice_lists_known_names() {
        let registry = LatticeRegistry::with_builtins();
        let err = registry.get("units").unwrap_err();
        assert_eq!(
            err,
            LatticeError::UnknownLattice {
                name: "units".to_string(),
                known: vec![
                    "dimension".to_string(),
                    "logicalAND".to_string(),
                    "staticDynamic".to_string()
                ],
            }
        );
    }

    #[test]
    fn description_restricts_acceptable_elements() {
        let description = LatticeDescription {
            name: "sign".to_string(),
            elements: ["BOT", "NEG", "ZERO", "POS", "ANY"].map(String::from).to_vec(),
            order: [
                ("BOT", "NEG"),
                ("BOT", "ZERO"),
                ("BOT", "POS"),
                ("NEG", "ANY"),
                ("ZERO", "ANY"),
                ("POS", "ANY"),
            ]
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .to_vec(),
            acceptable: Some(["NEG", "ZERO", "POS"].map(String::from).to_vec()),
            literal: None,
        };

        let registry = LatticeRegistry::new();
        registry.register_description(description);
        let lattice = registry.get("sign").unwrap();
        assert!(!lattice.is_acceptable_atom(lattice.atom("ANY").unwrap()));
        assert!(lattice.is_acceptable_atom(lattice.atom("POS").unwrap()));
        assert_eq!(lattice.bottom(), lattice.element("BOT").unwrap());
    }
}
