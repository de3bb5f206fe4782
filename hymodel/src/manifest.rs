//! TOML description of a model.
//!
//! ```toml
//! [model]
//! name = "top"
//!
//! [[model.entities]]
//! name = "source"
//! ports = [{ name = "out", output = true }]
//! attributes = [{ name = "value", expression = "1" }]
//!
//! [[model.entities]]
//! name = "sink"
//! constraint_policy = "out == in"
//! ports = [{ name = "in", input = true }]
//!
//! [[model.relations]]
//! name = "r"
//! ports = ["source.out", "sink.in"]
//!
//! [[annotations]]
//! object = "source.out"
//! lattice = "dimension"
//! property = "TIME"
//! ```
//!
//! Relation paths are relative to the entity owning the relation: `p` names one
//! of its own ports, `child.p` a port of a direct child. Annotation paths are
//! relative to the toplevel entity.
use std::{path::Path, str::FromStr};

use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    model::{
        AttributeRole, EntityId, EntityKind, FsmBody, Model, ModelObject, PortFlags, PortId,
        Transition,
    },
    utils::{Error, ModelResult},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityManifestKind {
    #[default]
    Atomic,
    Composite,
    Fsm,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortManifest {
    pub name: String,
    #[serde(default)]
    pub input: bool,
    #[serde(default)]
    pub output: bool,
    #[serde(default)]
    pub multiport: bool,
}

impl PortManifest {
    fn flags(&self) -> PortFlags {
        let mut flags = PortFlags::empty();
        flags.set(PortFlags::INPUT, self.input);
        flags.set(PortFlags::OUTPUT, self.output);
        flags.set(PortFlags::MULTIPORT, self.multiport);
        flags
    }
}

fn default_settable() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeManifest {
    pub name: String,
    #[serde(default)]
    pub expression: String,
    #[serde(default)]
    pub role: AttributeRole,
    #[serde(default = "default_settable")]
    pub settable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationManifest {
    pub name: String,
    #[serde(default)]
    pub ports: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionManifest {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub guard: Option<String>,
    #[serde(default)]
    pub output_actions: Option<String>,
    #[serde(default)]
    pub set_actions: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityManifest {
    pub name: String,
    #[serde(default)]
    pub kind: EntityManifestKind,
    #[serde(default)]
    pub constraint_policy: Option<String>,
    #[serde(default)]
    pub ports: Vec<PortManifest>,
    #[serde(default)]
    pub attributes: Vec<AttributeManifest>,
    #[serde(default)]
    pub entities: Vec<EntityManifest>,
    #[serde(default)]
    pub relations: Vec<RelationManifest>,
    #[serde(default)]
    pub states: Vec<String>,
    #[serde(default)]
    pub transitions: Vec<TransitionManifest>,
}

impl EntityManifest {
    fn entity_kind(&self) -> EntityKind {
        match self.kind {
            // Entities listing children are composites even when the kind is omitted.
            EntityManifestKind::Atomic if !self.entities.is_empty() => EntityKind::Composite,
            EntityManifestKind::Atomic => EntityKind::Atomic,
            EntityManifestKind::Composite => EntityKind::Composite,
            EntityManifestKind::Fsm => EntityKind::Fsm(FsmBody::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationManifest {
    pub object: String,
    pub lattice: String,
    pub property: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelManifest {
    pub model: EntityManifest,
    #[serde(default)]
    pub annotations: Vec<AnnotationManifest>,
}

impl FromStr for ModelManifest {
    type Err = Error;

    fn from_str(source: &str) -> ModelResult<Self> {
        toml::from_str(source).map_err(|err| Error::ManifestParseError {
            file: "<string>".to_string(),
            message: err.to_string(),
        })
    }
}

impl ModelManifest {
    pub fn from_path(path: impl AsRef<Path>) -> ModelResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|err| Error::IoError {
            file: path.display().to_string(),
            message: err.to_string(),
        })?;
        toml::from_str(&source).map_err(|err| Error::ManifestParseError {
            file: path.display().to_string(),
            message: err.to_string(),
        })
    }

    pub fn build(&self) -> ModelResult<Model> {
        let mut model = Model::with_toplevel(&self.model.name, self.model.entity_kind());
        let top = model.toplevel();
        populate(&mut model, top, &self.model)?;

        for annotation in self.annotations.iter() {
            let object = resolve_object(&model, top, &annotation.object)?;
            model.annotate(object, &annotation.lattice, annotation.property.clone());
        }

        info!(
            "Built model `{}` with {} entities, {} ports and {} relations",
            model.name(),
            model.entities().count(),
            model.ports().count(),
            model.relations().count()
        );
        Ok(model)
    }
}

fn populate(model: &mut Model, id: EntityId, manifest: &EntityManifest) -> ModelResult<()> {
    model.set_constraint_policy(id, manifest.constraint_policy.clone())?;

    for port in manifest.ports.iter() {
        model.add_port(id, &port.name, port.flags())?;
    }

    for attribute in manifest.attributes.iter() {
        let attr = model.add_attribute(
            id,
            &attribute.name,
            &attribute.expression,
            attribute.role,
        )?;
        model.set_settable(attr, attribute.settable)?;
    }

    for child in manifest.entities.iter() {
        let child_id = model.add_entity(id, &child.name, child.entity_kind())?;
        populate(model, child_id, child)?;
    }

    for relation in manifest.relations.iter() {
        let rel = model.add_relation(id, &relation.name)?;
        for path in relation.ports.iter() {
            let port = resolve_port(model, id, path)?;
            model.link(rel, port)?;
        }
    }

    for state in manifest.states.iter() {
        model.add_state(id, state)?;
    }

    for transition in manifest.transitions.iter() {
        model.add_transition(
            id,
            &transition.from,
            &transition.to,
            Transition {
                guard: transition.guard.clone(),
                output_actions: transition.output_actions.clone(),
                set_actions: transition.set_actions.clone(),
            },
        )?;
    }

    Ok(())
}

/// Walk the entity part of a dotted path, returning the owning entity and the
/// last segment.
fn resolve_prefix<'p>(
    model: &Model,
    container: EntityId,
    path: &'p str,
    kind: &'static str,
) -> ModelResult<(EntityId, &'p str)> {
    let unresolved = || Error::UnresolvedPath {
        container: model.full_name(container),
        kind,
        path: path.to_string(),
    };

    let mut segments: Vec<&str> = path.split('.').collect();
    let last = segments.pop().filter(|s| !s.is_empty()).ok_or_else(unresolved)?;
    let mut owner = container;
    for segment in segments {
        owner = model.find_child(owner, segment).ok_or_else(unresolved)?;
    }
    Ok((owner, last))
}

fn resolve_port(model: &Model, container: EntityId, path: &str) -> ModelResult<PortId> {
    let (owner, name) = resolve_prefix(model, container, path, "port")?;
    model
        .find_port(owner, name)
        .ok_or_else(|| Error::UnresolvedPath {
            container: model.full_name(container),
            kind: "port",
            path: path.to_string(),
        })
}

/// Resolve a dotted path to a port or, failing that, an attribute.
pub fn resolve_object(model: &Model, container: EntityId, path: &str) -> ModelResult<ModelObject> {
    let (owner, name) = resolve_prefix(model, container, path, "port or attribute")?;
    model
        .find_port(owner, name)
        .map(ModelObject::Port)
        .or_else(|| model.find_attribute(owner, name).map(ModelObject::Attribute))
        .ok_or_else(|| Error::UnresolvedPath {
            container: model.full_name(container),
            kind: "port or attribute",
            path: path.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
        [model]
        name = "top"

        [[model.entities]]
        name = "source"
        ports = [{ name = "out", output = true }]

        [[model.entities]]
        name = "ctrl"
        kind = "fsm"
        states = ["idle", "run"]
        ports = [{ name = "in", input = true }, { name = "out", output = true }]
        attributes = [{ name = "count", expression = "0" }]
        transitions = [
            { from = "idle", to = "run", guard = "in > 0", output_actions = "out = in" },
            { from = "run", to = "idle", set_actions = "count = count + 1" },
        ]

        [[model.relations]]
        name = "r"
        ports = ["source.out", "ctrl.in"]

        [[annotations]]
        object = "source.out"
        lattice = "dimension"
        property = "TIME"
    "#;

    #[test]
    fn builds_model() {
        let model = MANIFEST.parse::<ModelManifest>().unwrap().build().unwrap();
        let top = model.toplevel();
        let source = model.find_child(top, "source").unwrap();
        let ctrl = model.find_child(top, "ctrl").unwrap();
        let out = model.find_port(source, "out").unwrap();
        let input = model.find_port(ctrl, "in").unwrap();

        assert_eq!(model.sink_ports(out), vec![input]);
        assert_eq!(model.fsm(ctrl).unwrap().transition_count(), 2);
        assert_eq!(
            model.annotation(ModelObject::Port(out), "dimension"),
            Some("TIME")
        );
    }

    #[test]
    fn unresolved_paths() {
        let manifest = MANIFEST.replace("ctrl.in\"]", "ctrl.missing\"]");
        let err = manifest
            .parse::<ModelManifest>()
            .unwrap()
            .build()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "`ctrl.missing` does not name any port of entity `top`."
        );
    }

    #[test]
    fn malformed_manifest() {
        let err = "[model]\nkind = 3".parse::<ModelManifest>().unwrap_err();
        assert!(err.is_manifest_parse_error());
    }
}
