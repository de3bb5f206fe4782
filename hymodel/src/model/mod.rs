//! Hierarchical model graph.
//!
//! A [`Model`] owns four slot-map arenas (entities, ports, relations and
//! attributes) addressed by typed keys. The toplevel entity is a composite created
//! with the model.
//!
//! # Connectivity
//!
//! A relation belongs to a container entity and links ports of that container
//! (an *inside* link, seen from the port) or ports of the container's direct
//! children (an *outside* link). Data flows out of a port `q` into a relation `r`
//! when `q` is an output port of a child of `r`'s container, or an input port of
//! the container itself. Symmetrically a port `p` receives from `r` when it is an
//! input of a child, or an output of the container.
use std::collections::BTreeMap;

use bitflags::bitflags;
use log::debug;
use slotmap::{SlotMap, new_key_type};
use strum::{EnumIs, EnumTryAs};

use crate::utils::{Error, ModelResult};

mod attribute;
pub mod fsm;

pub use attribute::{Attribute, AttributeRole};
pub use fsm::{FsmBody, State, StateId, Transition, TransitionId};

new_key_type! {
    pub struct EntityId;
    pub struct PortId;
    pub struct RelationId;
    pub struct AttributeId;
}

bitflags! {
    #[derive(Default, Clone, Copy, PartialEq, Eq, Hash, Debug)]
    pub struct PortFlags: u8 {
        const INPUT = 0b001;
        const OUTPUT = 0b010;
        /// Accepts any number of links.
        const MULTIPORT = 0b100;
    }
}

/// Model objects that carry properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIs, EnumTryAs)]
pub enum ModelObject {
    Port(PortId),
    Attribute(AttributeId),
}

impl From<PortId> for ModelObject {
    fn from(value: PortId) -> Self {
        ModelObject::Port(value)
    }
}

impl From<AttributeId> for ModelObject {
    fn from(value: AttributeId) -> Self {
        ModelObject::Attribute(value)
    }
}

#[derive(Debug, Clone, EnumIs, EnumTryAs)]
pub enum EntityKind {
    Atomic,
    Composite,
    Fsm(FsmBody),
}

impl EntityKind {
    fn describe(&self) -> &'static str {
        match self {
            EntityKind::Atomic => "atomic",
            EntityKind::Composite => "composite",
            EntityKind::Fsm(_) => "state machine",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub name: String,
    pub container: Option<EntityId>,
    pub kind: EntityKind,
    pub children: Vec<EntityId>,
    pub ports: Vec<PortId>,
    pub attributes: Vec<AttributeId>,
    /// Relations owned by this entity.
    pub relations: Vec<RelationId>,
    /// Actor constraint policy overriding the solver-wide one for this entity.
    pub constraint_policy: Option<String>,
}

impl Entity {
    /// Whether the entity may contain other entities.
    pub fn is_container(&self) -> bool {
        !self.kind.is_atomic()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Port {
    pub name: String,
    pub container: EntityId,
    pub flags: PortFlags,
    pub relations: Vec<RelationId>,
}

impl Port {
    pub fn is_input(&self) -> bool {
        self.flags.contains(PortFlags::INPUT)
    }

    pub fn is_output(&self) -> bool {
        self.flags.contains(PortFlags::OUTPUT)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Relation {
    pub name: String,
    pub container: EntityId,
    pub ports: Vec<PortId>,
}

#[derive(Debug, Clone)]
pub struct Model {
    entities: SlotMap<EntityId, Entity>,
    ports: SlotMap<PortId, Port>,
    relations: SlotMap<RelationId, Relation>,
    attributes: SlotMap<AttributeId, Attribute>,
    toplevel: EntityId,
    /// Persisted properties keyed by object and lattice name.
    annotations: BTreeMap<(ModelObject, String), String>,
}

fn push_unique<T: PartialEq>(list: &mut Vec<T>, item: T) {
    if !list.contains(&item) {
        list.push(item);
    }
}

impl Model {
    /// A model whose toplevel is a composite named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_toplevel(name, EntityKind::Composite)
    }

    pub fn with_toplevel(name: impl Into<String>, kind: EntityKind) -> Self {
        let mut entities = SlotMap::with_key();
        let toplevel = entities.insert(Entity {
            name: name.into(),
            container: None,
            kind,
            children: Vec::new(),
            ports: Vec::new(),
            attributes: Vec::new(),
            relations: Vec::new(),
            constraint_policy: None,
        });

        Self {
            entities,
            ports: SlotMap::with_key(),
            relations: SlotMap::with_key(),
            attributes: SlotMap::with_key(),
            toplevel,
            annotations: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.entities[self.toplevel].name
    }

    pub fn toplevel(&self) -> EntityId {
        self.toplevel
    }

    fn get_entity_or_err(&self, id: EntityId) -> ModelResult<&Entity> {
        self.entities
            .get(id)
            .ok_or(Error::UnknownObject { kind: "entity" })
    }

    fn check_duplicate(
        &self,
        container: EntityId,
        kind: &'static str,
        name: &str,
        taken: impl IntoIterator<Item = bool>,
    ) -> ModelResult<()> {
        if taken.into_iter().any(|t| t) {
            return Err(Error::DuplicateName {
                container: self.full_name(container),
                kind,
                name: name.to_string(),
            });
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Construction
    // ---------------------------------------------------------------------

    pub fn add_entity(
        &mut self,
        container: EntityId,
        name: impl Into<String>,
        kind: EntityKind,
    ) -> ModelResult<EntityId> {
        let name = name.into();
        let parent = self.get_entity_or_err(container)?;
        if !parent.is_container() {
            return Err(Error::NotAComposite {
                entity: self.full_name(container),
                child: name,
            });
        }
        self.check_duplicate(
            container,
            "entity",
            &name,
            parent.children.iter().map(|c| self.entities[*c].name == name),
        )?;

        debug!(
            "Adding {} entity `{}` to `{}`",
            kind.describe(),
            name,
            self.full_name(container)
        );
        let id = self.entities.insert(Entity {
            name,
            container: Some(container),
            kind,
            children: Vec::new(),
            ports: Vec::new(),
            attributes: Vec::new(),
            relations: Vec::new(),
            constraint_policy: None,
        });
        self.entities[container].children.push(id);
        Ok(id)
    }

    pub fn add_port(
        &mut self,
        entity: EntityId,
        name: impl Into<String>,
        flags: PortFlags,
    ) -> ModelResult<PortId> {
        let name = name.into();
        let owner = self.get_entity_or_err(entity)?;
        self.check_duplicate(
            entity,
            "port",
            &name,
            owner.ports.iter().map(|p| self.ports[*p].name == name),
        )?;

        let id = self.ports.insert(Port {
            name,
            container: entity,
            flags,
            relations: Vec::new(),
        });
        self.entities[entity].ports.push(id);
        Ok(id)
    }

    pub fn add_relation(
        &mut self,
        container: EntityId,
        name: impl Into<String>,
    ) -> ModelResult<RelationId> {
        let name = name.into();
        let owner = self.get_entity_or_err(container)?;
        self.check_duplicate(
            container,
            "relation",
            &name,
            owner.relations.iter().map(|r| self.relations[*r].name == name),
        )?;

        let id = self.relations.insert(Relation {
            name,
            container,
            ports: Vec::new(),
        });
        self.entities[container].relations.push(id);
        Ok(id)
    }

    pub fn add_attribute(
        &mut self,
        entity: EntityId,
        name: impl Into<String>,
        expression: impl Into<String>,
        role: AttributeRole,
    ) -> ModelResult<AttributeId> {
        let name = name.into();
        let owner = self.get_entity_or_err(entity)?;
        self.check_duplicate(
            entity,
            "attribute",
            &name,
            owner
                .attributes
                .iter()
                .map(|a| self.attributes[*a].name == name),
        )?;

        let id = self.attributes.insert(Attribute {
            name,
            container: entity,
            expression: expression.into(),
            role,
            settable: true,
        });
        self.entities[entity].attributes.push(id);
        Ok(id)
    }

    pub fn set_settable(&mut self, attribute: AttributeId, settable: bool) -> ModelResult<()> {
        let attribute = self
            .attributes
            .get_mut(attribute)
            .ok_or(Error::UnknownObject { kind: "attribute" })?;
        attribute.settable = settable;
        Ok(())
    }

    pub fn set_expression(
        &mut self,
        attribute: AttributeId,
        expression: impl Into<String>,
    ) -> ModelResult<()> {
        let attribute = self
            .attributes
            .get_mut(attribute)
            .ok_or(Error::UnknownObject { kind: "attribute" })?;
        attribute.expression = expression.into();
        Ok(())
    }

    /// Override the actor constraint policy of a single entity.
    pub fn set_constraint_policy(
        &mut self,
        entity: EntityId,
        policy: Option<String>,
    ) -> ModelResult<()> {
        let entity = self
            .entities
            .get_mut(entity)
            .ok_or(Error::UnknownObject { kind: "entity" })?;
        entity.constraint_policy = policy;
        Ok(())
    }

    /// Link `port` to `relation`. Linking twice is a no-op.
    pub fn link(&mut self, relation: RelationId, port: PortId) -> ModelResult<()> {
        let rel = self
            .relations
            .get(relation)
            .ok_or(Error::UnknownObject { kind: "relation" })?;
        let owner = self
            .ports
            .get(port)
            .ok_or(Error::UnknownObject { kind: "port" })?
            .container;

        if owner != rel.container && self.parent(owner) != Some(rel.container) {
            return Err(Error::IllegalLink {
                relation: self.relation_full_name(relation),
                port: self.port_full_name(port),
            });
        }

        push_unique(&mut self.relations[relation].ports, port);
        push_unique(&mut self.ports[port].relations, relation);
        Ok(())
    }

    /// Remove the link between `port` and `relation`, returning whether it existed.
    pub fn unlink(&mut self, relation: RelationId, port: PortId) -> bool {
        let (Some(rel), Some(p)) = (self.relations.get_mut(relation), self.ports.get_mut(port))
        else {
            return false;
        };
        let before = rel.ports.len();
        rel.ports.retain(|q| *q != port);
        p.relations.retain(|r| *r != relation);
        before != rel.ports.len()
    }

    pub fn add_state(&mut self, entity: EntityId, name: impl Into<String>) -> ModelResult<StateId> {
        let name = name.into();
        let full_name = self.full_name(entity);
        let body = self.fsm_mut(entity)?;
        body.add_state(name.clone()).ok_or(Error::DuplicateName {
            container: full_name,
            kind: "state",
            name,
        })
    }

    pub fn add_transition(
        &mut self,
        entity: EntityId,
        from: &str,
        to: &str,
        transition: Transition,
    ) -> ModelResult<TransitionId> {
        let full_name = self.full_name(entity);
        let body = self.fsm_mut(entity)?;
        let lookup = |name: &str| {
            body.state_id(name).ok_or_else(|| Error::UnknownState {
                entity: full_name.clone(),
                state: name.to_string(),
            })
        };
        let (from, to) = (lookup(from)?, lookup(to)?);
        Ok(body.add_transition(from, to, transition))
    }

    // ---------------------------------------------------------------------
    // Access
    // ---------------------------------------------------------------------

    /// # Panics
    /// Panics if `id` was not created by this model.
    pub fn entity(&self, id: EntityId) -> &Entity {
        &self.entities[id]
    }

    /// # Panics
    /// Panics if `id` was not created by this model.
    pub fn port(&self, id: PortId) -> &Port {
        &self.ports[id]
    }

    /// # Panics
    /// Panics if `id` was not created by this model.
    pub fn relation(&self, id: RelationId) -> &Relation {
        &self.relations[id]
    }

    /// # Panics
    /// Panics if `id` was not created by this model.
    pub fn attribute(&self, id: AttributeId) -> &Attribute {
        &self.attributes[id]
    }

    pub fn get_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn get_port(&self, id: PortId) -> Option<&Port> {
        self.ports.get(id)
    }

    pub fn get_attribute(&self, id: AttributeId) -> Option<&Attribute> {
        self.attributes.get(id)
    }

    pub fn entities(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.entities.iter()
    }

    pub fn ports(&self) -> impl Iterator<Item = (PortId, &Port)> {
        self.ports.iter()
    }

    pub fn attributes(&self) -> impl Iterator<Item = (AttributeId, &Attribute)> {
        self.attributes.iter()
    }

    pub fn relations(&self) -> impl Iterator<Item = (RelationId, &Relation)> {
        self.relations.iter()
    }

    pub fn parent(&self, entity: EntityId) -> Option<EntityId> {
        self.entities.get(entity).and_then(|e| e.container)
    }

    /// `entity` followed by its containers up to the toplevel.
    pub fn ancestors(&self, entity: EntityId) -> impl Iterator<Item = EntityId> + '_ {
        std::iter::successors(Some(entity), move |e| self.parent(*e))
    }

    pub fn fsm(&self, entity: EntityId) -> ModelResult<&FsmBody> {
        match &self.get_entity_or_err(entity)?.kind {
            EntityKind::Fsm(body) => Ok(body),
            _ => Err(Error::NotAStateMachine {
                entity: self.full_name(entity),
            }),
        }
    }

    fn fsm_mut(&mut self, entity: EntityId) -> ModelResult<&mut FsmBody> {
        let full_name = self.full_name(entity);
        match self.entities.get_mut(entity).map(|e| &mut e.kind) {
            Some(EntityKind::Fsm(body)) => Ok(body),
            Some(_) => Err(Error::NotAStateMachine { entity: full_name }),
            None => Err(Error::UnknownObject { kind: "entity" }),
        }
    }

    pub fn find_child(&self, container: EntityId, name: &str) -> Option<EntityId> {
        self.entities
            .get(container)?
            .children
            .iter()
            .copied()
            .find(|c| self.entities[*c].name == name)
    }

    pub fn find_port(&self, entity: EntityId, name: &str) -> Option<PortId> {
        self.entities
            .get(entity)?
            .ports
            .iter()
            .copied()
            .find(|p| self.ports[*p].name == name)
    }

    pub fn find_attribute(&self, entity: EntityId, name: &str) -> Option<AttributeId> {
        self.entities
            .get(entity)?
            .attributes
            .iter()
            .copied()
            .find(|a| self.attributes[*a].name == name)
    }

    pub fn find_relation(&self, container: EntityId, name: &str) -> Option<RelationId> {
        self.entities
            .get(container)?
            .relations
            .iter()
            .copied()
            .find(|r| self.relations[*r].name == name)
    }

    /// Dotted path from the toplevel, e.g. `top.filter.gain`.
    pub fn full_name(&self, entity: EntityId) -> String {
        let mut names: Vec<&str> = self
            .ancestors(entity)
            .filter_map(|e| self.entities.get(e).map(|e| e.name.as_str()))
            .collect();
        names.reverse();
        names.join(".")
    }

    pub fn port_full_name(&self, port: PortId) -> String {
        match self.ports.get(port) {
            Some(p) => format!("{}.{}", self.full_name(p.container), p.name),
            None => "<unknown port>".to_string(),
        }
    }

    pub fn attribute_full_name(&self, attribute: AttributeId) -> String {
        match self.attributes.get(attribute) {
            Some(a) => format!("{}.{}", self.full_name(a.container), a.name),
            None => "<unknown attribute>".to_string(),
        }
    }

    pub fn relation_full_name(&self, relation: RelationId) -> String {
        match self.relations.get(relation) {
            Some(r) => format!("{}.{}", self.full_name(r.container), r.name),
            None => "<unknown relation>".to_string(),
        }
    }

    pub fn object_full_name(&self, object: ModelObject) -> String {
        match object {
            ModelObject::Port(port) => self.port_full_name(port),
            ModelObject::Attribute(attribute) => self.attribute_full_name(attribute),
        }
    }

    /// Entity holding a port or an attribute.
    pub fn object_container(&self, object: ModelObject) -> Option<EntityId> {
        match object {
            ModelObject::Port(port) => self.ports.get(port).map(|p| p.container),
            ModelObject::Attribute(attr) => self.attributes.get(attr).map(|a| a.container),
        }
    }

    // ---------------------------------------------------------------------
    // Connectivity
    // ---------------------------------------------------------------------

    fn is_outside(&self, port: PortId, relation: RelationId) -> bool {
        self.parent(self.ports[port].container) == Some(self.relations[relation].container)
    }

    fn is_inside(&self, port: PortId, relation: RelationId) -> bool {
        self.ports[port].container == self.relations[relation].container
    }

    /// Whether data written to `port` flows into `relation`.
    pub fn feeds(&self, port: PortId, relation: RelationId) -> bool {
        let p = &self.ports[port];
        (self.is_outside(port, relation) && p.is_output())
            || (self.is_inside(port, relation) && p.is_input())
    }

    /// Whether `port` receives the data flowing in `relation`.
    pub fn consumes(&self, port: PortId, relation: RelationId) -> bool {
        let p = &self.ports[port];
        (self.is_outside(port, relation) && p.is_input())
            || (self.is_inside(port, relation) && p.is_output())
    }

    fn linked_ports(
        &self,
        port: PortId,
        inside: bool,
        keep: impl Fn(PortId, RelationId) -> bool,
    ) -> Vec<PortId> {
        let Some(p) = self.ports.get(port) else {
            return Vec::new();
        };

        let mut result = Vec::new();
        for relation in p.relations.iter().copied() {
            let matches_side = if inside {
                self.is_inside(port, relation)
            } else {
                self.is_outside(port, relation)
            };
            if !matches_side {
                continue;
            }
            for other in self.relations[relation].ports.iter().copied() {
                if other != port && keep(other, relation) {
                    push_unique(&mut result, other);
                }
            }
        }
        result
    }

    /// Ports sending data to `port` through its outside relations.
    pub fn source_ports(&self, port: PortId) -> Vec<PortId> {
        self.linked_ports(port, false, |q, r| self.feeds(q, r))
    }

    /// Ports receiving data from `port` through its outside relations.
    pub fn sink_ports(&self, port: PortId) -> Vec<PortId> {
        self.linked_ports(port, false, |q, r| self.consumes(q, r))
    }

    /// Ports inside the container of `port` sending data to it.
    pub fn inside_source_ports(&self, port: PortId) -> Vec<PortId> {
        self.linked_ports(port, true, |q, r| self.feeds(q, r))
    }

    /// Ports inside the container of `port` receiving data from it.
    pub fn inside_sink_ports(&self, port: PortId) -> Vec<PortId> {
        self.linked_ports(port, true, |q, r| self.consumes(q, r))
    }

    pub fn connected_ports(&self, port: PortId) -> Vec<PortId> {
        self.linked_ports(port, false, |_, _| true)
    }

    pub fn inside_connected_ports(&self, port: PortId) -> Vec<PortId> {
        self.linked_ports(port, true, |_, _| true)
    }

    /// Whether `port` is linked to at least one other port.
    pub fn is_connected(&self, port: PortId) -> bool {
        !self.connected_ports(port).is_empty() || !self.inside_connected_ports(port).is_empty()
    }

    // ---------------------------------------------------------------------
    // Annotations
    // ---------------------------------------------------------------------

    /// Persist the textual property of `object` for `lattice`, returning the
    /// previous one.
    pub fn annotate(
        &mut self,
        object: ModelObject,
        lattice: &str,
        property: impl Into<String>,
    ) -> Option<String> {
        self.annotations
            .insert((object, lattice.to_string()), property.into())
    }

    pub fn annotation(&self, object: ModelObject, lattice: &str) -> Option<&str> {
        self.annotations
            .get(&(object, lattice.to_string()))
            .map(String::as_str)
    }

    /// Annotations persisted for `lattice`, ordered by object.
    pub fn annotations(&self, lattice: &str) -> impl Iterator<Item = (ModelObject, &str)> {
        self.annotations
            .iter()
            .filter(move |((_, l), _)| l == lattice)
            .map(|((object, _), property)| (*object, property.as_str()))
    }

    /// Remove every annotation of `lattice`, returning how many were removed.
    pub fn clear_annotations(&mut self, lattice: &str) -> usize {
        let before = self.annotations.len();
        self.annotations.retain(|(_, l), _| l != lattice);
        before - self.annotations.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `top` holds `a.out -> b.in` through `r`, and a composite `c` whose input
    /// `c.in` is fed from `a.out` and drives `c.inner.in` from inside.
    fn sample() -> (Model, BTreeMap<&'static str, PortId>) {
        let mut model = Model::new("top");
        let top = model.toplevel();
        let a = model.add_entity(top, "a", EntityKind::Atomic).unwrap();
        let b = model.add_entity(top, "b", EntityKind::Atomic).unwrap();
        let c = model.add_entity(top, "c", EntityKind::Composite).unwrap();
        let inner = model.add_entity(c, "inner", EntityKind::Atomic).unwrap();

        let mut ports = BTreeMap::new();
        ports.insert("a.out", model.add_port(a, "out", PortFlags::OUTPUT).unwrap());
        ports.insert("b.in", model.add_port(b, "in", PortFlags::INPUT).unwrap());
        ports.insert("c.in", model.add_port(c, "in", PortFlags::INPUT).unwrap());
        ports.insert(
            "inner.in",
            model.add_port(inner, "in", PortFlags::INPUT).unwrap(),
        );

        let r = model.add_relation(top, "r").unwrap();
        model.link(r, ports["a.out"]).unwrap();
        model.link(r, ports["b.in"]).unwrap();
        model.link(r, ports["c.in"]).unwrap();

        let s = model.add_relation(c, "s").unwrap();
        model.link(s, ports["c.in"]).unwrap();
        model.link(s, ports["inner.in"]).unwrap();
        (model, ports)
    }

    #[test]
    fn directional_connectivity() {
        let (model, ports) = sample();

        assert_eq!(
            model.sink_ports(ports["a.out"]),
            vec![ports["b.in"], ports["c.in"]]
        );
        assert_eq!(model.source_ports(ports["b.in"]), vec![ports["a.out"]]);
        assert!(model.source_ports(ports["a.out"]).is_empty());

        assert_eq!(model.inside_sink_ports(ports["c.in"]), vec![ports["inner.in"]]);
        assert!(model.inside_source_ports(ports["c.in"]).is_empty());
        assert_eq!(model.source_ports(ports["inner.in"]), vec![ports["c.in"]]);
    }

    #[test]
    fn illegal_links_and_unlink() {
        let (mut model, ports) = sample();
        let c = model.find_child(model.toplevel(), "c").unwrap();
        let s = model.find_relation(c, "s").unwrap();

        assert!(model.link(s, ports["a.out"]).unwrap_err().is_illegal_link());

        let r = model.find_relation(model.toplevel(), "r").unwrap();
        assert!(model.unlink(r, ports["b.in"]));
        assert!(!model.unlink(r, ports["b.in"]));
        assert!(!model.is_connected(ports["b.in"]));
        assert_eq!(model.sink_ports(ports["a.out"]), vec![ports["c.in"]]);
    }

    #[test]
    fn names_and_duplicates() {
        let (mut model, ports) = sample();
        assert_eq!(model.port_full_name(ports["inner.in"]), "top.c.inner.in");

        let a = model.find_child(model.toplevel(), "a").unwrap();
        let err = model.add_port(a, "out", PortFlags::OUTPUT).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Entity `top.a` already contains a port named `out`."
        );
        assert!(
            model
                .add_entity(a, "x", EntityKind::Atomic)
                .unwrap_err()
                .is_not_a_composite()
        );
    }

    #[test]
    fn annotations_per_lattice() {
        let (mut model, ports) = sample();
        let object = ModelObject::Port(ports["a.out"]);
        assert_eq!(model.annotate(object, "dimension", "TIME"), None);
        model.annotate(object, "logicalAND", "TRUE");
        assert_eq!(model.annotation(object, "dimension"), Some("TIME"));
        assert_eq!(model.annotations("logicalAND").count(), 1);
        assert_eq!(model.clear_annotations("dimension"), 1);
        assert_eq!(model.annotation(object, "dimension"), None);
    }

    #[test]
    fn state_machine_building() {
        let mut model = Model::new("top");
        let top = model.toplevel();
        let fsm = model
            .add_entity(top, "ctrl", EntityKind::Fsm(FsmBody::new()))
            .unwrap();
        model.add_state(fsm, "idle").unwrap();
        model
            .add_transition(fsm, "idle", "idle", Transition::default())
            .unwrap();
        assert!(
            model
                .add_transition(fsm, "idle", "gone", Transition::default())
                .unwrap_err()
                .is_unknown_state()
        );
        assert!(model.add_state(top, "s").unwrap_err().is_not_a_state_machine());
        assert_eq!(model.fsm(fsm).unwrap().transition_count(), 1);
    }
}
