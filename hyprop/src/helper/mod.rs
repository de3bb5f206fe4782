//! Constraint generation.
//!
//! Every entity of the model gets one [`Helper`]. Helpers are created lazily and
//! kept in a [`HelperStore`] keyed by entity; the recursion over the model
//! hierarchy receives a [`HelperContext`] instead of holding pointers back to the
//! solver.
//!
//! Constraints come in families (see [`ConstraintFamily`]):
//!
//! - atomic entities relate their outputs to their inputs following the actor
//!   constraint type (the entity may override it),
//! - every entity relates its ports to the ports they are linked to from the
//!   outside (*interconnect*),
//! - composite entities relate their own ports to the ports linked to them from
//!   the inside (*boundary*),
//! - state machines relate each destination of their actions to the expressions
//!   written to it,
//! - attribute expressions are mined node by node.
//!
//! A connection is handled once: by the receiving side, or by the sending side
//! for the source-oriented `src == meet(sink1, ...)` policy.
use std::collections::BTreeMap;

use hylattice::{inequality::Inequality, term::TermId};
use hymodel::model::{EntityId, EntityKind, Model, ModelObject};
use log::debug;

use crate::{
    constraint::{
        ConstraintCategory, ConstraintFamily, ConstraintPolicy, ConstraintType, HelperKind, Origin,
        PropInequality,
    },
    effectiveness::Effectiveness,
    manager::PropertyTermManager,
    utils::error::PropResult,
};

pub mod ast;
mod atomic;
mod composite;
mod fsm;

/// State threaded through the helper recursion.
pub struct HelperContext<'a> {
    pub model: &'a Model,
    pub manager: &'a mut PropertyTermManager,
    pub effectiveness: &'a Effectiveness,
}

impl HelperContext<'_> {
    /// Variable of a model object, marked ineffective when the object is.
    pub fn object_term(&mut self, object: ModelObject) -> PropResult<TermId> {
        let fresh = self.manager.existing(object).is_none();
        let term = self.manager.term(object);
        if fresh && !self.effectiveness.is_effective(object) {
            self.manager.set_effective(term, false)?;
        }
        Ok(term)
    }

    /// Terms of the effective objects among `objects`.
    pub fn effective_terms(
        &mut self,
        objects: impl IntoIterator<Item = ModelObject>,
    ) -> PropResult<Vec<TermId>> {
        let mut terms = Vec::new();
        for object in objects {
            if self.effectiveness.is_effective(object) {
                terms.push(self.object_term(object)?);
            }
        }
        Ok(terms)
    }
}

/// Push `a <= b` and `b <= a`.
pub(crate) fn same_as(a: TermId, b: TermId, origin: Origin, out: &mut Vec<PropInequality>) {
    out.push(Inequality::new(a, b, origin));
    out.push(Inequality::new(b, a, origin));
}

/// Generate the constraints of `ty` between `sinks` and `sources`.
pub(crate) fn constrain(
    manager: &mut PropertyTermManager,
    ty: ConstraintType,
    sinks: &[TermId],
    sources: &[TermId],
    origin: Origin,
    out: &mut Vec<PropInequality>,
) {
    match ty {
        ConstraintType::SrcLess | ConstraintType::SinkLess | ConstraintType::Equals => {
            for &sink in sinks {
                for &source in sources {
                    if sink == source {
                        continue;
                    }
                    match ty {
                        ConstraintType::SrcLess => out.push(Inequality::new(source, sink, origin)),
                        ConstraintType::SinkLess => out.push(Inequality::new(sink, source, origin)),
                        _ => same_as(sink, source, origin, out),
                    }
                }
            }
        }
        ConstraintType::SinkEqualsMeet => {
            if sources.is_empty() {
                return;
            }
            let meet = manager.meet(sources.to_vec());
            for &sink in sinks {
                same_as(sink, meet, origin, out);
            }
        }
        ConstraintType::SrcEqualsMeet => {
            if sinks.is_empty() {
                return;
            }
            let meet = manager.meet(sinks.to_vec());
            for &source in sources {
                same_as(source, meet, origin, out);
            }
        }
        ConstraintType::None => {}
    }
}

#[derive(Debug, Clone)]
pub struct Helper {
    pub entity: EntityId,
    pub kind: HelperKind,
    pub children: Vec<EntityId>,
    /// Policy in effect for this entity, set by [`HelperStore::propagate_policy`].
    pub policy: ConstraintPolicy,
}

impl Helper {
    pub(crate) fn origin(&self, family: ConstraintFamily) -> Origin {
        Origin {
            entity: self.entity,
            helper: self.kind,
            family,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HelperStore {
    helpers: BTreeMap<EntityId, Helper>,
}

impl HelperStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.helpers.clear();
    }

    pub fn len(&self) -> usize {
        self.helpers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.helpers.is_empty()
    }

    pub fn get(&self, entity: EntityId) -> Option<&Helper> {
        self.helpers.get(&entity)
    }

    /// The helper of `entity`, creating it and the helpers of everything it
    /// contains on first use.
    pub fn get_or_create(&mut self, model: &Model, entity: EntityId) -> &Helper {
        if !self.helpers.contains_key(&entity) {
            let e = model.entity(entity);
            let kind = match e.kind {
                EntityKind::Atomic => HelperKind::Atomic,
                EntityKind::Composite => HelperKind::Composite,
                EntityKind::Fsm(_) => HelperKind::Fsm,
            };
            debug!(
                "Creating {} for `{}`",
                kind.name(),
                model.full_name(entity)
            );
            for child in e.children.iter() {
                self.get_or_create(model, *child);
            }
            self.helpers.insert(
                entity,
                Helper {
                    entity,
                    kind,
                    children: e.children.clone(),
                    policy: ConstraintPolicy::default(),
                },
            );
        }
        &self.helpers[&entity]
    }

    /// Install `policy` on the helper of `entity` and below. An entity naming its
    /// own constraint policy overrides the actor constraint type for itself only.
    pub fn propagate_policy(
        &mut self,
        model: &Model,
        entity: EntityId,
        policy: &ConstraintPolicy,
    ) -> PropResult<()> {
        let own = match &model.entity(entity).constraint_policy {
            Some(text) => policy.with_actor(ConstraintType::from_policy_str(text)?),
            None => policy.clone(),
        };

        let children = match self.helpers.get_mut(&entity) {
            Some(helper) => {
                helper.policy = own;
                helper.children.clone()
            }
            None => return Ok(()),
        };
        for child in children {
            self.propagate_policy(model, child, policy)?;
        }
        Ok(())
    }

    /// Every constraint of `entity` and of the entities it contains.
    pub fn collect(
        &self,
        entity: EntityId,
        ctx: &mut HelperContext<'_>,
    ) -> PropResult<Vec<PropInequality>> {
        let Some(helper) = self.helpers.get(&entity) else {
            return Ok(Vec::new());
        };

        let constraints = match helper.kind {
            HelperKind::Atomic => atomic::constraints(helper, ctx)?,
            HelperKind::Composite => composite::constraints(self, helper, ctx)?,
            HelperKind::Fsm => fsm::constraints(self, helper, ctx)?,
            HelperKind::Solver => Vec::new(),
        };

        debug!(
            "{} of `{}` produced {} constraint(s)",
            helper.kind.name(),
            ctx.model.full_name(entity),
            constraints.len()
        );
        Ok(constraints)
    }
}

/// Category of a link from a port of `entity` to `other`: links reaching the
/// container of `entity` are composite connections.
pub(crate) fn link_category(model: &Model, entity: EntityId, other: ModelObject) -> ConstraintCategory {
    match model.object_container(other) {
        Some(owner) if Some(owner) == model.parent(entity) => ConstraintCategory::CompositeConnection,
        _ => ConstraintCategory::Connection,
    }
}
