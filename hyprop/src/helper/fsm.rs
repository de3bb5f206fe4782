use hylattice::term::TermId;
use hymodel::{
    Error,
    model::{ModelObject, Transition, TransitionId},
};

use crate::{
    constraint::{ConstraintCategory, ConstraintFamily, ConstraintType, PropInequality},
    helper::{Helper, HelperContext, HelperStore, ast::AstVisitor, composite, constrain},
    utils::error::PropResult,
};

/// Destinations of actions and the expressions written to each of them, in
/// order of first appearance.
#[derive(Debug, Default)]
struct Writers {
    entries: Vec<(ModelObject, Vec<TermId>)>,
}

impl Writers {
    fn push(&mut self, destination: ModelObject, writer: TermId) {
        match self.entries.iter_mut().find(|(d, _)| *d == destination) {
            Some((_, writers)) => writers.push(writer),
            None => self.entries.push((destination, vec![writer])),
        }
    }
}

/// Constraints of a state machine: those of a composite, the ones mined from
/// guards and actions, and every action destination against its writers.
pub(super) fn constraints(
    store: &HelperStore,
    helper: &Helper,
    ctx: &mut HelperContext<'_>,
) -> PropResult<Vec<PropInequality>> {
    let mut out = composite::constraints(store, helper, ctx)?;

    let model = ctx.model;
    let body = model.fsm(helper.entity)?;
    let visitor = AstVisitor::new(helper, ConstraintFamily::Ast);
    let mut writers = Writers::default();

    for (state, _) in body.states() {
        for (id, transition) in body.outgoing(state) {
            transition_constraints(helper, ctx, &visitor, id, transition, &mut writers, &mut out)?;
        }
    }

    // A destination equal to the meet of its writers is the same as a
    // destination equal to each of them.
    let ty = match helper.policy.get(ConstraintCategory::Fsm) {
        ConstraintType::SrcEqualsMeet => ConstraintType::Equals,
        ty => ty,
    };
    let origin = helper.origin(ConstraintFamily::Fsm);
    for (destination, sources) in writers.entries {
        let destination = ctx.object_term(destination)?;
        constrain(ctx.manager, ty, &[destination], &sources, origin, &mut out);
    }
    Ok(out)
}

fn transition_constraints(
    helper: &Helper,
    ctx: &mut HelperContext<'_>,
    visitor: &AstVisitor<'_>,
    id: TransitionId,
    transition: &Transition,
    writers: &mut Writers,
    out: &mut Vec<PropInequality>,
) -> PropResult<()> {
    let model = ctx.model;
    let entity = helper.entity;
    let fsm_name = model.full_name(entity);
    let body = model.fsm(entity)?;
    let label = match body.endpoints(id) {
        Some((from, to)) => format!(
            "{}: {} -> {}",
            fsm_name,
            body.state(from).map_or("?", |s| s.name.as_str()),
            body.state(to).map_or("?", |s| s.name.as_str())
        ),
        None => fsm_name.clone(),
    };

    if let Some(guard) = transition.parse_guard()? {
        visitor.mine(ctx, entity, format!("guard of {}", label), &guard, out)?;
    }

    for action in transition.parse_output_actions()? {
        let port = model
            .find_port(entity, &action.target)
            .ok_or_else(|| Error::UnresolvedPath {
                container: fsm_name.clone(),
                kind: "port",
                path: action.target.clone(),
            })?;
        let owner = format!("output action `{}` of {}", action.target, label);
        let root = visitor.mine(ctx, entity, owner, &action.expression, out)?;
        writers.push(ModelObject::Port(port), root);
    }

    for action in transition.parse_set_actions()? {
        let attribute = model
            .ancestors(entity)
            .find_map(|e| model.find_attribute(e, &action.target))
            .ok_or_else(|| Error::UnresolvedPath {
                container: fsm_name.clone(),
                kind: "attribute",
                path: action.target.clone(),
            })?;
        let owner = format!("set action `{}` of {}", action.target, label);
        let root = visitor.mine(ctx, entity, owner, &action.expression, out)?;
        writers.push(ModelObject::Attribute(attribute), root);
    }
    Ok(())
}
