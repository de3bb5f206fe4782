use hymodel::model::ModelObject;

use crate::{
    constraint::{ConstraintCategory, ConstraintFamily, PropInequality},
    helper::{Helper, HelperContext, HelperStore, atomic, constrain},
    utils::error::PropResult,
};

/// Constraints of the contained entities, followed by the ones of the
/// composite itself.
pub(super) fn constraints(
    store: &HelperStore,
    helper: &Helper,
    ctx: &mut HelperContext<'_>,
) -> PropResult<Vec<PropInequality>> {
    let mut out = Vec::new();
    for child in helper.children.iter() {
        out.extend(store.collect(*child, ctx)?);
    }

    atomic::interconnect_constraints(helper, ctx, &mut out)?;
    boundary_constraints(helper, ctx, &mut out)?;
    atomic::attribute_constraints(helper, ctx, &mut out)?;
    Ok(out)
}

/// Ports of the composite against the ports linked to them from the inside.
fn boundary_constraints(
    helper: &Helper,
    ctx: &mut HelperContext<'_>,
    out: &mut Vec<PropInequality>,
) -> PropResult<()> {
    let model = ctx.model;
    let ty = helper.policy.get(ConstraintCategory::CompositeConnection);
    let origin = helper.origin(ConstraintFamily::Boundary);

    for port in model.entity(helper.entity).ports.iter().copied() {
        let object = ModelObject::Port(port);
        if !ctx.effectiveness.is_effective(object) {
            continue;
        }
        let own = ctx.object_term(object)?;

        if ty.is_source_oriented() {
            let sinks = ctx.effective_terms(
                model
                    .inside_sink_ports(port)
                    .into_iter()
                    .map(ModelObject::Port),
            )?;
            constrain(ctx.manager, ty, &sinks, &[own], origin, out);
        } else {
            let sources = ctx.effective_terms(
                model
                    .inside_source_ports(port)
                    .into_iter()
                    .map(ModelObject::Port),
            )?;
            constrain(ctx.manager, ty, &[own], &sources, origin, out);
        }
    }
    Ok(())
}
