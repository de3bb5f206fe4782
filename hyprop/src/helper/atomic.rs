use hymodel::model::{AttributeRole, ModelObject};

use crate::{
    constraint::{ConstraintCategory, ConstraintFamily, PropInequality},
    helper::{Helper, HelperContext, ast, constrain, link_category},
    utils::error::PropResult,
};

pub(super) fn constraints(
    helper: &Helper,
    ctx: &mut HelperContext<'_>,
) -> PropResult<Vec<PropInequality>> {
    let mut out = Vec::new();
    default_constraints(helper, ctx, &mut out)?;
    interconnect_constraints(helper, ctx, &mut out)?;
    attribute_constraints(helper, ctx, &mut out)?;
    Ok(out)
}

/// Outputs against inputs, following the actor constraint type.
fn default_constraints(
    helper: &Helper,
    ctx: &mut HelperContext<'_>,
    out: &mut Vec<PropInequality>,
) -> PropResult<()> {
    let model = ctx.model;
    let entity = model.entity(helper.entity);

    let inputs = ctx.effective_terms(
        entity
            .ports
            .iter()
            .filter(|p| model.port(**p).is_input())
            .map(|p| ModelObject::Port(*p)),
    )?;
    let outputs = ctx.effective_terms(
        entity
            .ports
            .iter()
            .filter(|p| model.port(**p).is_output())
            .map(|p| ModelObject::Port(*p)),
    )?;

    constrain(
        ctx.manager,
        helper.policy.get(ConstraintCategory::Actor),
        &outputs,
        &inputs,
        helper.origin(ConstraintFamily::Default),
        out,
    );
    Ok(())
}

/// Own ports against the ports linked to them from the outside.
pub(super) fn interconnect_constraints(
    helper: &Helper,
    ctx: &mut HelperContext<'_>,
    out: &mut Vec<PropInequality>,
) -> PropResult<()> {
    let model = ctx.model;
    let origin = helper.origin(ConstraintFamily::Interconnect);

    for port in model.entity(helper.entity).ports.iter().copied() {
        let object = ModelObject::Port(port);
        if !ctx.effectiveness.is_effective(object) {
            continue;
        }
        let own = ctx.object_term(object)?;

        for category in [
            ConstraintCategory::Connection,
            ConstraintCategory::CompositeConnection,
        ] {
            let ty = helper.policy.get(category);
            let others = if ty.is_source_oriented() {
                model.sink_ports(port)
            } else {
                model.source_ports(port)
            };
            let others = ctx.effective_terms(
                others
                    .into_iter()
                    .map(ModelObject::Port)
                    .filter(|other| link_category(model, helper.entity, *other) == category),
            )?;
            if others.is_empty() {
                continue;
            }

            if ty.is_source_oriented() {
                constrain(ctx.manager, ty, &others, &[own], origin, out);
            } else {
                constrain(ctx.manager, ty, &[own], &others, origin, out);
            }
        }
    }
    Ok(())
}

/// Settable parameters are mined for constraints, constraint annotations are
/// translated into constraints between the objects they mention.
pub(super) fn attribute_constraints(
    helper: &Helper,
    ctx: &mut HelperContext<'_>,
    out: &mut Vec<PropInequality>,
) -> PropResult<()> {
    let model = ctx.model;
    for attribute in model.entity(helper.entity).attributes.iter().copied() {
        let attr = model.attribute(attribute);
        if attr.is_empty() {
            continue;
        }
        let tree = attr.parse()?;
        let owner = model.attribute_full_name(attribute);

        match attr.role {
            AttributeRole::Parameter if attr.settable => {
                let visitor = ast::AstVisitor::new(helper, ConstraintFamily::Ast);
                let root = visitor.mine(ctx, helper.entity, owner, &tree, out)?;
                let term = ctx.object_term(ModelObject::Attribute(attribute))?;
                constrain(
                    ctx.manager,
                    helper.policy.get(ConstraintCategory::ExpressionAstNode),
                    &[term],
                    &[root],
                    helper.origin(ConstraintFamily::Ast),
                    out,
                );
            }
            AttributeRole::Parameter => {}
            AttributeRole::Constraint => {
                let visitor = ast::AstVisitor::new(helper, ConstraintFamily::Annotation);
                visitor.annotate(ctx, helper.entity, owner, &tree, out)?;
            }
        }
    }
    Ok(())
}
