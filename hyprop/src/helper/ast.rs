//! Constraints mined from expressions.
//!
//! Every node of a parse tree gets its own variable. A node is constrained
//! against its children with the expression constraint type of the policy, the
//! node being the sink. Leaves are tied to what they denote:
//!
//! - a literal is at least the literal property of the lattice, when it has one,
//! - an identifier naming a port or an attribute is at least that object,
//! - an identifier naming a lattice element equals that element.
//!
//! Constraint annotations (`out >= in && x == TIME`) are read differently: each
//! relation becomes one constraint between its operands.
use std::collections::BTreeMap;

use hylattice::{element::Property, inequality::Inequality, term::TermId};
use hymodel::{
    Error,
    expr::{LogicalOp, NodeId, NodeKind, ParseTree, RelationalOp},
    model::{EntityId, Model, ModelObject},
};
use log::{trace, warn};

use crate::{
    constraint::{ConstraintCategory, ConstraintFamily, PropInequality},
    helper::{Helper, HelperContext, constrain, same_as},
    manager::{Propertyable, TreeId},
    utils::error::{PropError, PropResult},
};

/// What an identifier of an expression stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denotation {
    Object(ModelObject),
    Element(Property),
}

/// Resolve `name` in the scope of `scope`: ports of the entity first, then
/// attributes of the entity and of its containers, then lattice elements.
pub fn resolve_identifier(
    model: &Model,
    lattice: &hylattice::lattice::PropertyLattice,
    scope: EntityId,
    name: &str,
) -> Option<Denotation> {
    if let Some(port) = model.find_port(scope, name) {
        return Some(Denotation::Object(ModelObject::Port(port)));
    }
    if let Some(attribute) = model
        .ancestors(scope)
        .find_map(|entity| model.find_attribute(entity, name))
    {
        return Some(Denotation::Object(ModelObject::Attribute(attribute)));
    }
    lattice.element(name).ok().map(Denotation::Element)
}

fn unsupported(construct: &str, tree: &ParseTree, node: NodeId) -> PropError {
    PropError::UnsupportedConstruct {
        construct: construct.to_string(),
        expression: tree.fmt_node(node).to_string(),
    }
}

/// Walks one parse tree on behalf of a helper.
pub struct AstVisitor<'h> {
    helper: &'h Helper,
    family: ConstraintFamily,
}

impl<'h> AstVisitor<'h> {
    pub fn new(helper: &'h Helper, family: ConstraintFamily) -> Self {
        Self { helper, family }
    }

    /// Mine every node of `tree`, returning the term of its root.
    pub fn mine(
        &self,
        ctx: &mut HelperContext<'_>,
        scope: EntityId,
        owner: String,
        tree: &ParseTree,
        out: &mut Vec<PropInequality>,
    ) -> PropResult<TermId> {
        trace!("Mining `{}` in {}", tree, owner);
        let id = ctx.manager.add_tree(scope, owner, tree.clone());
        self.visit(ctx, scope, id, tree, tree.root(), out)
    }

    fn visit(
        &self,
        ctx: &mut HelperContext<'_>,
        scope: EntityId,
        id: TreeId,
        tree: &ParseTree,
        node_id: NodeId,
        out: &mut Vec<PropInequality>,
    ) -> PropResult<TermId> {
        let node = tree.node(node_id);
        let term = ctx.manager.term(Propertyable::AstNode {
            tree: id,
            node: node_id,
        });
        let origin = self.helper.origin(self.family);

        // Children whose terms feed the constraint of this node.
        let sources: &[NodeId] = match &node.kind {
            NodeKind::Literal(_) => {
                if let Some(literal) = ctx.manager.lattice().literal() {
                    let constant = ctx.manager.constant(literal);
                    out.push(Inequality::new(constant, term, origin));
                }
                return Ok(term);
            }
            NodeKind::Identifier(name) => {
                let model = ctx.model;
                let lattice = ctx.manager.lattice().clone();
                match resolve_identifier(model, &lattice, scope, name) {
                    Some(Denotation::Object(object)) => {
                        let object = ctx.object_term(object)?;
                        out.push(Inequality::new(object, term, origin));
                    }
                    Some(Denotation::Element(property)) => {
                        let constant = ctx.manager.constant(property);
                        same_as(term, constant, origin, out);
                    }
                    None => warn!(
                        "Identifier `{}` of `{}` does not name any port, attribute or element of lattice `{}`",
                        name,
                        tree,
                        lattice.name()
                    ),
                }
                return Ok(term);
            }
            NodeKind::UnionConstruct(_) => {
                return Err(unsupported("union construction", tree, node_id));
            }
            NodeKind::FunctionDefinition(_) => {
                return Err(unsupported("function definition", tree, node_id));
            }
            NodeKind::RecordConstruct(labels) => {
                let mut fields = BTreeMap::new();
                for (label, child) in labels.iter().zip(node.children.iter()) {
                    let child = self.visit(ctx, scope, id, tree, *child, out)?;
                    fields.insert(label.clone(), child);
                }
                let record = ctx.manager.record(fields);
                same_as(term, record, origin, out);
                return Ok(term);
            }
            // The applied function itself carries no property.
            NodeKind::FunctionApplication => &node.children[1..],
            NodeKind::Conditional => {
                self.visit(ctx, scope, id, tree, node.children[0], out)?;
                &node.children[1..]
            }
            _ => &node.children[..],
        };

        let mut children = Vec::with_capacity(sources.len());
        for child in sources {
            children.push(self.visit(ctx, scope, id, tree, *child, out)?);
        }
        constrain(
            ctx.manager,
            self.helper.policy.get(ConstraintCategory::ExpressionAstNode),
            &[term],
            &children,
            origin,
            out,
        );
        Ok(term)
    }

    /// Translate a constraint annotation into inequalities.
    ///
    /// The expression must be a conjunction (`&&`) of `==`, `>=` and `<=`
    /// relations.
    pub fn annotate(
        &self,
        ctx: &mut HelperContext<'_>,
        scope: EntityId,
        owner: String,
        tree: &ParseTree,
        out: &mut Vec<PropInequality>,
    ) -> PropResult<()> {
        let id = ctx.manager.add_tree(scope, owner, tree.clone());
        self.annotate_node(ctx, scope, id, tree, tree.root(), out)
    }

    fn annotate_node(
        &self,
        ctx: &mut HelperContext<'_>,
        scope: EntityId,
        id: TreeId,
        tree: &ParseTree,
        node_id: NodeId,
        out: &mut Vec<PropInequality>,
    ) -> PropResult<()> {
        let node = tree.node(node_id);
        let origin = self.helper.origin(self.family);
        match &node.kind {
            NodeKind::Logical(LogicalOp::And) => {
                for child in node.children.iter() {
                    self.annotate_node(ctx, scope, id, tree, *child, out)?;
                }
                Ok(())
            }
            NodeKind::Relational(
                op @ (RelationalOp::Equal | RelationalOp::GreaterEqual | RelationalOp::LessEqual),
            ) => {
                let lhs = self.operand(ctx, scope, id, tree, node.children[0], out)?;
                let rhs = self.operand(ctx, scope, id, tree, node.children[1], out)?;
                match op {
                    RelationalOp::Equal => same_as(lhs, rhs, origin, out),
                    RelationalOp::GreaterEqual => out.push(Inequality::new(rhs, lhs, origin)),
                    _ => out.push(Inequality::new(lhs, rhs, origin)),
                }
                Ok(())
            }
            NodeKind::Relational(_) => Err(unsupported(
                "a relation other than `==`, `>=` or `<=`",
                tree,
                node_id,
            )),
            _ => Err(unsupported(
                "a constraint annotation that is not a conjunction of relations",
                tree,
                node_id,
            )),
        }
    }

    /// Term of one side of an annotation relation.
    fn operand(
        &self,
        ctx: &mut HelperContext<'_>,
        scope: EntityId,
        id: TreeId,
        tree: &ParseTree,
        node_id: NodeId,
        out: &mut Vec<PropInequality>,
    ) -> PropResult<TermId> {
        let NodeKind::Identifier(name) = &tree.node(node_id).kind else {
            return self.visit(ctx, scope, id, tree, node_id, out);
        };

        let model = ctx.model;
        let lattice = ctx.manager.lattice().clone();
        match resolve_identifier(model, &lattice, scope, name) {
            Some(Denotation::Object(object)) => ctx.object_term(object),
            Some(Denotation::Element(property)) => Ok(ctx.manager.constant(property)),
            None => Err(Error::UnresolvedPath {
                container: model.full_name(scope),
                kind: "port, attribute or lattice element",
                path: name.clone(),
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use hylattice::registry::builtin;
    use hymodel::model::{AttributeRole, EntityKind, PortFlags};

    use super::*;
    use crate::{
        constraint::{ConstraintPolicy, ConstraintType, HelperKind},
        effectiveness::Effectiveness,
        manager::PropertyTermManager,
    };

    fn helper(entity: EntityId) -> Helper {
        Helper {
            entity,
            kind: HelperKind::Atomic,
            children: Vec::new(),
            policy: ConstraintPolicy::default(),
        }
    }

    #[test]
    fn identifiers_resolve_ports_before_attributes() {
        let lattice = builtin::static_dynamic().unwrap();
        let mut model = Model::new("top");
        let top = model.toplevel();
        let a = model.add_entity(top, "a", EntityKind::Atomic).unwrap();
        let port = model.add_port(a, "x", PortFlags::INPUT).unwrap();
        let shadowed = model
            .add_attribute(top, "x", "1", AttributeRole::Parameter)
            .unwrap();
        let inherited = model
            .add_attribute(top, "gain", "2", AttributeRole::Parameter)
            .unwrap();

        assert_eq!(
            resolve_identifier(&model, &lattice, a, "x"),
            Some(Denotation::Object(port.into()))
        );
        assert_eq!(
            resolve_identifier(&model, &lattice, top, "x"),
            Some(Denotation::Object(shadowed.into()))
        );
        assert_eq!(
            resolve_identifier(&model, &lattice, a, "gain"),
            Some(Denotation::Object(inherited.into()))
        );
        assert_eq!(
            resolve_identifier(&model, &lattice, a, "STATIC"),
            Some(Denotation::Element(lattice.element("STATIC").unwrap()))
        );
        assert_eq!(resolve_identifier(&model, &lattice, a, "nothing"), None);
    }

    #[test]
    fn mining_follows_the_tree() {
        let lattice = Arc::new(builtin::static_dynamic().unwrap());
        let mut model = Model::new("top");
        let top = model.toplevel();
        let gain = model
            .add_attribute(top, "gain", "3", AttributeRole::Parameter)
            .unwrap();
        let effectiveness = Effectiveness::compute(&model).unwrap();
        let mut manager = PropertyTermManager::new(lattice, BTreeMap::new());
        let mut ctx = HelperContext {
            model: &model,
            manager: &mut manager,
            effectiveness: &effectiveness,
        };

        let helper = helper(top);
        let visitor = AstVisitor::new(&helper, ConstraintFamily::Ast);
        let tree = ParseTree::parse("gain * 2 + f(gain)").unwrap();
        let mut out = Vec::new();
        visitor
            .mine(&mut ctx, top, "top.expr".to_string(), &tree, &mut out)
            .unwrap();

        // `f` is never visited: sum <- product, apply; product <- gain, 2;
        // apply <- gain; both gain leaves >= attribute; literal >= STATIC.
        assert_eq!(out.len(), 2 + 2 + 1 + 2 + 1);
        assert!(out.iter().all(|i| i.origin.family.is_ast()));
        let gain_term = manager.existing(ModelObject::Attribute(gain)).unwrap();
        assert_eq!(out.iter().filter(|i| i.lesser == gain_term).count(), 2);
    }

    #[test]
    fn unsupported_constructs_are_rejected() {
        let lattice = Arc::new(builtin::logical_and().unwrap());
        let model = Model::new("top");
        let top = model.toplevel();
        let effectiveness = Effectiveness::compute(&model).unwrap();
        let mut manager = PropertyTermManager::new(lattice, BTreeMap::new());
        let mut ctx = HelperContext {
            model: &model,
            manager: &mut manager,
            effectiveness: &effectiveness,
        };
        let helper = helper(top);
        let visitor = AstVisitor::new(&helper, ConstraintFamily::Ast);
        let mut out = Vec::new();

        for source in ["{|a = 1|}", "function(x) x + 1"] {
            let tree = ParseTree::parse(source).unwrap();
            let err = visitor
                .mine(&mut ctx, top, "top.p".to_string(), &tree, &mut out)
                .unwrap_err();
            assert!(err.is_unsupported_construct(), "{source}");
        }

        let tree = ParseTree::parse("TRUE != FALSE").unwrap();
        let err = visitor
            .annotate(&mut ctx, top, "top.c".to_string(), &tree, &mut out)
            .unwrap_err();
        assert!(err.is_unsupported_construct());
    }

    #[test]
    fn annotations_relate_their_operands() {
        let lattice = Arc::new(builtin::logical_and().unwrap());
        let mut model = Model::new("top");
        let top = model.toplevel();
        let a = model.add_entity(top, "a", EntityKind::Atomic).unwrap();
        let b = model.add_entity(top, "b", EntityKind::Atomic).unwrap();
        let out_port = model.add_port(a, "out", PortFlags::OUTPUT).unwrap();
        let in_port = model.add_port(b, "in", PortFlags::INPUT).unwrap();
        let r = model.add_relation(top, "r").unwrap();
        model.link(r, out_port).unwrap();
        model.link(r, in_port).unwrap();

        let effectiveness = Effectiveness::compute(&model).unwrap();
        let mut manager = PropertyTermManager::new(lattice, BTreeMap::new());
        let mut ctx = HelperContext {
            model: &model,
            manager: &mut manager,
            effectiveness: &effectiveness,
        };
        let mut helper = helper(a);
        helper
            .policy
            .set(ConstraintCategory::ExpressionAstNode, ConstraintType::Equals);
        let visitor = AstVisitor::new(&helper, ConstraintFamily::Annotation);

        let tree = ParseTree::parse("out >= TRUE && out <= FALSE").unwrap();
        let mut out = Vec::new();
        visitor
            .annotate(&mut ctx, a, "top.a.c".to_string(), &tree, &mut out)
            .unwrap();
        assert_eq!(out.len(), 2);
        let port = manager.existing(ModelObject::Port(out_port)).unwrap();
        assert_eq!(out[0].greater, port);
        assert_eq!(out[1].lesser, port);
        assert!(out[0].origin.family.is_annotation());

        let tree = ParseTree::parse("missing == TRUE").unwrap();
        let mut ctx = HelperContext {
            model: &model,
            manager: &mut manager,
            effectiveness: &effectiveness,
        };
        let err = visitor
            .annotate(&mut ctx, a, "top.a.c".to_string(), &tree, &mut out)
            .unwrap_err();
        assert!(matches!(err, PropError::Model(Error::UnresolvedPath { .. })));
    }
}
