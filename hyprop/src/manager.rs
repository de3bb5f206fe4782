//! Property terms of one resolution.
//!
//! [`PropertyTermManager`] hands out one variable term per [`Propertyable`]
//! (ports, attributes and expression nodes), together with the constant and
//! function terms helpers need. It owns the parse trees constraints were mined
//! from so that terms of expression nodes can be described in diagnostics.
use std::{collections::BTreeMap, fmt::Write, sync::Arc};

use hylattice::{
    cpo::Cpo,
    element::Property,
    lattice::PropertyLattice,
    term::{FunctionTerm, PropertyTerm, TermArena, TermId, TermStore},
};
use hymodel::{
    expr::{NodeId, ParseTree},
    model::{EntityId, Model, ModelObject},
};
use log::debug;

use crate::utils::error::PropResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TreeId(u32);

/// Anything a property can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Propertyable {
    Object(ModelObject),
    AstNode { tree: TreeId, node: NodeId },
}

impl From<ModelObject> for Propertyable {
    fn from(value: ModelObject) -> Self {
        Propertyable::Object(value)
    }
}

/// A parse tree constraints were mined from.
#[derive(Debug, Clone)]
pub struct TreeRecord {
    /// Entity identifiers of the expression are resolved in.
    pub scope: EntityId,
    /// Human readable location of the expression.
    pub owner: String,
    pub tree: ParseTree,
}

#[derive(Debug, Clone)]
pub struct PropertyTermManager {
    arena: TermArena<Propertyable>,
    terms: BTreeMap<Propertyable, TermId>,
    trees: Vec<TreeRecord>,
    declarations: BTreeMap<ModelObject, Property>,
}

impl PropertyTermManager {
    /// A manager whose object variables start from `declarations`, the lattice
    /// bottom otherwise.
    pub fn new(lattice: Arc<PropertyLattice>, declarations: BTreeMap<ModelObject, Property>) -> Self {
        debug!(
            "Creating term manager over lattice `{}` with {} declaration(s)",
            lattice.name(),
            declarations.len()
        );
        Self {
            arena: TermArena::new(lattice),
            terms: BTreeMap::new(),
            trees: Vec::new(),
            declarations,
        }
    }

    pub fn lattice(&self) -> &Arc<PropertyLattice> {
        self.arena.lattice()
    }

    pub fn arena(&self) -> &TermArena<Propertyable> {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut TermArena<Propertyable> {
        &mut self.arena
    }

    /// The variable of `propertyable`, created on first use.
    pub fn term(&mut self, propertyable: impl Into<Propertyable>) -> TermId {
        let propertyable = propertyable.into();
        if let Some(term) = self.terms.get(&propertyable) {
            return *term;
        }

        let declared = match propertyable {
            Propertyable::Object(object) => self
                .declarations
                .get(&object)
                .cloned()
                .unwrap_or_else(|| self.arena.lattice().bottom()),
            Propertyable::AstNode { .. } => self.arena.lattice().bottom(),
        };
        let term = self.arena.variable(propertyable, declared);
        self.terms.insert(propertyable, term);
        term
    }

    pub fn existing(&self, propertyable: impl Into<Propertyable>) -> Option<TermId> {
        self.terms.get(&propertyable.into()).copied()
    }

    pub fn constant(&mut self, property: Property) -> TermId {
        self.arena.constant(property)
    }

    pub fn meet(&mut self, children: Vec<TermId>) -> TermId {
        self.arena.meet(children)
    }

    pub fn record(&mut self, fields: BTreeMap<String, TermId>) -> TermId {
        self.arena.record(fields)
    }

    pub fn add_tree(&mut self, scope: EntityId, owner: impl Into<String>, tree: ParseTree) -> TreeId {
        let id = TreeId(self.trees.len() as u32);
        self.trees.push(TreeRecord {
            scope,
            owner: owner.into(),
            tree,
        });
        id
    }

    pub fn tree(&self, id: TreeId) -> Option<&TreeRecord> {
        self.trees.get(id.0 as usize)
    }

    pub fn trees(&self) -> impl Iterator<Item = (TreeId, &TreeRecord)> {
        self.trees
            .iter()
            .enumerate()
            .map(|(i, record)| (TreeId(i as u32), record))
    }

    /// Variables of model objects, ordered by object.
    pub fn objects(&self) -> impl Iterator<Item = (ModelObject, TermId)> + '_ {
        self.terms.iter().filter_map(|(p, term)| match p {
            Propertyable::Object(object) => Some((*object, *term)),
            Propertyable::AstNode { .. } => None,
        })
    }

    pub fn value(&self, term: TermId) -> PropResult<Property> {
        Ok(self.arena.value(term)?)
    }

    /// Resolved property of a model object, if it took part in the resolution.
    pub fn resolved(&self, object: ModelObject) -> Option<Property> {
        self.existing(object)
            .and_then(|term| self.arena.value(term).ok())
    }

    pub fn is_effective(&self, term: TermId) -> bool {
        self.arena.is_effective(term)
    }

    pub fn set_effective(&mut self, term: TermId, effective: bool) -> PropResult<()> {
        Ok(self.arena.set_effective(term, effective)?)
    }

    /// Reset every variable to its declaration.
    pub fn reinitialize(&mut self) {
        self.arena.reinitialize();
    }

    /// Number of terms of every kind.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Describe a term for diagnostics.
    pub fn describe(&self, model: &Model, term: TermId) -> String {
        let mut out = String::new();
        self.describe_into(model, term, &mut out);
        out
    }

    fn describe_into(&self, model: &Model, term: TermId, out: &mut String) {
        let lattice = self.arena.lattice();
        match self.arena.get(term) {
            Some(PropertyTerm::Constant(property)) => {
                let _ = write!(out, "{}", property.fmt(lattice));
            }
            Some(PropertyTerm::Variable(variable)) => match variable.object {
                Propertyable::Object(object) => out.push_str(&model.object_full_name(object)),
                Propertyable::AstNode { tree, node } => match self.tree(tree) {
                    Some(record) => {
                        let _ = write!(
                            out,
                            "`{}` in {}",
                            record.tree.fmt_node(node),
                            record.owner
                        );
                    }
                    None => out.push_str("<unknown expression>"),
                },
            },
            Some(PropertyTerm::Function(FunctionTerm::Meet(children))) => {
                out.push_str("meet(");
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.describe_into(model, *child, out);
                }
                out.push(')');
            }
            Some(PropertyTerm::Function(FunctionTerm::Record(fields))) => {
                out.push('{');
                for (i, (label, child)) in fields.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    let _ = write!(out, "{} = ", label);
                    self.describe_into(model, *child, out);
                }
                out.push('}');
            }
            None => out.push_str("<unknown term>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use hylattice::registry::builtin;
    use hymodel::model::PortFlags;

    use super::*;

    #[test]
    fn terms_are_shared_and_declared() {
        let lattice = Arc::new(builtin::dimension().unwrap());
        let mut model = Model::new("top");
        let top = model.toplevel();
        let port = model.add_port(top, "p", PortFlags::INPUT).unwrap();
        let object = ModelObject::Port(port);

        let mut declarations = BTreeMap::new();
        declarations.insert(object, lattice.element("TIME").unwrap());
        let mut manager = PropertyTermManager::new(Arc::clone(&lattice), declarations);

        let term = manager.term(object);
        assert_eq!(manager.term(object), term);
        assert_eq!(manager.resolved(object), Some(lattice.element("TIME").unwrap()));
        assert_eq!(manager.objects().count(), 1);

        let tree = ParseTree::parse("p + 1").unwrap();
        let tree_id = manager.add_tree(top, "top.expr", tree);
        let node = manager.term(Propertyable::AstNode {
            tree: tree_id,
            node: NodeId::ROOT,
        });
        let meet = manager.meet(vec![term, node]);
        assert_eq!(
            manager.describe(&model, meet),
            "meet(top.p, `(p + 1)` in top.expr)"
        );
        assert_eq!(manager.objects().count(), 1);
    }
}
