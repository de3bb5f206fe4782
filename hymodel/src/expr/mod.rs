//! Expression language of attributes and state machine actions.
//!
//! Expressions are first parsed into a boxed [`Expr`] tree (see [`parser`]) and then
//! flattened into a [`ParseTree`]: an arena of [`Node`]s addressed by [`NodeId`] in
//! pre-order, the root being node 0. Consumers walk a parse tree through
//! [`ParseTree::node`] and [`Node::children`].
//!
//! The grammar, from the loosest to the tightest binding:
//!
//! | construct           | syntax                                  |
//! |---------------------|-----------------------------------------|
//! | conditional         | `c ? a : b`                             |
//! | logical             | `a \|\| b`, `a && b`                    |
//! | bitwise             | `a \| b`, `a # b`, `a & b`              |
//! | relational          | `==`, `!=`, `>=`, `<=`, `>`, `<`        |
//! | shift               | `<<`, `>>`                              |
//! | sum                 | `+`, `-`                                |
//! | product             | `*`, `/`, `%`                           |
//! | unary               | `-a`, `!a`, `~a`                        |
//! | power               | `a ^ b` (right associative)             |
//! | function application| `f(a, b)`                               |
//! | leaves and literals | `x`, `1`, `2.5`, `true`, `"text"`       |
//! | constructs          | `{a, b}`, `{x = a}`, `{\|x = a\|}`      |
//! | function definition | `function(x, y) x + y`                  |
use std::fmt::Display;

use smallvec::SmallVec;
use strum::{EnumIs, EnumTryAs};

use crate::utils::ModelResult;

pub mod parser;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Literal {
    /// Integer literal, as written.
    Integer(String),
    /// Floating point literal, as written.
    Float(String),
    Boolean(bool),
    String(String),
}

impl Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Integer(text) | Literal::Float(text) => f.write_str(text),
            Literal::Boolean(value) => write!(f, "{}", value),
            Literal::String(text) => write!(f, "{:?}", text),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationalOp {
    Equal,
    NotEqual,
    GreaterEqual,
    LessEqual,
    Greater,
    Less,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SumOp {
    Add,
    Sub,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductOp {
    Mul,
    Div,
    Rem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShiftOp {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitwiseOp {
    And,
    Or,
    Xor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
}

/// Binary operators grouped by the AST node kind they produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Relational(RelationalOp),
    Sum(SumOp),
    Product(ProductOp),
    Power,
    Shift(ShiftOp),
    Bitwise(BitwiseOp),
    Logical(LogicalOp),
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Relational(RelationalOp::Equal) => "==",
            BinaryOp::Relational(RelationalOp::NotEqual) => "!=",
            BinaryOp::Relational(RelationalOp::GreaterEqual) => ">=",
            BinaryOp::Relational(RelationalOp::LessEqual) => "<=",
            BinaryOp::Relational(RelationalOp::Greater) => ">",
            BinaryOp::Relational(RelationalOp::Less) => "<",
            BinaryOp::Sum(SumOp::Add) => "+",
            BinaryOp::Sum(SumOp::Sub) => "-",
            BinaryOp::Product(ProductOp::Mul) => "*",
            BinaryOp::Product(ProductOp::Div) => "/",
            BinaryOp::Product(ProductOp::Rem) => "%",
            BinaryOp::Power => "^",
            BinaryOp::Shift(ShiftOp::Left) => "<<",
            BinaryOp::Shift(ShiftOp::Right) => ">>",
            BinaryOp::Bitwise(BitwiseOp::And) => "&",
            BinaryOp::Bitwise(BitwiseOp::Or) => "|",
            BinaryOp::Bitwise(BitwiseOp::Xor) => "#",
            BinaryOp::Logical(LogicalOp::And) => "&&",
            BinaryOp::Logical(LogicalOp::Or) => "||",
        }
    }
}

/// Boxed expression tree produced by the parser.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    Literal(Literal),
    Identifier(String),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Array(Vec<Expr>),
    Record(Vec<(String, Expr)>),
    Union(Vec<(String, Expr)>),
    Apply {
        function: Box<Expr>,
        arguments: Vec<Expr>,
    },
    FunctionDefinition {
        parameters: Vec<String>,
        body: Box<Expr>,
    },
    Conditional {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
}

impl Expr {
    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }
}

/// Index of a node inside a [`ParseTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Kind of a parse tree node. Children are stored on the [`Node`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIs, EnumTryAs)]
pub enum NodeKind {
    Literal(Literal),
    Identifier(String),
    Relational(RelationalOp),
    Sum(SumOp),
    Product(ProductOp),
    Power,
    Shift(ShiftOp),
    Bitwise(BitwiseOp),
    Logical(LogicalOp),
    Unary(UnaryOp),
    /// `{a, b, c}`
    ArrayConstruct,
    /// `{x = a, y = b}`, one label per child.
    RecordConstruct(Vec<String>),
    /// `{|x = a|}`, one label per child.
    UnionConstruct(Vec<String>),
    /// First child is the function, the remaining ones are the arguments.
    FunctionApplication,
    /// Single child: the body.
    FunctionDefinition(Vec<String>),
    /// Children are the condition, then the two branches.
    Conditional,
}

impl NodeKind {
    pub fn is_leaf(&self) -> bool {
        matches!(self, NodeKind::Literal(_) | NodeKind::Identifier(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Node {
    pub kind: NodeKind,
    pub children: SmallVec<NodeId, 3>,
}

/// A flattened expression.
///
/// ```rust
/// # use hymodel::expr::{ParseTree, NodeId, NodeKind};
/// let tree = ParseTree::parse("a + 2 * b").unwrap();
/// assert_eq!(tree.len(), 5);
/// assert!(tree.node(NodeId::ROOT).kind.is_sum());
/// assert_eq!(tree.to_string(), "(a + (2 * b))");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParseTree {
    source: String,
    nodes: Vec<Node>,
}

impl ParseTree {
    /// Parse `source` into a tree.
    pub fn parse(source: &str) -> ModelResult<Self> {
        parser::parse_expression(source).map(|expr| Self::from_expr(source, &expr))
    }

    /// Flatten an expression in pre-order.
    pub fn from_expr(source: impl Into<String>, expr: &Expr) -> Self {
        let mut tree = Self {
            source: source.into(),
            nodes: Vec::new(),
        };
        tree.push(expr);
        tree
    }

    fn push(&mut self, expr: &Expr) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let (kind, children): (NodeKind, Vec<&Expr>) = match expr {
            Expr::Literal(literal) => (NodeKind::Literal(literal.clone()), vec![]),
            Expr::Identifier(name) => (NodeKind::Identifier(name.clone()), vec![]),
            Expr::Binary { op, lhs, rhs } => {
                let kind = match op {
                    BinaryOp::Relational(op) => NodeKind::Relational(*op),
                    BinaryOp::Sum(op) => NodeKind::Sum(*op),
                    BinaryOp::Product(op) => NodeKind::Product(*op),
                    BinaryOp::Power => NodeKind::Power,
                    BinaryOp::Shift(op) => NodeKind::Shift(*op),
                    BinaryOp::Bitwise(op) => NodeKind::Bitwise(*op),
                    BinaryOp::Logical(op) => NodeKind::Logical(*op),
                };
                (kind, vec![lhs.as_ref(), rhs.as_ref()])
            }
            Expr::Unary { op, operand } => (NodeKind::Unary(*op), vec![operand.as_ref()]),
            Expr::Array(elements) => (NodeKind::ArrayConstruct, elements.iter().collect()),
            Expr::Record(fields) => (
                NodeKind::RecordConstruct(fields.iter().map(|(l, _)| l.clone()).collect()),
                fields.iter().map(|(_, e)| e).collect(),
            ),
            Expr::Union(fields) => (
                NodeKind::UnionConstruct(fields.iter().map(|(l, _)| l.clone()).collect()),
                fields.iter().map(|(_, e)| e).collect(),
            ),
            Expr::Apply {
                function,
                arguments,
            } => (
                NodeKind::FunctionApplication,
                std::iter::once(function.as_ref())
                    .chain(arguments.iter())
                    .collect(),
            ),
            Expr::FunctionDefinition { parameters, body } => (
                NodeKind::FunctionDefinition(parameters.clone()),
                vec![body.as_ref()],
            ),
            Expr::Conditional {
                condition,
                then,
                otherwise,
            } => (
                NodeKind::Conditional,
                vec![condition.as_ref(), then.as_ref(), otherwise.as_ref()],
            ),
        };

        self.nodes.push(Node {
            kind,
            children: SmallVec::new(),
        });
        for child in children {
            let child_id = self.push(child);
            self.nodes[id.index()].children.push(child_id);
        }
        id
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// # Panics
    /// Panics if `id` does not belong to this tree.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in pre-order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeId(i as u32), node))
    }

    /// Names of every identifier leaf, in pre-order, without duplicates.
    pub fn identifiers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for node in self.nodes.iter() {
            if let NodeKind::Identifier(name) = &node.kind {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Render the subtree rooted at `id`, fully parenthesized.
    pub fn fmt_node(&self, id: NodeId) -> impl Display + '_ {
        struct NodeFmt<'a> {
            tree: &'a ParseTree,
            id: NodeId,
        }

        impl Display for NodeFmt<'_> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let node = self.tree.node(self.id);
                let child = |i: usize| self.tree.fmt_node(node.children[i]);
                let list = |labels: Option<&Vec<String>>, skip: usize| {
                    node.children
                        .iter()
                        .skip(skip)
                        .enumerate()
                        .map(|(i, c)| match labels {
                            Some(labels) => format!("{} = {}", labels[i], self.tree.fmt_node(*c)),
                            None => self.tree.fmt_node(*c).to_string(),
                        })
                        .collect::<Vec<_>>()
                        .join(", ")
                };

                match &node.kind {
                    NodeKind::Literal(literal) => write!(f, "{}", literal),
                    NodeKind::Identifier(name) => f.write_str(name),
                    NodeKind::Relational(op) => {
                        write!(f, "({} {} {})", child(0), BinaryOp::Relational(*op).symbol(), child(1))
                    }
                    NodeKind::Sum(op) => {
                        write!(f, "({} {} {})", child(0), BinaryOp::Sum(*op).symbol(), child(1))
                    }
                    NodeKind::Product(op) => {
                        write!(f, "({} {} {})", child(0), BinaryOp::Product(*op).symbol(), child(1))
                    }
                    NodeKind::Power => write!(f, "({} ^ {})", child(0), child(1)),
                    NodeKind::Shift(op) => {
                        write!(f, "({} {} {})", child(0), BinaryOp::Shift(*op).symbol(), child(1))
                    }
                    NodeKind::Bitwise(op) => {
                        write!(f, "({} {} {})", child(0), BinaryOp::Bitwise(*op).symbol(), child(1))
                    }
                    NodeKind::Logical(op) => {
                        write!(f, "({} {} {})", child(0), BinaryOp::Logical(*op).symbol(), child(1))
                    }
                    NodeKind::Unary(op) => {
                        let symbol = match op {
                            UnaryOp::Neg => "-",
                            UnaryOp::Not => "!",
                            UnaryOp::BitNot => "~",
                        };
                        write!(f, "{}{}", symbol, child(0))
                    }
                    NodeKind::ArrayConstruct => write!(f, "{{{}}}", list(None, 0)),
                    NodeKind::RecordConstruct(labels) => {
                        write!(f, "{{{}}}", list(Some(labels), 0))
                    }
                    NodeKind::UnionConstruct(labels) => {
                        write!(f, "{{|{}|}}", list(Some(labels), 0))
                    }
                    NodeKind::FunctionApplication => write!(f, "{}({})", child(0), list(None, 1)),
                    NodeKind::FunctionDefinition(parameters) => {
                        write!(f, "function({}) {}", parameters.join(", "), child(0))
                    }
                    NodeKind::Conditional => {
                        write!(f, "({} ? {} : {})", child(0), child(1), child(2))
                    }
                }
            }
        }

        NodeFmt { tree: self, id }
    }
}

impl Display for ParseTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.nodes.is_empty() {
            return Ok(());
        }
        self.fmt_node(NodeId::ROOT).fmt(f)
    }
}

/// `target = expression`, as found in state machine action lists.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Assignment {
    pub target: String,
    pub expression: ParseTree,
}

/// Parse a `;` separated list of assignments such as `out = x + 1; count = 0`.
///
/// ```rust
/// # use hymodel::expr::parse_assignments;
/// let actions = parse_assignments("out = x + 1; n = {a = 1}").unwrap();
/// assert_eq!(actions.len(), 2);
/// assert_eq!(actions[1].target, "n");
/// assert_eq!(actions[1].expression.to_string(), "{a = 1}");
/// assert!(parse_assignments("").unwrap().is_empty());
/// ```
pub fn parse_assignments(source: &str) -> ModelResult<Vec<Assignment>> {
    Ok(parser::parse_assignment_list(source)?
        .into_iter()
        .map(|(target, expr)| Assignment {
            target,
            expression: ParseTree::from_expr(source, &expr),
        })
        .collect())
}
