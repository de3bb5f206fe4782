//! Constraint policies.
//!
//! A policy string such as `"sink >= src"` or `"out == meet(in1, in2, ...)"` is
//! classified into a [`ConstraintType`]. The classification only looks for a few
//! markers in the string:
//!
//! | string                     | type                                  |
//! |----------------------------|---------------------------------------|
//! | `NONE`                     | [`ConstraintType::None`]              |
//! | contains `meet`            | `SrcEqualsMeet` when the string starts with `src`, `in` or `child`, `SinkEqualsMeet` otherwise |
//! | contains `==`              | [`ConstraintType::Equals`]            |
//! | contains `!=`              | rejected                              |
//! | anything else              | `SinkLess` when the string starts with `src`, `in` or `child`, `SrcLess` otherwise |
use enum_map::{Enum, EnumMap};
use hylattice::inequality::Inequality;
use hymodel::model::EntityId;
use strum::{EnumIs, EnumIter};

use crate::utils::error::{PropError, PropResult};

/// Shape of the constraints generated between a sink and its sources.
///
/// For actors the outputs are the sinks and the inputs the sources, for
/// connections the receiving port is the sink, for expressions the parent node
/// is the sink of its children.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, EnumIs)]
pub enum ConstraintType {
    /// `sink >= src`
    #[default]
    SrcLess,
    /// `src >= sink`
    SinkLess,
    /// `sink == src`
    Equals,
    /// `src == meet(sink1, sink2, ...)`
    SrcEqualsMeet,
    /// `sink == meet(src1, src2, ...)`
    SinkEqualsMeet,
    /// No constraint.
    None,
}

impl ConstraintType {
    pub fn from_policy_str(policy: &str) -> PropResult<Self> {
        let is_src =
            policy.starts_with("src") || policy.starts_with("in") || policy.starts_with("child");

        if policy == "NONE" {
            return Ok(ConstraintType::None);
        }
        if policy.contains("meet") {
            return Ok(if is_src {
                ConstraintType::SrcEqualsMeet
            } else {
                ConstraintType::SinkEqualsMeet
            });
        }
        if policy.contains("==") {
            return Ok(ConstraintType::Equals);
        }
        if policy.contains("!=") {
            return Err(PropError::InvalidConstraintType {
                policy: policy.to_string(),
                reason: "disequality constraints cannot be expressed as inequalities",
            });
        }
        if policy.trim().is_empty() {
            return Err(PropError::InvalidConstraintType {
                policy: policy.to_string(),
                reason: "the policy is empty",
            });
        }
        Ok(if is_src {
            ConstraintType::SinkLess
        } else {
            ConstraintType::SrcLess
        })
    }

    /// Whether constraints are generated from the point of view of the source,
    /// which is then equated to the meet of all its sinks.
    pub fn is_source_oriented(self) -> bool {
        self.is_src_equals_meet()
    }
}

/// Where a constraint type applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum)]
pub enum ConstraintCategory {
    /// Inputs against outputs of atomic actors.
    Actor,
    /// Links between sibling entities.
    Connection,
    /// Links between a composite boundary port and the entities it contains.
    CompositeConnection,
    /// State machine outputs against the expressions written to them.
    Fsm,
    /// Expression nodes against their children.
    ExpressionAstNode,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintPolicy {
    types: EnumMap<ConstraintCategory, ConstraintType>,
}

impl ConstraintPolicy {
    pub fn get(&self, category: ConstraintCategory) -> ConstraintType {
        self.types[category]
    }

    pub fn set(&mut self, category: ConstraintCategory, ty: ConstraintType) {
        self.types[category] = ty;
    }

    /// Copy of this policy with a different actor constraint type.
    pub fn with_actor(&self, ty: ConstraintType) -> Self {
        let mut policy = self.clone();
        policy.set(ConstraintCategory::Actor, ty);
        policy
    }
}

/// Which part of a helper produced a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Enum, EnumIs, EnumIter)]
pub enum ConstraintFamily {
    /// Inputs against outputs of an atomic actor.
    Default,
    /// Mined from an attribute or a guard expression.
    Ast,
    /// Between ports of different entities.
    Interconnect,
    /// Between the ports of a composite and the entities it contains.
    Boundary,
    /// State machine destinations against their writers.
    Fsm,
    /// From constraint annotations or explicit `set_at_least` / `set_same_as`.
    Annotation,
}

impl ConstraintFamily {
    pub fn name(self) -> &'static str {
        match self {
            ConstraintFamily::Default => "default",
            ConstraintFamily::Ast => "ast",
            ConstraintFamily::Interconnect => "interconnect",
            ConstraintFamily::Boundary => "boundary",
            ConstraintFamily::Fsm => "fsm",
            ConstraintFamily::Annotation => "annotation",
        }
    }
}

/// Helper kinds, as reported in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIs)]
pub enum HelperKind {
    Atomic,
    Composite,
    Fsm,
    /// Constraints added through the solver API.
    Solver,
}

impl HelperKind {
    pub fn name(self) -> &'static str {
        match self {
            HelperKind::Atomic => "AtomicHelper",
            HelperKind::Composite => "CompositeHelper",
            HelperKind::Fsm => "FSMHelper",
            HelperKind::Solver => "Solver",
        }
    }
}

/// Provenance of an inequality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Origin {
    pub entity: EntityId,
    pub helper: HelperKind,
    pub family: ConstraintFamily,
}

pub type PropInequality = Inequality<Origin>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classic_policy_strings() {
        let cases = [
            ("out >= in", ConstraintType::SrcLess),
            ("in >= out", ConstraintType::SinkLess),
            ("out == in", ConstraintType::Equals),
            ("out == meet(in1, in2, ...)", ConstraintType::SinkEqualsMeet),
            ("in == meet(out1, out2, ...)", ConstraintType::SrcEqualsMeet),
            ("sink >= src", ConstraintType::SrcLess),
            ("src >= sink", ConstraintType::SinkLess),
            ("sink == src", ConstraintType::Equals),
            ("src == meet(sink1, sink2, ...)", ConstraintType::SrcEqualsMeet),
            ("sink == meet(src1, src2, ...)", ConstraintType::SinkEqualsMeet),
            ("parent >= child", ConstraintType::SrcLess),
            ("child >= parent", ConstraintType::SinkLess),
            ("parent == meet(child1, child2, ...)", ConstraintType::SinkEqualsMeet),
            ("NONE", ConstraintType::None),
        ];
        for (text, expected) in cases {
            assert_eq!(ConstraintType::from_policy_str(text).unwrap(), expected, "{text}");
        }
    }

    #[test]
    fn malformed_policy_strings() {
        assert!(
            ConstraintType::from_policy_str("out != in")
                .unwrap_err()
                .is_invalid_constraint_type()
        );
        assert!(ConstraintType::from_policy_str("  ").is_err());
        // Only the exact marker selects `None`.
        assert_eq!(
            ConstraintType::from_policy_str("none").unwrap(),
            ConstraintType::SrcLess
        );
    }

    #[test]
    fn entity_override_only_touches_actors() {
        let mut policy = ConstraintPolicy::default();
        policy.set(ConstraintCategory::Connection, ConstraintType::Equals);
        let overridden = policy.with_actor(ConstraintType::SinkEqualsMeet);
        assert_eq!(
            overridden.get(ConstraintCategory::Actor),
            ConstraintType::SinkEqualsMeet
        );
        assert_eq!(
            overridden.get(ConstraintCategory::Connection),
            ConstraintType::Equals
        );
    }
}
