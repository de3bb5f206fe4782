use std::fmt::Display;

use enum_map::EnumMap;
use strum::IntoEnumIterator;

use crate::constraint::{ConstraintFamily, PropInequality};

/// Counters describing one resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolverStatistics {
    pub helpers: usize,
    pub property_terms: usize,
    pub constraints: EnumMap<ConstraintFamily, usize>,
    /// Model objects holding a resolved property.
    pub resolved: usize,
    pub conflicts: usize,
    pub unacceptable: usize,
}

impl SolverStatistics {
    pub(crate) fn count_constraints(&mut self, constraints: &[PropInequality]) {
        self.constraints = EnumMap::default();
        for constraint in constraints {
            self.constraints[constraint.origin.family] += 1;
        }
    }

    pub fn total_constraints(&self) -> usize {
        self.constraints.values().sum()
    }
}

impl Display for SolverStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "helpers: {}", self.helpers)?;
        writeln!(f, "property terms: {}", self.property_terms)?;
        writeln!(f, "constraints: {}", self.total_constraints())?;
        for family in ConstraintFamily::iter() {
            writeln!(f, "  {}: {}", family.name(), self.constraints[family])?;
        }
        writeln!(f, "resolved properties: {}", self.resolved)?;
        writeln!(f, "conflicts: {}", self.conflicts)?;
        write!(f, "unacceptable values: {}", self.unacceptable)
    }
}
