//! The property constraint solver.
//!
//! [`PropertyConstraintSolver::resolve_properties`] runs one resolution over a
//! model:
//!
//! 1. look the lattice up in the registry and create the helper of every entity,
//! 2. start from fresh terms, declared from the explicit declarations (and the
//!    persisted annotations in manual annotation mode),
//! 3. install the constraint policy on the helper tree,
//! 4. collect every constraint in one traversal,
//! 5. solve for the configured fixed point,
//! 6. classify the inequalities,
//! 7. report conflicts, then unacceptable values, or commit the resolution.
//!
//! What happens around solving depends on the [`SolverAction`].
use std::{
    collections::BTreeMap,
    fmt::{Display, Write as _},
    fs::OpenOptions,
    io::Write as _,
    path::{Path, PathBuf},
    sync::Arc,
};

use either::Either;
use hylattice::{
    LatticeError,
    element::Property,
    inequality::Inequality,
    lattice::PropertyLattice,
    record::RecordProperty,
    registry::LatticeRegistry,
    solver::{InequalitySolver, SolveReport},
    term::{TermId, TermStore},
};
use hymodel::{
    expr::{NodeId, NodeKind, ParseTree},
    model::{Model, ModelObject},
};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use strum::{EnumIs, EnumString};

use crate::{
    constraint::{ConstraintFamily, ConstraintPolicy, HelperKind, Origin, PropInequality},
    effectiveness::Effectiveness,
    helper::{HelperContext, HelperStore},
    magic::CONSTRAINT_LOG_EXTENSION,
    manager::PropertyTermManager,
    stats::SolverStatistics,
    utils::{
        conf::SolverConfig,
        error::{PropError, PropResult},
    },
};

/// What a call to [`PropertyConstraintSolver::resolve_properties`] does.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, EnumIs, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SolverAction {
    /// Solve and persist the resolved properties on the model.
    #[default]
    Annotate,
    /// Solve and persist, as a reference for later `Test` runs.
    Training,
    /// Solve and compare against the persisted properties.
    Test,
    /// Remove the persisted properties of the lattice.
    Clear,
    /// Report the persisted properties without solving.
    View,
    /// Build the constraints without solving them.
    CollectConstraints,
    /// Build the constraints and initialize every term, without solving.
    InitializeSolver,
}

/// Resolved (or persisted) property of one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyEntry {
    pub object: ModelObject,
    pub name: String,
    pub property: String,
}

/// An object whose resolved property differs from the persisted one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub object: ModelObject,
    pub name: String,
    pub previous: Option<String>,
    pub current: String,
}

/// Outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub lattice: String,
    pub action: SolverAction,
    pub entries: Vec<PropertyEntry>,
    pub changes: Vec<Change>,
    pub statistics: SolverStatistics,
    /// Absent when the action does not solve.
    pub report: Option<SolveReport>,
}

impl Resolution {
    fn empty(lattice: &str, action: SolverAction) -> Self {
        Self {
            lattice: lattice.to_string(),
            action,
            entries: Vec::new(),
            changes: Vec::new(),
            statistics: SolverStatistics::default(),
            report: None,
        }
    }

    /// Rendered property of `object`, if it took part in the resolution.
    pub fn property(&self, object: impl Into<ModelObject>) -> Option<&str> {
        let object = object.into();
        self.entries
            .iter()
            .find(|entry| entry.object == object)
            .map(|entry| entry.property.as_str())
    }
}

impl Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{:?} in lattice `{}`:", self.action, self.lattice)?;
        for entry in self.entries.iter() {
            writeln!(f, "  {} = {}", entry.name, entry.property)?;
        }
        if !self.changes.is_empty() {
            writeln!(f, "{} change(s):", self.changes.len())?;
            for change in self.changes.iter() {
                writeln!(
                    f,
                    "  {}: {} -> {}",
                    change.name,
                    change.previous.as_deref().unwrap_or("<none>"),
                    change.current
                )?;
            }
        }
        write!(f, "{}", self.statistics)
    }
}

/// Parse a rendered property such as `TRUE` or `{a = TIME, b = {c = UNKNOWN}}`.
pub fn parse_property(lattice: &PropertyLattice, text: &str) -> PropResult<Property> {
    fn convert(lattice: &PropertyLattice, tree: &ParseTree, id: NodeId) -> PropResult<Property> {
        let node = tree.node(id);
        match &node.kind {
            NodeKind::Identifier(name) => Ok(lattice.element(name)?),
            NodeKind::RecordConstruct(labels) => {
                let mut fields = Vec::with_capacity(labels.len());
                for (label, child) in labels.iter().zip(node.children.iter()) {
                    fields.push((label.clone(), convert(lattice, tree, *child)?));
                }
                Ok(Property::Record(RecordProperty::new(fields)))
            }
            // `{}` is how an empty record renders; the grammar reads it as an array.
            NodeKind::ArrayConstruct if node.children.is_empty() => {
                Ok(Property::Record(RecordProperty::default()))
            }
            _ => Err(PropError::UnsupportedConstruct {
                construct: "a property annotation".to_string(),
                expression: tree.fmt_node(id).to_string(),
            }),
        }
    }

    let tree = ParseTree::parse(text)?;
    convert(lattice, &tree, tree.root())
}

pub struct PropertyConstraintSolver {
    registry: Arc<LatticeRegistry>,
    config: SolverConfig,
    policy: ConstraintPolicy,
    lattice: Option<Arc<PropertyLattice>>,
    helpers: HelperStore,
    declarations: BTreeMap<ModelObject, Property>,
    /// `(lesser, greater)` pairs added through [`Self::set_at_least`].
    user_constraints: Vec<(ModelObject, ModelObject)>,
}

impl PropertyConstraintSolver {
    /// A solver over the lattices of `registry`. The lattices described by the
    /// configuration are registered first.
    pub fn new(registry: Arc<LatticeRegistry>, config: SolverConfig) -> PropResult<Self> {
        let policy = config.policy()?;
        for description in config.lattices.iter() {
            registry.register_description(description.clone());
        }
        Ok(Self {
            registry,
            config,
            policy,
            lattice: None,
            helpers: HelperStore::new(),
            declarations: BTreeMap::new(),
            user_constraints: Vec::new(),
        })
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<LatticeRegistry> {
        &self.registry
    }

    pub fn set_lattice(&mut self, name: impl Into<String>) {
        let name = name.into();
        if name != self.config.lattice {
            self.config.lattice = name;
            self.lattice = None;
            self.helpers.clear();
        }
    }

    pub fn set_action(&mut self, action: SolverAction) {
        self.config.action = action;
    }

    /// Declare the property of an object. A constant property fixes it, a
    /// property with unknown parts constrains its shape.
    pub fn declare(&mut self, object: impl Into<ModelObject>, property: Property) {
        self.declarations.insert(object.into(), property);
    }

    /// Require `lesser <= greater`.
    pub fn set_at_least(&mut self, greater: impl Into<ModelObject>, lesser: impl Into<ModelObject>) {
        self.user_constraints.push((lesser.into(), greater.into()));
    }

    pub fn set_same_as(&mut self, a: impl Into<ModelObject>, b: impl Into<ModelObject>) {
        let (a, b) = (a.into(), b.into());
        self.user_constraints.push((a, b));
        self.user_constraints.push((b, a));
    }

    /// The lattice in use, looked up on first use and after every lattice change.
    pub fn lattice(&mut self) -> PropResult<Arc<PropertyLattice>> {
        if let Some(lattice) = &self.lattice {
            return Ok(Arc::clone(lattice));
        }

        let lattice = self
            .registry
            .get(&self.config.lattice)
            .map_err(|err| match err {
                LatticeError::UnknownLattice { name, known } => {
                    PropError::UnknownLattice { name, known }
                }
                other => other.into(),
            })?;
        debug!("Using lattice `{}`", lattice.name());
        self.helpers.clear();
        self.lattice = Some(Arc::clone(&lattice));
        Ok(lattice)
    }

    /// Resolve the properties of every object of `model`.
    pub fn resolve_properties(&mut self, model: &mut Model) -> PropResult<Resolution> {
        let lattice = self.lattice()?;
        let action = self.config.action;
        info!(
            "{:?} `{}` in lattice `{}`",
            action,
            model.name(),
            lattice.name()
        );

        let result = match action {
            SolverAction::View => Ok(self.view(model, &lattice)),
            SolverAction::Clear => {
                let removed = model.clear_annotations(lattice.name());
                info!(
                    "Removed {} annotation(s) of lattice `{}`",
                    removed,
                    lattice.name()
                );
                Ok(Resolution::empty(lattice.name(), action))
            }
            _ => self.solve(model, &lattice),
        };
        self.helpers.clear();
        result
    }

    /// Every constraint of `model`, one tab-separated line per inequality.
    pub fn constraint_log(&mut self, model: &Model) -> PropResult<String> {
        let lattice = self.lattice()?;
        let (manager, constraints) = self.collect(model, &lattice)?;
        self.helpers.clear();
        Ok(render_constraints(model, &manager, &constraints))
    }

    fn view(&self, model: &Model, lattice: &PropertyLattice) -> Resolution {
        let mut resolution = Resolution::empty(lattice.name(), SolverAction::View);
        resolution.entries = model
            .annotations(lattice.name())
            .map(|(object, property)| PropertyEntry {
                object,
                name: model.object_full_name(object),
                property: property.to_string(),
            })
            .collect();
        resolution.statistics.resolved = resolution.entries.len();
        resolution
    }

    /// Annotations fed back as declarations.
    fn persisted<'m>(
        &self,
        model: &'m Model,
        lattice: &'m PropertyLattice,
    ) -> impl Iterator<Item = (ModelObject, &'m str)> + 'm {
        if self.config.manual_annotation {
            Either::Left(model.annotations(lattice.name()))
        } else {
            Either::Right(std::iter::empty())
        }
    }

    /// Steps 1 to 4: terms and constraints of the whole model.
    fn collect(
        &mut self,
        model: &Model,
        lattice: &Arc<PropertyLattice>,
    ) -> PropResult<(PropertyTermManager, Vec<PropInequality>)> {
        let mut declarations = BTreeMap::new();
        for (object, text) in self.persisted(model, lattice) {
            declarations.insert(object, parse_property(lattice, text)?);
        }
        declarations.extend(self.declarations.clone());
        let mut manager = PropertyTermManager::new(Arc::clone(lattice), declarations);

        let top = model.toplevel();
        self.helpers.get_or_create(model, top);
        self.helpers.propagate_policy(model, top, &self.policy)?;

        let effectiveness = Effectiveness::compute(model)?;
        let mut ctx = HelperContext {
            model,
            manager: &mut manager,
            effectiveness: &effectiveness,
        };
        let mut constraints = self.helpers.collect(top, &mut ctx)?;

        let origin = Origin {
            entity: top,
            helper: HelperKind::Solver,
            family: ConstraintFamily::Annotation,
        };
        for (lesser, greater) in self.user_constraints.iter() {
            let lesser = ctx.object_term(*lesser)?;
            let greater = ctx.object_term(*greater)?;
            constraints.push(Inequality::new(lesser, greater, origin));
        }

        debug!(
            "Collected {} constraint(s) over {} term(s)",
            constraints.len(),
            manager.len()
        );
        Ok((manager, constraints))
    }

    fn solve(&mut self, model: &mut Model, lattice: &Arc<PropertyLattice>) -> PropResult<Resolution> {
        let action = self.config.action;
        let (mut manager, constraints) = self.collect(model, lattice)?;

        let mut statistics = SolverStatistics {
            helpers: self.helpers.len(),
            property_terms: manager.len(),
            ..Default::default()
        };
        statistics.count_constraints(&constraints);

        if action.is_collect_constraints() || action.is_initialize_solver() {
            if action.is_initialize_solver() {
                manager.reinitialize();
            }
            let mut resolution = Resolution::empty(lattice.name(), action);
            resolution.entries = entries(model, &manager);
            statistics.resolved = resolution.entries.len();
            resolution.statistics = statistics;
            return Ok(resolution);
        }

        let log_path = self.log_path(model, lattice);
        if let Some(path) = &log_path {
            write_constraint_log(path, "I", &render_constraints(model, &manager, &constraints), false)?;
        }

        let report = if constraints.is_empty() {
            SolveReport::default()
        } else {
            InequalitySolver::new(lattice.as_ref()).solve(
                manager.arena_mut(),
                &constraints,
                self.config.fixed_point,
            )?
        };

        if let Some(path) = &log_path {
            write_constraint_log(path, "R", &render_constraints(model, &manager, &constraints), true)?;
        }

        let conflicts: Vec<String> = report
            .unsatisfied
            .iter()
            .map(|i| describe_conflict(model, &manager, &constraints[*i]))
            .collect();
        let offenders = unacceptable(model, &manager, &constraints, &report)?;
        statistics.conflicts = conflicts.len();
        statistics.unacceptable = offenders.len();

        let entries = entries(model, &manager);
        statistics.resolved = entries.len();
        info!(
            "Statistics of `{}` in lattice `{}`:\n{}",
            model.name(),
            lattice.name(),
            statistics
        );

        if !conflicts.is_empty() {
            return Err(PropError::StructuralConflict { conflicts });
        }
        if !offenders.is_empty() {
            for offender in offenders.iter() {
                warn!("Unacceptable resolution: {}", offender);
            }
            return Err(PropError::UnacceptableResolution { offenders });
        }

        let changes: Vec<Change> = entries
            .iter()
            .filter_map(|entry| {
                let previous = model.annotation(entry.object, lattice.name());
                (previous != Some(entry.property.as_str())).then(|| Change {
                    object: entry.object,
                    name: entry.name.clone(),
                    previous: previous.map(str::to_string),
                    current: entry.property.clone(),
                })
            })
            .collect();

        match action {
            SolverAction::Annotate | SolverAction::Training => {
                for entry in entries.iter() {
                    model.annotate(entry.object, lattice.name(), entry.property.clone());
                }
                info!(
                    "Persisted {} propert(ies), {} changed",
                    entries.len(),
                    changes.len()
                );
            }
            SolverAction::Test => {
                let mismatches: Vec<String> = changes
                    .iter()
                    .map(|change| match &change.previous {
                        Some(previous) => format!(
                            "{}: trained `{}`, resolved `{}`",
                            change.name, previous, change.current
                        ),
                        None => format!(
                            "{}: no trained property, resolved `{}`",
                            change.name, change.current
                        ),
                    })
                    .collect();
                if !mismatches.is_empty() {
                    return Err(PropError::RegressionMismatch { mismatches });
                }
            }
            _ => {}
        }

        Ok(Resolution {
            lattice: lattice.name().to_string(),
            action,
            entries,
            changes,
            statistics,
            report: Some(report),
        })
    }

    fn log_path(&self, model: &Model, lattice: &PropertyLattice) -> Option<PathBuf> {
        self.config.log_directory.as_ref().map(|directory| {
            directory.join(format!(
                "{}__{}.{}",
                model.name(),
                lattice.name(),
                CONSTRAINT_LOG_EXTENSION
            ))
        })
    }
}

/// Resolved properties of the effective objects, ordered by object.
fn entries(model: &Model, manager: &PropertyTermManager) -> Vec<PropertyEntry> {
    let lattice = manager.lattice();
    manager
        .objects()
        .filter(|(_, term)| manager.is_effective(*term))
        .filter_map(|(object, term)| {
            let value = manager.value(term).ok()?;
            Some(PropertyEntry {
                object,
                name: model.object_full_name(object),
                property: value.fmt(lattice).to_string(),
            })
        })
        .collect()
}

fn render_value(manager: &PropertyTermManager, term: TermId) -> String {
    match manager.value(term) {
        Ok(value) => value.fmt(manager.lattice()).to_string(),
        Err(_) => "<no value>".to_string(),
    }
}

fn describe_conflict(model: &Model, manager: &PropertyTermManager, inequality: &PropInequality) -> String {
    format!(
        "{} <= {} ({} {} constraint of `{}`): `{}` is not below `{}`",
        manager.describe(model, inequality.lesser),
        manager.describe(model, inequality.greater),
        inequality.origin.helper.name(),
        inequality.origin.family.name(),
        model.full_name(inequality.origin.entity),
        render_value(manager, inequality.lesser),
        render_value(manager, inequality.greater)
    )
}

/// Terms of satisfied effective inequalities whose value is not acceptable.
fn unacceptable(
    model: &Model,
    manager: &PropertyTermManager,
    constraints: &[PropInequality],
    report: &SolveReport,
) -> PropResult<Vec<String>> {
    let arena = manager.arena();
    let mut seen: Vec<TermId> = Vec::new();
    let mut offenders = Vec::new();
    for (i, inequality) in constraints.iter().enumerate() {
        if !inequality.is_effective(arena) || report.unsatisfied.contains(&i) {
            continue;
        }
        for term in [inequality.lesser, inequality.greater] {
            if seen.contains(&term) {
                continue;
            }
            seen.push(term);
            if !arena.is_value_acceptable(term)? {
                offenders.push(format!(
                    "{} resolves to `{}`",
                    manager.describe(model, term),
                    render_value(manager, term)
                ));
            }
        }
    }
    Ok(offenders)
}

fn render_constraints(model: &Model, manager: &PropertyTermManager, constraints: &[PropInequality]) -> String {
    let arena = manager.arena();
    let mut out = String::new();
    for inequality in constraints {
        let _ = writeln!(
            out,
            "{}\t{}\t{}\t{}\t<=\t{}\t{}\t{}\t{}",
            inequality.origin.helper.name(),
            model.full_name(inequality.origin.entity),
            inequality.origin.family.name(),
            manager.describe(model, inequality.lesser),
            manager.describe(model, inequality.greater),
            if inequality.is_effective(arena) {
                "effective"
            } else {
                "ineffective"
            },
            render_value(manager, inequality.lesser),
            render_value(manager, inequality.greater)
        );
    }
    out
}

fn write_constraint_log(path: &Path, phase: &str, lines: &str, append: bool) -> PropResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| PropError::io(parent.display(), e))?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(append)
        .truncate(!append)
        .open(path)
        .map_err(|e| PropError::io(path.display(), e))?;
    for line in lines.lines() {
        writeln!(file, "{}\t{}", phase, line).map_err(|e| PropError::io(path.display(), e))?;
    }
    debug!("Wrote constraint log `{}` ({})", path.display(), phase);
    Ok(())
}
