use std::sync::Arc;

use hylattice::{element::Property, record::RecordProperty, registry::LatticeRegistry};
use hymodel::{
    manifest::{ModelManifest, resolve_object},
    model::{Model, ModelObject},
};
use hyprop::{
    PropError,
    solver::{PropertyConstraintSolver, SolverAction},
    utils::conf::SolverConfig,
};

const PIPE: &str = r#"
[model]
name = "top"

[[model.entities]]
name = "a"
ports = [{ name = "out", output = true }]

[[model.entities]]
name = "b"
ports = [{ name = "in", input = true }]

[[model.relations]]
name = "r"
ports = ["a.out", "b.in"]
"#;

const MEET: &str = r#"
[model]
name = "top"

[[model.entities]]
name = "s1"
ports = [{ name = "out", output = true }]

[[model.entities]]
name = "s2"
ports = [{ name = "out", output = true }]

[[model.entities]]
name = "m"
constraint_policy = "out == meet(in1, in2, ...)"
ports = [
    { name = "in1", input = true },
    { name = "in2", input = true },
    { name = "out", output = true },
]

[[model.entities]]
name = "k"
ports = [{ name = "in", input = true }]

[[model.relations]]
name = "r1"
ports = ["s1.out", "m.in1"]

[[model.relations]]
name = "r2"
ports = ["s2.out", "m.in2"]

[[model.relations]]
name = "r3"
ports = ["m.out", "k.in"]
"#;

fn build(source: &str) -> Model {
    source
        .parse::<ModelManifest>()
        .expect("valid manifest")
        .build()
        .expect("model builds")
}

fn object(model: &Model, path: &str) -> ModelObject {
    resolve_object(model, model.toplevel(), path).expect("object exists")
}

fn solver(lattice: &str) -> PropertyConstraintSolver {
    let config = SolverConfig {
        lattice: lattice.to_string(),
        action: SolverAction::Annotate,
        ..Default::default()
    };
    PropertyConstraintSolver::new(Arc::new(LatticeRegistry::with_builtins()), config)
        .expect("default policies are valid")
}

fn element(solver: &mut PropertyConstraintSolver, name: &str) -> Property {
    solver.lattice().unwrap().element(name).unwrap()
}

#[test]
fn incomparable_fixed_ports_conflict_once() {
    let mut model = build(PIPE);
    let mut solver = solver("dimension");
    let time = element(&mut solver, "TIME");
    let position = element(&mut solver, "POSITION");
    solver.declare(object(&model, "a.out"), time);
    solver.declare(object(&model, "b.in"), position);

    let err = solver.resolve_properties(&mut model).unwrap_err();
    let PropError::StructuralConflict { conflicts } = err else {
        panic!("expected a structural conflict, got {err:?}");
    };
    assert_eq!(conflicts.len(), 1);
    assert!(conflicts[0].starts_with("top.a.out <= top.b.in"), "{}", conflicts[0]);
    assert!(conflicts[0].contains("interconnect"), "{}", conflicts[0]);
    assert!(conflicts[0].contains("`TIME` is not below `POSITION`"));

    // Nothing is persisted on failure.
    assert_eq!(model.annotations("dimension").count(), 0);
}

#[test]
fn output_equal_to_meet_of_incomparable_inputs_conflicts() {
    let mut model = build(MEET);
    let mut solver = solver("dimension");
    let time = element(&mut solver, "TIME");
    let position = element(&mut solver, "POSITION");
    solver.declare(object(&model, "m.in1"), time.clone());
    solver.declare(object(&model, "m.in2"), position);
    solver.declare(object(&model, "m.out"), time);

    let err = solver.resolve_properties(&mut model).unwrap_err();
    let PropError::StructuralConflict { conflicts } = err else {
        panic!("expected a structural conflict, got {err:?}");
    };
    assert_eq!(conflicts.len(), 1);
    assert!(
        conflicts[0].contains("top.m.out <= meet(top.m.in1, top.m.in2)"),
        "{}",
        conflicts[0]
    );
    assert!(conflicts[0].contains("`TIME` is not below `UNKNOWN`"));
}

#[test]
fn output_follows_the_meet_of_its_inputs() {
    let mut model = build(MEET);
    let mut solver = solver("dimension");
    let time = element(&mut solver, "TIME");
    solver.declare(object(&model, "s1.out"), time.clone());
    solver.declare(object(&model, "s2.out"), time);

    let resolution = solver.resolve_properties(&mut model).unwrap();
    assert_eq!(resolution.property(object(&model, "m.out")), Some("TIME"));
    assert_eq!(resolution.property(object(&model, "k.in")), Some("TIME"));
}

#[test]
fn recursive_record_diverges() {
    let mut model = build(
        r#"
        [model]
        name = "top"
        attributes = [{ name = "p", expression = "{a = p}" }]
        "#,
    );
    let mut solver = solver("logicalAND");

    let err = solver.resolve_properties(&mut model).unwrap_err();
    assert!(err.is_structure_divergence(), "{err}");
}

#[test]
fn value_outside_the_declared_shape_conflicts() {
    let mut model = build(PIPE);
    let mut solver = solver("dimension");
    let time = element(&mut solver, "TIME");
    let unknown = element(&mut solver, "UNKNOWN");
    solver.declare(object(&model, "a.out"), time);
    solver.declare(
        object(&model, "b.in"),
        Property::from(RecordProperty::new([("x", unknown)])),
    );

    let err = solver.resolve_properties(&mut model).unwrap_err();
    assert!(err.is_value_conflict(), "{err}");
}

#[test]
fn unacceptable_values_are_reported() {
    let mut model = build(
        r#"
        [model]
        name = "top"

        [[model.entities]]
        name = "a"
        ports = [{ name = "out", output = true }]

        [[model.entities]]
        name = "c"
        ports = [{ name = "out", output = true }]

        [[model.entities]]
        name = "b"
        ports = [{ name = "in", input = true, multiport = true }]

        [[model.relations]]
        name = "r"
        ports = ["a.out", "c.out", "b.in"]
        "#,
    );
    let mut solver = solver("dimension");
    let time = element(&mut solver, "TIME");
    let position = element(&mut solver, "POSITION");
    solver.declare(object(&model, "a.out"), time);
    solver.declare(object(&model, "c.out"), position);

    let err = solver.resolve_properties(&mut model).unwrap_err();
    let PropError::UnacceptableResolution { offenders } = err else {
        panic!("expected unacceptable values, got {err:?}");
    };
    assert_eq!(offenders, vec!["top.b.in resolves to `CONFLICT`".to_string()]);
}

#[test]
fn unsupported_constructs_abort() {
    let mut model = build(
        r#"
        [model]
        name = "top"
        attributes = [{ name = "u", expression = "{|a = 1|}" }]
        "#,
    );
    let err = solver("staticDynamic")
        .resolve_properties(&mut model)
        .unwrap_err();
    assert!(err.is_unsupported_construct(), "{err}");

    let mut model = build(
        r#"
        [model]
        name = "top"
        attributes = [{ name = "c", expression = "TRUE != FALSE", role = "constraint" }]
        "#,
    );
    let err = solver("logicalAND")
        .resolve_properties(&mut model)
        .unwrap_err();
    assert!(err.is_unsupported_construct(), "{err}");
}

#[test]
fn unknown_lattice_and_bad_policies() {
    let mut model = build(PIPE);
    let err = solver("nope").resolve_properties(&mut model).unwrap_err();
    assert!(err.is_unknown_lattice());

    let config = SolverConfig {
        actor_constraint_type: "out != in".to_string(),
        ..Default::default()
    };
    let err = PropertyConstraintSolver::new(Arc::new(LatticeRegistry::with_builtins()), config)
        .err()
        .unwrap();
    assert!(err.is_invalid_constraint_type());

    // An entity override is checked when the solve starts.
    let mut model = build(&PIPE.replace(
        "name = \"b\"\n",
        "name = \"b\"\nconstraint_policy = \"\"\n",
    ));
    let err = solver("logicalAND")
        .resolve_properties(&mut model)
        .unwrap_err();
    assert!(err.is_invalid_constraint_type());
}
