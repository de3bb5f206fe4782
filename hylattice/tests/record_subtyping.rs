use hylattice::{
    cpo::{Cpo, CpoRelation},
    element::Property,
    record::RecordProperty,
    registry::builtin,
};

fn labels(property: &Property) -> Vec<String> {
    match property {
        Property::Record(record) => record.labels().map(str::to_string).collect(),
        Property::Atom(_) => panic!("expected a record"),
    }
}

#[test]
fn glb_unions_and_lub_intersects_labels() {
    let lattice = builtin::dimension().unwrap();
    let time = lattice.element("TIME").unwrap();
    let position = lattice.element("POSITION").unwrap();

    let r1 = Property::from(RecordProperty::new([("a", time.clone()), ("b", time.clone())]));
    let r2 = Property::from(RecordProperty::new([
        ("b", position.clone()),
        ("c", position.clone()),
    ]));

    let glb = lattice.greatest_lower_bound(&r1, &r2).unwrap();
    assert_eq!(labels(&glb), vec!["a", "b", "c"]);
    assert_eq!(
        glb.fmt(&lattice).to_string(),
        "{a = TIME, b = UNKNOWN, c = POSITION}"
    );

    let lub = lattice.least_upper_bound(&r1, &r2).unwrap();
    assert_eq!(labels(&lub), vec!["b"]);
    assert_eq!(lub.fmt(&lattice).to_string(), "{b = CONFLICT}");

    assert_eq!(lattice.greatest_lower_bound(&r1, &r1).unwrap(), r1);
    assert_eq!(lattice.least_upper_bound(&r2, &r2).unwrap(), r2);
}

#[test]
fn more_fields_is_lower() {
    let lattice = builtin::logical_and().unwrap();
    let t = lattice.element("TRUE").unwrap();
    let f = lattice.element("FALSE").unwrap();

    let wide = Property::from(RecordProperty::new([("a", t.clone()), ("b", t.clone())]));
    let narrow = Property::from(RecordProperty::new([("a", f.clone())]));
    let other = Property::from(RecordProperty::new([("c", t.clone())]));

    assert_eq!(lattice.compare(&wide, &narrow), Ok(CpoRelation::Lower));
    assert_eq!(lattice.compare(&narrow, &wide), Ok(CpoRelation::Higher));
    assert_eq!(
        lattice.compare(&narrow, &other),
        Ok(CpoRelation::Incomparable)
    );

    // shared field going the other way breaks the subtyping
    let wide_false = Property::from(RecordProperty::new([("a", f), ("b", t.clone())]));
    let narrow_true = Property::from(RecordProperty::new([("a", t)]));
    assert_eq!(
        lattice.compare(&wide_false, &narrow_true),
        Ok(CpoRelation::Incomparable)
    );
}

#[test]
fn nested_records_compare_recursively() {
    let lattice = builtin::logical_and().unwrap();
    let t = lattice.element("TRUE").unwrap();
    let f = lattice.element("FALSE").unwrap();

    let inner_low = Property::from(RecordProperty::new([("x", t.clone()), ("y", t)]));
    let inner_high = Property::from(RecordProperty::new([("x", f)]));
    let low = Property::from(RecordProperty::new([("r", inner_low)]));
    let high = Property::from(RecordProperty::new([("r", inner_high)]));

    assert_eq!(lattice.compare(&low, &high), Ok(CpoRelation::Lower));
    assert_eq!(low.depth(), 2);
    assert_eq!(lattice.least_upper_bound(&low, &high), Ok(high.clone()));
}
