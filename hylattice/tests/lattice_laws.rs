use hylattice::{
    cpo::{Cpo, CpoRelation},
    element::Property,
    lattice::PropertyLattice,
    record::RecordProperty,
    registry::LatticeRegistry,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

const SAMPLES: usize = 500;

fn random_property(lattice: &PropertyLattice, rng: &mut impl Rng, budget: usize) -> Property {
    if budget == 0 || rng.random_bool(0.6) {
        let index = rng.random_range(0..lattice.len());
        let atom = lattice.atoms().nth(index).expect("index in range");
        return Property::Atom(atom);
    }

    let mut fields = Vec::new();
    for label in ["a", "b", "c"] {
        if rng.random_bool(0.5) {
            fields.push((label, random_property(lattice, rng, budget - 1)));
        }
    }
    Property::Record(RecordProperty::new(fields))
}

fn check_laws(lattice: &PropertyLattice, seed: u64) {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);

    for _ in 0..SAMPLES {
        let a = random_property(lattice, &mut rng, 3);
        let b = random_property(lattice, &mut rng, 3);

        assert_eq!(
            lattice.compare(&a, &a).unwrap(),
            CpoRelation::Same,
            "compare({}, itself)",
            a.fmt(lattice)
        );

        let ab = lattice.compare(&a, &b).unwrap();
        let ba = lattice.compare(&b, &a).unwrap();
        assert_eq!(
            ab.inverse(),
            ba,
            "compare({0}, {1}) and compare({1}, {0}) are not inverses",
            a.fmt(lattice),
            b.fmt(lattice)
        );

        let glb = lattice.greatest_lower_bound(&a, &b).unwrap();
        assert!(lattice.leq(&glb, &a).unwrap(), "glb above {}", a.fmt(lattice));
        assert!(lattice.leq(&glb, &b).unwrap(), "glb above {}", b.fmt(lattice));

        let lub = lattice.least_upper_bound(&a, &b).unwrap();
        assert!(lattice.leq(&a, &lub).unwrap(), "lub below {}", a.fmt(lattice));
        assert!(lattice.leq(&b, &lub).unwrap(), "lub below {}", b.fmt(lattice));

        assert!(lattice.leq(&lattice.bottom(), &a).unwrap());
        assert!(lattice.leq(&a, &lattice.top()).unwrap());

        if ab.is_at_most() {
            assert_eq!(glb, a);
            assert_eq!(lub, b);
        }
    }
}

#[test]
fn builtin_lattices_satisfy_the_laws() {
    let registry = LatticeRegistry::with_builtins();
    for (seed, name) in registry.names().iter().enumerate() {
        let lattice = registry.get(name).unwrap();
        check_laws(&lattice, 0x42 + seed as u64);
    }
}

#[test]
fn bounds_are_commutative() {
    let registry = LatticeRegistry::with_builtins();
    let lattice = registry.get("dimension").unwrap();
    let mut rng = ChaCha20Rng::seed_from_u64(7);

    for _ in 0..SAMPLES {
        let a = random_property(&lattice, &mut rng, 2);
        let b = random_property(&lattice, &mut rng, 2);
        assert_eq!(
            lattice.greatest_lower_bound(&a, &b).unwrap(),
            lattice.greatest_lower_bound(&b, &a).unwrap()
        );
        assert_eq!(
            lattice.least_upper_bound(&a, &b).unwrap(),
            lattice.least_upper_bound(&b, &a).unwrap()
        );
    }
}
