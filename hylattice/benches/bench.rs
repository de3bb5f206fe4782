use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use hylattice::{
    cpo::Cpo,
    inequality::Inequality,
    lattice::PropertyLattice,
    registry::builtin,
    solver::{FixedPoint, InequalitySolver},
    term::{TermArena, TermId},
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

fn build_chain(
    lattice: &Arc<PropertyLattice>,
    length: usize,
) -> (TermArena<usize>, Vec<Inequality>) {
    let mut arena = TermArena::new(Arc::clone(lattice));
    let mut inequalities = Vec::with_capacity(length);

    let source = arena.constant(lattice.element("TIME").unwrap());
    let mut previous = source;
    for i in 0..length {
        let next = arena.variable(i, lattice.bottom());
        inequalities.push(Inequality::new(previous, next, ()));
        previous = next;
    }

    // Declared in reverse so that the worklist has to propagate back.
    inequalities.reverse();
    (arena, inequalities)
}

fn build_random_graph(
    lattice: &Arc<PropertyLattice>,
    nodes: usize,
    edges: usize,
) -> (TermArena<usize>, Vec<Inequality>) {
    let mut rng = ChaCha20Rng::seed_from_u64(0x42);
    let mut arena = TermArena::new(Arc::clone(lattice));

    let atoms: Vec<_> = lattice.atoms().collect();
    let terms: Vec<TermId> = (0..nodes)
        .map(|i| {
            if rng.random_bool(0.1) {
                let atom = atoms[rng.random_range(0..atoms.len())];
                arena.constant(atom.into())
            } else {
                arena.variable(i, lattice.bottom())
            }
        })
        .collect();

    let inequalities = (0..edges)
        .map(|_| {
            let lesser = terms[rng.random_range(0..nodes)];
            let greater = terms[rng.random_range(0..nodes)];
            Inequality::new(lesser, greater, ())
        })
        .collect();
    (arena, inequalities)
}

fn bench_chain(c: &mut Criterion) {
    let lattice = Arc::new(builtin::dimension().unwrap());

    c.bench_function("solve_chain_1000", |b| {
        b.iter(|| {
            let (mut arena, inequalities) = build_chain(&lattice, 1000);
            let report = InequalitySolver::new(&*lattice)
                .solve(&mut arena, &inequalities, FixedPoint::Least)
                .unwrap();
            black_box(report);
        });
    });
}

fn bench_random_graph(c: &mut Criterion) {
    let lattice = Arc::new(builtin::dimension().unwrap());

    c.bench_function("solve_random_graph_500x2000", |b| {
        b.iter(|| {
            let (mut arena, inequalities) = build_random_graph(&lattice, 500, 2000);
            let report = InequalitySolver::new(&*lattice)
                .solve(&mut arena, &inequalities, FixedPoint::Least)
                .unwrap();
            black_box(report);
        });
    });
}

criterion_group!(benches, bench_chain, bench_random_graph);
criterion_main!(benches);
