use std::{iter::repeat_with, time::Duration};

use arbor_transparency::tree::Tree;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::Rng;
use sha2::Sha256;

fn run(items: impl Iterator<Item = [u8; 32]>) -> Tree<Sha256> {
    let mut tree: Tree<Sha256> = Tree::default();
    for item in items {
        tree = tree.add(item).unwrap();
    }
    tree
}

fn tree_bench(c: &mut Criterion) {
    let mut rng = rand::thread_rng();
    let mut grp = c.benchmark_group("tree");

    grp.sample_size(50);
    grp.warm_up_time(Duration::from_secs(1));

    for size in [16, 128, 1024] {
        grp.throughput(criterion::Throughput::Elements(size as u64));
        grp.bench_with_input(BenchmarkId::new("add", size), &size, |b, i| {
            b.iter(|| run(repeat_with(|| rng.gen()).take(*i)))
        });
    }

    drop(grp);

    let mut grp = c.benchmark_group("prove");

    grp.sample_size(50);
    grp.warm_up_time(Duration::from_secs(1));

    for size in [128usize, 1024] {
        let items: Vec<[u8; 32]> = repeat_with(|| rng.gen()).take(size).collect();
        let tree = Tree::<Sha256>::new(&items);

        grp.bench_with_input(BenchmarkId::new("membership", size), &size, |b, i| {
            b.iter(|| black_box(tree.prove_membership(*i / 2).unwrap()))
        });
        grp.bench_with_input(BenchmarkId::new("incremental", size), &size, |b, i| {
            b.iter(|| black_box(tree.prove_incremental(*i / 2, *i - 1).unwrap()))
        });
    }
}

criterion_group!(benches, tree_bench);
criterion_main!(benches);
