//! Performance benchmarks

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mutscan::sequence::{Aligner, ReferenceSequence};
use mutscan::variant::VariantCaller;

fn amplicon(length: usize) -> String {
    "ACGT".chars().cycle().take(length).collect()
}

fn benchmark_alignment(c: &mut Criterion) {
    let reference = amplicon(300);
    let mut query = reference.clone();
    // Drop one codon mid-amplicon to force a real indel alignment.
    query.replace_range(150..153, "");

    c.bench_function("align_300bp_deletion", |b| {
        let mut aligner = Aligner::with_default_matrix();
        b.iter(|| {
            let edits = aligner
                .align(black_box(reference.as_bytes()), black_box(query.as_bytes()))
                .unwrap();
            black_box(edits);
        });
    });
}

fn benchmark_variant_calling(c: &mut Criterion) {
    let reference = Arc::new(ReferenceSequence::new("wt", &amplicon(300), true, 0).unwrap());
    let mut read = reference.dna().to_string();
    read.replace_range(90..91, "T");

    c.bench_function("call_300bp_substitution", |b| {
        let mut caller = VariantCaller::new(Arc::clone(&reference), None, 10);
        b.iter(|| {
            let outcome = caller.call(black_box(&read)).unwrap();
            black_box(outcome);
        });
    });
}

criterion_group!(benches, benchmark_alignment, benchmark_variant_calling);
criterion_main!(benches);
