use criterion::{criterion_group, criterion_main, Criterion};
use real_friends::services::{normalize_phone_number, LocalContact, PhoneIndex};
use std::hint::black_box;

/// Address book shaped like a real one: mixed formatting, duplicates across
/// contacts, some entries without a usable number.
fn address_book(size: usize) -> Vec<LocalContact> {
    (0..size)
        .map(|i| LocalContact {
            name: format!("Contact {}", i),
            phone_numbers: vec![
                format!("+1 ({:03}) {:03}-{:04}", 200 + i % 700, i % 1000, i),
                format!("{:03}.{:03}.{:04}", 200 + (i / 2) % 700, (i / 2) % 1000, i / 2),
                "n/a".to_string(),
            ],
        })
        .collect()
}

fn benchmark_contacts(c: &mut Criterion) {
    let mut group = c.benchmark_group("contacts");

    group.bench_function("normalize_formatted_number", |b| {
        b.iter(|| normalize_phone_number(black_box("+1 (718) 223-4425 ext. 12")))
    });

    for size in [100, 2_000] {
        let book = address_book(size);
        group.bench_function(format!("phone_index_{}", size), |b| {
            b.iter(|| PhoneIndex::build(black_box(&book)))
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_contacts);
criterion_main!(benches);
