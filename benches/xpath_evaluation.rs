//! Expression compilation and evaluation benchmarks
//!
//! Measures parsing alone and evaluation over generated documents of
//! increasing size (10, 100, 1000 records).
//!
//! Run benchmarks: `cargo bench --bench xpath_evaluation`

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use domxpath::{ResultType, XPathExpression, XmlDocument};
use std::hint::black_box;

const EXPRESSIONS: &[(&str, &str)] = &[
    ("descendant_scan", "//record"),
    ("quick_attr", "//record[@status='open']"),
    ("positional", "//record[last()]/name"),
    ("following", "//record[@id='r5']/following::name"),
    ("aggregate", "sum(//record/@amount) div count(//record)"),
];

fn generate_document(count: usize) -> String {
    let mut xml = String::from("<ledger>");
    for i in 0..count {
        let status = if i % 3 == 0 { "open" } else { "closed" };
        xml.push_str(&format!(
            "<record id=\"r{i}\" status=\"{status}\" amount=\"{}\"><name>Record {i}</name><note>n</note></record>",
            i * 7 % 100
        ));
    }
    xml.push_str("</ledger>");
    xml
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for (name, source) in EXPRESSIONS {
        group.bench_function(*name, |b| {
            b.iter(|| XPathExpression::new(black_box(source), None))
        });
    }
    group.finish();
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");
    for count in [10, 100, 1000] {
        let xml = generate_document(count);
        let doc = match XmlDocument::parse(&xml) {
            Ok(doc) => doc,
            Err(err) => panic!("generated document is invalid: {}", err),
        };
        group.throughput(Throughput::Elements(count as u64));
        for (name, source) in EXPRESSIONS {
            let expr = match XPathExpression::new(source, None) {
                Ok(expr) => expr,
                Err(err) => panic!("{}: {}", source, err),
            };
            group.bench_with_input(BenchmarkId::new(*name, count), &doc, |b, doc| {
                b.iter(|| expr.evaluate(black_box(doc.root_node()), ResultType::Any))
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_evaluate);
criterion_main!(benches);
