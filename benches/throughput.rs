//! Throughput Benchmark for dictd-engine
//!
//! Measures the per-line costs of the protocol layer: framing, tokenizing,
//! parsing and response encoding.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use dictd_engine::connection::{DatabaseInfo, Definition, DictResponse, LineReader, MatchEntry};
use dictd_engine::protocol::{parse_command, tokenize};
use std::time::Duration;

/// Benchmark the tokenizer
fn bench_tokenize(c: &mut Criterion) {
    let mut group = c.benchmark_group("tokenize");
    group.throughput(Throughput::Elements(1));

    group.bench_function("plain", |b| {
        b.iter(|| black_box(tokenize(black_box("MATCH wn prefix appl"))));
    });

    group.bench_function("quoted", |b| {
        b.iter(|| {
            black_box(tokenize(black_box(
                "DEFINE \"The Collaborative International Dictionary\" 'ice cream'",
            )))
        });
    });

    group.bench_function("long_line", |b| {
        let line = format!("CLIENT {}", "word ".repeat(200));
        b.iter(|| black_box(tokenize(black_box(&line))));
    });

    group.finish();
}

/// Benchmark full command parsing
fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    group.throughput(Throughput::Elements(1));

    group.bench_function("define", |b| {
        b.iter(|| black_box(parse_command(black_box("DEFINE * apple"))));
    });

    group.bench_function("show_db", |b| {
        b.iter(|| black_box(parse_command(black_box("show db"))));
    });

    group.bench_function("option_mime", |b| {
        b.iter(|| black_box(parse_command(black_box("OPTION MIME"))));
    });

    group.finish();
}

/// Benchmark response encoding
fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    group.throughput(Throughput::Elements(1));

    let databases: Vec<DatabaseInfo> = (0..20)
        .map(|i| DatabaseInfo::new(format!("db{i}"), format!("Dictionary number {i}")))
        .collect();

    let definitions: Vec<Definition> = (0..5)
        .map(|i| Definition {
            headword: "apple".to_string(),
            dictionary: format!("db{i}"),
            dictionary_description: format!("Dictionary number {i}"),
            text: "apple\n  n 1: fruit with red or yellow or green skin\n.\n  2: native \
                   Eurasian tree widely cultivated"
                .repeat(4),
            mime_headers: vec![("Content-type".to_string(), "text/plain".to_string())],
        })
        .collect();

    let matches: Vec<MatchEntry> = (0..50)
        .map(|i| MatchEntry::new("wn", format!("apple{i}")))
        .collect();

    group.bench_function("write_databases", |b| {
        b.iter(|| {
            let mut res = DictResponse::new(tokio::io::sink());
            res.write_databases(black_box(&databases), None, None);
            black_box(res.buffered().len());
        });
    });

    group.bench_function("write_definitions", |b| {
        b.iter(|| {
            let mut res = DictResponse::new(tokio::io::sink());
            res.write_definitions(black_box(&definitions), None, None);
            black_box(res.buffered().len());
        });
    });

    group.bench_function("write_matches", |b| {
        b.iter(|| {
            let mut res = DictResponse::new(tokio::io::sink());
            res.write_matches(black_box(&matches), None, None);
            black_box(res.buffered().len());
        });
    });

    group.finish();
}

/// Benchmark line framing over an in-memory stream
fn bench_line_reader(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();

    let input = "DEFINE * apple\r\nMATCH wn prefix app\nSTATUS\r\n".repeat(1_000);

    let mut group = c.benchmark_group("line_reader");
    group.measurement_time(Duration::from_secs(10));
    group.throughput(Throughput::Bytes(input.len() as u64));

    group.bench_function("3000_lines", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let mut reader = LineReader::new(input.as_bytes());
                let mut count = 0usize;
                while let Ok(Some(line)) = reader.read_line().await {
                    black_box(line);
                    count += 1;
                }
                black_box(count);
            })
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_tokenize,
    bench_parse,
    bench_encode,
    bench_line_reader,
);

criterion_main!(benches);
