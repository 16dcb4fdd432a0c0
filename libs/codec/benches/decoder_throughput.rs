//! Decoder throughput for the hot extraction paths
//!
//! Measures query parameter and result metadata decoding on realistic bodies,
//! plus the error path for truncated input, which must stay as cheap as the
//! happy path since truncated captures are common.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use wiretap_codec::TypeDecoder;

/// QUERY parameters with six bound values, page size and default timestamp
fn create_query_parameters() -> Vec<u8> {
    let mut body = vec![0x00, 0x0a, 0x25, 0x00, 0x06];
    for i in 0..6u64 {
        body.extend_from_slice(&8i32.to_be_bytes());
        body.extend_from_slice(&i.to_be_bytes());
    }
    body.extend_from_slice(&5000i32.to_be_bytes());
    body.extend_from_slice(&1581615543430001i64.to_be_bytes());
    body
}

/// Rows metadata with a global table spec and 32 varchar columns
fn create_result_metadata() -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&1i32.to_be_bytes());
    body.extend_from_slice(&32i32.to_be_bytes());
    for name in ["system", "peers"] {
        body.extend_from_slice(&(name.len() as u16).to_be_bytes());
        body.extend_from_slice(name.as_bytes());
    }
    for i in 0..32 {
        let name = format!("column_{i}");
        body.extend_from_slice(&(name.len() as u16).to_be_bytes());
        body.extend_from_slice(name.as_bytes());
        body.extend_from_slice(&0x000du16.to_be_bytes());
    }
    body
}

fn bench_happy_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("happy_path_decoding");

    let params = create_query_parameters();
    group.bench_function("query_parameters", |b| {
        b.iter(|| {
            let mut decoder = TypeDecoder::new(black_box(&params));
            black_box(decoder.extract_query_parameters())
        });
    });

    let metadata = create_result_metadata();
    group.bench_function("result_metadata", |b| {
        b.iter(|| {
            let mut decoder = TypeDecoder::new(black_box(&metadata));
            black_box(decoder.extract_result_metadata())
        });
    });

    group.finish();
}

fn bench_truncated_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("truncated_decoding");

    let metadata = create_result_metadata();
    let truncated = &metadata[..metadata.len() - 1];
    group.bench_function("result_metadata_truncated", |b| {
        b.iter(|| {
            let mut decoder = TypeDecoder::new(black_box(truncated));
            black_box(decoder.extract_result_metadata())
        });
    });

    group.finish();
}

criterion_group!(benches, bench_happy_path, bench_truncated_path);
criterion_main!(benches);
