//! Request pipeline benchmarks
//!
//! Measures the CPU side of request handling:
//! - Header frame parsing (request line, header block, URI resolution)
//! - Header name canonicalisation
//! - Cookie header parsing
//! - Response encoding
//!
//! Run with: cargo bench --bench parser

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use httpwire::http::headers::canonical_name;
use httpwire::http::{parse_request_head, CookieList, HttpRequest, HttpResponse};

fn request_head(header_count: usize) -> Vec<u8> {
    let mut head = b"GET /search?q=rust&page=2 HTTP/1.1\r\nHost: bench.example.com".to_vec();
    for i in 0..header_count {
        head.extend_from_slice(format!("\r\nx-bench-header-{}: value-{}", i, i).as_bytes());
    }
    head
}

fn bench_parse_request_head(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_request_head");

    for count in [0, 8, 32, 128] {
        let head = request_head(count);
        group.throughput(Throughput::Bytes(head.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &head, |b, head| {
            b.iter(|| {
                let request = parse_request_head(black_box(head)).unwrap();
                black_box(request);
            });
        });
    }

    group.finish();
}

fn bench_canonical_name(c: &mut Criterion) {
    let mut group = c.benchmark_group("canonical_name");

    for name in ["host", "content-length", "X-FORWARDED-FOR", "sec-websocket-extensions"] {
        group.bench_with_input(BenchmarkId::from_parameter(name), name, |b, name| {
            b.iter(|| black_box(canonical_name(black_box(name))));
        });
    }

    group.finish();
}

fn bench_cookie_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("cookie_parse");

    for count in [1, 10, 50] {
        let header = (0..count)
            .map(|i| format!("cookie{}=\"value{}\"", i, i))
            .collect::<Vec<_>>()
            .join("; ");

        group.bench_with_input(BenchmarkId::from_parameter(count), &header, |b, header| {
            b.iter(|| {
                let (list, rejected) = CookieList::parse([black_box(header.as_str())]);
                black_box((list, rejected));
            });
        });
    }

    group.finish();
}

fn bench_response_encode(c: &mut Criterion) {
    let request = HttpRequest::builder()
        .target("/")
        .header("Host", "bench.example.com")
        .build()
        .unwrap();

    c.bench_function("response_for_request_to_wire", |b| {
        b.iter(|| {
            let response = HttpResponse::for_request(black_box(&request));
            black_box(response.to_wire());
        });
    });
}

criterion_group!(
    benches,
    bench_parse_request_head,
    bench_canonical_name,
    bench_cookie_parse,
    bench_response_encode
);
criterion_main!(benches);
