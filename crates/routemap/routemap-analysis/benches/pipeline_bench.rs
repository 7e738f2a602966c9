//! Pipeline benchmarks: single-file scans and parallel batches.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use routemap_analysis::{scan_file, ProfileRegistry, ScanEngine, SourceFile};
use routemap_core::config::ScanConfig;
use routemap_core::traits::CancellationToken;

fn express_source(routes: usize) -> String {
    let mut out = String::from("const api = express.Router();\n");
    for i in 0..routes {
        out.push_str(&format!(
            "// route {i}\napi.get('/items/{i}/:id', (req, res) => {{\n  res.json({{ id: req.params.id }});\n}});\n"
        ));
    }
    out.push_str("app.use('/api', api);\n");
    out
}

fn rails_source(resources: usize) -> String {
    let mut out = String::from("Rails.application.routes.draw do\n");
    for i in 0..resources {
        out.push_str(&format!(
            "  resources :things{i} do\n    member do\n      get 'preview'\n    end\n  end\n"
        ));
    }
    out.push_str("end\n");
    out
}

fn scan_file_benchmark(c: &mut Criterion) {
    let registry = ProfileRegistry::builtin().expect("builtin profiles");
    let config = ScanConfig::default();
    let mut group = c.benchmark_group("scan_file");
    for (ecosystem, source) in [("express", express_source(200)), ("rails", rails_source(100))] {
        let profile = registry.get(ecosystem).expect("profile");
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(ecosystem), &source, |b, source| {
            b.iter(|| std::hint::black_box(scan_file(&profile, "bench", source, &config)));
        });
    }
    group.finish();
}

fn scan_batch_benchmark(c: &mut Criterion) {
    let files: Vec<SourceFile> = (0..64)
        .map(|i| SourceFile::new(format!("routes/{i}.js"), express_source(50), "express"))
        .collect();
    let config = ScanConfig {
        cache_capacity: Some(0),
        ..ScanConfig::default()
    };
    let registry = std::sync::Arc::new(ProfileRegistry::builtin().expect("builtin profiles"));
    let engine = ScanEngine::new(registry, config);
    let cancel = CancellationToken::new();
    c.bench_function("scan_batch_64_files", |b| {
        b.iter(|| std::hint::black_box(engine.scan_batch(&files, &cancel)));
    });
}

criterion_group!(benches, scan_file_benchmark, scan_batch_benchmark);
criterion_main!(benches);
