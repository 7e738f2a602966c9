//! Batch driver, scan cache, and configuration loading.

use std::sync::Arc;

use routemap_analysis::{Confidence, FileOutcome, ScanEngine, SourceFile};
use routemap_core::config::RoutemapConfig;
use routemap_core::errors::ScanError;
use routemap_core::traits::CancellationToken;

fn inputs() -> Vec<SourceFile> {
    vec![
        SourceFile::new("app.js", "app.get('/a', h);\napp.post('/b', h);\n", "express"),
        SourceFile::new("routes.rb", "get 'c', to: 'x#c'\n", "rails"),
        SourceFile::new("main.cob", "DISPLAY 'HI'.", "cobol"),
        SourceFile::new("urls.py", "urlpatterns = [path('d/', views.d)]\n", "django"),
    ]
}

#[test]
fn test_batch_keeps_input_order() {
    let engine = ScanEngine::with_defaults().unwrap();
    let report = engine.scan_batch(&inputs(), &CancellationToken::new());

    assert_eq!(report.outcomes.len(), 4);
    assert_eq!(report.failed, 1);
    assert_eq!(report.cancelled, 0);
    assert_eq!(report.endpoint_count, 4);
    match &report.outcomes[2] {
        FileOutcome::Failed { path, error } => {
            assert_eq!(path, "main.cob");
            assert_eq!(error, &ScanError::UnknownEcosystem { id: "cobol".into() });
        }
        other => panic!("expected failure, got {other:?}"),
    }
    let files: Vec<&str> = report
        .outcomes
        .iter()
        .filter_map(FileOutcome::scan)
        .map(|s| s.file.as_str())
        .collect();
    assert_eq!(files, vec!["app.js", "routes.rb", "urls.py"]);
    let endpoints: Vec<(&str, &str)> = report
        .endpoints()
        .map(|e| (e.method.as_str(), e.path.as_str()))
        .collect();
    assert_eq!(endpoints, vec![("GET", "/a"), ("POST", "/b"), ("GET", "/c"), ("ANY", "/d")]);
}

#[test]
fn test_batch_matches_single_file_scans() {
    let engine = ScanEngine::with_defaults().unwrap();
    let files = inputs();
    let report = engine.scan_batch(&files, &CancellationToken::new());
    for (input, outcome) in files.iter().zip(&report.outcomes) {
        match engine.scan_source(input) {
            Ok(scan) => assert_eq!(outcome.scan(), Some(&*scan)),
            Err(_) => assert!(matches!(outcome, FileOutcome::Failed { .. })),
        }
    }
}

#[test]
fn test_cancelled_batch_skips_files() {
    let engine = ScanEngine::with_defaults().unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let report = engine.scan_batch(&inputs(), &cancel);
    assert_eq!(report.cancelled, 4);
    assert_eq!(report.endpoint_count, 0);
    assert!(report
        .outcomes
        .iter()
        .all(|o| matches!(o, FileOutcome::Cancelled { .. })));
}

#[test]
fn test_cache_hits_share_the_scan() {
    let engine = ScanEngine::with_defaults().unwrap();
    let input = SourceFile::new("app.js", "app.get('/a', h);", "express");
    let first = engine.scan_source(&input).unwrap();
    let second = engine.scan_source(&input).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let edited = SourceFile::new("app.js", "app.get('/b', h);", "express");
    let third = engine.scan_source(&edited).unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
    assert!(third.has("GET", "/b"));
}

#[test]
fn test_engine_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("routemap.toml"),
        r#"
[scan]
wildcard = "{*}"
cache_capacity = 0
threads = 2

[profiles]
enabled = ["express"]
extra = ["jobs.toml"]
"#,
    )
    .unwrap();
    std::fs::write(
        dir.path().join("jobs.toml"),
        r#"
id = "jobs"
name = "Job service"
extensions = ["job"]
receivers = ["svc"]

[lexical]
line_comments = ["//"]
strings = [{ open = "'", close = "'", escape = "\\" }]
concat_operators = ["+"]

[[routes]]
name = "jobs-handle"
surface = "member_call"
tokens = ["handle"]
verbs = { source = "argument", position = 1, default = ["GET"] }
handler = { source = "none" }
"#,
    )
    .unwrap();

    let config = RoutemapConfig::load(dir.path(), None).unwrap();
    let engine = ScanEngine::from_config(&config, dir.path()).unwrap();
    assert!(engine.cache().is_none());
    assert_eq!(engine.config().effective_wildcard(), "{*}");
    assert!(engine.registry().contains("jobs"));
    assert!(!engine.registry().contains("rails"));

    let scan = engine
        .scan_source(&SourceFile::new(
            "svc.job",
            "svc.handle('/jobs', 'POST');\nsvc.handle('/jobs/' + id);\n",
            "jobs",
        ))
        .unwrap();
    assert!(scan.has("POST", "/jobs"));
    let dynamic = scan.endpoints.iter().find(|e| e.method == "GET").unwrap();
    assert_eq!(dynamic.path, "/jobs/{*}");
    assert_eq!(dynamic.confidence, Confidence::DynamicPathUnresolved);

    let err = engine
        .scan_source(&SourceFile::new("routes.rb", "", "rails"))
        .unwrap_err();
    assert!(err.is_fatal());
}
