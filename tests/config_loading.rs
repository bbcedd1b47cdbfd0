use std::io::Write;
use std::time::Duration;

use suiterun::config::{SuiteFile, load_and_validate};
use suiterun::dag::resolve;
use suiterun::errors::SuiteError;
use suiterun_test_utils::builders::{SuiteFileBuilder, TaskConfigBuilder};
use tempfile::NamedTempFile;

fn write_suite(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn full_suite_file_loads_in_file_order() {
    let file = write_suite(
        r#"
[config]
concurrency = 3
fail_fast = true

[locking]
url = "http://127.0.0.1:7878/locks"
client = "ci-runner-7"
lease_ms = 20000

[[task]]
id = "migrate"
cmd = "./migrate.sh"
resources = ["db"]

[[task]]
id = "api"
name = "API tests"
cmd = "cargo test -p api"
after = ["migrate"]
resources = ["db", "redis"]

[[task]]
id = "docs"
cmd = "mdbook build"
skip = true
"#,
    );

    let suite = load_and_validate(file.path()).unwrap();
    let ids: Vec<&str> = suite.task.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["migrate", "api", "docs"]);

    let runner = suite.runner_options();
    assert_eq!(runner.concurrency, 3);
    assert!(runner.fail_fast);

    let locking = suite.locking_options();
    assert!(locking.enabled);
    assert_eq!(locking.lease, Duration::from_secs(20));
    assert_eq!(suite.client_id(), "ci-runner-7");

    let resolved = resolve(suite.descriptors(std::path::Path::new("."))).unwrap();
    assert_eq!(resolved.tasks()[1].name(), "API tests");
    assert_eq!(resolved.tasks()[1].dependencies(), &[0]);
    assert_eq!(resolved.tasks()[1].resources().len(), 2);
}

#[test]
fn defaults_apply_when_sections_are_missing() {
    let file = write_suite(
        r#"
[[task]]
id = "only"
cmd = "true"
"#,
    );
    let suite = load_and_validate(file.path()).unwrap();
    assert_eq!(suite.config.concurrency, 0);
    assert!(!suite.config.fail_fast);
    assert!(suite.locking.url.is_none());
    assert_eq!(suite.locking_options().lease, Duration::from_secs(40));
    assert!(!suite.client_id().is_empty());
}

#[test]
fn cycle_in_file_is_a_structured_error() {
    let file = write_suite(
        r#"
[[task]]
id = "A"
cmd = "echo A"
after = ["B"]

[[task]]
id = "B"
cmd = "echo B"
after = ["A"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(SuiteError::CircularDependency { task }) => {
            assert!(task == "A" || task == "B");
        }
        other => panic!("expected CircularDependency, got {other:?}"),
    }
}

#[test]
fn malformed_toml_is_a_toml_error() {
    let file = write_suite("[[task]\nid = ");
    assert!(matches!(load_and_validate(file.path()), Err(SuiteError::Toml(_))));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("Suite.toml");
    assert!(matches!(load_and_validate(&missing), Err(SuiteError::Io(_))));
}

#[test]
fn semantic_checks_reject_bad_suites() {
    let no_tasks = SuiteFileBuilder::new().build_raw();
    assert!(matches!(SuiteFile::try_from(no_tasks), Err(SuiteError::Config(_))));

    let unknown_after = SuiteFileBuilder::new()
        .with_task(TaskConfigBuilder::new("a", "true").after("nope").build())
        .build_raw();
    assert!(matches!(
        SuiteFile::try_from(unknown_after),
        Err(SuiteError::DependencyNotFound { .. })
    ));

    let bad_resource = SuiteFileBuilder::new()
        .with_task(TaskConfigBuilder::new("a", "true").resource("db/main").build())
        .build_raw();
    assert!(matches!(
        SuiteFile::try_from(bad_resource),
        Err(SuiteError::InvalidResource { .. })
    ));

    let empty_cmd = SuiteFileBuilder::new()
        .with_task(TaskConfigBuilder::new("a", "  ").build())
        .build_raw();
    assert!(matches!(SuiteFile::try_from(empty_cmd), Err(SuiteError::Config(_))));

    let long_lease = SuiteFileBuilder::new()
        .lease_ms(60_001)
        .with_task(TaskConfigBuilder::new("a", "true").build())
        .build_raw();
    assert!(matches!(SuiteFile::try_from(long_lease), Err(SuiteError::Config(_))));

    let not_http = SuiteFileBuilder::new()
        .lock_url("ftp://locks/locks")
        .with_task(TaskConfigBuilder::new("a", "true").build())
        .build_raw();
    assert!(matches!(SuiteFile::try_from(not_http), Err(SuiteError::Config(_))));
}

#[test]
fn builder_produces_a_valid_suite() {
    let suite = SuiteFileBuilder::new()
        .concurrency(2)
        .fail_fast()
        .with_task(TaskConfigBuilder::new("build", "make").build())
        .with_task(
            TaskConfigBuilder::new("test", "make test")
                .name("unit tests")
                .after("build")
                .resource("db")
                .build(),
        )
        .with_task(TaskConfigBuilder::new("bench", "make bench").skip().build())
        .build();
    assert_eq!(suite.task.len(), 3);
    assert_eq!(suite.runner_options().concurrency, 2);
}
