//! End-to-end builds through the real shell
//!
//! Tests that need a toolchain binary skip themselves when it is absent.

mod support;

use async_trait::async_trait;
use buildsieve::remediation::{AdviceRequest, Advisor, AdvisorError, NoAdvisor, Remedy, RetryLoop};
use buildsieve::runner::{CommandRunner, ShellRunner, TranscriptRunner};
use buildsieve::strategy::{BuildStatus, FailureCategory, StrategyId, StrategyRegistry};
use buildsieve::{BatchRunner, BatchSettings, Project, SelectorOptions, StrategySelector};
use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};
use support::{skip_without, write, write_build_script, MISSING_ZLIB};
use tempfile::TempDir;

fn shell() -> Arc<dyn CommandRunner> {
    Arc::new(ShellRunner::new())
}

fn selector_with(runner: Arc<dyn CommandRunner>, timeout: Option<Duration>) -> StrategySelector {
    StrategySelector::new(
        Arc::new(StrategyRegistry::with_defaults()),
        runner,
        SelectorOptions {
            timeout,
            ..Default::default()
        },
    )
}

fn selector() -> StrategySelector {
    selector_with(shell(), Some(Duration::from_secs(120)))
}

/// Suggests a fresh harmless command for every request
struct FreshCommand;

#[async_trait]
impl Advisor for FreshCommand {
    async fn suggest(&self, request: &AdviceRequest) -> Result<Option<Remedy>, AdvisorError> {
        Ok(Some(Remedy::Command(format!("echo remedy {}", request.attempt))))
    }

    fn name(&self) -> &str {
        "fresh"
    }
}

/// Creates the file the build script waits for
struct TouchMarker;

#[async_trait]
impl Advisor for TouchMarker {
    async fn suggest(&self, _request: &AdviceRequest) -> Result<Option<Remedy>, AdvisorError> {
        Ok(Some(Remedy::Command("touch deps-installed".to_string())))
    }

    fn name(&self) -> &str {
        "touch"
    }
}

#[tokio::test]
async fn test_cmake_project_builds() {
    if skip_without(&["cmake", "cc"]) {
        return;
    }
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "CMakeLists.txt",
        "cmake_minimum_required(VERSION 3.5)\nproject(hello C)\nadd_executable(hello main.c)\n",
    );
    write(dir.path(), "main.c", "int main(void) { return 0; }\n");

    let outcome = selector().select_and_build(&Project::new("hello", dir.path())).await;

    assert!(outcome.is_success(), "output:\n{}", outcome.output);
    assert_eq!(outcome.strategy, Some(StrategyId::CMake));
    assert!(dir.path().join("build").is_dir());
}

#[tokio::test]
async fn test_custom_script_wins_over_makefile() {
    let dir = TempDir::new().unwrap();
    write_build_script(dir.path(), "touch built-by-script");
    write(dir.path(), "Makefile", "all:\n\ttouch built-by-make\n");

    let outcome = selector().select_and_build(&Project::new("both", dir.path())).await;

    assert!(outcome.is_success(), "output:\n{}", outcome.output);
    assert_eq!(outcome.strategy, Some(StrategyId::CustomScript));
    assert!(dir.path().join("built-by-script").exists());
    assert!(!dir.path().join("built-by-make").exists());
}

#[tokio::test]
async fn test_bogus_configure_ac_fails_at_autoreconf() {
    if skip_without(&["autoreconf"]) {
        return;
    }
    let dir = TempDir::new().unwrap();
    write(dir.path(), "configure.ac", "this is not autoconf input\n");

    let outcome = selector_with(shell(), Some(Duration::from_secs(120)))
        .select_and_build(&Project::new("bogus", dir.path()))
        .await;

    assert_eq!(outcome.strategy, Some(StrategyId::Autotools));
    assert_eq!(outcome.reason(), Some("autoreconf failed"));
    assert!(outcome.unresolved_symbols.is_empty());
}

#[tokio::test]
async fn test_missing_header_is_reported() {
    let dir = TempDir::new().unwrap();
    write_build_script(dir.path(), MISSING_ZLIB);

    let outcome = selector().select_and_build(&Project::new("needs-zlib", dir.path())).await;

    assert_eq!(
        outcome.status,
        BuildStatus::Failed {
            reason: "build script build.sh failed".to_string(),
            category: FailureCategory::MissingDependency,
        }
    );
    assert_eq!(outcome.unresolved_symbols, vec!["zlib.h"]);
}

#[tokio::test]
async fn test_rebuild_is_idempotent() {
    if skip_without(&["make"]) {
        return;
    }
    let dir = TempDir::new().unwrap();
    write(dir.path(), "Makefile", "all:\n\techo ok > out.txt\nclean:\n\trm -f out.txt\n");
    let project = Project::new("twice", dir.path());
    let selector = selector();

    let first = selector.select_and_build(&project).await;
    let second = selector.select_and_build(&project).await;

    assert!(first.is_success(), "output:\n{}", first.output);
    assert_eq!(first.status, second.status);
    assert_eq!(first.strategy, second.strategy);
}

#[tokio::test]
async fn test_undetectable_runs_no_commands() {
    let dir = TempDir::new().unwrap();
    let transcripts = TempDir::new().unwrap();
    write(dir.path(), "README.md", "# nothing to build\n");
    let transcript = TranscriptRunner::transcript_path(transcripts.path(), "plain");
    let runner = Arc::new(TranscriptRunner::new(shell(), &transcript));

    let outcome = selector_with(runner, None)
        .select_and_build(&Project::new("plain", dir.path()))
        .await;

    assert!(outcome.is_undetectable());
    assert!(!transcript.exists());
}

#[tokio::test]
async fn test_timeout_kills_long_build() {
    let dir = TempDir::new().unwrap();
    write_build_script(dir.path(), "sleep 30");
    let started = Instant::now();

    let outcome = selector_with(shell(), Some(Duration::from_secs(1)))
        .select_and_build(&Project::new("slow", dir.path()))
        .await;

    assert!(!outcome.is_success());
    assert!(started.elapsed() < Duration::from_secs(20));
}

#[tokio::test]
async fn test_retry_is_bounded() {
    let dir = TempDir::new().unwrap();
    write_build_script(dir.path(), MISSING_ZLIB);
    let retry = RetryLoop::new(Arc::new(selector()), Arc::new(FreshCommand));

    let result = retry.retry_build(&Project::new("never", dir.path()), 3).await;

    assert_eq!(result.attempts, 3);
    assert!(result.outcome.is_missing_dependency());
    assert!(!result.stalled);
}

#[tokio::test]
async fn test_remedy_fixes_build() {
    let dir = TempDir::new().unwrap();
    write_build_script(
        dir.path(),
        &format!("[ -f deps-installed ] && exit 0\n{}", MISSING_ZLIB),
    );
    let retry = RetryLoop::new(Arc::new(selector()), Arc::new(TouchMarker));

    let result = retry.retry_build(&Project::new("fixable", dir.path()), 4).await;

    assert!(result.outcome.is_success(), "output:\n{}", result.outcome.output);
    assert_eq!(result.attempts, 2);
    assert_eq!(result.remedies_applied, 1);
}

#[tokio::test]
async fn test_batch_with_transcripts() {
    let repos = TempDir::new().unwrap();
    let transcripts = TempDir::new().unwrap();
    write_build_script(&repos.path().join("good"), "echo compiled");
    write_build_script(&repos.path().join("broken"), MISSING_ZLIB);
    write(&repos.path().join("docs"), "README.md", "text\n");

    let settings = BatchSettings {
        jobs: 2,
        max_attempts: 1,
        transcript_dir: Some(transcripts.path().to_path_buf()),
        ..Default::default()
    };
    let result = BatchRunner::new(settings, shell(), Arc::new(NoAdvisor))
        .run_dir(repos.path())
        .await
        .unwrap();

    assert_eq!(result.summary.total, 3);
    assert_eq!(result.summary.successes, 1);
    assert_eq!(result.summary.undetectable, 1);
    assert_eq!(result.summary.missing_dependency, 1);
    assert_eq!(result.summary.unresolved_symbols, vec!["zlib.h"]);

    let log = fs::read_to_string(transcripts.path().join("good_build.log")).unwrap();
    assert!(log.contains("Running command: ./build.sh"));
    assert!(log.contains("compiled"));
    assert!(log.contains("Command finished with return code: 0"));
    assert!(!transcripts.path().join("docs_build.log").exists());
}

#[tokio::test]
async fn test_background_process_left_by_build_script() {
    let dir = TempDir::new().unwrap();
    write_build_script(dir.path(), "echo built\nsleep 20 &\nexit 0");
    let project = Project::from_path(dir.path());

    let start = Instant::now();
    let outcome = selector_with(shell(), Some(Duration::from_secs(5)))
        .select_and_build(&project)
        .await;

    assert!(outcome.is_success(), "status: {:?}", outcome.status);
    assert!(outcome.output.contains("built"));
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_tool_lookup() {
    assert!(support::has_tool("sh"));
    assert!(!support::has_tool("buildsieve-no-such-tool"));
    assert!(support::skip_without(&["buildsieve-no-such-tool"]));
}
