//! The strategy table
//!
//! One [`Strategy`] per toolchain family: where to look, which signal files
//! count, and how to turn a detection into an ordered step list.

use super::recipe::{self, shell_quote, Step};
use super::{BuildOutcome, StrategyId};
use crate::project::Project;
use crate::runner::CommandRunner;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const CUSTOM_SCRIPTS: &[&str] = &["build.sh", "compile.sh", "make.sh", "build"];
const MAKEFILES: &[&str] = &["Makefile", "makefile", "MAKEFILE"];
const SCONS_FILES: &[&str] = &["SConstruct", "Sconstruct"];
const BAZEL_FILES: &[&str] = &["WORKSPACE", "WORKSPACE.bazel"];
const JVM_FILES: &[&str] = &["gradlew", "build.gradle", "pom.xml", "build.xml"];
const CONFIGURE_CACHES: &[&str] = &["autom4te.cache", "config.status", "config.cache", "config.log"];

/// Conventional places a build descriptor hides one level below the checkout
const NESTED_DIRS: &[&str] = &["src", "Source"];

/// Where the applicable build descriptor was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub strategy: StrategyId,
    /// Directory every step runs relative to
    pub build_root: PathBuf,
    /// The signal file that matched
    pub signal: PathBuf,
}

impl Detection {
    fn signal_name(&self) -> &str {
        self.signal
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DetectOptions {
    /// Maximum walk depth when searching for solution files
    pub solution_depth: usize,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self { solution_depth: 3 }
    }
}

#[derive(Debug, Clone, Copy)]
enum Signal {
    /// Any of these regular files, checked in order
    Files(&'static [&'static str]),
    /// Any file with this extension
    Extension(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Search {
    RootOnly,
    /// Root, then the conventional nested directories
    Nested,
    /// Bounded-depth walk of the whole tree
    Walk,
}

type Plan = fn(&Detection) -> Result<Vec<Step>, String>;

/// A stateless build policy for one toolchain family
pub struct Strategy {
    id: StrategyId,
    signal: Signal,
    search: Search,
    plan: Plan,
}

impl Strategy {
    pub fn id(&self) -> StrategyId {
        self.id
    }

    /// Pure filesystem predicate: never creates, changes or deletes anything
    pub fn detect(&self, project: &Project, options: &DetectOptions) -> Option<Detection> {
        let found = match self.search {
            Search::RootOnly => self.probe_dir(&project.root),
            Search::Nested => candidate_dirs(project)
                .iter()
                .find_map(|dir| self.probe_dir(dir)),
            Search::Walk => self
                .probe_dir(&project.root)
                .or_else(|| self.walk(&project.root, options.solution_depth)),
        };

        found.map(|signal| {
            let build_root = signal
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| project.root.clone());
            debug!(strategy = %self.id, signal = %signal.display(), "Signal file found");
            Detection {
                strategy: self.id,
                build_root,
                signal,
            }
        })
    }

    /// Steps this strategy would run for `detection`
    pub fn plan(&self, detection: &Detection) -> Result<Vec<Step>, String> {
        (self.plan)(detection)
    }

    /// Run the canonical sequence. The only state-mutating operation.
    pub async fn build(
        &self,
        detection: &Detection,
        runner: &dyn CommandRunner,
        timeout: Option<Duration>,
    ) -> BuildOutcome {
        match self.plan(detection) {
            Ok(steps) => {
                recipe::execute(self.id, &steps, &detection.build_root, runner, timeout).await
            }
            Err(reason) => BuildOutcome::failed(self.id, reason, String::new(), ""),
        }
    }

    fn probe_dir(&self, dir: &Path) -> Option<PathBuf> {
        match self.signal {
            Signal::Files(names) => names
                .iter()
                .map(|name| dir.join(name))
                .find(|path| path.is_file()),
            Signal::Extension(ext) => first_with_extension(dir, ext),
        }
    }

    fn walk(&self, root: &Path, depth: usize) -> Option<PathBuf> {
        let Signal::Extension(ext) = self.signal else {
            return None;
        };
        WalkBuilder::new(root)
            .max_depth(Some(depth))
            .sort_by_file_name(|a, b| a.cmp(b))
            .build()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|entry| entry.into_path())
            .find(|path| has_extension(path, ext))
    }
}

impl std::fmt::Debug for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Strategy")
            .field("id", &self.id)
            .field("signal", &self.signal)
            .field("search", &self.search)
            .finish()
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(ext)
}

fn first_with_extension(dir: &Path, ext: &str) -> Option<PathBuf> {
    let mut matches: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && has_extension(path, ext))
        .collect();
    matches.sort();
    matches.into_iter().next()
}

/// Root first, then `src/`, `Source/`, `<name>/src/` and `<name>/`
fn candidate_dirs(project: &Project) -> Vec<PathBuf> {
    let mut dirs = vec![project.root.clone()];
    dirs.extend(NESTED_DIRS.iter().map(|d| project.root.join(d)));

    let mut names = vec![project.name.as_str()];
    // Checkouts are often named `<owner>___<repo>`
    if let Some((_, repo)) = project.name.rsplit_once("___") {
        names.push(repo);
    }
    for name in names {
        dirs.push(project.root.join(name).join("src"));
        dirs.push(project.root.join(name));
    }
    dirs.dedup();
    dirs
}

/// The canonical strategy for `id`
pub fn strategy(id: StrategyId) -> Strategy {
    match id {
        StrategyId::CustomScript => Strategy {
            id,
            signal: Signal::Files(CUSTOM_SCRIPTS),
            search: Search::RootOnly,
            plan: custom_script_plan,
        },
        StrategyId::Scons => Strategy {
            id,
            signal: Signal::Files(SCONS_FILES),
            search: Search::RootOnly,
            plan: |_: &Detection| {
                Ok(vec![
                    Step::shell("scons -c"),
                    Step::shell("scons").fatal("scons failed"),
                ])
            },
        },
        StrategyId::Autotools => Strategy {
            id,
            signal: Signal::Files(&["configure.ac"]),
            search: Search::Nested,
            plan: |_: &Detection| {
                Ok(vec![
                    Step::shell("autoreconf -i").fatal("autoreconf failed"),
                    Step::shell("./autogen.sh").when_exists("autogen.sh"),
                    Step::remove(CONFIGURE_CACHES),
                    Step::shell("./configure").when_exists("configure"),
                    Step::shell("make").fatal("make failed"),
                ])
            },
        },
        StrategyId::CMake => Strategy {
            id,
            signal: Signal::Files(&["CMakeLists.txt"]),
            search: Search::Nested,
            plan: |_: &Detection| {
                Ok(vec![
                    Step::remove(&["build", "CMakeCache.txt", "CMakeFiles"]),
                    Step::create_dir("build").fatal("cmake failed"),
                    Step::shell("cmake ..").in_dir("build").fatal("cmake failed"),
                    Step::shell("cmake --build .")
                        .in_dir("build")
                        .fatal("cmake build failed"),
                ])
            },
        },
        StrategyId::Meson => Strategy {
            id,
            signal: Signal::Files(&["meson.build"]),
            search: Search::Nested,
            plan: |_: &Detection| {
                Ok(vec![
                    Step::remove(&["build"]),
                    Step::create_dir("build").fatal("meson failed"),
                    Step::shell("meson setup ..").in_dir("build").fatal("meson failed"),
                    Step::shell("ninja").in_dir("build").fatal("ninja failed"),
                ])
            },
        },
        StrategyId::Bazel => Strategy {
            id,
            signal: Signal::Files(BAZEL_FILES),
            search: Search::RootOnly,
            plan: |_: &Detection| {
                Ok(vec![
                    Step::shell("bazel clean --expunge"),
                    Step::shell("bazel build //...").fatal("bazel build failed"),
                ])
            },
        },
        StrategyId::Gradle => Strategy {
            id,
            signal: Signal::Files(JVM_FILES),
            search: Search::Nested,
            plan: jvm_plan,
        },
        StrategyId::SolutionFile => Strategy {
            id,
            signal: Signal::Extension("sln"),
            search: Search::Walk,
            plan: solution_plan,
        },
        StrategyId::Make => Strategy {
            id,
            signal: Signal::Files(MAKEFILES),
            search: Search::Nested,
            plan: |_: &Detection| {
                Ok(vec![
                    Step::shell("make clean"),
                    Step::remove(CONFIGURE_CACHES),
                    Step::shell("make distclean").when_exists("configure"),
                    Step::shell("./autogen.sh").when_exists("autogen.sh"),
                    Step::shell("./autogen").when_exists("autogen"),
                    Step::shell("./configure").when_exists("configure"),
                    Step::shell("make").fatal("make failed"),
                ])
            },
        },
    }
}

/// All strategies in priority order: explicit scripts first, generic Make last
pub fn default_strategies() -> Vec<Strategy> {
    StrategyId::all_variants().iter().map(|id| strategy(*id)).collect()
}

fn custom_script_plan(detection: &Detection) -> Result<Vec<Step>, String> {
    let script = detection.signal_name();
    Ok(vec![
        Step::make_executable(script),
        Step::shell(format!("./{}", script)).fatal(format!("build script {} failed", script)),
    ])
}

fn jvm_plan(detection: &Detection) -> Result<Vec<Step>, String> {
    let steps = match detection.signal_name() {
        "gradlew" => vec![
            Step::make_executable("gradlew"),
            Step::shell("./gradlew clean"),
            Step::shell("./gradlew build").fatal("gradle build failed"),
        ],
        "build.gradle" => vec![
            Step::shell("gradle clean"),
            Step::shell("gradle build").fatal("gradle build failed"),
        ],
        "pom.xml" => vec![
            Step::shell("mvn -B clean"),
            Step::shell("mvn -B package").fatal("maven build failed"),
        ],
        "build.xml" => vec![
            Step::shell("ant clean"),
            Step::shell("ant").fatal("ant build failed"),
        ],
        other => return Err(format!("unsupported JVM build file {}", other)),
    };
    Ok(steps)
}

fn solution_plan(detection: &Detection) -> Result<Vec<Step>, String> {
    let solution = if detection.signal.is_file() {
        Some(detection.signal.clone())
    } else {
        first_with_extension(&detection.build_root, "sln")
    };

    let solution = solution.ok_or_else(|| "no .sln file found".to_string())?;
    let name = solution
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| "no .sln file found".to_string())?;

    Ok(vec![
        Step::shell(format!("msbuild {}", shell_quote(&name))).fatal("msbuild failed")
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::MockRunner;
    use std::fs;
    use tempfile::TempDir;
    use yare::parameterized;

    fn project_with(files: &[&str]) -> (TempDir, Project) {
        let dir = TempDir::new().unwrap();
        for file in files {
            let path = dir.path().join(file);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, "").unwrap();
        }
        let project = Project::new("demo", dir.path());
        (dir, project)
    }

    #[parameterized(
        makefile = { "Makefile", StrategyId::Make },
        lowercase_makefile = { "makefile", StrategyId::Make },
        upper_makefile = { "MAKEFILE", StrategyId::Make },
        configure_ac = { "configure.ac", StrategyId::Autotools },
        cmake = { "CMakeLists.txt", StrategyId::CMake },
        meson = { "meson.build", StrategyId::Meson },
        scons = { "SConstruct", StrategyId::Scons },
        scons_lower = { "Sconstruct", StrategyId::Scons },
        bazel = { "WORKSPACE", StrategyId::Bazel },
        bazel_ext = { "WORKSPACE.bazel", StrategyId::Bazel },
        gradlew = { "gradlew", StrategyId::Gradle },
        gradle = { "build.gradle", StrategyId::Gradle },
        maven = { "pom.xml", StrategyId::Gradle },
        ant = { "build.xml", StrategyId::Gradle },
        build_sh = { "build.sh", StrategyId::CustomScript },
        compile_sh = { "compile.sh", StrategyId::CustomScript },
        make_sh = { "make.sh", StrategyId::CustomScript },
        build_script = { "build", StrategyId::CustomScript },
        solution = { "App.sln", StrategyId::SolutionFile },
    )]
    fn test_signal_file_detected_only_by_its_strategy(file: &str, expected: StrategyId) {
        let (_dir, project) = project_with(&[file]);
        let options = DetectOptions::default();

        let detected: Vec<StrategyId> = default_strategies()
            .iter()
            .filter_map(|s| s.detect(&project, &options))
            .map(|d| d.strategy)
            .collect();

        assert_eq!(detected, vec![expected]);
    }

    #[test]
    fn test_detection_has_no_side_effects() {
        let (dir, project) = project_with(&["CMakeLists.txt", "build.sh"]);
        let before: Vec<_> = fs::read_dir(dir.path()).unwrap().map(|e| e.unwrap().path()).collect();

        for s in default_strategies() {
            s.detect(&project, &DetectOptions::default());
        }

        let after: Vec<_> = fs::read_dir(dir.path()).unwrap().map(|e| e.unwrap().path()).collect();
        assert_eq!(before.len(), after.len());
    }

    #[test]
    fn test_build_directory_named_build_is_not_a_script() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("build")).unwrap();
        let project = Project::new("demo", dir.path());

        assert!(strategy(StrategyId::CustomScript)
            .detect(&project, &DetectOptions::default())
            .is_none());
    }

    #[test]
    fn test_script_priority_follows_candidate_order() {
        let (_dir, project) = project_with(&["make.sh", "compile.sh"]);
        let detection = strategy(StrategyId::CustomScript)
            .detect(&project, &DetectOptions::default())
            .unwrap();
        assert!(detection.signal.ends_with("compile.sh"));
    }

    #[parameterized(
        src = { "src/CMakeLists.txt", "src" },
        source = { "Source/CMakeLists.txt", "Source" },
        repo_src = { "demo/src/CMakeLists.txt", "demo/src" },
        repo_dir = { "demo/CMakeLists.txt", "demo" },
    )]
    fn test_nested_cmake_detection(file: &str, build_root: &str) {
        let (dir, project) = project_with(&[file]);
        let detection = strategy(StrategyId::CMake)
            .detect(&project, &DetectOptions::default())
            .unwrap();
        assert_eq!(detection.build_root, dir.path().join(build_root));
    }

    #[test]
    fn test_owner_prefixed_checkout_name() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("jq/src")).unwrap();
        fs::write(dir.path().join("jq/src/Makefile"), "").unwrap();
        let project = Project::new("stedolan___jq", dir.path());

        let detection = strategy(StrategyId::Make)
            .detect(&project, &DetectOptions::default())
            .unwrap();
        assert_eq!(detection.build_root, dir.path().join("jq/src"));
    }

    #[test]
    fn test_root_wins_over_nested() {
        let (dir, project) = project_with(&["Makefile", "src/Makefile"]);
        let detection = strategy(StrategyId::Make)
            .detect(&project, &DetectOptions::default())
            .unwrap();
        assert_eq!(detection.build_root, dir.path());
    }

    #[test]
    fn test_deeply_nested_descriptor_is_not_found() {
        let (_dir, project) = project_with(&["third_party/lib/CMakeLists.txt"]);
        assert!(strategy(StrategyId::CMake)
            .detect(&project, &DetectOptions::default())
            .is_none());
    }

    #[test]
    fn test_root_only_strategies_ignore_subdirectories() {
        let (_dir, project) = project_with(&["src/SConstruct", "src/build.sh", "src/WORKSPACE"]);
        for id in [StrategyId::Scons, StrategyId::CustomScript, StrategyId::Bazel] {
            assert!(strategy(id).detect(&project, &DetectOptions::default()).is_none());
        }
    }

    #[test]
    fn test_solution_search_is_bounded() {
        let (_dir, project) = project_with(&["a/b/App.sln"]);
        let solution = strategy(StrategyId::SolutionFile);

        assert!(solution
            .detect(&project, &DetectOptions { solution_depth: 1 })
            .is_none());
        let detection = solution
            .detect(&project, &DetectOptions { solution_depth: 3 })
            .unwrap();
        assert!(detection.build_root.ends_with("a/b"));
    }

    #[test]
    fn test_jvm_plans_by_signal() {
        let (_dir, project) = project_with(&["pom.xml", "build.xml"]);
        let s = strategy(StrategyId::Gradle);
        let detection = s.detect(&project, &DetectOptions::default()).unwrap();
        let steps = s.plan(&detection).unwrap();
        let commands: Vec<String> = steps.iter().map(|s| s.describe()).collect();
        assert_eq!(commands, vec!["mvn -B clean", "mvn -B package"]);
    }

    #[tokio::test]
    async fn test_gradle_wrapper_preferred() {
        let (_dir, project) = project_with(&["build.gradle", "gradlew"]);
        let s = strategy(StrategyId::Gradle);
        let detection = s.detect(&project, &DetectOptions::default()).unwrap();
        let runner = MockRunner::new().on("./gradlew build", 1, "BUILD FAILED");

        let outcome = s.build(&detection, &runner, None).await;

        assert_eq!(outcome.reason(), Some("gradle build failed"));
        assert_eq!(runner.commands(), vec!["./gradlew clean", "./gradlew build"]);
    }

    #[tokio::test]
    async fn test_solution_file_missing_at_build_time() {
        let (dir, project) = project_with(&["App.sln"]);
        let s = strategy(StrategyId::SolutionFile);
        let detection = s.detect(&project, &DetectOptions::default()).unwrap();
        fs::remove_file(dir.path().join("App.sln")).unwrap();
        let runner = MockRunner::new();

        let outcome = s.build(&detection, &runner, None).await;

        assert_eq!(outcome.reason(), Some("no .sln file found"));
        assert_eq!(runner.invocation_count(), 0);
    }

    #[tokio::test]
    async fn test_solution_name_is_quoted() {
        let (_dir, project) = project_with(&["My App.sln"]);
        let s = strategy(StrategyId::SolutionFile);
        let detection = s.detect(&project, &DetectOptions::default()).unwrap();
        let runner = MockRunner::new();

        assert!(s.build(&detection, &runner, None).await.is_success());
        assert_eq!(runner.commands(), vec!["msbuild 'My App.sln'"]);
    }

    #[tokio::test]
    async fn test_autoreconf_failure_is_fatal() {
        let (_dir, project) = project_with(&["configure.ac"]);
        let s = strategy(StrategyId::Autotools);
        let detection = s.detect(&project, &DetectOptions::default()).unwrap();
        let runner = MockRunner::new().on(
            "autoreconf",
            1,
            "configure.ac:2: error: possibly undefined macro: AC_NOT_REAL\n",
        );

        let outcome = s.build(&detection, &runner, None).await;

        assert_eq!(outcome.reason(), Some("autoreconf failed"));
        assert!(outcome.unresolved_symbols.is_empty());
        assert_eq!(runner.invocation_count(), 1);
    }

    #[tokio::test]
    async fn test_make_sequence_with_configure() {
        let (_dir, project) = project_with(&["Makefile", "configure"]);
        let s = strategy(StrategyId::Make);
        let detection = s.detect(&project, &DetectOptions::default()).unwrap();
        let runner = MockRunner::new().on("./configure", 1, "configure: error: no C compiler");

        let outcome = s.build(&detection, &runner, None).await;

        assert!(outcome.is_success());
        assert_eq!(
            runner.commands(),
            vec!["make clean", "make distclean", "./configure", "make"]
        );
    }
}
