use super::{CommandResult, CommandRunner, CommandStatus};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// Scripted runner for deterministic tests.
///
/// Commands are matched against rules in insertion order by substring; the
/// first rule with budget left decides the exit code and output. Unmatched
/// commands use the default exit code. Every invocation is recorded.
pub struct MockRunner {
    rules: Mutex<Vec<Rule>>,
    default_exit_code: i32,
    invocations: Mutex<Vec<RecordedInvocation>>,
}

struct Rule {
    pattern: String,
    status: CommandStatus,
    output: String,
    remaining: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedInvocation {
    pub command: String,
    pub working_dir: PathBuf,
}

impl MockRunner {
    /// Unmatched commands succeed
    pub fn new() -> Self {
        Self::with_default_exit_code(0)
    }

    /// Unmatched commands fail with exit code 1
    pub fn failing_by_default() -> Self {
        Self::with_default_exit_code(1)
    }

    fn with_default_exit_code(default_exit_code: i32) -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            default_exit_code,
            invocations: Mutex::new(Vec::new()),
        }
    }

    /// Commands containing `pattern` exit with `exit_code` and print `output`
    pub fn on(self, pattern: impl Into<String>, exit_code: i32, output: impl Into<String>) -> Self {
        self.push_rule(pattern.into(), CommandStatus::Exited(exit_code), output.into(), None);
        self
    }

    /// Commands containing `pattern` end with `status` instead of exiting
    pub fn on_status(
        self,
        pattern: impl Into<String>,
        status: CommandStatus,
        output: impl Into<String>,
    ) -> Self {
        self.push_rule(pattern.into(), status, output.into(), None);
        self
    }

    /// Like [`MockRunner::on`] but only for the next `times` matching commands
    pub fn on_times(
        self,
        pattern: impl Into<String>,
        times: usize,
        exit_code: i32,
        output: impl Into<String>,
    ) -> Self {
        self.push_rule(pattern.into(), CommandStatus::Exited(exit_code), output.into(), Some(times));
        self
    }

    fn push_rule(&self, pattern: String, status: CommandStatus, output: String, remaining: Option<usize>) {
        self.rules.lock().unwrap().push(Rule {
            pattern,
            status,
            output,
            remaining,
        });
    }

    pub fn invocations(&self) -> Vec<RecordedInvocation> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.invocations()
            .into_iter()
            .map(|i| i.command)
            .collect()
    }

    pub fn invocation_count(&self) -> usize {
        self.invocations.lock().unwrap().len()
    }

    /// Number of recorded commands containing `pattern`
    pub fn count_matching(&self, pattern: &str) -> usize {
        self.invocations
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.command.contains(pattern))
            .count()
    }
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn run(
        &self,
        command: &str,
        working_dir: &Path,
        _timeout: Option<Duration>,
    ) -> CommandResult {
        self.invocations.lock().unwrap().push(RecordedInvocation {
            command: command.to_string(),
            working_dir: working_dir.to_path_buf(),
        });

        let (status, output) = {
            let mut rules = self.rules.lock().unwrap();
            let matched = rules
                .iter_mut()
                .find(|rule| command.contains(&rule.pattern) && rule.remaining != Some(0));
            match matched {
                Some(rule) => {
                    if let Some(remaining) = rule.remaining.as_mut() {
                        *remaining -= 1;
                    }
                    (rule.status, rule.output.clone())
                }
                None => (CommandStatus::Exited(self.default_exit_code), String::new()),
            }
        };

        CommandResult {
            command: command.to_string(),
            working_dir: working_dir.to_path_buf(),
            status,
            output,
            duration: Duration::from_millis(1),
        }
    }
}
