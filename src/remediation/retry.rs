//! Bounded rebuild loop for missing-dependency failures

use super::{AdviceRequest, Advisor, RemediationAction, Remedy};
use crate::project::Project;
use crate::selector::StrategySelector;
use crate::strategy::recipe::shell_quote;
use crate::strategy::BuildOutcome;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_INSTALL_COMMAND: &str = "sudo apt-get install -y {package}";

/// Final outcome of a project plus how it was reached
#[derive(Debug, Clone)]
pub struct RetryOutcome {
    pub outcome: BuildOutcome,
    /// Selector invocations, at least 1
    pub attempts: usize,
    /// Remedies that ran successfully across all iterations
    pub remedies_applied: usize,
    /// The loop stopped because no new remedy could be applied
    pub stalled: bool,
}

pub struct RetryLoop {
    selector: Arc<StrategySelector>,
    advisor: Arc<dyn Advisor>,
    install_command: String,
}

impl RetryLoop {
    pub fn new(selector: Arc<StrategySelector>, advisor: Arc<dyn Advisor>) -> Self {
        Self {
            selector,
            advisor,
            install_command: DEFAULT_INSTALL_COMMAND.to_string(),
        }
    }

    /// Template for package remedies; `{package}` is replaced by the package name
    pub fn with_install_command(mut self, template: impl Into<String>) -> Self {
        self.install_command = template.into();
        self
    }

    pub fn selector(&self) -> &Arc<StrategySelector> {
        &self.selector
    }

    pub async fn retry_build(&self, project: &Project, max_attempts: usize) -> RetryOutcome {
        let max_attempts = max_attempts.max(1);
        let mut tried: HashSet<String> = HashSet::new();
        let mut prior: Option<RemediationAction> = None;
        let mut remedies_applied = 0;
        let mut stalled = false;

        let mut outcome = self.selector.select_and_build(project).await;
        let mut attempts = 1;

        while outcome.is_missing_dependency() && attempts < max_attempts {
            info!(
                project = %project.name,
                attempt = attempts,
                max_attempts,
                symbols = ?outcome.unresolved_symbols,
                "Attempting remediation"
            );

            let actions = self
                .remediate(project, &outcome, attempts, max_attempts, &mut tried, prior.as_ref())
                .await;
            let applied = actions.iter().filter(|a| a.applied).count();

            if applied == 0 {
                warn!(project = %project.name, attempt = attempts, "Remediation stalled, no new remedy applied");
                stalled = true;
                break;
            }

            remedies_applied += applied;
            prior = actions.into_iter().rev().find(|a| a.applied);

            outcome = self.selector.select_and_build(project).await;
            attempts += 1;
        }

        if outcome.is_missing_dependency() && !stalled {
            info!(project = %project.name, attempts, "Attempt budget exhausted");
        }

        RetryOutcome {
            outcome,
            attempts,
            remedies_applied,
            stalled,
        }
    }

    async fn remediate(
        &self,
        project: &Project,
        outcome: &BuildOutcome,
        attempt: usize,
        max_attempts: usize,
        tried: &mut HashSet<String>,
        prior: Option<&RemediationAction>,
    ) -> Vec<RemediationAction> {
        let mut actions = Vec::new();

        for symbol in &outcome.unresolved_symbols {
            let request = AdviceRequest {
                project: project.name.clone(),
                symbol: symbol.clone(),
                log_content: outcome.output.clone(),
                prior_command: prior.map(|a| a.command.clone()),
                prior_output: prior.map(|a| a.output.clone()),
                attempt,
                max_attempts,
            };

            let remedy = match self.advisor.suggest(&request).await {
                Ok(Some(remedy)) => remedy,
                Ok(None) => {
                    debug!(project = %project.name, symbol = %symbol, advisor = self.advisor.name(), "No remedy suggested");
                    continue;
                }
                Err(e) => {
                    warn!(project = %project.name, symbol = %symbol, error = %e, "Advisor failed");
                    continue;
                }
            };

            let command = self.command_for(&remedy);
            if command.trim().is_empty() || !tried.insert(command.clone()) {
                debug!(project = %project.name, command = %command, "Skipping remedy already tried");
                continue;
            }

            info!(project = %project.name, symbol = %symbol, command = %command, "Applying remedy");
            let result = self
                .selector
                .runner()
                .run(&command, &project.root, self.selector.options().timeout)
                .await;

            if result.success() {
                info!(project = %project.name, command = %command, "Remedy applied");
            } else {
                warn!(
                    project = %project.name,
                    command = %command,
                    exit_code = result.return_code(),
                    "Remedy failed"
                );
            }

            actions.push(RemediationAction {
                symbol: symbol.clone(),
                remedy,
                command,
                applied: result.success(),
                output: result.output,
            });
        }

        actions
    }

    fn command_for(&self, remedy: &Remedy) -> String {
        match remedy {
            Remedy::Command(command) => command.clone(),
            Remedy::Package(package) => self
                .install_command
                .replace("{package}", &shell_quote(package)),
        }
    }
}
