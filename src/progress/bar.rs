//! Terminal progress bar

use super::{ProgressEvent, ProgressHandler};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub struct BarHandler {
    bar: ProgressBar,
}

impl BarHandler {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.blue.bold} [{elapsed_precise}] {bar:30.cyan/blue} {pos}/{len} {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    #[cfg(test)]
    fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }
}

impl Default for BarHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressHandler for BarHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Started { total } => self.bar.set_length(*total as u64),
            ProgressEvent::ProjectStarted { project } => self.bar.set_message(project.clone()),
            ProgressEvent::ProjectFinished { project, status, .. } => {
                self.bar.set_message(format!("{} {}", project, status));
                self.bar.inc(1);
            }
            ProgressEvent::Completed { successes, total, .. } => {
                self.bar
                    .finish_with_message(format!("{}/{} built", successes, total));
            }
        }
    }
}
