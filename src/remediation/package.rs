//! Header to package mapping

use crate::runner::CommandRunner;
use crate::strategy::recipe::shell_quote;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

static PACKAGE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9.+-]*$").expect("valid regex"));

/// Guess the development package that ships `header`.
///
/// `openssl/ssl.h` becomes `libssl-dev`, `libxml.h` becomes `libxml-dev`.
/// Returns `None` when the result would not be a valid package name.
pub fn guess_package_name(header: &str) -> Option<String> {
    let file = header.rsplit(['/', '\\']).next().unwrap_or(header);
    let stem = match file.rfind('.') {
        Some(idx) if idx > 0 => &file[..idx],
        _ => file,
    };
    let stem = stem.strip_prefix("lib").unwrap_or(stem).to_lowercase();

    if stem.is_empty() {
        return None;
    }

    let package = format!("lib{}-dev", stem);
    PACKAGE_NAME.is_match(&package).then_some(package)
}

/// Whether a package name is known to the system package manager
#[async_trait]
pub trait PackageResolver: Send + Sync {
    async fn can_resolve(&self, package: &str) -> bool;
}

/// Asks `apt-cache show`
pub struct AptCacheResolver {
    runner: Arc<dyn CommandRunner>,
    working_dir: PathBuf,
    timeout: Duration,
}

impl AptCacheResolver {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            working_dir: std::env::temp_dir(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[async_trait]
impl PackageResolver for AptCacheResolver {
    async fn can_resolve(&self, package: &str) -> bool {
        let command = format!("apt-cache show {}", shell_quote(package));
        let result = self
            .runner
            .run(&command, &self.working_dir, Some(self.timeout))
            .await;
        debug!(package, resolved = result.success(), "Checked package");
        result.success()
    }
}
