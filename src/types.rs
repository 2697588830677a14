use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

use serde::Deserialize;

/// Canonical task name type used throughout the crate.
pub type TaskName = String;

/// Boxed, `Send` future used at the trait seams (transforms, executors,
/// reload notifiers) so they stay object safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What a task does when its source globs match no file at all.
///
/// - `Ignore`: succeed silently with no output.
/// - `Warn`: succeed with no output, but log a warning.
/// - `Error`: fail the task with `TaskError::NoMatch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyMatchPolicy {
    Ignore,
    Warn,
    Error,
}

impl Default for EmptyMatchPolicy {
    fn default() -> Self {
        EmptyMatchPolicy::Warn
    }
}

impl FromStr for EmptyMatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ignore" => Ok(EmptyMatchPolicy::Ignore),
            "warn" => Ok(EmptyMatchPolicy::Warn),
            "error" => Ok(EmptyMatchPolicy::Error),
            other => Err(format!(
                "invalid empty match policy: {other} (expected \"ignore\", \"warn\" or \"error\")"
            )),
        }
    }
}
