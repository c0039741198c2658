//! Fan-out joins over independently failable operations.
//!
//! Two join policies are chosen per call site:
//!
//! - [`join_strict`]: every member must succeed; the first rejection is returned and
//!   the outcomes of the other members are not reported.
//! - [`join_best_effort`]: every member is awaited and its [`Outcome`] recorded, so the
//!   caller decides whether to report or discard failures.
//!
//! All members are issued before any is awaited; no ordering between them is implied.

use anyhow::Result;
use futures::future::{join_all, try_join_all};
use std::future::Future;

/// Result of a single best-effort fan-out member.
#[derive(Debug)]
pub enum Outcome<T> {
    /// The member completed
    Succeeded(T),
    /// The member failed; the flow continued without it
    Failed(anyhow::Error),
}

impl<T> Outcome<T> {
    /// Whether the member completed.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    /// The failure, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Succeeded(_) => None,
            Self::Failed(err) => Some(err),
        }
    }
}

impl<T> From<Result<T>> for Outcome<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(value) => Self::Succeeded(value),
            Err(err) => Self::Failed(err),
        }
    }
}

/// Await every future, failing on the first rejection.
///
/// # Errors
///
/// Returns the first error produced by any member.
pub async fn join_strict<I, F, T>(futures: I) -> Result<Vec<T>>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T>>,
{
    try_join_all(futures).await
}

/// Await every future, recording each member's outcome in input order.
pub async fn join_best_effort<I, F, T>(futures: I) -> Vec<Outcome<T>>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T>>,
{
    join_all(futures).await.into_iter().map(Outcome::from).collect()
}

/// Log every failed outcome at warn level and return the number of failures.
pub fn warn_failures<T>(label: &str, outcomes: &[Outcome<T>]) -> usize {
    let mut failed = 0;
    for err in outcomes.iter().filter_map(Outcome::error) {
        failed += 1;
        tracing::warn!("{label}: {err:#}");
    }
    failed
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn member(n: u32) -> Result<u32> {
        if n % 2 == 0 { Ok(n) } else { Err(anyhow::anyhow!("odd {n}")) }
    }

    #[tokio::test]
    async fn test_strict_join_surfaces_failure() {
        let result = join_strict((0..4).map(member)).await;
        assert!(result.is_err());

        let ok = join_strict([0, 2, 4].map(member)).await.unwrap();
        assert_eq!(ok, vec![0, 2, 4]);
    }

    #[tokio::test]
    async fn test_best_effort_join_keeps_every_outcome() {
        let outcomes = join_best_effort((0..4).map(member)).await;
        assert_eq!(outcomes.len(), 4);
        assert!(outcomes[0].is_success());
        assert!(!outcomes[1].is_success());
        assert_eq!(warn_failures("test", &outcomes), 2);
    }
}
