//! Request generations for "last request wins" consumers.
//!
//! In-flight reads are never cancelled. A consumer stamps each request with
//! [`RouteSession::begin`] and drops any result whose generation is no longer current.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct RouteSession {
    generation: AtomicU64,
}

impl RouteSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new request and supersedes every earlier one.
    pub fn begin(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn current(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.current() == generation
    }

    /// Returns `value` only if `generation` is still the latest request.
    pub fn accept<T>(&self, generation: u64, value: T) -> Option<T> {
        if self.is_current(generation) {
            Some(value)
        } else {
            log::debug!(
                "Discarding result of superseded request {} (current {})",
                generation,
                self.current()
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_generations_increase() {
        let session = RouteSession::new();
        let first = session.begin();
        let second = session.begin();
        assert!(second > first);
        assert!(!session.is_current(first));
        assert!(session.is_current(second));
        assert_eq!(session.accept(first, "stale"), None);
        assert_eq!(session.accept(second, "fresh"), Some("fresh"));
    }

    #[tokio::test]
    async fn test_concurrent_begin_is_unique() {
        let session = Arc::new(RouteSession::new());
        let handles: Vec<_> = (0..32)
            .map(|_| {
                let session = session.clone();
                tokio::spawn(async move { session.begin() })
            })
            .collect();
        let mut seen = Vec::new();
        for handle in handles {
            seen.push(handle.await.unwrap());
        }
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 32);
        assert_eq!(session.current(), 32);
    }
}
