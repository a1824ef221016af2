//! # Backend Connection Capability
//!
//! The only assumptions the engine makes about a SQL backend.

use thiserror::Error;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors raised by a backend driver
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// No connection available right now; retried by the runner
    #[error("connection pool exhausted")]
    PoolExhausted,

    #[error("connect failed: {0}")]
    Connect(String),

    #[error("query execution failed: {0}")]
    Execution(String),

    #[error("row fetch failed: {0}")]
    Fetch(String),
}

impl BackendError {
    /// True for conditions worth retrying after a short sleep
    pub fn is_transient(&self) -> bool {
        matches!(self, BackendError::PoolExhausted)
    }
}

/// One result row: identity columns plus opaque payload blobs.
///
/// Family fields are `None` for summary scans.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    pub bucket_index: i64,
    pub summary_index: i64,
    pub allele_index: i64,
    pub family_index: Option<i64>,
    pub family_id: Option<String>,
    pub summary_data: Vec<u8>,
    pub family_data: Option<Vec<u8>>,
}

/// Factory for backend connections, shared by every runner
pub trait BackendConnector: Send + Sync {
    /// Opens a connection. `PoolExhausted` signals a transient shortage.
    fn connect(&self) -> BackendResult<Box<dyn BackendConnection>>;
}

/// A live connection owned by one runner at a time
pub trait BackendConnection: Send {
    /// Submits the query and returns without waiting for completion
    fn execute_async(&mut self, query: &str) -> BackendResult<()>;

    /// True while the submitted query is still running
    fn is_executing(&mut self) -> BackendResult<bool>;

    /// Next row, or `None` once the result set is exhausted
    fn fetch_one(&mut self) -> BackendResult<Option<Row>>;

    /// Releases the connection back to the driver
    fn close(&mut self);
}

/// Closes the wrapped connection when dropped, on every exit path.
pub struct ConnectionGuard {
    connection: Box<dyn BackendConnection>,
}

impl ConnectionGuard {
    pub fn new(connection: Box<dyn BackendConnection>) -> Self {
        Self { connection }
    }
}

impl std::ops::Deref for ConnectionGuard {
    type Target = dyn BackendConnection;

    fn deref(&self) -> &Self::Target {
        self.connection.as_ref()
    }
}

impl std::ops::DerefMut for ConnectionGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.connection.as_mut()
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.connection.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingConnection {
        closed: Arc<AtomicUsize>,
    }

    impl BackendConnection for CountingConnection {
        fn execute_async(&mut self, _query: &str) -> BackendResult<()> {
            Err(BackendError::Execution("boom".into()))
        }

        fn is_executing(&mut self) -> BackendResult<bool> {
            Ok(false)
        }

        fn fetch_one(&mut self) -> BackendResult<Option<Row>> {
            Ok(None)
        }

        fn close(&mut self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_only_pool_exhaustion_is_transient() {
        assert!(BackendError::PoolExhausted.is_transient());
        assert!(!BackendError::Connect("refused".into()).is_transient());
        assert!(!BackendError::Execution("syntax".into()).is_transient());
    }

    #[test]
    fn test_guard_closes_on_error_path() {
        let closed = Arc::new(AtomicUsize::new(0));
        let run = || -> BackendResult<()> {
            let mut guard = ConnectionGuard::new(Box::new(CountingConnection {
                closed: Arc::clone(&closed),
            }));
            guard.execute_async("SELECT 1")?;
            Ok(())
        };
        assert!(run().is_err());
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }
}
