//! Scoped sessions around collaborator calls.
//!
//! Every validator, lint and backend invocation runs inside a session that is
//! acquired right before the call and released when the [`SessionGuard`] is
//! dropped, on success and failure alike. A session is never held across two
//! operations.

use crate::BoxError;
use std::fmt;
use tracing::{debug, trace};
use uuid::Uuid;

/// Source of scoped sessions.
pub trait SessionProvider: Send + Sync {
    /// Acquire a session for a single call. `purpose` names the call
    /// (`"get"`, `"lint"`, `"validate_name"`, ...).
    fn acquire(&self, purpose: &'static str) -> Result<SessionGuard, BoxError>;
}

type ReleaseHook = Box<dyn FnOnce() + Send>;

/// Live session; released on drop.
pub struct SessionGuard {
    id: Uuid,
    purpose: &'static str,
    on_release: Option<ReleaseHook>,
}

impl SessionGuard {
    pub fn new(purpose: &'static str) -> Self {
        let id = Uuid::new_v4();
        trace!(session = %id, purpose, "session acquired");
        Self {
            id,
            purpose,
            on_release: None,
        }
    }

    /// Run `hook` when the session is released.
    pub fn on_release<F>(mut self, hook: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_release = Some(Box::new(hook));
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn purpose(&self) -> &'static str {
        self.purpose
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Some(hook) = self.on_release.take() {
            hook();
        }
        trace!(session = %self.id, purpose = self.purpose, "session released");
    }
}

impl fmt::Debug for SessionGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionGuard")
            .field("id", &self.id)
            .field("purpose", &self.purpose)
            .finish_non_exhaustive()
    }
}

/// In-process session with nothing to set up beyond a tracing id.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalSession;

impl SessionProvider for LocalSession {
    fn acquire(&self, purpose: &'static str) -> Result<SessionGuard, BoxError> {
        Ok(SessionGuard::new(purpose))
    }
}

/// Run `f` inside a session from `provider`.
///
/// Acquire failures and failures of `f` come back the same way; the caller
/// maps both to its own error kind.
pub fn scoped<T, F>(
    provider: &dyn SessionProvider,
    purpose: &'static str,
    f: F,
) -> Result<T, BoxError>
where
    F: FnOnce() -> Result<T, BoxError>,
{
    let guard = provider.acquire(purpose)?;
    debug!(session = %guard.id(), purpose, "running scoped call");
    let result = f();
    drop(guard);
    result
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Counts sessions and can be told to refuse them.
    #[derive(Debug, Default)]
    pub struct CountingSession {
        pub acquired: Arc<AtomicUsize>,
        pub released: Arc<AtomicUsize>,
        pub refuse: bool,
    }

    impl CountingSession {
        pub fn refusing() -> Self {
            Self {
                refuse: true,
                ..Self::default()
            }
        }

        pub fn acquired(&self) -> usize {
            self.acquired.load(Ordering::SeqCst)
        }

        pub fn released(&self) -> usize {
            self.released.load(Ordering::SeqCst)
        }
    }

    impl SessionProvider for CountingSession {
        fn acquire(&self, purpose: &'static str) -> Result<SessionGuard, BoxError> {
            if self.refuse {
                return Err(format!("session refused for {}", purpose).into());
            }
            self.acquired.fetch_add(1, Ordering::SeqCst);
            let released = Arc::clone(&self.released);
            Ok(SessionGuard::new(purpose).on_release(move || {
                released.fetch_add(1, Ordering::SeqCst);
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::CountingSession;
    use super::*;

    #[test]
    fn test_session_released_on_success() {
        let sessions = CountingSession::default();
        let value = scoped(&sessions, "get", || Ok(7)).unwrap();
        assert_eq!(value, 7);
        assert_eq!(sessions.acquired(), 1);
        assert_eq!(sessions.released(), 1);
    }

    #[test]
    fn test_session_released_on_failure() {
        let sessions = CountingSession::default();
        let result: Result<(), BoxError> = scoped(&sessions, "replace", || Err("boom".into()));
        assert!(result.is_err());
        assert_eq!(sessions.acquired(), 1);
        assert_eq!(sessions.released(), 1);
    }

    #[test]
    fn test_refused_session_skips_call() {
        let sessions = CountingSession::refusing();
        let mut called = false;
        let result = scoped(&sessions, "list", || {
            called = true;
            Ok(())
        });
        assert!(result.is_err());
        assert!(!called);
    }
}
