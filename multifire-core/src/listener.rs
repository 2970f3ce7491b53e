//! Snapshot listener plumbing shared by the helpers and the backends.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::fmt;

use tracing::warn;

use crate::error::FirebaseError;

type NextFn<T> = Box<dyn FnMut(T) + Send>;
type ErrorFn = Box<dyn FnMut(FirebaseError) + Send>;

/// Callbacks receiving the deliveries of one listener.
///
/// `on_next` gets every snapshot; `on_error` gets listener failures. Without an error callback,
/// failures are logged.
pub struct Observer<T> {
    on_next: NextFn<T>,
    on_error: Option<ErrorFn>,
}

impl<T> Observer<T> {
    pub fn new(on_next: impl FnMut(T) + Send + 'static) -> Self {
        Self {
            on_next: Box::new(on_next),
            on_error: None,
        }
    }

    pub fn on_error(mut self, on_error: impl FnMut(FirebaseError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(on_error));
        self
    }

    pub fn next(&mut self, value: T) {
        (self.on_next)(value)
    }

    pub fn error(&mut self, error: FirebaseError) {
        match self.on_error.as_mut() {
            Some(on_error) => on_error(error),
            None => warn!(%error, "unhandled snapshot listener error"),
        }
    }
}

impl<T> fmt::Debug for Observer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Handle returned by every subscription.
///
/// Calling [`remove`](Self::remove) stops further deliveries; calling it again has no effect.
/// Dropping the handle does not cancel the listener. Clones share the same state, which is how
/// a backend observes the cancellation.
#[derive(Debug, Clone, Default)]
#[must_use = "a listener keeps delivering until `remove` is called"]
pub struct ListenerRegistration {
    removed: Arc<AtomicBool>,
}

impl ListenerRegistration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stops the listener. Idempotent.
    pub fn remove(&self) {
        self.removed.store(true, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        !self.removed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn remove_is_idempotent_and_shared() {
        let registration = ListenerRegistration::new();
        let backend_side = registration.clone();

        assert!(backend_side.is_active());
        registration.remove();
        registration.remove();
        assert!(!backend_side.is_active());
    }

    #[test]
    fn observer_routes_errors() {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = errors.clone();
        let mut observer = Observer::new(|_: u32| {})
            .on_error(move |e| sink.lock().unwrap().push(e));

        observer.error(FirebaseError::PermissionDenied("users".into()));
        // no error callback: logged, not panicking
        Observer::new(|_: u32| {}).error(FirebaseError::Unavailable("offline".into()));

        assert_eq!(
            *errors.lock().unwrap(),
            vec![FirebaseError::PermissionDenied("users".into())]
        );
    }
}
