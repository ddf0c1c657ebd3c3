//! # Navigation source abstraction.
//!
//! The host adapter reports the current page path and every navigation through
//! [`NavigationSource`]. [`NavigationChannel`] is a ready-made broadcast-backed
//! implementation the adapter can feed from whatever history hooks it has.

use std::sync::{Mutex, MutexGuard};

use tokio::sync::broadcast;

/// Current page path plus a stream of navigations.
pub trait NavigationSource: Send + Sync + 'static {
    /// Path of the page currently shown (e.g. `/tests/mbti/`).
    fn current_path(&self) -> String;

    /// Receives the new path after each navigation.
    fn subscribe(&self) -> broadcast::Receiver<String>;
}

/// In-process [`NavigationSource`] fed by [`NavigationChannel::navigate`].
pub struct NavigationChannel {
    current: Mutex<String>,
    tx: broadcast::Sender<String>,
}

impl NavigationChannel {
    pub fn new(initial_path: impl Into<String>) -> Self {
        let (tx, _rx) = broadcast::channel(64);
        Self {
            current: Mutex::new(initial_path.into()),
            tx,
        }
    }

    /// Records a navigation and notifies subscribers.
    pub fn navigate(&self, path: impl Into<String>) {
        let path = path.into();
        *self.current() = path.clone();
        let _ = self.tx.send(path);
    }

    fn current(&self) -> MutexGuard<'_, String> {
        self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl NavigationSource for NavigationChannel {
    fn current_path(&self) -> String {
        self.current().clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_navigate_updates_path_and_notifies() {
        let nav = NavigationChannel::new("/");
        let mut rx = nav.subscribe();

        nav.navigate("/fortune/daily/");

        assert_eq!(nav.current_path(), "/fortune/daily/");
        assert_eq!(rx.recv().await.unwrap(), "/fortune/daily/");
    }

    #[test]
    fn test_navigate_without_subscribers() {
        let nav = NavigationChannel::new("/");
        nav.navigate("/tarot/");
        assert_eq!(nav.current_path(), "/tarot/");
    }
}
