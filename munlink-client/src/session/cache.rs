//! Session-scoped access-token cache
//!
//! A fast mirror of the in-memory token for warm restores within one session.
//! The in-memory copy held by the session manager stays authoritative; the
//! cache only saves a network round trip when the client is rebuilt inside
//! the same browsing/process session.

use std::sync::{Mutex, PoisonError};

/// Storage backend for the token mirror.
///
/// Implementations must swallow their own failures. A broken cache degrades
/// to cold starts, never to errors surfaced at the call site.
pub trait TokenCache: Send + Sync {
    /// Read the cached token, if any.
    fn load(&self) -> Option<String>;
    /// Mirror a freshly installed token.
    fn store(&self, token: &str);
    /// Drop the cached token.
    fn clear(&self);
}

/// Default cache: lives exactly as long as the process, the way
/// session storage lives as long as the tab.
#[derive(Default)]
pub struct MemoryTokenCache {
    slot: Mutex<Option<String>>,
}

impl MemoryTokenCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenCache for MemoryTokenCache {
    fn load(&self) -> Option<String> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store(&self, token: &str) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
    }

    fn clear(&self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_and_clears() {
        let cache = MemoryTokenCache::new();
        assert_eq!(cache.load(), None);

        cache.store("tok");
        assert_eq!(cache.load().as_deref(), Some("tok"));

        cache.clear();
        assert_eq!(cache.load(), None);

        // Clearing an empty cache is a no-op, not an error.
        cache.clear();
        assert_eq!(cache.load(), None);
    }
}
