//! Access-token session lifecycle
//!
//! The session manager owns the in-memory access token, schedules pre-expiry
//! renewal, funnels every refresh through a single in-flight slot, and
//! restores sessions on startup from a session-scoped cache or the refresh
//! cookie.

pub mod cache;
pub mod claims;
pub mod manager;
pub mod refresh;

pub use cache::{MemoryTokenCache, TokenCache};
pub use claims::{decode_claims, TokenClaims};
pub use manager::{SessionEvent, SessionManager, REFRESH_SAFETY_MARGIN_SECS};
pub use refresh::{HttpRefreshTransport, RefreshTransport, CSRF_COOKIE_NAME};
