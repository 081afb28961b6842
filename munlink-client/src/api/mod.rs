//! Typed endpoint groups over the authenticated transport
//!
//! One file per backend domain, mirroring how the platform groups its
//! routes. Each group is a cheap borrow of the shared transport; obtain them
//! from [`MunlinkClient`].

use munlink_core::MunlinkResult;
use std::sync::Arc;

use crate::config::ClientConfig;
use crate::session::{
    HttpRefreshTransport, MemoryTokenCache, SessionEvent, SessionManager, TokenCache,
};
use crate::transport::ApiTransport;

pub mod announcements;
pub mod auth;
pub mod benefits;
pub mod documents;
pub mod issues;
pub mod marketplace;
pub mod municipalities;

pub use announcements::AnnouncementsApi;
pub use auth::{AuthApi, VerificationDocs};
pub use benefits::BenefitsApi;
pub use documents::DocumentsApi;
pub use issues::IssuesApi;
pub use marketplace::MarketplaceApi;
pub use municipalities::MunicipalitiesApi;

/// Client for the MunLink municipal platform API.
///
/// Owns one session manager and one HTTP client with a shared cookie jar;
/// every endpoint group issues requests through the same authenticated
/// transport, so the bearer header and refresh-on-401 behavior are uniform.
pub struct MunlinkClient {
    transport: Arc<ApiTransport>,
    session: SessionManager,
}

impl MunlinkClient {
    pub fn new(config: ClientConfig) -> MunlinkResult<Self> {
        Self::with_cache(config, Box::new(MemoryTokenCache::new()))
    }

    /// Build with a custom token cache (for hosts that can offer a
    /// session-scoped store of their own).
    pub fn with_cache(config: ClientConfig, cache: Box<dyn TokenCache>) -> MunlinkResult<Self> {
        let cookies = Arc::new(reqwest::cookie::Jar::default());
        let base_url = config.parse_base_url()?;
        let http = config.build_http_client(Arc::clone(&cookies))?;

        let refresh = Arc::new(HttpRefreshTransport::new(
            http.clone(),
            cookies,
            base_url.clone(),
        ));
        let session = SessionManager::new(refresh, cache);
        let transport = Arc::new(ApiTransport::new(http, base_url, session.clone()));

        Ok(Self { transport, session })
    }

    /// The session manager behind this client.
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Restore a session at startup; see [`SessionManager::bootstrap`].
    pub async fn bootstrap(&self) -> bool {
        self.session.bootstrap().await
    }

    /// Subscribe to session lifecycle events.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<SessionEvent> {
        self.session.subscribe()
    }

    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi::new(&self.transport)
    }

    pub fn municipalities(&self) -> MunicipalitiesApi<'_> {
        MunicipalitiesApi::new(&self.transport)
    }

    pub fn announcements(&self) -> AnnouncementsApi<'_> {
        AnnouncementsApi::new(&self.transport)
    }

    pub fn documents(&self) -> DocumentsApi<'_> {
        DocumentsApi::new(&self.transport)
    }

    pub fn marketplace(&self) -> MarketplaceApi<'_> {
        MarketplaceApi::new(&self.transport)
    }

    pub fn issues(&self) -> IssuesApi<'_> {
        IssuesApi::new(&self.transport)
    }

    pub fn benefits(&self) -> BenefitsApi<'_> {
        BenefitsApi::new(&self.transport)
    }
}
