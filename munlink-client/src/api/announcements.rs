//! Municipal announcement endpoints (public, read-only)

use munlink_core::MunlinkResult;

use crate::transport::ApiTransport;
use crate::types::{Announcement, AnnouncementFilter, AnnouncementList};

pub struct AnnouncementsApi<'a> {
    transport: &'a ApiTransport,
}

impl<'a> AnnouncementsApi<'a> {
    pub(crate) fn new(transport: &'a ApiTransport) -> Self {
        Self { transport }
    }

    pub async fn list(&self, filter: &AnnouncementFilter) -> MunlinkResult<Vec<Announcement>> {
        let envelope: AnnouncementList = self
            .transport
            .get_json_with_query("/api/announcements", filter, "list_announcements")
            .await?;
        Ok(envelope.announcements)
    }

    pub async fn get(&self, id: i64) -> MunlinkResult<Announcement> {
        self.transport
            .get_json(&format!("/api/announcements/{}", id), "get_announcement")
            .await
    }
}
