//! Municipality directory endpoints (public)

use munlink_core::MunlinkResult;

use crate::transport::ApiTransport;
use crate::types::{Barangay, BarangayList, Municipality, MunicipalityList};

pub struct MunicipalitiesApi<'a> {
    transport: &'a ApiTransport,
}

impl<'a> MunicipalitiesApi<'a> {
    pub(crate) fn new(transport: &'a ApiTransport) -> Self {
        Self { transport }
    }

    pub async fn list(&self) -> MunlinkResult<Vec<Municipality>> {
        let envelope: MunicipalityList = self
            .transport
            .get_json("/api/municipalities", "list_municipalities")
            .await?;
        Ok(envelope.municipalities)
    }

    pub async fn get(&self, id: i64) -> MunlinkResult<Municipality> {
        self.transport
            .get_json(&format!("/api/municipalities/{}", id), "get_municipality")
            .await
    }

    pub async fn get_by_slug(&self, slug: &str) -> MunlinkResult<Municipality> {
        self.transport
            .get_json(
                &format!("/api/municipalities/slug/{}", slug),
                "get_municipality_by_slug",
            )
            .await
    }

    pub async fn barangays(&self, municipality_id: i64) -> MunlinkResult<Vec<Barangay>> {
        let envelope: BarangayList = self
            .transport
            .get_json(
                &format!("/api/municipalities/{}/barangays", municipality_id),
                "list_barangays",
            )
            .await?;
        Ok(envelope.barangays)
    }
}
