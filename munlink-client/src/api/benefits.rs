//! Benefits program endpoints

use munlink_core::MunlinkResult;
use std::path::PathBuf;

use super::auth::file_part;
use crate::transport::ApiTransport;
use crate::types::{
    BenefitApplication, BenefitApplicationList, BenefitProgram, BenefitProgramList,
    NewBenefitApplication,
};

pub struct BenefitsApi<'a> {
    transport: &'a ApiTransport,
}

impl<'a> BenefitsApi<'a> {
    pub(crate) fn new(transport: &'a ApiTransport) -> Self {
        Self { transport }
    }

    pub async fn programs(&self) -> MunlinkResult<Vec<BenefitProgram>> {
        let envelope: BenefitProgramList = self
            .transport
            .get_json("/api/benefits/programs", "list_benefit_programs")
            .await?;
        Ok(envelope.programs)
    }

    pub async fn program(&self, id: i64) -> MunlinkResult<BenefitProgram> {
        self.transport
            .get_json(&format!("/api/benefits/programs/{}", id), "get_benefit_program")
            .await
    }

    pub async fn apply(&self, application: &NewBenefitApplication) -> MunlinkResult<BenefitApplication> {
        self.transport
            .post_json("/api/benefits/applications", application, "apply_for_benefit")
            .await
    }

    pub async fn my_applications(&self) -> MunlinkResult<Vec<BenefitApplication>> {
        let envelope: BenefitApplicationList = self
            .transport
            .get_json("/api/benefits/my-applications", "my_benefit_applications")
            .await?;
        Ok(envelope.applications)
    }

    /// Attach supporting documents to an application.
    pub async fn upload_docs(&self, id: i64, files: &[PathBuf]) -> MunlinkResult<BenefitApplication> {
        let mut form = reqwest::multipart::Form::new();
        for path in files {
            form = form.part("file", file_part(path).await?);
        }
        self.transport
            .post_multipart(
                &format!("/api/benefits/applications/{}/upload", id),
                form,
                "upload_benefit_docs",
            )
            .await
    }
}
