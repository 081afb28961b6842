//! Community issue reporting endpoints

use munlink_core::MunlinkResult;
use std::path::PathBuf;

use super::auth::file_part;
use crate::transport::ApiTransport;
use crate::types::{IssueCategory, IssueCategoryList, IssueList, IssueReport, NewIssueReport};

pub struct IssuesApi<'a> {
    transport: &'a ApiTransport,
}

impl<'a> IssuesApi<'a> {
    pub(crate) fn new(transport: &'a ApiTransport) -> Self {
        Self { transport }
    }

    pub async fn categories(&self) -> MunlinkResult<Vec<IssueCategory>> {
        let envelope: IssueCategoryList = self
            .transport
            .get_json("/api/issues/categories", "issue_categories")
            .await?;
        Ok(envelope.categories)
    }

    pub async fn list(&self) -> MunlinkResult<Vec<IssueReport>> {
        let envelope: IssueList = self.transport.get_json("/api/issues", "list_issues").await?;
        Ok(envelope.issues)
    }

    pub async fn get(&self, id: i64) -> MunlinkResult<IssueReport> {
        self.transport
            .get_json(&format!("/api/issues/{}", id), "get_issue")
            .await
    }

    pub async fn create(&self, report: &NewIssueReport) -> MunlinkResult<IssueReport> {
        self.transport
            .post_json("/api/issues", report, "create_issue")
            .await
    }

    pub async fn mine(&self) -> MunlinkResult<Vec<IssueReport>> {
        let envelope: IssueList = self.transport.get_json("/api/issues/my", "my_issues").await?;
        Ok(envelope.issues)
    }

    /// Attach photos to an issue report.
    pub async fn upload_photos(&self, id: i64, files: &[PathBuf]) -> MunlinkResult<IssueReport> {
        let mut form = reqwest::multipart::Form::new();
        for path in files {
            form = form.part("file", file_part(path).await?);
        }
        self.transport
            .post_multipart(&format!("/api/issues/{}/upload", id), form, "upload_issue_photos")
            .await
    }
}
