//! Document request endpoints

use munlink_core::MunlinkResult;
use serde::Deserialize;
use std::path::PathBuf;

use super::auth::file_part;
use crate::transport::ApiTransport;
use crate::types::{DocumentRequest, DocumentRequestList, DocumentType, DocumentTypeList, NewDocumentRequest};

#[derive(Debug, Deserialize)]
struct RequestEnvelope {
    request: DocumentRequest,
}

pub struct DocumentsApi<'a> {
    transport: &'a ApiTransport,
}

impl<'a> DocumentsApi<'a> {
    pub(crate) fn new(transport: &'a ApiTransport) -> Self {
        Self { transport }
    }

    /// Document types residents can request (public).
    pub async fn types(&self) -> MunlinkResult<Vec<DocumentType>> {
        let envelope: DocumentTypeList = self
            .transport
            .get_json("/api/documents/types", "list_document_types")
            .await?;
        Ok(envelope.types)
    }

    /// File a new document request in the caller's registered municipality.
    pub async fn create_request(
        &self,
        request: &NewDocumentRequest,
    ) -> MunlinkResult<DocumentRequest> {
        let envelope: RequestEnvelope = self
            .transport
            .post_json("/api/documents/requests", request, "create_document_request")
            .await?;
        Ok(envelope.request)
    }

    pub async fn my_requests(&self) -> MunlinkResult<Vec<DocumentRequest>> {
        let envelope: DocumentRequestList = self
            .transport
            .get_json("/api/documents/my-requests", "my_document_requests")
            .await?;
        Ok(envelope.requests)
    }

    pub async fn get_request(&self, id: i64) -> MunlinkResult<DocumentRequest> {
        let envelope: RequestEnvelope = self
            .transport
            .get_json(
                &format!("/api/documents/requests/{}", id),
                "get_document_request",
            )
            .await?;
        Ok(envelope.request)
    }

    /// Attach supporting documents to an existing request.
    pub async fn upload_supporting_docs(
        &self,
        id: i64,
        files: &[PathBuf],
    ) -> MunlinkResult<DocumentRequest> {
        let mut form = reqwest::multipart::Form::new();
        for path in files {
            form = form.part("file", file_part(path).await?);
        }
        let envelope: RequestEnvelope = self
            .transport
            .post_multipart(
                &format!("/api/documents/requests/{}/upload", id),
                form,
                "upload_supporting_docs",
            )
            .await?;
        Ok(envelope.request)
    }

    /// Claim ticket payload for a ready request. Shape is backend-defined
    /// (print layout data), so it stays loosely typed.
    pub async fn claim_ticket(&self, id: i64) -> MunlinkResult<serde_json::Value> {
        self.transport
            .get_json(
                &format!("/api/documents/requests/{}/claim-ticket", id),
                "claim_ticket",
            )
            .await
    }

    /// Public verification of a document request by its request number.
    pub async fn public_verify(&self, request_number: &str) -> MunlinkResult<serde_json::Value> {
        // Request numbers can carry slashes, so encode the segment.
        let encoded = urlencoding::encode(request_number);
        self.transport
            .get_json(&format!("/api/documents/verify/{}", encoded), "public_verify")
            .await
    }
}
