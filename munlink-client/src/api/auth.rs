//! Authentication and account endpoints

use munlink_core::MunlinkResult;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::transport::ApiTransport;
use crate::types::{
    ChangePasswordRequest, LoginRequest, LoginResponse, MessageResponse, RegisterRequest,
    TransferRequestBody, UpdateProfileRequest, UserProfile,
};

/// Identity documents accepted at registration or later verification.
#[derive(Debug, Default, Clone)]
pub struct VerificationDocs {
    pub valid_id_front: Option<PathBuf>,
    pub valid_id_back: Option<PathBuf>,
    pub selfie_with_id: Option<PathBuf>,
    pub municipality_slug: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProfileEnvelope {
    user: UserProfile,
}

pub struct AuthApi<'a> {
    transport: &'a ApiTransport,
}

impl<'a> AuthApi<'a> {
    pub(crate) fn new(transport: &'a ApiTransport) -> Self {
        Self { transport }
    }

    /// Register a new resident account. Email verification happens
    /// out-of-band; the account is not logged in by this call.
    pub async fn register(&self, request: &RegisterRequest) -> MunlinkResult<MessageResponse> {
        self.transport
            .post_json("/api/auth/register", request, "register")
            .await
    }

    /// Register with identity documents attached, as one multipart call.
    pub async fn register_with_docs(
        &self,
        request: &RegisterRequest,
        docs: &VerificationDocs,
    ) -> MunlinkResult<MessageResponse> {
        let mut form = reqwest::multipart::Form::new();
        if let serde_json::Value::Object(fields) = serde_json::to_value(request)? {
            for (key, value) in fields {
                let text = match value {
                    serde_json::Value::String(text) => text,
                    other => other.to_string(),
                };
                form = form.text(key, text);
            }
        }
        if let Some(slug) = &docs.municipality_slug {
            form = form.text("municipality_slug", slug.clone());
        }
        for (field, path) in [
            ("valid_id_front", &docs.valid_id_front),
            ("valid_id_back", &docs.valid_id_back),
            ("selfie_with_id", &docs.selfie_with_id),
        ] {
            if let Some(path) = path {
                form = form.part(field, file_part(path).await?);
            }
        }
        self.transport
            .post_multipart("/api/auth/register", form, "register_with_docs")
            .await
    }

    /// Log in and install the session: the returned access token is set as
    /// current and its renewal scheduled; the refresh credential lands in the
    /// shared cookie jar automatically.
    pub async fn login(&self, request: &LoginRequest) -> MunlinkResult<LoginResponse> {
        let response: LoginResponse = self
            .transport
            .post_json("/api/auth/login", request, "login")
            .await?;
        self.transport
            .session()
            .set_session_access_token(Some(response.access_token.as_str()));
        info!(username = %response.user.username, "Logged in");
        Ok(response)
    }

    /// Log out server-side, then tear the local session down regardless of
    /// what the backend answered.
    pub async fn logout(&self) -> MunlinkResult<MessageResponse> {
        let result = self
            .transport
            .post_empty("/api/auth/logout", "logout")
            .await;
        self.transport.session().clear();
        result
    }

    pub async fn profile(&self) -> MunlinkResult<UserProfile> {
        self.transport.get_json("/api/auth/profile", "profile").await
    }

    pub async fn update_profile(&self, request: &UpdateProfileRequest) -> MunlinkResult<UserProfile> {
        let envelope: ProfileEnvelope = self
            .transport
            .put_json("/api/auth/profile", request, "update_profile")
            .await?;
        Ok(envelope.user)
    }

    pub async fn change_password(
        &self,
        request: &ChangePasswordRequest,
    ) -> MunlinkResult<MessageResponse> {
        self.transport
            .post_json("/api/auth/change-password", request, "change_password")
            .await
    }

    pub async fn resend_verification(&self) -> MunlinkResult<MessageResponse> {
        self.transport
            .post_empty("/api/auth/resend-verification", "resend_verification")
            .await
    }

    /// Ask to move the account to another municipality.
    pub async fn request_transfer(
        &self,
        request: &TransferRequestBody,
    ) -> MunlinkResult<MessageResponse> {
        self.transport
            .post_json("/api/auth/transfer", request, "request_transfer")
            .await
    }

    /// Upload identity documents for account verification.
    pub async fn upload_verification_docs(
        &self,
        docs: &VerificationDocs,
    ) -> MunlinkResult<MessageResponse> {
        let mut form = reqwest::multipart::Form::new();
        if let Some(slug) = &docs.municipality_slug {
            form = form.text("municipality_slug", slug.clone());
        }
        for (field, path) in [
            ("valid_id_front", &docs.valid_id_front),
            ("valid_id_back", &docs.valid_id_back),
            ("selfie_with_id", &docs.selfie_with_id),
        ] {
            if let Some(path) = path {
                form = form.part(field, file_part(path).await?);
            }
        }
        self.transport
            .post_multipart("/api/auth/verification-docs", form, "upload_verification_docs")
            .await
    }
}

/// Read a file into a multipart part, preserving its file name.
pub(crate) async fn file_part(path: &Path) -> MunlinkResult<reqwest::multipart::Part> {
    let bytes = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    Ok(reqwest::multipart::Part::bytes(bytes).file_name(file_name))
}
