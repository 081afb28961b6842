//! Data transfer objects for the MunLink REST API
//!
//! Response structs are deliberately tolerant: the backend's `to_dict()`
//! serializers vary per endpoint and grow fields over time, so everything
//! beyond identity is optional and unknown fields are ignored. Timestamps are
//! kept as the backend's strings rather than parsed eagerly.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    /// Username or email; the backend accepts either under this key.
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    /// ISO date, e.g. "1990-01-31"
    pub date_of_birth: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub municipality_slug: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateProfileRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransferRequestBody {
    pub to_municipality_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub middle_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub suffix: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub municipality_id: Option<i64>,
    #[serde(default)]
    pub municipality: Option<Municipality>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub email_verified: Option<bool>,
    #[serde(default)]
    pub verification_status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub last_login: Option<String>,
}

/// Generic `{"message": ...}` acknowledgement.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

// ---------------------------------------------------------------------------
// Municipalities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Municipality {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Barangay {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MunicipalityList {
    #[serde(default)]
    pub municipalities: Vec<Municipality>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BarangayList {
    #[serde(default)]
    pub barangays: Vec<Barangay>,
}

// ---------------------------------------------------------------------------
// Announcements
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Announcement {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub municipality_id: Option<i64>,
    #[serde(default)]
    pub is_published: Option<bool>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnnouncementList {
    #[serde(default)]
    pub announcements: Vec<Announcement>,
    #[serde(default)]
    pub total: Option<i64>,
}

/// Filters for announcement listing.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnnouncementFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub municipality_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentType {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub fee: Option<f64>,
    #[serde(default)]
    pub processing_days: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentTypeList {
    #[serde(default)]
    pub types: Vec<DocumentType>,
    #[serde(default)]
    pub count: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewDocumentRequest {
    pub document_type_id: i64,
    pub municipality_id: i64,
    /// "pickup" or "delivery"
    pub delivery_method: String,
    pub purpose: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentRequest {
    pub id: i64,
    #[serde(default)]
    pub request_number: Option<String>,
    #[serde(default)]
    pub document_type_id: Option<i64>,
    #[serde(default)]
    pub document_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub delivery_method: Option<String>,
    #[serde(default)]
    pub municipality_id: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentRequestList {
    #[serde(default)]
    pub requests: Vec<DocumentRequest>,
}

// ---------------------------------------------------------------------------
// Marketplace
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct MarketplaceItem {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    /// "sell", "lend", or "donate"
    #[serde(default)]
    pub transaction_type: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub municipality_id: Option<i64>,
    #[serde(default)]
    pub municipality_name: Option<String>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
    #[serde(default)]
    pub view_count: Option<i64>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Paginated item listing envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemPage {
    #[serde(default)]
    pub items: Vec<MarketplaceItem>,
    #[serde(default)]
    pub total: i64,
    #[serde(default)]
    pub page: i64,
    #[serde(default)]
    pub per_page: i64,
    #[serde(default)]
    pub pages: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ItemFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub municipality_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewMarketplaceItem {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub municipality_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateMarketplaceItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Transaction {
    pub id: i64,
    #[serde(default)]
    pub item_id: Option<i64>,
    #[serde(default)]
    pub buyer_id: Option<i64>,
    #[serde(default)]
    pub seller_id: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub pickup_at: Option<String>,
    #[serde(default)]
    pub pickup_location: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewTransaction {
    pub item_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Pickup terms attached when the seller proposes a meeting.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionProposal {
    /// RFC3339 timestamp
    pub pickup_at: String,
    pub pickup_location: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TransactionNotes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DisputeRequest {
    pub reason: String,
}

/// `my-transactions` groups by the caller's side of each deal.
#[derive(Debug, Clone, Deserialize)]
pub struct MyTransactions {
    #[serde(default)]
    pub as_buyer: Vec<Transaction>,
    #[serde(default)]
    pub as_seller: Vec<Transaction>,
}

/// Audit trail of a transaction; entry shape is backend-defined and still
/// evolving, so entries stay loosely typed.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionAudit {
    #[serde(default)]
    pub events: Vec<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Issues
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct IssueCategory {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueCategoryList {
    #[serde(default)]
    pub categories: Vec<IssueCategory>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueReport {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub municipality_id: Option<i64>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub photos: Option<Vec<String>>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueList {
    #[serde(default)]
    pub issues: Vec<IssueReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewIssueReport {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub municipality_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

// ---------------------------------------------------------------------------
// Benefits
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct BenefitProgram {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub municipality_id: Option<i64>,
    #[serde(default)]
    pub deadline: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BenefitProgramList {
    #[serde(default)]
    pub programs: Vec<BenefitProgram>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BenefitApplication {
    pub id: i64,
    #[serde(default)]
    pub program_id: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BenefitApplicationList {
    #[serde(default)]
    pub applications: Vec<BenefitApplication>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewBenefitApplication {
    pub program_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_response_tolerates_extra_fields() {
        let body = r#"{
            "message": "Login successful",
            "access_token": "abc",
            "refresh_token": "def",
            "user": {"id": 7, "username": "ana", "role": "resident", "unknown_field": true}
        }"#;
        let parsed: LoginResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.access_token, "abc");
        assert_eq!(parsed.user.username, "ana");
        assert_eq!(parsed.user.role.as_deref(), Some("resident"));
    }

    #[test]
    fn item_page_defaults_missing_pagination() {
        let body = r#"{"items": [{"id": 1, "title": "Bike"}]}"#;
        let page: ItemPage = serde_json::from_str(body).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total, 0);
    }

    #[test]
    fn optional_request_fields_are_omitted() {
        let body = NewMarketplaceItem {
            title: "Bike".to_string(),
            description: "Blue bike".to_string(),
            price: Some(1500.0),
            category: None,
            transaction_type: None,
            municipality_id: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("category").is_none());
        assert_eq!(json["price"], 1500.0);
    }

    #[test]
    fn my_transactions_tolerates_empty_shape() {
        let parsed: MyTransactions = serde_json::from_str(r#"{}"#).unwrap();
        assert!(parsed.as_buyer.is_empty());
        assert!(parsed.as_seller.is_empty());
    }
}
