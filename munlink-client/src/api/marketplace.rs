//! Peer-to-peer marketplace endpoints
//!
//! Items plus the dual-confirmation transaction lifecycle. The lifecycle
//! state machine itself is enforced server-side; this client only exposes
//! the calls and their payloads.

use munlink_core::MunlinkResult;
use serde::Deserialize;
use std::path::PathBuf;

use super::auth::file_part;
use crate::transport::ApiTransport;
use crate::types::{
    DisputeRequest, ItemFilter, ItemPage, MarketplaceItem, MessageResponse, MyTransactions,
    NewMarketplaceItem, NewTransaction, Transaction, TransactionAudit, TransactionNotes,
    TransactionProposal, UpdateMarketplaceItem,
};

#[derive(Debug, Deserialize)]
struct ItemEnvelope {
    item: MarketplaceItem,
}

#[derive(Debug, Deserialize)]
struct TransactionEnvelope {
    transaction: Transaction,
}

#[derive(Debug, Deserialize)]
struct MyItemsEnvelope {
    #[serde(default)]
    items: Vec<MarketplaceItem>,
}

pub struct MarketplaceApi<'a> {
    transport: &'a ApiTransport,
}

impl<'a> MarketplaceApi<'a> {
    pub(crate) fn new(transport: &'a ApiTransport) -> Self {
        Self { transport }
    }

    // -- items --------------------------------------------------------------

    pub async fn list_items(&self, filter: &ItemFilter) -> MunlinkResult<ItemPage> {
        self.transport
            .get_json_with_query("/api/marketplace/items", filter, "list_items")
            .await
    }

    pub async fn get_item(&self, id: i64) -> MunlinkResult<MarketplaceItem> {
        self.transport
            .get_json(&format!("/api/marketplace/items/{}", id), "get_item")
            .await
    }

    pub async fn create_item(&self, item: &NewMarketplaceItem) -> MunlinkResult<MarketplaceItem> {
        let envelope: ItemEnvelope = self
            .transport
            .post_json("/api/marketplace/items", item, "create_item")
            .await?;
        Ok(envelope.item)
    }

    pub async fn update_item(
        &self,
        id: i64,
        changes: &UpdateMarketplaceItem,
    ) -> MunlinkResult<MarketplaceItem> {
        let envelope: ItemEnvelope = self
            .transport
            .put_json(
                &format!("/api/marketplace/items/{}", id),
                changes,
                "update_item",
            )
            .await?;
        Ok(envelope.item)
    }

    pub async fn delete_item(&self, id: i64) -> MunlinkResult<MessageResponse> {
        self.transport
            .delete_json(&format!("/api/marketplace/items/{}", id), "delete_item")
            .await
    }

    pub async fn my_items(&self) -> MunlinkResult<Vec<MarketplaceItem>> {
        let envelope: MyItemsEnvelope = self
            .transport
            .get_json("/api/marketplace/my-items", "my_items")
            .await?;
        Ok(envelope.items)
    }

    /// Upload one or more listing photos for an item the caller owns.
    pub async fn upload_item_images(
        &self,
        id: i64,
        files: &[PathBuf],
    ) -> MunlinkResult<MarketplaceItem> {
        let mut form = reqwest::multipart::Form::new();
        for path in files {
            form = form.part("files", file_part(path).await?);
        }
        let envelope: ItemEnvelope = self
            .transport
            .post_multipart(
                &format!("/api/marketplace/items/{}/uploads", id),
                form,
                "upload_item_images",
            )
            .await?;
        Ok(envelope.item)
    }

    // -- transaction lifecycle ---------------------------------------------

    /// Express interest in an item; opens a transaction in its initial state.
    pub async fn create_transaction(
        &self,
        request: &NewTransaction,
    ) -> MunlinkResult<Transaction> {
        let envelope: TransactionEnvelope = self
            .transport
            .post_json("/api/marketplace/transactions", request, "create_transaction")
            .await?;
        Ok(envelope.transaction)
    }

    /// Seller proposes pickup terms.
    pub async fn propose(
        &self,
        id: i64,
        proposal: &TransactionProposal,
    ) -> MunlinkResult<Transaction> {
        let envelope: TransactionEnvelope = self
            .transport
            .post_json(
                &format!("/api/marketplace/transactions/{}/propose", id),
                proposal,
                "propose_transaction",
            )
            .await?;
        Ok(envelope.transaction)
    }

    /// Buyer accepts the proposed terms.
    pub async fn confirm(&self, id: i64) -> MunlinkResult<Transaction> {
        let envelope: TransactionEnvelope = self
            .transport
            .post_empty(
                &format!("/api/marketplace/transactions/{}/confirm", id),
                "confirm_transaction",
            )
            .await?;
        Ok(envelope.transaction)
    }

    /// Buyer declines the proposed terms.
    pub async fn reject_proposal(&self, id: i64) -> MunlinkResult<Transaction> {
        let envelope: TransactionEnvelope = self
            .transport
            .post_empty(
                &format!("/api/marketplace/transactions/{}/reject-buyer", id),
                "reject_proposal",
            )
            .await?;
        Ok(envelope.transaction)
    }

    /// Seller records the handover; completes when both parties have.
    pub async fn handover_seller(
        &self,
        id: i64,
        notes: &TransactionNotes,
    ) -> MunlinkResult<Transaction> {
        self.lifecycle_step(id, "handover-seller", notes, "handover_seller")
            .await
    }

    /// Buyer records the handover; completes when both parties have.
    pub async fn handover_buyer(
        &self,
        id: i64,
        notes: &TransactionNotes,
    ) -> MunlinkResult<Transaction> {
        self.lifecycle_step(id, "handover-buyer", notes, "handover_buyer")
            .await
    }

    /// Buyer records the return of a lent item.
    pub async fn return_buyer(
        &self,
        id: i64,
        notes: &TransactionNotes,
    ) -> MunlinkResult<Transaction> {
        self.lifecycle_step(id, "return-buyer", notes, "return_buyer")
            .await
    }

    /// Seller confirms the return of a lent item.
    pub async fn return_seller(
        &self,
        id: i64,
        notes: &TransactionNotes,
    ) -> MunlinkResult<Transaction> {
        self.lifecycle_step(id, "return-seller", notes, "return_seller")
            .await
    }

    pub async fn complete(&self, id: i64, notes: &TransactionNotes) -> MunlinkResult<Transaction> {
        self.lifecycle_step(id, "complete", notes, "complete_transaction")
            .await
    }

    pub async fn dispute(&self, id: i64, reason: &str) -> MunlinkResult<Transaction> {
        let envelope: TransactionEnvelope = self
            .transport
            .post_json(
                &format!("/api/marketplace/transactions/{}/dispute", id),
                &DisputeRequest {
                    reason: reason.to_string(),
                },
                "dispute_transaction",
            )
            .await?;
        Ok(envelope.transaction)
    }

    /// Audit trail of a transaction's state changes.
    pub async fn audit(&self, id: i64) -> MunlinkResult<TransactionAudit> {
        self.transport
            .get_json(
                &format!("/api/marketplace/transactions/{}/audit", id),
                "transaction_audit",
            )
            .await
    }

    pub async fn my_transactions(&self) -> MunlinkResult<MyTransactions> {
        self.transport
            .get_json("/api/marketplace/my-transactions", "my_transactions")
            .await
    }

    async fn lifecycle_step(
        &self,
        id: i64,
        step: &str,
        notes: &TransactionNotes,
        operation: &str,
    ) -> MunlinkResult<Transaction> {
        let envelope: TransactionEnvelope = self
            .transport
            .post_json(
                &format!("/api/marketplace/transactions/{}/{}", id, step),
                notes,
                operation,
            )
            .await?;
        Ok(envelope.transaction)
    }
}
