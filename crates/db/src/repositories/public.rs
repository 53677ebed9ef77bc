//! Token-scoped invoice access for clients.
//!
//! Callers here hold only a bearer token. Every lookup goes through the
//! token hash, so nothing outside the token's invoice is reachable.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect, Set,
    TransactionTrait,
};
use serde::Serialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use receipta_core::LedgerError;
use receipta_core::audit::{AuditEvent, AuditEventType, AuditSink};
use receipta_core::invoice::{InvoiceStateMachine, SignInput, validate_signature};
use receipta_core::token::{LedgerSettings, LinkType, check_link};

use crate::entities::{invoice_signatures, invoices};

use super::invoice::{InvoiceWithItems, load_items};
use super::link::{AccessTokenRepository, link_state};
use super::{db_err, is_unique_violation};

/// Result of a successful signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedInvoice {
    /// Invoice, now SIGNED.
    pub invoice: invoices::Model,
    /// Stored signature.
    pub signature: invoice_signatures::Model,
}

/// Public invoice repository.
#[derive(Clone)]
pub struct PublicInvoiceRepository {
    db: DatabaseConnection,
    tokens: AccessTokenRepository,
    audit: Arc<dyn AuditSink>,
}

impl PublicInvoiceRepository {
    /// Creates a new public invoice repository.
    #[must_use]
    pub fn new(db: DatabaseConnection, settings: LedgerSettings, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            tokens: AccessTokenRepository::new(db.clone(), settings),
            db,
            audit,
        }
    }

    /// Returns the invoice behind a VIEW token.
    ///
    /// # Errors
    ///
    /// * `NotFound` - unknown, revoked, or SIGN token
    /// * `TokenExpired` - the token has expired
    #[instrument(skip_all)]
    pub async fn view_invoice(&self, raw_token: &str) -> Result<InvoiceWithItems, LedgerError> {
        let invoice = self.tokens.resolve(raw_token, LinkType::View).await?;
        let items = load_items(&self.db, invoice.id).await?;
        Ok(InvoiceWithItems { invoice, items })
    }

    /// Signs the invoice behind a SIGN token.
    ///
    /// Serialized on the invoice row lock. The second of two concurrent
    /// signers sees the stored signature and gets `AlreadySigned`. On success
    /// the invoice is locked and its SIGN links are revoked.
    ///
    /// # Errors
    ///
    /// * `Validation` - signer input is incomplete
    /// * `NotFound` - unknown or revoked token
    /// * `TokenExpired` - the token has expired
    /// * `AlreadySigned` - a signature exists
    /// * `Locked(NotSent)` / `Locked(Voided)` - the invoice cannot be signed
    #[instrument(skip_all)]
    pub async fn sign(
        &self,
        raw_token: &str,
        input: SignInput,
    ) -> Result<SignedInvoice, LedgerError> {
        let signer = validate_signature(&input)?;

        let txn = self.db.begin().await.map_err(db_err)?;

        let link = AccessTokenRepository::find_in(&txn, raw_token, LinkType::Sign)
            .await?
            .ok_or(LedgerError::NotFound("Invoice"))?;

        let invoice = invoices::Entity::find_by_id(link.invoice_id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or(LedgerError::NotFound("Invoice"))?;

        let existing = invoice_signatures::Entity::find()
            .filter(invoice_signatures::Column::InvoiceId.eq(invoice.id))
            .one(&txn)
            .await
            .map_err(db_err)?;
        if existing.is_some() {
            warn!(invoice_id = %invoice.id, "invoice already signed");
            return Err(LedgerError::AlreadySigned);
        }

        let now = Utc::now();
        check_link(&link_state(&link), now)?;
        let next = InvoiceStateMachine::sign(invoice.status.into(), false)
            .inspect_err(|e| warn!(error = %e, "sign rejected"))?;

        let signature = invoice_signatures::ActiveModel {
            id: Set(Uuid::new_v4()),
            business_id: Set(invoice.business_id),
            invoice_id: Set(invoice.id),
            signer_name: Set(signer.signer_name),
            signer_email: Set(signer.signer_email),
            signature_image: Set(input.signature_image),
            signed_at: Set(now.into()),
            ip_address: Set(input.ip_address),
            user_agent: Set(input.user_agent),
            document_hash: Set(signer.document_hash),
            created_at: Set(now.into()),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                LedgerError::AlreadySigned
            } else {
                db_err(e)
            }
        })?;

        let business_id = invoice.business_id;
        let mut active: invoices::ActiveModel = invoice.into();
        active.status = Set(next.into());
        active.signed_at = Set(Some(now.into()));
        active.locked_at = Set(Some(now.into()));
        active.updated_at = Set(now.into());
        let invoice = active.update(&txn).await.map_err(db_err)?;

        AccessTokenRepository::revoke_active_in(&txn, invoice.id, LinkType::Sign, now).await?;

        txn.commit().await.map_err(db_err)?;

        info!(invoice_id = %invoice.id, "invoice signed");
        self.audit.record(AuditEvent::invoice(
            business_id,
            None,
            invoice.id,
            AuditEventType::InvoiceSigned,
            json!({
                "signerEmail": signature.signer_email,
                "documentHash": signature.document_hash,
            }),
        ));

        Ok(SignedInvoice { invoice, signature })
    }
}
