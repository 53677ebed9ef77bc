//! Payment and reversal ledger.
//!
//! Ledger lines are append-only. Each line gets its own receipt, numbered
//! from the RECEIPT counter of the payment's year, in the same transaction.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use receipta_core::LedgerError;
use receipta_core::audit::{AuditEvent, AuditEventType, AuditSink};
use receipta_core::invoice::InvoiceStatus;
use receipta_core::payment::{
    PaymentContext, PaymentInput, PaymentPlan, paid_total, plan_payment, plan_reversal,
};
use receipta_core::sequence::{SequenceKey, format_document_number};

use crate::entities::{businesses, invoices, payments, receipts};

use super::db_err;
use super::invoice::{find_invoice, ledger_lines, lock_invoice};
use super::sequence::SequenceRepository;

/// A ledger line with its receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentWithReceipt {
    /// Payment row.
    pub payment: payments::Model,
    /// Receipt row.
    pub receipt: Option<receipts::Model>,
}

/// Result of recording a payment or reversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordedPayment {
    /// New ledger line.
    pub payment: payments::Model,
    /// Receipt issued for it.
    pub receipt: receipts::Model,
    /// Invoice after the status update.
    pub invoice: invoices::Model,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Payment,
    Reversal,
}

/// Payment ledger repository.
#[derive(Clone)]
pub struct PaymentRepository {
    db: DatabaseConnection,
    audit: Arc<dyn AuditSink>,
}

impl PaymentRepository {
    /// Creates a new payment repository.
    #[must_use]
    pub fn new(db: DatabaseConnection, audit: Arc<dyn AuditSink>) -> Self {
        Self { db, audit }
    }

    /// Records a positive payment and issues its receipt.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The invoice is not found or is voided
    /// - The amount or method is invalid
    /// - The payment would exceed the total and overpay is disabled
    #[instrument(skip(self, input), fields(amount = %input.amount))]
    pub async fn record_payment(
        &self,
        business_id: Uuid,
        actor_user_id: Option<Uuid>,
        invoice_id: Uuid,
        input: PaymentInput,
    ) -> Result<RecordedPayment, LedgerError> {
        self.record(business_id, actor_user_id, invoice_id, &input, LineKind::Payment)
            .await
    }

    /// Records a reversal: a negative line with its own receipt.
    ///
    /// The invoice status is left unchanged.
    #[instrument(skip(self, input), fields(amount = %input.amount))]
    pub async fn record_reversal(
        &self,
        business_id: Uuid,
        actor_user_id: Option<Uuid>,
        invoice_id: Uuid,
        input: PaymentInput,
    ) -> Result<RecordedPayment, LedgerError> {
        self.record(business_id, actor_user_id, invoice_id, &input, LineKind::Reversal)
            .await
    }

    /// Lists an invoice's ledger lines with receipts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the invoice does not belong to the business.
    pub async fn list_payments(
        &self,
        business_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<Vec<PaymentWithReceipt>, LedgerError> {
        let invoice = find_invoice(&self.db, business_id, invoice_id).await?;
        Self::load_ledger(&self.db, invoice.id).await
    }

    pub(crate) async fn load_ledger<C>(
        conn: &C,
        invoice_id: Uuid,
    ) -> Result<Vec<PaymentWithReceipt>, LedgerError>
    where
        C: ConnectionTrait,
    {
        let rows = payments::Entity::find()
            .filter(payments::Column::InvoiceId.eq(invoice_id))
            .find_also_related(receipts::Entity)
            .order_by_desc(payments::Column::PaidAt)
            .order_by_desc(payments::Column::CreatedAt)
            .all(conn)
            .await
            .map_err(db_err)?;

        Ok(rows
            .into_iter()
            .map(|(payment, receipt)| PaymentWithReceipt { payment, receipt })
            .collect())
    }

    async fn record(
        &self,
        business_id: Uuid,
        actor_user_id: Option<Uuid>,
        invoice_id: Uuid,
        input: &PaymentInput,
        kind: LineKind,
    ) -> Result<RecordedPayment, LedgerError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let invoice = lock_invoice(&txn, business_id, invoice_id).await?;

        let business = businesses::Entity::find_by_id(business_id)
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or(LedgerError::NotFound("Business"))?;

        let ctx = PaymentContext {
            status: invoice.status.into(),
            total: invoice.total,
            paid_total: paid_total(&ledger_lines(&txn, invoice.id).await?),
            allow_overpay: business.allow_overpay,
        };

        let now = Utc::now();
        let plan = match kind {
            LineKind::Payment => plan_payment(&ctx, input, now),
            LineKind::Reversal => plan_reversal(&ctx, input, now),
        }
        .inspect_err(|e| warn!(error = %e, "payment rejected"))?;

        let (payment, receipt) = insert_line(&txn, &invoice, &business, &plan).await?;

        let invoice = match plan.next_status {
            Some(status) => {
                let mut active: invoices::ActiveModel = invoice.into();
                active.status = Set(status.into());
                active.updated_at = Set(now.into());
                active.update(&txn).await.map_err(db_err)?
            }
            None => invoice,
        };

        txn.commit().await.map_err(db_err)?;

        info!(
            payment_id = %payment.id,
            receipt_no = %receipt.receipt_no,
            paid_after = %plan.paid_after,
            balance_after = %plan.balance_after,
            status = %InvoiceStatus::from(invoice.status),
            "ledger line recorded"
        );
        let event_type = match kind {
            LineKind::Payment => AuditEventType::PaymentCreated,
            LineKind::Reversal => AuditEventType::PaymentReversal,
        };
        self.audit.record(AuditEvent::payment(
            business_id,
            actor_user_id,
            payment.id,
            event_type,
            json!({
                "invoiceId": invoice.id,
                "amount": payment.amount,
                "receiptNo": receipt.receipt_no,
            }),
        ));

        Ok(RecordedPayment {
            payment,
            receipt,
            invoice,
        })
    }
}

async fn insert_line<C>(
    conn: &C,
    invoice: &invoices::Model,
    business: &businesses::Model,
    plan: &PaymentPlan,
) -> Result<(payments::Model, receipts::Model), LedgerError>
where
    C: ConnectionTrait,
{
    let created_at = Utc::now().into();
    let payment = payments::ActiveModel {
        id: Set(Uuid::new_v4()),
        business_id: Set(invoice.business_id),
        invoice_id: Set(invoice.id),
        amount: Set(plan.signed_amount),
        method: Set(plan.method.clone()),
        paid_at: Set(plan.paid_at.into()),
        note: Set(plan.note.clone()),
        is_reversal: Set(plan.is_reversal),
        created_at: Set(created_at),
    }
    .insert(conn)
    .await
    .map_err(db_err)?;

    let sequence = SequenceRepository::next_in(
        conn,
        invoice.business_id,
        SequenceKey::Receipt,
        plan.receipt_period,
    )
    .await?;

    let receipt = receipts::ActiveModel {
        id: Set(Uuid::new_v4()),
        business_id: Set(invoice.business_id),
        invoice_id: Set(invoice.id),
        payment_id: Set(payment.id),
        receipt_no: Set(format_document_number(
            &business.business_code,
            SequenceKey::Receipt,
            plan.receipt_period,
            sequence,
        )),
        amount: Set(plan.signed_amount),
        balance_after: Set(plan.balance_after),
        created_at: Set(created_at),
    }
    .insert(conn)
    .await
    .map_err(db_err)?;

    Ok((payment, receipt))
}
