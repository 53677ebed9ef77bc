//! Invoice ledger repository.
//!
//! Owner-side invoice operations. Each mutation locks the invoice row, asks
//! `InvoiceStateMachine` whether the move is legal, writes, commits, and only
//! then emits its audit event.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use receipta_core::LedgerError;
use receipta_core::audit::{AuditEvent, AuditEventType, AuditSink};
use receipta_core::invoice::{
    CreateInvoiceInput, InvoiceHeader, InvoiceStateMachine, InvoiceStatus, RevisionSource,
    UpdateInvoiceInput, plan_revision, prepare_create, prepare_update,
};
use receipta_core::money::PricedLine;
use receipta_core::payment::{LedgerLine, paid_total};
use receipta_core::sequence::{SequenceKey, format_document_number, period_of};
use receipta_core::token::{LedgerSettings, LinkType};
use receipta_shared::{PageRequest, PageResponse};

use crate::entities::{
    businesses, clients, invoice_items, invoice_links, invoice_signatures, invoices, payments,
};

use super::link::{AccessTokenRepository, IssuedToken};
use super::payment::{PaymentRepository, PaymentWithReceipt};
use super::sequence::SequenceRepository;
use super::db_err;

/// Invoice header plus its ordered items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceWithItems {
    /// Invoice row.
    pub invoice: invoices::Model,
    /// Items ordered by position.
    pub items: Vec<invoice_items::Model>,
}

/// Everything stored about one invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceDetail {
    /// Invoice row.
    pub invoice: invoices::Model,
    /// Items ordered by position.
    pub items: Vec<invoice_items::Model>,
    /// Signature, if signed.
    pub signature: Option<invoice_signatures::Model>,
    /// Ledger lines with receipts, newest first.
    pub payments: Vec<PaymentWithReceipt>,
    /// Link history (hashes only).
    pub links: Vec<invoice_links::Model>,
}

/// Result of sending an invoice. The raw tokens are shown exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentInvoice {
    /// Updated invoice.
    pub invoice: invoices::Model,
    /// Public view token.
    pub view: IssuedToken,
    /// Public sign token.
    pub sign: IssuedToken,
}

/// Invoice ledger repository.
#[derive(Clone)]
pub struct InvoiceRepository {
    db: DatabaseConnection,
    settings: LedgerSettings,
    audit: Arc<dyn AuditSink>,
}

impl InvoiceRepository {
    /// Creates a new invoice repository.
    #[must_use]
    pub fn new(db: DatabaseConnection, settings: LedgerSettings, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            db,
            settings,
            audit,
        }
    }

    /// Creates a DRAFT invoice with a freshly minted number.
    ///
    /// The number comes from the INVOICE counter of the issue date's year, and
    /// the business's current brand color is copied onto the row.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Business or client is not found
    /// - Items or header fields are invalid
    /// - Sequence allocation fails
    #[instrument(skip(self, input), fields(client_id = %input.client_id))]
    pub async fn create(
        &self,
        business_id: Uuid,
        actor_user_id: Option<Uuid>,
        input: CreateInvoiceInput,
    ) -> Result<InvoiceWithItems, LedgerError> {
        let draft = prepare_create(&input, Utc::now().date_naive())?;

        let txn = self.db.begin().await.map_err(db_err)?;

        let business = businesses::Entity::find_by_id(business_id)
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or(LedgerError::NotFound("Business"))?;

        let client = clients::Entity::find_by_id(input.client_id)
            .filter(clients::Column::BusinessId.eq(business_id))
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or(LedgerError::NotFound("Client"))?;

        let period = period_of(draft.header.issue_date);
        let sequence =
            SequenceRepository::next_in(&txn, business_id, SequenceKey::Invoice, period).await?;
        let invoice_no = format_document_number(
            &business.business_code,
            SequenceKey::Invoice,
            period,
            sequence,
        );

        let now = Utc::now().into();
        let header = draft.header;
        let totals = draft.priced.totals;
        let invoice = invoices::ActiveModel {
            id: Set(Uuid::new_v4()),
            business_id: Set(business_id),
            client_id: Set(client.id),
            original_invoice_id: Set(None),
            invoice_no: Set(invoice_no),
            version: Set(1),
            status: Set(InvoiceStatus::Draft.into()),
            issue_date: Set(header.issue_date),
            due_date: Set(header.due_date),
            currency: Set(header.currency),
            notes: Set(header.notes),
            invoice_kind: Set(header.invoice_kind.map(Into::into)),
            service_period: Set(header.service_period),
            service_unit: Set(header.service_unit.map(Into::into)),
            tax_rate: Set(header.tax_rate),
            subtotal: Set(totals.subtotal),
            tax_total: Set(totals.tax_total),
            total: Set(totals.total),
            brand_color: Set(business.brand_color.clone()),
            sent_at: Set(None),
            signed_at: Set(None),
            locked_at: Set(None),
            voided_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;

        let items = insert_items(&txn, &invoice, &draft.priced.lines).await?;

        txn.commit().await.map_err(db_err)?;

        info!(
            invoice_id = %invoice.id,
            invoice_no = %invoice.invoice_no,
            total = %invoice.total,
            "invoice created"
        );
        self.audit.record(AuditEvent::invoice(
            business_id,
            actor_user_id,
            invoice.id,
            AuditEventType::InvoiceCreated,
            json!({ "invoiceNo": invoice.invoice_no, "total": invoice.total }),
        ));

        Ok(InvoiceWithItems { invoice, items })
    }

    /// Returns the invoice with items, signature, ledger lines and links.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the invoice does not belong to the business.
    pub async fn get(
        &self,
        business_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<InvoiceDetail, LedgerError> {
        let invoice = find_invoice(&self.db, business_id, invoice_id).await?;
        let items = load_items(&self.db, invoice.id).await?;

        let signature = invoice_signatures::Entity::find()
            .filter(invoice_signatures::Column::InvoiceId.eq(invoice.id))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        let payments = PaymentRepository::load_ledger(&self.db, invoice.id).await?;

        let links = invoice_links::Entity::find()
            .filter(invoice_links::Column::InvoiceId.eq(invoice.id))
            .order_by_desc(invoice_links::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(InvoiceDetail {
            invoice,
            items,
            signature,
            payments,
            links,
        })
    }

    /// Lists invoices, newest first, optionally filtered by status.
    pub async fn list(
        &self,
        business_id: Uuid,
        status: Option<InvoiceStatus>,
        page: PageRequest,
    ) -> Result<PageResponse<invoices::Model>, LedgerError> {
        let mut query = invoices::Entity::find().filter(invoices::Column::BusinessId.eq(business_id));
        if let Some(status) = status {
            query = query.filter(
                invoices::Column::Status
                    .eq(crate::entities::sea_orm_active_enums::InvoiceStatus::from(status)),
            );
        }

        let total = query.clone().count(&self.db).await.map_err(db_err)?;
        let data = query
            .order_by_desc(invoices::Column::CreatedAt)
            .order_by_desc(invoices::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(PageResponse::new(data, page, total))
    }

    /// Returns every version in the invoice's revision chain, oldest first.
    ///
    /// Works from any member of the chain.
    pub async fn list_versions(
        &self,
        business_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<Vec<invoices::Model>, LedgerError> {
        let invoice = find_invoice(&self.db, business_id, invoice_id).await?;
        let root = invoice.original_invoice_id.unwrap_or(invoice.id);

        invoices::Entity::find()
            .filter(invoices::Column::BusinessId.eq(business_id))
            .filter(
                Condition::any()
                    .add(invoices::Column::Id.eq(root))
                    .add(invoices::Column::OriginalInvoiceId.eq(root)),
            )
            .order_by_asc(invoices::Column::Version)
            .all(&self.db)
            .await
            .map_err(db_err)
    }

    /// Replaces a draft's items and recomputes its totals.
    ///
    /// Omitted header fields keep their value. The invoice number is kept.
    ///
    /// # Errors
    ///
    /// Returns `Locked(NotDraft)` once the invoice has left DRAFT.
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        business_id: Uuid,
        actor_user_id: Option<Uuid>,
        invoice_id: Uuid,
        input: UpdateInvoiceInput,
    ) -> Result<InvoiceWithItems, LedgerError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let invoice = lock_invoice(&txn, business_id, invoice_id).await?;

        InvoiceStateMachine::ensure_editable(invoice.status.into())
            .inspect_err(|e| warn!(error = %e, "update rejected"))?;
        let draft = prepare_update(&header_of(&invoice), &input)?;

        invoice_items::Entity::delete_many()
            .filter(invoice_items::Column::InvoiceId.eq(invoice.id))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        let header = draft.header;
        let totals = draft.priced.totals;
        let mut active: invoices::ActiveModel = invoice.into();
        active.issue_date = Set(header.issue_date);
        active.due_date = Set(header.due_date);
        active.currency = Set(header.currency);
        active.notes = Set(header.notes);
        active.invoice_kind = Set(header.invoice_kind.map(Into::into));
        active.service_period = Set(header.service_period);
        active.service_unit = Set(header.service_unit.map(Into::into));
        active.tax_rate = Set(header.tax_rate);
        active.subtotal = Set(totals.subtotal);
        active.tax_total = Set(totals.tax_total);
        active.total = Set(totals.total);
        active.updated_at = Set(Utc::now().into());
        let invoice = active.update(&txn).await.map_err(db_err)?;

        let items = insert_items(&txn, &invoice, &draft.priced.lines).await?;

        txn.commit().await.map_err(db_err)?;

        info!(total = %invoice.total, "invoice updated");
        self.audit.record(AuditEvent::invoice(
            business_id,
            actor_user_id,
            invoice.id,
            AuditEventType::InvoiceUpdated,
            json!({ "total": invoice.total }),
        ));

        Ok(InvoiceWithItems { invoice, items })
    }

    /// Sends a draft: revokes old links, mints one VIEW and one SIGN token
    /// sharing one expiry, and moves the invoice to SENT.
    ///
    /// # Errors
    ///
    /// Returns `Locked(NotDraft)` unless the invoice is a draft.
    #[instrument(skip(self))]
    pub async fn send(
        &self,
        business_id: Uuid,
        actor_user_id: Option<Uuid>,
        invoice_id: Uuid,
    ) -> Result<SentInvoice, LedgerError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let invoice = lock_invoice(&txn, business_id, invoice_id).await?;

        let next = InvoiceStateMachine::send(invoice.status.into())
            .inspect_err(|e| warn!(error = %e, "send rejected"))?;

        let now = Utc::now();
        let expires_at = self.settings.link_expiry(now)?;
        let bytes = self.settings.token_bytes;
        let view =
            AccessTokenRepository::issue_in(&txn, &invoice, LinkType::View, bytes, expires_at)
                .await?;
        let sign =
            AccessTokenRepository::issue_in(&txn, &invoice, LinkType::Sign, bytes, expires_at)
                .await?;

        let mut active: invoices::ActiveModel = invoice.into();
        active.status = Set(next.into());
        active.sent_at = Set(Some(now.into()));
        active.updated_at = Set(now.into());
        let invoice = active.update(&txn).await.map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;

        info!(expires_at = %expires_at, "invoice sent");
        self.audit.record(AuditEvent::invoice(
            business_id,
            actor_user_id,
            invoice.id,
            AuditEventType::InvoiceSent,
            json!({ "expiresAt": expires_at }),
        ));

        Ok(SentInvoice {
            invoice,
            view,
            sign,
        })
    }

    /// Drafts a new version of a locked invoice.
    ///
    /// The source row is not touched. The revision copies client, currency,
    /// due date, tax, notes, service fields, items, totals and brand color;
    /// it is issued today and numbered from today's INVOICE counter.
    ///
    /// # Errors
    ///
    /// Returns `Locked(AlreadyDraft)` when the source is still a draft.
    #[instrument(skip(self))]
    pub async fn revise(
        &self,
        business_id: Uuid,
        actor_user_id: Option<Uuid>,
        invoice_id: Uuid,
    ) -> Result<InvoiceWithItems, LedgerError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let source = find_invoice(&txn, business_id, invoice_id).await?;

        let plan = plan_revision(
            &RevisionSource {
                id: source.id,
                version: source.version,
                original_invoice_id: source.original_invoice_id,
                status: source.status.into(),
            },
            Utc::now().date_naive(),
        )
        .inspect_err(|e| warn!(error = %e, "revision rejected"))?;

        let business = businesses::Entity::find_by_id(business_id)
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or(LedgerError::NotFound("Business"))?;

        let period = period_of(plan.issue_date);
        let sequence =
            SequenceRepository::next_in(&txn, business_id, SequenceKey::Invoice, period).await?;
        let invoice_no = format_document_number(
            &business.business_code,
            SequenceKey::Invoice,
            period,
            sequence,
        );

        let source_items = load_items(&txn, source.id).await?;
        let lines: Vec<PricedLine> = source_items.iter().map(priced_line).collect();

        let now = Utc::now().into();
        let revision = invoices::ActiveModel {
            id: Set(Uuid::new_v4()),
            business_id: Set(business_id),
            client_id: Set(source.client_id),
            original_invoice_id: Set(Some(plan.original_invoice_id)),
            invoice_no: Set(invoice_no),
            version: Set(plan.version),
            status: Set(plan.status.into()),
            issue_date: Set(plan.issue_date),
            due_date: Set(source.due_date),
            currency: Set(source.currency.clone()),
            notes: Set(source.notes.clone()),
            invoice_kind: Set(source.invoice_kind),
            service_period: Set(source.service_period.clone()),
            service_unit: Set(source.service_unit),
            tax_rate: Set(source.tax_rate),
            subtotal: Set(source.subtotal),
            tax_total: Set(source.tax_total),
            total: Set(source.total),
            brand_color: Set(source.brand_color.clone()),
            sent_at: Set(None),
            signed_at: Set(None),
            locked_at: Set(None),
            voided_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;

        let items = insert_items(&txn, &revision, &lines).await?;

        txn.commit().await.map_err(db_err)?;

        info!(
            revision_id = %revision.id,
            version = revision.version,
            invoice_no = %revision.invoice_no,
            "invoice revised"
        );
        self.audit.record(AuditEvent::invoice(
            business_id,
            actor_user_id,
            revision.id,
            AuditEventType::InvoiceRevised,
            json!({ "originalInvoiceId": source.id, "version": revision.version }),
        ));

        Ok(InvoiceWithItems {
            invoice: revision,
            items,
        })
    }

    /// Voids an unsigned invoice with no ledger lines.
    ///
    /// # Errors
    ///
    /// Returns `Locked` naming the reason: `Signed`, `HasPayments` or `Voided`.
    #[instrument(skip(self))]
    pub async fn void(
        &self,
        business_id: Uuid,
        actor_user_id: Option<Uuid>,
        invoice_id: Uuid,
    ) -> Result<invoices::Model, LedgerError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let invoice = lock_invoice(&txn, business_id, invoice_id).await?;

        let signatures = invoice_signatures::Entity::find()
            .filter(invoice_signatures::Column::InvoiceId.eq(invoice.id))
            .count(&txn)
            .await
            .map_err(db_err)?;
        let payment_count = payments::Entity::find()
            .filter(payments::Column::InvoiceId.eq(invoice.id))
            .count(&txn)
            .await
            .map_err(db_err)?;

        let next = InvoiceStateMachine::void(invoice.status.into(), signatures > 0, payment_count)
            .inspect_err(|e| warn!(error = %e, "void rejected"))?;

        let now = Utc::now().into();
        let mut active: invoices::ActiveModel = invoice.into();
        active.status = Set(next.into());
        active.voided_at = Set(Some(now));
        active.updated_at = Set(now);
        let invoice = active.update(&txn).await.map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;

        info!("invoice voided");
        self.audit.record(AuditEvent::invoice(
            business_id,
            actor_user_id,
            invoice.id,
            AuditEventType::InvoiceVoided,
            json!({ "invoiceNo": invoice.invoice_no }),
        ));

        Ok(invoice)
    }

    /// Re-runs status derivation against the stored ledger.
    ///
    /// Idempotent; writes only when the status changes.
    #[instrument(skip(self))]
    pub async fn refresh_status(
        &self,
        business_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<invoices::Model, LedgerError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let invoice = lock_invoice(&txn, business_id, invoice_id).await?;

        let paid = paid_total(&ledger_lines(&txn, invoice.id).await?);
        let current: InvoiceStatus = invoice.status.into();
        let derived = InvoiceStateMachine::derive_status(current, invoice.total, paid);

        if derived == current {
            txn.commit().await.map_err(db_err)?;
            return Ok(invoice);
        }

        let mut active: invoices::ActiveModel = invoice.into();
        active.status = Set(derived.into());
        active.updated_at = Set(Utc::now().into());
        let invoice = active.update(&txn).await.map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;

        info!(from = %current, to = %derived, "invoice status refreshed");
        Ok(invoice)
    }
}

/// Loads an invoice scoped to its business.
pub(crate) async fn find_invoice<C>(
    conn: &C,
    business_id: Uuid,
    invoice_id: Uuid,
) -> Result<invoices::Model, LedgerError>
where
    C: ConnectionTrait,
{
    invoices::Entity::find_by_id(invoice_id)
        .filter(invoices::Column::BusinessId.eq(business_id))
        .one(conn)
        .await
        .map_err(db_err)?
        .ok_or(LedgerError::NotFound("Invoice"))
}

/// Loads an invoice scoped to its business and locks it `FOR UPDATE`.
pub(crate) async fn lock_invoice<C>(
    conn: &C,
    business_id: Uuid,
    invoice_id: Uuid,
) -> Result<invoices::Model, LedgerError>
where
    C: ConnectionTrait,
{
    invoices::Entity::find_by_id(invoice_id)
        .filter(invoices::Column::BusinessId.eq(business_id))
        .lock_exclusive()
        .one(conn)
        .await
        .map_err(db_err)?
        .ok_or(LedgerError::NotFound("Invoice"))
}

/// Items of an invoice ordered by position.
pub(crate) async fn load_items<C>(
    conn: &C,
    invoice_id: Uuid,
) -> Result<Vec<invoice_items::Model>, LedgerError>
where
    C: ConnectionTrait,
{
    invoice_items::Entity::find()
        .filter(invoice_items::Column::InvoiceId.eq(invoice_id))
        .order_by_asc(invoice_items::Column::Position)
        .all(conn)
        .await
        .map_err(db_err)
}

/// Every ledger line of an invoice.
pub(crate) async fn ledger_lines<C>(
    conn: &C,
    invoice_id: Uuid,
) -> Result<Vec<LedgerLine>, LedgerError>
where
    C: ConnectionTrait,
{
    let rows = payments::Entity::find()
        .filter(payments::Column::InvoiceId.eq(invoice_id))
        .all(conn)
        .await
        .map_err(db_err)?;

    Ok(rows
        .into_iter()
        .map(|p| LedgerLine {
            amount: p.amount,
            is_reversal: p.is_reversal,
        })
        .collect())
}

/// Header fields of a stored invoice.
pub(crate) fn header_of(invoice: &invoices::Model) -> InvoiceHeader {
    InvoiceHeader {
        issue_date: invoice.issue_date,
        due_date: invoice.due_date,
        currency: invoice.currency.clone(),
        tax_rate: invoice.tax_rate,
        notes: invoice.notes.clone(),
        invoice_kind: invoice.invoice_kind.map(Into::into),
        service_period: invoice.service_period.clone(),
        service_unit: invoice.service_unit.map(Into::into),
    }
}

fn priced_line(item: &invoice_items::Model) -> PricedLine {
    PricedLine {
        position: item.position,
        description: item.description.clone(),
        qty: item.qty,
        unit_price: item.unit_price,
        line_total: item.line_total,
    }
}

async fn insert_items<C>(
    conn: &C,
    invoice: &invoices::Model,
    lines: &[PricedLine],
) -> Result<Vec<invoice_items::Model>, LedgerError>
where
    C: ConnectionTrait,
{
    let mut items = Vec::with_capacity(lines.len());
    for line in lines {
        let item = invoice_items::ActiveModel {
            id: Set(Uuid::new_v4()),
            business_id: Set(invoice.business_id),
            invoice_id: Set(invoice.id),
            description: Set(line.description.clone()),
            qty: Set(line.qty),
            unit_price: Set(line.unit_price),
            line_total: Set(line.line_total),
            position: Set(line.position),
        }
        .insert(conn)
        .await
        .map_err(db_err)?;
        items.push(item);
    }
    Ok(items)
}
