//! Initial schema for the invoice ledger.
//!
//! Creates enums, tenant tables, invoices with their items, signatures and
//! links, the payment/receipt ledger, and the per-period sequence counters.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(ENUMS_SQL).await?;
        db.execute_unprepared(TENANT_SQL).await?;
        db.execute_unprepared(INVOICES_SQL).await?;
        db.execute_unprepared(LEDGER_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_SQL).await?;
        Ok(())
    }
}

const ENUMS_SQL: &str = r"
CREATE TYPE invoice_status AS ENUM ('DRAFT', 'SENT', 'SIGNED', 'PART_PAID', 'PAID', 'VOIDED');
CREATE TYPE invoice_kind AS ENUM ('PRODUCT', 'SERVICE');
CREATE TYPE service_unit AS ENUM ('HOURS', 'MONTHS', 'SESSIONS', 'UNITS');
CREATE TYPE invoice_link_type AS ENUM ('VIEW', 'SIGN');
CREATE TYPE sequence_key AS ENUM ('INVOICE', 'RECEIPT');
";

const TENANT_SQL: &str = r"
CREATE TABLE businesses (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(255) NOT NULL,
    business_code VARCHAR(6) NOT NULL UNIQUE,
    brand_color VARCHAR(7) NOT NULL DEFAULT '#0F766E',
    allow_overpay BOOLEAN NOT NULL DEFAULT false,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_business_code CHECK (business_code ~ '^[A-Z0-9]{3,6}$'),
    CONSTRAINT chk_brand_color CHECK (brand_color ~ '^#[0-9A-Fa-f]{6}$')
);

CREATE TABLE clients (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    business_id UUID NOT NULL REFERENCES businesses(id) ON DELETE CASCADE,
    name VARCHAR(255) NOT NULL,
    email VARCHAR(255),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_clients_business ON clients(business_id);

-- One counter row per (business, key, year); allocation locks this row
CREATE TABLE sequences (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    business_id UUID NOT NULL REFERENCES businesses(id) ON DELETE CASCADE,
    sequence_key sequence_key NOT NULL,
    period INTEGER NOT NULL,
    last_number INTEGER NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_sequences_scope UNIQUE (business_id, sequence_key, period),
    CONSTRAINT chk_last_number_positive CHECK (last_number > 0)
);
";

const INVOICES_SQL: &str = r"
CREATE TABLE invoices (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    business_id UUID NOT NULL REFERENCES businesses(id) ON DELETE CASCADE,
    client_id UUID NOT NULL REFERENCES clients(id),
    original_invoice_id UUID REFERENCES invoices(id),
    invoice_no VARCHAR(64) NOT NULL,
    version INTEGER NOT NULL DEFAULT 1,
    status invoice_status NOT NULL DEFAULT 'DRAFT',
    issue_date DATE NOT NULL,
    due_date DATE,
    currency VARCHAR(8) NOT NULL,
    notes TEXT,
    invoice_kind invoice_kind,
    service_period TEXT,
    service_unit service_unit,
    tax_rate NUMERIC(5, 2) NOT NULL DEFAULT 0,
    subtotal NUMERIC(14, 2) NOT NULL,
    tax_total NUMERIC(14, 2) NOT NULL,
    total NUMERIC(14, 2) NOT NULL,
    brand_color VARCHAR(7) NOT NULL,
    sent_at TIMESTAMPTZ,
    signed_at TIMESTAMPTZ,
    locked_at TIMESTAMPTZ,
    voided_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_invoices_number UNIQUE (business_id, invoice_no),
    CONSTRAINT chk_invoice_version CHECK (version >= 1),
    CONSTRAINT chk_invoice_tax_rate CHECK (tax_rate >= 0 AND tax_rate <= 100),
    CONSTRAINT chk_invoice_total CHECK (total = subtotal + tax_total),
    CONSTRAINT chk_invoice_root CHECK (
        (version = 1 AND original_invoice_id IS NULL)
        OR (version > 1 AND original_invoice_id IS NOT NULL)
    )
);

CREATE INDEX idx_invoices_business_status ON invoices(business_id, status, created_at DESC);
CREATE INDEX idx_invoices_original ON invoices(original_invoice_id) WHERE original_invoice_id IS NOT NULL;

CREATE TABLE invoice_items (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    business_id UUID NOT NULL REFERENCES businesses(id) ON DELETE CASCADE,
    invoice_id UUID NOT NULL REFERENCES invoices(id) ON DELETE CASCADE,
    description TEXT NOT NULL,
    qty NUMERIC(14, 4) NOT NULL,
    unit_price NUMERIC(14, 4) NOT NULL,
    line_total NUMERIC(14, 2) NOT NULL,
    position INTEGER NOT NULL,
    CONSTRAINT uq_invoice_items_position UNIQUE (invoice_id, position),
    CONSTRAINT chk_item_qty_positive CHECK (qty > 0),
    CONSTRAINT chk_item_price_positive CHECK (unit_price > 0)
);

-- At most one signature per invoice; concurrent signers race on this index
CREATE TABLE invoice_signatures (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    business_id UUID NOT NULL REFERENCES businesses(id) ON DELETE CASCADE,
    invoice_id UUID NOT NULL UNIQUE REFERENCES invoices(id) ON DELETE CASCADE,
    signer_name VARCHAR(255) NOT NULL,
    signer_email VARCHAR(255) NOT NULL,
    signature_image BYTEA NOT NULL,
    signed_at TIMESTAMPTZ NOT NULL,
    ip_address VARCHAR(45),
    user_agent TEXT,
    document_hash VARCHAR(64) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE invoice_links (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    business_id UUID NOT NULL REFERENCES businesses(id) ON DELETE CASCADE,
    invoice_id UUID NOT NULL REFERENCES invoices(id) ON DELETE CASCADE,
    link_type invoice_link_type NOT NULL,
    token_hash VARCHAR(64) NOT NULL UNIQUE,
    expires_at TIMESTAMPTZ NOT NULL,
    revoked_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_invoice_links_active ON invoice_links(invoice_id, link_type) WHERE revoked_at IS NULL;
";

const LEDGER_SQL: &str = r"
-- Append-only: amounts are signed, reversals negative
CREATE TABLE payments (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    business_id UUID NOT NULL REFERENCES businesses(id) ON DELETE CASCADE,
    invoice_id UUID NOT NULL REFERENCES invoices(id) ON DELETE CASCADE,
    amount NUMERIC(14, 2) NOT NULL,
    method VARCHAR(100) NOT NULL,
    paid_at TIMESTAMPTZ NOT NULL,
    note TEXT,
    is_reversal BOOLEAN NOT NULL DEFAULT false,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_payment_sign CHECK (
        (is_reversal = false AND amount > 0) OR (is_reversal = true AND amount < 0)
    )
);

CREATE INDEX idx_payments_invoice ON payments(invoice_id, paid_at DESC);

CREATE TABLE receipts (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    business_id UUID NOT NULL REFERENCES businesses(id) ON DELETE CASCADE,
    invoice_id UUID NOT NULL REFERENCES invoices(id) ON DELETE CASCADE,
    payment_id UUID NOT NULL UNIQUE REFERENCES payments(id) ON DELETE CASCADE,
    receipt_no VARCHAR(64) NOT NULL,
    amount NUMERIC(14, 2) NOT NULL,
    balance_after NUMERIC(14, 2) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_receipts_number UNIQUE (business_id, receipt_no),
    CONSTRAINT chk_receipt_balance CHECK (balance_after >= 0)
);
";

const DROP_SQL: &str = r"
DROP TABLE IF EXISTS receipts CASCADE;
DROP TABLE IF EXISTS payments CASCADE;
DROP TABLE IF EXISTS invoice_links CASCADE;
DROP TABLE IF EXISTS invoice_signatures CASCADE;
DROP TABLE IF EXISTS invoice_items CASCADE;
DROP TABLE IF EXISTS invoices CASCADE;
DROP TABLE IF EXISTS sequences CASCADE;
DROP TABLE IF EXISTS clients CASCADE;
DROP TABLE IF EXISTS businesses CASCADE;
DROP TYPE IF EXISTS sequence_key;
DROP TYPE IF EXISTS invoice_link_type;
DROP TYPE IF EXISTS service_unit;
DROP TYPE IF EXISTS invoice_kind;
DROP TYPE IF EXISTS invoice_status;
";
