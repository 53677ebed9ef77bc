//! Demo data seeder for Receipta development.
//!
//! Creates the demo business and client from `[seed]` config if they do not
//! exist yet, then drafts one sample invoice for a business with none.
//!
//! Usage: cargo run --bin seeder

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};
use tracing::info;
use uuid::Uuid;

use receipta_core::invoice::{CreateInvoiceInput, InvoiceKind, ServiceUnit};
use receipta_core::money::LineItemInput;
use receipta_core::token::LedgerSettings;
use receipta_db::entities::{businesses, clients, invoices};
use receipta_db::{InvoiceRepository, TracingAuditSink};
use receipta_shared::{AppConfig, SeedConfig, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config.logging);

    let settings =
        LedgerSettings::try_from(&config.ledger).context("invalid ledger configuration")?;
    let db = receipta_db::connect(&config.database)
        .await
        .context("failed to connect to database")?;

    let business = seed_business(&db, &config.seed).await?;
    let client = seed_client(&db, &business, &config.seed).await?;
    seed_invoice(&db, settings, &business, &client).await?;

    info!(business_code = %business.business_code, "seeding complete");
    Ok(())
}

async fn seed_business(
    db: &DatabaseConnection,
    seed: &SeedConfig,
) -> anyhow::Result<businesses::Model> {
    if let Some(existing) = businesses::Entity::find()
        .filter(businesses::Column::BusinessCode.eq(seed.business_code.as_str()))
        .one(db)
        .await?
    {
        info!(business_id = %existing.id, "demo business already exists, skipping");
        return Ok(existing);
    }

    let now = Utc::now().into();
    let business = businesses::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(seed.business_name.clone()),
        business_code: Set(seed.business_code.clone()),
        brand_color: Set(seed.brand_color.clone()),
        allow_overpay: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .context("failed to create demo business")?;

    info!(business_id = %business.id, "created demo business");
    Ok(business)
}

async fn seed_client(
    db: &DatabaseConnection,
    business: &businesses::Model,
    seed: &SeedConfig,
) -> anyhow::Result<clients::Model> {
    if let Some(existing) = clients::Entity::find()
        .filter(clients::Column::BusinessId.eq(business.id))
        .filter(clients::Column::Name.eq(seed.client_name.as_str()))
        .one(db)
        .await?
    {
        info!(client_id = %existing.id, "demo client already exists, skipping");
        return Ok(existing);
    }

    let now = Utc::now().into();
    let client = clients::ActiveModel {
        id: Set(Uuid::new_v4()),
        business_id: Set(business.id),
        name: Set(seed.client_name.clone()),
        email: Set(Some("client@example.com".to_string())),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .context("failed to create demo client")?;

    info!(client_id = %client.id, "created demo client");
    Ok(client)
}

async fn seed_invoice(
    db: &DatabaseConnection,
    settings: LedgerSettings,
    business: &businesses::Model,
    client: &clients::Model,
) -> anyhow::Result<()> {
    let existing = invoices::Entity::find()
        .filter(invoices::Column::BusinessId.eq(business.id))
        .count(db)
        .await?;
    if existing > 0 {
        info!(existing, "business already has invoices, skipping");
        return Ok(());
    }

    let repo = InvoiceRepository::new(db.clone(), settings, Arc::new(TracingAuditSink));
    let input = CreateInvoiceInput {
        client_id: client.id,
        issue_date: None,
        due_date: None,
        currency: "USD".to_string(),
        tax_rate: Some(Decimal::new(10, 0)),
        notes: Some("Demo invoice".to_string()),
        invoice_kind: Some(InvoiceKind::Service),
        service_period: Some("Monthly retainer".to_string()),
        service_unit: Some(ServiceUnit::Hours),
        items: vec![
            LineItemInput::new("Consulting", Decimal::new(12, 0), Decimal::new(8500, 2)),
            LineItemInput::new("Project setup", Decimal::ONE, Decimal::new(25000, 2)),
        ],
    };

    let created = repo
        .create(business.id, None, input)
        .await
        .context("failed to create demo invoice")?;
    info!(
        invoice_no = %created.invoice.invoice_no,
        total = %created.invoice.total,
        "created demo invoice"
    );
    Ok(())
}
