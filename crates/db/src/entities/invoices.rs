//! `SeaORM` Entity for invoices table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{InvoiceKind, InvoiceStatus, ServiceUnit};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "invoices")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub business_id: Uuid,
    pub client_id: Uuid,
    pub original_invoice_id: Option<Uuid>,
    pub invoice_no: String,
    pub version: i32,
    pub status: InvoiceStatus,
    pub issue_date: Date,
    pub due_date: Option<Date>,
    pub currency: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub invoice_kind: Option<InvoiceKind>,
    #[sea_orm(column_type = "Text", nullable)]
    pub service_period: Option<String>,
    pub service_unit: Option<ServiceUnit>,
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub tax_rate: Decimal,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub subtotal: Decimal,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub tax_total: Decimal,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub total: Decimal,
    pub brand_color: String,
    pub sent_at: Option<DateTimeWithTimeZone>,
    pub signed_at: Option<DateTimeWithTimeZone>,
    pub locked_at: Option<DateTimeWithTimeZone>,
    pub voided_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::businesses::Entity",
        from = "Column::BusinessId",
        to = "super::businesses::Column::Id"
    )]
    Businesses,
    #[sea_orm(
        belongs_to = "super::clients::Entity",
        from = "Column::ClientId",
        to = "super::clients::Column::Id"
    )]
    Clients,
    #[sea_orm(has_many = "super::invoice_items::Entity")]
    InvoiceItems,
    #[sea_orm(has_one = "super::invoice_signatures::Entity")]
    InvoiceSignatures,
    #[sea_orm(has_many = "super::invoice_links::Entity")]
    InvoiceLinks,
    #[sea_orm(has_many = "super::payments::Entity")]
    Payments,
}

impl Related<super::businesses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Businesses.def()
    }
}

impl Related<super::clients::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Clients.def()
    }
}

impl Related<super::invoice_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InvoiceItems.def()
    }
}

impl Related<super::invoice_signatures::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InvoiceSignatures.def()
    }
}

impl Related<super::invoice_links::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InvoiceLinks.def()
    }
}

impl Related<super::payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
