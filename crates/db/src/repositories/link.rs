//! Access token issuer for public invoice links.
//!
//! Only the SHA-256 of a token is stored. Issuing a token revokes the
//! invoice's other live tokens of the same type.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use receipta_core::LedgerError;
use receipta_core::token::{
    LedgerSettings, LinkState, LinkType, check_link, generate_token, hash_token,
};

use crate::entities::sea_orm_active_enums::InvoiceLinkType;
use crate::entities::{invoice_links, invoices};

use super::db_err;

/// A freshly minted token. The raw value is never retrievable again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedToken {
    /// VIEW or SIGN.
    pub link_type: LinkType,
    /// Raw bearer token.
    pub token: String,
    /// Expiry instant.
    pub expires_at: DateTime<Utc>,
}

/// Access token repository.
#[derive(Debug, Clone)]
pub struct AccessTokenRepository {
    db: DatabaseConnection,
    settings: LedgerSettings,
}

impl AccessTokenRepository {
    /// Creates a new access token repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, settings: LedgerSettings) -> Self {
        Self { db, settings }
    }

    /// Issues a token of `link_type` for an invoice of `business_id`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the invoice does not belong to the business.
    #[instrument(skip(self))]
    pub async fn issue(
        &self,
        business_id: Uuid,
        invoice_id: Uuid,
        link_type: LinkType,
    ) -> Result<IssuedToken, LedgerError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let invoice = invoices::Entity::find_by_id(invoice_id)
            .filter(invoices::Column::BusinessId.eq(business_id))
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or(LedgerError::NotFound("Invoice"))?;

        let expires_at = self.settings.link_expiry(Utc::now())?;
        let issued =
            Self::issue_in(&txn, &invoice, link_type, self.settings.token_bytes, expires_at)
                .await?;

        txn.commit().await.map_err(db_err)?;
        info!(%link_type, "issued invoice link");
        Ok(issued)
    }

    /// Issues a token inside an open transaction.
    pub async fn issue_in<C>(
        conn: &C,
        invoice: &invoices::Model,
        link_type: LinkType,
        token_bytes: usize,
        expires_at: DateTime<Utc>,
    ) -> Result<IssuedToken, LedgerError>
    where
        C: ConnectionTrait,
    {
        Self::revoke_active_in(conn, invoice.id, link_type, Utc::now()).await?;

        let token = generate_token(token_bytes)?;
        invoice_links::ActiveModel {
            id: Set(Uuid::new_v4()),
            business_id: Set(invoice.business_id),
            invoice_id: Set(invoice.id),
            link_type: Set(link_type.into()),
            token_hash: Set(hash_token(&token)),
            expires_at: Set(expires_at.into()),
            revoked_at: Set(None),
            created_at: Set(Utc::now().into()),
        }
        .insert(conn)
        .await
        .map_err(db_err)?;

        Ok(IssuedToken {
            link_type,
            token,
            expires_at,
        })
    }

    /// Revokes every unrevoked link of `link_type` on an invoice.
    pub async fn revoke_active_in<C>(
        conn: &C,
        invoice_id: Uuid,
        link_type: LinkType,
        now: DateTime<Utc>,
    ) -> Result<u64, LedgerError>
    where
        C: ConnectionTrait,
    {
        let revoked_at: sea_orm::prelude::DateTimeWithTimeZone = now.into();
        let result = invoice_links::Entity::update_many()
            .col_expr(invoice_links::Column::RevokedAt, Expr::value(revoked_at))
            .filter(invoice_links::Column::InvoiceId.eq(invoice_id))
            .filter(invoice_links::Column::LinkType.eq(InvoiceLinkType::from(link_type)))
            .filter(invoice_links::Column::RevokedAt.is_null())
            .exec(conn)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected)
    }

    /// Resolves a presented token to its invoice.
    ///
    /// Read-only. A token of the other type never matches.
    ///
    /// # Errors
    ///
    /// * `NotFound` - no unrevoked link with this hash and type
    /// * `TokenExpired` - the link exists but has expired
    #[instrument(skip(self, raw_token))]
    pub async fn resolve(
        &self,
        raw_token: &str,
        link_type: LinkType,
    ) -> Result<invoices::Model, LedgerError> {
        let link = invoice_links::Entity::find()
            .filter(invoice_links::Column::TokenHash.eq(hash_token(raw_token)))
            .filter(invoice_links::Column::LinkType.eq(InvoiceLinkType::from(link_type)))
            .filter(invoice_links::Column::RevokedAt.is_null())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(LedgerError::NotFound("Invoice"))?;

        check_link(&link_state(&link), Utc::now())?;

        invoices::Entity::find_by_id(link.invoice_id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(LedgerError::NotFound("Invoice"))
    }

    /// Finds a link by token and type, revoked or not.
    pub(crate) async fn find_in<C>(
        conn: &C,
        raw_token: &str,
        link_type: LinkType,
    ) -> Result<Option<invoice_links::Model>, LedgerError>
    where
        C: ConnectionTrait,
    {
        invoice_links::Entity::find()
            .filter(invoice_links::Column::TokenHash.eq(hash_token(raw_token)))
            .filter(invoice_links::Column::LinkType.eq(InvoiceLinkType::from(link_type)))
            .one(conn)
            .await
            .map_err(db_err)
    }
}

/// Validity fields of a stored link in UTC.
pub(crate) fn link_state(link: &invoice_links::Model) -> LinkState {
    LinkState {
        expires_at: link.expires_at.with_timezone(&Utc),
        revoked_at: link.revoked_at.map(|at| at.with_timezone(&Utc)),
    }
}
