//! Public link integration tests.
//!
//! Token scoping, expiry, reissue and the concurrent sign race.

#![allow(clippy::uninlined_format_args)]

mod common;

use chrono::{Duration, Utc};
use futures::future::join;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use uuid::Uuid;

use receipta_core::LedgerError;
use receipta_core::audit::AuditEventType;
use receipta_core::token::{DEFAULT_TOKEN_BYTES, LedgerSettings, LinkType, generate_token, hash_token};
use receipta_db::AccessTokenRepository;
use receipta_db::entities::sea_orm_active_enums::{InvoiceLinkType, InvoiceStatus};
use receipta_db::entities::{invoice_links, invoice_signatures, invoices};

use common::{Fixture, connect, sign_input, single_item};

async fn sent_invoice(fx: &Fixture) -> (invoices::Model, String, String) {
    let invoice = fx
        .invoices
        .create(fx.business.id, None, fx.invoice_input(single_item(dec!(100))))
        .await
        .expect("create")
        .invoice;
    let sent = fx
        .invoices
        .send(fx.business.id, None, invoice.id)
        .await
        .expect("send");
    (sent.invoice, sent.view.token, sent.sign.token)
}

async fn insert_link(
    fx: &Fixture,
    invoice: &invoices::Model,
    link_type: InvoiceLinkType,
    expires_in: Duration,
) -> String {
    let token = generate_token(DEFAULT_TOKEN_BYTES).expect("token");
    let now = Utc::now();
    invoice_links::ActiveModel {
        id: Set(Uuid::new_v4()),
        business_id: Set(invoice.business_id),
        invoice_id: Set(invoice.id),
        link_type: Set(link_type),
        token_hash: Set(hash_token(&token)),
        expires_at: Set((now + expires_in).into()),
        revoked_at: Set(None),
        created_at: Set(now.into()),
    }
    .insert(&fx.db)
    .await
    .expect("insert link");
    token
}

#[tokio::test]
async fn test_tokens_are_scoped_to_their_type() {
    let Some(db) = connect().await else { return };
    let fx = Fixture::new(db, "#112233", false).await;
    let (invoice, view, sign) = sent_invoice(&fx).await;

    let viewed = fx.public.view_invoice(&view).await.expect("view");
    assert_eq!(viewed.invoice.id, invoice.id);
    assert_eq!(viewed.items.len(), 1);

    assert!(matches!(
        fx.public.view_invoice(&sign).await,
        Err(LedgerError::NotFound(_))
    ));
    assert!(matches!(
        fx.public.sign(&view, sign_input("Dana Client")).await,
        Err(LedgerError::NotFound(_))
    ));
    assert!(matches!(
        fx.public.view_invoice("not-a-real-token").await,
        Err(LedgerError::NotFound(_))
    ));

    let links = invoice_links::Entity::find()
        .filter(invoice_links::Column::InvoiceId.eq(invoice.id))
        .all(&fx.db)
        .await
        .expect("links");
    assert_eq!(links.len(), 2);
    assert!(links.iter().all(|l| l.token_hash != view && l.token_hash != sign));
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let Some(db) = connect().await else { return };
    let fx = Fixture::new(db, "#112233", false).await;
    let (invoice, _, _) = sent_invoice(&fx).await;

    let stale_view = insert_link(&fx, &invoice, InvoiceLinkType::View, Duration::hours(-1)).await;
    let stale_sign = insert_link(&fx, &invoice, InvoiceLinkType::Sign, Duration::hours(-1)).await;

    assert!(matches!(
        fx.public.view_invoice(&stale_view).await,
        Err(LedgerError::TokenExpired)
    ));
    assert!(matches!(
        fx.public.sign(&stale_sign, sign_input("Dana Client")).await,
        Err(LedgerError::TokenExpired)
    ));
}

#[tokio::test]
async fn test_reissue_revokes_previous_token() {
    let Some(db) = connect().await else { return };
    let fx = Fixture::new(db.clone(), "#112233", false).await;
    let (invoice, old_view, _) = sent_invoice(&fx).await;

    let tokens = AccessTokenRepository::new(db, LedgerSettings::default());
    let fresh = tokens
        .issue(fx.business.id, invoice.id, LinkType::View)
        .await
        .expect("reissue");

    // A revoked token is indistinguishable from one that never existed.
    assert!(matches!(
        fx.public.view_invoice(&old_view).await,
        Err(LedgerError::NotFound("Invoice"))
    ));
    assert!(matches!(
        fx.public.view_invoice("not-a-real-token").await,
        Err(LedgerError::NotFound("Invoice"))
    ));
    fx.public
        .view_invoice(&fresh.token)
        .await
        .expect("fresh token works");

    let other = Fixture::new(fx.db.clone(), "#112233", false).await;
    assert!(matches!(
        tokens.issue(other.business.id, invoice.id, LinkType::View).await,
        Err(LedgerError::NotFound("Invoice"))
    ));
}

#[tokio::test]
async fn test_sign_locks_invoice_and_revokes_sign_links() {
    let Some(db) = connect().await else { return };
    let fx = Fixture::new(db, "#112233", false).await;
    let (invoice, view, sign) = sent_invoice(&fx).await;

    let signed = fx
        .public
        .sign(&sign, sign_input("  Dana Client  "))
        .await
        .expect("sign");
    assert_eq!(signed.invoice.status, InvoiceStatus::Signed);
    assert!(signed.invoice.signed_at.is_some());
    assert!(signed.invoice.locked_at.is_some());
    assert_eq!(signed.signature.signer_name, "Dana Client");
    assert_eq!(signed.signature.document_hash.len(), 64);

    assert!(matches!(
        fx.public.sign(&sign, sign_input("Dana Client")).await,
        Err(LedgerError::AlreadySigned)
    ));

    let viewed = fx.public.view_invoice(&view).await.expect("view after sign");
    assert_eq!(viewed.invoice.status, InvoiceStatus::Signed);

    let active_sign_links = invoice_links::Entity::find()
        .filter(invoice_links::Column::InvoiceId.eq(invoice.id))
        .filter(invoice_links::Column::LinkType.eq(InvoiceLinkType::Sign))
        .filter(invoice_links::Column::RevokedAt.is_null())
        .count(&fx.db)
        .await
        .expect("count");
    assert_eq!(active_sign_links, 0);

    let events = fx.audit.events();
    let signed_event = events
        .iter()
        .find(|e| e.event_type == AuditEventType::InvoiceSigned)
        .expect("signed event");
    assert_eq!(signed_event.actor_user_id, None);
}

#[tokio::test]
async fn test_sign_requires_acknowledgement() {
    let Some(db) = connect().await else { return };
    let fx = Fixture::new(db, "#112233", false).await;
    let (_, _, sign) = sent_invoice(&fx).await;

    let mut input = sign_input("Dana Client");
    input.acknowledge = false;
    assert!(matches!(
        fx.public.sign(&sign, input).await,
        Err(LedgerError::Validation(_))
    ));

    fx.public
        .sign(&sign, sign_input("Dana Client"))
        .await
        .expect("valid sign still works");
}

#[tokio::test]
async fn test_concurrent_signers_one_wins() {
    let Some(db) = connect().await else { return };
    let fx = Fixture::new(db, "#112233", false).await;
    let (invoice, _, sign) = sent_invoice(&fx).await;
    let second_sign =
        insert_link(&fx, &invoice, InvoiceLinkType::Sign, Duration::days(1)).await;

    let (a, b) = join(
        fx.public.sign(&sign, sign_input("Signer A")),
        fx.public.sign(&second_sign, sign_input("Signer B")),
    )
    .await;

    let wins = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(wins, 1, "exactly one signer should win");
    assert!(
        matches!(a, Err(LedgerError::AlreadySigned)) || matches!(b, Err(LedgerError::AlreadySigned))
    );

    let signatures = invoice_signatures::Entity::find()
        .filter(invoice_signatures::Column::InvoiceId.eq(invoice.id))
        .count(&fx.db)
        .await
        .expect("count");
    assert_eq!(signatures, 1);
}
