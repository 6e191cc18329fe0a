use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewTransaction, Transaction, TransactionStatus, UserId},
    traits::MarketplaceError,
};

const TX_COLUMNS: &str = "id, listing_id, seller, buyer, item, zone, quantity, status, created_at, completed_at";

pub async fn insert_transaction(
    tx: NewTransaction,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Transaction, MarketplaceError> {
    let completed_at = match tx.status {
        TransactionStatus::Completed | TransactionStatus::Cancelled => Some(now),
        TransactionStatus::Pending | TransactionStatus::Confirmed => None,
    };
    let id: i64 = sqlx::query_scalar(
        r#"
            INSERT INTO transactions (listing_id, seller, buyer, item, zone, quantity, status, created_at, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id;
        "#,
    )
    .bind(tx.listing_id)
    .bind(&tx.seller)
    .bind(&tx.buyer)
    .bind(&tx.item)
    .bind(&tx.zone)
    .bind(tx.quantity)
    .bind(tx.status)
    .bind(now)
    .bind(completed_at)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Transaction #{id} recorded ({} {} -> {})", tx.status, tx.seller, tx.buyer);
    Ok(Transaction {
        id,
        listing_id: tx.listing_id,
        seller: tx.seller,
        buyer: tx.buyer,
        item: tx.item,
        zone: tx.zone,
        quantity: tx.quantity,
        status: tx.status,
        created_at: now,
        completed_at,
    })
}

pub async fn fetch_transactions_for_user(
    user: &UserId,
    conn: &mut SqliteConnection,
) -> Result<Vec<Transaction>, MarketplaceError> {
    let q = format!(
        "SELECT {TX_COLUMNS} FROM transactions WHERE seller = $1 OR buyer = $1 ORDER BY datetime(created_at) ASC"
    );
    let txs = sqlx::query_as::<_, Transaction>(&q).bind(user).fetch_all(conn).await?;
    Ok(txs)
}
