use chrono::Utc;
use log::{info, trace};
use sqlx::SqliteConnection;

use crate::{
    db_types::{IssuedToken, MerchantId, SequenceCounter},
    traits::LedgerError,
};

/// Read-increment-return as a single upsert statement. The first token for a merchant is 1.
pub async fn next_token(merchant: &MerchantId, conn: &mut SqliteConnection) -> Result<IssuedToken, LedgerError> {
    let token = sqlx::query_as::<_, IssuedToken>(
        r#"
            INSERT INTO sequence_counters (merchant_id, current_value, epoch, updated_at) VALUES ($1, 1, 0, $2)
            ON CONFLICT (merchant_id) DO UPDATE
                SET current_value = current_value + 1, updated_at = excluded.updated_at
            RETURNING current_value AS value, epoch;
        "#,
    )
    .bind(merchant)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    trace!("🗃️ Issued token {} (epoch {}) for {merchant}", token.value, token.epoch);
    Ok(token)
}

pub async fn reset_sequence(
    merchant: &MerchantId,
    conn: &mut SqliteConnection,
) -> Result<SequenceCounter, LedgerError> {
    let counter = sqlx::query_as::<_, SequenceCounter>(
        r#"
            INSERT INTO sequence_counters (merchant_id, current_value, epoch, updated_at) VALUES ($1, 0, 1, $2)
            ON CONFLICT (merchant_id) DO UPDATE
                SET current_value = 0, epoch = epoch + 1, updated_at = excluded.updated_at
            RETURNING merchant_id, current_value, epoch, updated_at;
        "#,
    )
    .bind(merchant)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    info!("🗃️ Token sequence for {merchant} reset. Now in epoch {}", counter.epoch);
    Ok(counter)
}

pub async fn fetch_sequence(
    merchant: &MerchantId,
    conn: &mut SqliteConnection,
) -> Result<Option<SequenceCounter>, LedgerError> {
    let counter = sqlx::query_as::<_, SequenceCounter>(
        "SELECT merchant_id, current_value, epoch, updated_at FROM sequence_counters WHERE merchant_id = $1",
    )
    .bind(merchant)
    .fetch_optional(conn)
    .await?;
    Ok(counter)
}
