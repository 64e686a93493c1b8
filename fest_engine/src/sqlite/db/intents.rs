use log::trace;
use sqlx::SqliteConnection;

use crate::{db_types::PaymentIntentRecord, traits::FulfillmentError};

pub async fn insert_payment_intent(
    intent: PaymentIntentRecord,
    conn: &mut SqliteConnection,
) -> Result<(), FulfillmentError> {
    let result = sqlx::query(
        r#"
            INSERT INTO payment_intents (intent_id, user_id, merchant_id, amount, currency, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (intent_id) DO NOTHING;
        "#,
    )
    .bind(&intent.intent_id)
    .bind(&intent.user_id)
    .bind(&intent.merchant_id)
    .bind(intent.amount)
    .bind(&intent.currency)
    .bind(intent.created_at)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(FulfillmentError::DuplicateIntent(intent.intent_id));
    }
    trace!("🗃️ Payment intent {} for {} recorded", intent.intent_id, intent.amount);
    Ok(())
}

pub async fn fetch_payment_intent(
    intent_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentIntentRecord>, FulfillmentError> {
    let intent = sqlx::query_as::<_, PaymentIntentRecord>(
        r#"
            SELECT intent_id, user_id, merchant_id, amount, currency, created_at
            FROM payment_intents
            WHERE intent_id = $1
        "#,
    )
    .bind(intent_id)
    .fetch_optional(conn)
    .await?;
    Ok(intent)
}
