use chrono::Utc;
use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{CheckoutAttempt, NewCheckoutAttempt},
    traits::FulfillmentError,
};

pub async fn insert_attempt(attempt: NewCheckoutAttempt, conn: &mut SqliteConnection) -> Result<i64, FulfillmentError> {
    let id: i64 = sqlx::query_scalar(
        r#"
            INSERT INTO checkout_attempts (
                idempotency_key,
                user_id,
                merchant_id,
                proof_kind,
                verification_status,
                state,
                reason,
                total_amount,
                order_id,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id;
        "#,
    )
    .bind(&attempt.idempotency_key)
    .bind(&attempt.user_id)
    .bind(&attempt.merchant_id)
    .bind(attempt.proof_kind)
    .bind(attempt.verification_status)
    .bind(attempt.state)
    .bind(&attempt.reason)
    .bind(attempt.total_amount)
    .bind(attempt.order_id)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    trace!("🗃️ Checkout attempt #{id} [{}] recorded as {}", attempt.idempotency_key, attempt.state);
    Ok(id)
}

pub async fn fetch_attempts(
    idempotency_key: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<CheckoutAttempt>, FulfillmentError> {
    let attempts = sqlx::query_as::<_, CheckoutAttempt>(
        r#"
            SELECT id, idempotency_key, user_id, merchant_id, proof_kind, verification_status, state, reason,
                   total_amount, order_id, created_at
            FROM checkout_attempts
            WHERE idempotency_key = $1
            ORDER BY id ASC
        "#,
    )
    .bind(idempotency_key)
    .fetch_all(conn)
    .await?;
    Ok(attempts)
}
