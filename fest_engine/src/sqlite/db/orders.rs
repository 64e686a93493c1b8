use std::collections::HashMap;

use chrono::Utc;
use log::{debug, trace};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{Amount, IssuedToken, MerchantId, Order, OrderId, OrderLine},
    traits::{FinalizeRequest, FulfillmentError, OrderQueryFilter},
};

const ORDER_COLUMNS: &str = "id, human_token, token_epoch, user_id, merchant_id, total_amount, proof_kind, \
                             proof_reference, verification_status, idempotency_key, fulfilled, fulfilled_at, created_at";

/// Inserts a new order and its lines. This is not atomic. Embed the call inside a transaction and pass `&mut *tx` as
/// the connection argument.
///
/// The `idempotency_key` and (`merchant_id`, `token_epoch`, `human_token`) columns are unique, so a racing duplicate
/// fails here rather than creating a second order.
pub async fn insert_order(
    request: &FinalizeRequest,
    token: IssuedToken,
    total: Amount,
    conn: &mut SqliteConnection,
) -> Result<OrderId, FulfillmentError> {
    let id: OrderId = sqlx::query_scalar(
        r#"
            INSERT INTO orders (
                human_token,
                token_epoch,
                user_id,
                merchant_id,
                total_amount,
                proof_kind,
                proof_reference,
                verification_status,
                idempotency_key,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id;
        "#,
    )
    .bind(token.value)
    .bind(token.epoch)
    .bind(&request.user_id)
    .bind(&request.merchant_id)
    .bind(total)
    .bind(request.proof_kind)
    .bind(&request.proof_reference)
    .bind(request.verification_status)
    .bind(&request.idempotency_key)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;
    for line in &request.lines {
        sqlx::query(
            r#"
                INSERT INTO order_lines (order_id, item_id, name, unit_price, quantity) VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(id)
        .bind(&line.item_id)
        .bind(&line.name)
        .bind(line.unit_price)
        .bind(line.quantity)
        .execute(&mut *conn)
        .await?;
    }
    trace!("🗃️ Order {id} with {} lines written", request.lines.len());
    Ok(id)
}

pub async fn fetch_order_by_id(id: OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, FulfillmentError> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
    let order = sqlx::query_as::<_, Order>(&sql).bind(id).fetch_optional(&mut *conn).await?;
    match order {
        Some(order) => Ok(Some(with_line_items(order, conn).await?)),
        None => Ok(None),
    }
}

pub async fn fetch_order_by_idempotency_key(
    key: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, FulfillmentError> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE idempotency_key = $1");
    let order = sqlx::query_as::<_, Order>(&sql).bind(key).fetch_optional(&mut *conn).await?;
    match order {
        Some(order) => Ok(Some(with_line_items(order, conn).await?)),
        None => Ok(None),
    }
}

async fn with_line_items(mut order: Order, conn: &mut SqliteConnection) -> Result<Order, FulfillmentError> {
    order.line_items = sqlx::query_as::<_, OrderLine>(
        "SELECT item_id, name, unit_price, quantity FROM order_lines WHERE order_id = $1 ORDER BY item_id ASC",
    )
    .bind(order.id)
    .fetch_all(conn)
    .await?;
    Ok(order)
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`
///
/// Resulting orders are ordered by `created_at` in ascending order
pub async fn search_orders(
    query: OrderQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, FulfillmentError> {
    let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT {ORDER_COLUMNS} FROM orders "));
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(user_id) = query.user_id {
        where_clause.push("user_id = ");
        where_clause.push_bind_unseparated(user_id);
    }
    if let Some(merchant_id) = query.merchant_id {
        where_clause.push("merchant_id = ");
        where_clause.push_bind_unseparated(merchant_id);
    }
    if let Some(fulfilled) = query.fulfilled {
        where_clause.push("fulfilled = ");
        where_clause.push_bind_unseparated(fulfilled);
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    builder.push(" ORDER BY created_at ASC, id ASC");
    trace!("🗃️ Executing query: {}", builder.sql());
    let mut orders = builder.build_query_as::<Order>().fetch_all(&mut *conn).await?;
    trace!("🗃️ Result of search_orders: {}", orders.len());
    attach_line_items(&mut orders, conn).await?;
    Ok(orders)
}

async fn attach_line_items(orders: &mut [Order], conn: &mut SqliteConnection) -> Result<(), FulfillmentError> {
    if orders.is_empty() {
        return Ok(());
    }
    let mut builder = QueryBuilder::<Sqlite>::new(
        "SELECT order_id, item_id, name, unit_price, quantity FROM order_lines WHERE order_id IN (",
    );
    let mut ids = builder.separated(", ");
    for order in orders.iter() {
        ids.push_bind(order.id);
    }
    builder.push(") ORDER BY order_id ASC, item_id ASC");
    let rows: Vec<(OrderId, OrderLine)> = builder
        .build()
        .fetch_all(conn)
        .await?
        .into_iter()
        .map(|row| -> Result<(OrderId, OrderLine), sqlx::Error> {
            use sqlx::{FromRow, Row};
            let order_id: OrderId = row.try_get("order_id")?;
            let line = OrderLine::from_row(&row)?;
            Ok((order_id, line))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let mut lines_by_order: HashMap<OrderId, Vec<OrderLine>> = HashMap::new();
    for (id, line) in rows {
        lines_by_order.entry(id).or_default().push(line);
    }
    for order in orders.iter_mut() {
        order.line_items = lines_by_order.remove(&order.id).unwrap_or_default();
    }
    Ok(())
}

/// Sets the one-time `fulfilled` flag. The `fulfilled = FALSE` guard makes a second call a no-op at the storage level.
pub async fn mark_fulfilled(
    merchant: &MerchantId,
    id: OrderId,
    conn: &mut SqliteConnection,
) -> Result<Order, FulfillmentError> {
    let updated = sqlx::query(
        "UPDATE orders SET fulfilled = TRUE, fulfilled_at = $1 WHERE id = $2 AND merchant_id = $3 AND fulfilled = \
         FALSE",
    )
    .bind(Utc::now())
    .bind(id)
    .bind(merchant)
    .execute(&mut *conn)
    .await?
    .rows_affected();
    let order = fetch_order_by_id(id, conn).await?.filter(|o| &o.merchant_id == merchant);
    match (updated, order) {
        (1, Some(order)) => {
            debug!("🗃️ Order {id} for {merchant} marked as fulfilled");
            Ok(order)
        },
        (_, Some(_)) => Err(FulfillmentError::AlreadyFulfilled(id)),
        (_, None) => Err(FulfillmentError::OrderNotFound(id)),
    }
}
