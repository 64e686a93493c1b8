use chrono::Utc;
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db_types::{Cart, CartLine, ItemId, MerchantId, UserId, MAX_LINE_QUANTITY},
    traits::CartError,
};

/// Upserts a cart line. A new line snapshots the catalog price; an existing line only has its quantity increased.
///
/// The catalog lookup and the upsert are a single statement. If no row is written, either the item is not in the
/// catalog or the line would grow past [`MAX_LINE_QUANTITY`].
pub async fn add_item(
    user: &UserId,
    merchant: &MerchantId,
    item: &ItemId,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<(), CartError> {
    if !(1..=MAX_LINE_QUANTITY).contains(&quantity) {
        return Err(CartError::ValidationError(format!("Cannot add {quantity} units to a cart line")));
    }
    let result = sqlx::query(
        r#"
            INSERT INTO cart_lines (user_id, merchant_id, item_id, name, unit_price, quantity, updated_at)
            SELECT $1, merchant_id, item_id, name, unit_price, $4, $5
            FROM catalog_items
            WHERE merchant_id = $2 AND item_id = $3
            ON CONFLICT (user_id, merchant_id, item_id) DO UPDATE
                SET quantity = quantity + excluded.quantity, updated_at = excluded.updated_at
                WHERE quantity + excluded.quantity <= $6;
        "#,
    )
    .bind(user)
    .bind(merchant)
    .bind(item)
    .bind(quantity)
    .bind(Utc::now())
    .bind(MAX_LINE_QUANTITY)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 0 {
        if line_exists(user, merchant, item, conn).await? {
            return Err(too_many(item));
        }
        debug!("🗃️ {user} tried to add unknown item {merchant}/{item} to their cart");
        return Err(CartError::NotFound(format!("Item {item} is not sold by {merchant}")));
    }
    trace!("🗃️ Added {quantity} x {merchant}/{item} to cart of {user}");
    Ok(())
}

fn too_many(item: &ItemId) -> CartError {
    CartError::ValidationError(format!("A cart can hold at most {MAX_LINE_QUANTITY} units of {item}"))
}

async fn line_exists(
    user: &UserId,
    merchant: &MerchantId,
    item: &ItemId,
    conn: &mut SqliteConnection,
) -> Result<bool, CartError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM cart_lines WHERE user_id = $1 AND merchant_id = $2 AND item_id = $3",
    )
    .bind(user)
    .bind(merchant)
    .bind(item)
    .fetch_one(conn)
    .await?;
    Ok(count > 0)
}

/// Applies `delta` to an existing line, removing it when the quantity would drop to zero or below.
pub async fn change_quantity(
    user: &UserId,
    merchant: &MerchantId,
    item: &ItemId,
    delta: i64,
    conn: &mut SqliteConnection,
) -> Result<(), CartError> {
    let updated = sqlx::query(
        r#"
            UPDATE cart_lines SET quantity = quantity + $4, updated_at = $5
            WHERE user_id = $1 AND merchant_id = $2 AND item_id = $3 AND quantity + $4 BETWEEN 1 AND $6;
        "#,
    )
    .bind(user)
    .bind(merchant)
    .bind(item)
    .bind(delta)
    .bind(Utc::now())
    .bind(MAX_LINE_QUANTITY)
    .execute(&mut *conn)
    .await?
    .rows_affected();
    if updated > 0 {
        trace!("🗃️ Cart line {merchant}/{item} for {user} changed by {delta}");
        return Ok(());
    }
    if delta > 0 {
        return if line_exists(user, merchant, item, conn).await? {
            Err(too_many(item))
        } else {
            Err(CartError::NotFound(format!("There is no {item} in the {merchant} cart")))
        };
    }
    // Either the line is missing, or the new quantity would be zero or less
    remove_item(user, merchant, item, conn).await
}

pub async fn remove_item(
    user: &UserId,
    merchant: &MerchantId,
    item: &ItemId,
    conn: &mut SqliteConnection,
) -> Result<(), CartError> {
    let result = sqlx::query("DELETE FROM cart_lines WHERE user_id = $1 AND merchant_id = $2 AND item_id = $3")
        .bind(user)
        .bind(merchant)
        .bind(item)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(CartError::NotFound(format!("There is no {item} in the {merchant} cart")));
    }
    trace!("🗃️ Removed {merchant}/{item} from cart of {user}");
    Ok(())
}

/// Deletes every line in the cart. Returns the number of lines removed.
pub async fn clear_cart(user: &UserId, merchant: &MerchantId, conn: &mut SqliteConnection) -> Result<u64, CartError> {
    let result = sqlx::query("DELETE FROM cart_lines WHERE user_id = $1 AND merchant_id = $2")
        .bind(user)
        .bind(merchant)
        .execute(conn)
        .await?;
    trace!("🗃️ Cleared {} lines from the {merchant} cart of {user}", result.rows_affected());
    Ok(result.rows_affected())
}

pub async fn fetch_cart_lines(
    user: &UserId,
    merchant: &MerchantId,
    conn: &mut SqliteConnection,
) -> Result<Vec<CartLine>, CartError> {
    let lines = sqlx::query_as::<_, CartLine>(
        r#"
            SELECT merchant_id, item_id, name, unit_price, quantity, updated_at
            FROM cart_lines
            WHERE user_id = $1 AND merchant_id = $2
            ORDER BY item_id ASC
        "#,
    )
    .bind(user)
    .bind(merchant)
    .fetch_all(conn)
    .await?;
    Ok(lines)
}

pub async fn fetch_cart(user: &UserId, merchant: &MerchantId, conn: &mut SqliteConnection) -> Result<Cart, CartError> {
    let lines = fetch_cart_lines(user, merchant, conn).await?;
    Cart::new(user.clone(), merchant.clone(), lines)
}

pub async fn fetch_carts_for_user(user: &UserId, conn: &mut SqliteConnection) -> Result<Vec<Cart>, CartError> {
    let lines = sqlx::query_as::<_, CartLine>(
        r#"
            SELECT merchant_id, item_id, name, unit_price, quantity, updated_at
            FROM cart_lines
            WHERE user_id = $1
            ORDER BY merchant_id ASC, item_id ASC
        "#,
    )
    .bind(user)
    .fetch_all(conn)
    .await?;
    let mut carts: Vec<Cart> = Vec::new();
    let mut current: Vec<CartLine> = Vec::new();
    for line in lines {
        if current.last().is_some_and(|l| l.merchant_id != line.merchant_id) {
            let merchant = current[0].merchant_id.clone();
            carts.push(Cart::new(user.clone(), merchant, std::mem::take(&mut current))?);
        }
        current.push(line);
    }
    if let Some(first) = current.first() {
        let merchant = first.merchant_id.clone();
        carts.push(Cart::new(user.clone(), merchant, current)?);
    }
    Ok(carts)
}
