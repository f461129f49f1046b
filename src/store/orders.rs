//! Persistence for orders and their line-item snapshots.
//!
//! Every write touches a single order; the two guarded updates
//! ([`attach_remote_order`], [`mark_paid`]) enforce their set-once
//! invariants in the WHERE clause so concurrent callers cannot overwrite
//! each other.

use std::collections::HashMap;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::db::DbPool;
use crate::dto::orders::OrderItemInput;
use crate::error::{AppError, AppResult};
use crate::models::{Order, OrderItem, ShippingAddress};

pub struct NewOrder<'a> {
    pub user_id: Uuid,
    pub items: &'a [OrderItemInput],
    pub shipping_address: &'a ShippingAddress,
    pub payment_method: &'a str,
    pub total_price: Decimal,
}

/// Insert an unpaid order together with its item snapshots.
pub async fn create(pool: &DbPool, new: NewOrder<'_>) -> AppResult<(Order, Vec<OrderItem>)> {
    let mut txn = pool.begin().await?;

    let order: Order = sqlx::query_as(
        r#"
        INSERT INTO orders
            (id, user_id, address, city, postal_code, country, payment_method, total_price)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.user_id)
    .bind(&new.shipping_address.address)
    .bind(&new.shipping_address.city)
    .bind(&new.shipping_address.postal_code)
    .bind(&new.shipping_address.country)
    .bind(new.payment_method)
    .bind(new.total_price)
    .fetch_one(&mut *txn)
    .await?;

    let mut items = Vec::with_capacity(new.items.len());
    for item in new.items {
        let row: OrderItem = sqlx::query_as(
            r#"
            INSERT INTO order_items (id, order_id, product_id, name, image, price, qty)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(order.id)
        .bind(item.product)
        .bind(&item.name)
        .bind(&item.image)
        .bind(item.price)
        .bind(item.qty)
        .fetch_one(&mut *txn)
        .await?;
        items.push(row);
    }

    txn.commit().await?;
    Ok((order, items))
}

pub async fn find(pool: &DbPool, id: Uuid) -> AppResult<Option<Order>> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(order)
}

pub async fn list_by_owner(pool: &DbPool, user_id: Uuid) -> AppResult<Vec<Order>> {
    let orders = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE user_id = $1")
        .bind(user_id)
        .fetch_all(pool)
        .await?;
    Ok(orders)
}

pub async fn items_for(pool: &DbPool, order_id: Uuid) -> AppResult<Vec<OrderItem>> {
    let items = sqlx::query_as::<_, OrderItem>("SELECT * FROM order_items WHERE order_id = $1")
        .bind(order_id)
        .fetch_all(pool)
        .await?;
    Ok(items)
}

/// Item snapshots for a batch of orders, grouped by order id.
pub async fn items_for_orders(
    pool: &DbPool,
    order_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, Vec<OrderItem>>> {
    let items =
        sqlx::query_as::<_, OrderItem>("SELECT * FROM order_items WHERE order_id = ANY($1)")
            .bind(order_ids)
            .fetch_all(pool)
            .await?;

    let mut grouped: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for item in items {
        grouped.entry(item.order_id).or_default().push(item);
    }
    Ok(grouped)
}

/// Record the processor's order id. Set exactly once; a second attempt is
/// rejected rather than overwriting the stored reference.
pub async fn attach_remote_order(
    pool: &DbPool,
    order_id: Uuid,
    remote_order_id: &str,
) -> AppResult<Order> {
    let order = sqlx::query_as::<_, Order>(
        r#"
        UPDATE orders
        SET razorpay_order_id = $2, updated_at = now()
        WHERE id = $1 AND razorpay_order_id IS NULL
        RETURNING *
        "#,
    )
    .bind(order_id)
    .bind(remote_order_id)
    .fetch_optional(pool)
    .await?;

    order.ok_or_else(|| {
        AppError::BadRequest("Order already has a processor order reference".into())
    })
}

/// Flip the order to paid and store the payment proof. Returns `None` when
/// the order was already paid (or does not exist); the `is_paid = FALSE`
/// guard makes duplicate verify deliveries race-safe without a lock.
pub async fn mark_paid(
    pool: &DbPool,
    order_id: Uuid,
    remote_payment_id: &str,
    remote_signature: &str,
) -> AppResult<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(
        r#"
        UPDATE orders
        SET is_paid = TRUE,
            paid_at = now(),
            razorpay_payment_id = $2,
            razorpay_signature = $3,
            updated_at = now()
        WHERE id = $1 AND is_paid = FALSE
        RETURNING *
        "#,
    )
    .bind(order_id)
    .bind(remote_payment_id)
    .bind(remote_signature)
    .fetch_optional(pool)
    .await?;

    Ok(order)
}
