//! Order/payment workflow.
//!
//! Per order the states are: created (unpaid, no processor reference) ->
//! awaiting payment (unpaid, reference attached) -> paid (terminal). The
//! remote reference is attached exactly once and the paid flag never
//! clears, so a duplicate verify delivery settles as a no-op.

use uuid::Uuid;

use crate::{
    dto::orders::{
        CreateOrderRequest, CreateOrderResponse, OrderDetail, OrderList, OrderOwner,
        OrderWithItems, VerifyPaymentRequest,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Order,
    payment::{gateway, signature},
    response::{ApiResponse, Meta},
    state::AppState,
    store,
};

/// The only payment processor wired up.
const PAYMENT_METHOD: &str = "Razorpay";
const CURRENCY: &str = "INR";

/// Persist an unpaid order, then mint the processor-side order and attach
/// its id. The client-submitted total is trusted as given.
///
/// If the gateway call fails the local order stays behind unpaid with no
/// processor reference; the client decides whether to resubmit. No
/// automatic retry happens here, since a retried create could mint a
/// duplicate remote order.
pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<CreateOrderResponse>> {
    if payload.order_items.is_empty() {
        return Err(AppError::BadRequest("No order items".into()));
    }

    let (order, items) = store::orders::create(
        &state.pool,
        store::orders::NewOrder {
            user_id: user.user_id,
            items: &payload.order_items,
            shipping_address: &payload.shipping_address,
            payment_method: PAYMENT_METHOD,
            total_price: payload.total_price,
        },
    )
    .await?;

    let amount = gateway::to_minor_units(order.total_price)?;
    let remote = state
        .gateway
        .create_remote_order(amount, CURRENCY, &order.id.to_string())
        .await?;

    tracing::info!(order_id = %order.id, remote_order_id = %remote.id, "remote order created");
    let order = store::orders::attach_remote_order(&state.pool, order.id, &remote.id).await?;

    Ok(ApiResponse::success(
        "Order created",
        CreateOrderResponse {
            order,
            items,
            razorpay_order: remote,
        },
        Some(Meta::empty()),
    ))
}

/// Check a payment-completion notification against the stored processor
/// reference and, on a genuine signature, record the payment proof.
///
/// Already-paid orders are returned as-is: duplicate deliveries of the
/// same notification must not fail, and re-verification is not attempted.
pub async fn verify_payment(
    state: &AppState,
    order_id: Uuid,
    payload: VerifyPaymentRequest,
) -> AppResult<ApiResponse<Order>> {
    let order = store::orders::find(&state.pool, order_id)
        .await?
        .ok_or(AppError::NotFound)?;

    if order.is_paid {
        return Ok(ApiResponse::success(
            "Payment already verified",
            order,
            Some(Meta::empty()),
        ));
    }

    // The stored reference is authoritative; the client-supplied order id
    // in the body is not consulted.
    let Some(remote_order_id) = order.razorpay_order_id.as_deref() else {
        return Err(AppError::VerificationFailed);
    };

    if !signature::verify(
        remote_order_id,
        &payload.razorpay_payment_id,
        &payload.razorpay_signature,
        &state.config.razorpay_key_secret,
    ) {
        tracing::warn!(order_id = %order.id, "payment signature mismatch");
        return Err(AppError::VerificationFailed);
    }

    let updated = store::orders::mark_paid(
        &state.pool,
        order.id,
        &payload.razorpay_payment_id,
        &payload.razorpay_signature,
    )
    .await?;

    let order = match updated {
        Some(order) => order,
        // A concurrent delivery won the update; the stored proof stands.
        None => store::orders::find(&state.pool, order_id)
            .await?
            .ok_or(AppError::NotFound)?,
    };

    tracing::info!(order_id = %order.id, "payment verified");
    Ok(ApiResponse::success(
        "Payment verified",
        order,
        Some(Meta::empty()),
    ))
}

/// Fetch one order with its owner's name and email. Only the owner may
/// see it; existence is checked before ownership, so a wrong owner on a
/// real order gets 401, not 404.
pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<ApiResponse<OrderDetail>> {
    let order = store::orders::find(&state.pool, order_id)
        .await?
        .ok_or(AppError::NotFound)?;

    if order.user_id != user.user_id {
        return Err(AppError::Unauthorized(
            "Not authorized to view this order".into(),
        ));
    }

    let (name, email): (String, String) =
        sqlx::query_as("SELECT name, email FROM users WHERE id = $1")
            .bind(order.user_id)
            .fetch_one(&state.pool)
            .await?;

    let items = store::orders::items_for(&state.pool, order.id).await?;

    Ok(ApiResponse::success(
        "OK",
        OrderDetail {
            user: OrderOwner {
                id: order.user_id,
                name,
                email,
            },
            order,
            items,
        },
        Some(Meta::empty()),
    ))
}

/// All orders owned by the caller, each with its item snapshots. No
/// ordering guarantee.
pub async fn list_my_orders(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<OrderList>> {
    let orders = store::orders::list_by_owner(&state.pool, user.user_id).await?;

    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let mut grouped = store::orders::items_for_orders(&state.pool, &ids).await?;

    let total = orders.len() as i64;
    let items = orders
        .into_iter()
        .map(|order| {
            let items = grouped.remove(&order.id).unwrap_or_default();
            OrderWithItems { order, items }
        })
        .collect();

    Ok(ApiResponse::success(
        "OK",
        OrderList { items },
        Some(Meta::count(total)),
    ))
}
