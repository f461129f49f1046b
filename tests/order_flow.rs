use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal_macros::dec;
use uuid::Uuid;

use shopverse_api::{
    config::AppConfig,
    db::create_pool,
    dto::orders::{CreateOrderRequest, OrderItemInput, VerifyPaymentRequest},
    error::AppError,
    middleware::auth::AuthUser,
    models::ShippingAddress,
    payment::gateway::{GatewayError, PaymentGateway, RemoteOrder},
    payment::signature,
    services::order_service,
    state::AppState,
};

// Integration flow: create order -> remote order minted -> reject a forged
// signature -> accept the genuine one -> repeat delivery is a no-op ->
// ownership is enforced on reads.
//
// Requires a database; set TEST_DATABASE_URL or DATABASE_URL to run.

struct MockGateway;

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_remote_order(
        &self,
        amount: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<RemoteOrder, GatewayError> {
        assert!(!receipt.is_empty(), "receipt must carry the local order id");
        Ok(RemoteOrder {
            id: format!("order_{}", Uuid::new_v4().simple()),
            amount,
            currency: currency.to_string(),
        })
    }
}

struct FailingGateway;

#[async_trait]
impl PaymentGateway for FailingGateway {
    async fn create_remote_order(
        &self,
        _amount: i64,
        _currency: &str,
        _receipt: &str,
    ) -> Result<RemoteOrder, GatewayError> {
        Err(GatewayError::Network("connection refused".into()))
    }
}

#[tokio::test]
async fn create_verify_and_authorization_flow() -> anyhow::Result<()> {
    let Some(state) = setup_state(Arc::new(MockGateway)).await? else {
        return Ok(());
    };

    let owner = create_user(&state, "Order Owner").await?;
    let stranger = create_user(&state, "Someone Else").await?;

    // Create: snapshot items, trusted total of 20.00 -> 2000 paise.
    let created = order_service::create_order(&state, &owner, order_request()).await?;
    let data = created.data.expect("create response data");
    assert!(!data.order.is_paid);
    assert!(data.order.paid_at.is_none());
    let remote_order_id = data
        .order
        .razorpay_order_id
        .clone()
        .expect("remote reference attached");
    assert_eq!(remote_order_id, data.razorpay_order.id);
    assert_eq!(data.razorpay_order.amount, 2000);
    assert_eq!(data.razorpay_order.currency, "INR");
    assert_eq!(data.order.payment_method, "Razorpay");

    // Item snapshot equals the submitted line exactly, independent of any
    // catalog state (the referenced product was never inserted).
    assert_eq!(data.items.len(), 1);
    assert_eq!(data.items[0].name, "Widget");
    assert_eq!(data.items[0].price, dec!(10.00));
    assert_eq!(data.items[0].qty, 2);

    let order_id = data.order.id;

    // Forged signature: rejected, order untouched.
    let forged = VerifyPaymentRequest {
        razorpay_order_id: remote_order_id.clone(),
        razorpay_payment_id: "pay_forged".into(),
        razorpay_signature: "00".repeat(32),
    };
    let err = order_service::verify_payment(&state, order_id, forged)
        .await
        .expect_err("forged signature must not verify");
    assert!(matches!(err, AppError::VerificationFailed));

    let unchanged = order_service::get_order(&state, &owner, order_id).await?;
    let unchanged = unchanged.data.expect("order detail").order;
    assert!(!unchanged.is_paid);
    assert!(unchanged.razorpay_payment_id.is_none());

    // Genuine signature: order becomes paid, proof stored.
    let payment_id = "pay_genuine_001".to_string();
    let genuine = VerifyPaymentRequest {
        razorpay_order_id: remote_order_id.clone(),
        razorpay_payment_id: payment_id.clone(),
        razorpay_signature: signature::expected_signature(
            &remote_order_id,
            &payment_id,
            &state.config.razorpay_key_secret,
        ),
    };
    let verified = order_service::verify_payment(&state, order_id, genuine).await?;
    let paid = verified.data.expect("verified order");
    assert!(paid.is_paid);
    assert!(paid.paid_at.is_some());
    assert_eq!(paid.razorpay_payment_id.as_deref(), Some(payment_id.as_str()));

    // Duplicate delivery: no-op success, proof unchanged.
    let duplicate = VerifyPaymentRequest {
        razorpay_order_id: remote_order_id.clone(),
        razorpay_payment_id: payment_id.clone(),
        razorpay_signature: signature::expected_signature(
            &remote_order_id,
            &payment_id,
            &state.config.razorpay_key_secret,
        ),
    };
    let repeated = order_service::verify_payment(&state, order_id, duplicate).await?;
    let still_paid = repeated.data.expect("repeated verify data");
    assert!(still_paid.is_paid);
    assert_eq!(still_paid.paid_at, paid.paid_at);
    assert_eq!(still_paid.razorpay_payment_id, paid.razorpay_payment_id);

    // Reads: strangers get 401, the owner sees name and email resolved.
    let err = order_service::get_order(&state, &stranger, order_id)
        .await
        .expect_err("stranger must not read the order");
    assert!(matches!(err, AppError::Unauthorized(_)));

    let detail = order_service::get_order(&state, &owner, order_id).await?;
    let detail = detail.data.expect("order detail");
    assert_eq!(detail.user.id, owner.user_id);
    assert!(detail.user.email.ends_with("@example.com"));

    let mine = order_service::list_my_orders(&state, &owner).await?;
    let mine = mine.data.expect("order list");
    assert!(
        mine.items
            .iter()
            .any(|entry| entry.order.id == order_id && entry.items.len() == 1)
    );

    // Missing order is 404 before any signature work.
    let err = order_service::verify_payment(
        &state,
        Uuid::new_v4(),
        VerifyPaymentRequest {
            razorpay_order_id: "order_none".into(),
            razorpay_payment_id: "pay_none".into(),
            razorpay_signature: "00".repeat(32),
        },
    )
    .await
    .expect_err("missing order");
    assert!(matches!(err, AppError::NotFound));

    Ok(())
}

#[tokio::test]
async fn empty_items_are_rejected_and_nothing_persists() -> anyhow::Result<()> {
    let Some(state) = setup_state(Arc::new(MockGateway)).await? else {
        return Ok(());
    };

    let user = create_user(&state, "Empty Cart").await?;

    let mut payload = order_request();
    payload.order_items.clear();
    let err = order_service::create_order(&state, &user, payload)
        .await
        .expect_err("empty item list");
    assert!(matches!(err, AppError::BadRequest(_)));

    let mine = order_service::list_my_orders(&state, &user).await?;
    assert!(mine.data.expect("order list").items.is_empty());

    Ok(())
}

#[tokio::test]
async fn gateway_failure_leaves_an_orphaned_unpaid_order() -> anyhow::Result<()> {
    let Some(state) = setup_state(Arc::new(FailingGateway)).await? else {
        return Ok(());
    };

    let user = create_user(&state, "Unlucky Buyer").await?;

    let err = order_service::create_order(&state, &user, order_request())
        .await
        .expect_err("gateway is down");
    assert!(matches!(err, AppError::Gateway(_)));

    // The local order survives: unpaid, no processor reference.
    let mine = order_service::list_my_orders(&state, &user).await?;
    let mine = mine.data.expect("order list");
    assert_eq!(mine.items.len(), 1);
    let orphan = &mine.items[0].order;
    assert!(!orphan.is_paid);
    assert!(orphan.razorpay_order_id.is_none());

    // Verification cannot succeed without a stored reference.
    let err = order_service::verify_payment(
        &state,
        orphan.id,
        VerifyPaymentRequest {
            razorpay_order_id: "order_whatever".into(),
            razorpay_payment_id: "pay_whatever".into(),
            razorpay_signature: "00".repeat(32),
        },
    )
    .await
    .expect_err("no remote reference to verify against");
    assert!(matches!(err, AppError::VerificationFailed));

    Ok(())
}

fn order_request() -> CreateOrderRequest {
    CreateOrderRequest {
        order_items: vec![OrderItemInput {
            product: Uuid::new_v4(),
            name: "Widget".into(),
            image: "/images/widget.jpg".into(),
            price: dec!(10.00),
            qty: 2,
        }],
        shipping_address: ShippingAddress {
            address: "221B Baker Street".into(),
            city: "London".into(),
            postal_code: "NW1 6XE".into(),
            country: "UK".into(),
        },
        total_price: dec!(20.00),
    }
}

async fn setup_state(gateway: Arc<dyn PaymentGateway>) -> anyhow::Result<Option<AppState>> {
    // Allow skipping when no database is configured in the environment.
    let database_url =
        match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
            Ok(url) => url,
            Err(_) => {
                eprintln!(
                    "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run order flow tests."
                );
                return Ok(None);
            }
        };

    let pool = create_pool(&database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let config = AppConfig {
        database_url,
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: "test-jwt-secret".into(),
        razorpay_key_id: "rzp_test_key".into(),
        razorpay_key_secret: "rzp_test_secret".into(),
    };

    Ok(Some(AppState {
        pool,
        config,
        gateway,
    }))
}

// Fresh user per call so concurrent tests never collide on data.
async fn create_user(state: &AppState, name: &str) -> anyhow::Result<AuthUser> {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, name, email, password_hash) VALUES ($1, $2, $3, $4)")
        .bind(id)
        .bind(name)
        .bind(format!("{}@example.com", id.simple()))
        .bind("dummy")
        .execute(&state.pool)
        .await?;

    Ok(AuthUser { user_id: id })
}
