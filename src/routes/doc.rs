use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{AuthResponse, Profile},
        orders::{CreateOrderResponse, OrderDetail, OrderList, OrderWithItems},
        products::ProductList,
    },
    models::{Order, OrderItem, Product, ShippingAddress, User},
    payment::gateway::RemoteOrder,
    response::{ApiResponse, Meta},
    routes::{auth, health, orders, products},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::logout,
        auth::me,
        products::list_products,
        products::get_product,
        orders::create_order,
        orders::verify_payment,
        orders::list_my_orders,
        orders::get_order,
    ),
    components(
        schemas(
            User,
            Product,
            Order,
            OrderItem,
            ShippingAddress,
            RemoteOrder,
            AuthResponse,
            Profile,
            ProductList,
            CreateOrderResponse,
            OrderDetail,
            OrderList,
            OrderWithItems,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CreateOrderResponse>,
            ApiResponse<OrderDetail>,
            ApiResponse<OrderList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Products", description = "Product catalog endpoints"),
        (name = "Orders", description = "Order and payment endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
