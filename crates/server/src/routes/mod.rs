//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                                - Liveness check
//! GET  /health/ready                          - Readiness check (DB ping)
//! GET  /ws                                    - WebSocket upgrade
//!
//! # Users
//! POST   /api/user/register                   - Register (multipart, sets cookie)
//! POST   /api/user/login                      - Login (sets cookie)
//! GET    /api/user/logout                     - Clear cookie (auth)
//! GET    /api/user/checkAuthentication        - Token validity check (auth)
//! GET    /api/user/me                         - Own profile (auth)
//! POST   /api/user/cart/add/{productId}       - Append to cart (auth)
//! DELETE /api/user/cart/remove/{productId}    - Filter out of cart (auth)
//! POST   /api/user/favorites/add/{productId}  - Add favorite (auth)
//! DELETE /api/user/favorites/remove/{productId} - Remove favorite (auth)
//! POST   /api/user/admin                      - Promote to admin (auth + admin)
//! GET    /api/user/all                        - List users (auth + admin)
//!
//! # Products
//! POST   /api/product/create                  - Create (auth, multipart)
//! PUT    /api/product/update/{productId}      - Patch (auth + owner/admin, multipart)
//! DELETE /api/product/delete/{productId}      - Delete (auth + owner/admin)
//! GET    /api/product/get/{productId}         - Get by id (public)
//! GET    /api/product/getAll                  - List all (public)
//! GET    /api/product/getByUserId/{userId}    - List by owner (auth)
//! ```

pub mod forms;
pub mod products;
pub mod users;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::realtime::ws;
use crate::state::AppState;

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(users::register))
        .route("/login", post(users::login))
        .route("/logout", get(users::logout))
        .route("/checkAuthentication", get(users::check_authentication))
        .route("/me", get(users::me))
        .route("/cart/add/{productId}", post(users::add_cart))
        .route("/cart/remove/{productId}", delete(users::remove_cart))
        .route("/favorites/add/{productId}", post(users::add_favorite))
        .route(
            "/favorites/remove/{productId}",
            delete(users::remove_favorite),
        )
        .route("/admin", post(users::promote_to_admin))
        .route("/all", get(users::list_users))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/create", post(products::create_product))
        .route("/update/{productId}", put(products::update_product))
        .route("/delete/{productId}", delete(products::delete_product))
        .route("/get/{productId}", get(products::get_product))
        .route("/getAll", get(products::get_all_products))
        .route("/getByUserId/{userId}", get(products::get_products_by_user))
}

/// Create all routes for the server.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/user", user_routes())
        .nest("/api/product", product_routes())
        .route("/ws", get(ws::ws_handler))
}
