pub mod accounts;
pub mod catalog;
pub mod cookies;
pub mod error;
pub mod images;
pub mod middleware;
pub mod moderation;
pub mod routes;
pub mod state;
pub mod views;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use tower_http::services::ServeDir;

pub use state::AppState;

use crate::images::MAX_IMAGE_BYTES;
use crate::middleware::require_session;
use crate::routes::{account, auth, chat, products, reports};

/// Slack on top of the image limit for the text fields of a listing form.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// All marketplace pages, the chat socket and the uploaded images.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(auth::index))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/product/{id}", get(products::view_product));

    let protected_routes = Router::new()
        .route("/dashboard", get(account::dashboard))
        .route(
            "/profile",
            get(account::profile_page).post(account::update_profile),
        )
        .route("/change_password", post(auth::change_password))
        .route(
            "/product/new",
            get(products::new_product_page).post(products::create_product).layer(
                DefaultBodyLimit::max(MAX_IMAGE_BYTES + FORM_OVERHEAD_BYTES),
            ),
        )
        .route(
            "/product/edit/{id}",
            get(products::edit_product_page).post(products::edit_product),
        )
        .route("/product/delete/{id}", get(products::delete_product))
        .route("/report", get(reports::report_page).post(reports::file_report))
        .route("/chat/{id}", get(chat::chat_page))
        .route("/chat/{id}/ws", get(chat::chat_socket))
        .route_layer(from_fn_with_state(state.clone(), require_session));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service("/static/uploads", ServeDir::new(state.images.dir()))
        .with_state(state)
}
