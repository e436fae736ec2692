use axum::{
    Extension,
    extract::{Path, State, WebSocketUpgrade},
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;

use bazaar_auth::SessionUser;
use bazaar_gateway::{chat, connection};
use bazaar_types::error::MarketError;

use super::parse_id;
use crate::error::{OrRedirect, Rejection};
use crate::middleware::SessionToken;
use crate::state::AppState;
use crate::{accounts, catalog, cookies, views};

/// GET /chat/{product_id}
pub async fn chat_page(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(id): Path<String>,
    flashes: CookieJar,
) -> Result<Response, Rejection> {
    let (product, seller, history) = state
        .run(move |db| {
            let product = catalog::get(db, parse_id(&id)?)?;
            let seller = match accounts::load_user(db, product.owner_id) {
                Ok(user) => Some(user),
                Err(MarketError::NotFound) => None,
                Err(e) => return Err(e),
            };
            let history = chat::history(db, product.id)?;
            Ok((product, seller, history))
        })
        .await
        .or_redirect("/dashboard")?;

    let participants = state.dispatcher.participant_count(product.id);
    let (flashes, flash) = cookies::take_flash(flashes);
    let html = views::chat(
        flash.as_deref(),
        &user.username,
        &product,
        seller.as_ref(),
        &history,
        state.dispatcher.scope(),
        participants,
    );
    Ok((flashes, Html(html)).into_response())
}

/// GET /chat/{product_id}/ws: upgrade to the live conversation.
pub async fn chat_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Extension(SessionToken(token)): Extension<SessionToken>,
    Path(id): Path<String>,
) -> Result<Response, Rejection> {
    let product = state
        .run(move |db| catalog::get(db, parse_id(&id)?))
        .await
        .or_redirect("/dashboard")?;

    let db = state.db.clone();
    let dispatcher = state.dispatcher.clone();
    Ok(ws.on_upgrade(move |socket| {
        connection::handle_connection(socket, db, dispatcher, user, token, product.id)
    }))
}
