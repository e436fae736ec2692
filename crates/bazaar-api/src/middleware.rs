use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::SignedCookieJar;

use bazaar_auth::session;
use bazaar_types::error::MarketError;

use crate::cookies;
use crate::error::Rejection;
use crate::state::AppState;

/// Raw session token of the current request, for handlers that pass it on
/// (the chat socket re-checks it on every message).
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

/// Resolve the session cookie and attach the user to the request, or send the
/// client to the login page.
pub async fn require_session(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(token) = cookies::session_token(&jar) else {
        return Rejection::new(MarketError::NotAuthenticated, "/login").into_response();
    };

    let lookup = token.clone();
    match state.run(move |db| session::resolve(db, &lookup)).await {
        Ok(user) => {
            req.extensions_mut().insert(user);
            req.extensions_mut().insert(SessionToken(token));
            next.run(req).await
        }
        Err(MarketError::NotAuthenticated) => (
            cookies::clear_session(jar),
            Rejection::new(MarketError::NotAuthenticated, "/login"),
        )
            .into_response(),
        Err(e) => Rejection::new(e, "/login").into_response(),
    }
}
