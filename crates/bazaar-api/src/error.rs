use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use tracing::error;

use bazaar_types::error::{MarketError, MarketResult};

use crate::cookies;
use crate::views;

/// A failed page action: the notice to show and the page to send the user back to.
#[derive(Debug)]
pub struct Rejection {
    error: MarketError,
    redirect_to: String,
}

impl Rejection {
    pub fn new(error: MarketError, redirect_to: impl Into<String>) -> Self {
        Self {
            error,
            redirect_to: redirect_to.into(),
        }
    }
}

pub trait OrRedirect<T> {
    fn or_redirect(self, to: &str) -> Result<T, Rejection>;
}

impl<T> OrRedirect<T> for MarketResult<T> {
    fn or_redirect(self, to: &str) -> Result<T, Rejection> {
        self.map_err(|e| Rejection::new(e, to))
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        match self.error {
            MarketError::Storage(e) => {
                error!("Storage failure: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Html(views::error_page()),
                )
                    .into_response()
            }
            MarketError::NotAuthenticated => {
                notice(&MarketError::NotAuthenticated.to_string(), "/login")
            }
            other => notice(&other.to_string(), &self.redirect_to),
        }
    }
}

/// Redirect with a one-shot notice shown on the next page.
pub fn notice(message: &str, to: &str) -> Response {
    (cookies::set_flash(CookieJar::new(), message), Redirect::to(to)).into_response()
}
