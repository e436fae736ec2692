use axum::{
    Extension, Form,
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{CookieJar, SignedCookieJar};

use bazaar_auth::{SessionUser, session};
use bazaar_types::api::{ChangePasswordForm, LoginForm, RegisterForm};

use crate::cookies;
use crate::error::{OrRedirect, Rejection, notice};
use crate::state::AppState;
use crate::views;

/// GET /: start page, or straight to the dashboard with a live session.
pub async fn index(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    flashes: CookieJar,
) -> Response {
    if let Some(token) = cookies::session_token(&jar) {
        if state.run(move |db| session::resolve(db, &token)).await.is_ok() {
            return Redirect::to("/dashboard").into_response();
        }
    }

    let (flashes, flash) = cookies::take_flash(flashes);
    (flashes, Html(views::index(flash.as_deref()))).into_response()
}

pub async fn register_page(flashes: CookieJar) -> impl IntoResponse {
    let (flashes, flash) = cookies::take_flash(flashes);
    (flashes, Html(views::register(flash.as_deref())))
}

/// POST /register
pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Result<Response, Rejection> {
    state
        .run(move |db| session::register(db, &form.username, &form.password))
        .await
        .or_redirect("/register")?;

    Ok(notice("Registration complete. Please log in.", "/login"))
}

pub async fn login_page(flashes: CookieJar) -> impl IntoResponse {
    let (flashes, flash) = cookies::take_flash(flashes);
    (flashes, Html(views::login(flash.as_deref())))
}

/// POST /login: issues the session cookie.
pub async fn login(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, Rejection> {
    let config = state.auth.clone();
    let issued = state
        .run(move |db| session::authenticate(db, &config, &form.username, &form.password))
        .await
        .or_redirect("/login")?;

    Ok((
        cookies::set_session(jar, issued.token),
        notice("Logged in.", "/dashboard"),
    )
        .into_response())
}

/// GET /logout
pub async fn logout(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> Result<Response, Rejection> {
    if let Some(token) = cookies::session_token(&jar) {
        state
            .run(move |db| session::logout(db, &token))
            .await
            .or_redirect("/")?;
    }

    Ok((cookies::clear_session(jar), notice("Logged out.", "/")).into_response())
}

/// POST /change_password
pub async fn change_password(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Form(form): Form<ChangePasswordForm>,
) -> Result<Response, Rejection> {
    state
        .run(move |db| {
            session::change_password(db, user.id, &form.current_password, &form.new_password)
        })
        .await
        .or_redirect("/profile")?;

    Ok(notice("Password changed.", "/profile"))
}
