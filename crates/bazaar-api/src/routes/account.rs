use axum::{
    Extension, Form,
    extract::State,
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;

use bazaar_auth::SessionUser;
use bazaar_types::api::ProfileForm;

use crate::error::{OrRedirect, Rejection, notice};
use crate::state::AppState;
use crate::{accounts, catalog, cookies, views};

/// GET /dashboard: current user plus every listing.
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    flashes: CookieJar,
) -> Result<Response, Rejection> {
    let (me, products) = state
        .run(move |db| Ok((accounts::load_user(db, user.id)?, catalog::list_all(db)?)))
        .await
        .or_redirect("/login")?;

    let (flashes, flash) = cookies::take_flash(flashes);
    Ok((flashes, Html(views::dashboard(flash.as_deref(), &me, &products))).into_response())
}

/// GET /profile: bio, own listings and the password form.
pub async fn profile_page(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    flashes: CookieJar,
) -> Result<Response, Rejection> {
    let (me, products) = state
        .run(move |db| {
            Ok((
                accounts::load_user(db, user.id)?,
                catalog::list_by_owner(db, user.id)?,
            ))
        })
        .await
        .or_redirect("/login")?;

    let (flashes, flash) = cookies::take_flash(flashes);
    Ok((flashes, Html(views::profile(flash.as_deref(), &me, &products))).into_response())
}

/// POST /profile
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Form(form): Form<ProfileForm>,
) -> Result<Response, Rejection> {
    state
        .run(move |db| accounts::update_bio(db, user.id, &form.bio))
        .await
        .or_redirect("/profile")?;

    Ok(notice("Profile updated.", "/profile"))
}
