use axum::{
    Extension, Form,
    extract::{Query, State},
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

use bazaar_auth::SessionUser;
use bazaar_types::api::{ReportForm, ReportQuery};

use crate::error::{OrRedirect, Rejection, notice};
use crate::state::AppState;
use crate::{cookies, moderation, views};

/// GET /report?target_id=...
pub async fn report_page(
    Extension(user): Extension<SessionUser>,
    Query(query): Query<ReportQuery>,
    flashes: CookieJar,
) -> impl IntoResponse {
    let (flashes, flash) = cookies::take_flash(flashes);
    let target = query.target_id.unwrap_or_default();
    (
        flashes,
        Html(views::report(flash.as_deref(), &user.username, &target)),
    )
}

/// POST /report
pub async fn file_report(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Form(form): Form<ReportForm>,
) -> Result<Response, Rejection> {
    // only echo ids back into the Location header when they are plain UUIDs
    let back = match form.target_id.trim().parse::<Uuid>() {
        Ok(id) => format!("/report?target_id={}", id),
        Err(_) => "/report".to_string(),
    };
    let filed = state
        .run(move |db| moderation::file(db, user.id, &form.target_id, &form.reason))
        .await
        .or_redirect(&back)?;

    let message = if filed.made_dormant {
        "Report received. The account has been suspended."
    } else {
        "Report received."
    };
    Ok(notice(message, "/dashboard"))
}
