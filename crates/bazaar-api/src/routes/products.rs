use axum::{
    Extension, Form,
    body::Bytes,
    extract::{Multipart, Path, State, multipart::MultipartError},
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::cookie::{CookieJar, SignedCookieJar};
use tracing::warn;

use bazaar_auth::{SessionUser, session};
use bazaar_types::api::ProductForm;
use bazaar_types::error::MarketError;

use super::parse_id;
use crate::catalog::{self, NewProduct, ProductChanges};
use crate::error::{OrRedirect, Rejection, notice};
use crate::state::AppState;
use crate::{accounts, cookies, moderation, views};

/// Fields of the multipart listing form.
#[derive(Default)]
struct ListingUpload {
    title: String,
    description: String,
    price: String,
    image: Option<(String, Bytes)>,
}

fn bad_upload(e: MultipartError) -> Rejection {
    warn!("Rejected product upload: {}", e);
    Rejection::new(
        MarketError::InvalidInput(format!("upload failed: {}", e.body_text())),
        "/product/new",
    )
}

async fn read_listing(mut multipart: Multipart) -> Result<ListingUpload, Rejection> {
    let mut upload = ListingUpload::default();

    while let Some(field) = multipart.next_field().await.map_err(bad_upload)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => upload.title = field.text().await.map_err(bad_upload)?,
            "description" => upload.description = field.text().await.map_err(bad_upload)?,
            "price" => upload.price = field.text().await.map_err(bad_upload)?,
            "image" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(bad_upload)?;
                // browsers send an empty part when no file was chosen
                if !file_name.is_empty() && !data.is_empty() {
                    upload.image = Some((file_name, data));
                }
            }
            _ => {}
        }
    }

    Ok(upload)
}

pub async fn new_product_page(
    Extension(user): Extension<SessionUser>,
    flashes: CookieJar,
) -> impl IntoResponse {
    let (flashes, flash) = cookies::take_flash(flashes);
    (flashes, Html(views::new_product(flash.as_deref(), &user.username)))
}

/// POST /product/new: multipart with an optional image.
pub async fn create_product(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    multipart: Multipart,
) -> Result<Response, Rejection> {
    let upload = read_listing(multipart).await?;
    // validate the text fields before anything reaches the image directory
    catalog::require_title(&upload.title).or_redirect("/product/new")?;
    let price = catalog::parse_price(&upload.price).or_redirect("/product/new")?;

    let image_key = match &upload.image {
        Some((file_name, data)) => Some(
            state
                .images
                .save(file_name, data)
                .await
                .or_redirect("/product/new")?,
        ),
        None => None,
    };

    let product = NewProduct {
        title: upload.title,
        description: upload.description,
        price,
        image_key,
    };
    state
        .run(move |db| catalog::create(db, user.id, product))
        .await
        .or_redirect("/product/new")?;

    Ok(notice("Product listed.", "/dashboard"))
}

/// GET /product/{id}: public detail page.
pub async fn view_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    jar: SignedCookieJar,
    flashes: CookieJar,
) -> Result<Response, Rejection> {
    let token = cookies::session_token(&jar);

    let (product, seller, report_count, viewer) = state
        .run(move |db| {
            let product = catalog::get(db, parse_id(&id)?)?;
            let seller = match accounts::load_user(db, product.owner_id) {
                Ok(user) => Some(user),
                Err(MarketError::NotFound) => None,
                Err(e) => return Err(e),
            };
            let report_count = moderation::count_for(db, &product.id.to_string())?;
            let viewer = token.and_then(|t| session::resolve(db, &t).ok());
            Ok((product, seller, report_count, viewer))
        })
        .await
        .or_redirect("/dashboard")?;

    let (flashes, flash) = cookies::take_flash(flashes);
    let html = views::view_product(
        flash.as_deref(),
        viewer.as_ref().map(|v| v.username.as_str()),
        &product,
        seller.as_ref(),
        report_count,
    );
    Ok((flashes, Html(html)).into_response())
}

/// GET /product/edit/{id}
pub async fn edit_product_page(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(id): Path<String>,
    flashes: CookieJar,
) -> Result<Response, Rejection> {
    let owner = user.id;
    let product = state
        .run(move |db| catalog::owned(db, parse_id(&id).map_err(|_| MarketError::NotOwner)?, owner))
        .await
        .or_redirect("/profile")?;

    let (flashes, flash) = cookies::take_flash(flashes);
    Ok((
        flashes,
        Html(views::edit_product(flash.as_deref(), &user.username, &product)),
    )
        .into_response())
}

/// POST /product/edit/{id}
pub async fn edit_product(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(id): Path<String>,
    Form(form): Form<ProductForm>,
) -> Result<Response, Rejection> {
    let product_id = parse_id(&id)
        .map_err(|_| MarketError::NotOwner)
        .or_redirect("/profile")?;
    let edit_page = format!("/product/edit/{}", product_id);

    let changes = ProductChanges {
        price: catalog::parse_price(&form.price).or_redirect(&edit_page)?,
        title: form.title,
        description: form.description,
    };

    match state
        .run(move |db| catalog::update(db, product_id, user.id, changes))
        .await
    {
        Ok(()) => Ok(notice("Product updated.", "/profile")),
        Err(e @ MarketError::InvalidInput(_)) => Err(Rejection::new(e, edit_page)),
        Err(e) => Err(Rejection::new(e, "/profile")),
    }
}

/// GET /product/delete/{id}
pub async fn delete_product(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(id): Path<String>,
) -> Result<Response, Rejection> {
    state
        .run(move |db| {
            let product_id = parse_id(&id).map_err(|_| MarketError::NotOwner)?;
            catalog::delete(db, product_id, user.id)
        })
        .await
        .or_redirect("/profile")?;

    Ok(notice("Product deleted.", "/profile"))
}
