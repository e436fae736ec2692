use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use axum_extra::extract::cookie::Key;
use tower::ServiceExt;
use uuid::Uuid;

use bazaar_api::images::ImageStore;
use bazaar_api::{AppState, router};
use bazaar_auth::AuthConfig;
use bazaar_db::Database;
use bazaar_gateway::{ChatScope, Dispatcher};

async fn app() -> Router {
    app_with_uploads().await.0
}

async fn app_with_uploads() -> (Router, PathBuf) {
    let upload_dir = std::env::temp_dir().join(format!("bazaar-routes-{}", Uuid::new_v4()));
    let state = AppState {
        db: Arc::new(Database::open_in_memory().unwrap()),
        dispatcher: Dispatcher::new(ChatScope::Product),
        images: Arc::new(ImageStore::new(upload_dir.clone()).await.unwrap()),
        auth: AuthConfig::default(),
        cookie_key: Key::from(&[7u8; 64][..]),
    };
    (router(state), upload_dir)
}

fn location(res: &Response) -> &str {
    res.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// `name=value` of the named Set-Cookie, ready to send back.
fn cookie(res: &Response, name: &str) -> Option<String> {
    res.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{}=", name)))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

fn form(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str, session: Option<&str>) -> Request<Body> {
    let mut req = Request::get(uri);
    if let Some(cookie) = session {
        req = req.header(header::COOKIE, cookie);
    }
    req.body(Body::empty()).unwrap()
}

async fn body_text(res: Response) -> String {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn login(app: &Router, username: &str, password: &str) -> String {
    let res = app
        .clone()
        .oneshot(form("/register", &format!("username={}&password={}", username, password)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/login");

    let res = app
        .clone()
        .oneshot(form("/login", &format!("username={}&password={}", username, password)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/dashboard");
    cookie(&res, "bazaar_session").expect("login sets the session cookie")
}

#[tokio::test]
async fn protected_pages_send_anonymous_users_to_login() {
    let app = app().await;
    for uri in ["/dashboard", "/profile", "/product/new", "/report", "/chat/abc"] {
        let res = app.clone().oneshot(get(uri, None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER, "{}", uri);
        assert_eq!(location(&res), "/login", "{}", uri);
    }
}

#[tokio::test]
async fn registered_user_reaches_dashboard() {
    let app = app().await;
    let session = login(&app, "alice", "hunter22").await;

    let res = app
        .clone()
        .oneshot(get("/dashboard", Some(&session)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let html = body_text(res).await;
    assert!(html.contains("Hello, alice."));

    // the start page forwards a logged-in visitor
    let res = app.clone().oneshot(get("/", Some(&session))).await.unwrap();
    assert_eq!(location(&res), "/dashboard");
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let app = app().await;
    login(&app, "alice", "hunter22").await;

    let res = app
        .clone()
        .oneshot(form("/login", "username=alice&password=wrong"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/login");
    assert!(cookie(&res, "bazaar_session").is_none());
    assert!(cookie(&res, "bazaar_flash").is_some());
}

#[tokio::test]
async fn tampered_session_cookie_is_ignored() {
    let app = app().await;
    let res = app
        .clone()
        .oneshot(get("/dashboard", Some("bazaar_session=forged-token")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/login");
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = app().await;
    let session = login(&app, "alice", "hunter22").await;

    let res = app
        .clone()
        .oneshot(get("/logout", Some(&session)))
        .await
        .unwrap();
    assert_eq!(location(&res), "/");

    let res = app
        .clone()
        .oneshot(get("/dashboard", Some(&session)))
        .await
        .unwrap();
    assert_eq!(location(&res), "/login");
}

#[tokio::test]
async fn listing_and_report_flow() {
    let app = app().await;
    let session = login(&app, "alice", "hunter22").await;

    let boundary = "bazaarboundary";
    let multipart = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\nLamp\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"description\"\r\n\r\nBrass\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"price\"\r\n\r\n12.50\r\n\
         --{b}--\r\n",
        b = boundary
    );
    let res = app
        .clone()
        .oneshot(
            Request::post("/product/new")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", boundary),
                )
                .header(header::COOKIE, &session)
                .body(Body::from(multipart))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(location(&res), "/dashboard");

    let html = body_text(
        app.clone()
            .oneshot(get("/dashboard", Some(&session)))
            .await
            .unwrap(),
    )
    .await;
    assert!(html.contains("Lamp"));
    assert!(html.contains("12.50"));

    let link = r#"<li><a href="/product/"#;
    let start = html.find(link).unwrap() + link.len();
    let product_id: Uuid = html[start..start + 36].parse().unwrap();

    // public detail page needs no session
    let res = app
        .clone()
        .oneshot(get(&format!("/product/{}", product_id), None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(
            Request::post("/report")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .header(header::COOKIE, &session)
                .body(Body::from(format!("target_id={}&reason=broken", product_id)))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(location(&res), "/dashboard");

    let html = body_text(
        app.clone()
            .oneshot(get(&format!("/product/{}", product_id), None))
            .await
            .unwrap(),
    )
    .await;
    assert!(html.contains("Reports on this listing: 1"));
}

#[tokio::test]
async fn unknown_products_redirect() {
    let app = app().await;
    for uri in [
        format!("/product/{}", Uuid::new_v4()),
        "/product/not-an-id".to_string(),
    ] {
        let res = app.clone().oneshot(get(&uri, None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER, "{}", uri);
        assert_eq!(location(&res), "/dashboard", "{}", uri);
    }
}

#[tokio::test]
async fn untitled_listing_leaves_no_image_behind() {
    let (app, upload_dir) = app_with_uploads().await;
    let session = login(&app, "alice", "hunter22").await;

    let boundary = "bazaarboundary";
    let multipart = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\n   \r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"description\"\r\n\r\nBrass\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"price\"\r\n\r\n5\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"lamp.png\"\r\n\
         Content-Type: image/png\r\n\r\nnot really a png\r\n\
         --{b}--\r\n",
        b = boundary
    );
    let res = app
        .clone()
        .oneshot(
            Request::post("/product/new")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", boundary),
                )
                .header(header::COOKIE, &session)
                .body(Body::from(multipart))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/product/new");

    let stored = std::fs::read_dir(&upload_dir).unwrap().count();
    assert_eq!(stored, 0);
    let _ = std::fs::remove_dir_all(&upload_dir);
}
