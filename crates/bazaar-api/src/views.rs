//! Server-rendered pages. Every piece of user-supplied text goes through [`escape`].

use std::fmt::Write;

use bazaar_gateway::ChatScope;
use bazaar_types::models::{AccountStatus, ChatMessage, Product, User};

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

fn layout(title: &str, flash: Option<&str>, viewer: Option<&str>, body: &str) -> String {
    let nav = match viewer {
        Some(username) => format!(
            r#"<a href="/dashboard">Dashboard</a> <a href="/product/new">Sell something</a> <a href="/profile">{}</a> <a href="/logout">Log out</a>"#,
            escape(username)
        ),
        None => r#"<a href="/">Home</a> <a href="/login">Log in</a> <a href="/register">Register</a>"#
            .to_string(),
    };
    let flash = flash
        .map(|m| format!(r#"<p class="flash">{}</p>"#, escape(m)))
        .unwrap_or_default();

    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title} · Bazaar</title>
<style>
body {{ font-family: sans-serif; max-width: 52rem; margin: 1rem auto; padding: 0 1rem; }}
nav a {{ margin-right: .75rem; }}
.flash {{ background: #fff3cd; padding: .5rem; }}
.dormant {{ color: #a00; }}
img.product {{ max-width: 20rem; }}
</style>
</head>
<body>
<nav>{nav}</nav>
{flash}
<h1>{title}</h1>
{body}
</body>
</html>"#,
        title = escape(title),
    )
}

fn product_list(products: &[Product], with_owner_actions: bool) -> String {
    if products.is_empty() {
        return "<p>No products yet.</p>".to_string();
    }

    let mut html = String::from("<ul>");
    for p in products {
        let _ = write!(
            html,
            r#"<li><a href="/product/{id}">{title}</a> · {price}"#,
            id = p.id,
            title = escape(&p.title),
            price = p.price,
        );
        if with_owner_actions {
            let _ = write!(
                html,
                r#" · <a href="/product/edit/{id}">edit</a> · <a href="/product/delete/{id}">delete</a>"#,
                id = p.id
            );
        }
        html.push_str("</li>");
    }
    html.push_str("</ul>");
    html
}

fn status_badge(user: &User) -> &'static str {
    match user.status {
        AccountStatus::Active => "",
        AccountStatus::Dormant => r#" <span class="dormant">(dormant)</span>"#,
    }
}

pub fn index(flash: Option<&str>) -> String {
    layout(
        "Welcome",
        flash,
        None,
        "<p>Buy and sell second-hand goods. Log in or register to start listing.</p>",
    )
}

pub fn register(flash: Option<&str>) -> String {
    layout(
        "Register",
        flash,
        None,
        r#"<form method="post" action="/register">
<label>Username <input name="username" required></label>
<label>Password <input name="password" type="password" required></label>
<button type="submit">Register</button>
</form>"#,
    )
}

pub fn login(flash: Option<&str>) -> String {
    layout(
        "Log in",
        flash,
        None,
        r#"<form method="post" action="/login">
<label>Username <input name="username" required></label>
<label>Password <input name="password" type="password" required></label>
<button type="submit">Log in</button>
</form>"#,
    )
}

pub fn dashboard(flash: Option<&str>, user: &User, products: &[Product]) -> String {
    let body = format!(
        "<p>Hello, {}.</p>\n<h2>All products</h2>\n{}",
        escape(&user.username),
        product_list(products, false)
    );
    layout("Dashboard", flash, Some(&user.username), &body)
}

pub fn profile(flash: Option<&str>, user: &User, products: &[Product]) -> String {
    let body = format!(
        r#"<p>User id: <code>{id}</code></p>
<form method="post" action="/profile">
<label>Bio<br><textarea name="bio" rows="4" cols="50">{bio}</textarea></label><br>
<button type="submit">Save profile</button>
</form>
<h2>Change password</h2>
<form method="post" action="/change_password">
<label>Current password <input name="current_password" type="password" required></label>
<label>New password <input name="new_password" type="password" required></label>
<button type="submit">Change password</button>
</form>
<h2>My products</h2>
{products}"#,
        id = user.id,
        bio = escape(user.bio.as_deref().unwrap_or_default()),
        products = product_list(products, true),
    );
    layout("Profile", flash, Some(&user.username), &body)
}

pub fn new_product(flash: Option<&str>, viewer: &str) -> String {
    layout(
        "Sell something",
        flash,
        Some(viewer),
        r#"<form method="post" action="/product/new" enctype="multipart/form-data">
<label>Title <input name="title" required></label><br>
<label>Description<br><textarea name="description" rows="4" cols="50"></textarea></label><br>
<label>Price <input name="price" placeholder="12.50" required></label><br>
<label>Image (png, jpg, jpeg, gif) <input name="image" type="file" accept=".png,.jpg,.jpeg,.gif"></label><br>
<button type="submit">List product</button>
</form>"#,
    )
}

pub fn edit_product(flash: Option<&str>, viewer: &str, product: &Product) -> String {
    let body = format!(
        r#"<form method="post" action="/product/edit/{id}">
<label>Title <input name="title" value="{title}" required></label><br>
<label>Description<br><textarea name="description" rows="4" cols="50">{description}</textarea></label><br>
<label>Price <input name="price" value="{price}" required></label><br>
<button type="submit">Save</button>
</form>"#,
        id = product.id,
        title = escape(&product.title),
        description = escape(&product.description),
        price = product.price,
    );
    layout("Edit product", flash, Some(viewer), &body)
}

pub fn view_product(
    flash: Option<&str>,
    viewer: Option<&str>,
    product: &Product,
    seller: Option<&User>,
    report_count: u64,
) -> String {
    let image = product
        .image_key
        .as_deref()
        .map(|key| {
            format!(
                r#"<img class="product" src="/static/uploads/{}" alt="{}">"#,
                escape(key),
                escape(&product.title)
            )
        })
        .unwrap_or_default();

    let seller_html = match seller {
        Some(s) => format!(
            r#"{}{} · <a href="/report?target_id={}">report seller</a>"#,
            escape(&s.username),
            status_badge(s),
            s.id
        ),
        None => "unknown".to_string(),
    };

    let body = format!(
        r#"{image}
<p>{description}</p>
<p>Price: {price}</p>
<p>Seller: {seller_html}</p>
<p>Reports on this listing: {report_count}</p>
<p><a href="/chat/{id}">Chat with the seller</a> · <a href="/report?target_id={id}">Report this listing</a></p>"#,
        description = escape(&product.description),
        price = product.price,
        id = product.id,
    );
    layout(&product.title, flash, viewer, &body)
}

pub fn report(flash: Option<&str>, viewer: &str, target_id: &str) -> String {
    let body = format!(
        r#"<form method="post" action="/report">
<label>User or product id <input name="target_id" value="{target}" required></label><br>
<label>Reason<br><textarea name="reason" rows="4" cols="50" required></textarea></label><br>
<button type="submit">Send report</button>
</form>"#,
        target = escape(target_id),
    );
    layout("Report", flash, Some(viewer), &body)
}

const CHAT_SCRIPT: &str = r#"<script>
(() => {
  const productId = "__PRODUCT_ID__";
  const log = document.getElementById("chat-log");
  const proto = location.protocol === "https:" ? "wss" : "ws";
  const socket = new WebSocket(`${proto}://${location.host}/chat/${productId}/ws`);
  socket.onmessage = (e) => {
    const event = JSON.parse(e.data);
    if (event.type !== "message") return;
    const li = document.createElement("li");
    li.textContent = `${event.data.username}: ${event.data.message}`;
    log.appendChild(li);
  };
  document.getElementById("chat-form").addEventListener("submit", (e) => {
    e.preventDefault();
    const input = document.getElementById("chat-input");
    if (!input.value.trim()) return;
    socket.send(JSON.stringify({ type: "send_message", data: { product_id: productId, message: input.value } }));
    input.value = "";
  });
})();
</script>"#;

pub fn chat(
    flash: Option<&str>,
    viewer: &str,
    product: &Product,
    seller: Option<&User>,
    history: &[ChatMessage],
    scope: ChatScope,
    participants: usize,
) -> String {
    let mut log = String::new();
    for m in history {
        let _ = write!(
            log,
            r#"<li title="{at}">{user}: {text}</li>"#,
            at = m.created_at.format("%Y-%m-%d %H:%M:%S"),
            user = escape(&m.username),
            text = escape(&m.message),
        );
    }

    let audience = match scope {
        ChatScope::Product => "Messages go to everyone viewing this product's chat.",
        ChatScope::Global => "Messages go to everyone connected to any chat.",
    };

    let body = format!(
        r#"<p><a href="/product/{id}">{title}</a> · seller: {seller} · {participants} connected</p>
<p><small>{audience}</small></p>
<ul id="chat-log">{log}</ul>
<form id="chat-form">
<input id="chat-input" autocomplete="off" placeholder="Write a message">
<button type="submit">Send</button>
</form>
{script}"#,
        id = product.id,
        title = escape(&product.title),
        seller = seller.map(|s| escape(&s.username)).unwrap_or_else(|| "unknown".into()),
        script = CHAT_SCRIPT.replace("__PRODUCT_ID__", &product.id.to_string()),
    );
    layout("Chat", flash, Some(viewer), &body)
}

pub fn error_page() -> String {
    layout(
        "Something went wrong",
        None,
        None,
        r#"<p>The request could not be completed. Please try again later.</p><p><a href="/">Back to the start page</a></p>"#,
    )
}
