use serde::Deserialize;

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChangePasswordForm {
    pub current_password: String,
    pub new_password: String,
}

// -- Profile --

#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub bio: String,
}

// -- Products --

/// Edit form. Creation goes through multipart because of the image upload.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductForm {
    pub title: String,
    pub description: String,
    pub price: String,
}

// -- Reports --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportForm {
    pub target_id: String,
    pub reason: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub target_id: Option<String>,
}
