use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    /// Reached through accumulated reports. There is no way back to `Active`.
    Dormant,
}

impl FromStr for AccountStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "dormant" => Ok(Self::Dormant),
            other => Err(format!("unknown account status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub bio: Option<String>,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid price '{0}'")]
pub struct InvalidPrice(pub String);

/// A non-negative amount in minor currency units (cents).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(i64);

impl Price {
    pub fn from_cents(cents: i64) -> Option<Self> {
        (cents >= 0).then_some(Self(cents))
    }

    pub fn cents(self) -> i64 {
        self.0
    }
}

/// Accepts `"12"`, `"12.5"` and `"12.34"`. Signs, separators and more than
/// two fractional digits are rejected.
impl FromStr for Price {
    type Err = InvalidPrice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidPrice(s.to_string());
        let text = s.trim();

        let (whole, frac) = match text.split_once('.') {
            Some((whole, frac)) => (whole, Some(frac)),
            None => (text, None),
        };

        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let frac_cents = match frac {
            None => 0,
            Some(f) if (1..=2).contains(&f.len()) && f.bytes().all(|b| b.is_ascii_digit()) => {
                let digits: i64 = f.parse().map_err(|_| invalid())?;
                if f.len() == 1 { digits * 10 } else { digits }
            }
            Some(_) => return Err(invalid()),
        };

        let whole: i64 = whole.parse().map_err(|_| invalid())?;
        whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac_cents))
            .map(Self)
            .ok_or_else(invalid)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub price: Price,
    /// Content-addressed key of the uploaded image, relative to the upload directory.
    pub image_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Subject of a report. Report targets share one id column in storage, so
/// the kind is recorded alongside the id when the report is filed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum TargetRef {
    User(Uuid),
    Product(Uuid),
    /// Target id that matched neither a user nor a product when filed.
    Unknown(String),
}

impl TargetRef {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::User(_) => "user",
            Self::Product(_) => "product",
            Self::Unknown(_) => "unknown",
        }
    }

    pub fn id(&self) -> String {
        match self {
            Self::User(id) | Self::Product(id) => id.to_string(),
            Self::Unknown(raw) => raw.clone(),
        }
    }
}

/// Chat messages keep the sender's username as it was when the message was written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub product_id: Uuid,
    pub username: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
