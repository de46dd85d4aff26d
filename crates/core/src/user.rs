//! The user identity record and test-user lifespans.

use std::convert::Infallible;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A registered user.
///
/// `id` is assigned by the identity provider and never changes. `email` is
/// unique across all users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Epoch seconds after which the store may expire the user.
    /// Only set for test users.
    pub expires_at: Option<i64>,
}

impl User {
    /// Creates a user without a display name or expiry.
    pub fn new(
        id: impl Into<String>,
        email: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            name: None,
            created_at,
            expires_at: None,
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the expiry timestamp (epoch seconds).
    pub fn with_expires_at(mut self, expires_at: i64) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

/// How long a test user should live before the store expires it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Lifespan {
    #[default]
    None,
    Short,
    /// A symbol this build does not know. Treated like [`Lifespan::Short`].
    Unknown(String),
}

impl Lifespan {
    const SHORT_HOURS: i64 = 24;

    /// Epoch seconds at which a user created at `now` expires.
    ///
    /// Every symbol other than `Short` resolves to the `Short` lifespan.
    pub fn expires_at(&self, now: DateTime<Utc>) -> i64 {
        match self {
            Lifespan::Short => (now + Duration::hours(Self::SHORT_HOURS)).timestamp(),
            _ => Lifespan::Short.expires_at(now),
        }
    }
}

impl FromStr for Lifespan {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "" | "none" => Lifespan::None,
            "short" => Lifespan::Short,
            other => Lifespan::Unknown(other.to_string()),
        })
    }
}

impl From<i64> for Lifespan {
    fn from(code: i64) -> Self {
        match code {
            0 => Lifespan::None,
            1 => Lifespan::Short,
            other => Lifespan::Unknown(other.to_string()),
        }
    }
}
