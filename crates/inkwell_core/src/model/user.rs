//! User and public profile models.
//!
//! Users are owned by the user store; this crate only reads them and
//! projects them into [`Profile`] values for responses.

use serde::Serialize;

/// Store-assigned user identifier.
pub type UserId = i64;

/// Persisted user account (read-only from the article core).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub bio: Option<String>,
    pub image: Option<String>,
}

/// Input for seeding a user account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub bio: Option<String>,
    pub image: Option<String>,
}

impl NewUser {
    /// Builds a user input carrying only a username.
    pub fn named(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Self::default()
        }
    }
}

/// Public author projection embedded in article responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub username: String,
    pub bio: Option<String>,
    pub image: Option<String>,
    /// Follow state is resolved elsewhere; always `false` here.
    pub following: bool,
}

impl Profile {
    /// Placeholder used when an article's author row cannot be found.
    pub fn empty() -> Self {
        Self::default()
    }
}

impl From<&User> for Profile {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            bio: user.bio.clone(),
            image: user.image.clone(),
            following: false,
        }
    }
}
