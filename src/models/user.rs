use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::utils::validation::{not_blank, USER_ID_REGEX};

/// A registered API user. Never mutated by the registration engine.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(regex(
        path = *USER_ID_REGEX,
        message = "userId must be 1-100 characters of letters, digits, '-' or '_'"
    ))]
    pub user_id: String,
    #[validate(
        length(min = 1, max = 200, message = "name must be 1-200 characters"),
        custom(function = not_blank)
    )]
    pub name: String,
}

impl CreateUserRequest {
    /// Canonicalise after validation: trim the display name, never the id.
    #[must_use]
    pub fn canonicalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self
    }
}

impl User {
    #[must_use]
    pub fn new(user_id: String, name: String) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            name,
            created_at: now,
            updated_at: now,
        }
    }
}
