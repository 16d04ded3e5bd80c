//! User management operations.

use tracing::info;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::models::{CreateUserRequest, User};
use crate::store::{SharedStore, StoreError};

/// Create/read users, enforcing id uniqueness through the store's
/// conditional put.
#[derive(Clone)]
pub struct UserService {
    store: SharedStore,
}

impl UserService {
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// ユーザーを作成します。
    ///
    /// # Errors
    ///
    /// 入力検証に失敗した場合、または同じ `userId` が既に存在する場合に
    /// エラーを返します。
    pub async fn create(&self, request: CreateUserRequest) -> Result<User> {
        request.validate()?;
        let request = request.canonicalized();
        let user = User::new(request.user_id, request.name);
        let user_id = user.user_id.clone();

        match self.store.put_user_if_absent(user).await {
            Ok(created) => {
                info!(user_id = %created.user_id, "user created");
                Ok(created)
            }
            Err(StoreError::Duplicate(_)) => Err(AppError::DuplicateUser(user_id)),
            Err(e) => Err(e.into()),
        }
    }

    /// ユーザーを取得します。
    ///
    /// # Errors
    ///
    /// 見つからない場合にエラーを返します。
    pub async fn get(&self, user_id: &str) -> Result<User> {
        self.store.get_user(user_id).await.map_err(|e| match e {
            StoreError::NotFound(_) => AppError::UserNotFound(user_id.to_string()),
            other => other.into(),
        })
    }
}
