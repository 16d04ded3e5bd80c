// src/store/pool.rs
use diesel::r2d2::{self, ConnectionManager};
use diesel::PgConnection;
use std::sync::Arc;

use super::StoreError;

pub type Pool = r2d2::Pool<ConnectionManager<PgConnection>>;
pub type PooledConnection = r2d2::PooledConnection<ConnectionManager<PgConnection>>;

#[derive(Clone)]
pub struct DatabasePool {
    pool: Arc<Pool>,
}

impl DatabasePool {
    /// 接続プールを作成します。
    ///
    /// # Errors
    ///
    /// 接続プールの初期化に失敗した場合にエラーを返します。
    pub fn new(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let manager = ConnectionManager::<PgConnection>::new(database_url);
        let pool = r2d2::Pool::builder()
            .max_size(max_connections)
            .build(manager)
            .map_err(|e| StoreError::Transient(format!("failed to build connection pool: {e}")))?;

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// プールから接続を取得します。
    ///
    /// # Errors
    ///
    /// 利用可能な接続が無い、もしくは取得に失敗した場合にエラーを返します。
    pub fn get(&self) -> Result<PooledConnection, StoreError> {
        self.pool
            .get()
            .map_err(|e| StoreError::Transient(format!("failed to acquire connection: {e}")))
    }
}
