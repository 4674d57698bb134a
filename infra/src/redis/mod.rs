pub mod cache;

use deadpool_redis::Pool as RedisPool;

use domain::{DomainError, DomainErrorKind, DomainResult};

/// Redisに接続できるか確認する。
pub async fn ping(pool: &RedisPool) -> DomainResult<()> {
    let mut conn = pool.get().await.map_err(|e| DomainError {
        kind: DomainErrorKind::Cache,
        messages: vec!["Failed to connect to the redis".into()],
        source: e.into(),
    })?;
    let _: String = ::redis::cmd("PING")
        .query_async(&mut conn)
        .await
        .map_err(|e| DomainError {
            kind: DomainErrorKind::Cache,
            messages: vec!["Failed to ping the redis".into()],
            source: e.into(),
        })?;
    Ok(())
}
