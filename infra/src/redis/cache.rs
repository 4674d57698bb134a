use deadpool_redis::{Connection as RedisConnection, Pool as RedisPool};
use redis::AsyncCommands;
use serde::{Serialize, de::DeserializeOwned};

use domain::{
    DomainError, DomainErrorKind, DomainResult,
    models::{CountryIso2, CountrySwiftCodes, SwiftCode, SwiftCodeDetail},
    repositories::{CacheKey, SwiftCodeCache},
};
use settings::RedisSettings;

/// RedisSWIFTコードキャッシュ
///
/// 値はJSON文字列で保存し、設定された生存期間で失効させる。
pub struct RedisSwiftCodeCache {
    /// Redis接続プール
    pool: RedisPool,
    /// キーの接頭辞
    key_prefix: String,
    /// 生存期間（秒）
    ttl_seconds: u64,
}

impl RedisSwiftCodeCache {
    /// RedisSWIFTコードキャッシュを構築する。
    ///
    /// # 引数
    ///
    /// * `pool` - Redis接続プール
    /// * `settings` - Redis設定
    pub fn new(pool: RedisPool, settings: &RedisSettings) -> Self {
        Self {
            pool,
            key_prefix: settings.key_prefix.clone(),
            ttl_seconds: settings.ttl_seconds,
        }
    }

    /// Redisに接続する。
    async fn connection(&self) -> DomainResult<RedisConnection> {
        self.pool.get().await.map_err(|e| DomainError {
            kind: DomainErrorKind::Cache,
            messages: vec!["Failed to connect to the redis".into()],
            source: e.into(),
        })
    }

    fn key(&self, key: &CacheKey) -> String {
        redis_key(&self.key_prefix, key)
    }

    async fn retrieve<T>(&self, key: &CacheKey) -> DomainResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn.get(self.key(key)).await.map_err(|e| DomainError {
            kind: DomainErrorKind::Cache,
            messages: vec!["Failed to retrieve value from redis".into()],
            source: e.into(),
        })?;
        value
            .map(|value| serde_json::from_str(&value).map_err(serde_error))
            .transpose()
    }

    async fn store<T>(&self, key: &CacheKey, value: &T) -> DomainResult<()>
    where
        T: Serialize + Sync,
    {
        let value = serde_json::to_string(value).map_err(serde_error)?;
        let mut conn = self.connection().await?;
        conn.set_ex(self.key(key), value, self.ttl_seconds)
            .await
            .map_err(|e| DomainError {
                kind: DomainErrorKind::Cache,
                messages: vec!["Failed to store key and value in redis".into()],
                source: e.into(),
            })
    }
}

#[async_trait::async_trait]
impl SwiftCodeCache for RedisSwiftCodeCache {
    async fn detail(&self, code: &SwiftCode) -> DomainResult<Option<SwiftCodeDetail>> {
        self.retrieve(&CacheKey::code(code)).await
    }

    async fn store_detail(&self, detail: &SwiftCodeDetail) -> DomainResult<()> {
        self.store(&CacheKey::code(&detail.record.swift_code), detail)
            .await
    }

    async fn country(&self, country_iso2: &CountryIso2) -> DomainResult<Option<CountrySwiftCodes>> {
        self.retrieve(&CacheKey::country(country_iso2)).await
    }

    async fn store_country(&self, country: &CountrySwiftCodes) -> DomainResult<()> {
        self.store(&CacheKey::country(&country.country_iso2), country)
            .await
    }

    async fn invalidate(&self, keys: &[CacheKey]) -> DomainResult<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let keys = keys.iter().map(|key| self.key(key)).collect::<Vec<_>>();
        let mut conn = self.connection().await?;
        conn.del(keys).await.map_err(|e| DomainError {
            kind: DomainErrorKind::Cache,
            messages: vec!["Failed to delete keys from redis".into()],
            source: e.into(),
        })
    }
}

/// Redisに登録するキーを生成する。
fn redis_key(prefix: &str, key: &CacheKey) -> String {
    format!("{}:{}", prefix, key)
}

fn serde_error(e: serde_json::Error) -> DomainError {
    DomainError {
        kind: DomainErrorKind::Cache,
        messages: vec!["Failed to convert the cached value".into()],
        source: e.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    #[case(CacheKey::Code(String::from("BANKPLPWXXX")), "swift-cache:code:BANKPLPWXXX")]
    #[case(CacheKey::Country(String::from("PL")), "swift-cache:country:PL")]
    fn can_generate_redis_key(#[case] key: CacheKey, #[case] expected: &str) {
        assert_eq!(redis_key("swift-cache", &key), expected);
    }

    #[test]
    fn broken_cached_value_is_a_cache_error() {
        let error = serde_json::from_str::<SwiftCodeDetail>("{")
            .map_err(serde_error)
            .unwrap_err();
        assert_eq!(error.kind, DomainErrorKind::Cache);
    }
}
