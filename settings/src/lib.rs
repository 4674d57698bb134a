use secrecy::{ExposeSecret as _, SecretString};
use serde::Deserialize;
use sqlx::postgres::PgConnectOptions;

/// アプリケーション設定
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    /// HTTPサーバー設定
    pub http: HttpSettings,
    /// データベース設定
    pub database: DatabaseSettings,
    /// Redis設定
    pub redis: RedisSettings,
    /// ログ設定
    pub log: LogSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpProtocol {
    /// HTTPプロトコル
    Http,
    /// HTTPSプロトコル
    Https,
}

impl std::fmt::Display for HttpProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http => write!(f, "http"),
            Self::Https => write!(f, "https"),
        }
    }
}

/// HTTPサーバー設定
#[derive(Debug, Clone, Deserialize)]
pub struct HttpSettings {
    /// プロトコル
    pub protocol: HttpProtocol,
    /// ホスト名
    pub host: String,
    /// ポート番号
    pub port: u16,
}

/// データベース設定
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// ホスト名
    pub host: String,
    /// ポート番号
    pub port: u16,
    /// ユーザー名
    pub user: String,
    /// パスワード
    pub password: SecretString,
    /// データベース名
    pub name: String,
    /// 最大接続数
    pub max_connections: u32,
    /// 接続タイムアウト（秒）
    pub connection_timeout: u64,
}

/// Redis設定
///
/// Redisは読み取りキャッシュとしてのみ使用する。
/// 無効にした場合、またはRedisに接続できない場合は、キャッシュせずに動作する。
#[derive(Debug, Clone, Deserialize)]
pub struct RedisSettings {
    /// キャッシュを有効にするか
    #[serde(default = "default_redis_enabled")]
    pub enabled: bool,
    /// ホスト
    pub host: String,
    /// ポート番号
    pub port: u16,
    /// キャッシュキーの接頭辞
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// キャッシュの生存期間（秒）
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
}

/// ログ設定
#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// ログレベル
    pub level: log::Level,
}

fn default_redis_enabled() -> bool {
    true
}

fn default_key_prefix() -> String {
    String::from("swift-cache")
}

fn default_ttl_seconds() -> u64 {
    600
}

impl HttpSettings {
    /// バインドするアドレス（ホスト名とポート番号）を返す。
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl DatabaseSettings {
    /// データベース接続オプションを返す。
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(self.password.expose_secret())
            .database(&self.name)
    }
}

impl RedisSettings {
    /// RedisURIを返す。
    pub fn uri(&self) -> String {
        format!("redis://{}:{}", self.host, self.port)
    }
}
