use std::collections::BTreeSet;

use crate::{
    DomainResult,
    models::{CountryIso2, CountrySwiftCodes, SwiftCode, SwiftCodeDetail, SwiftCodeRecord},
};

/// SWIFTコードキャッシュ
///
/// 読み取り結果を保持するだけで、キャッシュがなくても結果は変わらない。
#[async_trait::async_trait]
pub trait SwiftCodeCache: Sync + Send {
    /// SWIFTコードの詳細を取得する。
    async fn detail(&self, code: &SwiftCode) -> DomainResult<Option<SwiftCodeDetail>>;

    /// SWIFTコードの詳細を保存する。
    async fn store_detail(&self, detail: &SwiftCodeDetail) -> DomainResult<()>;

    /// 国別SWIFTコードを取得する。
    async fn country(&self, country_iso2: &CountryIso2) -> DomainResult<Option<CountrySwiftCodes>>;

    /// 国別SWIFTコードを保存する。
    async fn store_country(&self, country: &CountrySwiftCodes) -> DomainResult<()>;

    /// キーに対応するキャッシュを削除する。
    async fn invalidate(&self, keys: &[CacheKey]) -> DomainResult<()>;
}

/// キャッシュキー
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CacheKey {
    /// SWIFTコードの詳細
    Code(String),
    /// 国別SWIFTコード
    Country(String),
}

impl CacheKey {
    pub fn code(code: &SwiftCode) -> Self {
        Self::Code(code.0.clone())
    }

    pub fn country(country_iso2: &CountryIso2) -> Self {
        Self::Country(country_iso2.0.clone())
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Code(code) => write!(f, "code:{}", code),
            Self::Country(country) => write!(f, "country:{}", country),
        }
    }
}

/// レコードの登録または削除によって古くなるキャッシュキーを返す。
///
/// レコード自身、同じ金融機関の本店になり得るすべてのSWIFTコード（本店の詳細は支店を含むため）、
/// 国のキーを返す。
pub fn affected_cache_keys(records: &[SwiftCodeRecord]) -> Vec<CacheKey> {
    let mut keys = BTreeSet::new();
    for record in records {
        keys.insert(CacheKey::code(&record.swift_code));
        for headquarter in record.swift_code.headquarter_codes() {
            keys.insert(CacheKey::code(&headquarter));
        }
        keys.insert(CacheKey::country(&record.country_iso2));
    }
    keys.into_iter().collect()
}
