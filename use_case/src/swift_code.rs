use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use domain::{
    DomainErrorKind, DomainResult, domain_error,
    models::{CountryIso2, CountrySwiftCodes, SwiftCode, SwiftCodeDetail, SwiftCodeRecord},
    repositories::{
        CacheKey, SWIFT_CODE_NOT_FOUND, SwiftCodeCache, SwiftCodeRepository, affected_cache_keys,
    },
};

pub const COUNTRY_NOT_FOUND: &str = "No SWIFT codes found for this country";

/// 読み取り結果をキャッシュから取得したかどうか
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// キャッシュから取得した
    Hit,
    /// リポジトリから取得した
    Miss,
    /// キャッシュが無効
    Disabled,
}

impl CacheStatus {
    /// `X-SWIFT-Cache`ヘッダの値を返す。
    ///
    /// キャッシュが無効な場合は`None`を返す。
    pub fn header_value(&self) -> Option<&'static str> {
        match self {
            Self::Hit => Some("HIT"),
            Self::Miss => Some("MISS"),
            Self::Disabled => None,
        }
    }
}

/// キャッシュを破棄した世代
///
/// 書き込みでキャッシュを破棄するたびに進む。読み取りの間に世代が進んだ場合、
/// 読み取った値は古い可能性があるため、キャッシュに残さない。
/// プロセス内で共有し、ほかのプロセスの書き込みは`ttl_seconds`の経過で反映される。
#[derive(Debug, Clone, Default)]
pub struct CacheGeneration(Arc<AtomicU64>);

impl CacheGeneration {
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    fn advance(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// SWIFTコードユースケース
///
/// キャッシュは読み取りを高速化するためだけに使用する。
/// キャッシュの読み書きに失敗した場合は、ログを出力してリポジトリで処理を継続する。
pub struct SwiftCodeUseCase<R, C>
where
    R: SwiftCodeRepository,
    C: SwiftCodeCache,
{
    pub repo: R,
    pub cache: Option<C>,
    pub generation: CacheGeneration,
}

impl<R, C> SwiftCodeUseCase<R, C>
where
    R: SwiftCodeRepository,
    C: SwiftCodeCache,
{
    pub fn new(repo: R, cache: Option<C>, generation: CacheGeneration) -> Self {
        Self {
            repo,
            cache,
            generation,
        }
    }

    /// SWIFTコードの詳細を取得する。
    ///
    /// 本店の場合は、同じ金融機関コードを持つ支店を1階層だけ含める。
    pub async fn by_code(&self, code: &SwiftCode) -> DomainResult<(SwiftCodeDetail, CacheStatus)> {
        if let Some(detail) = self.cached_detail(code).await {
            return Ok((detail, CacheStatus::Hit));
        }

        let generation = self.generation.current();
        let record = self
            .repo
            .by_code(code)
            .await?
            .ok_or_else(|| domain_error(DomainErrorKind::NotFound, SWIFT_CODE_NOT_FOUND))?;
        let branches = if record.is_headquarter {
            self.repo.list_branches(&record.swift_code).await?
        } else {
            vec![]
        };
        let detail = SwiftCodeDetail { record, branches };

        let Some(cache) = &self.cache else {
            return Ok((detail, CacheStatus::Disabled));
        };
        if self.generation.current() == generation {
            match cache.store_detail(&detail).await {
                Ok(_) => {
                    self.discard_if_outdated(generation, CacheKey::code(&detail.record.swift_code))
                        .await
                }
                Err(e) => {
                    tracing::warn!("Failed to store the SWIFT code detail in the cache: {}", e)
                }
            }
        }
        Ok((detail, CacheStatus::Miss))
    }

    /// 国別SWIFTコードを取得する。
    ///
    /// 国コードに一致するレコードが存在しない場合は、`NotFound`エラーを返す。
    pub async fn by_country(
        &self,
        country_iso2: &CountryIso2,
    ) -> DomainResult<(CountrySwiftCodes, CacheStatus)> {
        if let Some(country) = self.cached_country(country_iso2).await {
            return Ok((country, CacheStatus::Hit));
        }

        let generation = self.generation.current();
        let swift_codes = self.repo.list_by_country(country_iso2).await?;
        let country_name = match swift_codes.first() {
            Some(record) => record.country_name.clone(),
            None => return Err(domain_error(DomainErrorKind::NotFound, COUNTRY_NOT_FOUND)),
        };
        let country = CountrySwiftCodes {
            country_iso2: country_iso2.clone(),
            country_name,
            swift_codes,
        };

        let Some(cache) = &self.cache else {
            return Ok((country, CacheStatus::Disabled));
        };
        if self.generation.current() == generation {
            match cache.store_country(&country).await {
                Ok(_) => {
                    self.discard_if_outdated(generation, CacheKey::country(country_iso2))
                        .await
                }
                Err(e) => {
                    tracing::warn!("Failed to store the country SWIFT codes in the cache: {}", e)
                }
            }
        }
        Ok((country, CacheStatus::Miss))
    }

    /// SWIFTコードを登録する。
    ///
    /// SWIFTコードの重複は、リポジトリの一意制約で検出する。
    pub async fn create(&self, record: SwiftCodeRecord) -> DomainResult<()> {
        self.repo.create(record.clone()).await?;
        self.invalidate(&affected_cache_keys(&[record])).await;
        Ok(())
    }

    /// SWIFTコードを削除する。
    ///
    /// 削除したレコード（本店の場合は連鎖して削除された支店を含む）を返す。
    pub async fn delete(&self, code: &SwiftCode) -> DomainResult<Vec<SwiftCodeRecord>> {
        let deleted = self.repo.delete(code).await?;
        self.invalidate(&affected_cache_keys(&deleted)).await;
        Ok(deleted)
    }

    async fn cached_detail(&self, code: &SwiftCode) -> Option<SwiftCodeDetail> {
        let cache = self.cache.as_ref()?;
        match cache.detail(code).await {
            Ok(detail) => detail,
            Err(e) => {
                tracing::warn!("Failed to read the SWIFT code detail from the cache: {}", e);
                None
            }
        }
    }

    async fn cached_country(&self, country_iso2: &CountryIso2) -> Option<CountrySwiftCodes> {
        let cache = self.cache.as_ref()?;
        match cache.country(country_iso2).await {
            Ok(country) => country,
            Err(e) => {
                tracing::warn!("Failed to read the country SWIFT codes from the cache: {}", e);
                None
            }
        }
    }

    /// 保存した値を読み取った後に世代が進んでいた場合は、保存した値を破棄する。
    async fn discard_if_outdated(&self, generation: u64, key: CacheKey) {
        if self.generation.current() != generation {
            self.remove(&[key]).await;
        }
    }

    /// 書き込みで古くなったキャッシュを破棄する。
    ///
    /// 世代はキャッシュの削除より先に進める。
    async fn invalidate(&self, keys: &[CacheKey]) {
        self.generation.advance();
        self.remove(keys).await;
    }

    async fn remove(&self, keys: &[CacheKey]) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.invalidate(keys).await {
                tracing::warn!("Failed to invalidate the cache: {}", e);
            }
        }
    }
}
