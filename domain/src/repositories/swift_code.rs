use crate::{
    DomainResult,
    models::{CountryIso2, SwiftCode, SwiftCodeRecord},
};

pub const SWIFT_CODE_NOT_FOUND: &str = "SWIFT code not found";

/// SWIFTコードリポジトリ
#[async_trait::async_trait]
pub trait SwiftCodeRepository: Sync + Send {
    /// SWIFTコードでレコードを取得する。
    async fn by_code(&self, code: &SwiftCode) -> DomainResult<Option<SwiftCodeRecord>>;

    /// 指定されたSWIFTコードと同じ金融機関コードを持つレコードを、
    /// 指定されたSWIFTコードのレコードを除いてリストする。
    ///
    /// 親子関係（`parent_code`）ではなく、金融機関コードの一致で判定する。
    async fn list_branches(&self, code: &SwiftCode) -> DomainResult<Vec<SwiftCodeRecord>>;

    /// 国コードが一致するレコードをリストする。
    async fn list_by_country(&self, country_iso2: &CountryIso2)
    -> DomainResult<Vec<SwiftCodeRecord>>;

    /// レコードを登録する。
    ///
    /// 支店の場合、同じ金融機関コードの本店が登録されていれば、その本店を親に設定する。
    /// 本店の場合、親が設定されていない同じ金融機関コードの支店の親を本店に設定する。
    /// SWIFTコードが既に登録されている場合は、`DomainErrorKind::Conflict`エラーを返す。
    async fn create(&self, record: SwiftCodeRecord) -> DomainResult<()>;

    /// レコードを削除する。
    ///
    /// 本店を削除した場合、その本店を親とする支店も削除する。
    /// 削除したすべてのレコードを返し、レコードが存在しない場合は
    /// `DomainErrorKind::NotFound`エラーを返す。
    async fn delete(&self, code: &SwiftCode) -> DomainResult<Vec<SwiftCodeRecord>>;
}
