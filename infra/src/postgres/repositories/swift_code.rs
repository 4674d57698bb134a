use domain::{
    DomainError, DomainErrorKind, DomainResult, domain_error,
    models::{
        Address, BankName, CountryIso2, CountryName, InstitutionCode, SwiftCode, SwiftCodeRecord,
    },
    repositories::{SWIFT_CODE_NOT_FOUND, SwiftCodeRepository},
};

use super::{PgRepository, PgTransaction, commit, repository_error};

pub type PgSwiftCodeRepository = PgRepository<SwiftCodeRecord>;

#[async_trait::async_trait]
impl SwiftCodeRepository for PgSwiftCodeRepository {
    /// SWIFTコードでレコードを取得する。
    async fn by_code(&self, code: &SwiftCode) -> DomainResult<Option<SwiftCodeRecord>> {
        sqlx::query_as::<_, SwiftCodeRow>(
            r#"
            SELECT
                swift_code, bank_name, address, country_iso2, country_name, is_headquarter
            FROM swift_codes
            WHERE swift_code = $1
            "#,
        )
        .bind(&code.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(repository_error)?
        .map(SwiftCodeRecord::try_from)
        .transpose()
    }

    /// 金融機関コードが一致する支店をリストする。
    async fn list_branches(&self, code: &SwiftCode) -> DomainResult<Vec<SwiftCodeRecord>> {
        sqlx::query_as::<_, SwiftCodeRow>(
            r#"
            SELECT
                swift_code, bank_name, address, country_iso2, country_name, is_headquarter
            FROM swift_codes
            WHERE institution_code = $1 AND swift_code <> $2
            ORDER BY swift_code
            "#,
        )
        .bind(&code.institution_code().0)
        .bind(&code.0)
        .fetch_all(&self.pool)
        .await
        .map_err(repository_error)?
        .into_iter()
        .map(SwiftCodeRecord::try_from)
        .collect::<Result<Vec<_>, _>>()
    }

    /// 国コードが一致するレコードをリストする。
    async fn list_by_country(
        &self,
        country_iso2: &CountryIso2,
    ) -> DomainResult<Vec<SwiftCodeRecord>> {
        sqlx::query_as::<_, SwiftCodeRow>(
            r#"
            SELECT
                swift_code, bank_name, address, country_iso2, country_name, is_headquarter
            FROM swift_codes
            WHERE country_iso2 = $1
            ORDER BY swift_code
            "#,
        )
        .bind(&country_iso2.0)
        .fetch_all(&self.pool)
        .await
        .map_err(repository_error)?
        .into_iter()
        .map(SwiftCodeRecord::try_from)
        .collect::<Result<Vec<_>, _>>()
    }

    /// レコードを登録する。
    ///
    /// 支店の場合、同じ金融機関コードの本店が登録されていれば本店を親に設定する。
    /// 本店の場合、親が設定されていない同じ金融機関コードの支店の親を本店に設定する。
    async fn create(&self, record: SwiftCodeRecord) -> DomainResult<()> {
        let institution_code = record.institution_code();
        let mut tx = self.begin().await?;
        lock_institution(&mut tx, &institution_code).await?;

        sqlx::query(
            r#"
            INSERT INTO swift_codes (
                swift_code, institution_code, bank_name, address,
                country_iso2, country_name, is_headquarter, parent_code
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7,
                CASE WHEN $7 THEN NULL ELSE (
                    SELECT swift_code FROM swift_codes
                    WHERE institution_code = $2 AND is_headquarter
                    ORDER BY swift_code
                    LIMIT 1
                ) END
            )
            "#,
        )
        .bind(&record.swift_code.0)
        .bind(&institution_code.0)
        .bind(&record.bank_name.0)
        .bind(&record.address.0)
        .bind(&record.country_iso2.0)
        .bind(&record.country_name.0)
        .bind(record.is_headquarter)
        .execute(&mut *tx)
        .await
        .map_err(|e| insert_error(e, &record.swift_code))?;

        if record.is_headquarter {
            sqlx::query(
                r#"
                UPDATE swift_codes
                SET parent_code = $1
                WHERE institution_code = $2 AND NOT is_headquarter AND parent_code IS NULL
                "#,
            )
            .bind(&record.swift_code.0)
            .bind(&institution_code.0)
            .execute(&mut *tx)
            .await
            .map_err(repository_error)?;
        }

        commit(tx).await
    }

    /// レコードを削除する。
    ///
    /// 本店を親とする支店も同じ文で削除する。
    async fn delete(&self, code: &SwiftCode) -> DomainResult<Vec<SwiftCodeRecord>> {
        let mut tx = self.begin().await?;
        lock_institution(&mut tx, &code.institution_code()).await?;
        let rows = sqlx::query_as::<_, SwiftCodeRow>(
            r#"
            DELETE FROM swift_codes
            WHERE swift_code = $1 OR parent_code = $1
            RETURNING
                swift_code, bank_name, address, country_iso2, country_name, is_headquarter
            "#,
        )
        .bind(&code.0)
        .fetch_all(&mut *tx)
        .await
        .map_err(repository_error)?;
        if !rows.iter().any(|row| row.swift_code == code.0) {
            return Err(domain_error(DomainErrorKind::NotFound, SWIFT_CODE_NOT_FOUND));
        }
        commit(tx).await?;
        rows.into_iter()
            .map(SwiftCodeRecord::try_from)
            .collect::<Result<Vec<_>, _>>()
    }
}

/// 金融機関コードごとのトランザクションロックを取得する。
///
/// 同じ金融機関コードを持つレコードの登録と削除は、このロックで直列化される。
/// ロックはトランザクションの終了時に解放される。
async fn lock_institution(
    tx: &mut PgTransaction<'_>,
    institution_code: &InstitutionCode,
) -> DomainResult<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(&institution_code.0)
        .execute(&mut **tx)
        .await
        .map_err(repository_error)?;
    Ok(())
}

#[derive(Debug, sqlx::FromRow)]
struct SwiftCodeRow {
    swift_code: String,
    bank_name: String,
    address: String,
    country_iso2: String,
    country_name: String,
    is_headquarter: bool,
}

impl TryFrom<SwiftCodeRow> for SwiftCodeRecord {
    type Error = DomainError;

    fn try_from(row: SwiftCodeRow) -> Result<Self, Self::Error> {
        let record = SwiftCodeRecord::new(
            SwiftCode::new(row.swift_code)?,
            BankName::new(row.bank_name)?,
            Address::new(row.address)?,
            CountryIso2::new(row.country_iso2)?,
            CountryName::new(row.country_name)?,
        );
        if record.is_headquarter != row.is_headquarter {
            return Err(domain_error(
                DomainErrorKind::Unexpected,
                format!(
                    "is_headquarter of {} is inconsistent with its code",
                    record.swift_code
                ),
            ));
        }
        Ok(record)
    }
}

/// 登録時のエラーを変換する。
///
/// 一意制約違反は、SWIFTコードの重複として扱う。
fn insert_error(e: sqlx::Error, code: &SwiftCode) -> DomainError {
    let is_unique_violation = matches!(
        &e,
        sqlx::Error::Database(db_error) if db_error.is_unique_violation()
    );
    if !is_unique_violation {
        return repository_error(e);
    }
    let message = format!("SWIFT code {} already exists", code);
    DomainError {
        kind: DomainErrorKind::Conflict,
        messages: vec![message.into()],
        source: e.into(),
    }
}
