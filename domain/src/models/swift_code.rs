use serde::{Deserialize, Serialize};

use crate::impl_string_primitive;

/// 本店を表すSWIFTコードの接尾辞
pub const HEADQUARTER_SUFFIX: &str = "XXX";

/// 金融機関コードの文字数
///
/// SWIFTコードの先頭8文字が金融機関コードで、本店と支店で共通する。
pub const INSTITUTION_CODE_LENGTH: usize = 8;

/// SWIFTコード
///
/// 大文字の英数字8文字または11文字で構成される。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, garde::Validate)]
#[serde(transparent)]
pub struct SwiftCode(#[garde(pattern(r"^[A-Z0-9]{8}([A-Z0-9]{3})?$"))] pub String);
impl_string_primitive!(SwiftCode, "SWIFT code", uppercase);

impl SwiftCode {
    /// 本店のSWIFTコードであるかを返す。
    pub fn is_headquarter(&self) -> bool {
        self.0.ends_with(HEADQUARTER_SUFFIX)
    }

    /// 金融機関コードを返す。
    pub fn institution_code(&self) -> InstitutionCode {
        let code = self.0.get(..INSTITUTION_CODE_LENGTH).unwrap_or(&self.0);
        InstitutionCode(code.to_string())
    }

    /// 同じ金融機関の本店になり得るSWIFTコードを返す。
    ///
    /// 金融機関コードが`XXX`で終わる場合は、8文字のSWIFTコード（金融機関コードそのもの）も
    /// 本店である。
    pub fn headquarter_codes(&self) -> Vec<SwiftCode> {
        let institution_code = self.institution_code();
        let mut codes = Vec::with_capacity(2);
        if institution_code.0.ends_with(HEADQUARTER_SUFFIX) {
            codes.push(SwiftCode(institution_code.0.clone()));
        }
        codes.push(SwiftCode(format!("{}{}", institution_code, HEADQUARTER_SUFFIX)));
        codes
    }
}

/// 金融機関コード
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstitutionCode(pub String);

impl std::fmt::Display for InstitutionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 銀行名
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, garde::Validate)]
#[serde(transparent)]
pub struct BankName(#[garde(length(chars, min = 1, max = 255))] pub String);
impl_string_primitive!(BankName, "bank name");

/// 住所
///
/// 住所が登録されていない金融機関を扱うため、空文字列を許容する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, garde::Validate)]
#[serde(transparent)]
pub struct Address(#[garde(length(chars, max = 255))] pub String);
impl_string_primitive!(Address, "address");

/// ISO 3166-1 alpha-2 国コード
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, garde::Validate)]
#[serde(transparent)]
pub struct CountryIso2(#[garde(pattern(r"^[A-Z]{2}$"))] pub String);
impl_string_primitive!(CountryIso2, "country ISO2 code", uppercase);

/// 国名
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, garde::Validate)]
#[serde(transparent)]
pub struct CountryName(#[garde(length(chars, min = 1, max = 100))] pub String);
impl_string_primitive!(CountryName, "country name", uppercase);

/// SWIFTコードレコード
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwiftCodeRecord {
    /// SWIFTコード
    pub swift_code: SwiftCode,
    /// 銀行名
    pub bank_name: BankName,
    /// 住所
    pub address: Address,
    /// 国コード
    pub country_iso2: CountryIso2,
    /// 国名
    pub country_name: CountryName,
    /// 本店であるか
    pub is_headquarter: bool,
}

impl SwiftCodeRecord {
    /// SWIFTコードレコードを構築する。
    ///
    /// 本店であるかどうかは、SWIFTコードから導出する。
    pub fn new(
        swift_code: SwiftCode,
        bank_name: BankName,
        address: Address,
        country_iso2: CountryIso2,
        country_name: CountryName,
    ) -> Self {
        let is_headquarter = swift_code.is_headquarter();
        Self {
            swift_code,
            bank_name,
            address,
            country_iso2,
            country_name,
            is_headquarter,
        }
    }

    /// 金融機関コードを返す。
    pub fn institution_code(&self) -> InstitutionCode {
        self.swift_code.institution_code()
    }
}

/// SWIFTコードの詳細
///
/// 本店の場合は、同じ金融機関コードを持つ支店を含む。支店の場合、`branches`は空である。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwiftCodeDetail {
    /// SWIFTコードレコード
    pub record: SwiftCodeRecord,
    /// 支店
    pub branches: Vec<SwiftCodeRecord>,
}

/// 国別SWIFTコード
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountrySwiftCodes {
    /// 国コード
    pub country_iso2: CountryIso2,
    /// 国名
    pub country_name: CountryName,
    /// SWIFTコードレコード
    pub swift_codes: Vec<SwiftCodeRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DomainErrorKind;

    pub fn record(swift_code: &str) -> SwiftCodeRecord {
        SwiftCodeRecord::new(
            SwiftCode::new(swift_code.to_string()).unwrap(),
            BankName::new(String::from("Bank")).unwrap(),
            Address::new(String::from("Warsaw")).unwrap(),
            CountryIso2::new(String::from("PL")).unwrap(),
            CountryName::new(String::from("Poland")).unwrap(),
        )
    }

    #[rstest::rstest]
    #[case("BANKPLPWXXX", "BANKPLPWXXX")]
    #[case("bankplpw001", "BANKPLPW001")]
    #[case("  BankPlPw  ", "BANKPLPW")]
    #[case("AAISALTRXXX", "AAISALTRXXX")]
    fn swift_code_is_normalized(#[case] input: &str, #[case] expected: &str) {
        let code = SwiftCode::new(input.to_string()).unwrap();
        assert_eq!(code.0, expected);
    }

    #[rstest::rstest]
    #[case("")]
    #[case("BANKPLP")]
    #[case("BANKPLPW0")]
    #[case("BANKPLPW0011")]
    #[case("DELETECODEXX")]
    #[case("BANK-LPWXXX")]
    #[case("BANK PLPWXXX")]
    fn invalid_swift_code(#[case] input: &str) {
        let error = SwiftCode::new(input.to_string()).unwrap_err();
        assert_eq!(error.kind, DomainErrorKind::Validation);
    }

    #[rstest::rstest]
    #[case("BANKPLPWXXX", true)]
    #[case("BANKPLPW001", false)]
    #[case("BANKPLPW", false)]
    #[case("bankplpwxxx", true)]
    fn headquarter_is_derived_from_suffix(#[case] input: &str, #[case] expected: bool) {
        let code = SwiftCode::new(input.to_string()).unwrap();
        assert_eq!(code.is_headquarter(), expected);
    }

    #[rstest::rstest]
    #[case("BANKPLPWXXX", "BANKPLPW", &["BANKPLPWXXX"])]
    #[case("BANKPLPW001", "BANKPLPW", &["BANKPLPWXXX"])]
    #[case("BANKPLPW", "BANKPLPW", &["BANKPLPWXXX"])]
    #[case("ABCDEXXX", "ABCDEXXX", &["ABCDEXXX", "ABCDEXXXXXX"])]
    #[case("ABCDEXXX001", "ABCDEXXX", &["ABCDEXXX", "ABCDEXXXXXX"])]
    fn institution_and_headquarter_codes(
        #[case] input: &str,
        #[case] institution: &str,
        #[case] headquarters: &[&str],
    ) {
        let code = SwiftCode::new(input.to_string()).unwrap();
        assert_eq!(code.institution_code().0, institution);
        let codes = code.headquarter_codes();
        assert_eq!(
            codes.iter().map(|c| c.0.as_str()).collect::<Vec<_>>(),
            headquarters
        );
        assert!(codes.iter().all(SwiftCode::is_headquarter));
    }

    #[rstest::rstest]
    #[case("pl", true)]
    #[case(" de ", true)]
    #[case("POL", false)]
    #[case("P1", false)]
    #[case("", false)]
    fn country_iso2(#[case] input: &str, #[case] expected: bool) {
        assert_eq!(CountryIso2::new(input.to_string()).is_ok(), expected);
    }

    #[rstest::rstest]
    #[case("", true)]
    #[case("  ", true)]
    #[case("UL. MARSZALKOWSKA 1, WARSZAWA", true)]
    #[case(&"a".repeat(256), false)]
    fn address_allows_empty(#[case] input: &str, #[case] expected: bool) {
        assert_eq!(Address::new(input.to_string()).is_ok(), expected);
    }

    #[test]
    fn bank_name_is_trimmed_but_keeps_case() {
        let name = BankName::new(String::from("  Bank Polska Kasa Opieki ")).unwrap();
        assert_eq!(name.0, "Bank Polska Kasa Opieki");
        assert!(BankName::new(String::from("   ")).is_err());
    }

    #[test]
    fn record_derives_headquarter_flag() {
        let headquarter = record("BANKPLPWXXX");
        assert!(headquarter.is_headquarter);
        assert_eq!(headquarter.country_name.0, "POLAND");

        let branch = record("bankplpw001");
        assert!(!branch.is_headquarter);
        assert_eq!(branch.institution_code(), headquarter.institution_code());

        // 8文字の本店
        assert!(record("ABCDEXXX").is_headquarter);
        assert!(!record("ABCDEXXX001").is_headquarter);
    }

    #[test]
    fn record_uses_internal_field_names_when_serialized() {
        let value = serde_json::to_value(record("BANKPLPWXXX")).unwrap();
        assert_eq!(value["swift_code"], "BANKPLPWXXX");
        assert_eq!(value["country_iso2"], "PL");
        assert_eq!(value["is_headquarter"], true);
    }
}
