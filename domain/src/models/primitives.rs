/// 文字列を値とするドメインプリミティブを実装する。
///
/// 値の前後の空白をトリムして、`uppercase`が指定された場合は大文字に変換した後、
/// `garde`で検証する。
///
/// ```ignore
/// #[derive(Debug, Clone, garde::Validate)]
/// pub struct CountryName(#[garde(length(chars, min = 1, max = 100))] pub String);
/// impl_string_primitive!(CountryName, "country name", uppercase);
/// ```
#[macro_export]
macro_rules! impl_string_primitive {
    ($name:ident, $label:literal) => {
        $crate::impl_string_primitive!(@impl $name, $label, |value: String| value);
    };
    ($name:ident, $label:literal, uppercase) => {
        $crate::impl_string_primitive!(@impl $name, $label, |value: String| value.to_uppercase());
    };
    (@impl $name:ident, $label:literal, $normalize:expr) => {
        impl $name {
            pub fn new(value: std::string::String) -> $crate::DomainResult<Self> {
                let value = if $crate::starts_or_ends_with_whitespace(&value) {
                    value.trim().to_string()
                } else {
                    value
                };
                let normalize = $normalize;
                let value = Self(normalize(value));
                match garde::Validate::validate(&value) {
                    Ok(_) => Ok(value),
                    Err(e) => Err($crate::DomainError {
                        kind: $crate::DomainErrorKind::Validation,
                        messages: vec![format!("{} is invalid ({})", $label, e).into()],
                        source: e.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::convert::TryFrom<String> for $name {
            type Error = $crate::DomainError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::DomainErrorKind;

    #[derive(Debug, Clone, garde::Validate)]
    pub struct StringPrimitive(#[garde(length(chars, min = 1, max = 100))] pub String);
    impl_string_primitive!(StringPrimitive, "string primitive");

    #[derive(Debug, Clone, garde::Validate)]
    pub struct UpperPrimitive(#[garde(length(chars, min = 1, max = 10))] pub String);
    impl_string_primitive!(UpperPrimitive, "upper primitive", uppercase);

    #[rstest::rstest]
    #[case(String::from("title"), true)]
    #[case(String::new(), false)]
    #[case(String::from("   "), false)]
    #[case(String::from("a"), true)]
    #[case("a".repeat(100), true)]
    #[case("a".repeat(101), false)]
    #[case("🙂".repeat(100), true)]
    #[case("🙂".repeat(100) + &String::from("a"), false)]
    fn impl_string_primitive(#[case] s: String, #[case] expected: bool) {
        let primitive = StringPrimitive::new(s);
        assert_eq!(primitive.is_ok(), expected);
    }

    #[test]
    fn string_primitive_is_trimmed() {
        let primitive = StringPrimitive::new(String::from("  Bank HQ \n")).unwrap();
        assert_eq!(&*primitive, "Bank HQ");
    }

    #[test]
    fn upper_primitive_is_trimmed_and_uppercased() {
        let primitive = UpperPrimitive::new(String::from(" poland ")).unwrap();
        assert_eq!(primitive.to_string(), "POLAND");
    }

    #[test]
    fn invalid_primitive_is_a_validation_error() {
        let error = UpperPrimitive::new("a".repeat(11)).unwrap_err();
        assert_eq!(error.kind, DomainErrorKind::Validation);
        assert!(error.to_string().starts_with("upper primitive is invalid"));
    }
}
