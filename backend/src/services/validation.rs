//! Field validation shared by the entity services.
//!
//! [`Validator`] collects every problem with an input instead of stopping at
//! the first one, so a form can highlight all offending fields at once.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use super::{ServiceError, ServiceResult};

/// Maximum length of person and organisation names.
pub const MAX_NAME_LENGTH: usize = 100;

/// Minimum password length for user accounts.
pub const MIN_PASSWORD_LENGTH: usize = 8;

const CNP_WEIGHTS: &[u32; 12] = &[2, 7, 9, 1, 4, 6, 3, 5, 8, 2, 7, 9];
const CUI_KEY: &[u32; 9] = &[7, 5, 3, 2, 1, 7, 5, 3, 2];

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[A-Za-z]{2,}$").expect("email pattern compiles")
});

static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9][0-9 \-]*$").expect("phone pattern compiles"));

#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<String>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` unless `ok` holds.
    pub fn check(&mut self, ok: bool, message: impl Into<String>) -> &mut Self {
        if !ok {
            self.errors.push(message.into());
        }
        self
    }

    pub fn error(&mut self, message: impl Into<String>) -> &mut Self {
        self.errors.push(message.into());
        self
    }

    /// Non-blank text.
    pub fn required(&mut self, field: &str, value: &str) -> &mut Self {
        self.check(!value.trim().is_empty(), format!("{} is required", field))
    }

    /// Required name no longer than [`MAX_NAME_LENGTH`] characters.
    pub fn name(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            return self.error(format!("{} is required", field));
        }
        self.max_length(field, Some(value), MAX_NAME_LENGTH)
    }

    pub fn max_length(&mut self, field: &str, value: Option<&str>, max: usize) -> &mut Self {
        let ok = value.is_none_or(|v| v.chars().count() <= max);
        self.check(ok, format!("{} must be at most {} characters", field, max))
    }

    pub fn email(&mut self, field: &str, value: Option<&str>) -> &mut Self {
        let ok = value.is_none_or(is_valid_email);
        self.check(ok, format!("{} is not a valid email address", field))
    }

    pub fn phone(&mut self, field: &str, value: Option<&str>) -> &mut Self {
        let ok = value.is_none_or(is_valid_phone);
        self.check(ok, format!("{} is not a valid phone number", field))
    }

    pub fn non_negative(&mut self, field: &str, value: f64) -> &mut Self {
        self.check(value >= 0.0, format!("{} cannot be negative", field))
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(self) -> ServiceResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::validation_many(self.errors))
        }
    }
}

pub fn is_valid_email(value: &str) -> bool {
    value.len() <= 150 && EMAIL_PATTERN.is_match(value)
}

/// Digits with optional leading `+`, spaces and dashes; 10 to 15 digits.
pub fn is_valid_phone(value: &str) -> bool {
    let digits = value.chars().filter(char::is_ascii_digit).count();
    PHONE_PATTERN.is_match(value) && (10..=15).contains(&digits)
}

/// Validate a Romanian personal numeric code (CNP) and return the birth date
/// it encodes.
///
/// Layout: `S YY MM DD JJ NNN C`. `S` (1-8) gives sex and century, `C` is the
/// control digit: the weighted sum of the first twelve digits modulo 11,
/// with 10 mapped to 1. For residents (`S` = 7 or 8) the century is not
/// encoded; the most recent century that does not put the date after
/// `today` is assumed.
pub fn validate_cnp(cnp: &str, today: NaiveDate) -> Result<NaiveDate, String> {
    if cnp.len() != 13 || !cnp.chars().all(|c| c.is_ascii_digit()) {
        return Err("CNP must have exactly 13 digits".to_string());
    }
    let digits: Vec<u32> = cnp.chars().filter_map(|c| c.to_digit(10)).collect();

    let sum: u32 = digits
        .iter()
        .zip(CNP_WEIGHTS.iter())
        .map(|(d, w)| d * w)
        .sum();
    let control = match sum % 11 {
        10 => 1,
        rest => rest,
    };
    if control != digits[12] {
        return Err("CNP control digit is invalid".to_string());
    }

    let yy = (digits[1] * 10 + digits[2]) as i32;
    let month = digits[3] * 10 + digits[4];
    let day = digits[5] * 10 + digits[6];
    let century = match digits[0] {
        1 | 2 => 1900,
        3 | 4 => 1800,
        5 | 6 => 2000,
        7 | 8 => {
            if 2000 + yy <= chrono::Datelike::year(&today) {
                2000
            } else {
                1900
            }
        }
        _ => return Err("CNP must start with a digit between 1 and 8".to_string()),
    };

    let birth = NaiveDate::from_ymd_opt(century + yy, month, day)
        .ok_or_else(|| "CNP encodes an invalid birth date".to_string())?;
    if birth > today {
        return Err("CNP encodes a birth date in the future".to_string());
    }
    Ok(birth)
}

/// Validate a Romanian fiscal code (CUI/CIF) and return it without the
/// optional `RO` prefix.
///
/// 2 to 10 digits; the last one is the control digit computed with the key
/// `753217532` over the left-padded body: weighted sum times 10 modulo 11,
/// with 10 mapped to 0.
pub fn validate_fiscal_code(raw: &str) -> Result<String, String> {
    let code = crate::models::normalize_fiscal_code(raw);
    if !(2..=10).contains(&code.len()) || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err("Fiscal code must have between 2 and 10 digits".to_string());
    }

    let digits: Vec<u32> = code.chars().filter_map(|c| c.to_digit(10)).collect();
    let (body, control) = digits.split_at(digits.len() - 1);
    let padding = CUI_KEY.len() - body.len();
    let sum: u32 = body
        .iter()
        .zip(CUI_KEY[padding..].iter())
        .map(|(d, k)| d * k)
        .sum();
    let expected = match sum * 10 % 11 {
        10 => 0,
        rest => rest,
    };
    if expected != control[0] {
        return Err("Fiscal code control digit is invalid".to_string());
    }
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[test]
    fn test_valid_cnp_returns_birth_date() {
        assert_eq!(
            validate_cnp("1850312400012", today()).unwrap(),
            NaiveDate::from_ymd_opt(1985, 3, 12).unwrap()
        );
        assert_eq!(
            validate_cnp("5010203400124", today()).unwrap(),
            NaiveDate::from_ymd_opt(2001, 2, 3).unwrap()
        );
    }

    #[test]
    fn test_cnp_rejections() {
        assert!(validate_cnp("185031240001", today()).is_err());
        assert!(validate_cnp("18503124000A2", today()).is_err());
        assert_eq!(
            validate_cnp("1850312400020", today()).unwrap_err(),
            "CNP control digit is invalid"
        );
        // valid control digit, first digit out of range
        assert_eq!(
            validate_cnp("9850312400017", today()).unwrap_err(),
            "CNP must start with a digit between 1 and 8"
        );
    }

    #[test]
    fn test_cnp_future_birth_date() {
        let err = validate_cnp("6260101123450", today()).unwrap_err();
        assert_eq!(err, "CNP encodes a birth date in the future");
    }

    #[test]
    fn test_resident_cnp_century() {
        assert_eq!(
            validate_cnp("7850312400013", today()).unwrap(),
            NaiveDate::from_ymd_opt(1985, 3, 12).unwrap()
        );
    }

    #[test]
    fn test_fiscal_code() {
        assert_eq!(validate_fiscal_code("RO18547290").unwrap(), "18547290");
        assert_eq!(validate_fiscal_code("12345674").unwrap(), "12345674");
        assert!(validate_fiscal_code("18547291").is_err());
        assert!(validate_fiscal_code("1").is_err());
        assert!(validate_fiscal_code("12345678901").is_err());
    }

    #[test]
    fn test_email_and_phone() {
        assert!(is_valid_email("ana.pop@clinica.ro"));
        assert!(!is_valid_email("ana.pop@clinica"));
        assert!(!is_valid_email("ana pop@clinica.ro"));
        assert!(is_valid_phone("+40 721-123-456"));
        assert!(is_valid_phone("0721123456"));
        assert!(!is_valid_phone("12345"));
        assert!(!is_valid_phone("0721abc456"));
    }

    #[test]
    fn test_validator_collects_all_errors() {
        let mut v = Validator::new();
        v.name("First name", "   ")
            .name("Last name", &"x".repeat(MAX_NAME_LENGTH + 1))
            .email("Email", Some("nope"))
            .phone("Phone", None);
        let err = v.finish().unwrap_err();
        assert_eq!(err.messages().len(), 3);
        assert_eq!(err.messages()[0], "First name is required");
    }
}
