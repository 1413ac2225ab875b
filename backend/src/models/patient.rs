use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::PatientId;
use crate::paging::{any_field_contains, Pageable, SortValue, EMPTY_GROUP_KEY};

crate::define_code_enum!(
    /// Administrative gender as recorded on the patient file.
    Gender {
        Male => "male",
        Female => "female",
        Other => "other",
    }
);

/// Patient record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: PatientId,
    /// 13-digit personal numeric code, unique across patients.
    pub cnp: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub county: Option<String>,
    pub insurance_number: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.last_name, self.first_name)
    }

    /// Age in whole years on `date`.
    pub fn age_on(&self, date: NaiveDate) -> u32 {
        let mut years = date.year() - self.date_of_birth.year();
        if (date.month(), date.day()) < (self.date_of_birth.month(), self.date_of_birth.day()) {
            years -= 1;
        }
        years.max(0) as u32
    }
}

/// Fields accepted when creating or updating a patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientInput {
    pub cnp: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub county: Option<String>,
    #[serde(default)]
    pub insurance_number: Option<String>,
    /// Only honoured on update; allows reactivating a soft-deleted record.
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl PatientInput {
    /// Copy with text fields trimmed and blank optionals dropped.
    pub fn cleaned(&self) -> Self {
        Self {
            cnp: self.cnp.trim().to_string(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            date_of_birth: self.date_of_birth,
            gender: self.gender,
            phone: super::clean_opt(&self.phone),
            email: super::clean_opt(&self.email),
            address: super::clean_opt(&self.address),
            city: super::clean_opt(&self.city),
            county: super::clean_opt(&self.county),
            insurance_number: super::clean_opt(&self.insurance_number),
            is_active: self.is_active,
        }
    }
}

impl Pageable for Patient {
    const SORT_COLUMNS: &'static [&'static str] = &[
        "id",
        "cnp",
        "firstName",
        "lastName",
        "dateOfBirth",
        "gender",
        "city",
        "county",
        "createdAt",
    ];
    const GROUP_COLUMNS: &'static [&'static str] = &["gender", "city", "county", "isActive"];

    fn record_id(&self) -> i64 {
        self.id.value()
    }

    fn is_active(&self) -> bool {
        self.is_active
    }

    fn matches_search(&self, needle: &str) -> bool {
        any_field_contains(
            &[
                Some(self.cnp.as_str()),
                Some(self.first_name.as_str()),
                Some(self.last_name.as_str()),
                self.phone.as_deref(),
                self.email.as_deref(),
                self.city.as_deref(),
                self.insurance_number.as_deref(),
            ],
            needle,
        ) || self.full_name().to_lowercase().contains(needle)
    }

    fn sort_value(&self, column: &str) -> Option<SortValue> {
        Some(match column {
            "id" => SortValue::Int(self.id.value()),
            "cnp" => SortValue::text(&self.cnp),
            "firstName" => SortValue::text(&self.first_name),
            "lastName" => SortValue::text(&self.last_name),
            "dateOfBirth" => SortValue::Date(self.date_of_birth),
            "gender" => SortValue::text(self.gender.as_str()),
            "city" => SortValue::opt_text(self.city.as_deref()),
            "county" => SortValue::opt_text(self.county.as_deref()),
            "createdAt" => SortValue::Timestamp(self.created_at),
            _ => return None,
        })
    }

    fn group_key(&self, column: &str) -> Option<String> {
        let key = match column {
            "gender" => Some(self.gender.as_str().to_string()),
            "city" => self.city.clone(),
            "county" => self.county.clone(),
            "isActive" => Some(self.is_active.to_string()),
            _ => return None,
        };
        Some(key.unwrap_or_else(|| EMPTY_GROUP_KEY.to_string()))
    }
}
