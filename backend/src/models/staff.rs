use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{DepartmentId, StaffId};
use crate::paging::{any_field_contains, Pageable, SortValue, EMPTY_GROUP_KEY};

crate::define_code_enum!(
    StaffPosition {
        Doctor => "doctor",
        Resident => "resident",
        Nurse => "nurse",
        Technician => "technician",
        Pharmacist => "pharmacist",
        Administrative => "administrative",
        Other => "other",
    }
);

/// Medical personnel record.
///
/// Department placement follows the hierarchy: `specialty_id` must be a child
/// of `category_id` and `subspecialty_id` a child of `specialty_id`. The
/// `*_name` fields are resolved by the repository and ignored on input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalStaff {
    pub id: StaffId,
    pub first_name: String,
    pub last_name: String,
    pub position: StaffPosition,
    pub license_number: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub category_id: Option<DepartmentId>,
    pub specialty_id: Option<DepartmentId>,
    pub subspecialty_id: Option<DepartmentId>,
    pub category_name: Option<String>,
    pub specialty_name: Option<String>,
    pub subspecialty_name: Option<String>,
    pub hire_date: Option<NaiveDate>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MedicalStaff {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.last_name, self.first_name)
    }

    /// Whether the staff member is placed in `department` at any level.
    pub fn belongs_to(&self, department: DepartmentId) -> bool {
        [self.category_id, self.specialty_id, self.subspecialty_id]
            .iter()
            .any(|d| *d == Some(department))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffInput {
    pub first_name: String,
    pub last_name: String,
    pub position: StaffPosition,
    #[serde(default)]
    pub license_number: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub category_id: Option<DepartmentId>,
    #[serde(default)]
    pub specialty_id: Option<DepartmentId>,
    #[serde(default)]
    pub subspecialty_id: Option<DepartmentId>,
    #[serde(default)]
    pub hire_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl StaffInput {
    pub fn cleaned(&self) -> Self {
        Self {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            position: self.position,
            license_number: super::clean_opt(&self.license_number),
            phone: super::clean_opt(&self.phone),
            email: super::clean_opt(&self.email),
            category_id: self.category_id,
            specialty_id: self.specialty_id,
            subspecialty_id: self.subspecialty_id,
            hire_date: self.hire_date,
            is_active: self.is_active,
        }
    }
}

impl Pageable for MedicalStaff {
    const SORT_COLUMNS: &'static [&'static str] = &[
        "id",
        "firstName",
        "lastName",
        "position",
        "licenseNumber",
        "categoryName",
        "specialtyName",
        "subspecialtyName",
        "hireDate",
    ];
    const GROUP_COLUMNS: &'static [&'static str] = &[
        "position",
        "categoryName",
        "specialtyName",
        "subspecialtyName",
        "isActive",
    ];

    fn record_id(&self) -> i64 {
        self.id.value()
    }

    fn is_active(&self) -> bool {
        self.is_active
    }

    fn matches_search(&self, needle: &str) -> bool {
        any_field_contains(
            &[
                Some(self.first_name.as_str()),
                Some(self.last_name.as_str()),
                Some(self.position.as_str()),
                self.license_number.as_deref(),
                self.email.as_deref(),
                self.phone.as_deref(),
                self.category_name.as_deref(),
                self.specialty_name.as_deref(),
                self.subspecialty_name.as_deref(),
            ],
            needle,
        ) || self.full_name().to_lowercase().contains(needle)
    }

    fn sort_value(&self, column: &str) -> Option<SortValue> {
        Some(match column {
            "id" => SortValue::Int(self.id.value()),
            "firstName" => SortValue::text(&self.first_name),
            "lastName" => SortValue::text(&self.last_name),
            "position" => SortValue::text(self.position.as_str()),
            "licenseNumber" => SortValue::opt_text(self.license_number.as_deref()),
            "categoryName" => SortValue::opt_text(self.category_name.as_deref()),
            "specialtyName" => SortValue::opt_text(self.specialty_name.as_deref()),
            "subspecialtyName" => SortValue::opt_text(self.subspecialty_name.as_deref()),
            "hireDate" => SortValue::opt_date(self.hire_date),
            _ => return None,
        })
    }

    fn group_key(&self, column: &str) -> Option<String> {
        let key = match column {
            "position" => Some(self.position.as_str().to_string()),
            "categoryName" => self.category_name.clone(),
            "specialtyName" => self.specialty_name.clone(),
            "subspecialtyName" => self.subspecialty_name.clone(),
            "isActive" => Some(self.is_active.to_string()),
            _ => return None,
        };
        Some(key.unwrap_or_else(|| EMPTY_GROUP_KEY.to_string()))
    }
}
