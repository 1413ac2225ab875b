use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{DepartmentId, DeviceId};
use crate::paging::{any_field_contains, Pageable, SortValue, EMPTY_GROUP_KEY};

crate::define_code_enum!(
    DeviceStatus {
        Operational => "operational",
        UnderMaintenance => "under_maintenance",
        OutOfService => "out_of_service",
        Retired => "retired",
    }
);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalDevice {
    pub id: DeviceId,
    pub name: String,
    /// Manufacturer serial, unique across devices.
    pub serial_number: String,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub device_type: Option<String>,
    pub department_id: Option<DepartmentId>,
    pub department_name: Option<String>,
    pub acquisition_date: Option<NaiveDate>,
    pub last_maintenance: Option<NaiveDate>,
    pub next_maintenance: Option<NaiveDate>,
    pub status: DeviceStatus,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MedicalDevice {
    /// Active, not retired, with a scheduled maintenance on or before `date`.
    pub fn maintenance_due_by(&self, date: NaiveDate) -> bool {
        self.is_active
            && self.status != DeviceStatus::Retired
            && self.next_maintenance.is_some_and(|next| next <= date)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInput {
    pub name: String,
    pub serial_number: String,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub department_id: Option<DepartmentId>,
    #[serde(default)]
    pub acquisition_date: Option<NaiveDate>,
    #[serde(default)]
    pub last_maintenance: Option<NaiveDate>,
    #[serde(default)]
    pub next_maintenance: Option<NaiveDate>,
    #[serde(default = "default_status")]
    pub status: DeviceStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

fn default_status() -> DeviceStatus {
    DeviceStatus::Operational
}

impl DeviceInput {
    pub fn cleaned(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            serial_number: self.serial_number.trim().to_uppercase(),
            manufacturer: super::clean_opt(&self.manufacturer),
            model: super::clean_opt(&self.model),
            device_type: super::clean_opt(&self.device_type),
            department_id: self.department_id,
            acquisition_date: self.acquisition_date,
            last_maintenance: self.last_maintenance,
            next_maintenance: self.next_maintenance,
            status: self.status,
            notes: super::clean_opt(&self.notes),
            is_active: self.is_active,
        }
    }
}

impl Pageable for MedicalDevice {
    const SORT_COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "serialNumber",
        "manufacturer",
        "deviceType",
        "departmentName",
        "status",
        "acquisitionDate",
        "nextMaintenance",
    ];
    const GROUP_COLUMNS: &'static [&'static str] = &[
        "status",
        "deviceType",
        "manufacturer",
        "departmentName",
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
                Some(self.name.as_str()),
                Some(self.serial_number.as_str()),
                self.manufacturer.as_deref(),
                self.model.as_deref(),
                self.device_type.as_deref(),
                self.department_name.as_deref(),
            ],
            needle,
        )
    }

    fn sort_value(&self, column: &str) -> Option<SortValue> {
        Some(match column {
            "id" => SortValue::Int(self.id.value()),
            "name" => SortValue::text(&self.name),
            "serialNumber" => SortValue::text(&self.serial_number),
            "manufacturer" => SortValue::opt_text(self.manufacturer.as_deref()),
            "deviceType" => SortValue::opt_text(self.device_type.as_deref()),
            "departmentName" => SortValue::opt_text(self.department_name.as_deref()),
            "status" => SortValue::text(self.status.as_str()),
            "acquisitionDate" => SortValue::opt_date(self.acquisition_date),
            "nextMaintenance" => SortValue::opt_date(self.next_maintenance),
            _ => return None,
        })
    }

    fn group_key(&self, column: &str) -> Option<String> {
        let key = match column {
            "status" => Some(self.status.as_str().to_string()),
            "deviceType" => self.device_type.clone(),
            "manufacturer" => self.manufacturer.clone(),
            "departmentName" => self.department_name.clone(),
            _ => return None,
        };
        Some(key.unwrap_or_else(|| EMPTY_GROUP_KEY.to_string()))
    }
}
