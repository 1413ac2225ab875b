use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::MedicationId;
use crate::paging::{any_field_contains, Pageable, SortValue, EMPTY_GROUP_KEY};

crate::define_code_enum!(
    PharmaceuticalForm {
        Tablet => "tablet",
        Capsule => "capsule",
        Syrup => "syrup",
        Injection => "injection",
        Ointment => "ointment",
        Drops => "drops",
        Other => "other",
    }
);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    pub id: MedicationId,
    pub name: String,
    pub active_substance: String,
    pub form: PharmaceuticalForm,
    pub strength: Option<String>,
    pub manufacturer: Option<String>,
    pub atc_code: Option<String>,
    pub stock_quantity: i32,
    pub min_stock: i32,
    pub unit_price: f64,
    pub expiry_date: Option<NaiveDate>,
    pub requires_prescription: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Medication {
    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.min_stock
    }

    pub fn is_expired_on(&self, date: NaiveDate) -> bool {
        self.expiry_date.is_some_and(|expiry| expiry < date)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationInput {
    pub name: String,
    pub active_substance: String,
    pub form: PharmaceuticalForm,
    #[serde(default)]
    pub strength: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub atc_code: Option<String>,
    #[serde(default)]
    pub stock_quantity: i32,
    #[serde(default)]
    pub min_stock: i32,
    #[serde(default)]
    pub unit_price: f64,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub requires_prescription: bool,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl MedicationInput {
    pub fn cleaned(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            active_substance: self.active_substance.trim().to_string(),
            form: self.form,
            strength: super::clean_opt(&self.strength),
            manufacturer: super::clean_opt(&self.manufacturer),
            atc_code: super::clean_opt(&self.atc_code).map(|c| c.to_uppercase()),
            stock_quantity: self.stock_quantity,
            min_stock: self.min_stock,
            unit_price: self.unit_price,
            expiry_date: self.expiry_date,
            requires_prescription: self.requires_prescription,
            is_active: self.is_active,
        }
    }
}

/// Stock movement: positive for receipts, negative for dispensing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAdjustment {
    pub delta: i32,
}

impl Pageable for Medication {
    const SORT_COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "activeSubstance",
        "form",
        "manufacturer",
        "atcCode",
        "stockQuantity",
        "unitPrice",
        "expiryDate",
    ];
    const GROUP_COLUMNS: &'static [&'static str] = &[
        "form",
        "manufacturer",
        "activeSubstance",
        "requiresPrescription",
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
                Some(self.active_substance.as_str()),
                self.manufacturer.as_deref(),
                self.atc_code.as_deref(),
            ],
            needle,
        )
    }

    fn sort_value(&self, column: &str) -> Option<SortValue> {
        Some(match column {
            "id" => SortValue::Int(self.id.value()),
            "name" => SortValue::text(&self.name),
            "activeSubstance" => SortValue::text(&self.active_substance),
            "form" => SortValue::text(self.form.as_str()),
            "manufacturer" => SortValue::opt_text(self.manufacturer.as_deref()),
            "atcCode" => SortValue::opt_text(self.atc_code.as_deref()),
            "stockQuantity" => SortValue::Int(self.stock_quantity as i64),
            "unitPrice" => SortValue::Float(self.unit_price),
            "expiryDate" => SortValue::opt_date(self.expiry_date),
            _ => return None,
        })
    }

    fn group_key(&self, column: &str) -> Option<String> {
        let key = match column {
            "form" => Some(self.form.as_str().to_string()),
            "manufacturer" => self.manufacturer.clone(),
            "activeSubstance" => Some(self.active_substance.clone()),
            "requiresPrescription" => Some(self.requires_prescription.to_string()),
            _ => return None,
        };
        Some(key.unwrap_or_else(|| EMPTY_GROUP_KEY.to_string()))
    }
}
