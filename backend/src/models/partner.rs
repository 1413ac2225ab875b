use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PartnerId;
use crate::paging::{any_field_contains, Pageable, SortValue, EMPTY_GROUP_KEY};

crate::define_code_enum!(
    /// Kind of organisation the clinic works with.
    PartnerType {
        Supplier => "supplier",
        Insurer => "insurer",
        Laboratory => "laboratory",
        Pharmacy => "pharmacy",
        Hospital => "hospital",
        Other => "other",
    }
);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Partner {
    pub id: PartnerId,
    pub name: String,
    pub partner_type: PartnerType,
    /// Fiscal code (CUI), stored without the `RO` prefix; unique.
    pub fiscal_code: String,
    pub registry_number: Option<String>,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub county: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerInput {
    pub name: String,
    pub partner_type: PartnerType,
    pub fiscal_code: String,
    #[serde(default)]
    pub registry_number: Option<String>,
    #[serde(default)]
    pub contact_person: Option<String>,
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
    pub is_active: Option<bool>,
}

impl PartnerInput {
    /// Trimmed copy; the fiscal code loses its optional `RO` prefix and spaces.
    pub fn cleaned(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            partner_type: self.partner_type,
            fiscal_code: normalize_fiscal_code(&self.fiscal_code),
            registry_number: super::clean_opt(&self.registry_number),
            contact_person: super::clean_opt(&self.contact_person),
            phone: super::clean_opt(&self.phone),
            email: super::clean_opt(&self.email),
            address: super::clean_opt(&self.address),
            city: super::clean_opt(&self.city),
            county: super::clean_opt(&self.county),
            is_active: self.is_active,
        }
    }
}

pub fn normalize_fiscal_code(raw: &str) -> String {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let upper = compact.to_uppercase();
    upper
        .strip_prefix("RO")
        .map(str::to_string)
        .unwrap_or(upper)
}

impl Pageable for Partner {
    const SORT_COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "partnerType",
        "fiscalCode",
        "contactPerson",
        "city",
        "county",
    ];
    const GROUP_COLUMNS: &'static [&'static str] = &["partnerType", "city", "county"];

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
                Some(self.fiscal_code.as_str()),
                self.registry_number.as_deref(),
                self.contact_person.as_deref(),
                self.email.as_deref(),
                self.city.as_deref(),
            ],
            needle,
        )
    }

    fn sort_value(&self, column: &str) -> Option<SortValue> {
        Some(match column {
            "id" => SortValue::Int(self.id.value()),
            "name" => SortValue::text(&self.name),
            "partnerType" => SortValue::text(self.partner_type.as_str()),
            "fiscalCode" => SortValue::text(&self.fiscal_code),
            "contactPerson" => SortValue::opt_text(self.contact_person.as_deref()),
            "city" => SortValue::opt_text(self.city.as_deref()),
            "county" => SortValue::opt_text(self.county.as_deref()),
            _ => return None,
        })
    }

    fn group_key(&self, column: &str) -> Option<String> {
        let key = match column {
            "partnerType" => Some(self.partner_type.as_str().to_string()),
            "city" => self.city.clone(),
            "county" => self.county.clone(),
            _ => return None,
        };
        Some(key.unwrap_or_else(|| EMPTY_GROUP_KEY.to_string()))
    }
}
