//! Public API surface of the crate.
//!
//! Consolidates the types a consumer of the crate (the HTTP layer, the grid
//! client, integration tests) needs: entity records and their inputs, the
//! listing envelope and the outcome wrapper.

pub use crate::auth::AuthUser;
pub use crate::models::{
    Department, DepartmentId, DepartmentInput, DepartmentKind, DepartmentNode, DeviceId,
    DeviceInput, DeviceStatus, Gender, MedicalDevice, MedicalStaff, Medication, MedicationId,
    MedicationInput, NewUser, Partner, PartnerId, PartnerInput, PartnerType, Patient, PatientId,
    PatientInput, PharmaceuticalForm, StaffId, StaffInput, StaffPosition, StockAdjustment, UserId,
    UserInfo, UserRole, UserUpdate,
};
pub use crate::outcome::Outcome;
pub use crate::paging::{
    Group, GroupedResult, PagedQuery, PagedResult, SortDirection, DEFAULT_PAGE_SIZE,
    MAX_PAGE_SIZE,
};
pub use crate::services::auth::{LoginRequest, LoginResponse};
pub use crate::services::{ServiceError, ServiceErrorKind, ServiceResult};
