//! HTTP handlers for the REST API.
//!
//! Each handler corresponds to an API endpoint and delegates to the
//! service layer; results are wrapped in an [`Outcome`] envelope.

use axum::{extract::State, http::StatusCode, Json};

use super::dto::{HealthResponse, ListParams, MaintenanceParams};
use super::error::AppError;
use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::state::AppState;
use crate::auth::AuthUser;
use crate::db::repository::HealthRepository;
use crate::models::{
    Department, DepartmentId, DepartmentInput, DepartmentKind, DepartmentNode, DeviceId,
    DeviceInput, MedicalDevice, MedicalStaff, Medication, MedicationId, MedicationInput, NewUser,
    Partner, PartnerId, PartnerInput, Patient, PatientId, PatientInput, StaffId, StaffInput,
    StockAdjustment, UserId, UserInfo, UserUpdate,
};
use crate::outcome::Outcome;
use crate::paging::{GroupedResult, PagedQuery, PagedResult};
use crate::services::auth::{LoginRequest, LoginResponse};
use crate::services::{departments, devices, medications, partners, patients, staff, users};

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<Outcome<T>>, AppError>;

/// Result type for handlers answering `201 Created`.
pub type CreatedResult<T> = Result<(StatusCode, Json<Outcome<T>>), AppError>;

fn ok<T>(value: T) -> HandlerResult<T> {
    Ok(Json(Outcome::success(value)))
}

fn created<T>(value: T) -> CreatedResult<T> {
    Ok((StatusCode::CREATED, Json(Outcome::success(value))))
}

fn deleted() -> HandlerResult<()> {
    Ok(Json(Outcome::success_empty()))
}

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
///
/// Health check endpoint to verify the service is running and database is accessible.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_status = match state.repository.health_check().await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "health check failed");
            "error".to_string()
        }
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: db_status,
    })
}

// =============================================================================
// Authentication
// =============================================================================

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> HandlerResult<LoginResponse> {
    ok(state.auth.login(state.repository.as_ref(), &request).await?)
}

/// GET /api/auth/me
pub async fn me(State(state): State<AppState>, caller: AuthUser) -> HandlerResult<UserInfo> {
    ok(state
        .auth
        .current_user(state.repository.as_ref(), &caller)
        .await?)
}

// =============================================================================
// Patients
// =============================================================================

pub async fn list_patients(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> HandlerResult<Vec<Patient>> {
    ok(patients::list_patients(state.repository.as_ref(), params.include_inactive).await?)
}

pub async fn get_patients_paged(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PagedQuery>,
) -> HandlerResult<PagedResult<Patient>> {
    ok(patients::get_patients_paged(state.repository.as_ref(), &query).await?)
}

pub async fn get_patients_grouped(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PagedQuery>,
) -> HandlerResult<GroupedResult<Patient>> {
    ok(patients::get_patients_grouped(state.repository.as_ref(), &query).await?)
}

pub async fn get_patient(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> HandlerResult<Patient> {
    ok(patients::get_patient(state.repository.as_ref(), PatientId(id)).await?)
}

/// GET /api/patients/by-cnp/{cnp}
pub async fn get_patient_by_cnp(
    State(state): State<AppState>,
    ApiPath(cnp): ApiPath<String>,
) -> HandlerResult<Patient> {
    ok(patients::find_patient_by_cnp(state.repository.as_ref(), &cnp).await?)
}

pub async fn create_patient(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<PatientInput>,
) -> CreatedResult<Patient> {
    created(patients::create_patient(state.repository.as_ref(), &input).await?)
}

pub async fn update_patient(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<PatientInput>,
) -> HandlerResult<Patient> {
    ok(patients::update_patient(state.repository.as_ref(), PatientId(id), &input).await?)
}

pub async fn delete_patient(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> HandlerResult<()> {
    patients::delete_patient(state.repository.as_ref(), PatientId(id)).await?;
    deleted()
}

// =============================================================================
// Medical Staff
// =============================================================================

pub async fn list_staff(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> HandlerResult<Vec<MedicalStaff>> {
    ok(staff::list_staff(state.repository.as_ref(), params.include_inactive).await?)
}

pub async fn get_staff_paged(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PagedQuery>,
) -> HandlerResult<PagedResult<MedicalStaff>> {
    ok(staff::get_staff_paged(state.repository.as_ref(), &query).await?)
}

pub async fn get_staff_grouped(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PagedQuery>,
) -> HandlerResult<GroupedResult<MedicalStaff>> {
    ok(staff::get_staff_grouped(state.repository.as_ref(), &query).await?)
}

pub async fn get_staff(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> HandlerResult<MedicalStaff> {
    ok(staff::get_staff(state.repository.as_ref(), StaffId(id)).await?)
}

/// GET /api/medical-staff/by-department/{id}
pub async fn list_staff_by_department(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> HandlerResult<Vec<MedicalStaff>> {
    ok(staff::list_staff_by_department(state.repository.as_ref(), DepartmentId(id)).await?)
}

pub async fn create_staff(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<StaffInput>,
) -> CreatedResult<MedicalStaff> {
    created(staff::create_staff(state.repository.as_ref(), &input).await?)
}

pub async fn update_staff(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<StaffInput>,
) -> HandlerResult<MedicalStaff> {
    ok(staff::update_staff(state.repository.as_ref(), StaffId(id), &input).await?)
}

pub async fn delete_staff(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> HandlerResult<()> {
    staff::delete_staff(state.repository.as_ref(), StaffId(id)).await?;
    deleted()
}

// =============================================================================
// Medical Devices
// =============================================================================

pub async fn list_devices(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> HandlerResult<Vec<MedicalDevice>> {
    ok(devices::list_devices(state.repository.as_ref(), params.include_inactive).await?)
}

pub async fn get_devices_paged(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PagedQuery>,
) -> HandlerResult<PagedResult<MedicalDevice>> {
    ok(devices::get_devices_paged(state.repository.as_ref(), &query).await?)
}

pub async fn get_devices_grouped(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PagedQuery>,
) -> HandlerResult<GroupedResult<MedicalDevice>> {
    ok(devices::get_devices_grouped(state.repository.as_ref(), &query).await?)
}

pub async fn get_device(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> HandlerResult<MedicalDevice> {
    ok(devices::get_device(state.repository.as_ref(), DeviceId(id)).await?)
}

/// GET /api/medical-devices/maintenance-due?days=N
pub async fn get_devices_due_for_maintenance(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<MaintenanceParams>,
) -> HandlerResult<Vec<MedicalDevice>> {
    ok(devices::devices_due_for_maintenance(state.repository.as_ref(), params.days).await?)
}

pub async fn create_device(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<DeviceInput>,
) -> CreatedResult<MedicalDevice> {
    created(devices::create_device(state.repository.as_ref(), &input).await?)
}

pub async fn update_device(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<DeviceInput>,
) -> HandlerResult<MedicalDevice> {
    ok(devices::update_device(state.repository.as_ref(), DeviceId(id), &input).await?)
}

pub async fn delete_device(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> HandlerResult<()> {
    devices::delete_device(state.repository.as_ref(), DeviceId(id)).await?;
    deleted()
}

// =============================================================================
// Medications
// =============================================================================

pub async fn list_medications(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> HandlerResult<Vec<Medication>> {
    let repo = state.repository.as_ref();
    ok(medications::list_medications(repo, params.include_inactive).await?)
}

pub async fn get_medications_paged(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PagedQuery>,
) -> HandlerResult<PagedResult<Medication>> {
    ok(medications::get_medications_paged(state.repository.as_ref(), &query).await?)
}

pub async fn get_medications_grouped(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PagedQuery>,
) -> HandlerResult<GroupedResult<Medication>> {
    ok(medications::get_medications_grouped(state.repository.as_ref(), &query).await?)
}

pub async fn get_medication(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> HandlerResult<Medication> {
    ok(medications::get_medication(state.repository.as_ref(), MedicationId(id)).await?)
}

/// GET /api/medications/low-stock
pub async fn get_low_stock_medications(
    State(state): State<AppState>,
) -> HandlerResult<Vec<Medication>> {
    ok(medications::low_stock_medications(state.repository.as_ref()).await?)
}

/// POST /api/medications/{id}/stock
pub async fn adjust_medication_stock(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(adjustment): ApiJson<StockAdjustment>,
) -> HandlerResult<Medication> {
    let repo = state.repository.as_ref();
    ok(medications::adjust_stock(repo, MedicationId(id), adjustment).await?)
}

pub async fn create_medication(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<MedicationInput>,
) -> CreatedResult<Medication> {
    created(medications::create_medication(state.repository.as_ref(), &input).await?)
}

pub async fn update_medication(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<MedicationInput>,
) -> HandlerResult<Medication> {
    let repo = state.repository.as_ref();
    ok(medications::update_medication(repo, MedicationId(id), &input).await?)
}

pub async fn delete_medication(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> HandlerResult<()> {
    medications::delete_medication(state.repository.as_ref(), MedicationId(id)).await?;
    deleted()
}

// =============================================================================
// Partners
// =============================================================================

pub async fn list_partners(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> HandlerResult<Vec<Partner>> {
    ok(partners::list_partners(state.repository.as_ref(), params.include_inactive).await?)
}

pub async fn get_partners_paged(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PagedQuery>,
) -> HandlerResult<PagedResult<Partner>> {
    ok(partners::get_partners_paged(state.repository.as_ref(), &query).await?)
}

pub async fn get_partners_grouped(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PagedQuery>,
) -> HandlerResult<GroupedResult<Partner>> {
    ok(partners::get_partners_grouped(state.repository.as_ref(), &query).await?)
}

pub async fn get_partner(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> HandlerResult<Partner> {
    ok(partners::get_partner(state.repository.as_ref(), PartnerId(id)).await?)
}

/// GET /api/partners/by-fiscal-code/{code}
pub async fn get_partner_by_fiscal_code(
    State(state): State<AppState>,
    ApiPath(code): ApiPath<String>,
) -> HandlerResult<Partner> {
    ok(partners::find_partner_by_fiscal_code(state.repository.as_ref(), &code).await?)
}

pub async fn create_partner(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<PartnerInput>,
) -> CreatedResult<Partner> {
    created(partners::create_partner(state.repository.as_ref(), &input).await?)
}

pub async fn update_partner(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<PartnerInput>,
) -> HandlerResult<Partner> {
    ok(partners::update_partner(state.repository.as_ref(), PartnerId(id), &input).await?)
}

pub async fn delete_partner(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> HandlerResult<()> {
    partners::delete_partner(state.repository.as_ref(), PartnerId(id)).await?;
    deleted()
}

// =============================================================================
// Departments
// =============================================================================

pub async fn list_departments(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> HandlerResult<Vec<Department>> {
    let repo = state.repository.as_ref();
    ok(departments::list_departments(repo, params.include_inactive).await?)
}

pub async fn get_departments_paged(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PagedQuery>,
) -> HandlerResult<PagedResult<Department>> {
    ok(departments::get_departments_paged(state.repository.as_ref(), &query).await?)
}

pub async fn get_departments_grouped(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PagedQuery>,
) -> HandlerResult<GroupedResult<Department>> {
    ok(departments::get_departments_grouped(state.repository.as_ref(), &query).await?)
}

/// GET /api/departments/tree
pub async fn get_department_tree(
    State(state): State<AppState>,
) -> HandlerResult<Vec<DepartmentNode>> {
    ok(departments::department_tree(state.repository.as_ref()).await?)
}

/// GET /api/departments/by-kind/{kind}
pub async fn list_departments_by_kind(
    State(state): State<AppState>,
    ApiPath(kind): ApiPath<DepartmentKind>,
) -> HandlerResult<Vec<Department>> {
    ok(departments::list_departments_by_kind(state.repository.as_ref(), kind).await?)
}

pub async fn get_department(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> HandlerResult<Department> {
    ok(departments::get_department(state.repository.as_ref(), DepartmentId(id)).await?)
}

/// GET /api/departments/{id}/children
pub async fn get_department_children(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> HandlerResult<Vec<Department>> {
    ok(departments::department_children(state.repository.as_ref(), DepartmentId(id)).await?)
}

pub async fn create_department(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<DepartmentInput>,
) -> CreatedResult<Department> {
    created(departments::create_department(state.repository.as_ref(), &input).await?)
}

pub async fn update_department(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<DepartmentInput>,
) -> HandlerResult<Department> {
    let repo = state.repository.as_ref();
    ok(departments::update_department(repo, DepartmentId(id), &input).await?)
}

pub async fn delete_department(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> HandlerResult<()> {
    departments::delete_department(state.repository.as_ref(), DepartmentId(id)).await?;
    deleted()
}

// =============================================================================
// Users (admin only)
// =============================================================================

pub async fn list_users(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> HandlerResult<Vec<UserInfo>> {
    ok(users::list_users(state.repository.as_ref(), params.include_inactive).await?)
}

pub async fn get_users_paged(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PagedQuery>,
) -> HandlerResult<PagedResult<UserInfo>> {
    ok(users::get_users_paged(state.repository.as_ref(), &query).await?)
}

pub async fn get_users_grouped(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PagedQuery>,
) -> HandlerResult<GroupedResult<UserInfo>> {
    ok(users::get_users_grouped(state.repository.as_ref(), &query).await?)
}

pub async fn get_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> HandlerResult<UserInfo> {
    ok(users::get_user(state.repository.as_ref(), UserId(id)).await?)
}

pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<NewUser>,
) -> CreatedResult<UserInfo> {
    let repo = state.repository.as_ref();
    created(users::create_user(repo, state.auth.hasher(), &request).await?)
}

pub async fn update_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<UserUpdate>,
) -> HandlerResult<UserInfo> {
    let repo = state.repository.as_ref();
    ok(users::update_user(repo, state.auth.hasher(), UserId(id), &request).await?)
}

pub async fn delete_user(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> HandlerResult<()> {
    users::delete_user(state.repository.as_ref(), &caller, UserId(id)).await?;
    deleted()
}
