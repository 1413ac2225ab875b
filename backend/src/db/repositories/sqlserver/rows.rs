//! Row decoding for stored-procedure result sets.
//!
//! Column names match `backend/sql/schema.sql`. Every decoder reads by name
//! so procedures may return extra columns (joined names, totals).

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tiberius::numeric::Numeric;
use tiberius::Row;

use crate::db::repository::{RepositoryError, RepositoryResult};
use crate::models::*;

fn null_column(column: &str) -> RepositoryError {
    RepositoryError::internal(format!("Column {} is unexpectedly NULL", column))
}

fn opt_str(row: &Row, column: &str) -> RepositoryResult<Option<String>> {
    Ok(row.try_get::<&str, _>(column)?.map(str::to_string))
}

fn req_str(row: &Row, column: &str) -> RepositoryResult<String> {
    opt_str(row, column)?.ok_or_else(|| null_column(column))
}

fn opt_i64(row: &Row, column: &str) -> RepositoryResult<Option<i64>> {
    Ok(row.try_get::<i64, _>(column)?)
}

fn req_i64(row: &Row, column: &str) -> RepositoryResult<i64> {
    opt_i64(row, column)?.ok_or_else(|| null_column(column))
}

fn req_i32(row: &Row, column: &str) -> RepositoryResult<i32> {
    row.try_get::<i32, _>(column)?
        .ok_or_else(|| null_column(column))
}

fn req_bool(row: &Row, column: &str) -> RepositoryResult<bool> {
    row.try_get::<bool, _>(column)?
        .ok_or_else(|| null_column(column))
}

fn req_decimal(row: &Row, column: &str) -> RepositoryResult<f64> {
    row.try_get::<Numeric, _>(column)?
        .map(f64::from)
        .ok_or_else(|| null_column(column))
}

fn opt_date(row: &Row, column: &str) -> RepositoryResult<Option<NaiveDate>> {
    Ok(row.try_get::<NaiveDate, _>(column)?)
}

fn req_date(row: &Row, column: &str) -> RepositoryResult<NaiveDate> {
    opt_date(row, column)?.ok_or_else(|| null_column(column))
}

fn opt_timestamp(row: &Row, column: &str) -> RepositoryResult<Option<DateTime<Utc>>> {
    Ok(row
        .try_get::<NaiveDateTime, _>(column)?
        .map(|naive| naive.and_utc()))
}

fn req_timestamp(row: &Row, column: &str) -> RepositoryResult<DateTime<Utc>> {
    opt_timestamp(row, column)?.ok_or_else(|| null_column(column))
}

fn code<E: FromStr<Err = String>>(row: &Row, column: &str) -> RepositoryResult<E> {
    let raw = req_str(row, column)?;
    raw.parse::<E>()
        .map_err(|e| RepositoryError::internal(format!("Column {}: {}", column, e)))
}

/// `TotalCount` from the trailing result set of a paged procedure.
pub(super) fn total_count(row: &Row) -> RepositoryResult<u64> {
    let total = req_i64(row, "TotalCount")?;
    Ok(total.max(0) as u64)
}

pub(super) fn patient(row: &Row) -> RepositoryResult<Patient> {
    Ok(Patient {
        id: PatientId(req_i64(row, "Id")?),
        cnp: req_str(row, "Cnp")?,
        first_name: req_str(row, "FirstName")?,
        last_name: req_str(row, "LastName")?,
        date_of_birth: req_date(row, "DateOfBirth")?,
        gender: code(row, "Gender")?,
        phone: opt_str(row, "Phone")?,
        email: opt_str(row, "Email")?,
        address: opt_str(row, "Address")?,
        city: opt_str(row, "City")?,
        county: opt_str(row, "County")?,
        insurance_number: opt_str(row, "InsuranceNumber")?,
        is_active: req_bool(row, "IsActive")?,
        created_at: req_timestamp(row, "CreatedAt")?,
        updated_at: req_timestamp(row, "UpdatedAt")?,
    })
}

pub(super) fn staff(row: &Row) -> RepositoryResult<MedicalStaff> {
    Ok(MedicalStaff {
        id: StaffId(req_i64(row, "Id")?),
        first_name: req_str(row, "FirstName")?,
        last_name: req_str(row, "LastName")?,
        position: code(row, "Position")?,
        license_number: opt_str(row, "LicenseNumber")?,
        phone: opt_str(row, "Phone")?,
        email: opt_str(row, "Email")?,
        category_id: opt_i64(row, "CategoryId")?.map(DepartmentId),
        specialty_id: opt_i64(row, "SpecialtyId")?.map(DepartmentId),
        subspecialty_id: opt_i64(row, "SubspecialtyId")?.map(DepartmentId),
        category_name: opt_str(row, "CategoryName")?,
        specialty_name: opt_str(row, "SpecialtyName")?,
        subspecialty_name: opt_str(row, "SubspecialtyName")?,
        hire_date: opt_date(row, "HireDate")?,
        is_active: req_bool(row, "IsActive")?,
        created_at: req_timestamp(row, "CreatedAt")?,
        updated_at: req_timestamp(row, "UpdatedAt")?,
    })
}

pub(super) fn device(row: &Row) -> RepositoryResult<MedicalDevice> {
    Ok(MedicalDevice {
        id: DeviceId(req_i64(row, "Id")?),
        name: req_str(row, "Name")?,
        serial_number: req_str(row, "SerialNumber")?,
        manufacturer: opt_str(row, "Manufacturer")?,
        model: opt_str(row, "Model")?,
        device_type: opt_str(row, "DeviceType")?,
        department_id: opt_i64(row, "DepartmentId")?.map(DepartmentId),
        department_name: opt_str(row, "DepartmentName")?,
        acquisition_date: opt_date(row, "AcquisitionDate")?,
        last_maintenance: opt_date(row, "LastMaintenance")?,
        next_maintenance: opt_date(row, "NextMaintenance")?,
        status: code(row, "Status")?,
        notes: opt_str(row, "Notes")?,
        is_active: req_bool(row, "IsActive")?,
        created_at: req_timestamp(row, "CreatedAt")?,
        updated_at: req_timestamp(row, "UpdatedAt")?,
    })
}

pub(super) fn medication(row: &Row) -> RepositoryResult<Medication> {
    Ok(Medication {
        id: MedicationId(req_i64(row, "Id")?),
        name: req_str(row, "Name")?,
        active_substance: req_str(row, "ActiveSubstance")?,
        form: code(row, "Form")?,
        strength: opt_str(row, "Strength")?,
        manufacturer: opt_str(row, "Manufacturer")?,
        atc_code: opt_str(row, "AtcCode")?,
        stock_quantity: req_i32(row, "StockQuantity")?,
        min_stock: req_i32(row, "MinStock")?,
        unit_price: req_decimal(row, "UnitPrice")?,
        expiry_date: opt_date(row, "ExpiryDate")?,
        requires_prescription: req_bool(row, "RequiresPrescription")?,
        is_active: req_bool(row, "IsActive")?,
        created_at: req_timestamp(row, "CreatedAt")?,
        updated_at: req_timestamp(row, "UpdatedAt")?,
    })
}

pub(super) fn partner(row: &Row) -> RepositoryResult<Partner> {
    Ok(Partner {
        id: PartnerId(req_i64(row, "Id")?),
        name: req_str(row, "Name")?,
        partner_type: code(row, "PartnerType")?,
        fiscal_code: req_str(row, "FiscalCode")?,
        registry_number: opt_str(row, "RegistryNumber")?,
        contact_person: opt_str(row, "ContactPerson")?,
        phone: opt_str(row, "Phone")?,
        email: opt_str(row, "Email")?,
        address: opt_str(row, "Address")?,
        city: opt_str(row, "City")?,
        county: opt_str(row, "County")?,
        is_active: req_bool(row, "IsActive")?,
        created_at: req_timestamp(row, "CreatedAt")?,
        updated_at: req_timestamp(row, "UpdatedAt")?,
    })
}

pub(super) fn department(row: &Row) -> RepositoryResult<Department> {
    Ok(Department {
        id: DepartmentId(req_i64(row, "Id")?),
        name: req_str(row, "Name")?,
        kind: code(row, "Kind")?,
        parent_id: opt_i64(row, "ParentId")?.map(DepartmentId),
        description: opt_str(row, "Description")?,
        is_active: req_bool(row, "IsActive")?,
        created_at: req_timestamp(row, "CreatedAt")?,
        updated_at: req_timestamp(row, "UpdatedAt")?,
    })
}

pub(super) fn user(row: &Row) -> RepositoryResult<UserAccount> {
    Ok(UserAccount {
        id: UserId(req_i64(row, "Id")?),
        username: req_str(row, "Username")?,
        email: req_str(row, "Email")?,
        display_name: req_str(row, "DisplayName")?,
        role: code(row, "Role")?,
        password_hash: req_str(row, "PasswordHash")?,
        staff_id: opt_i64(row, "StaffId")?.map(StaffId),
        is_active: req_bool(row, "IsActive")?,
        last_login: opt_timestamp(row, "LastLogin")?,
        created_at: req_timestamp(row, "CreatedAt")?,
        updated_at: req_timestamp(row, "UpdatedAt")?,
    })
}
