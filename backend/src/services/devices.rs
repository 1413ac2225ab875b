//! Medical device inventory and maintenance planning.

use chrono::{Duration, NaiveDate, Utc};

use super::validation::Validator;
use super::{check_listing_query, ServiceError, ServiceErrorKind, ServiceResult};
use crate::db::repository::{DepartmentRepository, DeviceRepository};
use crate::models::{DeviceId, DeviceInput, MedicalDevice};
use crate::paging::{GroupedResult, PagedQuery, PagedResult};

/// Look-ahead used by the maintenance listing when the caller gives none.
pub const DEFAULT_MAINTENANCE_WINDOW_DAYS: i64 = 30;

/// Longest accepted maintenance look-ahead.
pub const MAX_MAINTENANCE_WINDOW_DAYS: i64 = 365;

fn validate_fields(input: &DeviceInput) -> ServiceResult<DeviceInput> {
    let input = input.cleaned();
    let mut v = Validator::new();
    v.name("Name", &input.name)
        .required("Serial number", &input.serial_number)
        .max_length("Serial number", Some(&input.serial_number), 100)
        .max_length("Manufacturer", input.manufacturer.as_deref(), 150)
        .max_length("Model", input.model.as_deref(), 100)
        .max_length("Notes", input.notes.as_deref(), 1000);

    if let (Some(last), Some(next)) = (input.last_maintenance, input.next_maintenance) {
        v.check(
            next >= last,
            "Next maintenance cannot be before the last maintenance",
        );
    }
    if let (Some(acquired), Some(last)) = (input.acquisition_date, input.last_maintenance) {
        v.check(
            last >= acquired,
            "Last maintenance cannot be before the acquisition date",
        );
    }

    v.finish()?;
    Ok(input)
}

async fn check_department<R: DepartmentRepository + ?Sized>(
    repo: &R,
    input: &DeviceInput,
) -> ServiceResult<()> {
    let Some(id) = input.department_id else {
        return Ok(());
    };
    match repo.get_department(id).await {
        Ok(department) if department.is_active => Ok(()),
        Ok(department) => Err(ServiceError::validation(format!(
            "Department '{}' is inactive",
            department.name
        ))),
        Err(err) => match ServiceError::from(err) {
            e if e.is(ServiceErrorKind::NotFound) => Err(ServiceError::validation(format!(
                "Department {} does not exist",
                id
            ))),
            e => Err(e),
        },
    }
}

pub async fn create_device<R>(repo: &R, input: &DeviceInput) -> ServiceResult<MedicalDevice>
where
    R: DeviceRepository + DepartmentRepository + ?Sized,
{
    let mut input = validate_fields(input)?;
    check_department(repo, &input).await?;
    input.is_active = Some(true);
    let device = repo.create_device(&input).await?;
    log::info!(
        "Registered device '{}' serial {} ({})",
        device.name,
        device.serial_number,
        device.id
    );
    Ok(device)
}

pub async fn get_device<R: DeviceRepository + ?Sized>(
    repo: &R,
    id: DeviceId,
) -> ServiceResult<MedicalDevice> {
    Ok(repo.get_device(id).await?)
}

pub async fn update_device<R>(
    repo: &R,
    id: DeviceId,
    input: &DeviceInput,
) -> ServiceResult<MedicalDevice>
where
    R: DeviceRepository + DepartmentRepository + ?Sized,
{
    let mut input = validate_fields(input)?;
    input.is_active = None;
    check_department(repo, &input).await?;
    Ok(repo.update_device(id, &input).await?)
}

pub async fn delete_device<R: DeviceRepository + ?Sized>(
    repo: &R,
    id: DeviceId,
) -> ServiceResult<()> {
    repo.deactivate_device(id).await?;
    log::info!("Deactivated device {}", id);
    Ok(())
}

pub async fn list_devices<R: DeviceRepository + ?Sized>(
    repo: &R,
    include_inactive: bool,
) -> ServiceResult<Vec<MedicalDevice>> {
    Ok(repo.list_devices(include_inactive).await?)
}

pub async fn get_devices_paged<R: DeviceRepository + ?Sized>(
    repo: &R,
    query: &PagedQuery,
) -> ServiceResult<PagedResult<MedicalDevice>> {
    let query = check_listing_query::<MedicalDevice>(query, false)?;
    Ok(repo.get_devices_paged(&query).await?)
}

pub async fn get_devices_grouped<R: DeviceRepository + ?Sized>(
    repo: &R,
    query: &PagedQuery,
) -> ServiceResult<GroupedResult<MedicalDevice>> {
    let query = check_listing_query::<MedicalDevice>(query, true)?;
    Ok(repo.get_devices_grouped(&query).await?)
}

/// Cut-off date for a maintenance look-ahead of `days` from `today`.
pub fn maintenance_cutoff(today: NaiveDate, days: Option<i64>) -> ServiceResult<NaiveDate> {
    let days = days.unwrap_or(DEFAULT_MAINTENANCE_WINDOW_DAYS);
    if !(0..=MAX_MAINTENANCE_WINDOW_DAYS).contains(&days) {
        return Err(ServiceError::validation(format!(
            "days must be between 0 and {}",
            MAX_MAINTENANCE_WINDOW_DAYS
        )));
    }
    Ok(today + Duration::days(days))
}

/// Active devices whose next maintenance falls within `days` from today,
/// overdue ones included.
pub async fn devices_due_for_maintenance<R: DeviceRepository + ?Sized>(
    repo: &R,
    days: Option<i64>,
) -> ServiceResult<Vec<MedicalDevice>> {
    let before = maintenance_cutoff(Utc::now().date_naive(), days)?;
    Ok(repo.devices_due_for_maintenance(before).await?)
}
