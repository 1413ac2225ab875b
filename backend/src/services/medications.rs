//! Medication catalogue and pharmacy stock.

use super::validation::Validator;
use super::{check_listing_query, ServiceError, ServiceResult};
use crate::db::repository::MedicationRepository;
use crate::models::{Medication, MedicationId, MedicationInput, StockAdjustment};
use crate::paging::{GroupedResult, PagedQuery, PagedResult};

fn validate_fields(input: &MedicationInput) -> ServiceResult<MedicationInput> {
    let input = input.cleaned();
    let mut v = Validator::new();
    v.name("Name", &input.name)
        .name("Active substance", &input.active_substance)
        .max_length("Strength", input.strength.as_deref(), 50)
        .max_length("Manufacturer", input.manufacturer.as_deref(), 150)
        .max_length("ATC code", input.atc_code.as_deref(), 10)
        .non_negative("Stock quantity", input.stock_quantity as f64)
        .non_negative("Minimum stock", input.min_stock as f64)
        .non_negative("Unit price", input.unit_price)
        .check(input.unit_price.is_finite(), "Unit price must be a number");
    v.finish()?;
    Ok(input)
}

pub async fn create_medication<R: MedicationRepository + ?Sized>(
    repo: &R,
    input: &MedicationInput,
) -> ServiceResult<Medication> {
    let mut input = validate_fields(input)?;
    input.is_active = Some(true);
    let medication = repo.create_medication(&input).await?;
    log::info!("Added medication '{}' ({})", medication.name, medication.id);
    Ok(medication)
}

pub async fn get_medication<R: MedicationRepository + ?Sized>(
    repo: &R,
    id: MedicationId,
) -> ServiceResult<Medication> {
    Ok(repo.get_medication(id).await?)
}

pub async fn update_medication<R: MedicationRepository + ?Sized>(
    repo: &R,
    id: MedicationId,
    input: &MedicationInput,
) -> ServiceResult<Medication> {
    let mut input = validate_fields(input)?;
    input.is_active = None;
    Ok(repo.update_medication(id, &input).await?)
}

pub async fn delete_medication<R: MedicationRepository + ?Sized>(
    repo: &R,
    id: MedicationId,
) -> ServiceResult<()> {
    repo.deactivate_medication(id).await?;
    log::info!("Deactivated medication {}", id);
    Ok(())
}

pub async fn list_medications<R: MedicationRepository + ?Sized>(
    repo: &R,
    include_inactive: bool,
) -> ServiceResult<Vec<Medication>> {
    Ok(repo.list_medications(include_inactive).await?)
}

pub async fn get_medications_paged<R: MedicationRepository + ?Sized>(
    repo: &R,
    query: &PagedQuery,
) -> ServiceResult<PagedResult<Medication>> {
    let query = check_listing_query::<Medication>(query, false)?;
    Ok(repo.get_medications_paged(&query).await?)
}

pub async fn get_medications_grouped<R: MedicationRepository + ?Sized>(
    repo: &R,
    query: &PagedQuery,
) -> ServiceResult<GroupedResult<Medication>> {
    let query = check_listing_query::<Medication>(query, true)?;
    Ok(repo.get_medications_grouped(&query).await?)
}

pub async fn low_stock_medications<R: MedicationRepository + ?Sized>(
    repo: &R,
) -> ServiceResult<Vec<Medication>> {
    Ok(repo.low_stock_medications().await?)
}

/// Apply a stock movement. Zero deltas are rejected; a movement that would
/// leave negative stock is refused by the repository.
pub async fn adjust_stock<R: MedicationRepository + ?Sized>(
    repo: &R,
    id: MedicationId,
    adjustment: StockAdjustment,
) -> ServiceResult<Medication> {
    if adjustment.delta == 0 {
        return Err(ServiceError::validation("Stock adjustment cannot be zero"));
    }
    let medication = repo.adjust_medication_stock(id, adjustment.delta).await?;
    if medication.is_low_stock() {
        log::warn!(
            "Medication '{}' ({}) is at or below minimum stock: {} <= {}",
            medication.name,
            medication.id,
            medication.stock_quantity,
            medication.min_stock
        );
    }
    Ok(medication)
}
