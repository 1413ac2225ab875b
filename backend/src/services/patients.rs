//! Patient registry operations.

use chrono::{NaiveDate, Utc};

use super::validation::{validate_cnp, Validator};
use super::{check_listing_query, ServiceError, ServiceResult};
use crate::db::repository::PatientRepository;
use crate::models::{Patient, PatientId, PatientInput};
use crate::paging::{GroupedResult, PagedQuery, PagedResult};

/// Clean and validate patient fields as of `today`.
///
/// Beyond the per-field rules the date of birth must match the one encoded
/// in the CNP.
pub fn validate_patient(input: &PatientInput, today: NaiveDate) -> ServiceResult<PatientInput> {
    let input = input.cleaned();
    let mut v = Validator::new();
    v.name("First name", &input.first_name)
        .name("Last name", &input.last_name)
        .check(
            input.date_of_birth <= today,
            "Date of birth cannot be in the future",
        )
        .email("Email", input.email.as_deref())
        .phone("Phone", input.phone.as_deref())
        .max_length("Address", input.address.as_deref(), 250)
        .max_length("City", input.city.as_deref(), 100)
        .max_length("County", input.county.as_deref(), 100)
        .max_length("Insurance number", input.insurance_number.as_deref(), 50);

    match validate_cnp(&input.cnp, today) {
        Ok(encoded) if encoded != input.date_of_birth => {
            v.error("Date of birth does not match the CNP");
        }
        Ok(_) => {}
        Err(message) => {
            v.error(message);
        }
    }

    v.finish()?;
    Ok(input)
}

pub async fn create_patient<R: PatientRepository + ?Sized>(
    repo: &R,
    input: &PatientInput,
) -> ServiceResult<Patient> {
    let mut input = validate_patient(input, Utc::now().date_naive())?;
    input.is_active = Some(true);
    let patient = repo.create_patient(&input).await?;
    log::info!("Registered patient {}", patient.id);
    Ok(patient)
}

pub async fn get_patient<R: PatientRepository + ?Sized>(
    repo: &R,
    id: PatientId,
) -> ServiceResult<Patient> {
    Ok(repo.get_patient(id).await?)
}

pub async fn update_patient<R: PatientRepository + ?Sized>(
    repo: &R,
    id: PatientId,
    input: &PatientInput,
) -> ServiceResult<Patient> {
    let mut input = validate_patient(input, Utc::now().date_naive())?;
    input.is_active = None;
    Ok(repo.update_patient(id, &input).await?)
}

pub async fn delete_patient<R: PatientRepository + ?Sized>(
    repo: &R,
    id: PatientId,
) -> ServiceResult<()> {
    repo.deactivate_patient(id).await?;
    log::info!("Deactivated patient {}", id);
    Ok(())
}

pub async fn list_patients<R: PatientRepository + ?Sized>(
    repo: &R,
    include_inactive: bool,
) -> ServiceResult<Vec<Patient>> {
    Ok(repo.list_patients(include_inactive).await?)
}

pub async fn get_patients_paged<R: PatientRepository + ?Sized>(
    repo: &R,
    query: &PagedQuery,
) -> ServiceResult<PagedResult<Patient>> {
    let query = check_listing_query::<Patient>(query, false)?;
    Ok(repo.get_patients_paged(&query).await?)
}

pub async fn get_patients_grouped<R: PatientRepository + ?Sized>(
    repo: &R,
    query: &PagedQuery,
) -> ServiceResult<GroupedResult<Patient>> {
    let query = check_listing_query::<Patient>(query, true)?;
    Ok(repo.get_patients_grouped(&query).await?)
}

pub async fn find_patient_by_cnp<R: PatientRepository + ?Sized>(
    repo: &R,
    cnp: &str,
) -> ServiceResult<Patient> {
    let cnp = cnp.trim();
    repo.find_patient_by_cnp(cnp)
        .await?
        .ok_or_else(|| ServiceError::not_found(format!("No patient with CNP {}", cnp)))
}
