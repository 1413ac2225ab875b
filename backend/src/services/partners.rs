//! Partner organisations: suppliers, insurers, laboratories and the like.

use super::validation::{validate_fiscal_code, Validator};
use super::{check_listing_query, ServiceError, ServiceResult};
use crate::db::repository::PartnerRepository;
use crate::models::{normalize_fiscal_code, Partner, PartnerId, PartnerInput};
use crate::paging::{GroupedResult, PagedQuery, PagedResult};

fn validate_fields(input: &PartnerInput) -> ServiceResult<PartnerInput> {
    let input = input.cleaned();
    let mut v = Validator::new();
    v.required("Name", &input.name)
        .max_length("Name", Some(&input.name), 200)
        .max_length("Registry number", input.registry_number.as_deref(), 30)
        .max_length("Contact person", input.contact_person.as_deref(), 150)
        .email("Email", input.email.as_deref())
        .phone("Phone", input.phone.as_deref());
    if let Err(message) = validate_fiscal_code(&input.fiscal_code) {
        v.error(message);
    }
    v.finish()?;
    Ok(input)
}

pub async fn create_partner<R: PartnerRepository + ?Sized>(
    repo: &R,
    input: &PartnerInput,
) -> ServiceResult<Partner> {
    let mut input = validate_fields(input)?;
    input.is_active = Some(true);
    let partner = repo.create_partner(&input).await?;
    log::info!(
        "Added partner '{}' CUI {} ({})",
        partner.name,
        partner.fiscal_code,
        partner.id
    );
    Ok(partner)
}

pub async fn get_partner<R: PartnerRepository + ?Sized>(
    repo: &R,
    id: PartnerId,
) -> ServiceResult<Partner> {
    Ok(repo.get_partner(id).await?)
}

pub async fn update_partner<R: PartnerRepository + ?Sized>(
    repo: &R,
    id: PartnerId,
    input: &PartnerInput,
) -> ServiceResult<Partner> {
    let mut input = validate_fields(input)?;
    input.is_active = None;
    Ok(repo.update_partner(id, &input).await?)
}

pub async fn delete_partner<R: PartnerRepository + ?Sized>(
    repo: &R,
    id: PartnerId,
) -> ServiceResult<()> {
    repo.deactivate_partner(id).await?;
    log::info!("Deactivated partner {}", id);
    Ok(())
}

pub async fn list_partners<R: PartnerRepository + ?Sized>(
    repo: &R,
    include_inactive: bool,
) -> ServiceResult<Vec<Partner>> {
    Ok(repo.list_partners(include_inactive).await?)
}

pub async fn get_partners_paged<R: PartnerRepository + ?Sized>(
    repo: &R,
    query: &PagedQuery,
) -> ServiceResult<PagedResult<Partner>> {
    let query = check_listing_query::<Partner>(query, false)?;
    Ok(repo.get_partners_paged(&query).await?)
}

pub async fn get_partners_grouped<R: PartnerRepository + ?Sized>(
    repo: &R,
    query: &PagedQuery,
) -> ServiceResult<GroupedResult<Partner>> {
    let query = check_listing_query::<Partner>(query, true)?;
    Ok(repo.get_partners_grouped(&query).await?)
}

/// Look up a partner by fiscal code, with or without the `RO` prefix.
pub async fn find_partner_by_fiscal_code<R: PartnerRepository + ?Sized>(
    repo: &R,
    fiscal_code: &str,
) -> ServiceResult<Partner> {
    let code = normalize_fiscal_code(fiscal_code);
    repo.find_partner_by_fiscal_code(&code)
        .await?
        .ok_or_else(|| ServiceError::not_found(format!("No partner with fiscal code {}", code)))
}
