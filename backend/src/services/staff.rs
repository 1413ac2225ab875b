//! Medical personnel operations.

use super::validation::Validator;
use super::{check_listing_query, ServiceError, ServiceErrorKind, ServiceResult};
use crate::db::repository::{DepartmentRepository, StaffRepository};
use crate::models::{
    Department, DepartmentId, DepartmentKind, MedicalStaff, StaffId, StaffInput,
};
use crate::paging::{GroupedResult, PagedQuery, PagedResult};

fn validate_fields(input: &StaffInput) -> ServiceResult<StaffInput> {
    let input = input.cleaned();
    let mut v = Validator::new();
    v.name("First name", &input.first_name)
        .name("Last name", &input.last_name)
        .max_length("License number", input.license_number.as_deref(), 50)
        .email("Email", input.email.as_deref())
        .phone("Phone", input.phone.as_deref())
        .check(
            input.specialty_id.is_none() || input.category_id.is_some(),
            "A specialty requires a category",
        )
        .check(
            input.subspecialty_id.is_none() || input.specialty_id.is_some(),
            "A subspecialty requires a specialty",
        );
    v.finish()?;
    Ok(input)
}

async fn load_level<R: DepartmentRepository + ?Sized>(
    repo: &R,
    id: DepartmentId,
    kind: DepartmentKind,
) -> ServiceResult<Department> {
    let department = repo.get_department(id).await.map_err(|err| {
        match ServiceError::from(err) {
            e if e.is(ServiceErrorKind::NotFound) => {
                ServiceError::validation(format!("Department {} does not exist", id))
            }
            e => e,
        }
    })?;
    if department.kind != kind {
        return Err(ServiceError::validation(format!(
            "Department '{}' is a {}, expected a {}",
            department.name, department.kind, kind
        )));
    }
    if !department.is_active {
        return Err(ServiceError::validation(format!(
            "Department '{}' is inactive",
            department.name
        )));
    }
    Ok(department)
}

/// Check the category → specialty → subspecialty placement against the
/// stored hierarchy.
async fn check_placement<R: DepartmentRepository + ?Sized>(
    repo: &R,
    input: &StaffInput,
) -> ServiceResult<()> {
    if let Some(category_id) = input.category_id {
        load_level(repo, category_id, DepartmentKind::Category).await?;
    }
    if let Some(specialty_id) = input.specialty_id {
        let specialty = load_level(repo, specialty_id, DepartmentKind::Specialty).await?;
        if specialty.parent_id != input.category_id {
            return Err(ServiceError::validation(format!(
                "Specialty '{}' does not belong to the selected category",
                specialty.name
            )));
        }
    }
    if let Some(subspecialty_id) = input.subspecialty_id {
        let subspecialty =
            load_level(repo, subspecialty_id, DepartmentKind::Subspecialty).await?;
        if subspecialty.parent_id != input.specialty_id {
            return Err(ServiceError::validation(format!(
                "Subspecialty '{}' does not belong to the selected specialty",
                subspecialty.name
            )));
        }
    }
    Ok(())
}

pub async fn create_staff<R>(repo: &R, input: &StaffInput) -> ServiceResult<MedicalStaff>
where
    R: StaffRepository + DepartmentRepository + ?Sized,
{
    let mut input = validate_fields(input)?;
    check_placement(repo, &input).await?;
    input.is_active = Some(true);
    let staff = repo.create_staff(&input).await?;
    log::info!("Added staff member {} ({})", staff.full_name(), staff.id);
    Ok(staff)
}

pub async fn get_staff<R: StaffRepository + ?Sized>(
    repo: &R,
    id: StaffId,
) -> ServiceResult<MedicalStaff> {
    Ok(repo.get_staff(id).await?)
}

pub async fn update_staff<R>(
    repo: &R,
    id: StaffId,
    input: &StaffInput,
) -> ServiceResult<MedicalStaff>
where
    R: StaffRepository + DepartmentRepository + ?Sized,
{
    let mut input = validate_fields(input)?;
    input.is_active = None;
    check_placement(repo, &input).await?;
    Ok(repo.update_staff(id, &input).await?)
}

pub async fn delete_staff<R: StaffRepository + ?Sized>(repo: &R, id: StaffId) -> ServiceResult<()> {
    repo.deactivate_staff(id).await?;
    log::info!("Deactivated staff member {}", id);
    Ok(())
}

pub async fn list_staff<R: StaffRepository + ?Sized>(
    repo: &R,
    include_inactive: bool,
) -> ServiceResult<Vec<MedicalStaff>> {
    Ok(repo.list_staff(include_inactive).await?)
}

pub async fn get_staff_paged<R: StaffRepository + ?Sized>(
    repo: &R,
    query: &PagedQuery,
) -> ServiceResult<PagedResult<MedicalStaff>> {
    let query = check_listing_query::<MedicalStaff>(query, false)?;
    Ok(repo.get_staff_paged(&query).await?)
}

pub async fn get_staff_grouped<R: StaffRepository + ?Sized>(
    repo: &R,
    query: &PagedQuery,
) -> ServiceResult<GroupedResult<MedicalStaff>> {
    let query = check_listing_query::<MedicalStaff>(query, true)?;
    Ok(repo.get_staff_grouped(&query).await?)
}

/// Active staff placed in `department` at any level.
pub async fn list_staff_by_department<R>(
    repo: &R,
    department: DepartmentId,
) -> ServiceResult<Vec<MedicalStaff>>
where
    R: StaffRepository + DepartmentRepository + ?Sized,
{
    repo.get_department(department).await?;
    Ok(repo.list_staff_by_department(department).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::LocalRepository;
    use crate::models::{DepartmentInput, StaffPosition};
    use crate::services::departments::create_department;

    async fn dept(
        repo: &LocalRepository,
        name: &str,
        kind: DepartmentKind,
        parent: Option<DepartmentId>,
    ) -> DepartmentId {
        let input = DepartmentInput {
            name: name.to_string(),
            kind,
            parent_id: parent,
            description: None,
            is_active: None,
        };
        create_department(repo, &input).await.unwrap().id
    }

    fn staff(
        category: Option<DepartmentId>,
        specialty: Option<DepartmentId>,
        subspecialty: Option<DepartmentId>,
    ) -> StaffInput {
        StaffInput {
            first_name: "Maria".to_string(),
            last_name: "Ionescu".to_string(),
            position: StaffPosition::Doctor,
            license_number: Some("CMR-1001".to_string()),
            phone: None,
            email: Some("maria.ionescu@valyanmed.ro".to_string()),
            category_id: category,
            specialty_id: specialty,
            subspecialty_id: subspecialty,
            hire_date: None,
            is_active: None,
        }
    }

    #[tokio::test]
    async fn test_consistent_placement_is_accepted() {
        let repo = LocalRepository::new();
        let medical = dept(&repo, "Medical", DepartmentKind::Category, None).await;
        let cardio = dept(&repo, "Cardiology", DepartmentKind::Specialty, Some(medical)).await;

        let created = create_staff(&repo, &staff(Some(medical), Some(cardio), None))
            .await
            .unwrap();
        assert_eq!(created.specialty_name.as_deref(), Some("Cardiology"));

        let listed = list_staff_by_department(&repo, cardio).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn test_specialty_from_other_category_is_rejected() {
        let repo = LocalRepository::new();
        let medical = dept(&repo, "Medical", DepartmentKind::Category, None).await;
        let surgical = dept(&repo, "Surgical", DepartmentKind::Category, None).await;
        let cardio = dept(&repo, "Cardiology", DepartmentKind::Specialty, Some(medical)).await;

        let err = create_staff(&repo, &staff(Some(surgical), Some(cardio), None))
            .await
            .unwrap_err();
        assert!(err.is(ServiceErrorKind::Validation));
        assert!(err.messages()[0].contains("does not belong"));
    }

    #[tokio::test]
    async fn test_levels_must_be_filled_top_down() {
        let repo = LocalRepository::new();
        let err = create_staff(&repo, &staff(None, Some(DepartmentId(1)), None))
            .await
            .unwrap_err();
        assert_eq!(err.messages(), ["A specialty requires a category".to_string()]);
    }

    #[tokio::test]
    async fn test_wrong_kind_in_category_slot() {
        let repo = LocalRepository::new();
        let medical = dept(&repo, "Medical", DepartmentKind::Category, None).await;
        let cardio = dept(&repo, "Cardiology", DepartmentKind::Specialty, Some(medical)).await;

        let err = create_staff(&repo, &staff(Some(cardio), None, None))
            .await
            .unwrap_err();
        assert!(err.messages()[0].contains("expected a category"));
    }
}
