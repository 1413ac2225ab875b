//! Department hierarchy: categories, their specialties and subspecialties.

use super::validation::Validator;
use super::{check_listing_query, ServiceError, ServiceResult};
use crate::db::repository::DepartmentRepository;
use crate::models::{
    build_department_tree, Department, DepartmentId, DepartmentInput, DepartmentKind,
    DepartmentNode,
};
use crate::paging::{GroupedResult, PagedQuery, PagedResult};

fn validate_fields(input: &DepartmentInput) -> ServiceResult<DepartmentInput> {
    let input = input.cleaned();
    let mut v = Validator::new();
    v.name("Name", &input.name)
        .max_length("Description", input.description.as_deref(), 500);
    v.finish()?;
    Ok(input)
}

/// Check that `parent_id` is an acceptable parent for a department of `kind`.
async fn check_parent<R: DepartmentRepository + ?Sized>(
    repo: &R,
    kind: DepartmentKind,
    parent_id: Option<DepartmentId>,
) -> ServiceResult<()> {
    match (kind.expected_parent(), parent_id) {
        (None, None) => Ok(()),
        (None, Some(_)) => Err(ServiceError::validation(format!(
            "A {} cannot have a parent department",
            kind
        ))),
        (Some(expected), None) => Err(ServiceError::validation(format!(
            "A {} must belong to a {}",
            kind, expected
        ))),
        (Some(expected), Some(parent_id)) => {
            let parent = repo.get_department(parent_id).await.map_err(|err| {
                match ServiceError::from(err) {
                    e if e.is(super::ServiceErrorKind::NotFound) => ServiceError::validation(
                        format!("Parent department {} does not exist", parent_id),
                    ),
                    e => e,
                }
            })?;
            if !parent.is_active {
                return Err(ServiceError::validation(format!(
                    "Parent department '{}' is inactive",
                    parent.name
                )));
            }
            if parent.kind != expected {
                return Err(ServiceError::validation(format!(
                    "The parent of a {} must be a {}, not a {}",
                    kind, expected, parent.kind
                )));
            }
            Ok(())
        }
    }
}

pub async fn create_department<R: DepartmentRepository + ?Sized>(
    repo: &R,
    input: &DepartmentInput,
) -> ServiceResult<Department> {
    let mut input = validate_fields(input)?;
    check_parent(repo, input.kind, input.parent_id).await?;
    input.is_active = Some(true);
    let department = repo.create_department(&input).await?;
    log::info!(
        "Created {} '{}' ({})",
        department.kind,
        department.name,
        department.id
    );
    Ok(department)
}

pub async fn get_department<R: DepartmentRepository + ?Sized>(
    repo: &R,
    id: DepartmentId,
) -> ServiceResult<Department> {
    Ok(repo.get_department(id).await?)
}

/// Rename, re-kind or re-parent a department. The active flag in `input` is
/// ignored; deactivation goes through [`delete_department`].
pub async fn update_department<R: DepartmentRepository + ?Sized>(
    repo: &R,
    id: DepartmentId,
    input: &DepartmentInput,
) -> ServiceResult<Department> {
    let mut input = validate_fields(input)?;
    input.is_active = None;
    if input.parent_id == Some(id) {
        return Err(ServiceError::validation(
            "A department cannot be its own parent",
        ));
    }

    let current = repo.get_department(id).await?;
    if current.kind != input.kind && !repo.department_children(id).await?.is_empty() {
        return Err(ServiceError::validation(
            "Cannot change the kind of a department that has active sub-departments",
        ));
    }
    check_parent(repo, input.kind, input.parent_id).await?;

    Ok(repo.update_department(id, &input).await?)
}

/// Soft delete; refused while the department has active sub-departments.
pub async fn delete_department<R: DepartmentRepository + ?Sized>(
    repo: &R,
    id: DepartmentId,
) -> ServiceResult<()> {
    repo.deactivate_department(id).await?;
    log::info!("Deactivated department {}", id);
    Ok(())
}

pub async fn list_departments<R: DepartmentRepository + ?Sized>(
    repo: &R,
    include_inactive: bool,
) -> ServiceResult<Vec<Department>> {
    Ok(repo.list_departments(include_inactive).await?)
}

pub async fn get_departments_paged<R: DepartmentRepository + ?Sized>(
    repo: &R,
    query: &PagedQuery,
) -> ServiceResult<PagedResult<Department>> {
    let query = check_listing_query::<Department>(query, false)?;
    Ok(repo.get_departments_paged(&query).await?)
}

pub async fn get_departments_grouped<R: DepartmentRepository + ?Sized>(
    repo: &R,
    query: &PagedQuery,
) -> ServiceResult<GroupedResult<Department>> {
    let query = check_listing_query::<Department>(query, true)?;
    Ok(repo.get_departments_grouped(&query).await?)
}

/// Active sub-departments of `parent`. The parent itself must exist.
pub async fn department_children<R: DepartmentRepository + ?Sized>(
    repo: &R,
    parent: DepartmentId,
) -> ServiceResult<Vec<Department>> {
    repo.get_department(parent).await?;
    Ok(repo.department_children(parent).await?)
}

pub async fn list_departments_by_kind<R: DepartmentRepository + ?Sized>(
    repo: &R,
    kind: DepartmentKind,
) -> ServiceResult<Vec<Department>> {
    Ok(repo.list_departments_by_kind(kind).await?)
}

/// The active hierarchy as a forest rooted at the categories.
pub async fn department_tree<R: DepartmentRepository + ?Sized>(
    repo: &R,
) -> ServiceResult<Vec<DepartmentNode>> {
    let departments = repo.list_departments(false).await?;
    Ok(build_department_tree(&departments))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::LocalRepository;
    use crate::services::ServiceErrorKind;

    fn input(name: &str, kind: DepartmentKind, parent: Option<DepartmentId>) -> DepartmentInput {
        DepartmentInput {
            name: name.to_string(),
            kind,
            parent_id: parent,
            description: None,
            is_active: None,
        }
    }

    #[tokio::test]
    async fn test_parent_kind_rules() {
        let repo = LocalRepository::new();
        let medical = create_department(&repo, &input("Medical", DepartmentKind::Category, None))
            .await
            .unwrap();

        let err = create_department(&repo, &input("Cardiology", DepartmentKind::Specialty, None))
            .await
            .unwrap_err();
        assert!(err.is(ServiceErrorKind::Validation));

        let err = create_department(
            &repo,
            &input("Interventional", DepartmentKind::Subspecialty, Some(medical.id)),
        )
        .await
        .unwrap_err();
        assert!(err.messages()[0].contains("must be a specialty"));

        let err = create_department(
            &repo,
            &input("Surgical", DepartmentKind::Category, Some(medical.id)),
        )
        .await
        .unwrap_err();
        assert!(err.is(ServiceErrorKind::Validation));

        let cardio = create_department(
            &repo,
            &input("Cardiology", DepartmentKind::Specialty, Some(medical.id)),
        )
        .await
        .unwrap();
        assert_eq!(cardio.parent_id, Some(medical.id));
    }

    #[tokio::test]
    async fn test_missing_parent_is_validation_error() {
        let repo = LocalRepository::new();
        let err = create_department(
            &repo,
            &input("Cardiology", DepartmentKind::Specialty, Some(DepartmentId(99))),
        )
        .await
        .unwrap_err();
        assert!(err.is(ServiceErrorKind::Validation));
    }

    #[tokio::test]
    async fn test_tree_and_delete_with_children() {
        let repo = LocalRepository::new();
        let medical = create_department(&repo, &input("Medical", DepartmentKind::Category, None))
            .await
            .unwrap();
        create_department(
            &repo,
            &input("Cardiology", DepartmentKind::Specialty, Some(medical.id)),
        )
        .await
        .unwrap();

        let tree = department_tree(&repo).await.unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].children[0].department.name, "Cardiology");

        let err = delete_department(&repo, medical.id).await.unwrap_err();
        assert!(err.is(ServiceErrorKind::Conflict));
    }

    #[tokio::test]
    async fn test_update_checks_self_parent_and_kind_change() {
        let repo = LocalRepository::new();
        let medical = create_department(&repo, &input("Medical", DepartmentKind::Category, None))
            .await
            .unwrap();
        let surgical = create_department(&repo, &input("Surgical", DepartmentKind::Category, None))
            .await
            .unwrap();
        create_department(
            &repo,
            &input("Cardiology", DepartmentKind::Specialty, Some(medical.id)),
        )
        .await
        .unwrap();

        let err = update_department(
            &repo,
            medical.id,
            &input("Medical", DepartmentKind::Specialty, Some(medical.id)),
        )
        .await
        .unwrap_err();
        assert!(err.messages()[0].contains("own parent"));

        let err = update_department(
            &repo,
            medical.id,
            &input("Medical", DepartmentKind::Specialty, Some(surgical.id)),
        )
        .await
        .unwrap_err();
        assert!(err.messages()[0].contains("Cannot change the kind"));
    }

    #[tokio::test]
    async fn test_update_cannot_deactivate_a_parent() {
        let repo = LocalRepository::new();
        let medical = create_department(&repo, &input("Medical", DepartmentKind::Category, None))
            .await
            .unwrap();
        let cardio = create_department(
            &repo,
            &input("Cardiology", DepartmentKind::Specialty, Some(medical.id)),
        )
        .await
        .unwrap();

        let mut change = input("Medical and surgical", DepartmentKind::Category, None);
        change.is_active = Some(false);
        let updated = update_department(&repo, medical.id, &change).await.unwrap();
        assert_eq!(updated.name, "Medical and surgical");
        assert!(updated.is_active);
        assert!(get_department(&repo, cardio.id).await.unwrap().is_active);
        assert_eq!(department_tree(&repo).await.unwrap().len(), 1);
    }
}
