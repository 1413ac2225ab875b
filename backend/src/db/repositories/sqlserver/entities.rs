//! Entity repository traits over the stored procedures.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tiberius::Query;

use super::{exec_sql, rows, SqlServerRepository};
use crate::db::repository::*;
use crate::models::*;
use crate::paging::{GroupedResult, PagedQuery, PagedResult};

const PATIENT_FIELDS: &[&str] = &[
    "Cnp",
    "FirstName",
    "LastName",
    "DateOfBirth",
    "Gender",
    "Phone",
    "Email",
    "Address",
    "City",
    "County",
    "InsuranceNumber",
    "IsActive",
];

const STAFF_FIELDS: &[&str] = &[
    "FirstName",
    "LastName",
    "Position",
    "LicenseNumber",
    "Phone",
    "Email",
    "CategoryId",
    "SpecialtyId",
    "SubspecialtyId",
    "HireDate",
    "IsActive",
];

const DEVICE_FIELDS: &[&str] = &[
    "Name",
    "SerialNumber",
    "Manufacturer",
    "Model",
    "DeviceType",
    "DepartmentId",
    "AcquisitionDate",
    "LastMaintenance",
    "NextMaintenance",
    "Status",
    "Notes",
    "IsActive",
];

const MEDICATION_FIELDS: &[&str] = &[
    "Name",
    "ActiveSubstance",
    "Form",
    "Strength",
    "Manufacturer",
    "AtcCode",
    "StockQuantity",
    "MinStock",
    "UnitPrice",
    "ExpiryDate",
    "RequiresPrescription",
    "IsActive",
];

const PARTNER_FIELDS: &[&str] = &[
    "Name",
    "PartnerType",
    "FiscalCode",
    "RegistryNumber",
    "ContactPerson",
    "Phone",
    "Email",
    "Address",
    "City",
    "County",
    "IsActive",
];

const DEPARTMENT_FIELDS: &[&str] = &["Name", "Kind", "ParentId", "Description", "IsActive"];

const USER_FIELDS: &[&str] = &[
    "Email",
    "DisplayName",
    "Role",
    "PasswordHash",
    "StaffId",
    "IsActive",
];

/// `create` binds only the fields; `update` binds `@Id` first.
fn write_call<'a>(procedure: &str, id: Option<i64>, fields: &[&str]) -> Query<'a> {
    let mut params: Vec<&str> = Vec::with_capacity(fields.len() + 1);
    if id.is_some() {
        params.push("Id");
    }
    params.extend_from_slice(fields);
    let mut call = Query::new(exec_sql(procedure, &params));
    if let Some(id) = id {
        call.bind(id);
    }
    call
}

fn raw_id<I: Into<i64>>(id: Option<I>) -> Option<i64> {
    id.map(Into::into)
}

fn bind_patient<'a>(call: &mut Query<'a>, input: &'a PatientInput) {
    call.bind(input.cnp.as_str());
    call.bind(input.first_name.as_str());
    call.bind(input.last_name.as_str());
    call.bind(input.date_of_birth);
    call.bind(input.gender.as_str());
    call.bind(input.phone.as_deref());
    call.bind(input.email.as_deref());
    call.bind(input.address.as_deref());
    call.bind(input.city.as_deref());
    call.bind(input.county.as_deref());
    call.bind(input.insurance_number.as_deref());
    call.bind(input.is_active);
}

fn bind_staff<'a>(call: &mut Query<'a>, input: &'a StaffInput) {
    call.bind(input.first_name.as_str());
    call.bind(input.last_name.as_str());
    call.bind(input.position.as_str());
    call.bind(input.license_number.as_deref());
    call.bind(input.phone.as_deref());
    call.bind(input.email.as_deref());
    call.bind(raw_id(input.category_id));
    call.bind(raw_id(input.specialty_id));
    call.bind(raw_id(input.subspecialty_id));
    call.bind(input.hire_date);
    call.bind(input.is_active);
}

fn bind_device<'a>(call: &mut Query<'a>, input: &'a DeviceInput) {
    call.bind(input.name.as_str());
    call.bind(input.serial_number.as_str());
    call.bind(input.manufacturer.as_deref());
    call.bind(input.model.as_deref());
    call.bind(input.device_type.as_deref());
    call.bind(raw_id(input.department_id));
    call.bind(input.acquisition_date);
    call.bind(input.last_maintenance);
    call.bind(input.next_maintenance);
    call.bind(input.status.as_str());
    call.bind(input.notes.as_deref());
    call.bind(input.is_active);
}

fn bind_medication<'a>(call: &mut Query<'a>, input: &'a MedicationInput) {
    call.bind(input.name.as_str());
    call.bind(input.active_substance.as_str());
    call.bind(input.form.as_str());
    call.bind(input.strength.as_deref());
    call.bind(input.manufacturer.as_deref());
    call.bind(input.atc_code.as_deref());
    call.bind(input.stock_quantity);
    call.bind(input.min_stock);
    call.bind(input.unit_price);
    call.bind(input.expiry_date);
    call.bind(input.requires_prescription);
    call.bind(input.is_active);
}

fn bind_partner<'a>(call: &mut Query<'a>, input: &'a PartnerInput) {
    call.bind(input.name.as_str());
    call.bind(input.partner_type.as_str());
    call.bind(input.fiscal_code.as_str());
    call.bind(input.registry_number.as_deref());
    call.bind(input.contact_person.as_deref());
    call.bind(input.phone.as_deref());
    call.bind(input.email.as_deref());
    call.bind(input.address.as_deref());
    call.bind(input.city.as_deref());
    call.bind(input.county.as_deref());
    call.bind(input.is_active);
}

fn bind_department<'a>(call: &mut Query<'a>, input: &'a DepartmentInput) {
    call.bind(input.name.as_str());
    call.bind(input.kind.as_str());
    call.bind(raw_id(input.parent_id));
    call.bind(input.description.as_deref());
    call.bind(input.is_active);
}

fn bind_user<'a>(call: &mut Query<'a>, draft: &'a UserDraft) {
    call.bind(draft.email.as_str());
    call.bind(draft.display_name.as_str());
    call.bind(draft.role.as_str());
    call.bind(draft.password_hash.as_str());
    call.bind(raw_id(draft.staff_id));
    call.bind(draft.is_active);
}

#[async_trait]
impl HealthRepository for SqlServerRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        match self.ping().await {
            Ok(()) => Ok(true),
            Err(e) if e.is_retryable() => {
                log::warn!("SQL Server health check failed: {}", e);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}

// ==================== Patients ====================

#[async_trait]
impl PatientRepository for SqlServerRepository {
    async fn create_patient(&self, input: &PatientInput) -> RepositoryResult<Patient> {
        let mut call = write_call("sp_Pacienti_Create", None, PATIENT_FIELDS);
        bind_patient(&mut call, input);
        rows::patient(&self.single_row(call, "sp_Pacienti_Create").await?)
    }

    async fn get_patient(&self, id: PatientId) -> RepositoryResult<Patient> {
        self.get_by_id("sp_Pacienti_GetById", id.value(), rows::patient)
            .await
    }

    async fn update_patient(
        &self,
        id: PatientId,
        input: &PatientInput,
    ) -> RepositoryResult<Patient> {
        let mut call = write_call("sp_Pacienti_Update", Some(id.value()), PATIENT_FIELDS);
        bind_patient(&mut call, input);
        rows::patient(&self.single_row(call, "sp_Pacienti_Update").await?)
    }

    async fn deactivate_patient(&self, id: PatientId) -> RepositoryResult<()> {
        self.soft_delete("sp_Pacienti_Delete", id.value()).await
    }

    async fn list_patients(&self, include_inactive: bool) -> RepositoryResult<Vec<Patient>> {
        self.get_all("sp_Pacienti_GetAll", include_inactive, rows::patient)
            .await
    }

    async fn get_patients_paged(
        &self,
        query: &PagedQuery,
    ) -> RepositoryResult<PagedResult<Patient>> {
        self.paged("sp_Pacienti_GetPaged", query, rows::patient)
            .await
    }

    async fn get_patients_grouped(
        &self,
        query: &PagedQuery,
    ) -> RepositoryResult<GroupedResult<Patient>> {
        self.grouped("sp_Pacienti_GetAll", query, rows::patient)
            .await
    }

    async fn find_patient_by_cnp(&self, cnp: &str) -> RepositoryResult<Option<Patient>> {
        let mut call = Query::new(exec_sql("sp_Pacienti_GetByCnp", &["Cnp"]));
        call.bind(cnp);
        self.optional_row(call, "sp_Pacienti_GetByCnp")
            .await?
            .map(|row| rows::patient(&row))
            .transpose()
    }
}

// ==================== Medical staff ====================

#[async_trait]
impl StaffRepository for SqlServerRepository {
    async fn create_staff(&self, input: &StaffInput) -> RepositoryResult<MedicalStaff> {
        let mut call = write_call("sp_PersonalMedical_Create", None, STAFF_FIELDS);
        bind_staff(&mut call, input);
        rows::staff(&self.single_row(call, "sp_PersonalMedical_Create").await?)
    }

    async fn get_staff(&self, id: StaffId) -> RepositoryResult<MedicalStaff> {
        self.get_by_id("sp_PersonalMedical_GetById", id.value(), rows::staff)
            .await
    }

    async fn update_staff(
        &self,
        id: StaffId,
        input: &StaffInput,
    ) -> RepositoryResult<MedicalStaff> {
        let mut call = write_call("sp_PersonalMedical_Update", Some(id.value()), STAFF_FIELDS);
        bind_staff(&mut call, input);
        rows::staff(&self.single_row(call, "sp_PersonalMedical_Update").await?)
    }

    async fn deactivate_staff(&self, id: StaffId) -> RepositoryResult<()> {
        self.soft_delete("sp_PersonalMedical_Delete", id.value())
            .await
    }

    async fn list_staff(&self, include_inactive: bool) -> RepositoryResult<Vec<MedicalStaff>> {
        self.get_all("sp_PersonalMedical_GetAll", include_inactive, rows::staff)
            .await
    }

    async fn get_staff_paged(
        &self,
        query: &PagedQuery,
    ) -> RepositoryResult<PagedResult<MedicalStaff>> {
        self.paged("sp_PersonalMedical_GetPaged", query, rows::staff)
            .await
    }

    async fn get_staff_grouped(
        &self,
        query: &PagedQuery,
    ) -> RepositoryResult<GroupedResult<MedicalStaff>> {
        self.grouped("sp_PersonalMedical_GetAll", query, rows::staff)
            .await
    }

    async fn list_staff_by_department(
        &self,
        department: DepartmentId,
    ) -> RepositoryResult<Vec<MedicalStaff>> {
        let mut call = Query::new(exec_sql(
            "sp_PersonalMedical_GetByDepartment",
            &["DepartmentId"],
        ));
        call.bind(department.value());
        self.decode_all(call, "sp_PersonalMedical_GetByDepartment", rows::staff)
            .await
    }
}

// ==================== Medical devices ====================

#[async_trait]
impl DeviceRepository for SqlServerRepository {
    async fn create_device(&self, input: &DeviceInput) -> RepositoryResult<MedicalDevice> {
        let mut call = write_call("sp_DispozitiveMedicale_Create", None, DEVICE_FIELDS);
        bind_device(&mut call, input);
        rows::device(&self.single_row(call, "sp_DispozitiveMedicale_Create").await?)
    }

    async fn get_device(&self, id: DeviceId) -> RepositoryResult<MedicalDevice> {
        self.get_by_id("sp_DispozitiveMedicale_GetById", id.value(), rows::device)
            .await
    }

    async fn update_device(
        &self,
        id: DeviceId,
        input: &DeviceInput,
    ) -> RepositoryResult<MedicalDevice> {
        let mut call = write_call(
            "sp_DispozitiveMedicale_Update",
            Some(id.value()),
            DEVICE_FIELDS,
        );
        bind_device(&mut call, input);
        rows::device(&self.single_row(call, "sp_DispozitiveMedicale_Update").await?)
    }

    async fn deactivate_device(&self, id: DeviceId) -> RepositoryResult<()> {
        self.soft_delete("sp_DispozitiveMedicale_Delete", id.value())
            .await
    }

    async fn list_devices(&self, include_inactive: bool) -> RepositoryResult<Vec<MedicalDevice>> {
        self.get_all("sp_DispozitiveMedicale_GetAll", include_inactive, rows::device)
            .await
    }

    async fn get_devices_paged(
        &self,
        query: &PagedQuery,
    ) -> RepositoryResult<PagedResult<MedicalDevice>> {
        self.paged("sp_DispozitiveMedicale_GetPaged", query, rows::device)
            .await
    }

    async fn get_devices_grouped(
        &self,
        query: &PagedQuery,
    ) -> RepositoryResult<GroupedResult<MedicalDevice>> {
        self.grouped("sp_DispozitiveMedicale_GetAll", query, rows::device)
            .await
    }

    async fn devices_due_for_maintenance(
        &self,
        before: NaiveDate,
    ) -> RepositoryResult<Vec<MedicalDevice>> {
        let mut call = Query::new(exec_sql(
            "sp_DispozitiveMedicale_GetMaintenanceDue",
            &["Before"],
        ));
        call.bind(before);
        self.decode_all(
            call,
            "sp_DispozitiveMedicale_GetMaintenanceDue",
            rows::device,
        )
        .await
    }
}

// ==================== Medications ====================

#[async_trait]
impl MedicationRepository for SqlServerRepository {
    async fn create_medication(&self, input: &MedicationInput) -> RepositoryResult<Medication> {
        let mut call = write_call("sp_Medicamente_Create", None, MEDICATION_FIELDS);
        bind_medication(&mut call, input);
        rows::medication(&self.single_row(call, "sp_Medicamente_Create").await?)
    }

    async fn get_medication(&self, id: MedicationId) -> RepositoryResult<Medication> {
        self.get_by_id("sp_Medicamente_GetById", id.value(), rows::medication)
            .await
    }

    async fn update_medication(
        &self,
        id: MedicationId,
        input: &MedicationInput,
    ) -> RepositoryResult<Medication> {
        let mut call = write_call("sp_Medicamente_Update", Some(id.value()), MEDICATION_FIELDS);
        bind_medication(&mut call, input);
        rows::medication(&self.single_row(call, "sp_Medicamente_Update").await?)
    }

    async fn deactivate_medication(&self, id: MedicationId) -> RepositoryResult<()> {
        self.soft_delete("sp_Medicamente_Delete", id.value()).await
    }

    async fn list_medications(&self, include_inactive: bool) -> RepositoryResult<Vec<Medication>> {
        self.get_all("sp_Medicamente_GetAll", include_inactive, rows::medication)
            .await
    }

    async fn get_medications_paged(
        &self,
        query: &PagedQuery,
    ) -> RepositoryResult<PagedResult<Medication>> {
        self.paged("sp_Medicamente_GetPaged", query, rows::medication)
            .await
    }

    async fn get_medications_grouped(
        &self,
        query: &PagedQuery,
    ) -> RepositoryResult<GroupedResult<Medication>> {
        self.grouped("sp_Medicamente_GetAll", query, rows::medication)
            .await
    }

    async fn low_stock_medications(&self) -> RepositoryResult<Vec<Medication>> {
        let call = Query::new(exec_sql("sp_Medicamente_GetLowStock", &[]));
        self.decode_all(call, "sp_Medicamente_GetLowStock", rows::medication)
            .await
    }

    async fn adjust_medication_stock(
        &self,
        id: MedicationId,
        delta: i32,
    ) -> RepositoryResult<Medication> {
        let mut call = Query::new(exec_sql("sp_Medicamente_AdjustStock", &["Id", "Delta"]));
        call.bind(id.value());
        call.bind(delta);
        rows::medication(&self.single_row(call, "sp_Medicamente_AdjustStock").await?)
    }
}

// ==================== Partners ====================

#[async_trait]
impl PartnerRepository for SqlServerRepository {
    async fn create_partner(&self, input: &PartnerInput) -> RepositoryResult<Partner> {
        let mut call = write_call("sp_Partener_Create", None, PARTNER_FIELDS);
        bind_partner(&mut call, input);
        rows::partner(&self.single_row(call, "sp_Partener_Create").await?)
    }

    async fn get_partner(&self, id: PartnerId) -> RepositoryResult<Partner> {
        self.get_by_id("sp_Partener_GetById", id.value(), rows::partner)
            .await
    }

    async fn update_partner(
        &self,
        id: PartnerId,
        input: &PartnerInput,
    ) -> RepositoryResult<Partner> {
        let mut call = write_call("sp_Partener_Update", Some(id.value()), PARTNER_FIELDS);
        bind_partner(&mut call, input);
        rows::partner(&self.single_row(call, "sp_Partener_Update").await?)
    }

    async fn deactivate_partner(&self, id: PartnerId) -> RepositoryResult<()> {
        self.soft_delete("sp_Partener_Delete", id.value()).await
    }

    async fn list_partners(&self, include_inactive: bool) -> RepositoryResult<Vec<Partner>> {
        self.get_all("sp_Partener_GetAll", include_inactive, rows::partner)
            .await
    }

    async fn get_partners_paged(
        &self,
        query: &PagedQuery,
    ) -> RepositoryResult<PagedResult<Partner>> {
        self.paged("sp_Partener_GetPaged", query, rows::partner)
            .await
    }

    async fn get_partners_grouped(
        &self,
        query: &PagedQuery,
    ) -> RepositoryResult<GroupedResult<Partner>> {
        self.grouped("sp_Partener_GetAll", query, rows::partner)
            .await
    }

    async fn find_partner_by_fiscal_code(
        &self,
        fiscal_code: &str,
    ) -> RepositoryResult<Option<Partner>> {
        let mut call = Query::new(exec_sql("sp_Partener_GetByFiscalCode", &["FiscalCode"]));
        call.bind(fiscal_code);
        self.optional_row(call, "sp_Partener_GetByFiscalCode")
            .await?
            .map(|row| rows::partner(&row))
            .transpose()
    }
}

// ==================== Departments ====================

#[async_trait]
impl DepartmentRepository for SqlServerRepository {
    async fn create_department(&self, input: &DepartmentInput) -> RepositoryResult<Department> {
        let mut call = write_call("sp_Departamente_Create", None, DEPARTMENT_FIELDS);
        bind_department(&mut call, input);
        rows::department(&self.single_row(call, "sp_Departamente_Create").await?)
    }

    async fn get_department(&self, id: DepartmentId) -> RepositoryResult<Department> {
        self.get_by_id("sp_Departamente_GetById", id.value(), rows::department)
            .await
    }

    async fn update_department(
        &self,
        id: DepartmentId,
        input: &DepartmentInput,
    ) -> RepositoryResult<Department> {
        let mut call = write_call(
            "sp_Departamente_Update",
            Some(id.value()),
            DEPARTMENT_FIELDS,
        );
        bind_department(&mut call, input);
        rows::department(&self.single_row(call, "sp_Departamente_Update").await?)
    }

    async fn deactivate_department(&self, id: DepartmentId) -> RepositoryResult<()> {
        self.soft_delete("sp_Departamente_Delete", id.value()).await
    }

    async fn list_departments(&self, include_inactive: bool) -> RepositoryResult<Vec<Department>> {
        self.get_all("sp_Departamente_GetAll", include_inactive, rows::department)
            .await
    }

    async fn get_departments_paged(
        &self,
        query: &PagedQuery,
    ) -> RepositoryResult<PagedResult<Department>> {
        self.paged("sp_Departamente_GetPaged", query, rows::department)
            .await
    }

    async fn get_departments_grouped(
        &self,
        query: &PagedQuery,
    ) -> RepositoryResult<GroupedResult<Department>> {
        self.grouped("sp_Departamente_GetAll", query, rows::department)
            .await
    }

    async fn department_children(
        &self,
        parent: DepartmentId,
    ) -> RepositoryResult<Vec<Department>> {
        let mut call = Query::new(exec_sql("sp_Departamente_GetChildren", &["ParentId"]));
        call.bind(parent.value());
        self.decode_all(call, "sp_Departamente_GetChildren", rows::department)
            .await
    }

    async fn list_departments_by_kind(
        &self,
        kind: DepartmentKind,
    ) -> RepositoryResult<Vec<Department>> {
        let mut call = Query::new(exec_sql("sp_Departamente_GetByKind", &["Kind"]));
        call.bind(kind.as_str());
        self.decode_all(call, "sp_Departamente_GetByKind", rows::department)
            .await
    }
}

// ==================== Users ====================

#[async_trait]
impl UserRepository for SqlServerRepository {
    async fn create_user(&self, draft: &UserDraft) -> RepositoryResult<UserAccount> {
        let mut params = vec!["Username"];
        params.extend_from_slice(USER_FIELDS);
        let mut call = Query::new(exec_sql("sp_Utilizatori_Create", &params));
        call.bind(draft.username.as_str());
        bind_user(&mut call, draft);
        rows::user(&self.single_row(call, "sp_Utilizatori_Create").await?)
    }

    async fn get_user(&self, id: UserId) -> RepositoryResult<UserAccount> {
        self.get_by_id("sp_Utilizatori_GetById", id.value(), rows::user)
            .await
    }

    async fn update_user(&self, id: UserId, draft: &UserDraft) -> RepositoryResult<UserAccount> {
        let mut call = write_call("sp_Utilizatori_Update", Some(id.value()), USER_FIELDS);
        bind_user(&mut call, draft);
        rows::user(&self.single_row(call, "sp_Utilizatori_Update").await?)
    }

    async fn deactivate_user(&self, id: UserId) -> RepositoryResult<()> {
        self.soft_delete("sp_Utilizatori_Delete", id.value()).await
    }

    async fn list_users(&self, include_inactive: bool) -> RepositoryResult<Vec<UserAccount>> {
        self.get_all("sp_Utilizatori_GetAll", include_inactive, rows::user)
            .await
    }

    async fn get_users_paged(
        &self,
        query: &PagedQuery,
    ) -> RepositoryResult<PagedResult<UserAccount>> {
        self.paged("sp_Utilizatori_GetPaged", query, rows::user)
            .await
    }

    async fn get_users_grouped(
        &self,
        query: &PagedQuery,
    ) -> RepositoryResult<GroupedResult<UserAccount>> {
        self.grouped("sp_Utilizatori_GetAll", query, rows::user)
            .await
    }

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> RepositoryResult<Option<UserAccount>> {
        let mut call = Query::new(exec_sql("sp_Utilizatori_GetByUsername", &["Username"]));
        call.bind(username);
        self.optional_row(call, "sp_Utilizatori_GetByUsername")
            .await?
            .map(|row| rows::user(&row))
            .transpose()
    }

    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> RepositoryResult<()> {
        let mut call = Query::new(exec_sql("sp_Utilizatori_RecordLogin", &["Id", "At"]));
        call.bind(id.value());
        call.bind(at.naive_utc());
        self.execute(call, "sp_Utilizatori_RecordLogin").await
    }

    async fn count_users(&self) -> RepositoryResult<u64> {
        let call = Query::new(exec_sql("sp_Utilizatori_Count", &[]));
        let row = self.single_row(call, "sp_Utilizatori_Count").await?;
        rows::total_count(&row)
    }
}
