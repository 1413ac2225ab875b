//! In-memory local repository implementation.
//!
//! This module provides a local implementation of all repository traits
//! suitable for unit testing and local development. Records live in ordered
//! maps keyed by id, so listings are deterministic.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;

use crate::db::repository::*;
use crate::models::*;
use crate::paging::{self, GroupedResult, PagedQuery, PagedResult, Pageable};

/// In-memory local repository.
///
/// Enforces the same uniqueness and stock rules as the SQL Server stored
/// procedures so services behave identically on both backends.
///
/// # Example
/// ```
/// use valyanmed::db::repositories::LocalRepository;
/// use valyanmed::db::repository::PatientRepository;
///
/// # tokio_test_block(async {
/// let repo = LocalRepository::new();
/// let patients = repo.list_patients(false).await.unwrap();
/// assert!(patients.is_empty());
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Runtime::new().unwrap().block_on(f)
/// # }
/// ```
#[derive(Clone)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
}

struct Table<T> {
    rows: BTreeMap<i64, T>,
    next_id: i64,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl<T> Table<T> {
    fn allocate_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn find(&self, id: i64, entity: &str) -> RepositoryResult<&T> {
        self.rows.get(&id).ok_or_else(|| not_found(entity, id))
    }

    fn find_mut(&mut self, id: i64, entity: &str) -> RepositoryResult<&mut T> {
        self.rows.get_mut(&id).ok_or_else(|| not_found(entity, id))
    }

    fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.rows.values()
    }
}

struct LocalData {
    patients: Table<Patient>,
    staff: Table<MedicalStaff>,
    devices: Table<MedicalDevice>,
    medications: Table<Medication>,
    partners: Table<Partner>,
    departments: Table<Department>,
    users: Table<UserAccount>,

    // Connection health
    is_healthy: bool,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            patients: Table::default(),
            staff: Table::default(),
            devices: Table::default(),
            medications: Table::default(),
            partners: Table::default(),
            departments: Table::default(),
            users: Table::default(),
            is_healthy: true,
        }
    }
}

fn not_found(entity: &str, id: i64) -> RepositoryError {
    RepositoryError::not_found_with_context(
        format!("{} with id {} not found", entity, id),
        ErrorContext::new("lookup")
            .with_entity(entity)
            .with_entity_id(id),
    )
}

fn conflict(entity: &str, message: String) -> RepositoryError {
    RepositoryError::conflict_with_context(message, ErrorContext::new("write").with_entity(entity))
}

fn same_text(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

fn sorted_by_key<T, K: Ord>(mut rows: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    rows.sort_by_key(|r| key(r));
    rows
}

fn grouped<T: Pageable>(rows: Vec<T>, query: &PagedQuery) -> RepositoryResult<GroupedResult<T>> {
    paging::group(rows, query).map_err(RepositoryError::validation)
}

impl LocalData {
    fn department_name(&self, id: Option<DepartmentId>) -> Option<String> {
        id.and_then(|id| self.departments.rows.get(&id.value()))
            .map(|d| d.name.clone())
    }

    fn resolve_staff(&self, staff: &MedicalStaff) -> MedicalStaff {
        MedicalStaff {
            category_name: self.department_name(staff.category_id),
            specialty_name: self.department_name(staff.specialty_id),
            subspecialty_name: self.department_name(staff.subspecialty_id),
            ..staff.clone()
        }
    }

    fn resolve_device(&self, device: &MedicalDevice) -> MedicalDevice {
        MedicalDevice {
            department_name: self.department_name(device.department_id),
            ..device.clone()
        }
    }

    fn staff_rows(&self, include_inactive: bool) -> Vec<MedicalStaff> {
        self.staff
            .values()
            .filter(|s| include_inactive || s.is_active)
            .map(|s| self.resolve_staff(s))
            .collect()
    }

    fn device_rows(&self, include_inactive: bool) -> Vec<MedicalDevice> {
        self.devices
            .values()
            .filter(|d| include_inactive || d.is_active)
            .map(|d| self.resolve_device(d))
            .collect()
    }

    fn ensure_unique_cnp(&self, cnp: &str, except: Option<i64>) -> RepositoryResult<()> {
        if self
            .patients
            .values()
            .any(|p| p.cnp == cnp && Some(p.id.value()) != except)
        {
            return Err(conflict(
                "patient",
                format!("A patient with CNP {} already exists", cnp),
            ));
        }
        Ok(())
    }

    fn ensure_unique_license(
        &self,
        license: Option<&str>,
        except: Option<i64>,
    ) -> RepositoryResult<()> {
        let Some(license) = license else {
            return Ok(());
        };
        let taken = self.staff.values().any(|s| {
            Some(s.id.value()) != except
                && s.license_number
                    .as_deref()
                    .is_some_and(|l| same_text(l, license))
        });
        if taken {
            return Err(conflict(
                "medical_staff",
                format!("License number {} is already assigned", license),
            ));
        }
        Ok(())
    }

    fn ensure_unique_serial(&self, serial: &str, except: Option<i64>) -> RepositoryResult<()> {
        if self
            .devices
            .values()
            .any(|d| Some(d.id.value()) != except && same_text(&d.serial_number, serial))
        {
            return Err(conflict(
                "medical_device",
                format!("A device with serial number {} already exists", serial),
            ));
        }
        Ok(())
    }

    fn ensure_unique_fiscal_code(&self, code: &str, except: Option<i64>) -> RepositoryResult<()> {
        if self
            .partners
            .values()
            .any(|p| Some(p.id.value()) != except && p.fiscal_code == code)
        {
            return Err(conflict(
                "partner",
                format!("A partner with fiscal code {} already exists", code),
            ));
        }
        Ok(())
    }

    fn ensure_unique_department(
        &self,
        input: &DepartmentInput,
        except: Option<i64>,
    ) -> RepositoryResult<()> {
        let taken = self.departments.values().any(|d| {
            d.is_active
                && Some(d.id.value()) != except
                && d.parent_id == input.parent_id
                && same_text(&d.name, &input.name)
        });
        if taken {
            return Err(conflict(
                "department",
                format!("Department '{}' already exists at this level", input.name),
            ));
        }
        Ok(())
    }
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(LocalData::default())),
        }
    }

    /// Set the health status for testing connection failures.
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().is_healthy = healthy;
    }

    /// Clear all data from the repository, keeping the health flag.
    pub fn clear(&self) {
        let mut data = self.data.write();
        *data = LocalData {
            is_healthy: data.is_healthy,
            ..Default::default()
        };
    }

    fn check_health(&self) -> RepositoryResult<()> {
        if self.data.read().is_healthy {
            Ok(())
        } else {
            Err(RepositoryError::connection_with_context(
                "Local repository is marked unhealthy",
                ErrorContext::new("check_health").retryable(),
            ))
        }
    }

    fn read<R>(&self, f: impl FnOnce(&LocalData) -> RepositoryResult<R>) -> RepositoryResult<R> {
        self.check_health()?;
        f(&self.data.read())
    }

    fn write<R>(
        &self,
        f: impl FnOnce(&mut LocalData) -> RepositoryResult<R>,
    ) -> RepositoryResult<R> {
        self.check_health()?;
        f(&mut self.data.write())
    }
}

impl Default for LocalRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HealthRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(self.data.read().is_healthy)
    }
}

// ==================== Patients ====================

#[async_trait]
impl PatientRepository for LocalRepository {
    async fn create_patient(&self, input: &PatientInput) -> RepositoryResult<Patient> {
        self.write(|data| {
            data.ensure_unique_cnp(&input.cnp, None)?;
            let now = Utc::now();
            let id = data.patients.allocate_id();
            let patient = Patient {
                id: PatientId(id),
                cnp: input.cnp.clone(),
                first_name: input.first_name.clone(),
                last_name: input.last_name.clone(),
                date_of_birth: input.date_of_birth,
                gender: input.gender,
                phone: input.phone.clone(),
                email: input.email.clone(),
                address: input.address.clone(),
                city: input.city.clone(),
                county: input.county.clone(),
                insurance_number: input.insurance_number.clone(),
                is_active: input.is_active.unwrap_or(true),
                created_at: now,
                updated_at: now,
            };
            data.patients.rows.insert(id, patient.clone());
            Ok(patient)
        })
    }

    async fn get_patient(&self, id: PatientId) -> RepositoryResult<Patient> {
        self.read(|data| data.patients.find(id.value(), "patient").cloned())
    }

    async fn update_patient(
        &self,
        id: PatientId,
        input: &PatientInput,
    ) -> RepositoryResult<Patient> {
        self.write(|data| {
            data.patients.find(id.value(), "patient")?;
            data.ensure_unique_cnp(&input.cnp, Some(id.value()))?;
            let patient = data.patients.find_mut(id.value(), "patient")?;
            patient.cnp = input.cnp.clone();
            patient.first_name = input.first_name.clone();
            patient.last_name = input.last_name.clone();
            patient.date_of_birth = input.date_of_birth;
            patient.gender = input.gender;
            patient.phone = input.phone.clone();
            patient.email = input.email.clone();
            patient.address = input.address.clone();
            patient.city = input.city.clone();
            patient.county = input.county.clone();
            patient.insurance_number = input.insurance_number.clone();
            patient.is_active = input.is_active.unwrap_or(patient.is_active);
            patient.updated_at = Utc::now();
            Ok(patient.clone())
        })
    }

    async fn deactivate_patient(&self, id: PatientId) -> RepositoryResult<()> {
        self.write(|data| {
            let patient = data.patients.find_mut(id.value(), "patient")?;
            patient.is_active = false;
            patient.updated_at = Utc::now();
            Ok(())
        })
    }

    async fn list_patients(&self, include_inactive: bool) -> RepositoryResult<Vec<Patient>> {
        self.read(|data| {
            let rows = data
                .patients
                .values()
                .filter(|p| include_inactive || p.is_active)
                .cloned()
                .collect();
            Ok(sorted_by_key(rows, |p: &Patient| {
                (p.full_name().to_lowercase(), p.id)
            }))
        })
    }

    async fn get_patients_paged(
        &self,
        query: &PagedQuery,
    ) -> RepositoryResult<PagedResult<Patient>> {
        self.read(|data| Ok(paging::paginate(data.patients.values().cloned(), query)))
    }

    async fn get_patients_grouped(
        &self,
        query: &PagedQuery,
    ) -> RepositoryResult<GroupedResult<Patient>> {
        self.read(|data| grouped(data.patients.values().cloned().collect(), query))
    }

    async fn find_patient_by_cnp(&self, cnp: &str) -> RepositoryResult<Option<Patient>> {
        self.read(|data| Ok(data.patients.values().find(|p| p.cnp == cnp).cloned()))
    }
}

// ==================== Medical staff ====================

#[async_trait]
impl StaffRepository for LocalRepository {
    async fn create_staff(&self, input: &StaffInput) -> RepositoryResult<MedicalStaff> {
        self.write(|data| {
            data.ensure_unique_license(input.license_number.as_deref(), None)?;
            let now = Utc::now();
            let id = data.staff.allocate_id();
            let staff = MedicalStaff {
                id: StaffId(id),
                first_name: input.first_name.clone(),
                last_name: input.last_name.clone(),
                position: input.position,
                license_number: input.license_number.clone(),
                phone: input.phone.clone(),
                email: input.email.clone(),
                category_id: input.category_id,
                specialty_id: input.specialty_id,
                subspecialty_id: input.subspecialty_id,
                category_name: None,
                specialty_name: None,
                subspecialty_name: None,
                hire_date: input.hire_date,
                is_active: input.is_active.unwrap_or(true),
                created_at: now,
                updated_at: now,
            };
            data.staff.rows.insert(id, staff.clone());
            Ok(data.resolve_staff(&staff))
        })
    }

    async fn get_staff(&self, id: StaffId) -> RepositoryResult<MedicalStaff> {
        self.read(|data| {
            let staff = data.staff.find(id.value(), "medical_staff")?;
            Ok(data.resolve_staff(staff))
        })
    }

    async fn update_staff(
        &self,
        id: StaffId,
        input: &StaffInput,
    ) -> RepositoryResult<MedicalStaff> {
        self.write(|data| {
            data.staff.find(id.value(), "medical_staff")?;
            data.ensure_unique_license(input.license_number.as_deref(), Some(id.value()))?;
            let staff = data.staff.find_mut(id.value(), "medical_staff")?;
            staff.first_name = input.first_name.clone();
            staff.last_name = input.last_name.clone();
            staff.position = input.position;
            staff.license_number = input.license_number.clone();
            staff.phone = input.phone.clone();
            staff.email = input.email.clone();
            staff.category_id = input.category_id;
            staff.specialty_id = input.specialty_id;
            staff.subspecialty_id = input.subspecialty_id;
            staff.hire_date = input.hire_date;
            staff.is_active = input.is_active.unwrap_or(staff.is_active);
            staff.updated_at = Utc::now();
            let updated = staff.clone();
            Ok(data.resolve_staff(&updated))
        })
    }

    async fn deactivate_staff(&self, id: StaffId) -> RepositoryResult<()> {
        self.write(|data| {
            let staff = data.staff.find_mut(id.value(), "medical_staff")?;
            staff.is_active = false;
            staff.updated_at = Utc::now();
            Ok(())
        })
    }

    async fn list_staff(&self, include_inactive: bool) -> RepositoryResult<Vec<MedicalStaff>> {
        self.read(|data| {
            Ok(sorted_by_key(
                data.staff_rows(include_inactive),
                |s: &MedicalStaff| (s.full_name().to_lowercase(), s.id),
            ))
        })
    }

    async fn get_staff_paged(
        &self,
        query: &PagedQuery,
    ) -> RepositoryResult<PagedResult<MedicalStaff>> {
        self.read(|data| Ok(paging::paginate(data.staff_rows(true), query)))
    }

    async fn get_staff_grouped(
        &self,
        query: &PagedQuery,
    ) -> RepositoryResult<GroupedResult<MedicalStaff>> {
        self.read(|data| grouped(data.staff_rows(true), query))
    }

    async fn list_staff_by_department(
        &self,
        department: DepartmentId,
    ) -> RepositoryResult<Vec<MedicalStaff>> {
        self.read(|data| {
            let rows = data
                .staff_rows(false)
                .into_iter()
                .filter(|s| s.belongs_to(department))
                .collect();
            Ok(sorted_by_key(rows, |s: &MedicalStaff| {
                (s.full_name().to_lowercase(), s.id)
            }))
        })
    }
}

// ==================== Medical devices ====================

#[async_trait]
impl DeviceRepository for LocalRepository {
    async fn create_device(&self, input: &DeviceInput) -> RepositoryResult<MedicalDevice> {
        self.write(|data| {
            data.ensure_unique_serial(&input.serial_number, None)?;
            let now = Utc::now();
            let id = data.devices.allocate_id();
            let device = MedicalDevice {
                id: DeviceId(id),
                name: input.name.clone(),
                serial_number: input.serial_number.clone(),
                manufacturer: input.manufacturer.clone(),
                model: input.model.clone(),
                device_type: input.device_type.clone(),
                department_id: input.department_id,
                department_name: None,
                acquisition_date: input.acquisition_date,
                last_maintenance: input.last_maintenance,
                next_maintenance: input.next_maintenance,
                status: input.status,
                notes: input.notes.clone(),
                is_active: input.is_active.unwrap_or(true),
                created_at: now,
                updated_at: now,
            };
            data.devices.rows.insert(id, device.clone());
            Ok(data.resolve_device(&device))
        })
    }

    async fn get_device(&self, id: DeviceId) -> RepositoryResult<MedicalDevice> {
        self.read(|data| {
            let device = data.devices.find(id.value(), "medical_device")?;
            Ok(data.resolve_device(device))
        })
    }

    async fn update_device(
        &self,
        id: DeviceId,
        input: &DeviceInput,
    ) -> RepositoryResult<MedicalDevice> {
        self.write(|data| {
            data.devices.find(id.value(), "medical_device")?;
            data.ensure_unique_serial(&input.serial_number, Some(id.value()))?;
            let device = data.devices.find_mut(id.value(), "medical_device")?;
            device.name = input.name.clone();
            device.serial_number = input.serial_number.clone();
            device.manufacturer = input.manufacturer.clone();
            device.model = input.model.clone();
            device.device_type = input.device_type.clone();
            device.department_id = input.department_id;
            device.acquisition_date = input.acquisition_date;
            device.last_maintenance = input.last_maintenance;
            device.next_maintenance = input.next_maintenance;
            device.status = input.status;
            device.notes = input.notes.clone();
            device.is_active = input.is_active.unwrap_or(device.is_active);
            device.updated_at = Utc::now();
            let updated = device.clone();
            Ok(data.resolve_device(&updated))
        })
    }

    async fn deactivate_device(&self, id: DeviceId) -> RepositoryResult<()> {
        self.write(|data| {
            let device = data.devices.find_mut(id.value(), "medical_device")?;
            device.is_active = false;
            device.updated_at = Utc::now();
            Ok(())
        })
    }

    async fn list_devices(&self, include_inactive: bool) -> RepositoryResult<Vec<MedicalDevice>> {
        self.read(|data| {
            Ok(sorted_by_key(
                data.device_rows(include_inactive),
                |d: &MedicalDevice| (d.name.to_lowercase(), d.id),
            ))
        })
    }

    async fn get_devices_paged(
        &self,
        query: &PagedQuery,
    ) -> RepositoryResult<PagedResult<MedicalDevice>> {
        self.read(|data| Ok(paging::paginate(data.device_rows(true), query)))
    }

    async fn get_devices_grouped(
        &self,
        query: &PagedQuery,
    ) -> RepositoryResult<GroupedResult<MedicalDevice>> {
        self.read(|data| grouped(data.device_rows(true), query))
    }

    async fn devices_due_for_maintenance(
        &self,
        before: NaiveDate,
    ) -> RepositoryResult<Vec<MedicalDevice>> {
        self.read(|data| {
            let rows = data
                .device_rows(false)
                .into_iter()
                .filter(|d| d.maintenance_due_by(before))
                .collect();
            Ok(sorted_by_key(rows, |d: &MedicalDevice| {
                (d.next_maintenance, d.id)
            }))
        })
    }
}

// ==================== Medications ====================

#[async_trait]
impl MedicationRepository for LocalRepository {
    async fn create_medication(&self, input: &MedicationInput) -> RepositoryResult<Medication> {
        self.write(|data| {
            let now = Utc::now();
            let id = data.medications.allocate_id();
            let medication = Medication {
                id: MedicationId(id),
                name: input.name.clone(),
                active_substance: input.active_substance.clone(),
                form: input.form,
                strength: input.strength.clone(),
                manufacturer: input.manufacturer.clone(),
                atc_code: input.atc_code.clone(),
                stock_quantity: input.stock_quantity,
                min_stock: input.min_stock,
                unit_price: input.unit_price,
                expiry_date: input.expiry_date,
                requires_prescription: input.requires_prescription,
                is_active: input.is_active.unwrap_or(true),
                created_at: now,
                updated_at: now,
            };
            data.medications.rows.insert(id, medication.clone());
            Ok(medication)
        })
    }

    async fn get_medication(&self, id: MedicationId) -> RepositoryResult<Medication> {
        self.read(|data| data.medications.find(id.value(), "medication").cloned())
    }

    async fn update_medication(
        &self,
        id: MedicationId,
        input: &MedicationInput,
    ) -> RepositoryResult<Medication> {
        self.write(|data| {
            let medication = data.medications.find_mut(id.value(), "medication")?;
            medication.name = input.name.clone();
            medication.active_substance = input.active_substance.clone();
            medication.form = input.form;
            medication.strength = input.strength.clone();
            medication.manufacturer = input.manufacturer.clone();
            medication.atc_code = input.atc_code.clone();
            medication.stock_quantity = input.stock_quantity;
            medication.min_stock = input.min_stock;
            medication.unit_price = input.unit_price;
            medication.expiry_date = input.expiry_date;
            medication.requires_prescription = input.requires_prescription;
            medication.is_active = input.is_active.unwrap_or(medication.is_active);
            medication.updated_at = Utc::now();
            Ok(medication.clone())
        })
    }

    async fn deactivate_medication(&self, id: MedicationId) -> RepositoryResult<()> {
        self.write(|data| {
            let medication = data.medications.find_mut(id.value(), "medication")?;
            medication.is_active = false;
            medication.updated_at = Utc::now();
            Ok(())
        })
    }

    async fn list_medications(&self, include_inactive: bool) -> RepositoryResult<Vec<Medication>> {
        self.read(|data| {
            let rows = data
                .medications
                .values()
                .filter(|m| include_inactive || m.is_active)
                .cloned()
                .collect();
            Ok(sorted_by_key(rows, |m: &Medication| {
                (m.name.to_lowercase(), m.id)
            }))
        })
    }

    async fn get_medications_paged(
        &self,
        query: &PagedQuery,
    ) -> RepositoryResult<PagedResult<Medication>> {
        self.read(|data| Ok(paging::paginate(data.medications.values().cloned(), query)))
    }

    async fn get_medications_grouped(
        &self,
        query: &PagedQuery,
    ) -> RepositoryResult<GroupedResult<Medication>> {
        self.read(|data| grouped(data.medications.values().cloned().collect(), query))
    }

    async fn low_stock_medications(&self) -> RepositoryResult<Vec<Medication>> {
        self.read(|data| {
            let rows = data
                .medications
                .values()
                .filter(|m| m.is_active && m.is_low_stock())
                .cloned()
                .collect();
            Ok(sorted_by_key(rows, |m: &Medication| {
                (m.stock_quantity - m.min_stock, m.id)
            }))
        })
    }

    async fn adjust_medication_stock(
        &self,
        id: MedicationId,
        delta: i32,
    ) -> RepositoryResult<Medication> {
        self.write(|data| {
            let medication = data.medications.find_mut(id.value(), "medication")?;
            let next = medication
                .stock_quantity
                .checked_add(delta)
                .filter(|q| *q >= 0)
                .ok_or_else(|| {
                    RepositoryError::validation_with_context(
                        format!(
                            "Insufficient stock: {} available, adjustment {}",
                            medication.stock_quantity, delta
                        ),
                        ErrorContext::new("adjust_stock")
                            .with_entity("medication")
                            .with_entity_id(id),
                    )
                })?;
            medication.stock_quantity = next;
            medication.updated_at = Utc::now();
            Ok(medication.clone())
        })
    }
}

// ==================== Partners ====================

#[async_trait]
impl PartnerRepository for LocalRepository {
    async fn create_partner(&self, input: &PartnerInput) -> RepositoryResult<Partner> {
        self.write(|data| {
            data.ensure_unique_fiscal_code(&input.fiscal_code, None)?;
            let now = Utc::now();
            let id = data.partners.allocate_id();
            let partner = Partner {
                id: PartnerId(id),
                name: input.name.clone(),
                partner_type: input.partner_type,
                fiscal_code: input.fiscal_code.clone(),
                registry_number: input.registry_number.clone(),
                contact_person: input.contact_person.clone(),
                phone: input.phone.clone(),
                email: input.email.clone(),
                address: input.address.clone(),
                city: input.city.clone(),
                county: input.county.clone(),
                is_active: input.is_active.unwrap_or(true),
                created_at: now,
                updated_at: now,
            };
            data.partners.rows.insert(id, partner.clone());
            Ok(partner)
        })
    }

    async fn get_partner(&self, id: PartnerId) -> RepositoryResult<Partner> {
        self.read(|data| data.partners.find(id.value(), "partner").cloned())
    }

    async fn update_partner(
        &self,
        id: PartnerId,
        input: &PartnerInput,
    ) -> RepositoryResult<Partner> {
        self.write(|data| {
            data.partners.find(id.value(), "partner")?;
            data.ensure_unique_fiscal_code(&input.fiscal_code, Some(id.value()))?;
            let partner = data.partners.find_mut(id.value(), "partner")?;
            partner.name = input.name.clone();
            partner.partner_type = input.partner_type;
            partner.fiscal_code = input.fiscal_code.clone();
            partner.registry_number = input.registry_number.clone();
            partner.contact_person = input.contact_person.clone();
            partner.phone = input.phone.clone();
            partner.email = input.email.clone();
            partner.address = input.address.clone();
            partner.city = input.city.clone();
            partner.county = input.county.clone();
            partner.is_active = input.is_active.unwrap_or(partner.is_active);
            partner.updated_at = Utc::now();
            Ok(partner.clone())
        })
    }

    async fn deactivate_partner(&self, id: PartnerId) -> RepositoryResult<()> {
        self.write(|data| {
            let partner = data.partners.find_mut(id.value(), "partner")?;
            partner.is_active = false;
            partner.updated_at = Utc::now();
            Ok(())
        })
    }

    async fn list_partners(&self, include_inactive: bool) -> RepositoryResult<Vec<Partner>> {
        self.read(|data| {
            let rows = data
                .partners
                .values()
                .filter(|p| include_inactive || p.is_active)
                .cloned()
                .collect();
            Ok(sorted_by_key(rows, |p: &Partner| (p.name.to_lowercase(), p.id)))
        })
    }

    async fn get_partners_paged(
        &self,
        query: &PagedQuery,
    ) -> RepositoryResult<PagedResult<Partner>> {
        self.read(|data| Ok(paging::paginate(data.partners.values().cloned(), query)))
    }

    async fn get_partners_grouped(
        &self,
        query: &PagedQuery,
    ) -> RepositoryResult<GroupedResult<Partner>> {
        self.read(|data| grouped(data.partners.values().cloned().collect(), query))
    }

    async fn find_partner_by_fiscal_code(
        &self,
        fiscal_code: &str,
    ) -> RepositoryResult<Option<Partner>> {
        self.read(|data| {
            Ok(data
                .partners
                .values()
                .find(|p| p.fiscal_code == fiscal_code)
                .cloned())
        })
    }
}

// ==================== Departments ====================

#[async_trait]
impl DepartmentRepository for LocalRepository {
    async fn create_department(&self, input: &DepartmentInput) -> RepositoryResult<Department> {
        self.write(|data| {
            data.ensure_unique_department(input, None)?;
            let now = Utc::now();
            let id = data.departments.allocate_id();
            let department = Department {
                id: DepartmentId(id),
                name: input.name.clone(),
                kind: input.kind,
                parent_id: input.parent_id,
                description: input.description.clone(),
                is_active: input.is_active.unwrap_or(true),
                created_at: now,
                updated_at: now,
            };
            data.departments.rows.insert(id, department.clone());
            Ok(department)
        })
    }

    async fn get_department(&self, id: DepartmentId) -> RepositoryResult<Department> {
        self.read(|data| data.departments.find(id.value(), "department").cloned())
    }

    async fn update_department(
        &self,
        id: DepartmentId,
        input: &DepartmentInput,
    ) -> RepositoryResult<Department> {
        self.write(|data| {
            data.departments.find(id.value(), "department")?;
            data.ensure_unique_department(input, Some(id.value()))?;
            let department = data.departments.find_mut(id.value(), "department")?;
            department.name = input.name.clone();
            department.kind = input.kind;
            department.parent_id = input.parent_id;
            department.description = input.description.clone();
            department.is_active = input.is_active.unwrap_or(department.is_active);
            department.updated_at = Utc::now();
            Ok(department.clone())
        })
    }

    async fn deactivate_department(&self, id: DepartmentId) -> RepositoryResult<()> {
        self.write(|data| {
            data.departments.find(id.value(), "department")?;
            let active_children = data
                .departments
                .values()
                .filter(|d| d.is_active && d.parent_id == Some(id))
                .count();
            if active_children > 0 {
                return Err(conflict(
                    "department",
                    format!(
                        "Department {} still has {} active sub-departments",
                        id, active_children
                    ),
                ));
            }
            let department = data.departments.find_mut(id.value(), "department")?;
            department.is_active = false;
            department.updated_at = Utc::now();
            Ok(())
        })
    }

    async fn list_departments(&self, include_inactive: bool) -> RepositoryResult<Vec<Department>> {
        self.read(|data| {
            let rows = data
                .departments
                .values()
                .filter(|d| include_inactive || d.is_active)
                .cloned()
                .collect();
            Ok(sorted_by_key(rows, |d: &Department| {
                (d.name.to_lowercase(), d.id)
            }))
        })
    }

    async fn get_departments_paged(
        &self,
        query: &PagedQuery,
    ) -> RepositoryResult<PagedResult<Department>> {
        self.read(|data| Ok(paging::paginate(data.departments.values().cloned(), query)))
    }

    async fn get_departments_grouped(
        &self,
        query: &PagedQuery,
    ) -> RepositoryResult<GroupedResult<Department>> {
        self.read(|data| grouped(data.departments.values().cloned().collect(), query))
    }

    async fn department_children(
        &self,
        parent: DepartmentId,
    ) -> RepositoryResult<Vec<Department>> {
        self.read(|data| {
            let rows = data
                .departments
                .values()
                .filter(|d| d.is_active && d.parent_id == Some(parent))
                .cloned()
                .collect();
            Ok(sorted_by_key(rows, |d: &Department| {
                (d.name.to_lowercase(), d.id)
            }))
        })
    }

    async fn list_departments_by_kind(
        &self,
        kind: DepartmentKind,
    ) -> RepositoryResult<Vec<Department>> {
        self.read(|data| {
            let rows = data
                .departments
                .values()
                .filter(|d| d.is_active && d.kind == kind)
                .cloned()
                .collect();
            Ok(sorted_by_key(rows, |d: &Department| {
                (d.name.to_lowercase(), d.id)
            }))
        })
    }
}

// ==================== Users ====================

#[async_trait]
impl UserRepository for LocalRepository {
    async fn create_user(&self, draft: &UserDraft) -> RepositoryResult<UserAccount> {
        self.write(|data| {
            if data
                .users
                .values()
                .any(|u| same_text(&u.username, &draft.username))
            {
                return Err(conflict(
                    "user",
                    format!("Username '{}' is already taken", draft.username),
                ));
            }
            let now = Utc::now();
            let id = data.users.allocate_id();
            let user = UserAccount {
                id: UserId(id),
                username: draft.username.clone(),
                email: draft.email.clone(),
                display_name: draft.display_name.clone(),
                role: draft.role,
                password_hash: draft.password_hash.clone(),
                staff_id: draft.staff_id,
                is_active: draft.is_active,
                last_login: None,
                created_at: now,
                updated_at: now,
            };
            data.users.rows.insert(id, user.clone());
            Ok(user)
        })
    }

    async fn get_user(&self, id: UserId) -> RepositoryResult<UserAccount> {
        self.read(|data| data.users.find(id.value(), "user").cloned())
    }

    async fn update_user(&self, id: UserId, draft: &UserDraft) -> RepositoryResult<UserAccount> {
        self.write(|data| {
            let user = data.users.find_mut(id.value(), "user")?;
            user.email = draft.email.clone();
            user.display_name = draft.display_name.clone();
            user.role = draft.role;
            user.password_hash = draft.password_hash.clone();
            user.staff_id = draft.staff_id;
            user.is_active = draft.is_active;
            user.updated_at = Utc::now();
            Ok(user.clone())
        })
    }

    async fn deactivate_user(&self, id: UserId) -> RepositoryResult<()> {
        self.write(|data| {
            let user = data.users.find_mut(id.value(), "user")?;
            user.is_active = false;
            user.updated_at = Utc::now();
            Ok(())
        })
    }

    async fn list_users(&self, include_inactive: bool) -> RepositoryResult<Vec<UserAccount>> {
        self.read(|data| {
            let rows = data
                .users
                .values()
                .filter(|u| include_inactive || u.is_active)
                .cloned()
                .collect();
            Ok(sorted_by_key(rows, |u: &UserAccount| {
                (u.username.to_lowercase(), u.id)
            }))
        })
    }

    async fn get_users_paged(
        &self,
        query: &PagedQuery,
    ) -> RepositoryResult<PagedResult<UserAccount>> {
        self.read(|data| Ok(paging::paginate(data.users.values().cloned(), query)))
    }

    async fn get_users_grouped(
        &self,
        query: &PagedQuery,
    ) -> RepositoryResult<GroupedResult<UserAccount>> {
        self.read(|data| grouped(data.users.values().cloned().collect(), query))
    }

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> RepositoryResult<Option<UserAccount>> {
        self.read(|data| {
            Ok(data
                .users
                .values()
                .find(|u| same_text(&u.username, username))
                .cloned())
        })
    }

    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> RepositoryResult<()> {
        self.write(|data| {
            let user = data.users.find_mut(id.value(), "user")?;
            user.last_login = Some(at);
            Ok(())
        })
    }

    async fn count_users(&self) -> RepositoryResult<u64> {
        self.read(|data| Ok(data.users.rows.len() as u64))
    }
}
