//! Domain records of the clinic: who and what the administration tracks.
//!
//! Every record carries an integer id newtype, an `is_active` soft-delete flag
//! and creation/update timestamps. Each module also provides the input shape
//! accepted by create/update operations and the [`crate::paging::Pageable`]
//! implementation used for listings.

pub mod department;
pub mod device;
pub mod macros;
pub mod medication;
pub mod partner;
pub mod patient;
pub mod staff;
pub mod user;

pub use department::*;
pub use device::*;
pub use medication::*;
pub use partner::*;
pub use patient::*;
pub use staff::*;
pub use user::*;

crate::define_id_type!(i64, PatientId);
crate::define_id_type!(i64, StaffId);
crate::define_id_type!(i64, DeviceId);
crate::define_id_type!(i64, MedicationId);
crate::define_id_type!(i64, PartnerId);
crate::define_id_type!(i64, DepartmentId);
crate::define_id_type!(i64, UserId);

/// Trim an optional text field, mapping blank strings to `None`.
pub(crate) fn clean_opt(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
