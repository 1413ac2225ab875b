//! Client-side data grid support: persisted layout settings, debounced
//! search, paging state and a controller that binds fetched pages.
//!
//! The controller is independent of transport; [`source::InMemorySource`]
//! pages local rows, and `crate::client::Resource` (feature `client`) pages
//! through the REST API.

pub mod controller;
pub mod debounce;
pub mod settings;
pub mod source;
pub mod state;

pub use controller::{GridController, GridData, GridView};
pub use debounce::{Debouncer, DEFAULT_DEBOUNCE};
pub use settings::{
    settings_key, FileSettingsStorage, GridSettings, GridSettingsService, MemorySettingsStorage,
    SettingsStorage, StorageError,
};
pub use source::{GridDataSource, InMemorySource};
pub use state::GridState;
