//! Hosted backend store adapters.

mod error;
mod postgrest;

pub use error::{PostgrestErrorBody, StoreErrorContext, map_http_error, map_transport_error};
pub use postgrest::{PostgrestEnvironmentStore, PostgrestStoreConfig};
