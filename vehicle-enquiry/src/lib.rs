//! Client for the DVLA vehicle enquiry registry.
//!
//! [`client::RegistryClient`] looks a vehicle up by registration number and
//! returns a [`shared::data::VehicleRecord`] with its dates reformatted, or a
//! [`error::RegistryError`] saying why it could not. [`output`] renders records
//! for people and for files.

pub mod batch;
pub mod classify;
pub mod cli;
pub mod client;
pub mod error;
pub mod logging;
pub mod normalize;
pub mod output;
pub mod registration;

pub use client::{ApiKey, ClientConfig, RegistryClient};
pub use error::{ErrorKind, RegistryError};
pub use shared::data::{FieldValue, VehicleRecord};
