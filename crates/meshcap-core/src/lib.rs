//! Core types for meshcap.
//!
//! This crate defines the foundational types shared between the device
//! enumeration layer and the capability rule engine: the platform error
//! type and the per-device fact snapshot that rule evaluation runs against.

pub mod device;
pub mod error;

pub use device::{DeviceSnapshot, EndpointFacts, NodeFacts, ProductFacts};
pub use error::{Error, Result};
