//! @ai:module:intent Attack catalog, parameter binding and dispatch registry
//! @ai:module:layer domain
//! @ai:module:public_api AttackRegistry, AttackKind, AttackDescriptor, AttackCombination, AttackParam, ParamValue, AttackError, TransformError

pub mod compression;
pub mod error;
pub mod filtering;
pub mod geometric;
pub mod noise;
pub mod params;
pub mod registry;

pub use error::{AttackError, TransformError};
pub use params::{Args, AttackParam, ParamSpec, ParamValue};
pub use registry::{AttackCombination, AttackDescriptor, AttackKind, AttackRegistry};
