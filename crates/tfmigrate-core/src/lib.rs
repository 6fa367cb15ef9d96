//! tfmigrate Core Types
//!
//! This crate provides the foundational types shared by the tfmigrate
//! workspace. It includes:
//!
//! - **Values**: statically known configuration values ([`value::Value`])
//! - **Backend settings**: the target remote backend
//!   ([`backend::RemoteBackendConfig`])

pub mod backend;
pub mod value;
