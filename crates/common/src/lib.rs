// donelist-common: shared types and contracts for the donelist workspace

pub mod error;
pub mod protocol;
pub mod service;
pub mod types;
pub mod validation;
