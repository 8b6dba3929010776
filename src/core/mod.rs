//! Core types shared across wfdeploy: the error taxonomy and user-facing
//! error formatting.

pub mod error;

pub use error::{ErrorContext, WfdError, user_friendly_error};
