//! Shared Kernel - Domain-crossing minimal core
//!
//! This crate contains the vocabulary every backend crate agrees on:
//! - The unified [`error::app_error::AppError`] and its HTTP classification
//! - Typed UUID identifiers
//!
//! Only things whose meaning is identical in every domain belong here.

pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;
}
pub mod id;
