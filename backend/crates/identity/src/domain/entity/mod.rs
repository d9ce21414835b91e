//! Entities

pub mod ephemeral_token;
pub mod principal;
pub mod user;
