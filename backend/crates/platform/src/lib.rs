//! Platform Crate - Technical Infrastructure
//!
//! Shared technical foundations with no domain knowledge:
//! - Random secrets and digests (OS CSPRNG, SHA-256, hex)
//! - Password hashing (Argon2id, NIST SP 800-63B policy)
//! - Cookie building and parsing

pub mod cookie;
pub mod crypto;
pub mod password;
