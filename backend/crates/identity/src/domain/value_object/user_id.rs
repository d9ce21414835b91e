//! Account identifier, shared with every crate that refers to a user.

pub use kernel::id::UserId;
