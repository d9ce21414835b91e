//! User Name Value Object
//!
//! ユーザー名は公開ハンドル。プロフィール表示やメンション用で、ログインには使わない
//! (ログイン識別子は email)。
//!
//! ## 設計方針
//! - NFKC正規化 → trim → 小文字化 → 検証 の順で処理
//! - 許可文字: a-z, 0-9, `_` `.` `-`
//! - 長さ: 3〜30文字
//! - 先頭・末尾: 英数字または `_`、連続ドット禁止
//! - 予約語は使用不可

use serde::{Deserialize, Serialize};
use std::fmt;
use unicode_normalization::UnicodeNormalization;

use crate::error::{IdentityError, IdentityResult};

pub const USER_NAME_MIN_LENGTH: usize = 3;
pub const USER_NAME_MAX_LENGTH: usize = 30;

const ALLOWED_SPECIAL_CHARS: &[char] = &['_', '.', '-'];

/// Length of the random suffix appended to generated names, in hex chars.
const GENERATED_SUFFIX_BYTES: usize = 4;

const RESERVED_WORDS: &[&str] = &[
    "admin",
    "administrator",
    "root",
    "system",
    "support",
    "staff",
    "moderator",
    "api",
    "auth",
    "login",
    "logout",
    "register",
    "profile",
    "settings",
    "null",
    "undefined",
    "anonymous",
    "me",
];

/// Validated, canonical (lower-case) user name
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserName(String);

impl UserName {
    pub fn new(input: impl AsRef<str>) -> IdentityResult<Self> {
        let canonical = input
            .as_ref()
            .nfkc()
            .collect::<String>()
            .trim()
            .to_lowercase();
        Self::validate(&canonical).map_err(IdentityError::Validation)?;
        Ok(Self(canonical))
    }

    /// Derive a handle for an auto-provisioned account:
    /// `<sanitized email local part>_<8 random hex chars>`.
    pub fn generate_from_local_part(local_part: &str) -> IdentityResult<Self> {
        let suffix = platform::crypto::random_hex(GENERATED_SUFFIX_BYTES);
        let max_base = USER_NAME_MAX_LENGTH - suffix.len() - 1;

        let mut base = String::with_capacity(max_base);
        for ch in local_part.nfkc().flat_map(char::to_lowercase) {
            if base.len() == max_base {
                break;
            }
            let ch = if Self::is_valid_char(ch) { ch } else { '_' };
            if ch == '.' && (base.is_empty() || base.ends_with('.')) {
                continue;
            }
            if ch == '-' && base.is_empty() {
                continue;
            }
            base.push(ch);
        }
        if base.is_empty() {
            base.push_str("user");
        }

        Self::new(format!("{base}_{suffix}"))
    }

    /// Create from database value (assumed already validated)
    pub fn from_db(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(canonical: &str) -> Result<(), String> {
        let length = canonical.chars().count();
        if length == 0 {
            return Err("User name is required".into());
        }
        if length < USER_NAME_MIN_LENGTH {
            return Err(format!(
                "User name is too short ({length} chars, minimum {USER_NAME_MIN_LENGTH})"
            ));
        }
        if length > USER_NAME_MAX_LENGTH {
            return Err(format!(
                "User name is too long ({length} chars, maximum {USER_NAME_MAX_LENGTH})"
            ));
        }

        if let Some((position, ch)) = canonical
            .chars()
            .enumerate()
            .find(|(_, c)| !Self::is_valid_char(*c))
        {
            return Err(format!(
                "Invalid character '{ch}' at position {position}. Only a-z, 0-9, _, ., - are allowed"
            ));
        }

        let starts_ok = canonical.chars().next().is_some_and(Self::is_valid_edge_char);
        let ends_ok = canonical.chars().next_back().is_some_and(Self::is_valid_edge_char);
        if !starts_ok || !ends_ok {
            return Err("User name must start and end with a-z, 0-9 or _".into());
        }

        if canonical.contains("..") {
            return Err("User name cannot contain consecutive dots (..)".into());
        }
        if !canonical.chars().any(|c| c.is_ascii_alphanumeric()) {
            return Err("User name must contain at least one letter or digit".into());
        }
        if RESERVED_WORDS.contains(&canonical) {
            return Err(format!("'{canonical}' is a reserved user name"));
        }

        Ok(())
    }

    #[inline]
    fn is_valid_char(c: char) -> bool {
        c.is_ascii_lowercase() || c.is_ascii_digit() || ALLOWED_SPECIAL_CHARS.contains(&c)
    }

    #[inline]
    fn is_valid_edge_char(c: char) -> bool {
        c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'
    }
}

impl TryFrom<String> for UserName {
    type Error = IdentityError;

    fn try_from(value: String) -> IdentityResult<Self> {
        Self::new(value)
    }
}

impl From<UserName> for String {
    fn from(value: UserName) -> Self {
        value.0
    }
}

impl fmt::Debug for UserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("UserName").field(&self.0).finish()
    }
}

impl fmt::Display for UserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
