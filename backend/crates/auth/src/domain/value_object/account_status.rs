//! Account Status Value Object
//!
//! Accounts are never hard-deleted; status transitions are the only
//! lifecycle mechanism.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Account status
///
/// - **Active**: normal account, can sign in
/// - **Suspended**: disabled by an administrator, cannot sign in
/// - **Closed**: closed at the user's request, cannot sign in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(i16)]
pub enum AccountStatus {
    #[default]
    Active = 0,
    Suspended = 1,
    Closed = 2,
}

impl AccountStatus {
    /// Numeric ID for database storage
    #[inline]
    pub const fn id(&self) -> i16 {
        *self as i16
    }

    /// String code for serialization/API
    #[inline]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Closed => "closed",
        }
    }

    /// Check if sign-in is allowed
    #[inline]
    pub const fn can_login(&self) -> bool {
        matches!(self, Self::Active)
    }

    #[inline]
    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(Self::Active),
            1 => Some(Self::Suspended),
            2 => Some(Self::Closed),
            _ => None,
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_ids_roundtrip() {
        for status in [
            AccountStatus::Active,
            AccountStatus::Suspended,
            AccountStatus::Closed,
        ] {
            assert_eq!(AccountStatus::from_id(status.id()), Some(status));
        }
        assert_eq!(AccountStatus::from_id(7), None);
    }

    #[test]
    fn test_can_login() {
        assert!(AccountStatus::Active.can_login());
        assert!(!AccountStatus::Suspended.can_login());
        assert!(!AccountStatus::Closed.can_login());
    }
}
