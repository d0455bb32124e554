//! Password-status visibility policy.

use serde::{Deserialize, Serialize};

use super::predicate::{CmpOp, Column, Predicate};
use crate::store::StoreError;

/// Password classification assigned to a release during post-processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PasswordStatus {
    /// Checked, no password found.
    None,
    /// Possibly passworded (e.g. encrypted archive headers not verified).
    Potential,
    /// Archive could not be inspected.
    BadFile,
    /// Password protected.
    Passworded,
}

impl PasswordStatus {
    pub fn code(&self) -> i64 {
        match self {
            PasswordStatus::None => 0,
            PasswordStatus::Potential => 1,
            PasswordStatus::BadFile => 2,
            PasswordStatus::Passworded => 10,
        }
    }
}

/// Site-wide rule deciding which password statuses are listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VisibilityPolicy {
    /// Only releases checked clean (setting `0`).
    CleanOnly,
    /// Clean and potentially passworded (setting `1`).
    AllowPotential,
    /// Hide anything flagged (setting `2`). Admits the same statuses as
    /// [`CleanOnly`](Self::CleanOnly).
    HideFlagged,
    /// Everything, including passworded releases (setting `10` or unknown).
    ShowAll,
}

impl VisibilityPolicy {
    /// Value used when the setting is missing.
    pub const DEFAULT_SETTING: i64 = 10;

    pub fn from_setting(value: Option<i64>) -> Self {
        match value.unwrap_or(Self::DEFAULT_SETTING) {
            0 => VisibilityPolicy::CleanOnly,
            1 => VisibilityPolicy::AllowPotential,
            2 => VisibilityPolicy::HideFlagged,
            _ => VisibilityPolicy::ShowAll,
        }
    }

    /// Predicate over `passwordstatus` that this policy admits.
    pub fn predicate(&self) -> Predicate {
        match self {
            VisibilityPolicy::CleanOnly => {
                Predicate::eq(Column::PasswordStatus, PasswordStatus::None.code())
            }
            VisibilityPolicy::AllowPotential => Predicate::compare(
                Column::PasswordStatus,
                CmpOp::Le,
                PasswordStatus::Potential.code(),
            ),
            VisibilityPolicy::HideFlagged => Predicate::compare(
                Column::PasswordStatus,
                CmpOp::Le,
                PasswordStatus::None.code(),
            ),
            VisibilityPolicy::ShowAll => Predicate::compare(
                Column::PasswordStatus,
                CmpOp::Le,
                PasswordStatus::Passworded.code(),
            ),
        }
    }
}

/// Source of the site-wide password visibility setting.
///
/// Read on every query build so admin changes apply without a restart.
pub trait SettingsSource: Send + Sync {
    /// Current `showpasswordedrelease` value, or `None` when unset or not a
    /// number. A failed read is an error, never `None`.
    fn password_setting(&self) -> Result<Option<i64>, StoreError>;
}
