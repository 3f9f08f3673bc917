//! Validated machine identifiers.
//!
//! A machine id is the opaque key a kiosk presents to select its mailbox
//! folder. The id is validated once at the boundary; everything downstream
//! can rely on a `MachineId` being well-formed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::VendoError;

/// Opaque kiosk identifier: ASCII alphanumeric plus `_` and `-`, non-empty.
///
/// Doubles as the mailbox partition key: the remote folder for a machine is
/// named `machine_<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MachineId(String);

impl MachineId {
    /// Maximum accepted id length.
    pub const MAX_LEN: usize = 64;

    /// Validate and wrap a raw identifier.
    pub fn new(raw: impl Into<String>) -> Result<Self, VendoError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(VendoError::validation("machine id must not be empty"));
        }
        if raw.len() > Self::MAX_LEN {
            return Err(VendoError::validation("machine id too long"));
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(VendoError::validation(
                "machine id may only contain letters, digits, '_' and '-'",
            ));
        }
        Ok(Self(raw))
    }

    /// The raw identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The remote folder name for this machine.
    pub fn folder_name(&self) -> String {
        format!("machine_{}", self.0)
    }
}

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MachineId {
    type Err = VendoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for MachineId {
    type Error = VendoError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MachineId> for String {
    fn from(id: MachineId) -> Self {
        id.0
    }
}
