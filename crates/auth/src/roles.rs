use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role identifier used for RBAC.
///
/// Roles are opaque strings; the well-known purchasing roles are provided as
/// constants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    /// Satisfies every role check.
    pub const ADMIN: Role = Role(Cow::Borrowed("admin"));
    /// Buyers: create orders, edit lines, send RFQs.
    pub const PROCUREMENT: Role = Role(Cow::Borrowed("purchasing.procurement"));
    /// Chief operating officer: first-step confirmation and final approval below the threshold.
    pub const COO: Role = Role(Cow::Borrowed("purchasing.coo"));
    /// Managing director: final approval above the threshold.
    pub const MD: Role = Role(Cow::Borrowed("purchasing.md"));
    /// Vendor contact using the read-only portal.
    pub const VENDOR: Role = Role(Cow::Borrowed("portal.vendor"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
