//! User and vendor directory.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use stardust_core::UserId;
use stardust_purchasing::VendorId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub name: String,
    pub email: Option<String>,
    /// Set for portal users acting on behalf of a vendor.
    pub vendor_id: Option<VendorId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorProfile {
    pub vendor_id: VendorId,
    pub name: String,
    pub email: Option<String>,
    /// Signature image for printed orders, base64-encoded PNG or JPEG.
    #[serde(default)]
    pub signature: Option<String>,
}

/// The buying company, as printed on its purchase orders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub name: String,
    /// Signature images, base64-encoded PNG or JPEG.
    #[serde(default)]
    pub coo_signature: Option<String>,
    #[serde(default)]
    pub md_signature: Option<String>,
}

pub trait Directory: Send + Sync {
    fn user(&self, user_id: UserId) -> Option<UserProfile>;
    fn vendor(&self, vendor_id: VendorId) -> Option<VendorProfile>;

    fn company(&self) -> Option<CompanyProfile> {
        None
    }

    /// Display name for a user; falls back to the id.
    fn display_name(&self, user_id: UserId) -> String {
        self.user(user_id)
            .map(|u| u.name)
            .unwrap_or_else(|| user_id.to_string())
    }
}

impl<S> Directory for Arc<S>
where
    S: Directory + ?Sized,
{
    fn user(&self, user_id: UserId) -> Option<UserProfile> {
        (**self).user(user_id)
    }

    fn vendor(&self, vendor_id: VendorId) -> Option<VendorProfile> {
        (**self).vendor(vendor_id)
    }

    fn company(&self) -> Option<CompanyProfile> {
        (**self).company()
    }
}

#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    users: RwLock<HashMap<UserId, UserProfile>>,
    vendors: RwLock<HashMap<VendorId, VendorProfile>>,
    company: RwLock<Option<CompanyProfile>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_user(&self, profile: UserProfile) {
        if let Ok(mut users) = self.users.write() {
            users.insert(profile.user_id, profile);
        }
    }

    pub fn upsert_vendor(&self, profile: VendorProfile) {
        if let Ok(mut vendors) = self.vendors.write() {
            vendors.insert(profile.vendor_id, profile);
        }
    }

    pub fn set_company(&self, profile: CompanyProfile) {
        if let Ok(mut company) = self.company.write() {
            *company = Some(profile);
        }
    }
}

impl Directory for InMemoryDirectory {
    fn user(&self, user_id: UserId) -> Option<UserProfile> {
        self.users.read().ok()?.get(&user_id).cloned()
    }

    fn vendor(&self, vendor_id: VendorId) -> Option<VendorProfile> {
        self.vendors.read().ok()?.get(&vendor_id).cloned()
    }

    fn company(&self) -> Option<CompanyProfile> {
        self.company.read().ok()?.clone()
    }
}
