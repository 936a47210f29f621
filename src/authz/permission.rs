//! Closed set of permission identifiers.
//!
//! Permissions travel on the wire as `Resource_Action` strings (the shape
//! stored on role claims and in session snapshots). Keeping the set as an
//! enum means a typo'd identifier fails at the edge instead of silently
//! never matching a policy.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Claim type under which permission values are attached to roles and
/// identities.
pub const PERMISSION_CLAIM_TYPE: &str = "Permission";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Permission {
    ProductRead,
    ProductAdd,
    ProductUpdate,
    ProductDelete,
    WarehouseRead,
    WarehouseAdd,
    WarehouseUpdate,
    WarehouseDelete,
    StockRead,
    StockAdd,
    StockUpdate,
    StockDelete,
    UserManagementRead,
    UserManagementAdd,
    UserManagementUpdate,
    UserManagementDelete,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown permission identifier: {0}")]
pub struct UnknownPermission(pub String);

impl Permission {
    /// Every permission the platform knows about, in catalogue order.
    pub const ALL: [Self; 16] = [
        Self::ProductRead,
        Self::ProductAdd,
        Self::ProductUpdate,
        Self::ProductDelete,
        Self::WarehouseRead,
        Self::WarehouseAdd,
        Self::WarehouseUpdate,
        Self::WarehouseDelete,
        Self::StockRead,
        Self::StockAdd,
        Self::StockUpdate,
        Self::StockDelete,
        Self::UserManagementRead,
        Self::UserManagementAdd,
        Self::UserManagementUpdate,
        Self::UserManagementDelete,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ProductRead => "Product_Read",
            Self::ProductAdd => "Product_Add",
            Self::ProductUpdate => "Product_Update",
            Self::ProductDelete => "Product_Delete",
            Self::WarehouseRead => "Warehouse_Read",
            Self::WarehouseAdd => "Warehouse_Add",
            Self::WarehouseUpdate => "Warehouse_Update",
            Self::WarehouseDelete => "Warehouse_Delete",
            Self::StockRead => "Stock_Read",
            Self::StockAdd => "Stock_Add",
            Self::StockUpdate => "Stock_Update",
            Self::StockDelete => "Stock_Delete",
            Self::UserManagementRead => "UserManagement_Read",
            Self::UserManagementAdd => "UserManagement_Add",
            Self::UserManagementUpdate => "UserManagement_Update",
            Self::UserManagementDelete => "UserManagement_Delete",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|permission| permission.as_str() == s)
            .ok_or_else(|| UnknownPermission(s.to_string()))
    }
}

impl TryFrom<String> for Permission {
    type Error = UnknownPermission;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Permission> for String {
    fn from(permission: Permission) -> Self {
        permission.as_str().to_string()
    }
}
