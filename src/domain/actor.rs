use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Vendor,
    Driver,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Vendor => "vendor",
            Role::Driver => "driver",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Role::Customer),
            "vendor" => Ok(Role::Vendor),
            "driver" => Ok(Role::Driver),
            "admin" => Ok(Role::Admin),
            other => Err(DomainError::invalid("role", format!("Unknown role '{other}'"))),
        }
    }
}

/// The authenticated caller of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
    pub name: String,
}

impl Actor {
    pub fn new(user_id: Uuid, role: Role, name: impl Into<String>) -> Self {
        Self {
            user_id,
            role,
            name: name.into(),
        }
    }

    pub fn is(&self, role: Role) -> bool {
        self.role == role
    }

    pub fn require(&self, role: Role, action: &str) -> Result<(), DomainError> {
        if self.role == role {
            Ok(())
        } else {
            Err(DomainError::forbidden(format!("Only a {role} can {action}")))
        }
    }

    /// Label written into audit trails. Falls back to the role name.
    pub fn label(&self) -> String {
        if self.name.trim().is_empty() {
            self.role.to_string()
        } else {
            self.name.clone()
        }
    }
}
