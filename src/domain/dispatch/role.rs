//! Participant roles.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Category of a connected participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Driver,
    Customer,
}

impl Role {
    /// All roles, in registry order.
    pub const ALL: [Role; 2] = [Role::Driver, Role::Customer];

    /// Wire name used in handshake query strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Driver => "driver",
            Role::Customer => "customer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "driver" => Ok(Role::Driver),
            "customer" => Ok(Role::Customer),
            other => Err(ValidationError::invalid_format(
                "role",
                format!("expected driver or customer, got '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_names() {
        assert_eq!("driver".parse::<Role>().unwrap(), Role::Driver);
        assert_eq!("customer".parse::<Role>().unwrap(), Role::Customer);
    }

    #[test]
    fn rejects_unknown_and_differently_cased_roles() {
        assert!("admin".parse::<Role>().is_err());
        assert!("Driver".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for role in Role::ALL {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Driver).unwrap(), r#""driver""#);
    }
}
