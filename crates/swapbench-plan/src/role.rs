//! Role dispatch from test group labels.

use std::fmt;

use serde::Serialize;

use crate::constants::MAX_INSTANCE_COUNT;
use crate::error::InvalidParameterSnafu;
use crate::error::Result;
use crate::error::UnknownRoleSnafu;

/// The part an instance plays in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Generates, stores and announces blocks.
    Provider,
    /// Fetches every announced block and measures latency.
    Requestor,
}

impl Role {
    /// Map a test group label to a role.
    ///
    /// Both singular and plural labels are accepted, as is the `requester`
    /// spelling. Anything else is a configuration error.
    pub fn from_group(label: &str) -> Result<Self> {
        match label {
            "providers" | "provider" => Ok(Self::Provider),
            "requestors" | "requestor" | "requesters" | "requester" => Ok(Self::Requestor),
            _ => UnknownRoleSnafu { label }.fail(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Provider => "provider",
            Self::Requestor => "requestor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one instance within its fleet. Immutable for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InstanceInfo {
    pub role: Role,
    /// Total number of instances, the target of every barrier.
    pub instance_count: u64,
    /// Position within the fleet; diagnostic only.
    pub ordinal: u64,
}

impl InstanceInfo {
    /// Build and validate instance identity from a group label.
    pub fn new(group: &str, instance_count: u64, ordinal: u64) -> Result<Self> {
        let role = Role::from_group(group)?;
        Self::with_role(role, instance_count, ordinal)
    }

    /// Build and validate instance identity for a known role.
    pub fn with_role(role: Role, instance_count: u64, ordinal: u64) -> Result<Self> {
        if instance_count == 0 || instance_count > MAX_INSTANCE_COUNT {
            return InvalidParameterSnafu {
                name: "instance_count",
                reason: format!("{instance_count} is outside 1..={MAX_INSTANCE_COUNT}"),
            }
            .fail();
        }
        Ok(Self {
            role,
            instance_count,
            ordinal,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlanError;

    #[test]
    fn test_group_labels() {
        assert_eq!(Role::from_group("providers").unwrap(), Role::Provider);
        assert_eq!(Role::from_group("provider").unwrap(), Role::Provider);
        for label in ["requestors", "requestor", "requesters", "requester"] {
            assert_eq!(Role::from_group(label).unwrap(), Role::Requestor);
        }
    }

    #[test]
    fn test_unknown_group_is_fatal() {
        let err = Role::from_group("observers").unwrap_err();
        assert!(matches!(err, PlanError::UnknownRole { ref label } if label == "observers"));
        assert!(Role::from_group("").is_err());
        assert!(Role::from_group("Providers").is_err());
    }

    #[test]
    fn test_instance_count_bounds() {
        assert!(InstanceInfo::new("providers", 0, 0).is_err());
        assert!(InstanceInfo::new("providers", MAX_INSTANCE_COUNT + 1, 0).is_err());
        let info = InstanceInfo::new("requestors", 3, 2).unwrap();
        assert_eq!(info.role, Role::Requestor);
        assert_eq!(info.instance_count, 3);
    }
}
