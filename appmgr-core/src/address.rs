//! Per-instance bus addressing.
//!
//! Every application instance listens on (and is targeted at) a pair of names
//! derived from the global application-manager names:
//!
//! ```text
//! interface:   org.clp.appmanager.<app>[<instance id>]
//! object path: /org/clp/appmanager/<app>[<instance id>]
//! ```
//!
//! The concatenation order is part of the wire contract with the daemon.

use serde::{Deserialize, Serialize};

use crate::error::AddressError;
use crate::types::{AppName, InstanceName, InstanceType};

/// Global application-manager interface (also the broadcast interface).
pub const APP_MANAGER_INTERFACE: &str = "org.clp.appmanager";
/// Global application-manager object path.
pub const APP_MANAGER_OBJECT: &str = "/org/clp/appmanager";

/// The `(interface, object path)` an instance listens on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddressPair {
    pub interface: String,
    pub object_path: String,
}

/// Base names the per-instance addresses are derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressBase {
    pub interface: String,
    pub object_path: String,
}

impl Default for AddressBase {
    fn default() -> Self {
        Self {
            interface: APP_MANAGER_INTERFACE.to_owned(),
            object_path: APP_MANAGER_OBJECT.to_owned(),
        }
    }
}

impl AddressBase {
    /// Derive the address pair for `app`. `instance_id` is ignored for
    /// single-instance applications.
    pub fn build(&self, app: &AppName, instance_type: InstanceType, instance_id: u32) -> AddressPair {
        let suffix = match instance_type {
            InstanceType::Single => String::new(),
            InstanceType::Multiple => instance_id.to_string(),
        };
        AddressPair {
            interface: format!("{}.{}{}", self.interface, app, suffix),
            object_path: format!("{}/{}{}", self.object_path, app, suffix),
        }
    }

    /// Address pair of an already-parsed instance name.
    pub fn for_instance(&self, name: &InstanceName) -> AddressPair {
        self.build(
            name.app(),
            name.instance_type(),
            name.instance_id().unwrap_or_default(),
        )
    }
}

/// Validate `app_name` and derive its address pair against `base`.
pub fn build_addresses(
    base: &AddressBase,
    app_name: &str,
    instance_type: InstanceType,
    instance_id: u32,
) -> Result<AddressPair, AddressError> {
    let app = AppName::new(app_name)?;
    Ok(base.build(&app, instance_type, instance_id))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::types::NAME_SIZE;
    use rstest::rstest;

    #[test]
    fn single_instance_uses_bare_name() {
        let pair = build_addresses(&AddressBase::default(), "clock", InstanceType::Single, 9)
            .expect("valid");
        assert_eq!(pair.interface, "org.clp.appmanager.clock");
        assert_eq!(pair.object_path, "/org/clp/appmanager/clock");
    }

    #[test]
    fn multi_instance_appends_decimal_id() {
        let pair = build_addresses(&AddressBase::default(), "clock", InstanceType::Multiple, 3)
            .expect("valid");
        assert_eq!(pair.interface, "org.clp.appmanager.clock3");
        assert_eq!(pair.object_path, "/org/clp/appmanager/clock3");
    }

    #[rstest]
    #[case("")]
    #[case("clock1")]
    #[case("a.b")]
    fn invalid_names_are_rejected(#[case] name: &str) {
        assert!(build_addresses(&AddressBase::default(), name, InstanceType::Single, 0).is_err());
    }

    #[test]
    fn oversized_name_is_rejected_not_truncated() {
        let name = "x".repeat(NAME_SIZE + 1);
        let err = build_addresses(&AddressBase::default(), &name, InstanceType::Single, 0)
            .unwrap_err();
        assert!(matches!(err, AddressError::NameTooLong { .. }));
    }

    #[test]
    fn custom_base_is_respected() {
        let base = AddressBase {
            interface: "org.example.apps".into(),
            object_path: "/org/example/apps".into(),
        };
        let pair = build_addresses(&base, "mail", InstanceType::Multiple, 12).expect("valid");
        assert_eq!(pair.interface, "org.example.apps.mail12");
        assert_eq!(pair.object_path, "/org/example/apps/mail12");
    }

    #[test]
    fn derivation_is_deterministic() {
        let base = AddressBase::default();
        let first = build_addresses(&base, "browser", InstanceType::Multiple, 5).expect("a");
        let second = build_addresses(&base, "browser", InstanceType::Multiple, 5).expect("b");
        assert_eq!(first, second);
    }

    #[test]
    fn distinct_instances_never_collide() {
        let base = AddressBase::default();
        let names = ["clock", "clock_", "c", "cl", "browser", "b_"];
        let mut seen_interfaces = HashSet::new();
        let mut seen_paths = HashSet::new();
        let mut total = 0;

        for name in names {
            let single = build_addresses(&base, name, InstanceType::Single, 0).expect("single");
            assert!(seen_interfaces.insert(single.interface));
            assert!(seen_paths.insert(single.object_path));
            total += 1;
            for id in [0u32, 1, 2, 10, 12, 21, 100] {
                let pair = build_addresses(&base, name, InstanceType::Multiple, id).expect("multi");
                assert!(seen_interfaces.insert(pair.interface), "{name}:{id}");
                assert!(seen_paths.insert(pair.object_path), "{name}:{id}");
                total += 1;
            }
        }
        assert_eq!(seen_interfaces.len(), total);
    }

    #[test]
    fn instance_name_addresses_match_builder() {
        let base = AddressBase::default();
        let name = InstanceName::parse("clock:3").expect("parse");
        assert_eq!(
            base.for_instance(&name),
            build_addresses(&base, "clock", InstanceType::Multiple, 3).expect("build")
        );
    }
}
