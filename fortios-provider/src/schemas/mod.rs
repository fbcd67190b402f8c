//! FortiOS resource schema catalog
//!
//! One schema per CMDB table. The engine is generic over these; adding a
//! resource type is a matter of describing its fields here.

pub mod firewall;
pub mod log;
pub mod switch_controller;
pub mod system;

use fortios_core::capability::{Capabilities, FirmwareVersion, VersionRange};
use fortios_core::schema::ResourceSchema;

/// Returns all FortiOS schemas
pub fn all_schemas() -> Vec<ResourceSchema> {
    vec![
        firewall::address(),
        firewall::addrgrp(),
        firewall::policy(),
        system::snmp_community(),
        system::global(),
        switch_controller::global(),
        log::fortianalyzer_setting(),
    ]
}

/// Look up a schema by resource type name
pub fn get(resource_type: &str) -> Option<ResourceSchema> {
    all_schemas()
        .into_iter()
        .find(|s| s.resource_type == resource_type)
}

/// Firmware ranges of catalog fields that are not present on every release
pub fn capabilities() -> Capabilities {
    let since =
        |major, minor, patch| VersionRange::since(FirmwareVersion::new(major, minor, patch));

    Capabilities::new()
        .field("firewall_address", "route_tag", since(7, 0, 0))
        .field("firewall_policy", "inspection_mode", since(6, 2, 0))
        .field("system_global", "gui_firmware_upgrade_warning", since(6, 4, 0))
        .field(
            "switch_controller_global",
            "bounce_quarantined_link",
            since(6, 2, 0),
        )
        .field(
            "log_fortianalyzer_setting",
            "certificate_verification",
            since(7, 0, 0),
        )
        .field(
            "system_global",
            "post_login_banner",
            VersionRange::between(FirmwareVersion::new(6, 0, 0), FirmwareVersion::new(7, 6, 0)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use fortios_core::schema::{BlockSchema, FieldType};
    use std::collections::HashSet;

    fn check_block(block: &BlockSchema, context: &str) {
        if let Some(key) = &block.key {
            assert!(block.get(key).is_some(), "{}: key '{}' missing", context, key);
        }
        if let Some(field) = block.sort_field() {
            assert!(block.get(field).is_some(), "{}: sort field '{}' missing", context, field);
        }
        for field in &block.fields {
            if let FieldType::Blocks(inner) = &field.field_type {
                check_block(inner, &format!("{}.{}", context, field.name));
            }
        }
    }

    #[test]
    fn catalog_is_consistent() {
        let schemas = all_schemas();
        let names: HashSet<&str> = schemas.iter().map(|s| s.resource_type.as_str()).collect();
        assert_eq!(names.len(), schemas.len());

        for schema in &schemas {
            if schema.singleton {
                assert!(
                    schema.mkey.is_none(),
                    "{} is a singleton with an mkey",
                    schema.resource_type
                );
            } else {
                assert!(
                    schema.mkey_field().is_some(),
                    "{} has no identity field",
                    schema.resource_type
                );
            }
            for field in &schema.fields {
                if let FieldType::Blocks(block) = &field.field_type {
                    check_block(block, &format!("{}.{}", schema.resource_type, field.name));
                }
            }
        }
    }

    #[test]
    fn capability_entries_name_catalog_fields() {
        for (resource_type, field, _) in capabilities().entries() {
            let schema = get(resource_type)
                .unwrap_or_else(|| panic!("unknown resource type {}", resource_type));
            assert!(
                schema.get(field).is_some(),
                "{} has no field {}",
                resource_type,
                field
            );
        }
    }

    #[test]
    fn lookup_by_type() {
        assert_eq!(get("firewall_policy").unwrap().path, "firewall/policy");
        assert_eq!(
            get("system_snmp_community").unwrap().mkey_field().unwrap().wire_name,
            "id"
        );
        assert!(get("firewall_vip").is_none());
    }
}
