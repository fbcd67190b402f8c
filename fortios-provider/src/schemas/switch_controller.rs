//! switch-controller.* schemas

use fortios_core::schema::{BlockSchema, FieldSchema, FieldType, ResourceSchema};

fn enable_disable() -> FieldType {
    FieldType::enumeration(&["enable", "disable"])
}

/// switch_controller_global (switch-controller/global), a singleton
pub fn global() -> ResourceSchema {
    let custom_command = BlockSchema::new()
        .field(
            FieldSchema::new("command_entry", FieldType::string())
                .required()
                .with_max_length(35),
        )
        .field(
            FieldSchema::new("command_name", FieldType::string())
                .required()
                .with_max_length(35),
        )
        .keyed_by("command_entry");

    ResourceSchema::new("switch_controller_global", "switch-controller/global")
        .singleton()
        .with_description("Global FortiSwitch controller settings")
        .attribute(FieldSchema::new("mac_aging_interval", FieldType::int()))
        .attribute(FieldSchema::new("https_image_push", enable_disable()))
        .attribute(FieldSchema::new("vlan_all_mode", FieldType::enumeration(&["all", "defined"])))
        .attribute(FieldSchema::new("vlan_optimization", enable_disable()))
        .attribute(FieldSchema::new("mac_violation_timer", FieldType::int()))
        .attribute(FieldSchema::new("log_mac_limit_violations", enable_disable()))
        .attribute(FieldSchema::new("bounce_quarantined_link", enable_disable()))
        .attribute(FieldSchema::new(
            "disable_discovery",
            FieldType::blocks(BlockSchema::names(79)),
        ))
        .attribute(FieldSchema::new("custom_command", FieldType::blocks(custom_command)))
}
