//! system.* schemas

use fortios_core::schema::{BlockSchema, FieldSchema, FieldType, ResourceSchema};

fn enable_disable() -> FieldType {
    FieldType::enumeration(&["enable", "disable"])
}

/// system_snmp_community (system.snmp/community)
pub fn snmp_community() -> ResourceSchema {
    let hosts = BlockSchema::new()
        .field(FieldSchema::new("id", FieldType::int()).required())
        .field(FieldSchema::new("source_ip", FieldType::string()))
        .field(FieldSchema::new("ip", FieldType::subnet()))
        .field(FieldSchema::new("ha_direct", enable_disable()))
        .field(FieldSchema::new(
            "host_type",
            FieldType::enumeration(&["any", "query", "trap"]),
        ))
        .keyed_by("id");

    ResourceSchema::new("system_snmp_community", "system.snmp/community")
        .with_mkey("id")
        .with_description("SNMP community")
        .attribute(FieldSchema::new("id", FieldType::int()).required())
        .attribute(
            FieldSchema::new("name", FieldType::string())
                .required()
                .with_max_length(35),
        )
        .attribute(FieldSchema::new("status", enable_disable()))
        .attribute(FieldSchema::new("hosts", FieldType::blocks(hosts)))
        .attribute(FieldSchema::new("query_v1_status", enable_disable()))
        .attribute(FieldSchema::new("query_v1_port", FieldType::int()))
        .attribute(FieldSchema::new("query_v2c_status", enable_disable()))
        .attribute(FieldSchema::new("query_v2c_port", FieldType::int()))
        .attribute(FieldSchema::new("trap_v1_status", enable_disable()))
        .attribute(FieldSchema::new("trap_v2c_status", enable_disable()))
        .attribute(FieldSchema::new("events", FieldType::string()))
}

/// system_global (system/global), a singleton
pub fn global() -> ResourceSchema {
    ResourceSchema::new("system_global", "system/global")
        .singleton()
        .with_description("Global system settings")
        .attribute(FieldSchema::new("hostname", FieldType::string()).with_max_length(35))
        .attribute(FieldSchema::new("alias", FieldType::string()).with_max_length(35))
        .attribute(FieldSchema::new("timezone", FieldType::string()).with_max_length(63))
        .attribute(FieldSchema::new("admintimeout", FieldType::int()))
        .attribute(FieldSchema::new("admin_port", FieldType::int()))
        .attribute(FieldSchema::new("admin_sport", FieldType::int()))
        .attribute(FieldSchema::new("admin_ssh_port", FieldType::int()))
        .attribute(FieldSchema::new("admin_https_redirect", enable_disable()))
        .attribute(FieldSchema::new(
            "language",
            FieldType::enumeration(&[
                "english",
                "french",
                "spanish",
                "portuguese",
                "japanese",
                "trach",
                "simch",
                "korean",
            ]),
        ))
        .attribute(FieldSchema::new(
            "gui_theme",
            FieldType::enumeration(&[
                "jade",
                "neutrino",
                "mariner",
                "graphite",
                "melongene",
                "jet-stream",
                "security-fabric",
                "retro",
                "dark-matter",
                "onyx",
                "eclipse",
            ]),
        ))
        .attribute(FieldSchema::new("gui_firmware_upgrade_warning", enable_disable()))
        .attribute(FieldSchema::new("post_login_banner", enable_disable()))
        .attribute(FieldSchema::new("switch_controller", enable_disable()))
        .attribute(FieldSchema::new("serial_number", FieldType::string()).computed())
}
