//! log.* schemas

use fortios_core::schema::{BlockSchema, FieldSchema, FieldType, ResourceSchema};

fn enable_disable() -> FieldType {
    FieldType::enumeration(&["enable", "disable"])
}

/// log_fortianalyzer_setting (log.fortianalyzer/setting), a singleton
pub fn fortianalyzer_setting() -> ResourceSchema {
    ResourceSchema::new("log_fortianalyzer_setting", "log.fortianalyzer/setting")
        .singleton()
        .with_description("Global FortiAnalyzer logging settings")
        .attribute(FieldSchema::new("status", enable_disable()))
        .attribute(FieldSchema::new("server", FieldType::string()).with_max_length(127))
        .attribute(FieldSchema::new("certificate_verification", enable_disable()))
        .attribute(FieldSchema::new("serial", FieldType::blocks(BlockSchema::names(79))))
        .attribute(FieldSchema::new("access_config", enable_disable()))
        .attribute(FieldSchema::new("hmac_algorithm", FieldType::enumeration(&["sha256", "sha1"])))
        .attribute(FieldSchema::new(
            "enc_algorithm",
            FieldType::enumeration(&["high-medium", "high", "low"]),
        ))
        .attribute(FieldSchema::new(
            "ssl_min_proto_version",
            FieldType::enumeration(&["default", "SSLv3", "TLSv1", "TLSv1-1", "TLSv1-2"]),
        ))
        .attribute(FieldSchema::new("conn_timeout", FieldType::int()))
        .attribute(FieldSchema::new("monitor_keepalive_period", FieldType::int()))
        .attribute(FieldSchema::new("monitor_failure_retry_period", FieldType::int()))
        .attribute(FieldSchema::new("certificate", FieldType::string()).with_max_length(35))
        .attribute(FieldSchema::new("source_ip", FieldType::string()).with_max_length(63))
        .attribute(FieldSchema::new(
            "upload_option",
            FieldType::enumeration(&["store-and-upload", "realtime", "1-minute", "5-minute"]),
        ))
        .attribute(FieldSchema::new(
            "interface_select_method",
            FieldType::enumeration(&["auto", "sdwan", "specify"]),
        ))
        .attribute(FieldSchema::new("interface", FieldType::string()).with_max_length(15))
        .attribute(FieldSchema::new("reliable", enable_disable()))
}
