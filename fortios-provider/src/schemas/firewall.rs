//! firewall.* schemas

use fortios_core::Value;
use fortios_core::schema::{BlockSchema, FieldSchema, FieldType, ResourceSchema};

fn enable_disable() -> FieldType {
    FieldType::enumeration(&["enable", "disable"])
}

/// Tag assignments shared by address objects and groups
fn tagging() -> FieldType {
    FieldType::blocks(
        BlockSchema::new()
            .field(
                FieldSchema::new("name", FieldType::string())
                    .required()
                    .with_max_length(63),
            )
            .field(FieldSchema::new("category", FieldType::string()).with_max_length(63))
            .field(FieldSchema::new("tags", FieldType::blocks(BlockSchema::names(79))))
            .keyed_by("name"),
    )
}

/// firewall_address (firewall/address)
pub fn address() -> ResourceSchema {
    ResourceSchema::new("firewall_address", "firewall/address")
        .with_mkey("name")
        .with_description("IPv4 address object")
        .attribute(
            FieldSchema::new("name", FieldType::string())
                .required()
                .with_max_length(79),
        )
        .attribute(FieldSchema::new("uuid", FieldType::string()).computed())
        .attribute(
            FieldSchema::new(
                "type",
                FieldType::enumeration(&[
                    "ipmask",
                    "iprange",
                    "fqdn",
                    "geography",
                    "wildcard",
                    "dynamic",
                    "interface-subnet",
                    "mac",
                ]),
            )
            .with_default(Value::string("ipmask")),
        )
        .attribute(FieldSchema::new("subnet", FieldType::subnet()))
        .attribute(FieldSchema::new("start_ip", FieldType::string()))
        .attribute(FieldSchema::new("end_ip", FieldType::string()))
        .attribute(FieldSchema::new("fqdn", FieldType::string()).with_max_length(255))
        .attribute(FieldSchema::new("country", FieldType::string()).with_max_length(2))
        .attribute(
            FieldSchema::new("associated_interface", FieldType::string()).with_max_length(35),
        )
        .attribute(FieldSchema::new("allow_routing", enable_disable()))
        .attribute(FieldSchema::new("route_tag", FieldType::int()))
        .attribute(FieldSchema::new("comment", FieldType::string()).with_max_length(255))
        .attribute(FieldSchema::new("color", FieldType::int()).optional_computed())
        .attribute(FieldSchema::new("tagging", tagging()))
}

/// firewall_addrgrp (firewall/addrgrp)
pub fn addrgrp() -> ResourceSchema {
    ResourceSchema::new("firewall_addrgrp", "firewall/addrgrp")
        .with_mkey("name")
        .with_description("IPv4 address group")
        .attribute(
            FieldSchema::new("name", FieldType::string())
                .required()
                .with_max_length(79),
        )
        .attribute(FieldSchema::new("uuid", FieldType::string()).computed())
        .attribute(
            FieldSchema::new("member", FieldType::blocks(BlockSchema::names(79))).required(),
        )
        .attribute(FieldSchema::new("exclude", enable_disable()))
        .attribute(FieldSchema::new(
            "exclude_member",
            FieldType::blocks(BlockSchema::names(79)),
        ))
        .attribute(FieldSchema::new("allow_routing", enable_disable()))
        .attribute(FieldSchema::new("comment", FieldType::string()).with_max_length(255))
        .attribute(FieldSchema::new("color", FieldType::int()).optional_computed())
        .attribute(FieldSchema::new("tagging", tagging()))
}

/// firewall_policy (firewall/policy)
pub fn policy() -> ResourceSchema {
    let interfaces = || FieldType::blocks(BlockSchema::names(35));
    let addresses = || FieldType::blocks(BlockSchema::names(79));

    ResourceSchema::new("firewall_policy", "firewall/policy")
        .with_mkey("policyid")
        .with_description("IPv4 firewall policy")
        .attribute(FieldSchema::new("policyid", FieldType::int()).optional_computed())
        .attribute(FieldSchema::new("name", FieldType::string()).with_max_length(35))
        .attribute(FieldSchema::new("uuid", FieldType::string()).computed())
        .attribute(FieldSchema::new("status", enable_disable()))
        .attribute(FieldSchema::new("srcintf", interfaces()).required())
        .attribute(FieldSchema::new("dstintf", interfaces()).required())
        .attribute(FieldSchema::new("srcaddr", addresses()))
        .attribute(FieldSchema::new("dstaddr", addresses()))
        .attribute(FieldSchema::new("service", addresses()))
        .attribute(
            FieldSchema::new("action", FieldType::enumeration(&["accept", "deny", "ipsec"]))
                .with_default(Value::string("deny")),
        )
        .attribute(FieldSchema::new("schedule", FieldType::string()).with_max_length(35))
        .attribute(FieldSchema::new("nat", enable_disable()))
        .attribute(FieldSchema::new(
            "logtraffic",
            FieldType::enumeration(&["all", "utm", "disable"]),
        ))
        .attribute(FieldSchema::new(
            "inspection_mode",
            FieldType::enumeration(&["proxy", "flow"]),
        ))
        .attribute(FieldSchema::new("utm_status", enable_disable()))
        .attribute(FieldSchema::new("av_profile", FieldType::string()).with_max_length(35))
        .attribute(FieldSchema::new("ssl_ssh_profile", FieldType::string()).with_max_length(35))
        .attribute(FieldSchema::new("internet_service", enable_disable()))
        .attribute(FieldSchema::new("comments", FieldType::string()).with_max_length(1023))
}
