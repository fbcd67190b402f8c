//! Scalar coercion between FortiOS wire values and typed configuration values
//!
//! FortiOS is loose about scalar types: numeric ids can arrive as floats or
//! strings, toggles as `"enable"`/`"disable"`, subnets as `"ip mask"`.
//! Flattening never panics; a value of the wrong shape is reported as a
//! [`TypeMismatch`] and the caller leaves the field unset.

use std::net::Ipv4Addr;

use serde_json::Value as Json;

use crate::resource::Value;
use crate::schema::ScalarType;

/// Largest magnitude at which every integer is exactly representable as f64
const MAX_EXACT_F64: f64 = 9_007_199_254_740_992.0;

/// Wire value whose runtime type does not match the field's type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected {expected}, got {got}")]
pub struct TypeMismatch {
    pub expected: String,
    pub got: String,
}

impl TypeMismatch {
    fn new(expected: &ScalarType, got: &Json) -> Self {
        Self {
            expected: expected.to_string(),
            got: json_type_name(got).to_string(),
        }
    }
}

/// Failure converting a configuration value to wire format
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    #[error("type mismatch: expected {expected}, got {got}")]
    Type { expected: String, got: String },

    #[error("value '{value}' is not one of: {}", expected.join(", "))]
    InvalidEnum {
        value: String,
        expected: Vec<String>,
    },

    #[error(transparent)]
    InvalidSubnet(#[from] SubnetError),

    #[error("length {length} exceeds maximum of {max}")]
    TooLong { length: usize, max: usize },

    #[error("not supported by the device firmware ({0})")]
    Unsupported(String),
}

/// Malformed subnet string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubnetError {
    #[error("invalid subnet '{0}': expected 'ip/prefix' or 'ip mask'")]
    Format(String),

    #[error("invalid IPv4 address '{0}'")]
    Address(String),

    #[error("invalid netmask '{0}'")]
    Mask(String),

    #[error("invalid prefix length '{0}': must be 0-32")]
    Prefix(String),
}

pub fn json_type_name(value: &Json) -> &'static str {
    match value {
        Json::Null => "Null",
        Json::Bool(_) => "Bool",
        Json::Number(_) => "Number",
        Json::String(_) => "String",
        Json::Array(_) => "Array",
        Json::Object(_) => "Object",
    }
}

/// Convert a wire scalar to a configuration value
pub fn to_config(wire: &Json, scalar: &ScalarType) -> Result<Value, TypeMismatch> {
    if wire.is_null() {
        return Ok(scalar.zero());
    }

    match scalar {
        ScalarType::String | ScalarType::Enum(_) => match wire {
            Json::String(s) => Ok(Value::String(s.clone())),
            Json::Number(n) => Ok(Value::String(match number_to_int(n) {
                Some(i) if n.as_f64().is_some_and(|f| f.fract() == 0.0) => i.to_string(),
                _ => n.to_string(),
            })),
            other => Err(TypeMismatch::new(scalar, other)),
        },
        ScalarType::Int => match wire {
            Json::Number(n) => number_to_int(n)
                .map(Value::Int)
                .ok_or_else(|| TypeMismatch::new(scalar, wire)),
            Json::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| TypeMismatch::new(scalar, wire)),
            other => Err(TypeMismatch::new(scalar, other)),
        },
        ScalarType::Bool => match wire {
            Json::Bool(b) => Ok(Value::Bool(*b)),
            Json::String(s) => match s.as_str() {
                "enable" | "true" => Ok(Value::Bool(true)),
                "disable" | "false" => Ok(Value::Bool(false)),
                _ => Err(TypeMismatch::new(scalar, wire)),
            },
            other => Err(TypeMismatch::new(scalar, other)),
        },
        ScalarType::Subnet => match wire {
            Json::String(s) => normalize_subnet(s)
                .map(Value::String)
                .map_err(|_| TypeMismatch::new(scalar, wire)),
            other => Err(TypeMismatch::new(scalar, other)),
        },
    }
}

/// Convert a configuration scalar to its wire value
pub fn to_wire(value: &Value, scalar: &ScalarType) -> Result<Json, ConversionError> {
    match (scalar, value) {
        (ScalarType::String, Value::String(s)) => Ok(Json::String(s.clone())),
        (ScalarType::Int, Value::Int(n)) => Ok(Json::from(*n)),
        (ScalarType::Bool, Value::Bool(b)) => Ok(Json::Bool(*b)),
        (ScalarType::Enum(variants), Value::String(s)) => {
            if variants.iter().any(|v| v == s) {
                Ok(Json::String(s.clone()))
            } else {
                Err(ConversionError::InvalidEnum {
                    value: s.clone(),
                    expected: variants.clone(),
                })
            }
        }
        (ScalarType::Subnet, Value::String(s)) => Ok(Json::String(subnet_to_mask(s)?)),
        (expected, got) => Err(ConversionError::Type {
            expected: expected.to_string(),
            got: got.type_name().to_string(),
        }),
    }
}

/// Truncate a JSON number to an integer.
///
/// Floats are accepted only within the range where f64 represents every
/// integer exactly, so truncation never introduces rounding error.
pub fn number_to_int(n: &serde_json::Number) -> Option<i64> {
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    if n.is_u64() {
        return None;
    }
    let f = n.as_f64()?;
    if f.is_finite() && f.abs() <= MAX_EXACT_F64 {
        Some(f.trunc() as i64)
    } else {
        None
    }
}

/// Normalize a subnet to CIDR notation.
///
/// Accepts `"10.0.0.0 255.255.255.0"` and `"10.0.0.0/24"`; both yield
/// `"10.0.0.0/24"`. Normalizing an already normalized value is a no-op.
pub fn normalize_subnet(s: &str) -> Result<String, SubnetError> {
    let (ip, prefix) = parse_subnet(s)?;
    Ok(format!("{}/{}", ip, prefix))
}

/// Render a subnet in the `"ip mask"` form FortiOS expects
pub fn subnet_to_mask(s: &str) -> Result<String, SubnetError> {
    let (ip, prefix) = parse_subnet(s)?;
    let mask = if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix))
    };
    Ok(format!("{} {}", ip, Ipv4Addr::from(mask)))
}

fn parse_subnet(s: &str) -> Result<(Ipv4Addr, u8), SubnetError> {
    let s = s.trim();

    if let Some((ip, prefix)) = s.split_once('/') {
        let ip = parse_addr(ip)?;
        let prefix = match prefix.trim().parse::<u8>() {
            Ok(p) if p <= 32 => p,
            _ => return Err(SubnetError::Prefix(prefix.to_string())),
        };
        return Ok((ip, prefix));
    }

    let parts: Vec<&str> = s.split_whitespace().collect();
    if parts.len() != 2 {
        return Err(SubnetError::Format(s.to_string()));
    }
    let ip = parse_addr(parts[0])?;
    let mask = u32::from(
        parts[1]
            .parse::<Ipv4Addr>()
            .map_err(|_| SubnetError::Mask(parts[1].to_string()))?,
    );
    // contiguous ones followed by zeros
    if mask.leading_ones() + mask.trailing_zeros() != 32 {
        return Err(SubnetError::Mask(parts[1].to_string()));
    }
    Ok((ip, mask.leading_ones() as u8))
}

fn parse_addr(s: &str) -> Result<Ipv4Addr, SubnetError> {
    s.trim()
        .parse::<Ipv4Addr>()
        .map_err(|_| SubnetError::Address(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_maps_to_zero_value() {
        assert_eq!(
            to_config(&Json::Null, &ScalarType::String),
            Ok(Value::string(""))
        );
        assert_eq!(to_config(&Json::Null, &ScalarType::Int), Ok(Value::Int(0)));
        assert_eq!(
            to_config(&Json::Null, &ScalarType::Bool),
            Ok(Value::Bool(false))
        );
    }

    #[test]
    fn float_ids_truncate_exactly() {
        assert_eq!(to_config(&json!(42.0), &ScalarType::Int), Ok(Value::Int(42)));
        assert_eq!(
            to_config(&json!(9007199254740991.0), &ScalarType::Int),
            Ok(Value::Int(9_007_199_254_740_991))
        );
        assert_eq!(to_config(&json!(7.9), &ScalarType::Int), Ok(Value::Int(7)));
        assert!(to_config(&json!(1e300), &ScalarType::Int).is_err());
    }

    #[test]
    fn numeric_strings_become_ints() {
        assert_eq!(to_config(&json!("15"), &ScalarType::Int), Ok(Value::Int(15)));
    }

    #[test]
    fn mismatch_is_reported_not_panicked() {
        let err = to_config(&json!("abc"), &ScalarType::Int).unwrap_err();
        assert_eq!(err.expected, "Int");
        assert_eq!(err.got, "String");

        let err = to_config(&json!([1, 2]), &ScalarType::String).unwrap_err();
        assert_eq!(err.got, "Array");

        assert!(to_config(&json!({"a": 1}), &ScalarType::Bool).is_err());
    }

    #[test]
    fn toggles_are_booleans() {
        assert_eq!(
            to_config(&json!("enable"), &ScalarType::Bool),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            to_config(&json!("disable"), &ScalarType::Bool),
            Ok(Value::Bool(false))
        );
        assert!(to_config(&json!("maybe"), &ScalarType::Bool).is_err());
    }

    #[test]
    fn numbers_render_as_strings() {
        assert_eq!(
            to_config(&json!(3), &ScalarType::String),
            Ok(Value::string("3"))
        );
        assert_eq!(
            to_config(&json!(3.0), &ScalarType::String),
            Ok(Value::string("3"))
        );
    }

    #[test]
    fn subnet_mask_normalizes_to_cidr() {
        assert_eq!(
            normalize_subnet("10.0.0.0 255.255.255.0").unwrap(),
            "10.0.0.0/24"
        );
        assert_eq!(normalize_subnet("0.0.0.0 0.0.0.0").unwrap(), "0.0.0.0/0");
        assert_eq!(
            normalize_subnet("192.168.1.1 255.255.255.255").unwrap(),
            "192.168.1.1/32"
        );
    }

    #[test]
    fn subnet_normalization_is_idempotent() {
        for input in [
            "10.0.0.0 255.255.255.0",
            "10.0.0.0/24",
            "172.16.0.0 255.240.0.0",
            "0.0.0.0/0",
        ] {
            let once = normalize_subnet(input).unwrap();
            let twice = normalize_subnet(&once).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn invalid_subnets_rejected() {
        assert!(matches!(
            normalize_subnet("10.0.0.0 255.0.255.0"),
            Err(SubnetError::Mask(_))
        ));
        assert!(matches!(
            normalize_subnet("10.0.0.0/33"),
            Err(SubnetError::Prefix(_))
        ));
        assert!(matches!(
            normalize_subnet("10.0.0.256/8"),
            Err(SubnetError::Address(_))
        ));
        assert!(matches!(normalize_subnet("10.0.0.0"), Err(SubnetError::Format(_))));
    }

    #[test]
    fn subnet_goes_out_in_mask_form() {
        assert_eq!(
            to_wire(&Value::string("10.1.0.0/16"), &ScalarType::Subnet).unwrap(),
            json!("10.1.0.0 255.255.0.0")
        );
        assert_eq!(subnet_to_mask("0.0.0.0/0").unwrap(), "0.0.0.0 0.0.0.0");
    }

    #[test]
    fn to_wire_checks_enum_and_type() {
        let action = ScalarType::enumeration(&["accept", "deny"]);
        assert_eq!(
            to_wire(&Value::string("deny"), &action).unwrap(),
            json!("deny")
        );
        assert!(matches!(
            to_wire(&Value::string("drop"), &action),
            Err(ConversionError::InvalidEnum { .. })
        ));
        assert!(matches!(
            to_wire(&Value::Int(1), &ScalarType::String),
            Err(ConversionError::Type { .. })
        ));
    }
}
