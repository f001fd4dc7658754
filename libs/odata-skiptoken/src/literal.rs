//! `OData` v4.01 URI literal conversion.
//!
//! Rendering is total: every `Value` has exactly one literal form. Parsing comes in two
//! flavours:
//! - `from_uri_literal` infers the type from the literal shape alone
//! - `from_uri_literal_typed` is bound to a declared property type and resolves enum
//!   members against the model
//!
//! | value        | literal                                |
//! |--------------|----------------------------------------|
//! | null         | `null`                                 |
//! | boolean      | `true` / `false`                       |
//! | number       | `42`, `-1.25`                          |
//! | string       | `'O''Neil'`                            |
//! | guid         | `a3bb189e-8bf9-3888-9912-ace4e6543002` |
//! | date-time    | `2024-01-02T03:04:05Z`                 |
//! | date         | `2024-01-02`                           |
//! | time of day  | `03:04:05.5`                           |
//! | enum         | `Sales.Status'Open'`                   |

use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::ast::{EnumValue, Value};
use crate::model::{EdmModel, EdmTypeRef, EnumType, FieldKind};
use crate::Error;

/// Tag prepended to enum literals inside a skip token.
pub const ENUM_TYPE_TAG: &str = "'enumType'";

const NULL_LITERAL: &str = "null";
const GUID_LITERAL_LEN: usize = 36;

/// Render a value as a URI literal.
#[must_use]
pub fn to_uri_literal(value: &Value) -> String {
    match value {
        Value::Null => NULL_LITERAL.to_owned(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_plain_string(),
        Value::Uuid(u) => u.hyphenated().to_string(),
        Value::DateTime(dt) => dt.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        Value::Date(d) => d.format("%Y-%m-%d").to_string(),
        Value::Time(t) => t.format("%H:%M:%S%.f").to_string(),
        Value::String(s) => quote(s),
        Value::Enum(e) => format!("{}{}", e.type_name, quote(&e.member)),
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for ch in s.chars() {
        if ch == '\'' {
            out.push('\'');
        }
        out.push(ch);
    }
    out.push('\'');
    out
}

fn unquote(text: &str) -> Result<String, Error> {
    let inner = text
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .filter(|_| text.len() >= 2)
        .ok_or_else(|| Error::InvalidLiteral(text.to_owned()))?;

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\'' {
            // quotes inside a string literal are doubled
            if chars.next() != Some('\'') {
                return Err(Error::InvalidLiteral(text.to_owned()));
            }
        }
        out.push(ch);
    }
    Ok(out)
}

/// Parse a URI literal without type information.
///
/// # Errors
/// Returns `Error::InvalidLiteral` if the text matches no literal form. Qualified enum
/// literals need a declared type and are rejected here.
pub fn from_uri_literal(text: &str) -> Result<Value, Error> {
    match text {
        NULL_LITERAL => return Ok(Value::Null),
        "true" => return Ok(Value::Bool(true)),
        "false" => return Ok(Value::Bool(false)),
        _ => {}
    }
    if text.starts_with('\'') {
        return unquote(text).map(Value::String);
    }
    if text.len() == GUID_LITERAL_LEN {
        if let Ok(u) = Uuid::parse_str(text) {
            return Ok(Value::Uuid(u));
        }
    }
    if let Ok(v) = parse_date_time(text) {
        return Ok(v);
    }
    if let Ok(d) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(Value::Date(d));
    }
    if let Ok(t) = parse_time(text) {
        return Ok(Value::Time(t));
    }
    parse_number(text).map(Value::Number)
}

/// Parse a URI literal bound to a declared property type.
///
/// # Errors
/// Returns `Error::InvalidLiteral` if the text does not fit the declared type,
/// `Error::UnknownType` for an enum type missing from the model, and
/// `Error::UnknownEnumMember` for a member the enum does not declare.
pub fn from_uri_literal_typed(
    text: &str,
    model: &EdmModel,
    ty: &EdmTypeRef,
) -> Result<Value, Error> {
    if text == NULL_LITERAL {
        return Ok(Value::Null);
    }
    match ty {
        EdmTypeRef::Primitive(kind) => parse_primitive(*kind, text),
        EdmTypeRef::Enum(type_name) => {
            let enum_type = model
                .enum_type(type_name)
                .ok_or_else(|| Error::UnknownType(type_name.clone()))?;
            parse_enum(text, enum_type).map(Value::Enum)
        }
    }
}

fn parse_primitive(kind: FieldKind, text: &str) -> Result<Value, Error> {
    let invalid = || Error::InvalidLiteral(text.to_owned());
    Ok(match kind {
        FieldKind::String => Value::String(unquote(text)?),
        FieldKind::I64 => {
            let i = text.parse::<i64>().map_err(|_| invalid())?;
            Value::Number(BigDecimal::from(i))
        }
        FieldKind::F64 | FieldKind::Decimal => Value::Number(parse_number(text)?),
        FieldKind::Bool => Value::Bool(text.parse::<bool>().map_err(|_| invalid())?),
        FieldKind::Uuid => Value::Uuid(Uuid::parse_str(text).map_err(|_| invalid())?),
        FieldKind::DateTimeUtc => parse_date_time(text)?,
        FieldKind::Date => Value::Date(
            NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|_| invalid())?,
        ),
        FieldKind::Time => Value::Time(parse_time(text)?),
    })
}

/// Accepts `Ns.Type'Member'`, a bare `'Member'`, or the underlying integer value.
fn parse_enum(text: &str, enum_type: &EnumType) -> Result<EnumValue, Error> {
    let full_name = enum_type.full_name();
    let member = if let Some(quoted) = text.strip_prefix(full_name.as_str()) {
        unquote(quoted)?
    } else if text.starts_with('\'') {
        unquote(text)?
    } else if let Ok(raw) = text.parse::<i64>() {
        let m = enum_type
            .find_value(raw)
            .ok_or_else(|| Error::UnknownEnumMember {
                type_name: full_name.clone(),
                member: text.to_owned(),
            })?;
        m.name.clone()
    } else {
        return Err(Error::InvalidLiteral(text.to_owned()));
    };

    let m = enum_type
        .find_member(&member)
        .ok_or_else(|| Error::UnknownEnumMember {
            type_name: full_name.clone(),
            member: member.clone(),
        })?;
    Ok(EnumValue::new(full_name, member, m.value))
}

fn parse_date_time(text: &str) -> Result<Value, Error> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| Value::DateTime(dt.with_timezone(&Utc)))
        .map_err(|_| Error::InvalidLiteral(text.to_owned()))
}

fn parse_time(text: &str) -> Result<NaiveTime, Error> {
    NaiveTime::parse_from_str(text, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .map_err(|_| Error::InvalidLiteral(text.to_owned()))
}

fn parse_number(text: &str) -> Result<BigDecimal, Error> {
    // BigDecimal also takes forms like "1e5" but never words such as "inf"
    if text.is_empty() || !text.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '+')
    {
        return Err(Error::InvalidLiteral(text.to_owned()));
    }
    BigDecimal::from_str(text).map_err(|_| Error::InvalidLiteral(text.to_owned()))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::model::{EntityType, EnumType};
    use chrono::TimeZone;

    fn model() -> EdmModel {
        EdmModel::new()
            .enumeration(
                EnumType::new("Sales", "Status")
                    .member("Open", 0)
                    .member("Closed", 5),
            )
            .entity(EntityType::new("Sales", "Order").key("id", FieldKind::I64))
    }

    fn status() -> EdmTypeRef {
        EdmTypeRef::Enum("Sales.Status".to_owned())
    }

    #[test]
    fn test_render_primitives() {
        assert_eq!(to_uri_literal(&Value::Null), "null");
        assert_eq!(to_uri_literal(&Value::Bool(true)), "true");
        assert_eq!(to_uri_literal(&Value::from(42)), "42");
        assert_eq!(
            to_uri_literal(&Value::Number(BigDecimal::from_str("-1.25").unwrap())),
            "-1.25"
        );
        assert_eq!(to_uri_literal(&Value::from("O'Neil")), "'O''Neil'");
    }

    #[test]
    fn test_display_shows_the_literal() {
        assert_eq!(Value::from("O'Neil").to_string(), "'O''Neil'");
        assert_eq!(Value::from(7).to_string(), "7");
        assert_eq!(
            Value::from(EnumValue::new("Sales.Status", "Open", 1)).to_string(),
            "Sales.Status'Open'"
        );
    }

    #[test]
    fn test_render_temporal() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(to_uri_literal(&Value::DateTime(dt)), "2024-01-02T03:04:05Z");

        let d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(to_uri_literal(&Value::Date(d)), "2024-01-02");

        let t = NaiveTime::from_hms_milli_opt(3, 4, 5, 500).unwrap();
        assert_eq!(to_uri_literal(&Value::Time(t)), "03:04:05.500");
    }

    #[test]
    fn test_render_enum() {
        let v = Value::Enum(EnumValue::new("Sales.Status", "Open", 0));
        assert_eq!(to_uri_literal(&v), "Sales.Status'Open'");
    }

    #[test]
    fn test_parse_infers_kind() {
        assert_eq!(from_uri_literal("null").unwrap(), Value::Null);
        assert_eq!(from_uri_literal("false").unwrap(), Value::Bool(false));
        assert_eq!(from_uri_literal("17").unwrap(), Value::from(17));
        assert_eq!(
            from_uri_literal("'it''s'").unwrap(),
            Value::String("it's".to_owned())
        );
        assert_eq!(
            from_uri_literal("a3bb189e-8bf9-3888-9912-ace4e6543002").unwrap(),
            Value::Uuid(Uuid::parse_str("a3bb189e-8bf9-3888-9912-ace4e6543002").unwrap())
        );
        assert!(matches!(
            from_uri_literal("2024-01-02T03:04:05+02:00").unwrap(),
            Value::DateTime(_)
        ));
        assert!(matches!(from_uri_literal("2024-01-02").unwrap(), Value::Date(_)));
        assert!(matches!(from_uri_literal("03:04:05").unwrap(), Value::Time(_)));
    }

    #[test]
    fn test_parse_datetime_normalizes_to_utc() {
        let v = from_uri_literal("2024-01-02T05:04:05+02:00").unwrap();
        let expected = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(v, Value::DateTime(expected));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            from_uri_literal("abc"),
            Err(Error::InvalidLiteral(s)) if s == "abc"
        ));
        assert!(from_uri_literal("'unterminated").is_err());
        assert!(from_uri_literal("'lone'quote'").is_err());
        assert!(from_uri_literal("inf").is_err());
        assert!(from_uri_literal("Sales.Status'Open'").is_err());
    }

    #[test]
    fn test_typed_enum_forms() {
        let model = model();
        let expected = Value::Enum(EnumValue::new("Sales.Status", "Closed", 5));

        assert_eq!(
            from_uri_literal_typed("Sales.Status'Closed'", &model, &status()).unwrap(),
            expected
        );
        assert_eq!(
            from_uri_literal_typed("'Closed'", &model, &status()).unwrap(),
            expected
        );
        assert_eq!(
            from_uri_literal_typed("5", &model, &status()).unwrap(),
            expected
        );
    }

    #[test]
    fn test_typed_enum_unknown_member() {
        let model = model();
        let err = from_uri_literal_typed("Sales.Status'Lost'", &model, &status()).unwrap_err();
        assert!(matches!(err, Error::UnknownEnumMember { member, .. } if member == "Lost"));
    }

    #[test]
    fn test_typed_enum_unknown_type() {
        let model = model();
        let ty = EdmTypeRef::Enum("Sales.Missing".to_owned());
        assert!(matches!(
            from_uri_literal_typed("'x'", &model, &ty),
            Err(Error::UnknownType(_))
        ));
    }

    #[test]
    fn test_typed_primitives() {
        let model = model();
        let i64_ty = EdmTypeRef::Primitive(FieldKind::I64);
        assert_eq!(
            from_uri_literal_typed("9", &model, &i64_ty).unwrap(),
            Value::from(9)
        );
        assert!(from_uri_literal_typed("9.5", &model, &i64_ty).is_err());
        assert_eq!(
            from_uri_literal_typed("null", &model, &i64_ty).unwrap(),
            Value::Null
        );

        let str_ty = EdmTypeRef::Primitive(FieldKind::String);
        assert_eq!(
            from_uri_literal_typed("'x'", &model, &str_ty).unwrap(),
            Value::from("x")
        );
    }

    #[test]
    fn test_render_parse_agree_on_every_kind() {
        let values = vec![
            Value::Null,
            Value::Bool(true),
            Value::from(-7),
            Value::Number(BigDecimal::from_str("3.14159").unwrap()),
            Value::from("a,b:c"),
            Value::Uuid(Uuid::nil()),
            Value::DateTime(Utc.with_ymd_and_hms(2020, 2, 29, 23, 59, 59).unwrap()),
            Value::Date(NaiveDate::from_ymd_opt(1999, 12, 31).unwrap()),
            Value::Time(NaiveTime::from_hms_opt(12, 30, 0).unwrap()),
        ];
        for v in values {
            let literal = to_uri_literal(&v);
            assert_eq!(from_uri_literal(&literal).unwrap(), v, "literal {literal}");
        }
    }
}
