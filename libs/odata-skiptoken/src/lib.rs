#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! `OData` `$skiptoken` pagination.
//!
//! A skip token is the server-generated continuation value of a paged response. It records
//! the order-by and key values of the last entity of a page (`age:30,id:5`) so that the
//! follow-up request can resume strictly after that entity with a keyset predicate:
//!
//! ```text
//! (age lt 30) or (age eq 30 and id gt 5)
//! ```
//!
//! # Modules
//!
//! - `literal`: `OData` v4.01 URI literal rendering and parsing
//! - `model`: read-only type metadata (entity types, keys, enum types)
//! - `codec`: token encode/decode
//! - `predicate`: keyset predicate construction
//! - `generator`: pluggable value generator strategies
//! - `handler`: per-request skip token handler and next-page links
//! - `query`: the `Queryable` seam plus an in-memory implementation

pub mod codec;
pub mod config;
pub mod entity;
pub mod generator;
pub mod handler;
pub mod literal;
pub mod model;
pub mod next_link;
pub mod order;
pub mod predicate;
pub mod query;
#[cfg(feature = "sea-orm")]
pub mod sea_orm_query;

pub use codec::{PropertyValueMap, QueryContext, SkipTokenCodec};
pub use config::{QuerySettings, SkipTokenConfig};
pub use entity::{EntityInstance, ODataEntity, StructuredObject};
pub use generator::{
    DefaultSkipTokenValueGenerator, SkipTokenValueGenerator, SurrogateKeyValueGenerator,
};
pub use handler::{ExpandedNavigation, SerializerContext, SkipTokenHandler};
pub use model::{EdmModel, EdmType, EdmTypeRef, EntityType, EnumType, FieldKind};
pub use order::{ODataOrderBy, OrderByNode, SortDir};
pub use query::{MemoryQuery, Queryable};

pub mod ast {
    use std::cmp::Ordering;

    use bigdecimal::BigDecimal;
    use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
    use uuid::Uuid;

    #[derive(Clone, Debug, PartialEq)]
    pub enum Expr {
        And(Box<Expr>, Box<Expr>),
        Or(Box<Expr>, Box<Expr>),
        Compare(Box<Expr>, CompareOperator, Box<Expr>),
        Identifier(String),
        Value(Value),
        /// A constant lifted into a query parameter slot.
        Param(Param),
    }

    impl Expr {
        /// Combine two expressions with AND: `expr1 and expr2`
        #[must_use]
        pub fn and(self, other: Expr) -> Expr {
            Expr::And(Box::new(self), Box::new(other))
        }

        /// Combine two expressions with OR: `expr1 or expr2`
        #[must_use]
        pub fn or(self, other: Expr) -> Expr {
            Expr::Or(Box::new(self), Box::new(other))
        }

        /// `identifier op operand`
        #[must_use]
        pub fn compare(name: &str, op: CompareOperator, operand: Expr) -> Expr {
            Expr::Compare(
                Box::new(Expr::Identifier(name.to_owned())),
                op,
                Box::new(operand),
            )
        }

        /// Constant carried by a `Value` or `Param` leaf.
        #[must_use]
        pub fn as_constant(&self) -> Option<&Value> {
            match self {
                Expr::Value(v) | Expr::Param(Param { value: v, .. }) => Some(v),
                _ => None,
            }
        }
    }

    impl std::fmt::Display for Expr {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Expr::And(a, b) => write!(f, "({a} and {b})"),
                Expr::Or(a, b) => write!(f, "({a} or {b})"),
                Expr::Compare(l, op, r) => write!(f, "{l} {op} {r}"),
                Expr::Identifier(name) => f.write_str(name),
                Expr::Value(v) => write!(f, "{v}"),
                Expr::Param(p) => write!(f, "@p{}", p.index),
            }
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum CompareOperator {
        Eq,
        Ne,
        Gt,
        Ge,
        Lt,
        Le,
    }

    impl std::fmt::Display for CompareOperator {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(match self {
                CompareOperator::Eq => "eq",
                CompareOperator::Ne => "ne",
                CompareOperator::Gt => "gt",
                CompareOperator::Ge => "ge",
                CompareOperator::Lt => "lt",
                CompareOperator::Le => "le",
            })
        }
    }

    /// Parameterized constant. `index` is the slot position within one predicate.
    #[derive(Clone, Debug, PartialEq)]
    pub struct Param {
        pub index: usize,
        pub value: Value,
    }

    /// Enum member tagged with its qualified type name and underlying value.
    #[derive(Clone, Debug, PartialEq, Eq, Hash)]
    pub struct EnumValue {
        pub type_name: String,
        pub member: String,
        pub value: i64,
    }

    impl EnumValue {
        pub fn new(type_name: impl Into<String>, member: impl Into<String>, value: i64) -> Self {
            Self {
                type_name: type_name.into(),
                member: member.into(),
                value,
            }
        }
    }

    #[derive(Clone, Debug, PartialEq)]
    pub enum Value {
        Null,
        Bool(bool),
        Number(BigDecimal),
        Uuid(Uuid),
        DateTime(DateTime<Utc>),
        Date(NaiveDate),
        Time(NaiveTime),
        String(String),
        Enum(EnumValue),
    }

    impl Value {
        /// Strip an enum tag down to its underlying integer; other values pass through.
        #[must_use]
        pub fn unwrap_enum(self) -> Value {
            match self {
                Value::Enum(e) => Value::Number(BigDecimal::from(e.value)),
                other => other,
            }
        }

        /// Ordering between two non-null values of compatible kinds.
        ///
        /// Enum members compare by underlying value, also against plain numbers.
        /// `None` for nulls and mismatched kinds.
        #[must_use]
        pub fn compare(&self, other: &Value) -> Option<Ordering> {
            match (self, other) {
                (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
                (Value::Number(a), Value::Number(b)) => Some(a.cmp(b)),
                (Value::Uuid(a), Value::Uuid(b)) => Some(a.cmp(b)),
                (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
                (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
                (Value::Time(a), Value::Time(b)) => Some(a.cmp(b)),
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                (Value::Enum(a), Value::Enum(b)) => Some(a.value.cmp(&b.value)),
                (Value::Enum(a), Value::Number(b)) => Some(BigDecimal::from(a.value).cmp(b)),
                (Value::Number(a), Value::Enum(b)) => Some(a.cmp(&BigDecimal::from(b.value))),
                _ => None,
            }
        }

        /// Equality with null-equals-null semantics.
        #[must_use]
        pub fn equals(&self, other: &Value) -> bool {
            match (self, other) {
                (Value::Null, Value::Null) => true,
                (Value::Null, _) | (_, Value::Null) => false,
                _ => self.compare(other) == Some(Ordering::Equal),
            }
        }
    }

    /// Renders the URI literal form.
    impl std::fmt::Display for Value {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(&crate::literal::to_uri_literal(self))
        }
    }

    impl From<bool> for Value {
        fn from(b: bool) -> Self {
            Value::Bool(b)
        }
    }

    impl From<i32> for Value {
        fn from(n: i32) -> Self {
            Value::Number(BigDecimal::from(n))
        }
    }

    impl From<i64> for Value {
        fn from(n: i64) -> Self {
            Value::Number(BigDecimal::from(n))
        }
    }

    impl From<BigDecimal> for Value {
        fn from(n: BigDecimal) -> Self {
            Value::Number(n)
        }
    }

    impl From<&str> for Value {
        fn from(s: &str) -> Self {
            Value::String(s.to_owned())
        }
    }

    impl From<String> for Value {
        fn from(s: String) -> Self {
            Value::String(s)
        }
    }

    impl From<Uuid> for Value {
        fn from(u: Uuid) -> Self {
            Value::Uuid(u)
        }
    }

    impl From<DateTime<Utc>> for Value {
        fn from(dt: DateTime<Utc>) -> Self {
            Value::DateTime(dt)
        }
    }

    impl From<NaiveDate> for Value {
        fn from(d: NaiveDate) -> Self {
            Value::Date(d)
        }
    }

    impl From<NaiveTime> for Value {
        fn from(t: NaiveTime) -> Self {
            Value::Time(t)
        }
    }

    impl From<EnumValue> for Value {
        fn from(e: EnumValue) -> Self {
            Value::Enum(e)
        }
    }

    impl<T: Into<Value>> From<Option<T>> for Value {
        fn from(opt: Option<T>) -> Self {
            opt.map_or(Value::Null, Into::into)
        }
    }
}

/// Unified error type for skip token operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Precondition violations
    #[error("skip token decoding requires a bound element type and model")]
    ContextUnbound,

    #[error("{operation} is not supported on an untyped query")]
    NotSupported { operation: &'static str },

    #[error("skip token is already set on this handler")]
    TokenAlreadySet,

    // Literal conversion errors
    #[error("invalid URI literal: {0}")]
    InvalidLiteral(String),

    #[error("unknown type: {0}")]
    UnknownType(String),

    #[error("unknown property '{property}' on type '{type_name}'")]
    UnknownProperty { type_name: String, property: String },

    #[error("property '{0}' is not enum-typed")]
    NotAnEnum(String),

    #[error("'{member}' is not a member of enum '{type_name}'")]
    UnknownEnumMember { type_name: String, member: String },

    // Query option errors
    #[error("unsupported $orderby: {0}")]
    InvalidOrderBy(String),

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    // Configuration errors
    #[error("invalid skip token configuration: {0}")]
    InvalidConfig(String),
}
