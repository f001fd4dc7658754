//! `SeaORM` backing for `Queryable`.
//!
//! The keyset predicate is compiled to a `sea_orm::Condition` over mapped columns. API
//! property names are resolved case-insensitively through a `FieldMap`.

use std::collections::HashMap;

use bigdecimal::{BigDecimal, ToPrimitive};
use rust_decimal::Decimal;
use sea_orm::{sea_query::Expr as SqlExpr, ColumnTrait, Condition, EntityTrait, QueryFilter};

use crate::ast::{CompareOperator, Expr, Value};
use crate::model::FieldKind;
use crate::query::Queryable;
use crate::Error;

#[derive(Clone)]
pub struct Field<E: EntityTrait> {
    pub col: E::Column,
    pub kind: FieldKind,
}

#[derive(Clone)]
#[must_use]
pub struct FieldMap<E: EntityTrait> {
    map: HashMap<String, Field<E>>,
}

impl<E: EntityTrait> Default for FieldMap<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: EntityTrait> FieldMap<E> {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    pub fn insert(mut self, api_name: impl Into<String>, col: E::Column, kind: FieldKind) -> Self {
        self.map
            .insert(api_name.into().to_lowercase(), Field { col, kind });
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Field<E>> {
        self.map.get(&name.to_lowercase())
    }
}

/// A `SeaORM` select bound to an EDM element type.
#[must_use]
pub struct SeaQuery<E: EntityTrait> {
    select: sea_orm::Select<E>,
    element_type: String,
    fields: FieldMap<E>,
}

impl<E: EntityTrait> SeaQuery<E> {
    pub fn new(
        select: sea_orm::Select<E>,
        element_type: impl Into<String>,
        fields: FieldMap<E>,
    ) -> Self {
        Self {
            select,
            element_type: element_type.into(),
            fields,
        }
    }

    pub fn into_select(self) -> sea_orm::Select<E> {
        self.select
    }
}

impl<E> Queryable for SeaQuery<E>
where
    E: EntityTrait,
    E::Column: ColumnTrait + Copy,
{
    fn element_type(&self) -> Option<&str> {
        Some(&self.element_type)
    }

    fn apply_filter(mut self, predicate: Expr) -> Result<Self, Error> {
        let condition = expr_to_condition(&predicate, &self.fields)?;
        self.select = self.select.filter(condition);
        Ok(self)
    }
}

fn bigdecimal_to_decimal(bd: &BigDecimal) -> Result<Decimal, Error> {
    let s = bd.normalized().to_string();
    Decimal::from_str_exact(&s)
        .or_else(|_| s.parse::<Decimal>())
        .map_err(|_| Error::InvalidFilter(format!("invalid decimal {s}")))
}

fn mismatch(kind: FieldKind, v: &Value) -> Error {
    Error::InvalidFilter(format!("type mismatch: expected {kind:?}, got {v}"))
}

fn coerce(kind: FieldKind, v: &Value) -> Result<sea_orm::Value, Error> {
    Ok(match (kind, v) {
        (FieldKind::String, Value::String(s)) => sea_orm::Value::String(Some(Box::new(s.clone()))),
        (FieldKind::I64, Value::Number(n)) => {
            sea_orm::Value::BigInt(Some(n.to_i64().ok_or_else(|| mismatch(kind, v))?))
        }
        (FieldKind::F64, Value::Number(n)) => {
            sea_orm::Value::Double(Some(n.to_f64().ok_or_else(|| mismatch(kind, v))?))
        }
        (FieldKind::Decimal, Value::Number(n)) => {
            sea_orm::Value::Decimal(Some(Box::new(bigdecimal_to_decimal(n)?)))
        }
        (FieldKind::Bool, Value::Bool(b)) => sea_orm::Value::Bool(Some(*b)),
        (FieldKind::Uuid, Value::Uuid(u)) => sea_orm::Value::Uuid(Some(Box::new(*u))),
        (FieldKind::DateTimeUtc, Value::DateTime(dt)) => {
            sea_orm::Value::ChronoDateTimeUtc(Some(Box::new(*dt)))
        }
        (FieldKind::Date, Value::Date(d)) => sea_orm::Value::ChronoDate(Some(Box::new(*d))),
        (FieldKind::Time, Value::Time(t)) => sea_orm::Value::ChronoTime(Some(Box::new(*t))),
        (_, Value::Enum(e)) => return coerce(kind, &Value::from(e.value)),
        _ => return Err(mismatch(kind, v)),
    })
}

/// Compile a filter expression into a `SeaORM` condition.
///
/// # Errors
/// Returns `Error::UnknownProperty` for unmapped names and `Error::InvalidFilter` for
/// shapes or values the column cannot take.
pub fn expr_to_condition<E>(expr: &Expr, fmap: &FieldMap<E>) -> Result<Condition, Error>
where
    E: EntityTrait,
    E::Column: ColumnTrait + Copy,
{
    use CompareOperator as Op;

    Ok(match expr {
        Expr::And(a, b) => Condition::all()
            .add(expr_to_condition(a, fmap)?)
            .add(expr_to_condition(b, fmap)?),
        Expr::Or(a, b) => Condition::any()
            .add(expr_to_condition(a, fmap)?)
            .add(expr_to_condition(b, fmap)?),
        Expr::Compare(lhs, op, rhs) => {
            let (Expr::Identifier(name), Some(rhs_val)) = (&**lhs, rhs.as_constant()) else {
                return Err(Error::InvalidFilter(format!(
                    "unsupported comparison form: {expr}"
                )));
            };
            let field = fmap.get(name).ok_or_else(|| Error::UnknownProperty {
                type_name: std::any::type_name::<E>().to_owned(),
                property: name.clone(),
            })?;
            let col = field.col;

            // nulls sort before every value, as MemoryQuery orders them
            if matches!(rhs_val, Value::Null) {
                return Ok(match op {
                    Op::Eq | Op::Le => Condition::all().add(SqlExpr::col(col).is_null()),
                    Op::Ne | Op::Gt => Condition::all().add(SqlExpr::col(col).is_not_null()),
                    Op::Ge => Condition::all(),
                    Op::Lt => Condition::all().add(SqlExpr::cust("1=0")),
                });
            }

            let value = coerce(field.kind, rhs_val)?;
            match op {
                Op::Eq => Condition::all().add(SqlExpr::col(col).eq(value)),
                Op::Ne => Condition::all().add(SqlExpr::col(col).ne(value)),
                Op::Gt => Condition::all().add(SqlExpr::col(col).gt(value)),
                Op::Ge => Condition::all().add(SqlExpr::col(col).gte(value)),
                Op::Lt => Condition::any()
                    .add(SqlExpr::col(col).lt(value))
                    .add(SqlExpr::col(col).is_null()),
                Op::Le => Condition::any()
                    .add(SqlExpr::col(col).lte(value))
                    .add(SqlExpr::col(col).is_null()),
            }
        }
        Expr::Value(Value::Bool(true)) => Condition::all(),
        other => {
            return Err(Error::InvalidFilter(format!(
                "expected a boolean expression, got {other}"
            )))
        }
    })
}
