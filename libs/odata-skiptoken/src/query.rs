//! Query seam and an in-memory implementation.
//!
//! `Queryable` is the minimal surface the skip token handler needs from a query: whether
//! its element type is statically known, and a way to install a filter. `MemoryQuery`
//! evaluates the filter directly against `ODataEntity` items; the `sea-orm` feature adds a
//! `SeaQuery` that compiles it to SQL conditions.

use std::cmp::Ordering;

use crate::ast::{CompareOperator, Expr, Value};
use crate::entity::ODataEntity;
use crate::order::{OrderByNode, SortDir};
use crate::Error;

pub trait Queryable: Sized {
    /// Element type of the query, `None` when it is not statically known.
    fn element_type(&self) -> Option<&str>;

    /// Restrict the query to rows for which `predicate` holds.
    ///
    /// # Errors
    /// Returns an error if the predicate cannot be expressed against this query.
    fn apply_filter(self, predicate: Expr) -> Result<Self, Error>;
}

/// In-memory query over typed entities.
#[derive(Clone, Debug)]
pub struct MemoryQuery<T> {
    element_type: Option<String>,
    items: Vec<T>,
    order: Vec<OrderByNode>,
    filters: Vec<Expr>,
}

impl<T: ODataEntity> MemoryQuery<T> {
    /// Query whose element type is the runtime type of `T`.
    #[must_use]
    pub fn new(items: Vec<T>) -> Self {
        Self {
            element_type: Some(std::any::type_name::<T>().to_owned()),
            items,
            order: Vec::new(),
            filters: Vec::new(),
        }
    }

    /// Query without a statically known element type.
    #[must_use]
    pub fn untyped(items: Vec<T>) -> Self {
        Self {
            element_type: None,
            items,
            order: Vec::new(),
            filters: Vec::new(),
        }
    }

    #[must_use]
    pub fn order_by(mut self, nodes: &[OrderByNode]) -> Self {
        self.order = nodes.to_vec();
        self
    }

    #[must_use]
    pub fn filters(&self) -> &[Expr] {
        &self.filters
    }

    /// Evaluate filters and ordering.
    ///
    /// # Errors
    /// Returns `Error::InvalidFilter` if an installed filter is malformed.
    pub fn execute(&self) -> Result<Vec<&T>, Error> {
        let mut out = Vec::with_capacity(self.items.len());
        for item in &self.items {
            let mut keep = true;
            for filter in &self.filters {
                if !evaluate(filter, item)? {
                    keep = false;
                    break;
                }
            }
            if keep {
                out.push(item);
            }
        }
        out.sort_by(|a, b| compare_by(&self.order, *a, *b));
        Ok(out)
    }

    /// First `size` results of `execute`.
    ///
    /// # Errors
    /// Same as `execute`.
    pub fn page(&self, size: usize) -> Result<Vec<&T>, Error> {
        let mut rows = self.execute()?;
        rows.truncate(size);
        Ok(rows)
    }
}

impl<T: ODataEntity> Queryable for MemoryQuery<T> {
    fn element_type(&self) -> Option<&str> {
        self.element_type.as_deref()
    }

    fn apply_filter(mut self, predicate: Expr) -> Result<Self, Error> {
        self.filters.push(predicate);
        Ok(self)
    }
}

/// Evaluate a boolean filter against `entity`.
///
/// Null orders before every other value, the same way `execute` sorts, so `x gt null`
/// holds for any non-null `x`. `eq` treats null as equal to null.
///
/// # Errors
/// Returns `Error::InvalidFilter` for a non-boolean expression in boolean position.
pub fn evaluate<T: ODataEntity + ?Sized>(expr: &Expr, entity: &T) -> Result<bool, Error> {
    match expr {
        Expr::And(a, b) => Ok(evaluate(a, entity)? && evaluate(b, entity)?),
        Expr::Or(a, b) => Ok(evaluate(a, entity)? || evaluate(b, entity)?),
        Expr::Compare(lhs, op, rhs) => {
            let l = operand(lhs, entity)?;
            let r = operand(rhs, entity)?;
            let ord = nulls_first(&l, &r);
            Ok(match op {
                CompareOperator::Eq => l.equals(&r),
                CompareOperator::Ne => !l.equals(&r),
                CompareOperator::Gt => ord == Some(Ordering::Greater),
                CompareOperator::Ge => matches!(ord, Some(Ordering::Greater | Ordering::Equal)),
                CompareOperator::Lt => ord == Some(Ordering::Less),
                CompareOperator::Le => matches!(ord, Some(Ordering::Less | Ordering::Equal)),
            })
        }
        Expr::Value(Value::Bool(b)) => Ok(*b),
        other => Err(Error::InvalidFilter(format!(
            "expected a boolean expression, got {other}"
        ))),
    }
}

fn operand<T: ODataEntity + ?Sized>(expr: &Expr, entity: &T) -> Result<Value, Error> {
    match expr {
        Expr::Identifier(name) => Ok(entity.property_value(name).unwrap_or(Value::Null)),
        Expr::Value(v) | Expr::Param(crate::ast::Param { value: v, .. }) => Ok(v.clone()),
        other => Err(Error::InvalidFilter(format!(
            "expected an identifier or constant, got {other}"
        ))),
    }
}

// Nulls sort first, matching the OData default. `None` for mismatched kinds.
fn nulls_first(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Null, _) => Some(Ordering::Less),
        (_, Value::Null) => Some(Ordering::Greater),
        _ => a.compare(b),
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    nulls_first(a, b).unwrap_or(Ordering::Equal)
}

fn compare_by<T: ODataEntity>(order: &[OrderByNode], a: &T, b: &T) -> Ordering {
    for node in order {
        let l = a.property_value(node.name()).unwrap_or(Value::Null);
        let r = b.property_value(node.name()).unwrap_or(Value::Null);
        let ord = match node.dir() {
            SortDir::Asc => compare_values(&l, &r),
            SortDir::Desc => compare_values(&r, &l),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}
