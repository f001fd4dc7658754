//! Keyset predicate construction.
//!
//! For a decoded token `P1:V1,P2:V2,...,Pn:Vn` the predicate selects every entity strictly
//! after the token position in lexicographic order:
//!
//! ```text
//! (P1 cmp V1)
//!   or (P1 eq V1 and P2 cmp V2)
//!   or (P1 eq V1 and P2 eq V2 and P3 cmp V3) ...
//! ```
//!
//! `cmp` is `lt` for properties ordered descending and `gt` otherwise, including properties
//! absent from the ordering (appended keys sort ascending).

use crate::ast::{CompareOperator, Expr, Param};
use crate::codec::PropertyValueMap;
use crate::config::QuerySettings;
use crate::order::{directions, OrderByNode, SortDir};
use crate::query::Queryable;
use crate::Error;

/// Build the keyset predicate, `None` when the mapping is empty.
#[must_use]
pub fn build_skip_token_predicate(
    values: &PropertyValueMap,
    order_by: &[OrderByNode],
    parameterize: bool,
) -> Option<Expr> {
    let dirs = directions(order_by);

    let mut predicate: Option<Expr> = None;
    let mut equal_prefix: Option<Expr> = None;

    for (index, (name, value)) in values.iter().enumerate() {
        let value = value.clone().unwrap_enum();
        let constant = if parameterize {
            Expr::Param(Param { index, value })
        } else {
            Expr::Value(value)
        };

        let op = match dirs.get(name.as_str()) {
            Some(SortDir::Desc) => CompareOperator::Lt,
            Some(SortDir::Asc) | None => CompareOperator::Gt,
        };
        let compare = Expr::compare(name, op, constant.clone());

        let disjunct = match &equal_prefix {
            Some(prefix) => prefix.clone().and(compare),
            None => compare,
        };
        predicate = Some(match predicate {
            Some(p) => p.or(disjunct),
            None => disjunct,
        });

        let equal = Expr::compare(name, CompareOperator::Eq, constant);
        equal_prefix = Some(match equal_prefix {
            Some(prefix) => prefix.and(equal),
            None => equal,
        });
    }

    predicate
}

/// Filter `query` down to the entities after the token position.
///
/// The query's own ordering is left untouched.
///
/// # Errors
/// Returns `Error::NotSupported` if the query has no static element type, or whatever the
/// query reports while installing the filter.
pub fn apply_skip_token<Q: Queryable>(
    query: Q,
    values: &PropertyValueMap,
    order_by: &[OrderByNode],
    settings: &QuerySettings,
) -> Result<Q, Error> {
    if query.element_type().is_none() {
        return Err(Error::NotSupported {
            operation: "apply_to",
        });
    }

    match build_skip_token_predicate(values, order_by, settings.enable_constant_parameterization)
    {
        Some(predicate) => {
            tracing::trace!(%predicate, "Applying skip token predicate");
            query.apply_filter(predicate)
        }
        None => Ok(query),
    }
}
