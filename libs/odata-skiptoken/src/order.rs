//! Order-by primitives.
//!
//! An effective ordering is a list of nodes; each node targets either a declared property
//! or a dynamic property of an open type. Skip tokens are only generated for orderings over
//! declared properties.

use std::collections::HashMap;

use crate::model::EntityType;
use crate::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SortDir {
    Asc,
    Desc,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OrderByNode {
    /// Declared structural property.
    Property { name: String, dir: SortDir },
    /// Dynamic property of an open type.
    OpenProperty { name: String, dir: SortDir },
}

impl OrderByNode {
    pub fn asc(name: impl Into<String>) -> Self {
        OrderByNode::Property {
            name: name.into(),
            dir: SortDir::Asc,
        }
    }

    pub fn desc(name: impl Into<String>) -> Self {
        OrderByNode::Property {
            name: name.into(),
            dir: SortDir::Desc,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            OrderByNode::Property { name, .. } | OrderByNode::OpenProperty { name, .. } => name,
        }
    }

    #[must_use]
    pub fn dir(&self) -> SortDir {
        match self {
            OrderByNode::Property { dir, .. } | OrderByNode::OpenProperty { dir, .. } => *dir,
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self, OrderByNode::OpenProperty { .. })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[must_use]
pub struct ODataOrderBy(pub Vec<OrderByNode>);

impl ODataOrderBy {
    pub fn empty() -> Self {
        Self(vec![])
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn nodes(&self) -> &[OrderByNode] {
        &self.0
    }

    /// Parse an `$orderby` value such as `name desc, id`.
    ///
    /// Names the entity type does not declare become dynamic properties on open types.
    ///
    /// # Errors
    /// Returns `Error::InvalidOrderBy` for empty items, unknown directions, or undeclared
    /// names on a closed type.
    pub fn parse(raw: &str, entity: &EntityType) -> Result<Self, Error> {
        let mut out = Vec::new();
        for item in raw.split(',') {
            let mut parts = item.split_whitespace();
            let Some(name) = parts.next() else {
                return Err(Error::InvalidOrderBy(format!("empty item in '{raw}'")));
            };
            let dir = match parts.next().map(str::to_ascii_lowercase).as_deref() {
                None | Some("asc") => SortDir::Asc,
                Some("desc") => SortDir::Desc,
                Some(other) => {
                    return Err(Error::InvalidOrderBy(format!(
                        "unknown direction '{other}' for {name}"
                    )))
                }
            };
            if parts.next().is_some() {
                return Err(Error::InvalidOrderBy(item.trim().to_owned()));
            }

            let node = if entity.property_def(name).is_some() {
                OrderByNode::Property {
                    name: name.to_owned(),
                    dir,
                }
            } else if entity.is_open() {
                OrderByNode::OpenProperty {
                    name: name.to_owned(),
                    dir,
                }
            } else {
                return Err(Error::InvalidOrderBy(name.to_owned()));
            };
            out.push(node);
        }
        Ok(Self(out))
    }

    /// Direction per declared property; later nodes win on duplicates.
    #[must_use]
    pub fn directions(&self) -> HashMap<&str, SortDir> {
        directions(&self.0)
    }
}

/// Map each declared property of `nodes` to its direction.
#[must_use]
pub fn directions(nodes: &[OrderByNode]) -> HashMap<&str, SortDir> {
    nodes
        .iter()
        .filter_map(|n| match n {
            OrderByNode::Property { name, dir } => Some((name.as_str(), *dir)),
            OrderByNode::OpenProperty { .. } => None,
        })
        .collect()
}

impl From<Vec<OrderByNode>> for ODataOrderBy {
    fn from(nodes: Vec<OrderByNode>) -> Self {
        Self(nodes)
    }
}

// Display trait for human-readable orderby representation
impl std::fmt::Display for ODataOrderBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return write!(f, "(none)");
        }

        let formatted: Vec<String> = self
            .0
            .iter()
            .map(|node| {
                let dir_str = match node.dir() {
                    SortDir::Asc => "asc",
                    SortDir::Desc => "desc",
                };
                format!("{} {}", node.name(), dir_str)
            })
            .collect();

        write!(f, "{}", formatted.join(", "))
    }
}
