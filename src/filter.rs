//! Filter expressions in the Icinga 2 DSL
//!
//! The API's `filter` parameter takes an expression in the Icinga 2
//! configuration language. Instead of gluing strings together at every call
//! site, expressions are assembled from a handful of primitives and rendered
//! once through [`std::fmt::Display`].
//!
//! ```text
//! match("web1", host.name) && match("HTTP", service.name)
//! (match("web1", host.name)) || (match("web2", host.name))
//! "prod" in host.groups
//! ```

use std::fmt;

use crate::item::{Item, ItemKind};

/// Object attributes a filter can refer to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    HostName,
    ServiceName,
    HostGroups,
    ServiceGroups,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::HostName => "host.name",
            Field::ServiceName => "service.name",
            Field::HostGroups => "host.groups",
            Field::ServiceGroups => "service.groups",
        }
    }

    /// The `groups` attribute of the given object kind
    pub fn groups_of(kind: ItemKind) -> Self {
        match kind {
            ItemKind::Host => Field::HostGroups,
            ItemKind::Service => Field::ServiceGroups,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// `match("<pattern>", <field>)`
    Match { pattern: String, field: Field },

    /// `"<value>" in <field>`
    Member { value: String, field: Field },

    /// Operands joined by `&&`, with nested `Or`s parenthesized
    And(Vec<Filter>),

    /// Parenthesized operands joined by `||`
    Or(Vec<Filter>),
}

impl Filter {
    pub fn matches(pattern: impl Into<String>, field: Field) -> Self {
        Filter::Match {
            pattern: pattern.into(),
            field,
        }
    }

    pub fn member(value: impl Into<String>, field: Field) -> Self {
        Filter::Member {
            value: value.into(),
            field,
        }
    }

    /// Group membership filter for a fetch restricted to `group`
    pub fn in_group(kind: ItemKind, group: impl Into<String>) -> Self {
        Filter::member(group, Field::groups_of(kind))
    }

    pub fn and(self, other: Filter) -> Self {
        match self {
            Filter::And(mut operands) => {
                operands.push(other);
                Filter::And(operands)
            }
            first => Filter::And(vec![first, other]),
        }
    }

    /// Selects every object of the given items
    pub fn any_of<'a>(items: impl IntoIterator<Item = &'a Item>) -> Self {
        Filter::Or(items.into_iter().map(Item::filter).collect())
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Match { pattern, field } => write!(f, "match({}, {field})", quote(pattern)),
            Filter::Member { value, field } => write!(f, "{} in {field}", quote(value)),
            Filter::And(operands) => {
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" && ")?;
                    }
                    match operand {
                        Filter::Or(_) => write!(f, "({operand})")?,
                        _ => write!(f, "{operand}")?,
                    }
                }
                Ok(())
            }
            Filter::Or(operands) => {
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" || ")?;
                    }
                    write!(f, "({operand})")?;
                }
                Ok(())
            }
        }
    }
}

/// Render `value` as a double-quoted DSL string literal
pub fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '"' => quoted.push_str("\\\""),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            _ => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}
