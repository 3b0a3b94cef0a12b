//! The predicate AST consumed by the planner. Construction is purely
//! programmatic (combinators below) — there is no string/SQL surface
//! (`spec.md` Non-goals: "No SQL surface; the input is a typed predicate
//! value").

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A chained property reference, e.g. `order.customerId` is
/// `PropertyPath(["order", "customerId"])`. A path of length 1 is a direct
/// property; anything longer traverses reference properties, with every
/// element but the last naming a reference (join) property.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PropertyPath(pub Vec<String>);

impl PropertyPath {
    pub fn direct(name: impl Into<String>) -> Self { Self(vec![name.into()]) }

    pub fn chain<I, S>(hops: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(hops.into_iter().map(Into::into).collect())
    }

    /// True for a 0-hop ("direct") property, per `spec.md` §3 "Property path".
    pub fn is_direct(&self) -> bool { self.0.len() == 1 }

    /// The first hop (the nearest reference property), if this path crosses one.
    pub fn first_hop(&self) -> Option<&str> {
        if self.0.len() > 1 { Some(self.0[0].as_str()) } else { None }
    }

    /// The final scalar property name.
    pub fn property(&self) -> &str { self.0.last().expect("PropertyPath is never empty") }

    /// The path with its leading hop stripped, translating into the
    /// referenced type's namespace. `None` if this path is direct.
    pub fn strip_first_hop(&self) -> Option<PropertyPath> {
        if self.0.len() > 1 { Some(PropertyPath(self.0[1..].to_vec())) } else { None }
    }

    /// Prepend a chain prefix (used when building a virtual index across a join).
    pub fn with_prefix(&self, prefix: &[String]) -> PropertyPath {
        let mut v = prefix.to_vec();
        v.extend(self.0.iter().cloned());
        PropertyPath(v)
    }

    pub fn starts_with_hop(&self, hop: &str) -> bool { self.first_hop() == Some(hop) }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0.join(".")) }
}

impl<S: Into<String>> From<S> for PropertyPath {
    fn from(s: S) -> Self {
        let s = s.into();
        PropertyPath(s.split('.').map(|p| p.to_string()).collect())
    }
}

/// `spec.md` §3: "An atomic predicate `prop OP value`... OP ∈ {EQ, NE, LT,
/// LE, GT, GE, EXISTS}".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOperator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Exists,
}

impl ComparisonOperator {
    pub fn is_range(self) -> bool { matches!(self, Self::Lt | Self::Le | Self::Gt | Self::Ge) }
    pub fn is_range_start(self) -> bool { matches!(self, Self::Gt | Self::Ge) }
    pub fn is_range_end(self) -> bool { matches!(self, Self::Lt | Self::Le) }
    pub fn is_inclusive(self) -> bool { matches!(self, Self::Ge | Self::Le) }

    /// The operator whose comparison is true exactly when this one is
    /// false, for folding a negation into a leaf comparison instead of
    /// leaving a `Not` node around it. `None` for `Exists`, which has no
    /// single inverse operator in `spec.md` §3's operator set.
    pub fn negate(self) -> Option<Self> {
        match self {
            Self::Eq => Some(Self::Ne),
            Self::Ne => Some(Self::Eq),
            Self::Lt => Some(Self::Ge),
            Self::Le => Some(Self::Gt),
            Self::Gt => Some(Self::Le),
            Self::Ge => Some(Self::Lt),
            Self::Exists => None,
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Exists => "EXISTS",
        };
        write!(f, "{s}")
    }
}

/// The right-hand side of a comparison: either a bound parameter (filled in
/// later via [`crate::bound::FilterValues`]) or an embedded constant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expr {
    Const(Value),
    Param(usize),
}

/// An atomic property filter, `prop OP value`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyFilter {
    pub path: PropertyPath,
    pub op: ComparisonOperator,
    /// `None` only for EXISTS, which takes no value.
    pub expr: Option<Expr>,
}

impl PropertyFilter {
    pub fn eq(path: impl Into<PropertyPath>, value: impl Into<Value>) -> Self {
        Self { path: path.into(), op: ComparisonOperator::Eq, expr: Some(Expr::Const(value.into())) }
    }
    pub fn cmp(path: impl Into<PropertyPath>, op: ComparisonOperator, value: impl Into<Value>) -> Self {
        Self { path: path.into(), op, expr: Some(Expr::Const(value.into())) }
    }
    pub fn param(path: impl Into<PropertyPath>, op: ComparisonOperator, index: usize) -> Self {
        Self { path: path.into(), op, expr: Some(Expr::Param(index)) }
    }
    pub fn exists(path: impl Into<PropertyPath>) -> Self {
        Self { path: path.into(), op: ComparisonOperator::Exists, expr: None }
    }
}

/// A boolean combination of property filters. `spec.md` §3: "open (always
/// true), closed (always false), AND, OR". `Not` is included so callers can
/// build natural boolean expressions; [`crate::reduce::reduce`] always
/// eliminates it (pushing negation to the leaves) before planning, since the
/// planner's DNF split assumes no `Not` nodes remain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Filter {
    Open,
    Closed,
    Compare(PropertyFilter),
    And(Box<Filter>, Box<Filter>),
    Or(Box<Filter>, Box<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    pub fn is_open(&self) -> bool { matches!(self, Filter::Open) }
    pub fn is_closed(&self) -> bool { matches!(self, Filter::Closed) }

    pub fn and(self, other: Filter) -> Filter {
        match (&self, &other) {
            (Filter::Open, _) => other,
            (_, Filter::Open) => self,
            (Filter::Closed, _) | (_, Filter::Closed) => Filter::Closed,
            _ => Filter::And(Box::new(self), Box::new(other)),
        }
    }

    pub fn or(self, other: Filter) -> Filter {
        match (&self, &other) {
            (Filter::Closed, _) => other,
            (_, Filter::Closed) => self,
            (Filter::Open, _) | (_, Filter::Open) => Filter::Open,
            _ => Filter::Or(Box::new(self), Box::new(other)),
        }
    }

    pub fn not(self) -> Filter {
        match self {
            Filter::Open => Filter::Closed,
            Filter::Closed => Filter::Open,
            other => Filter::Not(Box::new(other)),
        }
    }
}

impl From<PropertyFilter> for Filter {
    fn from(pf: PropertyFilter) -> Self { Filter::Compare(pf) }
}
