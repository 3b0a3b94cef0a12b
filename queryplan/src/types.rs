//! Record-type introspection, consumed via the `TypeInfo` trait (`spec.md`
//! §3 "Record type (S)"). The catalog of properties, keys, indexes, and
//! reference (join) properties is supplied by the embedder; this crate
//! treats it as a declared interface, not something it builds.

use filter::PropertyPath;
use std::fmt;

/// Sort direction of one index position, or a requested-but-unconstrained
/// ordering entry (`spec.md` §3 "Ordering entry").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Ascending,
    Descending,
    Unspecified,
}

impl Direction {
    pub fn reversed(self) -> Direction {
        match self {
            Direction::Ascending => Direction::Descending,
            Direction::Descending => Direction::Ascending,
            Direction::Unspecified => Direction::Unspecified,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Ascending => write!(f, "+"),
            Direction::Descending => write!(f, "-"),
            Direction::Unspecified => write!(f, "?"),
        }
    }
}

/// One (property path, direction) pair within an index or ordering list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderingEntry {
    pub path: PropertyPath,
    pub direction: Direction,
}

impl OrderingEntry {
    pub fn new(path: impl Into<PropertyPath>, direction: Direction) -> Self { Self { path: path.into(), direction } }
    pub fn asc(path: impl Into<PropertyPath>) -> Self { Self::new(path, Direction::Ascending) }
    pub fn desc(path: impl Into<PropertyPath>) -> Self { Self::new(path, Direction::Descending) }
}

impl fmt::Display for OrderingEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}{}", self.direction, self.path) }
}

/// A named set of property paths identifying records uniquely (the primary
/// key) or nearly so (an alternate key).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key {
    pub name: String,
    pub properties: Vec<PropertyPath>,
}

impl Key {
    pub fn new(name: impl Into<String>, properties: Vec<PropertyPath>) -> Self { Self { name: name.into(), properties } }
}

/// An ordered sequence of (property path, direction), with `unique` and
/// `clustered` flags (`spec.md` §3).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexDescriptor {
    pub name: String,
    pub properties: Vec<OrderingEntry>,
    pub unique: bool,
    pub clustered: bool,
}

impl IndexDescriptor {
    pub fn new(name: impl Into<String>, properties: Vec<OrderingEntry>, unique: bool, clustered: bool) -> Self {
        Self { name: name.into(), properties, unique, clustered }
    }

    pub fn property_count(&self) -> usize { self.properties.len() }

    /// Position of `path` among this index's properties, if present.
    pub fn position_of(&self, path: &PropertyPath) -> Option<usize> { self.properties.iter().position(|e| &e.path == path) }
}

/// One "internal property(s) = external property(s)" reference from a
/// record type to another. A query may traverse this to reach a foreign
/// index (`spec.md` §4.5).
#[derive(Debug, Clone)]
pub struct ReferenceProperty {
    /// The name of the hop as it appears in a chained property path, e.g.
    /// `order` in `order.customerId`.
    pub name: String,
    /// The referenced type's name, used to look up its `TypeInfo`.
    pub referenced_type: String,
    /// Internal-key property paths, in the same order as `external_keys`.
    pub internal_keys: Vec<PropertyPath>,
    /// The referenced type's property paths those internal keys equal.
    pub external_keys: Vec<PropertyPath>,
    /// True for an outer join (the referenced record may not exist);
    /// `spec.md` §4.5 excludes virtual indexes whose chain crosses one.
    pub outer_join: bool,
}

/// Catalog access for a single record type S (`spec.md` §3, consumed as an
/// external collaborator — out of scope for this crate to construct).
pub trait TypeInfo: Send + Sync {
    /// The type's name, used for index catalog lookups and error messages.
    fn type_name(&self) -> &str;

    /// True if `path` names a property this type actually has (including
    /// across a reference chain, checked hop by hop).
    fn has_property(&self, path: &PropertyPath) -> bool;

    fn keys(&self) -> &[Key];

    fn primary_key(&self) -> &Key { &self.keys()[0] }

    fn indexes(&self) -> &[IndexDescriptor];

    fn reference_properties(&self) -> &[ReferenceProperty];

    fn reference_property(&self, hop: &str) -> Option<&ReferenceProperty> {
        self.reference_properties().iter().find(|r| r.name == hop)
    }
}
