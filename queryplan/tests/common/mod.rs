//! Shared test harness: an in-memory record type and `StorageAccess` impl,
//! used by the end-to-end scenario tests (`spec.md` §8).

use std::sync::Arc;

use async_trait::async_trait;
use filter::collation::Collatable;
use filter::selection::Filterable;
use filter::{ComparisonOperator, FilterValues, PropertyPath, Value};
use futures::{stream, StreamExt};

use queryplan::exec::sorted::Orderable;
use queryplan::storage::{Boundary, IndexEntryQuery, QueryHints, RecordStream, SortBuffer, StorageAccess, StorageError};
use queryplan::types::{Direction, IndexDescriptor, Key, OrderingEntry, ReferenceProperty, TypeInfo};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rec {
    pub id: i64,
    pub name: String,
    pub age: i64,
}

impl Rec {
    pub fn new(id: i64, name: &str, age: i64) -> Self { Self { id, name: name.to_string(), age } }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(Value::I64(self.id)),
            "name" => Some(Value::from(self.name.clone())),
            "age" => Some(Value::I64(self.age)),
            _ => None,
        }
    }
}

impl Filterable for Rec {
    fn value(&self, name: &str) -> Option<Value> { self.field(name) }
}

impl Orderable for Rec {
    fn ordering_key(&self, path: &PropertyPath) -> Option<Value> { self.field(path.property()) }
}

pub struct UserTypeInfo {
    keys: Vec<Key>,
    indexes: Vec<IndexDescriptor>,
}

impl UserTypeInfo {
    pub fn new() -> Self {
        Self {
            keys: vec![Key::new("id", vec![PropertyPath::direct("id")])],
            indexes: vec![
                IndexDescriptor::new("id", vec![OrderingEntry::asc("id")], true, true),
                IndexDescriptor::new("name", vec![OrderingEntry::asc("name")], false, false),
                IndexDescriptor::new("age_name", vec![OrderingEntry::asc("age"), OrderingEntry::asc("name")], false, false),
            ],
        }
    }
}

impl TypeInfo for UserTypeInfo {
    fn type_name(&self) -> &str { "User" }
    fn has_property(&self, _path: &PropertyPath) -> bool { true }
    fn keys(&self) -> &[Key] { &self.keys }
    fn indexes(&self) -> &[IndexDescriptor] { &self.indexes }
    fn reference_properties(&self) -> &[ReferenceProperty] { &[] }
}

/// A naive in-memory `StorageAccess`: every `fetch_subset` call re-filters
/// and re-sorts the whole table by `index`. Fine for small fixtures; not a
/// model for a real storage backend.
pub struct MemoryStorage {
    records: Vec<Rec>,
}

impl MemoryStorage {
    pub fn new(records: Vec<Rec>) -> Arc<Self> { Arc::new(Self { records }) }
}

fn in_range(value: &Value, start_boundary: Boundary, start_value: &Option<Value>, end_boundary: Boundary, end_value: &Option<Value>) -> bool {
    if let Some(s) = start_value {
        let ord = value.partial_cmp_typed(s).expect("range comparison requires matching value types");
        let ok = match start_boundary {
            Boundary::Inclusive => ord != std::cmp::Ordering::Less,
            Boundary::Exclusive => ord == std::cmp::Ordering::Greater,
            Boundary::Open => true,
        };
        if !ok {
            return false;
        }
    }
    if let Some(e) = end_value {
        let ord = value.partial_cmp_typed(e).expect("range comparison requires matching value types");
        let ok = match end_boundary {
            Boundary::Inclusive => ord != std::cmp::Ordering::Greater,
            Boundary::Exclusive => ord == std::cmp::Ordering::Less,
            Boundary::Open => true,
        };
        if !ok {
            return false;
        }
    }
    true
}

#[async_trait]
impl StorageAccess<Rec> for MemoryStorage {
    fn storable_type(&self) -> &str { "User" }

    fn all_indexes(&self) -> &[IndexDescriptor] { &[] }

    async fn count_all(&self) -> Result<Option<u64>, StorageError> { Ok(Some(self.records.len() as u64)) }

    async fn fetch_all(&self) -> Result<RecordStream<Rec>, StorageError> {
        Ok(stream::iter(self.records.clone().into_iter().map(Ok)).boxed())
    }

    async fn fetch_subset(
        &self,
        index: &IndexDescriptor,
        identity_values: &FilterValues,
        start_boundary: Boundary,
        start_value: Option<Value>,
        end_boundary: Boundary,
        end_value: Option<Value>,
        reverse_range: bool,
        reverse_order: bool,
    ) -> Result<RecordStream<Rec>, StorageError> {
        let mut matched: Vec<Rec> = self
            .records
            .iter()
            .filter(|r| {
                for (i, entry) in index.properties.iter().take(identity_values.len()).enumerate() {
                    let value = r.field(entry.path.property()).expect("test fixture covers every index property");
                    if Some(&value) != identity_values.get(i) {
                        return false;
                    }
                }
                if index.properties.len() > identity_values.len() {
                    let range_prop = &index.properties[identity_values.len()];
                    let value = r.field(range_prop.path.property()).expect("test fixture covers every index property");
                    let (sb, sv, eb, ev) =
                        if reverse_range { (end_boundary, end_value.clone(), start_boundary, start_value.clone()) } else { (start_boundary, start_value.clone(), end_boundary, end_value.clone()) };
                    if !in_range(&value, sb, &sv, eb, &ev) {
                        return false;
                    }
                }
                true
            })
            .cloned()
            .collect();

        matched.sort_by(|a, b| {
            for entry in &index.properties {
                let (av, bv) = (a.field(entry.path.property()).unwrap(), b.field(entry.path.property()).unwrap());
                let ord = av.compare(&bv);
                let ord = if entry.direction == Direction::Descending { ord.reverse() } else { ord };
                if ord != std::cmp::Ordering::Equal {
                    return ord;
                }
            }
            std::cmp::Ordering::Equal
        });
        if reverse_order {
            matched.reverse();
        }

        Ok(stream::iter(matched.into_iter().map(Ok)).boxed())
    }

    async fn fetch_from_index_entry_query(&self, _index: &IndexDescriptor, _bound_query: IndexEntryQuery) -> Result<RecordStream<Rec>, StorageError> {
        unreachable!("test fixture never offers covering-index access")
    }

    fn index_entry_query(
        &self,
        _index: &IndexDescriptor,
        _identity_values: &FilterValues,
        _start_boundary: Boundary,
        _start_value: Option<Value>,
        _end_boundary: Boundary,
        _end_value: Option<Value>,
        _covering_filter: &filter::Filter,
    ) -> Option<IndexEntryQuery> {
        None
    }

    fn create_sort_buffer(&self) -> SortBuffer { SortBuffer(Box::new(Vec::<Rec>::new())) }
}

pub fn eq(path: &str, value: impl Into<Value>) -> filter::Filter {
    filter::Filter::Compare(filter::PropertyFilter::eq(path, value))
}

pub fn cmp(path: &str, op: ComparisonOperator, value: impl Into<Value>) -> filter::Filter {
    filter::Filter::Compare(filter::PropertyFilter::cmp(path, op, value))
}

pub fn none_hints() -> QueryHints { QueryHints::none() }
