//! `QueryEngine` / `StandardQuery` (`spec.md` §4.8, "Public query surface,
//! cache, factory"): the facade an embedder actually calls. A
//! `StandardQuery` is a bound filter plus ordering plus hints; it builds
//! (or reuses, via the engine's plan cache) an executor tree on first
//! fetch.

use std::sync::Arc;

use filter::selection::Filterable;
use filter::{BoundFilter, Filter};
use futures::StreamExt;
use tracing::debug;

use crate::analyzer::{ForeignCatalog, IndexedQueryAnalyzer, JoinResolver, NoJoins, UnionPlan, UnionQueryAnalyzer};
use crate::cache::PlanCache;
use crate::error::PlanError;
use crate::exec::sorted::{Orderable, Sorted};
use crate::exec::{Empty, Executor, Union};
use crate::ordering::OrderingList;
use crate::storage::{QueryHints, RecordStream, StorageAccess, StorageError};
use crate::types::{OrderingEntry, TypeInfo};

const DEFAULT_CACHE_CAPACITY: usize = 256;

struct Plan<S> {
    executor: Arc<dyn Executor<S>>,
    ordering: OrderingList,
}

/// Builds and caches plans for one record type. One instance should be
/// shared (via `Arc`) across every `StandardQuery` over that type, so the
/// plan cache actually amortizes repeat queries (`spec.md` §5).
pub struct QueryEngine<S> {
    type_info: Arc<dyn TypeInfo>,
    support: Arc<dyn StorageAccess<S>>,
    analyzer: UnionQueryAnalyzer,
    join_resolver: Arc<dyn JoinResolver<S>>,
    cache: PlanCache<Plan<S>>,
}

impl<S> QueryEngine<S>
where
    S: Filterable + Orderable + Eq + Clone + Send + Sync + 'static,
{
    pub fn new(type_info: Arc<dyn TypeInfo>, support: Arc<dyn StorageAccess<S>>, catalog: Arc<dyn ForeignCatalog>) -> Arc<Self> {
        Self::with_cache_capacity(type_info, support, catalog, Arc::new(NoJoins), DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_join_resolver(
        type_info: Arc<dyn TypeInfo>,
        support: Arc<dyn StorageAccess<S>>,
        catalog: Arc<dyn ForeignCatalog>,
        join_resolver: Arc<dyn JoinResolver<S>>,
    ) -> Arc<Self> {
        Self::with_cache_capacity(type_info, support, catalog, join_resolver, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_cache_capacity(
        type_info: Arc<dyn TypeInfo>,
        support: Arc<dyn StorageAccess<S>>,
        catalog: Arc<dyn ForeignCatalog>,
        join_resolver: Arc<dyn JoinResolver<S>>,
        cache_capacity: usize,
    ) -> Arc<Self> {
        let indexed = IndexedQueryAnalyzer::new(type_info.clone(), catalog);
        let analyzer = UnionQueryAnalyzer::new(type_info.clone(), indexed);
        Arc::new(Self { type_info, support, analyzer, join_resolver, cache: PlanCache::new(cache_capacity) })
    }

    pub fn type_info(&self) -> &Arc<dyn TypeInfo> { &self.type_info }

    /// Builds a `StandardQuery` over `filter`/`ordering`/`hints`. The plan
    /// itself isn't built until the first `fetch`/`count`/`load_one` call.
    pub fn query(self: &Arc<Self>, filter: BoundFilter, ordering: Vec<OrderingEntry>, hints: QueryHints) -> StandardQuery<S> {
        StandardQuery { engine: self.clone(), filter, ordering, hints }
    }

    fn plan(&self, filter: &Filter, ordering: &[OrderingEntry], hints: &QueryHints) -> Result<Arc<Plan<S>>, PlanError<StorageError>> {
        if let Some(cached) = self.cache.get(filter, ordering, hints) {
            return Ok(cached);
        }

        let total_params = filter::param_count(filter);
        let union_plan = self.analyzer.analyze(filter, ordering, hints, total_params).map_err(PlanError::widen)?;
        let type_name = self.type_info.type_name();

        let built = match union_plan {
            UnionPlan::Empty => {
                debug!(type_name, "plan: empty (filter reduces to closed)");
                Plan { executor: Arc::new(Empty::new(type_name)), ordering: OrderingList::empty(type_name.to_string()) }
            }
            UnionPlan::Single(result) => {
                let ordering = result.advertised_ordering(type_name);
                let executor = self.build_subplan(&result)?;
                Plan { executor, ordering }
            }
            UnionPlan::Union { subplans, total_ordering } => {
                let total_ordering = OrderingList::of(type_name.to_string(), total_ordering);
                let children = subplans
                    .iter()
                    .map(|r| self.build_subplan(r).map(|executor| ensure_total_ordering(executor, &total_ordering)))
                    .collect::<Result<Vec<_>, _>>()?;
                let executor = Arc::new(Union::new(children, total_ordering.clone()).map_err(PlanError::widen)?);
                Plan { executor, ordering: total_ordering }
            }
        };

        let built = Arc::new(built);
        self.cache.insert(filter, ordering, hints, built.clone());
        Ok(built)
    }

    fn build_subplan(&self, result: &crate::analyzer::AnalysisResult) -> Result<Arc<dyn Executor<S>>, PlanError<StorageError>> {
        if result.is_foreign() {
            self.join_resolver.build(result)
        } else {
            result.create_executor(self.type_info.type_name(), self.support.clone())
        }
    }
}

/// Wraps `executor` in a final `Sorted` stage if its own ordering falls
/// short of `total_ordering` — e.g. `enforce_total_ordering` appended key
/// properties beyond what this disjunct's own analysis produced. `Union`
/// requires every child to expose exactly `total_ordering` (`spec.md` §4.7
/// "All children must expose the same ordering, else constructor fails").
fn ensure_total_ordering<S>(executor: Arc<dyn Executor<S>>, total_ordering: &OrderingList) -> Arc<dyn Executor<S>>
where
    S: Orderable + Send + Sync + 'static,
{
    let current = executor.ordering();
    if &current == total_ordering {
        return executor;
    }
    let current_entries = current.entries();
    let missing: Vec<OrderingEntry> =
        total_ordering.entries().into_iter().filter(|e| !current_entries.iter().any(|c| c.path == e.path)).collect();
    Arc::new(Sorted::new(executor, current_entries, missing))
}

/// One filter/ordering/hints combination over a record type, built lazily
/// against its `QueryEngine` (`spec.md` §4.8).
pub struct StandardQuery<S> {
    engine: Arc<QueryEngine<S>>,
    filter: BoundFilter,
    ordering: Vec<OrderingEntry>,
    hints: QueryHints,
}

impl<S> StandardQuery<S>
where
    S: Filterable + Orderable + Eq + Clone + Send + Sync + 'static,
{
    fn plan(&self) -> Result<Arc<Plan<S>>, PlanError<StorageError>> {
        if !self.filter.is_bound() {
            return Err(PlanError::Unbound);
        }
        self.engine.plan(&self.filter.filter, &self.ordering, &self.hints)
    }

    /// The ordering this query's executor tree will actually deliver.
    pub fn ordering(&self) -> Result<OrderingList, PlanError<StorageError>> { Ok(self.plan()?.ordering.clone()) }

    pub async fn fetch(&self) -> Result<RecordStream<S>, PlanError<StorageError>> {
        let plan = self.plan()?;
        plan.executor.fetch(&self.filter.values).await
    }

    pub async fn count(&self) -> Result<u64, PlanError<StorageError>> {
        let plan = self.plan()?;
        if let Some(n) = plan.executor.count(&self.filter.values).await? {
            return Ok(n);
        }
        let mut stream = plan.executor.fetch(&self.filter.values).await?;
        let mut n = 0u64;
        while stream.next().await.transpose().map_err(PlanError::Storage)?.is_some() {
            n += 1;
        }
        Ok(n)
    }

    /// `spec.md` §4.7 failure table: fails with `NotFound`/`Multiple` if
    /// the cursor doesn't yield exactly one record.
    pub async fn load_one(&self) -> Result<S, PlanError<StorageError>> {
        let mut stream = self.fetch().await?;
        let first = stream.next().await.transpose().map_err(PlanError::Storage)?.ok_or(PlanError::NotFound)?;
        if stream.next().await.transpose().map_err(PlanError::Storage)?.is_some() {
            return Err(PlanError::Multiple);
        }
        Ok(first)
    }

    /// Resolves the single record a delete-by-query should target, with
    /// the same `NotFound`/`Multiple` semantics as `load_one` (`spec.md`
    /// §4.7). Actually removing it from storage is the embedder's own
    /// mutation path — outside this crate's scope (`spec.md` §1: "the
    /// concrete record model" is an external collaborator).
    pub async fn delete_one(&self) -> Result<S, PlanError<StorageError>> { self.load_one().await }

    pub fn print_plan(&self) -> Result<String, PlanError<StorageError>> { Ok(self.plan()?.executor.print_plan(0)) }
}
