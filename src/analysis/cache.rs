//! Shared per-method graph cache.
//!
//! Graphs are immutable once built, so the cache hands out `Arc<ControlFlowGraph>` and
//! any number of threads may query the same method concurrently. The derived graphs
//! (ACFG, post-dominator tree, control-dependence graph) are cached inside each
//! [`ControlFlowGraph`] and shared along with it.

use std::sync::Arc;

use dashmap::DashMap;
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::{
    analysis::{cfg::ControlFlowGraph, config::AnalysisConfig, method::InstructionSource},
    assembly::MethodIdentifier,
    Result,
};

/// Concurrent cache of control-flow graphs keyed by method.
///
/// # Examples
///
/// ```rust
/// use bytescope::prelude::*;
///
/// let method = MethodIdentifier::new("com/example/Foo", "run", "()V")?;
/// let mut asm = MethodAssembler::new(method.clone());
/// asm.emit(Operation::Return(None))?;
/// let bodies = vec![asm.finish()?];
///
/// let cache = AnalysisCache::new();
/// let cfg = cache.get_or_analyze(&bodies, &method)?.expect("method is known");
/// assert_eq!(cfg.node_count(), 3);
/// assert_eq!(cache.len(), 1);
/// # Ok::<(), bytescope::Error>(())
/// ```
pub struct AnalysisCache {
    graphs: DashMap<MethodIdentifier, Arc<ControlFlowGraph>>,
    config: AnalysisConfig,
}

impl AnalysisCache {
    /// Creates an empty cache using the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(AnalysisConfig::default())
    }

    /// Creates an empty cache that builds graphs with `config`.
    #[must_use]
    pub fn with_config(config: AnalysisConfig) -> Self {
        AnalysisCache {
            graphs: DashMap::new(),
            config,
        }
    }

    /// The configuration graphs are built with.
    #[must_use]
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Returns the cached graph of `method`, if it was analysed before.
    #[must_use]
    pub fn get(&self, method: &MethodIdentifier) -> Option<Arc<ControlFlowGraph>> {
        self.graphs.get(method).map(|entry| Arc::clone(entry.value()))
    }

    /// Returns the graph of `method`, building and caching it on first request.
    ///
    /// Returns `Ok(None)` if `source` does not know the method. When two threads miss
    /// on the same method concurrently both build the graph and the first insertion wins.
    ///
    /// # Errors
    ///
    /// Propagates failures of [`ControlFlowGraph::for_method`]; failed analyses are not
    /// cached.
    pub fn get_or_analyze<S>(
        &self,
        source: &S,
        method: &MethodIdentifier,
    ) -> Result<Option<Arc<ControlFlowGraph>>>
    where
        S: InstructionSource + ?Sized,
    {
        if let Some(cfg) = self.get(method) {
            trace!(%method, "graph cache hit");
            return Ok(Some(cfg));
        }

        let Some(body) = source.method_body(method) else {
            trace!(%method, "method unknown to instruction source");
            return Ok(None);
        };

        trace!(%method, "graph cache miss");
        let cfg = Arc::new(body.analyze(&self.config)?);
        let cached = self
            .graphs
            .entry(method.clone())
            .or_insert(cfg)
            .value()
            .clone();
        Ok(Some(cached))
    }

    /// Analyses every method of `source`, in the order [`InstructionSource::methods`]
    /// reports them.
    ///
    /// Methods are analysed in parallel when [`AnalysisConfig::parallel`] is set.
    ///
    /// # Errors
    ///
    /// Returns the first failure in method order; graphs built before the failure stay
    /// cached.
    pub fn analyze_all<S>(&self, source: &S) -> Result<Vec<Arc<ControlFlowGraph>>>
    where
        S: InstructionSource + ?Sized,
    {
        let methods = source.methods();
        debug!(
            methods = methods.len(),
            parallel = self.config.parallel,
            "analysing methods"
        );

        let analyze = |method: &&MethodIdentifier| -> Result<Option<Arc<ControlFlowGraph>>> {
            self.get_or_analyze(source, method)
        };
        let results: Vec<Result<Option<Arc<ControlFlowGraph>>>> = if self.config.parallel {
            methods.par_iter().map(analyze).collect()
        } else {
            methods.iter().map(analyze).collect()
        };

        let graphs = results
            .into_iter()
            .filter_map(Result::transpose)
            .collect::<Result<Vec<_>>>()?;
        debug!(graphs = graphs.len(), cached = self.graphs.len(), "analysed methods");
        Ok(graphs)
    }

    /// Removes the graph of `method` from the cache.
    pub fn invalidate(&self, method: &MethodIdentifier) -> Option<Arc<ControlFlowGraph>> {
        self.graphs.remove(method).map(|(_, cfg)| cfg)
    }

    /// Number of cached graphs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }

    /// Drops every cached graph.
    pub fn clear(&self) {
        self.graphs.clear();
    }
}

impl Default for AnalysisCache {
    fn default() -> Self {
        Self::new()
    }
}
