//! Memory Service - the orchestrator
//!
//! Wires the embedding provider, the three stores, the extractors, and the
//! deduplicator into the async API surface: remember, recall, correct,
//! forget, stats, export/import.
//!
//! Writes (ingest, correction, forget, import) serialize behind a per-store
//! ingest lock so the dedup check-then-insert never races a concurrent
//! competitor. Reads run concurrently; every store is WAL-backed so readers
//! are never blocked by the writer.

use chrono::{NaiveDate, Utc};
use lru::LruCache;
use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Mutex as StdMutex;
use std::time::Instant;
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

use crate::config::{EngramConfig, SearchConfig};
use crate::dedup::Deduplicator;
use crate::embeddings::{EmbeddingError, EmbeddingProvider};
use crate::extract::{EntityExtractor, ExtractionMode};
use crate::memory::{
    BatchStoreResult, ComponentHealth, HealthStatus, MemoryEntry, MemoryInput, MemoryStats,
    RecallOptions, RecallOutcome, RecallResult, RetrievalMethod, StoreResult,
};
use crate::portability::{
    merge_entries, needs_reembedding, ConflictResolution, EmbeddingMetadata, ExportFilter,
    ImportSummary, PortableBundle, ReembeddingStrategy,
};
use crate::search::{normalize_bm25, weighted_merge};
use crate::storage::{GraphStore, KeywordStore, StorageError, VectorFilters, VectorStore};
use crate::temporal::TemporalExtractor;

/// Candidate pool multiplier over the requested limit
const CANDIDATE_MULTIPLIER: usize = 3;

/// Relevance assigned to candidates that arrive via graph expansion
const GRAPH_RELEVANCE_FLOOR: f32 = 0.3;

/// How far recall expansion walks the entity graph from a query entity.
/// Two hops reaches a dependency's dependency (service -> database -> pooler)
/// without flooding the pool.
const EXPANSION_HOPS: usize = 2;

/// Hard ceiling on the recall candidate pool
const MAX_CANDIDATE_POOL: usize = 200;

/// Batch ingest size bounds
const MAX_BATCH_SIZE: usize = 1000;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Service-level error classification
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// Input violates a stated precondition; never retried
    #[error("invalid input: {0}")]
    Invalid(String),
    /// The referenced memory does not exist
    #[error("memory not found: {0}")]
    NotFound(String),
    /// Embedding provider failure
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    /// Disk or index failure
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Service result type
pub type Result<T> = std::result::Result<T, MemoryError>;

// ============================================================================
// MEMORY SERVICE
// ============================================================================

/// The per-agent memory store
///
/// All methods take `&self`; the service is `Send + Sync` and meant to be
/// shared behind an `Arc` by whatever transport hosts it.
pub struct MemoryService {
    instance_id: String,
    temporal: TemporalExtractor,
    dedup: Deduplicator,
    search_cfg: SearchConfig,
    ingest_lock: AsyncMutex<()>,
    query_cache: StdMutex<LruCache<String, Vec<f32>>>,
    // Fields drop in declaration order, so the components built on top of
    // the embedding provider are declared before it: teardown runs in
    // reverse order of construction (extractors, then stores, then provider)
    query_extractor: EntityExtractor,
    ingest_extractor: EntityExtractor,
    graph: Option<GraphStore>,
    keyword: Option<KeywordStore>,
    vector: VectorStore,
    embedding: EmbeddingProvider,
}

impl MemoryService {
    /// Build the full service from configuration.
    ///
    /// Construction order: embedding provider, then the stores, then the
    /// extractors. The store directory defaults to the platform data
    /// directory when `db_path` is unset.
    pub fn from_config(config: EngramConfig) -> Result<Self> {
        let problems = config.validate();
        if !problems.is_empty() {
            return Err(MemoryError::Invalid(problems.join("; ")));
        }

        let embedding = EmbeddingProvider::from_config(&config.embedding)?;

        let dir = match config.db_path {
            Some(path) => path,
            None => default_data_dir()?,
        };
        std::fs::create_dir_all(&dir).map_err(StorageError::Io)?;

        let vector = VectorStore::open(&dir.join("memories.db"), embedding.dimensions())?;
        let keyword = if config.search.hybrid {
            Some(KeywordStore::open(&dir.join("keyword.db"))?)
        } else {
            None
        };
        let graph = if config.search.graph_enabled {
            Some(GraphStore::open(&dir.join("graph.db"))?)
        } else {
            None
        };

        let mode = if config.search.lazy_extraction {
            ExtractionMode::Lazy
        } else {
            ExtractionMode::Eager
        };
        let (ingest_extractor, query_extractor) = match mode {
            ExtractionMode::Lazy => (EntityExtractor::pattern(), EntityExtractor::hybrid()),
            ExtractionMode::Eager => (EntityExtractor::hybrid(), EntityExtractor::hybrid()),
        };

        Ok(Self {
            instance_id: config.instance_id,
            vector,
            keyword,
            graph,
            embedding,
            ingest_extractor,
            query_extractor,
            temporal: TemporalExtractor::new(),
            dedup: Deduplicator::new(config.search.dup_threshold),
            search_cfg: config.search,
            ingest_lock: AsyncMutex::new(()),
            query_cache: StdMutex::new(LruCache::new(
                NonZeroUsize::new(100).expect("100 is non-zero"),
            )),
        })
    }

    /// Identifier of the agent instance this store belongs to
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// The wired embedding provider
    pub fn embedding_provider(&self) -> &EmbeddingProvider {
        &self.embedding
    }

    /// The entry store
    pub fn vector_store(&self) -> &VectorStore {
        &self.vector
    }

    /// The keyword index, when hybrid search is configured
    pub fn keyword_store(&self) -> Option<&KeywordStore> {
        self.keyword.as_ref()
    }

    /// The entity graph, when graph indexing is configured
    pub fn graph_store(&self) -> Option<&GraphStore> {
        self.graph.as_ref()
    }

    // ========================================================================
    // REMEMBER
    // ========================================================================

    /// Store a new memory.
    ///
    /// A near-duplicate of an existing memory either fails with the original
    /// id (`auto_reject_duplicates = true`) or is stored with the original id
    /// attached as an advisory.
    pub async fn remember(&self, input: MemoryInput) -> Result<StoreResult> {
        validate_content(&input.content)?;

        let embedding = self.embedding.embed(&input.content).await?;

        // Dedup check and insert must not interleave with a competing ingest
        let _guard = self.ingest_lock.lock().await;

        let nearest = self.vector.nearest(&embedding)?;
        let mut duplicate_of = None;
        if let Some(found) = self.dedup.check(&input.content, nearest.as_ref()) {
            if self.search_cfg.auto_reject_duplicates {
                return Ok(StoreResult::duplicate(found.original_id));
            }
            duplicate_of = Some(found.original_id);
        }

        let now = Utc::now();
        let entry = MemoryEntry {
            id: Uuid::new_v4().to_string(),
            temporal_facts: self.temporal.extract(&input.content),
            content: input.content,
            embedding,
            source_instance: self.instance_id.clone(),
            source_type: input.source_type,
            created_at: input.created_at.unwrap_or(now),
            updated_at: now,
            tags: input.tags,
            context: input.context,
            confidence: input.confidence.unwrap_or(1.0).clamp(0.0, 1.0),
            supersedes: None,
            superseded_by: None,
        };

        self.persist_entry(&entry)?;

        let mut result = StoreResult::stored(entry.id);
        result.duplicate_of = duplicate_of;
        Ok(result)
    }

    /// Store a batch of memories. Items are fully independent: one item's
    /// duplicate rejection or failure never fails the batch.
    pub async fn remember_batch(&self, inputs: Vec<MemoryInput>) -> Result<BatchStoreResult> {
        if inputs.is_empty() || inputs.len() > MAX_BATCH_SIZE {
            return Err(MemoryError::Invalid(format!(
                "batch size must be in [1, {MAX_BATCH_SIZE}], got {}",
                inputs.len()
            )));
        }

        let total = inputs.len();
        let mut results = Vec::with_capacity(total);
        for input in inputs {
            let result = match self.remember(input).await {
                Ok(result) => result,
                Err(e) => StoreResult::failed(e.to_string()),
            };
            results.push(result);
        }

        let successful = results.iter().filter(|r| r.success).count();
        Ok(BatchStoreResult {
            total,
            successful,
            failed: total - successful,
            results,
        })
    }

    /// Persist to the three indexes in order, with compensating deletes when
    /// a later step fails. Compensation failures are logged and never mask
    /// the original error.
    fn persist_entry(&self, entry: &MemoryEntry) -> Result<()> {
        self.vector.store(entry)?;

        if let Some(keyword) = &self.keyword {
            if let Err(e) = keyword.index(&entry.id, &entry.content, &entry.tags) {
                self.compensate(&entry.id, false);
                return Err(e.into());
            }
        }

        if let Some(graph) = &self.graph {
            let (entities, relationships) =
                self.ingest_extractor.extract_with_relationships(&entry.content);
            for entity in &entities {
                if let Err(e) = graph.add_entity(entity, &entry.id) {
                    self.compensate(&entry.id, true);
                    return Err(e.into());
                }
            }
            for relationship in &relationships {
                if let Err(e) = graph.add_relationship(relationship, &entry.id) {
                    self.compensate(&entry.id, true);
                    return Err(e.into());
                }
            }
        }

        Ok(())
    }

    fn compensate(&self, id: &str, keyword_written: bool) {
        if let Some(graph) = &self.graph {
            if let Err(e) = graph.delete_memory(id) {
                tracing::warn!(id, "compensating graph delete failed: {e}");
            }
        }
        if keyword_written {
            if let Some(keyword) = &self.keyword {
                if let Err(e) = keyword.delete(id) {
                    tracing::warn!(id, "compensating keyword delete failed: {e}");
                }
            }
        }
        if let Err(e) = self.vector.delete(id) {
            tracing::warn!(id, "compensating vector delete failed: {e}");
        }
    }

    // ========================================================================
    // RECALL
    // ========================================================================

    /// Recall memories by meaning, keyword, entity, and time.
    pub async fn recall(&self, query: &str, opts: RecallOptions) -> Result<RecallOutcome> {
        let started = Instant::now();
        let limit = opts.clamped_limit();
        let min_relevance = opts.min_relevance.clamp(0.0, 1.0);
        let mut outcome = RecallOutcome::default();

        // Resolve the temporal window: explicit bounds win, otherwise the
        // query text itself may carry one ("who did I meet last week?").
        let (after, before) = self.resolve_bounds(query, &opts, &mut outcome.notices);
        if let (Some(a), Some(b)) = (after, before) {
            if a > b {
                return Ok(outcome);
            }
        }

        let pool = (limit * CANDIDATE_MULTIPLIER).min(MAX_CANDIDATE_POOL);
        let embedding = self.embed_query(query).await?;

        let filters = VectorFilters {
            tags: opts.tags.clone(),
            source_type: opts.source_type,
            source_instance: None,
            after,
            before,
        };

        let vector_hits = self.vector.search(&embedding, pool, &filters)?;
        let mut entries: HashMap<String, MemoryEntry> = HashMap::with_capacity(vector_hits.len());
        let mut vector_scores = Vec::with_capacity(vector_hits.len());
        for (entry, similarity) in vector_hits {
            vector_scores.push((entry.id.clone(), similarity));
            entries.insert(entry.id.clone(), entry);
        }

        let expired = |outcome: &mut RecallOutcome| {
            let late = opts.deadline.is_some_and(|d| started.elapsed() >= d);
            if late && !outcome.partial {
                outcome.partial = true;
                outcome.notices.push("recall deadline expired".to_string());
            }
            late
        };

        // Keyword channel
        let hybrid_requested = opts.hybrid.unwrap_or(self.search_cfg.hybrid);
        let mut text_scores = HashMap::new();
        let mut used_hybrid = false;
        if hybrid_requested && !expired(&mut outcome) {
            match &self.keyword {
                Some(keyword) if keyword.available() => match keyword.search(query, pool) {
                    Ok(ranked) => {
                        text_scores = normalize_bm25(&ranked);
                        used_hybrid = true;
                    }
                    Err(e) => {
                        tracing::warn!("keyword search failed, degrading to vector-only: {e}");
                        outcome
                            .notices
                            .push("keyword search failed; vector-only recall".to_string());
                    }
                },
                Some(_) | None => {
                    outcome
                        .notices
                        .push("keyword store unavailable; vector-only recall".to_string());
                }
            }
        }

        let vector_weight = opts.vector_weight.unwrap_or(self.search_cfg.vector_weight);
        let text_weight = if used_hybrid {
            opts.text_weight.unwrap_or(self.search_cfg.text_weight)
        } else {
            0.0
        };

        let fused = weighted_merge(&vector_scores, &text_scores, vector_weight, text_weight);
        let mut seen: HashSet<String> = HashSet::with_capacity(fused.len());
        let mut results: Vec<RecallResult> = Vec::with_capacity(fused.len());

        for score in fused {
            // A keyword-only candidate that contributes nothing is noise; it
            // also keeps zero-text-weight hybrid identical to vector-only
            if score.vector_score.is_none() && score.final_score <= 0.0 {
                continue;
            }
            // Below-floor candidates drop out now so graph expansion can
            // still surface the same memory at the graph relevance floor
            if score.final_score < min_relevance {
                continue;
            }
            let entry = match entries.remove(&score.id) {
                Some(entry) => entry,
                None => {
                    // Keyword-only candidate: load it and apply the same
                    // filters the vector channel already enforced
                    let Some(entry) = self.vector.get(&score.id)? else {
                        continue;
                    };
                    if !filters.matches(&entry) {
                        continue;
                    }
                    entry
                }
            };
            seen.insert(score.id.clone());
            let retrieval_method = if used_hybrid && score.text_score.is_some() {
                RetrievalMethod::Hybrid
            } else {
                RetrievalMethod::Vector
            };
            results.push(RecallResult {
                memory: entry,
                final_score: score.final_score,
                vector_score: score.vector_score,
                text_score: score.text_score,
                retrieval_method,
            });
        }

        // Graph expansion: entities in the query, plus entities within
        // EXPANSION_HOPS of them, pull in their linked memories at a fixed
        // relevance floor
        if opts.graph_expansion
            && GRAPH_RELEVANCE_FLOOR >= min_relevance
            && !expired(&mut outcome)
        {
            if let Some(graph) = &self.graph {
                let cap = (4 * limit).min(MAX_CANDIDATE_POOL);
                let mut names = Vec::new();
                for entity in self.query_extractor.extract(query) {
                    let name = entity.canonical_name();
                    names.extend(
                        graph
                            .find_connected(&name, EXPANSION_HOPS)?
                            .iter()
                            .map(|connected| connected.canonical_name()),
                    );
                    names.push(name);
                }
                names.dedup();
                'expansion: for name in names {
                    for memory_id in graph.get_memories_for_entity(&name)? {
                        if results.len() >= cap {
                            break 'expansion;
                        }
                        if !seen.insert(memory_id.clone()) {
                            continue;
                        }
                        let Some(entry) = self.vector.get(&memory_id)? else {
                            continue;
                        };
                        if !filters.matches(&entry) {
                            continue;
                        }
                        results.push(RecallResult {
                            memory: entry,
                            final_score: GRAPH_RELEVANCE_FLOOR,
                            vector_score: None,
                            text_score: None,
                            retrieval_method: RetrievalMethod::Graph,
                        });
                    }
                }
            }
        }

        results.sort_by(|a, b| {
            b.final_score
                .total_cmp(&a.final_score)
                .then_with(|| b.memory.created_at.cmp(&a.memory.created_at))
                .then_with(|| a.memory.id.cmp(&b.memory.id))
        });
        results.truncate(limit);

        outcome.results = results;
        Ok(outcome)
    }

    fn resolve_bounds(
        &self,
        query: &str,
        opts: &RecallOptions,
        notices: &mut Vec<String>,
    ) -> (Option<NaiveDate>, Option<NaiveDate>) {
        if opts.after.is_none() && opts.before.is_none() {
            return match self.temporal.extract_query_range(query) {
                Some((start, end)) => (Some(start), Some(end)),
                None => (None, None),
            };
        }

        let mut parse = |input: &Option<String>, start_of_span: bool| {
            let raw = input.as_deref()?;
            let parsed = self.temporal.parse_point(raw, start_of_span);
            if parsed.is_none() {
                tracing::warn!(raw, "unparseable temporal bound, ignoring");
                notices.push(format!("unparseable temporal bound ignored: {raw}"));
            }
            parsed
        };

        let after = parse(&opts.after, true);
        let before = parse(&opts.before, false);
        (after, before)
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        if let Ok(mut cache) = self.query_cache.lock() {
            if let Some(vector) = cache.get(query) {
                return Ok(vector.clone());
            }
        }
        let vector = self.embedding.embed(query).await?;
        if let Ok(mut cache) = self.query_cache.lock() {
            cache.put(query.to_string(), vector.clone());
        }
        Ok(vector)
    }

    // ========================================================================
    // CORRECT / FORGET / TAGS
    // ========================================================================

    /// Store a corrected version of an existing memory and link the two:
    /// the new entry supersedes the original, the original records its
    /// replacement.
    pub async fn correct(
        &self,
        original_id: &str,
        corrected_content: &str,
    ) -> Result<StoreResult> {
        validate_content(corrected_content)?;
        let original = self
            .vector
            .get(original_id)?
            .ok_or_else(|| MemoryError::NotFound(original_id.to_string()))?;

        let embedding = self.embedding.embed(corrected_content).await?;
        let _guard = self.ingest_lock.lock().await;

        let now = Utc::now();
        let entry = MemoryEntry {
            id: Uuid::new_v4().to_string(),
            temporal_facts: self.temporal.extract(corrected_content),
            content: corrected_content.to_string(),
            embedding,
            source_instance: self.instance_id.clone(),
            source_type: crate::memory::SourceType::Correction,
            created_at: now,
            updated_at: now,
            tags: original.tags.clone(),
            context: original.context.clone(),
            confidence: original.confidence,
            supersedes: Some(original.id.clone()),
            superseded_by: None,
        };

        self.persist_entry(&entry)?;
        if let Err(e) = self.vector.set_superseded_by(original_id, &entry.id) {
            self.compensate(&entry.id, self.keyword.is_some());
            return Err(e.into());
        }
        Ok(StoreResult::stored(entry.id))
    }

    /// Delete a memory from all three indexes. Idempotent; returns whether
    /// the id existed.
    pub async fn forget(&self, id: &str) -> Result<bool> {
        let _guard = self.ingest_lock.lock().await;
        if let Some(graph) = &self.graph {
            graph.delete_memory(id)?;
        }
        if let Some(keyword) = &self.keyword {
            keyword.delete(id)?;
        }
        Ok(self.vector.delete(id)?)
    }

    /// Replace a memory's tag set and refresh its keyword indexing
    pub async fn update_tags(&self, id: &str, tags: Vec<String>) -> Result<MemoryEntry> {
        let _guard = self.ingest_lock.lock().await;
        let updated = self
            .vector
            .update_tags(id, &tags)?
            .ok_or_else(|| MemoryError::NotFound(id.to_string()))?;
        if let Some(keyword) = &self.keyword {
            keyword.index(&updated.id, &updated.content, &updated.tags)?;
        }
        Ok(updated)
    }

    /// Fetch a memory record; `None` when the id does not exist
    pub async fn get_memory(&self, id: &str) -> Result<Option<MemoryEntry>> {
        Ok(self.vector.get(id)?)
    }

    // ========================================================================
    // STATS / HEALTH
    // ========================================================================

    /// Store-wide counters
    pub async fn stats(&self) -> Result<MemoryStats> {
        Ok(MemoryStats {
            total_memories: self.vector.count()?,
            by_source_type: self.vector.counts_by_source_type()?,
            by_tag: self.vector.tag_counts()?,
            instance_id: self.instance_id.clone(),
        })
    }

    /// Liveness and per-component status
    pub async fn health(&self) -> Result<HealthStatus> {
        let mut components = vec![ComponentHealth {
            name: "embedding".to_string(),
            status: "ok".to_string(),
        }];

        let keyword_status = match &self.keyword {
            Some(keyword) if keyword.available() => "ok",
            Some(_) => "unavailable",
            None => "disabled",
        };
        components.push(ComponentHealth {
            name: "keyword".to_string(),
            status: keyword_status.to_string(),
        });
        components.push(ComponentHealth {
            name: "graph".to_string(),
            status: if self.graph.is_some() { "ok" } else { "disabled" }.to_string(),
        });

        let degraded = components.iter().any(|c| c.status == "unavailable");
        Ok(HealthStatus {
            status: if degraded { "degraded" } else { "ok" }.to_string(),
            instance_id: self.instance_id.clone(),
            memory_count: self.vector.count()?,
            components,
        })
    }

    // ========================================================================
    // EXPORT / IMPORT
    // ========================================================================

    /// Export the store (or a filtered slice) as a portable bundle
    pub async fn export(&self, filter: &ExportFilter) -> Result<PortableBundle> {
        let entries: Vec<MemoryEntry> = self
            .vector
            .list_all()?
            .into_iter()
            .filter(|entry| filter.matches(entry))
            .collect();

        let metadata = EmbeddingMetadata::new(
            self.embedding.model_name(),
            self.embedding.dimensions(),
            Some(self.embedding.provider_name().to_string()),
        );
        Ok(PortableBundle::new(entries, metadata))
    }

    /// Import a bundle. Conflicts are resolved per entry by id; embeddings
    /// are kept or regenerated according to the strategy, and regeneration is
    /// counted in the summary.
    pub async fn import(
        &self,
        bundle: PortableBundle,
        strategy: ReembeddingStrategy,
        conflict: ConflictResolution,
    ) -> Result<ImportSummary> {
        let target = EmbeddingMetadata::new(
            self.embedding.model_name(),
            self.embedding.dimensions(),
            Some(self.embedding.provider_name().to_string()),
        );
        let keep_embeddings = match strategy {
            ReembeddingStrategy::Keep => true,
            ReembeddingStrategy::Drop => false,
            ReembeddingStrategy::Auto => !needs_reembedding(&bundle.embedding, &target),
        };

        let _guard = self.ingest_lock.lock().await;
        let mut summary = ImportSummary::default();

        for mut entry in bundle.entries {
            if entry.id.is_empty() || entry.content.trim().is_empty() {
                tracing::warn!("skipping bundle entry with blank id or content");
                summary.skipped += 1;
                continue;
            }

            let existing = self.vector.get(&entry.id)?;
            let replacing = match (&existing, conflict) {
                (None, _) => false,
                (Some(_), ConflictResolution::Skip) => {
                    summary.skipped += 1;
                    continue;
                }
                (Some(_), ConflictResolution::Overwrite) => true,
                (Some(current), ConflictResolution::Merge) => {
                    entry = merge_entries(current, &entry);
                    true
                }
            };

            // Regenerate when asked to, and whenever the bundle's vectors
            // cannot fit this store's dimensions anyway
            if !keep_embeddings || entry.embedding.len() != self.vector.dimensions() {
                entry.embedding = self.embedding.embed(&entry.content).await?;
                summary.reembedded += 1;
            }

            self.persist_entry(&entry)?;
            if replacing {
                summary.overwritten += 1;
            } else {
                summary.inserted += 1;
            }
        }

        Ok(summary)
    }
}

fn validate_content(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(MemoryError::Invalid(
            "content must not be empty or whitespace-only".to_string(),
        ));
    }
    Ok(())
}

fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("com", "engram", "core").ok_or_else(|| {
        MemoryError::Storage(StorageError::Init(
            "could not determine platform data directory".to_string(),
        ))
    })?;
    Ok(dirs.data_dir().to_path_buf())
}

// ============================================================================
// TESTS
// ============================================================================
