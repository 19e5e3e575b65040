//! The collection: schema-bound document container with sharded in-memory
//! indexing and durable raw-document storage.
//!
//! Ingest parses and validates a JSON document, allocates a monotonically
//! increasing 32-bit seq-id, routes the document to one of N shards by
//! `seq_id % N`, and persists the raw document plus the doc-id mapping in
//! the key-value store. Search fans out to every shard, merges the
//! per-shard candidates into a deterministic global ranking, hydrates the
//! requested page from the store, and attaches highlighted snippets and
//! facet counts.

pub mod keys;
pub mod points;
mod validator;

pub use validator::validate_document;

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use crate::config::CollectionConfig;
use crate::error::NacreError;
use crate::highlight::{snippet, MatchScore};
use crate::index::{sort_candidates, Candidate, Facet, Index, QueryExpansion};
use crate::models::{
    FacetCount, FacetValueCount, SearchRequest, SearchResponse, SortOrder,
};
use crate::schema::{Field, FieldType, Schema};
use crate::store::Store;
use crate::Result;

const STORED_DOC_PARSE_ERROR: &str = "Error while parsing stored document.";

/// A named, schema-bound container of documents.
pub struct Collection {
    name: String,
    collection_id: u32,
    token_ranking_field: String,
    schema: Arc<Schema>,
    store: Arc<dyn Store>,
    next_seq_id: AtomicU32,
    num_documents: AtomicUsize,
    indices: Vec<RwLock<Index>>,
    config: CollectionConfig,
}

impl Collection {
    pub fn new(
        name: impl Into<String>,
        collection_id: u32,
        next_seq_id: u32,
        store: Arc<dyn Store>,
        fields: Vec<Field>,
        token_ranking_field: impl Into<String>,
    ) -> Self {
        Self::with_config(
            name,
            collection_id,
            next_seq_id,
            store,
            fields,
            token_ranking_field,
            CollectionConfig::default(),
        )
    }

    pub fn with_config(
        name: impl Into<String>,
        collection_id: u32,
        next_seq_id: u32,
        store: Arc<dyn Store>,
        fields: Vec<Field>,
        token_ranking_field: impl Into<String>,
        config: CollectionConfig,
    ) -> Self {
        let schema = Arc::new(Schema::new(fields));
        let indices = (0..config.num_indices.max(1))
            .map(|_| RwLock::new(Index::new(schema.clone())))
            .collect();

        Self {
            name: name.into(),
            collection_id,
            token_ranking_field: token_ranking_field.into(),
            schema,
            store,
            next_seq_id: AtomicU32::new(next_seq_id),
            num_documents: AtomicUsize::new(0),
            indices,
            config,
        }
    }

    /// Read a collection's persisted next-seq-id counter, for constructing
    /// the collection after a restart.
    pub fn fetch_next_seq_id(store: &dyn Store, collection_name: &str) -> Result<u32> {
        Ok(store
            .get(&keys::next_seq_id_key(collection_name))?
            .map(|v| crate::store::parse_counter(&v))
            .unwrap_or(0))
    }

    /// Allocate one seq-id. The persisted counter is incremented before the
    /// value is handed out, so a crash cannot lead to reuse.
    fn allocate_seq_id(&self) -> Result<u32> {
        self.store
            .increment(&keys::next_seq_id_key(&self.name), 1)?;
        Ok(self.next_seq_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Overwrite the in-memory counter, for boot-time replay.
    pub fn set_next_seq_id(&self, seq_id: u32) {
        self.next_seq_id.store(seq_id, Ordering::SeqCst);
    }

    /// Bump the in-memory counter without touching the store.
    pub fn increment_next_seq_id(&self) {
        self.next_seq_id.fetch_add(1, Ordering::SeqCst);
    }

    /// Ingest one document given as JSON text. Returns the document's id.
    ///
    /// The seq-id is consumed even when validation fails, so ids are never
    /// reused. The shard is updated before the store so that a crash in
    /// between self-corrects on the next boot-time rebuild.
    pub fn add(&self, json_str: &str) -> Result<String> {
        let mut document: Value = serde_json::from_str(json_str)
            .map_err(|_| NacreError::BadRequest("Bad JSON.".to_string()))?;
        if !document.is_object() {
            return Err(NacreError::BadRequest("Bad JSON.".to_string()));
        }

        let seq_id = self.allocate_seq_id()?;

        match document.get("id") {
            None => {
                document["id"] = Value::String(seq_id.to_string());
            }
            Some(Value::String(_)) => {}
            Some(_) => {
                return Err(NacreError::BadRequest(
                    "Document's `id` field should be a string.".to_string(),
                ));
            }
        }
        let doc_id = document["id"].as_str().unwrap_or_default().to_string();

        validate_document(&document, &self.schema, &self.token_ranking_field)?;

        let points = points::ranking_points(&document, &self.token_ranking_field);
        let shard = seq_id as usize % self.indices.len();
        self.indices[shard].write().insert(&document, seq_id, points);

        let dump = serde_json::to_string(&document)
            .map_err(|e| NacreError::Internal(e.to_string()))?;
        self.store.insert(
            &keys::doc_id_key(self.collection_id, &doc_id),
            seq_id.to_string().as_bytes(),
        )?;
        self.store
            .insert(&keys::seq_id_key(self.collection_id, seq_id), dump.as_bytes())?;

        self.num_documents.fetch_add(1, Ordering::SeqCst);
        debug!(collection = %self.name, %doc_id, seq_id, shard, "document indexed");
        Ok(doc_id)
    }

    /// Ranked, faceted full-text search across all shards.
    pub fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        for field_name in &request.search_fields {
            let Some(field) = self.schema.search_field(field_name) else {
                return Err(NacreError::BadRequest(format!(
                    "Could not find a field named `{}` in the schema.",
                    field_name
                )));
            };
            if !field.field_type.is_string_like() {
                return Err(NacreError::BadRequest(format!(
                    "Field `{}` should be a string or a string array.",
                    field_name
                )));
            }
            if field.is_facet() {
                return Err(NacreError::BadRequest(format!(
                    "Field `{}` is a faceted field - it cannot be used as a query field.",
                    field_name
                )));
            }
        }

        let mut facets: Vec<Facet> = Vec::with_capacity(request.facet_fields.len());
        for field_name in &request.facet_fields {
            if self.schema.facet_field(field_name).is_none() {
                return Err(NacreError::BadRequest(format!(
                    "Could not find a facet field named `{}` in the schema.",
                    field_name
                )));
            }
            facets.push(Facet::new(field_name.clone()));
        }

        let mut sort_fields_std: Vec<(String, SortOrder)> =
            Vec::with_capacity(request.sort_fields.len());
        for sort_by in &request.sort_fields {
            if self.schema.sort_field(&sort_by.name).is_none() {
                return Err(NacreError::BadRequest(format!(
                    "Could not find a field named `{}` in the schema for sorting.",
                    sort_by.name
                )));
            }
            let order = match sort_by.order.to_uppercase().as_str() {
                "ASC" => SortOrder::Asc,
                "DESC" => SortOrder::Desc,
                _ => {
                    return Err(NacreError::BadRequest(format!(
                        "Order for field `{}` should be either ASC or DESC.",
                        sort_by.name
                    )));
                }
            };
            sort_fields_std.push((sort_by.name.clone(), order));
        }

        if request.page < 1 {
            return Err(NacreError::Unprocessable(
                "Page must be an integer of value greater than 0.".to_string(),
            ));
        }
        if request.page.saturating_mul(request.per_page) > self.config.max_results {
            return Err(NacreError::Unprocessable(format!(
                "Only the first {} results are available.",
                self.config.max_results
            )));
        }

        let mut field_order_kvs: Vec<(i32, Candidate)> = Vec::new();
        let mut all_result_ids_len = 0usize;
        let mut searched_queries: Vec<QueryExpansion> = Vec::new();

        for index in &self.indices {
            index.read().search(
                &request.query,
                &request.search_fields,
                &request.filter,
                &mut facets,
                &sort_fields_std,
                request.num_typos,
                request.per_page,
                request.page,
                request.token_order,
                request.prefix,
                &mut field_order_kvs,
                &mut all_result_ids_len,
                &mut searched_queries,
            )?;
        }

        sort_candidates(&mut field_order_kvs);

        // A document matching several search fields surfaces once, at its
        // best rank.
        let mut seen = std::collections::HashSet::new();
        field_order_kvs.retain(|(_, kv)| seen.insert(kv.key));

        debug!(
            collection = %self.name,
            query = %request.query,
            candidates = field_order_kvs.len(),
            found = all_result_ids_len,
            "search merged"
        );

        let mut hits = Vec::new();
        let start = (request.page - 1) * request.per_page;
        if start < field_order_kvs.len() {
            let end = (request.page * request.per_page).min(field_order_kvs.len());
            for (field_order_index, kv) in &field_order_kvs[start..end] {
                let mut document = self.fetch_seq_id_document(kv.key)?;

                let field_name = &request.search_fields
                    [request.search_fields.len() - *field_order_index as usize];
                let matched_field = self.schema.search_field(field_name);

                // Only plain string fields are highlighted
                if matched_field.map(|f| f.field_type) == Some(FieldType::String) {
                    let expansion = &searched_queries[kv.query_index];
                    let token_positions: Vec<Vec<u16>> = expansion
                        .tokens
                        .iter()
                        .map(|tp| tp.positions.get(&kv.key).cloned().unwrap_or_default())
                        .collect();

                    if token_positions.iter().any(|p| !p.is_empty()) {
                        let mscore = MatchScore::evaluate(&token_positions);
                        let text = document
                            .get(field_name)
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string();
                        let marked = snippet(&text, &mscore, self.config.snippet_str_above_len);

                        let mut highlight = serde_json::Map::new();
                        highlight.insert(field_name.clone(), Value::String(marked));
                        document["_highlight"] = Value::Object(highlight);
                    }
                }

                hits.push(document);
            }
        }

        let facet_counts = facets
            .into_iter()
            .map(|facet| {
                let mut value_to_count: Vec<(String, usize)> =
                    facet.counts.into_iter().collect();
                value_to_count
                    .sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
                FacetCount {
                    field_name: facet.field_name,
                    counts: value_to_count
                        .into_iter()
                        .take(10)
                        .map(|(value, count)| FacetValueCount { value, count })
                        .collect(),
                }
            })
            .collect();

        Ok(SearchResponse {
            found: all_result_ids_len,
            hits,
            facet_counts,
        })
    }

    /// Fetch a document by its external id.
    pub fn get(&self, id: &str) -> Result<Value> {
        let seq_id = self.doc_id_to_seq_id(id)?;
        self.fetch_seq_id_document(seq_id)
    }

    /// Remove a document by its external id. All shards are invoked since
    /// removal by content alone cannot locate the owning shard; shards that
    /// never held the seq-id no-op.
    pub fn remove(&self, id: &str, remove_from_store: bool) -> Result<String> {
        let seq_id = self.doc_id_to_seq_id(id)?;
        let document = self.fetch_seq_id_document(seq_id)?;

        for index in &self.indices {
            index.write().remove(seq_id, &document);
        }

        if remove_from_store {
            self.store
                .remove(&keys::doc_id_key(self.collection_id, id))?;
            self.store
                .remove(&keys::seq_id_key(self.collection_id, seq_id))?;
        }

        self.num_documents.fetch_sub(1, Ordering::SeqCst);
        debug!(collection = %self.name, %id, seq_id, "document removed");
        Ok(id.to_string())
    }

    /// Resolve an external doc id to its internal seq-id.
    pub fn doc_id_to_seq_id(&self, doc_id: &str) -> Result<u32> {
        let value = self
            .store
            .get(&keys::doc_id_key(self.collection_id, doc_id))?
            .ok_or_else(|| NacreError::DocumentNotFound(doc_id.to_string()))?;

        std::str::from_utf8(&value)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| NacreError::Internal(STORED_DOC_PARSE_ERROR.to_string()))
    }

    /// Re-index every stored document of this collection into the in-memory
    /// shards, in seq-id order. Intended for boot, after constructing the
    /// collection with the persisted counter value.
    pub fn rebuild_from_store(&self) -> Result<usize> {
        let entries = self
            .store
            .scan_prefix(&keys::seq_id_prefix(self.collection_id))?;

        let mut restored = 0;
        for (key, value) in entries {
            let seq_id = keys::parse_seq_id_key(&key)?;
            let document: Value = serde_json::from_slice(&value)
                .map_err(|_| NacreError::Internal(STORED_DOC_PARSE_ERROR.to_string()))?;

            validate_document(&document, &self.schema, &self.token_ranking_field)?;
            let points = points::ranking_points(&document, &self.token_ranking_field);
            let shard = seq_id as usize % self.indices.len();
            self.indices[shard].write().insert(&document, seq_id, points);
            self.num_documents.fetch_add(1, Ordering::SeqCst);
            restored += 1;
        }

        debug!(collection = %self.name, restored, "rebuilt in-memory indices from store");
        Ok(restored)
    }

    fn fetch_seq_id_document(&self, seq_id: u32) -> Result<Value> {
        let value = self
            .store
            .get(&keys::seq_id_key(self.collection_id, seq_id))?
            .ok_or_else(|| NacreError::Internal(STORED_DOC_PARSE_ERROR.to_string()))?;

        serde_json::from_slice(&value)
            .map_err(|_| NacreError::Internal(STORED_DOC_PARSE_ERROR.to_string()))
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_collection_id(&self) -> u32 {
        self.collection_id
    }

    pub fn get_num_documents(&self) -> usize {
        self.num_documents.load(Ordering::SeqCst)
    }

    pub fn get_schema(&self) -> &Schema {
        &self.schema
    }

    pub fn get_token_ranking_field(&self) -> &str {
        &self.token_ranking_field
    }

    /// Names of the faceted fields, in declaration order
    pub fn get_facet_fields(&self) -> Vec<String> {
        self.schema
            .facet_fields()
            .into_iter()
            .map(|f| f.name.clone())
            .collect()
    }

    /// The sortable fields, in declaration order
    pub fn get_sort_fields(&self) -> Vec<Field> {
        self.schema.sort_fields().into_iter().cloned().collect()
    }
}
