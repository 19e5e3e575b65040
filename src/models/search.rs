use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A requested sort criterion.
///
/// The order is kept as the caller supplied it; the query coordinator
/// upper-cases and validates it against `ASC`/`DESC` before fan-out.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SortBy {
    pub name: String,
    pub order: String,
}

impl SortBy {
    pub fn new(name: impl Into<String>, order: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            order: order.into(),
        }
    }

    pub fn asc(name: impl Into<String>) -> Self {
        Self::new(name, "ASC")
    }

    pub fn desc(name: impl Into<String>) -> Self {
        Self::new(name, "DESC")
    }
}

/// Validated sort direction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Candidate ordering used when expanding a query token against the
/// vocabulary of a shard.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenOrder {
    /// Prefer expansions occurring in more documents
    #[default]
    Frequency,
    /// Prefer expansions closest to the query token
    MaxScore,
}

/// A full-text search request against a collection.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub search_fields: Vec<String>,
    #[serde(default)]
    pub filter: String,
    #[serde(default)]
    pub facet_fields: Vec<String>,
    #[serde(default)]
    pub sort_fields: Vec<SortBy>,
    pub num_typos: usize,
    pub per_page: usize,
    pub page: usize,
    #[serde(default)]
    pub token_order: TokenOrder,
    #[serde(default)]
    pub prefix: bool,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            search_fields: Vec::new(),
            filter: String::new(),
            facet_fields: Vec::new(),
            sort_fields: Vec::new(),
            num_typos: 2,
            per_page: 10,
            page: 1,
            token_order: TokenOrder::default(),
            prefix: false,
        }
    }
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, search_fields: Vec<String>) -> Self {
        Self {
            query: query.into(),
            search_fields,
            ..Default::default()
        }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    pub fn with_facets(mut self, facet_fields: Vec<String>) -> Self {
        self.facet_fields = facet_fields;
        self
    }

    pub fn with_sort(mut self, sort_fields: Vec<SortBy>) -> Self {
        self.sort_fields = sort_fields;
        self
    }

    pub fn with_page(mut self, page: usize, per_page: usize) -> Self {
        self.page = page;
        self.per_page = per_page;
        self
    }

    pub fn with_num_typos(mut self, num_typos: usize) -> Self {
        self.num_typos = num_typos;
        self
    }

    pub fn with_prefix(mut self, prefix: bool) -> Self {
        self.prefix = prefix;
        self
    }

    pub fn with_token_order(mut self, token_order: TokenOrder) -> Self {
        self.token_order = token_order;
        self
    }
}

/// One facet value with its occurrence count
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FacetValueCount {
    pub value: String,
    pub count: usize,
}

/// Aggregated counts for a single facet field
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FacetCount {
    pub field_name: String,
    pub counts: Vec<FacetValueCount>,
}

/// Search response: total match count, the hydrated page of hits (raw
/// documents, with `_highlight` attached where applicable), and the top-10
/// counts per requested facet.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub found: usize,
    pub hits: Vec<Value>,
    pub facet_counts: Vec<FacetCount>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_request_default() {
        let req = SearchRequest::default();
        assert_eq!(req.per_page, 10);
        assert_eq!(req.page, 1);
        assert_eq!(req.num_typos, 2);
        assert!(!req.prefix);
        assert_eq!(req.token_order, TokenOrder::Frequency);
    }

    #[test]
    fn test_search_request_builder() {
        let req = SearchRequest::new("shoe", vec!["title".to_string()])
            .with_sort(vec![SortBy::desc("price")])
            .with_page(3, 10)
            .with_prefix(true);
        assert_eq!(req.query, "shoe");
        assert_eq!(req.page, 3);
        assert!(req.prefix);
        assert_eq!(req.sort_fields[0].order, "DESC");
    }

    #[test]
    fn test_response_serialization_shape() {
        let response = SearchResponse {
            found: 1,
            hits: vec![serde_json::json!({"id": "0"})],
            facet_counts: vec![FacetCount {
                field_name: "tags".to_string(),
                counts: vec![FacetValueCount {
                    value: "rust".to_string(),
                    count: 3,
                }],
            }],
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["found"], 1);
        assert_eq!(json["facet_counts"][0]["field_name"], "tags");
        assert_eq!(json["facet_counts"][0]["counts"][0]["value"], "rust");
        assert_eq!(json["facet_counts"][0]["counts"][0]["count"], 3);
    }
}
