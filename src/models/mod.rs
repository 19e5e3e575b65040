pub mod search;

pub use search::{
    FacetCount, FacetValueCount, SearchRequest, SearchResponse, SortBy, SortOrder, TokenOrder,
};
