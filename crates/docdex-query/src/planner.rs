use std::collections::BTreeSet;

use docdex_core::config::{EngineConfig, SearchConfig};
use docdex_core::error::{Error, Result};
use docdex_core::types::{field, FieldBoost, HighlightSpec, SearchRequest};

const FRAGMENT_CHARS: usize = 200;

/// Caller-supplied knobs for one search.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Exact-match tag filter; every listed tag must be present.
    pub tags: BTreeSet<String>,
    pub size: Option<usize>,
    pub fuzzy: Option<bool>,
}

/// Turns a raw query string plus options into a structured, weighted
/// multi-field request. A filename match is a stronger relevance signal
/// than a summary match, which beats a content match; the boosts encode
/// that ordering.
#[derive(Debug, Clone)]
pub struct QueryPlanner {
    default_limit: usize,
    max_limit: usize,
    fuzzy_default: bool,
    max_analyzed_offset: usize,
}

impl QueryPlanner {
    pub fn new(search: &SearchConfig, engine: &EngineConfig) -> Self {
        QueryPlanner {
            default_limit: search.default_limit,
            max_limit: search.max_limit,
            fuzzy_default: search.fuzzy,
            max_analyzed_offset: engine.max_analyzed_offset,
        }
    }

    pub fn plan(&self, query: &str, options: &QueryOptions) -> Result<SearchRequest> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidQuery("query string is empty".to_string()));
        }
        let size = options
            .size
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit);

        Ok(SearchRequest {
            query: query.to_string(),
            fields: vec![
                FieldBoost { field: field::FILENAME.to_string(), boost: 3.0 },
                FieldBoost { field: field::SUMMARY.to_string(), boost: 2.0 },
                FieldBoost { field: field::CONTENT.to_string(), boost: 1.0 },
            ],
            tag_filter: options.tags.clone(),
            size,
            fuzzy: options.fuzzy.unwrap_or(self.fuzzy_default),
            highlight: HighlightSpec {
                fields: vec![
                    field::CONTENT.to_string(),
                    field::SUMMARY.to_string(),
                    field::FILENAME.to_string(),
                ],
                max_analyzed_offset: self.max_analyzed_offset,
                fragment_chars: FRAGMENT_CHARS,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planner() -> QueryPlanner {
        QueryPlanner::new(&SearchConfig::default(), &EngineConfig::default())
    }

    #[test]
    fn empty_query_is_rejected() {
        let err = planner().plan("   ", &QueryOptions::default());
        assert!(matches!(err, Err(Error::InvalidQuery(_))));
    }

    #[test]
    fn boosts_rank_filename_over_summary_over_content() {
        let req = planner()
            .plan("vacation policy", &QueryOptions::default())
            .expect("plan");
        let boost_of = |name: &str| {
            req.fields
                .iter()
                .find(|fb| fb.field == name)
                .map(|fb| fb.boost)
                .expect("field present")
        };
        assert!(boost_of(field::FILENAME) > boost_of(field::SUMMARY));
        assert!(boost_of(field::SUMMARY) > boost_of(field::CONTENT));
    }

    #[test]
    fn size_defaults_and_clamps() {
        let p = planner();
        let opts = QueryOptions::default();
        assert_eq!(p.plan("q", &opts).expect("plan").size, 10);
        let opts = QueryOptions { size: Some(5000), ..QueryOptions::default() };
        assert_eq!(p.plan("q", &opts).expect("plan").size, 100);
        let opts = QueryOptions { size: Some(0), ..QueryOptions::default() };
        assert_eq!(p.plan("q", &opts).expect("plan").size, 1);
    }

    #[test]
    fn highlight_covers_all_eligible_fields_with_limit() {
        let req = planner().plan("q", &QueryOptions::default()).expect("plan");
        assert_eq!(req.highlight.fields.len(), 3);
        assert_eq!(req.highlight.max_analyzed_offset, 10_000_000);
    }

    #[test]
    fn tag_filter_and_fuzzy_pass_through() {
        let opts = QueryOptions {
            tags: BTreeSet::from(["HR".to_string()]),
            fuzzy: Some(true),
            ..QueryOptions::default()
        };
        let req = planner().plan("q", &opts).expect("plan");
        assert!(req.tag_filter.contains("HR"));
        assert!(req.fuzzy);
    }
}
