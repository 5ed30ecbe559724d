use tracing::warn;

use docdex_core::error::{Error, Result};
use docdex_core::traits::SearchEngine;
use docdex_core::types::{field, SearchHit, SearchRequest};

const EXCERPT_CHARS: usize = 300;

/// Search outcome after highlight negotiation. `degraded` is true whenever
/// the highlighting scope was narrower than requested, so callers and
/// telemetry can observe the degradation.
#[derive(Debug, Clone)]
pub struct NegotiatedHits {
    pub hits: Vec<SearchHit>,
    pub degraded: bool,
}

/// Highlight scope, degraded one step at a time. `summary` and `filename`
/// are always bounded, so `Reduced` can only fail if the engine's limit is
/// configured below the summary cap; `None` requests no highlighting at
/// all and cannot fail on field length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Full,
    Reduced,
    None,
}

impl Scope {
    fn next(self) -> Option<Scope> {
        match self {
            Scope::Full => Some(Scope::Reduced),
            Scope::Reduced => Some(Scope::None),
            Scope::None => None,
        }
    }

    fn apply(self, request: &SearchRequest) -> SearchRequest {
        let mut scoped = request.clone();
        match self {
            Scope::Full => {}
            Scope::Reduced => {
                scoped.highlight.fields =
                    vec![field::SUMMARY.to_string(), field::FILENAME.to_string()];
            }
            Scope::None => scoped.highlight.fields.clear(),
        }
        scoped
    }
}

/// Execute `request` against `target`, narrowing the highlight scope on
/// each field-length-exceeded rejection: all fields, then summary and
/// filename only, then none (with a plain summary excerpt substituted).
/// Each transition happens at most once per query, so a search on an
/// arbitrarily large document never surfaces an error to the caller.
pub fn negotiate(
    engine: &dyn SearchEngine,
    target: &str,
    request: &SearchRequest,
) -> Result<NegotiatedHits> {
    let mut scope = Scope::Full;
    let mut degraded = false;

    loop {
        match engine.search(target, &scope.apply(request)) {
            Ok(mut hits) => {
                if scope == Scope::None {
                    substitute_excerpts(&mut hits);
                }
                return Ok(NegotiatedHits { hits, degraded });
            }
            Err(Error::FieldLengthExceeded { field }) => match scope.next() {
                Some(next) => {
                    warn!(
                        field = field.as_str(),
                        from = ?scope,
                        to = ?next,
                        "highlighting degraded after field-length rejection"
                    );
                    degraded = true;
                    scope = next;
                }
                None => {
                    // A request with no highlight fields cannot be rejected
                    // for field length; treat it as an engine defect.
                    return Err(Error::Engine(anyhow::anyhow!(
                        "engine rejected field '{}' with highlighting disabled",
                        field
                    )));
                }
            },
            Err(other) => return Err(other),
        }
    }
}

fn substitute_excerpts(hits: &mut [SearchHit]) {
    for hit in hits {
        if hit.summary.is_empty() {
            continue;
        }
        hit.highlights
            .insert(field::SUMMARY.to_string(), vec![truncate(&hit.summary, EXCERPT_CHARS)]);
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}
