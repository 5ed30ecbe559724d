use tracing::warn;

use docdex_core::config::AnswerConfig;
use docdex_core::traits::AnswerGenerator;
use docdex_core::types::{field, AnswerResult, SearchContext, SearchHit};

/// Produces a scored, explained answer from a search context.
///
/// Confidence, sources and flow are always computed locally; a configured
/// generator may only replace the prose, and its failure falls back to the
/// local text without surfacing an error.
pub struct AnswerSynthesizer {
    cfg: AnswerConfig,
    generator: Option<Box<dyn AnswerGenerator>>,
}

impl AnswerSynthesizer {
    pub fn new(cfg: AnswerConfig) -> Self {
        AnswerSynthesizer { cfg, generator: None }
    }

    pub fn with_generator(mut self, generator: Box<dyn AnswerGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn synthesize(&self, context: &SearchContext) -> AnswerResult {
        if context.hits.is_empty() {
            return no_results(&context.query);
        }

        let confidence = confidence(&context.hits);
        let assertive = confidence >= self.cfg.assertive_threshold;
        let sources: Vec<String> = context
            .hits
            .iter()
            .take(self.cfg.top_sources)
            .map(|h| h.id.clone())
            .collect();
        let suggestions = self.suggestions(context);
        let flow = self.flow(context, confidence, assertive);

        let mut answer = if assertive {
            assertive_answer(context)
        } else {
            candidate_answer(context, self.cfg.top_sources)
        };

        if let Some(generator) = &self.generator {
            match generator.generate(context) {
                Ok(prose) if !prose.trim().is_empty() => answer = prose,
                Ok(_) => warn!("generator returned empty prose; keeping local answer"),
                Err(e) => warn!(error = %e, "generator failed; keeping local answer"),
            }
        }

        AnswerResult { answer, confidence, sources, flow, suggestions }
    }

    /// Deterministic exploration path: restate the query, identify the top
    /// source (or candidates), quote the most relevant excerpt, state the
    /// confidence, offer next steps.
    fn flow(&self, context: &SearchContext, confidence: f32, assertive: bool) -> Vec<String> {
        let mut flow = Vec::new();
        flow.push(format!(
            "Searched for '{}' and found {} matching documents",
            context.query,
            context.hits.len()
        ));

        if assertive {
            let top = &context.hits[0];
            flow.push(format!("Start with: {}", top.filename));
            if let Some(excerpt) = best_excerpt(top) {
                flow.push(format!("Most relevant excerpt: {}", excerpt));
            }
        } else {
            for (i, hit) in context.hits.iter().take(self.cfg.top_sources).enumerate() {
                flow.push(format!(
                    "Candidate {}: {} ({}, score {:.2})",
                    i + 1,
                    hit.filename,
                    hit.doc_type,
                    hit.score
                ));
            }
        }

        flow.push(format!("Confidence: {:.0}%", confidence * 100.0));

        let related: Vec<&str> = top_terms(context, 3);
        if related.is_empty() {
            flow.push("Next: narrow the query with more specific terms".to_string());
        } else {
            flow.push(format!("Next: explore related terms: {}", related.join(", ")));
        }
        flow
    }

    /// Follow-up queries drawn from keywords and tags of the top hits that
    /// the query does not already mention, deduplicated, capped.
    fn suggestions(&self, context: &SearchContext) -> Vec<String> {
        let query_terms: Vec<String> = context
            .query
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();
        let mut seen: Vec<String> = Vec::new();
        let mut out = Vec::new();

        let candidates = context
            .hits
            .iter()
            .take(self.cfg.top_sources)
            .flat_map(|h| h.keywords.iter().chain(h.tags.iter()));
        for term in candidates {
            let lowered = term.to_lowercase();
            if query_terms.iter().any(|q| *q == lowered) || seen.contains(&lowered) {
                continue;
            }
            seen.push(lowered);
            out.push(term.clone());
            if out.len() == self.cfg.max_suggestions {
                break;
            }
        }
        out
    }
}

/// Confidence from the shape of the result list: how strong the best hit
/// is, how far it stands above the runner-up, and how many documents
/// agree. Monotonic non-decreasing in the top score when the second score
/// and the hit count are held fixed.
pub fn confidence(hits: &[SearchHit]) -> f32 {
    let Some(top) = hits.first() else {
        return 0.0;
    };
    let s = top.score.max(0.0);
    if s == 0.0 {
        return 0.0;
    }
    let saturation = s / (s + 5.0);
    let gap = match hits.get(1) {
        Some(second) => ((s - second.score.max(0.0)) / s).clamp(0.0, 1.0),
        None => 1.0,
    };
    let count = (hits.len().min(5) as f32) / 5.0;
    (0.55 * saturation + 0.30 * gap + 0.15 * count).clamp(0.0, 1.0)
}

fn assertive_answer(context: &SearchContext) -> String {
    let top = &context.hits[0];
    let mut parts = vec![format!(
        "Found {} documents for '{}'. The most relevant is '{}' ({}).",
        context.hits.len(),
        context.query,
        top.filename,
        top.doc_type
    )];
    if let Some(excerpt) = best_excerpt(top) {
        parts.push(excerpt);
    }
    if !top.keywords.is_empty() {
        let keywords: Vec<&str> = top.keywords.iter().take(5).map(String::as_str).collect();
        parts.push(format!("Key concepts: {}", keywords.join(", ")));
    }
    parts.join("\n\n")
}

fn candidate_answer(context: &SearchContext, top_sources: usize) -> String {
    let mut parts = vec![format!(
        "Found {} possible matches for '{}', but none stands out clearly. Likely candidates:",
        context.hits.len(),
        context.query
    )];
    for hit in context.hits.iter().take(top_sources) {
        parts.push(format!("- {} ({})", hit.filename, hit.doc_type));
    }
    parts.join("\n")
}

fn no_results(query: &str) -> AnswerResult {
    AnswerResult {
        answer: format!(
            "No documents matched '{}'. Try rephrasing the search or using different terms.",
            query
        ),
        confidence: 0.0,
        sources: Vec::new(),
        flow: Vec::new(),
        suggestions: vec![
            "Try more general terms".to_string(),
            format!("Check the spelling of '{}'", query),
            "Search for single keywords instead of full sentences".to_string(),
        ],
    }
}

/// The hit's most relevant display text: the first highlighted snippet
/// (content first, then summary, then filename), stripped of markup, or a
/// truncated summary when no snippet survived highlight degradation.
fn best_excerpt(hit: &SearchHit) -> Option<String> {
    for name in [field::CONTENT, field::SUMMARY, field::FILENAME] {
        if let Some(first) = hit.highlights.get(name).and_then(|s| s.first()) {
            return Some(strip_markup(first));
        }
    }
    if hit.summary.is_empty() {
        None
    } else {
        Some(hit.summary.chars().take(300).collect())
    }
}

fn strip_markup(snippet: &str) -> String {
    snippet
        .replace("<b>", "")
        .replace("</b>", "")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
}

/// Most frequent keywords across the top hits, for the flow's next steps.
fn top_terms(context: &SearchContext, max: usize) -> Vec<&str> {
    let mut freq: Vec<(&str, usize)> = Vec::new();
    for hit in context.hits.iter().take(3) {
        for kw in &hit.keywords {
            match freq.iter_mut().find(|(k, _)| *k == kw.as_str()) {
                Some((_, n)) => *n += 1,
                None => freq.push((kw.as_str(), 1)),
            }
        }
    }
    freq.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    freq.into_iter().take(max).map(|(k, _)| k).collect()
}
