use std::collections::BTreeMap;
use std::path::Path;

use docdex_core::error::{Error, Result};
use docdex_core::traits::DocumentParser;
use docdex_core::types::ParsedDocument;

const SUMMARY_MAX_CHARS: usize = 500;
const MAX_KEYWORDS: usize = 20;

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "have", "in", "is",
    "it", "its", "of", "on", "that", "the", "this", "to", "was", "were", "will", "with", "or",
    "but", "not", "they", "them", "their", "then", "than", "when", "where", "which", "what",
    "would", "could", "should", "about", "into", "over", "under", "between", "after", "before",
];

/// Supported document formats, selected by declared extension — never by
/// inspecting file contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Plain,
    Markdown,
    Csv,
    Html,
}

impl Format {
    pub fn from_extension(ext: &str) -> Option<Format> {
        match ext.to_ascii_lowercase().as_str() {
            "txt" | "log" => Some(Format::Plain),
            "md" | "markdown" => Some(Format::Markdown),
            "csv" => Some(Format::Csv),
            "html" | "htm" => Some(Format::Html),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Format::Plain => "Text Document",
            Format::Markdown => "Markdown Document",
            Format::Csv => "CSV Document",
            Format::Html => "HTML Document",
        }
    }
}

/// Extension-keyed dispatch to format-specific extraction. Every variant
/// yields plain text plus a summary, frequency-ranked keywords and
/// format-specific metadata; a failure is scoped to the one file.
#[derive(Debug, Default)]
pub struct ParserRegistry;

impl ParserRegistry {
    pub fn new() -> Self {
        ParserRegistry
    }

    pub fn supported(filename: &str) -> bool {
        extension_of(filename).and_then(Format::from_extension).is_some()
    }
}

impl DocumentParser for ParserRegistry {
    fn parse(&self, bytes: &[u8], filename: &str) -> Result<ParsedDocument> {
        let format = extension_of(filename)
            .and_then(Format::from_extension)
            .ok_or_else(|| Error::Parse {
                path: filename.to_string(),
                reason: "unsupported file extension".to_string(),
            })?;

        let text = String::from_utf8_lossy(bytes);
        let mut metadata = BTreeMap::new();
        let content = match format {
            Format::Plain => text.into_owned(),
            Format::Markdown => strip_markdown(&text),
            Format::Csv => extract_csv(&text, &mut metadata),
            Format::Html => strip_html(&text),
        };
        let content = content.trim().to_string();
        if content.is_empty() {
            return Err(Error::Parse {
                path: filename.to_string(),
                reason: "no extractable text".to_string(),
            });
        }

        Ok(ParsedDocument {
            doc_type: format.label().to_string(),
            summary: summarize(&content),
            keywords: extract_keywords(&content),
            content,
            metadata,
        })
    }
}

fn extension_of(filename: &str) -> Option<&str> {
    Path::new(filename).extension().and_then(|e| e.to_str())
}

/// First ~500 chars, cut back to the last sentence boundary when one
/// exists reasonably deep into the excerpt.
fn summarize(content: &str) -> String {
    let excerpt: String = content.chars().take(SUMMARY_MAX_CHARS).collect();
    let excerpt = excerpt.trim();
    if let Some(last_period) = excerpt.rfind('.') {
        if last_period > 100 {
            return excerpt[..=last_period].to_string();
        }
    }
    excerpt.to_string()
}

/// Frequency-ranked keywords over lowercased words, stop words removed.
fn extract_keywords(content: &str) -> Vec<String> {
    let mut freq: BTreeMap<String, usize> = BTreeMap::new();
    for raw in content.split(|c: char| !c.is_alphanumeric()) {
        if raw.len() < 4 {
            continue;
        }
        let word = raw.to_lowercase();
        if STOP_WORDS.contains(&word.as_str()) {
            continue;
        }
        *freq.entry(word).or_insert(0) += 1;
    }
    let mut ranked: Vec<(String, usize)> = freq.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.into_iter().take(MAX_KEYWORDS).map(|(w, _)| w).collect()
}

fn strip_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_fence = false;
    for line in text.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            out.push_str(line);
            out.push('\n');
            continue;
        }
        let stripped = trimmed
            .trim_start_matches('#')
            .trim_start_matches('>')
            .trim_start_matches(['-', '*', '+'])
            .trim_start();
        out.push_str(&strip_inline_markdown(stripped));
        out.push('\n');
    }
    out
}

/// Remove emphasis markers, inline code ticks and link syntax, keeping the
/// link text.
fn strip_inline_markdown(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' | '_' | '`' => {}
            '[' => {
                for inner in chars.by_ref() {
                    if inner == ']' {
                        break;
                    }
                    out.push(inner);
                }
                if chars.peek() == Some(&'(') {
                    for inner in chars.by_ref() {
                        if inner == ')' {
                            break;
                        }
                    }
                }
            }
            _ => out.push(c),
        }
    }
    out
}

fn extract_csv(text: &str, metadata: &mut BTreeMap<String, String>) -> String {
    let mut lines = text.lines();
    let header = lines.next().unwrap_or_default();
    metadata.insert("columns".to_string(), header.replace(',', ", "));
    let mut rows = 0usize;
    let mut out = String::with_capacity(text.len());
    out.push_str(&header.replace(',', " "));
    out.push('\n');
    for line in lines {
        out.push_str(&line.replace(',', " "));
        out.push('\n');
        rows += 1;
    }
    metadata.insert("rows".to_string(), rows.to_string());
    out
}

/// Minimal tag stripper: drops markup and script/style bodies, decodes the
/// common entities.
fn strip_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut skip_until: Option<&str> = None;
    while let Some(c) = chars.next() {
        if c != '<' {
            if skip_until.is_none() {
                out.push(c);
            }
            continue;
        }
        let mut tag = String::new();
        for inner in chars.by_ref() {
            if inner == '>' {
                break;
            }
            tag.push(inner);
        }
        let name = tag
            .trim_start_matches('/')
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match skip_until {
            Some(waiting) if tag.starts_with('/') && name == waiting => skip_until = None,
            None if name == "script" => skip_until = Some("script"),
            None if name == "style" => skip_until = Some("style"),
            _ => {}
        }
        if skip_until.is_none() {
            out.push(' ');
        }
    }
    out
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_extension_is_a_parse_error() {
        let registry = ParserRegistry::new();
        let err = registry.parse(b"binary", "report.pdf");
        assert!(matches!(err, Err(Error::Parse { .. })));
    }

    #[test]
    fn plain_text_passes_through() {
        let registry = ParserRegistry::new();
        let doc = registry
            .parse(b"Vacation policy applies to all employees.", "policy.txt")
            .expect("parse");
        assert_eq!(doc.doc_type, "Text Document");
        assert!(doc.content.starts_with("Vacation policy"));
        assert!(doc.keywords.contains(&"vacation".to_string()));
    }

    #[test]
    fn markdown_markup_is_stripped() {
        let registry = ParserRegistry::new();
        let md = "# Title\n\nSome **bold** text with a [link](http://x) and `code`.\n";
        let doc = registry.parse(md.as_bytes(), "readme.md").expect("parse");
        assert!(doc.content.contains("Title"));
        assert!(doc.content.contains("bold"));
        assert!(doc.content.contains("link"));
        assert!(!doc.content.contains("**"));
        assert!(!doc.content.contains("http://x"));
    }

    #[test]
    fn csv_keeps_header_in_metadata() {
        let registry = ParserRegistry::new();
        let csv = "name,department\nalice,IT\nbob,HR\n";
        let doc = registry.parse(csv.as_bytes(), "staff.csv").expect("parse");
        assert_eq!(doc.metadata.get("columns").map(String::as_str), Some("name, department"));
        assert_eq!(doc.metadata.get("rows").map(String::as_str), Some("2"));
        assert!(doc.content.contains("alice IT"));
    }

    #[test]
    fn html_tags_and_scripts_are_dropped() {
        let registry = ParserRegistry::new();
        let html = "<html><head><script>var x=1;</script></head>\
                    <body><h1>Setup</h1><p>Install &amp; configure.</p></body></html>";
        let doc = registry.parse(html.as_bytes(), "guide.html").expect("parse");
        assert!(doc.content.contains("Setup"));
        assert!(doc.content.contains("Install & configure."));
        assert!(!doc.content.contains("var x"));
    }

    #[test]
    fn summary_cuts_at_sentence_boundary() {
        let sentence = "This is a fairly long sentence that keeps going for a while to pass the boundary. ";
        let content = sentence.repeat(20);
        let summary = summarize(&content);
        assert!(summary.len() <= SUMMARY_MAX_CHARS);
        assert!(summary.ends_with('.'));
    }

    #[test]
    fn empty_content_is_rejected() {
        let registry = ParserRegistry::new();
        assert!(matches!(
            registry.parse(b"   \n  ", "empty.txt"),
            Err(Error::Parse { .. })
        ));
    }
}
