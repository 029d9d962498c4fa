//! Splits structured runbook markdown into size-bounded retrieval chunks.
//!
//! A runbook is YAML front matter (optional) followed by a body partitioned
//! at `##`/`###` headers. Sections are merged up to a minimum size and split
//! back down at a maximum, with fenced code blocks treated as unsplittable
//! spans. Output is deterministic for identical input and bounds.

use serde::Deserialize;

/// Character bounds applied during size normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerConfig {
    pub min_chunk_size: usize,
    pub max_chunk_size: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            min_chunk_size: 100,
            max_chunk_size: 2000,
        }
    }
}

impl ChunkerConfig {
    pub fn new(min_chunk_size: usize, max_chunk_size: usize) -> Self {
        Self {
            min_chunk_size,
            max_chunk_size,
        }
    }
}

/// One chunk before embedding: section text plus the document's metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedChunk {
    pub section_title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub applicable_shapes: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FrontMatter {
    #[serde(default)]
    #[allow(dead_code)]
    title: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    applicable_shapes: Vec<String>,
}

/// Chunks one runbook body. Every emitted chunk inherits the document's
/// front-matter tags and shape patterns.
pub fn chunk_runbook(document: &str, config: &ChunkerConfig) -> Vec<ParsedChunk> {
    let (front_matter, body) = split_front_matter(document);
    let sections = split_sections(&body);

    let mut chunks: Vec<ParsedChunk> = Vec::new();
    let mut buffer = String::new();
    let mut buffer_title = String::new();

    for section in sections {
        let section_len = char_len(&section.content);
        if !buffer.is_empty() && char_len(&buffer) + 1 + section_len > config.max_chunk_size {
            emit(&mut chunks, &buffer_title, &buffer, config);
            buffer.clear();
        }

        if buffer.is_empty() {
            buffer_title = section.title;
        } else {
            buffer.push('\n');
        }
        buffer.push_str(&section.content);

        if char_len(&buffer) >= config.min_chunk_size {
            emit(&mut chunks, &buffer_title, &buffer, config);
            buffer.clear();
        }
    }

    if !buffer.is_empty() {
        // A trailing buffer below the minimum is absorbed by the previous
        // chunk; with no previous chunk it stands alone.
        if let Some(last) = chunks.last_mut() {
            last.content.push('\n');
            last.content.push_str(&buffer);
        } else {
            emit(&mut chunks, &buffer_title, &buffer, config);
        }
    }

    chunks
        .into_iter()
        .map(|mut chunk| {
            chunk.tags = front_matter.tags.clone();
            chunk.applicable_shapes = front_matter.applicable_shapes.clone();
            chunk
        })
        .collect()
}

fn emit(chunks: &mut Vec<ParsedChunk>, title: &str, content: &str, config: &ChunkerConfig) {
    if content.trim().is_empty() {
        return;
    }

    if char_len(content) <= config.max_chunk_size {
        chunks.push(ParsedChunk {
            section_title: title.to_string(),
            content: content.to_string(),
            tags: Vec::new(),
            applicable_shapes: Vec::new(),
        });
        return;
    }

    for (index, part) in split_oversized(content, config).into_iter().enumerate() {
        if part.trim().is_empty() {
            continue;
        }
        let section_title = if index == 0 {
            title.to_string()
        } else {
            format!("{title} (cont.)")
        };
        chunks.push(ParsedChunk {
            section_title,
            content: part,
            tags: Vec::new(),
            applicable_shapes: Vec::new(),
        });
    }
}

fn split_front_matter(document: &str) -> (FrontMatter, String) {
    let lines: Vec<&str> = document.lines().collect();
    if lines.first().map(|line| line.trim_end() == "---") != Some(true) {
        return (FrontMatter::default(), document.to_string());
    }

    for (index, line) in lines.iter().enumerate().skip(1) {
        if line.trim_end() == "---" {
            let block = lines
                .get(1..index)
                .unwrap_or_default()
                .join("\n");
            let rest = lines.get(index + 1..).unwrap_or_default().join("\n");
            return match serde_yaml::from_str::<FrontMatter>(&block) {
                Ok(front_matter) => (front_matter, rest),
                // A malformed block is treated as absent and left in the body.
                Err(_) => (FrontMatter::default(), document.to_string()),
            };
        }
    }

    (FrontMatter::default(), document.to_string())
}

struct Section {
    title: String,
    content: String,
}

fn split_sections(body: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current_title = "Introduction".to_string();
    let mut current_lines: Vec<&str> = Vec::new();
    let mut in_fence = false;

    let flush = |title: &str, lines: &mut Vec<&str>, sections: &mut Vec<Section>| {
        let content = lines.join("\n");
        if !content.trim().is_empty() {
            sections.push(Section {
                title: title.to_string(),
                content,
            });
        }
        lines.clear();
    };

    for line in body.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            current_lines.push(line);
            continue;
        }

        if !in_fence && is_section_header(line) {
            flush(&current_title, &mut current_lines, &mut sections);
            current_title = header_title(line);
            current_lines.push(line);
        } else {
            current_lines.push(line);
        }
    }
    flush(&current_title, &mut current_lines, &mut sections);

    sections
}

fn is_section_header(line: &str) -> bool {
    line.starts_with("## ") || line.starts_with("### ")
}

fn header_title(line: &str) -> String {
    line.trim_start_matches('#').trim().to_string()
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte offset of the `n`-th character, clamped to the text length.
fn byte_index_of_char(text: &str, n: usize) -> usize {
    text.char_indices()
        .nth(n)
        .map_or(text.len(), |(index, _)| index)
}

/// Byte ranges of fenced code blocks, fences included. An unterminated fence
/// extends to the end of the text.
fn fence_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut open: Option<usize> = None;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let start = offset;
        offset += line.len();
        if line.trim_start().starts_with("```") {
            match open.take() {
                None => open = Some(start),
                Some(span_start) => spans.push((span_start, offset)),
            }
        }
    }
    if let Some(span_start) = open {
        spans.push((span_start, text.len()));
    }
    spans
}

fn split_oversized(text: &str, config: &ChunkerConfig) -> Vec<String> {
    let mut parts = Vec::new();
    let mut rest = text;

    while char_len(rest) > config.max_chunk_size {
        let split_at = choose_split(rest, config);
        if split_at == 0 || split_at >= rest.len() {
            // A fence forced the whole remainder into one part.
            break;
        }
        parts.push(rest[..split_at].to_string());
        rest = &rest[split_at..];
    }

    if !rest.is_empty() {
        parts.push(rest.to_string());
    }
    parts
}

fn choose_split(text: &str, config: &ChunkerConfig) -> usize {
    let min_byte = byte_index_of_char(text, config.min_chunk_size);
    let max_byte = byte_index_of_char(text, config.max_chunk_size);

    // Prefer the last paragraph boundary that keeps the left part within
    // bounds and at least min characters long.
    let mut split_at = text
        .get(..max_byte)
        .and_then(|head| head.rfind("\n\n"))
        .filter(|&index| index >= min_byte)
        .map_or(max_byte, |index| index + 2);

    // Never split inside a fenced code block: the whole block goes to one
    // side, even if that side then runs past the maximum.
    for (start, end) in fence_spans(text) {
        if split_at > start && split_at < end {
            split_at = if start > min_byte { start } else { end };
            break;
        }
    }

    split_at
}
