//! Lecture outline model.
//!
//! An outline is an ordered mapping of slide name to slide body, where a body
//! maps heading text to prose. Outlines usually arrive embedded in free-form
//! model output, so parsing first locates the first balanced `{...}` block and
//! then decodes it, falling back to a lenient literal decoder.

pub mod lenient;

use crate::error::{LectureError, Result};
use serde_json::Value;
use tracing::{debug, warn};

/// Prose under a heading.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Text(String),
    Items(Vec<String>),
    /// Content of an unsupported shape (nested mapping, null).
    Empty,
}

impl Content {
    fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) => Content::Text(s.trim().to_string()),
            Value::Array(items) => Content::Items(
                items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.trim().to_string(),
                        other => other.to_string(),
                    })
                    .collect(),
            ),
            _ => Content::Empty,
        }
    }

    /// Content pieces in speaking order.
    pub fn parts(&self) -> Vec<&str> {
        match self {
            Content::Text(s) if !s.is_empty() => vec![s.as_str()],
            Content::Items(items) => items
                .iter()
                .map(String::as_str)
                .filter(|s| !s.is_empty())
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Heading {
    pub title: String,
    pub content: Content,
}

/// A top-level outline entry. Only mapping bodies are narrated.
#[derive(Debug, Clone, PartialEq)]
pub enum SlideBody {
    Headings(Vec<Heading>),
    /// Any non-mapping value, such as a bare `"topic": "..."` field.
    Other(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Slide {
    pub name: String,
    pub body: SlideBody,
}

impl Slide {
    pub fn headings(&self) -> Option<&[Heading]> {
        match &self.body {
            SlideBody::Headings(h) => Some(h),
            SlideBody::Other(_) => None,
        }
    }

    pub fn heading_titles(&self) -> Vec<String> {
        self.headings()
            .map(|h| h.iter().map(|h| h.title.clone()).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outline {
    slides: Vec<Slide>,
}

impl Outline {
    /// Parse an outline out of raw text that may surround it with prose.
    pub fn parse(raw: &str) -> Result<Self> {
        let block = extract_block(raw)?;

        let value = match serde_json::from_str::<Value>(block) {
            Ok(value) => value,
            Err(strict_err) => {
                debug!("Strict decode failed ({}), trying lenient decode", strict_err);
                let normalized = lenient::normalize(block).map_err(|e| {
                    LectureError::Parse(format!(
                        "not valid JSON ({strict_err}) nor a literal expression ({e})"
                    ))
                })?;
                serde_json::from_str::<Value>(&normalized).map_err(|e| {
                    LectureError::Parse(format!("lenient decode produced invalid JSON: {e}"))
                })?
            }
        };

        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(LectureError::Parse(
                "top-level block is not a key-value mapping".to_string(),
            ));
        };

        let slides = map
            .into_iter()
            .map(|(name, body)| {
                let body = match body {
                    Value::Object(headings) => SlideBody::Headings(
                        headings
                            .iter()
                            .map(|(title, content)| Heading {
                                title: title.trim().to_string(),
                                content: Content::from_value(content),
                            })
                            .collect(),
                    ),
                    other => {
                        warn!("Skipping outline entry '{}' (not a slide mapping)", name);
                        SlideBody::Other(other)
                    }
                };
                Slide { name, body }
            })
            .collect();

        Ok(Self { slides })
    }

    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    /// Narratable slides with their 1-based position among all entries.
    pub fn narrated_slides(&self) -> impl Iterator<Item = (usize, &Slide, &[Heading])> {
        self.slides
            .iter()
            .enumerate()
            .filter_map(|(i, slide)| slide.headings().map(|h| (i + 1, slide, h)))
    }

    /// Names of entries that are not slide mappings.
    pub fn skipped_entries(&self) -> impl Iterator<Item = &str> {
        self.slides
            .iter()
            .filter(|s| s.headings().is_none())
            .map(|s| s.name.as_str())
    }

    pub fn heading_count(&self) -> usize {
        self.narrated_slides().map(|(_, _, h)| h.len()).sum()
    }

    pub fn find_slide(&self, name: &str) -> Option<&Slide> {
        self.slides.iter().find(|s| s.name == name)
    }
}

/// Locate the first balanced `{...}` block, ignoring braces inside strings.
pub fn extract_block(raw: &str) -> Result<&str> {
    let start = raw
        .find('{')
        .ok_or_else(|| LectureError::Parse("no key-value block found in text".to_string()))?;

    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (offset, ch) in raw[start..].char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }

        match ch {
            '"' | '\'' => quote = Some(ch),
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + ch.len_utf8();
                    return Ok(&raw[start..end]);
                }
            }
            _ => {}
        }
    }

    Err(LectureError::Parse(
        "key-value block is not closed".to_string(),
    ))
}
