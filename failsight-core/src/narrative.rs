//! Work-order narratives pulled out of a paragraph-structured document.
//!
//! A paragraph qualifies for identifier `id` when its trimmed text begins with
//! the literal `"<id>:"`. Identifiers are tested in configured order and only
//! the first match is taken, so an identifier that prefixes another cannot
//! claim the same paragraph twice. When several paragraphs qualify for the same
//! identifier the last one in document order wins.

use std::collections::{HashMap, HashSet};

use crate::models::NarrativeRecord;

#[derive(Debug, Clone)]
pub struct NarrativeExtractor {
    identifiers: Vec<String>,
    prefixes: Vec<String>,
}

impl NarrativeExtractor {
    pub fn new<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let identifiers: Vec<String> = identifiers.into_iter().map(Into::into).collect();
        let prefixes = identifiers.iter().map(|id| format!("{}:", id)).collect();
        Self {
            identifiers,
            prefixes,
        }
    }

    /// Match one paragraph, returning the identifier it belongs to and its narrative.
    pub fn match_paragraph<'p>(&self, paragraph: &'p str) -> Option<(&str, &'p str)> {
        let text = paragraph.trim();
        let (id, _) = self
            .identifiers
            .iter()
            .zip(&self.prefixes)
            .find(|(_, prefix)| text.starts_with(prefix.as_str()))?;
        // split at the first colon of the paragraph, not at the end of the prefix
        let (_, rest) = text.split_once(':')?;
        Some((id.as_str(), rest.trim()))
    }

    pub fn extract<'a, I>(&self, paragraphs: I) -> Narratives
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut narratives = Narratives::default();
        for (index, paragraph) in paragraphs.into_iter().enumerate() {
            if let Some((id, text)) = self.match_paragraph(paragraph) {
                if narratives.by_id.contains_key(id) {
                    tracing::debug!("Paragraph {} replaces earlier narrative for {}", index, id);
                } else {
                    tracing::debug!("Paragraph {} holds narrative for {}", index, id);
                }
                narratives.by_id.insert(id.to_string(), text.to_string());
            }
        }

        let missing: Vec<&str> = self
            .identifiers
            .iter()
            .filter(|id| !narratives.by_id.contains_key(id.as_str()))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            tracing::info!("No narrative paragraph for work orders: {}", missing.join(", "));
        }
        let mut seen = HashSet::new();
        narratives.order = self
            .identifiers
            .iter()
            .filter(|id| narratives.by_id.contains_key(id.as_str()) && seen.insert(id.as_str()))
            .cloned()
            .collect();
        narratives
    }
}

/// Identifier to narrative mapping, at most one narrative per identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Narratives {
    by_id: HashMap<String, String>,
    order: Vec<String>,
}

impl Narratives {
    pub fn get(&self, identifier: &str) -> Option<&str> {
        self.by_id.get(identifier).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Records in configured identifier order.
    pub fn records(&self) -> impl Iterator<Item = NarrativeRecord> + '_ {
        self.order.iter().filter_map(|id| {
            self.by_id.get(id).map(|text| NarrativeRecord {
                identifier: id.clone(),
                text: text.clone(),
            })
        })
    }
}
