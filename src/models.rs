//! Core data types shared by the chat and document views.

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Author of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// One line of the chat transcript. Never mutated after insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptEntry {
    pub sender: Sender,
    pub text: String,
}

impl TranscriptEntry {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Bot,
            text: text.into(),
        }
    }
}

/// A file picked by the user: display name plus its full contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Lowercased text after the last `.`, if any.
    pub fn extension(&self) -> Option<String> {
        let (_, ext) = self.name.rsplit_once('.')?;
        if ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

/// Summary of one document unit (usually a page).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryUnit {
    pub label: String,
    pub text: String,
}

/// Unit label → summary text, kept in the order the backend sent it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryMap {
    units: Vec<SummaryUnit>,
}

impl SummaryMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. A repeated label keeps its first position.
    pub fn insert(&mut self, label: impl Into<String>, text: impl Into<String>) {
        let label = label.into();
        let text = text.into();
        match self.units.iter_mut().find(|u| u.label == label) {
            Some(unit) => unit.text = text,
            None => self.units.push(SummaryUnit { label, text }),
        }
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.units
            .iter()
            .find(|u| u.label == label)
            .map(|u| u.text.as_str())
    }

    pub fn contains(&self, label: &str) -> bool {
        self.get(label).is_some()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.units.iter().map(|u| u.label.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &SummaryUnit> {
        self.units.iter()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// All summaries joined by a blank line, in map order.
    pub fn joined(&self) -> String {
        self.units
            .iter()
            .map(|u| u.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

impl<'de> Deserialize<'de> for SummaryMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct UnitsVisitor;

        impl<'de> Visitor<'de> for UnitsVisitor {
            type Value = SummaryMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object mapping unit labels to summary text")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<SummaryMap, A::Error> {
                let mut map = SummaryMap::new();
                while let Some((label, value)) =
                    access.next_entry::<String, serde_json::Value>()?
                {
                    let text = match value {
                        serde_json::Value::String(s) => s,
                        serde_json::Value::Null => String::new(),
                        other => other.to_string(),
                    };
                    map.insert(label, text);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(UnitsVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_map_keeps_backend_order() {
        let json = r#"{"Page 2": "b", "Page 10": "j", "Page 1": "a"}"#;
        let map: SummaryMap = serde_json::from_str(json).unwrap();
        let labels: Vec<&str> = map.labels().collect();
        assert_eq!(labels, vec!["Page 2", "Page 10", "Page 1"]);
        assert_eq!(map.joined(), "b\n\nj\n\na");
    }

    #[test]
    fn test_summary_map_stringifies_non_string_values() {
        let json = r#"{"Page 1": 42, "Page 2": null}"#;
        let map: SummaryMap = serde_json::from_str(json).unwrap();
        assert_eq!(map.get("Page 1"), Some("42"));
        assert_eq!(map.get("Page 2"), Some(""));
    }

    #[test]
    fn test_summary_map_duplicate_label_replaces_in_place() {
        let mut map = SummaryMap::new();
        map.insert("Page 1", "first");
        map.insert("Page 2", "second");
        map.insert("Page 1", "again");
        assert_eq!(map.len(), 2);
        assert_eq!(map.joined(), "again\n\nsecond");
    }

    #[test]
    fn test_summary_map_rejects_non_object() {
        assert!(serde_json::from_str::<SummaryMap>(r#""just text""#).is_err());
    }

    #[test]
    fn test_extension() {
        assert_eq!(
            SelectedFile::new("Report.PDF", vec![]).extension().as_deref(),
            Some("pdf")
        );
        assert_eq!(
            SelectedFile::new("archive.tar.gz", vec![]).extension().as_deref(),
            Some("gz")
        );
        assert_eq!(SelectedFile::new("README", vec![]).extension(), None);
        assert_eq!(SelectedFile::new("notes.", vec![]).extension(), None);
    }

    #[test]
    fn test_transcript_entry_serializes_lowercase_sender() {
        let json = serde_json::to_string(&TranscriptEntry::bot("hi")).unwrap();
        assert_eq!(json, r#"{"sender":"bot","text":"hi"}"#);
    }
}
