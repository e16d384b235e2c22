//! Glossary data model: entries, grammatical gender, and the search
//! configuration value object passed from the caller into the coordinator.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Grammatical gender of the German headword, decoded from the raw code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Masculine,
    Feminine,
    Neuter,
    Plural,
    /// A code was stored but does not name a gender.
    #[serde(rename = "none")]
    Unmarked,
}

impl Gender {
    /// Decode a raw gender code (`m`, `f`, `n`, `pl`). Unknown codes map to
    /// `Unmarked`.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_lowercase().as_str() {
            "m" => Gender::Masculine,
            "f" => Gender::Feminine,
            "n" => Gender::Neuter,
            "pl" => Gender::Plural,
            _ => Gender::Unmarked,
        }
    }

    /// German definite article for this gender.
    pub fn article(self) -> &'static str {
        match self {
            Gender::Masculine => "der",
            Gender::Feminine | Gender::Plural => "die",
            Gender::Neuter => "das",
            Gender::Unmarked => "",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Masculine => write!(f, "Masculine"),
            Gender::Feminine => write!(f, "Feminine"),
            Gender::Neuter => write!(f, "Neuter"),
            Gender::Plural => write!(f, "Plural"),
            Gender::Unmarked => write!(f, "None"),
        }
    }
}

/// One glossary row. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entry {
    pub id: i64,
    /// German term.
    pub headword: String,
    /// English term.
    pub translation: String,
    pub gender: Option<Gender>,
    pub headword_annotations: Vec<String>,
    pub headword_variants: Vec<String>,
    pub translation_annotations: Vec<String>,
    pub translation_variants: Vec<String>,
    pub part_of_speech: Option<String>,
    /// Raw comma-delimited subject domains.
    pub subject_domain: Option<String>,
    /// Raw comma-delimited usage levels.
    pub usage_level: Option<String>,
    pub is_idiom: bool,
}

impl Entry {
    /// Definite article for the headword, or "" when not applicable.
    pub fn article(&self) -> &'static str {
        self.gender.map(Gender::article).unwrap_or("")
    }

    /// Headword prefixed with its article, e.g. "das Haus".
    pub fn display_headword(&self) -> String {
        match self.article() {
            "" => self.headword.clone(),
            article => format!("{article} {}", self.headword),
        }
    }

    pub fn subject_domains(&self) -> Vec<&str> {
        split_tags(self.subject_domain.as_deref())
    }

    pub fn usage_levels(&self) -> Vec<&str> {
        split_tags(self.usage_level.as_deref())
    }

    /// Subject domains followed by usage levels.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags = self.subject_domains();
        tags.extend(self.usage_levels());
        tags
    }

    /// True when there is anything to show beyond the term pair.
    pub fn has_additional_info(&self) -> bool {
        !self.headword_annotations.is_empty()
            || !self.headword_variants.is_empty()
            || !self.translation_annotations.is_empty()
            || !self.translation_variants.is_empty()
            || self.part_of_speech.is_some()
            || !self.tags().is_empty()
    }
}

/// Comma-split, trimmed, order preserved. Empty segments are dropped.
fn split_tags(raw: Option<&str>) -> Vec<&str> {
    match raw {
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .collect(),
        None => Vec::new(),
    }
}

/// Decode a JSON string-array column. Absent, empty or malformed input
/// yields an empty list.
pub fn decode_list(raw: Option<&str>) -> Vec<String> {
    match raw {
        Some(raw) if !raw.trim().is_empty() => serde_json::from_str(raw).unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Which side of an entry a search term is matched against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldMode {
    /// German headword.
    #[serde(alias = "german")]
    Source,
    /// English translation.
    #[serde(alias = "english")]
    Target,
    #[default]
    Both,
}

impl fmt::Display for FieldMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldMode::Source => write!(f, "German"),
            FieldMode::Target => write!(f, "English"),
            FieldMode::Both => write!(f, "Both"),
        }
    }
}

impl FromStr for FieldMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "source" | "german" | "de" => Ok(FieldMode::Source),
            "target" | "english" | "en" => Ok(FieldMode::Target),
            "both" => Ok(FieldMode::Both),
            other => Err(format!("unknown field mode: {other}")),
        }
    }
}

/// Result ordering applied after filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// Keep the store's natural order.
    #[default]
    Relevance,
    Ascending,
    Descending,
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortMode::Relevance => write!(f, "Relevance"),
            SortMode::Ascending => write!(f, "A-Z"),
            SortMode::Descending => write!(f, "Z-A"),
        }
    }
}

impl FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "relevance" => Ok(SortMode::Relevance),
            "asc" | "ascending" | "a-z" => Ok(SortMode::Ascending),
            "desc" | "descending" | "z-a" => Ok(SortMode::Descending),
            other => Err(format!("unknown sort mode: {other}")),
        }
    }
}

/// Everything the caller can edit about the current search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfiguration {
    pub query_text: String,
    pub field_mode: FieldMode,
    pub sort_mode: SortMode,
    pub idiom_only: bool,
}

impl SearchConfiguration {
    pub fn with_query(query: impl Into<String>) -> Self {
        Self {
            query_text: query.into(),
            ..Self::default()
        }
    }

    /// Query text with surrounding whitespace removed.
    pub fn trimmed_query(&self) -> &str {
        self.query_text.trim()
    }

    /// True when no store search should be issued.
    pub fn is_discovery(&self) -> bool {
        self.trimmed_query().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(gender: Option<Gender>) -> Entry {
        Entry {
            id: 1,
            headword: "Haus".into(),
            translation: "house".into(),
            gender,
            headword_annotations: Vec::new(),
            headword_variants: Vec::new(),
            translation_annotations: Vec::new(),
            translation_variants: Vec::new(),
            part_of_speech: None,
            subject_domain: None,
            usage_level: None,
            is_idiom: false,
        }
    }

    #[test]
    fn gender_codes_decode_case_insensitively() {
        assert_eq!(Gender::from_code("m"), Gender::Masculine);
        assert_eq!(Gender::from_code("F"), Gender::Feminine);
        assert_eq!(Gender::from_code("n"), Gender::Neuter);
        assert_eq!(Gender::from_code("PL"), Gender::Plural);
        assert_eq!(Gender::from_code("x"), Gender::Unmarked);
        assert_eq!(Gender::from_code(""), Gender::Unmarked);
    }

    #[test]
    fn display_headword_uses_article_only_when_known() {
        assert_eq!(entry(Some(Gender::Neuter)).display_headword(), "das Haus");
        assert_eq!(entry(Some(Gender::Plural)).display_headword(), "die Haus");
        assert_eq!(entry(Some(Gender::Unmarked)).display_headword(), "Haus");
        assert_eq!(entry(None).display_headword(), "Haus");
    }

    #[test]
    fn tags_are_trimmed_and_keep_order_and_duplicates() {
        let mut e = entry(None);
        e.subject_domain = Some(" law, finance ,law".into());
        e.usage_level = Some("coll.,,".into());
        assert_eq!(e.subject_domains(), vec!["law", "finance", "law"]);
        assert_eq!(e.usage_levels(), vec!["coll."]);
        assert_eq!(e.tags(), vec!["law", "finance", "law", "coll."]);
        assert!(e.has_additional_info());
        assert!(!entry(None).has_additional_info());
    }

    #[test]
    fn malformed_list_encodings_decode_to_empty() {
        assert_eq!(decode_list(Some(r#"["a","b"]"#)), vec!["a", "b"]);
        assert!(decode_list(None).is_empty());
        assert!(decode_list(Some("")).is_empty());
        assert!(decode_list(Some("[1, 2]")).is_empty());
        assert!(decode_list(Some("not json")).is_empty());
    }

    #[test]
    fn modes_parse_from_user_input() {
        assert_eq!("German".parse::<FieldMode>(), Ok(FieldMode::Source));
        assert_eq!("english".parse::<FieldMode>(), Ok(FieldMode::Target));
        assert_eq!("z-a".parse::<SortMode>(), Ok(SortMode::Descending));
        assert!("sideways".parse::<SortMode>().is_err());
    }

    #[test]
    fn whitespace_only_query_is_discovery() {
        assert!(SearchConfiguration::with_query("   ").is_discovery());
        assert!(!SearchConfiguration::with_query(" haus ").is_discovery());
        assert_eq!(SearchConfiguration::with_query(" haus ").trimmed_query(), "haus");
    }
}
