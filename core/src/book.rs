use crate::DocId;
use lazy_static::lazy_static;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeSet, HashMap};
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    /// Whole-string abbreviation expansions for languages and domains.
    static ref SYNONYMS: HashMap<&'static str, &'static str> = {
        let pairs: &[(&str, &str)] = &[
            ("js", "javascript"),
            ("c#", "csharp"),
            ("cpp", "c++"),
            ("ai", "artificial intelligence"),
            ("dsa", "data structure"),
            ("ml", "machine learning"),
            ("py", "python"),
        ];
        pairs.iter().copied().collect()
    };
}

/// A single catalog entry. Blank text fields are absent after deserialization
/// and tags never contain blanks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookRecord {
    #[serde(alias = "bookId")]
    pub id: DocId,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub author: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub category: Option<String>,
    #[serde(default, alias = "progLang", deserialize_with = "blank_as_none")]
    pub language: Option<String>,
    #[serde(default, alias = "tag", deserialize_with = "clean_tags")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default, alias = "downloadLink")]
    pub download_link: Option<String>,
    #[serde(default, alias = "coverUrl")]
    pub cover_url: Option<String>,
}

impl BookRecord {
    pub fn new(id: DocId, title: &str) -> Self {
        Self {
            id,
            title: clean_field(title),
            author: None,
            category: None,
            language: None,
            tags: Vec::new(),
            rating: None,
            download_link: None,
            cover_url: None,
        }
    }

    pub fn with_author(mut self, author: &str) -> Self {
        self.author = clean_field(author);
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = clean_field(category);
        self
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = clean_field(language);
        self
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().filter_map(|t| clean_field(t)).collect();
        self
    }

    pub fn title_or_empty(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }

    /// All free text that takes part in search, one field per entry.
    pub fn searchable_fields(&self) -> impl Iterator<Item = &str> {
        [&self.title, &self.author, &self.category, &self.language]
            .into_iter()
            .filter_map(|f| f.as_deref())
            .chain(self.tags.iter().map(String::as_str))
    }

    /// Normalized tag set: every tag is split on `,` `;` `/` and each piece normalized.
    pub fn normalized_tags(&self) -> BTreeSet<String> {
        self.tags
            .iter()
            .flat_map(|t| t.split(|c| matches!(c, ',' | ';' | '/')))
            .map(normalize)
            .filter(|t| !t.is_empty())
            .collect()
    }
}

/// Trim, lower-case and expand the whole string through the synonym table.
pub fn normalize(s: &str) -> String {
    let lowered = s.trim().nfkc().collect::<String>().to_lowercase();
    match SYNONYMS.get(lowered.as_str()) {
        Some(expanded) => (*expanded).to_string(),
        None => lowered,
    }
}

/// Case-insensitive equality where an absent side never matches.
pub fn same_text(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.trim().to_lowercase() == b.trim().to_lowercase(),
        _ => false,
    }
}

fn clean_field(s: &str) -> Option<String> {
    let t = s.trim();
    if t.is_empty() { None } else { Some(t.to_string()) }
}

fn blank_as_none<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let raw: Option<String> = Option::deserialize(d)?;
    Ok(raw.as_deref().and_then(clean_field))
}

fn clean_tags<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTags {
        One(String),
        Many(Vec<Option<String>>),
    }
    let raw: Option<RawTags> = Option::deserialize(d)?;
    let items = match raw {
        None => Vec::new(),
        Some(RawTags::One(s)) => vec![Some(s)],
        Some(RawTags::Many(v)) => v,
    };
    Ok(items.into_iter().flatten().filter_map(|t| clean_field(&t)).collect())
}

/// Read-only view over the corpus, addressable by document id.
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    books: Vec<BookRecord>,
    by_id: HashMap<DocId, usize>,
}

impl Catalog {
    pub fn new(books: Vec<BookRecord>) -> Self {
        let by_id = books.iter().enumerate().map(|(pos, b)| (b.id, pos)).collect();
        Self { books, by_id }
    }

    pub fn get(&self, id: DocId) -> Option<&BookRecord> {
        self.by_id.get(&id).map(|&pos| &self.books[pos])
    }

    pub fn title(&self, id: DocId) -> Option<&str> {
        self.get(id).and_then(|b| b.title.as_deref())
    }

    pub fn books(&self) -> &[BookRecord] {
        &self.books
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_expands_synonyms() {
        assert_eq!(normalize("  JS "), "javascript");
        assert_eq!(normalize("Javascript"), "javascript");
        assert_eq!(normalize("ML"), "machine learning");
        assert_eq!(normalize("Rust"), "rust");
    }

    #[test]
    fn tags_are_split_and_normalized() {
        let b = BookRecord::new(1, "x").with_tags(&["JS; web", "Py/ ", "  "]);
        let tags = b.normalized_tags();
        assert_eq!(tags.into_iter().collect::<Vec<_>>(), vec!["javascript", "python", "web"]);
    }

    #[test]
    fn deserializes_camel_case_names_and_nulls() {
        let json = r#"{"bookId": 7, "title": "  ", "author": null, "progLang": "C",
                       "tag": ["algorithms", null, " "], "rating": 4.5, "downloadLink": "http://x"}"#;
        let b: BookRecord = serde_json::from_str(json).unwrap();
        assert_eq!(b.id, 7);
        assert_eq!(b.title, None);
        assert_eq!(b.author, None);
        assert_eq!(b.language.as_deref(), Some("C"));
        assert_eq!(b.tags, vec!["algorithms".to_string()]);
        assert_eq!(b.download_link.as_deref(), Some("http://x"));
    }

    #[test]
    fn single_string_tag_is_accepted() {
        let b: BookRecord = serde_json::from_str(r#"{"id": 1, "tags": "rust"}"#).unwrap();
        assert_eq!(b.tags, vec!["rust".to_string()]);
        let b: BookRecord = serde_json::from_str(r#"{"id": 2, "tags": null}"#).unwrap();
        assert!(b.tags.is_empty());
    }

    #[test]
    fn absent_fields_never_match() {
        assert!(!same_text(None, None));
        assert!(!same_text(Some("Knuth"), None));
        assert!(same_text(Some("knuth"), Some("KNUTH ")));
    }
}
