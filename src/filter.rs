use std::collections::HashSet;

use crate::source::RawItem;

/// Drops items whose tags or title mention a configured keyword.
#[derive(Debug, Clone, Default)]
pub struct KeywordFilter {
    keywords: Vec<String>,
}

impl KeywordFilter {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    #[cfg(test)]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// True if any keyword equals a tag or occurs in the title (case-insensitive).
    pub fn should_skip(&self, item: &RawItem) -> bool {
        if self.keywords.is_empty() {
            return false;
        }
        let tags: HashSet<String> = item.categories.iter().map(|c| c.trim().to_lowercase()).collect();
        let title = item.title.to_lowercase();
        self.keywords.iter().any(|k| tags.contains(k) || title.contains(k.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn item(title: &str, categories: &[&str]) -> RawItem {
        RawItem {
            title: title.to_string(),
            link: "https://a.test/x".to_string(),
            summary: String::new(),
            categories: categories.iter().map(|c| c.to_string()).collect(),
            published_at: Utc::now().fixed_offset(),
            source_name: "a".to_string(),
        }
    }

    #[test]
    fn title_substring_is_skipped() {
        let f = KeywordFilter::new(["crypto"]);
        assert!(f.should_skip(&item("Why Cryptocurrency fell", &[])));
    }

    #[test]
    fn tag_match_is_case_insensitive_and_exact() {
        let f = KeywordFilter::new(["Sponsored"]);
        assert!(f.should_skip(&item("Fine title", &["news", "SPONSORED"])));
        assert!(!f.should_skip(&item("Fine title", &["sponsored-content"])));
    }

    #[test]
    fn no_match_is_kept() {
        let f = KeywordFilter::new(["crypto", "ads"]);
        assert!(!f.should_skip(&item("Rust 2.0 released", &["programming"])));
    }

    #[test]
    fn empty_keyword_list_skips_nothing() {
        let f = KeywordFilter::new(Vec::<String>::new());
        assert!(!f.should_skip(&item("anything at all", &["crypto"])));
        let blanks = KeywordFilter::new(["", "  "]);
        assert!(blanks.keywords().is_empty());
        assert!(!blanks.should_skip(&item("anything", &[])));
    }
}
