// Query parameters and Lucene search-fragment helpers

pub const MAX_LIMIT: u32 = 1000;
pub const DEFAULT_LIMIT: u32 = 100;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    pub search: Option<String>,
    pub limit: Option<u32>,
    pub skip: Option<u32>,
    pub sort: Option<String>,
    pub count: Option<String>,
    pub extra: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, search: &str) -> Self {
        self.search = Some(search.to_string()).filter(|s| !s.is_empty());
        self
    }

    /// Clamped to 1..=1000
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit.clamp(1, MAX_LIMIT));
        self
    }

    pub fn skip(mut self, skip: u32) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn sort(mut self, sort: &str) -> Self {
        self.sort = Some(sort.to_string()).filter(|s| !s.is_empty());
        self
    }

    pub fn count(mut self, field: &str) -> Self {
        self.count = Some(field.to_string()).filter(|s| !s.is_empty());
        self
    }

    pub fn param(mut self, key: &str, value: &str) -> Self {
        self.extra.push((key.to_string(), value.to_string()));
        self
    }

    pub fn page_size(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_LIMIT)
    }

    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(s) = &self.search {
            pairs.push(("search".to_string(), s.clone()));
        }
        if let Some(l) = self.limit {
            pairs.push(("limit".to_string(), l.to_string()));
        }
        if let Some(s) = self.skip {
            pairs.push(("skip".to_string(), s.to_string()));
        }
        if let Some(s) = &self.sort {
            pairs.push(("sort".to_string(), s.clone()));
        }
        if let Some(c) = &self.count {
            pairs.push(("count".to_string(), c.clone()));
        }
        pairs.extend(self.extra.iter().cloned());
        pairs
    }
}

/// `field:term`, quoting the term when it has whitespace or any of `:/()`
pub fn q(field: &str, term: &str) -> String {
    let needs_quotes = term.chars().any(|c| c.is_whitespace() || ":/()".contains(c));
    let safe = term.replace('"', "\\\"");
    if needs_quotes {
        format!("{}:\"{}\"", field, safe)
    } else {
        format!("{}:{}", field, safe)
    }
}

/// `field:[start TO end]`
pub fn range(field: &str, start: &str, end: &str) -> String {
    format!("{}:[{} TO {}]", field, start, end)
}

pub fn and(parts: &[String]) -> String {
    join(parts, " AND ")
}

pub fn or(parts: &[String]) -> String {
    join(parts, " OR ")
}

fn join(parts: &[String], sep: &str) -> String {
    let kept: Vec<&str> = parts.iter().map(|p| p.trim()).filter(|p| !p.is_empty()).collect();
    if kept.len() > 1 {
        kept.iter().map(|p| format!("({})", p)).collect::<Vec<_>>().join(sep)
    } else {
        kept.join(sep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_clamps() {
        assert_eq!(QueryParams::new().limit(0).limit, Some(1));
        assert_eq!(QueryParams::new().limit(5000).limit, Some(1000));
        assert_eq!(QueryParams::new().page_size(), 100);
    }

    #[test]
    fn test_to_pairs_order() {
        let p = QueryParams::new().search("a:b").limit(5).skip(10).sort("x:desc").param("k", "v");
        let keys: Vec<String> = p.to_pairs().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["search", "limit", "skip", "sort", "k"]);
    }

    #[test]
    fn test_q_quotes_specials() {
        assert_eq!(q("x", "a b"), "x:\"a b\"");
        assert_eq!(q("x", "aspirin"), "x:aspirin");
        assert_eq!(q("app", "NDA/021"), "app:\"NDA/021\"");
        assert_eq!(q("x", "say \"hi\" now"), "x:\"say \\\"hi\\\" now\"");
    }

    #[test]
    fn test_range_and_joiners() {
        assert_eq!(range("receivedate", "20200101", "20201231"), "receivedate:[20200101 TO 20201231]");
        assert_eq!(and(&["a:1".to_string(), "b:2".to_string()]), "(a:1) AND (b:2)");
        assert_eq!(or(&["a:1".to_string(), " ".to_string()]), "a:1");
    }
}
