//! Document query capability
//!
//! The extractors only talk to [`DocumentQuery`] and [`NodeQuery`]: find the
//! first or all elements matching a pattern, look inside an element, read an
//! attribute, read normalized text. [`HtmlDocument`] implements them over
//! `scraper`.

use scraper::{ElementRef, Html, Selector};

use super::{ParsingError, ParsingResult};

/// A compiled structural pattern (CSS selector syntax)
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    selector: Selector,
}

impl Pattern {
    pub fn parse(source: &str) -> ParsingResult<Self> {
        let selector =
            Selector::parse(source).map_err(|e| ParsingError::invalid_pattern(source, e))?;
        Ok(Self {
            source: source.to_string(),
            selector,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

/// Query access to a parsed document
pub trait DocumentQuery {
    type Node<'a>: NodeQuery<'a>
    where
        Self: 'a;

    /// First match in document order
    fn find_first(&self, pattern: &Pattern) -> Option<Self::Node<'_>>;

    /// Every match in document order
    fn find_all(&self, pattern: &Pattern) -> Vec<Self::Node<'_>>;

    fn exists(&self, pattern: &Pattern) -> bool {
        self.find_first(pattern).is_some()
    }
}

/// Query access to one element of a parsed document
pub trait NodeQuery<'a>: Copy + 'a {
    /// First descendant match in document order
    fn find_first_within(&self, pattern: &Pattern) -> Option<Self>;

    /// Every descendant match in document order
    fn find_all_within(&self, pattern: &Pattern) -> Vec<Self>;

    fn attribute(&self, name: &str) -> Option<&'a str>;

    /// Text content with whitespace runs collapsed and ends trimmed
    fn text_content(&self) -> String;
}

/// Collapse runs of whitespace into single spaces and trim the ends
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// HTML document parsed with `scraper`
pub struct HtmlDocument {
    html: Html,
}

impl HtmlDocument {
    pub fn parse(markup: &str) -> Self {
        Self {
            html: Html::parse_document(markup),
        }
    }
}

impl DocumentQuery for HtmlDocument {
    type Node<'a>
        = ElementRef<'a>
    where
        Self: 'a;

    fn find_first(&self, pattern: &Pattern) -> Option<ElementRef<'_>> {
        self.html.select(&pattern.selector).next()
    }

    fn find_all(&self, pattern: &Pattern) -> Vec<ElementRef<'_>> {
        self.html.select(&pattern.selector).collect()
    }
}

impl<'a> NodeQuery<'a> for ElementRef<'a> {
    fn find_first_within(&self, pattern: &Pattern) -> Option<Self> {
        self.select(&pattern.selector).next()
    }

    fn find_all_within(&self, pattern: &Pattern) -> Vec<Self> {
        self.select(&pattern.selector).collect()
    }

    fn attribute(&self, name: &str) -> Option<&'a str> {
        self.value().attr(name)
    }

    fn text_content(&self) -> String {
        let raw: String = self.text().collect();
        normalize_whitespace(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKUP: &str = r#"
        <html><body>
            <div class="group"><span id="a">  first
               item </span><span id="b">second</span></div>
            <div class="group"><span id="c">third</span></div>
        </body></html>
    "#;

    #[test]
    fn invalid_pattern_is_reported() {
        let err = Pattern::parse("div[").unwrap_err();
        assert!(matches!(err, ParsingError::InvalidPattern { .. }));
    }

    #[test]
    fn finds_in_document_order() {
        let doc = HtmlDocument::parse(MARKUP);
        let span = Pattern::parse("span").unwrap();

        let ids: Vec<_> = doc
            .find_all(&span)
            .iter()
            .filter_map(|node| node.attribute("id"))
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(doc.find_first(&span).unwrap().text_content(), "first item");
    }

    #[test]
    fn scoped_queries_stay_inside_the_node() {
        let doc = HtmlDocument::parse(MARKUP);
        let group = Pattern::parse("div.group").unwrap();
        let span = Pattern::parse("span").unwrap();

        let groups = doc.find_all(&group);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].find_all_within(&span).len(), 2);
        assert_eq!(groups[1].find_first_within(&span).unwrap().text_content(), "third");
    }

    #[test]
    fn missing_elements_and_attributes() {
        let doc = HtmlDocument::parse(MARKUP);
        assert!(!doc.exists(&Pattern::parse("h1").unwrap()));
        let first = doc.find_first(&Pattern::parse("span").unwrap()).unwrap();
        assert_eq!(first.attribute("title"), None);
    }

    #[test]
    fn whitespace_normalization() {
        assert_eq!(normalize_whitespace("  Add\n\t to   Basket "), "Add to Basket");
        assert_eq!(normalize_whitespace(""), "");
    }
}
