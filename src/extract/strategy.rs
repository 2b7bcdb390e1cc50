use scraper::{ElementRef, Selector};
use serde::{Deserialize, Serialize};

use crate::error::ProfileError;

/// How to pull one field's text out of a review fragment.
///
/// Strategies are listed per field in priority order; the first one that
/// yields non-empty text wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldStrategy {
    /// Text of the first descendant matching `selector`.
    Text { selector: String },
    /// Attribute value of the first descendant matching `selector`.
    Attr { selector: String, attr: String },
    /// Text of every matching descendant in document order, joined.
    JoinAll {
        selector: String,
        #[serde(default = "default_separator")]
        separator: String,
    },
}

fn default_separator() -> String {
    "\n".to_string()
}

impl FieldStrategy {
    pub fn text(selector: &str) -> Self {
        FieldStrategy::Text {
            selector: selector.to_string(),
        }
    }

    pub fn attr(selector: &str, attr: &str) -> Self {
        FieldStrategy::Attr {
            selector: selector.to_string(),
            attr: attr.to_string(),
        }
    }

    pub fn join_all(selector: &str) -> Self {
        FieldStrategy::JoinAll {
            selector: selector.to_string(),
            separator: default_separator(),
        }
    }

    fn selector(&self) -> &str {
        match self {
            FieldStrategy::Text { selector }
            | FieldStrategy::Attr { selector, .. }
            | FieldStrategy::JoinAll { selector, .. } => selector,
        }
    }
}

pub fn compile_selector(css: &str) -> Result<Selector, ProfileError> {
    Selector::parse(css).map_err(|e| ProfileError::Selector {
        selector: css.to_string(),
        reason: e.to_string(),
    })
}

/// Rendered text of an element with whitespace runs collapsed.
pub fn element_text(el: ElementRef<'_>) -> String {
    collapse_ws(&el.text().collect::<String>())
}

pub fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

// -------------------------
// Compiled plans
// -------------------------

#[derive(Debug)]
enum Take {
    Text,
    Attr(String),
    JoinAll(String),
}

#[derive(Debug)]
struct CompiledStrategy {
    selector: Selector,
    take: Take,
}

impl CompiledStrategy {
    fn compile(strategy: &FieldStrategy) -> Result<Self, ProfileError> {
        let selector = compile_selector(strategy.selector())?;
        let take = match strategy {
            FieldStrategy::Text { .. } => Take::Text,
            FieldStrategy::Attr { attr, .. } => Take::Attr(attr.clone()),
            FieldStrategy::JoinAll { separator, .. } => Take::JoinAll(separator.clone()),
        };
        Ok(Self { selector, take })
    }

    fn apply(&self, fragment: ElementRef<'_>) -> Option<String> {
        let text = match &self.take {
            Take::Text => fragment.select(&self.selector).next().map(element_text)?,
            Take::Attr(attr) => fragment
                .select(&self.selector)
                .next()
                .and_then(|e| e.value().attr(attr))
                .map(collapse_ws)?,
            Take::JoinAll(sep) => fragment
                .select(&self.selector)
                .map(element_text)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(sep),
        };
        (!text.is_empty()).then_some(text)
    }
}

/// Ordered strategy list for one field.
#[derive(Debug, Default)]
pub struct FieldPlan {
    strategies: Vec<CompiledStrategy>,
}

impl FieldPlan {
    pub fn compile(strategies: &[FieldStrategy]) -> Result<Self, ProfileError> {
        let strategies = strategies
            .iter()
            .map(CompiledStrategy::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { strategies })
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    pub fn first_text(&self, fragment: ElementRef<'_>) -> Option<String> {
        self.strategies.iter().find_map(|s| s.apply(fragment))
    }

    /// First strategy whose text `f` accepts.
    pub fn first_map<T>(
        &self,
        fragment: ElementRef<'_>,
        f: impl Fn(&str) -> Option<T>,
    ) -> Option<T> {
        self.strategies
            .iter()
            .filter_map(|s| s.apply(fragment))
            .find_map(|t| f(&t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn root(doc: &Html) -> ElementRef<'_> {
        doc.root_element()
    }

    #[test]
    fn first_non_empty_strategy_wins() {
        let doc = Html::parse_fragment(
            r#"<div><h3>   </h3><span class="alt">Great   tool</span></div>"#,
        );
        let plan =
            FieldPlan::compile(&[FieldStrategy::text("h3"), FieldStrategy::text(".alt")]).unwrap();
        assert_eq!(plan.first_text(root(&doc)).as_deref(), Some("Great tool"));
    }

    #[test]
    fn attr_strategy_reads_attribute() {
        let doc = Html::parse_fragment(
            r#"<div><meta itemprop="datePublished" content="2023-10-12"></div>"#,
        );
        let plan =
            FieldPlan::compile(&[FieldStrategy::attr("[itemprop=datePublished]", "content")])
                .unwrap();
        assert_eq!(plan.first_text(root(&doc)).as_deref(), Some("2023-10-12"));
    }

    #[test]
    fn join_all_keeps_document_order() {
        let doc = Html::parse_fragment(
            r#"<div><p class="c">Pros: fast</p><p class="c"> </p><p class="c">Cons: pricey</p></div>"#,
        );
        let plan = FieldPlan::compile(&[FieldStrategy::join_all(".c")]).unwrap();
        assert_eq!(
            plan.first_text(root(&doc)).as_deref(),
            Some("Pros: fast\nCons: pricey")
        );
    }

    #[test]
    fn no_match_yields_none() {
        let doc = Html::parse_fragment("<div><p>x</p></div>");
        let plan = FieldPlan::compile(&[FieldStrategy::text(".missing")]).unwrap();
        assert_eq!(plan.first_text(root(&doc)), None);
        assert_eq!(FieldPlan::default().first_text(root(&doc)), None);
    }

    #[test]
    fn bad_selector_is_reported() {
        let err = FieldPlan::compile(&[FieldStrategy::text("div[")]).unwrap_err();
        assert!(matches!(err, ProfileError::Selector { .. }));
    }

    #[test]
    fn strategies_deserialize_with_kind_tag() {
        let v: Vec<FieldStrategy> = serde_json::from_str(
            r#"[{"kind":"text","selector":"h3"},{"kind":"join_all","selector":".c"}]"#,
        )
        .unwrap();
        assert_eq!(v, vec![FieldStrategy::text("h3"), FieldStrategy::join_all(".c")]);
    }
}
