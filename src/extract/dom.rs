use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashSet;
use tracing::debug;

/// Parse a selector, logging instead of failing on bad input
pub fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(sel) => Some(sel),
        Err(e) => {
            debug!(css, error = ?e, "invalid selector skipped");
            None
        }
    }
}

/// Whitespace-collapsed text of an element, like `get_text(" ", strip=True)`
pub fn element_text(element: &ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First non-empty text from the first selector that matches
pub fn pick_text(document: &Html, selectors: &[&str]) -> String {
    for css in selectors {
        let Some(sel) = selector(css) else { continue };
        for node in document.select(&sel) {
            let text = element_text(&node);
            if !text.is_empty() {
                return text;
            }
        }
    }
    String::new()
}

/// `content` of the first `<meta>` matching `css`
pub fn meta_content(document: &Html, css: &str) -> Option<String> {
    let sel = selector(css)?;
    document
        .select(&sel)
        .filter_map(|m| m.value().attr("content"))
        .map(str::trim)
        .find(|c| !c.is_empty())
        .map(str::to_string)
}

/// Ancestors of `element` that are elements, nearest first
pub fn element_ancestors<'a>(element: &ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    element.ancestors().filter_map(ElementRef::wrap)
}

pub fn has_ancestor_named(element: &ElementRef<'_>, name: &str) -> bool {
    element_ancestors(element).any(|a| a.value().name() == name)
}

/// Find the element carrying a given `id` attribute
pub fn find_by_id<'a>(document: &'a Html, id: &str) -> Option<ElementRef<'a>> {
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().id() == Some(id))
}

/// Keep the first occurrence of each string, preserving order
pub fn dedupe_preserving_order(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template", "svg", "head"];
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "li", "ul", "ol", "section", "article", "tr", "table", "h1", "h2", "h3", "h4",
    "h5", "h6", "header", "footer", "main", "aside", "nav", "blockquote",
];

/// Render an element's text keeping line structure.
///
/// `<br>` and block elements become line breaks; runs of blank lines collapse to
/// one, so paragraph gaps survive as `"\n\n"`. Elements in `skip` are dropped
/// along with their subtree.
pub fn render_text(element: &ElementRef<'_>, skip: &[&str]) -> String {
    let mut out = String::new();
    render_into(element, skip, &mut out);
    tidy_lines(&out)
}

fn render_into(element: &ElementRef<'_>, skip: &[&str], out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if SKIPPED_TAGS.contains(&name) || skip.contains(&name) {
                    continue;
                }
                if name == "br" {
                    out.push('\n');
                    continue;
                }
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                let block = BLOCK_TAGS.contains(&name);
                if block {
                    break_line(out);
                }
                render_into(&child_el, skip, out);
                if block {
                    break_line(out);
                }
            }
            _ => {}
        }
    }
}

/// Adjacent blocks share one line break; only explicit `<br>`s stack up
fn break_line(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

fn tidy_lines(raw: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut blank_run = 0;
    for line in raw.lines() {
        let cleaned = collapse_whitespace(line);
        if cleaned.is_empty() {
            blank_run += 1;
            continue;
        }
        if !lines.is_empty() && blank_run > 0 {
            lines.push(String::new());
        }
        blank_run = 0;
        lines.push(cleaned);
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pick_text_falls_through_selectors() {
        let doc = Html::parse_document(r#"<h1>  Seaside   loft </h1><div data-testid="title"></div>"#);
        let text = pick_text(&doc, &[r#"[data-testid="title"]"#, "h1"]);
        assert_eq!(text, "Seaside loft");
    }

    #[test]
    fn render_text_keeps_breaks() {
        let doc = Html::parse_fragment(
            "<div><span>First line<br>Second line<br><br>New para</span><script>x()</script></div>",
        );
        let sel = Selector::parse("div").unwrap();
        let div = doc.select(&sel).next().unwrap();
        assert_eq!(render_text(&div, &[]), "First line\nSecond line\n\nNew para");
    }

    #[test]
    fn dedupe_keeps_first_seen() {
        let items = vec!["b".to_string(), "a".to_string(), "b".to_string()];
        assert_eq!(dedupe_preserving_order(items), vec!["b", "a"]);
    }
}
