use crate::dom::{Display, Document, Element, Visibility};

const TEXT_BEARING_TAGS: [&str; 14] = [
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "li", "td", "th", "span", "div", "article", "section",
];

fn is_text_bearing(tag: &str) -> bool {
    TEXT_BEARING_TAGS.contains(&tag)
}

/// Concatenates the trimmed text of every visible text-bearing element.
///
/// Elements are visited in document order. Nested matches contribute their
/// text once per matching ancestor, as a `querySelectorAll` walk would.
pub fn extract_page_text(document: &Document) -> String {
    let mut text = String::new();
    for element in &document.body {
        visit(element, true, &mut text);
    }
    text.trim().to_string()
}

fn visit(element: &Element, ancestors_rendered: bool, out: &mut String) {
    // display:none collapses the whole subtree; visibility can be overridden below.
    let has_box =
        ancestors_rendered && element.rendered && element.style.display != Display::None;
    let visible = has_box && element.style.visibility != Visibility::Hidden;

    if visible && is_text_bearing(&element.tag) {
        let content = element.text_content();
        let content = content.trim();
        if !content.is_empty() {
            out.push_str(content);
            out.push(' ');
        }
    }
    for child in &element.children {
        visit(child, has_box, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_visible_text_in_order() {
        let doc = Document::new(vec![
            Element::with_text("h1", "  Title "),
            Element::with_text("p", "First paragraph."),
            Element::with_text("button", "Click"),
            Element::with_text("li", "Item"),
        ]);
        assert_eq!(extract_page_text(&doc), "Title First paragraph. Item");
    }

    #[test]
    fn skips_hidden_and_unrendered_elements() {
        let doc = Document::new(vec![
            Element::with_text("p", "shown"),
            Element::with_text("p", "none").display(Display::None),
            Element::with_text("p", "hidden").visibility(Visibility::Hidden),
            Element::with_text("p", "detached").detached(),
            Element::new("section")
                .display(Display::None)
                .child(Element::with_text("p", "inside collapsed")),
        ]);
        assert_eq!(extract_page_text(&doc), "shown");
    }

    #[test]
    fn nested_matches_repeat_text() {
        let doc = Document::new(vec![
            Element::new("div").child(Element::with_text("p", "Nested.")),
        ]);
        assert_eq!(extract_page_text(&doc), "Nested. Nested.");
    }

    #[test]
    fn empty_page_yields_empty_string() {
        assert_eq!(extract_page_text(&Document::default()), "");
        let whitespace = Document::new(vec![Element::with_text("div", "   ")]);
        assert_eq!(extract_page_text(&whitespace), "");
    }
}
