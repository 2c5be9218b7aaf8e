/// HTML fragment to plain text
use crate::error::{Result, WatchError};
use scraper::{ElementRef, Html, Node, Selector};

const OUTGOING_PREFIXES: [&str; 2] = [
    "http://www.deviantart.com/users/outgoing?",
    "https://www.deviantart.com/users/outgoing?",
];

/// Compile a CSS selector
pub fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| WatchError::parse("compiling CSS selector", format!("'{}': {:?}", css, e)))
}

/// Extract every text node of `html`, one per line. With `collapse_lines`
/// the result is folded onto a single line.
pub fn extract_text(html: &str, collapse_lines: bool) -> String {
    let fragment = Html::parse_fragment(html);
    let text = fragment.root_element().text().collect::<Vec<_>>().join("\n");
    if collapse_lines {
        text.replace('\n', " ")
    } else {
        text
    }
}

/// Strip the site's redirect wrapper from an outbound link
pub fn strip_outgoing(href: &str) -> &str {
    OUTGOING_PREFIXES
        .iter()
        .find_map(|prefix| href.strip_prefix(prefix))
        .unwrap_or(href)
}

/// Render a note body: `<br>` becomes a newline and each link is replaced by
/// its real destination.
pub fn render_body(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    push_children(element, &mut out);
    out.trim().to_string()
}

fn push_children(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let Some(child_ref) = ElementRef::wrap(child) else {
                    continue;
                };
                match el.name() {
                    "br" => out.push('\n'),
                    "a" => match el.attr("href") {
                        Some(href) => out.push_str(strip_outgoing(href)),
                        None => push_children(child_ref, out),
                    },
                    _ => push_children(child_ref, out),
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text_keeps_lines() {
        let text = extract_text("first<br/>second <b>bold</b>", false);
        assert_eq!(text, "first\nsecond \nbold");
    }

    #[test]
    fn test_extract_text_collapse() {
        let text = extract_text("<a href=\"x\">alice</a><span>!</span>", true);
        assert_eq!(text, "alice !");
    }

    #[test]
    fn test_extract_plain_text_untouched() {
        assert_eq!(extract_text("plain title", true), "plain title");
    }

    #[test]
    fn test_render_body() {
        let html = Html::parse_fragment(
            "<div class=\"mcb-body wrap-text\"> Hello<br>see \
             <a href=\"https://www.deviantart.com/users/outgoing?http://example.com/x\">example.com/...</a>\
             <br/>bye </div>",
        );
        let sel = selector("div.mcb-body").unwrap();
        let div = html.select(&sel).next().unwrap();
        assert_eq!(render_body(div), "Hello\nsee http://example.com/x\nbye");
    }

    #[test]
    fn test_strip_outgoing() {
        assert_eq!(
            strip_outgoing("http://www.deviantart.com/users/outgoing?https://a.b"),
            "https://a.b"
        );
        assert_eq!(strip_outgoing("https://other.site/"), "https://other.site/");
    }
}
