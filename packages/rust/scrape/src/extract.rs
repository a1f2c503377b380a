//! HTML content extraction.
//!
//! Readability heuristics: find the main content region (`<main>`,
//! `<article>`, `[role="main"]`, falling back to `<body>`), drop chrome
//! elements, and flatten what remains into markdown-ish text for prompts.

use scraper::{ElementRef, Html, Selector};

/// Extract the page title: first `<h1>`, falling back to `<title>`.
pub fn extract_title(doc: &Html) -> Option<String> {
    let h1_sel = Selector::parse("h1").unwrap();
    if let Some(el) = doc.select(&h1_sel).next() {
        let text = el.text().collect::<String>().trim().to_string();
        if !text.is_empty() {
            return Some(text);
        }
    }

    let title_sel = Selector::parse("title").unwrap();
    doc.select(&title_sel)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Extract the main content of a page as markdown-ish text.
///
/// With `only_main_content` set, restricts extraction to the detected main
/// region; otherwise the whole body is flattened.
pub fn extract_main_text(doc: &Html, only_main_content: bool) -> String {
    if only_main_content {
        let selectors = ["main", "article", r#"[role="main"]"#, ".content"];
        for sel_str in selectors {
            let sel = Selector::parse(sel_str).unwrap();
            if let Some(el) = doc.select(&sel).next() {
                return flatten_element(el);
            }
        }
    }

    let body_sel = Selector::parse("body").unwrap();
    doc.select(&body_sel)
        .next()
        .map(flatten_element)
        .unwrap_or_default()
}

/// Flatten block-level elements under `root` into line-oriented text.
/// Headings keep their level as `#` prefixes; code blocks get fences.
fn flatten_element(root: ElementRef<'_>) -> String {
    let block_sel = Selector::parse("h1, h2, h3, h4, h5, h6, p, li, pre, blockquote").unwrap();
    let chrome_sel = Selector::parse("nav, header, footer, aside, script, style").unwrap();

    // Collect chrome subtree node ids so blocks inside them are skipped.
    let chrome_ids: Vec<_> = root
        .select(&chrome_sel)
        .flat_map(|el| el.descendants().map(|n| n.id()))
        .collect();

    let mut lines = Vec::new();
    for el in root.select(&block_sel) {
        if chrome_ids.contains(&el.id()) {
            continue;
        }
        // Skip blocks nested inside another matched block (e.g. <p> in <li>).
        let nested = el
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|a| matches_block(a.value().name()));
        if nested {
            continue;
        }

        let text = el.text().collect::<String>().trim().to_string();
        if text.is_empty() {
            continue;
        }

        let tag = el.value().name();
        let line = match tag {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level: usize = tag[1..].parse().unwrap_or(1);
                format!("{} {text}", "#".repeat(level))
            }
            "li" => format!("- {text}"),
            "pre" => format!("```\n{text}\n```"),
            "blockquote" => format!("> {text}"),
            _ => text,
        };
        lines.push(line);
    }

    lines.join("\n\n")
}

fn matches_block(tag: &str) -> bool {
    matches!(
        tag,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "p" | "li" | "pre" | "blockquote"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_prefers_h1() {
        let doc = Html::parse_document(
            "<html><head><title>Tab Title</title></head><body><h1>Real Title</h1></body></html>",
        );
        assert_eq!(extract_title(&doc).as_deref(), Some("Real Title"));
    }

    #[test]
    fn title_falls_back_to_title_tag() {
        let doc =
            Html::parse_document("<html><head><title>Tab Title</title></head><body></body></html>");
        assert_eq!(extract_title(&doc).as_deref(), Some("Tab Title"));
    }

    #[test]
    fn main_text_prefers_main_region() {
        let doc = Html::parse_document(
            r#"<html><body>
                <nav><p>Navigation junk</p></nav>
                <main><h1>Guide</h1><p>Body text.</p><li>Item one</li></main>
                <footer><p>Footer junk</p></footer>
            </body></html>"#,
        );
        let text = extract_main_text(&doc, true);
        assert!(text.contains("# Guide"));
        assert!(text.contains("Body text."));
        assert!(text.contains("- Item one"));
        assert!(!text.contains("Navigation junk"));
        assert!(!text.contains("Footer junk"));
    }

    #[test]
    fn body_fallback_strips_chrome() {
        let doc = Html::parse_document(
            r#"<html><body>
                <nav><p>Menu</p></nav>
                <h2>Section</h2><p>Content here.</p>
            </body></html>"#,
        );
        let text = extract_main_text(&doc, false);
        assert!(text.contains("## Section"));
        assert!(text.contains("Content here."));
        assert!(!text.contains("Menu"));
    }

    #[test]
    fn code_blocks_get_fences() {
        let doc = Html::parse_document(
            "<html><body><main><pre>let x = 1;</pre></main></body></html>",
        );
        let text = extract_main_text(&doc, true);
        assert!(text.contains("```\nlet x = 1;\n```"));
    }
}
