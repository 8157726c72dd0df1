use pulldown_cmark::{html, Event, Options, Parser};

/// Render a markdown body to HTML. Single newlines inside a paragraph are
/// kept as line breaks.
pub fn render_markdown(body: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);

    let parser = Parser::new_ext(body, options).map(|event| match event {
        Event::SoftBreak => Event::HardBreak,
        _ => event,
    });

    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}

/// Paragraphs of a body, split on blank lines.
pub fn paragraphs(body: &str) -> Vec<String> {
    let mut out = vec![];
    let mut current: Vec<&str> = vec![];
    for line in body.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                out.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        out.push(current.join("\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_markdown() {
        let html = render_markdown("**Szparagi** ~~zimą~~\nwiosną");
        assert!(html.contains("<strong>Szparagi</strong>"));
        assert!(html.contains("<del>zimą</del>"));
        assert!(html.contains("<br />"));
    }

    #[test]
    fn test_paragraphs() {
        let body = "Pierwszy akapit.\nciąg dalszy\n\n  \nDrugi.\n";
        assert_eq!(paragraphs(body), vec!["Pierwszy akapit.\nciąg dalszy", "Drugi."]);
        assert!(paragraphs("").is_empty());
    }
}
