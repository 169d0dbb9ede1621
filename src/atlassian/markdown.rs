//! Markdown to Confluence storage format

use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd, html};

/// Convert Markdown to Confluence storage XHTML.
///
/// Tables, strikethrough and task lists are enabled. Fenced code blocks
/// become `code` macros so Confluence highlights them.
pub fn markdown_to_storage(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut events = Vec::new();
    let mut code: Option<(String, String)> = None;

    for event in Parser::new_ext(markdown, options) {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                let language = match kind {
                    CodeBlockKind::Fenced(lang) => lang.split_whitespace().next().unwrap_or("").to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                code = Some((language, String::new()));
            }
            Event::Text(text) if code.is_some() => {
                if let Some((_, body)) = code.as_mut() {
                    body.push_str(&text);
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some((language, body)) = code.take() {
                    events.push(Event::Html(CowStr::from(code_macro(&language, &body))));
                }
            }
            other => events.push(other),
        }
    }

    let mut output = String::with_capacity(markdown.len() * 2);
    html::push_html(&mut output, events.into_iter());
    output
}

fn code_macro(language: &str, body: &str) -> String {
    let mut xml = String::from("<ac:structured-macro ac:name=\"code\">");
    if !language.is_empty() {
        xml.push_str(&format!(
            "<ac:parameter ac:name=\"language\">{}</ac:parameter>",
            language
        ));
    }
    // CDATA cannot contain its own terminator
    let body = body.trim_end_matches('\n').replace("]]>", "]]]]><![CDATA[>");
    xml.push_str(&format!(
        "<ac:plain-text-body><![CDATA[{}]]></ac:plain-text-body></ac:structured-macro>\n",
        body
    ));
    xml
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headings_lists_and_emphasis() {
        let storage = markdown_to_storage("# Title\n\n- **bold** item\n- `code`\n");
        assert!(storage.contains("<h1>Title</h1>"));
        assert!(storage.contains("<li><strong>bold</strong> item</li>"));
        assert!(storage.contains("<code>code</code>"));
    }

    #[test]
    fn test_tables() {
        let storage = markdown_to_storage("| Cluster | Credits |\n|---|---|\n| etl | 10 |\n");
        assert!(storage.contains("<table>"));
        assert!(storage.contains("<td>etl</td>"));
    }

    #[test]
    fn test_fenced_code_becomes_macro() {
        let storage = markdown_to_storage("```sql\nSELECT 1;\n```\n");
        assert!(storage.contains("<ac:structured-macro ac:name=\"code\">"));
        assert!(storage.contains("<ac:parameter ac:name=\"language\">sql</ac:parameter>"));
        assert!(storage.contains("<![CDATA[SELECT 1;]]>"));
        assert!(!storage.contains("<pre>"));
    }

    #[test]
    fn test_text_is_escaped() {
        let storage = markdown_to_storage("a < b & c");
        assert!(storage.contains("a &lt; b &amp; c"));
    }
}
