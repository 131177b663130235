//! Markdown to HTML and the standalone documentation page.

use minijinja::{context, Environment};

/// Converts Markdown to an HTML fragment.
pub trait MarkdownRenderer: Send + Sync {
    fn render(&self, markdown: &str) -> String;
}

/// CommonMark with tables, via pulldown-cmark. Raw HTML passes through.
#[cfg(feature = "commonmark")]
#[derive(Debug, Default, Clone, Copy)]
pub struct CommonMarkRenderer;

#[cfg(feature = "commonmark")]
impl MarkdownRenderer for CommonMarkRenderer {
    fn render(&self, markdown: &str) -> String {
        use pulldown_cmark::{html, Options, Parser};

        let parser = Parser::new_ext(markdown, Options::ENABLE_TABLES);
        let mut out = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut out, parser);
        out
    }
}

/// Escapes the source and wraps it in `<pre>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PreformattedRenderer;

impl MarkdownRenderer for PreformattedRenderer {
    fn render(&self, markdown: &str) -> String {
        format!("<pre>{}</pre>\n", escape_html(markdown))
    }
}

pub fn default_renderer() -> Box<dyn MarkdownRenderer> {
    #[cfg(feature = "commonmark")]
    {
        Box::new(CommonMarkRenderer)
    }
    #[cfg(not(feature = "commonmark"))]
    {
        Box::new(PreformattedRenderer)
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

const DOCUMENT_TEMPLATE_NAME: &str = "documentation.html";

const DOCUMENT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<style>
body { font-family: -apple-system, "Segoe UI", Helvetica, Arial, sans-serif; max-width: 960px; margin: 2em auto; padding: 0 1em; line-height: 1.5; color: #24292e; }
pre, code, tt { font-family: Menlo, Consolas, monospace; font-size: 0.9em; }
pre { background: #f6f8fa; padding: 0.6em; overflow: auto; }
section.apiary-method { border-top: 1px solid #e1e4e8; margin-top: 2em; }
table.apiary-table { border-collapse: collapse; margin: 1em 0; }
table.apiary-table th, table.apiary-table td { border: 1px solid #dfe2e5; padding: 0.4em 0.8em; text-align: left; vertical-align: top; }
</style>
</head>
<body>
{{ html_fragment|safe }}
</body>
</html>
"#;

/// Embed `fragment` in the standalone page template. The result ends with a newline.
pub fn wrap_in_document(fragment: &str) -> Result<String, minijinja::Error> {
    let mut env = Environment::new();
    env.set_keep_trailing_newline(true);
    env.add_template(DOCUMENT_TEMPLATE_NAME, DOCUMENT_TEMPLATE)?;
    let page = env
        .get_template(DOCUMENT_TEMPLATE_NAME)?
        .render(context! { html_fragment => fragment })?;
    Ok(page)
}
