//! Markdown and HTML documentation generated from the action registry.

mod method;
mod render;

use chrono::{DateTime, Utc};

pub use method::{MethodDocumentation, TABLE_CLASS};
#[cfg(feature = "commonmark")]
pub use render::CommonMarkRenderer;
pub use render::{default_renderer, escape_html, wrap_in_document, MarkdownRenderer, PreformattedRenderer};

use crate::error::DocumentationError;
use crate::registry::RegistryEntry;

pub const METHOD_SECTION_CLASS: &str = "apiary-method";
pub const VERBATIM_SECTION_CLASS: &str = "apiary-verbatim";

/// Text of a timestamp entry, minute precision, UTC.
pub fn timestamp_line(now: DateTime<Utc>) -> String {
    format!("Documentation built on {}", now.format("%Y-%m-%d %H:%M"))
}

/// A Markdown chunk plus the CSS class of the `<section>` it renders into.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaggedMarkdown {
    pub markdown: String,
    pub section_class: &'static str,
}

impl TaggedMarkdown {
    pub fn to_html(&self, renderer: &dyn MarkdownRenderer) -> String {
        format!(
            "<section class=\"{}\">{}</section>",
            escape_html(self.section_class),
            renderer.render(&self.markdown)
        )
    }
}

/// Read-only view over a registry for rendering.
#[derive(Clone, Copy, Debug)]
pub struct AppDocumentation<'a> {
    title: &'a str,
    mountpoint: &'a str,
    entries: &'a [RegistryEntry],
}

impl<'a> AppDocumentation<'a> {
    pub fn new(title: &'a str, mountpoint: &'a str, entries: &'a [RegistryEntry]) -> Self {
        Self {
            title,
            mountpoint,
            entries,
        }
    }

    pub fn title(&self) -> &'a str {
        self.title
    }

    pub fn mountpoint(&self) -> &'a str {
        self.mountpoint
    }

    pub fn entries(&self) -> &'a [RegistryEntry] {
        self.entries
    }

    /// One tagged chunk per registry entry, in declaration order.
    pub fn to_markdown_slices(&self) -> Vec<TaggedMarkdown> {
        let now = Utc::now();
        self.entries
            .iter()
            .map(|entry| match entry {
                RegistryEntry::Action(definition) => TaggedMarkdown {
                    markdown: MethodDocumentation::new(definition, self.mountpoint).to_markdown(),
                    section_class: METHOD_SECTION_CLASS,
                },
                RegistryEntry::Markdown(text) => TaggedMarkdown {
                    markdown: text.clone(),
                    section_class: VERBATIM_SECTION_CLASS,
                },
                RegistryEntry::Timestamp => TaggedMarkdown {
                    markdown: timestamp_line(now),
                    section_class: VERBATIM_SECTION_CLASS,
                },
            })
            .collect()
    }

    /// Markdown chunks that are not action sections.
    pub fn verbatim_chunks(&self) -> Vec<String> {
        self.to_markdown_slices()
            .into_iter()
            .filter(|slice| slice.section_class == VERBATIM_SECTION_CLASS)
            .map(|slice| slice.markdown)
            .collect()
    }

    pub fn to_markdown(&self) -> String {
        std::iter::once(format!("## {}", self.title))
            .chain(self.to_markdown_slices().into_iter().map(|s| s.markdown))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn to_html_fragment(&self, renderer: &dyn MarkdownRenderer) -> String {
        std::iter::once(renderer.render(&format!("## {}", self.title)))
            .chain(
                self.to_markdown_slices()
                    .iter()
                    .map(|slice| slice.to_html(renderer)),
            )
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Complete HTML page, newline-terminated.
    pub fn to_html_document(
        &self,
        renderer: &dyn MarkdownRenderer,
    ) -> Result<String, DocumentationError> {
        Ok(wrap_in_document(&self.to_html_fragment(renderer))?)
    }
}
