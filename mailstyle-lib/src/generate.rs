use crate::error::Result;
use crate::style::inliner::CssInliner;

pub mod mail_style {
    use super::*;
    use std::fs;
    use std::path::Path;

    /// Inlines `css` (and the document's own `<style>` elements) into `html`
    /// with the default settings.
    pub fn inline(html_content: &str, css_content: &str) -> Result<String> {
        let mut inliner = CssInliner::from_html(html_content);
        inliner.inline_css(css_content)?;
        inliner.render()
    }

    /// Like [`inline`], reading the HTML from a file.
    pub fn inline_file(html_path: impl AsRef<Path>, css_content: &str) -> Result<String> {
        let html_content = fs::read_to_string(html_path)?;
        inline(&html_content, css_content)
    }
}
