//! Markdown → HTML rendering via pulldown-cmark.
//!
//! Rendering is pure: the same bytes and options always produce the same
//! HTML, which is what makes redelivered messages safe to reprocess.

use crate::config::{HtmlTemplate, MarkdownFlavor};
use crate::error::Md2HtmlError;
use crate::template;
use pulldown_cmark::{html, Options, Parser};
use std::path::Path;
use tracing::{debug, info};

/// Render Markdown text to an HTML fragment.
pub fn markdown_to_html(markdown: &str, flavor: MarkdownFlavor) -> String {
    let parser = Parser::new_ext(markdown, parser_options(flavor));
    let mut out = String::with_capacity(markdown.len() + markdown.len() / 2);
    html::push_html(&mut out, parser);
    out
}

/// Render Markdown text and package it according to `template`.
///
/// `title` is only used by [`HtmlTemplate::Standalone`].
pub fn render_document(
    markdown: &str,
    flavor: MarkdownFlavor,
    template: HtmlTemplate,
    title: &str,
) -> String {
    let body = markdown_to_html(markdown, flavor);
    match template {
        HtmlTemplate::Fragment => body,
        HtmlTemplate::Standalone => template::standalone(title, &body),
    }
}

/// Read a Markdown file as UTF-8 and render it.
///
/// A leading byte-order mark is dropped. Read and decode failures map to
/// [`Md2HtmlError::ConversionFailed`].
pub async fn convert_file(
    path: &Path,
    flavor: MarkdownFlavor,
    template: HtmlTemplate,
) -> Result<String, Md2HtmlError> {
    let failed = |detail: String| Md2HtmlError::ConversionFailed {
        path: path.display().to_string(),
        detail,
    };

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| failed(format!("could not read file: {e}")))?;
    let text = String::from_utf8(bytes).map_err(|e| failed(format!("not valid UTF-8: {e}")))?;
    let markdown = text.strip_prefix('\u{FEFF}').unwrap_or(&text);

    let title = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let html = render_document(markdown, flavor, template, &title);
    debug!(
        "Rendered {} ({} bytes Markdown → {} bytes HTML)",
        path.display(),
        markdown.len(),
        html.len()
    );
    Ok(html)
}

/// Render a local Markdown file and write the HTML to `output`.
///
/// Uses atomic write (temp file + rename) so `output` is never left
/// half-written. Returns the number of HTML bytes written.
pub async fn convert_to_file(
    input: &Path,
    output: &Path,
    flavor: MarkdownFlavor,
    template: HtmlTemplate,
) -> Result<u64, Md2HtmlError> {
    let html = convert_file(input, flavor, template).await?;
    let failed = |e: std::io::Error| Md2HtmlError::OutputWriteFailed {
        path: output.display().to_string(),
        detail: e.to_string(),
    };

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(failed)?;
    }
    let tmp = output.with_extension("html.tmp");
    tokio::fs::write(&tmp, &html).await.map_err(failed)?;
    tokio::fs::rename(&tmp, output).await.map_err(failed)?;

    info!("Wrote {} ({} bytes)", output.display(), html.len());
    Ok(html.len() as u64)
}

fn parser_options(flavor: MarkdownFlavor) -> Options {
    match flavor {
        MarkdownFlavor::CommonMark => Options::empty(),
        MarkdownFlavor::Gfm => {
            let mut opts = Options::empty();
            opts.insert(Options::ENABLE_TABLES);
            opts.insert(Options::ENABLE_STRIKETHROUGH);
            opts.insert(Options::ENABLE_TASKLISTS);
            opts.insert(Options::ENABLE_FOOTNOTES);
            opts
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TABLE: &str = "| a | b |\n|---|---|\n| 1 | 2 |\n";

    #[test]
    fn heading() {
        assert_eq!(
            markdown_to_html("# Hi", MarkdownFlavor::CommonMark),
            "<h1>Hi</h1>\n"
        );
    }

    #[test]
    fn deterministic() {
        let md = "# Title\n\nSome *text* with `code`.\n\n- a\n- b\n\n```rust\nfn main() {}\n```\n";
        let first = markdown_to_html(md, MarkdownFlavor::Gfm);
        let second = markdown_to_html(md, MarkdownFlavor::Gfm);
        assert_eq!(first, second);
    }

    #[test]
    fn commonmark_has_no_tables() {
        let html = markdown_to_html(TABLE, MarkdownFlavor::CommonMark);
        assert!(!html.contains("<table>"), "got: {html}");
    }

    #[test]
    fn gfm_extensions() {
        let html = markdown_to_html(TABLE, MarkdownFlavor::Gfm);
        assert!(html.contains("<table>"), "got: {html}");
        let html = markdown_to_html("~~gone~~", MarkdownFlavor::Gfm);
        assert!(html.contains("<del>gone</del>"), "got: {html}");
    }

    #[test]
    fn standalone_uses_title() {
        let doc = render_document("# Hi", MarkdownFlavor::CommonMark, HtmlTemplate::Standalone, "readme");
        assert!(doc.contains("<title>readme</title>"));
        assert!(doc.contains("<h1>Hi</h1>"));
    }

    #[tokio::test]
    async fn convert_file_strips_bom() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("readme.md");
        std::fs::write(&path, "\u{FEFF}# Hi").unwrap();
        let html = convert_file(&path, MarkdownFlavor::CommonMark, HtmlTemplate::Fragment)
            .await
            .unwrap();
        assert_eq!(html, "<h1>Hi</h1>\n");
    }

    #[tokio::test]
    async fn convert_file_rejects_invalid_utf8() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bin.md");
        std::fs::write(&path, [0x23, 0x20, 0xff, 0xfe, 0x00]).unwrap();
        let err = convert_file(&path, MarkdownFlavor::CommonMark, HtmlTemplate::Fragment)
            .await
            .unwrap_err();
        assert!(matches!(err, Md2HtmlError::ConversionFailed { .. }));
        assert!(err.to_string().contains("UTF-8"), "got: {err}");
    }

    #[tokio::test]
    async fn convert_to_file_writes_output() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("readme.md");
        std::fs::write(&input, "# Hi").unwrap();
        let output = dir.path().join("out/readme.html");

        let n = convert_to_file(&input, &output, MarkdownFlavor::CommonMark, HtmlTemplate::Fragment)
            .await
            .unwrap();
        assert_eq!(n, 12);
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "<h1>Hi</h1>\n");
        assert!(!output.with_extension("html.tmp").exists());
    }

    #[tokio::test]
    async fn convert_file_missing() {
        let err = convert_file(
            Path::new("/definitely/not/here.md"),
            MarkdownFlavor::CommonMark,
            HtmlTemplate::Fragment,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Md2HtmlError::ConversionFailed { .. }));
    }
}
