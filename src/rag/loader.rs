//! Document loading from local files and web pages.
//!
//! PDF text extraction is delegated to `pdf-extract`; web pages are fetched
//! with `reqwest` and reduced to their visible text.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use reqwest::Client;

use super::document::Document;
use super::error::RagError;

/// Loads documents from PDF/text files and URLs.
///
/// There is no retry and no partial-failure handling: the first source that
/// fails aborts the whole load.
#[derive(Clone)]
pub struct DocumentLoader {
    client: Client,
}

impl DocumentLoader {
    pub fn new(web_timeout: Duration) -> Result<Self, RagError> {
        let client = Client::builder()
            .timeout(web_timeout)
            .build()
            .map_err(|e| RagError::load("http client", e))?;
        Ok(Self { client })
    }

    /// Every PDF directly inside `dir`, in file name order. A missing or empty
    /// directory is not an error.
    pub async fn load_directory(&self, dir: &Path) -> Result<Vec<Document>, RagError> {
        if !dir.is_dir() {
            tracing::info!("No PDFs found in or directory does not exist: {}", dir.display());
            return Ok(Vec::new());
        }

        let mut pdfs = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.is_file() && has_extension(&path, &["pdf"]) {
                pdfs.push(path);
            }
        }
        pdfs.sort();

        if pdfs.is_empty() {
            tracing::info!("No PDFs found in or directory does not exist: {}", dir.display());
            return Ok(Vec::new());
        }

        tracing::info!("Loading {} PDFs from {}", pdfs.len(), dir.display());
        self.load_files(&pdfs).await
    }

    pub async fn load_files(&self, paths: &[PathBuf]) -> Result<Vec<Document>, RagError> {
        let mut docs = Vec::with_capacity(paths.len());
        for path in paths {
            docs.push(self.load_file(path).await?);
        }
        Ok(docs)
    }

    pub async fn load_file(&self, path: &Path) -> Result<Document, RagError> {
        let source = path.to_string_lossy().to_string();

        if has_extension(path, &["pdf"]) {
            let owned = path.to_path_buf();
            let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text(&owned))
                .await
                .map_err(|e| RagError::load(&source, e))?
                .map_err(|e| RagError::load(&source, e))?;
            return Ok(Document::new(text, source, "pdf"));
        }

        if has_extension(path, &["txt", "md", "markdown"]) {
            let text = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| RagError::load(&source, e))?;
            return Ok(Document::new(text, source, "text"));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or(source);
        Err(RagError::UnsupportedFile(name))
    }

    pub async fn load_urls(&self, urls: &[String]) -> Result<Vec<Document>, RagError> {
        if urls.is_empty() {
            return Ok(Vec::new());
        }
        tracing::info!("Loading URLs: {:?}", urls);

        let mut docs = Vec::with_capacity(urls.len());
        for url in urls {
            docs.push(self.load_url(url).await?);
        }
        Ok(docs)
    }

    pub async fn load_url(&self, url: &str) -> Result<Document, RagError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RagError::load(url, e))?;

        if !response.status().is_success() {
            return Err(RagError::load(
                url,
                format!("HTTP {}", response.status()),
            ));
        }

        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("html"))
            .unwrap_or(false);

        let body = response.text().await.map_err(|e| RagError::load(url, e))?;

        if is_html || looks_like_html(&body) {
            let mut doc = Document::new(html_to_text(&body), url, "web");
            if let Some(title) = html_title(&body) {
                doc = doc.with_metadata("title", title);
            }
            Ok(doc)
        } else {
            Ok(Document::new(body, url, "web"))
        }
    }
}

/// Where an uploaded file should be written: only the final path component of
/// the client-supplied name is kept. `None` for empty or unusable names.
pub fn upload_target(dir: &Path, raw_name: &str) -> Option<PathBuf> {
    // Browsers on Windows may send the full client path.
    let normalized = raw_name.replace('\\', "/");
    let name = Path::new(&normalized).file_name()?.to_str()?.trim();
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(dir.join(name))
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|x| e.eq_ignore_ascii_case(x)))
        .unwrap_or(false)
}

fn looks_like_html(body: &str) -> bool {
    let head: String = body.trim_start().chars().take(15).collect();
    let head = head.to_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}

struct HtmlPatterns {
    invisible: Vec<Regex>,
    comment: Regex,
    block_tag: Regex,
    tag: Regex,
    title: Regex,
}

fn html_patterns() -> &'static HtmlPatterns {
    static PATTERNS: OnceLock<HtmlPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| HtmlPatterns {
        invisible: ["script", "style", "noscript", "template"]
            .iter()
            .map(|tag| Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")).unwrap())
            .collect(),
        comment: Regex::new(r"(?s)<!--.*?-->").unwrap(),
        block_tag: Regex::new(
            r"(?i)</?(p|div|br|hr|h[1-6]|li|ul|ol|tr|td|th|table|section|article|header|footer|nav|title|pre|blockquote)\b[^>]*>",
        )
        .unwrap(),
        tag: Regex::new(r"(?s)<[^>]*>").unwrap(),
        title: Regex::new(r"(?is)<title\b[^>]*>(.*?)</title\s*>").unwrap(),
    })
}

/// Visible text of an HTML page: invisible elements and tags removed, entities
/// decoded, one trimmed non-empty line per block.
pub fn html_to_text(html: &str) -> String {
    let patterns = html_patterns();

    let mut text = patterns.comment.replace_all(html, "").into_owned();
    for pattern in &patterns.invisible {
        text = pattern.replace_all(&text, "").into_owned();
    }
    let text = patterns.block_tag.replace_all(&text, "\n");
    let text = patterns.tag.replace_all(&text, "");
    let text = html_escape::decode_html_entities(&text);

    text.lines()
        .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn html_title(html: &str) -> Option<String> {
    let caps = html_patterns().title.captures(html)?;
    let title = html_escape::decode_html_entities(caps.get(1)?.as_str());
    let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
    (!title.is_empty()).then_some(title)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loader() -> DocumentLoader {
        DocumentLoader::new(Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_html_stripping() {
        let html = r#"
            <html>
            <head><title>Fever &amp; Flu</title><script>var x = 1;</script>
            <style>body { color: red; }</style></head>
            <body>
                <!-- navigation -->
                <h1>Hello</h1>
                <p>World &lt;3 &#8212; caf&#xE9;</p>
            </body>
            </html>
        "#;

        let text = html_to_text(html);
        assert!(text.contains("Hello"));
        assert!(text.contains("World <3 \u{2014} caf\u{e9}"));
        assert!(!text.contains("<h1>"));
        assert!(!text.contains("var x"));
        assert!(!text.contains("color: red"));
        assert!(!text.contains("navigation"));
        assert!(!text.lines().any(|l| l.trim().is_empty()));

        assert_eq!(html_title(html).as_deref(), Some("Fever & Flu"));
    }

    #[test]
    fn entities_are_decoded_once() {
        let text = html_to_text("<p>Escaped: &#38;lt;b&#38;gt; and &mdash; &eacute;</p>");
        assert_eq!(text, "Escaped: &lt;b&gt; and \u{2014} \u{e9}");

        let text = html_to_text("<p>a&nbsp;&nbsp;b &hellip;</p>");
        assert_eq!(text, "a b \u{2026}");
    }

    #[test]
    fn block_tags_become_line_breaks() {
        let text = html_to_text("<div>first</div><div>second</div><span>inline</span> text");
        assert_eq!(text, "first\nsecond\ninline text");
    }

    #[test]
    fn detects_html_without_content_type() {
        assert!(looks_like_html("  <!DOCTYPE html><html></html>"));
        assert!(looks_like_html("<HTML><body/></HTML>"));
        assert!(!looks_like_html("plain text body"));
    }

    #[test]
    fn upload_target_keeps_only_the_file_name() {
        let dir = Path::new("/srv/data");
        assert_eq!(
            upload_target(dir, "report.pdf"),
            Some(PathBuf::from("/srv/data/report.pdf"))
        );
        assert_eq!(
            upload_target(dir, "../../etc/passwd"),
            Some(PathBuf::from("/srv/data/passwd"))
        );
        assert_eq!(
            upload_target(dir, "C:\\Users\\me\\notes.txt"),
            Some(PathBuf::from("/srv/data/notes.txt"))
        );
        assert_eq!(upload_target(dir, ""), None);
        assert_eq!(upload_target(dir, ".."), None);
    }

    #[tokio::test]
    async fn loads_text_files_and_rejects_unknown_types() {
        let dir = tempfile::tempdir().unwrap();
        let notes = dir.path().join("notes.TXT");
        std::fs::write(&notes, "Fever is a temporary rise in body temperature.").unwrap();
        let other = dir.path().join("slides.pptx");
        std::fs::write(&other, b"PK").unwrap();

        let doc = loader().load_file(&notes).await.unwrap();
        assert_eq!(doc.text, "Fever is a temporary rise in body temperature.");
        assert_eq!(doc.source, notes.to_string_lossy());
        assert_eq!(doc.metadata["kind"], "text");

        let err = loader().load_file(&other).await.unwrap_err();
        assert!(matches!(err, RagError::UnsupportedFile(ref name) if name == "slides.pptx"));
    }

    #[tokio::test]
    async fn corrupt_pdf_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("broken.pdf");
        std::fs::write(&pdf, b"not a pdf at all").unwrap();

        let err = loader().load_file(&pdf).await.unwrap_err();
        assert!(matches!(err, RagError::Load { .. }));
    }

    #[tokio::test]
    async fn missing_or_pdf_free_directory_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(loader().load_directory(&missing).await.unwrap().is_empty());

        std::fs::write(dir.path().join("readme.txt"), "not a pdf").unwrap();
        assert!(loader().load_directory(dir.path()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn no_urls_is_a_no_op() {
        assert!(loader().load_urls(&[]).await.unwrap().is_empty());
    }
}
