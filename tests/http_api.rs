use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Object, Stream};
use tower::ServiceExt;

use rag_chat_backend::core::config::{AppPaths, IndexBackend, Settings};
use rag_chat_backend::embedding::EmbeddingProvider;
use rag_chat_backend::llm::LanguageModel;
use rag_chat_backend::rag::{Document, RagError};
use rag_chat_backend::server;
use rag_chat_backend::state::AppState;
use rag_chat_backend::vector::MemoryIndex;

const BOUNDARY: &str = "X-RAG-TEST-BOUNDARY";

/// Letter-frequency vectors padded to the model's 384 dimensions.
struct LetterEmbedder;

#[async_trait]
impl EmbeddingProvider for LetterEmbedder {
    fn model_id(&self) -> &str {
        "sentence-transformers/all-MiniLM-L6-v2"
    }

    fn dimensions(&self) -> usize {
        384
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut v = vec![0.0; 384];
                v[383] = 1.0;
                for c in text.to_lowercase().chars().filter(char::is_ascii_lowercase) {
                    v[(c as u8 - b'a') as usize] += 1.0;
                }
                v
            })
            .collect())
    }
}

/// Answers by repeating the retrieved context on one line.
struct ContextEcho;

#[async_trait]
impl LanguageModel for ContextEcho {
    fn name(&self) -> &str {
        "context-echo"
    }

    async fn generate(&self, prompt: &str) -> Result<String, RagError> {
        let context = prompt
            .split("Context: ")
            .nth(1)
            .and_then(|rest| rest.split("\nQuestion:").next())
            .unwrap_or_default();
        if context.trim().is_empty() {
            Ok("I don't know.".to_string())
        } else {
            let joined: Vec<&str> = context.lines().filter(|l| !l.trim().is_empty()).collect();
            Ok(format!("Based on the documents: {}", joined.join(" ")))
        }
    }
}

struct Unavailable;

#[async_trait]
impl LanguageModel for Unavailable {
    fn name(&self) -> &str {
        "unavailable"
    }

    async fn generate(&self, _prompt: &str) -> Result<String, RagError> {
        Err(RagError::Generation("llama-server is not running".to_string()))
    }
}

struct TestApp {
    _root: tempfile::TempDir,
    state: Arc<AppState>,
    index: Arc<MemoryIndex>,
}

impl TestApp {
    fn with_model(llm: Arc<dyn LanguageModel>) -> Self {
        let root = tempfile::tempdir().unwrap();
        let paths = Arc::new(AppPaths::with_root(root.path()));
        let mut settings = Settings::default();
        settings.index.backend = IndexBackend::Memory;

        let index = Arc::new(MemoryIndex::new("scholar-pulse", 384));
        let state =
            AppState::from_parts(paths, settings, Arc::new(LetterEmbedder), index.clone(), llm)
                .unwrap();
        Self {
            _root: root,
            state,
            index,
        }
    }

    fn new() -> Self {
        Self::with_model(Arc::new(ContextEcho))
    }

    fn router(&self) -> Router {
        server::router(self.state.clone())
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, String) {
        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8_lossy(&bytes).to_string())
    }
}

enum Part<'a> {
    File {
        name: &'a str,
        filename: &'a str,
        bytes: &'a [u8],
    },
    Text {
        name: &'a str,
        value: &'a str,
    },
}

fn multipart_request(parts: &[Part<'_>]) -> Request<Body> {
    let mut body: Vec<u8> = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::File {
                name,
                filename,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                        name, filename
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/ingest")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

/// A single-page PDF with one line of Courier text.
fn pdf_fixture(text: &str) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 14.into()]),
            Operation::new("Td", vec![50.into(), 700.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

fn parse_ingest_message(body: &str) -> Option<(usize, usize)> {
    let rest = body.strip_prefix("Successfully ingested ")?;
    let (documents, rest) = rest.split_once(" documents (")?;
    let chunks = rest.strip_suffix(" chunks).")?;
    Some((documents.parse().ok()?, chunks.parse().ok()?))
}

#[tokio::test]
async fn ingest_without_data_is_rejected() {
    let app = TestApp::new();

    let (status, body) = app.send(multipart_request(&[])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "No data provided");

    let bare = Request::builder()
        .method("POST")
        .uri("/ingest")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(bare).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "No data provided");
}

#[tokio::test]
async fn empty_file_name_and_blank_url_count_as_no_data() {
    let app = TestApp::new();
    let request = multipart_request(&[
        Part::File {
            name: "file",
            filename: "",
            bytes: b"",
        },
        Part::Text {
            name: "url",
            value: "   ",
        },
    ]);

    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "No data provided");
}

#[tokio::test]
async fn ingest_pdf_reports_documents_and_chunks() {
    let app = TestApp::new();
    let pdf = pdf_fixture("Fever causes chills, sweating and headache.");
    let request = multipart_request(&[Part::File {
        name: "file",
        filename: "fever.pdf",
        bytes: &pdf,
    }]);

    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::OK, "body: {}", body);
    let (documents, chunks) = parse_ingest_message(&body).expect("unexpected body");
    assert_eq!(documents, 1);
    assert!(chunks > 0);
    assert_eq!(app.index.len().await, chunks);
    assert!(app.state.uploads_dir.join("fever.pdf").is_file());
}

#[tokio::test]
async fn multiple_files_are_saved_by_base_name() {
    let app = TestApp::new();
    let request = multipart_request(&[
        Part::File {
            name: "file[]",
            filename: "../../outside.txt",
            bytes: b"Fever is a temporary increase in body temperature.",
        },
        Part::File {
            name: "file[]",
            filename: "notes.md",
            bytes: b"Chills often come before a fever.",
        },
    ]);

    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(body, "Successfully ingested 2 documents (2 chunks).");
    assert!(app.state.uploads_dir.join("outside.txt").is_file());
    assert!(app.state.uploads_dir.join("notes.md").is_file());
}

#[tokio::test]
async fn unsupported_upload_is_a_bad_request() {
    let app = TestApp::new();
    let request = multipart_request(&[Part::File {
        name: "file",
        filename: "slides.pptx",
        bytes: b"PK\x03\x04",
    }]);

    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "Unsupported file type: slides.pptx");
    assert!(app.index.is_empty().await);
}

#[tokio::test]
async fn upload_without_text_is_no_content() {
    let app = TestApp::new();
    let request = multipart_request(&[Part::File {
        name: "file",
        filename: "blank.txt",
        bytes: b"  \n\n  ",
    }]);

    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "No content extracted");
    assert!(app.index.is_empty().await);
}

#[tokio::test]
async fn corrupt_pdf_is_a_server_error_with_message() {
    let app = TestApp::new();
    let request = multipart_request(&[Part::File {
        name: "file",
        filename: "broken.pdf",
        bytes: b"%PDF-1.5 truncated",
    }]);

    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("broken.pdf"), "body: {}", body);
}

#[tokio::test]
async fn get_answers_from_populated_index() {
    let app = TestApp::new();
    app.state
        .ingest
        .index_documents(&[
            Document::new(
                "The symptoms of fever are chills, sweating and headache.",
                "fever.txt",
                "text",
            ),
            Document::new("A fracture is a broken bone.", "bones.txt", "text"),
        ])
        .await
        .unwrap();

    let request = Request::builder()
        .uri("/get?msg=What%20are%20the%20symptoms%20of%20fever%3F")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert!(!body.trim().is_empty());
    assert!(body.contains("chills"), "body: {}", body);
}

#[tokio::test]
async fn post_form_is_accepted_too() {
    let app = TestApp::new();
    app.state
        .ingest
        .index_documents(&[Document::new("Fever means high temperature.", "f.txt", "text")])
        .await
        .unwrap();

    let request = Request::builder()
        .method("POST")
        .uri("/get")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("msg=What+is+fever%3F"))
        .unwrap();
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Based on the documents: Fever means high temperature.");
}

#[tokio::test]
async fn missing_msg_is_a_bad_request() {
    let app = TestApp::new();
    let request = Request::builder().uri("/get").body(Body::empty()).unwrap();

    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "Missing form field: msg");
}

#[tokio::test]
async fn post_without_form_body_is_missing_msg() {
    let app = TestApp::new();
    let request = Request::builder()
        .method("POST")
        .uri("/get")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"msg":"What is fever?"}"#))
        .unwrap();

    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "Missing form field: msg");

    let bare = Request::builder()
        .method("POST")
        .uri("/get")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(bare).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "Missing form field: msg");
}

#[tokio::test]
async fn generation_failure_is_a_server_error() {
    let app = TestApp::with_model(Arc::new(Unavailable));
    let request = Request::builder()
        .uri("/get?msg=hello")
        .body(Body::empty())
        .unwrap();

    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("llama-server is not running"));
}

#[tokio::test]
async fn index_page_and_health() {
    let app = TestApp::new();

    let (status, body) = app
        .send(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<form id=\"chat-form\""));

    let (status, body) = app
        .send(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::OK);
    let health: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["index"], "scholar-pulse");
    assert_eq!(health["embedding_model"], "sentence-transformers/all-MiniLM-L6-v2");
}
