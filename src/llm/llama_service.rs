use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use super::provider::LanguageModel;
use super::types::{CompletionRequest, CompletionResponse, GenerationOptions};
use crate::core::config::{AppPaths, LlmSettings};
use crate::rag::RagError;

const HEALTH_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// A llama-server instance, spawned as a child process or attached to over
/// HTTP. The model is loaded once; generations run one at a time.
pub struct LlamaService {
    inner: Mutex<LlamaManager>,
    client: Client,
    base_url: String,
    options: GenerationOptions,
}

struct LlamaManager {
    child_process: Option<Child>,
}

impl LlamaService {
    /// Attaches to `llm.server_url` when set, otherwise spawns llama-server
    /// with the configured model. Returns once `/health` reports ready.
    pub async fn start(settings: &LlmSettings, paths: &AppPaths) -> Result<Self, RagError> {
        let client = Client::new();
        let options = GenerationOptions::from_settings(settings);
        let timeout = Duration::from_secs(settings.startup_timeout_secs);

        if let Some(url) = settings.server_url.as_deref().filter(|u| !u.trim().is_empty()) {
            let service = Self::attach(url, options);
            tracing::info!("Attaching to llama-server at {}", service.base_url);
            service.wait_for_health(None, timeout).await?;
            return Ok(service);
        }

        let model_path = paths.resolve(&settings.model_path);
        if !model_path.is_file() {
            return Err(RagError::Generation(format!(
                "Model file not found: {}",
                model_path.display()
            )));
        }
        let server_path = find_server_binary(paths, settings.server_binary.as_deref())?;

        let mut cmd = Command::new(&server_path);
        cmd.arg("-m").arg(&model_path);
        cmd.arg("--host").arg("127.0.0.1");
        cmd.arg("--port").arg(settings.port.to_string());
        cmd.arg("-c").arg(settings.context_length.to_string());
        if settings.n_gpu_layers >= 0 {
            cmd.arg("-ngl").arg(settings.n_gpu_layers.to_string());
        }
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        tracing::info!(
            "Starting {} with model {}",
            server_path.display(),
            model_path.display()
        );
        let mut child = cmd
            .spawn()
            .map_err(|e| RagError::Generation(format!("Failed to spawn llama-server: {}", e)))?;

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(async move {
                let mut reader = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = reader.next_line().await {
                    tracing::debug!("[llama-server] {}", line);
                }
            });
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut reader = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = reader.next_line().await {
                    tracing::debug!("[llama-server-err] {}", line);
                }
            });
        }

        let service = Self {
            inner: Mutex::new(LlamaManager {
                child_process: None,
            }),
            client,
            base_url: format!("http://127.0.0.1:{}", settings.port),
            options,
        };
        service.wait_for_health(Some(&mut child), timeout).await?;
        service.inner.lock().await.child_process = Some(child);
        tracing::info!("llama-server ready on {}", service.base_url);
        Ok(service)
    }

    /// Uses an already running server without checking it.
    pub fn attach(base_url: &str, options: GenerationOptions) -> Self {
        Self {
            inner: Mutex::new(LlamaManager {
                child_process: None,
            }),
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            options,
        }
    }

    /// Polls `/health` until it answers 2xx. llama-server replies 503 while
    /// the model is still loading.
    async fn wait_for_health(
        &self,
        mut child: Option<&mut Child>,
        timeout: Duration,
    ) -> Result<(), RagError> {
        let url = format!("{}/health", self.base_url);
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(child) = child.as_deref_mut() {
                if let Ok(Some(status)) = child.try_wait() {
                    return Err(RagError::Generation(format!(
                        "llama-server exited during startup ({})",
                        status
                    )));
                }
            }
            if let Ok(response) = self.client.get(&url).send().await {
                if response.status().is_success() {
                    return Ok(());
                }
            }
            if Instant::now() >= deadline {
                return Err(RagError::Generation(format!(
                    "Timed out waiting for llama-server at {}",
                    self.base_url
                )));
            }
            tokio::time::sleep(HEALTH_POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl LanguageModel for LlamaService {
    fn name(&self) -> &str {
        "llama-server"
    }

    async fn generate(&self, prompt: &str) -> Result<String, RagError> {
        let mut manager = self.inner.lock().await;
        if let Some(child) = manager.child_process.as_mut() {
            if let Ok(Some(status)) = child.try_wait() {
                return Err(RagError::Generation(format!("llama-server exited ({})", status)));
            }
        }

        let url = format!("{}/completion", self.base_url);
        let res = self
            .client
            .post(&url)
            .json(&CompletionRequest::new(prompt, self.options))
            .send()
            .await
            .map_err(|e| RagError::Generation(e.to_string()))?;

        if !res.status().is_success() {
            return Err(RagError::Generation(format!(
                "Llama server error: {}",
                res.status()
            )));
        }

        let data: CompletionResponse = res
            .json()
            .await
            .map_err(|e| RagError::Generation(e.to_string()))?;
        if let Some(tokens) = data.tokens_predicted {
            tracing::debug!("llama-server predicted {} tokens", tokens);
        }
        Ok(data.content.trim().to_string())
    }
}

/// Configured binary first, then `bin/` under the project root, then `PATH`.
fn find_server_binary(paths: &AppPaths, configured: Option<&str>) -> Result<PathBuf, RagError> {
    if let Some(raw) = configured.filter(|c| !c.trim().is_empty()) {
        let path = paths.resolve(raw);
        if path.is_file() {
            return Ok(path);
        }
        if let Ok(found) = which::which(raw) {
            return Ok(found);
        }
        return Err(RagError::Generation(format!(
            "llama-server binary not found: {}",
            raw
        )));
    }

    let candidates = [
        paths.project_root.join("bin/llama-server.exe"),
        paths.project_root.join("bin/llama-server"),
    ];
    if let Some(path) = candidates.iter().find(|p| p.is_file()) {
        return Ok(path.clone());
    }

    which::which(Path::new("llama-server")).map_err(|_| {
        RagError::Generation(
            "llama-server not found; set llm.server_binary or llm.server_url".to_string(),
        )
    })
}
