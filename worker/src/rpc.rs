use anyhow::{Context, Result};
use common::{AssignmentRequest, CompletionNotice, CompletionReply, Task};
use reqwest::Client;

/// Cliente HTTP de las dos operaciones remotas del coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorClient {
    http: Client,
    base_url: String,
}

impl CoordinatorClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        // Sin conexiones ociosas: cada llamada abre una nueva, así un
        // coordinator que ya no está se ve como error de conexión.
        // El canal es local, nunca pasa por un proxy.
        let http = Client::builder()
            .pool_max_idle_per_host(0)
            .no_proxy()
            .build()
            .context("no se pudo construir el cliente HTTP")?;

        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn request_assignment(&self, req: &AssignmentRequest) -> reqwest::Result<Task> {
        let url = format!("{}/api/v1/tasks/next", self.base_url);
        self.http
            .post(&url)
            .json(req)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    /// Devuelve si el coordinator aceptó el resultado.
    pub async fn report_completion(&self, notice: &CompletionNotice) -> reqwest::Result<bool> {
        let url = format!("{}/api/v1/tasks/complete", self.base_url);
        let reply: CompletionReply = self
            .http
            .post(&url)
            .json(notice)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(reply.accepted)
    }
}
