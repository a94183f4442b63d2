use std::{sync::Arc, time::Duration};

use appeal_engine::{db_types::ReportId, snapshot::ReportSnapshot, DigestRenderer, RenderError, ReportRenderer};
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
};
use serde::{Deserialize, Serialize};

use crate::config::RendererConfig;

#[derive(Serialize)]
struct RenderRequest<'a> {
    report_id: &'a ReportId,
    snapshot: &'a ReportSnapshot,
}

#[derive(Deserialize)]
struct RenderResponse {
    pdf_url: String,
}

/// Posts snapshots to the PDF rendering service, which stores the file and replies with its location.
#[derive(Clone)]
pub struct HttpRenderer {
    url: String,
    timeout: Duration,
    client: Arc<Client>,
}

impl HttpRenderer {
    pub fn new(config: &RendererConfig) -> Result<Self, RenderError> {
        let mut headers = HeaderMap::with_capacity(2);
        let val = HeaderValue::from_str(&format!("Bearer {}", config.secret.reveal()))
            .map_err(|e| RenderError::Unavailable(format!("Invalid renderer secret. {e}")))?;
        headers.insert(AUTHORIZATION, val);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| RenderError::Unavailable(e.to_string()))?;
        Ok(Self { url: config.url.clone(), timeout: config.timeout, client: Arc::new(client) })
    }

    async fn post_render_request<T: Serialize>(&self, report_id: &ReportId, body: &T) -> Result<String, RenderError> {
        let response = self
            .client
            .post(&self.url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RenderError::Unavailable(format!("The renderer did not answer within {} s", self.timeout.as_secs()))
                } else {
                    RenderError::Unavailable(e.to_string())
                }
            })?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(RenderError::Rejected { report_id: report_id.clone(), status, message });
        }
        let body = response.json::<RenderResponse>().await.map_err(|e| RenderError::InvalidResponse(e.to_string()))?;
        if body.pdf_url.trim().is_empty() {
            return Err(RenderError::InvalidResponse("The renderer returned an empty pdf_url".into()));
        }
        debug!("📄️ Report {report_id} rendered to {}", body.pdf_url);
        Ok(body.pdf_url)
    }
}

impl ReportRenderer for HttpRenderer {
    async fn render(&self, report_id: &ReportId, snapshot: &ReportSnapshot) -> Result<String, RenderError> {
        trace!("📄️ Sending report {report_id} to the renderer");
        self.post_render_request(report_id, &RenderRequest { report_id, snapshot }).await
    }
}

/// The renderer the server runs with. Without a configured rendering service, reports are recorded against their
/// digest location.
#[derive(Clone)]
pub enum ServerRenderer {
    Http(HttpRenderer),
    Digest(DigestRenderer),
}

impl ServerRenderer {
    pub fn from_config(config: &RendererConfig, site_url: &str) -> Self {
        if !config.is_configured() {
            return Self::Digest(DigestRenderer::new(site_url));
        }
        match HttpRenderer::new(config) {
            Ok(renderer) => {
                info!("📄️ Reports will be rendered by {}", config.url);
                Self::Http(renderer)
            },
            Err(e) => {
                error!("📄️ Could not create the renderer client. {e}. Reports will not have a rendered file.");
                Self::Digest(DigestRenderer::new(site_url))
            },
        }
    }
}

impl ReportRenderer for ServerRenderer {
    async fn render(&self, report_id: &ReportId, snapshot: &ReportSnapshot) -> Result<String, RenderError> {
        match self {
            Self::Http(r) => r.render(report_id, snapshot).await,
            Self::Digest(r) => r.render(report_id, snapshot).await,
        }
    }
}
