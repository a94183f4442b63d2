//! The report renderer contract.
//!
//! A renderer turns a content snapshot into a stored artifact and returns its location. Snapshots are
//! self-contained, so a renderer never needs to look anything else up.
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::{db_types::ReportId, snapshot::ReportSnapshot};

#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("Could not reach the renderer. {0}")]
    Unavailable(String),
    #[error("The renderer rejected report {report_id} with status {status}. {message}")]
    Rejected { report_id: ReportId, status: u16, message: String },
    #[error("Invalid renderer response. {0}")]
    InvalidResponse(String),
    #[error("Could not serialize the snapshot. {0}")]
    Serialization(String),
}

#[allow(async_fn_in_trait)]
pub trait ReportRenderer {
    /// Renders `snapshot` and returns the artifact location.
    async fn render(&self, report_id: &ReportId, snapshot: &ReportSnapshot) -> Result<String, RenderError>;
}

/// A renderer that produces no artifact, but returns the location a deterministic renderer would store it at. The
/// location embeds a digest of the snapshot, so identical snapshots always map to the same location.
#[derive(Debug, Clone, Default)]
pub struct DigestRenderer {
    base_url: String,
}

impl DigestRenderer {
    pub fn new<S: Into<String>>(base_url: S) -> Self {
        Self { base_url: base_url.into() }
    }

    pub fn location_for(&self, report_id: &ReportId, snapshot: &ReportSnapshot) -> Result<String, RenderError> {
        let body = serde_json::to_vec(snapshot).map_err(|e| RenderError::Serialization(e.to_string()))?;
        let digest = Sha256::digest(&body);
        let hex = format!("{digest:x}");
        let base = self.base_url.trim_end_matches('/');
        Ok(format!("{base}/reports/{report_id}/{}.pdf", &hex[..16]))
    }
}

impl ReportRenderer for DigestRenderer {
    async fn render(&self, report_id: &ReportId, snapshot: &ReportSnapshot) -> Result<String, RenderError> {
        self.location_for(report_id, snapshot)
    }
}
