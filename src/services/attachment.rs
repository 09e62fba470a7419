use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;
use uuid::Uuid;

use crate::models::cv::Cv;
use crate::services::processor::AttachmentGenerator;

#[derive(Debug, thiserror::Error)]
pub enum AttachmentError {
    #[error("Failed to encode CV: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generator exited with {status}: {output}")]
    Generator { status: String, output: String },
}

/// Renders CV documents by running an external generator binary.
///
/// The binary is invoked as `<program> --data <cv json> --out <file>` and must
/// write the document to `<file>`.
pub struct CommandAttachmentGenerator {
    program: PathBuf,
    work_dir: PathBuf,
}

impl CommandAttachmentGenerator {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            work_dir: std::env::temp_dir(),
        }
    }
}

#[async_trait]
impl AttachmentGenerator for CommandAttachmentGenerator {
    async fn generate(&self, cv: &Cv) -> Result<Vec<u8>, AttachmentError> {
        let data = serde_json::to_string(cv)?;
        let out_file = self.work_dir.join(format!("cv-{}.pdf", Uuid::new_v4()));

        let output = Command::new(&self.program)
            .arg("--data")
            .arg(&data)
            .arg("--out")
            .arg(&out_file)
            .output()
            .await?;

        if !output.status.success() {
            let _ = tokio::fs::remove_file(&out_file).await;
            let mut text = String::from_utf8_lossy(&output.stderr).into_owned();
            text.push_str(&String::from_utf8_lossy(&output.stdout));
            return Err(AttachmentError::Generator {
                status: output.status.to_string(),
                output: text.trim().to_string(),
            });
        }

        let bytes = tokio::fs::read(&out_file).await?;
        if let Err(e) = tokio::fs::remove_file(&out_file).await {
            tracing::warn!(path = %out_file.display(), error = %e, "Unable to remove generated attachment");
        }

        tracing::debug!(bytes = bytes.len(), reference_number = %cv.reference_number, "CV attachment generated");
        Ok(bytes)
    }
}
