use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("browser launch failed: {0}")]
    BrowserLaunch(String),

    #[error("browser session error: {0}")]
    Session(String),

    #[error("pdf extraction failed: {0}")]
    Pdf(String),

    #[error("file upload did not finish within {}s", .0.as_secs())]
    UploadTimeout(Duration),

    #[error("chat editor not found or not visible")]
    NoEditor,

    #[error("no usable submit control found")]
    NoSubmitControl,

    #[error("no JSON object recoverable from reply after {attempts} attempt(s)")]
    Extraction { attempts: u32 },

    #[error("reply failed schema validation after {attempts} attempt(s): {detail}")]
    Schema { detail: String, attempts: u32 },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
