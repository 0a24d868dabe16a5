//! PDF text extraction with a character budget.

use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};

/// Extract plain text from a PDF, truncated to at most `max_chars`
/// characters. Encrypted or malformed documents surface as [`Error::Pdf`].
pub fn extract_text(path: &Path, max_chars: usize) -> Result<String> {
    let text = pdf_extract::extract_text(path)
        .map_err(|err| Error::Pdf(format!("{}: {err}", path.display())))?;
    let total = text.chars().count();
    if total > max_chars {
        debug!(path = %path.display(), total, max_chars, "truncating extracted text");
        Ok(text.chars().take(max_chars).collect())
    } else {
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn missing_file_is_a_pdf_error() {
        let err = extract_text(&PathBuf::from("/nonexistent/file.pdf"), 100).unwrap_err();
        assert!(matches!(err, Error::Pdf(_)));
    }
}
