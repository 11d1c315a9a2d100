//! Inbound document payloads and the content probe built from them.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use docrouter_shared::{DocRouterError, Result};

/// Largest document we load into memory for sniffing or extraction (25 MB).
pub const MAX_DOCUMENT_SIZE: u64 = 25 * 1024 * 1024;

/// A submitted document, before anything is known about its format.
#[derive(Debug, Clone)]
pub enum DocumentInput {
    /// A file on disk (upload staged to a path).
    Path(PathBuf),
    /// Inline text: email body, JSON text, or base64-encoded binary.
    Text(String),
    /// Raw bytes with no declared content type.
    Bytes(Vec<u8>),
}

impl DocumentInput {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(bytes.into())
    }

    /// The file path, when the input is one.
    pub fn file_path(&self) -> Option<&Path> {
        match self {
            Self::Path(p) => Some(p),
            _ => None,
        }
    }

    /// Size of the payload in bytes (file size for paths, 0 if unreadable).
    pub fn size(&self) -> u64 {
        match self {
            Self::Path(p) => std::fs::metadata(p).map(|m| m.len()).unwrap_or(0),
            Self::Text(t) => t.len() as u64,
            Self::Bytes(b) => b.len() as u64,
        }
    }

    /// Raw payload bytes. Inline text is returned as its UTF-8 encoding.
    ///
    /// Payloads over [`MAX_DOCUMENT_SIZE`] are rejected whatever their origin.
    pub fn read_bytes(&self) -> Result<Cow<'_, [u8]>> {
        match self {
            Self::Path(p) => {
                let len = std::fs::metadata(p)
                    .map_err(|e| DocRouterError::io(p, e))?
                    .len();
                check_size(&p.display().to_string(), len)?;
                std::fs::read(p)
                    .map(Cow::Owned)
                    .map_err(|e| DocRouterError::io(p, e))
            }
            Self::Text(t) => {
                check_size("inline text", t.len() as u64)?;
                Ok(Cow::Borrowed(t.as_bytes()))
            }
            Self::Bytes(b) => {
                check_size("inline bytes", b.len() as u64)?;
                Ok(Cow::Borrowed(b))
            }
        }
    }

    /// Payload as text, decoding bytes lossily.
    pub fn read_text(&self) -> Result<Cow<'_, str>> {
        match self {
            Self::Text(t) => {
                check_size("inline text", t.len() as u64)?;
                Ok(Cow::Borrowed(t))
            }
            _ => {
                let bytes = self.read_bytes()?;
                Ok(Cow::Owned(String::from_utf8_lossy(&bytes).into_owned()))
            }
        }
    }
}

/// Everything the format signals look at, gathered once per detection.
#[derive(Debug, Clone, Default)]
pub struct Probe {
    /// Source hint as supplied (upload filename, API tag).
    pub hint: String,
    /// Lower-cased extension of the input file path, if any.
    pub path_extension: Option<String>,
    /// Raw bytes, present for file and byte inputs only.
    pub raw: Option<Vec<u8>>,
    /// Textual view of the content: inline text, or raw bytes that are valid UTF-8.
    pub text: Option<String>,
}

impl Probe {
    /// Build a probe. Unreadable content leaves `raw`/`text` empty; it never fails.
    pub fn new(input: &DocumentInput, hint: &str) -> Self {
        let path_extension = input.file_path().and_then(extension_of);

        let (raw, text) = match input {
            DocumentInput::Text(t) if t.len() as u64 <= MAX_DOCUMENT_SIZE => {
                (None, Some(t.clone()))
            }
            _ => match input.read_bytes() {
                Ok(bytes) => {
                    let bytes = bytes.into_owned();
                    let text = std::str::from_utf8(&bytes).ok().map(str::to_string);
                    (Some(bytes), text)
                }
                Err(e) => {
                    tracing::debug!(error = %e, "content unavailable for sniffing");
                    (None, None)
                }
            },
        };

        Self {
            hint: hint.to_string(),
            path_extension,
            raw,
            text,
        }
    }

    /// Lower-cased extension of the source hint, if it looks like a file name.
    pub fn hint_extension(&self) -> Option<String> {
        extension_of(Path::new(self.hint.trim()))
    }
}

fn check_size(what: &str, len: u64) -> Result<()> {
    if len > MAX_DOCUMENT_SIZE {
        return Err(DocRouterError::validation(format!(
            "{what}: document too large ({len} bytes, max {MAX_DOCUMENT_SIZE})"
        )));
    }
    Ok(())
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}
