use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use bytes::Bytes;
use futures_util::stream;

use crate::{Error, ExpectedSource, Message, Result, Subscription};

/// Header carrying the name of the file a message was read from.
pub const FILE_NAME_HEADER: &str = "file_name";

/// A source that turns every regular file of a directory into one message.
///
/// Files are read in file-name order; subdirectories and other entries are
/// skipped. Each body is the raw file content as [`Bytes`], with the file name
/// in the [`FILE_NAME_HEADER`] header. Pair it with the
/// [`Utf8`](crate::Utf8) extractor when the live traffic carries text.
///
/// The directory is read when the source is opened, so a missing or
/// unreadable directory, or an unreadable file, fails the start with
/// [`Error::SourceUnavailable`] instead of silently producing fewer
/// expectations.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    name: String,
    path: PathBuf,
}

impl DirectorySource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Vec<Message<Bytes>>> {
        let entries = fs::read_dir(&self.path)
            .map_err(|e| Error::unavailable(&self.name, format!("{}: {e}", self.path.display())))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::unavailable(&self.name, e))?;
            let file_type = entry
                .file_type()
                .map_err(|e| Error::unavailable(&self.name, e))?;
            if file_type.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();

        let mut messages = Vec::with_capacity(files.len());
        for path in files {
            let content = fs::read(&path)
                .map_err(|e| Error::unavailable(&self.name, format!("{}: {e}", path.display())))?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            tracing::trace!(source = %self.name, file = %file_name, size = content.len(), "read expected file");
            messages.push(Message::new(Bytes::from(content)).with_header(FILE_NAME_HEADER, file_name));
        }
        Ok(messages)
    }
}

impl ExpectedSource<Bytes> for DirectorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self, _timeout: Duration) -> Result<Subscription<Bytes>> {
        let messages = self.read_all()?;
        Ok(Box::pin(stream::iter(messages)))
    }
}
