//! Batch-mode packaging of per-segment audio into a zip archive.

use std::io::{Cursor, Write};

use bytes::Bytes;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::RelayResult;

/// Download name sent in `Content-Disposition`.
pub const ARCHIVE_FILENAME: &str = "speech_chunks.zip";

/// Ordered audio parts, one per segment, with their zip encoding.
#[derive(Debug, Clone)]
pub struct Archive {
    entries: Vec<(String, Bytes)>,
    zip: Bytes,
}

impl Archive {
    /// Name of the part at 0-based `index`, e.g. `speech_part_01.mp3`.
    pub fn entry_name(index: usize, extension: &str) -> String {
        format!("speech_part_{:02}.{extension}", index + 1)
    }

    /// Name each blob in order and encode the set as a zip file.
    pub fn pack(extension: &str, blobs: Vec<Bytes>) -> RelayResult<Self> {
        let entries: Vec<(String, Bytes)> = blobs
            .into_iter()
            .enumerate()
            .map(|(i, blob)| (Self::entry_name(i, extension), blob))
            .collect();
        let zip = encode(&entries)?;
        Ok(Self {
            entries,
            zip: Bytes::from(zip),
        })
    }

    pub fn entries(&self) -> &[(String, Bytes)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total audio bytes across all parts.
    pub fn audio_bytes(&self) -> usize {
        self.entries.iter().map(|(_, blob)| blob.len()).sum()
    }

    /// The encoded zip file.
    pub fn zip(&self) -> Bytes {
        self.zip.clone()
    }
}

// Audio is already compressed, so parts are stored.
fn encode(entries: &[(String, Bytes)]) -> RelayResult<Vec<u8>> {
    let estimated: usize = entries.iter().map(|(n, b)| b.len() + n.len() * 2 + 100).sum();
    let mut writer = ZipWriter::new(Cursor::new(Vec::with_capacity(estimated + 22)));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    for (name, blob) in entries {
        writer.start_file(name.as_str(), options)?;
        writer.write_all(blob)?;
    }

    Ok(writer.finish()?.into_inner())
}
