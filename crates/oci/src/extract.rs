//! Feature archive extraction.
//!
//! Feature layers are tarballs, usually gzip-compressed (`.tgz`). The
//! compression is detected from the file's magic bytes rather than the
//! media type, which says `+tar` either way.

use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use tar::Archive;
use tracing::debug;

use crate::Result;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Extract a tar or tar.gz archive into `dest`, creating it if absent.
///
/// Entries that would escape `dest` are skipped by the tar unpacker.
///
/// # Errors
///
/// Returns an error if the archive cannot be read or written out.
pub fn extract_archive(archive_path: &Path, dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest)?;

    let mut file = File::open(archive_path)?;
    let mut magic = [0u8; 2];
    let is_gzip = file.read(&mut magic)? == 2 && magic == GZIP_MAGIC;
    file.seek(SeekFrom::Start(0))?;

    debug!(?archive_path, ?dest, is_gzip, "Extracting archive");

    let reader = BufReader::new(file);
    if is_gzip {
        Archive::new(GzDecoder::new(reader)).unpack(dest)?;
    } else {
        Archive::new(reader).unpack(dest)?;
    }

    Ok(())
}

/// [`extract_archive`] on the blocking pool.
pub(crate) async fn extract_archive_blocking(archive_path: &Path, dest: &Path) -> Result<()> {
    let archive_path = archive_path.to_path_buf();
    let dest = dest.to_path_buf();
    tokio::task::spawn_blocking(move || extract_archive(&archive_path, &dest))
        .await
        .map_err(std::io::Error::other)?
}
