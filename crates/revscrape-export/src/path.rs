//! Collision-free output paths.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Upper bound on `stem (n).ext` suffixes tried before giving up.
const MAX_SUFFIX: u32 = 10_000;

/// Writes `bytes` to `dir/base_name`, or to the first free `dir/stem (n).ext`
/// for `n = 1, 2, …` when that is taken.
///
/// Files are opened create-new, so a file created concurrently by another
/// writer is skipped rather than overwritten. A file whose write fails is
/// removed before the error is returned.
///
/// # Errors
///
/// Returns any I/O error other than `AlreadyExists`, or `AlreadyExists` if
/// every suffix up to the limit is taken.
pub(crate) fn write_new(dir: &Path, base_name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
    for path in candidates(dir, base_name) {
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => {
                fill_or_remove(file, &path, bytes, write_all)?;
                return Ok(path);
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                tracing::debug!(path = %path.display(), "export path taken; trying next suffix");
            }
            Err(e) => return Err(e),
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free file name for {base_name} in {}", dir.display()),
    ))
}

/// Runs `write` on the freshly created `file` at `path`. On failure the file
/// is deleted so no truncated export is left under the claimed name.
fn fill_or_remove(
    file: File,
    path: &Path,
    bytes: &[u8],
    write: impl FnOnce(File, &[u8]) -> io::Result<()>,
) -> io::Result<()> {
    if let Err(e) = write(file, bytes) {
        if let Err(cleanup) = std::fs::remove_file(path) {
            tracing::warn!(path = %path.display(), error = %cleanup, "failed to remove partial export");
        }
        return Err(e);
    }
    Ok(())
}

fn write_all(mut file: File, bytes: &[u8]) -> io::Result<()> {
    file.write_all(bytes)?;
    file.sync_all()
}

fn candidates<'a>(dir: &'a Path, base_name: &'a str) -> impl Iterator<Item = PathBuf> + 'a {
    let (stem, ext) = split_name(base_name);
    std::iter::once(dir.join(base_name)).chain(
        (1..=MAX_SUFFIX).map(move |n| dir.join(format!("{stem} ({n}){ext}"))),
    )
}

/// Splits `"reviews.xlsx"` into `("reviews", ".xlsx")`. A leading dot is part
/// of the stem, so `".env"` has no extension.
fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_name_handles_extension_and_dotfiles() {
        assert_eq!(split_name("reviews.xlsx"), ("reviews", ".xlsx"));
        assert_eq!(split_name("a.b.xlsx"), ("a.b", ".xlsx"));
        assert_eq!(split_name("noext"), ("noext", ""));
        assert_eq!(split_name(".hidden"), (".hidden", ""));
    }

    #[test]
    fn write_new_never_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let taken = dir.path().join("reviews.xlsx");
        std::fs::write(&taken, b"original").unwrap();

        let written = write_new(dir.path(), "reviews.xlsx", b"fresh").unwrap();

        assert_eq!(written, dir.path().join("reviews (1).xlsx"));
        assert_eq!(std::fs::read(&taken).unwrap(), b"original");
        assert_eq!(std::fs::read(&written).unwrap(), b"fresh");
    }

    #[test]
    fn failed_write_removes_the_created_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reviews.xlsx");
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .unwrap();

        let err = fill_or_remove(file, &path, b"partial", |mut file, bytes| {
            file.write_all(&bytes[..3])?;
            Err(io::Error::new(io::ErrorKind::StorageFull, "disk full"))
        })
        .unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::StorageFull);
        assert!(!path.exists());
    }

    #[test]
    fn successful_write_keeps_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reviews.xlsx");
        let file = File::create(&path).unwrap();

        fill_or_remove(file, &path, b"complete", write_all).unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"complete");
    }
}
