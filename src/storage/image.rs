//! Disk image file access.
//!
//! Uses positioned reads and writes so concurrent requests never share a
//! file cursor.

use crate::error::{Error, Result};
use crate::storage::backend::BackingStore;
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

/// Handle for a disk image opened for reading and writing.
#[derive(Debug)]
pub struct ImageFile {
    file: File,
    path: PathBuf,
}

impl ImageFile {
    /// Open a disk image for reading and writing.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| {
                if e.kind() == ErrorKind::PermissionDenied {
                    Error::PermissionDenied(format!(
                        "Cannot open disk image {} for writing. Check its permissions.",
                        path.display()
                    ))
                } else {
                    Error::Io(e)
                }
            })?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BackingStore for ImageFile {
    fn size(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        let mut filled = 0;

        // pread may return short counts; stop only at EOF.
        while filled < len {
            match self.file.read_at(&mut buf[filled..], offset + filled as u64) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Io(e)),
            }
        }

        buf.truncate(filled);
        Ok(buf)
    }

    fn write_at(&self, offset: u64, data: &[u8]) -> Result<usize> {
        self.file.write_all_at(data, offset)?;
        Ok(data.len())
    }

    fn sync(&self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<()> {
        // The file descriptor is closed when `self` drops.
        Ok(())
    }

    fn name(&self) -> &'static str {
        "image file"
    }
}
