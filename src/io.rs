//! Positioned I/O
//!
//! The reader never seeks: every access is a positioned read against an
//! immutable byte source. [`ReadAt`] is the minimal capability an archive
//! source must provide; implementations exist for files, byte slices, and
//! in-memory cursors.

use std::fs::File;
use std::io;

/// A byte source supporting positioned reads.
///
/// `read_at` must not affect any seek cursor the source may also have.
/// A return of `Ok(0)` on a non-empty buffer signals end of stream.
///
/// Sharing a reader across threads requires the source's positioned reads
/// to be safe to issue concurrently, which holds for the implementations
/// provided here.
pub trait ReadAt {
    /// Reads up to `buf.len()` bytes starting at `offset`, returning the
    /// number of bytes read. Short reads are permitted.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize>;
}

impl ReadAt for File {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        #[cfg(unix)]
        {
            std::os::unix::fs::FileExt::read_at(self, buf, offset)
        }
        #[cfg(windows)]
        {
            std::os::windows::fs::FileExt::seek_read(self, buf, offset)
        }
    }
}

impl ReadAt for [u8] {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        let Ok(start) = usize::try_from(offset) else {
            return Ok(0);
        };
        if start >= self.len() {
            return Ok(0);
        }
        let n = buf.len().min(self.len() - start);
        buf[..n].copy_from_slice(&self[start..start + n]);
        Ok(n)
    }
}

impl ReadAt for Vec<u8> {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        self.as_slice().read_at(buf, offset)
    }
}

impl<T: AsRef<[u8]>> ReadAt for io::Cursor<T> {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        self.get_ref().as_ref().read_at(buf, offset)
    }
}

impl<T: ReadAt + ?Sized> ReadAt for &T {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        (**self).read_at(buf, offset)
    }
}

/// Fills `buf` completely from `source` starting at `offset`.
///
/// Loops over short reads; a premature end of stream is reported as
/// [`io::ErrorKind::UnexpectedEof`].
pub fn read_full_at<R: ReadAt + ?Sized>(source: &R, buf: &mut [u8], offset: u64) -> io::Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        let pos = offset.checked_add(filled as u64).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "read position overflows u64")
        })?;
        let n = source.read_at(&mut buf[filled..], pos)?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("unexpected end of archive at offset {pos}"),
            ));
        }
        filled += n;
    }
    Ok(())
}
