//! Backing storage for atom content.
//!
//! Content is either a read-only [`Window`] onto a shared [`Source`] stream,
//! or an owned buffer. The switch from borrowed to owned only goes one way
//! and happens on the first mutation ([`Storage::materialize`]).

use crate::error::{Error, Result};
use crate::util::CHUNK_SIZE;
use std::cell::RefCell;
use std::fmt;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::rc::Rc;

pub trait ReadSeek: Read + Seek {}
impl<T: Read + Seek + ?Sized> ReadSeek for T {}

/// Shared handle to the stream a tree was parsed from.
///
/// Every borrowed window holds a clone of this handle. Closing it detaches
/// the stream; windows that are still alive then fail with
/// [`Error::SourceClosed`] instead of reading anything.
#[derive(Clone)]
pub struct Source {
    inner: Rc<RefCell<Option<Box<dyn ReadSeek>>>>,
}

impl Source {
    pub fn new<R: Read + Seek + 'static>(stream: R) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Some(Box::new(stream)))),
        }
    }

    /// Run `f` against the underlying stream.
    ///
    /// This is the raw access path for callers decoding box-specific
    /// records at an atom's [`source_offset`](crate::Atom::source_offset).
    pub fn with_stream<T>(&self, f: impl FnOnce(&mut dyn ReadSeek) -> Result<T>) -> Result<T> {
        let mut guard = self.inner.try_borrow_mut().map_err(|_| Error::SourceBusy)?;
        let stream = guard.as_mut().ok_or(Error::SourceClosed)?;
        f(stream.as_mut())
    }

    /// Detach and return the stream.
    pub fn close(&self) -> Result<Option<Box<dyn ReadSeek>>> {
        let mut guard = self.inner.try_borrow_mut().map_err(|_| Error::SourceBusy)?;
        Ok(guard.take())
    }

    pub fn is_closed(&self) -> bool {
        self.inner.try_borrow().map(|s| s.is_none()).unwrap_or(false)
    }

    /// Whether both handles refer to the same stream.
    pub fn same(&self, other: &Source) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Total stream length. The read position is left untouched.
    pub fn stream_len(&self) -> Result<u64> {
        self.with_stream(|s| {
            let cur = s.stream_position()?;
            let end = s.seek(SeekFrom::End(0))?;
            s.seek(SeekFrom::Start(cur))?;
            Ok(end)
        })
    }

    pub fn position(&self) -> Result<u64> {
        self.with_stream(|s| Ok(s.stream_position()?))
    }

    pub fn set_position(&self, pos: u64) -> Result<()> {
        self.with_stream(|s| {
            s.seek(SeekFrom::Start(pos))?;
            Ok(())
        })
    }

    pub fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let want = buf.len();
        self.with_stream(|s| {
            s.seek(SeekFrom::Start(offset))?;
            s.read_exact(buf).map_err(|e| match e.kind() {
                io::ErrorKind::UnexpectedEof => Error::Format(format!(
                    "source ended inside a {}-byte read at offset {}",
                    want, offset
                )),
                _ => Error::Io(e),
            })
        })
    }

    /// Read exactly `len` bytes at `offset`, failing if fewer are available.
    pub fn read_vec(&self, offset: u64, len: u64) -> Result<Vec<u8>> {
        self.with_stream(|s| {
            s.seek(SeekFrom::Start(offset))?;
            let mut buf = Vec::new();
            Read::take(&mut *s, len).read_to_end(&mut buf)?;
            if buf.len() as u64 != len {
                return Err(Error::Format(format!(
                    "declared {} bytes at offset {}, found {}",
                    len,
                    offset,
                    buf.len()
                )));
            }
            Ok(buf)
        })
    }

    /// Copy `len` bytes starting at `offset` into `w` in bounded chunks.
    pub fn copy_range(&self, offset: u64, len: u64, w: &mut dyn Write) -> Result<u64> {
        self.with_stream(|s| {
            s.seek(SeekFrom::Start(offset))?;
            let mut buf = vec![0u8; CHUNK_SIZE.min(len as usize)];
            let mut remaining = len;
            while remaining > 0 {
                let want = remaining.min(buf.len() as u64) as usize;
                let n = match s.read(&mut buf[..want]) {
                    Ok(n) => n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e.into()),
                };
                if n == 0 {
                    return Err(Error::Format(format!(
                        "source ended after {} of {} bytes at offset {}",
                        len - remaining,
                        len,
                        offset
                    )));
                }
                w.write_all(&buf[..n])?;
                remaining -= n as u64;
            }
            Ok(len)
        })
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Read-only `(offset, len)` view into a [`Source`].
#[derive(Clone, Debug)]
pub struct Window {
    source: Source,
    offset: u64,
    len: u64,
}

impl Window {
    pub fn new(source: Source, offset: u64, len: u64) -> Self {
        Self {
            source,
            offset,
            len,
        }
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn read_at(&self, pos: u64, buf: &mut [u8]) -> Result<usize> {
        if pos >= self.len || buf.is_empty() {
            return Ok(0);
        }
        let n = (self.len - pos).min(buf.len() as u64) as usize;
        self.source.read_exact_at(self.offset + pos, &mut buf[..n])?;
        Ok(n)
    }

    fn same_range(&self, other: &Window) -> bool {
        self.source.same(&other.source) && self.offset == other.offset && self.len == other.len
    }
}

#[derive(Clone, Debug)]
pub enum Storage {
    Borrowed(Window),
    Owned(Vec<u8>),
}

impl Default for Storage {
    fn default() -> Self {
        Storage::Owned(Vec::new())
    }
}

impl Storage {
    pub fn len(&self) -> u64 {
        match self {
            Storage::Borrowed(w) => w.len(),
            Storage::Owned(v) => v.len() as u64,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, Storage::Owned(_))
    }

    /// Fill as much of `buf` as the content allows starting at `pos`.
    pub fn read_at(&self, pos: u64, buf: &mut [u8]) -> Result<usize> {
        match self {
            Storage::Borrowed(w) => w.read_at(pos, buf),
            Storage::Owned(v) => {
                if pos >= v.len() as u64 {
                    return Ok(0);
                }
                let start = pos as usize;
                let n = (v.len() - start).min(buf.len());
                buf[..n].copy_from_slice(&v[start..start + n]);
                Ok(n)
            }
        }
    }

    /// The full content, read through in one go for borrowed windows.
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        match self {
            Storage::Borrowed(w) => w.source.read_vec(w.offset, w.len),
            Storage::Owned(v) => Ok(v.clone()),
        }
    }

    /// Switch to an owned buffer, copying the borrowed range if needed.
    pub fn materialize(&mut self) -> Result<&mut Vec<u8>> {
        if let Storage::Borrowed(w) = self {
            log::debug!(
                "materializing {} bytes from source offset {}",
                w.len,
                w.offset
            );
            let bytes = w.source.read_vec(w.offset, w.len)?;
            *self = Storage::Owned(bytes);
        }
        match self {
            Storage::Owned(v) => Ok(v),
            Storage::Borrowed(_) => Err(Error::Format("storage failed to materialize".into())),
        }
    }

    /// Drop content past `len`. A borrowed window just shrinks.
    pub fn truncate(&mut self, len: u64) {
        match self {
            Storage::Borrowed(w) => w.len = w.len.min(len),
            Storage::Owned(v) => v.truncate(len as usize),
        }
    }

    pub fn write_to(&self, w: &mut dyn Write) -> Result<u64> {
        match self {
            Storage::Borrowed(win) => win.source.copy_range(win.offset, win.len, w),
            Storage::Owned(v) => {
                w.write_all(v)?;
                Ok(v.len() as u64)
            }
        }
    }

    /// Byte-wise comparison, chunked so large windows are never loaded whole.
    pub fn content_eq(&self, other: &Storage) -> Result<bool> {
        let len = self.len();
        if len != other.len() {
            return Ok(false);
        }
        match (self, other) {
            (Storage::Owned(a), Storage::Owned(b)) => Ok(a == b),
            (Storage::Borrowed(a), Storage::Borrowed(b)) if a.same_range(b) => Ok(true),
            _ => {
                let mut x = vec![0u8; CHUNK_SIZE];
                let mut y = vec![0u8; CHUNK_SIZE];
                let mut pos = 0;
                while pos < len {
                    let n = self.read_at(pos, &mut x)?;
                    let m = other.read_at(pos, &mut y[..n])?;
                    if n == 0 || m != n || x[..n] != y[..n] {
                        return Ok(false);
                    }
                    pos += n as u64;
                }
                Ok(true)
            }
        }
    }
}
