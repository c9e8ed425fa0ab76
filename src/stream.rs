//! File-like cursor operations over atom content.
//!
//! These work on data atoms and on the preamble of hybrids; on containers
//! they fail with [`Error::InvalidKind`](crate::Error::InvalidKind). The
//! first write against content still backed by the source stream copies it
//! into an owned buffer.

use crate::atom::Atom;
use crate::error::{Error, Result};
use crate::util::CHUNK_SIZE;
use std::io::{self, Read, Seek, SeekFrom, Write};

impl Atom {
    pub fn tell(&self) -> u64 {
        self.cursor
    }

    /// Move the cursor. Positions past the end are allowed; a later write
    /// zero-fills the gap.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let len = self.content("seek")?.len();
        let target = match pos {
            SeekFrom::Start(n) => i128::from(n),
            SeekFrom::Current(d) => i128::from(self.cursor) + i128::from(d),
            SeekFrom::End(d) => i128::from(len) + i128::from(d),
        };
        let target = u64::try_from(target)
            .map_err(|_| Error::Bounds(format!("seek to {} in '{}'", target, self.typ)))?;
        self.cursor = target;
        Ok(target)
    }

    /// Read into `buf` from the cursor. Returns 0 at end of content.
    pub fn read_into(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = self.content("read")?.read_at(self.cursor, buf)?;
        self.cursor += n as u64;
        Ok(n)
    }

    /// Up to `n` bytes from the cursor; empty at end of content.
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        let remaining = self.content("read")?.len().saturating_sub(self.cursor);
        let mut buf = vec![0u8; remaining.min(n as u64) as usize];
        let got = self.read_into(&mut buf)?;
        buf.truncate(got);
        Ok(buf)
    }

    /// Everything from the cursor to the end of content.
    pub fn read_all(&mut self) -> Result<Vec<u8>> {
        let remaining = self.content("read")?.len().saturating_sub(self.cursor);
        let remaining = usize::try_from(remaining)
            .map_err(|_| Error::Bounds(format!("{} bytes do not fit in memory", remaining)))?;
        self.read_bytes(remaining)
    }

    /// Overwrite at the cursor, growing the content as needed.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<usize> {
        let start = usize::try_from(self.cursor)
            .map_err(|_| Error::Bounds(format!("write at {}", self.cursor)))?;
        let buf = self.content_mut("write")?.materialize()?;
        let end = start + data.len();
        if buf.len() < end {
            buf.resize(end, 0);
        }
        buf[start..end].copy_from_slice(data);
        self.cursor = end as u64;
        Ok(data.len())
    }

    /// Same as writing each chunk in turn.
    pub fn write_lines<I>(&mut self, chunks: I) -> Result<usize>
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        let mut total = 0;
        for chunk in chunks {
            total += self.write_bytes(chunk.as_ref())?;
        }
        Ok(total)
    }

    /// Cut content to `size` (the cursor when `None`). Growing is not
    /// allowed. A source-backed window is shrunk without copying.
    pub fn truncate(&mut self, size: Option<u64>) -> Result<()> {
        let size = size.unwrap_or(self.cursor);
        let storage = self.content_mut("truncate")?;
        if size > storage.len() {
            let len = storage.len();
            return Err(Error::Bounds(format!(
                "truncate to {} past content length {} of '{}'",
                size, len, self.typ
            )));
        }
        storage.truncate(size);
        self.cursor = self.cursor.min(size);
        Ok(())
    }

    /// The next line including its `\n`, capped at `max` bytes.
    pub fn read_line(&mut self, max: Option<usize>) -> Result<Vec<u8>> {
        let limit = max.unwrap_or(usize::MAX);
        let storage = self.content("read_line")?;
        let mut line = Vec::new();
        let mut chunk = vec![0u8; CHUNK_SIZE.min(limit)];
        let mut pos = self.cursor;
        while line.len() < limit {
            let want = (limit - line.len()).min(chunk.len());
            let n = storage.read_at(pos, &mut chunk[..want])?;
            if n == 0 {
                break;
            }
            if let Some(i) = chunk[..n].iter().position(|&b| b == b'\n') {
                line.extend_from_slice(&chunk[..=i]);
                break;
            }
            line.extend_from_slice(&chunk[..n]);
            pos += n as u64;
        }
        self.cursor += line.len() as u64;
        Ok(line)
    }

    /// Remaining lines. With a `hint`, stops once that many bytes are read.
    pub fn read_lines(&mut self, hint: Option<usize>) -> Result<Vec<Vec<u8>>> {
        let hint = hint.filter(|&h| h > 0);
        let mut lines = Vec::new();
        let mut total = 0;
        loop {
            let line = self.read_line(None)?;
            if line.is_empty() {
                break;
            }
            total += line.len();
            lines.push(line);
            if hint.is_some_and(|h| total >= h) {
                break;
            }
        }
        Ok(lines)
    }

    /// One-pass iterator over the remaining lines. Seek back to restart.
    pub fn lines(&mut self) -> Lines<'_> {
        Lines {
            atom: self,
            done: false,
        }
    }
}

pub struct Lines<'a> {
    atom: &'a mut Atom,
    done: bool,
}

impl Iterator for Lines<'_> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.atom.read_line(None) {
            Ok(line) if line.is_empty() => {
                self.done = true;
                None
            }
            Ok(line) => Some(Ok(line)),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl Read for Atom {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_into(buf)?)
    }
}

impl Write for Atom {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.write_bytes(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for Atom {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        Ok(Atom::seek(self, pos)?)
    }
}
