//! Serializer.
//!
//! Saving runs in two passes. The first walks the tree bottom-up and records
//! every node's content size in pre-order without touching any bytes; the
//! second emits each header from those sizes and streams content behind it.
//! Unmodified data content is copied from its source window in bounded
//! chunks, so payload boxes are never loaded whole.

use crate::atom::{Atom, Body};
use crate::error::{Error, Result};
use crate::parser::{header_len, write_header};
use std::io::{self, Write};

impl Atom {
    /// Size of everything after the header, as it would be saved now.
    pub fn content_size(&self) -> u64 {
        match &self.body {
            Body::Data(storage) => storage.len(),
            Body::Container(kids) => kids.iter().map(Atom::total_size).sum(),
            Body::Hybrid { preamble, children } => {
                preamble.len() + children.iter().map(Atom::total_size).sum::<u64>()
            }
        }
    }

    /// Size including the header, as it would be saved now.
    pub fn total_size(&self) -> u64 {
        let content = self.content_size();
        header_len(content) + content
    }

    /// Write this atom and its subtree to `w` with freshly computed lengths.
    /// Returns the number of bytes written.
    pub fn save<W: Write + ?Sized>(&self, w: &mut W) -> Result<u64> {
        let mut sizes = Vec::new();
        self.measure(&mut sizes);
        let mut out = CountingWriter { inner: w, count: 0 };
        let mut sizes = sizes.into_iter();
        self.emit(&mut out, &mut sizes)?;
        log::debug!("saved '{}' ({} bytes)", self.typ, out.count);
        Ok(out.count)
    }

    /// First pass: push this node's content size in pre-order and return
    /// its total size.
    fn measure(&self, sizes: &mut Vec<u64>) -> u64 {
        let slot = sizes.len();
        sizes.push(0);
        let content = match &self.body {
            Body::Data(storage) => storage.len(),
            Body::Container(kids) => kids.iter().map(|k| k.measure(sizes)).sum(),
            Body::Hybrid { preamble, children } => {
                preamble.len() + children.iter().map(|k| k.measure(sizes)).sum::<u64>()
            }
        };
        sizes[slot] = content;
        header_len(content) + content
    }

    /// Second pass: emit header and content using the measured sizes.
    fn emit<W: Write + ?Sized>(
        &self,
        w: &mut CountingWriter<'_, W>,
        sizes: &mut std::vec::IntoIter<u64>,
    ) -> Result<()> {
        let content = sizes
            .next()
            .ok_or_else(|| Error::Format(format!("no measured size for '{}'", self.typ)))?;
        let start = w.count;
        let header = write_header(w, self.typ, content)?;
        match &self.body {
            Body::Data(storage) => {
                storage.write_to(w)?;
            }
            Body::Container(kids) => {
                for kid in kids {
                    kid.emit(w, sizes)?;
                }
            }
            Body::Hybrid { preamble, children } => {
                preamble.write_to(w)?;
                for kid in children {
                    kid.emit(w, sizes)?;
                }
            }
        }
        let written = w.count - start;
        if written != header + content {
            return Err(Error::Format(format!(
                "'{}' declared {} bytes but emitted {}",
                self.typ,
                header + content,
                written
            )));
        }
        Ok(())
    }
}

struct CountingWriter<'a, W: Write + ?Sized> {
    inner: &'a mut W,
    count: u64,
}

impl<W: Write + ?Sized> Write for CountingWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
