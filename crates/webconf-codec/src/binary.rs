//! Flat positional encoding of a registry traversal.
//!
//! Layout, in traversal order and native byte order: `i32` and `f32` fields
//! as 4 bytes, strings as an `i32` byte length followed by the raw bytes,
//! enumerations as `i32`. Composite boundaries write nothing, so a file can
//! only be read back by a registry with the same shape.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use webconf_core::{Result, Visitor, WebConfError};

/// Appends every visited value to an in-memory buffer.
#[derive(Debug, Default)]
pub struct BinaryWriter {
    buf: BytesMut,
}

impl BinaryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }
}

impl Visitor for BinaryWriter {
    fn visit_float(&mut self, _name: &str, value: &mut f32) {
        self.buf.put_f32_ne(*value);
    }

    fn visit_int(&mut self, _name: &str, value: &mut i32) {
        self.buf.put_i32_ne(*value);
    }

    fn visit_string(&mut self, _name: &str, value: &mut String) {
        self.buf.put_i32_ne(value.len() as i32);
        self.buf.put_slice(value.as_bytes());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Decode everything but leave the visited fields untouched.
    Verify,
    /// Overwrite each visited field with the decoded value.
    Apply,
}

/// Reads values back in traversal order.
///
/// The first decoding error stops all further reads and writes; it is
/// reported by [`BinaryReader::finish`].
pub struct BinaryReader<'a> {
    input: &'a [u8],
    total: usize,
    mode: ReadMode,
    error: Option<WebConfError>,
}

impl<'a> BinaryReader<'a> {
    pub fn new(input: &'a [u8], mode: ReadMode) -> Self {
        Self {
            input,
            total: input.len(),
            mode,
            error: None,
        }
    }

    pub fn verify(input: &'a [u8]) -> Self {
        Self::new(input, ReadMode::Verify)
    }

    pub fn apply(input: &'a [u8]) -> Self {
        Self::new(input, ReadMode::Apply)
    }

    fn offset(&self) -> usize {
        self.total - self.input.remaining()
    }

    /// Bytes left after the traversal.
    pub fn trailing(&self) -> usize {
        self.input.remaining()
    }

    /// Number of bytes consumed, or the first decoding error.
    pub fn finish(self) -> Result<usize> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.total - self.input.remaining()),
        }
    }

    fn ensure(&mut self, needed: usize) -> bool {
        if self.error.is_some() {
            return false;
        }
        if self.input.remaining() < needed {
            self.error = Some(WebConfError::Truncated {
                offset: self.offset(),
                needed: needed - self.input.remaining(),
            });
            return false;
        }
        true
    }
}

impl Visitor for BinaryReader<'_> {
    fn visit_float(&mut self, _name: &str, value: &mut f32) {
        if !self.ensure(4) {
            return;
        }
        let decoded = self.input.get_f32_ne();
        if self.mode == ReadMode::Apply {
            *value = decoded;
        }
    }

    fn visit_int(&mut self, _name: &str, value: &mut i32) {
        if !self.ensure(4) {
            return;
        }
        let decoded = self.input.get_i32_ne();
        if self.mode == ReadMode::Apply {
            *value = decoded;
        }
    }

    fn visit_string(&mut self, name: &str, value: &mut String) {
        if !self.ensure(4) {
            return;
        }
        let offset = self.offset();
        let len = self.input.get_i32_ne();
        if len < 0 {
            self.error = Some(WebConfError::Corrupt {
                offset,
                reason: format!("negative length {len} for string '{name}'"),
            });
            return;
        }
        let len = len as usize;
        if !self.ensure(len) {
            return;
        }
        let (raw, rest) = self.input.split_at(len);
        if self.mode == ReadMode::Apply {
            *value = String::from_utf8_lossy(raw).into_owned();
        }
        self.input = rest;
    }
}
