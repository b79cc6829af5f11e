//! Reader and writer handed to [`StreamSerializer`](crate::serializer::StreamSerializer)s.
//!
//! Both borrow their storage for exactly one call: an [`ObjectDataOutput`]
//! appends to a pooled buffer, an [`ObjectDataInput`] walks the payload
//! of a [`Data`](crate::data::Data) in place. Neither can outlive the call
//! that received it.
//!
//! Numbers are laid out in the service's [`ByteOrder`]. Strings and byte
//! arrays are prefixed with an `i32` length, `-1` meaning "absent".

use std::io;

use crate::config::ByteOrder;

macro_rules! write_num {
    ( $( $name:ident => $ty:ty ),* $(,)? ) => {
        $(
            #[doc = concat!("Writes a `", stringify!($ty), "` in the configured byte order.")]
            pub fn $name(&mut self, value: $ty) {
                if self.order.is_little_endian() {
                    self.buf.extend_from_slice(&value.to_le_bytes());
                } else {
                    self.buf.extend_from_slice(&value.to_be_bytes());
                }
            }
        )*
    };
}

macro_rules! read_num {
    ( $( $name:ident => $ty:ty ),* $(,)? ) => {
        $(
            #[doc = concat!("Reads a `", stringify!($ty), "` in the configured byte order.")]
            ///
            /// # Errors
            /// [`io::ErrorKind::UnexpectedEof`] if the payload is exhausted.
            pub fn $name(&mut self) -> io::Result<$ty> {
                let bytes = self.take_array()?;
                Ok(if self.order.is_little_endian() {
                    <$ty>::from_le_bytes(bytes)
                } else {
                    <$ty>::from_be_bytes(bytes)
                })
            }
        )*
    };
}

/// Append-only writer over a pooled buffer.
#[derive(Debug)]
pub struct ObjectDataOutput<'a> {
    buf: &'a mut Vec<u8>,
    start: usize,
    order: ByteOrder,
}

impl<'a> ObjectDataOutput<'a> {
    /// Wraps `buf`, appending after whatever it already holds.
    pub fn new(buf: &'a mut Vec<u8>, order: ByteOrder) -> Self {
        let start = buf.len();
        Self { buf, start, order }
    }

    /// Byte order used by the numeric writers.
    #[must_use]
    pub const fn byte_order(&self) -> ByteOrder {
        self.order
    }

    /// Bytes written through this output so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len() - self.start
    }

    /// `true` if nothing has been written yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes a single byte.
    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    write_num! {
        write_i8 => i8,
        write_i16 => i16,
        write_u16 => u16,
        write_i32 => i32,
        write_i64 => i64,
        write_f32 => f32,
        write_f64 => f64,
    }

    /// Writes `true` as `1` and `false` as `0`.
    pub fn write_bool(&mut self, value: bool) {
        self.buf.push(u8::from(value));
    }

    /// Appends raw bytes without a length prefix.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Writes a length-prefixed byte array; `None` is written as length `-1`.
    ///
    /// # Errors
    /// [`io::ErrorKind::InvalidInput`] if the array is longer than `i32::MAX`.
    pub fn write_byte_array(&mut self, bytes: Option<&[u8]>) -> io::Result<()> {
        match bytes {
            None => self.write_i32(-1),
            Some(bytes) => {
                let len = i32::try_from(bytes.len()).map_err(|_| {
                    io::Error::new(io::ErrorKind::InvalidInput, "byte array too long")
                })?;
                self.write_i32(len);
                self.write_bytes(bytes);
            }
        }
        Ok(())
    }

    /// Writes a length-prefixed UTF-8 string.
    ///
    /// # Errors
    /// [`io::ErrorKind::InvalidInput`] if the string is longer than `i32::MAX` bytes.
    pub fn write_string(&mut self, value: &str) -> io::Result<()> {
        self.write_byte_array(Some(value.as_bytes()))
    }

    /// Writes a string that may be absent.
    ///
    /// # Errors
    /// Same as [`write_string`](Self::write_string).
    pub fn write_nullable_string(&mut self, value: Option<&str>) -> io::Result<()> {
        self.write_byte_array(value.map(str::as_bytes))
    }
}

impl io::Write for ObjectDataOutput<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.buf.extend_from_slice(buf);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Cursor over a payload, read in place.
#[derive(Debug, Clone)]
pub struct ObjectDataInput<'a> {
    data: &'a [u8],
    pos: usize,
    order: ByteOrder,
}

impl<'a> ObjectDataInput<'a> {
    /// Starts reading at the beginning of `data`.
    #[must_use]
    pub const fn new(data: &'a [u8], order: ByteOrder) -> Self {
        Self {
            data,
            pos: 0,
            order,
        }
    }

    /// Byte order used by the numeric readers.
    #[must_use]
    pub const fn byte_order(&self) -> ByteOrder {
        self.order
    }

    /// Bytes consumed so far.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> io::Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "needed {n} bytes at offset {}, {} left",
                    self.pos,
                    self.remaining()
                ),
            ));
        }
        let data: &'a [u8] = self.data;
        let out = &data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn take_array<const N: usize>(&mut self) -> io::Result<[u8; N]> {
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(self.take(N)?);
        Ok(bytes)
    }

    /// Reads a single byte.
    ///
    /// # Errors
    /// [`io::ErrorKind::UnexpectedEof`] if the payload is exhausted.
    pub fn read_u8(&mut self) -> io::Result<u8> {
        Ok(self.take(1)?[0])
    }

    read_num! {
        read_i8 => i8,
        read_i16 => i16,
        read_u16 => u16,
        read_i32 => i32,
        read_i64 => i64,
        read_f32 => f32,
        read_f64 => f64,
    }

    /// Reads a boolean; any non-zero byte is `true`.
    ///
    /// # Errors
    /// [`io::ErrorKind::UnexpectedEof`] if the payload is exhausted.
    pub fn read_bool(&mut self) -> io::Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    /// Borrows the next `n` bytes.
    ///
    /// # Errors
    /// [`io::ErrorKind::UnexpectedEof`] if fewer than `n` bytes remain.
    pub fn read_bytes(&mut self, n: usize) -> io::Result<&'a [u8]> {
        self.take(n)
    }

    /// Borrows everything not yet read.
    pub fn read_remaining(&mut self) -> &'a [u8] {
        let data: &'a [u8] = self.data;
        let out = &data[self.pos..];
        self.pos = data.len();
        out
    }

    /// Reads a length-prefixed byte array written by
    /// [`ObjectDataOutput::write_byte_array`].
    ///
    /// # Errors
    /// [`io::ErrorKind::UnexpectedEof`] on truncation,
    /// [`io::ErrorKind::InvalidData`] on a negative length other than `-1`.
    pub fn read_byte_array(&mut self) -> io::Result<Option<&'a [u8]>> {
        match self.read_i32()? {
            -1 => Ok(None),
            len => {
                let len = usize::try_from(len).map_err(|_| {
                    io::Error::new(io::ErrorKind::InvalidData, format!("bad length {len}"))
                })?;
                self.take(len).map(Some)
            }
        }
    }

    /// Reads a string that may be absent.
    ///
    /// # Errors
    /// As [`read_byte_array`](Self::read_byte_array), plus
    /// [`io::ErrorKind::InvalidData`] for invalid UTF-8.
    pub fn read_nullable_string(&mut self) -> io::Result<Option<String>> {
        self.read_byte_array()?
            .map(|bytes| {
                std::str::from_utf8(bytes)
                    .map(str::to_owned)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
            })
            .transpose()
    }

    /// Reads a string that must be present.
    ///
    /// # Errors
    /// As [`read_nullable_string`](Self::read_nullable_string), plus
    /// [`io::ErrorKind::InvalidData`] if the string was written as absent.
    pub fn read_string(&mut self) -> io::Result<String> {
        self.read_nullable_string()?.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "expected a string, found null")
        })
    }
}

impl io::Read for ObjectDataInput<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.remaining());
        buf[..n].copy_from_slice(self.take(n)?);
        Ok(n)
    }
}
