//! # Wire layout
//! ```text
//! +-------------------+--------------------------------+
//! | type-id: i32      | payload: serializer's bytes    |
//! | configured order  | (runs to the end of the value) |
//! +-------------------+--------------------------------+
//! ```
//! There is no payload length; the end of the [`Data`] is the end of the
//! payload. The byte order is a property of the service, not of the
//! bytes, so both sides have to be configured alike.

use std::{fmt, sync::Arc};

use crate::{
    config::ByteOrder,
    error::{Result, SerializationError},
};

/// Size of the type-id header in bytes.
pub const HEADER_SIZE: usize = 4;

/// Immutable framed bytes: type-id header followed by the payload.
///
/// Cloning shares the underlying storage. Equality and hashing cover
/// every byte.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Data {
    bytes: Arc<[u8]>,
}

impl Data {
    /// Wraps bytes received from elsewhere. The header is only checked
    /// when the value is decoded.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// The full framed byte sequence.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Length including the header.
    #[must_use]
    pub fn total_size(&self) -> usize {
        self.bytes.len()
    }

    /// Length of the payload alone.
    #[must_use]
    pub fn payload_len(&self) -> usize {
        self.bytes.len().saturating_sub(HEADER_SIZE)
    }

    /// `true` if the payload is empty.
    #[must_use]
    pub fn is_payload_empty(&self) -> bool {
        self.payload_len() == 0
    }

    /// Bytes after the header; empty if the value is too short to have one.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        self.bytes.get(HEADER_SIZE..).unwrap_or_default()
    }

    /// Copies the bytes out.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes.to_vec()
    }
}

impl From<&[u8]> for Data {
    fn from(bytes: &[u8]) -> Self {
        Self {
            bytes: Arc::from(bytes),
        }
    }
}

impl From<Vec<u8>> for Data {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_bytes(bytes)
    }
}

impl AsRef<[u8]> for Data {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Data")
            .field("total_size", &self.total_size())
            .field("bytes", &&self.bytes[..])
            .finish()
    }
}

/// Reads and writes the [`Data`] header in one byte order.
#[derive(Clone, Copy, Debug)]
pub struct DataCodec {
    order: ByteOrder,
}

impl DataCodec {
    /// Codec for `order`.
    #[must_use]
    pub const fn new(order: ByteOrder) -> Self {
        Self { order }
    }

    /// The byte order in use.
    #[must_use]
    pub const fn byte_order(&self) -> ByteOrder {
        self.order
    }

    fn header(&self, type_id: i32) -> [u8; HEADER_SIZE] {
        if self.order.is_little_endian() {
            type_id.to_le_bytes()
        } else {
            type_id.to_be_bytes()
        }
    }

    /// Frames `payload` behind a header for `type_id`.
    #[must_use]
    pub fn encode(&self, type_id: i32, payload: &[u8]) -> Data {
        let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
        bytes.extend_from_slice(&self.header(type_id));
        bytes.extend_from_slice(payload);
        Data::from_bytes(bytes)
    }

    /// Appends a header to `buf`, for callers that write the payload in place.
    pub fn write_header(&self, buf: &mut impl Extend<u8>, type_id: i32) {
        buf.extend(self.header(type_id));
    }

    /// Splits `data` into its type-id and a view of the payload.
    ///
    /// # Errors
    /// [`SerializationError::MalformedData`] if `data` is shorter than [`HEADER_SIZE`].
    pub fn decode<'d>(&self, data: &'d Data) -> Result<(i32, &'d [u8])> {
        let bytes = data.as_bytes();
        let Some((header, payload)) = bytes.split_first_chunk::<HEADER_SIZE>() else {
            return Err(SerializationError::MalformedData {
                len: bytes.len(),
                needed: HEADER_SIZE,
            });
        };

        let type_id = if self.order.is_little_endian() {
            i32::from_le_bytes(*header)
        } else {
            i32::from_be_bytes(*header)
        };

        Ok((type_id, payload))
    }

    /// Reads only the type-id.
    ///
    /// # Errors
    /// Same as [`decode`](Self::decode).
    pub fn type_id_of(&self, data: &Data) -> Result<i32> {
        self.decode(data).map(|(type_id, _)| type_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_precedes_payload_verbatim() {
        let data = DataCodec::new(ByteOrder::BigEndian).encode(10, b"payload");

        assert_eq!(&data.as_bytes()[..HEADER_SIZE], [0, 0, 0, 10]);
        assert_eq!(data.payload(), b"payload");
        assert_eq!(data.total_size(), HEADER_SIZE + 7);
        assert_eq!(data.payload_len(), 7);
        assert_eq!(data.total_size(), data.as_ref().len());
    }

    #[test]
    fn decode_reads_back_type_id() {
        for order in [ByteOrder::BigEndian, ByteOrder::LittleEndian, ByteOrder::Native] {
            let codec = DataCodec::new(order);
            let data = codec.encode(0x0102_0304, &[7, 8]);

            let (type_id, payload) = codec.decode(&data).unwrap();
            assert_eq!(type_id, 0x0102_0304);
            assert_eq!(payload, [7, 8]);
        }
    }

    #[test]
    fn mismatched_order_reads_a_different_id() {
        let data = DataCodec::new(ByteOrder::BigEndian).encode(1, &[]);
        let type_id = DataCodec::new(ByteOrder::LittleEndian)
            .type_id_of(&data)
            .unwrap();

        assert_eq!(type_id, 1 << 24);
    }

    #[test]
    fn short_input_is_malformed() {
        let codec = DataCodec::new(ByteOrder::BigEndian);

        for len in 0..HEADER_SIZE {
            let data = Data::from_bytes(vec![0; len]);
            assert!(matches!(
                codec.decode(&data),
                Err(SerializationError::MalformedData { needed: HEADER_SIZE, .. })
            ));
            assert!(data.payload().is_empty());
        }
    }

    #[test]
    fn header_only_is_an_empty_payload() {
        let codec = DataCodec::new(ByteOrder::LittleEndian);
        let data = codec.encode(5, &[]);

        assert!(data.is_payload_empty());
        assert_eq!(data.total_size(), HEADER_SIZE);
        assert_eq!(codec.decode(&data).unwrap(), (5, &[][..]));
    }

    #[test]
    fn equality_covers_all_bytes() {
        let codec = DataCodec::new(ByteOrder::BigEndian);

        assert_eq!(codec.encode(1, b"x"), Data::from(&[0, 0, 0, 1, b'x'][..]));
        assert_ne!(codec.encode(1, b"x"), codec.encode(2, b"x"));
        assert_ne!(codec.encode(1, b"x"), codec.encode(1, b"y"));
    }

    #[test]
    fn write_header_appends() {
        let mut buf = vec![0xff];
        DataCodec::new(ByteOrder::LittleEndian).write_header(&mut buf, 2);

        assert_eq!(buf, [0xff, 2, 0, 0, 0]);
    }
}
