//! Construction-time configuration.
//!
//! A [`SerializationConfig`] is assembled in code and handed to
//! [`SerializationServiceBuilder`](crate::service::SerializationServiceBuilder).
//! It is consumed by the build and cannot change afterwards.
//!
//! [`ByteOrder`] and [`BufferPoolConfig`] are plain serde types, so a
//! host application can keep them in whatever config document it
//! already parses.

use std::{any::type_name, fmt};

use serde::{Deserialize, Serialize};

use crate::serializer::{Serializer, SerializerBinding};

/// Byte order used for the [`Data`](crate::data::Data) header and for the
/// numeric helpers of [`ObjectDataOutput`](crate::io::ObjectDataOutput)/[`ObjectDataInput`](crate::io::ObjectDataInput).
///
/// Both ends of an exchange must agree; nothing in the encoding records
/// which order was used.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ByteOrder {
    /// Whatever the host CPU uses.
    Native,
    /// Network order.
    #[default]
    BigEndian,
    /// Little endian.
    LittleEndian,
}

impl ByteOrder {
    /// Returns `true` if values are laid out least significant byte first.
    #[must_use]
    pub const fn is_little_endian(self) -> bool {
        match self {
            ByteOrder::Native => cfg!(target_endian = "little"),
            ByteOrder::BigEndian => false,
            ByteOrder::LittleEndian => true,
        }
    }
}

/// Tuning for the output buffer pool used by streaming serializers.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct BufferPoolConfig {
    /// How many idle buffers are kept. `0` disables pooling.
    pub capacity: usize,
    /// Capacity of a freshly allocated buffer.
    pub initial_buffer_size: usize,
    /// Buffers that grew past this are dropped instead of pooled.
    pub max_retained_size: usize,
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self {
            capacity: 16,
            initial_buffer_size: 4 * 1024,
            max_retained_size: 1024 * 1024,
        }
    }
}

/// Everything a [`SerializationService`](crate::service::SerializationService) is built from.
#[derive(Default)]
pub struct SerializationConfig {
    pub(crate) byte_order: ByteOrder,
    pub(crate) buffer_pool: BufferPoolConfig,
    pub(crate) bindings: Vec<SerializerBinding>,
}

impl SerializationConfig {
    /// Empty configuration: big endian, default pool, no serializers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the byte order.
    #[must_use]
    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    /// Shorthand for picking between [`ByteOrder::Native`] and [`ByteOrder::BigEndian`].
    #[must_use]
    pub fn with_native_byte_order(self, native: bool) -> Self {
        self.with_byte_order(if native {
            ByteOrder::Native
        } else {
            ByteOrder::BigEndian
        })
    }

    /// Sets the buffer pool tuning.
    #[must_use]
    pub fn with_buffer_pool(mut self, buffer_pool: BufferPoolConfig) -> Self {
        self.buffer_pool = buffer_pool;
        self
    }

    /// Binds `T` to `serializer`, using the serializer's own type-id.
    #[must_use]
    pub fn add_serializer<T>(self, serializer: Serializer<T>) -> Self
    where
        T: Send + 'static,
    {
        self.add_binding(SerializerBinding::new(serializer))
    }

    /// Adds a prepared binding. Bindings are registered in the order added.
    #[must_use]
    pub fn add_binding(mut self, binding: SerializerBinding) -> Self {
        self.bindings.push(binding);
        self
    }

    /// The configured byte order.
    #[must_use]
    pub const fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// The configured pool tuning.
    #[must_use]
    pub const fn buffer_pool(&self) -> BufferPoolConfig {
        self.buffer_pool
    }

    /// Number of bindings added so far.
    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }
}

impl fmt::Debug for SerializationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("byte_order", &self.byte_order)
            .field("buffer_pool", &self.buffer_pool)
            .field("bindings", &self.bindings)
            .finish()
    }
}
