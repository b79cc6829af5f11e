//! Errors returned by the serialization service.
//!
//! Configuration problems ([`DuplicateTypeId`], [`DuplicateType`],
//! [`InvalidTypeId`]) are reported by
//! [`SerializationServiceBuilder::build`](crate::service::SerializationServiceBuilder::build).
//! Everything else is reported synchronously by `to_data`/`to_object`.
//! Nothing is retried: the same input always fails the same way.
//!
//! [`DuplicateTypeId`]: SerializationError::DuplicateTypeId
//! [`DuplicateType`]: SerializationError::DuplicateType
//! [`InvalidTypeId`]: SerializationError::InvalidTypeId

use std::fmt::Display;

use thiserror::Error;

/// Alias used throughout the crate.
pub type Result<T, E = SerializationError> = std::result::Result<T, E>;

/// Which way bytes were flowing when a serializer failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Object to bytes.
    Write,
    /// Bytes to object.
    Read,
}

impl Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Write => f.write_str("write"),
            Direction::Read => f.write_str("read"),
        }
    }
}

/// Everything that can go wrong while configuring or using a
/// [`SerializationService`](crate::service::SerializationService).
#[derive(Debug, Error)]
pub enum SerializationError {
    /// Two different types were bound to the same type-id.
    #[error("type-id {type_id} is already bound to {existing}, cannot bind {attempted}")]
    DuplicateTypeId {
        /// The contested type-id.
        type_id: i32,
        /// Type that already owns the id.
        existing: &'static str,
        /// Type that tried to claim it.
        attempted: &'static str,
    },

    /// The same type was bound twice.
    #[error("{type_name} already has a serializer (type-id {existing_id})")]
    DuplicateType {
        /// The type being bound again.
        type_name: &'static str,
        /// Type-id of the existing binding.
        existing_id: i32,
    },

    /// Type-ids must be positive.
    #[error("type-id {type_id} for {type_name} must be positive")]
    InvalidTypeId {
        /// The rejected id.
        type_id: i32,
        /// The type it was offered for.
        type_name: &'static str,
    },

    /// No serializer is bound for the value's type.
    #[error("no serializer registered for {type_name}")]
    UnregisteredType {
        /// The unbound type.
        type_name: &'static str,
    },

    /// The header of a [`Data`](crate::data::Data) names a type-id nobody registered.
    #[error("no serializer registered for type-id {type_id}")]
    UnknownTypeId {
        /// The id read from the header.
        type_id: i32,
    },

    /// The byte sequence is too short to hold a header.
    #[error("data is {len} bytes, header needs {needed}")]
    MalformedData {
        /// Actual length.
        len: usize,
        /// Minimum length.
        needed: usize,
    },

    /// A registered serializer failed.
    #[error("serializer for type-id {type_id} failed to {direction}: {source}")]
    SerializationFailure {
        /// Type-id of the failing serializer.
        type_id: i32,
        /// Whether it failed writing or reading.
        direction: Direction,
        /// What the serializer reported.
        #[source]
        source: anyhow::Error,
    },

    /// A typed decode asked for a different type than the one bound to the type-id.
    #[error("type-id {type_id} decodes to {actual}, not {expected}")]
    TypeMismatch {
        /// Type-id read from the header.
        type_id: i32,
        /// The type the caller asked for.
        expected: &'static str,
        /// The type the serializer produces.
        actual: &'static str,
    },

    /// The service has been destroyed.
    #[error("serialization service is closed")]
    ServiceClosed,
}

impl SerializationError {
    pub(crate) fn failure(type_id: i32, direction: Direction, source: anyhow::Error) -> Self {
        Self::SerializationFailure {
            type_id,
            direction,
            source,
        }
    }
}
