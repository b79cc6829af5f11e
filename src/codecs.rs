//! # Built-in codecs
//! - JSON: [`NaiveCodec`]
//! - MessagePack: [`BinaryCodec`]
//!
//! ## What does a codec do?
//! Codecs turn a serde value into bytes and back. The service never
//! uses one directly; [`CodecSerializer`] and [`CodecStreamSerializer`]
//! wrap a codec into a ready-made serializer for any serde type.
//!
//! Both built-in codecs write structs as maps keyed by field name.
//! Readers skip fields they do not know and leave missing `Option`
//! fields as `None`, so two versions of a struct can read each other's
//! bytes.

use std::{
    any::type_name,
    io::{Read, Write},
    marker::PhantomData,
};

use anyhow::Result;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    io::{ObjectDataInput, ObjectDataOutput},
    serializer::{ByteArraySerializer, StreamSerializer},
};

/// A trait that represents a codec
#[allow(clippy::missing_errors_doc)]
pub trait Codec: Send + Sync + Copy {
    /// Decode a slice into a value
    fn decode_slice<'a, T>(&self, v: &'a [u8]) -> Result<T>
    where
        T: Deserialize<'a>;

    /// Encode a value into a vector
    fn encode_to_vec<T>(&self, value: &T) -> Result<Vec<u8>>
    where
        T: ?Sized + Serialize;

    /// Decode a value from a reader
    fn decode_reader<R, T>(&self, reader: R) -> Result<T>
    where
        R: Read,
        T: DeserializeOwned;

    /// Encode a value into a writer
    fn encode_to_writer<W, T>(&self, writer: W, value: &T) -> Result<()>
    where
        W: Write,
        T: ?Sized + Serialize;
}

/// Basic codec that encodes values as JSON using [`serde_json`]
#[derive(Clone, Copy, Debug, Default)]
pub struct NaiveCodec {}

impl Codec for NaiveCodec {
    fn decode_slice<'a, T>(&self, v: &'a [u8]) -> Result<T>
    where
        T: Deserialize<'a>,
    {
        Ok(serde_json::from_slice(v)?)
    }

    fn encode_to_vec<T>(&self, value: &T) -> Result<Vec<u8>>
    where
        T: ?Sized + Serialize,
    {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode_reader<R, T>(&self, reader: R) -> Result<T>
    where
        R: Read,
        T: DeserializeOwned,
    {
        Ok(serde_json::from_reader(reader)?)
    }

    fn encode_to_writer<W, T>(&self, writer: W, value: &T) -> Result<()>
    where
        W: Write,
        T: ?Sized + Serialize,
    {
        Ok(serde_json::to_writer(writer, value)?)
    }
}

/// Codec that encodes values into MessagePack using [`rmp_serde`]
#[derive(Clone, Copy, Debug, Default)]
pub struct BinaryCodec {}

impl Codec for BinaryCodec {
    fn decode_slice<'a, T>(&self, v: &'a [u8]) -> Result<T>
    where
        T: Deserialize<'a>,
    {
        Ok(rmp_serde::from_slice(v)?)
    }

    fn encode_to_vec<T>(&self, value: &T) -> Result<Vec<u8>>
    where
        T: ?Sized + Serialize,
    {
        // Named: positional struct arrays break once two versions disagree on fields.
        Ok(rmp_serde::to_vec_named(value)?)
    }

    fn decode_reader<R, T>(&self, reader: R) -> Result<T>
    where
        R: Read,
        T: DeserializeOwned,
    {
        Ok(rmp_serde::from_read(reader)?)
    }

    fn encode_to_writer<W, T>(&self, mut writer: W, value: &T) -> Result<()>
    where
        W: Write,
        T: ?Sized + Serialize,
    {
        Ok(rmp_serde::encode::write_named(&mut writer, value)?)
    }
}

/// An enum that represents any built-in codec
///
/// The [`Codec`] trait does not support dyn boxing, so this enum lets
/// a codec be picked at runtime, e.g. from configuration.
#[derive(Clone, Copy, Debug)]
pub enum DynCodec {
    /// MessagePack.
    Binary(BinaryCodec),
    /// JSON.
    Naive(NaiveCodec),
}

impl Default for DynCodec {
    fn default() -> Self {
        DynCodec::Binary(BinaryCodec {})
    }
}

impl Codec for DynCodec {
    fn decode_slice<'a, T>(&self, v: &'a [u8]) -> Result<T>
    where
        T: Deserialize<'a>,
    {
        match self {
            DynCodec::Binary(binary_codec) => binary_codec.decode_slice(v),
            DynCodec::Naive(naive_codec) => naive_codec.decode_slice(v),
        }
    }

    fn encode_to_vec<T>(&self, value: &T) -> Result<Vec<u8>>
    where
        T: ?Sized + Serialize,
    {
        match self {
            DynCodec::Binary(binary_codec) => binary_codec.encode_to_vec(value),
            DynCodec::Naive(naive_codec) => naive_codec.encode_to_vec(value),
        }
    }

    fn decode_reader<R, T>(&self, reader: R) -> Result<T>
    where
        R: Read,
        T: DeserializeOwned,
    {
        match self {
            DynCodec::Binary(binary_codec) => binary_codec.decode_reader(reader),
            DynCodec::Naive(naive_codec) => naive_codec.decode_reader(reader),
        }
    }

    fn encode_to_writer<W, T>(&self, writer: W, value: &T) -> Result<()>
    where
        W: Write,
        T: ?Sized + Serialize,
    {
        match self {
            DynCodec::Binary(binary_codec) => binary_codec.encode_to_writer(writer, value),
            DynCodec::Naive(naive_codec) => naive_codec.encode_to_writer(writer, value),
        }
    }
}

/// Whole-value serializer for any serde type, backed by a [`Codec`].
pub struct CodecSerializer<T, C: Codec> {
    codec: C,
    type_id: i32,
    _marker: PhantomData<fn() -> T>,
}

impl<T, C: Codec> CodecSerializer<T, C> {
    /// Serializer writing `T` with `codec` under `type_id`.
    pub const fn new(codec: C, type_id: i32) -> Self {
        Self {
            codec,
            type_id,
            _marker: PhantomData,
        }
    }
}

impl<T, C> ByteArraySerializer<T> for CodecSerializer<T, C>
where
    T: Serialize + DeserializeOwned,
    C: Codec,
{
    fn type_id(&self) -> i32 {
        self.type_id
    }

    fn write(&self, value: &T) -> Result<Vec<u8>> {
        self.codec.encode_to_vec(value)
    }

    fn read(&self, bytes: &[u8]) -> Result<T> {
        self.codec.decode_slice(bytes)
    }
}

impl<T, C: Codec> std::fmt::Debug for CodecSerializer<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecSerializer")
            .field("type", &type_name::<T>())
            .field("codec", &type_name::<C>())
            .field("type_id", &self.type_id)
            .finish()
    }
}

/// Streaming serializer for any serde type, backed by a [`Codec`].
///
/// Writes straight into the pooled output and reads straight from the
/// payload view.
pub struct CodecStreamSerializer<T, C: Codec> {
    codec: C,
    type_id: i32,
    _marker: PhantomData<fn() -> T>,
}

impl<T, C: Codec> CodecStreamSerializer<T, C> {
    /// Serializer writing `T` with `codec` under `type_id`.
    pub const fn new(codec: C, type_id: i32) -> Self {
        Self {
            codec,
            type_id,
            _marker: PhantomData,
        }
    }
}

impl<T, C> StreamSerializer<T> for CodecStreamSerializer<T, C>
where
    T: Serialize + DeserializeOwned,
    C: Codec,
{
    fn type_id(&self) -> i32 {
        self.type_id
    }

    fn write(&self, out: &mut ObjectDataOutput<'_>, value: &T) -> Result<()> {
        self.codec.encode_to_writer(out, value)
    }

    fn read(&self, input: &mut ObjectDataInput<'_>) -> Result<T> {
        self.codec.decode_reader(input)
    }
}

impl<T, C: Codec> std::fmt::Debug for CodecStreamSerializer<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecStreamSerializer")
            .field("type", &type_name::<T>())
            .field("codec", &type_name::<C>())
            .field("type_id", &self.type_id)
            .finish()
    }
}
