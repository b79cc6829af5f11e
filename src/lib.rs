#![warn(clippy::pedantic, missing_docs)]
#![allow(clippy::doc_markdown)]
#![doc = include_str!("../README.md")]

//! ## Modules
//! - [`service`]: [`SerializationService`], the `to_data`/`to_object` façade
//! - [`serializer`]: the plugin contract, in whole-value and streaming shapes
//! - [`registry`]: type and type-id lookup
//! - [`pool`]: output buffers reused by streaming serializers
//! - [`data`]: the [`Data`] wire layout and its header codec
//! - [`codecs`]: JSON and MessagePack codecs plus serializers built on them
//! - [`io`]: readers and writers handed to streaming serializers
//! - [`config`]: construction-time configuration
//! - [`error`]: [`SerializationError`]

pub mod codecs;
pub mod config;
pub mod data;
pub mod error;
pub mod io;
pub mod pool;
pub mod registry;
pub mod serializer;
pub mod service;

pub use data::Data;
pub use error::{Result, SerializationError};
pub use service::SerializationService;
