//! optex-state — the option store behind optex metrics.
//!
//! Backed by [redb](https://docs.rs/redb), provides durable string-keyed
//! options in two namespaces: per-site and network-wide. Each metric owns
//! exactly one option, holding either a single sample or a map of samples
//! keyed by canonical label string.
//!
//! # Architecture
//!
//! Values are JSON-serialized into redb's `&[u8]` value columns. Option names
//! follow `plugin:{slug}[:network]:{key}` so data written by earlier
//! deployments stays readable.
//!
//! Which namespace a process uses is decided once, when the store is opened,
//! and never changes afterwards. The `StateStore` is `Clone` + `Send` + `Sync`
//! (backed by `Arc<Database>`) and can be shared across threads and tasks.

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::{OptionStore, StateStore};
pub use types::*;
