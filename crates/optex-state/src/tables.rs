//! redb table definitions for the option store.
//!
//! Both tables use `&str` option names and `&[u8]` JSON values. Which table a
//! store reads and writes is fixed by its [`Scope`](crate::Scope).

use redb::TableDefinition;

/// Per-site options, keyed by `plugin:{slug}:{key}`.
pub const SITE_OPTIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("site_options");

/// Network-wide options, keyed by `plugin:{slug}:network:{key}`.
pub const NETWORK_OPTIONS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("network_options");
