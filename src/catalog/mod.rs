//! Feed and podcast catalog.
//!
//! - [`types`] holds the persisted entities (`Feed`, `Item`, `Podcast`, `Episode`)
//! - [`store`] holds the [`Catalog`] and its create/read/update/delete operations
//! - [`persist`] loads and atomically saves the catalog as JSON
//!
//! The catalog has no durability of its own. Every mutating command is
//! expected to be followed by [`save`] before the next reader can rely on it.

mod persist;
mod store;
mod types;

pub use persist::{load, save, PersistError};
pub use store::Catalog;
pub use types::{CatalogError, Episode, Feed, Item, NewFeed, NewItem, NewPodcast, Podcast};
