//! Query sync: application state mirrored into a URL query string.
//!
//! A session keeps a flat state object (strings, numbers, arrays of
//! scalars) and the location's query string consistent in both
//! directions:
//!
//! - on start-up the state is reconciled from the URL against the
//!   defaults, which also fix the key set (the schema);
//! - every `set_state` stores the new state, notifies, and writes it back
//!   over the existing query, keeping foreign parameters;
//! - back/forward navigation recomputes the state from the URL without
//!   writing anything.
//!
//! # Components
//!
//! - [`codec`]: query text <-> [`QueryMap`], pluggable via [`QueryCodec`]
//! - [`coerce`]: schema-directed string -> number coercion
//! - [`reconcile`]: defaults + URL values, closed over the schema keys
//! - [`location`]: the only reader/writer of the environment location
//! - [`sync`]: the session ([`QuerySync`]) tying it all together
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use openerp_query_sync::{MemoryLocation, QuerySync, SyncOptions, query_map};
//!
//! let location = Arc::new(MemoryLocation::new("https://app.test/list?page=2&ref=abc"));
//! let sync = QuerySync::init(query_map! { "page" => 1, "q" => "" }, location.clone(), SyncOptions::default());
//!
//! sync.set_state(query_map! { "page" => 3, "q" => "hello" });
//! // https://app.test/list?page=3&ref=abc&q=hello
//! ```

pub mod codec;
pub mod coerce;
pub mod error;
pub mod location;
pub mod options;
pub mod reconcile;
pub mod schema;
pub mod sync;
pub mod value;

// Re-export primary types at crate root.
pub use codec::{QueryCodec, StandardCodec};
pub use error::SyncError;
pub use location::{
    ListenerId, Location, LocationGateway, MemoryLocation, NavigationHandler,
    NavigationSubscription, NoLocation,
};
pub use options::{HistoryMode, PathnameHandler, SyncOptions, ValueChangeHandler};
pub use reconcile::reconcile;
pub use schema::{Schema, ValueKind};
pub use sync::{QuerySync, StateHandle, StateObserver, StateUpdate};
pub use value::{QueryMap, QueryValue, State, SubscriptionId};
