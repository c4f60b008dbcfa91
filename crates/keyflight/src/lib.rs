//! A single-flight, TTL-caching resolver for expensive keyed lookups.
//!
//! [`Resolver`] wraps a caller-supplied [`Lookup`] (typically a network call
//! translating a user-visible name into a stable identifier) with:
//!
//! - a positive cache for successful results,
//! - a negative cache for keys confirmed to not exist,
//! - deduplication of concurrent lookups for the same key, so that a burst of
//!   callers on a cache miss reaches the upstream exactly once.
//!
//! Both caches expire lazily on read with independent time-to-lives; see
//! [`ResolverConfig`]. The per-key exclusion used for deduplication is
//! pluggable through [`KeyLock`], with [`StripedLock`] (bounded memory) as
//! the default and [`KeyedLock`] (no false contention) as the alternative.
//! A [`blocking`] module offers the same semantics to threaded callers that
//! do not run an async runtime.
//!
//! ```
//! use keyflight::{Resolver, ResolverConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let resolver = Resolver::new(
//!     |name: &str| {
//!         let found = (name == "alice").then(|| "id-42".to_owned());
//!         async move { Ok::<_, std::io::Error>(found) }
//!     },
//!     ResolverConfig::default(),
//! );
//!
//! assert_eq!(resolver.resolve("alice").await.unwrap(), "id-42");
//! assert!(resolver.resolve("ghost").await.unwrap_err().is_not_found());
//! # }
//! ```

#![warn(missing_docs)]

pub mod blocking;
mod config;
mod error;
mod flight;
mod resolver;
mod store;

pub use config::ResolverConfig;
pub use error::ResolveError;
pub use flight::{KeyLock, KeyedLock, StripedLock};
pub use resolver::{Lookup, Resolver};
