//! Request-keyed caching for API results.
//!
//! This module provides the `QueryCache` that sits beside the gateway. Results
//! are held in memory under hierarchical `QueryKey`s and reused only while
//! younger than the caller's `CachePolicy`. The default policy treats every
//! result as stale, so each call goes to the network.
//!
//! Mutations invalidate by key prefix, e.g. every document list at once.
//!
//! Paginated queries accumulate [`Pages`] under one key with
//! `QueryCache::fetch_next_page`.

pub mod manager;
pub mod pages;

pub use manager::{CachePolicy, CachedData, QueryCache, QueryKey};
pub use pages::Pages;
