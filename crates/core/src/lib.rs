//! Gainsy Core - Shared domain library.
//!
//! This crate provides the types used across all Gainsy components:
//! - `web` - Marketing site and seller dashboard
//! - `cli` - Command-line tools for backend checks and demo seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. Records mirror the hosted backend's tables closely enough to be
//! deserialized straight from its JSON responses.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, prices, and status enums
//! - [`entities`] - Store, product, template, and alert records
//! - [`listing`] - In-memory search, filtering, sorting, and pagination
//! - [`stats`] - Dashboard and analytics aggregation
//! - [`demo`] - Fixed demo records for fallback display and seeding

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod demo;
pub mod entities;
pub mod listing;
pub mod stats;
pub mod types;

pub use entities::*;
pub use listing::{ListQuery, Listable, Page, SortDirection};
pub use stats::{
    AnalyticsRange, DashboardStats, ProductPerformance, StorePerformance, top_products,
};
pub use types::*;
