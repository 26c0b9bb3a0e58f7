//! # holiday-lens
//!
//! An async HTTP service answering questions about public holidays, backed by
//! the [Nager.Date](https://date.nager.at) API and a bounded LRU cache that
//! fetches each (year, country) pair at most once at a time.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use holiday_lens::provider::nager::DEFAULT_BASE_URL;
//! use holiday_lens::{CachedHolidayProvider, HolidayService, NagerProvider, Server, api};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let upstream = NagerProvider::new(DEFAULT_BASE_URL, Duration::from_secs(10))?;
//!     let service = Arc::new(HolidayService::new(CachedHolidayProvider::new(upstream)));
//!
//!     let server = Server::bind("127.0.0.1:8080").await?;
//!     server
//!         .serve(api::routes(service), async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await?;
//!     Ok(())
//! }
//! ```

// ── Domain ────────────────────────────────────────────────────────────────────
pub mod cache;
pub mod model;
pub mod provider;
pub mod service;

// ── HTTP surface ──────────────────────────────────────────────────────────────
pub mod api;
pub mod context;
pub mod http;
pub mod router;
pub mod server;

pub mod config;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use cache::{CacheKey, CachedHolidayProvider};
pub use config::{Config, ConfigError};
pub use http::{Headers, Method, Request, Response, StatusCode};
pub use model::{CountryHolidayCount, PublicHoliday, SharedHoliday};
pub use provider::{HolidayProvider, Holidays, NagerProvider, ProviderError};
pub use router::Router;
pub use server::{Server, ServerError};
pub use service::HolidayService;
