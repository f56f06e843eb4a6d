//! Vexillum - banner image resolution for note-taking apps
//!
//! A document's frontmatter names a banner: a URL, an image in the vault, a
//! wiki-link to one, or search keywords. This crate turns that value into
//! something a renderer can show, caches the result per document and view,
//! and coordinates the many overlapping update triggers a host editor fires
//! (file opened, frontmatter edited, pane resized, shuffle timer).
//!
//! # Example
//!
//! ```rust,no_run
//! use vexillum::{BannerRequest, UpdateMode, Vexillum};
//!
//! #[tokio::main]
//! async fn main() -> vexillum::Result<()> {
//!     let engine = Vexillum::builder()
//!         .fs_vault("/home/me/notes")
//!         .unsplash("your-access-key")
//!         .build()?;
//!
//!     let request = BannerRequest::new("Trips/Iceland.md", "pane-1", "glacier, fjord".into())
//!         .mode(UpdateMode::EnsureVisibility);
//!
//!     if let Some(image) = engine.resolve_banner(&request).await? {
//!         println!("{image}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod input;
pub mod pipeline;
pub mod providers;
pub mod telemetry;
pub mod vault;
pub mod version;

// Re-export main types at crate root
pub use cache::{BannerCache, CacheConfig, CacheEntry, EntryKind, LocalImageCache, make_key};
pub use config::{BannerConfig, ProvidersConfig};
pub use engine::{
    BannerEngine, BannerRequest, CoordinatorConfig, ResolutionState, UpdateMode, Vexillum,
    VexillumBuilder, ViewOutcome,
};
pub use error::{Result, VexillumError};
pub use input::{InputDescriptor, InputKind, classify};
pub use pipeline::{ResolutionPipeline, SearchConfig};
pub use providers::{
    FlickrProvider, ImageProvider, ImageQuery, ImageSize, Orientation, PexelsProvider,
    PixabayProvider, ProviderKind, ProviderRegistry, ProviderSelection, RateLimitConfig,
    RateLimiter, UnsplashProvider,
};
pub use vault::{FsVault, Vault, VaultFile};
