//! Remote image-search providers.
//!
//! One adapter per service, all implementing [`ImageProvider`] and all
//! sending their requests through a shared [`RateLimiter`].

mod http;
pub mod flickr;
pub mod pexels;
pub mod pixabay;
pub mod rate_limit;
pub mod registry;
pub mod traits;
pub mod unsplash;

pub use flickr::FlickrProvider;
pub use pexels::PexelsProvider;
pub use pixabay::PixabayProvider;
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use registry::{ProviderRegistry, ProviderSelection};
pub use traits::{ImageProvider, ImageQuery, ImageSize, Orientation, ProviderKind};
pub use unsplash::UnsplashProvider;
