// Remote photo-library API: the `PhotosApi` trait, the production reqwest
// client, and the normalized `ApiError` every remote failure is reduced to.

mod client;
pub mod mock;

pub use client::{AlbumPage, ApiError, PhotosApi, PhotosClient, SearchPage};
