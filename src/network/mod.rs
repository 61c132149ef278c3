pub mod client;
pub mod errors;

pub use client::{ByteStream, HttpFetcher, OfflineFetcher, Page, PageFetcher};
pub use errors::NetworkError;
