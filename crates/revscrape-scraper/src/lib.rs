pub mod client;
pub mod collector;
pub mod error;
pub mod poll;
pub(crate) mod rate_limit;
pub mod sources;

pub use client::{HttpClient, HttpConfig};
pub use collector::{collect, CollectOptions, Page, PageFetcher};
pub use error::ScraperError;
pub use poll::{PollOutcome, PollPolicy};
pub use sources::{
    DataForSeoFetcher, GoogleFetcher, PlacesFetcher, SerpApiFetcher, TrustpilotCard,
    TrustpilotFetcher,
};
