pub mod bridge;
pub mod config;
pub mod engine;
pub mod feed_list;
pub mod fetcher;
pub mod isolate;
pub mod local_gate;
pub mod logging;
pub mod normalizer;
pub mod parser;
pub mod publisher;
pub mod recency;
pub mod remote_gate;
pub mod renderer;
pub mod sanitizer;
pub mod sources;
pub mod traits;
pub mod types;

pub use bridge::RmapiBridge;
pub use config::PublisherConfig;
pub use engine::CommandEngine;
pub use fetcher::Fetcher;
pub use local_gate::{LocalGate, LocalStatus};
pub use normalizer::ContentNormalizer;
pub use parser::FeedParser;
pub use publisher::{Collaborators, FeedPublisher};
pub use recency::RecencyClassifier;
pub use remote_gate::RemoteGate;
pub use renderer::{DocumentRenderer, StyleSettings};
pub use sanitizer::HtmlSanitizer;
pub use sources::HttpFeedSource;
pub use traits::{DocumentEngine, FeedSource, RemoteBridge, Sanitizer};
pub use types::*;
