//! Collaborator clients
//!
//! One module per external service. Flow code depends on the traits
//! ([`BackendApi`], [`FerService`], [`RecommendationService`],
//! [`MusicService`]) so tests can swap in fakes.

pub mod api_client;
pub mod fer_client;
pub mod health;
pub mod http;
pub mod music_client;
pub mod rag_client;

pub use api_client::{ApiClient, BackendApi};
pub use fer_client::{FerClient, FerResponse, FerService};
pub use health::{HealthReport, ServiceHealth};
pub use music_client::{MusicClient, MusicService};
pub use rag_client::{PlaylistSuggestion, RagClient, RecommendationService, SearchResult};
