pub mod fixture;
pub mod youtube;

pub use fixture::StaticCorpus;
pub use youtube::YouTubeProvider;
