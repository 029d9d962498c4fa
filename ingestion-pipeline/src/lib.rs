pub mod chunker;
pub mod service;

pub use chunker::{chunk_runbook, ChunkerConfig, ParsedChunk};
pub use service::{DocumentError, IngestionReport, IngestionService};
