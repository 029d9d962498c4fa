pub mod enrichment;
pub mod generator;
pub mod parser;
pub mod pipeline;
pub mod prompt;

pub use enrichment::EnrichmentService;
pub use generator::ChecklistGenerator;
pub use pipeline::{AlertPipeline, DefaultPipelineServices, PipelineServices};
