use std::fmt::Write;

use common::types::context::EnrichedContext;
use retrieval_pipeline::RetrievedChunk;

const SYSTEM_INSTRUCTION: &str = "\
You are an experienced site reliability engineer producing a troubleshooting \
checklist for an on-call operator. Prioritize safety: diagnostic commands \
before mutating ones, and call out anything destructive. Respond either with \
numbered lines of the form `Step N: <instruction>` or with a JSON object \
`{\"summary\": ..., \"steps\": [{\"order\", \"instruction\", \"rationale\", \
\"priority\", \"commands\"}]}`.";

const EMPTY_CHUNKS_SENTINEL: &str =
    "No runbook excerpts matched this alert. Fall back on general best practices.";

/// Assembles the generation prompt: fixed instruction, alert context block,
/// and the retrieved runbook excerpts.
pub fn build_prompt(context: &EnrichedContext, chunks: &[RetrievedChunk]) -> String {
    let alert = context.alert();
    let (display_name, shape) = match context.resource() {
        Some(resource) => (resource.display_name.as_str(), resource.shape.as_str()),
        None => ("N/A", "N/A"),
    };

    let mut prompt = String::new();
    prompt.push_str(SYSTEM_INSTRUCTION);
    prompt.push_str("\n\n== Alert Context ==\n");
    let _ = writeln!(prompt, "Title: {}", alert.title());
    let _ = writeln!(prompt, "Severity: {}", alert.severity());
    let _ = writeln!(prompt, "Message: {}", alert.message());
    let _ = writeln!(prompt, "Resource: {display_name} ({shape})");

    prompt.push_str("\n== Runbook Excerpts ==\n");
    if chunks.is_empty() {
        prompt.push_str(EMPTY_CHUNKS_SENTINEL);
        prompt.push('\n');
    } else {
        for retrieved in chunks {
            let chunk = &retrieved.chunk;
            let _ = writeln!(
                prompt,
                "[{} § {}]\n{}\n",
                chunk.runbook_path(),
                chunk.section_title(),
                chunk.content()
            );
        }
    }

    prompt
}
