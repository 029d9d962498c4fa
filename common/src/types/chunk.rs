use serde::{Deserialize, Serialize};

/// One retrievable unit of runbook text, as stored in the vector index.
///
/// The embedding and the metadata lists are fixed at construction; accessors
/// expose borrowed views so stored chunks cannot drift from what was indexed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunbookChunk {
    id: String,
    runbook_path: String,
    section_title: String,
    content: String,
    tags: Vec<String>,
    applicable_shapes: Vec<String>,
    embedding: Vec<f32>,
}

impl RunbookChunk {
    pub fn new(
        id: String,
        runbook_path: String,
        section_title: String,
        content: String,
        tags: Vec<String>,
        applicable_shapes: Vec<String>,
        embedding: &[f32],
    ) -> Self {
        Self {
            id,
            runbook_path,
            section_title,
            content,
            tags,
            applicable_shapes,
            embedding: embedding.to_vec(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn runbook_path(&self) -> &str {
        &self.runbook_path
    }

    pub fn section_title(&self) -> &str {
        &self.section_title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn applicable_shapes(&self) -> &[String] {
        &self.applicable_shapes
    }

    pub fn embedding(&self) -> &[f32] {
        &self.embedding
    }

    pub fn embedding_len(&self) -> usize {
        self.embedding.len()
    }
}

/// A chunk paired with its cosine similarity against a query embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredChunk {
    pub chunk: RunbookChunk,
    pub similarity_score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_is_copied_on_construction() {
        let mut source = vec![0.1_f32, 0.2, 0.3];
        let chunk = RunbookChunk::new(
            "c1".into(),
            "runbooks/memory.md".into(),
            "Introduction".into(),
            "check memory".into(),
            vec!["memory".into()],
            vec!["VM.*".into()],
            &source,
        );

        source[0] = 99.0;
        assert_eq!(chunk.embedding(), &[0.1, 0.2, 0.3]);
        assert_eq!(chunk.embedding_len(), 3);
    }

    #[test]
    fn test_chunk_serde_round_trip() {
        let chunk = RunbookChunk::new(
            "c1".into(),
            "runbooks/memory.md".into(),
            "Symptoms".into(),
            "free -h".into(),
            vec!["memory".into(), "linux".into()],
            vec!["*".into()],
            &[1.0, 0.0],
        );
        let json = serde_json::to_string(&chunk).expect("serialize chunk");
        assert!(json.contains("runbookPath"));
        let back: RunbookChunk = serde_json::from_str(&json).expect("deserialize chunk");
        assert_eq!(back, chunk);
    }
}
