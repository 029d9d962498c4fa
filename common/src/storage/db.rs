use surrealdb::{
    engine::any::{connect, Any},
    opt::auth::Root,
    Error, Surreal,
};

use crate::utils::config::SurrealSettings;

/// Shared SurrealDB handle used by the external vector store.
#[derive(Clone)]
pub struct SurrealDbClient {
    pub client: Surreal<Any>,
}

impl SurrealDbClient {
    pub async fn new(settings: &SurrealSettings) -> Result<Self, Error> {
        let db = connect(settings.address.as_str()).await?;

        db.signin(Root {
            username: &settings.username,
            password: &settings.password,
        })
        .await?;

        db.use_ns(&settings.namespace)
            .use_db(&settings.database)
            .await?;

        Ok(SurrealDbClient { client: db })
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl SurrealDbClient {
    /// Create an in-memory SurrealDB client for testing.
    pub async fn memory(namespace: &str, database: &str) -> Result<Self, Error> {
        let db = connect("mem://").await?;

        db.use_ns(namespace).use_db(database).await?;

        Ok(SurrealDbClient { client: db })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_memory_client_answers_queries() {
        let namespace = "test_ns";
        let database = &Uuid::new_v4().to_string(); // ensures isolation per test run
        let db = SurrealDbClient::memory(namespace, database)
            .await
            .expect("Failed to start in-memory surrealdb");

        db.client
            .query("RETURN true")
            .await
            .expect("trivial query should succeed");
    }
}
