//! Hosted per-user document collections.
//!
//! Documents are JSON bodies keyed by `(user, collection, id)` and always
//! read or written whole. The only query is "every document in one of a
//! user's collections".

#[cfg(test)]
use std::collections::{BTreeMap, HashMap};
#[cfg(test)]
use std::sync::RwLock;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Favorites,
    WeeklyPlans,
    Meta,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Favorites => "favorites",
            Collection::WeeklyPlans => "weekly_plans",
            Collection::Meta => "meta",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub body: Value,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list(&self, user_id: Uuid, collection: Collection) -> anyhow::Result<Vec<Document>>;
    async fn get(&self, user_id: Uuid, collection: Collection, id: &str) -> anyhow::Result<Option<Value>>;
    /// Creates or fully replaces the document.
    async fn put(&self, user_id: Uuid, collection: Collection, id: &str, body: Value) -> anyhow::Result<()>;
    async fn delete(&self, user_id: Uuid, collection: Collection, id: &str) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgDocumentStore {
    db: PgPool,
}

impl PgDocumentStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn list(&self, user_id: Uuid, collection: Collection) -> anyhow::Result<Vec<Document>> {
        let rows = sqlx::query_as::<_, (String, Value)>(
            r#"
            SELECT doc_id, body
              FROM user_documents
             WHERE user_id = $1 AND collection = $2
             ORDER BY updated_at DESC
            "#,
        )
        .bind(user_id)
        .bind(collection.as_str())
        .fetch_all(&self.db)
        .await
        .with_context(|| format!("list {}", collection.as_str()))?;

        Ok(rows
            .into_iter()
            .map(|(id, body)| Document { id, body })
            .collect())
    }

    async fn get(&self, user_id: Uuid, collection: Collection, id: &str) -> anyhow::Result<Option<Value>> {
        let row = sqlx::query_as::<_, (Value,)>(
            r#"
            SELECT body
              FROM user_documents
             WHERE user_id = $1 AND collection = $2 AND doc_id = $3
            "#,
        )
        .bind(user_id)
        .bind(collection.as_str())
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .with_context(|| format!("get {}/{}", collection.as_str(), id))?;

        Ok(row.map(|(body,)| body))
    }

    async fn put(&self, user_id: Uuid, collection: Collection, id: &str, body: Value) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_documents (user_id, collection, doc_id, body)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, collection, doc_id)
            DO UPDATE SET body = EXCLUDED.body, updated_at = now()
            "#,
        )
        .bind(user_id)
        .bind(collection.as_str())
        .bind(id)
        .bind(body)
        .execute(&self.db)
        .await
        .with_context(|| format!("put {}/{}", collection.as_str(), id))?;

        Ok(())
    }

    async fn delete(&self, user_id: Uuid, collection: Collection, id: &str) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            DELETE FROM user_documents
             WHERE user_id = $1 AND collection = $2 AND doc_id = $3
            "#,
        )
        .bind(user_id)
        .bind(collection.as_str())
        .bind(id)
        .execute(&self.db)
        .await
        .with_context(|| format!("delete {}/{}", collection.as_str(), id))?;

        Ok(res.rows_affected() > 0)
    }
}

/// Process-local store with the same semantics.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryDocumentStore {
    docs: RwLock<HashMap<(Uuid, Collection), BTreeMap<String, Value>>>,
}

#[cfg(test)]
impl MemoryDocumentStore {
    pub fn len(&self, user_id: Uuid, collection: Collection) -> usize {
        self.docs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(user_id, collection))
            .map_or(0, BTreeMap::len)
    }
}

#[cfg(test)]
#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn list(&self, user_id: Uuid, collection: Collection) -> anyhow::Result<Vec<Document>> {
        let docs = self.docs.read().unwrap_or_else(|e| e.into_inner());
        Ok(docs
            .get(&(user_id, collection))
            .map(|m| {
                m.iter()
                    .map(|(id, body)| Document { id: id.clone(), body: body.clone() })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get(&self, user_id: Uuid, collection: Collection, id: &str) -> anyhow::Result<Option<Value>> {
        let docs = self.docs.read().unwrap_or_else(|e| e.into_inner());
        Ok(docs.get(&(user_id, collection)).and_then(|m| m.get(id).cloned()))
    }

    async fn put(&self, user_id: Uuid, collection: Collection, id: &str, body: Value) -> anyhow::Result<()> {
        let mut docs = self.docs.write().unwrap_or_else(|e| e.into_inner());
        docs.entry((user_id, collection))
            .or_default()
            .insert(id.to_string(), body);
        Ok(())
    }

    async fn delete(&self, user_id: Uuid, collection: Collection, id: &str) -> anyhow::Result<bool> {
        let mut docs = self.docs.write().unwrap_or_else(|e| e.into_inner());
        Ok(docs
            .get_mut(&(user_id, collection))
            .map_or(false, |m| m.remove(id).is_some()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn memory_store_is_scoped_per_user_and_collection() {
        let store = MemoryDocumentStore::default();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        store.put(alice, Collection::Favorites, "1", json!({ "id": "1" })).await.unwrap();
        store.put(alice, Collection::Favorites, "1", json!({ "id": "1", "name": "v2" })).await.unwrap();
        store.put(alice, Collection::WeeklyPlans, "1", json!({})).await.unwrap();

        assert_eq!(store.len(alice, Collection::Favorites), 1);
        assert_eq!(
            store.get(alice, Collection::Favorites, "1").await.unwrap().unwrap()["name"],
            "v2"
        );
        assert!(store.list(bob, Collection::Favorites).await.unwrap().is_empty());

        assert!(store.delete(alice, Collection::Favorites, "1").await.unwrap());
        assert!(!store.delete(alice, Collection::Favorites, "1").await.unwrap());
        assert_eq!(store.len(alice, Collection::WeeklyPlans), 1);
    }
}
