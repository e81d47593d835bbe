use anyhow::Context;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::model::Recipe;

/// Read-only access to the upstream recipe catalogue.
#[async_trait]
pub trait RecipeSource: Send + Sync {
    async fn random(&self) -> anyhow::Result<Option<Recipe>>;
    async fn lookup(&self, id: &str) -> anyhow::Result<Option<Recipe>>;
    async fn categories(&self) -> anyhow::Result<Vec<String>>;
    async fn filter_by_category(&self, category: &str) -> anyhow::Result<Vec<Recipe>>;
    async fn filter_by_ingredient(&self, ingredient: &str) -> anyhow::Result<Vec<Recipe>>;
    async fn search(&self, query: &str) -> anyhow::Result<Vec<Recipe>>;
}

/// Every endpoint wraps its payload as `{"meals": [...]}`, with `null` for no hits.
#[derive(Debug, Deserialize)]
struct MealsEnvelope<T> {
    meals: Option<Vec<T>>,
}

#[derive(Debug, Deserialize)]
struct CategoryItem {
    #[serde(rename = "strCategory")]
    str_category: String,
}

#[derive(Clone)]
pub struct MealDbClient {
    client: reqwest::Client,
    base_url: String,
}

impl MealDbClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("boxbite/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> anyhow::Result<Vec<T>> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let resp = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("GET {}", endpoint))?
            .error_for_status()
            .with_context(|| format!("GET {}", endpoint))?;
        let body: MealsEnvelope<T> = resp
            .json()
            .await
            .with_context(|| format!("decode {}", endpoint))?;
        let items = body.meals.unwrap_or_default();
        debug!(endpoint, ?query, count = items.len(), "upstream response");
        Ok(items)
    }

    async fn meals(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> anyhow::Result<Vec<Recipe>> {
        let raw = self.fetch::<Map<String, Value>>(endpoint, query).await?;
        Ok(raw.iter().filter_map(Recipe::from_mealdb).collect())
    }
}

#[async_trait]
impl RecipeSource for MealDbClient {
    async fn random(&self) -> anyhow::Result<Option<Recipe>> {
        Ok(self.meals("random.php", &[]).await?.into_iter().next())
    }

    async fn lookup(&self, id: &str) -> anyhow::Result<Option<Recipe>> {
        Ok(self.meals("lookup.php", &[("i", id)]).await?.into_iter().next())
    }

    async fn categories(&self) -> anyhow::Result<Vec<String>> {
        let items = self
            .fetch::<CategoryItem>("list.php", &[("c", "list")])
            .await?;
        Ok(items.into_iter().map(|c| c.str_category).collect())
    }

    async fn filter_by_category(&self, category: &str) -> anyhow::Result<Vec<Recipe>> {
        let mut recipes = self.meals("filter.php", &[("c", category)]).await?;
        for r in &mut recipes {
            r.category = Some(category.to_string());
        }
        Ok(recipes)
    }

    async fn filter_by_ingredient(&self, ingredient: &str) -> anyhow::Result<Vec<Recipe>> {
        self.meals("filter.php", &[("i", ingredient)]).await
    }

    async fn search(&self, query: &str) -> anyhow::Result<Vec<Recipe>> {
        self.meals("search.php", &[("s", query)]).await
    }
}
