use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::client::RecipeSource;
use super::model::Recipe;

pub fn recipe(id: &str) -> Recipe {
    Recipe {
        id: id.to_string(),
        name: format!("Recipe {id}"),
        image: Some(format!("https://img.test/{id}.jpg")),
        category: None,
        area: None,
        ingredients: Vec::new(),
        instructions: None,
        tags: Vec::new(),
    }
}

/// Canned upstream. Keys listed in `failing` make the matching call error,
/// `"random"` fails random picks and `"lookup"` fails lookups.
#[derive(Default)]
pub struct FakeSource {
    categories: HashMap<String, Vec<Recipe>>,
    ingredients: HashMap<String, Vec<Recipe>>,
    random: Vec<Recipe>,
    details: HashMap<String, Recipe>,
    failing: HashSet<String>,
    calls: AtomicUsize,
}

impl FakeSource {
    pub fn with_category(mut self, name: &str, recipes: Vec<Recipe>) -> Self {
        self.categories.insert(name.to_lowercase(), recipes);
        self
    }

    pub fn with_ingredient(mut self, name: &str, recipes: Vec<Recipe>) -> Self {
        self.ingredients.insert(name.to_lowercase(), recipes);
        self
    }

    pub fn with_random(mut self, recipes: Vec<Recipe>) -> Self {
        self.random = recipes;
        self
    }

    pub fn with_details(mut self, r: Recipe) -> Self {
        self.details.insert(r.id.clone(), r);
        self
    }

    pub fn failing(mut self, key: &str) -> Self {
        self.failing.insert(key.to_lowercase());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self, key: &str) -> anyhow::Result<usize> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&key.to_lowercase()) {
            anyhow::bail!("upstream unavailable: {key}");
        }
        Ok(n)
    }
}

#[async_trait]
impl RecipeSource for FakeSource {
    async fn random(&self) -> anyhow::Result<Option<Recipe>> {
        let n = self.hit("random")?;
        if self.random.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.random[n % self.random.len()].clone()))
    }

    async fn lookup(&self, id: &str) -> anyhow::Result<Option<Recipe>> {
        self.hit("lookup")?;
        Ok(self.details.get(id).cloned())
    }

    async fn categories(&self) -> anyhow::Result<Vec<String>> {
        self.hit("categories")?;
        let mut names: Vec<String> = self.categories.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn filter_by_category(&self, category: &str) -> anyhow::Result<Vec<Recipe>> {
        self.hit(category)?;
        let mut out = self
            .categories
            .get(&category.to_lowercase())
            .cloned()
            .unwrap_or_default();
        for r in &mut out {
            r.category = Some(category.to_string());
        }
        Ok(out)
    }

    async fn filter_by_ingredient(&self, ingredient: &str) -> anyhow::Result<Vec<Recipe>> {
        self.hit(ingredient)?;
        Ok(self
            .ingredients
            .get(&ingredient.to_lowercase())
            .cloned()
            .unwrap_or_default())
    }

    async fn search(&self, query: &str) -> anyhow::Result<Vec<Recipe>> {
        self.hit("search")?;
        let q = query.to_lowercase();
        Ok(self
            .details
            .values()
            .filter(|r| r.name.to_lowercase().contains(&q))
            .cloned()
            .collect())
    }
}
