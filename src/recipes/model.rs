use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Upstream records carry at most twenty ingredient/measure column pairs.
pub const MAX_INGREDIENTS: usize = 20;

/// Normalized recipe, the shape stored in favorites and plan slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredRecipe")]
pub struct Recipe {
    pub id: String,
    pub name: String,
    pub image: Option<String>,
    pub category: Option<String>,
    pub area: Option<String>,
    pub ingredients: Vec<IngredientLine>,
    pub instructions: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientLine {
    pub ingredient: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub measure: String,
}

/// Recipe as found in storage. Older clients saved the upstream record under
/// `raw` and never wrote `ingredients`.
#[derive(Deserialize)]
struct StoredRecipe {
    id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    name: String,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    area: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    ingredients: Vec<IngredientLine>,
    #[serde(default)]
    instructions: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    tags: Vec<String>,
    #[serde(default)]
    raw: Option<Map<String, Value>>,
}

impl From<StoredRecipe> for Recipe {
    fn from(s: StoredRecipe) -> Self {
        let ingredients = match (s.ingredients.is_empty(), &s.raw) {
            (true, Some(raw)) => parse_ingredients(raw),
            _ => s.ingredients,
        };
        Self {
            id: s.id,
            name: s.name,
            image: non_empty(s.image),
            category: non_empty(s.category),
            area: non_empty(s.area),
            ingredients,
            instructions: non_empty(s.instructions),
            tags: s.tags,
        }
    }
}

fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

fn text<'a>(meal: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    meal.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Collects the non-blank `strIngredientN` / `strMeasureN` pairs of an
/// upstream record, in column order.
pub fn parse_ingredients(meal: &Map<String, Value>) -> Vec<IngredientLine> {
    (1..=MAX_INGREDIENTS)
        .filter_map(|i| {
            let ingredient = text(meal, &format!("strIngredient{i}"))?;
            let measure = text(meal, &format!("strMeasure{i}")).unwrap_or_default();
            Some(IngredientLine {
                ingredient: ingredient.to_string(),
                measure: measure.to_string(),
            })
        })
        .collect()
}

impl Recipe {
    /// Normalizes an upstream meal record. Records without `idMeal` are dropped.
    pub fn from_mealdb(meal: &Map<String, Value>) -> Option<Self> {
        let id = text(meal, "idMeal")?.to_string();
        let tags = text(meal, "strTags")
            .map(|t| {
                t.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            id,
            name: text(meal, "strMeal").unwrap_or_default().to_string(),
            image: text(meal, "strMealThumb").map(String::from),
            category: text(meal, "strCategory").map(String::from),
            area: text(meal, "strArea").map(String::from),
            ingredients: parse_ingredients(meal),
            instructions: text(meal, "strInstructions").map(String::from),
            tags,
        })
    }
}
