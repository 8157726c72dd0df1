//! Front-matter schemas of the two content kinds and the projections built
//! from them for listings.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};

use crate::{naming::is_valid_slug, store::ContentKind};

/// Schema shared by everything stored as a markdown document.
pub trait Record: Serialize + DeserializeOwned + Send + 'static {
    const KIND: ContentKind;

    fn title(&self) -> &str;
    fn slug(&self) -> &str;
    fn category(&self) -> &str;
    fn date(&self) -> DateTime<Utc>;
    fn hero(&self) -> Option<&str>;

    /// Every image path referenced from the front matter.
    fn image_paths(&self) -> Vec<&str>;

    /// Drop every reference to `path`. Returns whether anything changed.
    fn forget_image(&mut self, path: &str) -> bool;

    fn validate(&self) -> Result<(), String> {
        validate_common(self)
    }

    fn summary(&self) -> Summary {
        Summary {
            title: self.title().to_string(),
            slug: self.slug().to_string(),
            hero_src: self.hero().map(str::to_string),
            category: self.category().to_string(),
            date: self.date(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Level {
    #[default]
    #[serde(rename = "Łatwy")]
    Easy,
    #[serde(rename = "Średni")]
    Medium,
    #[serde(rename = "Trudny")]
    Hard,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub title: String,
    pub slug: String,
    pub category: String,
    #[serde(default)]
    pub category_name: String,
    #[serde(default)]
    pub level: Level,
    #[serde(default, alias = "recomended")]
    pub recommended: bool,
    #[serde(deserialize_with = "deserialize_date")]
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub fat: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fiber: f64,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Step {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lines")]
    pub description: Vec<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl Record for Recipe {
    const KIND: ContentKind = ContentKind::Recipes;

    fn title(&self) -> &str {
        &self.title
    }

    fn slug(&self) -> &str {
        &self.slug
    }

    fn category(&self) -> &str {
        &self.category
    }

    fn date(&self) -> DateTime<Utc> {
        self.date
    }

    fn hero(&self) -> Option<&str> {
        self.image.as_deref()
    }

    fn image_paths(&self) -> Vec<&str> {
        self.image
            .iter()
            .chain(self.steps.iter().filter_map(|s| s.image.as_ref()))
            .map(String::as_str)
            .collect()
    }

    fn forget_image(&mut self, path: &str) -> bool {
        let mut changed = false;
        if self.image.as_deref() == Some(path) {
            self.image = None;
            changed = true;
        }
        for step in self.steps.iter_mut() {
            if step.image.as_deref() == Some(path) {
                step.image = None;
                changed = true;
            }
        }
        changed
    }

    fn validate(&self) -> Result<(), String> {
        let nutrition = [
            ("calories", self.calories),
            ("protein", self.protein),
            ("fat", self.fat),
            ("carbs", self.carbs),
            ("fiber", self.fiber),
        ];
        for (name, value) in nutrition {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{name} must be a non-negative number"));
            }
        }
        validate_common(self)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub title: String,
    pub slug: String,
    pub category: String,
    #[serde(default)]
    pub category_name: String,
    #[serde(deserialize_with = "deserialize_date")]
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub images: Vec<BlogImage>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BlogImage {
    pub src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl Record for BlogPost {
    const KIND: ContentKind = ContentKind::Blogs;

    fn title(&self) -> &str {
        &self.title
    }

    fn slug(&self) -> &str {
        &self.slug
    }

    fn category(&self) -> &str {
        &self.category
    }

    fn date(&self) -> DateTime<Utc> {
        self.date
    }

    fn hero(&self) -> Option<&str> {
        self.image.as_deref()
    }

    fn image_paths(&self) -> Vec<&str> {
        self.images
            .iter()
            .map(|i| i.src.as_str())
            .chain(self.image.as_deref())
            .collect()
    }

    fn forget_image(&mut self, path: &str) -> bool {
        let before = self.images.len();
        self.images.retain(|i| i.src != path);
        let mut changed = before != self.images.len();
        if self.image.as_deref() == Some(path) {
            self.image = None;
            changed = true;
        }
        changed
    }

    fn validate(&self) -> Result<(), String> {
        if let Some(hero) = &self.image {
            if !self.images.iter().any(|i| &i.src == hero) {
                return Err(format!("hero image {hero:?} is not one of the post images"));
            }
        }
        validate_common(self)
    }
}

/// Checks every kind shares: a title, valid slugs, and image paths confined
/// to the kind's image prefix.
fn validate_common<R: Record>(record: &R) -> Result<(), String> {
    if record.title().trim().is_empty() {
        return Err("title is empty".to_string());
    }
    if !is_valid_slug(record.slug()) {
        return Err(format!("invalid slug {:?}", record.slug()));
    }
    if !is_valid_slug(record.category()) {
        return Err(format!("invalid category {:?}", record.category()));
    }
    let prefix = R::KIND.image_prefix();
    for path in record.image_paths() {
        if !path.starts_with(&prefix) || path.split('/').any(|c| c == "..") {
            return Err(format!("image {path:?} is outside {prefix}"));
        }
    }
    Ok(())
}

/// Card shown in admin and public listings.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub title: String,
    pub slug: String,
    pub hero_src: Option<String>,
    pub category: String,
    pub date: DateTime<Utc>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RecommendedRecipe {
    pub title: String,
    pub slug: String,
    pub image: Option<String>,
}

impl From<&Recipe> for RecommendedRecipe {
    fn from(recipe: &Recipe) -> Self {
        Self {
            title: recipe.title.clone(),
            slug: recipe.slug.clone(),
            image: recipe.image.clone(),
        }
    }
}

/// Accepts RFC 3339 timestamps and plain `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn deserialize_date<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid date {raw:?}")))
}

/// Step descriptions are a list of lines; a single multi-line string is
/// split on newlines.
fn deserialize_lines<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Lines {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<Lines>::deserialize(deserializer)? {
        None => vec![],
        Some(Lines::Many(lines)) => lines,
        Some(Lines::One(text)) => text
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string)
            .collect(),
    })
}
