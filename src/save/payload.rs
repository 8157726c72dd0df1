use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{ImageResolver, Payload};
use crate::{
    error::{Error, Result},
    frontmatter::Document,
    images::ImageRef,
    metadata::{parse_date, BlogImage, BlogPost, Level, Recipe, Step},
    store::Location,
};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RecipePayload {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    /// Human category name; slugified on save.
    pub category: String,
    #[serde(default)]
    pub level: Level,
    #[serde(default, alias = "recomended")]
    pub recommended: bool,
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
    pub image: ImageRef,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub steps: Vec<StepPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_category: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct StepPayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Vec<String>,
    #[serde(default)]
    pub image: ImageRef,
}

impl Payload for RecipePayload {
    type Record = Recipe;

    fn title(&self) -> &str {
        &self.title
    }

    fn slug(&self) -> Option<&str> {
        self.slug.as_deref()
    }

    fn category_name(&self) -> &str {
        &self.category
    }

    fn previous(&self) -> (Option<&str>, Option<&str>) {
        (self.original_slug.as_deref(), self.original_category.as_deref())
    }

    fn set_previous(&mut self, slug: Option<String>, category: Option<String>) {
        self.original_slug = slug;
        self.original_category = category;
    }

    fn image_refs(&self) -> Vec<&ImageRef> {
        std::iter::once(&self.image)
            .chain(self.steps.iter().map(|s| &s.image))
            .collect()
    }

    fn into_document(
        self,
        target: &Location,
        images: &ImageResolver,
        previous: Option<&Document<Recipe>>,
    ) -> Result<Document<Recipe>> {
        let steps = self
            .steps
            .iter()
            .map(|step| {
                Ok(Step {
                    title: step
                        .title
                        .as_deref()
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(str::to_string),
                    description: non_blank(&step.description),
                    image: images.resolve(&step.image)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let header = Recipe {
            title: self.title.trim().to_string(),
            slug: target.slug.clone(),
            category: target.category.clone(),
            category_name: self.category.trim().to_string(),
            level: self.level,
            recommended: self.recommended,
            date: Utc::now(),
            calories: self.calories,
            protein: self.protein,
            fat: self.fat,
            carbs: self.carbs,
            fiber: self.fiber,
            time: self.time.trim().to_string(),
            image: images.resolve(&self.image)?,
            description: self.description,
            ingredients: non_blank(&self.ingredients),
            steps,
        };

        Ok(Document {
            header,
            body: previous.map(|doc| doc.body.clone()).unwrap_or_default(),
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BlogPayload {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    pub category: String,
    /// RFC 3339 or `YYYY-MM-DD`. Defaults to the previous date, then now.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default)]
    pub paragraphs: Vec<String>,
    #[serde(default)]
    pub images: Vec<BlogImagePayload>,
    /// Index into `images` of the hero image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hero: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_category: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct BlogImagePayload {
    pub image: ImageRef,
}

impl Payload for BlogPayload {
    type Record = BlogPost;

    fn title(&self) -> &str {
        &self.title
    }

    fn slug(&self) -> Option<&str> {
        self.slug.as_deref()
    }

    fn category_name(&self) -> &str {
        &self.category
    }

    fn previous(&self) -> (Option<&str>, Option<&str>) {
        (self.original_slug.as_deref(), self.original_category.as_deref())
    }

    fn set_previous(&mut self, slug: Option<String>, category: Option<String>) {
        self.original_slug = slug;
        self.original_category = category;
    }

    fn image_refs(&self) -> Vec<&ImageRef> {
        self.images.iter().map(|i| &i.image).collect()
    }

    fn check(&self) -> Result<()> {
        let Some(i) = self.hero else {
            return Ok(());
        };
        match self.images.get(i) {
            Some(entry) if entry.image != ImageRef::Empty => Ok(()),
            _ => Err(Error::bad_request(format!("Hero index {i} does not point at an image"))),
        }
    }

    fn into_document(
        self,
        target: &Location,
        images: &ImageResolver,
        previous: Option<&Document<BlogPost>>,
    ) -> Result<Document<BlogPost>> {
        let date = match self.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            Some(raw) => {
                parse_date(raw).ok_or_else(|| Error::bad_request(format!("Invalid date {raw:?}")))?
            }
            None => previous.map_or_else(Utc::now, |doc| doc.header.date),
        };

        let mut stored = vec![];
        let mut hero = None;
        for (i, entry) in self.images.iter().enumerate() {
            let Some(src) = images.resolve(&entry.image)? else {
                continue;
            };
            let (width, height) = match images.dimensions(&entry.image) {
                Some((w, h)) => (Some(w), Some(h)),
                None => previous_dimensions(previous, images, &src),
            };
            if self.hero == Some(i) {
                hero = Some(src.clone());
            }
            stored.push(BlogImage { src, width, height });
        }

        let body = non_blank(&self.paragraphs).join("\n\n");

        Ok(Document {
            header: BlogPost {
                title: self.title.trim().to_string(),
                slug: target.slug.clone(),
                category: target.category.clone(),
                category_name: self.category.trim().to_string(),
                date,
                images: stored,
                image: hero,
            },
            body: if body.is_empty() { body } else { format!("{body}\n") },
        })
    }
}

/// Width/height recorded for `src` by the previous version of the post.
fn previous_dimensions(
    previous: Option<&Document<BlogPost>>,
    images: &ImageResolver,
    src: &str,
) -> (Option<u32>, Option<u32>) {
    previous
        .and_then(|doc| {
            doc.header
                .images
                .iter()
                .find(|img| images.rebase(&img.src) == src)
        })
        .map_or((None, None), |img| (img.width, img.height))
}

fn non_blank(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .cloned()
        .collect()
}
