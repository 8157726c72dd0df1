//! Admin editing form for recipes.
//!
//! The form walks `Idle -> Editing -> Saving -> Saved`, falling back to
//! `Editing` with the error kept when a save fails. Image fields remember
//! whether they hold a fresh local file or a path from an earlier save, so
//! [`RecipeForm::submit`] can decide between uploading and passing through.

use thiserror::Error;
use uuid::Uuid;

use crate::{
    error::Result as SaveResult,
    images::{ImageRef, Upload},
    metadata::{Level, Recipe},
    naming::slugify,
    save::{RecipePayload, StepPayload},
    store::Location,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Editing,
    Saving,
    Saved { slug: String, category: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("Title is required")]
    MissingTitle,
    #[error("Category is required")]
    MissingCategory,
    #[error("A save is already in progress")]
    Busy,
    #[error("No save in progress")]
    NotSaving,
    #[error("No row with id {0}")]
    UnknownRow(Uuid),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ImageField {
    #[default]
    Empty,
    /// A local file picked in this session, not uploaded yet.
    Selected {
        file_name: String,
        bytes: Vec<u8>,
        preview: String,
    },
    Stored(String),
}

impl ImageField {
    pub fn select(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::Selected {
            file_name: file_name.into(),
            bytes,
            preview: format!("blob:{}", Uuid::new_v4()),
        }
    }

    fn from_path(path: Option<&str>) -> Self {
        path.map_or(Self::Empty, |p| Self::Stored(p.to_string()))
    }

    /// Preview `src` for the field: the temporary reference or the stored path.
    pub fn src(&self) -> Option<&str> {
        match self {
            Self::Empty => None,
            Self::Selected { preview, .. } => Some(preview),
            Self::Stored(path) => Some(path),
        }
    }

    fn into_ref(self, key: impl FnOnce(&str) -> String, uploads: &mut Vec<Upload>) -> ImageRef {
        match self {
            Self::Empty => ImageRef::Empty,
            Self::Stored(path) => ImageRef::stored(path),
            Self::Selected { file_name, bytes, .. } => {
                let key = key(&file_name);
                uploads.push(Upload {
                    key: key.clone(),
                    bytes,
                });
                ImageRef::uploaded(key)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row<T> {
    pub id: Uuid,
    pub value: T,
}

impl<T> Row<T> {
    fn new(value: T) -> Self {
        Self {
            id: Uuid::new_v4(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StepDraft {
    pub title: String,
    /// One line per instruction.
    pub description: String,
    pub image: ImageField,
}

/// Scalar fields without side effects on the rest of the form.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Details {
    pub level: Level,
    pub recommended: bool,
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
    pub fiber: f64,
    pub time: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
struct Original {
    title: String,
    slug: String,
    category: String,
}

/// What a submit hands to the save pipeline.
#[derive(Debug, Clone)]
pub struct Submission {
    pub payload: RecipePayload,
    pub uploads: Vec<Upload>,
}

#[derive(Debug, Clone)]
pub struct RecipeForm {
    phase: Phase,
    error: Option<String>,
    original: Option<Original>,
    title: String,
    slug: String,
    category: String,
    details: Details,
    image: ImageField,
    ingredients: Vec<Row<String>>,
    steps: Vec<Row<StepDraft>>,
}

impl Default for RecipeForm {
    fn default() -> Self {
        Self::new()
    }
}

impl RecipeForm {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            error: None,
            original: None,
            title: String::new(),
            slug: String::new(),
            category: String::new(),
            details: Details::default(),
            image: ImageField::Empty,
            ingredients: vec![],
            steps: vec![],
        }
    }

    /// Open an existing recipe for editing.
    pub fn edit(recipe: &Recipe) -> Self {
        let category = if recipe.category_name.is_empty() {
            recipe.category.clone()
        } else {
            recipe.category_name.clone()
        };
        Self {
            phase: Phase::Editing,
            error: None,
            original: Some(Original {
                title: recipe.title.clone(),
                slug: recipe.slug.clone(),
                category: recipe.category.clone(),
            }),
            title: recipe.title.clone(),
            slug: recipe.slug.clone(),
            category,
            details: Details {
                level: recipe.level,
                recommended: recipe.recommended,
                calories: recipe.calories,
                protein: recipe.protein,
                fat: recipe.fat,
                carbs: recipe.carbs,
                fiber: recipe.fiber,
                time: recipe.time.clone(),
                description: recipe.description.clone(),
            },
            image: ImageField::from_path(recipe.image.as_deref()),
            ingredients: recipe.ingredients.iter().cloned().map(Row::new).collect(),
            steps: recipe
                .steps
                .iter()
                .map(|step| {
                    Row::new(StepDraft {
                        title: step.title.clone().unwrap_or_default(),
                        description: step.description.join("\n"),
                        image: ImageField::from_path(step.image.as_deref()),
                    })
                })
                .collect(),
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn details(&self) -> &Details {
        &self.details
    }

    pub fn image(&self) -> &ImageField {
        &self.image
    }

    pub fn ingredients(&self) -> &[Row<String>] {
        &self.ingredients
    }

    pub fn steps(&self) -> &[Row<StepDraft>] {
        &self.steps
    }

    fn touch(&mut self) {
        if matches!(self.phase, Phase::Idle | Phase::Saved { .. }) {
            self.phase = Phase::Editing;
        }
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.touch();
        self.title = title.into();
        match &self.original {
            Some(original) if original.title == self.title => self.slug = original.slug.clone(),
            _ => self.slug = slugify(&self.title),
        }
    }

    pub fn set_category(&mut self, category: impl Into<String>) {
        self.touch();
        self.category = category.into();
    }

    pub fn details_mut(&mut self) -> &mut Details {
        self.touch();
        &mut self.details
    }

    pub fn set_image(&mut self, image: ImageField) {
        self.touch();
        self.image = image;
    }

    pub fn add_ingredient(&mut self, text: impl Into<String>) -> Uuid {
        self.touch();
        let row = Row::new(text.into());
        let id = row.id;
        self.ingredients.push(row);
        id
    }

    pub fn update_ingredient(&mut self, id: Uuid, text: impl Into<String>) -> Result<(), FormError> {
        self.touch();
        let row = self
            .ingredients
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(FormError::UnknownRow(id))?;
        row.value = text.into();
        Ok(())
    }

    pub fn remove_ingredient(&mut self, id: Uuid) -> Result<(), FormError> {
        self.touch();
        let pos = self
            .ingredients
            .iter()
            .position(|r| r.id == id)
            .ok_or(FormError::UnknownRow(id))?;
        self.ingredients.remove(pos);
        Ok(())
    }

    pub fn add_step(&mut self, step: StepDraft) -> Uuid {
        self.touch();
        let row = Row::new(step);
        let id = row.id;
        self.steps.push(row);
        id
    }

    pub fn update_step(&mut self, id: Uuid, f: impl FnOnce(&mut StepDraft)) -> Result<(), FormError> {
        self.touch();
        let row = self
            .steps
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(FormError::UnknownRow(id))?;
        f(&mut row.value);
        Ok(())
    }

    pub fn remove_step(&mut self, id: Uuid) -> Result<(), FormError> {
        self.touch();
        let pos = self.step_position(id)?;
        self.steps.remove(pos);
        Ok(())
    }

    /// Move a step to `index`, clamped to the last position.
    pub fn move_step(&mut self, id: Uuid, index: usize) -> Result<(), FormError> {
        self.touch();
        let pos = self.step_position(id)?;
        let row = self.steps.remove(pos);
        let index = index.min(self.steps.len());
        self.steps.insert(index, row);
        Ok(())
    }

    fn step_position(&self, id: Uuid) -> Result<usize, FormError> {
        self.steps
            .iter()
            .position(|r| r.id == id)
            .ok_or(FormError::UnknownRow(id))
    }

    /// Build the payload and uploads, and move to `Saving`.
    pub fn submit(&mut self) -> Result<Submission, FormError> {
        if self.phase == Phase::Saving {
            return Err(FormError::Busy);
        }
        let checked = if self.title.trim().is_empty() {
            Err(FormError::MissingTitle)
        } else if self.category.trim().is_empty() {
            Err(FormError::MissingCategory)
        } else {
            Ok(())
        };
        if let Err(e) = checked {
            self.phase = Phase::Editing;
            self.error = Some(e.to_string());
            return Err(e);
        }

        let slug = if self.slug.is_empty() {
            slugify(&self.title)
        } else {
            self.slug.clone()
        };

        let mut uploads = vec![];
        let image = self
            .image
            .clone()
            .into_ref(|file| format!("hero_{slug}_{file}"), &mut uploads);
        let steps = self
            .steps
            .iter()
            .enumerate()
            .map(|(index, row)| StepPayload {
                title: Some(row.value.title.trim().to_string()).filter(|t| !t.is_empty()),
                description: row
                    .value
                    .description
                    .lines()
                    .filter(|l| !l.trim().is_empty())
                    .map(str::to_string)
                    .collect(),
                image: row
                    .value
                    .image
                    .clone()
                    .into_ref(|file| format!("step_{index}_{slug}_{file}"), &mut uploads),
            })
            .collect();

        let details = self.details.clone();
        let payload = RecipePayload {
            title: self.title.trim().to_string(),
            slug: Some(slug),
            category: self.category.trim().to_string(),
            level: details.level,
            recommended: details.recommended,
            calories: details.calories,
            protein: details.protein,
            fat: details.fat,
            carbs: details.carbs,
            fiber: details.fiber,
            time: details.time,
            image,
            description: details.description,
            ingredients: self
                .ingredients
                .iter()
                .filter(|r| !r.value.trim().is_empty())
                .map(|r| r.value.clone())
                .collect(),
            steps,
            original_slug: self.original.as_ref().map(|o| o.slug.clone()),
            original_category: self.original.as_ref().map(|o| o.category.clone()),
        };

        self.phase = Phase::Saving;
        self.error = None;
        Ok(Submission { payload, uploads })
    }

    /// Record the outcome of the save started by [`RecipeForm::submit`].
    pub fn finish(&mut self, result: SaveResult<Location>) -> Result<(), FormError> {
        if self.phase != Phase::Saving {
            return Err(FormError::NotSaving);
        }
        match result {
            Ok(loc) => {
                self.phase = Phase::Saved {
                    slug: loc.slug,
                    category: loc.category,
                };
            }
            Err(e) => {
                self.phase = Phase::Editing;
                self.error = Some(e.to_string());
            }
        }
        Ok(())
    }
}
