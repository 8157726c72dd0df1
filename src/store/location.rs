use std::{fmt, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    naming::is_valid_slug,
};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Recipes,
    Blogs,
}

impl ContentKind {
    pub fn dir_name(self) -> &'static str {
        match self {
            ContentKind::Recipes => "recipes",
            ContentKind::Blogs => "blogs",
        }
    }

    /// Public URL prefix every image of this kind lives under.
    pub fn image_prefix(self) -> String {
        format!("/images/{}/", self.dir_name())
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// (kind, category slug, slug): everything needed to derive the document
/// path and the image directory of a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub kind: ContentKind,
    pub category: String,
    pub slug: String,
}

impl Location {
    pub fn new(kind: ContentKind, category: impl Into<String>, slug: impl Into<String>) -> Result<Self> {
        let category = category.into();
        let slug = slug.into();
        if !is_valid_slug(&category) {
            return Err(Error::bad_request(format!("Invalid category slug: {category:?}")));
        }
        if !is_valid_slug(&slug) {
            return Err(Error::bad_request(format!("Invalid slug: {slug:?}")));
        }
        Ok(Self { kind, category, slug })
    }

    /// `<kind>/<category>/<slug>.md`, relative to the content root.
    pub fn document_path(&self) -> PathBuf {
        PathBuf::from(self.kind.dir_name())
            .join(&self.category)
            .join(format!("{}.md", self.slug))
    }

    /// `images/<kind>/<category>/<slug>`, relative to the public root.
    pub fn image_dir(&self) -> PathBuf {
        PathBuf::from("images")
            .join(self.kind.dir_name())
            .join(&self.category)
            .join(&self.slug)
    }

    /// Public URL prefix of this record's images, with a trailing slash.
    pub fn public_prefix(&self) -> String {
        format!("{}{}/{}/", self.kind.image_prefix(), self.category, self.slug)
    }

    pub fn public_path(&self, file_name: &str) -> String {
        format!("{}{}", self.public_prefix(), file_name)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.kind, self.category, self.slug)
    }
}
