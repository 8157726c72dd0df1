//! On-disk content and image store.
//!
//! Layout:
//!
//! ```text
//! <content_root>/<kind>/<category>/<slug>.md
//! <public_root>/images/<kind>/<category>/<slug>/<file>.webp
//! ```
//!
//! There is no index: lookups by slug scan the category directories of a
//! kind every time.

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{debug, info, warn};

use crate::{
    error::{Error, Result},
    frontmatter::{self, Document},
    metadata::{Record, Summary},
    naming::is_valid_slug,
};

mod location;

pub use location::{ContentKind, Location};

#[derive(Debug, Clone)]
pub struct Store {
    content_root: PathBuf,
    public_root: PathBuf,
}

impl Store {
    pub fn new(content_root: impl Into<PathBuf>, public_root: impl Into<PathBuf>) -> Self {
        Self {
            content_root: content_root.into(),
            public_root: public_root.into(),
        }
    }

    pub fn content_root(&self) -> &Path {
        &self.content_root
    }

    pub fn public_root(&self) -> &Path {
        &self.public_root
    }

    pub fn document_path(&self, loc: &Location) -> PathBuf {
        self.content_root.join(loc.document_path())
    }

    pub fn image_dir(&self, loc: &Location) -> PathBuf {
        self.public_root.join(loc.image_dir())
    }

    /// Filesystem path of a public image URL such as
    /// `/images/recipes/zupy/rosol/hero.webp`.
    pub fn image_file(&self, public_path: &str) -> Option<PathBuf> {
        let relative = public_path.strip_prefix('/')?;
        if relative.is_empty() || relative.split('/').any(|c| c.is_empty() || c == "..") {
            return None;
        }
        Some(self.public_root.join(relative))
    }

    pub fn exists(&self, loc: &Location) -> bool {
        self.document_path(loc).is_file()
    }

    fn kind_root(&self, kind: ContentKind) -> PathBuf {
        self.content_root.join(kind.dir_name())
    }

    /// Category directories of `kind`, sorted by name. A missing kind
    /// directory means an empty site, not an error.
    pub fn categories(&self, kind: ContentKind) -> Result<Vec<String>> {
        let root = self.kind_root(kind);
        if !root.is_dir() {
            return Ok(vec![]);
        }

        let mut categories = vec![];
        for entry in fs::read_dir(&root)? {
            let entry = entry?;
            if entry.metadata()?.is_dir() {
                categories.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        categories.sort();
        Ok(categories)
    }

    /// Locate the document of `slug` by scanning every category of `kind`.
    pub fn find(&self, kind: ContentKind, slug: &str) -> Result<Location> {
        let not_found = || Error::not_found(format!("No {kind} entry with slug {slug:?}"));
        if !is_valid_slug(slug) {
            return Err(not_found());
        }

        for category in self.categories(kind)? {
            let loc = Location {
                kind,
                category,
                slug: slug.to_string(),
            };
            if self.exists(&loc) {
                debug!("Found {slug} in {}", loc.category);
                return Ok(loc);
            }
        }

        Err(not_found())
    }

    /// Read and validate the document at `loc`. The front matter must agree
    /// with the path it was read from.
    pub fn read<R: Record>(&self, loc: &Location) -> Result<Document<R>> {
        let path = self.document_path(loc);
        if !path.is_file() {
            return Err(Error::not_found(format!("No {} entry at {loc}", loc.kind)));
        }

        let content = fs::read_to_string(&path)?;
        let doc: Document<R> =
            frontmatter::parse(&content).map_err(|e| Error::invalid_record(&path, e.to_string()))?;

        if doc.header.slug() != loc.slug || doc.header.category() != loc.category {
            return Err(Error::invalid_record(
                &path,
                format!(
                    "front matter says {}/{} but file lives in {}/{}",
                    doc.header.category(),
                    doc.header.slug(),
                    loc.category,
                    loc.slug
                ),
            ));
        }
        doc.header
            .validate()
            .map_err(|reason| Error::invalid_record(&path, reason))?;

        Ok(doc)
    }

    pub fn load<R: Record>(&self, slug: &str) -> Result<(Location, Document<R>)> {
        let loc = self.find(R::KIND, slug)?;
        let doc = self.read(&loc)?;
        Ok((loc, doc))
    }

    /// Every document of a kind, newest first. A single malformed document
    /// fails the whole listing.
    pub fn list<R: Record>(&self) -> Result<Vec<Document<R>>> {
        let mut docs = vec![];

        for category in self.categories(R::KIND)? {
            let dir = self.kind_root(R::KIND).join(&category);
            for entry in fs::read_dir(&dir)? {
                let entry = entry?;
                let path = entry.path();
                if !entry.metadata()?.is_file() || path.extension().map_or(true, |e| e != "md") {
                    continue;
                }

                let stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default();
                let loc = Location::new(R::KIND, category.clone(), stem)
                    .map_err(|e| Error::invalid_record(&path, e.to_string()))?;
                docs.push(self.read(&loc)?);
            }
        }

        docs.sort_by(|a, b| sort_newest_first(&a.header, &b.header));
        Ok(docs)
    }

    pub fn summaries<R: Record>(&self) -> Result<Vec<Summary>> {
        Ok(self
            .list::<R>()?
            .iter()
            .map(|doc| doc.header.summary())
            .collect())
    }

    /// Validate and write a document at the location its front matter names.
    pub fn write<R: Record>(&self, doc: &Document<R>) -> Result<Location> {
        let loc = Location::new(R::KIND, doc.header.category(), doc.header.slug())?;
        doc.header.validate().map_err(Error::bad_request)?;

        let path = self.document_path(&loc);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = frontmatter::render(doc)?;
        let tmp = path.with_extension("md.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &path)?;

        info!("Wrote {}", path.display());
        Ok(loc)
    }

    /// Remove a document file and, if it was the last one, its category
    /// directory.
    pub fn remove_document(&self, loc: &Location) -> Result<()> {
        let path = self.document_path(loc);
        fs::remove_file(&path)?;
        info!("Removed {}", path.display());
        if let Some(parent) = path.parent() {
            remove_dir_if_empty(parent);
        }
        Ok(())
    }

    /// Delete the document and its whole image directory.
    pub fn delete(&self, loc: &Location) -> Result<()> {
        if !self.exists(loc) {
            return Err(Error::not_found(format!("No {} entry at {loc}", loc.kind)));
        }
        self.remove_document(loc)?;

        let images = self.image_dir(loc);
        if let Err(e) = fs_extra::dir::remove(&images) {
            warn!("Could not remove image directory {}: {e}", images.display());
        }
        if let Some(parent) = images.parent() {
            remove_dir_if_empty(parent);
        }
        Ok(())
    }

    /// Move the image directory of `from` to `to`. Returns `false` when
    /// there was nothing to move.
    pub fn move_images(&self, from: &Location, to: &Location) -> Result<bool> {
        let src = self.image_dir(from);
        let dst = self.image_dir(to);
        if !src.is_dir() {
            return Ok(false);
        }
        if dst.exists() {
            return Err(Error::Conflict(format!(
                "Image directory {} already exists",
                dst.display()
            )));
        }

        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(&src, &dst)?;
        info!("Moved {} -> {}", src.display(), dst.display());

        if let Some(parent) = src.parent() {
            remove_dir_if_empty(parent);
        }
        Ok(true)
    }

    /// Delete files in the image directory of `loc` whose public path is not
    /// in `keep`. Returns the number of removed files.
    pub fn prune_images(&self, loc: &Location, keep: &[&str]) -> Result<usize> {
        let dir = self.image_dir(loc);
        if !dir.is_dir() {
            return Ok(0);
        }

        let mut removed = 0;
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.metadata()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if keep.contains(&loc.public_path(&name).as_str()) {
                continue;
            }
            fs::remove_file(entry.path())?;
            debug!("Pruned orphaned image {}", entry.path().display());
            removed += 1;
        }
        Ok(removed)
    }

    /// Remove one image file and every front-matter reference to it.
    pub fn delete_image<R: Record>(&self, loc: &Location, image_name: &str) -> Result<()> {
        if image_name.is_empty()
            || image_name == ".."
            || image_name.contains('/')
            || image_name.contains('\\')
        {
            return Err(Error::bad_request(format!("Invalid image name {image_name:?}")));
        }

        let file = self.image_dir(loc).join(image_name);
        if !file.is_file() {
            return Err(Error::not_found(format!("Image {image_name:?} does not exist")));
        }
        let mut doc = self.read::<R>(loc)?;

        fs::remove_file(&file)?;
        info!("Removed image {}", file.display());

        if doc.header.forget_image(&loc.public_path(image_name)) {
            self.write(&doc)?;
        }
        Ok(())
    }
}

/// Newest first; same-day entries fall back to title order.
fn sort_newest_first<R: Record>(a: &R, b: &R) -> std::cmp::Ordering {
    b.date()
        .cmp(&a.date())
        .then_with(|| a.title().cmp(b.title()))
}

fn remove_dir_if_empty(dir: &Path) {
    // fails on non-empty directories, which is the point
    if fs::remove_dir(dir).is_ok() {
        debug!("Removed empty directory {}", dir.display());
    }
}
