//! Create/update pipeline shared by recipes and blog posts.
//!
//! Order of operations:
//!
//! 1. derive the target location (category slug, slug) and the previous one
//!    when editing
//! 2. check conflicts and image references, transcode uploads in memory
//! 3. move the image directory if the location changed
//! 4. write transcoded images and resolve every image reference
//! 5. write the document, drop the stale one, prune orphaned images
//!
//! Nothing is rolled back: a failure in step 4 or 5 can leave a moved image
//! directory or a stale document behind.

use std::{
    collections::{HashMap, HashSet},
    fs,
};

use log::{info, warn};
use serde::de::DeserializeOwned;

use crate::{
    error::{Error, Result},
    frontmatter::Document,
    images::{transcode, ImageRef, TranscodeOptions, Transcoded, Upload},
    metadata::Record,
    naming::{image_file_stem, slugify},
    store::{Location, Store},
};

mod payload;

pub use payload::{BlogImagePayload, BlogPayload, RecipePayload, StepPayload};

/// A submitted form, turned into a stored record once its images are known.
pub trait Payload: DeserializeOwned + Send + 'static {
    type Record: Record;

    fn title(&self) -> &str;

    /// Explicit slug, if the submitter picked one.
    fn slug(&self) -> Option<&str>;

    /// Human category name, e.g. "Dania główne".
    fn category_name(&self) -> &str;

    /// (slug, category) the record had before this edit.
    fn previous(&self) -> (Option<&str>, Option<&str>);

    fn set_previous(&mut self, slug: Option<String>, category: Option<String>);

    fn image_refs(&self) -> Vec<&ImageRef>;

    /// Kind-specific checks that must pass before anything is written.
    fn check(&self) -> Result<()> {
        Ok(())
    }

    fn into_document(
        self,
        target: &Location,
        images: &ImageResolver,
        previous: Option<&Document<Self::Record>>,
    ) -> Result<Document<Self::Record>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub path: String,
    pub width: u32,
    pub height: u32,
}

/// Maps the image references of a payload to final public paths.
#[derive(Debug)]
pub struct ImageResolver {
    uploaded: HashMap<String, StoredImage>,
    previous_prefix: Option<String>,
    target_prefix: String,
}

impl ImageResolver {
    pub fn resolve(&self, image: &ImageRef) -> Result<Option<String>> {
        match image {
            ImageRef::Empty => Ok(None),
            ImageRef::Uploaded { key } => self
                .uploaded
                .get(key)
                .map(|stored| Some(stored.path.clone()))
                .ok_or_else(|| Error::bad_request(format!("No uploaded file for {key:?}"))),
            ImageRef::Stored { path } => Ok(Some(self.rebase(path))),
        }
    }

    /// Pixel size of a freshly uploaded image.
    pub fn dimensions(&self, image: &ImageRef) -> Option<(u32, u32)> {
        match image {
            ImageRef::Uploaded { key } => self.uploaded.get(key).map(|s| (s.width, s.height)),
            _ => None,
        }
    }

    /// Point a stored path at the record's current image directory.
    pub fn rebase(&self, path: &str) -> String {
        match &self.previous_prefix {
            Some(prefix) => match path.strip_prefix(prefix.as_str()) {
                Some(rest) => format!("{}{rest}", self.target_prefix),
                None => path.to_string(),
            },
            None => path.to_string(),
        }
    }
}

/// Run the whole pipeline for one payload. Returns where the record now
/// lives.
pub fn save<P: Payload>(
    store: &Store,
    options: TranscodeOptions,
    payload: P,
    uploads: Vec<Upload>,
) -> Result<Location> {
    let kind = P::Record::KIND;

    let title = payload.title().trim();
    if title.is_empty() {
        return Err(Error::bad_request("Title is required"));
    }
    let category = slugify(payload.category_name());
    if category.is_empty() {
        return Err(Error::bad_request("Category is required"));
    }
    let slug = match payload.slug().map(str::trim).filter(|s| !s.is_empty()) {
        Some(slug) => slug.to_string(),
        None => slugify(title),
    };
    let target = Location::new(kind, category, slug)?;

    let previous = match payload.previous() {
        (Some(slug), Some(category)) => {
            let loc = Location::new(kind, slugify(category), slug)
                .map_err(|_| Error::not_found(format!("No {kind} entry with slug {slug:?}")))?;
            if !store.exists(&loc) {
                return Err(Error::not_found(format!("No {kind} entry at {loc}")));
            }
            Some(loc)
        }
        (Some(slug), None) => Some(store.find(kind, slug)?),
        (None, _) => None,
    };
    let path_changed = previous.as_ref().is_some_and(|prev| prev != &target);

    if (previous.is_none() || path_changed) && store.exists(&target) {
        return Err(Error::Conflict(format!("{target} already exists")));
    }

    payload.check()?;
    check_refs(store, &payload, &uploads, &target, previous.as_ref())?;
    let transcoded = transcode_referenced(&payload, uploads, options)?;

    let previous_doc = match &previous {
        Some(prev) => match store.read::<P::Record>(prev) {
            Ok(doc) => Some(doc),
            Err(e) => {
                warn!("Previous version of {prev} is unreadable, replacing it: {e}");
                None
            }
        },
        None => None,
    };

    // images
    let image_dir = store.image_dir(&target);
    match &previous {
        Some(prev) if path_changed => {
            if !store.move_images(prev, &target)? {
                fs::create_dir_all(&image_dir)?;
            }
        }
        _ => fs::create_dir_all(&image_dir)?,
    }

    // files already here may still be referenced as stored images
    let mut used_names: HashSet<String> = fs::read_dir(&image_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    let mut uploaded = HashMap::new();
    for (key, image) in transcoded {
        let file_name = unique_file_name(&image_file_stem(&key), &mut used_names);
        fs::write(image_dir.join(&file_name), &image.webp)?;
        info!("Stored {key:?} as {file_name} ({}x{})", image.width, image.height);
        uploaded.insert(
            key,
            StoredImage {
                path: target.public_path(&file_name),
                width: image.width,
                height: image.height,
            },
        );
    }

    let resolver = ImageResolver {
        uploaded,
        previous_prefix: previous.as_ref().map(Location::public_prefix),
        target_prefix: target.public_prefix(),
    };
    let doc = payload.into_document(&target, &resolver, previous_doc.as_ref())?;
    let written = store.write(&doc)?;

    if let Some(prev) = previous.as_ref().filter(|_| path_changed) {
        if let Err(e) = store.remove_document(prev) {
            warn!("Could not remove stale document for {prev}: {e}");
        }
    }

    let keep = doc.header.image_paths();
    match store.prune_images(&written, &keep) {
        Ok(0) => {}
        Ok(n) => info!("Pruned {n} orphaned image(s) of {written}"),
        Err(e) => warn!("Could not prune images of {written}: {e}"),
    }

    Ok(written)
}

/// Reject dangling upload keys and stored paths that do not belong to this
/// record, before anything is written.
fn check_refs<P: Payload>(
    store: &Store,
    payload: &P,
    uploads: &[Upload],
    target: &Location,
    previous: Option<&Location>,
) -> Result<()> {
    let own_prefixes: Vec<String> = std::iter::once(target)
        .chain(previous)
        .map(Location::public_prefix)
        .collect();

    for image in payload.image_refs() {
        match image {
            ImageRef::Empty => {}
            ImageRef::Uploaded { key } => {
                if !uploads.iter().any(|u| &u.key == key) {
                    return Err(Error::bad_request(format!("No uploaded file for {key:?}")));
                }
            }
            ImageRef::Stored { path } => {
                let owned = own_prefixes.iter().any(|p| path.starts_with(p.as_str()));
                let on_disk = store.image_file(path).is_some_and(|f| f.is_file());
                if !owned || !on_disk {
                    return Err(Error::bad_request(format!("Unknown stored image {path:?}")));
                }
            }
        }
    }
    Ok(())
}

fn transcode_referenced<P: Payload>(
    payload: &P,
    uploads: Vec<Upload>,
    options: TranscodeOptions,
) -> Result<Vec<(String, Transcoded)>> {
    let referenced: HashSet<&str> = payload
        .image_refs()
        .into_iter()
        .filter_map(|image| match image {
            ImageRef::Uploaded { key } => Some(key.as_str()),
            _ => None,
        })
        .collect();

    let mut done = HashSet::new();
    let mut out = vec![];
    for upload in uploads {
        if !referenced.contains(upload.key.as_str()) {
            warn!("Ignoring unreferenced upload {:?}", upload.key);
            continue;
        }
        if !done.insert(upload.key.clone()) {
            continue;
        }
        let image = transcode(&upload.bytes, options).map_err(|e| match e {
            Error::Image(msg) => Error::bad_request(format!("Cannot read image {:?}: {msg}", upload.key)),
            other => other,
        })?;
        out.push((upload.key, image));
    }
    Ok(out)
}

fn unique_file_name(stem: &str, used: &mut HashSet<String>) -> String {
    let mut name = format!("{stem}.webp");
    let mut n = 2;
    while !used.insert(name.clone()) {
        name = format!("{stem}-{n}.webp");
        n += 1;
    }
    name
}

#[cfg(test)]
mod tests;
