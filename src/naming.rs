//! Slug derivation and validation.
//!
//! Slugs are lowercase ASCII kebab-case. Category names and titles typed by
//! the admin (Polish diacritics included) are transliterated first, so
//! "Dania główne" becomes `dania-glowne`.

/// Turn a human-readable name into a slug. May return an empty string when
/// the input has no alphanumeric content.
pub fn slugify(name: &str) -> String {
    slug::slugify(name.trim())
}

pub fn is_valid_slug(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= 200
        && !value.starts_with('-')
        && !value.ends_with('-')
        && !value.contains("--")
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// File name of a transcoded image derived from an upload key such as
/// `hero_placki_IMG 0042.JPG`.
pub fn image_file_stem(key: &str) -> String {
    let stem = std::path::Path::new(key)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let stem = slugify(&stem);
    if stem.is_empty() {
        "image".to_string()
    } else {
        stem
    }
}
