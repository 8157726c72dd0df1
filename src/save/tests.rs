use super::*;
use crate::{
    images::tests::png,
    metadata::{BlogPost, Level, Recipe},
    store::{tests::temp_store, ContentKind},
};

fn upload(key: &str, width: u32, height: u32) -> Upload {
    Upload {
        key: key.to_string(),
        bytes: png(width, height),
    }
}

fn placki() -> RecipePayload {
    RecipePayload {
        title: "Placki ziemniaczane".to_string(),
        slug: None,
        category: "Dania główne".to_string(),
        level: Level::Medium,
        recommended: true,
        calories: 320.0,
        protein: 7.5,
        fat: 12.0,
        carbs: 44.0,
        fiber: 3.2,
        time: "40 min".to_string(),
        image: ImageRef::uploaded("hero_placki-ziemniaczane_IMG_1.png"),
        description: "Chrupiące placki.".to_string(),
        ingredients: vec!["1 kg ziemniaków".to_string(), " ".to_string(), "1 cebula".to_string()],
        steps: vec![
            StepPayload {
                title: Some("Tarcie".to_string()),
                description: vec!["Zetrzyj ziemniaki.".to_string(), "".to_string()],
                image: ImageRef::uploaded("step_0_placki-ziemniaczane_a.png"),
            },
            StepPayload {
                title: Some("  ".to_string()),
                description: vec!["Smaż na złoto.".to_string()],
                image: ImageRef::Empty,
            },
        ],
        original_slug: None,
        original_category: None,
    }
}

fn placki_uploads() -> Vec<Upload> {
    vec![
        upload("hero_placki-ziemniaczane_IMG_1.png", 2400, 1200),
        upload("step_0_placki-ziemniaczane_a.png", 400, 300),
    ]
}

#[test]
fn test_create_recipe_writes_document_and_images() {
    let (_temp, store) = temp_store();
    let loc = save(&store, TranscodeOptions::default(), placki(), placki_uploads()).unwrap();

    assert_eq!(loc.category, "dania-glowne");
    assert_eq!(loc.slug, "placki-ziemniaczane");

    let doc: Document<Recipe> = store.read(&loc).unwrap();
    let recipe = doc.header;
    assert_eq!(recipe.title, "Placki ziemniaczane");
    assert_eq!(recipe.category_name, "Dania główne");
    assert_eq!(recipe.level, Level::Medium);
    assert!(recipe.recommended);
    assert_eq!(recipe.fiber, 3.2);
    assert_eq!(recipe.ingredients, vec!["1 kg ziemniaków", "1 cebula"]);
    assert_eq!(recipe.steps.len(), 2);
    assert_eq!(recipe.steps[0].description, vec!["Zetrzyj ziemniaki."]);
    assert_eq!(recipe.steps[1].title, None);
    assert_eq!(recipe.steps[1].image, None);

    let hero = recipe.image.unwrap();
    assert_eq!(
        hero,
        "/images/recipes/dania-glowne/placki-ziemniaczane/hero-placki-ziemniaczane-img-1.webp"
    );
    let hero_file = store.image_file(&hero).unwrap();
    let decoded = image::open(&hero_file).unwrap();
    assert_eq!(decoded.width(), 1200);

    let step_image = recipe.steps[0].image.clone().unwrap();
    assert!(step_image.ends_with("/step-0-placki-ziemniaczane-a.webp"));
    assert_eq!(image::open(store.image_file(&step_image).unwrap()).unwrap().width(), 400);

    let files = fs::read_dir(store.image_dir(&loc)).unwrap().count();
    assert_eq!(files, 2);
}

#[test]
fn test_create_conflicts_with_existing() {
    let (_temp, store) = temp_store();
    save(&store, TranscodeOptions::default(), placki(), placki_uploads()).unwrap();
    let err = save(&store, TranscodeOptions::default(), placki(), placki_uploads()).unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
}

#[test]
fn test_missing_upload_is_rejected_before_writing() {
    let (_temp, store) = temp_store();
    let err = save(&store, TranscodeOptions::default(), placki(), vec![]).unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)));
    assert!(!store.content_root().exists());
    assert!(!store.public_root().exists());
}

#[test]
fn test_broken_upload_is_bad_request() {
    let (_temp, store) = temp_store();
    let uploads = vec![
        Upload {
            key: "hero_placki-ziemniaczane_IMG_1.png".to_string(),
            bytes: b"not a png".to_vec(),
        },
        upload("step_0_placki-ziemniaczane_a.png", 10, 10),
    ];
    let err = save(&store, TranscodeOptions::default(), placki(), uploads).unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)));
}

#[test]
fn test_missing_title_or_category() {
    let (_temp, store) = temp_store();
    let mut payload = placki();
    payload.title = "  ".to_string();
    assert!(matches!(
        save(&store, TranscodeOptions::default(), payload, vec![]).unwrap_err(),
        Error::BadRequest(_)
    ));

    let mut payload = placki();
    payload.category = "!!!".to_string();
    assert!(matches!(
        save(&store, TranscodeOptions::default(), payload, vec![]).unwrap_err(),
        Error::BadRequest(_)
    ));
}

#[test]
fn test_change_category_relocates_record() {
    let (_temp, store) = temp_store();
    let old = save(&store, TranscodeOptions::default(), placki(), placki_uploads()).unwrap();
    let before: Document<Recipe> = store.read(&old).unwrap();

    let mut edit = placki();
    edit.category = "Śniadania".to_string();
    edit.slug = Some("placki-ziemniaczane".to_string());
    edit.image = ImageRef::from_path(before.header.image.as_deref());
    edit.steps[0].image = ImageRef::from_path(before.header.steps[0].image.as_deref());
    edit.original_slug = Some("placki-ziemniaczane".to_string());
    edit.original_category = Some("dania-glowne".to_string());

    let new = save(&store, TranscodeOptions::default(), edit, vec![]).unwrap();

    assert!(!store
        .content_root()
        .join("recipes/dania-glowne/placki-ziemniaczane.md")
        .exists());
    assert!(store
        .content_root()
        .join("recipes/sniadania/placki-ziemniaczane.md")
        .is_file());
    assert!(!store.image_dir(&old).exists());
    assert!(store.image_dir(&new).is_dir());

    let found = store.find(ContentKind::Recipes, "placki-ziemniaczane").unwrap();
    let after: Document<Recipe> = store.read(&found).unwrap();
    assert_eq!(after.header.category, "sniadania");

    let hero = after.header.image.unwrap();
    assert!(hero.starts_with("/images/recipes/sniadania/placki-ziemniaczane/"));
    assert!(store.image_file(&hero).unwrap().is_file());
    let step = after.header.steps[0].image.clone().unwrap();
    assert!(store.image_file(&step).unwrap().is_file());
}

#[test]
fn test_rename_onto_existing_conflicts() {
    let (_temp, store) = temp_store();
    save(&store, TranscodeOptions::default(), placki(), placki_uploads()).unwrap();

    let mut other = placki();
    other.title = "Kopytka".to_string();
    save(&store, TranscodeOptions::default(), other, placki_uploads()).unwrap();

    let mut edit = placki();
    edit.title = "Kopytka".to_string();
    edit.image = ImageRef::Empty;
    edit.steps.clear();
    edit.original_slug = Some("placki-ziemniaczane".to_string());
    edit.original_category = Some("Dania główne".to_string());
    let err = save(&store, TranscodeOptions::default(), edit, vec![]).unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
}

#[test]
fn test_edit_missing_record_is_not_found() {
    let (_temp, store) = temp_store();
    let mut edit = placki();
    edit.image = ImageRef::Empty;
    edit.steps.clear();
    edit.original_slug = Some("nie-ma".to_string());
    edit.original_category = Some("zupy".to_string());
    assert!(matches!(
        save(&store, TranscodeOptions::default(), edit.clone(), vec![]).unwrap_err(),
        Error::NotFound(_)
    ));

    edit.original_category = None;
    assert!(matches!(
        save(&store, TranscodeOptions::default(), edit, vec![]).unwrap_err(),
        Error::NotFound(_)
    ));
}

#[test]
fn test_foreign_stored_image_is_rejected() {
    let (_temp, store) = temp_store();
    save(&store, TranscodeOptions::default(), placki(), placki_uploads()).unwrap();
    let theirs: Document<Recipe> = store
        .read(&Location::new(ContentKind::Recipes, "dania-glowne", "placki-ziemniaczane").unwrap())
        .unwrap();

    let mut other = placki();
    other.title = "Kopytka".to_string();
    other.image = ImageRef::from_path(theirs.header.image.as_deref());
    other.steps.clear();
    let err = save(&store, TranscodeOptions::default(), other, vec![]).unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)));
}

#[test]
fn test_replaced_images_are_pruned() {
    let (_temp, store) = temp_store();
    let loc = save(&store, TranscodeOptions::default(), placki(), placki_uploads()).unwrap();
    let before: Document<Recipe> = store.read(&loc).unwrap();
    let old_hero = store.image_file(before.header.image.as_deref().unwrap()).unwrap();

    let mut edit = placki();
    edit.image = ImageRef::Empty;
    edit.steps[0].image = ImageRef::from_path(before.header.steps[0].image.as_deref());
    edit.original_slug = Some(loc.slug.clone());
    edit.original_category = Some(loc.category.clone());
    save(&store, TranscodeOptions::default(), edit, vec![]).unwrap();

    assert!(!old_hero.exists());
    let after: Document<Recipe> = store.read(&loc).unwrap();
    assert!(after.header.image.is_none());
    assert_eq!(fs::read_dir(store.image_dir(&loc)).unwrap().count(), 1);
}

#[test]
fn test_duplicate_file_stems_get_suffixes() {
    let (_temp, store) = temp_store();
    let mut payload = placki();
    payload.image = ImageRef::uploaded("a.png");
    payload.steps[0].image = ImageRef::uploaded("a.jpg");
    let uploads = vec![upload("a.png", 20, 20), upload("a.jpg", 20, 20)];

    let loc = save(&store, TranscodeOptions::default(), payload, uploads).unwrap();
    let doc: Document<Recipe> = store.read(&loc).unwrap();
    assert!(doc.header.image.unwrap().ends_with("/a.webp"));
    assert!(doc.header.steps[0].image.clone().unwrap().ends_with("/a-2.webp"));
}

#[test]
fn test_unreferenced_uploads_are_ignored() {
    let (_temp, store) = temp_store();
    let mut uploads = placki_uploads();
    uploads.push(upload("stray.png", 10, 10));
    let loc = save(&store, TranscodeOptions::default(), placki(), uploads).unwrap();
    assert!(!store.image_dir(&loc).join("stray.webp").exists());
}

#[test]
fn test_new_upload_does_not_overwrite_kept_image() {
    let (_temp, store) = temp_store();
    let loc = save(&store, TranscodeOptions::default(), placki(), placki_uploads()).unwrap();
    let before: Document<Recipe> = store.read(&loc).unwrap();
    let kept = before.header.steps[0].image.clone().unwrap();
    let kept_bytes = fs::read(store.image_file(&kept).unwrap()).unwrap();

    // a new first step reuses the upload key the old first step had
    let mut edit = placki();
    edit.image = ImageRef::from_path(before.header.image.as_deref());
    let mut old_first = edit.steps.remove(0);
    old_first.image = ImageRef::stored(kept.clone());
    edit.steps.insert(
        0,
        StepPayload {
            title: Some("Obieranie".to_string()),
            description: vec!["Obierz ziemniaki.".to_string()],
            image: ImageRef::uploaded("step_0_placki-ziemniaczane_a.png"),
        },
    );
    edit.steps.insert(1, old_first);
    edit.original_slug = Some(loc.slug.clone());
    edit.original_category = Some(loc.category.clone());
    let uploads = vec![upload("step_0_placki-ziemniaczane_a.png", 50, 50)];
    save(&store, TranscodeOptions::default(), edit, uploads).unwrap();

    let after: Document<Recipe> = store.read(&loc).unwrap();
    let fresh = after.header.steps[0].image.clone().unwrap();
    assert_eq!(after.header.steps[1].image.as_deref(), Some(kept.as_str()));
    assert_ne!(fresh, kept);
    assert!(fresh.ends_with("/step-0-placki-ziemniaczane-a-2.webp"));
    assert_eq!(fs::read(store.image_file(&kept).unwrap()).unwrap(), kept_bytes);
    assert_eq!(image::open(store.image_file(&fresh).unwrap()).unwrap().width(), 50);
    assert_eq!(fs::read_dir(store.image_dir(&loc)).unwrap().count(), 3);
}

#[test]
fn test_kept_lines_are_not_trimmed() {
    let (_temp, store) = temp_store();
    let mut payload = placki();
    payload.ingredients = vec!["Ciasto:".to_string(), "  - 2 jajka".to_string(), "   ".to_string()];
    payload.steps[0].description = vec!["Wymieszaj:".to_string(), "    mąkę z jajkami".to_string()];
    let loc = save(&store, TranscodeOptions::default(), payload, placki_uploads()).unwrap();

    let doc: Document<Recipe> = store.read(&loc).unwrap();
    assert_eq!(doc.header.ingredients, vec!["Ciasto:", "  - 2 jajka"]);
    assert_eq!(doc.header.steps[0].description, vec!["Wymieszaj:", "    mąkę z jajkami"]);
}

fn szparagi() -> BlogPayload {
    BlogPayload {
        title: "Sezon na szparagi".to_string(),
        slug: None,
        category: "Sezonowe".to_string(),
        date: Some("2024-04-20".to_string()),
        paragraphs: vec!["Pierwszy akapit.".to_string(), "  ".to_string(), "Drugi.".to_string()],
        images: vec![
            BlogImagePayload {
                image: ImageRef::uploaded("a.png"),
            },
            BlogImagePayload {
                image: ImageRef::uploaded("b.png"),
            },
        ],
        hero: Some(1),
        original_slug: None,
        original_category: None,
    }
}

#[test]
fn test_blog_create_and_retitle() {
    let (_temp, store) = temp_store();
    let uploads = vec![upload("a.png", 1600, 800), upload("b.png", 300, 300)];
    let loc = save(&store, TranscodeOptions::default(), szparagi(), uploads).unwrap();
    assert_eq!(loc.slug, "sezon-na-szparagi");

    let doc: Document<BlogPost> = store.read(&loc).unwrap();
    assert_eq!(doc.body, "Pierwszy akapit.\n\nDrugi.\n");
    assert_eq!(doc.header.images.len(), 2);
    assert_eq!(doc.header.images[0].width, Some(1200));
    assert_eq!(doc.header.images[0].height, Some(600));
    assert_eq!(doc.header.image.as_deref(), Some(doc.header.images[1].src.as_str()));

    let mut edit = szparagi();
    edit.title = "Szparagi na wiosnę".to_string();
    edit.date = None;
    edit.images = doc
        .header
        .images
        .iter()
        .map(|i| BlogImagePayload {
            image: ImageRef::stored(i.src.clone()),
        })
        .collect();
    edit.hero = Some(0);
    edit.original_slug = Some(loc.slug.clone());

    let moved = save(&store, TranscodeOptions::default(), edit, vec![]).unwrap();
    assert_eq!(moved.slug, "szparagi-na-wiosne");
    assert!(!store.exists(&loc));

    let after: Document<BlogPost> = store.read(&moved).unwrap();
    assert_eq!(after.header.date, doc.header.date);
    assert_eq!(after.header.images[0].width, Some(1200));
    assert!(after.header.images[0]
        .src
        .starts_with("/images/blogs/sezonowe/szparagi-na-wiosne/"));
    assert_eq!(after.header.image.as_deref(), Some(after.header.images[0].src.as_str()));
}

#[test]
fn test_blog_invalid_date() {
    let (_temp, store) = temp_store();
    let mut payload = szparagi();
    payload.date = Some("kiedyś".to_string());
    let uploads = vec![upload("a.png", 10, 10), upload("b.png", 10, 10)];
    assert!(matches!(
        save(&store, TranscodeOptions::default(), payload, uploads).unwrap_err(),
        Error::BadRequest(_)
    ));
}

#[test]
fn test_resolver_rebase() {
    let resolver = ImageResolver {
        uploaded: HashMap::new(),
        previous_prefix: Some("/images/recipes/a/x/".to_string()),
        target_prefix: "/images/recipes/b/x/".to_string(),
    };
    assert_eq!(resolver.rebase("/images/recipes/a/x/h.webp"), "/images/recipes/b/x/h.webp");
    assert_eq!(resolver.rebase("/images/recipes/c/y/h.webp"), "/images/recipes/c/y/h.webp");
    assert!(resolver.resolve(&ImageRef::uploaded("nope")).is_err());
    assert_eq!(resolver.resolve(&ImageRef::Empty).unwrap(), None);
}

#[test]
fn test_blog_hero_must_point_at_image() {
    let (_temp, store) = temp_store();
    let uploads = || vec![upload("a.png", 10, 10), upload("b.png", 10, 10)];

    let mut payload = szparagi();
    payload.hero = Some(2);
    assert!(matches!(
        save(&store, TranscodeOptions::default(), payload, uploads()).unwrap_err(),
        Error::BadRequest(_)
    ));

    let mut payload = szparagi();
    payload.images[1].image = ImageRef::Empty;
    assert!(matches!(
        save(&store, TranscodeOptions::default(), payload, uploads()).unwrap_err(),
        Error::BadRequest(_)
    ));
    assert!(!store.content_root().exists());
    assert!(!store.public_root().exists());
}
