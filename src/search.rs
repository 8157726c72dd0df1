//! Title search over recipes.
//!
//! The index is rebuilt from the store for every query; there is no cached
//! or global copy to go stale after an edit.

use serde::Serialize;

use crate::{
    error::Result,
    metadata::{Recipe, RecommendedRecipe},
    store::Store,
};

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SearchItem {
    pub slug: String,
    pub title: String,
    pub image: Option<String>,
    pub category: String,
}

#[derive(Debug, Default)]
pub struct SearchIndex {
    items: Vec<(String, SearchItem)>,
}

impl SearchIndex {
    pub fn build(store: &Store) -> Result<Self> {
        let items = store
            .list::<Recipe>()?
            .into_iter()
            .map(|doc| {
                let recipe = doc.header;
                (
                    recipe.title.to_lowercase(),
                    SearchItem {
                        slug: recipe.slug,
                        title: recipe.title,
                        image: recipe.image,
                        category: recipe.category,
                    },
                )
            })
            .collect();
        Ok(Self { items })
    }

    pub fn all(&self) -> Vec<SearchItem> {
        self.items.iter().map(|(_, item)| item.clone()).collect()
    }

    /// Case-insensitive substring match on the title. A blank query matches
    /// everything.
    pub fn query(&self, query: &str) -> Vec<SearchItem> {
        let needle = query.trim().to_lowercase();
        self.items
            .iter()
            .filter(|(title, _)| title.contains(&needle))
            .map(|(_, item)| item.clone())
            .collect()
    }
}

pub fn recommended(store: &Store) -> Result<Vec<RecommendedRecipe>> {
    Ok(store
        .list::<Recipe>()?
        .iter()
        .filter(|doc| doc.header.recommended)
        .map(|doc| RecommendedRecipe::from(&doc.header))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        frontmatter::Document,
        metadata::tests::sample_recipe,
        store::tests::temp_store,
    };

    fn seed(store: &Store, title: &str, slug: &str, recommended: bool) {
        let mut recipe = sample_recipe();
        recipe.title = title.to_string();
        recipe.slug = slug.to_string();
        recipe.recommended = recommended;
        store
            .write(&Document {
                header: recipe,
                body: String::new(),
            })
            .unwrap();
    }

    #[test]
    fn test_query_is_case_insensitive_substring() {
        let (_temp, store) = temp_store();
        seed(&store, "Placki ziemniaczane", "placki-ziemniaczane", true);
        seed(&store, "Żurek śląski", "zurek", false);
        seed(&store, "Sernik", "sernik", false);

        let index = SearchIndex::build(&store).unwrap();
        assert_eq!(index.all().len(), 3);

        let hits = index.query("ZIEMNIA");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].slug, "placki-ziemniaczane");

        assert_eq!(index.query("ŻUREK")[0].slug, "zurek");
        assert_eq!(index.query("   ").len(), 3);
        assert!(index.query("pierogi").is_empty());
    }

    #[test]
    fn test_index_sees_new_records() {
        let (_temp, store) = temp_store();
        assert!(SearchIndex::build(&store).unwrap().all().is_empty());
        seed(&store, "Sernik", "sernik", false);
        assert_eq!(SearchIndex::build(&store).unwrap().query("ser").len(), 1);
    }

    #[test]
    fn test_recommended() {
        let (_temp, store) = temp_store();
        seed(&store, "Placki ziemniaczane", "placki-ziemniaczane", true);
        seed(&store, "Sernik", "sernik", false);

        let picks = recommended(&store).unwrap();
        assert_eq!(picks.len(), 1);
        assert_eq!(picks[0].slug, "placki-ziemniaczane");
    }
}
