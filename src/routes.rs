use std::{sync::Arc, time::Duration};

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header::CONTENT_TYPE, Method},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, services::ServeDir};

use crate::{
    context::Context,
    error::{Error, Result},
    metadata::{BlogImage, BlogPost, Recipe, RecommendedRecipe, Record, Summary},
    naming::slugify,
    renderer::{paragraphs, render_markdown},
    save::{save, BlogPayload, Payload, RecipePayload},
    search::{self, SearchIndex, SearchItem},
    store::Location,
};

mod upload;

use upload::read_submission;

pub fn router(ctx: Arc<Context>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    let images = ServeDir::new(ctx.store.public_root().join("images"));

    Router::new()
        .route("/api/health", get(health))
        .route("/api/recipes", get(list::<Recipe>).post(create::<RecipePayload>))
        .route("/api/recipes/recommended", get(recommended))
        .route("/api/recipes/delete", post(remove::<Recipe>))
        .route("/api/recipes/images", delete(remove_image::<Recipe>))
        .route(
            "/api/recipes/{slug}",
            get(get_recipe).put(update::<RecipePayload>),
        )
        .route("/api/blogs", post(create::<BlogPayload>))
        .route("/api/blogs/list", get(list::<BlogPost>))
        .route("/api/blogs/delete", post(remove::<BlogPost>))
        .route("/api/blogs/images", delete(remove_image::<BlogPost>))
        .route("/api/blogs/{slug}", get(get_blog).put(update::<BlogPayload>))
        .route("/api/search-bar", get(search_bar))
        .route("/api/search", get(search))
        .nest_service("/images", images)
        .layer(DefaultBodyLimit::max(ctx.max_upload_bytes))
        .layer(cors)
        .with_state(ctx)
}

/// Run blocking store work off the async executor.
async fn blocking<T, F>(ctx: &Arc<Context>, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&Context) -> Result<T> + Send + 'static,
{
    let ctx = ctx.clone();
    tokio::task::spawn_blocking(move || f(&ctx)).await?
}

async fn health(State(ctx): State<Arc<Context>>) -> Json<Value> {
    Json(json!({ "status": "ok", "site": ctx.site_name }))
}

async fn list<R: Record>(State(ctx): State<Arc<Context>>) -> Result<Json<Vec<Summary>>> {
    let summaries = blocking(&ctx, |ctx| ctx.store.summaries::<R>()).await?;
    Ok(Json(summaries))
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Saved {
    success: bool,
    message: String,
    slug: String,
    category_slug: String,
}

impl Saved {
    fn new(loc: Location) -> Self {
        Self {
            success: true,
            message: format!("Saved {loc}"),
            slug: loc.slug,
            category_slug: loc.category,
        }
    }
}

async fn create<P: Payload>(State(ctx): State<Arc<Context>>, multipart: Multipart) -> Result<Json<Saved>> {
    let (payload, uploads) = read_submission::<P>(multipart).await?;
    if payload.previous().0.is_some() {
        return Err(Error::bad_request("Use PUT to edit an existing entry"));
    }

    let loc = blocking(&ctx, move |ctx| {
        let _guard = ctx.write_guard();
        save(&ctx.store, ctx.transcode, payload, uploads)
    })
    .await?;

    info!("Created {loc}");
    Ok(Json(Saved::new(loc)))
}

async fn update<P: Payload>(
    State(ctx): State<Arc<Context>>,
    Path(slug): Path<String>,
    multipart: Multipart,
) -> Result<Json<Saved>> {
    let (mut payload, uploads) = read_submission::<P>(multipart).await?;
    let category = payload.previous().1.map(str::to_string);
    payload.set_previous(Some(slug), category);

    let loc = blocking(&ctx, move |ctx| {
        let _guard = ctx.write_guard();
        save(&ctx.store, ctx.transcode, payload, uploads)
    })
    .await?;

    info!("Updated {loc}");
    Ok(Json(Saved::new(loc)))
}

#[derive(Deserialize, Debug)]
struct DeleteRequest {
    slug: String,
    category: String,
}

async fn remove<R: Record>(
    State(ctx): State<Arc<Context>>,
    Json(req): Json<DeleteRequest>,
) -> Result<Json<Value>> {
    let loc = Location::new(R::KIND, slugify(&req.category), req.slug)?;
    blocking(&ctx, move |ctx| {
        let _guard = ctx.write_guard();
        ctx.store.delete(&loc)?;
        info!("Deleted {loc}");
        Ok(())
    })
    .await?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ImageDeleteRequest {
    image_name: String,
    category: String,
    slug: String,
}

async fn remove_image<R: Record>(
    State(ctx): State<Arc<Context>>,
    Json(req): Json<ImageDeleteRequest>,
) -> Result<Json<Value>> {
    let loc = Location::new(R::KIND, slugify(&req.category), req.slug)?;
    let image_name = req.image_name;
    blocking(&ctx, move |ctx| {
        let _guard = ctx.write_guard();
        ctx.store.delete_image::<R>(&loc, &image_name)
    })
    .await?;
    Ok(Json(json!({ "message": "Image removed and entry updated" })))
}

async fn get_recipe(State(ctx): State<Arc<Context>>, Path(slug): Path<String>) -> Result<Json<Recipe>> {
    let (_, doc) = blocking(&ctx, move |ctx| ctx.store.load::<Recipe>(&slug)).await?;
    Ok(Json(doc.header))
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct BlogView {
    title: String,
    slug: String,
    category: String,
    category_name: String,
    date: DateTime<Utc>,
    paragraphs: Vec<String>,
    html: String,
    images: Vec<BlogImage>,
    image: Option<String>,
}

async fn get_blog(State(ctx): State<Arc<Context>>, Path(slug): Path<String>) -> Result<Json<BlogView>> {
    let (_, doc) = blocking(&ctx, move |ctx| ctx.store.load::<BlogPost>(&slug)).await?;
    let post = doc.header;
    Ok(Json(BlogView {
        title: post.title,
        slug: post.slug,
        category: post.category,
        category_name: post.category_name,
        date: post.date,
        paragraphs: paragraphs(&doc.body),
        html: render_markdown(&doc.body),
        images: post.images,
        image: post.image,
    }))
}

async fn recommended(State(ctx): State<Arc<Context>>) -> Result<Json<Vec<RecommendedRecipe>>> {
    let picks = blocking(&ctx, |ctx| search::recommended(&ctx.store)).await?;
    Ok(Json(picks))
}

async fn search_bar(State(ctx): State<Arc<Context>>) -> Result<Json<Vec<SearchItem>>> {
    let index = blocking(&ctx, |ctx| SearchIndex::build(&ctx.store)).await?;
    Ok(Json(index.all()))
}

#[derive(Deserialize, Debug)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

async fn search(
    State(ctx): State<Arc<Context>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<SearchItem>>> {
    let index = blocking(&ctx, |ctx| SearchIndex::build(&ctx.store)).await?;
    Ok(Json(index.query(&params.q)))
}
