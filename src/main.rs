use std::{fs, path::PathBuf};

use anyhow::{bail, Context as _};
use clap::{command, value_parser, Arg};
use larder::{context::Context, images::TranscodeOptions, start_server};
use log::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let matches = command!()
        .args(&[
            Arg::new("content_dir")
                .long("content-dir")
                .env("LARDER_CONTENT_DIR")
                .help("Directory holding the markdown entries")
                .value_parser(value_parser!(PathBuf))
                .default_value("content"),
            Arg::new("public_dir")
                .long("public-dir")
                .env("LARDER_PUBLIC_DIR")
                .help("Public directory of the site. Images are written under images/.")
                .value_parser(value_parser!(PathBuf))
                .default_value("public"),
            Arg::new("host")
                .long("host")
                .env("LARDER_HOST")
                .default_value("127.0.0.1"),
            Arg::new("port")
                .long("port")
                .env("PORT")
                .value_parser(value_parser!(u16))
                .default_value("3000"),
            Arg::new("max_image_width")
                .long("max-image-width")
                .env("LARDER_MAX_IMAGE_WIDTH")
                .help("Uploads wider than this are scaled down")
                .value_parser(value_parser!(u32).range(1..))
                .default_value("1200"),
            Arg::new("webp_quality")
                .long("webp-quality")
                .env("LARDER_WEBP_QUALITY")
                .help("Lossy WebP quality, 0-100")
                .value_parser(value_parser!(u8).range(0..=100))
                .default_value("80"),
            Arg::new("max_upload_mb")
                .long("max-upload-mb")
                .help("Request body limit in megabytes")
                .value_parser(value_parser!(usize))
                .default_value("25"),
            Arg::new("site_name")
                .long("site-name")
                .env("SITE_NAME")
                .default_value("larder"),
        ])
        .get_matches();

    let content_dir = matches.get_one::<PathBuf>("content_dir").context("content_dir")?;
    if content_dir.exists() && !content_dir.is_dir() {
        bail!("if content_dir exists, it must be a directory.");
    }
    let public_dir = matches.get_one::<PathBuf>("public_dir").context("public_dir")?;
    if public_dir.exists() && !public_dir.is_dir() {
        bail!("if public_dir exists, it must be a directory.");
    }
    let images_dir = public_dir.join("images");
    fs::create_dir_all(&images_dir)
        .with_context(|| format!("Failed to create {}", images_dir.display()))?;
    fs::create_dir_all(content_dir)
        .with_context(|| format!("Failed to create {}", content_dir.display()))?;

    let host = matches.get_one::<String>("host").context("host")?;
    let port = *matches.get_one::<u16>("port").context("port")?;
    let max_width = *matches.get_one::<u32>("max_image_width").context("max_image_width")?;
    let quality = *matches.get_one::<u8>("webp_quality").context("webp_quality")?;
    let max_upload_mb = *matches.get_one::<usize>("max_upload_mb").context("max_upload_mb")?;
    let site_name = matches.get_one::<String>("site_name").context("site_name")?;

    let transcode = TranscodeOptions {
        max_width,
        quality: f32::from(quality),
    };
    info!("Images capped at {max_width}px, WebP quality {quality}");

    let ctx = Context::new(
        site_name.clone(),
        content_dir.clone(),
        public_dir.clone(),
        transcode,
        max_upload_mb * 1024 * 1024,
    );

    start_server(ctx, &format!("{host}:{port}"))
        .await
        .context("Server failed")?;

    Ok(())
}
