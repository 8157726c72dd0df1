use axum::extract::Multipart;
use log::debug;

use crate::{
    error::{Error, Result},
    images::Upload,
    save::Payload,
};

/// Split a multipart submission into its JSON payload (`data` field) and the
/// uploaded files (`images` fields, keyed by file name). A legacy
/// `oldCategory` field overrides the previous category in the payload; the
/// previous slug always comes from the request path.
pub(super) async fn read_submission<P: Payload>(mut multipart: Multipart) -> Result<(P, Vec<Upload>)> {
    let mut data = None;
    let mut uploads = vec![];
    let mut old_category = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "data" => data = Some(field.text().await.map_err(bad_multipart)?),
            "images" => {
                let key = field
                    .file_name()
                    .filter(|n| !n.is_empty())
                    .map(str::to_string)
                    .ok_or_else(|| Error::bad_request("Uploaded image without a file name"))?;
                let bytes = field.bytes().await.map_err(bad_multipart)?;
                debug!("Received upload {key:?} ({} bytes)", bytes.len());
                uploads.push(Upload {
                    key,
                    bytes: bytes.to_vec(),
                });
            }
            "oldCategory" => old_category = Some(field.text().await.map_err(bad_multipart)?),
            other => debug!("Ignoring multipart field {other:?}"),
        }
    }

    let data = data.ok_or_else(|| Error::bad_request("Missing entry data"))?;
    let mut payload: P =
        serde_json::from_str(&data).map_err(|e| Error::bad_request(format!("Malformed payload: {e}")))?;

    if let Some(category) = old_category.filter(|c| !c.is_empty()) {
        let slug = payload.previous().0.map(str::to_string);
        payload.set_previous(slug, Some(category));
    }

    Ok((payload, uploads))
}

fn bad_multipart(e: axum::extract::multipart::MultipartError) -> Error {
    Error::bad_request(format!("Malformed multipart body: {}", e.body_text()))
}
