use std::path::{Component, Path, PathBuf};

use image::ImageFormat;

use crate::{
    constants::{MEDIA_URL, RECIPE_IMAGE_DIR},
    database::error::{Error, HtmlError},
};

const ACCEPTED: [ImageFormat; 4] = [
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::Gif,
    ImageFormat::WebP,
];

/// Uploaded files under `root`, served at [`MEDIA_URL`].
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Checks that `bytes` decode as an image, stores them under a fresh
    /// name and returns the public url.
    pub async fn save_recipe_image(&self, bytes: Vec<u8>) -> Result<String, Error> {
        let (format, bytes) = tokio::task::spawn_blocking(move || {
            decode_format(&bytes).map(|format| (format, bytes))
        })
        .await
        .map_err(|e| {
            log::error!("Image validation task failed: {e}");
            HtmlError::InternalServerError.default()
        })??;

        let extension = format.extensions_str().first().copied().unwrap_or("img");
        let name = format!("{}.{extension}", uuid::Uuid::new_v4());

        let dir = self.root.join(RECIPE_IMAGE_DIR);
        tokio::fs::create_dir_all(&dir).await.map_err(io_error)?;
        tokio::fs::write(dir.join(&name), bytes)
            .await
            .map_err(io_error)?;

        Ok(format!("{MEDIA_URL}{RECIPE_IMAGE_DIR}/{name}"))
    }

    /// Deletes the file behind a url from [`Self::save_recipe_image`].
    /// A missing file is not an error.
    pub async fn remove(&self, url: &str) {
        let path = match self.path_for(url) {
            Some(p) => p,
            None => return,
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => log::debug!("Removed {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Could not remove {}: {e}", path.display()),
        }
    }

    /// Maps a public url back to a file under `root`. Urls escaping the root
    /// map to nothing.
    pub fn path_for(&self, url: &str) -> Option<PathBuf> {
        let relative = Path::new(url.strip_prefix(MEDIA_URL)?);
        let plain = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));

        (plain && !relative.as_os_str().is_empty()).then(|| self.root.join(relative))
    }
}

fn decode_format(bytes: &[u8]) -> Result<ImageFormat, Error> {
    let invalid = || {
        HtmlError::InvalidRequest.new(
            "image: Upload a valid image. The file you uploaded was either not an image or a corrupted image.",
        )
    };

    let format = image::guess_format(bytes).map_err(|_| invalid())?;
    if !ACCEPTED.contains(&format) {
        return Err(invalid());
    }
    image::load_from_memory_with_format(bytes, format).map_err(|_| invalid())?;

    Ok(format)
}

fn io_error(e: std::io::Error) -> Error {
    log::error!("Media storage failed: {e}");
    HtmlError::InternalServerError.default()
}
