//! Raw asset IO and texture fetching.
//!
//! On native targets assets are read from the `assets/` directory (or the
//! directory named by `VITRINE_ASSETS`); on the web they are fetched from
//! the document origin.

use crate::error::ViewerError;

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> reqwest::Url {
    let window = web_sys::window().unwrap();
    let location = window.location();
    let origin = location.origin().unwrap();
    let base = reqwest::Url::parse(&format!("{}/assets/", origin)).unwrap();
    base.join(file_name).unwrap()
}

#[cfg(not(target_arch = "wasm32"))]
fn assets_root() -> std::path::PathBuf {
    std::env::var_os("VITRINE_ASSETS")
        .map(Into::into)
        .unwrap_or_else(|| "assets".into())
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name);
        reqwest::get(url).await?.bytes().await?.to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = assets_root().join(file_name);
        tokio::fs::read(path).await?
    };

    Ok(data)
}

/// Fetches and decodes image textures. One instance is shared by all
/// model loads through the [`LoaderPool`](crate::resources::LoaderPool).
#[derive(Clone, Debug, Default)]
pub struct TextureFetcher;

impl TextureFetcher {
    pub async fn fetch(&self, file_name: &str) -> Result<image::DynamicImage, ViewerError> {
        let data = load_binary(file_name)
            .await
            .map_err(|e| ViewerError::load(file_name, e))?;
        self.decode(&data, file_name)
    }

    pub fn decode(&self, bytes: &[u8], label: &str) -> Result<image::DynamicImage, ViewerError> {
        image::load_from_memory(bytes).map_err(|e| ViewerError::load(label, e))
    }
}
