//! End-to-end model loads over the checked-in fixture files.
//!
//! These tests exercise the whole fetch-decode-join path without a GPU:
//! the loader is pointed at `tests/fixtures/` and the resolved assets are
//! inspected on the CPU side.

use std::sync::Once;

use image::GenericImageView;
use vitrine::model::{fetch_assets, ModelDescriptor};
use vitrine::resources::LoaderPool;

static INIT: Once = Once::new();

fn use_fixture_assets() {
    INIT.call_once(|| {
        // set once before any loader reads it; tests only ever point the
        // loader at the checked-in fixtures
        unsafe {
            std::env::set_var(
                "VITRINE_ASSETS",
                concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures"),
            );
        }
    });
}

#[tokio::test]
async fn loads_geometry_with_both_texture_slots() {
    use_fixture_assets();
    let descriptor = ModelDescriptor::new("vase", "models/vase.glb")
        .with_map("textures/checker.png")
        .with_env_map("textures/white.png");

    let assets = fetch_assets(&descriptor, &LoaderPool::new()).await.unwrap();

    // positional association: the 2x2 checker fills the color map slot,
    // the 1x1 white image the env slot, regardless of completion order
    assert_eq!(assets.map.as_ref().unwrap().dimensions(), (2, 2));
    assert_eq!(assets.env_map.as_ref().unwrap().dimensions(), (1, 1));
    assert_eq!(assets.mesh.vertices.len(), 3);
    assert_eq!(assets.mesh.indices, vec![0, 1, 2]);
}

#[tokio::test]
async fn geometry_only_load_resolves_without_textures() {
    use_fixture_assets();
    let descriptor = ModelDescriptor::new("vase", "models/vase.glb");

    let assets = fetch_assets(&descriptor, &LoaderPool::new()).await.unwrap();

    assert!(assets.map.is_none());
    assert!(assets.env_map.is_none());
    assert_eq!(assets.mesh.name, "triangle");
}

#[tokio::test]
async fn missing_model_fails_the_load() {
    use_fixture_assets();
    let descriptor = ModelDescriptor::new("ghost", "models/missing.glb");

    let result = fetch_assets(&descriptor, &LoaderPool::new()).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn one_failed_texture_fails_the_whole_load() {
    use_fixture_assets();
    let descriptor = ModelDescriptor::new("vase", "models/vase.glb")
        .with_map("textures/missing.png")
        .with_env_map("textures/white.png");

    let result = fetch_assets(&descriptor, &LoaderPool::new()).await;
    assert!(result.is_err(), "a geometry hit must not mask a texture miss");
}
