use std::path::Path;

use crate::{
    error::{Error, TypeError},
    permissions::ActionType,
    schema::{Ingredient, NewIngredient, Uuid},
    session::Viewer,
    store::RecipeStore,
};

/// Ingredients whose name contains `search`, ignoring case. An empty search
/// lists the whole catalog.
pub async fn list_ingredients<S: RecipeStore>(
    search: &str,
    store: &S,
) -> Result<Vec<Ingredient>, Error> {
    store.search_ingredients(search.trim()).await
}

pub async fn get_ingredient<S: RecipeStore>(id: Uuid, store: &S) -> Result<Ingredient, Error> {
    store
        .get_ingredients(&[id])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| Error::not_found("No ingredient exists with specified id"))
}

/// Bulk loads a JSON array of `{name, measurement_unit}` records.
pub async fn import_ingredients_from_str<S: RecipeStore>(
    viewer: &Viewer,
    json: &str,
    store: &S,
) -> Result<u64, Error> {
    viewer.authorize(ActionType::ManageCatalog)?;

    let rows: Vec<NewIngredient> = serde_json::from_str(json).map_err(|e| {
        log::warn!("Rejected ingredient fixture: {e}");
        TypeError::new("Fixture must be a list of {name, measurement_unit} objects")
    })?;

    let inserted = store.insert_ingredients(rows).await?;
    log::info!("Imported {inserted} ingredients");

    Ok(inserted)
}

pub async fn import_ingredients<S: RecipeStore>(
    viewer: &Viewer,
    path: impl AsRef<Path>,
    store: &S,
) -> Result<u64, Error> {
    viewer.authorize(ActionType::ManageCatalog)?;

    let path = path.as_ref();
    let json = tokio::fs::read_to_string(path).await.map_err(|e| {
        log::error!("Failed to read {}: {e}", path.display());
        TypeError::new("Fixture file could not be read")
    })?;

    import_ingredients_from_str(viewer, &json, store).await
}
