use crate::{
    error::Error,
    permissions::ActionType,
    schema::{InterestKind, RecipeSummary, Uuid},
    session::Viewer,
    store::RecipeStore,
};

use super::recipes::get_recipe;

fn already_present(kind: InterestKind) -> Error {
    Error::AlreadyExists(format!(
        "Recipe is already in {}",
        kind.label().to_lowercase()
    ))
}

/// Adds a recipe to one of the viewer's interest sets.
///
/// A duplicate fails with `AlreadyExists` whether the pre-check or the
/// conflict-ignoring insert catches it.
pub async fn add_to_interest_set<S: RecipeStore>(
    viewer: &Viewer,
    kind: InterestKind,
    recipe_id: Uuid,
    store: &S,
) -> Result<RecipeSummary, Error> {
    let session = viewer.authorize(ActionType::ManageOwnInterests)?;
    let recipe = get_recipe(recipe_id, store).await?;

    if store.has_interest(kind, session.user_id, recipe_id).await? {
        return Err(already_present(kind));
    }

    if !store
        .insert_interest(kind, session.user_id, recipe_id)
        .await?
    {
        return Err(already_present(kind));
    }

    log::debug!(
        "User {} added recipe {recipe_id} to {}",
        session.user_id,
        kind.table()
    );
    Ok(RecipeSummary::from(&recipe))
}

pub async fn remove_from_interest_set<S: RecipeStore>(
    viewer: &Viewer,
    kind: InterestKind,
    recipe_id: Uuid,
    store: &S,
) -> Result<(), Error> {
    let session = viewer.authorize(ActionType::ManageOwnInterests)?;

    if !store
        .delete_interest(kind, session.user_id, recipe_id)
        .await?
    {
        return Err(Error::NotFound(format!(
            "Recipe is not in {}",
            kind.label().to_lowercase()
        )));
    }

    log::debug!(
        "User {} removed recipe {recipe_id} from {}",
        session.user_id,
        kind.table()
    );
    Ok(())
}

pub async fn add_to_favorites<S: RecipeStore>(
    viewer: &Viewer,
    recipe_id: Uuid,
    store: &S,
) -> Result<RecipeSummary, Error> {
    add_to_interest_set(viewer, InterestKind::Favorites, recipe_id, store).await
}

pub async fn remove_from_favorites<S: RecipeStore>(
    viewer: &Viewer,
    recipe_id: Uuid,
    store: &S,
) -> Result<(), Error> {
    remove_from_interest_set(viewer, InterestKind::Favorites, recipe_id, store).await
}

pub async fn add_to_shopping_cart<S: RecipeStore>(
    viewer: &Viewer,
    recipe_id: Uuid,
    store: &S,
) -> Result<RecipeSummary, Error> {
    add_to_interest_set(viewer, InterestKind::ShoppingCart, recipe_id, store).await
}

pub async fn remove_from_shopping_cart<S: RecipeStore>(
    viewer: &Viewer,
    recipe_id: Uuid,
    store: &S,
) -> Result<(), Error> {
    remove_from_interest_set(viewer, InterestKind::ShoppingCart, recipe_id, store).await
}
