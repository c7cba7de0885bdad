use std::collections::BTreeSet;

use redis::aio::MultiplexedConnection;

use crate::{
    cache::cache::{CacheKeyType, RecipeCache, RedisValue},
    constants::{MIN_COOKING_TIME, MIN_INGREDIENT_AMOUNT, RECIPE_COUNT_PER_PAGE},
    error::{Error, ValidationKind},
    pagination::{page_size, PageContext},
    permissions::ActionType,
    schema::{
        InterestKind, Recipe, RecipeDetails, RecipeFilter, RecipeForm, RecipeView, Uuid,
        ViewerFlags,
    },
    session::Viewer,
    store::RecipeStore,
};

/// Checks a submitted recipe before anything touches storage.
pub fn validate_recipe_form(form: &RecipeForm) -> Result<(), ValidationKind> {
    if form.name.trim().is_empty() {
        return Err(ValidationKind::EmptyName);
    }

    if form.cooking_time < MIN_COOKING_TIME {
        return Err(ValidationKind::NonPositiveCookingTime);
    }

    let mut seen = BTreeSet::new();
    for line in &form.ingredients {
        if line.amount < MIN_INGREDIENT_AMOUNT {
            return Err(ValidationKind::NonPositiveAmount);
        }
        if !seen.insert(line.id) {
            return Err(ValidationKind::DuplicateIngredient);
        }
    }

    Ok(())
}

async fn resolve_references<S: RecipeStore>(form: &RecipeForm, store: &S) -> Result<(), Error> {
    let ingredient_ids: Vec<Uuid> = form.ingredients.iter().map(|line| line.id).collect();
    let found = store.get_ingredients(&ingredient_ids).await?;
    if let Some(missing) = ingredient_ids
        .iter()
        .find(|id| !found.iter().any(|i| i.id == **id))
    {
        return Err(Error::NotFound(format!("Ingredient {missing} does not exist")));
    }

    let tag_ids: BTreeSet<Uuid> = form.tags.iter().copied().collect();
    let tag_ids: Vec<Uuid> = tag_ids.into_iter().collect();
    let found = store.get_tags(&tag_ids).await?;
    if let Some(missing) = tag_ids.iter().find(|id| !found.iter().any(|t| t.id == **id)) {
        return Err(Error::NotFound(format!("Tag {missing} does not exist")));
    }

    Ok(())
}

pub async fn get_recipe<S: RecipeStore>(id: Uuid, store: &S) -> Result<Recipe, Error> {
    store
        .get_recipe(id)
        .await?
        .ok_or_else(|| Error::not_found("No recipe exists with specified id"))
}

/// Loads a recipe the viewer is allowed to modify.
pub async fn get_recipe_mut<S: RecipeStore>(
    viewer: &Viewer,
    id: Uuid,
    store: &S,
) -> Result<Recipe, Error> {
    let session = viewer.authorize(ActionType::ManageOwnRecipes)?;
    let recipe = get_recipe(id, store).await?;

    if recipe.author_id != session.user_id {
        return Err(Error::Forbidden);
    }

    Ok(recipe)
}

pub async fn create_recipe<S: RecipeStore>(
    viewer: &Viewer,
    form: RecipeForm,
    store: &S,
) -> Result<RecipeView, Error> {
    let session = viewer.authorize(ActionType::CreateRecipes)?;
    validate_recipe_form(&form)?;
    resolve_references(&form, store).await?;

    let recipe = store.insert_recipe(session.user_id, &form).await?;
    log::debug!("User {} created recipe {}", session.user_id, recipe.id);

    read_recipe(viewer, recipe.id, store).await
}

/// Replaces every field, the composition and the tag set. The publication
/// time is kept. A cached copy of the recipe is evicted after the write.
pub async fn update_recipe<S: RecipeStore>(
    viewer: &Viewer,
    id: Uuid,
    form: RecipeForm,
    store: &S,
    cache: Option<&mut dyn RecipeCache>,
) -> Result<RecipeView, Error> {
    get_recipe_mut(viewer, id, store).await?;
    validate_recipe_form(&form)?;
    resolve_references(&form, store).await?;

    store
        .replace_recipe(id, &form)
        .await?
        .ok_or_else(|| Error::not_found("No recipe exists with specified id"))?;
    log::debug!("Recipe {id} updated");

    if let Some(cache) = cache {
        cache.evict_recipe(id).await?;
    }

    read_recipe(viewer, id, store).await
}

pub async fn delete_recipe<S: RecipeStore>(
    viewer: &Viewer,
    id: Uuid,
    store: &S,
    cache: Option<&mut dyn RecipeCache>,
) -> Result<(), Error> {
    get_recipe_mut(viewer, id, store).await?;

    if !store.delete_recipe(id).await? {
        return Err(Error::not_found("No recipe exists with specified id"));
    }
    log::debug!("Recipe {id} deleted");

    if let Some(cache) = cache {
        cache.evict_recipe(id).await?;
    }

    Ok(())
}

/// Everything about a recipe that reads the same for every viewer.
pub async fn load_recipe_details<S: RecipeStore>(
    id: Uuid,
    store: &S,
) -> Result<Option<RecipeDetails>, Error> {
    let Some(recipe) = store.get_recipe(id).await? else {
        return Ok(None);
    };

    let author = store
        .get_user(recipe.author_id)
        .await?
        .ok_or_else(|| Error::Query(format!("Recipe {id} has no author")))?;
    let tags = store.list_recipe_tags(id).await?;
    let ingredients = store.list_recipe_ingredients(id).await?;

    Ok(Some(RecipeDetails {
        recipe,
        author,
        tags,
        ingredients,
    }))
}

/// All false for an anonymous viewer.
pub async fn viewer_flags<S: RecipeStore>(
    viewer: &Viewer,
    recipe: &Recipe,
    store: &S,
) -> Result<ViewerFlags, Error> {
    let Some(user_id) = viewer.user_id() else {
        return Ok(ViewerFlags::default());
    };

    Ok(ViewerFlags {
        is_favorited: store
            .has_interest(InterestKind::Favorites, user_id, recipe.id)
            .await?,
        is_in_shopping_cart: store
            .has_interest(InterestKind::ShoppingCart, user_id, recipe.id)
            .await?,
        is_subscribed: store.is_subscribed(user_id, recipe.author_id).await?,
    })
}

async fn project<S: RecipeStore>(
    viewer: &Viewer,
    details: RecipeDetails,
    store: &S,
) -> Result<RecipeView, Error> {
    let flags = viewer_flags(viewer, &details.recipe, store).await?;
    Ok(RecipeView::project(details, flags))
}

pub async fn read_recipe<S: RecipeStore>(
    viewer: &Viewer,
    id: Uuid,
    store: &S,
) -> Result<RecipeView, Error> {
    let details = load_recipe_details(id, store)
        .await?
        .ok_or_else(|| Error::not_found("No recipe exists with specified id"))?;

    project(viewer, details, store).await
}

/// Same as [`read_recipe`], with the viewer independent part served from redis.
pub async fn read_recipe_cached<S: RecipeStore>(
    viewer: &Viewer,
    id: Uuid,
    store: &S,
    cache: &mut MultiplexedConnection,
) -> Result<RecipeView, Error> {
    let details = RedisValue::get_or_optional(CacheKeyType::Recipe.new(id), cache, || {
        load_recipe_details(id, store)
    })
    .await?
    .ok_or_else(|| Error::not_found("No recipe exists with specified id"))?;

    project(viewer, details.value, store).await
}

/// Newest first. The interest filters only apply to authenticated viewers.
/// `limit` overrides the page size.
pub async fn fetch_recipes<S: RecipeStore>(
    viewer: &Viewer,
    filter: &RecipeFilter,
    offset: i64,
    limit: Option<i64>,
    store: &S,
) -> Result<PageContext<RecipeView>, Error> {
    let limit = page_size(limit, RECIPE_COUNT_PER_PAGE);
    let (rows, total_count) = store
        .fetch_recipes(filter, viewer.user_id(), offset, limit)
        .await?;

    let mut views = Vec::with_capacity(rows.len());
    for recipe in rows {
        if let Some(details) = load_recipe_details(recipe.id, store).await? {
            views.push(project(viewer, details, store).await?);
        }
    }

    Ok(PageContext::from_rows(views, total_count, limit, offset))
}
