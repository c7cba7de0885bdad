use crate::{
    cache::cache::RecipeCache,
    error::Error,
    permissions::ActionType,
    schema::{NewUser, User, Uuid},
    session::Viewer,
    store::RecipeStore,
};

pub async fn get_user<S: RecipeStore>(id: Uuid, store: &S) -> Result<User, Error> {
    store
        .get_user(id)
        .await?
        .ok_or_else(|| Error::not_found("No user exists with specified id"))
}

/// Registers a user record for an identity the provider already vouched for.
/// A taken email or username fails with `AlreadyExists`.
pub async fn create_user<S: RecipeStore>(user: NewUser, store: &S) -> Result<User, Error> {
    let user = store.create_user(user).await?;
    log::info!("Registered user {} ({})", user.username, user.id);

    Ok(user)
}

/// Users may delete themselves, admins anyone. Recipes, memberships and
/// subscriptions of the user go with it, so every cached recipe is dropped.
pub async fn delete_user<S: RecipeStore>(
    viewer: &Viewer,
    id: Uuid,
    store: &S,
    cache: Option<&mut dyn RecipeCache>,
) -> Result<(), Error> {
    let session = viewer.authorize(ActionType::ManageOwnAccount)?;
    if session.user_id != id {
        session.authenticate(ActionType::ManageUsers)?;
    }

    if !store.delete_user(id).await? {
        return Err(Error::not_found("No user exists with specified id"));
    }

    log::info!("User {id} deleted by {}", session.user_id);

    if let Some(cache) = cache {
        cache.evict_all_recipes().await?;
    }

    Ok(())
}
