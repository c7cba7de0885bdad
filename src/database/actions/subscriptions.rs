use crate::{
    constants::{RECIPE_PREVIEW_LIMIT, SUBSCRIPTION_COUNT_PER_PAGE},
    error::Error,
    pagination::{page_size, PageContext},
    permissions::ActionType,
    schema::{AuthorProfile, User, Uuid},
    session::Viewer,
    store::RecipeStore,
};

use super::users::get_user;

async fn author_profile<S: RecipeStore>(
    user: User,
    is_subscribed: bool,
    store: &S,
) -> Result<AuthorProfile, Error> {
    let recipes = store.author_recipes(user.id, RECIPE_PREVIEW_LIMIT).await?;
    let recipes_count = store.count_author_recipes(user.id).await?;

    Ok(AuthorProfile::project(
        user,
        is_subscribed,
        recipes,
        recipes_count,
    ))
}

/// Any user's profile, with `is_subscribed` relative to the viewer.
pub async fn get_user_profile<S: RecipeStore>(
    viewer: &Viewer,
    user_id: Uuid,
    store: &S,
) -> Result<AuthorProfile, Error> {
    let user = get_user(user_id, store).await?;

    let is_subscribed = match viewer.user_id() {
        Some(follower_id) => store.is_subscribed(follower_id, user_id).await?,
        None => false,
    };

    author_profile(user, is_subscribed, store).await
}

pub async fn subscribe<S: RecipeStore>(
    viewer: &Viewer,
    author_id: Uuid,
    store: &S,
) -> Result<AuthorProfile, Error> {
    let session = viewer.authorize(ActionType::ManageOwnSubscriptions)?;

    if session.user_id == author_id {
        return Err(Error::SelfSubscription(String::from(
            "You can't subscribe to yourself",
        )));
    }

    let author = get_user(author_id, store).await?;

    if store.is_subscribed(session.user_id, author_id).await? {
        return Err(Error::already_exists(
            "You are already subscribed to this user",
        ));
    }

    if !store
        .insert_subscription(session.user_id, author_id)
        .await?
    {
        return Err(Error::already_exists(
            "You are already subscribed to this user",
        ));
    }

    log::debug!("User {} subscribed to {author_id}", session.user_id);
    author_profile(author, true, store).await
}

pub async fn unsubscribe<S: RecipeStore>(
    viewer: &Viewer,
    author_id: Uuid,
    store: &S,
) -> Result<(), Error> {
    let session = viewer.authorize(ActionType::ManageOwnSubscriptions)?;

    if session.user_id == author_id {
        return Err(Error::SelfSubscription(String::from(
            "You can't unsubscribe from yourself",
        )));
    }

    if !store.delete_subscription(session.user_id, author_id).await? {
        return Err(Error::not_found("You are not subscribed to this user"));
    }

    log::debug!("User {} unsubscribed from {author_id}", session.user_id);
    Ok(())
}

/// Authors the viewer follows, ordered by author id. `limit` overrides the
/// page size.
pub async fn fetch_subscriptions<S: RecipeStore>(
    viewer: &Viewer,
    offset: i64,
    limit: Option<i64>,
    store: &S,
) -> Result<PageContext<AuthorProfile>, Error> {
    let session = viewer.authorize(ActionType::ManageOwnSubscriptions)?;
    let limit = page_size(limit, SUBSCRIPTION_COUNT_PER_PAGE);

    let (rows, total_count) = store
        .fetch_subscriptions(session.user_id, offset, limit)
        .await?;

    let mut profiles = Vec::with_capacity(rows.len());
    for author in rows {
        profiles.push(author_profile(author, true, store).await?);
    }

    Ok(PageContext::from_rows(profiles, total_count, limit, offset))
}
