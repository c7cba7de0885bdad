use async_trait::async_trait;

use super::{
    error::Error,
    schema::{
        Ingredient, InterestKind, NewIngredient, NewUser, Recipe, RecipeFilter, RecipeForm,
        RecipeIngredient, RecipeSummary, ShoppingListItem, Tag, TagForm, User, Uuid,
    },
};

/// Persistence primitives the actions are written against.
///
/// Implementations own the uniqueness rules: every `insert_*` returning
/// `bool` reports `false` when the row already existed, and recipe writes
/// are all-or-nothing. Deleting a user or recipe removes every membership,
/// subscription and composition line that references it.
#[async_trait]
pub trait RecipeStore: Send + Sync {
    async fn create_user(&self, user: NewUser) -> Result<User, Error>;
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, Error>;
    async fn delete_user(&self, id: Uuid) -> Result<bool, Error>;

    async fn insert_ingredients(&self, rows: Vec<NewIngredient>) -> Result<u64, Error>;
    async fn get_ingredients(&self, ids: &[Uuid]) -> Result<Vec<Ingredient>, Error>;
    /// Case-insensitive substring match on the name, ordered by name.
    async fn search_ingredients(&self, search: &str) -> Result<Vec<Ingredient>, Error>;

    /// `None` when the name or slug is already taken.
    async fn create_tag(&self, tag: TagForm) -> Result<Option<Tag>, Error>;
    async fn get_tags(&self, ids: &[Uuid]) -> Result<Vec<Tag>, Error>;
    async fn list_tags(&self) -> Result<Vec<Tag>, Error>;

    async fn insert_recipe(&self, author_id: Uuid, form: &RecipeForm) -> Result<Recipe, Error>;
    /// Replaces fields, composition and tags. `None` if the recipe is gone.
    async fn replace_recipe(&self, id: Uuid, form: &RecipeForm) -> Result<Option<Recipe>, Error>;
    async fn delete_recipe(&self, id: Uuid) -> Result<bool, Error>;
    async fn get_recipe(&self, id: Uuid) -> Result<Option<Recipe>, Error>;
    /// Composition lines in submission order.
    async fn list_recipe_ingredients(&self, recipe_id: Uuid)
        -> Result<Vec<RecipeIngredient>, Error>;
    async fn list_recipe_tags(&self, recipe_id: Uuid) -> Result<Vec<Tag>, Error>;
    /// Newest first. `viewer_id` scopes the favorite / cart filters. Returns
    /// the page and the total number of matches.
    async fn fetch_recipes(
        &self,
        filter: &RecipeFilter,
        viewer_id: Option<Uuid>,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Recipe>, i64), Error>;
    /// The author's newest recipes.
    async fn author_recipes(&self, author_id: Uuid, limit: i64)
        -> Result<Vec<RecipeSummary>, Error>;
    async fn count_author_recipes(&self, author_id: Uuid) -> Result<i64, Error>;

    async fn insert_interest(
        &self,
        kind: InterestKind,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<bool, Error>;
    async fn delete_interest(
        &self,
        kind: InterestKind,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<bool, Error>;
    async fn has_interest(
        &self,
        kind: InterestKind,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<bool, Error>;

    async fn insert_subscription(&self, follower_id: Uuid, author_id: Uuid)
        -> Result<bool, Error>;
    async fn delete_subscription(&self, follower_id: Uuid, author_id: Uuid)
        -> Result<bool, Error>;
    async fn is_subscribed(&self, follower_id: Uuid, author_id: Uuid) -> Result<bool, Error>;
    /// Authors followed by `follower_id` ordered by author id, with the total count.
    async fn fetch_subscriptions(
        &self,
        follower_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<User>, i64), Error>;

    /// Cart composition lines grouped by ingredient name and unit, summed.
    async fn shopping_list_totals(&self, user_id: Uuid) -> Result<Vec<ShoppingListItem>, Error>;
}
