use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::{
    actions::shopping_list::sum_by_ingredient,
    error::{Error, QueryError, RECIPE_PARTS_UNIQUE_CONSTRAINT},
    schema::{
        Ingredient, IngredientAmount, InterestKind, NewIngredient, NewUser, Recipe, RecipeFilter,
        RecipeForm, RecipeIngredient, RecipeSummary, ShoppingListItem, Tag, TagForm, User, Uuid,
    },
    store::RecipeStore,
};
use crate::constants::{MIN_COOKING_TIME, MIN_INGREDIENT_AMOUNT};

#[derive(Default)]
struct State {
    user_seq: Uuid,
    ingredient_seq: Uuid,
    tag_seq: Uuid,
    recipe_seq: Uuid,

    users: BTreeMap<Uuid, User>,
    ingredients: BTreeMap<Uuid, Ingredient>,
    tags: BTreeMap<Uuid, Tag>,
    recipes: BTreeMap<Uuid, Recipe>,
    recipe_parts: BTreeMap<Uuid, Vec<IngredientAmount>>,
    recipe_tags: BTreeMap<Uuid, BTreeSet<Uuid>>,
    /// `(user_id, recipe_id)` per interest kind.
    interests: BTreeMap<InterestKind, BTreeSet<(Uuid, Uuid)>>,
    /// `(follower_id, author_id)`.
    subscriptions: BTreeSet<(Uuid, Uuid)>,
}

fn next_id(seq: &mut Uuid) -> Uuid {
    *seq += 1;
    *seq
}

fn violation(constraint: &str) -> Error {
    QueryError::unique(
        format!("duplicate key value violates unique constraint \"{constraint}\""),
        Some(constraint),
    )
    .into()
}

fn foreign_key(table: &str) -> Error {
    QueryError::new(format!(
        "insert or update violates foreign key constraint on \"{table}\""
    ))
    .into()
}

fn check(constraint: &str) -> Error {
    QueryError::new(format!("new row violates check constraint \"{constraint}\"")).into()
}

impl State {
    /// Mirrors the column and foreign key constraints of a recipe write.
    fn check_recipe_form(&self, form: &RecipeForm) -> Result<(), Error> {
        if form.cooking_time < MIN_COOKING_TIME {
            return Err(check("recipes_cooking_time_check"));
        }

        let mut seen = BTreeSet::new();
        for line in &form.ingredients {
            if line.amount < MIN_INGREDIENT_AMOUNT {
                return Err(check("recipe_parts_amount_check"));
            }
            if !self.ingredients.contains_key(&line.id) {
                return Err(foreign_key("recipe_parts"));
            }
            if !seen.insert(line.id) {
                return Err(violation(RECIPE_PARTS_UNIQUE_CONSTRAINT));
            }
        }

        if form.tags.iter().any(|id| !self.tags.contains_key(id)) {
            return Err(foreign_key("recipe_tags_map"));
        }

        Ok(())
    }

    fn write_composition(&mut self, recipe_id: Uuid, form: &RecipeForm) {
        self.recipe_parts
            .insert(recipe_id, form.ingredients.to_owned());
        self.recipe_tags
            .insert(recipe_id, form.tags.iter().copied().collect());
    }

    fn remove_recipe(&mut self, recipe_id: Uuid) -> bool {
        if self.recipes.remove(&recipe_id).is_none() {
            return false;
        }

        self.recipe_parts.remove(&recipe_id);
        self.recipe_tags.remove(&recipe_id);
        for members in self.interests.values_mut() {
            members.retain(|(_, recipe)| *recipe != recipe_id);
        }
        true
    }

    fn has_interest(&self, kind: InterestKind, user_id: Uuid, recipe_id: Uuid) -> bool {
        self.interests
            .get(&kind)
            .is_some_and(|members| members.contains(&(user_id, recipe_id)))
    }

    fn recipe_lines(&self, recipe_id: Uuid) -> Vec<RecipeIngredient> {
        self.recipe_parts
            .get(&recipe_id)
            .into_iter()
            .flatten()
            .filter_map(|line| {
                self.ingredients.get(&line.id).map(|i| RecipeIngredient {
                    id: i.id,
                    name: i.name.to_owned(),
                    measurement_unit: i.measurement_unit.to_owned(),
                    amount: line.amount,
                })
            })
            .collect()
    }

    fn matches(&self, recipe: &Recipe, filter: &RecipeFilter, viewer_id: Option<Uuid>) -> bool {
        if filter.author.is_some_and(|author| author != recipe.author_id) {
            return false;
        }

        if !filter.tags.is_empty() {
            let tagged = self
                .recipe_tags
                .get(&recipe.id)
                .into_iter()
                .flatten()
                .filter_map(|id| self.tags.get(id))
                .any(|tag| filter.tags.contains(&tag.slug));
            if !tagged {
                return false;
            }
        }

        if let Some(viewer_id) = viewer_id {
            if filter.is_favorited
                && !self.has_interest(InterestKind::Favorites, viewer_id, recipe.id)
            {
                return false;
            }
            if filter.is_in_shopping_cart
                && !self.has_interest(InterestKind::ShoppingCart, viewer_id, recipe.id)
            {
                return false;
            }
        }

        true
    }

    fn newest_first(&self) -> Vec<&Recipe> {
        let mut recipes: Vec<&Recipe> = self.recipes.values().collect();
        recipes.sort_by(|a, b| {
            b.published_at
                .cmp(&a.published_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        recipes
    }
}

fn page<T>(rows: Vec<T>, offset: i64, limit: i64) -> (Vec<T>, i64) {
    let total = rows.len() as i64;
    let rows = rows
        .into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect();
    (rows, total)
}

/// Process local [`RecipeStore`] with the same uniqueness and cascade rules
/// as the Postgres schema. Every operation holds the lock for its whole
/// duration, so recipe writes are atomic.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecipeStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, Error> {
        let mut state = self.state.lock().await;

        if state.users.values().any(|u| u.email == user.email) {
            return Err(violation("users_email_key"));
        }
        if state.users.values().any(|u| u.username == user.username) {
            return Err(violation("users_username_key"));
        }

        let user = User {
            id: next_id(&mut state.user_seq),
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
        };
        state.users.insert(user.id, user.to_owned());

        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, Error> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, Error> {
        let mut state = self.state.lock().await;

        if state.users.remove(&id).is_none() {
            return Ok(false);
        }

        let authored: Vec<Uuid> = state
            .recipes
            .values()
            .filter(|recipe| recipe.author_id == id)
            .map(|recipe| recipe.id)
            .collect();
        for recipe_id in authored {
            state.remove_recipe(recipe_id);
        }

        for members in state.interests.values_mut() {
            members.retain(|(user, _)| *user != id);
        }
        state
            .subscriptions
            .retain(|(follower, author)| *follower != id && *author != id);

        Ok(true)
    }

    async fn insert_ingredients(&self, rows: Vec<NewIngredient>) -> Result<u64, Error> {
        let mut state = self.state.lock().await;
        let count = rows.len() as u64;

        for row in rows {
            let id = next_id(&mut state.ingredient_seq);
            state.ingredients.insert(
                id,
                Ingredient {
                    id,
                    name: row.name,
                    measurement_unit: row.measurement_unit,
                },
            );
        }

        Ok(count)
    }

    async fn get_ingredients(&self, ids: &[Uuid]) -> Result<Vec<Ingredient>, Error> {
        let state = self.state.lock().await;
        let ids: BTreeSet<&Uuid> = ids.iter().collect();

        Ok(ids
            .into_iter()
            .filter_map(|id| state.ingredients.get(id).cloned())
            .collect())
    }

    async fn search_ingredients(&self, search: &str) -> Result<Vec<Ingredient>, Error> {
        let state = self.state.lock().await;
        let search = search.to_lowercase();

        let mut rows: Vec<Ingredient> = state
            .ingredients
            .values()
            .filter(|i| i.name.to_lowercase().contains(&search))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

        Ok(rows)
    }

    async fn create_tag(&self, tag: TagForm) -> Result<Option<Tag>, Error> {
        let mut state = self.state.lock().await;

        let taken = state
            .tags
            .values()
            .any(|t| t.name == tag.name || t.slug == tag.slug);
        if taken {
            return Ok(None);
        }

        let tag = Tag {
            id: next_id(&mut state.tag_seq),
            name: tag.name,
            color: tag.color,
            slug: tag.slug,
        };
        state.tags.insert(tag.id, tag.to_owned());

        Ok(Some(tag))
    }

    async fn get_tags(&self, ids: &[Uuid]) -> Result<Vec<Tag>, Error> {
        let state = self.state.lock().await;
        let ids: BTreeSet<&Uuid> = ids.iter().collect();

        Ok(ids
            .into_iter()
            .filter_map(|id| state.tags.get(id).cloned())
            .collect())
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, Error> {
        Ok(self.state.lock().await.tags.values().cloned().collect())
    }

    async fn insert_recipe(&self, author_id: Uuid, form: &RecipeForm) -> Result<Recipe, Error> {
        let mut state = self.state.lock().await;

        if !state.users.contains_key(&author_id) {
            return Err(foreign_key("recipes"));
        }
        state.check_recipe_form(form)?;

        let recipe = Recipe {
            id: next_id(&mut state.recipe_seq),
            author_id,
            name: form.name.to_owned(),
            image: form.image.to_owned(),
            text: form.text.to_owned(),
            cooking_time: form.cooking_time,
            published_at: Utc::now(),
        };
        state.recipes.insert(recipe.id, recipe.to_owned());
        state.write_composition(recipe.id, form);

        Ok(recipe)
    }

    async fn replace_recipe(&self, id: Uuid, form: &RecipeForm) -> Result<Option<Recipe>, Error> {
        let mut state = self.state.lock().await;

        if !state.recipes.contains_key(&id) {
            return Ok(None);
        }
        state.check_recipe_form(form)?;

        let Some(recipe) = state.recipes.get_mut(&id) else {
            return Ok(None);
        };
        recipe.name = form.name.to_owned();
        recipe.image = form.image.to_owned();
        recipe.text = form.text.to_owned();
        recipe.cooking_time = form.cooking_time;
        let recipe = recipe.to_owned();

        state.write_composition(id, form);

        Ok(Some(recipe))
    }

    async fn delete_recipe(&self, id: Uuid) -> Result<bool, Error> {
        Ok(self.state.lock().await.remove_recipe(id))
    }

    async fn get_recipe(&self, id: Uuid) -> Result<Option<Recipe>, Error> {
        Ok(self.state.lock().await.recipes.get(&id).cloned())
    }

    async fn list_recipe_ingredients(
        &self,
        recipe_id: Uuid,
    ) -> Result<Vec<RecipeIngredient>, Error> {
        Ok(self.state.lock().await.recipe_lines(recipe_id))
    }

    async fn list_recipe_tags(&self, recipe_id: Uuid) -> Result<Vec<Tag>, Error> {
        let state = self.state.lock().await;

        Ok(state
            .recipe_tags
            .get(&recipe_id)
            .into_iter()
            .flatten()
            .filter_map(|id| state.tags.get(id).cloned())
            .collect())
    }

    async fn fetch_recipes(
        &self,
        filter: &RecipeFilter,
        viewer_id: Option<Uuid>,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Recipe>, i64), Error> {
        let state = self.state.lock().await;

        let rows: Vec<Recipe> = state
            .newest_first()
            .into_iter()
            .filter(|recipe| state.matches(recipe, filter, viewer_id))
            .cloned()
            .collect();

        Ok(page(rows, offset, limit))
    }

    async fn author_recipes(
        &self,
        author_id: Uuid,
        limit: i64,
    ) -> Result<Vec<RecipeSummary>, Error> {
        let state = self.state.lock().await;

        Ok(state
            .newest_first()
            .into_iter()
            .filter(|recipe| recipe.author_id == author_id)
            .take(limit.max(0) as usize)
            .map(RecipeSummary::from)
            .collect())
    }

    async fn count_author_recipes(&self, author_id: Uuid) -> Result<i64, Error> {
        let state = self.state.lock().await;

        Ok(state
            .recipes
            .values()
            .filter(|recipe| recipe.author_id == author_id)
            .count() as i64)
    }

    async fn insert_interest(
        &self,
        kind: InterestKind,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<bool, Error> {
        let mut state = self.state.lock().await;

        if !state.users.contains_key(&user_id) || !state.recipes.contains_key(&recipe_id) {
            return Err(foreign_key(kind.table()));
        }

        Ok(state
            .interests
            .entry(kind)
            .or_default()
            .insert((user_id, recipe_id)))
    }

    async fn delete_interest(
        &self,
        kind: InterestKind,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<bool, Error> {
        let mut state = self.state.lock().await;

        Ok(state
            .interests
            .get_mut(&kind)
            .is_some_and(|members| members.remove(&(user_id, recipe_id))))
    }

    async fn has_interest(
        &self,
        kind: InterestKind,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<bool, Error> {
        Ok(self
            .state
            .lock()
            .await
            .has_interest(kind, user_id, recipe_id))
    }

    async fn insert_subscription(&self, follower_id: Uuid, author_id: Uuid) -> Result<bool, Error> {
        let mut state = self.state.lock().await;

        if follower_id == author_id {
            return Err(check("subscriptions_check"));
        }
        if !state.users.contains_key(&follower_id) || !state.users.contains_key(&author_id) {
            return Err(foreign_key("subscriptions"));
        }

        Ok(state.subscriptions.insert((follower_id, author_id)))
    }

    async fn delete_subscription(&self, follower_id: Uuid, author_id: Uuid) -> Result<bool, Error> {
        Ok(self
            .state
            .lock()
            .await
            .subscriptions
            .remove(&(follower_id, author_id)))
    }

    async fn is_subscribed(&self, follower_id: Uuid, author_id: Uuid) -> Result<bool, Error> {
        Ok(self
            .state
            .lock()
            .await
            .subscriptions
            .contains(&(follower_id, author_id)))
    }

    async fn fetch_subscriptions(
        &self,
        follower_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<User>, i64), Error> {
        let state = self.state.lock().await;

        // BTreeSet order already sorts authors by id within one follower.
        let rows: Vec<User> = state
            .subscriptions
            .iter()
            .filter(|(follower, _)| *follower == follower_id)
            .filter_map(|(_, author)| state.users.get(author).cloned())
            .collect();

        Ok(page(rows, offset, limit))
    }

    async fn shopping_list_totals(&self, user_id: Uuid) -> Result<Vec<ShoppingListItem>, Error> {
        let state = self.state.lock().await;

        let lines = state
            .interests
            .get(&InterestKind::ShoppingCart)
            .into_iter()
            .flatten()
            .filter(|(user, _)| *user == user_id)
            .flat_map(|(_, recipe_id)| state.recipe_lines(*recipe_id));

        Ok(sum_by_ingredient(lines))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::UserRole;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            email: format!("{name}@example.com"),
            username: name.to_string(),
            first_name: name.to_string(),
            last_name: String::from("Tester"),
            role: UserRole::User,
        }
    }

    #[tokio::test]
    async fn duplicate_users_violate_unique_keys() {
        let store = MemoryStore::new();
        store.create_user(new_user("ada")).await.unwrap();

        let error = store.create_user(new_user("ada")).await.unwrap_err();
        assert!(matches!(error, Error::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn repeated_line_is_rejected_without_writing() {
        let store = MemoryStore::new();
        let author = store.create_user(new_user("ada")).await.unwrap();
        store
            .insert_ingredients(vec![NewIngredient {
                name: String::from("flour"),
                measurement_unit: String::from("g"),
            }])
            .await
            .unwrap();

        let form = RecipeForm {
            name: String::from("Bread"),
            image: String::from("bread.png"),
            text: String::from("Bake"),
            cooking_time: 60,
            tags: vec![],
            ingredients: vec![
                IngredientAmount { id: 1, amount: 100 },
                IngredientAmount { id: 1, amount: 200 },
            ],
        };

        let error = store.insert_recipe(author.id, &form).await.unwrap_err();
        assert!(matches!(
            error,
            Error::Validation(crate::error::ValidationKind::DuplicateIngredient)
        ));
        let (rows, total) = store
            .fetch_recipes(&RecipeFilter::default(), None, 0, 10)
            .await
            .unwrap();
        assert!(rows.is_empty());
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn deleting_a_user_cascades() {
        let store = MemoryStore::new();
        let ada = store.create_user(new_user("ada")).await.unwrap();
        let bob = store.create_user(new_user("bob")).await.unwrap();

        store.insert_subscription(bob.id, ada.id).await.unwrap();
        assert!(store.delete_user(ada.id).await.unwrap());

        assert!(!store.is_subscribed(bob.id, ada.id).await.unwrap());
        assert!(!store.delete_user(ada.id).await.unwrap());
    }
}
