#![allow(dead_code)]

use async_trait::async_trait;
use foodgram_sdk::{
    Error, IngredientAmount, MemoryStore, NewIngredient, NewUser, RecipeCache, RecipeForm,
    RecipeStore, TagForm, User, UserRole, Uuid, Viewer,
};

pub const FLOUR: Uuid = 1;
pub const SUGAR: Uuid = 2;
pub const MILK: Uuid = 3;
pub const EGGS: Uuid = 4;

pub const BREAKFAST: Uuid = 1;
pub const DINNER: Uuid = 2;

pub struct Fixture {
    pub store: MemoryStore,
    pub author: User,
    pub other: User,
    pub admin: User,
}

impl Fixture {
    pub async fn new() -> Self {
        let store = MemoryStore::new();

        let author = store.create_user(new_user("author", UserRole::User)).await.unwrap();
        let other = store.create_user(new_user("other", UserRole::User)).await.unwrap();
        let admin = store.create_user(new_user("admin", UserRole::Admin)).await.unwrap();

        store
            .insert_ingredients(vec![
                ingredient("Flour", "g"),
                ingredient("Sugar", "g"),
                ingredient("Milk", "ml"),
                ingredient("Eggs", "pcs"),
            ])
            .await
            .unwrap();

        store.create_tag(tag("Breakfast", "breakfast")).await.unwrap();
        store.create_tag(tag("Dinner", "dinner")).await.unwrap();

        Self {
            store,
            author,
            other,
            admin,
        }
    }

    pub async fn add_user(&self, name: &str) -> User {
        self.store
            .create_user(new_user(name, UserRole::User))
            .await
            .unwrap()
    }
}

/// Remembers what the write actions asked to evict.
#[derive(Default, Debug)]
pub struct RecordingCache {
    pub evicted: Vec<Uuid>,
    pub flushes: usize,
}

#[async_trait]
impl RecipeCache for RecordingCache {
    async fn evict_recipe(&mut self, id: Uuid) -> Result<(), Error> {
        self.evicted.push(id);
        Ok(())
    }

    async fn evict_all_recipes(&mut self) -> Result<(), Error> {
        self.flushes += 1;
        Ok(())
    }
}

pub fn viewer(user: &User) -> Viewer {
    Viewer::from(user)
}

pub fn new_user(name: &str, role: UserRole) -> NewUser {
    NewUser {
        email: format!("{name}@example.com"),
        username: name.to_string(),
        first_name: name.to_string(),
        last_name: String::from("Example"),
        role,
    }
}

pub fn ingredient(name: &str, unit: &str) -> NewIngredient {
    NewIngredient {
        name: name.to_string(),
        measurement_unit: unit.to_string(),
    }
}

pub fn tag(name: &str, slug: &str) -> TagForm {
    TagForm {
        name: name.to_string(),
        color: String::from("#49B64E"),
        slug: slug.to_string(),
    }
}

pub fn recipe_form(name: &str, lines: &[(Uuid, i32)], tags: &[Uuid]) -> RecipeForm {
    RecipeForm {
        name: name.to_string(),
        image: format!("recipes/{}.png", name.to_lowercase()),
        text: String::from("Combine and cook."),
        cooking_time: 15,
        tags: tags.to_vec(),
        ingredients: lines
            .iter()
            .map(|(id, amount)| IngredientAmount {
                id: *id,
                amount: *amount,
            })
            .collect(),
    }
}
