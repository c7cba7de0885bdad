use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{constants::INTEREST_KINDS, error::TypeError};

pub type Uuid = i32;

#[derive(
    Clone, Debug, PartialEq, PartialOrd, sqlx::Type, Serialize, Eq, Ord, Hash, Deserialize,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Admin,
}

impl TryFrom<Value> for UserRole {
    type Error = TypeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value.as_str() {
            Some(value) => match value {
                "user" => Ok(Self::User),
                "admin" => Ok(Self::Admin),
                _ => Err(TypeError::new("Invalid variant")),
            },
            None => Err(TypeError::new("Failed to parse value as string")),
        }
    }
}

/// The two per-user recipe relations. Both share one storage shape: a
/// unique `(user_id, recipe_id)` pair in the table named by [`InterestKind::table`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterestKind {
    Favorites,
    ShoppingCart,
}

impl InterestKind {
    pub fn table(&self) -> &'static str {
        match self {
            InterestKind::Favorites => "favorites",
            InterestKind::ShoppingCart => "shopping_cart",
        }
    }

    pub fn label(&self) -> &'static str {
        INTEREST_KINDS
            .iter()
            .find(|(table, _)| *table == self.table())
            .map(|(_, label)| *label)
            .unwrap_or("Interest set")
    }
}

impl TryFrom<Value> for InterestKind {
    type Error = TypeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value.as_str() {
            Some(value) => match value {
                "favorites" => Ok(Self::Favorites),
                "shopping_cart" => Ok(Self::ShoppingCart),
                _ => Err(TypeError::new("Invalid variant")),
            },
            None => Err(TypeError::new("Failed to parse value as string")),
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRow {
    #[sqlx(flatten)]
    pub user: User,
    pub count: i64,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
}

/// One record of the ingredient catalog fixture.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewIngredient {
    pub name: String,
    pub measurement_unit: String,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagForm {
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recipe {
    pub id: Uuid,
    pub author_id: Uuid,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub published_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecipeRow {
    #[sqlx(flatten)]
    pub recipe: Recipe,
    pub count: i64,
}

/// Compact projection returned by interest set writes and author previews.
#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecipeSummary {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl From<&Recipe> for RecipeSummary {
    fn from(recipe: &Recipe) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name.to_owned(),
            image: recipe.image.to_owned(),
            cooking_time: recipe.cooking_time,
        }
    }
}

/// A composition line resolved against the ingredient catalog.
#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecipeIngredient {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// A composition line as submitted by a recipe author.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngredientAmount {
    pub id: Uuid,
    pub amount: i32,
}

/// Everything a recipe write carries. Writes always replace the whole
/// composition and tag set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecipeForm {
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub tags: Vec<Uuid>,
    pub ingredients: Vec<IngredientAmount>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecipeFilter {
    pub author: Option<Uuid>,
    /// Tag slugs; a recipe matches when it carries any of them.
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_favorited: bool,
    #[serde(default)]
    pub is_in_shopping_cart: bool,
}

/// Viewer independent recipe data. Safe to cache and share between requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecipeDetails {
    pub recipe: Recipe,
    pub author: User,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<RecipeIngredient>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViewerFlags {
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub is_subscribed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserView {
    pub email: String,
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl UserView {
    pub fn project(user: User, is_subscribed: bool) -> Self {
        Self {
            email: user.email,
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            is_subscribed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecipeView {
    pub id: Uuid,
    pub tags: Vec<Tag>,
    pub author: UserView,
    pub ingredients: Vec<RecipeIngredient>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub published_at: DateTime<Utc>,
}

impl RecipeView {
    pub fn project(details: RecipeDetails, flags: ViewerFlags) -> Self {
        let RecipeDetails {
            recipe,
            author,
            tags,
            ingredients,
        } = details;

        Self {
            id: recipe.id,
            tags,
            author: UserView::project(author, flags.is_subscribed),
            ingredients,
            is_favorited: flags.is_favorited,
            is_in_shopping_cart: flags.is_in_shopping_cart,
            name: recipe.name,
            image: recipe.image,
            text: recipe.text,
            cooking_time: recipe.cooking_time,
            published_at: recipe.published_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthorProfile {
    pub email: String,
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
    pub recipes: Vec<RecipeSummary>,
    pub recipes_count: i64,
}

impl AuthorProfile {
    pub fn project(
        user: User,
        is_subscribed: bool,
        recipes: Vec<RecipeSummary>,
        recipes_count: i64,
    ) -> Self {
        Self {
            email: user.email,
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            is_subscribed,
            recipes,
            recipes_count,
        }
    }
}

/// One aggregated line of a shopping list.
#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShoppingListItem {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn interest_kinds_have_distinct_tables() {
        assert_eq!(InterestKind::Favorites.table(), "favorites");
        assert_eq!(InterestKind::ShoppingCart.table(), "shopping_cart");
        assert_eq!(InterestKind::ShoppingCart.label(), "Shopping cart");
        assert_eq!(
            InterestKind::try_from(json!("shopping_cart")),
            Ok(InterestKind::ShoppingCart)
        );
        assert!(InterestKind::try_from(json!("cart")).is_err());
    }

    #[test]
    fn recipe_view_takes_flags_from_viewer() {
        let details = RecipeDetails {
            recipe: Recipe {
                id: 4,
                author_id: 1,
                name: String::from("Pancakes"),
                image: String::from("recipes/pancakes.png"),
                text: String::from("Mix and fry"),
                cooking_time: 20,
                published_at: Utc::now(),
            },
            author: User {
                id: 1,
                email: String::from("chef@example.com"),
                username: String::from("chef"),
                first_name: String::from("Ada"),
                last_name: String::from("Cook"),
                role: UserRole::User,
            },
            tags: vec![],
            ingredients: vec![RecipeIngredient {
                id: 7,
                name: String::from("Flour"),
                measurement_unit: String::from("g"),
                amount: 200,
            }],
        };

        let view = RecipeView::project(
            details,
            ViewerFlags {
                is_favorited: true,
                is_in_shopping_cart: false,
                is_subscribed: true,
            },
        );

        assert_eq!(view.id, 4);
        assert!(view.is_favorited);
        assert!(!view.is_in_shopping_cart);
        assert!(view.author.is_subscribed);
        assert_eq!(view.ingredients[0].amount, 200);
    }
}
