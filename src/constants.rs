pub const RECIPE_COUNT_PER_PAGE: i64 = 9;
pub const SUBSCRIPTION_COUNT_PER_PAGE: i64 = 9;

/// How many of an author's newest recipes are embedded in their profile.
pub const RECIPE_PREVIEW_LIMIT: i64 = 3;

pub const MIN_INGREDIENT_AMOUNT: i32 = 1;
pub const MIN_COOKING_TIME: i32 = 1;

pub const SHOPPING_LIST_HEADER: &str = "Shopping List";
pub const SHOPPING_LIST_FILENAME: &str = "shopping_cart.txt";

pub const INTEREST_KINDS: &[(&str, &str)] = &[
    ("favorites", "Favorites"),
    ("shopping_cart", "Shopping cart"),
];
