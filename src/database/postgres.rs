use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgConnection, Pool, Postgres, QueryBuilder};

use crate::config::Config;

use super::{
    error::{Error, QueryError},
    schema::{
        Ingredient, IngredientAmount, InterestKind, NewIngredient, NewUser, Recipe, RecipeFilter,
        RecipeForm, RecipeIngredient, RecipeRow, RecipeSummary, ShoppingListItem, Tag, TagForm,
        User, UserRow, Uuid,
    },
    store::RecipeStore,
};

/// Postgres caps a statement at 65535 bind parameters.
const BIND_LIMIT: usize = 65535;

#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &Config) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await
            .map_err(QueryError::from)?;

        log::info!(
            "Connected to postgres with {} max connections",
            config.max_connections
        );
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), Error> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| QueryError::new(format!("{e}")))?;

        Ok(())
    }

    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }
}

/// Splits `items` into chunks of at most `chunk_size`, numbering every item
/// by its position in the whole slice.
fn numbered_chunks<T>(
    items: &[T],
    chunk_size: usize,
) -> impl Iterator<Item = Vec<(i32, &T)>> + '_ {
    let chunk_size = chunk_size.max(1);
    items
        .chunks(chunk_size)
        .enumerate()
        .map(move |(index, chunk)| {
            chunk
                .iter()
                .enumerate()
                .map(|(offset, item)| ((index * chunk_size + offset) as i32, item))
                .collect()
        })
}

async fn insert_recipe_parts(
    conn: &mut PgConnection,
    recipe_id: Uuid,
    lines: &[IngredientAmount],
) -> Result<(), Error> {
    for chunk in numbered_chunks(lines, BIND_LIMIT / 4) {
        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO recipe_parts (recipe_id, ingredient_id, amount, position) ",
        );

        query_builder.push_values(chunk, |mut b, (position, line)| {
            b.push_bind(recipe_id)
                .push_bind(line.id)
                .push_bind(line.amount)
                .push_bind(position);
        });

        query_builder
            .build()
            .execute(&mut *conn)
            .await
            .map_err(QueryError::from)?;
    }

    Ok(())
}

async fn insert_recipe_tags(
    conn: &mut PgConnection,
    recipe_id: Uuid,
    tags: &[Uuid],
) -> Result<(), Error> {
    let tags: Vec<Uuid> = tags
        .iter()
        .copied()
        .collect::<BTreeSet<Uuid>>()
        .into_iter()
        .collect();

    for chunk in tags.chunks(BIND_LIMIT / 2) {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO recipe_tags_map (recipe_id, tag_id) ");

        query_builder.push_values(chunk, |mut b, tag_id| {
            b.push_bind(recipe_id).push_bind(*tag_id);
        });
        query_builder.push(" ON CONFLICT DO NOTHING");

        query_builder
            .build()
            .execute(&mut *conn)
            .await
            .map_err(QueryError::from)?;
    }

    Ok(())
}

/// Appends the listing filters to a query over `recipes r`.
fn push_recipe_filters(
    query_builder: &mut QueryBuilder<'_, Postgres>,
    filter: &RecipeFilter,
    viewer_id: Option<Uuid>,
) {
    if let Some(author) = filter.author {
        query_builder.push(" AND r.author_id = ").push_bind(author);
    }

    if !filter.tags.is_empty() {
        query_builder
            .push(
                " AND EXISTS (SELECT 1 FROM recipe_tags_map m INNER JOIN tags t ON t.id = m.tag_id \
                 WHERE m.recipe_id = r.id AND t.slug = ANY(",
            )
            .push_bind(filter.tags.to_owned())
            .push("))");
    }

    if let Some(viewer_id) = viewer_id {
        let interests = [
            (filter.is_favorited, InterestKind::Favorites),
            (filter.is_in_shopping_cart, InterestKind::ShoppingCart),
        ];

        for (_, kind) in interests.iter().filter(|(enabled, _)| *enabled) {
            query_builder
                .push(format!(
                    " AND EXISTS (SELECT 1 FROM {} i WHERE i.recipe_id = r.id AND i.user_id = ",
                    kind.table()
                ))
                .push_bind(viewer_id)
                .push(")");
        }
    }
}

fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[async_trait]
impl RecipeStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, Error> {
        let row: User = sqlx::query_as(
            "
            INSERT INTO users (email, username, first_name, last_name, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
        ",
        )
        .bind(user.email)
        .bind(user.username)
        .bind(user.first_name)
        .bind(user.last_name)
        .bind(user.role)
        .fetch_one(&self.pool)
        .await
        .map_err(QueryError::from)?;

        Ok(row)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, Error> {
        let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(row)
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_ingredients(&self, rows: Vec<NewIngredient>) -> Result<u64, Error> {
        let mut inserted = 0;

        for chunk in rows.chunks(BIND_LIMIT / 2) {
            let mut query_builder: QueryBuilder<Postgres> =
                QueryBuilder::new("INSERT INTO ingredients (name, measurement_unit) ");

            query_builder.push_values(chunk, |mut b, ingredient| {
                b.push_bind(ingredient.name.to_owned())
                    .push_bind(ingredient.measurement_unit.to_owned());
            });

            inserted += query_builder
                .build()
                .execute(&self.pool)
                .await
                .map_err(QueryError::from)?
                .rows_affected();
        }

        Ok(inserted)
    }

    async fn get_ingredients(&self, ids: &[Uuid]) -> Result<Vec<Ingredient>, Error> {
        let rows: Vec<Ingredient> =
            sqlx::query_as("SELECT * FROM ingredients WHERE id = ANY($1) ORDER BY id")
                .bind(ids.to_vec())
                .fetch_all(&self.pool)
                .await
                .map_err(QueryError::from)?;

        Ok(rows)
    }

    async fn search_ingredients(&self, search: &str) -> Result<Vec<Ingredient>, Error> {
        let rows: Vec<Ingredient> =
            sqlx::query_as("SELECT * FROM ingredients WHERE name ILIKE $1 ORDER BY name, id")
                .bind(like_pattern(search))
                .fetch_all(&self.pool)
                .await
                .map_err(QueryError::from)?;

        Ok(rows)
    }

    async fn create_tag(&self, tag: TagForm) -> Result<Option<Tag>, Error> {
        let row: Option<Tag> = sqlx::query_as(
            "
            INSERT INTO tags (name, color, slug)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING RETURNING *
        ",
        )
        .bind(tag.name)
        .bind(tag.color)
        .bind(tag.slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(QueryError::from)?;

        Ok(row)
    }

    async fn get_tags(&self, ids: &[Uuid]) -> Result<Vec<Tag>, Error> {
        let rows: Vec<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = ANY($1) ORDER BY id")
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(rows)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, Error> {
        let rows: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(rows)
    }

    async fn insert_recipe(&self, author_id: Uuid, form: &RecipeForm) -> Result<Recipe, Error> {
        let mut tx = self.pool.begin().await.map_err(QueryError::from)?;

        let recipe: Recipe = sqlx::query_as(
            "
            INSERT INTO recipes (author_id, name, image, text, cooking_time)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
        ",
        )
        .bind(author_id)
        .bind(&form.name)
        .bind(&form.image)
        .bind(&form.text)
        .bind(form.cooking_time)
        .fetch_one(&mut *tx)
        .await
        .map_err(QueryError::from)?;

        insert_recipe_parts(&mut tx, recipe.id, &form.ingredients).await?;
        insert_recipe_tags(&mut tx, recipe.id, &form.tags).await?;

        tx.commit().await.map_err(QueryError::from)?;

        Ok(recipe)
    }

    async fn replace_recipe(&self, id: Uuid, form: &RecipeForm) -> Result<Option<Recipe>, Error> {
        let mut tx = self.pool.begin().await.map_err(QueryError::from)?;

        let recipe: Option<Recipe> = sqlx::query_as(
            "
            UPDATE recipes SET name = $1, image = $2, text = $3, cooking_time = $4
            WHERE id = $5
            RETURNING *
        ",
        )
        .bind(&form.name)
        .bind(&form.image)
        .bind(&form.text)
        .bind(form.cooking_time)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(QueryError::from)?;

        let Some(recipe) = recipe else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM recipe_parts WHERE recipe_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(QueryError::from)?;
        insert_recipe_parts(&mut tx, id, &form.ingredients).await?;

        sqlx::query("DELETE FROM recipe_tags_map WHERE recipe_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(QueryError::from)?;
        insert_recipe_tags(&mut tx, id, &form.tags).await?;

        tx.commit().await.map_err(QueryError::from)?;

        Ok(Some(recipe))
    }

    async fn delete_recipe(&self, id: Uuid) -> Result<bool, Error> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_recipe(&self, id: Uuid) -> Result<Option<Recipe>, Error> {
        let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(row)
    }

    async fn list_recipe_ingredients(
        &self,
        recipe_id: Uuid,
    ) -> Result<Vec<RecipeIngredient>, Error> {
        let rows: Vec<RecipeIngredient> = sqlx::query_as("
            SELECT i.id AS id, i.name AS name, i.measurement_unit AS measurement_unit, rp.amount AS amount
            FROM recipe_parts rp
            INNER JOIN ingredients i ON i.id = rp.ingredient_id
            WHERE rp.recipe_id = $1
            ORDER BY rp.position
        ")
        .bind(recipe_id)
        .fetch_all(&self.pool)
        .await
        .map_err(QueryError::from)?;

        Ok(rows)
    }

    async fn list_recipe_tags(&self, recipe_id: Uuid) -> Result<Vec<Tag>, Error> {
        let rows: Vec<Tag> = sqlx::query_as(
            "
            SELECT t.*
            FROM recipe_tags_map m
            INNER JOIN tags t ON t.id = m.tag_id
            WHERE m.recipe_id = $1
            ORDER BY t.id
        ",
        )
        .bind(recipe_id)
        .fetch_all(&self.pool)
        .await
        .map_err(QueryError::from)?;

        Ok(rows)
    }

    async fn fetch_recipes(
        &self,
        filter: &RecipeFilter,
        viewer_id: Option<Uuid>,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Recipe>, i64), Error> {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT r.*, COUNT(*) OVER() AS count FROM recipes r WHERE TRUE");
        push_recipe_filters(&mut query_builder, filter, viewer_id);

        query_builder
            .push(" ORDER BY r.published_at DESC, r.id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows: Vec<RecipeRow> = query_builder
            .build_query_as::<RecipeRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(QueryError::from)?;

        let total_count = match rows.first() {
            Some(row) => row.count,
            None if offset > 0 => {
                let mut count_builder: QueryBuilder<Postgres> =
                    QueryBuilder::new("SELECT COUNT(*) FROM recipes r WHERE TRUE");
                push_recipe_filters(&mut count_builder, filter, viewer_id);

                count_builder
                    .build_query_scalar::<i64>()
                    .fetch_one(&self.pool)
                    .await
                    .map_err(QueryError::from)?
            }
            None => 0,
        };
        Ok((rows.into_iter().map(|row| row.recipe).collect(), total_count))
    }

    async fn author_recipes(
        &self,
        author_id: Uuid,
        limit: i64,
    ) -> Result<Vec<RecipeSummary>, Error> {
        let rows: Vec<RecipeSummary> = sqlx::query_as(
            "
            SELECT id, name, image, cooking_time FROM recipes
            WHERE author_id = $1
            ORDER BY published_at DESC, id DESC
            LIMIT $2
        ",
        )
        .bind(author_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(QueryError::from)?;

        Ok(rows)
    }

    async fn count_author_recipes(&self, author_id: Uuid) -> Result<i64, Error> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
            .bind(author_id)
            .fetch_one(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(count.0)
    }

    async fn insert_interest(
        &self,
        kind: InterestKind,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<bool, Error> {
        let result = sqlx::query(&format!(
            "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            kind.table()
        ))
        .bind(user_id)
        .bind(recipe_id)
        .execute(&self.pool)
        .await
        .map_err(QueryError::from)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_interest(
        &self,
        kind: InterestKind,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<bool, Error> {
        let result = sqlx::query(&format!(
            "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
            kind.table()
        ))
        .bind(user_id)
        .bind(recipe_id)
        .execute(&self.pool)
        .await
        .map_err(QueryError::from)?;

        Ok(result.rows_affected() > 0)
    }

    async fn has_interest(
        &self,
        kind: InterestKind,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<bool, Error> {
        let row: Option<(i32,)> = sqlx::query_as(&format!(
            "SELECT recipe_id FROM {} WHERE user_id = $1 AND recipe_id = $2",
            kind.table()
        ))
        .bind(user_id)
        .bind(recipe_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(QueryError::from)?;

        Ok(row.is_some())
    }

    async fn insert_subscription(&self, follower_id: Uuid, author_id: Uuid) -> Result<bool, Error> {
        let result = sqlx::query(
            "INSERT INTO subscriptions (follower_id, author_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(follower_id)
        .bind(author_id)
        .execute(&self.pool)
        .await
        .map_err(QueryError::from)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_subscription(&self, follower_id: Uuid, author_id: Uuid) -> Result<bool, Error> {
        let result =
            sqlx::query("DELETE FROM subscriptions WHERE follower_id = $1 AND author_id = $2")
                .bind(follower_id)
                .bind(author_id)
                .execute(&self.pool)
                .await
                .map_err(QueryError::from)?;

        Ok(result.rows_affected() > 0)
    }

    async fn is_subscribed(&self, follower_id: Uuid, author_id: Uuid) -> Result<bool, Error> {
        let row: Option<(i32,)> = sqlx::query_as(
            "SELECT author_id FROM subscriptions WHERE follower_id = $1 AND author_id = $2",
        )
        .bind(follower_id)
        .bind(author_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(QueryError::from)?;

        Ok(row.is_some())
    }

    async fn fetch_subscriptions(
        &self,
        follower_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<User>, i64), Error> {
        let rows: Vec<UserRow> = sqlx::query_as(
            "
            SELECT u.*, COUNT(*) OVER() AS count
            FROM subscriptions s
            INNER JOIN users u ON u.id = s.author_id
            WHERE s.follower_id = $1
            ORDER BY u.id
            LIMIT $2 OFFSET $3
        ",
        )
        .bind(follower_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(QueryError::from)?;

        let total_count = match rows.first() {
            Some(row) => row.count,
            None if offset > 0 => {
                sqlx::query_scalar("SELECT COUNT(*) FROM subscriptions WHERE follower_id = $1")
                    .bind(follower_id)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(QueryError::from)?
            }
            None => 0,
        };
        Ok((rows.into_iter().map(|row| row.user).collect(), total_count))
    }

    async fn shopping_list_totals(&self, user_id: Uuid) -> Result<Vec<ShoppingListItem>, Error> {
        let rows: Vec<ShoppingListItem> = sqlx::query_as(
            "
            SELECT i.name AS name, i.measurement_unit AS measurement_unit, SUM(rp.amount) AS amount
            FROM shopping_cart c
            INNER JOIN recipe_parts rp ON rp.recipe_id = c.recipe_id
            INNER JOIN ingredients i ON i.id = rp.ingredient_id
            WHERE c.user_id = $1
            GROUP BY i.name, i.measurement_unit
            ORDER BY i.name, i.measurement_unit
        ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(QueryError::from)?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::{like_pattern, numbered_chunks};

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("flour"), "%flour%");
        assert_eq!(like_pattern("100%_rye"), "%100\\%\\_rye%");
    }

    #[test]
    fn chunking_keeps_every_line_in_order() {
        let lines: Vec<char> = "abcdefg".chars().collect();

        let chunks: Vec<Vec<(i32, &char)>> = numbered_chunks(&lines, 3).collect();

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2], vec![(6, &'g')]);
        let flattened: Vec<(i32, char)> = chunks
            .into_iter()
            .flatten()
            .map(|(position, line)| (position, *line))
            .collect();
        assert_eq!(
            flattened,
            lines
                .iter()
                .enumerate()
                .map(|(n, line)| (n as i32, *line))
                .collect::<Vec<_>>()
        );
    }
}
