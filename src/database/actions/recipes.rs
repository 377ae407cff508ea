use std::collections::HashMap;

use crate::{
    error::{Error, QueryError},
    schema::{
        AssociationKind, LinkedEntity, NamedEntity, Recipe, RecipeDetail, RecipeFilter, Uuid,
    },
};

use sqlx::{PgConnection, Pool, Postgres};

pub async fn fetch_recipes(
    owner: Uuid,
    filter: &RecipeFilter,
    pool: &Pool<Postgres>,
) -> Result<Vec<Recipe>, Error> {
    let rows: Vec<Recipe> = sqlx::query_as(
        "
        SELECT r.* FROM recipes r
        WHERE r.user_id = $1
        AND ($2::INTEGER[] IS NULL OR EXISTS (
            SELECT 1 FROM recipe_tags rt WHERE rt.recipe_id = r.id AND rt.tag_id = ANY($2)
        ))
        AND ($3::INTEGER[] IS NULL OR EXISTS (
            SELECT 1 FROM recipe_ingredients ri WHERE ri.recipe_id = r.id AND ri.ingredient_id = ANY($3)
        ))
        ORDER BY r.id DESC
    ",
    )
    .bind(owner)
    .bind(filter.tags.clone())
    .bind(filter.ingredients.clone())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn get_recipe(
    owner: Uuid,
    id: Uuid,
    conn: &mut PgConnection,
) -> Result<Option<Recipe>, Error> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(owner)
        .fetch_optional(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

/// Same as [`get_recipe`] but locks the row until the transaction ends.
pub async fn get_recipe_mut(
    owner: Uuid,
    id: Uuid,
    conn: &mut PgConnection,
) -> Result<Option<Recipe>, Error> {
    let row: Option<Recipe> =
        sqlx::query_as("SELECT * FROM recipes WHERE id = $1 AND user_id = $2 FOR UPDATE")
            .bind(id)
            .bind(owner)
            .fetch_optional(&mut *conn)
            .await
            .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn create_recipe(recipe: &Recipe, conn: &mut PgConnection) -> Result<Recipe, Error> {
    let row: Recipe = sqlx::query_as(
        "
        INSERT INTO recipes (user_id, title, time_minutes, price, description, link, image)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
    ",
    )
    .bind(recipe.user_id)
    .bind(&recipe.title)
    .bind(recipe.time_minutes)
    .bind(recipe.price)
    .bind(&recipe.description)
    .bind(&recipe.link)
    .bind(&recipe.image)
    .fetch_one(&mut *conn)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn update_recipe_info(recipe: &Recipe, conn: &mut PgConnection) -> Result<(), Error> {
    sqlx::query(
        "
        UPDATE recipes SET
        title = $1,
        time_minutes = $2,
        price = $3,
        description = $4,
        link = $5
        WHERE id = $6 AND user_id = $7
    ",
    )
    .bind(&recipe.title)
    .bind(recipe.time_minutes)
    .bind(recipe.price)
    .bind(&recipe.description)
    .bind(&recipe.link)
    .bind(recipe.id)
    .bind(recipe.user_id)
    .execute(&mut *conn)
    .await
    .map_err(QueryError::from)?;

    Ok(())
}

pub async fn delete_recipe(
    owner: Uuid,
    id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Option<Recipe>, Error> {
    let row: Option<Recipe> =
        sqlx::query_as("DELETE FROM recipes WHERE id = $1 AND user_id = $2 RETURNING *")
            .bind(id)
            .bind(owner)
            .fetch_optional(pool)
            .await
            .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn set_recipe_image(
    owner: Uuid,
    id: Uuid,
    image: Option<String>,
    pool: &Pool<Postgres>,
) -> Result<Option<Recipe>, Error> {
    let row: Option<Recipe> = sqlx::query_as(
        "UPDATE recipes SET image = $3 WHERE id = $1 AND user_id = $2 RETURNING *",
    )
    .bind(id)
    .bind(owner)
    .bind(image)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn list_linked(
    recipe_ids: &[Uuid],
    kind: AssociationKind,
    conn: &mut PgConnection,
) -> Result<Vec<LinkedEntity>, Error> {
    let rows: Vec<LinkedEntity> = sqlx::query_as(&format!(
        "
        SELECT l.recipe_id AS recipe_id, e.id AS id, e.user_id AS user_id, e.name AS name
        FROM {link} l
        INNER JOIN {table} e ON e.id = l.{column}
        WHERE l.recipe_id = ANY($1)
        ORDER BY e.id
    ",
        link = kind.link_table(),
        table = kind.table(),
        column = kind.link_column(),
    ))
    .bind(recipe_ids.to_vec())
    .fetch_all(&mut *conn)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn add_to_recipe(
    recipe_id: Uuid,
    kind: AssociationKind,
    entity_id: Uuid,
    conn: &mut PgConnection,
) -> Result<(), Error> {
    sqlx::query(&format!(
        "INSERT INTO {} (recipe_id, {}) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        kind.link_table(),
        kind.link_column()
    ))
    .bind(recipe_id)
    .bind(entity_id)
    .execute(&mut *conn)
    .await
    .map_err(QueryError::from)?;

    Ok(())
}

pub async fn remove_from_recipe(
    recipe_id: Uuid,
    kind: AssociationKind,
    entity_ids: &[Uuid],
    conn: &mut PgConnection,
) -> Result<(), Error> {
    sqlx::query(&format!(
        "DELETE FROM {} WHERE recipe_id = $1 AND {} = ANY($2)",
        kind.link_table(),
        kind.link_column()
    ))
    .bind(recipe_id)
    .bind(entity_ids.to_vec())
    .execute(&mut *conn)
    .await
    .map_err(QueryError::from)?;

    Ok(())
}

/// Attaches tags and ingredients to each recipe, keeping the input order.
pub async fn load_details(
    recipes: Vec<Recipe>,
    conn: &mut PgConnection,
) -> Result<Vec<RecipeDetail>, Error> {
    if recipes.is_empty() {
        return Ok(vec![]);
    }

    let ids: Vec<Uuid> = recipes.iter().map(|r| r.id).collect();
    let mut tags = group_by_recipe(list_linked(&ids, AssociationKind::Tag, &mut *conn).await?);
    let mut ingredients =
        group_by_recipe(list_linked(&ids, AssociationKind::Ingredient, &mut *conn).await?);

    Ok(recipes
        .into_iter()
        .map(|recipe| RecipeDetail {
            tags: tags.remove(&recipe.id).unwrap_or_default(),
            ingredients: ingredients.remove(&recipe.id).unwrap_or_default(),
            recipe,
        })
        .collect())
}

fn group_by_recipe(rows: Vec<LinkedEntity>) -> HashMap<Uuid, Vec<NamedEntity>> {
    let mut hashmap: HashMap<Uuid, Vec<NamedEntity>> = HashMap::new();
    rows.into_iter().for_each(|row| {
        hashmap.entry(row.recipe_id).or_default().push(row.into());
    });

    hashmap
}
