use crate::{
    error::{Error, QueryError},
    schema::{AssociationKind, NamedEntity, Uuid},
};

use sqlx::{PgConnection, Pool, Postgres};

pub async fn list_named(
    owner: Uuid,
    kind: AssociationKind,
    assigned_only: bool,
    pool: &Pool<Postgres>,
) -> Result<Vec<NamedEntity>, Error> {
    let table = kind.table();
    let assigned = if assigned_only {
        format!(
            "AND EXISTS (SELECT 1 FROM {} l WHERE l.{} = e.id)",
            kind.link_table(),
            kind.link_column()
        )
    } else {
        String::new()
    };

    let list: Vec<NamedEntity> = sqlx::query_as(&format!(
        "SELECT e.id, e.user_id, e.name FROM {table} e WHERE e.user_id = $1 {assigned} ORDER BY e.name DESC"
    ))
    .bind(owner)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(list)
}

pub async fn get_named(
    owner: Uuid,
    kind: AssociationKind,
    id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Option<NamedEntity>, Error> {
    let row: Option<NamedEntity> = sqlx::query_as(&format!(
        "SELECT id, user_id, name FROM {} WHERE id = $1 AND user_id = $2",
        kind.table()
    ))
    .bind(id)
    .bind(owner)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn create_named(
    owner: Uuid,
    kind: AssociationKind,
    name: &str,
    pool: &Pool<Postgres>,
) -> Result<NamedEntity, Error> {
    let row: NamedEntity = sqlx::query_as(&format!(
        "INSERT INTO {} (user_id, name) VALUES ($1, $2) RETURNING id, user_id, name",
        kind.table()
    ))
    .bind(owner)
    .bind(name)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn rename_named(
    owner: Uuid,
    kind: AssociationKind,
    id: Uuid,
    name: &str,
    pool: &Pool<Postgres>,
) -> Result<Option<NamedEntity>, Error> {
    let row: Option<NamedEntity> = sqlx::query_as(&format!(
        "UPDATE {} SET name = $3 WHERE id = $1 AND user_id = $2 RETURNING id, user_id, name",
        kind.table()
    ))
    .bind(id)
    .bind(owner)
    .bind(name)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

/// Links cascade away with the row.
pub async fn delete_named(
    owner: Uuid,
    kind: AssociationKind,
    id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<bool, Error> {
    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE id = $1 AND user_id = $2",
        kind.table()
    ))
    .bind(id)
    .bind(owner)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(result.rows_affected() > 0)
}

/// Get-or-create by `(owner, name)`. The unique constraint makes the insert
/// a no-op when a concurrent request created the row first.
pub async fn get_or_create_named(
    owner: Uuid,
    kind: AssociationKind,
    name: &str,
    conn: &mut PgConnection,
) -> Result<NamedEntity, Error> {
    let table = kind.table();

    let inserted: Option<NamedEntity> = sqlx::query_as(&format!(
        "
        INSERT INTO {table} (user_id, name) VALUES ($1, $2)
        ON CONFLICT (user_id, name) DO NOTHING
        RETURNING id, user_id, name
    "
    ))
    .bind(owner)
    .bind(name)
    .fetch_optional(&mut *conn)
    .await
    .map_err(QueryError::from)?;

    if let Some(entity) = inserted {
        log::debug!("Created {} {:?} for user {owner}", kind.label(), name);
        return Ok(entity);
    }

    let existing: NamedEntity = sqlx::query_as(&format!(
        "SELECT id, user_id, name FROM {table} WHERE user_id = $1 AND name = $2"
    ))
    .bind(owner)
    .bind(name)
    .fetch_one(&mut *conn)
    .await
    .map_err(QueryError::from)?;

    Ok(existing)
}
