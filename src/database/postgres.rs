use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgConnection, Pool, Postgres};

use super::{
    actions,
    error::{Error, QueryError},
    form::RecipeChanges,
    reconcile::apply_associations,
    schema::{
        AssociationKind, NamedEntity, NewUser, Recipe, RecipeDetail, RecipeFilter, User,
        UserChanges, Uuid,
    },
    store::{AssociationStore, Store},
};

/// [`Store`] backed by PostgreSQL.
#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Opens the pool and brings the schema up to date.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(QueryError::from)?;

        sqlx::migrate!()
            .run(&pool)
            .await
            .map_err(|e| QueryError::from(sqlx::Error::from(e)))?;

        log::info!("Connected to database, migrations applied");
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl AssociationStore for PgConnection {
    async fn linked(
        &mut self,
        recipe_id: Uuid,
        kind: AssociationKind,
    ) -> Result<Vec<NamedEntity>, Error> {
        let rows = actions::list_linked(&[recipe_id], kind, self).await?;
        Ok(rows.into_iter().map(NamedEntity::from).collect())
    }

    async fn get_or_create(
        &mut self,
        owner: Uuid,
        kind: AssociationKind,
        name: &str,
    ) -> Result<NamedEntity, Error> {
        actions::get_or_create_named(owner, kind, name, self).await
    }

    async fn link(
        &mut self,
        recipe_id: Uuid,
        kind: AssociationKind,
        entity_id: Uuid,
    ) -> Result<(), Error> {
        actions::add_to_recipe(recipe_id, kind, entity_id, self).await
    }

    async fn unlink(
        &mut self,
        recipe_id: Uuid,
        kind: AssociationKind,
        entity_ids: &[Uuid],
    ) -> Result<(), Error> {
        actions::remove_from_recipe(recipe_id, kind, entity_ids, self).await
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<Option<User>, Error> {
        actions::register_user(user, &self.pool).await
    }

    async fn get_user(&self, email: &str) -> Result<Option<User>, Error> {
        actions::get_user(&self.pool, email).await
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, Error> {
        actions::get_user_by_id(&self.pool, user_id).await
    }

    async fn update_user(
        &self,
        user_id: Uuid,
        changes: UserChanges,
    ) -> Result<Option<User>, Error> {
        actions::update_user(user_id, changes, &self.pool).await
    }

    async fn list_named(
        &self,
        owner: Uuid,
        kind: AssociationKind,
        assigned_only: bool,
    ) -> Result<Vec<NamedEntity>, Error> {
        actions::list_named(owner, kind, assigned_only, &self.pool).await
    }

    async fn get_named(
        &self,
        owner: Uuid,
        kind: AssociationKind,
        id: Uuid,
    ) -> Result<Option<NamedEntity>, Error> {
        actions::get_named(owner, kind, id, &self.pool).await
    }

    async fn create_named(
        &self,
        owner: Uuid,
        kind: AssociationKind,
        name: &str,
    ) -> Result<NamedEntity, Error> {
        actions::create_named(owner, kind, name, &self.pool).await
    }

    async fn rename_named(
        &self,
        owner: Uuid,
        kind: AssociationKind,
        id: Uuid,
        name: &str,
    ) -> Result<Option<NamedEntity>, Error> {
        actions::rename_named(owner, kind, id, name, &self.pool).await
    }

    async fn delete_named(
        &self,
        owner: Uuid,
        kind: AssociationKind,
        id: Uuid,
    ) -> Result<bool, Error> {
        actions::delete_named(owner, kind, id, &self.pool).await
    }

    async fn list_recipes(
        &self,
        owner: Uuid,
        filter: &RecipeFilter,
    ) -> Result<Vec<RecipeDetail>, Error> {
        let recipes = actions::fetch_recipes(owner, filter, &self.pool).await?;
        let mut conn = self.pool.acquire().await.map_err(QueryError::from)?;

        actions::load_details(recipes, &mut conn).await
    }

    async fn get_recipe(&self, owner: Uuid, id: Uuid) -> Result<Option<RecipeDetail>, Error> {
        let mut conn = self.pool.acquire().await.map_err(QueryError::from)?;

        let recipe = match actions::get_recipe(owner, id, &mut conn).await? {
            Some(r) => r,
            None => return Ok(None),
        };

        Ok(actions::load_details(vec![recipe], &mut conn).await?.pop())
    }

    async fn create_recipe(
        &self,
        owner: Uuid,
        changes: RecipeChanges,
    ) -> Result<RecipeDetail, Error> {
        let mut tr = self
            .pool
            .begin()
            .await
            .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

        let mut recipe = Recipe::empty(owner);
        changes.apply(&mut recipe);
        let recipe = actions::create_recipe(&recipe, &mut tr).await?;

        apply_associations(&mut *tr, &recipe, owner, &changes).await?;

        let detail = actions::load_details(vec![recipe], &mut tr)
            .await?
            .pop()
            .ok_or_else(|| QueryError::new("Created recipe vanished".to_owned()))?;

        tr.commit()
            .await
            .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

        log::info!("User {owner} created recipe {}", detail.recipe.id);
        Ok(detail)
    }

    async fn update_recipe(
        &self,
        owner: Uuid,
        id: Uuid,
        changes: RecipeChanges,
    ) -> Result<Option<RecipeDetail>, Error> {
        let mut tr = self
            .pool
            .begin()
            .await
            .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

        let mut recipe = match actions::get_recipe_mut(owner, id, &mut tr).await? {
            Some(r) => r,
            None => return Ok(None),
        };
        changes.apply(&mut recipe);
        actions::update_recipe_info(&recipe, &mut tr).await?;

        apply_associations(&mut *tr, &recipe, owner, &changes).await?;

        let detail = actions::load_details(vec![recipe], &mut tr).await?.pop();

        tr.commit()
            .await
            .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

        Ok(detail)
    }

    async fn delete_recipe(&self, owner: Uuid, id: Uuid) -> Result<Option<Recipe>, Error> {
        actions::delete_recipe(owner, id, &self.pool).await
    }

    async fn set_recipe_image(
        &self,
        owner: Uuid,
        id: Uuid,
        image: Option<String>,
    ) -> Result<Option<Recipe>, Error> {
        actions::set_recipe_image(owner, id, image, &self.pool).await
    }
}
