use async_trait::async_trait;

use super::{
    error::Error,
    form::RecipeChanges,
    schema::{
        AssociationKind, NamedEntity, NewUser, Recipe, RecipeDetail, RecipeFilter, User,
        UserChanges, Uuid,
    },
};

/// Persistence used by the HTTP layer. Every recipe, tag and ingredient
/// operation is scoped to `owner`; rows of other users behave as missing.
#[async_trait]
pub trait Store: Send + Sync {
    /// Returns `None` when the email is already registered.
    async fn create_user(&self, user: NewUser) -> Result<Option<User>, Error>;

    async fn get_user(&self, email: &str) -> Result<Option<User>, Error>;

    async fn get_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, Error>;

    async fn update_user(&self, user_id: Uuid, changes: UserChanges)
        -> Result<Option<User>, Error>;

    /// Ordered by name, descending. `assigned_only` keeps entities linked to
    /// at least one recipe, each listed once.
    async fn list_named(
        &self,
        owner: Uuid,
        kind: AssociationKind,
        assigned_only: bool,
    ) -> Result<Vec<NamedEntity>, Error>;

    async fn get_named(
        &self,
        owner: Uuid,
        kind: AssociationKind,
        id: Uuid,
    ) -> Result<Option<NamedEntity>, Error>;

    async fn create_named(
        &self,
        owner: Uuid,
        kind: AssociationKind,
        name: &str,
    ) -> Result<NamedEntity, Error>;

    async fn rename_named(
        &self,
        owner: Uuid,
        kind: AssociationKind,
        id: Uuid,
        name: &str,
    ) -> Result<Option<NamedEntity>, Error>;

    /// Removes the entity and unlinks it from every recipe.
    async fn delete_named(&self, owner: Uuid, kind: AssociationKind, id: Uuid)
        -> Result<bool, Error>;

    /// Newest first.
    async fn list_recipes(
        &self,
        owner: Uuid,
        filter: &RecipeFilter,
    ) -> Result<Vec<RecipeDetail>, Error>;

    async fn get_recipe(&self, owner: Uuid, id: Uuid) -> Result<Option<RecipeDetail>, Error>;

    /// Inserts the recipe and resolves its requested associations atomically.
    async fn create_recipe(&self, owner: Uuid, changes: RecipeChanges)
        -> Result<RecipeDetail, Error>;

    /// Applies the changes atomically: on error nothing is written.
    async fn update_recipe(
        &self,
        owner: Uuid,
        id: Uuid,
        changes: RecipeChanges,
    ) -> Result<Option<RecipeDetail>, Error>;

    /// Returns the deleted row.
    async fn delete_recipe(&self, owner: Uuid, id: Uuid) -> Result<Option<Recipe>, Error>;

    async fn set_recipe_image(
        &self,
        owner: Uuid,
        id: Uuid,
        image: Option<String>,
    ) -> Result<Option<Recipe>, Error>;
}

/// The part of a store the association reconciler drives. Implementations run
/// inside the enclosing write's transaction.
#[async_trait]
pub trait AssociationStore: Send {
    async fn linked(
        &mut self,
        recipe_id: Uuid,
        kind: AssociationKind,
    ) -> Result<Vec<NamedEntity>, Error>;

    /// Existing entity of `owner` named exactly `name`, or a newly created one.
    async fn get_or_create(
        &mut self,
        owner: Uuid,
        kind: AssociationKind,
        name: &str,
    ) -> Result<NamedEntity, Error>;

    async fn link(
        &mut self,
        recipe_id: Uuid,
        kind: AssociationKind,
        entity_id: Uuid,
    ) -> Result<(), Error>;

    async fn unlink(
        &mut self,
        recipe_id: Uuid,
        kind: AssociationKind,
        entity_ids: &[Uuid],
    ) -> Result<(), Error>;
}
