use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{
    error::{Error, HtmlError},
    form::RecipeChanges,
    reconcile::apply_associations,
    schema::{
        AssociationKind, NamedEntity, NewUser, Recipe, RecipeDetail, RecipeFilter, User,
        UserChanges, Uuid,
    },
    store::{AssociationStore, Store},
};

const DUPLICATE: &str = "An entry with this value already exists";

/// Every table of the in-memory store. Cloned for each write and swapped back
/// in only when the write succeeds.
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    sequences: BTreeMap<&'static str, Uuid>,
    users: BTreeMap<Uuid, User>,
    recipes: BTreeMap<Uuid, Recipe>,
    tags: BTreeMap<Uuid, NamedEntity>,
    ingredients: BTreeMap<Uuid, NamedEntity>,
    /// `(recipe_id, tag_id)`
    recipe_tags: BTreeSet<(Uuid, Uuid)>,
    /// `(recipe_id, ingredient_id)`
    recipe_ingredients: BTreeSet<(Uuid, Uuid)>,
}

impl MemoryState {
    fn next_id(&mut self, table: &'static str) -> Uuid {
        let id = self.sequences.entry(table).or_insert(0);
        *id += 1;
        *id
    }

    fn entities(&self, kind: AssociationKind) -> &BTreeMap<Uuid, NamedEntity> {
        match kind {
            AssociationKind::Tag => &self.tags,
            AssociationKind::Ingredient => &self.ingredients,
        }
    }

    fn entities_mut(&mut self, kind: AssociationKind) -> &mut BTreeMap<Uuid, NamedEntity> {
        match kind {
            AssociationKind::Tag => &mut self.tags,
            AssociationKind::Ingredient => &mut self.ingredients,
        }
    }

    fn links(&self, kind: AssociationKind) -> &BTreeSet<(Uuid, Uuid)> {
        match kind {
            AssociationKind::Tag => &self.recipe_tags,
            AssociationKind::Ingredient => &self.recipe_ingredients,
        }
    }

    fn links_mut(&mut self, kind: AssociationKind) -> &mut BTreeSet<(Uuid, Uuid)> {
        match kind {
            AssociationKind::Tag => &mut self.recipe_tags,
            AssociationKind::Ingredient => &mut self.recipe_ingredients,
        }
    }

    fn find_named(&self, owner: Uuid, kind: AssociationKind, name: &str) -> Option<&NamedEntity> {
        self.entities(kind)
            .values()
            .find(|e| e.user_id == owner && e.name == name)
    }

    /// Entities of `kind` linked to the recipe, ordered by id.
    fn linked_entities(&self, recipe_id: Uuid, kind: AssociationKind) -> Vec<NamedEntity> {
        let entities = self.entities(kind);

        self.links(kind)
            .range((recipe_id, Uuid::MIN)..=(recipe_id, Uuid::MAX))
            .filter_map(|(_, entity_id)| entities.get(entity_id).cloned())
            .collect()
    }

    fn is_linked_to_any(&self, recipe_id: Uuid, kind: AssociationKind, ids: &[Uuid]) -> bool {
        ids.iter()
            .any(|id| self.links(kind).contains(&(recipe_id, *id)))
    }

    fn is_assigned(&self, kind: AssociationKind, entity_id: Uuid) -> bool {
        self.links(kind).iter().any(|(_, e)| *e == entity_id)
    }

    fn detail(&self, recipe: Recipe) -> RecipeDetail {
        RecipeDetail {
            tags: self.linked_entities(recipe.id, AssociationKind::Tag),
            ingredients: self.linked_entities(recipe.id, AssociationKind::Ingredient),
            recipe,
        }
    }

    fn owned_recipe(&self, owner: Uuid, id: Uuid) -> Option<&Recipe> {
        self.recipes.get(&id).filter(|r| r.user_id == owner)
    }
}

#[async_trait]
impl AssociationStore for MemoryState {
    async fn linked(
        &mut self,
        recipe_id: Uuid,
        kind: AssociationKind,
    ) -> Result<Vec<NamedEntity>, Error> {
        Ok(self.linked_entities(recipe_id, kind))
    }

    async fn get_or_create(
        &mut self,
        owner: Uuid,
        kind: AssociationKind,
        name: &str,
    ) -> Result<NamedEntity, Error> {
        if let Some(existing) = self.find_named(owner, kind, name) {
            return Ok(existing.clone());
        }

        let entity = NamedEntity {
            id: self.next_id(kind.table()),
            user_id: owner,
            name: name.to_string(),
        };
        self.entities_mut(kind).insert(entity.id, entity.clone());
        log::debug!("Created {} {:?} for user {owner}", kind.label(), name);

        Ok(entity)
    }

    async fn link(
        &mut self,
        recipe_id: Uuid,
        kind: AssociationKind,
        entity_id: Uuid,
    ) -> Result<(), Error> {
        self.links_mut(kind).insert((recipe_id, entity_id));
        Ok(())
    }

    async fn unlink(
        &mut self,
        recipe_id: Uuid,
        kind: AssociationKind,
        entity_ids: &[Uuid],
    ) -> Result<(), Error> {
        let links = self.links_mut(kind);
        for entity_id in entity_ids {
            links.remove(&(recipe_id, *entity_id));
        }
        Ok(())
    }
}

/// [`Store`] kept entirely in process memory. Used when no database is
/// configured and by the test suite.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` against a copy of the state and keeps the copy only on success.
    async fn write<T, F>(&self, f: F) -> Result<T, Error>
    where
        F: FnOnce(&mut MemoryState) -> Result<T, Error>,
    {
        let mut state = self.state.lock().await;
        let mut draft = state.clone();
        let value = f(&mut draft)?;
        *state = draft;

        Ok(value)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<Option<User>, Error> {
        self.write(|state| {
            if state.users.values().any(|u| u.email == user.email) {
                return Ok(None);
            }

            let row = User {
                id: state.next_id("users"),
                email: user.email,
                name: user.name,
                password: user.password,
                is_active: true,
                is_staff: user.is_staff,
            };
            state.users.insert(row.id, row.clone());

            Ok(Some(row))
        })
        .await
    }

    async fn get_user(&self, email: &str) -> Result<Option<User>, Error> {
        let state = self.state.lock().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, Error> {
        let state = self.state.lock().await;
        Ok(state.users.get(&user_id).cloned())
    }

    async fn update_user(
        &self,
        user_id: Uuid,
        changes: UserChanges,
    ) -> Result<Option<User>, Error> {
        self.write(|state| {
            if let Some(email) = &changes.email {
                if state
                    .users
                    .values()
                    .any(|u| u.id != user_id && &u.email == email)
                {
                    return Err(HtmlError::InvalidRequest.new(DUPLICATE));
                }
            }

            Ok(state.users.get_mut(&user_id).map(|user| {
                changes.apply(user);
                user.clone()
            }))
        })
        .await
    }

    async fn list_named(
        &self,
        owner: Uuid,
        kind: AssociationKind,
        assigned_only: bool,
    ) -> Result<Vec<NamedEntity>, Error> {
        let state = self.state.lock().await;

        let mut list: Vec<NamedEntity> = state
            .entities(kind)
            .values()
            .filter(|e| e.user_id == owner)
            .filter(|e| !assigned_only || state.is_assigned(kind, e.id))
            .cloned()
            .collect();
        list.sort_by(|a, b| b.name.cmp(&a.name));

        Ok(list)
    }

    async fn get_named(
        &self,
        owner: Uuid,
        kind: AssociationKind,
        id: Uuid,
    ) -> Result<Option<NamedEntity>, Error> {
        let state = self.state.lock().await;

        Ok(state
            .entities(kind)
            .get(&id)
            .filter(|e| e.user_id == owner)
            .cloned())
    }

    async fn create_named(
        &self,
        owner: Uuid,
        kind: AssociationKind,
        name: &str,
    ) -> Result<NamedEntity, Error> {
        self.write(|state| {
            if state.find_named(owner, kind, name).is_some() {
                return Err(HtmlError::InvalidRequest.new(DUPLICATE));
            }

            let entity = NamedEntity {
                id: state.next_id(kind.table()),
                user_id: owner,
                name: name.to_string(),
            };
            state.entities_mut(kind).insert(entity.id, entity.clone());

            Ok(entity)
        })
        .await
    }

    async fn rename_named(
        &self,
        owner: Uuid,
        kind: AssociationKind,
        id: Uuid,
        name: &str,
    ) -> Result<Option<NamedEntity>, Error> {
        self.write(|state| {
            if let Some(other) = state.find_named(owner, kind, name) {
                if other.id != id {
                    return Err(HtmlError::InvalidRequest.new(DUPLICATE));
                }
            }

            Ok(state
                .entities_mut(kind)
                .get_mut(&id)
                .filter(|e| e.user_id == owner)
                .map(|entity| {
                    entity.name = name.to_string();
                    entity.clone()
                }))
        })
        .await
    }

    async fn delete_named(
        &self,
        owner: Uuid,
        kind: AssociationKind,
        id: Uuid,
    ) -> Result<bool, Error> {
        self.write(|state| {
            let owned = state
                .entities(kind)
                .get(&id)
                .is_some_and(|e| e.user_id == owner);
            if !owned {
                return Ok(false);
            }

            state.entities_mut(kind).remove(&id);
            state.links_mut(kind).retain(|(_, e)| *e != id);

            Ok(true)
        })
        .await
    }

    async fn list_recipes(
        &self,
        owner: Uuid,
        filter: &RecipeFilter,
    ) -> Result<Vec<RecipeDetail>, Error> {
        let state = self.state.lock().await;

        Ok(state
            .recipes
            .values()
            .rev()
            .filter(|r| r.user_id == owner)
            .filter(|r| {
                AssociationKind::ALL.iter().all(|kind| match filter.ids(*kind) {
                    Some(ids) => state.is_linked_to_any(r.id, *kind, ids),
                    None => true,
                })
            })
            .map(|r| state.detail(r.clone()))
            .collect())
    }

    async fn get_recipe(&self, owner: Uuid, id: Uuid) -> Result<Option<RecipeDetail>, Error> {
        let state = self.state.lock().await;

        Ok(state
            .owned_recipe(owner, id)
            .cloned()
            .map(|r| state.detail(r)))
    }

    async fn create_recipe(
        &self,
        owner: Uuid,
        changes: RecipeChanges,
    ) -> Result<RecipeDetail, Error> {
        let mut state = self.state.lock().await;
        let mut draft = state.clone();

        let mut recipe = Recipe::empty(owner);
        changes.apply(&mut recipe);
        recipe.id = draft.next_id("recipes");
        draft.recipes.insert(recipe.id, recipe.clone());

        apply_associations(&mut draft, &recipe, owner, &changes).await?;

        let detail = draft.detail(recipe);
        *state = draft;

        log::info!("User {owner} created recipe {}", detail.recipe.id);
        Ok(detail)
    }

    async fn update_recipe(
        &self,
        owner: Uuid,
        id: Uuid,
        changes: RecipeChanges,
    ) -> Result<Option<RecipeDetail>, Error> {
        let mut state = self.state.lock().await;
        let mut draft = state.clone();

        let mut recipe = match draft.owned_recipe(owner, id) {
            Some(r) => r.clone(),
            None => return Ok(None),
        };
        changes.apply(&mut recipe);
        draft.recipes.insert(recipe.id, recipe.clone());

        apply_associations(&mut draft, &recipe, owner, &changes).await?;

        let detail = draft.detail(recipe);
        *state = draft;

        Ok(Some(detail))
    }

    async fn delete_recipe(&self, owner: Uuid, id: Uuid) -> Result<Option<Recipe>, Error> {
        self.write(|state| {
            if state.owned_recipe(owner, id).is_none() {
                return Ok(None);
            }

            let removed = state.recipes.remove(&id);
            for kind in AssociationKind::ALL {
                state.links_mut(kind).retain(|(r, _)| *r != id);
            }

            Ok(removed)
        })
        .await
    }

    async fn set_recipe_image(
        &self,
        owner: Uuid,
        id: Uuid,
        image: Option<String>,
    ) -> Result<Option<Recipe>, Error> {
        self.write(|state| {
            Ok(state
                .recipes
                .get_mut(&id)
                .filter(|r| r.user_id == owner)
                .map(|recipe| {
                    recipe.image = image;
                    recipe.clone()
                }))
        })
        .await
    }
}
