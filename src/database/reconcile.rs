use std::collections::BTreeSet;

use super::{
    error::{Error, HtmlError, TypeError},
    form::RecipeChanges,
    schema::{AssociationKind, NamedEntity, Recipe, Uuid},
    store::AssociationStore,
};

/// What has to change for a recipe's association set to equal a requested
/// set of names.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Linked entities that stay linked.
    pub keep: Vec<Uuid>,
    /// Linked entities to unlink. They are not deleted.
    pub unlink: Vec<Uuid>,
    /// Requested names without a linked entity, resolved by get-or-create.
    pub attach: Vec<String>,
}

impl ReconcilePlan {
    pub fn is_noop(&self) -> bool {
        self.unlink.is_empty() && self.attach.is_empty()
    }
}

/// Diffs the currently linked entities against the requested names.
///
/// Names compare exactly (case-sensitive). Never touches a store.
pub fn plan(current: &[NamedEntity], requested: &BTreeSet<String>) -> ReconcilePlan {
    let mut plan = ReconcilePlan::default();
    let mut kept_names: BTreeSet<&str> = BTreeSet::new();

    for entity in current {
        if requested.contains(&entity.name) && kept_names.insert(entity.name.as_str()) {
            plan.keep.push(entity.id);
        } else {
            plan.unlink.push(entity.id);
        }
    }

    plan.attach = requested
        .iter()
        .filter(|name| !kept_names.contains(name.as_str()))
        .cloned()
        .collect();

    plan
}

/// Makes the recipe's `kind` associations exactly the entities of `owner`
/// named in `requested`, creating the missing ones.
///
/// Callers run this inside the transaction of the enclosing recipe write, so
/// an error here discards every change made so far.
pub async fn reconcile<S>(
    store: &mut S,
    recipe: &Recipe,
    owner: Uuid,
    requested: &BTreeSet<String>,
    kind: AssociationKind,
) -> Result<(), Error>
where
    S: AssociationStore + ?Sized,
{
    if recipe.user_id != owner {
        return Err(HtmlError::NotFound.default());
    }

    let current = store.linked(recipe.id, kind).await?;
    let plan = plan(&current, requested);
    for entity in current.iter().filter(|e| plan.keep.contains(&e.id)) {
        ensure_owned(entity, owner, kind)?;
    }
    if plan.is_noop() {
        return Ok(());
    }

    let mut resolved = Vec::with_capacity(plan.attach.len());
    for name in plan.attach.iter() {
        let entity = store.get_or_create(owner, kind, name).await?;
        ensure_owned(&entity, owner, kind)?;
        resolved.push(entity);
    }

    if !plan.unlink.is_empty() {
        store.unlink(recipe.id, kind, &plan.unlink).await?;
    }
    for entity in resolved.iter() {
        store.link(recipe.id, kind, entity.id).await?;
    }

    log::debug!(
        "Recipe {} {}: kept {}, unlinked {}, linked {}",
        recipe.id,
        kind.table(),
        plan.keep.len(),
        plan.unlink.len(),
        resolved.len()
    );

    Ok(())
}

/// Reconciles every association kind present in `changes`. Omitted kinds are
/// left untouched.
pub async fn apply_associations<S>(
    store: &mut S,
    recipe: &Recipe,
    owner: Uuid,
    changes: &RecipeChanges,
) -> Result<(), Error>
where
    S: AssociationStore + ?Sized,
{
    for kind in AssociationKind::ALL {
        if let Some(requested) = changes.requested(kind) {
            reconcile(store, recipe, owner, requested, kind).await?;
        }
    }

    Ok(())
}

fn ensure_owned(entity: &NamedEntity, owner: Uuid, kind: AssociationKind) -> Result<(), Error> {
    if entity.user_id != owner {
        log::error!(
            "{} {} belongs to user {}, not {owner}",
            kind.label(),
            entity.id,
            entity.user_id
        );
        return Err(TypeError::field(kind.table(), "Entity is not owned by the recipe owner.").into());
    }

    Ok(())
}
