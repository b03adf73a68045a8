//! The diff driver.
//!
//! Walks the entity kinds in dependency order. For each kind it computes the
//! structural diff, hands ambiguous create/delete candidates to the injected
//! resolver (suspending until the decision arrives), propagates accepted
//! renames into the "before" catalog, and records the outcome. The planner
//! then folds every decision into one ordered operation list.
//!
//! The engine is synchronous apart from the resolver boundary, performs no
//! I/O, and owns the before catalog outright; callers diffing one snapshot
//! against several targets clone it per comparison.

use std::collections::BTreeSet;

use tracing::debug;

use crate::diff::{
    Renamed, Resolution, diff_sets, group_by_table, pair_same_shape, propagate, resolve_entities,
};
use crate::diff::resolve::RenameResolver;
use crate::error::{DriftError, DriftResult};
use crate::plan::{self, Decisions, DiffMode, KindChanges, Op};
use crate::schema::store::{Catalog, EntitySet};
use crate::schema::{Column, ForeignKey, Index, Policy, PrimaryKey, SchemaEntity};

/// Diff two catalogs into an ordered operation list.
///
/// The resolver is invoked exactly once per entity kind (once per owning
/// table for columns and policies), and the engine awaits each verdict
/// before diffing the kinds that depend on it.
pub async fn diff_catalogs(
    mut before: Catalog,
    after: &Catalog,
    resolver: &dyn RenameResolver,
    mode: DiffMode,
) -> DriftResult<Vec<Op>> {
    let mut decisions = Decisions::default();

    // Schemas.
    let diffed = diff_sets(&before.schemas, &after.schemas);
    let resolved = resolve_entities(resolver, diffed.created, diffed.deleted).await?;
    for pair in &resolved.renamed {
        propagate::schema_renamed(&mut before, &pair.from.name, &pair.to.name);
    }
    confirm_propagation(&before.schemas, &resolved.renamed)?;
    decisions.schemas = KindChanges {
        created: resolved.created,
        deleted: resolved.deleted,
        renamed: resolved.renamed,
        altered: Vec::new(),
    };

    // Enums.
    let diffed = diff_sets(&before.enums, &after.enums);
    let resolved = resolve_entities(resolver, diffed.created, diffed.deleted).await?;
    for pair in &resolved.renamed {
        propagate::enum_changed(&mut before, &pair.from, &pair.to);
    }
    confirm_propagation(&before.enums, &resolved.renamed)?;
    decisions.enums = KindChanges {
        created: resolved.created,
        deleted: resolved.deleted,
        renamed: resolved.renamed,
        // Re-diff after propagation so a renamed enum with edited values
        // still surfaces as an alteration.
        altered: diff_sets(&before.enums, &after.enums).altered,
    };

    // Sequences.
    let diffed = diff_sets(&before.sequences, &after.sequences);
    let resolved = resolve_entities(resolver, diffed.created, diffed.deleted).await?;
    for pair in &resolved.renamed {
        propagate::sequence_changed(&mut before, &pair.from, &pair.to);
    }
    confirm_propagation(&before.sequences, &resolved.renamed)?;
    decisions.sequences = KindChanges {
        created: resolved.created,
        deleted: resolved.deleted,
        renamed: resolved.renamed,
        altered: diff_sets(&before.sequences, &after.sequences).altered,
    };

    // Roles. Renames are not representable, so the resolver is skipped and
    // a renamed role surfaces as drop+create.
    let diffed = diff_sets(&before.roles, &after.roles);
    decisions.roles = KindChanges {
        created: diffed.created,
        deleted: diffed.deleted,
        renamed: Vec::new(),
        altered: diffed.altered,
    };

    // Tables.
    let diffed = diff_sets(&before.tables, &after.tables);
    let resolved = resolve_entities(resolver, diffed.created, diffed.deleted).await?;
    for pair in &resolved.renamed {
        propagate::table_changed(&mut before, &pair.from, &pair.to);
    }
    confirm_propagation(&before.tables, &resolved.renamed)?;
    decisions.tables = KindChanges {
        created: resolved.created,
        deleted: resolved.deleted,
        renamed: resolved.renamed,
        altered: diff_sets(&before.tables, &after.tables).altered,
    };

    // Columns, grouped per owning table so a resolver verdict never pairs
    // across tables.
    let diffed = diff_sets(&before.columns, &after.columns);
    let mut created_groups =
        group_by_table(diffed.created, |c: &Column| (c.schema.clone(), c.table.clone()));
    let mut deleted_groups =
        group_by_table(diffed.deleted, |c: &Column| (c.schema.clone(), c.table.clone()));
    let group_keys: BTreeSet<(String, String)> = created_groups
        .keys()
        .chain(deleted_groups.keys())
        .cloned()
        .collect();
    let mut resolved_columns = Resolution::default();
    for key in group_keys {
        let created = created_groups.remove(&key).unwrap_or_default();
        let deleted = deleted_groups.remove(&key).unwrap_or_default();
        let resolved = resolve_entities(resolver, created, deleted).await?;
        for pair in &resolved.renamed {
            propagate::column_renamed(
                &mut before,
                &pair.from.schema,
                &pair.from.table,
                &pair.from.name,
                &pair.to.name,
            );
        }
        resolved_columns.merge(resolved);
    }
    confirm_propagation(&before.columns, &resolved_columns.renamed)?;
    decisions.columns = KindChanges {
        created: resolved_columns.created,
        deleted: resolved_columns.deleted,
        renamed: resolved_columns.renamed,
        altered: diff_sets(&before.columns, &after.columns).altered,
    };

    // Indexes, primary keys, foreign keys: matched by key, then created and
    // deleted candidates whose content is identical apart from the name are
    // paired as renames: that is how default-generated names churn when
    // the entities they derive from are renamed.
    let diffed = diff_sets(&before.indexes, &after.indexes);
    let paired = pair_same_shape(diffed.created, diffed.deleted, Index::same_shape);
    decisions.indexes = KindChanges {
        created: paired.created,
        deleted: paired.deleted,
        renamed: paired.renamed,
        altered: diffed.altered,
    };

    let diffed = diff_sets(&before.primary_keys, &after.primary_keys);
    let paired = pair_same_shape(diffed.created, diffed.deleted, PrimaryKey::same_shape);
    decisions.primary_keys = KindChanges {
        created: paired.created,
        deleted: paired.deleted,
        renamed: paired.renamed,
        altered: diffed.altered,
    };

    let diffed = diff_sets(&before.foreign_keys, &after.foreign_keys);
    let paired = pair_same_shape(diffed.created, diffed.deleted, ForeignKey::same_shape);
    decisions.foreign_keys = KindChanges {
        created: paired.created,
        deleted: paired.deleted,
        renamed: paired.renamed,
        altered: diffed.altered,
    };

    // Check constraints are never paired: a changed predicate is a
    // recreate, a changed name a drop+create.
    let diffed = diff_sets(&before.checks, &after.checks);
    decisions.checks = KindChanges {
        created: diffed.created,
        deleted: diffed.deleted,
        renamed: Vec::new(),
        altered: diffed.altered,
    };

    // Policies, grouped per owning table.
    let diffed = diff_sets(&before.policies, &after.policies);
    let mut created_groups =
        group_by_table(diffed.created, |p: &Policy| (p.schema.clone(), p.table.clone()));
    let mut deleted_groups =
        group_by_table(diffed.deleted, |p: &Policy| (p.schema.clone(), p.table.clone()));
    let group_keys: BTreeSet<(String, String)> = created_groups
        .keys()
        .chain(deleted_groups.keys())
        .cloned()
        .collect();
    let mut resolved_policies = Resolution::default();
    for key in group_keys {
        let created = created_groups.remove(&key).unwrap_or_default();
        let deleted = deleted_groups.remove(&key).unwrap_or_default();
        let resolved = resolve_entities(resolver, created, deleted).await?;
        for pair in &resolved.renamed {
            propagate::policy_renamed(&mut before, &pair.from, &pair.to);
        }
        resolved_policies.merge(resolved);
    }
    confirm_propagation(&before.policies, &resolved_policies.renamed)?;
    decisions.policies = KindChanges {
        created: resolved_policies.created,
        deleted: resolved_policies.deleted,
        renamed: resolved_policies.renamed,
        altered: diff_sets(&before.policies, &after.policies).altered,
    };

    // Views.
    let diffed = diff_sets(&before.views, &after.views);
    let resolved = resolve_entities(resolver, diffed.created, diffed.deleted).await?;
    for pair in &resolved.renamed {
        propagate::view_changed(&mut before, &pair.from, &pair.to);
    }
    confirm_propagation(&before.views, &resolved.renamed)?;
    decisions.views = KindChanges {
        created: resolved.created,
        deleted: resolved.deleted,
        renamed: resolved.renamed,
        altered: diff_sets(&before.views, &after.views).altered,
    };

    debug!(
        tables_created = decisions.tables.created.len(),
        tables_deleted = decisions.tables.deleted.len(),
        tables_renamed = decisions.tables.renamed.len(),
        columns_renamed = decisions.columns.renamed.len(),
        "diff decisions assembled"
    );

    plan::build(&decisions, after, mode)
}

/// After propagation, every accepted rename must be visible in the before
/// catalog under its new key. A miss means the propagation step skipped a
/// dependent rewrite, which would corrupt every later diff pass.
fn confirm_propagation<T: SchemaEntity>(
    set: &EntitySet<T>,
    renamed: &[Renamed<T>],
) -> DriftResult<()> {
    for pair in renamed {
        if set.get(&pair.to.key()).is_none() {
            return Err(DriftError::Planner(format!(
                "accepted {} rename {} -> {} did not propagate into the before catalog",
                T::KIND,
                pair.from.qualified_name(),
                pair.to.qualified_name()
            )));
        }
    }
    Ok(())
}
