//! Structural diffing of entity sets.
//!
//! Comparison here is syntactic: keys are matched exactly and any differing
//! non-key field makes an alteration record. Semantic exceptions (default
//! values that merely render differently, role lists in another order) are
//! layered on by the planner through the equivalence engine, never here.

pub mod propagate;
pub mod resolve;

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::schema::store::EntitySet;
use crate::schema::{
    Column, ColumnDefault, GeneratedSpec, IdentitySpec, Policy, PolicyCommand, SchemaEntity, View,
};

pub use resolve::{
    MapResolver, NoopResolver, Renamed, RenameResolver, RenamedName, ResolveOutcome,
    ResolveRequest, Resolution, outcome_repartitions, resolve_entities,
};

/// One changed field, before and after.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change<V> {
    pub from: V,
    pub to: V,
}

impl<V: Clone + PartialEq> Change<V> {
    /// `Some` when the two values differ syntactically.
    pub fn between(from: &V, to: &V) -> Option<Self> {
        if from == to {
            None
        } else {
            Some(Self {
                from: from.clone(),
                to: to.clone(),
            })
        }
    }
}

/// An entity present on both sides with at least one differing field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Altered<T> {
    pub before: T,
    pub after: T,
}

/// Created/deleted/changed candidates for one entity kind.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffSet<T> {
    pub created: Vec<T>,
    pub deleted: Vec<T>,
    pub altered: Vec<Altered<T>>,
}

impl<T> Default for DiffSet<T> {
    fn default() -> Self {
        Self {
            created: Vec::new(),
            deleted: Vec::new(),
            altered: Vec::new(),
        }
    }
}

impl<T> DiffSet<T> {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.deleted.is_empty() && self.altered.is_empty()
    }
}

/// Compare two sets of one entity kind by exact key equality.
pub fn diff_sets<T: SchemaEntity>(before: &EntitySet<T>, after: &EntitySet<T>) -> DiffSet<T> {
    let before_by_key: HashMap<T::Key, &T> = before.iter().map(|item| (item.key(), item)).collect();
    let after_keys: HashSet<T::Key> = after.iter().map(|item| item.key()).collect();

    let mut out = DiffSet::default();
    for item in after {
        match before_by_key.get(&item.key()) {
            None => out.created.push(item.clone()),
            Some(prev) if *prev != item => out.altered.push(Altered {
                before: (*prev).clone(),
                after: item.clone(),
            }),
            Some(_) => {}
        }
    }
    for item in before {
        if !after_keys.contains(&item.key()) {
            out.deleted.push(item.clone());
        }
    }
    out
}

/// Group child entities by their owning table, so rename resolution for one
/// table never pairs a created entity in table X with a deleted one in
/// table Y. `BTreeMap` keeps group order deterministic.
pub fn group_by_table<T>(
    items: Vec<T>,
    owner: impl Fn(&T) -> (String, String),
) -> BTreeMap<(String, String), Vec<T>> {
    let mut groups: BTreeMap<(String, String), Vec<T>> = BTreeMap::new();
    for item in items {
        groups.entry(owner(&item)).or_default().push(item);
    }
    groups
}

/// Pair created/deleted entities whose content is identical apart from the
/// name, turning an apparent drop+create into a rename. Used for indexes,
/// primary keys and foreign keys, whose default-generated names change when
/// the entities they are derived from are renamed.
pub fn pair_same_shape<T: SchemaEntity>(
    created: Vec<T>,
    deleted: Vec<T>,
    same_shape: impl Fn(&T, &T) -> bool,
) -> Resolution<T> {
    let mut renamed = Vec::new();
    let mut remaining_created: Vec<Option<T>> = created.into_iter().map(Some).collect();
    let mut remaining_deleted = Vec::new();

    for old in deleted {
        let matched = remaining_created
            .iter()
            .position(|slot| matches!(slot, Some(new) if same_shape(&old, new)));
        match matched.and_then(|pos| remaining_created[pos].take()) {
            Some(new) => renamed.push(Renamed { from: old, to: new }),
            None => remaining_deleted.push(old),
        }
    }

    Resolution {
        created: remaining_created.into_iter().flatten().collect(),
        deleted: remaining_deleted,
        renamed,
    }
}

/// Reference to a column's declared type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnTypeRef {
    pub name: String,
    pub schema: Option<String>,
    pub dimensions: u32,
}

impl ColumnTypeRef {
    pub fn of(column: &Column) -> Self {
        Self {
            name: column.type_name.clone(),
            schema: column.type_schema.clone(),
            dimensions: column.dimensions,
        }
    }
}

/// Field-level changes of one column.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ColumnDelta {
    pub r#type: Option<Change<ColumnTypeRef>>,
    pub not_null: Option<Change<bool>>,
    pub default: Option<Change<Option<ColumnDefault>>>,
    pub generated: Option<Change<Option<GeneratedSpec>>>,
    pub identity: Option<Change<Option<IdentitySpec>>>,
}

impl ColumnDelta {
    pub fn between(before: &Column, after: &Column) -> Self {
        Self {
            r#type: Change::between(&ColumnTypeRef::of(before), &ColumnTypeRef::of(after)),
            not_null: Change::between(&before.not_null, &after.not_null),
            default: Change::between(&before.default, &after.default),
            generated: Change::between(&before.generated, &after.generated),
            identity: Change::between(&before.identity, &after.identity),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.r#type.is_none()
            && self.not_null.is_none()
            && self.default.is_none()
            && self.generated.is_none()
            && self.identity.is_none()
    }
}

/// Field-level changes of one policy.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PolicyDelta {
    pub permissive: Option<Change<bool>>,
    pub commands: Option<Change<Vec<PolicyCommand>>>,
    pub roles: Option<Change<Vec<String>>>,
    pub using: Option<Change<Option<String>>>,
    pub with_check: Option<Change<Option<String>>>,
}

impl PolicyDelta {
    pub fn between(before: &Policy, after: &Policy) -> Self {
        Self {
            permissive: Change::between(&before.permissive, &after.permissive),
            commands: Change::between(&before.commands, &after.commands),
            roles: Change::between(&before.roles, &after.roles),
            using: Change::between(&before.using, &after.using),
            with_check: Change::between(&before.with_check, &after.with_check),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.permissive.is_none()
            && self.commands.is_none()
            && self.roles.is_none()
            && self.using.is_none()
            && self.with_check.is_none()
    }
}

/// Field-level changes of one view.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewDelta {
    pub definition: Option<Change<Option<String>>>,
    pub materialized: Option<Change<bool>>,
    pub with_no_data: Option<Change<bool>>,
}

impl ViewDelta {
    pub fn between(before: &View, after: &View) -> Self {
        // A withheld definition on either side is not a comparable change.
        let definition = match (&before.definition, &after.definition) {
            (Some(_), Some(_)) => Change::between(&before.definition, &after.definition),
            _ => None,
        };
        Self {
            definition,
            materialized: Change::between(&before.materialized, &after.materialized),
            with_no_data: Change::between(&before.with_no_data, &after.with_no_data),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.definition.is_none() && self.materialized.is_none() && self.with_no_data.is_none()
    }
}

/// One in-place enum value addition, anchored before an existing value when
/// the insertion is not at the end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumValueAdd {
    pub value: String,
    pub before: Option<String>,
}

/// When the old value list survives as an ordered subsequence of the new
/// one, the difference is expressible as in-place additions; returns the
/// additions in declaration order. Any removal or reorder returns `None`
/// and forces a full type recreation.
pub fn enum_additions(old: &[String], new: &[String]) -> Option<Vec<EnumValueAdd>> {
    let mut additions = Vec::new();
    let mut old_iter = old.iter().peekable();

    for (position, value) in new.iter().enumerate() {
        match old_iter.peek() {
            Some(existing) if *existing == value => {
                old_iter.next();
            }
            _ => {
                // Anchor on the next surviving old value, if any.
                let before = new[position + 1..]
                    .iter()
                    .find(|candidate| old.contains(candidate))
                    .cloned();
                additions.push(EnumValueAdd {
                    value: value.clone(),
                    before,
                });
            }
        }
    }

    if old_iter.peek().is_some() {
        // Something from the old list never showed up in order.
        return None;
    }
    Some(additions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Index, IndexColumn, Table};

    fn table_set(names: &[&str]) -> EntitySet<Table> {
        let mut set = EntitySet::new();
        for name in names {
            set.push(Table::new("public", *name)).unwrap();
        }
        set
    }

    #[test]
    fn test_diff_sets_created_deleted() {
        let before = table_set(&["users", "legacy"]);
        let after = table_set(&["users", "orders"]);

        let diff = diff_sets(&before, &after);
        assert_eq!(diff.created.len(), 1);
        assert_eq!(diff.created[0].name, "orders");
        assert_eq!(diff.deleted.len(), 1);
        assert_eq!(diff.deleted[0].name, "legacy");
        assert!(diff.altered.is_empty());
    }

    #[test]
    fn test_diff_sets_detects_field_change() {
        let before = table_set(&["users"]);
        let mut after = EntitySet::new();
        after.push(Table::new("public", "users").with_rls()).unwrap();

        let diff = diff_sets(&before, &after);
        assert_eq!(diff.altered.len(), 1);
        assert!(!diff.altered[0].before.rls_enabled);
        assert!(diff.altered[0].after.rls_enabled);
    }

    #[test]
    fn test_diff_against_self_is_empty() {
        let set = table_set(&["users", "orders"]);
        assert!(diff_sets(&set, &set).is_empty());
    }

    #[test]
    fn test_pair_same_shape_turns_drop_create_into_rename() {
        let old = Index::new(
            "public",
            "users",
            "users_a_key",
            vec![IndexColumn::named("b")],
        )
        .unique()
        .default_named();
        let new = Index::new(
            "public",
            "users",
            "users_b_key",
            vec![IndexColumn::named("b")],
        )
        .unique()
        .default_named();
        let other = Index::new(
            "public",
            "users",
            "users_c_index",
            vec![IndexColumn::named("c")],
        );

        let resolved = pair_same_shape(vec![new, other.clone()], vec![old], Index::same_shape);
        assert_eq!(resolved.renamed.len(), 1);
        assert_eq!(resolved.renamed[0].from.name, "users_a_key");
        assert_eq!(resolved.renamed[0].to.name, "users_b_key");
        assert_eq!(resolved.created, vec![other]);
        assert!(resolved.deleted.is_empty());
    }

    #[test]
    fn test_enum_additions_appended_and_inserted() {
        let old = vec!["a".to_string(), "c".to_string()];
        let new = vec!["a".to_string(), "b".to_string(), "c".to_string(), "d".to_string()];
        let additions = enum_additions(&old, &new).unwrap();
        assert_eq!(additions.len(), 2);
        assert_eq!(additions[0].value, "b");
        assert_eq!(additions[0].before.as_deref(), Some("c"));
        assert_eq!(additions[1].value, "d");
        assert_eq!(additions[1].before, None);
    }

    #[test]
    fn test_enum_additions_refuses_removal_and_reorder() {
        let old = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert!(enum_additions(&old, &["a".to_string(), "c".to_string()]).is_none());
        assert!(
            enum_additions(&old, &["b".to_string(), "a".to_string(), "c".to_string()]).is_none()
        );
    }

    #[test]
    fn test_column_delta_tracks_changed_fields_only() {
        let before = Column::new("public", "users", "age", "integer");
        let after = Column::new("public", "users", "age", "bigint").not_null();
        let delta = ColumnDelta::between(&before, &after);
        assert!(delta.r#type.is_some());
        assert!(delta.not_null.is_some());
        assert!(delta.default.is_none());
        assert!(delta.generated.is_none());
        assert!(delta.identity.is_none());
    }
}
