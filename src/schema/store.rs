//! The catalog: a typed, conflict-checked store of every entity kind.
//!
//! Producers (a schema-source reader or a live introspector) fill a fresh
//! [`Catalog`] through [`CatalogBuilder`], which accumulates duplicate-key
//! conflicts instead of failing one at a time. During a diff run the engine
//! mutates the "before" catalog in place so later passes see already-renamed
//! identifiers; the "after" catalog is never touched.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{DriftError, DriftResult, DuplicateEntity};
use crate::schema::{
    CheckConstraint, Column, EnumType, ForeignKey, Index, Policy, PrimaryKey, Role, Schema,
    SchemaEntity, Sequence, Table, View,
};

/// An insertion-ordered set of one entity kind, unique by key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySet<T: SchemaEntity> {
    items: Vec<T>,
}

impl<T: SchemaEntity> Default for EntitySet<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: SchemaEntity> EntitySet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entity. On a key collision the set keeps the first entity
    /// and returns the colliding key; it never panics.
    pub fn push(&mut self, item: T) -> Result<(), T::Key> {
        let key = item.key();
        if self.items.iter().any(|existing| existing.key() == key) {
            return Err(key);
        }
        self.items.push(item);
        Ok(())
    }

    pub fn get(&self, key: &T::Key) -> Option<&T> {
        self.items.iter().find(|item| item.key() == *key)
    }

    /// All entities matching a partial-key predicate, in insertion order.
    pub fn list(&self, pred: impl Fn(&T) -> bool) -> Vec<&T> {
        self.items.iter().filter(|item| pred(item)).collect()
    }

    /// First entity matching the predicate, if any. Keys are unique, so for
    /// full-key predicates first-match is the only match.
    pub fn one(&self, pred: impl Fn(&T) -> bool) -> Option<&T> {
        self.items.iter().find(|item| pred(item))
    }

    /// Apply a mutation to every entity matching `pred`; returns how many
    /// were touched. The closure subsumes both literal field sets and
    /// transforms that inspect composite fields before rewriting them.
    pub fn update(&mut self, pred: impl Fn(&T) -> bool, mut apply: impl FnMut(&mut T)) -> usize {
        let mut touched = 0;
        for item in &mut self.items {
            if pred(item) {
                apply(item);
                touched += 1;
            }
        }
        touched
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a, T: SchemaEntity> IntoIterator for &'a EntitySet<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Every entity of one schema snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub schemas: EntitySet<Schema>,
    pub enums: EntitySet<EnumType>,
    pub sequences: EntitySet<Sequence>,
    pub roles: EntitySet<Role>,
    pub tables: EntitySet<Table>,
    pub columns: EntitySet<Column>,
    pub indexes: EntitySet<Index>,
    pub primary_keys: EntitySet<PrimaryKey>,
    pub foreign_keys: EntitySet<ForeignKey>,
    pub checks: EntitySet<CheckConstraint>,
    pub policies: EntitySet<Policy>,
    pub views: EntitySet<View>,
}

impl Catalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// Columns of one table, in declaration order.
    pub fn columns_of(&self, schema: &str, table: &str) -> Vec<&Column> {
        self.columns
            .list(|c| c.schema == schema && c.table == table)
    }

    /// The table's primary key, if declared.
    pub fn primary_key_of(&self, schema: &str, table: &str) -> Option<&PrimaryKey> {
        self.primary_keys
            .one(|pk| pk.schema == schema && pk.table == table)
    }

    /// Columns whose type resolves to the given enum.
    pub fn columns_using_enum(&self, e: &EnumType) -> Vec<&Column> {
        self.columns
            .list(|c| c.type_name == e.name && c.resolved_type_schema() == e.schema)
    }

    /// Structural and referential consistency gate, run after all inserts.
    /// A failure is a producer bug and is reported fatally rather than
    /// skipped.
    pub fn validate(&self) -> DriftResult<()> {
        fn check_all<T: SchemaEntity>(set: &EntitySet<T>) -> DriftResult<()> {
            for item in set {
                item.validate()
                    .map_err(DriftError::Invariant)?;
            }
            Ok(())
        }

        check_all(&self.schemas)?;
        check_all(&self.enums)?;
        check_all(&self.sequences)?;
        check_all(&self.roles)?;
        check_all(&self.tables)?;
        check_all(&self.columns)?;
        check_all(&self.indexes)?;
        check_all(&self.primary_keys)?;
        check_all(&self.foreign_keys)?;
        check_all(&self.checks)?;
        check_all(&self.policies)?;
        check_all(&self.views)?;

        let tables: HashSet<(&str, &str)> = self
            .tables
            .iter()
            .map(|t| (t.schema.as_str(), t.name.as_str()))
            .collect();
        let require_table = |schema: &str, table: &str, owner: String| -> DriftResult<()> {
            if tables.contains(&(schema, table)) {
                Ok(())
            } else {
                Err(DriftError::Invariant(format!(
                    "{} references missing table {}.{}",
                    owner, schema, table
                )))
            }
        };

        for c in &self.columns {
            require_table(&c.schema, &c.table, format!("column {}", c.qualified_name()))?;
        }
        for i in &self.indexes {
            require_table(&i.schema, &i.table, format!("index {}", i.qualified_name()))?;
        }
        for pk in &self.primary_keys {
            require_table(
                &pk.schema,
                &pk.table,
                format!("primary key {}", pk.qualified_name()),
            )?;
        }
        for fk in &self.foreign_keys {
            require_table(
                &fk.schema,
                &fk.table,
                format!("foreign key {}", fk.qualified_name()),
            )?;
            require_table(
                &fk.ref_schema,
                &fk.ref_table,
                format!("foreign key {} (target)", fk.qualified_name()),
            )?;
        }
        for ck in &self.checks {
            require_table(
                &ck.schema,
                &ck.table,
                format!("check constraint {}", ck.qualified_name()),
            )?;
        }
        for p in &self.policies {
            require_table(&p.schema, &p.table, format!("policy {}", p.qualified_name()))?;
        }

        Ok(())
    }
}

/// Accumulates entities and key conflicts; `finish` surfaces every conflict
/// at once and then runs the structural gate.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    catalog: Catalog,
    duplicates: Vec<DuplicateEntity>,
}

impl CatalogBuilder {
    pub fn add_schema(&mut self, schema: Schema) -> &mut Self {
        if let Err(key) = self.catalog.schemas.push(schema) {
            self.duplicates.push(DuplicateEntity::Schema(key));
        }
        self
    }

    pub fn add_enum(&mut self, e: EnumType) -> &mut Self {
        if let Err(key) = self.catalog.enums.push(e) {
            self.duplicates.push(DuplicateEntity::Enum(key));
        }
        self
    }

    pub fn add_sequence(&mut self, sequence: Sequence) -> &mut Self {
        if let Err(key) = self.catalog.sequences.push(sequence) {
            self.duplicates.push(DuplicateEntity::Sequence(key));
        }
        self
    }

    pub fn add_role(&mut self, role: Role) -> &mut Self {
        if let Err(key) = self.catalog.roles.push(role) {
            self.duplicates.push(DuplicateEntity::Role(key));
        }
        self
    }

    pub fn add_table(&mut self, table: Table) -> &mut Self {
        if let Err(key) = self.catalog.tables.push(table) {
            self.duplicates.push(DuplicateEntity::Table(key));
        }
        self
    }

    pub fn add_column(&mut self, column: Column) -> &mut Self {
        if let Err(key) = self.catalog.columns.push(column) {
            self.duplicates.push(DuplicateEntity::Column(key));
        }
        self
    }

    pub fn add_index(&mut self, index: Index) -> &mut Self {
        if let Err(key) = self.catalog.indexes.push(index) {
            self.duplicates.push(DuplicateEntity::Index(key));
        }
        self
    }

    pub fn add_primary_key(&mut self, pk: PrimaryKey) -> &mut Self {
        if let Err(key) = self.catalog.primary_keys.push(pk) {
            self.duplicates.push(DuplicateEntity::PrimaryKey(key));
        }
        self
    }

    pub fn add_foreign_key(&mut self, fk: ForeignKey) -> &mut Self {
        if let Err(key) = self.catalog.foreign_keys.push(fk) {
            self.duplicates.push(DuplicateEntity::ForeignKey(key));
        }
        self
    }

    pub fn add_check(&mut self, check: CheckConstraint) -> &mut Self {
        if let Err(key) = self.catalog.checks.push(check) {
            self.duplicates.push(DuplicateEntity::Check(key));
        }
        self
    }

    pub fn add_policy(&mut self, policy: Policy) -> &mut Self {
        if let Err(key) = self.catalog.policies.push(policy) {
            self.duplicates.push(DuplicateEntity::Policy(key));
        }
        self
    }

    pub fn add_view(&mut self, view: View) -> &mut Self {
        if let Err(key) = self.catalog.views.push(view) {
            self.duplicates.push(DuplicateEntity::View(key));
        }
        self
    }

    /// Conflicts collected so far.
    pub fn duplicates(&self) -> &[DuplicateEntity] {
        &self.duplicates
    }

    pub fn finish(self) -> DriftResult<Catalog> {
        if !self.duplicates.is_empty() {
            return Err(DriftError::Duplicates(self.duplicates));
        }
        self.catalog.validate()?;
        Ok(self.catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::IndexColumn;

    #[test]
    fn test_push_conflict_keeps_first() {
        let mut set = EntitySet::new();
        set.push(Table::new("public", "users")).unwrap();
        let err = set.push(Table::new("public", "users").with_rls());
        assert_eq!(err.unwrap_err().to_string(), "public.users");
        assert_eq!(set.len(), 1);
        assert!(!set.iter().next().unwrap().rls_enabled);
    }

    #[test]
    fn test_one_and_list_filter_by_partial_key() {
        let mut set = EntitySet::new();
        set.push(Column::new("public", "users", "id", "integer"))
            .unwrap();
        set.push(Column::new("public", "users", "email", "text"))
            .unwrap();
        set.push(Column::new("public", "posts", "id", "integer"))
            .unwrap();

        let users = set.list(|c| c.schema == "public" && c.table == "users");
        assert_eq!(users.len(), 2);
        assert!(set.one(|c| c.table == "posts" && c.name == "id").is_some());
        assert!(set.one(|c| c.table == "posts" && c.name == "email").is_none());
    }

    #[test]
    fn test_update_rewrites_composite_fields_selectively() {
        let mut set = EntitySet::new();
        set.push(
            Index::new(
                "public",
                "users",
                "users_email_lower_idx",
                vec![
                    IndexColumn::named("email"),
                    IndexColumn::expression("lower(email)"),
                ],
            )
            .unique(),
        )
        .unwrap();

        let touched = set.update(
            |i| i.table == "users",
            |i| {
                for col in &mut i.columns {
                    if !col.is_expression && col.value == "email" {
                        col.value = "mail".into();
                    }
                }
            },
        );
        assert_eq!(touched, 1);
        let index = set.iter().next().unwrap();
        assert_eq!(index.columns[0].value, "mail");
        // Expression entries are left alone even when they mention the name.
        assert_eq!(index.columns[1].value, "lower(email)");
    }

    #[test]
    fn test_builder_collects_every_duplicate() {
        let mut builder = Catalog::builder();
        builder
            .add_table(Table::new("public", "users"))
            .add_table(Table::new("public", "users"))
            .add_column(Column::new("public", "users", "id", "integer"))
            .add_column(Column::new("public", "users", "id", "bigint"));
        let err = builder.finish().unwrap_err();
        match err {
            DriftError::Duplicates(list) => assert_eq!(list.len(), 2),
            other => panic!("expected Duplicates, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_requires_owning_and_target_tables() {
        let mut builder = Catalog::builder();
        builder
            .add_table(Table::new("public", "orders"))
            .add_column(Column::new("public", "orders", "user_id", "integer"))
            .add_foreign_key(ForeignKey::new(
                "public",
                "orders",
                "orders_user_id_users_id_fkey",
                vec!["user_id".into()],
                "public",
                "users",
                vec!["id".into()],
            ));
        let err = builder.finish().unwrap_err();
        assert!(err.to_string().contains("missing table public.users"));
    }
}
