//! Statement planning.
//!
//! Takes every entity kind's create/delete/rename/alter decisions and emits
//! one globally ordered list of abstract operations. The order is a fixed
//! total order chosen to satisfy the dependency constraints between kinds
//! (schemas before their tables, foreign-key drops before table drops,
//! enum recreation before the column alters that need the new type), not a
//! generic topological solve.

pub mod ops;

use std::collections::HashSet;

use tracing::debug;

use crate::diff::{Altered, ColumnDelta, PolicyDelta, Renamed, ViewDelta, enum_additions};
use crate::equiv::{self, ColumnTypeInfo};
use crate::error::{DriftError, DriftResult};
use crate::schema::store::Catalog;
use crate::schema::{
    CheckConstraint, Column, EnumType, ForeignKey, Index, Policy, PrimaryKey, Role, Schema,
    SchemaEntity, Sequence, Table, View,
};

pub use ops::Op;

/// Which alterations are eligible for emission.
///
/// `Plan` compares two declared schemas and honors everything. `Apply`
/// compares a live-introspected snapshot against a declared schema and
/// suppresses the alterations that cannot be round-tripped without a shadow
/// database: generated-column redefinition, check-constraint expression
/// rewrites, and policy predicate text changes. Those are resolved by the
/// operator through an explicit drop/recreate cycle instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffMode {
    Plan,
    Apply,
}

/// Per-kind outcome of diffing and resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct KindChanges<T> {
    pub created: Vec<T>,
    pub deleted: Vec<T>,
    pub renamed: Vec<Renamed<T>>,
    pub altered: Vec<Altered<T>>,
}

impl<T> Default for KindChanges<T> {
    fn default() -> Self {
        Self {
            created: Vec::new(),
            deleted: Vec::new(),
            renamed: Vec::new(),
            altered: Vec::new(),
        }
    }
}

impl<T> KindChanges<T> {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty()
            && self.deleted.is_empty()
            && self.renamed.is_empty()
            && self.altered.is_empty()
    }
}

/// Every kind's decisions, as assembled by the engine driver.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Decisions {
    pub schemas: KindChanges<Schema>,
    pub enums: KindChanges<EnumType>,
    pub sequences: KindChanges<Sequence>,
    pub roles: KindChanges<Role>,
    pub tables: KindChanges<Table>,
    pub columns: KindChanges<Column>,
    pub indexes: KindChanges<Index>,
    pub primary_keys: KindChanges<PrimaryKey>,
    pub foreign_keys: KindChanges<ForeignKey>,
    pub checks: KindChanges<CheckConstraint>,
    pub policies: KindChanges<Policy>,
    pub views: KindChanges<View>,
}

/// Assemble the ordered operation list.
pub fn build(decisions: &Decisions, after: &Catalog, mode: DiffMode) -> DriftResult<Vec<Op>> {
    let created_tables: HashSet<(&str, &str)> = decisions
        .tables
        .created
        .iter()
        .map(|t| (t.schema.as_str(), t.name.as_str()))
        .collect();
    let dropped_tables: HashSet<(&str, &str)> = decisions
        .tables
        .deleted
        .iter()
        .map(|t| (t.schema.as_str(), t.name.as_str()))
        .collect();

    let mut ops = Vec::new();
    let mut enum_recreates = Vec::new();

    // Schemas, enums, sequences, roles. Roles rename as drop+create because
    // the rename is not representable.
    for schema in &decisions.schemas.created {
        ops.push(Op::CreateSchema {
            schema: schema.clone(),
        });
    }
    for pair in &decisions.schemas.renamed {
        ops.push(Op::RenameSchema {
            from: pair.from.name.clone(),
            to: pair.to.name.clone(),
        });
    }

    for def in &decisions.enums.created {
        ops.push(Op::CreateEnum { def: def.clone() });
    }
    for pair in &decisions.enums.renamed {
        if pair.from.name != pair.to.name {
            ops.push(Op::RenameEnum {
                schema: pair.from.schema.clone(),
                from: pair.from.name.clone(),
                to: pair.to.name.clone(),
            });
        }
        if pair.from.schema != pair.to.schema {
            ops.push(Op::MoveEnum {
                name: pair.to.name.clone(),
                from_schema: pair.from.schema.clone(),
                to_schema: pair.to.schema.clone(),
            });
        }
    }
    for pair in &decisions.enums.altered {
        match enum_additions(&pair.before.values, &pair.after.values) {
            Some(added) if added.is_empty() => {}
            Some(added) => ops.push(Op::AlterEnum {
                def: pair.after.clone(),
                added,
            }),
            // Removals and reorders have no in-place form.
            None => enum_recreates.push((pair.before.clone(), pair.after.clone())),
        }
    }

    for sequence in &decisions.sequences.created {
        ops.push(Op::CreateSequence {
            sequence: sequence.clone(),
        });
    }
    for pair in &decisions.sequences.renamed {
        if pair.from.name != pair.to.name {
            ops.push(Op::RenameSequence {
                schema: pair.from.schema.clone(),
                from: pair.from.name.clone(),
                to: pair.to.name.clone(),
            });
        }
        if pair.from.schema != pair.to.schema {
            ops.push(Op::MoveSequence {
                name: pair.to.name.clone(),
                from_schema: pair.from.schema.clone(),
                to_schema: pair.to.schema.clone(),
            });
        }
    }
    for pair in &decisions.sequences.altered {
        if !equiv::sequence_options_equivalent(&pair.before.options, &pair.after.options) {
            ops.push(Op::AlterSequence {
                sequence: pair.after.clone(),
            });
        }
    }

    for role in &decisions.roles.deleted {
        ops.push(Op::DropRole {
            name: role.name.clone(),
        });
    }
    for role in &decisions.roles.created {
        ops.push(Op::CreateRole { role: role.clone() });
    }
    for pair in &decisions.roles.altered {
        ops.push(Op::AlterRole {
            role: pair.after.clone(),
        });
    }

    // Table creations, self-contained.
    for table in &decisions.tables.created {
        ops.push(create_table_op(table, after)?);
    }

    // Row-security toggles; view drops/renames/moves/recreations.
    for pair in &decisions.tables.altered {
        if pair.before.rls_enabled != pair.after.rls_enabled {
            ops.push(Op::SetRowSecurity {
                schema: pair.after.schema.clone(),
                table: pair.after.name.clone(),
                enabled: pair.after.rls_enabled,
            });
        }
    }
    for view in &decisions.views.deleted {
        ops.push(Op::DropView { view: view.clone() });
    }
    for pair in &decisions.views.renamed {
        if pair.from.name != pair.to.name {
            ops.push(Op::RenameView {
                schema: pair.from.schema.clone(),
                from: pair.from.name.clone(),
                to: pair.to.name.clone(),
            });
        }
        if pair.from.schema != pair.to.schema {
            ops.push(Op::MoveView {
                name: pair.to.name.clone(),
                from_schema: pair.from.schema.clone(),
                to_schema: pair.to.schema.clone(),
            });
        }
    }
    for pair in &decisions.views.altered {
        if !ViewDelta::between(&pair.before, &pair.after).is_empty() {
            ops.push(Op::RecreateView {
                from: pair.before.clone(),
                to: pair.after.clone(),
            });
        }
    }

    // Table renames; foreign-key drops (before any table drop, so no
    // dangling references); policy drops; table drops; schema moves; column
    // renames.
    for pair in &decisions.tables.renamed {
        if pair.from.name != pair.to.name {
            ops.push(Op::RenameTable {
                schema: pair.from.schema.clone(),
                from: pair.from.name.clone(),
                to: pair.to.name.clone(),
            });
        }
    }
    for fk in &decisions.foreign_keys.deleted {
        ops.push(Op::DropForeignKey {
            foreign_key: fk.clone(),
        });
    }
    for policy in &decisions.policies.deleted {
        if !dropped_tables.contains(&(policy.schema.as_str(), policy.table.as_str())) {
            ops.push(Op::DropPolicy {
                policy: policy.clone(),
            });
        }
    }
    for table in &decisions.tables.deleted {
        ops.push(Op::DropTable {
            schema: table.schema.clone(),
            name: table.name.clone(),
        });
    }
    for pair in &decisions.tables.renamed {
        if pair.from.schema != pair.to.schema {
            ops.push(Op::MoveTable {
                name: pair.to.name.clone(),
                from_schema: pair.from.schema.clone(),
                to_schema: pair.to.schema.clone(),
            });
        }
    }
    for pair in &decisions.columns.renamed {
        ops.push(Op::RenameColumn {
            schema: pair.to.schema.clone(),
            table: pair.to.table.clone(),
            from: pair.from.name.clone(),
            to: pair.to.name.clone(),
        });
    }

    // Check drops; index renames/drops/recreations; primary-key drops.
    for check in &decisions.checks.deleted {
        if !dropped_tables.contains(&(check.schema.as_str(), check.table.as_str())) {
            ops.push(Op::DropCheck {
                check: check.clone(),
            });
        }
    }
    for pair in &decisions.indexes.renamed {
        ops.push(Op::RenameIndex {
            schema: pair.from.schema.clone(),
            from: pair.from.name.clone(),
            to: pair.to.name.clone(),
        });
    }
    for index in &decisions.indexes.deleted {
        if !dropped_tables.contains(&(index.schema.as_str(), index.table.as_str())) {
            ops.push(Op::DropIndex {
                index: index.clone(),
            });
        }
    }
    for pair in &decisions.indexes.altered {
        ops.push(Op::RecreateIndex {
            from: pair.before.clone(),
            to: pair.after.clone(),
        });
    }
    for pk in &decisions.primary_keys.deleted {
        if !dropped_tables.contains(&(pk.schema.as_str(), pk.table.as_str())) {
            ops.push(Op::DropPrimaryKey {
                primary_key: pk.clone(),
            });
        }
    }

    // Primary-key renames; foreign-key renames; column additions; column
    // recreations.
    for pair in &decisions.primary_keys.renamed {
        ops.push(Op::RenamePrimaryKey {
            schema: pair.from.schema.clone(),
            from: pair.from.name.clone(),
            to: pair.to.name.clone(),
        });
    }
    for pair in &decisions.foreign_keys.renamed {
        ops.push(Op::RenameForeignKey {
            schema: pair.from.schema.clone(),
            from: pair.from.name.clone(),
            to: pair.to.name.clone(),
        });
    }
    for column in &decisions.columns.created {
        if !created_tables.contains(&(column.schema.as_str(), column.table.as_str())) {
            ops.push(Op::AddColumn {
                column: column.clone(),
            });
        }
    }

    let mut column_alters = Vec::new();
    let mut not_null_adds = Vec::new();
    let mut not_null_drops = Vec::new();
    for pair in &decisions.columns.altered {
        let plan = column_alteration(pair, mode);
        if let Some(op) = plan.recreate {
            ops.push(op);
        }
        not_null_adds.extend(plan.add_not_null);
        not_null_drops.extend(plan.drop_not_null);
        column_alters.extend(plan.alter);
    }

    // Enum recreations, before the column alters so the new type exists
    // first.
    for (from, to) in enum_recreates {
        if after.enums.get(&to.key()).is_none() {
            return Err(DriftError::Planner(format!(
                "enum recreate pairing {} -> {} references a target missing from the after catalog",
                from.qualified_name(),
                to.qualified_name()
            )));
        }
        let columns = after.columns_using_enum(&to).into_iter().cloned().collect();
        ops.push(Op::RecreateEnum { from, to, columns });
    }

    // Not-null additions; column alters; primary-key additions/recreations;
    // not-null drops.
    ops.extend(not_null_adds);
    ops.extend(column_alters);
    for pk in &decisions.primary_keys.created {
        if !created_tables.contains(&(pk.schema.as_str(), pk.table.as_str())) {
            ops.push(Op::CreatePrimaryKey {
                primary_key: pk.clone(),
            });
        }
    }
    for pair in &decisions.primary_keys.altered {
        ops.push(Op::RecreatePrimaryKey {
            from: pair.before.clone(),
            to: pair.after.clone(),
        });
    }
    ops.extend(not_null_drops);

    // Foreign-key creations/recreations; index creations. Foreign keys are
    // never folded into table creation: both end tables must exist first.
    for fk in &decisions.foreign_keys.created {
        ops.push(Op::CreateForeignKey {
            foreign_key: fk.clone(),
        });
    }
    for pair in &decisions.foreign_keys.altered {
        ops.push(Op::RecreateForeignKey {
            from: pair.before.clone(),
            to: pair.after.clone(),
        });
    }
    for index in &decisions.indexes.created {
        if !created_tables.contains(&(index.schema.as_str(), index.table.as_str())) {
            ops.push(Op::CreateIndex {
                index: index.clone(),
            });
        }
    }

    // Column drops; check additions/alterations; view creations; policy
    // renames/creations/alterations.
    for column in &decisions.columns.deleted {
        if !dropped_tables.contains(&(column.schema.as_str(), column.table.as_str())) {
            ops.push(Op::DropColumn {
                column: column.clone(),
            });
        }
    }
    for check in &decisions.checks.created {
        if !created_tables.contains(&(check.schema.as_str(), check.table.as_str())) {
            ops.push(Op::CreateCheck {
                check: check.clone(),
            });
        }
    }
    for pair in &decisions.checks.altered {
        match mode {
            DiffMode::Plan => ops.push(Op::RecreateCheck {
                from: pair.before.clone(),
                to: pair.after.clone(),
            }),
            DiffMode::Apply => {
                debug!(
                    check = %pair.after.qualified_name(),
                    "suppressing check expression rewrite in apply mode"
                );
            }
        }
    }
    for view in &decisions.views.created {
        ops.push(Op::CreateView { view: view.clone() });
    }
    for pair in &decisions.policies.renamed {
        ops.push(Op::RenamePolicy {
            schema: pair.to.schema.clone(),
            table: pair.to.table.clone(),
            from: pair.from.name.clone(),
            to: pair.to.name.clone(),
        });
    }
    for policy in &decisions.policies.created {
        if !created_tables.contains(&(policy.schema.as_str(), policy.table.as_str())) {
            ops.push(Op::CreatePolicy {
                policy: policy.clone(),
            });
        }
    }
    for pair in &decisions.policies.altered {
        ops.extend(policy_alteration(pair, mode));
    }

    // Enum drops, sequence drops, schema drops: reverse of creation order,
    // dependents first.
    for def in &decisions.enums.deleted {
        ops.push(Op::DropEnum { def: def.clone() });
    }
    for sequence in &decisions.sequences.deleted {
        ops.push(Op::DropSequence {
            sequence: sequence.clone(),
        });
    }
    for schema in &decisions.schemas.deleted {
        ops.push(Op::DropSchema {
            schema: schema.clone(),
        });
    }

    debug!(total = ops.len(), "assembled plan");
    Ok(ops)
}

fn create_table_op(table: &Table, after: &Catalog) -> DriftResult<Op> {
    if after.tables.get(&table.key()).is_none() {
        return Err(DriftError::Planner(format!(
            "created table {} is missing from the after catalog",
            table.qualified_name()
        )));
    }
    Ok(Op::CreateTable {
        table: table.clone(),
        columns: after
            .columns_of(&table.schema, &table.name)
            .into_iter()
            .cloned()
            .collect(),
        primary_key: after.primary_key_of(&table.schema, &table.name).cloned(),
        checks: after
            .checks
            .list(|c| c.schema == table.schema && c.table == table.name)
            .into_iter()
            .cloned()
            .collect(),
        indexes: after
            .indexes
            .list(|i| i.schema == table.schema && i.table == table.name)
            .into_iter()
            .cloned()
            .collect(),
        policies: after
            .policies
            .list(|p| p.schema == table.schema && p.table == table.name)
            .into_iter()
            .cloned()
            .collect(),
    })
}

struct ColumnPlan {
    recreate: Option<Op>,
    add_not_null: Option<Op>,
    drop_not_null: Option<Op>,
    alter: Option<Op>,
}

fn column_alteration(pair: &Altered<Column>, mode: DiffMode) -> ColumnPlan {
    let mut plan = ColumnPlan {
        recreate: None,
        add_not_null: None,
        drop_not_null: None,
        alter: None,
    };
    let mut delta = ColumnDelta::between(&pair.before, &pair.after);

    // Semantic filtering: formatting drift is not a change.
    let info = ColumnTypeInfo::parse(&pair.after.type_name, pair.after.dimensions);
    if let Some(change) = &delta.default {
        if let (Some(from), Some(to)) = (&change.from, &change.to) {
            if equiv::defaults_equivalent(&info, &from.value, &to.value) {
                delta.default = None;
            }
        }
    }
    if let Some(change) = &delta.identity {
        if let (Some(from), Some(to)) = (&change.from, &change.to) {
            if equiv::identity_equivalent(from, to) {
                delta.identity = None;
            }
        }
    }

    if delta.generated.is_some() {
        match mode {
            // No in-place form; drop and re-add the whole column.
            DiffMode::Plan => {
                plan.recreate = Some(Op::RecreateColumn {
                    from: pair.before.clone(),
                    to: pair.after.clone(),
                });
                return plan;
            }
            DiffMode::Apply => {
                debug!(
                    column = %pair.after.qualified_name(),
                    "suppressing generated-column redefinition in apply mode"
                );
                delta.generated = None;
            }
        }
    }

    match &delta.not_null {
        Some(change) if change.to => {
            plan.add_not_null = Some(Op::AddNotNull {
                schema: pair.after.schema.clone(),
                table: pair.after.table.clone(),
                column: pair.after.name.clone(),
            });
        }
        Some(_) => {
            plan.drop_not_null = Some(Op::DropNotNull {
                schema: pair.after.schema.clone(),
                table: pair.after.table.clone(),
                column: pair.after.name.clone(),
            });
        }
        None => {}
    }

    if delta.r#type.is_some() || delta.default.is_some() || delta.identity.is_some() {
        plan.alter = Some(Op::AlterColumn {
            schema: pair.after.schema.clone(),
            table: pair.after.table.clone(),
            name: pair.after.name.clone(),
            data_type: delta.r#type,
            default: delta.default,
            identity: delta.identity,
        });
    }
    plan
}

fn policy_alteration(pair: &Altered<Policy>, mode: DiffMode) -> Option<Op> {
    let mut delta = PolicyDelta::between(&pair.before, &pair.after);

    // Role and command lists are sets; ordering drift is not a change.
    if let Some(change) = &delta.roles {
        if equiv::unordered_eq(&change.from, &change.to) {
            delta.roles = None;
        }
    }
    if let Some(change) = &delta.commands {
        if equiv::unordered_eq(&change.from, &change.to) {
            delta.commands = None;
        }
    }

    if delta.permissive.is_some() || delta.commands.is_some() {
        // ALTER POLICY cannot change the kind or command set.
        return Some(Op::RecreatePolicy {
            from: pair.before.clone(),
            to: pair.after.clone(),
        });
    }

    if mode == DiffMode::Apply && (delta.using.is_some() || delta.with_check.is_some()) {
        debug!(
            policy = %pair.after.qualified_name(),
            "suppressing policy predicate change in apply mode"
        );
        delta.using = None;
        delta.with_check = None;
    }

    if delta.roles.is_none() && delta.using.is_none() && delta.with_check.is_none() {
        return None;
    }
    Some(Op::AlterPolicy {
        policy: pair.after.clone(),
        roles: delta.roles,
        using: delta.using,
        with_check: delta.with_check,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnDefault, GeneratedSpec, IndexColumn};

    fn position_of(ops: &[Op], pred: impl Fn(&Op) -> bool) -> usize {
        ops.iter().position(pred).expect("expected operation missing")
    }

    #[test]
    fn test_fk_drop_precedes_table_drop() {
        let mut decisions = Decisions::default();
        decisions.tables.deleted.push(Table::new("public", "users"));
        decisions.foreign_keys.deleted.push(ForeignKey::new(
            "public",
            "orders",
            "orders_user_id_users_id_fkey",
            vec!["user_id".into()],
            "public",
            "users",
            vec!["id".into()],
        ));

        let ops = build(&decisions, &Catalog::default(), DiffMode::Plan).unwrap();
        let fk_drop = position_of(&ops, |op| matches!(op, Op::DropForeignKey { .. }));
        let table_drop = position_of(&ops, |op| matches!(op, Op::DropTable { .. }));
        assert!(fk_drop < table_drop);
    }

    #[test]
    fn test_created_table_folds_members() {
        let mut builder = Catalog::builder();
        builder
            .add_table(Table::new("public", "users"))
            .add_column(Column::new("public", "users", "id", "integer").not_null())
            .add_primary_key(
                PrimaryKey::new("public", "users", "users_pkey", vec!["id".into()])
                    .default_named(),
            )
            .add_index(
                Index::new(
                    "public",
                    "users",
                    "users_email_key",
                    vec![IndexColumn::named("email")],
                )
                .unique()
                .default_named(),
            );
        let after = builder.finish().unwrap();

        let mut decisions = Decisions::default();
        decisions.tables.created.push(Table::new("public", "users"));
        decisions
            .columns
            .created
            .push(Column::new("public", "users", "id", "integer").not_null());
        decisions.primary_keys.created.push(
            PrimaryKey::new("public", "users", "users_pkey", vec!["id".into()]).default_named(),
        );
        decisions.indexes.created.push(
            Index::new(
                "public",
                "users",
                "users_email_key",
                vec![IndexColumn::named("email")],
            )
            .unique()
            .default_named(),
        );

        let ops = build(&decisions, &after, DiffMode::Plan).unwrap();
        assert_eq!(ops.len(), 1);
        match &ops[0] {
            Op::CreateTable {
                columns,
                primary_key,
                indexes,
                ..
            } => {
                assert_eq!(columns.len(), 1);
                assert!(primary_key.is_some());
                assert_eq!(indexes.len(), 1);
            }
            other => panic!("expected CreateTable, got {other}"),
        }
    }

    #[test]
    fn test_schema_created_before_table() {
        let mut builder = Catalog::builder();
        builder
            .add_schema(Schema::new("s"))
            .add_table(Table::new("s", "t"));
        let after = builder.finish().unwrap();

        let mut decisions = Decisions::default();
        decisions.schemas.created.push(Schema::new("s"));
        decisions.tables.created.push(Table::new("s", "t"));

        let ops = build(&decisions, &after, DiffMode::Plan).unwrap();
        assert_eq!(ops.len(), 2);
        assert!(matches!(&ops[0], Op::CreateSchema { schema } if schema.name == "s"));
        assert!(matches!(&ops[1], Op::CreateTable { table, .. } if table.name == "t"));
    }

    #[test]
    fn test_enum_value_removal_recreates_with_dependents() {
        let mut builder = Catalog::builder();
        builder
            .add_enum(EnumType::new("public", "mood", vec!["a".into(), "c".into()]))
            .add_table(Table::new("public", "users"))
            .add_column(Column::new("public", "users", "mood", "mood"));
        let after = builder.finish().unwrap();

        let mut decisions = Decisions::default();
        decisions.enums.altered.push(Altered {
            before: EnumType::new("public", "mood", vec!["a".into(), "b".into(), "c".into()]),
            after: EnumType::new("public", "mood", vec!["a".into(), "c".into()]),
        });

        let ops = build(&decisions, &after, DiffMode::Plan).unwrap();
        assert_eq!(ops.len(), 1);
        match &ops[0] {
            Op::RecreateEnum { columns, .. } => {
                assert_eq!(columns.len(), 1);
                assert_eq!(columns[0].name, "mood");
            }
            other => panic!("expected RecreateEnum, got {other}"),
        }
    }

    #[test]
    fn test_enum_value_append_alters_in_place() {
        let mut decisions = Decisions::default();
        decisions.enums.altered.push(Altered {
            before: EnumType::new("public", "mood", vec!["a".into()]),
            after: EnumType::new("public", "mood", vec!["a".into(), "b".into()]),
        });

        let ops = build(&decisions, &Catalog::default(), DiffMode::Plan).unwrap();
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], Op::AlterEnum { added, .. } if added.len() == 1));
    }

    #[test]
    fn test_equivalent_default_is_not_an_alter() {
        let before = Column::new("public", "t", "price", "numeric(10,2)")
            .default_value(ColumnDefault::literal("1.5"));
        let after = Column::new("public", "t", "price", "numeric(10,2)")
            .default_value(ColumnDefault::literal("1.50"));

        let mut decisions = Decisions::default();
        decisions.columns.altered.push(Altered { before, after });

        let ops = build(&decisions, &Catalog::default(), DiffMode::Plan).unwrap();
        assert!(ops.is_empty());
    }

    #[test]
    fn test_generated_change_recreates_in_plan_mode_only() {
        let before = Column::new("public", "t", "slug", "text");
        let after =
            Column::new("public", "t", "slug", "text").generated(GeneratedSpec::stored("lower(name)"));
        let mut decisions = Decisions::default();
        decisions.columns.altered.push(Altered { before, after });

        let planned = build(&decisions, &Catalog::default(), DiffMode::Plan).unwrap();
        assert!(matches!(&planned[0], Op::RecreateColumn { .. }));

        let applied = build(&decisions, &Catalog::default(), DiffMode::Apply).unwrap();
        assert!(applied.is_empty());
    }

    #[test]
    fn test_check_rewrite_suppressed_in_apply_mode() {
        let mut decisions = Decisions::default();
        decisions.checks.altered.push(Altered {
            before: CheckConstraint::new("public", "t", "t_check", "x > 0"),
            after: CheckConstraint::new("public", "t", "t_check", "x > 1"),
        });

        let planned = build(&decisions, &Catalog::default(), DiffMode::Plan).unwrap();
        assert!(matches!(&planned[0], Op::RecreateCheck { .. }));
        let applied = build(&decisions, &Catalog::default(), DiffMode::Apply).unwrap();
        assert!(applied.is_empty());
    }

    #[test]
    fn test_policy_predicate_suppressed_in_apply_mode_but_roles_kept() {
        let before = Policy::new("public", "t", "p")
            .roles(vec!["a".into()])
            .using("true");
        let after = Policy::new("public", "t", "p")
            .roles(vec!["a".into(), "b".into()])
            .using("false");
        let mut decisions = Decisions::default();
        decisions.policies.altered.push(Altered { before, after });

        let applied = build(&decisions, &Catalog::default(), DiffMode::Apply).unwrap();
        assert_eq!(applied.len(), 1);
        match &applied[0] {
            Op::AlterPolicy { roles, using, .. } => {
                assert!(roles.is_some());
                assert!(using.is_none());
            }
            other => panic!("expected AlterPolicy, got {other}"),
        }
    }

    #[test]
    fn test_policy_role_order_drift_is_no_change() {
        let before = Policy::new("public", "t", "p").roles(vec!["a".into(), "b".into()]);
        let after = Policy::new("public", "t", "p").roles(vec!["b".into(), "a".into()]);
        let mut decisions = Decisions::default();
        decisions.policies.altered.push(Altered { before, after });

        let ops = build(&decisions, &Catalog::default(), DiffMode::Plan).unwrap();
        assert!(ops.is_empty());
    }

    #[test]
    fn test_role_rename_is_drop_then_create() {
        let mut decisions = Decisions::default();
        decisions.roles.deleted.push(Role::new("old_admin"));
        decisions.roles.created.push(Role::new("new_admin"));

        let ops = build(&decisions, &Catalog::default(), DiffMode::Plan).unwrap();
        assert!(matches!(&ops[0], Op::DropRole { name } if name == "old_admin"));
        assert!(matches!(&ops[1], Op::CreateRole { role } if role.name == "new_admin"));
    }

    #[test]
    fn test_not_null_ordering_around_alters() {
        let before = Column::new("public", "t", "a", "integer");
        let after = Column::new("public", "t", "a", "bigint").not_null();
        let mut decisions = Decisions::default();
        decisions.columns.altered.push(Altered { before, after });

        let ops = build(&decisions, &Catalog::default(), DiffMode::Plan).unwrap();
        let not_null = position_of(&ops, |op| matches!(op, Op::AddNotNull { .. }));
        let alter = position_of(&ops, |op| matches!(op, Op::AlterColumn { .. }));
        assert!(not_null < alter);
    }
}
