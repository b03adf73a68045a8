//! Abstract change operations.
//!
//! One variant per entity-kind-and-action pair. Each operation carries every
//! payload its renderer needs: a dialect renderer turns one operation into
//! one or more SQL statements without consulting the catalog again. The
//! serialized form is a tagged object (`"type": "create_table"`, ...), the
//! snapshot-journal wire format.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::diff::{Change, ColumnTypeRef, EnumValueAdd};
use crate::schema::{
    CheckConstraint, Column, ColumnDefault, EnumType, ForeignKey, IdentitySpec, Index, Policy,
    PrimaryKey, Role, Schema, Sequence, Table, View,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Op {
    // Schemas
    CreateSchema {
        schema: Schema,
    },
    RenameSchema {
        from: String,
        to: String,
    },
    DropSchema {
        schema: Schema,
    },

    // Enums
    CreateEnum {
        def: EnumType,
    },
    RenameEnum {
        schema: String,
        from: String,
        to: String,
    },
    MoveEnum {
        name: String,
        from_schema: String,
        to_schema: String,
    },
    /// In-place value additions; only valid when the old value list survives
    /// as an ordered subsequence of the new one.
    AlterEnum {
        def: EnumType,
        added: Vec<EnumValueAdd>,
    },
    /// Full type replacement: dependent columns are downcast to text, the
    /// type dropped and recreated, then columns upcast back with their
    /// defaults reapplied. The only representation for value removals.
    RecreateEnum {
        from: EnumType,
        to: EnumType,
        columns: Vec<Column>,
    },
    DropEnum {
        def: EnumType,
    },

    // Sequences
    CreateSequence {
        sequence: Sequence,
    },
    RenameSequence {
        schema: String,
        from: String,
        to: String,
    },
    MoveSequence {
        name: String,
        from_schema: String,
        to_schema: String,
    },
    /// Restates the full option set of the target state.
    AlterSequence {
        sequence: Sequence,
    },
    DropSequence {
        sequence: Sequence,
    },

    // Roles. Renaming is unsupported; a renamed role plans as drop+create.
    CreateRole {
        role: Role,
    },
    AlterRole {
        role: Role,
    },
    DropRole {
        name: String,
    },

    // Tables
    /// Self-contained: members of a table created in this diff ride along
    /// here instead of being emitted independently. Foreign keys are the
    /// exception; they wait for both end tables in their own operations.
    CreateTable {
        table: Table,
        columns: Vec<Column>,
        primary_key: Option<PrimaryKey>,
        checks: Vec<CheckConstraint>,
        indexes: Vec<Index>,
        policies: Vec<Policy>,
    },
    RenameTable {
        schema: String,
        from: String,
        to: String,
    },
    MoveTable {
        name: String,
        from_schema: String,
        to_schema: String,
    },
    DropTable {
        schema: String,
        name: String,
    },
    SetRowSecurity {
        schema: String,
        table: String,
        enabled: bool,
    },

    // Views
    CreateView {
        view: View,
    },
    DropView {
        view: View,
    },
    RenameView {
        schema: String,
        from: String,
        to: String,
    },
    MoveView {
        name: String,
        from_schema: String,
        to_schema: String,
    },
    RecreateView {
        from: View,
        to: View,
    },

    // Columns
    AddColumn {
        column: Column,
    },
    DropColumn {
        column: Column,
    },
    RenameColumn {
        schema: String,
        table: String,
        from: String,
        to: String,
    },
    /// Drop and re-add, for changes with no in-place form (generated-column
    /// redefinition).
    RecreateColumn {
        from: Column,
        to: Column,
    },
    /// In-place alterations; not-null transitions are separate operations
    /// because they order differently.
    AlterColumn {
        schema: String,
        table: String,
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        data_type: Option<Change<ColumnTypeRef>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        default: Option<Change<Option<ColumnDefault>>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        identity: Option<Change<Option<IdentitySpec>>>,
    },
    AddNotNull {
        schema: String,
        table: String,
        column: String,
    },
    DropNotNull {
        schema: String,
        table: String,
        column: String,
    },

    // Primary keys
    CreatePrimaryKey {
        primary_key: PrimaryKey,
    },
    DropPrimaryKey {
        primary_key: PrimaryKey,
    },
    RenamePrimaryKey {
        schema: String,
        from: String,
        to: String,
    },
    RecreatePrimaryKey {
        from: PrimaryKey,
        to: PrimaryKey,
    },

    // Foreign keys
    CreateForeignKey {
        foreign_key: ForeignKey,
    },
    DropForeignKey {
        foreign_key: ForeignKey,
    },
    RenameForeignKey {
        schema: String,
        from: String,
        to: String,
    },
    RecreateForeignKey {
        from: ForeignKey,
        to: ForeignKey,
    },

    // Indexes
    CreateIndex {
        index: Index,
    },
    DropIndex {
        index: Index,
    },
    RenameIndex {
        schema: String,
        from: String,
        to: String,
    },
    RecreateIndex {
        from: Index,
        to: Index,
    },

    // Check constraints
    CreateCheck {
        check: CheckConstraint,
    },
    DropCheck {
        check: CheckConstraint,
    },
    RecreateCheck {
        from: CheckConstraint,
        to: CheckConstraint,
    },

    // Policies
    CreatePolicy {
        policy: Policy,
    },
    DropPolicy {
        policy: Policy,
    },
    RenamePolicy {
        schema: String,
        table: String,
        from: String,
        to: String,
    },
    /// In-place changes ALTER POLICY can express: role list and predicates.
    AlterPolicy {
        policy: Policy,
        #[serde(skip_serializing_if = "Option::is_none")]
        roles: Option<Change<Vec<String>>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        using: Option<Change<Option<String>>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        with_check: Option<Change<Option<String>>>,
    },
    /// For changes ALTER POLICY cannot express (permissive flag, command
    /// set).
    RecreatePolicy {
        from: Policy,
        to: Policy,
    },
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::CreateSchema { schema } => write!(f, "+ schema {}", schema.name),
            Op::RenameSchema { from, to } => write!(f, "~ schema {from} -> {to}"),
            Op::DropSchema { schema } => write!(f, "- schema {}", schema.name),
            Op::CreateEnum { def } => write!(f, "+ enum {}.{}", def.schema, def.name),
            Op::RenameEnum { schema, from, to } => {
                write!(f, "~ enum {schema}.{from} -> {to}")
            }
            Op::MoveEnum {
                name,
                from_schema,
                to_schema,
            } => write!(f, "~ enum {from_schema}.{name} -> {to_schema}.{name}"),
            Op::AlterEnum { def, added } => {
                write!(f, "~ enum {}.{} (+{} values)", def.schema, def.name, added.len())
            }
            Op::RecreateEnum { to, columns, .. } => write!(
                f,
                "! enum {}.{} (recreate, {} dependent columns)",
                to.schema,
                to.name,
                columns.len()
            ),
            Op::DropEnum { def } => write!(f, "- enum {}.{}", def.schema, def.name),
            Op::CreateSequence { sequence } => {
                write!(f, "+ sequence {}.{}", sequence.schema, sequence.name)
            }
            Op::RenameSequence { schema, from, to } => {
                write!(f, "~ sequence {schema}.{from} -> {to}")
            }
            Op::MoveSequence {
                name,
                from_schema,
                to_schema,
            } => write!(f, "~ sequence {from_schema}.{name} -> {to_schema}.{name}"),
            Op::AlterSequence { sequence } => {
                write!(f, "~ sequence {}.{}", sequence.schema, sequence.name)
            }
            Op::DropSequence { sequence } => {
                write!(f, "- sequence {}.{}", sequence.schema, sequence.name)
            }
            Op::CreateRole { role } => write!(f, "+ role {}", role.name),
            Op::AlterRole { role } => write!(f, "~ role {}", role.name),
            Op::DropRole { name } => write!(f, "- role {name}"),
            Op::CreateTable { table, columns, .. } => write!(
                f,
                "+ table {}.{} ({} columns)",
                table.schema,
                table.name,
                columns.len()
            ),
            Op::RenameTable { schema, from, to } => {
                write!(f, "~ table {schema}.{from} -> {to}")
            }
            Op::MoveTable {
                name,
                from_schema,
                to_schema,
            } => write!(f, "~ table {from_schema}.{name} -> {to_schema}.{name}"),
            Op::DropTable { schema, name } => write!(f, "- table {schema}.{name}"),
            Op::SetRowSecurity {
                schema,
                table,
                enabled,
            } => write!(
                f,
                "~ table {schema}.{table} row security {}",
                if *enabled { "on" } else { "off" }
            ),
            Op::CreateView { view } => write!(f, "+ view {}.{}", view.schema, view.name),
            Op::DropView { view } => write!(f, "- view {}.{}", view.schema, view.name),
            Op::RenameView { schema, from, to } => {
                write!(f, "~ view {schema}.{from} -> {to}")
            }
            Op::MoveView {
                name,
                from_schema,
                to_schema,
            } => write!(f, "~ view {from_schema}.{name} -> {to_schema}.{name}"),
            Op::RecreateView { to, .. } => {
                write!(f, "! view {}.{} (recreate)", to.schema, to.name)
            }
            Op::AddColumn { column } => write!(
                f,
                "+ column {}.{}.{}",
                column.schema, column.table, column.name
            ),
            Op::DropColumn { column } => write!(
                f,
                "- column {}.{}.{}",
                column.schema, column.table, column.name
            ),
            Op::RenameColumn {
                schema,
                table,
                from,
                to,
            } => write!(f, "~ column {schema}.{table}.{from} -> {to}"),
            Op::RecreateColumn { to, .. } => write!(
                f,
                "! column {}.{}.{} (recreate)",
                to.schema, to.table, to.name
            ),
            Op::AlterColumn {
                schema,
                table,
                name,
                ..
            } => write!(f, "~ column {schema}.{table}.{name}"),
            Op::AddNotNull {
                schema,
                table,
                column,
            } => write!(f, "~ column {schema}.{table}.{column} set not null"),
            Op::DropNotNull {
                schema,
                table,
                column,
            } => write!(f, "~ column {schema}.{table}.{column} drop not null"),
            Op::CreatePrimaryKey { primary_key } => write!(
                f,
                "+ primary key {}.{}",
                primary_key.schema, primary_key.name
            ),
            Op::DropPrimaryKey { primary_key } => write!(
                f,
                "- primary key {}.{}",
                primary_key.schema, primary_key.name
            ),
            Op::RenamePrimaryKey { schema, from, to } => {
                write!(f, "~ primary key {schema}.{from} -> {to}")
            }
            Op::RecreatePrimaryKey { to, .. } => {
                write!(f, "! primary key {}.{} (recreate)", to.schema, to.name)
            }
            Op::CreateForeignKey { foreign_key } => write!(
                f,
                "+ foreign key {}.{}",
                foreign_key.schema, foreign_key.name
            ),
            Op::DropForeignKey { foreign_key } => write!(
                f,
                "- foreign key {}.{}",
                foreign_key.schema, foreign_key.name
            ),
            Op::RenameForeignKey { schema, from, to } => {
                write!(f, "~ foreign key {schema}.{from} -> {to}")
            }
            Op::RecreateForeignKey { to, .. } => {
                write!(f, "! foreign key {}.{} (recreate)", to.schema, to.name)
            }
            Op::CreateIndex { index } => write!(f, "+ index {}.{}", index.schema, index.name),
            Op::DropIndex { index } => write!(f, "- index {}.{}", index.schema, index.name),
            Op::RenameIndex { schema, from, to } => {
                write!(f, "~ index {schema}.{from} -> {to}")
            }
            Op::RecreateIndex { to, .. } => {
                write!(f, "! index {}.{} (recreate)", to.schema, to.name)
            }
            Op::CreateCheck { check } => write!(f, "+ check {}.{}", check.schema, check.name),
            Op::DropCheck { check } => write!(f, "- check {}.{}", check.schema, check.name),
            Op::RecreateCheck { to, .. } => {
                write!(f, "! check {}.{} (recreate)", to.schema, to.name)
            }
            Op::CreatePolicy { policy } => write!(
                f,
                "+ policy {}.{}.{}",
                policy.schema, policy.table, policy.name
            ),
            Op::DropPolicy { policy } => write!(
                f,
                "- policy {}.{}.{}",
                policy.schema, policy.table, policy.name
            ),
            Op::RenamePolicy {
                schema,
                table,
                from,
                to,
            } => write!(f, "~ policy {schema}.{table}.{from} -> {to}"),
            Op::AlterPolicy { policy, .. } => write!(
                f,
                "~ policy {}.{}.{}",
                policy.schema, policy.table, policy.name
            ),
            Op::RecreatePolicy { to, .. } => write!(
                f,
                "! policy {}.{}.{} (recreate)",
                to.schema, to.table, to.name
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_form_is_tagged() {
        let op = Op::CreateSchema {
            schema: Schema::new("app"),
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["type"], "create_schema");
        assert_eq!(json["schema"]["name"], "app");

        let back: Op = serde_json::from_value(json).unwrap();
        assert_eq!(back, op);
    }

    #[test]
    fn test_alter_column_omits_untouched_fields() {
        let op = Op::AlterColumn {
            schema: "public".into(),
            table: "users".into(),
            name: "age".into(),
            data_type: Some(Change {
                from: ColumnTypeRef {
                    name: "integer".into(),
                    schema: None,
                    dimensions: 0,
                },
                to: ColumnTypeRef {
                    name: "bigint".into(),
                    schema: None,
                    dimensions: 0,
                },
            }),
            default: None,
            identity: None,
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["type"], "alter_column");
        assert!(json.get("default").is_none());
        assert!(json.get("data_type").is_some());
    }

    #[test]
    fn test_display_is_compact() {
        let op = Op::DropTable {
            schema: "public".into(),
            name: "legacy".into(),
        };
        assert_eq!(op.to_string(), "- table public.legacy");
    }
}
