//! Rename propagation.
//!
//! Once the resolver accepts a rename or schema move, every "before"-side
//! entity still referring to the old identifier must be rewritten before the
//! next, dependent entity kind is diffed. Propagation therefore runs in
//! dependency order: schemas → enums → sequences → tables → columns →
//! (indexes, primary keys, foreign keys, checks) → policies → views.
//! Only the before catalog is ever mutated; the after catalog stays as the
//! producer built it.

use tracing::debug;

use crate::schema::store::Catalog;
use crate::schema::{EnumType, Policy, Sequence, Table, View};

/// Rewrite every reference to a renamed schema.
pub fn schema_renamed(catalog: &mut Catalog, from: &str, to: &str) {
    debug!(from, to, "propagating schema rename");

    catalog
        .schemas
        .update(|s| s.name == from, |s| s.name = to.to_string());
    catalog
        .enums
        .update(|e| e.schema == from, |e| e.schema = to.to_string());
    catalog
        .sequences
        .update(|s| s.schema == from, |s| s.schema = to.to_string());
    catalog
        .tables
        .update(|t| t.schema == from, |t| t.schema = to.to_string());
    catalog.columns.update(
        |c| c.schema == from || c.type_schema.as_deref() == Some(from),
        |c| {
            if c.schema == from {
                c.schema = to.to_string();
            }
            if c.type_schema.as_deref() == Some(from) {
                c.type_schema = Some(to.to_string());
            }
        },
    );
    catalog
        .indexes
        .update(|i| i.schema == from, |i| i.schema = to.to_string());
    catalog
        .primary_keys
        .update(|pk| pk.schema == from, |pk| pk.schema = to.to_string());
    catalog.foreign_keys.update(
        |fk| fk.schema == from || fk.ref_schema == from,
        |fk| {
            if fk.schema == from {
                fk.schema = to.to_string();
            }
            if fk.ref_schema == from {
                fk.ref_schema = to.to_string();
            }
        },
    );
    catalog
        .checks
        .update(|ck| ck.schema == from, |ck| ck.schema = to.to_string());
    catalog
        .policies
        .update(|p| p.schema == from, |p| p.schema = to.to_string());
    catalog
        .views
        .update(|v| v.schema == from, |v| v.schema = to.to_string());
}

/// Rewrite an enum rename and/or schema move, including the type reference
/// of every column using it.
pub fn enum_changed(catalog: &mut Catalog, from: &EnumType, to: &EnumType) {
    debug!(
        from_schema = %from.schema,
        from_name = %from.name,
        to_schema = %to.schema,
        to_name = %to.name,
        "propagating enum rename"
    );

    let (old_schema, old_name) = (from.schema.clone(), from.name.clone());
    let (new_schema, new_name) = (to.schema.clone(), to.name.clone());

    catalog.enums.update(
        |e| e.schema == old_schema && e.name == old_name,
        |e| {
            e.schema = new_schema.clone();
            e.name = new_name.clone();
        },
    );
    catalog.columns.update(
        |c| c.type_name == old_name && c.resolved_type_schema() == old_schema,
        |c| {
            c.type_name = new_name.clone();
            c.type_schema = Some(new_schema.clone());
        },
    );
}

/// Rewrite a sequence rename and/or schema move.
pub fn sequence_changed(catalog: &mut Catalog, from: &Sequence, to: &Sequence) {
    debug!(
        from_schema = %from.schema,
        from_name = %from.name,
        to_schema = %to.schema,
        to_name = %to.name,
        "propagating sequence rename"
    );

    let (old_schema, old_name) = (from.schema.clone(), from.name.clone());
    let (new_schema, new_name) = (to.schema.clone(), to.name.clone());
    catalog.sequences.update(
        |s| s.schema == old_schema && s.name == old_name,
        |s| {
            s.schema = new_schema.clone();
            s.name = new_name.clone();
        },
    );
}

/// Rewrite a table rename and/or schema move across every dependent kind.
pub fn table_changed(catalog: &mut Catalog, from: &Table, to: &Table) {
    debug!(
        from_schema = %from.schema,
        from_name = %from.name,
        to_schema = %to.schema,
        to_name = %to.name,
        "propagating table rename"
    );

    let (old_schema, old_name) = (from.schema.clone(), from.name.clone());
    let (new_schema, new_name) = (to.schema.clone(), to.name.clone());

    catalog.tables.update(
        |t| t.schema == old_schema && t.name == old_name,
        |t| {
            t.schema = new_schema.clone();
            t.name = new_name.clone();
        },
    );
    catalog.columns.update(
        |c| c.schema == old_schema && c.table == old_name,
        |c| {
            c.schema = new_schema.clone();
            c.table = new_name.clone();
        },
    );
    catalog.indexes.update(
        |i| i.schema == old_schema && i.table == old_name,
        |i| {
            i.schema = new_schema.clone();
            i.table = new_name.clone();
        },
    );
    catalog.primary_keys.update(
        |pk| pk.schema == old_schema && pk.table == old_name,
        |pk| {
            pk.schema = new_schema.clone();
            pk.table = new_name.clone();
        },
    );
    catalog.foreign_keys.update(
        |fk| fk.schema == old_schema && fk.table == old_name,
        |fk| {
            fk.schema = new_schema.clone();
            fk.table = new_name.clone();
        },
    );
    catalog.foreign_keys.update(
        |fk| fk.ref_schema == old_schema && fk.ref_table == old_name,
        |fk| {
            fk.ref_schema = new_schema.clone();
            fk.ref_table = new_name.clone();
        },
    );
    catalog.checks.update(
        |ck| ck.schema == old_schema && ck.table == old_name,
        |ck| {
            ck.schema = new_schema.clone();
            ck.table = new_name.clone();
        },
    );
    catalog.policies.update(
        |p| p.schema == old_schema && p.table == old_name,
        |p| {
            p.schema = new_schema.clone();
            p.table = new_name.clone();
        },
    );
}

/// Rewrite a column rename everywhere the old name is referenced: the column
/// record itself, non-expression index entries, primary-key column lists,
/// the owning side of foreign keys, the referencing side of any foreign key
/// that targets the renamed column, and check expressions. The last is
/// substituted only when the whole stored expression equals the old name
/// verbatim.
pub fn column_renamed(catalog: &mut Catalog, schema: &str, table: &str, from: &str, to: &str) {
    debug!(schema, table, from, to, "propagating column rename");

    catalog.columns.update(
        |c| c.schema == schema && c.table == table && c.name == from,
        |c| c.name = to.to_string(),
    );
    catalog.indexes.update(
        |i| i.schema == schema && i.table == table,
        |i| {
            for entry in &mut i.columns {
                if !entry.is_expression && entry.value == from {
                    entry.value = to.to_string();
                }
            }
        },
    );
    catalog.primary_keys.update(
        |pk| pk.schema == schema && pk.table == table,
        |pk| {
            for column in &mut pk.columns {
                if column == from {
                    *column = to.to_string();
                }
            }
        },
    );
    catalog.foreign_keys.update(
        |fk| fk.schema == schema && fk.table == table,
        |fk| {
            for column in &mut fk.columns {
                if column == from {
                    *column = to.to_string();
                }
            }
        },
    );
    catalog.foreign_keys.update(
        |fk| fk.ref_schema == schema && fk.ref_table == table,
        |fk| {
            for column in &mut fk.ref_columns {
                if column == from {
                    *column = to.to_string();
                }
            }
        },
    );
    // Whole-expression equality only. Substring rewriting would corrupt
    // unrelated expressions, so anything more complex stays untouched.
    catalog.checks.update(
        |ck| ck.schema == schema && ck.table == table && ck.expression == from,
        |ck| ck.expression = to.to_string(),
    );
}

/// Rewrite a policy rename.
pub fn policy_renamed(catalog: &mut Catalog, from: &Policy, to: &Policy) {
    debug!(
        schema = %from.schema,
        table = %from.table,
        from = %from.name,
        to = %to.name,
        "propagating policy rename"
    );

    let (schema, table, old_name) = (from.schema.clone(), from.table.clone(), from.name.clone());
    let new_name = to.name.clone();
    catalog.policies.update(
        |p| p.schema == schema && p.table == table && p.name == old_name,
        |p| p.name = new_name.clone(),
    );
}

/// Rewrite a view rename and/or schema move.
pub fn view_changed(catalog: &mut Catalog, from: &View, to: &View) {
    debug!(
        from_schema = %from.schema,
        from_name = %from.name,
        to_schema = %to.schema,
        to_name = %to.name,
        "propagating view rename"
    );

    let (old_schema, old_name) = (from.schema.clone(), from.name.clone());
    let (new_schema, new_name) = (to.schema.clone(), to.name.clone());
    catalog.views.update(
        |v| v.schema == old_schema && v.name == old_name,
        |v| {
            v.schema = new_schema.clone();
            v.name = new_name.clone();
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        CheckConstraint, Column, ForeignKey, Index, IndexColumn, PrimaryKey, SchemaEntity,
    };

    fn sample_catalog() -> Catalog {
        let mut builder = Catalog::builder();
        builder
            .add_table(Table::new("public", "users"))
            .add_table(Table::new("public", "orders"))
            .add_column(Column::new("public", "users", "id", "integer").not_null())
            .add_column(Column::new("public", "orders", "user_id", "integer"))
            .add_index(
                Index::new(
                    "public",
                    "users",
                    "users_id_key",
                    vec![IndexColumn::named("id"), IndexColumn::expression("lower(id)")],
                )
                .unique()
                .default_named(),
            )
            .add_primary_key(
                PrimaryKey::new("public", "users", "users_pkey", vec!["id".into()])
                    .default_named(),
            )
            .add_foreign_key(
                ForeignKey::new(
                    "public",
                    "orders",
                    "orders_user_id_users_id_fkey",
                    vec!["user_id".into()],
                    "public",
                    "users",
                    vec!["id".into()],
                )
                .default_named(),
            )
            .add_check(CheckConstraint::new("public", "users", "users_id_check", "id"))
            .add_check(CheckConstraint::new(
                "public",
                "users",
                "users_id_positive",
                "id > 0",
            ));
        builder.finish().unwrap()
    }

    #[test]
    fn test_column_rename_rewrites_every_reference() {
        let mut catalog = sample_catalog();
        column_renamed(&mut catalog, "public", "users", "id", "ident");

        assert!(catalog
            .columns
            .one(|c| c.table == "users" && c.name == "ident")
            .is_some());

        let index = catalog.indexes.one(|i| i.table == "users").unwrap();
        assert_eq!(index.columns[0].value, "ident");
        // Expression entries keep their text even when it mentions the name.
        assert_eq!(index.columns[1].value, "lower(id)");

        let pk = catalog.primary_keys.one(|pk| pk.table == "users").unwrap();
        assert_eq!(pk.columns, vec!["ident".to_string()]);

        let fk = catalog.foreign_keys.one(|fk| fk.table == "orders").unwrap();
        assert_eq!(fk.columns, vec!["user_id".to_string()]);
        assert_eq!(fk.ref_columns, vec!["ident".to_string()]);

        // Whole-expression match is substituted, anything longer is not.
        let plain = catalog.checks.one(|ck| ck.name == "users_id_check").unwrap();
        assert_eq!(plain.expression, "ident");
        let compound = catalog
            .checks
            .one(|ck| ck.name == "users_id_positive")
            .unwrap();
        assert_eq!(compound.expression, "id > 0");
    }

    #[test]
    fn test_table_rename_updates_owning_and_target_sides() {
        let mut catalog = sample_catalog();
        let from = Table::new("public", "users");
        let to = Table::new("public", "accounts");
        table_changed(&mut catalog, &from, &to);

        assert!(catalog.tables.one(|t| t.name == "accounts").is_some());
        assert!(catalog.tables.one(|t| t.name == "users").is_none());
        assert!(catalog.columns.one(|c| c.table == "accounts").is_some());
        let fk = catalog.foreign_keys.one(|fk| fk.table == "orders").unwrap();
        assert_eq!(fk.ref_table, "accounts");
    }

    #[test]
    fn test_schema_rename_touches_every_kind() {
        let mut catalog = sample_catalog();
        schema_renamed(&mut catalog, "public", "app");

        assert!(catalog.tables.iter().all(|t| t.schema == "app"));
        assert!(catalog.columns.iter().all(|c| c.schema == "app"));
        assert!(catalog.indexes.iter().all(|i| i.schema == "app"));
        assert!(catalog.primary_keys.iter().all(|pk| pk.schema == "app"));
        assert!(catalog
            .foreign_keys
            .iter()
            .all(|fk| fk.schema == "app" && fk.ref_schema == "app"));
        assert!(catalog.checks.iter().all(|ck| ck.schema == "app"));
    }

    #[test]
    fn test_enum_rename_rewrites_column_types() {
        let mut builder = Catalog::builder();
        builder
            .add_enum(EnumType::new("public", "mood", vec!["ok".into(), "sad".into()]))
            .add_table(Table::new("public", "users"))
            .add_column(Column::new("public", "users", "mood", "mood"));
        let mut catalog = builder.finish().unwrap();

        let from = EnumType::new("public", "mood", vec!["ok".into(), "sad".into()]);
        let to = EnumType::new("app", "feeling", vec!["ok".into(), "sad".into()]);
        enum_changed(&mut catalog, &from, &to);

        let column = catalog.columns.one(|c| c.name == "mood").unwrap();
        assert_eq!(column.type_name, "feeling");
        assert_eq!(column.type_schema.as_deref(), Some("app"));
        assert_eq!(catalog.enums.iter().next().unwrap().key().to_string(), "app.feeling");
    }
}
