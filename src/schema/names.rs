//! Default identifier naming.
//!
//! Used when a producer did not supply an explicit name, and again whenever
//! a default-named entity is recreated after a rename. Generated names must
//! stay inside the Postgres identifier limit; over-budget names fall back to
//! a deterministic hash-shortened form, so previously generated names stay
//! stable across runs.

use sha2::{Digest, Sha256};

/// Postgres truncates identifiers beyond this many bytes.
pub const MAX_IDENTIFIER_BYTES: usize = 63;

const HASH_CHARS: usize = 12;

/// `{table}_pkey`
pub fn primary_key_name(table: &str) -> String {
    clamp(format!("{table}_pkey"), table, "_pkey")
}

/// `{table}_{col}_{col}_key` for unique indexes.
pub fn unique_index_name(table: &str, columns: &[&str]) -> String {
    clamp(
        format!("{table}_{}_key", columns.join("_")),
        table,
        "_key",
    )
}

/// `{table}_{col}_{col}_index` for plain indexes.
pub fn index_name(table: &str, columns: &[&str]) -> String {
    clamp(
        format!("{table}_{}_index", columns.join("_")),
        table,
        "_index",
    )
}

/// `{table}_{cols}_{ref_table}_{ref_cols}_fkey`
pub fn foreign_key_name(
    table: &str,
    columns: &[&str],
    ref_table: &str,
    ref_columns: &[&str],
) -> String {
    clamp(
        format!(
            "{table}_{}_{ref_table}_{}_fkey",
            columns.join("_"),
            ref_columns.join("_"),
        ),
        table,
        "_fkey",
    )
}

/// Hash-shorten a generated name that exceeds the identifier limit. When the
/// owning table name still fits alongside the hash and suffix it is kept as
/// a readable prefix; otherwise the hash stands alone.
fn clamp(full: String, table: &str, suffix: &str) -> String {
    if full.len() <= MAX_IDENTIFIER_BYTES {
        return full;
    }
    let hash = short_hash(&full);
    if table.len() + 1 + HASH_CHARS + suffix.len() <= MAX_IDENTIFIER_BYTES {
        format!("{table}_{hash}{suffix}")
    } else {
        format!("{hash}{suffix}")
    }
}

fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest[..HASH_CHARS / 2]
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates() {
        assert_eq!(primary_key_name("users"), "users_pkey");
        assert_eq!(unique_index_name("users", &["email"]), "users_email_key");
        assert_eq!(
            unique_index_name("users", &["tenant", "email"]),
            "users_tenant_email_key"
        );
        assert_eq!(
            foreign_key_name("orders", &["user_id"], "users", &["id"]),
            "orders_user_id_users_id_fkey"
        );
    }

    #[test]
    fn test_long_name_keeps_table_prefix() {
        let table = "orders";
        let columns = vec!["first_column_with_a_long_name", "second_column_with_a_long_name"];
        let refs = vec!["referenced_column_with_a_long_name"];
        let name = foreign_key_name(table, &columns, "remote_side_table", &refs);
        assert!(name.len() <= MAX_IDENTIFIER_BYTES);
        assert!(name.starts_with("orders_"));
        assert!(name.ends_with("_fkey"));
        // table + '_' + 12 hash chars + "_fkey"
        assert_eq!(name.len(), table.len() + 1 + 12 + 5);
    }

    #[test]
    fn test_very_long_table_drops_prefix() {
        let table = "a".repeat(60);
        let name = foreign_key_name(&table, &["col"], "other", &["id"]);
        assert_eq!(name.len(), 12 + 5);
        assert!(name.ends_with("_fkey"));
    }

    #[test]
    fn test_hash_is_stable() {
        let columns = vec!["some_extremely_long_column_name_that_overflows_the_limit_abcdef"];
        let a = unique_index_name("t", &columns);
        let b = unique_index_name("t", &columns);
        assert_eq!(a, b);
        assert!(a.len() <= MAX_IDENTIFIER_BYTES);
    }
}
