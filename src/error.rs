//! Error types for the drift engine.

use thiserror::Error;

use crate::schema::{EntityKind, NameKey, SchemaScopedKey, TableScopedKey};

/// A key collision discovered while building a catalog, one variant per
/// entity kind. Producers collect these into a single list; a catalog with
/// duplicates cannot be diffed meaningfully.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DuplicateEntity {
    #[error("duplicate schema \"{0}\"")]
    Schema(NameKey),
    #[error("duplicate enum \"{0}\"")]
    Enum(SchemaScopedKey),
    #[error("duplicate sequence \"{0}\"")]
    Sequence(SchemaScopedKey),
    #[error("duplicate role \"{0}\"")]
    Role(NameKey),
    #[error("duplicate table \"{0}\"")]
    Table(SchemaScopedKey),
    #[error("duplicate column \"{0}\"")]
    Column(TableScopedKey),
    #[error("duplicate index \"{0}\"")]
    Index(SchemaScopedKey),
    #[error("duplicate primary key \"{0}\"")]
    PrimaryKey(SchemaScopedKey),
    #[error("duplicate foreign key \"{0}\"")]
    ForeignKey(SchemaScopedKey),
    #[error("duplicate check constraint \"{0}\"")]
    Check(SchemaScopedKey),
    #[error("duplicate policy \"{0}\"")]
    Policy(TableScopedKey),
    #[error("duplicate view \"{0}\"")]
    View(SchemaScopedKey),
}

fn list_duplicates(duplicates: &[DuplicateEntity]) -> String {
    duplicates
        .iter()
        .map(DuplicateEntity::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Error)]
pub enum DriftError {
    /// Every key collision found while building a catalog, surfaced at once.
    #[error("catalog has duplicate entities:\n{}", list_duplicates(.0))]
    Duplicates(Vec<DuplicateEntity>),

    /// The injected rename resolver failed or was aborted. No partial plan
    /// is produced.
    #[error("rename resolution failed: {0}")]
    Resolver(#[source] anyhow::Error),

    /// A resolver returned buckets that do not repartition its input.
    #[error("resolver broke its contract ({kind}): {detail}")]
    ResolverContract { kind: EntityKind, detail: String },

    /// An entity failed its structural check after all inserts. Indicates a
    /// producer bug, never user error.
    #[error("catalog invariant violated: {0}")]
    Invariant(String),

    /// The planner hit an impossible pairing, e.g. a recreate whose before
    /// side vanished. Indicates a rename-propagation bug.
    #[error("planner inconsistency: {0}")]
    Planner(String),
}

/// Result alias for drift operations.
pub type DriftResult<T> = Result<T, DriftError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_lists_every_collision() {
        let err = DriftError::Duplicates(vec![
            DuplicateEntity::Table(SchemaScopedKey {
                schema: "public".into(),
                name: "users".into(),
            }),
            DuplicateEntity::Column(TableScopedKey {
                schema: "public".into(),
                table: "users".into(),
                name: "id".into(),
            }),
        ]);
        let text = err.to_string();
        assert!(text.contains("duplicate table \"public.users\""));
        assert!(text.contains("duplicate column \"public.users.id\""));
    }
}
