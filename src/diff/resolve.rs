//! Rename resolution.
//!
//! The diff alone cannot tell a rename from a drop+create. That decision is
//! delegated to an injected [`RenameResolver`]: the engine hands it the
//! created and deleted candidates of one entity kind (or of one owning
//! table, for child kinds) as qualified names, and the resolver partitions
//! them into plain creates, plain deletes, and renamed/moved pairs. A
//! resolver may consult an explicit rename map, a human, or a live database;
//! the engine only consumes the decision, and checks it repartitions the
//! input without inventing anything.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{DriftError, DriftResult};
use crate::schema::{EntityKind, QualifiedName, SchemaEntity};

/// Created and deleted candidates of one entity kind, in the resolver's
/// qualified-name space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolveRequest {
    pub kind: EntityKind,
    pub created: Vec<QualifiedName>,
    pub deleted: Vec<QualifiedName>,
}

/// One accepted rename or schema move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenamedName {
    pub from: QualifiedName,
    pub to: QualifiedName,
}

/// The resolver's verdict: every input name lands in exactly one bucket.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResolveOutcome {
    pub created: Vec<QualifiedName>,
    pub deleted: Vec<QualifiedName>,
    pub renamed: Vec<RenamedName>,
}

/// Decision procedure disambiguating create+delete pairs as renames or
/// moves. Resolution may suspend on external input (a prompt, a pre-flight
/// query), so the method is async; the engine awaits it once per entity
/// kind (or owning-table group) before propagating.
#[async_trait]
pub trait RenameResolver: Send + Sync {
    async fn resolve(&self, request: ResolveRequest) -> anyhow::Result<ResolveOutcome>;
}

/// Treats every candidate as a plain create or delete. Used for dry
/// "what would change structurally" comparisons.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopResolver;

#[async_trait]
impl RenameResolver for NoopResolver {
    async fn resolve(&self, request: ResolveRequest) -> anyhow::Result<ResolveOutcome> {
        Ok(ResolveOutcome {
            created: request.created,
            deleted: request.deleted,
            renamed: Vec::new(),
        })
    }
}

/// Resolves renames from caller-supplied `old name -> new name` pairs, keyed
/// by the dotted display form (e.g. `public.users.id`). Used for headless
/// runs and tests.
#[derive(Debug, Clone, Default)]
pub struct MapResolver {
    renames: HashMap<String, String>,
}

impl MapResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.renames.insert(from.into(), to.into());
        self
    }
}

#[async_trait]
impl RenameResolver for MapResolver {
    async fn resolve(&self, request: ResolveRequest) -> anyhow::Result<ResolveOutcome> {
        let mut outcome = ResolveOutcome::default();
        let mut available: Vec<Option<QualifiedName>> =
            request.created.into_iter().map(Some).collect();

        for old in request.deleted {
            let matched = self.renames.get(&old.to_string()).and_then(|target| {
                available
                    .iter()
                    .position(|slot| matches!(slot, Some(new) if new.to_string() == *target))
            });
            match matched.and_then(|pos| available[pos].take()) {
                Some(to) => outcome.renamed.push(RenamedName { from: old, to }),
                None => outcome.deleted.push(old),
            }
        }

        outcome.created = available.into_iter().flatten().collect();
        Ok(outcome)
    }
}

/// A rename/move pair in entity space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Renamed<T> {
    pub from: T,
    pub to: T,
}

/// A resolver outcome mapped back onto full entity records.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution<T> {
    pub created: Vec<T>,
    pub deleted: Vec<T>,
    pub renamed: Vec<Renamed<T>>,
}

impl<T> Default for Resolution<T> {
    fn default() -> Self {
        Self {
            created: Vec::new(),
            deleted: Vec::new(),
            renamed: Vec::new(),
        }
    }
}

impl<T> Resolution<T> {
    pub fn merge(&mut self, other: Resolution<T>) {
        self.created.extend(other.created);
        self.deleted.extend(other.deleted);
        self.renamed.extend(other.renamed);
    }
}

/// Run the resolver over one group of created/deleted entities and map its
/// name-space verdict back to entities, enforcing the protocol
/// postconditions: every input appears in exactly one output bucket and
/// nothing is fabricated.
pub async fn resolve_entities<T: SchemaEntity>(
    resolver: &dyn RenameResolver,
    created: Vec<T>,
    deleted: Vec<T>,
) -> DriftResult<Resolution<T>> {
    if created.is_empty() && deleted.is_empty() {
        return Ok(Resolution::default());
    }

    let contract = |detail: String| DriftError::ResolverContract {
        kind: T::KIND,
        detail,
    };

    let created_names: Vec<QualifiedName> =
        created.iter().map(SchemaEntity::qualified_name).collect();
    let deleted_names: Vec<QualifiedName> =
        deleted.iter().map(SchemaEntity::qualified_name).collect();

    let outcome = resolver
        .resolve(ResolveRequest {
            kind: T::KIND,
            created: created_names,
            deleted: deleted_names,
        })
        .await
        .map_err(DriftError::Resolver)?;

    let mut created_pool: HashMap<String, T> = created
        .into_iter()
        .map(|item| (item.qualified_name().to_string(), item))
        .collect();
    let mut deleted_pool: HashMap<String, T> = deleted
        .into_iter()
        .map(|item| (item.qualified_name().to_string(), item))
        .collect();

    let take = |pool: &mut HashMap<String, T>,
                name: &QualifiedName,
                side: &str|
     -> DriftResult<T> {
        pool.remove(&name.to_string()).ok_or_else(|| {
            contract(format!(
                "'{name}' is not an unclaimed {side} candidate"
            ))
        })
    };

    let mut resolution = Resolution::default();
    for name in &outcome.created {
        resolution.created.push(take(&mut created_pool, name, "created")?);
    }
    for name in &outcome.deleted {
        resolution.deleted.push(take(&mut deleted_pool, name, "deleted")?);
    }
    for pair in &outcome.renamed {
        let from = take(&mut deleted_pool, &pair.from, "deleted")?;
        let to = take(&mut created_pool, &pair.to, "created")?;
        resolution.renamed.push(Renamed { from, to });
    }

    let leftover: Vec<String> = created_pool
        .keys()
        .chain(deleted_pool.keys())
        .cloned()
        .collect();
    if !leftover.is_empty() {
        return Err(contract(format!(
            "input items missing from every bucket: {}",
            leftover.join(", ")
        )));
    }

    Ok(resolution)
}

/// `|created| + |deleted| + 2 × |renamed|` must equal the input size, with
/// no name claimed twice. Exposed for resolver-implementation tests.
pub fn outcome_repartitions(request: &ResolveRequest, outcome: &ResolveOutcome) -> bool {
    let total = outcome.created.len() + outcome.deleted.len() + 2 * outcome.renamed.len();
    if total != request.created.len() + request.deleted.len() {
        return false;
    }
    let mut seen = HashSet::new();
    outcome
        .created
        .iter()
        .chain(outcome.deleted.iter())
        .chain(outcome.renamed.iter().map(|pair| &pair.from))
        .chain(outcome.renamed.iter().map(|pair| &pair.to))
        .all(|name| seen.insert(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Table;

    fn request(created: &[&str], deleted: &[&str]) -> ResolveRequest {
        ResolveRequest {
            kind: EntityKind::Table,
            created: created
                .iter()
                .map(|name| QualifiedName::in_schema("public", *name))
                .collect(),
            deleted: deleted
                .iter()
                .map(|name| QualifiedName::in_schema("public", *name))
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_noop_resolver_passes_through() {
        let req = request(&["a", "b"], &["c"]);
        let outcome = NoopResolver.resolve(req.clone()).await.unwrap();
        assert_eq!(outcome.created.len(), 2);
        assert_eq!(outcome.deleted.len(), 1);
        assert!(outcome.renamed.is_empty());
        assert!(outcome_repartitions(&req, &outcome));
    }

    #[tokio::test]
    async fn test_map_resolver_pairs_mapped_names() {
        let resolver = MapResolver::new().rename("public.legacy", "public.orders");
        let req = request(&["orders", "fresh"], &["legacy", "gone"]);
        let outcome = resolver.resolve(req.clone()).await.unwrap();

        assert_eq!(outcome.renamed.len(), 1);
        assert_eq!(outcome.renamed[0].from.to_string(), "public.legacy");
        assert_eq!(outcome.renamed[0].to.to_string(), "public.orders");
        assert_eq!(outcome.created.len(), 1);
        assert_eq!(outcome.created[0].to_string(), "public.fresh");
        assert_eq!(outcome.deleted.len(), 1);
        assert_eq!(outcome.deleted[0].to_string(), "public.gone");
        assert!(outcome_repartitions(&req, &outcome));
    }

    #[tokio::test]
    async fn test_map_resolver_ignores_mappings_without_a_created_side() {
        let resolver = MapResolver::new().rename("public.legacy", "public.phantom");
        let outcome = resolver.resolve(request(&[], &["legacy"])).await.unwrap();
        assert!(outcome.renamed.is_empty());
        assert_eq!(outcome.deleted.len(), 1);
    }

    struct FabricatingResolver;

    #[async_trait]
    impl RenameResolver for FabricatingResolver {
        async fn resolve(&self, mut request: ResolveRequest) -> anyhow::Result<ResolveOutcome> {
            request
                .created
                .push(QualifiedName::in_schema("public", "invented"));
            Ok(ResolveOutcome {
                created: request.created,
                deleted: request.deleted,
                renamed: Vec::new(),
            })
        }
    }

    struct DroppingResolver;

    #[async_trait]
    impl RenameResolver for DroppingResolver {
        async fn resolve(&self, request: ResolveRequest) -> anyhow::Result<ResolveOutcome> {
            Ok(ResolveOutcome {
                created: Vec::new(),
                deleted: request.deleted,
                renamed: Vec::new(),
            })
        }
    }

    #[tokio::test]
    async fn test_resolve_entities_rejects_fabricated_items() {
        let created = vec![Table::new("public", "users")];
        let err = resolve_entities(&FabricatingResolver, created, vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, DriftError::ResolverContract { .. }));
    }

    #[tokio::test]
    async fn test_resolve_entities_rejects_dropped_items() {
        let created = vec![Table::new("public", "users")];
        let err = resolve_entities(&DroppingResolver, created, vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, DriftError::ResolverContract { .. }));
    }

    #[tokio::test]
    async fn test_resolve_entities_maps_renames_back_to_entities() {
        let resolver = MapResolver::new().rename("public.legacy", "public.orders");
        let created = vec![Table::new("public", "orders")];
        let deleted = vec![Table::new("public", "legacy")];
        let resolution = resolve_entities(&resolver, created, deleted).await.unwrap();
        assert_eq!(resolution.renamed.len(), 1);
        assert_eq!(resolution.renamed[0].from.name, "legacy");
        assert_eq!(resolution.renamed[0].to.name, "orders");
        assert!(resolution.created.is_empty());
        assert!(resolution.deleted.is_empty());
    }
}
