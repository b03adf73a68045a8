//! Schema entity records.
//!
//! Every object the drift engine reasons about (schemas, tables, columns,
//! constraints, sequences, roles, policies, views, enums) is a plain value
//! record with a typed key. Records never change after construction except
//! through explicit [`Catalog`](store::Catalog) mutation during rename
//! propagation.

pub mod names;
pub mod store;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the implicit default schema. Entities in it still carry it
/// explicitly; only the `Schema` record itself is omitted.
pub const DEFAULT_SCHEMA: &str = "public";

/// The fixed categories of schema object the engine diffs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Schema,
    Enum,
    Sequence,
    Role,
    Table,
    Column,
    Index,
    PrimaryKey,
    ForeignKey,
    Check,
    Policy,
    View,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Schema => "schema",
            Self::Enum => "enum",
            Self::Sequence => "sequence",
            Self::Role => "role",
            Self::Table => "table",
            Self::Column => "column",
            Self::Index => "index",
            Self::PrimaryKey => "primary key",
            Self::ForeignKey => "foreign key",
            Self::Check => "check constraint",
            Self::Policy => "policy",
            Self::View => "view",
        };
        f.write_str(name)
    }
}

/// A dotted identifier used at the resolver boundary.
///
/// Depending on the entity kind this is `name`, `schema.name`, or
/// `schema.table.name`. The `Display` form is the wire format consumed by
/// rename maps and interactive prompts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    pub schema: Option<String>,
    pub table: Option<String>,
    pub name: String,
}

impl QualifiedName {
    /// A bare name (roles).
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            table: None,
            name: name.into(),
        }
    }

    /// A schema-scoped name (tables, enums, sequences, views, constraints).
    pub fn in_schema(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            table: None,
            name: name.into(),
        }
    }

    /// A table-scoped name (columns, policies).
    pub fn in_table(
        schema: impl Into<String>,
        table: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            schema: Some(schema.into()),
            table: Some(table.into()),
            name: name.into(),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(schema) = &self.schema {
            write!(f, "{}.", schema)?;
        }
        if let Some(table) = &self.table {
            write!(f, "{}.", table)?;
        }
        f.write_str(&self.name)
    }
}

/// Key of entities addressed by bare name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NameKey(pub String);

impl fmt::Display for NameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key of entities whose name is unique within a schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaScopedKey {
    pub schema: String,
    pub name: String,
}

impl fmt::Display for SchemaScopedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// Key of entities whose name is unique within a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableScopedKey {
    pub schema: String,
    pub table: String,
    pub name: String,
}

impl fmt::Display for TableScopedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.schema, self.table, self.name)
    }
}

/// Common surface of every entity record: a kind tag, a typed key, and a
/// structural self-check run once at end-of-build.
pub trait SchemaEntity: Clone + PartialEq + fmt::Debug {
    type Key: Clone + Eq + std::hash::Hash + fmt::Debug + fmt::Display;

    const KIND: EntityKind;

    fn key(&self) -> Self::Key;

    /// Name in the resolver's dotted wire format.
    fn qualified_name(&self) -> QualifiedName;

    /// Structural conformance. A failure here is a producer bug, not user
    /// error; `CatalogBuilder::finish` turns it into a fatal invariant error.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// A named schema. The default (`public`) schema is implicit and never
/// inserted as an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl SchemaEntity for Schema {
    type Key = NameKey;
    const KIND: EntityKind = EntityKind::Schema;

    fn key(&self) -> NameKey {
        NameKey(self.name.clone())
    }

    fn qualified_name(&self) -> QualifiedName {
        QualifiedName::bare(&self.name)
    }

    fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("schema name is empty".into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub schema: String,
    pub name: String,
    /// Row-level security enabled on the table.
    pub rls_enabled: bool,
}

impl Table {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            rls_enabled: false,
        }
    }

    pub fn with_rls(mut self) -> Self {
        self.rls_enabled = true;
        self
    }
}

impl SchemaEntity for Table {
    type Key = SchemaScopedKey;
    const KIND: EntityKind = EntityKind::Table;

    fn key(&self) -> SchemaScopedKey {
        SchemaScopedKey {
            schema: self.schema.clone(),
            name: self.name.clone(),
        }
    }

    fn qualified_name(&self) -> QualifiedName {
        QualifiedName::in_schema(&self.schema, &self.name)
    }

    fn validate(&self) -> Result<(), String> {
        if self.schema.is_empty() || self.name.is_empty() {
            return Err("table schema or name is empty".into());
        }
        Ok(())
    }
}

/// How a column default was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultKind {
    /// A literal value, quoted when rendered.
    Literal,
    /// A raw SQL expression, rendered verbatim.
    Expression,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefault {
    pub value: String,
    pub kind: DefaultKind,
}

impl ColumnDefault {
    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            kind: DefaultKind::Literal,
        }
    }

    pub fn expression(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            kind: DefaultKind::Expression,
        }
    }
}

/// Generated-column storage kind. Postgres only supports stored generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratedKind {
    Stored,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedSpec {
    pub kind: GeneratedKind,
    pub expression: String,
}

impl GeneratedSpec {
    pub fn stored(expression: impl Into<String>) -> Self {
        Self {
            kind: GeneratedKind::Stored,
            expression: expression.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityKind {
    Always,
    ByDefault,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentitySpec {
    pub kind: IdentityKind,
    pub options: SequenceOptions,
}

/// Sequence parameters. `None` means "not declared"; the equivalence engine
/// resolves omitted values against the Postgres defaults before comparing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SequenceOptions {
    pub increment: Option<i64>,
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub start: Option<i64>,
    pub cache: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub schema: String,
    pub table: String,
    pub name: String,
    /// Base type name without array brackets, e.g. `integer` or `mood`.
    pub type_name: String,
    /// Schema of a user-defined type (enum); `None` for built-ins and for
    /// user types living in the default schema.
    pub type_schema: Option<String>,
    /// Array dimension count; zero for scalars.
    pub dimensions: u32,
    pub not_null: bool,
    pub default: Option<ColumnDefault>,
    pub generated: Option<GeneratedSpec>,
    pub identity: Option<IdentitySpec>,
}

impl Column {
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        name: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            name: name.into(),
            type_name: type_name.into(),
            type_schema: None,
            dimensions: 0,
            not_null: false,
            default: None,
            generated: None,
            identity: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn array(mut self, dimensions: u32) -> Self {
        self.dimensions = dimensions;
        self
    }

    pub fn type_schema(mut self, schema: impl Into<String>) -> Self {
        self.type_schema = Some(schema.into());
        self
    }

    pub fn default_value(mut self, default: ColumnDefault) -> Self {
        self.default = Some(default);
        self
    }

    pub fn generated(mut self, spec: GeneratedSpec) -> Self {
        self.generated = Some(spec);
        self
    }

    pub fn identity(mut self, spec: IdentitySpec) -> Self {
        self.identity = Some(spec);
        self
    }

    /// Schema the column's type lives in, with the implicit default applied.
    pub fn resolved_type_schema(&self) -> &str {
        self.type_schema.as_deref().unwrap_or(DEFAULT_SCHEMA)
    }
}

impl SchemaEntity for Column {
    type Key = TableScopedKey;
    const KIND: EntityKind = EntityKind::Column;

    fn key(&self) -> TableScopedKey {
        TableScopedKey {
            schema: self.schema.clone(),
            table: self.table.clone(),
            name: self.name.clone(),
        }
    }

    fn qualified_name(&self) -> QualifiedName {
        QualifiedName::in_table(&self.schema, &self.table, &self.name)
    }

    fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() || self.table.is_empty() {
            return Err("column name or table is empty".into());
        }
        if self.type_name.is_empty() {
            return Err(format!("column {} has an empty type", self.qualified_name()));
        }
        if self.generated.is_some() && self.identity.is_some() {
            return Err(format!(
                "column {} is both generated and identity",
                self.qualified_name()
            ));
        }
        Ok(())
    }
}

/// One entry of an index column list: either a plain column reference or a
/// raw expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexColumn {
    pub value: String,
    pub is_expression: bool,
    pub ascending: bool,
}

impl IndexColumn {
    pub fn named(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            is_expression: false,
            ascending: true,
        }
    }

    pub fn expression(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            is_expression: true,
            ascending: true,
        }
    }

    pub fn descending(mut self) -> Self {
        self.ascending = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub schema: String,
    pub name: String,
    pub table: String,
    pub columns: Vec<IndexColumn>,
    pub unique: bool,
    /// Partial-index predicate.
    pub predicate: Option<String>,
    /// Access method, e.g. `btree`.
    pub method: String,
    /// False when the name came from a default-naming template.
    pub name_explicit: bool,
}

impl Index {
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        name: impl Into<String>,
        columns: Vec<IndexColumn>,
    ) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            table: table.into(),
            columns,
            unique: false,
            predicate: None,
            method: "btree".into(),
            name_explicit: true,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn predicate(mut self, predicate: impl Into<String>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn default_named(mut self) -> Self {
        self.name_explicit = false;
        self
    }

    /// Structural identity ignoring the name; used to pair a dropped and a
    /// created index as a rename.
    pub fn same_shape(&self, other: &Self) -> bool {
        self.schema == other.schema
            && self.table == other.table
            && self.columns == other.columns
            && self.unique == other.unique
            && self.predicate == other.predicate
            && self.method == other.method
    }
}

impl SchemaEntity for Index {
    type Key = SchemaScopedKey;
    const KIND: EntityKind = EntityKind::Index;

    fn key(&self) -> SchemaScopedKey {
        SchemaScopedKey {
            schema: self.schema.clone(),
            name: self.name.clone(),
        }
    }

    fn qualified_name(&self) -> QualifiedName {
        QualifiedName::in_schema(&self.schema, &self.name)
    }

    fn validate(&self) -> Result<(), String> {
        if self.columns.is_empty() {
            return Err(format!("index {} has no columns", self.qualified_name()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryKey {
    pub schema: String,
    pub name: String,
    pub table: String,
    pub columns: Vec<String>,
    pub name_explicit: bool,
}

impl PrimaryKey {
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        name: impl Into<String>,
        columns: Vec<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            table: table.into(),
            columns,
            name_explicit: true,
        }
    }

    pub fn default_named(mut self) -> Self {
        self.name_explicit = false;
        self
    }

    pub fn same_shape(&self, other: &Self) -> bool {
        self.schema == other.schema && self.table == other.table && self.columns == other.columns
    }
}

impl SchemaEntity for PrimaryKey {
    type Key = SchemaScopedKey;
    const KIND: EntityKind = EntityKind::PrimaryKey;

    fn key(&self) -> SchemaScopedKey {
        SchemaScopedKey {
            schema: self.schema.clone(),
            name: self.name.clone(),
        }
    }

    fn qualified_name(&self) -> QualifiedName {
        QualifiedName::in_schema(&self.schema, &self.name)
    }

    fn validate(&self) -> Result<(), String> {
        if self.columns.is_empty() {
            return Err(format!(
                "primary key {} has no columns",
                self.qualified_name()
            ));
        }
        Ok(())
    }
}

/// Referential action on update/delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefAction {
    #[default]
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub schema: String,
    pub name: String,
    pub table: String,
    pub columns: Vec<String>,
    pub ref_schema: String,
    pub ref_table: String,
    pub ref_columns: Vec<String>,
    pub on_update: RefAction,
    pub on_delete: RefAction,
    pub name_explicit: bool,
}

impl ForeignKey {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        name: impl Into<String>,
        columns: Vec<String>,
        ref_schema: impl Into<String>,
        ref_table: impl Into<String>,
        ref_columns: Vec<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            table: table.into(),
            columns,
            ref_schema: ref_schema.into(),
            ref_table: ref_table.into(),
            ref_columns,
            on_update: RefAction::NoAction,
            on_delete: RefAction::NoAction,
            name_explicit: true,
        }
    }

    pub fn on_update(mut self, action: RefAction) -> Self {
        self.on_update = action;
        self
    }

    pub fn on_delete(mut self, action: RefAction) -> Self {
        self.on_delete = action;
        self
    }

    pub fn default_named(mut self) -> Self {
        self.name_explicit = false;
        self
    }

    pub fn same_shape(&self, other: &Self) -> bool {
        self.schema == other.schema
            && self.table == other.table
            && self.columns == other.columns
            && self.ref_schema == other.ref_schema
            && self.ref_table == other.ref_table
            && self.ref_columns == other.ref_columns
            && self.on_update == other.on_update
            && self.on_delete == other.on_delete
    }
}

impl SchemaEntity for ForeignKey {
    type Key = SchemaScopedKey;
    const KIND: EntityKind = EntityKind::ForeignKey;

    fn key(&self) -> SchemaScopedKey {
        SchemaScopedKey {
            schema: self.schema.clone(),
            name: self.name.clone(),
        }
    }

    fn qualified_name(&self) -> QualifiedName {
        QualifiedName::in_schema(&self.schema, &self.name)
    }

    fn validate(&self) -> Result<(), String> {
        if self.columns.is_empty() {
            return Err(format!(
                "foreign key {} has no columns",
                self.qualified_name()
            ));
        }
        if self.columns.len() != self.ref_columns.len() {
            return Err(format!(
                "foreign key {} has {} columns but {} referenced columns",
                self.qualified_name(),
                self.columns.len(),
                self.ref_columns.len()
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckConstraint {
    pub schema: String,
    pub name: String,
    pub table: String,
    /// Raw predicate text as declared or introspected.
    pub expression: String,
}

impl CheckConstraint {
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        name: impl Into<String>,
        expression: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            table: table.into(),
            expression: expression.into(),
        }
    }
}

impl SchemaEntity for CheckConstraint {
    type Key = SchemaScopedKey;
    const KIND: EntityKind = EntityKind::Check;

    fn key(&self) -> SchemaScopedKey {
        SchemaScopedKey {
            schema: self.schema.clone(),
            name: self.name.clone(),
        }
    }

    fn qualified_name(&self) -> QualifiedName {
        QualifiedName::in_schema(&self.schema, &self.name)
    }

    fn validate(&self) -> Result<(), String> {
        if self.expression.is_empty() {
            return Err(format!(
                "check constraint {} has an empty expression",
                self.qualified_name()
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    pub schema: String,
    pub name: String,
    pub options: SequenceOptions,
}

impl Sequence {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            options: SequenceOptions::default(),
        }
    }

    pub fn options(mut self, options: SequenceOptions) -> Self {
        self.options = options;
        self
    }
}

impl SchemaEntity for Sequence {
    type Key = SchemaScopedKey;
    const KIND: EntityKind = EntityKind::Sequence;

    fn key(&self) -> SchemaScopedKey {
        SchemaScopedKey {
            schema: self.schema.clone(),
            name: self.name.clone(),
        }
    }

    fn qualified_name(&self) -> QualifiedName {
        QualifiedName::in_schema(&self.schema, &self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    pub create_db: bool,
    pub create_role: bool,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            create_db: false,
            create_role: false,
        }
    }

    pub fn create_db(mut self) -> Self {
        self.create_db = true;
        self
    }

    pub fn create_role(mut self) -> Self {
        self.create_role = true;
        self
    }
}

impl SchemaEntity for Role {
    type Key = NameKey;
    const KIND: EntityKind = EntityKind::Role;

    fn key(&self) -> NameKey {
        NameKey(self.name.clone())
    }

    fn qualified_name(&self) -> QualifiedName {
        QualifiedName::bare(&self.name)
    }
}

/// Command a row-security policy applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyCommand {
    All,
    Select,
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub schema: String,
    pub table: String,
    pub name: String,
    pub permissive: bool,
    pub commands: Vec<PolicyCommand>,
    pub roles: Vec<String>,
    pub using: Option<String>,
    pub with_check: Option<String>,
}

impl Policy {
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            name: name.into(),
            permissive: true,
            commands: vec![PolicyCommand::All],
            roles: vec!["public".into()],
            using: None,
            with_check: None,
        }
    }

    pub fn restrictive(mut self) -> Self {
        self.permissive = false;
        self
    }

    pub fn commands(mut self, commands: Vec<PolicyCommand>) -> Self {
        self.commands = commands;
        self
    }

    pub fn roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }

    pub fn using(mut self, predicate: impl Into<String>) -> Self {
        self.using = Some(predicate.into());
        self
    }

    pub fn with_check(mut self, predicate: impl Into<String>) -> Self {
        self.with_check = Some(predicate.into());
        self
    }
}

impl SchemaEntity for Policy {
    type Key = TableScopedKey;
    const KIND: EntityKind = EntityKind::Policy;

    fn key(&self) -> TableScopedKey {
        TableScopedKey {
            schema: self.schema.clone(),
            table: self.table.clone(),
            name: self.name.clone(),
        }
    }

    fn qualified_name(&self) -> QualifiedName {
        QualifiedName::in_table(&self.schema, &self.table, &self.name)
    }

    fn validate(&self) -> Result<(), String> {
        if self.commands.is_empty() {
            return Err(format!("policy {} applies to no commands", self.qualified_name()));
        }
        if self.roles.is_empty() {
            return Err(format!("policy {} grants no roles", self.qualified_name()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    pub schema: String,
    pub name: String,
    /// Body of the view; `None` when the producer withheld it, which
    /// suppresses definition comparison.
    pub definition: Option<String>,
    pub materialized: bool,
    pub with_no_data: bool,
}

impl View {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            definition: None,
            materialized: false,
            with_no_data: false,
        }
    }

    pub fn definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = Some(definition.into());
        self
    }

    pub fn materialized(mut self) -> Self {
        self.materialized = true;
        self
    }

    pub fn with_no_data(mut self) -> Self {
        self.with_no_data = true;
        self
    }
}

impl SchemaEntity for View {
    type Key = SchemaScopedKey;
    const KIND: EntityKind = EntityKind::View;

    fn key(&self) -> SchemaScopedKey {
        SchemaScopedKey {
            schema: self.schema.clone(),
            name: self.name.clone(),
        }
    }

    fn qualified_name(&self) -> QualifiedName {
        QualifiedName::in_schema(&self.schema, &self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumType {
    pub schema: String,
    pub name: String,
    pub values: Vec<String>,
}

impl EnumType {
    pub fn new(
        schema: impl Into<String>,
        name: impl Into<String>,
        values: Vec<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            values,
        }
    }
}

impl SchemaEntity for EnumType {
    type Key = SchemaScopedKey;
    const KIND: EntityKind = EntityKind::Enum;

    fn key(&self) -> SchemaScopedKey {
        SchemaScopedKey {
            schema: self.schema.clone(),
            name: self.name.clone(),
        }
    }

    fn qualified_name(&self) -> QualifiedName {
        QualifiedName::in_schema(&self.schema, &self.name)
    }

    fn validate(&self) -> Result<(), String> {
        let mut seen = std::collections::HashSet::new();
        for value in &self.values {
            if !seen.insert(value.as_str()) {
                return Err(format!(
                    "enum {} repeats value '{}'",
                    self.qualified_name(),
                    value
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_name_display() {
        assert_eq!(QualifiedName::bare("admin").to_string(), "admin");
        assert_eq!(
            QualifiedName::in_schema("public", "users").to_string(),
            "public.users"
        );
        assert_eq!(
            QualifiedName::in_table("public", "users", "id").to_string(),
            "public.users.id"
        );
    }

    #[test]
    fn test_column_validate_rejects_generated_identity_mix() {
        let column = Column::new("public", "users", "n", "integer")
            .generated(GeneratedSpec::stored("1 + 1"))
            .identity(IdentitySpec {
                kind: IdentityKind::Always,
                options: SequenceOptions::default(),
            });
        assert!(column.validate().is_err());
    }

    #[test]
    fn test_foreign_key_validate_column_arity() {
        let fk = ForeignKey::new(
            "public",
            "orders",
            "orders_user_id_fkey",
            vec!["user_id".into()],
            "public",
            "users",
            vec!["id".into(), "tenant".into()],
        );
        assert!(fk.validate().is_err());
    }

    #[test]
    fn test_index_same_shape_ignores_name() {
        let a = Index::new(
            "public",
            "users",
            "users_email_key",
            vec![IndexColumn::named("email")],
        )
        .unique()
        .default_named();
        let mut b = a.clone();
        b.name = "users_mail_key".into();
        assert!(a.same_shape(&b));

        let mut c = a.clone();
        c.columns = vec![IndexColumn::named("mail")];
        assert!(!a.same_shape(&c));
    }

    #[test]
    fn test_enum_validate_rejects_duplicate_values() {
        let e = EnumType::new("public", "mood", vec!["ok".into(), "ok".into()]);
        assert!(e.validate().is_err());
    }
}
