//! # pgdrift — schema drift engine for PostgreSQL
//!
//! Computes the set of changes that turn one schema snapshot into another
//! and orders them into a safe, dependency-respecting sequence of abstract
//! operations. Used both to generate migration scripts (prior snapshot vs
//! newly declared schema) and to push changes at a live database
//! (introspected snapshot vs declared schema).
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use pgdrift::prelude::*;
//!
//! let mut builder = Catalog::builder();
//! builder
//!     .add_table(Table::new("public", "users"))
//!     .add_column(Column::new("public", "users", "id", "integer").not_null());
//! let after = builder.finish()?;
//!
//! let resolver = MapResolver::new().rename("public.accounts", "public.users");
//! let ops = diff_catalogs(before, &after, &resolver, DiffMode::Plan).await?;
//! for op in &ops {
//!     println!("{op}");
//! }
//! ```
//!
//! The engine performs no I/O and renders no SQL: producers build the two
//! [`Catalog`](schema::store::Catalog)s, an injected
//! [`RenameResolver`](diff::RenameResolver) settles rename ambiguity, and a
//! downstream dialect renderer turns each [`Op`](plan::Op) into statements.

pub mod diff;
pub mod engine;
pub mod equiv;
pub mod error;
pub mod plan;
pub mod schema;

pub use engine::diff_catalogs;

pub mod prelude {
    pub use crate::diff::{MapResolver, NoopResolver, RenameResolver};
    pub use crate::engine::diff_catalogs;
    pub use crate::error::{DriftError, DriftResult};
    pub use crate::plan::{DiffMode, Op};
    pub use crate::schema::store::{Catalog, CatalogBuilder};
    pub use crate::schema::{
        CheckConstraint, Column, ColumnDefault, EnumType, ForeignKey, Index, IndexColumn, Policy,
        PrimaryKey, Role, Schema, Sequence, Table, View,
    };
}
