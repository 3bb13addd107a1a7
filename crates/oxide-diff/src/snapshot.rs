//! Schema snapshot types.
//!
//! A [`Snapshot`] is the structured catalog of one database state, as
//! produced by an introspection collaborator. Each object kind has its own
//! entity type with structural equality; a snapshot holds one map per kind,
//! keyed by the object's quoted qualified name.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::dialect::{qualified, quote_ident};
use crate::error::DiffError;

/// Category of schema object. Variant order is the tie-break rank used
/// when ordering statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    /// Namespace.
    Schema,
    /// Installed extension.
    Extension,
    /// Enumerated type.
    Enum,
    /// Sequence.
    Sequence,
    /// Function or procedure.
    Function,
    /// Ordinary table.
    Table,
    /// Table column (changes only; columns live inside tables).
    Column,
    /// View or materialized view.
    View,
    /// Table constraint.
    Constraint,
    /// Index.
    Index,
    /// Trigger.
    Trigger,
    /// Row-level security policy.
    Policy,
    /// Privilege grant.
    Privilege,
}

impl ObjectKind {
    /// Every kind, in rank order.
    pub const ALL: [Self; 13] = [
        Self::Schema,
        Self::Extension,
        Self::Enum,
        Self::Sequence,
        Self::Function,
        Self::Table,
        Self::Column,
        Self::View,
        Self::Constraint,
        Self::Index,
        Self::Trigger,
        Self::Policy,
        Self::Privilege,
    ];

    /// Singular name, as used in snapshots and log output.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Schema => "schema",
            Self::Extension => "extension",
            Self::Enum => "enum",
            Self::Sequence => "sequence",
            Self::Function => "function",
            Self::Table => "table",
            Self::Column => "column",
            Self::View => "view",
            Self::Constraint => "constraint",
            Self::Index => "index",
            Self::Trigger => "trigger",
            Self::Policy => "policy",
            Self::Privilege => "privilege",
        }
    }

    /// Plural name, as used by the change registry.
    #[must_use]
    pub const fn plural(self) -> &'static str {
        match self {
            Self::Schema => "schemas",
            Self::Extension => "extensions",
            Self::Enum => "enums",
            Self::Sequence => "sequences",
            Self::Function => "functions",
            Self::Table => "tables",
            Self::Column => "columns",
            Self::View => "views",
            Self::Constraint => "constraints",
            Self::Index => "indexes",
            Self::Trigger => "triggers",
            Self::Policy => "policies",
            Self::Privilege => "privileges",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ObjectKind {
    type Err = DiffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s || kind.plural() == s)
            .ok_or_else(|| DiffError::UnknownKind(s.to_string()))
    }
}

/// Identifies one object: its kind plus its quoted qualified name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId {
    /// Object kind.
    pub kind: ObjectKind,
    /// Quoted qualified name (e.g. `"public"."users"`).
    pub name: String,
}

impl ObjectId {
    /// Creates a new identifier.
    #[must_use]
    pub fn new(kind: ObjectKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    /// Identifier of a schema.
    #[must_use]
    pub fn schema(name: &str) -> Self {
        Self::new(ObjectKind::Schema, quote_ident(name))
    }

    /// Identifier of a table.
    #[must_use]
    pub fn table(schema: &str, name: &str) -> Self {
        Self::new(ObjectKind::Table, qualified(schema, name))
    }

    /// Identifier of a view.
    #[must_use]
    pub fn view(schema: &str, name: &str) -> Self {
        Self::new(ObjectKind::View, qualified(schema, name))
    }

    /// Identifier of an enum type.
    #[must_use]
    pub fn enum_type(schema: &str, name: &str) -> Self {
        Self::new(ObjectKind::Enum, qualified(schema, name))
    }

    /// Identifier of a sequence.
    #[must_use]
    pub fn sequence(schema: &str, name: &str) -> Self {
        Self::new(ObjectKind::Sequence, qualified(schema, name))
    }

    /// Identifier of a function with its identity argument list.
    #[must_use]
    pub fn function(schema: &str, name: &str, identity_arguments: &str) -> Self {
        Self::new(
            ObjectKind::Function,
            format!("{}({identity_arguments})", qualified(schema, name)),
        )
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)
    }
}

/// Behavior shared by every per-kind entity.
pub trait CatalogObject {
    /// Kind of this entity type.
    const KIND: ObjectKind;

    /// Quoted qualified name, unique within the kind.
    fn key(&self) -> String;

    /// Schema the object lives in, if it is schema-scoped.
    fn schema(&self) -> Option<&str>;

    /// Recorded dependency links plus the structural ones implied by the
    /// object itself (its schema, its table, ...).
    fn dependencies(&self) -> BTreeSet<ObjectId>;

    /// Identifier of this object.
    fn id(&self) -> ObjectId {
        ObjectId::new(Self::KIND, self.key())
    }
}

fn with_schema(schema: &str, mut deps: BTreeSet<ObjectId>) -> BTreeSet<ObjectId> {
    deps.insert(ObjectId::schema(schema));
    deps
}

// ================================================================
// Schemas and extensions
// ================================================================

/// A namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDef {
    /// Schema name.
    pub name: String,
    /// Owning role.
    #[serde(default)]
    pub owner: Option<String>,
    /// Comment.
    #[serde(default)]
    pub comment: Option<String>,
}

impl SchemaDef {
    /// Creates a new schema definition.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: None,
            comment: None,
        }
    }

    /// Sets the owner.
    #[must_use]
    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Sets the comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

impl CatalogObject for SchemaDef {
    const KIND: ObjectKind = ObjectKind::Schema;

    fn key(&self) -> String {
        quote_ident(&self.name)
    }

    fn schema(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn dependencies(&self) -> BTreeSet<ObjectId> {
        BTreeSet::new()
    }
}

/// An installed extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extension {
    /// Extension name.
    pub name: String,
    /// Schema the extension's objects are installed into.
    pub schema: String,
    /// Installed version.
    #[serde(default)]
    pub version: Option<String>,
}

impl Extension {
    /// Creates a new extension record.
    #[must_use]
    pub fn new(name: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: schema.into(),
            version: None,
        }
    }

    /// Sets the version.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

impl CatalogObject for Extension {
    const KIND: ObjectKind = ObjectKind::Extension;

    fn key(&self) -> String {
        quote_ident(&self.name)
    }

    fn schema(&self) -> Option<&str> {
        Some(&self.schema)
    }

    fn dependencies(&self) -> BTreeSet<ObjectId> {
        with_schema(&self.schema, BTreeSet::new())
    }
}

// ================================================================
// Types and sequences
// ================================================================

/// An enumerated type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumType {
    /// Schema name.
    pub schema: String,
    /// Type name.
    pub name: String,
    /// Labels in sort order.
    pub labels: Vec<String>,
    /// Owning role.
    #[serde(default)]
    pub owner: Option<String>,
    /// Comment.
    #[serde(default)]
    pub comment: Option<String>,
}

impl EnumType {
    /// Creates a new enum type.
    #[must_use]
    pub fn new<I, S>(schema: impl Into<String>, name: impl Into<String>, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            schema: schema.into(),
            name: name.into(),
            labels: labels.into_iter().map(Into::into).collect(),
            owner: None,
            comment: None,
        }
    }

    /// Sets the owner.
    #[must_use]
    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }
}

impl CatalogObject for EnumType {
    const KIND: ObjectKind = ObjectKind::Enum;

    fn key(&self) -> String {
        qualified(&self.schema, &self.name)
    }

    fn schema(&self) -> Option<&str> {
        Some(&self.schema)
    }

    fn dependencies(&self) -> BTreeSet<ObjectId> {
        with_schema(&self.schema, BTreeSet::new())
    }
}

/// The column a sequence is owned by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedBy {
    /// Quoted qualified table name.
    pub table: String,
    /// Column name.
    pub column: String,
}

/// A sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    /// Schema name.
    pub schema: String,
    /// Sequence name.
    pub name: String,
    /// Data type (`bigint` when absent).
    #[serde(default)]
    pub data_type: Option<String>,
    /// Start value.
    #[serde(default)]
    pub start: Option<i64>,
    /// Increment.
    #[serde(default)]
    pub increment: Option<i64>,
    /// Owning column.
    #[serde(default)]
    pub owned_by: Option<OwnedBy>,
    /// Owning role.
    #[serde(default)]
    pub owner: Option<String>,
    /// Comment.
    #[serde(default)]
    pub comment: Option<String>,
}

impl Sequence {
    /// Creates a new sequence.
    #[must_use]
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            data_type: None,
            start: None,
            increment: None,
            owned_by: None,
            owner: None,
            comment: None,
        }
    }

    /// Sets the start value.
    #[must_use]
    pub fn start(mut self, start: i64) -> Self {
        self.start = Some(start);
        self
    }

    /// Sets the increment.
    #[must_use]
    pub fn increment(mut self, increment: i64) -> Self {
        self.increment = Some(increment);
        self
    }

    /// Sets the owner.
    #[must_use]
    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Marks the sequence as owned by a table column.
    #[must_use]
    pub fn owned_by(mut self, table: &ObjectId, column: impl Into<String>) -> Self {
        self.owned_by = Some(OwnedBy {
            table: table.name.clone(),
            column: column.into(),
        });
        self
    }
}

impl CatalogObject for Sequence {
    const KIND: ObjectKind = ObjectKind::Sequence;

    fn key(&self) -> String {
        qualified(&self.schema, &self.name)
    }

    fn schema(&self) -> Option<&str> {
        Some(&self.schema)
    }

    fn dependencies(&self) -> BTreeSet<ObjectId> {
        with_schema(&self.schema, BTreeSet::new())
    }
}

// ================================================================
// Tables and columns
// ================================================================

/// Identity generation mode of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Identity {
    /// `GENERATED ALWAYS AS IDENTITY`.
    Always,
    /// `GENERATED BY DEFAULT AS IDENTITY`.
    ByDefault,
}

impl Identity {
    /// SQL keyword(s) for this mode.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::ByDefault => "by default",
        }
    }
}

/// A table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Formatted data type (e.g. `character varying(10)`, `"public"."mood"`).
    pub data_type: String,
    /// Whether the column is `NOT NULL`.
    #[serde(default)]
    pub not_null: bool,
    /// Default expression.
    #[serde(default)]
    pub default: Option<String>,
    /// Identity mode.
    #[serde(default)]
    pub identity: Option<Identity>,
    /// Generation expression of a stored generated column.
    #[serde(default)]
    pub generated: Option<String>,
    /// Explicit collation.
    #[serde(default)]
    pub collation: Option<String>,
    /// Comment.
    #[serde(default)]
    pub comment: Option<String>,
}

impl Column {
    /// Creates a new nullable column.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            not_null: false,
            default: None,
            identity: None,
            generated: None,
            collation: None,
            comment: None,
        }
    }

    /// Sets the column as NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Sets the default expression.
    #[must_use]
    pub fn default(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(expr.into());
        self
    }

    /// Sets the identity mode (implies NOT NULL).
    #[must_use]
    pub fn identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self.not_null = true;
        self
    }

    /// Makes this a stored generated column.
    #[must_use]
    pub fn generated(mut self, expr: impl Into<String>) -> Self {
        self.generated = Some(expr.into());
        self
    }

    /// Sets the collation.
    #[must_use]
    pub fn collation(mut self, collation: impl Into<String>) -> Self {
        self.collation = Some(collation.into());
        self
    }

    /// Sets the comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// A table.
///
/// Equality ignores column order: a column appended by `ALTER TABLE`
/// lands at the end of the physical table, so positional order cannot
/// be reconciled in place.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Schema name.
    pub schema: String,
    /// Table name.
    pub name: String,
    /// Columns in declaration order.
    #[serde(default)]
    pub columns: Vec<Column>,
    /// Whether row-level security is enabled.
    #[serde(default)]
    pub row_security: bool,
    /// Owning role.
    #[serde(default)]
    pub owner: Option<String>,
    /// Comment.
    #[serde(default)]
    pub comment: Option<String>,
    /// Partitioning clause of a partitioned table, such as `range (created_at)`.
    #[serde(default)]
    pub partition_by: Option<String>,
    /// Parent and bound when this table is a partition.
    #[serde(default)]
    pub partition_of: Option<PartitionOf>,
    /// Tables inherited from, in declaration order.
    #[serde(default)]
    pub inherits: Vec<ObjectId>,
    /// Recorded dependencies (enum column types, sequences in defaults, ...).
    #[serde(default)]
    pub depends_on: BTreeSet<ObjectId>,
}

/// Where a partition attaches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionOf {
    /// The partitioned table.
    pub parent: ObjectId,
    /// Bound specification, e.g. `for values from (1) to (10)` or `default`.
    pub bound: String,
}

impl Table {
    /// Creates a new table without columns.
    #[must_use]
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            columns: Vec::new(),
            row_security: false,
            owner: None,
            comment: None,
            partition_by: None,
            partition_of: None,
            inherits: Vec::new(),
            depends_on: BTreeSet::new(),
        }
    }

    /// Adds a column.
    #[must_use]
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Enables row-level security.
    #[must_use]
    pub fn row_security(mut self) -> Self {
        self.row_security = true;
        self
    }

    /// Sets the owner.
    #[must_use]
    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Sets the comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Records a dependency.
    #[must_use]
    pub fn depends_on(mut self, id: ObjectId) -> Self {
        self.depends_on.insert(id);
        self
    }

    /// Makes this a partitioned table.
    #[must_use]
    pub fn partition_by(mut self, clause: impl Into<String>) -> Self {
        self.partition_by = Some(clause.into());
        self
    }

    /// Makes this a partition of `parent`.
    #[must_use]
    pub fn partition_of(mut self, parent: ObjectId, bound: impl Into<String>) -> Self {
        self.partition_of = Some(PartitionOf {
            parent,
            bound: bound.into(),
        });
        self
    }

    /// Adds an inherited parent table.
    #[must_use]
    pub fn inherits(mut self, parent: ObjectId) -> Self {
        self.inherits.push(parent);
        self
    }

    /// Partition parent followed by inherited parents.
    pub fn parents(&self) -> impl Iterator<Item = &ObjectId> {
        self.partition_of
            .iter()
            .map(|p| &p.parent)
            .chain(&self.inherits)
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Columns keyed by name.
    #[must_use]
    pub fn columns_by_name(&self) -> BTreeMap<&str, &Column> {
        self.columns.iter().map(|c| (c.name.as_str(), c)).collect()
    }

    /// Identifier of one of this table's columns.
    #[must_use]
    pub fn column_id(&self, column: &str) -> ObjectId {
        ObjectId::new(
            ObjectKind::Column,
            format!("{}.{}", self.key(), quote_ident(column)),
        )
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.schema == other.schema
            && self.name == other.name
            && self.row_security == other.row_security
            && self.owner == other.owner
            && self.comment == other.comment
            && self.partition_by == other.partition_by
            && self.partition_of == other.partition_of
            && self.inherits == other.inherits
            && self.depends_on == other.depends_on
            && self.columns_by_name() == other.columns_by_name()
    }
}

impl CatalogObject for Table {
    const KIND: ObjectKind = ObjectKind::Table;

    fn key(&self) -> String {
        qualified(&self.schema, &self.name)
    }

    fn schema(&self) -> Option<&str> {
        Some(&self.schema)
    }

    fn dependencies(&self) -> BTreeSet<ObjectId> {
        let mut deps = with_schema(&self.schema, self.depends_on.clone());
        deps.extend(self.parents().cloned());
        deps
    }
}

// ================================================================
// Views
// ================================================================

/// A view or materialized view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    /// Schema name.
    pub schema: String,
    /// View name.
    pub name: String,
    /// The view's query.
    pub definition: String,
    /// Whether this is a materialized view.
    #[serde(default)]
    pub materialized: bool,
    /// Owning role.
    #[serde(default)]
    pub owner: Option<String>,
    /// Comment.
    #[serde(default)]
    pub comment: Option<String>,
    /// Relations and functions the query reads from.
    #[serde(default)]
    pub depends_on: BTreeSet<ObjectId>,
}

impl View {
    /// Creates a new view.
    #[must_use]
    pub fn new(
        schema: impl Into<String>,
        name: impl Into<String>,
        definition: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            definition: definition.into(),
            materialized: false,
            owner: None,
            comment: None,
            depends_on: BTreeSet::new(),
        }
    }

    /// Makes this a materialized view.
    #[must_use]
    pub fn materialized(mut self) -> Self {
        self.materialized = true;
        self
    }

    /// Sets the owner.
    #[must_use]
    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Sets the comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Records a dependency.
    #[must_use]
    pub fn depends_on(mut self, id: ObjectId) -> Self {
        self.depends_on.insert(id);
        self
    }

    /// SQL keyword for this relation kind.
    #[must_use]
    pub const fn keyword(&self) -> &'static str {
        if self.materialized {
            "materialized view"
        } else {
            "view"
        }
    }
}

impl CatalogObject for View {
    const KIND: ObjectKind = ObjectKind::View;

    fn key(&self) -> String {
        qualified(&self.schema, &self.name)
    }

    fn schema(&self) -> Option<&str> {
        Some(&self.schema)
    }

    fn dependencies(&self) -> BTreeSet<ObjectId> {
        with_schema(&self.schema, self.depends_on.clone())
    }
}

// ================================================================
// Functions
// ================================================================

/// Function volatility class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Volatility {
    /// `IMMUTABLE`.
    Immutable,
    /// `STABLE`.
    Stable,
    /// `VOLATILE`.
    #[default]
    Volatile,
}

impl Volatility {
    /// SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Immutable => "immutable",
            Self::Stable => "stable",
            Self::Volatile => "volatile",
        }
    }
}

/// A function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    /// Schema name.
    pub schema: String,
    /// Function name.
    pub name: String,
    /// Full argument list (names, types, defaults).
    #[serde(default)]
    pub arguments: String,
    /// Argument types that identify the function.
    #[serde(default)]
    pub identity_arguments: String,
    /// Result type.
    pub returns: String,
    /// Implementation language.
    pub language: String,
    /// Function body.
    pub body: String,
    /// Volatility class.
    #[serde(default)]
    pub volatility: Volatility,
    /// Whether the function runs with its owner's privileges.
    #[serde(default)]
    pub security_definer: bool,
    /// Owning role.
    #[serde(default)]
    pub owner: Option<String>,
    /// Comment.
    #[serde(default)]
    pub comment: Option<String>,
    /// Objects referenced by the signature or body.
    #[serde(default)]
    pub depends_on: BTreeSet<ObjectId>,
}

impl Function {
    /// Creates a new function without arguments.
    #[must_use]
    pub fn new(
        schema: impl Into<String>,
        name: impl Into<String>,
        returns: impl Into<String>,
        language: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            arguments: String::new(),
            identity_arguments: String::new(),
            returns: returns.into(),
            language: language.into(),
            body: body.into(),
            volatility: Volatility::default(),
            security_definer: false,
            owner: None,
            comment: None,
            depends_on: BTreeSet::new(),
        }
    }

    /// Sets the argument list; the identity list is derived by the caller.
    #[must_use]
    pub fn arguments(
        mut self,
        arguments: impl Into<String>,
        identity_arguments: impl Into<String>,
    ) -> Self {
        self.arguments = arguments.into();
        self.identity_arguments = identity_arguments.into();
        self
    }

    /// Sets the volatility.
    #[must_use]
    pub fn volatility(mut self, volatility: Volatility) -> Self {
        self.volatility = volatility;
        self
    }

    /// Sets the owner.
    #[must_use]
    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Records a dependency.
    #[must_use]
    pub fn depends_on(mut self, id: ObjectId) -> Self {
        self.depends_on.insert(id);
        self
    }

    /// Quoted name with identity arguments, as used by DROP/COMMENT/GRANT.
    #[must_use]
    pub fn signature(&self) -> String {
        self.key()
    }
}

impl CatalogObject for Function {
    const KIND: ObjectKind = ObjectKind::Function;

    fn key(&self) -> String {
        format!(
            "{}({})",
            qualified(&self.schema, &self.name),
            self.identity_arguments
        )
    }

    fn schema(&self) -> Option<&str> {
        Some(&self.schema)
    }

    fn dependencies(&self) -> BTreeSet<ObjectId> {
        with_schema(&self.schema, self.depends_on.clone())
    }
}

// ================================================================
// Constraints and indexes
// ================================================================

/// Constraint category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintType {
    /// `CHECK (...)`.
    Check,
    /// `FOREIGN KEY ... REFERENCES ...`.
    ForeignKey,
    /// `PRIMARY KEY (...)`.
    PrimaryKey,
    /// `UNIQUE (...)`.
    Unique,
    /// `EXCLUDE USING ...`.
    Exclude,
}

/// A table constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    /// Schema name.
    pub schema: String,
    /// Table name.
    pub table: String,
    /// Constraint name.
    pub name: String,
    /// Constraint category.
    pub constraint_type: ConstraintType,
    /// Definition as written after `ADD CONSTRAINT name`.
    pub definition: String,
    /// Referenced table (quoted qualified name) for foreign keys.
    #[serde(default)]
    pub references: Option<String>,
    /// Additional recorded dependencies.
    #[serde(default)]
    pub depends_on: BTreeSet<ObjectId>,
}

impl Constraint {
    /// Creates a new constraint.
    #[must_use]
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        name: impl Into<String>,
        constraint_type: ConstraintType,
        definition: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            name: name.into(),
            constraint_type,
            definition: definition.into(),
            references: None,
            depends_on: BTreeSet::new(),
        }
    }

    /// Sets the referenced table of a foreign key.
    #[must_use]
    pub fn references(mut self, table: &ObjectId) -> Self {
        self.references = Some(table.name.clone());
        self
    }

    /// Identifier of the constrained table.
    #[must_use]
    pub fn table_id(&self) -> ObjectId {
        ObjectId::table(&self.schema, &self.table)
    }
}

impl CatalogObject for Constraint {
    const KIND: ObjectKind = ObjectKind::Constraint;

    fn key(&self) -> String {
        format!(
            "{}.{}",
            qualified(&self.schema, &self.table),
            quote_ident(&self.name)
        )
    }

    fn schema(&self) -> Option<&str> {
        Some(&self.schema)
    }

    fn dependencies(&self) -> BTreeSet<ObjectId> {
        let mut deps = with_schema(&self.schema, self.depends_on.clone());
        deps.insert(self.table_id());
        if let Some(ref referenced) = self.references {
            deps.insert(ObjectId::new(ObjectKind::Table, referenced.clone()));
        }
        deps
    }
}

/// An index that does not back a constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    /// Schema name.
    pub schema: String,
    /// Indexed table or materialized view.
    pub table: String,
    /// Index name.
    pub name: String,
    /// Indexed columns or expressions.
    pub columns: Vec<String>,
    /// Whether this is a UNIQUE index.
    #[serde(default)]
    pub unique: bool,
    /// Access method (`btree` when absent).
    #[serde(default)]
    pub method: Option<String>,
    /// Partial index predicate.
    #[serde(default)]
    pub predicate: Option<String>,
    /// Additional recorded dependencies.
    #[serde(default)]
    pub depends_on: BTreeSet<ObjectId>,
}

impl Index {
    /// Creates a new index.
    #[must_use]
    pub fn new<I, S>(
        schema: impl Into<String>,
        table: impl Into<String>,
        name: impl Into<String>,
        columns: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            schema: schema.into(),
            table: table.into(),
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            unique: false,
            method: None,
            predicate: None,
            depends_on: BTreeSet::new(),
        }
    }

    /// Makes this a unique index.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets a partial index predicate.
    #[must_use]
    pub fn predicate(mut self, predicate: impl Into<String>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    /// Identifier of the indexed relation.
    #[must_use]
    pub fn table_id(&self) -> ObjectId {
        ObjectId::table(&self.schema, &self.table)
    }
}

impl CatalogObject for Index {
    const KIND: ObjectKind = ObjectKind::Index;

    fn key(&self) -> String {
        qualified(&self.schema, &self.name)
    }

    fn schema(&self) -> Option<&str> {
        Some(&self.schema)
    }

    fn dependencies(&self) -> BTreeSet<ObjectId> {
        let mut deps = with_schema(&self.schema, self.depends_on.clone());
        deps.insert(self.table_id());
        deps
    }
}

// ================================================================
// Triggers and policies
// ================================================================

/// When a trigger fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerTiming {
    /// `BEFORE`.
    Before,
    /// `AFTER`.
    After,
    /// `INSTEAD OF`.
    InsteadOf,
}

impl TriggerTiming {
    /// SQL keyword(s).
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::After => "after",
            Self::InsteadOf => "instead of",
        }
    }
}

/// A trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    /// Schema name.
    pub schema: String,
    /// Table the trigger is attached to.
    pub table: String,
    /// Trigger name.
    pub name: String,
    /// Firing time.
    pub timing: TriggerTiming,
    /// Events (`insert`, `update`, `delete`, `truncate`).
    pub events: Vec<String>,
    /// `FOR EACH ROW` when true, `FOR EACH STATEMENT` otherwise.
    #[serde(default)]
    pub for_each_row: bool,
    /// Function invocation, e.g. `"public"."audit"()`.
    pub function: String,
    /// `WHEN` condition.
    #[serde(default)]
    pub condition: Option<String>,
    /// Additional recorded dependencies (usually the function).
    #[serde(default)]
    pub depends_on: BTreeSet<ObjectId>,
}

impl Trigger {
    /// Creates a new row-level trigger.
    #[must_use]
    pub fn new<I, S>(
        schema: impl Into<String>,
        table: impl Into<String>,
        name: impl Into<String>,
        timing: TriggerTiming,
        events: I,
        function: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            schema: schema.into(),
            table: table.into(),
            name: name.into(),
            timing,
            events: events.into_iter().map(Into::into).collect(),
            for_each_row: true,
            function: function.into(),
            condition: None,
            depends_on: BTreeSet::new(),
        }
    }

    /// Sets the `WHEN` condition.
    #[must_use]
    pub fn condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    /// Records a dependency.
    #[must_use]
    pub fn depends_on(mut self, id: ObjectId) -> Self {
        self.depends_on.insert(id);
        self
    }

    /// Identifier of the table.
    #[must_use]
    pub fn table_id(&self) -> ObjectId {
        ObjectId::table(&self.schema, &self.table)
    }
}

impl CatalogObject for Trigger {
    const KIND: ObjectKind = ObjectKind::Trigger;

    fn key(&self) -> String {
        format!(
            "{}.{}",
            qualified(&self.schema, &self.table),
            quote_ident(&self.name)
        )
    }

    fn schema(&self) -> Option<&str> {
        Some(&self.schema)
    }

    fn dependencies(&self) -> BTreeSet<ObjectId> {
        let mut deps = with_schema(&self.schema, self.depends_on.clone());
        deps.insert(self.table_id());
        deps
    }
}

fn default_true() -> bool {
    true
}

fn default_command() -> String {
    "all".to_string()
}

fn default_roles() -> Vec<String> {
    vec!["public".to_string()]
}

/// A row-level security policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Schema name.
    pub schema: String,
    /// Table the policy applies to.
    pub table: String,
    /// Policy name.
    pub name: String,
    /// `AS PERMISSIVE` when true, `AS RESTRICTIVE` otherwise.
    #[serde(default = "default_true")]
    pub permissive: bool,
    /// Command the policy applies to (`all`, `select`, ...).
    #[serde(default = "default_command")]
    pub command: String,
    /// Roles the policy applies to.
    #[serde(default = "default_roles")]
    pub roles: Vec<String>,
    /// `USING` expression.
    #[serde(default)]
    pub using: Option<String>,
    /// `WITH CHECK` expression.
    #[serde(default)]
    pub with_check: Option<String>,
    /// Additional recorded dependencies.
    #[serde(default)]
    pub depends_on: BTreeSet<ObjectId>,
}

impl Policy {
    /// Creates a permissive policy for all commands and roles.
    #[must_use]
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
            command: default_command(),
            roles: default_roles(),
            using: None,
            with_check: None,
            depends_on: BTreeSet::new(),
        }
    }

    /// Sets the `USING` expression.
    #[must_use]
    pub fn using(mut self, expr: impl Into<String>) -> Self {
        self.using = Some(expr.into());
        self
    }

    /// Identifier of the table.
    #[must_use]
    pub fn table_id(&self) -> ObjectId {
        ObjectId::table(&self.schema, &self.table)
    }
}

impl CatalogObject for Policy {
    const KIND: ObjectKind = ObjectKind::Policy;

    fn key(&self) -> String {
        format!(
            "{}.{}",
            qualified(&self.schema, &self.table),
            quote_ident(&self.name)
        )
    }

    fn schema(&self) -> Option<&str> {
        Some(&self.schema)
    }

    fn dependencies(&self) -> BTreeSet<ObjectId> {
        let mut deps = with_schema(&self.schema, self.depends_on.clone());
        deps.insert(self.table_id());
        deps
    }
}

// ================================================================
// Privileges
// ================================================================

/// One privilege granted on one object to one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Privilege {
    /// Object the privilege applies to.
    pub target: ObjectId,
    /// Privilege name (`select`, `usage`, `execute`, ...).
    pub privilege: String,
    /// Receiving role (`PUBLIC` for everyone).
    pub grantee: String,
}

impl Privilege {
    /// Creates a new privilege.
    #[must_use]
    pub fn new(
        target: ObjectId,
        privilege: impl Into<String>,
        grantee: impl Into<String>,
    ) -> Self {
        Self {
            target,
            privilege: privilege.into(),
            grantee: grantee.into(),
        }
    }

    /// Object type keyword used by GRANT/REVOKE for the target.
    #[must_use]
    pub const fn object_type(&self) -> &'static str {
        match self.target.kind {
            ObjectKind::Schema => "schema",
            ObjectKind::Sequence => "sequence",
            ObjectKind::Function => "function",
            ObjectKind::Enum => "type",
            _ => "table",
        }
    }
}

impl CatalogObject for Privilege {
    const KIND: ObjectKind = ObjectKind::Privilege;

    fn key(&self) -> String {
        format!(
            "{} on {} to {}",
            self.privilege, self.target, self.grantee
        )
    }

    fn schema(&self) -> Option<&str> {
        None
    }

    fn dependencies(&self) -> BTreeSet<ObjectId> {
        BTreeSet::from([self.target.clone()])
    }
}

// ================================================================
// Type-erased object
// ================================================================

/// Any catalog entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaObject {
    /// A schema.
    Schema(SchemaDef),
    /// An extension.
    Extension(Extension),
    /// An enum type.
    Enum(EnumType),
    /// A sequence.
    Sequence(Sequence),
    /// A function.
    Function(Function),
    /// A table.
    Table(Table),
    /// A view.
    View(View),
    /// A constraint.
    Constraint(Constraint),
    /// An index.
    Index(Index),
    /// A trigger.
    Trigger(Trigger),
    /// A policy.
    Policy(Policy),
    /// A privilege.
    Privilege(Privilege),
}

impl SchemaObject {
    /// Identifier of the wrapped object.
    #[must_use]
    pub fn id(&self) -> ObjectId {
        match self {
            Self::Schema(o) => o.id(),
            Self::Extension(o) => o.id(),
            Self::Enum(o) => o.id(),
            Self::Sequence(o) => o.id(),
            Self::Function(o) => o.id(),
            Self::Table(o) => o.id(),
            Self::View(o) => o.id(),
            Self::Constraint(o) => o.id(),
            Self::Index(o) => o.id(),
            Self::Trigger(o) => o.id(),
            Self::Policy(o) => o.id(),
            Self::Privilege(o) => o.id(),
        }
    }
}

macro_rules! impl_from_object {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for SchemaObject {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

impl_from_object!(
    Schema(SchemaDef),
    Extension(Extension),
    Enum(EnumType),
    Sequence(Sequence),
    Function(Function),
    Table(Table),
    View(View),
    Constraint(Constraint),
    Index(Index),
    Trigger(Trigger),
    Policy(Policy),
    Privilege(Privilege),
);

// ================================================================
// Schema filter
// ================================================================

/// Restricts a snapshot to one schema, or excludes some schemas.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaFilter {
    /// Only keep objects in this schema.
    pub schema: Option<String>,
    /// Drop objects in these schemas.
    pub exclude: Vec<String>,
}

impl SchemaFilter {
    /// Creates an unrestricted filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps only the given schema.
    #[must_use]
    pub fn only(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Excludes a schema.
    #[must_use]
    pub fn exclude(mut self, schema: impl Into<String>) -> Self {
        self.exclude.push(schema.into());
        self
    }

    /// Returns true if the filter keeps everything.
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.schema.is_none() && self.exclude.is_empty()
    }

    /// Rejects filters that both select and exclude schemas.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.schema.is_some() && !self.exclude.is_empty() {
            return Err(DiffError::InvalidState(
                "cannot restrict to a schema and exclude schemas at the same time".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns true if objects in `schema` are kept.
    #[must_use]
    pub fn allows(&self, schema: &str) -> bool {
        if let Some(ref only) = self.schema {
            return only == schema;
        }
        !self.exclude.iter().any(|s| s == schema)
    }
}

// ================================================================
// Snapshot
// ================================================================

mod keyed {
    //! (De)serializes a per-kind map as a plain list of entities.

    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::CatalogObject;

    pub fn serialize<S, T>(map: &BTreeMap<String, T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        serializer.collect_seq(map.values())
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<BTreeMap<String, T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + CatalogObject,
    {
        let items = Vec::<T>::deserialize(deserializer)?;
        Ok(items.into_iter().map(|item| (item.key(), item)).collect())
    }
}

/// The structured catalog of one database state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Schemas.
    #[serde(default, with = "keyed")]
    pub schemas: BTreeMap<String, SchemaDef>,
    /// Extensions.
    #[serde(default, with = "keyed")]
    pub extensions: BTreeMap<String, Extension>,
    /// Enum types.
    #[serde(default, with = "keyed")]
    pub enums: BTreeMap<String, EnumType>,
    /// Sequences.
    #[serde(default, with = "keyed")]
    pub sequences: BTreeMap<String, Sequence>,
    /// Functions.
    #[serde(default, with = "keyed")]
    pub functions: BTreeMap<String, Function>,
    /// Tables.
    #[serde(default, with = "keyed")]
    pub tables: BTreeMap<String, Table>,
    /// Views and materialized views.
    #[serde(default, with = "keyed")]
    pub views: BTreeMap<String, View>,
    /// Constraints.
    #[serde(default, with = "keyed")]
    pub constraints: BTreeMap<String, Constraint>,
    /// Indexes.
    #[serde(default, with = "keyed")]
    pub indexes: BTreeMap<String, Index>,
    /// Triggers.
    #[serde(default, with = "keyed")]
    pub triggers: BTreeMap<String, Trigger>,
    /// Row-level security policies.
    #[serde(default, with = "keyed")]
    pub policies: BTreeMap<String, Policy>,
    /// Privileges.
    #[serde(default, with = "keyed")]
    pub privileges: BTreeMap<String, Privilege>,
}

impl Snapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an object (builder style).
    #[must_use]
    pub fn with(mut self, object: impl Into<SchemaObject>) -> Self {
        self.put(object.into());
        self
    }

    /// Inserts or replaces an object.
    pub fn put(&mut self, object: SchemaObject) {
        match object {
            SchemaObject::Schema(o) => insert(&mut self.schemas, o),
            SchemaObject::Extension(o) => insert(&mut self.extensions, o),
            SchemaObject::Enum(o) => insert(&mut self.enums, o),
            SchemaObject::Sequence(o) => insert(&mut self.sequences, o),
            SchemaObject::Function(o) => insert(&mut self.functions, o),
            SchemaObject::Table(o) => insert(&mut self.tables, o),
            SchemaObject::View(o) => insert(&mut self.views, o),
            SchemaObject::Constraint(o) => insert(&mut self.constraints, o),
            SchemaObject::Index(o) => insert(&mut self.indexes, o),
            SchemaObject::Trigger(o) => insert(&mut self.triggers, o),
            SchemaObject::Policy(o) => insert(&mut self.policies, o),
            SchemaObject::Privilege(o) => insert(&mut self.privileges, o),
        }
    }

    /// Removes an object. Returns true if it was present.
    pub fn remove(&mut self, id: &ObjectId) -> bool {
        let key = id.name.as_str();
        match id.kind {
            ObjectKind::Schema => self.schemas.remove(key).is_some(),
            ObjectKind::Extension => self.extensions.remove(key).is_some(),
            ObjectKind::Enum => self.enums.remove(key).is_some(),
            ObjectKind::Sequence => self.sequences.remove(key).is_some(),
            ObjectKind::Function => self.functions.remove(key).is_some(),
            ObjectKind::Table => self.tables.remove(key).is_some(),
            ObjectKind::View => self.views.remove(key).is_some(),
            ObjectKind::Constraint => self.constraints.remove(key).is_some(),
            ObjectKind::Index => self.indexes.remove(key).is_some(),
            ObjectKind::Trigger => self.triggers.remove(key).is_some(),
            ObjectKind::Policy => self.policies.remove(key).is_some(),
            ObjectKind::Privilege => self.privileges.remove(key).is_some(),
            ObjectKind::Column => false,
        }
    }

    /// Returns true if the object is present.
    #[must_use]
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.dependencies_of(id).is_some()
    }

    /// Dependencies of an object, or `None` if it is not in the snapshot.
    #[must_use]
    pub fn dependencies_of(&self, id: &ObjectId) -> Option<BTreeSet<ObjectId>> {
        let key = id.name.as_str();
        match id.kind {
            ObjectKind::Schema => self.schemas.get(key).map(CatalogObject::dependencies),
            ObjectKind::Extension => self.extensions.get(key).map(CatalogObject::dependencies),
            ObjectKind::Enum => self.enums.get(key).map(CatalogObject::dependencies),
            ObjectKind::Sequence => self.sequences.get(key).map(CatalogObject::dependencies),
            ObjectKind::Function => self.functions.get(key).map(CatalogObject::dependencies),
            ObjectKind::Table => self.tables.get(key).map(CatalogObject::dependencies),
            ObjectKind::View => self.views.get(key).map(CatalogObject::dependencies),
            ObjectKind::Constraint => self.constraints.get(key).map(|c| {
                let mut deps = c.dependencies();
                deps.extend(self.referenced_keys(c));
                deps
            }),
            ObjectKind::Index => self.indexes.get(key).map(CatalogObject::dependencies),
            ObjectKind::Trigger => self.triggers.get(key).map(CatalogObject::dependencies),
            ObjectKind::Policy => self.policies.get(key).map(CatalogObject::dependencies),
            ObjectKind::Privilege => self.privileges.get(key).map(CatalogObject::dependencies),
            ObjectKind::Column => None,
        }
    }

    /// Primary key and unique constraints a foreign key relies on.
    fn referenced_keys<'a>(&'a self, fk: &'a Constraint) -> impl Iterator<Item = ObjectId> + 'a {
        self.constraints
            .values()
            .filter(move |c| {
                fk.references
                    .as_deref()
                    .is_some_and(|table| c.table_id().name == table)
                    && matches!(
                        c.constraint_type,
                        ConstraintType::PrimaryKey | ConstraintType::Unique
                    )
            })
            .map(CatalogObject::id)
    }

    /// Objects that directly depend on `id`.
    #[must_use]
    pub fn dependents_of(&self, id: &ObjectId) -> BTreeSet<ObjectId> {
        self.object_ids()
            .into_iter()
            .filter(|other| {
                self.dependencies_of(other)
                    .is_some_and(|deps| deps.contains(id))
            })
            .collect()
    }

    /// Identifiers of every object, in kind then name order.
    #[must_use]
    pub fn object_ids(&self) -> Vec<ObjectId> {
        fn ids<T: CatalogObject>(map: &BTreeMap<String, T>) -> impl Iterator<Item = ObjectId> + '_ {
            map.keys().map(|k| ObjectId::new(T::KIND, k.clone()))
        }

        ids(&self.schemas)
            .chain(ids(&self.extensions))
            .chain(ids(&self.enums))
            .chain(ids(&self.sequences))
            .chain(ids(&self.functions))
            .chain(ids(&self.tables))
            .chain(ids(&self.views))
            .chain(ids(&self.constraints))
            .chain(ids(&self.indexes))
            .chain(ids(&self.triggers))
            .chain(ids(&self.policies))
            .chain(ids(&self.privileges))
            .collect()
    }

    /// Total number of objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.object_ids().len()
    }

    /// Returns true if the snapshot holds no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Extension name to installed version.
    #[must_use]
    pub fn extension_versions(&self) -> BTreeMap<&str, Option<&str>> {
        self.extensions
            .values()
            .map(|e| (e.name.as_str(), e.version.as_deref()))
            .collect()
    }

    /// Returns a copy restricted by `filter`.
    #[must_use]
    pub fn filtered(&self, filter: &SchemaFilter) -> Self {
        fn retain<T: CatalogObject + Clone>(
            map: &BTreeMap<String, T>,
            filter: &SchemaFilter,
        ) -> BTreeMap<String, T> {
            map.iter()
                .filter(|(_, o)| o.schema().is_none_or(|s| filter.allows(s)))
                .map(|(k, o)| (k.clone(), o.clone()))
                .collect()
        }

        if filter.is_unrestricted() {
            return self.clone();
        }

        let mut filtered = Self {
            schemas: retain(&self.schemas, filter),
            extensions: retain(&self.extensions, filter),
            enums: retain(&self.enums, filter),
            sequences: retain(&self.sequences, filter),
            functions: retain(&self.functions, filter),
            tables: retain(&self.tables, filter),
            views: retain(&self.views, filter),
            constraints: retain(&self.constraints, filter),
            indexes: retain(&self.indexes, filter),
            triggers: retain(&self.triggers, filter),
            policies: retain(&self.policies, filter),
            privileges: BTreeMap::new(),
        };
        filtered.privileges = self
            .privileges
            .iter()
            .filter(|(_, p)| filtered.contains(&p.target))
            .map(|(k, p)| (k.clone(), p.clone()))
            .collect();
        filtered
    }
}

fn insert<T: CatalogObject>(map: &mut BTreeMap<String, T>, object: T) {
    map.insert(object.key(), object);
}
