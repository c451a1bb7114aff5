//! Entity type → table mapping.
//!
//! Built once at startup. Table resolution for a staged entity walks a fixed
//! chain and always yields a non-empty table name:
//!
//! ```text
//! mapping(entity_type) → mapping(base_type) → table annotation → bare type name
//! ```

use std::collections::HashMap;
use std::fmt;

use scribe_core::entities::{EntityRef, TRANSACTION_LOG_TABLE, TRANSACTION_LOG_TYPE};

use crate::error::SchemaError;

/// Entity type of the demo employee records.
pub const EMPLOYEE_TYPE: &str = "Employee";

/// Table holding employee records.
pub const EMPLOYEES_TABLE: &str = "employees";

/// Table used when an entity carries no usable type name at all.
const FALLBACK_TABLE: &str = "entity";

/// Storage layout of one entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMapping {
    pub entity_type: String,
    pub table: String,
    pub schema: Option<String>,
    /// Columns in declaration order.
    pub columns: Vec<String>,
    pub primary_key: Vec<String>,
    /// Whether the store assigns the primary key at commit time.
    pub generated_key: bool,
}

impl EntityMapping {
    #[must_use]
    pub fn new(entity_type: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            table: table.into(),
            schema: None,
            columns: Vec::new(),
            primary_key: Vec::new(),
            generated_key: false,
        }
    }

    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    #[must_use]
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub const fn generated_key(mut self) -> Self {
        self.generated_key = true;
        self
    }

    #[must_use]
    pub fn is_primary_key(&self, column: &str) -> bool {
        self.primary_key.iter().any(|c| c == column)
    }

    fn check(&self) -> Result<(), SchemaError> {
        let invalid = |reason: String| SchemaError::InvalidMapping {
            entity_type: self.entity_type.clone(),
            reason,
        };
        if self.entity_type.trim().is_empty() {
            return Err(invalid("entity type is empty".into()));
        }
        if self.table.trim().is_empty() {
            return Err(invalid("table name is empty".into()));
        }
        if let Some(missing) = self
            .primary_key
            .iter()
            .find(|k| !self.columns.is_empty() && !self.columns.contains(*k))
        {
            return Err(invalid(format!("primary key column '{missing}' is not a column")));
        }
        if self.generated_key && self.primary_key.len() != 1 {
            return Err(invalid("a generated key must be a single column".into()));
        }
        Ok(())
    }
}

/// Which link of the resolution chain produced a table name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    Mapping,
    BaseType,
    Annotation,
    TypeName,
}

impl ResolutionSource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mapping => "mapping",
            Self::BaseType => "base_type",
            Self::Annotation => "annotation",
            Self::TypeName => "type_name",
        }
    }
}

impl fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Table and schema an entity is written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTable {
    pub table: String,
    pub schema: Option<String>,
    pub source: ResolutionSource,
}

/// Registry of entity mappings, keyed by entity type.
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    mappings: HashMap<String, EntityMapping>,
}

impl EntityRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `Employee` and `TransactionLog` mappings.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut mappings = HashMap::new();
        for mapping in [employee_mapping(), transaction_log_mapping()] {
            mappings.insert(mapping.entity_type.clone(), mapping);
        }
        Self { mappings }
    }

    /// Add a mapping.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::InvalidMapping` if the mapping is inconsistent or
    /// its entity type is already registered.
    pub fn register(&mut self, mapping: EntityMapping) -> Result<(), SchemaError> {
        mapping.check()?;
        if self.mappings.contains_key(&mapping.entity_type) {
            return Err(SchemaError::InvalidMapping {
                entity_type: mapping.entity_type,
                reason: "entity type already registered".into(),
            });
        }
        self.mappings.insert(mapping.entity_type.clone(), mapping);
        Ok(())
    }

    #[must_use]
    pub fn mapping(&self, entity_type: &str) -> Option<&EntityMapping> {
        self.mappings.get(entity_type)
    }

    /// Mapping for an entity, following its base type when the concrete
    /// type is unmapped.
    #[must_use]
    pub fn mapping_for(&self, entity: &EntityRef) -> Option<&EntityMapping> {
        self.mapping(&entity.entity_type).or_else(|| {
            entity
                .base_type
                .as_deref()
                .and_then(|base| self.mapping(base))
        })
    }

    /// Mapping that owns a table.
    #[must_use]
    pub fn mapping_for_table(&self, table: &str) -> Option<&EntityMapping> {
        self.mappings.values().find(|m| m.table == table)
    }

    /// Resolve the table and schema of an entity. Never fails.
    #[must_use]
    pub fn resolve(&self, entity: &EntityRef) -> ResolvedTable {
        if let Some(mapping) = self.mapping(&entity.entity_type) {
            return ResolvedTable {
                table: mapping.table.clone(),
                schema: mapping.schema.clone(),
                source: ResolutionSource::Mapping,
            };
        }
        if let Some(mapping) = entity.base_type.as_deref().and_then(|b| self.mapping(b)) {
            return ResolvedTable {
                table: mapping.table.clone(),
                schema: mapping.schema.clone(),
                source: ResolutionSource::BaseType,
            };
        }
        if let Some(table) = entity
            .table_annotation
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
        {
            return ResolvedTable {
                table: table.to_string(),
                schema: None,
                source: ResolutionSource::Annotation,
            };
        }
        ResolvedTable {
            table: bare_type_name(&entity.entity_type),
            schema: None,
            source: ResolutionSource::TypeName,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

/// Last path segment of a type name, with generic arguments dropped.
fn bare_type_name(entity_type: &str) -> String {
    let without_generics = entity_type.split('<').next().unwrap_or_default();
    let name = without_generics
        .rsplit("::")
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() {
        FALLBACK_TABLE.to_string()
    } else {
        name.to_string()
    }
}

fn employee_mapping() -> EntityMapping {
    EntityMapping::new(EMPLOYEE_TYPE, EMPLOYEES_TABLE)
        .with_columns(["id", "first_name", "last_name", "phone_number"])
        .with_primary_key(["id"])
        .generated_key()
}

fn transaction_log_mapping() -> EntityMapping {
    EntityMapping::new(TRANSACTION_LOG_TYPE, TRANSACTION_LOG_TABLE)
        .with_columns([
            "id",
            "action",
            "action_datetime",
            "table_name",
            "table_pk",
            "old_values",
            "new_values",
            "user_name",
        ])
        .with_primary_key(["id"])
        .generated_key()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use scribe_core::entities::EntityHandle;

    fn entity(entity_type: &str) -> EntityRef {
        EntityRef::new(EntityHandle(1), entity_type)
    }

    #[test]
    fn defaults_cover_employee_and_audit_rows() {
        let reg = EntityRegistry::with_defaults();
        assert_eq!(reg.len(), 2);
        let employee = reg.mapping(EMPLOYEE_TYPE).unwrap();
        assert_eq!(employee.table, "employees");
        assert!(employee.generated_key);
        assert!(employee.is_primary_key("id"));
        assert_eq!(
            reg.mapping_for_table(TRANSACTION_LOG_TABLE).unwrap().entity_type,
            TRANSACTION_LOG_TYPE
        );
    }

    #[test]
    fn mapped_type_resolves_directly() {
        let reg = EntityRegistry::with_defaults();
        let resolved = reg.resolve(&entity("Employee"));
        assert_eq!(resolved.table, "employees");
        assert_eq!(resolved.source, ResolutionSource::Mapping);
    }

    #[test]
    fn proxy_type_falls_back_to_base_type() {
        let reg = EntityRegistry::with_defaults();
        let proxy = entity("EmployeeProxy_5f2").with_base_type("Employee");
        let resolved = reg.resolve(&proxy);
        assert_eq!(resolved.table, "employees");
        assert_eq!(resolved.source, ResolutionSource::BaseType);
    }

    #[test]
    fn annotation_used_when_unmapped() {
        let reg = EntityRegistry::with_defaults();
        let resolved = reg.resolve(&entity("Invoice").with_table_annotation("invoices"));
        assert_eq!(resolved.table, "invoices");
        assert_eq!(resolved.source, ResolutionSource::Annotation);
    }

    #[rstest]
    #[case("Invoice", "Invoice")]
    #[case("billing::Invoice", "Invoice")]
    #[case("Wrapper<Invoice>", "Wrapper")]
    #[case("", "entity")]
    fn bare_type_name_is_last_resort(#[case] entity_type: &str, #[case] table: &str) {
        let reg = EntityRegistry::new();
        let resolved = reg.resolve(&entity(entity_type).with_table_annotation("  "));
        assert_eq!(resolved.table, table);
        assert_eq!(resolved.source, ResolutionSource::TypeName);
    }

    #[test]
    fn schema_carried_through() {
        let mut reg = EntityRegistry::new();
        reg.register(
            EntityMapping::new("Order", "orders")
                .with_schema("sales")
                .with_columns(["order_id", "line", "sku"])
                .with_primary_key(["order_id", "line"]),
        )
        .unwrap();
        let resolved = reg.resolve(&entity("Order"));
        assert_eq!(resolved.schema.as_deref(), Some("sales"));
    }

    #[test]
    fn register_rejects_bad_mappings() {
        let mut reg = EntityRegistry::with_defaults();
        assert!(reg.register(EntityMapping::new("Employee", "people")).is_err());
        assert!(reg.register(EntityMapping::new("Blank", " ")).is_err());
        assert!(
            reg.register(
                EntityMapping::new("Order", "orders")
                    .with_columns(["sku"])
                    .with_primary_key(["order_id"])
            )
            .is_err()
        );
        assert!(
            reg.register(
                EntityMapping::new("Line", "lines")
                    .with_primary_key(["a", "b"])
                    .generated_key()
            )
            .is_err()
        );
    }
}
