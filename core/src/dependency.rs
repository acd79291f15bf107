//! Resolved schema dependencies for a single package.

use std::collections::HashMap;

use crate::FieldDefinition;
use crate::error::Result;
use crate::merge;

/// Owns the schemas a package declared as dependencies, keyed by schema
/// name.
///
/// The map is populated once and never mutated afterwards. A package
/// without a build manifest has no manager at all; callers pass `None` to
/// [`inject_fields`](crate::inject_fields) and
/// [`import_field`](crate::import_field) in that case.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use field_deps_core::{DependencyManager, FieldDefinition};
///
/// let mut schema = HashMap::new();
/// schema.insert(
///     "ecs".to_string(),
///     vec![FieldDefinition::new("event", "group")
///         .with_field(FieldDefinition::new("outcome", "keyword"))],
/// );
/// let dm = DependencyManager::new(schema);
///
/// let imported = dm.import_field("ecs", "event.outcome").unwrap();
/// assert_eq!(imported.field_type, "keyword");
/// ```
#[derive(Debug, Clone, Default)]
pub struct DependencyManager {
    schema: HashMap<String, Vec<FieldDefinition>>,
}

impl DependencyManager {
    /// Creates a manager over already loaded schemas.
    pub fn new(schema: HashMap<String, Vec<FieldDefinition>>) -> Self {
        Self { schema }
    }

    /// Returns the definitions of a registered schema.
    pub fn schema(&self, name: &str) -> Option<&[FieldDefinition]> {
        self.schema.get(name).map(Vec::as_slice)
    }

    /// Returns `true` if `name` was registered.
    pub fn contains(&self, name: &str) -> bool {
        self.schema.contains_key(name)
    }

    /// Returns an iterator over registered schema names.
    pub fn schema_names(&self) -> impl Iterator<Item = &str> {
        self.schema.keys().map(|s| s.as_str())
    }

    /// Resolves a single external field. See [`crate::import_field`].
    pub fn import_field(&self, schema_name: &str, field_path: &str) -> Result<FieldDefinition> {
        merge::import_field(Some(self), schema_name, field_path)
    }

    /// Replaces external references in `defs`. See [`crate::inject_fields`].
    pub fn inject_fields(
        &self,
        defs: Vec<crate::FieldNode>,
    ) -> Result<(Vec<crate::FieldNode>, bool)> {
        merge::inject_fields(Some(self), defs)
    }
}
