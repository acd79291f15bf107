//! Field type definitions for schema and package field trees.
//!
//! Two shapes are modeled here:
//!
//! - [`FieldDefinition`] is a field as published by an external schema
//!   (e.g. ECS). It is read-only input to the merge engine.
//! - [`FieldNode`] is a field as written in a package's own `fields/*.yml`
//!   files. It may carry an `external` marker and arbitrary additional
//!   attributes, and is what injection consumes and produces.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

/// Type marker for grouping nodes.
pub const GROUP_TYPE: &str = "group";

/// Plain keyword type.
pub const KEYWORD_TYPE: &str = "keyword";

/// The only local type allowed to override an imported `keyword`.
pub const CONSTANT_KEYWORD_TYPE: &str = "constant_keyword";

/// A single field definition from an external schema document.
///
/// `index` and `doc_values` are tri-state: absent, `true` or `false`. An
/// absent value is never emitted during injection, while an explicit
/// `false` is.
///
/// # Examples
///
/// ```
/// use field_deps_core::FieldDefinition;
///
/// let def: FieldDefinition = serde_yaml::from_str(
///     "name: outcome\ntype: keyword\nindex: false\n",
/// ).unwrap();
/// assert_eq!(def.field_type, "keyword");
/// assert_eq!(def.index, Some(false));
/// assert_eq!(def.doc_values, None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Field name, unique among siblings.
    pub name: String,
    /// Mapping type (e.g. `keyword`, `group`).
    #[serde(rename = "type", default)]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_values: Option<bool>,
    /// Normalization steps (e.g. `array`). Empty means unset.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub normalize: Vec<String>,
    /// Alternate representations of the same field.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub multi_fields: Vec<FieldDefinition>,
    /// Nested children of a group definition.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldDefinition>,
}

impl FieldDefinition {
    /// Creates a definition with a name and type and nothing else.
    pub fn new(name: &str, field_type: &str) -> Self {
        Self {
            name: name.to_string(),
            field_type: field_type.to_string(),
            ..Self::default()
        }
    }

    /// Adds a description.
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Adds a nested group child.
    pub fn with_field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    /// Adds a multi-field.
    pub fn with_multi_field(mut self, field: FieldDefinition) -> Self {
        self.multi_fields.push(field);
        self
    }
}

/// A node of a package's local field tree.
///
/// Well-known attributes are named fields; everything else a package
/// author writes (`example`, `ignore_above`, `metric_type`, ...) is kept in
/// [`extra`](FieldNode::extra) in source order so it survives injection.
///
/// # Examples
///
/// ```
/// use field_deps_core::FieldNode;
///
/// let nodes: Vec<FieldNode> = serde_yaml::from_str(
///     "- name: event\n  type: group\n  fields:\n    - name: outcome\n      external: ecs\n",
/// ).unwrap();
/// let children = nodes[0].fields.as_ref().unwrap();
/// assert_eq!(children[0].external.as_deref(), Some("ecs"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldNode {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_values: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub normalize: Vec<String>,
    /// Name of the schema this node should be imported from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub multi_fields: Vec<FieldNode>,
    /// Nested children. `None` and an empty list are both "no children".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldNode>>,
    /// Any other attributes, preserved as written.
    #[serde(flatten)]
    pub extra: Mapping,
}

impl FieldNode {
    /// Creates a node with only a name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Sets the type.
    pub fn with_type(mut self, field_type: &str) -> Self {
        self.field_type = Some(field_type.to_string());
        self
    }

    /// Marks the node as imported from `schema`.
    pub fn with_external(mut self, schema: &str) -> Self {
        self.external = Some(schema.to_string());
        self
    }

    /// Replaces the children.
    pub fn with_fields(mut self, fields: Vec<FieldNode>) -> Self {
        self.fields = Some(fields);
        self
    }

    /// Sets an additional attribute.
    pub fn with_attr(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(Value::String(key.to_string()), value.into());
        self
    }

    /// Returns `true` if the node's type is the group marker.
    pub fn is_group(&self) -> bool {
        self.field_type.as_deref() == Some(GROUP_TYPE)
    }

    /// Returns an additional attribute by key.
    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Overlays `other` on top of `self`.
    ///
    /// Every attribute set in `other` wins. Lists are replaced, not
    /// concatenated. Nested mappings in [`extra`](FieldNode::extra) are
    /// merged key by key.
    pub fn deep_update(&mut self, other: FieldNode) {
        let FieldNode {
            name,
            field_type,
            description,
            pattern,
            index,
            doc_values,
            normalize,
            external,
            multi_fields,
            fields,
            extra,
        } = other;

        if !name.is_empty() {
            self.name = name;
        }
        if field_type.is_some() {
            self.field_type = field_type;
        }
        if description.is_some() {
            self.description = description;
        }
        if pattern.is_some() {
            self.pattern = pattern;
        }
        if index.is_some() {
            self.index = index;
        }
        if doc_values.is_some() {
            self.doc_values = doc_values;
        }
        if !normalize.is_empty() {
            self.normalize = normalize;
        }
        if external.is_some() {
            self.external = external;
        }
        if !multi_fields.is_empty() {
            self.multi_fields = multi_fields;
        }
        if fields.is_some() {
            self.fields = fields;
        }
        for (key, value) in extra {
            merge_value(&mut self.extra, key, value);
        }
    }
}

fn merge_value(target: &mut Mapping, key: Value, value: Value) {
    if let Value::Mapping(incoming) = value {
        if let Some(Value::Mapping(existing)) = target.get_mut(&key) {
            for (k, v) in incoming {
                merge_value(existing, k, v);
            }
            return;
        }
        target.insert(key, Value::Mapping(incoming));
    } else {
        target.insert(key, value);
    }
}
