//! External field injection.
//!
//! A package marks a field as `external: <schema>` instead of spelling out
//! its definition. [`inject_fields`] replaces each such marker with the
//! definition found in the named schema, layering the package's own
//! attributes on top, and recurses through nested groups.
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use field_deps_core::*;
//!
//! let mut schema = HashMap::new();
//! schema.insert(
//!     "ecs".to_string(),
//!     vec![FieldDefinition::new("event", "group")
//!         .with_field(FieldDefinition::new("outcome", "keyword"))],
//! );
//! let dm = DependencyManager::new(schema);
//!
//! let local = vec![FieldNode::new("event").with_type("group").with_fields(vec![
//!     FieldNode::new("outcome").with_external("ecs").with_type("constant_keyword"),
//! ])];
//!
//! let (merged, changed) = inject_fields(Some(&dm), local).unwrap();
//! assert!(changed);
//! let outcome = &merged[0].fields.as_ref().unwrap()[0];
//! assert_eq!(outcome.field_type.as_deref(), Some("constant_keyword"));
//! assert!(outcome.external.is_none());
//! ```

use crate::error::{FieldError, Result};
use crate::prune::skip_field;
use crate::{
    CONSTANT_KEYWORD_TYPE, DependencyManager, FieldDefinition, FieldNode, KEYWORD_TYPE,
    find_element_definition,
};

/// Replaces external field references with their target definitions.
///
/// Returns the merged tree and whether anything was imported. Nodes keep
/// their relative order; groups left without children are dropped. The
/// first failed import aborts the whole call.
///
/// Children of an external group are looked up in the same schema. A child
/// the schema doesn't define is kept as written unless it carries its own
/// `external` marker.
///
/// `dm` is `None` when the package has no build manifest, in which case
/// any external reference fails with
/// [`FieldError::ExternalFieldsNotAllowed`].
pub fn inject_fields(
    dm: Option<&DependencyManager>,
    defs: Vec<FieldNode>,
) -> Result<(Vec<FieldNode>, bool)> {
    inject_fields_with_root(dm, "", None, defs)
}

fn inject_fields_with_root(
    dm: Option<&DependencyManager>,
    root: &str,
    inherited: Option<&str>,
    defs: Vec<FieldNode>,
) -> Result<(Vec<FieldNode>, bool)> {
    let mut updated = Vec::with_capacity(defs.len());
    let mut changed = false;

    for mut def in defs {
        let field_path = build_field_path(root, &def.name);

        let declared = def.external.is_some();
        let schema_name = def.external.clone().or_else(|| inherited.map(String::from));
        let imported = match schema_name.as_deref() {
            Some(name) => match import_field(dm, name, &field_path) {
                Ok(imported) => Some(imported),
                // Package-only children of an external group stay as written.
                Err(FieldError::FieldNotFound(_)) if !declared => None,
                Err(err) => return Err(FieldError::ImportFailed(Box::new(err))),
            },
            None => None,
        };

        if let Some(imported) = imported {
            // Children of an imported group come from the same schema.
            let children = def.fields.take();
            let mut merged = merge_imported(&imported, def);
            if let Some(children) = children {
                let (children, _) =
                    inject_fields_with_root(dm, &field_path, schema_name.as_deref(), children)?;
                merged.fields = Some(children);
            }

            def = merged;
            changed = true;
        } else if let Some(fields) = def.fields.take() {
            let (fields, fields_changed) =
                inject_fields_with_root(dm, &field_path, schema_name.as_deref(), fields)?;
            if fields_changed {
                changed = true;
            }
            def.fields = Some(fields);
        }

        if skip_field(&def) {
            continue;
        }
        updated.push(def);
    }

    Ok((updated, changed))
}

/// Resolves a single external field against the package's dependencies.
///
/// # Errors
///
/// - [`FieldError::ExternalFieldsNotAllowed`] if `dm` is `None`.
/// - [`FieldError::SchemaNotDefined`] if `schema_name` was not registered.
/// - [`FieldError::FieldNotFound`] if `field_path` is not in the schema.
pub fn import_field(
    dm: Option<&DependencyManager>,
    schema_name: &str,
    field_path: &str,
) -> Result<FieldDefinition> {
    let Some(dm) = dm else {
        return Err(FieldError::ExternalFieldsNotAllowed(field_path.to_string()));
    };
    let Some(schema) = dm.schema(schema_name) else {
        return Err(FieldError::SchemaNotDefined(schema_name.to_string()));
    };

    find_element_definition(field_path, schema)
        .cloned()
        .ok_or_else(|| FieldError::FieldNotFound(field_path.to_string()))
}

/// Converts an imported definition into a local node carrying only the
/// attributes that are set.
pub fn transform_imported_field(fd: &FieldDefinition) -> FieldNode {
    let mut node = FieldNode::new(&fd.name);
    node.field_type = Some(fd.field_type.clone());

    // Multi-fields don't have descriptions.
    if !fd.description.is_empty() {
        node.description = Some(fd.description.clone());
    }
    if !fd.pattern.is_empty() {
        node.pattern = Some(fd.pattern.clone());
    }
    node.index = fd.index;
    node.doc_values = fd.doc_values;
    node.normalize = fd.normalize.clone();
    node.multi_fields = fd.multi_fields.iter().map(transform_imported_field).collect();
    node
}

fn merge_imported(imported: &FieldDefinition, local: FieldNode) -> FieldNode {
    let mut merged = transform_imported_field(imported);

    // Everything but the type can be overridden locally.
    merged.deep_update(local);
    merged.external = None;

    // keyword -> constant_keyword is allowed so the value can be set in
    // the mappings.
    let keep_local = merged.field_type.as_deref() == Some(CONSTANT_KEYWORD_TYPE)
        && imported.field_type == KEYWORD_TYPE;
    if !keep_local {
        merged.field_type = Some(imported.field_type.clone());
    }
    merged
}

fn build_field_path(root: &str, name: &str) -> String {
    if root.is_empty() {
        name.to_string()
    } else {
        format!("{root}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_yaml::Value;

    use super::*;

    fn ecs_manager() -> DependencyManager {
        let mut outcome = FieldDefinition::new("outcome", "keyword")
            .with_description("The outcome of the event.");
        outcome.pattern = "^(success|failure|unknown)$".into();

        let mut message = FieldDefinition::new("message", "match_only_text");
        message.index = Some(false);
        message.doc_values = Some(false);

        let mut tags = FieldDefinition::new("tags", "keyword");
        tags.normalize = vec!["array".into()];

        let mut schema = HashMap::new();
        schema.insert(
            "ecs".to_string(),
            vec![
                FieldDefinition::new("@timestamp", "date").with_description("Date/time."),
                message,
                tags,
                FieldDefinition::new("event", "group")
                    .with_field(outcome)
                    .with_field(FieldDefinition::new("dataset", "keyword")),
                FieldDefinition::new("host", "group").with_field(
                    FieldDefinition::new("name", "keyword")
                        .with_description("Host name.")
                        .with_multi_field(FieldDefinition::new("text", "match_only_text")),
                ),
            ],
        );
        DependencyManager::new(schema)
    }

    fn child<'a>(node: &'a FieldNode, name: &str) -> &'a FieldNode {
        node.fields
            .as_ref()
            .and_then(|fields| fields.iter().find(|f| f.name == name))
            .unwrap()
    }

    #[test]
    fn test_import_field_found() {
        let dm = ecs_manager();
        let imported = import_field(Some(&dm), "ecs", "event.outcome").unwrap();
        assert_eq!(imported.name, "outcome");
        assert_eq!(imported.field_type, "keyword");
    }

    #[test]
    fn test_import_field_every_schema_path_resolves() {
        let dm = ecs_manager();
        for path in [
            "@timestamp",
            "message",
            "tags",
            "event",
            "event.outcome",
            "event.dataset",
            "host.name",
            "host.name.text",
        ] {
            let imported = import_field(Some(&dm), "ecs", path).unwrap();
            assert_eq!(imported.name, path.rsplit('.').next().unwrap());
        }
    }

    #[test]
    fn test_import_field_not_found() {
        let dm = ecs_manager();
        let err = import_field(Some(&dm), "ecs", "event.missing").unwrap_err();
        assert!(matches!(err, FieldError::FieldNotFound(ref p) if p == "event.missing"));
        assert_eq!(
            err.to_string(),
            "field definition not found in schema (name: event.missing)"
        );
    }

    #[test]
    fn test_import_field_unknown_schema() {
        let dm = ecs_manager();
        let err = import_field(Some(&dm), "otel", "event.outcome").unwrap_err();
        assert!(matches!(err, FieldError::SchemaNotDefined(ref s) if s == "otel"));
        assert_eq!(err.to_string(), "schema \"otel\" is not defined as package dependency");
    }

    #[test]
    fn test_import_field_without_manager() {
        let err = import_field(None, "ecs", "event.outcome").unwrap_err();
        assert!(matches!(err, FieldError::ExternalFieldsNotAllowed(_)));
        assert_eq!(
            err.to_string(),
            "importing external field \"event.outcome\": external fields not allowed because dependencies file \"_dev/build/build.yml\" is missing"
        );
    }

    #[test]
    fn test_transform_omits_unset_attributes() {
        let node = transform_imported_field(&FieldDefinition::new("dataset", "keyword"));
        assert_eq!(node, FieldNode::new("dataset").with_type("keyword"));

        let yaml = serde_yaml::to_string(&node).unwrap();
        assert_eq!(yaml, "name: dataset\ntype: keyword\n");
    }

    #[test]
    fn test_transform_copies_set_attributes() {
        let dm = ecs_manager();

        let message = transform_imported_field(&dm.import_field("ecs", "message").unwrap());
        assert_eq!(message.index, Some(false));
        assert_eq!(message.doc_values, Some(false));
        assert_eq!(message.description, None);

        let tags = transform_imported_field(&dm.import_field("ecs", "tags").unwrap());
        assert_eq!(tags.normalize, vec!["array".to_string()]);

        let outcome = transform_imported_field(&dm.import_field("ecs", "event.outcome").unwrap());
        assert_eq!(outcome.pattern.as_deref(), Some("^(success|failure|unknown)$"));
        assert_eq!(outcome.description.as_deref(), Some("The outcome of the event."));
    }

    #[test]
    fn test_transform_multi_fields_recursively() {
        let dm = ecs_manager();
        let name = transform_imported_field(&dm.import_field("ecs", "host.name").unwrap());
        assert_eq!(
            name.multi_fields,
            vec![FieldNode::new("text").with_type("match_only_text")]
        );
        assert!(name.fields.is_none());
    }

    #[test]
    fn test_inject_replaces_external_marker() {
        let dm = ecs_manager();
        let local = vec![FieldNode::new("@timestamp").with_external("ecs")];

        let (merged, changed) = inject_fields(Some(&dm), local).unwrap();
        assert!(changed);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].external, None);
        assert_eq!(merged[0].field_type.as_deref(), Some("date"));
        assert_eq!(merged[0].description.as_deref(), Some("Date/time."));
    }

    #[test]
    fn test_inject_local_overrides_win_except_type() {
        let dm = ecs_manager();
        let mut local = FieldNode::new("@timestamp")
            .with_external("ecs")
            .with_type("keyword")
            .with_attr("example", "2024-01-01T00:00:00Z");
        local.description = Some("Local description.".into());

        let (merged, _) = inject_fields(Some(&dm), vec![local]).unwrap();
        assert_eq!(merged[0].field_type.as_deref(), Some("date"));
        assert_eq!(merged[0].description.as_deref(), Some("Local description."));
        assert_eq!(
            merged[0].attr("example"),
            Some(&Value::from("2024-01-01T00:00:00Z"))
        );
    }

    #[test]
    fn test_inject_constant_keyword_override() {
        let dm = ecs_manager();
        let local = vec![FieldNode::new("event").with_type("group").with_fields(vec![
            FieldNode::new("outcome")
                .with_external("ecs")
                .with_type("constant_keyword"),
        ])];

        let (merged, changed) = inject_fields(Some(&dm), local).unwrap();
        assert!(changed);
        let outcome = child(&merged[0], "outcome");
        assert_eq!(outcome.name, "outcome");
        assert_eq!(outcome.field_type.as_deref(), Some("constant_keyword"));
    }

    #[test]
    fn test_inject_type_override_law() {
        let dm = ecs_manager();
        // (path, imported type)
        let imported = [("@timestamp", "date"), ("message", "match_only_text"), ("tags", "keyword")];
        let local_types = ["keyword", "constant_keyword", "long", "text", "wildcard"];

        for (path, imported_type) in imported {
            for local_type in local_types {
                let local = vec![FieldNode::new(path).with_external("ecs").with_type(local_type)];
                let (merged, _) = inject_fields(Some(&dm), local).unwrap();

                let expected = if imported_type == "keyword" && local_type == "constant_keyword" {
                    "constant_keyword"
                } else {
                    imported_type
                };
                assert_eq!(
                    merged[0].field_type.as_deref(),
                    Some(expected),
                    "imported {imported_type}, local {local_type}"
                );
            }
        }
    }

    #[test]
    fn test_inject_external_group_resolves_children() {
        let dm = ecs_manager();
        let local = vec![
            FieldNode::new("event")
                .with_external("ecs")
                .with_type("group")
                .with_fields(vec![FieldNode::new("outcome")]),
        ];

        let (merged, changed) = inject_fields(Some(&dm), local).unwrap();
        assert!(changed);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].external, None);
        assert_eq!(merged[0].field_type.as_deref(), Some("group"));

        let outcome = child(&merged[0], "outcome");
        assert_eq!(outcome.field_type.as_deref(), Some("keyword"));
        assert_eq!(outcome.external, None);
    }

    #[test]
    fn test_inject_external_group_keeps_package_only_children() {
        let dm = ecs_manager();
        let local = vec![
            FieldNode::new("event")
                .with_external("ecs")
                .with_fields(vec![
                    FieldNode::new("outcome"),
                    FieldNode::new("custom").with_type("long"),
                    FieldNode::new("extra").with_type("group").with_fields(vec![
                        FieldNode::new("code").with_type("keyword"),
                    ]),
                ]),
        ];

        let (merged, changed) = inject_fields(Some(&dm), local).unwrap();
        assert!(changed);
        let event = &merged[0];
        assert_eq!(child(event, "outcome").field_type.as_deref(), Some("keyword"));
        assert_eq!(child(event, "custom"), &FieldNode::new("custom").with_type("long"));

        let extra = child(event, "extra");
        assert_eq!(child(extra, "code").field_type.as_deref(), Some("keyword"));
    }

    #[test]
    fn test_inject_declared_external_child_must_exist() {
        let dm = ecs_manager();
        let local = vec![
            FieldNode::new("event")
                .with_external("ecs")
                .with_fields(vec![FieldNode::new("custom").with_external("ecs")]),
        ];

        let err = inject_fields(Some(&dm), local).unwrap_err();
        assert_eq!(
            err.to_string(),
            "can't import field: field definition not found in schema (name: event.custom)"
        );
    }

    #[test]
    fn test_inject_external_group_without_children_is_pruned() {
        let dm = ecs_manager();
        let local = vec![
            FieldNode::new("event").with_external("ecs"),
            FieldNode::new("@timestamp").with_external("ecs"),
        ];

        let (merged, changed) = inject_fields(Some(&dm), local).unwrap();
        assert!(changed);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name, "@timestamp");
    }

    #[test]
    fn test_inject_preserves_order_and_local_fields() {
        let dm = ecs_manager();
        let local = vec![
            FieldNode::new("custom").with_type("keyword"),
            FieldNode::new("message").with_external("ecs"),
            FieldNode::new("empty").with_type("group").with_fields(Vec::new()),
            FieldNode::new("other").with_type("long"),
        ];

        let (merged, _) = inject_fields(Some(&dm), local).unwrap();
        let names: Vec<&str> = merged.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["custom", "message", "other"]);
        assert_eq!(merged[0], FieldNode::new("custom").with_type("keyword"));
    }

    #[test]
    fn test_inject_prunes_groups() {
        let local = vec![
            FieldNode::new("empty").with_type("group").with_fields(Vec::new()),
            FieldNode::new("absent").with_type("group"),
            FieldNode::new("kept")
                .with_type("group")
                .with_fields(vec![FieldNode::new("x").with_type("keyword")]),
        ];

        let (merged, changed) = inject_fields(None, local).unwrap();
        assert!(!changed);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name, "kept");
        assert_eq!(child(&merged[0], "x").field_type.as_deref(), Some("keyword"));
    }

    #[test]
    fn test_inject_prunes_groups_emptied_by_recursion() {
        let local = vec![FieldNode::new("outer").with_type("group").with_fields(vec![
            FieldNode::new("inner").with_type("group").with_fields(Vec::new()),
        ])];

        let (merged, _) = inject_fields(None, local).unwrap();
        assert!(merged.is_empty());
    }

    #[test]
    fn test_inject_is_idempotent() {
        let dm = ecs_manager();
        let local = vec![
            FieldNode::new("event").with_type("group").with_fields(vec![
                FieldNode::new("outcome").with_external("ecs"),
                FieldNode::new("dataset").with_external("ecs"),
            ]),
            FieldNode::new("host.name").with_external("ecs"),
        ];

        let (first, changed) = inject_fields(Some(&dm), local).unwrap();
        assert!(changed);

        let (second, changed) = inject_fields(Some(&dm), first.clone()).unwrap();
        assert!(!changed);
        assert_eq!(first, second);
    }

    #[test]
    fn test_inject_dotted_name_at_top_level() {
        let dm = ecs_manager();
        let local = vec![FieldNode::new("host.name").with_external("ecs")];

        let (merged, _) = inject_fields(Some(&dm), local).unwrap();
        assert_eq!(merged[0].name, "host.name");
        assert_eq!(merged[0].field_type.as_deref(), Some("keyword"));
        assert_eq!(merged[0].multi_fields.len(), 1);
    }

    #[test]
    fn test_inject_failure_aborts_whole_tree() {
        let dm = ecs_manager();
        let local = vec![
            FieldNode::new("@timestamp").with_external("ecs"),
            FieldNode::new("event").with_type("group").with_fields(vec![
                FieldNode::new("missing").with_external("ecs"),
            ]),
        ];

        let err = inject_fields(Some(&dm), local).unwrap_err();
        match err {
            FieldError::ImportFailed(inner) => {
                assert!(matches!(*inner, FieldError::FieldNotFound(ref p) if p == "event.missing"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_inject_without_manager_fails_on_external() {
        let local = vec![FieldNode::new("message").with_external("ecs")];
        let err = inject_fields(None, local).unwrap_err();
        assert!(err.to_string().contains("external fields not allowed"));
    }

    #[test]
    fn test_inject_without_manager_passes_plain_fields() {
        let local = vec![FieldNode::new("message").with_type("text")];
        let (merged, changed) = inject_fields(None, local.clone()).unwrap();
        assert!(!changed);
        assert_eq!(merged, local);
    }
}
