//! Dotted path lookup over schema field definitions.

use crate::FieldDefinition;

/// Finds the definition addressed by a dotted `path` (e.g. `event.outcome`).
///
/// The first segment is matched against the names in `schema`; each
/// further segment descends into the matched definition's group children
/// and then its multi-fields. A miss at any level returns `None`.
///
/// When siblings share a name the first one wins.
///
/// # Examples
///
/// ```
/// use field_deps_core::{FieldDefinition, find_element_definition};
///
/// let schema = vec![
///     FieldDefinition::new("event", "group")
///         .with_field(FieldDefinition::new("outcome", "keyword")),
/// ];
///
/// let found = find_element_definition("event.outcome", &schema).unwrap();
/// assert_eq!(found.field_type, "keyword");
/// assert!(find_element_definition("event.missing", &schema).is_none());
/// ```
pub fn find_element_definition<'a>(
    path: &str,
    schema: &'a [FieldDefinition],
) -> Option<&'a FieldDefinition> {
    find_in(path, schema.iter())
}

fn find_in<'a, I>(path: &str, mut candidates: I) -> Option<&'a FieldDefinition>
where
    I: Iterator<Item = &'a FieldDefinition>,
{
    let (head, rest) = match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    };

    let def = candidates.find(|def| def.name == head)?;
    match rest {
        None => Some(def),
        Some(rest) => find_in(rest, def.fields.iter().chain(def.multi_fields.iter())),
    }
}
