//! Removal of structurally empty groups.

use crate::FieldNode;

/// Returns `true` if `def` should be left out of the built fields.
///
/// Only groups are ever skipped, and only when they have no children:
/// an absent `fields` key and an empty list are treated the same.
pub fn skip_field(def: &FieldNode) -> bool {
    def.is_group() && def.fields.as_ref().is_none_or(|fields| fields.is_empty())
}
