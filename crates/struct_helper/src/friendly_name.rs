//! Friendly names for editor-generated struct fields.
//!
//! Fields created in the struct editor are stored as
//! `<Name>_<Index>_<32 hex digit GUID>`, e.g. `Score_3_8F2A...`. Scripts
//! address them as `Score` or `Score_3`.

const GUID_LEN: usize = 32;

/// The two script-facing forms of a generated field name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FriendlyName<'a> {
    /// Name without index or GUID. `None` when no index separator exists.
    pub name: Option<&'a str>,
    /// Name with its unique index, GUID stripped
    pub with_index: &'a str,
}

/// Split a generated field name. Returns `None` for names without a GUID suffix.
pub fn split_friendly_name(name: &str) -> Option<FriendlyName<'_>> {
    if name.len() <= GUID_LEN + 1 {
        return None;
    }
    let underscore = name.len() - GUID_LEN - 1;
    if name.as_bytes()[underscore] != b'_' {
        return None;
    }

    let with_index = &name[..underscore];
    let name = with_index.rfind('_').map(|idx| &with_index[..idx]);
    Some(FriendlyName { name, with_index })
}

/// Whether `query` addresses the field stored as `field_name`
pub fn matches_field(field_name: &str, query: &str) -> bool {
    if query.is_empty() {
        return false;
    }
    if field_name == query {
        return true;
    }
    match split_friendly_name(field_name) {
        Some(friendly) => friendly.name == Some(query) || friendly.with_index == query,
        None => false,
    }
}
