use crate::candidate::EntityKind;

fn style(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Character => "personas",
        EntityKind::Setting => "shapes",
        EntityKind::Location => "glass",
    }
}

fn seed(display_name: &str, kind: EntityKind, slot: Option<usize>) -> String {
    let name = display_name.trim();
    let name = if name.is_empty() { kind.as_str() } else { name };
    match slot {
        Some(slot) => format!("{name}-{slot}"),
        None => name.to_owned(),
    }
}

/// Placeholder image URL for an entity without a real image.
///
/// Pure: identical arguments always give an identical URL.
pub fn generate_fallback_url(
    base_url: &str,
    display_name: &str,
    kind: EntityKind,
    slot: Option<usize>,
) -> String {
    format!(
        "{}/{}/svg?seed={}",
        base_url.trim_end_matches('/'),
        style(kind),
        urlencoding::encode(&seed(display_name, kind, slot))
    )
}
