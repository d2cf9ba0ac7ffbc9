/// Converts logical names to PostgreSQL naming conventions
///
/// Entity names: PascalCase → snake_case plural
///   Asset        → assets
///   Company      → companies
///   AssetType    → asset_types
///
/// Field names: camelCase → snake_case
///   createdAt    → created_at
///   serialNumber → serial_number

/// Convert a PascalCase entity name to a snake_case plural table name
pub fn entity_to_table(entity_name: &str) -> String {
    let snake = to_snake_case(entity_name);
    pluralize(&snake)
}

/// Convert PascalCase or camelCase to snake_case
/// "OrderItem" → "order_item"
/// "companyId" → "company_id"
/// "ID"        → "id" (runs of capitals stay together)
pub(crate) fn to_snake_case(name: &str) -> String {
    let mut result = String::with_capacity(name.len() + 4);
    let mut prev: Option<char> = None;

    for ch in name.chars() {
        if ch.is_uppercase() {
            // Only break after a lowercase letter or digit, so acronyms stay whole
            if matches!(prev, Some(p) if p.is_lowercase() || p.is_ascii_digit()) {
                result.push('_');
            }
            result.extend(ch.to_lowercase());
        } else {
            result.push(ch);
        }
        prev = Some(ch);
    }

    result
}

/// Simple pluralization (English rules, covers the entity names we have)
/// "asset"   → "assets"
/// "company" → "companies"
/// "address" → "addresses"
fn pluralize(name: &str) -> String {
    if let Some(stem) = name.strip_suffix('y') {
        if !stem.ends_with(['a', 'e', 'i', 'o', 'u']) {
            return format!("{}ies", stem);
        }
    }
    if name.ends_with('s') || name.ends_with('x') || name.ends_with("sh") || name.ends_with("ch") {
        return format!("{}es", name);
    }
    format!("{}s", name)
}

/// Quote an identifier only when it is not a plain lowercase name
pub(crate) fn quote_ident(ident: &str) -> String {
    let plain = ident
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if plain && !ident.is_empty() {
        ident.to_string()
    } else {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }
}
