//! Field-name mapping between the JSON wire format (camelCase) and SQL columns (snake_case).

/// `owner_id` -> `ownerId`.
pub fn to_camel_case(column: &str) -> String {
    let mut parts = column.split('_').filter(|p| !p.is_empty());
    let mut out = parts.next().unwrap_or_default().to_string();
    for part in parts {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// `phoneNumber` -> `phone_number`.
pub fn to_snake_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len() + 4);
    for c in field.chars() {
        if c.is_uppercase() && !out.is_empty() {
            out.push('_');
        }
        out.extend(c.to_lowercase());
    }
    out
}
