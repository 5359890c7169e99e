//! Identifier derivation for generated TypeScript.
//!
//! Everything that turns schema text (schema names, property names, enum
//! values, discriminator values) into a TypeScript identifier or literal
//! goes through here so the same input always yields the same name.
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap());

/// True when `s` can be written bare as a TypeScript identifier or property key.
pub fn is_identifier(s: &str) -> bool {
    IDENTIFIER.is_match(s)
}

/// Split text into words on non-alphanumeric runs and lower→upper transitions.
/// `"userProfile"`, `"user_profile"`, `"user-profile"` all give `["user", "profile"]`
/// modulo case.
fn words(s: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut prev_lower_or_digit = false;
    for c in s.chars() {
        if !c.is_alphanumeric() {
            if !cur.is_empty() {
                out.push(std::mem::take(&mut cur));
            }
            prev_lower_or_digit = false;
            continue;
        }
        if c.is_uppercase() && prev_lower_or_digit && !cur.is_empty() {
            out.push(std::mem::take(&mut cur));
        }
        prev_lower_or_digit = c.is_lowercase() || c.is_ascii_digit();
        cur.push(c);
    }
    if !cur.is_empty() {
        out.push(cur);
    }
    out
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `user_profile` → `UserProfile`. Already-pascal names pass through unchanged.
pub fn to_pascal_case(s: &str) -> String {
    let joined: String = words(s).iter().map(|w| capitalize(w)).collect();
    sanitize_identifier(&joined)
}

/// `inProgress` → `IN_PROGRESS`.
pub fn to_upper_snake(s: &str) -> String {
    words(s)
        .iter()
        .map(|w| w.to_uppercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// `in_progress` → `In Progress`.
pub fn to_display_name(s: &str) -> String {
    let ws = words(s);
    if ws.is_empty() {
        return s.to_string();
    }
    ws.iter()
        .map(|w| capitalize(&w.to_lowercase()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Make `s` a valid identifier: invalid characters become `_`, and a leading
/// character that is not a letter or underscore gets an `_` prefix.
pub fn sanitize_identifier(s: &str) -> String {
    let mut out: String = s
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '$' { c } else { '_' })
        .collect();
    match out.chars().next() {
        None => out.push('_'),
        Some(c) if !(c.is_ascii_alphabetic() || c == '_') => out.insert(0, '_'),
        _ => {}
    }
    out
}

/// Type name for the last segment of a `$ref` pointer (`#/components/schemas/User` → `User`).
pub fn type_name_from_ref(reference: &str) -> String {
    let segment = reference.rsplit('/').next().unwrap_or(reference);
    to_pascal_case(&unescape_pointer_segment(segment))
}

/// Type name for a pointer below a named schema, built from its whole path
/// so two pointers ending in the same segment stay distinct:
/// `#/components/schemas/User/properties/address` → `UserAddress`.
pub fn type_name_from_pointer(reference: &str) -> String {
    let fragment = reference.trim_start_matches('#');
    let mut parts: Vec<String> = Vec::new();
    let mut keyed = false;
    for segment in fragment.split('/').filter(|s| !s.is_empty()) {
        let segment = unescape_pointer_segment(segment);
        if keyed {
            parts.push(to_pascal_case(&segment));
            keyed = false;
            continue;
        }
        match segment.as_str() {
            "components" | "allOf" | "oneOf" | "anyOf" => {}
            "schemas" | "definitions" | "$defs" | "properties" | "patternProperties" => keyed = true,
            "items" => parts.push("Item".to_string()),
            "additionalProperties" => parts.push("Value".to_string()),
            other => match other.parse::<usize>() {
                Ok(index) => parts.push((index + 1).to_string()),
                Err(_) => parts.push(to_pascal_case(other)),
            },
        }
    }
    if parts.is_empty() {
        return type_name_from_ref(reference);
    }
    sanitize_identifier(&parts.concat())
}

/// JSON-pointer segment unescaping (`~1` → `/`, `~0` → `~`).
pub fn unescape_pointer_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Property key as written inside an interface or object literal type.
pub fn property_key(name: &str) -> String {
    if is_identifier(name) {
        name.to_string()
    } else {
        string_literal(name)
    }
}

/// Double-quoted, escaped string literal. JSON string syntax is valid TypeScript.
pub fn string_literal(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

/// TypeScript literal for a JSON value (used for enum members and discriminators).
pub fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => string_literal(s),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Stringified enum/discriminator value used for key derivation and sorting.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// `lowerCamel` helper used for handler keys.
pub fn to_camel_case(s: &str) -> String {
    let pascal = to_pascal_case(s);
    let mut chars = pascal.chars();
    match chars.next() {
        Some(first) if first != '_' => first.to_lowercase().chain(chars).collect(),
        _ => pascal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pascal_case_variants_agree() {
        assert_eq!(to_pascal_case("user_profile"), "UserProfile");
        assert_eq!(to_pascal_case("userProfile"), "UserProfile");
        assert_eq!(to_pascal_case("UserProfile"), "UserProfile");
        assert_eq!(to_pascal_case("user-profile.v2"), "UserProfileV2");
        assert_eq!(to_pascal_case("HTTPResponse"), "HTTPResponse");
    }

    #[test]
    fn pascal_case_of_leading_digit_is_prefixed() {
        assert_eq!(to_pascal_case("2fa"), "_2fa");
    }

    #[test]
    fn upper_snake_from_mixed_input() {
        assert_eq!(to_upper_snake("active"), "ACTIVE");
        assert_eq!(to_upper_snake("in-progress"), "IN_PROGRESS");
        assert_eq!(to_upper_snake("inProgress"), "IN_PROGRESS");
        assert_eq!(to_upper_snake("ALREADY_UPPER"), "ALREADY_UPPER");
    }

    #[test]
    fn sanitize_rules() {
        assert_eq!(sanitize_identifier("1"), "_1");
        assert_eq!(sanitize_identifier("a-b"), "a_b");
        assert_eq!(sanitize_identifier(""), "_");
        assert_eq!(sanitize_identifier("_ok"), "_ok");
    }

    #[test]
    fn ref_names_use_last_segment() {
        assert_eq!(type_name_from_ref("#/components/schemas/Pet"), "Pet");
        assert_eq!(type_name_from_ref("#/definitions/pet_owner"), "PetOwner");
        assert_eq!(type_name_from_ref("#/components/schemas/a~1b"), "AB");
    }

    #[test]
    fn pointer_names_use_the_whole_path() {
        assert_eq!(type_name_from_pointer("#/components/schemas/User/properties/address"), "UserAddress");
        assert_eq!(type_name_from_pointer("#/components/schemas/Company/properties/address"), "CompanyAddress");
        assert_eq!(type_name_from_pointer("#/definitions/Order/items"), "OrderItem");
        assert_eq!(type_name_from_pointer("#/$defs/Pet/allOf/0/properties/tag"), "Pet1Tag");
        assert_eq!(type_name_from_pointer("#/$defs/Map/additionalProperties"), "MapValue");
        assert_eq!(type_name_from_pointer("#/components/schemas/Shop/properties/items"), "ShopItems");
    }

    #[test]
    fn keys_and_literals() {
        assert_eq!(property_key("id"), "id");
        assert_eq!(property_key("content-type"), "\"content-type\"");
        assert_eq!(literal(&json!("a\"b")), "\"a\\\"b\"");
        assert_eq!(literal(&json!(3)), "3");
        assert_eq!(literal(&json!(null)), "null");
        assert_eq!(to_display_name("in_progress"), "In Progress");
        assert_eq!(to_camel_case("credit_card"), "creditCard");
    }
}
