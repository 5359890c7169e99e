//! Schema ingestion.
//!
//! The input document is decoded with serde into [`RawSchema`] (a loose
//! mirror of the JSON-Schema/OpenAPI keyword set) and then classified once
//! into a closed [`SchemaKind`]. Every later stage matches on that kind
//! instead of probing for keys.
use std::borrow::Cow;
use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::ir::Constraints;
use crate::naming;

// ————————————————————————————————————————————————————————————————————————————
// RAW (serde) MODEL
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawSchema {
    #[serde(rename = "$ref")]
    pub reference: Option<String>,
    #[serde(rename = "type")]
    pub type_: Option<RawType>,
    pub format: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub example: Option<Value>,
    pub default: Option<Value>,
    pub nullable: bool,
    pub read_only: bool,
    pub deprecated: bool,

    pub properties: Option<IndexMap<String, RawSchema>>,
    pub required: Vec<String>,
    pub additional_properties: Option<RawAdditional>,
    pub items: Option<Box<RawSchema>>,

    #[serde(rename = "enum")]
    pub enum_: Option<Vec<Value>>,
    #[serde(rename = "const")]
    pub const_: Option<Value>,
    pub one_of: Option<Vec<RawSchema>>,
    pub any_of: Option<Vec<RawSchema>>,
    pub all_of: Option<Vec<RawSchema>>,
    pub discriminator: Option<RawDiscriminator>,

    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub pattern: Option<String>,

    #[serde(rename = "x-enum-varnames")]
    pub x_enum_varnames: Option<Vec<String>>,
    #[serde(rename = "x-enum-descriptions")]
    pub x_enum_descriptions: Option<RawEnumDescriptions>,
    #[serde(rename = "x-enum-deprecated")]
    pub x_enum_deprecated: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawType {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawAdditional {
    Flag(bool),
    Schema(Box<RawSchema>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawEnumDescriptions {
    List(Vec<Option<String>>),
    Map(IndexMap<String, String>),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawDiscriminator {
    pub property_name: String,
    pub mapping: IndexMap<String, String>,
}

// ————————————————————————————————————————————————————————————————————————————
// CLASSIFIED MODEL
// ————————————————————————————————————————————————————————————————————————————

/// One node of the input type graph, classified once at ingestion.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaNode {
    pub kind: SchemaKind,
    pub meta: SchemaMeta,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SchemaKind {
    /// No recognizable shape: lowers to the top type.
    #[default]
    Any,
    Ref(String),
    OneOf(Vec<SchemaNode>),
    AnyOf(Vec<SchemaNode>),
    AllOf(Vec<SchemaNode>),
    Array(Box<SchemaNode>),
    Object(ObjectShape),
    Enum(EnumShape),
    Primitive(Primitive),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Primitive {
    String,
    Number,
    Integer,
    Boolean,
    Null,
    /// A `type` we do not know; lowers to the top type.
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectShape {
    pub properties: IndexMap<String, SchemaNode>,
    pub required: Vec<String>,
    pub additional: Additional,
}

impl ObjectShape {
    pub fn is_required(&self, property: &str) -> bool {
        self.required.iter().any(|r| r == property)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Additional {
    #[default]
    Unspecified,
    Open,
    Closed,
    Schema(Box<SchemaNode>),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnumShape {
    pub values: Vec<Value>,
    pub varnames: Vec<String>,
    pub descriptions: Vec<Option<String>>,
    pub deprecated: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Discriminator {
    pub property_name: String,
    pub mapping: IndexMap<String, String>,
}

/// Keyword data that rides along with every kind.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaMeta {
    pub nullable: bool,
    pub read_only: bool,
    pub deprecated: bool,
    pub title: Option<String>,
    pub description: Option<String>,
    pub example: Option<Value>,
    pub default: Option<Value>,
    pub format: Option<String>,
    pub discriminator: Option<Discriminator>,
    pub constraints: Constraints,
}

impl SchemaNode {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn from_raw(raw: &RawSchema) -> Self {
        let mut meta = SchemaMeta {
            nullable: raw.nullable,
            read_only: raw.read_only,
            deprecated: raw.deprecated,
            title: raw.title.clone(),
            description: raw.description.clone(),
            example: raw.example.clone(),
            default: raw.default.clone(),
            format: raw.format.clone(),
            discriminator: raw.discriminator.as_ref().map(|d| Discriminator {
                property_name: d.property_name.clone(),
                mapping: d.mapping.clone(),
            }),
            constraints: Constraints {
                min_length: raw.min_length,
                max_length: raw.max_length,
                minimum: raw.minimum,
                maximum: raw.maximum,
                pattern: raw.pattern.clone(),
                format: raw.format.clone(),
                enum_: raw.enum_.clone(),
            },
        };

        // `type` may be a list (3.1); "null" in it means nullable.
        let mut types: Vec<String> = match &raw.type_ {
            None => Vec::new(),
            Some(RawType::One(t)) => vec![t.clone()],
            Some(RawType::Many(ts)) => ts.clone(),
        };
        if types.len() > 1 && types.iter().any(|t| t == "null") {
            meta.nullable = true;
            types.retain(|t| t != "null");
        }

        let kind = classify(raw, &types);
        SchemaNode { kind, meta }
    }

    pub fn from_value(value: &Value) -> Result<Self, DocumentError> {
        match value {
            Value::Bool(_) => Ok(Self::any()),
            _ => {
                let raw: RawSchema = crate::path_de::from_value_with_path(value.clone())
                    .map_err(DocumentError::Malformed)?;
                Ok(Self::from_raw(&raw))
            }
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self.kind, SchemaKind::Object(_))
    }

    pub fn is_composite(&self) -> bool {
        matches!(
            self.kind,
            SchemaKind::AllOf(_) | SchemaKind::OneOf(_) | SchemaKind::AnyOf(_)
        )
    }

    pub fn as_object(&self) -> Option<&ObjectShape> {
        match &self.kind {
            SchemaKind::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Single literal value carried by this node: `const`, or an `enum` of length 1.
    pub fn single_value(&self) -> Option<&Value> {
        match &self.kind {
            SchemaKind::Enum(e) if e.values.len() == 1 => e.values.first(),
            _ => None,
        }
    }

    /// `1 + propertyCount + 2·(hasNestedComposition)`.
    pub fn complexity(&self) -> usize {
        let (props, nested) = match &self.kind {
            SchemaKind::Object(obj) => (
                obj.properties.len(),
                obj.properties.values().any(SchemaNode::is_composite),
            ),
            SchemaKind::AllOf(ms) | SchemaKind::OneOf(ms) | SchemaKind::AnyOf(ms) => {
                (0, ms.iter().any(SchemaNode::is_composite))
            }
            SchemaKind::Array(item) => (0, item.is_composite()),
            _ => (0, false),
        };
        1 + props + if nested { 2 } else { 0 }
    }
}

fn classify(raw: &RawSchema, types: &[String]) -> SchemaKind {
    let nodes = |xs: &Vec<RawSchema>| xs.iter().map(SchemaNode::from_raw).collect::<Vec<_>>();

    if let Some(r) = &raw.reference {
        return SchemaKind::Ref(r.clone());
    }
    if let Some(xs) = &raw.one_of {
        return SchemaKind::OneOf(nodes(xs));
    }
    if let Some(xs) = &raw.any_of {
        return SchemaKind::AnyOf(nodes(xs));
    }
    if let Some(xs) = &raw.all_of {
        return SchemaKind::AllOf(nodes(xs));
    }

    let is_type = |t: &str| types.len() == 1 && types[0] == t;

    if is_type("array") || raw.items.is_some() {
        let item = raw
            .items
            .as_deref()
            .map(SchemaNode::from_raw)
            .unwrap_or_default();
        return SchemaKind::Array(Box::new(item));
    }
    if is_type("object") || raw.properties.is_some() || raw.additional_properties.is_some() {
        let properties = raw
            .properties
            .iter()
            .flatten()
            .map(|(k, v)| (k.clone(), SchemaNode::from_raw(v)))
            .collect();
        let additional = match &raw.additional_properties {
            None => Additional::Unspecified,
            Some(RawAdditional::Flag(true)) => Additional::Open,
            Some(RawAdditional::Flag(false)) => Additional::Closed,
            Some(RawAdditional::Schema(s)) => Additional::Schema(Box::new(SchemaNode::from_raw(s))),
        };
        return SchemaKind::Object(ObjectShape {
            properties,
            required: raw.required.clone(),
            additional,
        });
    }
    if let Some(values) = raw.enum_.clone().or_else(|| raw.const_.clone().map(|c| vec![c])) {
        return SchemaKind::Enum(enum_shape(raw, values));
    }

    match types {
        [] => SchemaKind::Any,
        [t] => SchemaKind::Primitive(primitive(t)),
        many => SchemaKind::AnyOf(
            many.iter()
                .map(|t| SchemaNode {
                    kind: SchemaKind::Primitive(primitive(t)),
                    meta: SchemaMeta { format: raw.format.clone(), ..SchemaMeta::default() },
                })
                .collect(),
        ),
    }
}

fn primitive(t: &str) -> Primitive {
    match t {
        "string" => Primitive::String,
        "number" => Primitive::Number,
        "integer" => Primitive::Integer,
        "boolean" => Primitive::Boolean,
        "null" => Primitive::Null,
        other => Primitive::Unknown(other.to_string()),
    }
}

fn enum_shape(raw: &RawSchema, values: Vec<Value>) -> EnumShape {
    let descriptions = match &raw.x_enum_descriptions {
        None => vec![None; values.len()],
        Some(RawEnumDescriptions::List(xs)) => (0..values.len()).map(|i| xs.get(i).cloned().flatten()).collect(),
        Some(RawEnumDescriptions::Map(m)) => values
            .iter()
            .map(|v| m.get(&crate::naming::stringify(v)).cloned())
            .collect(),
    };
    EnumShape {
        varnames: raw.x_enum_varnames.clone().unwrap_or_default(),
        descriptions,
        deprecated: raw.x_enum_deprecated.clone().unwrap_or_default(),
        values,
    }
}

// ————————————————————————————————————————————————————————————————————————————
// DOCUMENT
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("malformed schema document: {0}")]
    Malformed(String),
    #[error("document has no `components/schemas`, `definitions` or `$defs` section")]
    NoSchemas,
}

/// A named schema plus the pointer other schemas use to reach it.
#[derive(Debug, Clone)]
pub struct NamedSchema {
    pub name: String,
    pub pointer: String,
    pub node: SchemaNode,
}

/// The whole input: named schemas in document order plus the raw JSON for
/// pointer walks that land outside the named sections.
#[derive(Debug, Clone)]
pub struct SchemaDocument {
    raw: Value,
    named: IndexMap<String, NamedSchema>,
    /// Alias name reserved for every local `$ref` that lands below a named
    /// schema, fixed up front so every worker uses the same name.
    pointer_aliases: IndexMap<String, String>,
}

const SECTIONS: &[&[&str]] = &[&["components", "schemas"], &["definitions"], &["$defs"]];

impl SchemaDocument {
    pub fn from_value(raw: Value) -> Result<Self, DocumentError> {
        let mut named = IndexMap::new();
        let mut saw_section = false;
        for path in SECTIONS {
            let pointer = format!("/{}", path.join("/"));
            let Some(section) = raw.pointer(&pointer).and_then(Value::as_object) else {
                continue;
            };
            saw_section = true;
            for (name, value) in section {
                let node = SchemaNode::from_value(value).map_err(|e| match e {
                    DocumentError::Malformed(msg) => {
                        DocumentError::Malformed(format!("{pointer}/{name}: {msg}"))
                    }
                    other => other,
                })?;
                let full = format!("#{pointer}/{}", escape_pointer_segment(name));
                named.insert(full.clone(), NamedSchema { name: name.clone(), pointer: full, node });
            }
        }
        if !saw_section {
            return Err(DocumentError::NoSchemas);
        }
        let pointer_aliases = reserve_pointer_aliases(&raw, &named);
        Ok(Self { raw, named, pointer_aliases })
    }

    pub fn from_str(src: &str) -> Result<Self, DocumentError> {
        let raw: Value = crate::path_de::from_str_with_path(src).map_err(DocumentError::Malformed)?;
        Self::from_value(raw)
    }

    pub fn named(&self) -> impl ExactSizeIterator<Item = &NamedSchema> {
        self.named.values()
    }

    pub fn get_named(&self, name: &str) -> Option<&NamedSchema> {
        self.named.values().find(|n| n.name == name)
    }

    pub fn is_named_pointer(&self, reference: &str) -> bool {
        self.named.contains_key(reference)
    }

    /// Alias reserved for a `$ref` that points below a named schema.
    pub fn pointer_alias(&self, reference: &str) -> Option<&str> {
        self.pointer_aliases.get(reference).map(String::as_str)
    }

    pub fn pointer_aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pointer_aliases.iter().map(|(r, n)| (r.as_str(), n.as_str()))
    }

    /// Dereference a local `$ref`. `None` when the pointer does not land on a schema.
    pub fn resolve(&self, reference: &str) -> Option<Cow<'_, SchemaNode>> {
        if let Some(named) = self.named.get(reference) {
            return Some(Cow::Borrowed(&named.node));
        }
        let fragment = reference.strip_prefix('#')?;
        let value = if fragment.is_empty() { &self.raw } else { self.raw.pointer(fragment)? };
        if !(value.is_object() || value.is_boolean()) {
            return None;
        }
        SchemaNode::from_value(value).ok().map(Cow::Owned)
    }

    /// Follow `$ref` chains until a non-reference node, bounded to avoid
    /// looping on `A → B → A` alias cycles.
    pub fn resolve_deep<'a>(&'a self, node: &'a SchemaNode) -> Option<Cow<'a, SchemaNode>> {
        let mut current = Cow::Borrowed(node);
        for _ in 0..32 {
            let reference = match &current.kind {
                SchemaKind::Ref(r) => r.clone(),
                _ => return Some(current),
            };
            current = Cow::Owned(self.resolve(&reference)?.into_owned());
        }
        None
    }
}

/// Walk the raw document in order and give each distinct deep local `$ref`
/// a path-derived name that collides with no named schema and no earlier alias.
fn reserve_pointer_aliases(raw: &Value, named: &IndexMap<String, NamedSchema>) -> IndexMap<String, String> {
    let mut refs = Vec::new();
    collect_refs(raw, &mut refs);
    let mut taken: HashSet<String> = named.values().map(|n| naming::to_pascal_case(&n.name)).collect();
    let mut aliases = IndexMap::new();
    for reference in refs {
        if !reference.starts_with("#/") || named.contains_key(&reference) || aliases.contains_key(&reference) {
            continue;
        }
        let base = naming::type_name_from_pointer(&reference);
        let mut name = base.clone();
        let mut counter = 2;
        while !taken.insert(name.clone()) {
            name = format!("{base}{counter}");
            counter += 1;
        }
        aliases.insert(reference, name);
    }
    aliases
}

fn collect_refs(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, v) in map {
                match (key.as_str(), v) {
                    ("$ref", Value::String(r)) => out.push(r.clone()),
                    _ => collect_refs(v, out),
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|v| collect_refs(v, out)),
        _ => {}
    }
}

fn escape_pointer_segment(s: &str) -> String {
    s.replace('~', "~0").replace('/', "~1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(v: Value) -> SchemaNode {
        SchemaNode::from_value(&v).unwrap()
    }

    #[test]
    fn classification_precedence() {
        assert!(matches!(node(json!({"$ref": "#/x", "type": "object"})).kind, SchemaKind::Ref(_)));
        assert!(matches!(node(json!({"oneOf": [], "allOf": []})).kind, SchemaKind::OneOf(_)));
        assert!(matches!(node(json!({"properties": {}})).kind, SchemaKind::Object(_)));
        assert!(matches!(node(json!({"type": "string", "enum": ["a"]})).kind, SchemaKind::Enum(_)));
        assert!(matches!(node(json!({"const": 1})).kind, SchemaKind::Enum(_)));
        assert!(matches!(
            node(json!({"type": "uuid-ish"})).kind,
            SchemaKind::Primitive(Primitive::Unknown(_))
        ));
        assert_eq!(node(json!({})).kind, SchemaKind::Any);
    }

    #[test]
    fn type_lists_fold_null_into_nullable() {
        let n = node(json!({"type": ["string", "null"]}));
        assert!(n.meta.nullable);
        assert_eq!(n.kind, SchemaKind::Primitive(Primitive::String));

        let n = node(json!({"type": ["string", "integer"]}));
        assert!(matches!(n.kind, SchemaKind::AnyOf(ref ms) if ms.len() == 2));
    }

    #[test]
    fn enum_extensions_align_with_values() {
        let n = node(json!({
            "enum": ["a", "b"],
            "x-enum-descriptions": {"b": "bee"},
            "x-enum-varnames": ["ALPHA", "BRAVO"]
        }));
        let SchemaKind::Enum(e) = n.kind else { panic!("enum expected") };
        assert_eq!(e.descriptions, vec![None, Some("bee".to_string())]);
        assert_eq!(e.varnames, vec!["ALPHA", "BRAVO"]);
    }

    #[test]
    fn document_sections_and_refs() {
        let doc = SchemaDocument::from_value(json!({
            "components": {"schemas": {
                "User": {"type": "object", "properties": {"name": {"type": "string"}}}
            }}
        }))
        .unwrap();
        assert_eq!(doc.named().len(), 1);
        assert!(doc.resolve("#/components/schemas/User").is_some());
        let deep = doc.resolve("#/components/schemas/User/properties/name").unwrap();
        assert_eq!(deep.kind, SchemaKind::Primitive(Primitive::String));
        assert!(doc.resolve("#/components/schemas/Missing").is_none());
        assert!(doc.resolve("other.json#/User").is_none());
    }

    #[test]
    fn deep_refs_get_distinct_reserved_aliases() {
        let doc = SchemaDocument::from_value(json!({
            "components": {"schemas": {
                "User": {"properties": {"address": {"properties": {"zip": {"type": "string"}}}}},
                "Company": {"properties": {"address": {"properties": {"street": {"type": "integer"}}}}},
                "UserAddress": {"type": "string"},
                "A": {"properties": {"a": {"$ref": "#/components/schemas/User/properties/address"}}},
                "B": {"properties": {"b": {"$ref": "#/components/schemas/Company/properties/address"}}},
                "C": {"properties": {"c": {"$ref": "#/components/schemas/User/properties/address"}}},
                "D": {"properties": {"d": {"$ref": "#/components/schemas/A"}}}
            }}
        }))
        .unwrap();
        let aliases: Vec<(&str, &str)> = doc.pointer_aliases().collect();
        assert_eq!(
            aliases,
            vec![
                ("#/components/schemas/User/properties/address", "UserAddress2"),
                ("#/components/schemas/Company/properties/address", "CompanyAddress"),
            ]
        );
        assert_eq!(doc.pointer_alias("#/components/schemas/A"), None);
    }

    #[test]
    fn document_without_sections_is_rejected() {
        let err = SchemaDocument::from_value(json!({"openapi": "3.0.0"})).unwrap_err();
        assert!(matches!(err, DocumentError::NoSchemas));
    }

    #[test]
    fn complexity_counts_properties_and_nesting() {
        let n = node(json!({"properties": {"a": {}, "b": {"allOf": []}}}));
        assert_eq!(n.complexity(), 1 + 2 + 2);
        assert_eq!(node(json!({"type": "string"})).complexity(), 1);
    }
}
