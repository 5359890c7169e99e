//! Output model. Everything the lowering stages hand to an emission layer.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::schema::SchemaNode;

/// The resolved type of one schema node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TypeDescriptor {
    /// TypeScript type expression (`string`, `User`, `Tag[] | null`, ...).
    pub type_name: String,
    /// From the node's own `nullable: true`.
    pub is_nullable: bool,
    /// From the containing object's `required` list; set by the interface emitter.
    pub is_optional: bool,
    pub description: Option<String>,
    pub example: Option<Value>,
    pub constraints: Option<Constraints>,
}

impl TypeDescriptor {
    pub fn named(type_name: impl Into<String>) -> Self {
        Self { type_name: type_name.into(), ..Self::default() }
    }
}

/// Documentation/validation metadata. Never changes `type_name`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_: Option<Vec<Value>>,
}

impl Constraints {
    pub fn is_empty(&self) -> bool {
        *self == Constraints::default()
    }

    /// `@tag value` lines for JSDoc, in a fixed order.
    pub fn doc_tags(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(v) = self.min_length {
            out.push(format!("@minLength {v}"));
        }
        if let Some(v) = self.max_length {
            out.push(format!("@maxLength {v}"));
        }
        if let Some(v) = self.minimum {
            out.push(format!("@minimum {v}"));
        }
        if let Some(v) = self.maximum {
            out.push(format!("@maximum {v}"));
        }
        if let Some(v) = &self.pattern {
            out.push(format!("@pattern {v}"));
        }
        if let Some(v) = &self.format {
            out.push(format!("@format {v}"));
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeclarationKind {
    TypeAlias,
    Interface,
    Enum,
    Const,
    Function,
}

/// One top-level TypeScript declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Declaration {
    pub name: String,
    pub kind: DeclarationKind,
    pub content: String,
    /// Named types this declaration refers to.
    pub dependencies: Vec<String>,
}

impl Declaration {
    pub fn new(name: impl Into<String>, kind: DeclarationKind, content: impl Into<String>) -> Self {
        Self { name: name.into(), kind, content: content.into(), dependencies: Vec::new() }
    }

    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }
}

static DECLARED_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:type|interface|function|const|enum)\s+([A-Za-z_$][A-Za-z0-9_$]*)").unwrap()
});

/// Name introduced by a declaration's text (`export type Foo = ...` → `Foo`).
pub fn declared_name(text: &str) -> Option<String> {
    DECLARED_NAME.captures(text).map(|c| c[1].to_string())
}

// ————————————————————————————————————————————————————————————————————————————
// ENUMS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq)]
pub struct EnumValue {
    pub key: String,
    /// TypeScript literal (`"active"`, `3`, `true`).
    pub value: String,
    pub original_value: Value,
    pub description: Option<String>,
    pub deprecated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedEnum {
    pub name: String,
    pub values: Vec<EnumValue>,
    pub declaration: Declaration,
    /// Companion map / values tuple.
    pub companions: Vec<Declaration>,
    pub helpers: Vec<Declaration>,
    pub mappings: Vec<Declaration>,
}

impl GeneratedEnum {
    pub fn declarations(&self) -> Vec<Declaration> {
        std::iter::once(&self.declaration)
            .chain(&self.companions)
            .chain(&self.helpers)
            .chain(&self.mappings)
            .cloned()
            .collect()
    }
}

// ————————————————————————————————————————————————————————————————————————————
// UNIONS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq)]
pub struct UnionMember {
    pub type_name: String,
    pub discriminator_value: Option<Value>,
    pub schema: SchemaNode,
    pub is_inline: bool,
    pub complexity: usize,
    /// Stable per-member identifier used for guard names and handler keys.
    pub tag: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedUnion {
    pub name: String,
    pub discriminator: Option<String>,
    pub members: Vec<UnionMember>,
    pub declaration: Declaration,
    /// Named intermediate member types.
    pub member_declarations: Vec<Declaration>,
    pub helpers: Vec<Declaration>,
}

impl GeneratedUnion {
    pub fn declarations(&self) -> Vec<Declaration> {
        self.member_declarations
            .iter()
            .chain(std::iter::once(&self.declaration))
            .chain(&self.helpers)
            .cloned()
            .collect()
    }
}

// ————————————————————————————————————————————————————————————————————————————
// COMPOSITION
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq)]
pub struct CompositionResult {
    pub type_name: String,
    pub content: String,
    pub dependencies: Vec<String>,
    pub utility_types: Vec<String>,
    pub helpers: Vec<String>,
    pub complexity: usize,
    /// Separately declared member/property types.
    pub intermediates: Vec<Declaration>,
    /// References contained as forward references instead of recursing.
    pub circular_refs: Vec<String>,
}

impl CompositionResult {
    pub fn declarations(&self) -> Vec<Declaration> {
        let kind = if self.content.contains(&format!("interface {} ", self.type_name)) {
            DeclarationKind::Interface
        } else {
            DeclarationKind::TypeAlias
        };
        let mut out = self.intermediates.clone();
        out.push(
            Declaration::new(&self.type_name, kind, &self.content)
                .with_dependencies(self.dependencies.clone()),
        );
        for text in &self.utility_types {
            let name = declared_name(text).unwrap_or_else(|| self.type_name.clone());
            out.push(
                Declaration::new(name, DeclarationKind::TypeAlias, text)
                    .with_dependencies(vec![self.type_name.clone()]),
            );
        }
        for text in &self.helpers {
            let name = declared_name(text).unwrap_or_else(|| self.type_name.clone());
            out.push(
                Declaration::new(name, DeclarationKind::Function, text)
                    .with_dependencies(vec![self.type_name.clone()]),
            );
        }
        out
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERFACES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleKind {
    MinLength,
    MaxLength,
    Min,
    Max,
    Pattern,
    Email,
    Url,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationRule {
    #[serde(rename = "type")]
    pub kind: RuleKind,
    pub value: Value,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDecl {
    pub name: String,
    pub descriptor: TypeDescriptor,
    pub required: bool,
    pub readonly: bool,
    pub deprecated: bool,
    pub rules: Vec<ValidationRule>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedInterface {
    pub name: String,
    pub properties: Vec<PropertyDecl>,
    /// Value type of the `[key: string]` signature, if any.
    pub index_signature: Option<String>,
    pub declaration: Declaration,
}

impl GeneratedInterface {
    pub fn declarations(&self) -> Vec<Declaration> {
        vec![self.declaration.clone()]
    }

    pub fn has_validation_rules(&self) -> bool {
        self.properties.iter().any(|p| !p.rules.is_empty())
    }
}
