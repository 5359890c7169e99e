//! Object schema → interface declaration.
//!
//! Required iff listed in `required`; readonly iff `useReadonly` or the
//! property's own `readOnly`. Optionality is written either as `?` or as a
//! trailing `| undefined`, never both.
use crate::context::TransformationContext;
use crate::error::LoweringError;
use crate::ir::{
    Declaration, DeclarationKind, GeneratedInterface, PropertyDecl, RuleKind, TypeDescriptor, ValidationRule,
};
use crate::naming;
use crate::options::ObjectStyle;
use crate::render;
use crate::schema::{Additional, ObjectShape, SchemaNode};
use crate::transform::TOP_TYPE;

const ABSENT: &str = "undefined";

impl TransformationContext<'_> {
    pub fn generate_interface(&mut self, name: &str, node: &SchemaNode) -> Result<GeneratedInterface, LoweringError> {
        let type_name = naming::to_pascal_case(name);
        let empty = ObjectShape::default();
        let obj = node.as_object().unwrap_or(&empty);

        let (lowered, deps) = self.with_segment(&type_name, |ctx| {
            ctx.collect_dependencies(|ctx| -> Result<_, LoweringError> {
                let mut props = Vec::with_capacity(obj.properties.len());
                for (prop_name, prop) in &obj.properties {
                    let desc = ctx.with_segment(prop_name, |ctx| ctx.transform_type(prop))?;
                    props.push(ctx.build_property(prop_name, desc, prop, obj.is_required(prop_name)));
                }
                let index = ctx.index_signature(obj)?;
                Ok((props, index))
            })
        });
        let (properties, index_signature) = lowered?;
        let dependencies: Vec<String> = deps.into_iter().filter(|d| *d != type_name).collect();

        let mut doc = Vec::new();
        if self.options().generate_comments {
            doc.extend(node.meta.title.clone().filter(|t| *t != type_name));
            doc.extend(node.meta.description.clone());
            if node.meta.deprecated {
                doc.push("@deprecated".to_string());
            }
        }

        let (kind, content) = if properties.is_empty() && self.options().object_type == ObjectStyle::GenericMap {
            let value = index_signature.clone().unwrap_or_else(|| TOP_TYPE.to_string());
            let content = format!(
                "{}{}type {} = Record<string, {}>;",
                render::jsdoc(&doc, ""),
                self.options().export_prefix(),
                type_name,
                value
            );
            (DeclarationKind::TypeAlias, content)
        } else {
            let mut body = String::new();
            for p in &properties {
                body.push_str(&self.render_property(p, "  "));
            }
            if let Some(value) = &index_signature {
                body.push_str(&format!("  [key: string]: {value};\n"));
            }
            let content = format!(
                "{}{}interface {} {{\n{}}}",
                render::jsdoc(&doc, ""),
                self.options().export_prefix(),
                type_name,
                body
            );
            (DeclarationKind::Interface, content)
        };

        Ok(GeneratedInterface {
            declaration: Declaration::new(&type_name, kind, content).with_dependencies(dependencies),
            name: type_name,
            properties,
            index_signature,
        })
    }

    /// Inline object type: `{ id: string; age?: number }`.
    pub fn object_literal(&mut self, obj: &ObjectShape) -> Result<String, LoweringError> {
        let index = self.index_signature(obj)?;
        if obj.properties.is_empty() {
            let value = index.unwrap_or_else(|| TOP_TYPE.to_string());
            return Ok(self.map_of(&value));
        }
        let mut members = Vec::with_capacity(obj.properties.len() + 1);
        for (prop_name, prop) in &obj.properties {
            let desc = self.with_segment(prop_name, |ctx| ctx.transform_type(prop))?;
            let p = self.build_property(prop_name, desc, prop, obj.is_required(prop_name));
            members.push(self.property_signature(&p));
        }
        if let Some(value) = index {
            members.push(format!("[key: string]: {value}"));
        }
        Ok(format!("{{ {} }}", members.join("; ")))
    }

    /// `Record<string, T>` or `{ [key: string]: T }` per `objectType`.
    pub fn map_of(&self, value: &str) -> String {
        match self.options().object_type {
            ObjectStyle::GenericMap => format!("Record<string, {value}>"),
            ObjectStyle::IndexSignature => format!("{{ [key: string]: {value} }}"),
        }
    }

    /// Value type of the index signature implied by `additionalProperties`.
    /// An object without declared properties is open unless explicitly closed.
    pub(crate) fn index_signature(&mut self, obj: &ObjectShape) -> Result<Option<String>, LoweringError> {
        Ok(match &obj.additional {
            Additional::Open => Some(TOP_TYPE.to_string()),
            Additional::Schema(schema) => {
                let desc = self.with_segment("additionalProperties", |ctx| ctx.transform_type(schema))?;
                Some(desc.type_name)
            }
            Additional::Closed if obj.properties.is_empty() => Some("never".to_string()),
            Additional::Unspecified if obj.properties.is_empty() => Some(TOP_TYPE.to_string()),
            Additional::Closed | Additional::Unspecified => None,
        })
    }

    pub(crate) fn build_property(
        &self,
        name: &str,
        mut descriptor: TypeDescriptor,
        schema: &SchemaNode,
        required: bool,
    ) -> PropertyDecl {
        descriptor.is_optional = !required;
        let rules = if self.options().interfaces.generate_validation {
            validation_rules(name, descriptor.constraints.as_ref())
        } else {
            Vec::new()
        };
        PropertyDecl {
            name: name.to_string(),
            descriptor,
            required,
            readonly: self.options().use_readonly || schema.meta.read_only,
            deprecated: schema.meta.deprecated,
            rules,
        }
    }

    /// `readonly key?: T` without docs or terminator.
    pub(crate) fn property_signature(&self, p: &PropertyDecl) -> String {
        let readonly = if p.readonly { "readonly " } else { "" };
        let key = naming::property_key(&p.name);
        let ty = &p.descriptor.type_name;
        if p.required {
            format!("{readonly}{key}: {ty}")
        } else if self.options().optional_markers {
            format!("{readonly}{key}?: {ty}")
        } else {
            format!("{readonly}{key}: {}", render::union_of(&[ty.clone(), ABSENT.to_string()]))
        }
    }

    /// One interface member line, with its JSDoc when comments are on.
    pub(crate) fn render_property(&self, p: &PropertyDecl, indent: &str) -> String {
        let mut out = String::new();
        if self.options().generate_comments {
            out.push_str(&render::jsdoc(&property_doc(p), indent));
        }
        out.push_str(&format!("{indent}{};\n", self.property_signature(p)));
        out
    }
}

/// Description, constraint tags, example and deprecation, never dropped.
fn property_doc(p: &PropertyDecl) -> Vec<String> {
    let d = &p.descriptor;
    let mut lines = Vec::new();
    lines.extend(d.description.clone());
    if let Some(c) = &d.constraints {
        lines.extend(c.doc_tags());
    }
    if let Some(example) = &d.example {
        lines.push(format!("@example {example}"));
    }
    if p.deprecated {
        lines.push("@deprecated".to_string());
    }
    lines
}

/// One rule per constraint. `format: email|uri|url` become `Email`/`Url`.
pub fn validation_rules(property: &str, constraints: Option<&crate::ir::Constraints>) -> Vec<ValidationRule> {
    let Some(c) = constraints else { return Vec::new() };
    let mut rules = Vec::new();
    let mut push = |kind, value: serde_json::Value, message: String| {
        rules.push(ValidationRule { kind, value, message });
    };
    if let Some(n) = c.min_length {
        push(RuleKind::MinLength, n.into(), format!("{property} must be at least {n} characters"));
    }
    if let Some(n) = c.max_length {
        push(RuleKind::MaxLength, n.into(), format!("{property} must be at most {n} characters"));
    }
    if let Some(n) = c.minimum {
        push(RuleKind::Min, n.into(), format!("{property} must be greater than or equal to {n}"));
    }
    if let Some(n) = c.maximum {
        push(RuleKind::Max, n.into(), format!("{property} must be less than or equal to {n}"));
    }
    if let Some(p) = &c.pattern {
        push(RuleKind::Pattern, p.clone().into(), format!("{property} must match pattern {p}"));
    }
    match c.format.as_deref() {
        Some("email") => push(RuleKind::Email, true.into(), format!("{property} must be a valid email address")),
        Some("uri" | "url") => push(RuleKind::Url, true.into(), format!("{property} must be a valid URL")),
        _ => {}
    }
    rules
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use crate::schema::SchemaDocument;
    use serde_json::{json, Value};

    fn run(opts: &Options, schema: Value) -> GeneratedInterface {
        let d = SchemaDocument::from_value(json!({"components": {"schemas": {"User": schema}}})).unwrap();
        let node = d.get_named("User").unwrap().node.clone();
        let mut ctx = TransformationContext::new(&d, opts);
        ctx.generate_interface("User", &node).unwrap()
    }

    #[test]
    fn required_and_optional_properties() {
        let out = run(
            &Options::default(),
            json!({"properties": {"id": {"type": "string"}, "age": {"type": "integer"}}, "required": ["id"]}),
        );
        let id = &out.properties[0];
        assert!(id.required && !id.descriptor.is_optional);
        assert_eq!(id.descriptor.type_name, "string");
        let age = &out.properties[1];
        assert!(!age.required && age.descriptor.is_optional);
        assert_eq!(age.descriptor.type_name, "number");
        assert_eq!(out.declaration.content, "export interface User {\n  id: string;\n  age?: number;\n}");
        assert_eq!(out.declaration.kind, DeclarationKind::Interface);
    }

    #[test]
    fn optional_as_explicit_absent_marker() {
        let opts = Options { optional_markers: false, ..Options::default() };
        let out = run(&opts, json!({"properties": {"age": {"type": "integer"}}}));
        assert_eq!(out.declaration.content, "export interface User {\n  age: number | undefined;\n}");
    }

    #[test]
    fn nullable_and_optional_are_independent() {
        let out = run(
            &Options::default(),
            json!({"properties": {"nick": {"type": "string", "nullable": true}}, "required": ["nick"]}),
        );
        let nick = &out.properties[0];
        assert!(nick.descriptor.is_nullable);
        assert!(!nick.descriptor.is_optional);
        assert!(out.declaration.content.contains("  nick: string | null;\n"));
    }

    #[test]
    fn readonly_from_option_or_schema() {
        let out = run(&Options::default(), json!({"properties": {"id": {"type": "string", "readOnly": true}, "n": {}}}));
        assert!(out.properties[0].readonly);
        assert!(!out.properties[1].readonly);
        assert!(out.declaration.content.contains("readonly id?: string;"));

        let opts = Options { use_readonly: true, ..Options::default() };
        let out = run(&opts, json!({"properties": {"n": {}}}));
        assert!(out.properties[0].readonly);
    }

    #[test]
    fn additional_properties_become_index_signatures() {
        let out = run(&Options::default(), json!({"properties": {"a": {}}, "additionalProperties": true}));
        assert_eq!(out.index_signature.as_deref(), Some("unknown"));
        assert!(out.declaration.content.contains("  [key: string]: unknown;\n"));

        let out = run(&Options::default(), json!({"type": "object", "additionalProperties": {"type": "integer"}}));
        assert_eq!(out.declaration.content, "export type User = Record<string, number>;");

        let opts = Options { object_type: ObjectStyle::IndexSignature, ..Options::default() };
        let out = run(&opts, json!({"type": "object", "additionalProperties": {"type": "integer"}}));
        assert_eq!(out.declaration.content, "export interface User {\n  [key: string]: number;\n}");
    }

    #[test]
    fn constraints_are_documented() {
        let out = run(
            &Options::default(),
            json!({"properties": {"email": {"type": "string", "description": "Login", "format": "email", "maxLength": 64}}}),
        );
        assert!(out.declaration.content.contains("   * Login\n"));
        assert!(out.declaration.content.contains("   * @maxLength 64\n"));
        assert!(out.declaration.content.contains("   * @format email\n"));
    }

    #[test]
    fn validation_rules_per_constraint() {
        let opts = Options {
            interfaces: crate::options::InterfaceOptions { generate_validation: true },
            ..Options::default()
        };
        let out = run(
            &opts,
            json!({"properties": {
                "name": {"type": "string", "minLength": 2, "pattern": "^[a-z]+$"},
                "site": {"type": "string", "format": "uri"},
                "age": {"type": "integer", "minimum": 0, "maximum": 150}
            }}),
        );
        let kinds: Vec<Vec<RuleKind>> =
            out.properties.iter().map(|p| p.rules.iter().map(|r| r.kind).collect()).collect();
        assert_eq!(
            kinds,
            vec![
                vec![RuleKind::MinLength, RuleKind::Pattern],
                vec![RuleKind::Url],
                vec![RuleKind::Min, RuleKind::Max],
            ]
        );
        assert_eq!(out.properties[0].rules[0].message, "name must be at least 2 characters");
        assert!(out.has_validation_rules());
    }

    #[test]
    fn quoted_keys_for_non_identifiers() {
        let out = run(&Options::default(), json!({"properties": {"content-type": {"type": "string"}}, "required": ["content-type"]}));
        assert!(out.declaration.content.contains("  \"content-type\": string;\n"));
    }
}
