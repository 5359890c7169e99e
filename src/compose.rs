//! `allOf` intersections and general composition with bounded descent.
//!
//! Each nested level that composes (an `allOf` member, a composite
//! property, a composite array item) goes through `descend`, so
//! `maxDepth` bounds the whole recursion.
pub mod utility;

use crate::context::TransformationContext;
use crate::error::LoweringError;
use crate::ir::{CompositionResult, Declaration, PropertyDecl, TypeDescriptor};
use crate::naming;
use crate::options::CircularPolicy;
use crate::render;
use crate::schema::{ObjectShape, SchemaKind, SchemaNode};
use crate::transform::TOP_TYPE;
use crate::validators;

/// Side products collected while composing one type.
#[derive(Default)]
struct Parts {
    intermediates: Vec<Declaration>,
    circular_refs: Vec<String>,
}

impl Parts {
    fn absorb(&mut self, nested: CompositionResult) {
        self.intermediates.extend(nested.declarations());
        for r in nested.circular_refs {
            if !self.circular_refs.contains(&r) {
                self.circular_refs.push(r);
            }
        }
    }
}

enum Body {
    Alias(String),
    Interface(String, Vec<PropertyDecl>),
}

impl TransformationContext<'_> {
    pub fn compose_type(&mut self, name: &str, node: &SchemaNode) -> Result<CompositionResult, LoweringError> {
        self.compose(name, node, true)
    }

    /// `derive` controls utility types and helpers; intermediates skip them.
    fn compose(&mut self, name: &str, node: &SchemaNode, derive: bool) -> Result<CompositionResult, LoweringError> {
        let type_name = naming::to_pascal_case(name);

        if matches!(node.kind, SchemaKind::OneOf(_) | SchemaKind::AnyOf(_)) {
            let union = self.generate_union(&type_name, node)?;
            let mut result = CompositionResult {
                type_name: type_name.clone(),
                content: union.declaration.content.clone(),
                dependencies: union.declaration.dependencies.clone(),
                utility_types: Vec::new(),
                helpers: if derive { union.helpers.iter().map(|h| h.content.clone()).collect() } else { Vec::new() },
                complexity: node.complexity(),
                intermediates: union.member_declarations,
                circular_refs: Vec::new(),
            };
            if derive && self.options().composition.generate_utility_types {
                result.utility_types = self.utility_types(&type_name, node);
            }
            return Ok(result);
        }

        self.with_segment(&type_name, |ctx| -> Result<CompositionResult, LoweringError> {
            let mut parts = Parts::default();
            let (body, deps) = ctx.collect_dependencies(|ctx| ctx.compose_body(&type_name, node, &mut parts));
            let body = body?;

            let mut doc = Vec::new();
            if ctx.options().generate_comments {
                doc.extend(node.meta.description.clone());
                if node.meta.deprecated {
                    doc.push("@deprecated".to_string());
                }
                for r in &parts.circular_refs {
                    doc.push(format!("@circular {r}"));
                }
            }
            let header = format!("{}{}", render::jsdoc(&doc, ""), ctx.options().export_prefix());
            let mut validator = None;
            let content = match body {
                Body::Alias(expr) => {
                    let expr = if node.meta.nullable { ctx.make_nullable(&expr) } else { expr };
                    format!("{header}type {type_name} = {expr};")
                }
                Body::Interface(members, _) if node.meta.nullable => {
                    let expr = ctx.make_nullable(&format!("{{\n{members}}}"));
                    format!("{header}type {type_name} = {expr};")
                }
                Body::Interface(members, properties) => {
                    validator = validators::validator_for_properties(
                        &type_name,
                        &properties,
                        ctx.options().export_prefix(),
                    );
                    format!("{header}interface {type_name} {{\n{members}}}")
                }
            };

            let mut dependencies: Vec<String> = deps.into_iter().filter(|d| *d != type_name).collect();
            for decl in &parts.intermediates {
                if decl.name != type_name && !dependencies.contains(&decl.name) {
                    dependencies.push(decl.name.clone());
                }
            }

            let (utility_types, mut helpers) = if derive {
                let utilities = if ctx.options().composition.generate_utility_types {
                    ctx.utility_types(&type_name, node)
                } else {
                    Vec::new()
                };
                let helpers = if ctx.options().composition.generate_helpers {
                    ctx.structural_helpers(&type_name, node)
                } else {
                    Vec::new()
                };
                (utilities, helpers)
            } else {
                (Vec::new(), Vec::new())
            };
            helpers.extend(validator.map(|v| v.content));

            tracing::debug!(
                name = %type_name,
                intermediates = parts.intermediates.len(),
                circular = parts.circular_refs.len(),
                "composed type"
            );
            Ok(CompositionResult {
                type_name: type_name.clone(),
                content,
                dependencies,
                utility_types,
                helpers,
                complexity: node.complexity(),
                intermediates: parts.intermediates,
                circular_refs: parts.circular_refs,
            })
        })
    }

    fn compose_body(&mut self, owner: &str, node: &SchemaNode, parts: &mut Parts) -> Result<Body, LoweringError> {
        match &node.kind {
            SchemaKind::AllOf(members) if members.is_empty() => Ok(Body::Alias(TOP_TYPE.to_string())),
            SchemaKind::AllOf(members) => {
                let mut types = Vec::with_capacity(members.len());
                for (i, member) in members.iter().enumerate() {
                    let t = self.descend(&format!("{}", i + 1), |ctx| ctx.compose_member(owner, i, member, parts))?;
                    types.push(t);
                }
                Ok(Body::Alias(render::intersection_of(&types)))
            }
            SchemaKind::Ref(reference) => Ok(Body::Alias(self.compose_ref(reference, parts)?)),
            SchemaKind::Object(obj) if obj.properties.is_empty() => {
                Ok(Body::Alias(self.transform_type(node)?.type_name))
            }
            SchemaKind::Object(obj) => {
                let (members, properties) = self.compose_properties(owner, obj, parts)?;
                Ok(Body::Interface(members, properties))
            }
            SchemaKind::Array(item) => {
                let element = match &item.kind {
                    SchemaKind::Ref(reference) => self.compose_ref(reference, parts)?,
                    _ if item.is_composite() || !self.inlines(item) => self.descend("items", |ctx| {
                        let name = ctx.claim_name(&format!("{owner}Item"));
                        parts.absorb(ctx.compose(&name, item, false)?);
                        Ok(name)
                    })?,
                    _ => self.transform_type(item)?.type_name,
                };
                Ok(Body::Alias(self.array_of(&element)))
            }
            _ => Ok(Body::Alias(self.transform_type(node)?.type_name)),
        }
    }

    /// Inline when simple enough, otherwise a named `<Owner>Part<N>`.
    fn compose_member(
        &mut self,
        owner: &str,
        index: usize,
        member: &SchemaNode,
        parts: &mut Parts,
    ) -> Result<String, LoweringError> {
        if let SchemaKind::Ref(reference) = &member.kind {
            return self.compose_ref(reference, parts);
        }
        if self.inlines(member) {
            return Ok(self.transform_type(member)?.type_name);
        }
        let name = self.claim_name(&format!("{owner}Part{}", index + 1));
        parts.absorb(self.compose(&name, member, false)?);
        Ok(name)
    }

    fn compose_properties(
        &mut self,
        owner: &str,
        obj: &ObjectShape,
        parts: &mut Parts,
    ) -> Result<(String, Vec<PropertyDecl>), LoweringError> {
        let mut members = String::new();
        let mut properties = Vec::with_capacity(obj.properties.len());
        for (prop_name, prop) in &obj.properties {
            let desc = match &prop.kind {
                _ if prop.is_composite() => self.descend(prop_name, |ctx| {
                    let name = ctx.claim_name(&format!("{owner}{}", naming::to_pascal_case(prop_name)));
                    parts.absorb(ctx.compose(&name, prop, false)?);
                    Ok(described(name, prop))
                })?,
                SchemaKind::Ref(reference) => {
                    let name = self.with_segment(prop_name, |ctx| ctx.compose_ref(reference, parts))?;
                    described(name, prop)
                }
                _ => self.with_segment(prop_name, |ctx| ctx.transform_type(prop))?,
            };
            let p = self.build_property(prop_name, desc, prop, obj.is_required(prop_name));
            members.push_str(&self.render_property(&p, "  "));
            properties.push(p);
        }
        if let Some(value) = self.index_signature(obj)? {
            members.push_str(&format!("  [key: string]: {value};\n"));
        }
        Ok((members, properties))
    }

    /// Reference at a composition site. A cycle becomes a forward reference
    /// plus a `@circular` marker, or an error under `circularRefs: error`.
    fn compose_ref(&mut self, reference: &str, parts: &mut Parts) -> Result<String, LoweringError> {
        let resolved = self.resolve_ref(reference)?;
        if resolved.circular {
            match self.options().composition.circular_refs {
                CircularPolicy::Error => {
                    return Err(LoweringError::CircularReference {
                        reference: reference.to_string(),
                        path: self.current_path(),
                    });
                }
                CircularPolicy::Marker => {
                    tracing::debug!(reference, "circular reference contained");
                    if !parts.circular_refs.contains(&resolved.name) {
                        parts.circular_refs.push(resolved.name.clone());
                    }
                }
            }
        }
        Ok(resolved.name)
    }
}

fn described(type_name: String, schema: &SchemaNode) -> TypeDescriptor {
    TypeDescriptor {
        type_name,
        is_nullable: schema.meta.nullable,
        description: schema.meta.description.clone(),
        example: schema.meta.example.clone(),
        constraints: (!schema.meta.constraints.is_empty()).then(|| schema.meta.constraints.clone()),
        ..TypeDescriptor::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::DeclarationKind;
    use crate::options::Options;
    use crate::schema::SchemaDocument;
    use serde_json::{json, Value};

    fn document(schemas: Value) -> SchemaDocument {
        SchemaDocument::from_value(json!({"components": {"schemas": schemas}})).unwrap()
    }

    fn run(opts: &Options, schemas: Value, name: &str) -> Result<CompositionResult, LoweringError> {
        let d = document(schemas);
        let named = d.get_named(name).unwrap().clone();
        let mut ctx = TransformationContext::new(&d, opts);
        ctx.with_visited(&named.pointer, |ctx| ctx.compose_type(name, &named.node))
    }

    fn plain() -> Options {
        let mut opts = Options::default();
        opts.composition.generate_utility_types = false;
        opts
    }

    #[test]
    fn intersection_of_ref_and_inline_object() {
        let r = run(
            &plain(),
            json!({
                "A": {"properties": {"id": {"type": "string"}}},
                "B": {"allOf": [{"$ref": "#/components/schemas/A"}, {"type": "object", "properties": {"extra": {"type": "string"}}}]}
            }),
            "B",
        )
        .unwrap();
        assert_eq!(r.content, "export type B = A & { extra?: string };");
        assert_eq!(r.dependencies, vec!["A"]);
        assert!(r.intermediates.is_empty());
    }

    #[test]
    fn complex_members_get_part_declarations() {
        let opts = Options { max_inline_complexity: 1, ..plain() };
        let r = run(
            &opts,
            json!({"C": {"allOf": [
                {"properties": {"a": {"type": "string"}, "b": {"type": "number"}}},
                {"type": "object", "properties": {"c": {"type": "boolean"}}}
            ]}}),
            "C",
        )
        .unwrap();
        assert_eq!(r.content, "export type C = CPart1 & CPart2;");
        let names: Vec<&str> = r.intermediates.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["CPart1", "CPart2"]);
        assert!(r.intermediates[0].content.starts_with("export interface CPart1 {\n"));
        let all: Vec<String> = r.declarations().into_iter().map(|d| d.name).collect();
        assert_eq!(all, vec!["CPart1", "CPart2", "C"]);
    }

    #[test]
    fn composite_properties_become_named_types() {
        let r = run(
            &plain(),
            json!({
                "A": {"properties": {"a": {"type": "string"}}},
                "Order": {
                    "properties": {
                        "id": {"type": "string"},
                        "payment": {"oneOf": [{"type": "string"}, {"type": "integer"}], "description": "How"}
                    },
                    "required": ["id"]
                }
            }),
            "Order",
        )
        .unwrap();
        assert_eq!(r.intermediates[0].name, "OrderPayment");
        assert_eq!(r.intermediates[0].content, "/** How */\nexport type OrderPayment = string | number;");
        assert!(r.content.contains("  id: string;\n"));
        assert!(r.content.contains("  /** How */\n  payment?: OrderPayment;\n"));
        assert!(r.dependencies.contains(&"OrderPayment".to_string()));
    }

    #[test]
    fn composed_interfaces_carry_validators() {
        let mut opts = Options { max_inline_complexity: 1, ..plain() };
        opts.interfaces.generate_validation = true;
        let r = run(
            &opts,
            json!({"Order": {
                "properties": {
                    "id": {"type": "string", "minLength": 3},
                    "payment": {"oneOf": [{"type": "string"}, {"type": "integer"}]}
                },
                "required": ["id"]
            }}),
            "Order",
        )
        .unwrap();
        let decls = r.declarations();
        let v = decls.iter().find(|d| d.name == "validateOrder").unwrap();
        assert_eq!(v.kind, DeclarationKind::Function);
        assert!(v.content.contains("  if (!(value.id.length >= 3)) {\n    errors.push(\"id must be at least 3 characters\");\n  }\n"));

        let r = run(
            &opts,
            json!({"C": {"allOf": [
                {"properties": {"a": {"type": "string", "maxLength": 4}, "b": {"type": "number"}}},
                {"type": "object", "properties": {"c": {"type": "boolean"}}}
            ]}}),
            "C",
        )
        .unwrap();
        let names: Vec<String> = r.declarations().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["CPart1", "validateCPart1", "CPart2", "C"]);
    }

    #[test]
    fn circular_refs_are_marked_or_rejected() {
        let schemas = json!({"Node": {"properties": {
            "parent": {"$ref": "#/components/schemas/Node"},
            "value": {"anyOf": [{"type": "string"}, {"type": "number"}]}
        }}});
        let r = run(&plain(), schemas.clone(), "Node").unwrap();
        assert_eq!(r.circular_refs, vec!["Node"]);
        assert!(r.content.starts_with("/** @circular Node */\nexport interface Node {\n"));
        assert!(r.content.contains("  parent?: Node;\n"));

        let mut opts = plain();
        opts.composition.circular_refs = CircularPolicy::Error;
        let err = run(&opts, schemas, "Node").unwrap_err();
        assert!(matches!(err, LoweringError::CircularReference { ref reference, .. } if reference == "#/components/schemas/Node"));
    }

    #[test]
    fn depth_bound_is_a_hard_failure() {
        fn nested(levels: usize) -> Value {
            let mut node = json!({"type": "string"});
            for _ in 0..levels {
                node = json!({"allOf": [node]});
            }
            node
        }
        let opts = plain().max_depth(3);
        assert!(run(&opts, json!({"Deep": nested(3)}), "Deep").is_ok());
        let err = run(&opts, json!({"Deep": nested(4)}), "Deep").unwrap_err();
        assert!(matches!(err, LoweringError::CompositionDepthExceeded { depth: 4, max_depth: 3, .. }));
    }

    #[test]
    fn arrays_of_composites_name_their_items() {
        let r = run(
            &plain(),
            json!({"List": {"type": "array", "items": {"allOf": [{"type": "object", "properties": {"a": {"type": "string"}}}]}}}),
            "List",
        )
        .unwrap();
        assert_eq!(r.content, "export type List = ListItem[];");
        assert_eq!(r.intermediates[0].content, "export type ListItem = { a?: string };");
    }

    #[test]
    fn unions_are_delegated() {
        let r = run(&plain(), json!({"U": {"oneOf": [{"type": "string"}, {"type": "boolean"}]}}), "U").unwrap();
        assert_eq!(r.content, "export type U = string | boolean;");
        assert!(r.helpers.iter().any(|h| h.contains("function matchU<R>(")));
    }
}
