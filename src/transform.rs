//! Schema node → TypeScript type expression.
//!
//! `transform_type` is the entry point every other stage leans on for member
//! and property types. Precedence: absent node, `$ref`, `nullable`, then the
//! node's kind. Description/example/constraints ride along unchanged.
use crate::context::TransformationContext;
use crate::error::LoweringError;
use crate::ir::{Declaration, DeclarationKind, TypeDescriptor};
use crate::naming;
use crate::options::{ArrayStyle, DateType, DegeneratePolicy, NullableStyle};
use crate::render;
use crate::schema::{EnumShape, Primitive, SchemaKind, SchemaNode};

/// TypeScript's top type.
pub const TOP_TYPE: &str = "unknown";
/// TypeScript's bottom type (degenerate empty enums and unions).
pub const BOTTOM_TYPE: &str = "never";

/// Outcome of resolving one `$ref`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefResolution {
    pub name: String,
    /// The ref was already on the resolution stack; `name` is a forward reference.
    pub circular: bool,
}

impl TransformationContext<'_> {
    /// Resolve `node` (or its absence) to a [`TypeDescriptor`].
    pub fn transform_optional(&mut self, node: Option<&SchemaNode>) -> Result<TypeDescriptor, LoweringError> {
        match node {
            None => Ok(TypeDescriptor::named(TOP_TYPE)),
            Some(node) => self.transform_type(node),
        }
    }

    pub fn transform_type(&mut self, node: &SchemaNode) -> Result<TypeDescriptor, LoweringError> {
        let mut desc = match &node.kind {
            SchemaKind::Ref(reference) => TypeDescriptor::named(self.resolve_ref(reference)?.name),
            _ if node.meta.nullable => {
                let base = self.base_type(node)?;
                TypeDescriptor {
                    type_name: self.make_nullable(&base),
                    is_nullable: true,
                    ..TypeDescriptor::default()
                }
            }
            _ => TypeDescriptor::named(self.base_type(node)?),
        };
        desc.description = node.meta.description.clone();
        desc.example = node.meta.example.clone();
        if !node.meta.constraints.is_empty() {
            desc.constraints = Some(node.meta.constraints.clone());
        }
        Ok(desc)
    }

    /// Type expression ignoring the node's own nullability.
    fn base_type(&mut self, node: &SchemaNode) -> Result<String, LoweringError> {
        match &node.kind {
            SchemaKind::Any => Ok(TOP_TYPE.to_string()),
            SchemaKind::Ref(reference) => Ok(self.resolve_ref(reference)?.name),
            SchemaKind::OneOf(members) | SchemaKind::AnyOf(members) => self.inline_union(members),
            SchemaKind::AllOf(members) => self.inline_intersection(members),
            SchemaKind::Array(item) => {
                let element = self.transform_type(item)?;
                Ok(self.array_of(&element.type_name))
            }
            SchemaKind::Object(obj) => self.object_literal(obj),
            SchemaKind::Enum(shape) => self.inline_enum(shape),
            SchemaKind::Primitive(p) => Ok(self.primitive(p, node.meta.format.as_deref())),
        }
    }

    fn primitive(&self, p: &Primitive, format: Option<&str>) -> String {
        match p {
            Primitive::String => match (format, self.options().date_type) {
                (Some("date" | "date-time"), DateType::Date) => "Date".to_string(),
                _ => "string".to_string(),
            },
            Primitive::Number | Primitive::Integer => "number".to_string(),
            Primitive::Boolean => "boolean".to_string(),
            Primitive::Null => "null".to_string(),
            Primitive::Unknown(t) => {
                tracing::debug!(kind = %t, "unknown primitive type, using top type");
                TOP_TYPE.to_string()
            }
        }
    }

    /// Wrap per the configured nullable representation. Without strict null
    /// checks `null` is assignable anyway, so the base is returned unchanged.
    pub fn make_nullable(&self, base: &str) -> String {
        if !self.options().strict_null_checks {
            return base.to_string();
        }
        let suffix = match self.options().nullable_type {
            NullableStyle::Null => "null",
            NullableStyle::Undefined => "undefined",
            NullableStyle::NullAndUndefined => "null | undefined",
        };
        if base == "null" || base.ends_with(&format!("| {suffix}")) {
            return base.to_string();
        }
        format!("{base} | {suffix}")
    }

    pub fn array_of(&self, element: &str) -> String {
        match self.options().array_type {
            ArrayStyle::Generic => format!("Array<{element}>"),
            ArrayStyle::Bracket => format!("{}[]", render::parenthesize(element)),
        }
    }

    fn inline_enum(&mut self, shape: &EnumShape) -> Result<String, LoweringError> {
        if shape.values.is_empty() {
            self.degenerate(self.options().enums.empty_enum, "enum has no values")?;
            return Ok(BOTTOM_TYPE.to_string());
        }
        let literals: Vec<String> = shape.values.iter().map(naming::literal).collect();
        Ok(render::union_of(&literals))
    }

    fn inline_union(&mut self, members: &[SchemaNode]) -> Result<String, LoweringError> {
        if members.is_empty() {
            self.degenerate(self.options().unions.empty_union, "union has no members")?;
            return Ok(BOTTOM_TYPE.to_string());
        }
        let mut parts = Vec::with_capacity(members.len());
        for (i, member) in members.iter().enumerate() {
            let desc = self.descend(&format!("{}", i + 1), |ctx| ctx.transform_type(member))?;
            parts.push(desc.type_name);
        }
        Ok(render::union_of(&parts))
    }

    fn inline_intersection(&mut self, members: &[SchemaNode]) -> Result<String, LoweringError> {
        if members.is_empty() {
            return Ok(TOP_TYPE.to_string());
        }
        let mut parts = Vec::with_capacity(members.len());
        for (i, member) in members.iter().enumerate() {
            let desc = self.descend(&format!("{}", i + 1), |ctx| ctx.transform_type(member))?;
            parts.push(desc.type_name);
        }
        Ok(render::intersection_of(&parts))
    }

    /// Apply a degenerate-input policy: `Error` fails, `Never` warns.
    pub(crate) fn degenerate(&mut self, policy: DegeneratePolicy, reason: &str) -> Result<(), LoweringError> {
        match policy {
            DegeneratePolicy::Error => Err(LoweringError::DegenerateInput {
                path: self.current_path(),
                reason: reason.to_string(),
            }),
            DegeneratePolicy::Never => {
                self.warn(format!("{reason}; lowered to `{BOTTOM_TYPE}`"));
                Ok(())
            }
        }
    }

    // ------------------------------ references ----------------------------- //

    /// Resolve a `$ref` to a type name, guarding cycles and memoizing.
    pub fn resolve_ref(&mut self, reference: &str) -> Result<RefResolution, LoweringError> {
        let derived = naming::type_name_from_ref(reference);

        if self.is_visiting(reference) {
            let name = self
                .cached_type(reference)
                .or_else(|| self.document().pointer_alias(reference))
                .map(str::to_string)
                .unwrap_or(derived);
            tracing::debug!(reference, name = %name, "reference cycle, emitting forward reference");
            self.add_dependency(&name);
            return Ok(RefResolution { name, circular: true });
        }

        let name = self.with_visited(reference, |ctx| {
            if let Some(cached) = ctx.cached_type(reference) {
                tracing::debug!(reference, "memo hit");
                return Ok(cached.to_string());
            }
            let target = ctx.document().resolve(reference).ok_or_else(|| {
                LoweringError::ReferenceResolution {
                    reference: reference.to_string(),
                    path: ctx.current_path(),
                }
            })?;

            if ctx.document().is_named_pointer(reference) {
                ctx.at_declaration_root(|ctx| {
                    ctx.with_segment(&derived, |ctx| ctx.isolate_dependencies(|ctx| ctx.transform_type(&target)))
                })?;
                ctx.record_type(reference, &derived);
                return Ok(derived.clone());
            }

            // Pointer below a named schema: declare an alias for it once,
            // under the name the document reserved for that pointer.
            let name = match ctx.document().pointer_alias(reference) {
                Some(alias) => alias.to_string(),
                None => ctx.claim_name(&naming::type_name_from_pointer(reference)),
            };
            ctx.record_type(reference, &name);
            let (resolved, deps) = ctx.at_declaration_root(|ctx| {
                ctx.with_segment(&name, |ctx| {
                    ctx.isolate_dependencies(|ctx| ctx.collect_dependencies(|ctx| ctx.transform_type(&target)))
                })
            });
            let resolved = match resolved {
                Ok(resolved) => resolved,
                Err(e) => {
                    ctx.forget_type(reference);
                    return Err(e);
                }
            };
            let content = format!(
                "{}type {} = {};",
                ctx.options().export_prefix(),
                name,
                resolved.type_name
            );
            ctx.emit_once(
                Declaration::new(&name, DeclarationKind::TypeAlias, content)
                    .with_dependencies(deps.into_iter().filter(|d| *d != name).collect()),
            );
            Ok(name)
        })?;

        self.add_dependency(&name);
        Ok(RefResolution { name, circular: false })
    }

    // ---------------------------- named aliases ---------------------------- //

    /// Declaration for a named schema whose shape is a plain alias
    /// (reference, array, primitive, `any`).
    pub fn generate_alias(&mut self, name: &str, node: &SchemaNode) -> Result<Declaration, LoweringError> {
        let type_name = naming::to_pascal_case(name);
        let (desc, deps) = self.with_segment(&type_name, |ctx| {
            ctx.collect_dependencies(|ctx| ctx.transform_type(node))
        });
        let desc = desc?;
        let mut doc = Vec::new();
        if self.options().generate_comments {
            doc.extend(node.meta.description.clone());
            if let Some(c) = &desc.constraints {
                doc.extend(c.doc_tags());
            }
            if node.meta.deprecated {
                doc.push("@deprecated".to_string());
            }
        }
        let content = format!(
            "{}{}type {} = {};",
            render::jsdoc(&doc, ""),
            self.options().export_prefix(),
            type_name,
            desc.type_name
        );
        Ok(Declaration::new(&type_name, DeclarationKind::TypeAlias, content)
            .with_dependencies(deps.into_iter().filter(|d| *d != type_name).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use crate::schema::SchemaDocument;
    use serde_json::{json, Value};

    fn doc(schemas: Value) -> SchemaDocument {
        SchemaDocument::from_value(json!({"components": {"schemas": schemas}})).unwrap()
    }

    fn node(v: Value) -> SchemaNode {
        SchemaNode::from_value(&v).unwrap()
    }

    fn ts(opts: &Options, v: Value) -> TypeDescriptor {
        let d = doc(json!({}));
        let mut ctx = TransformationContext::new(&d, opts);
        ctx.transform_type(&node(v)).unwrap()
    }

    #[test]
    fn primitives_are_stable() {
        let opts = Options::default();
        assert_eq!(ts(&opts, json!({"type": "string"})).type_name, "string");
        assert_eq!(ts(&opts, json!({"type": "integer"})).type_name, "number");
        assert_eq!(ts(&opts, json!({"type": "boolean"})).type_name, "boolean");
        assert_eq!(ts(&opts, json!({"type": "null"})).type_name, "null");
        assert_eq!(ts(&opts, json!({"type": "wat"})).type_name, TOP_TYPE);
        assert_eq!(ts(&opts, json!({})).type_name, TOP_TYPE);
    }

    #[test]
    fn absent_node_is_top_type() {
        let d = doc(json!({}));
        let opts = Options::default();
        let mut ctx = TransformationContext::new(&d, &opts);
        let desc = ctx.transform_optional(None).unwrap();
        assert_eq!(desc.type_name, TOP_TYPE);
        assert!(!desc.is_nullable && !desc.is_optional);
    }

    #[test]
    fn nullable_wrapping_follows_style() {
        let v = json!({"type": "string", "nullable": true});
        let desc = ts(&Options::default(), v.clone());
        assert_eq!(desc.type_name, "string | null");
        assert!(desc.is_nullable);
        assert!(!desc.is_optional);

        let opts = Options::default().nullable_type(NullableStyle::NullAndUndefined);
        assert_eq!(ts(&opts, v.clone()).type_name, "string | null | undefined");

        let opts = Options { strict_null_checks: false, ..Options::default() };
        let desc = ts(&opts, v);
        assert_eq!(desc.type_name, "string");
        assert!(desc.is_nullable);
    }

    #[test]
    fn dates_follow_option() {
        let v = json!({"type": "string", "format": "date-time"});
        assert_eq!(ts(&Options::default(), v.clone()).type_name, "string");
        assert_eq!(ts(&Options::default().date_type(DateType::Date), v).type_name, "Date");
    }

    #[test]
    fn arrays_wrap_and_parenthesize() {
        let v = json!({"type": "array", "items": {"type": ["string", "integer"]}});
        assert_eq!(ts(&Options::default(), v.clone()).type_name, "(string | number)[]");
        let opts = Options::default().array_type(ArrayStyle::Generic);
        assert_eq!(ts(&opts, v).type_name, "Array<string | number>");
    }

    #[test]
    fn metadata_is_attached_structurally() {
        let desc = ts(
            &Options::default(),
            json!({"type": "string", "description": "d", "example": "x", "minLength": 2, "format": "email"}),
        );
        assert_eq!(desc.description.as_deref(), Some("d"));
        assert_eq!(desc.example, Some(json!("x")));
        let c = desc.constraints.unwrap();
        assert_eq!(c.min_length, Some(2));
        assert_eq!(c.format.as_deref(), Some("email"));
    }

    #[test]
    fn inline_enums_and_unions() {
        let opts = Options::default();
        assert_eq!(ts(&opts, json!({"enum": ["a", "b", 1]})).type_name, "\"a\" | \"b\" | 1");
        assert_eq!(
            ts(&opts, json!({"oneOf": [{"type": "string"}, {"type": "number"}, {"type": "string"}]})).type_name,
            "string | number"
        );
        assert_eq!(ts(&opts, json!({"enum": []})).type_name, BOTTOM_TYPE);
    }

    #[test]
    fn refs_memoize_and_detect_cycles() {
        let d = doc(json!({
            "Node": {"type": "object", "properties": {
                "children": {"type": "array", "items": {"$ref": "#/components/schemas/Node"}}
            }}
        }));
        let opts = Options::default();
        let mut ctx = TransformationContext::new(&d, &opts);
        let a = ctx.transform_type(&node(json!({"$ref": "#/components/schemas/Node"}))).unwrap();
        let b = ctx.transform_type(&node(json!({"$ref": "#/components/schemas/Node"}))).unwrap();
        assert_eq!(a.type_name, "Node");
        assert_eq!(a.type_name, b.type_name);
        assert_eq!(ctx.generated_types().len(), 1);
        assert_eq!(ctx.visited_refs().count(), 0);
    }

    #[test]
    fn dangling_ref_fails_and_unwinds() {
        let d = doc(json!({
            "A": {"type": "object", "properties": {"b": {"$ref": "#/components/schemas/Missing"}}}
        }));
        let opts = Options::default();
        let mut ctx = TransformationContext::new(&d, &opts);
        let err = ctx.transform_type(&node(json!({"$ref": "#/components/schemas/A"}))).unwrap_err();
        assert!(matches!(err, LoweringError::ReferenceResolution { ref reference, .. } if reference.ends_with("Missing")));
        assert_eq!(ctx.visited_refs().count(), 0);
        assert!(ctx.cached_type("#/components/schemas/A").is_none());
    }

    #[test]
    fn deep_pointer_gets_one_alias() {
        let d = doc(json!({
            "User": {"type": "object", "properties": {"address": {"type": "object", "properties": {"zip": {"type": "string"}}}}}
        }));
        let opts = Options::default();
        let mut ctx = TransformationContext::new(&d, &opts);
        let r = node(json!({"$ref": "#/components/schemas/User/properties/address"}));
        assert_eq!(ctx.transform_type(&r).unwrap().type_name, "UserAddress");
        assert_eq!(ctx.transform_type(&r).unwrap().type_name, "UserAddress");
        assert_eq!(ctx.pointer_declarations().len(), 1);
        assert_eq!(ctx.pointer_declarations()[0].content, "export type UserAddress = { zip?: string };");
    }

    #[test]
    fn named_alias_declaration() {
        let d = doc(json!({"Tags": {"type": "array", "items": {"type": "string"}, "description": "All tags"}}));
        let opts = Options::default();
        let mut ctx = TransformationContext::new(&d, &opts);
        let named = d.get_named("Tags").unwrap().node.clone();
        let decl = ctx.generate_alias("Tags", &named).unwrap();
        assert_eq!(decl.content, "/** All tags */\nexport type Tags = string[];");
    }
}
