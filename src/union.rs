//! `oneOf` / `anyOf` → (discriminated) unions with guards and matchers.
pub mod discriminator;

use serde_json::Value;

use crate::context::TransformationContext;
use crate::error::LoweringError;
use crate::ir::{Declaration, DeclarationKind, GeneratedUnion, UnionMember};
use crate::naming;
use crate::render;
use crate::schema::{Additional, Primitive, SchemaKind, SchemaNode};
use crate::transform::BOTTOM_TYPE;
use crate::validators;

use discriminator::Resolved;

impl TransformationContext<'_> {
    pub fn generate_union(&mut self, name: &str, node: &SchemaNode) -> Result<GeneratedUnion, LoweringError> {
        let type_name = naming::to_pascal_case(name);
        let (members, is_any_of): (&[SchemaNode], bool) = match &node.kind {
            SchemaKind::OneOf(ms) => (ms, false),
            SchemaKind::AnyOf(ms) => (ms, true),
            _ => (&[], false),
        };

        self.with_segment(&type_name, |ctx| -> Result<GeneratedUnion, LoweringError> {
            if members.is_empty() {
                ctx.degenerate(ctx.options().unions.empty_union, "union has no members")?;
                let content = format!("{}type {} = {};", ctx.options().export_prefix(), type_name, BOTTOM_TYPE);
                return Ok(GeneratedUnion {
                    name: type_name.clone(),
                    discriminator: None,
                    members: Vec::new(),
                    declaration: Declaration::new(&type_name, DeclarationKind::TypeAlias, content),
                    member_declarations: Vec::new(),
                    helpers: Vec::new(),
                });
            }

            let resolved = ctx.resolve_discriminator(node, members, is_any_of);
            let (lowered, deps) = ctx.collect_dependencies(|ctx| match &resolved {
                Some(disc) => ctx.discriminated_members(&type_name, members, disc),
                None => ctx.plain_members(&type_name, members),
            });
            let (lowered, member_declarations) = lowered?;

            let mut expr = render::union_of(&lowered.iter().map(|m| m.type_name.clone()).collect::<Vec<_>>());
            if node.meta.nullable {
                expr = ctx.make_nullable(&expr);
            }
            let mut doc = Vec::new();
            if ctx.options().generate_comments {
                doc.extend(node.meta.description.clone());
                if node.meta.deprecated {
                    doc.push("@deprecated".to_string());
                }
            }
            let content = format!(
                "{}{}type {} = {};",
                render::jsdoc(&doc, ""),
                ctx.options().export_prefix(),
                type_name,
                expr
            );
            let mut dependencies: Vec<String> = deps.into_iter().filter(|d| *d != type_name).collect();
            for decl in &member_declarations {
                if !dependencies.contains(&decl.name) {
                    dependencies.push(decl.name.clone());
                }
            }

            let property = resolved.as_ref().map(|d| d.property.clone());
            let helpers = UnionHelpers { name: &type_name, members: &lowered, property: property.as_deref(), ctx };
            let helpers = helpers.render();

            Ok(GeneratedUnion {
                name: type_name.clone(),
                discriminator: property,
                members: lowered,
                declaration: Declaration::new(&type_name, DeclarationKind::TypeAlias, content)
                    .with_dependencies(dependencies),
                member_declarations,
                helpers,
            })
        })
    }

    fn resolve_discriminator(&self, node: &SchemaNode, members: &[SchemaNode], is_any_of: bool) -> Option<Resolved> {
        let doc = self.document();
        if let Some(disc) = &node.meta.discriminator {
            return Some(discriminator::explicit(doc, disc, members));
        }
        let opts = self.options();
        let enabled = opts.discriminated_unions && (!is_any_of || opts.unions.prefer_discriminated_unions);
        if !enabled {
            return None;
        }
        let inferred = discriminator::infer(doc, members, opts.unions.strict_discrimination);
        match &inferred {
            Some(r) => tracing::debug!(property = %r.property, "inferred discriminator"),
            None => tracing::debug!(path = %self.current_path(), "no discriminator, plain union"),
        }
        inferred
    }

    /// Members named `<Union><Value>`; inline object members become
    /// interfaces with the discriminator pinned to its literal.
    fn discriminated_members(
        &mut self,
        union: &str,
        members: &[SchemaNode],
        disc: &Resolved,
    ) -> Result<(Vec<UnionMember>, Vec<Declaration>), LoweringError> {
        let mut out = Vec::with_capacity(members.len());
        let mut decls = Vec::new();
        for (i, member) in members.iter().enumerate() {
            let value = disc.values.get(i).cloned().flatten();
            let lowered = self.descend(&format!("{}", i + 1), |ctx| -> Result<UnionMember, LoweringError> {
                if let SchemaKind::Ref(reference) = &member.kind {
                    let name = ctx.resolve_ref(reference)?.name;
                    return Ok(member_record(name.clone(), name, value.clone(), member, false));
                }
                let Some(obj) = member.as_object() else {
                    let desc = ctx.transform_type(member)?;
                    let tag = format!("{union}Member{}", i + 1);
                    return Ok(member_record(desc.type_name, tag, value.clone(), member, true));
                };
                let name = match &value {
                    Some(v) => ctx.claim_name(&format!("{union}{}", naming::to_pascal_case(&naming::stringify(v)))),
                    None => ctx.claim_name(&format!("{union}Member{}", i + 1)),
                };
                let mut pinned = obj.clone();
                if let Some(v) = &value {
                    let literal = SchemaNode {
                        kind: SchemaKind::Enum(crate::schema::EnumShape {
                            values: vec![v.clone()],
                            ..Default::default()
                        }),
                        meta: Default::default(),
                    };
                    pinned.properties.insert(disc.property.clone(), literal);
                    if !pinned.is_required(&disc.property) {
                        pinned.required.push(disc.property.clone());
                    }
                }
                let shaped = SchemaNode { kind: SchemaKind::Object(pinned), meta: member.meta.clone() };
                let iface = ctx.generate_interface(&name, &shaped)?;
                let validator = validators::validator_for(&iface, ctx.options().export_prefix());
                decls.push(iface.declaration);
                decls.extend(validator);
                Ok(member_record(name.clone(), name, value.clone(), member, false))
            })?;
            out.push(lowered);
        }
        Ok((out, decls))
    }

    /// Members named `<Union>Member<N>`; complex ones are declared on their own.
    fn plain_members(
        &mut self,
        union: &str,
        members: &[SchemaNode],
    ) -> Result<(Vec<UnionMember>, Vec<Declaration>), LoweringError> {
        let mut out = Vec::with_capacity(members.len());
        let mut decls = Vec::new();
        for (i, member) in members.iter().enumerate() {
            let lowered = self.descend(&format!("{}", i + 1), |ctx| -> Result<UnionMember, LoweringError> {
                let tag = format!("{union}Member{}", i + 1);
                if let SchemaKind::Ref(reference) = &member.kind {
                    let name = ctx.resolve_ref(reference)?.name;
                    return Ok(member_record(name.clone(), name, None, member, false));
                }
                if ctx.inlines(member) {
                    let desc = ctx.transform_type(member)?;
                    return Ok(member_record(desc.type_name, tag, None, member, true));
                }
                let name = ctx.claim_name(&tag);
                if member.is_object() {
                    let iface = ctx.generate_interface(&name, member)?;
                    let validator = validators::validator_for(&iface, ctx.options().export_prefix());
                    decls.push(iface.declaration);
                    decls.extend(validator);
                } else {
                    decls.push(ctx.generate_alias(&name, member)?);
                }
                Ok(member_record(name.clone(), name, None, member, false))
            })?;
            out.push(lowered);
        }
        Ok((out, decls))
    }

    /// Inline when inlining is on and the member stays under the complexity
    /// threshold. Non-object members are always inline.
    pub(crate) fn inlines(&self, member: &SchemaNode) -> bool {
        if !(member.is_object() || member.is_composite()) {
            return true;
        }
        self.options().inline_unions && member.complexity() <= self.options().max_inline_complexity
    }
}

fn member_record(
    type_name: String,
    tag: String,
    value: Option<Value>,
    schema: &SchemaNode,
    is_inline: bool,
) -> UnionMember {
    UnionMember {
        type_name,
        discriminator_value: value,
        complexity: schema.complexity(),
        schema: schema.clone(),
        is_inline,
        tag,
    }
}

// ————————————————————————————————————————————————————————————————————————————
// HELPERS
// ————————————————————————————————————————————————————————————————————————————

struct UnionHelpers<'u, 'c, 'a> {
    name: &'u str,
    members: &'u [UnionMember],
    property: Option<&'u str>,
    ctx: &'c TransformationContext<'a>,
}

impl UnionHelpers<'_, '_, '_> {
    fn render(&self) -> Vec<Declaration> {
        let opts = &self.ctx.options().unions;
        let mut out = Vec::new();
        if opts.generate_helpers {
            for m in self.members {
                out.push(self.guard(m));
            }
            out.push(self.matcher());
            out.push(self.folder());
        }
        if opts.generate_validation {
            if !opts.generate_helpers {
                for m in self.members {
                    out.push(self.guard(m));
                }
            }
            out.push(self.assertion());
        }
        out
    }

    fn export(&self) -> &'static str {
        self.ctx.options().export_prefix()
    }

    fn decl(&self, name: String, content: String) -> Declaration {
        let mut deps = vec![self.name.to_string()];
        for m in self.members {
            if naming::is_identifier(&m.type_name) && !deps.contains(&m.type_name) {
                deps.push(m.type_name.clone());
            }
        }
        Declaration::new(name, DeclarationKind::Function, content).with_dependencies(deps)
    }

    fn guard_name(&self, m: &UnionMember) -> String {
        if m.tag.starts_with(self.name) {
            format!("is{}", m.tag)
        } else {
            format!("is{}{}", self.name, naming::to_pascal_case(&m.tag))
        }
    }

    /// Every member carries a literal for the discriminator.
    fn switchable(&self) -> bool {
        self.property.is_some() && self.members.iter().all(|m| m.discriminator_value.is_some())
    }

    fn guard(&self, m: &UnionMember) -> Declaration {
        let name = self.guard_name(m);
        let check = match (self.property, &m.discriminator_value) {
            (Some(p), Some(v)) => format!(
                "typeof value === \"object\" && value !== null && (value as Record<string, unknown>)[{}] === {}",
                naming::string_literal(p),
                naming::literal(v)
            ),
            _ => self.structural_check(&m.schema),
        };
        let content = format!(
            "{}function {name}(value: unknown): value is {} {{\n  return {check};\n}}",
            self.export(),
            m.type_name
        );
        self.decl(name, content)
    }

    /// `required` presence checks plus `typeof`/array-ness of typed properties.
    fn structural_check(&self, schema: &SchemaNode) -> String {
        let doc = self.ctx.document();
        let Some(resolved) = doc.resolve_deep(schema) else {
            return "true".to_string();
        };
        match &resolved.kind {
            SchemaKind::Object(obj) => {
                let mut checks = vec![
                    "typeof value === \"object\"".to_string(),
                    "value !== null".to_string(),
                    "!Array.isArray(value)".to_string(),
                ];
                for prop in &obj.required {
                    let key = naming::string_literal(prop);
                    checks.push(format!("{key} in value"));
                    let accessor = format!("(value as Record<string, unknown>)[{key}]");
                    let typed = obj
                        .properties
                        .get(prop)
                        .and_then(|p| doc.resolve_deep(p))
                        .and_then(|p| value_check(&p, &accessor));
                    checks.extend(typed);
                }
                if matches!(obj.additional, Additional::Closed) && obj.properties.is_empty() {
                    checks.push("Object.keys(value).length === 0".to_string());
                }
                checks.join(" && ")
            }
            _ => value_check(&resolved, "value").unwrap_or_else(|| "true".to_string()),
        }
    }

    fn handler_key(&self, m: &UnionMember) -> String {
        match (self.switchable(), &m.discriminator_value) {
            (true, Some(v)) => naming::property_key(&naming::stringify(v)),
            _ => naming::to_camel_case(&m.tag),
        }
    }

    fn handler_access(&self, m: &UnionMember, object: &str) -> String {
        let key = self.handler_key(m);
        if naming::is_identifier(&key) { format!("{object}.{key}") } else { format!("{object}[{key}]") }
    }

    fn matcher(&self) -> Declaration {
        let name = format!("match{}", self.name);
        let handlers: Vec<String> =
            self.members.iter().map(|m| format!("{}: (value: {}) => R", self.handler_key(m), m.type_name)).collect();
        let mut body = String::new();
        match self.property.filter(|_| self.switchable()) {
            Some(p) => {
                let access = format!("(value as Record<string, unknown>)[{}]", naming::string_literal(p));
                body.push_str(&format!("  switch ({access}) {{\n"));
                for m in self.members {
                    if let Some(v) = &m.discriminator_value {
                        body.push_str(&format!(
                            "    case {}:\n      return {}(value as {});\n",
                            naming::literal(v),
                            self.handler_access(m, "handlers"),
                            m.type_name
                        ));
                    }
                }
                body.push_str(&format!(
                    "    default:\n      throw new Error(`Unhandled {} variant: ${{String({access})}}`);\n  }}\n",
                    self.name
                ));
            }
            None => {
                for m in self.members {
                    body.push_str(&format!(
                        "  if ({}(value)) {{\n    return {}(value);\n  }}\n",
                        self.guard_name(m),
                        self.handler_access(m, "handlers")
                    ));
                }
                body.push_str(&format!("  throw new Error(\"No {} variant matched\");\n", self.name));
            }
        }
        let content = format!(
            "{}function {name}<R>(\n  value: {},\n  handlers: {{ {} }},\n): R {{\n{body}}}",
            self.export(),
            self.name,
            handlers.join("; ")
        );
        self.decl(name, content)
    }

    fn folder(&self) -> Declaration {
        let name = format!("fold{}", self.name);
        let reducers: Vec<String> = self
            .members
            .iter()
            .map(|m| format!("{}: (acc: R, value: {}) => R", self.handler_key(m), m.type_name))
            .collect();
        let mut dispatch = String::new();
        for m in self.members {
            dispatch.push_str(&format!(
                "      {}: (v) => {}(acc, v),\n",
                self.handler_key(m),
                self.handler_access(m, "reducers")
            ));
        }
        let content = format!(
            "{}function {name}<R>(\n  values: readonly {}[],\n  initial: R,\n  reducers: {{ {} }},\n): R {{\n  let acc = initial;\n  for (const value of values) {{\n    acc = match{}<R>(value, {{\n{dispatch}    }});\n  }}\n  return acc;\n}}",
            self.export(),
            self.name,
            reducers.join("; "),
            self.name
        );
        self.decl(name, content)
    }

    fn assertion(&self) -> Declaration {
        let name = format!("assert{}", self.name);
        let guards: Vec<String> = self.members.iter().map(|m| format!("{}(value)", self.guard_name(m))).collect();
        let content = format!(
            "{}function {name}(value: unknown): asserts value is {n} {{\n  if (!({})) {{\n    throw new TypeError(\"Value is not a valid {n}\");\n  }}\n}}",
            self.export(),
            guards.join(" || "),
            n = self.name
        );
        self.decl(name, content)
    }
}

/// Runtime check for a primitive, array or literal schema against `expr`.
fn value_check(schema: &SchemaNode, expr: &str) -> Option<String> {
    let check = match &schema.kind {
        SchemaKind::Primitive(Primitive::String) => format!("typeof {expr} === \"string\""),
        SchemaKind::Primitive(Primitive::Number | Primitive::Integer) => format!("typeof {expr} === \"number\""),
        SchemaKind::Primitive(Primitive::Boolean) => format!("typeof {expr} === \"boolean\""),
        SchemaKind::Primitive(Primitive::Null) => format!("{expr} === null"),
        SchemaKind::Array(_) => format!("Array.isArray({expr})"),
        SchemaKind::Enum(e) if !e.values.is_empty() => {
            let literals: Vec<String> = e.values.iter().map(naming::literal).collect();
            format!("([{}] as readonly unknown[]).includes({expr})", literals.join(", "))
        }
        _ => return None,
    };
    if schema.meta.nullable {
        Some(format!("({expr} === null || {check})"))
    } else {
        Some(check)
    }
}
