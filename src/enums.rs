//! `enum` lists → literal unions, TS enums, const tuples or branded types.
//!
//! Every strategy shares one key derivation and one helper set, so switching
//! `enumType` changes the shape of the declaration and nothing else.
use serde_json::Value;

use crate::context::TransformationContext;
use crate::error::LoweringError;
use crate::ir::{Declaration, DeclarationKind, EnumValue, GeneratedEnum};
use crate::naming;
use crate::options::{EnumStrategy, KeyCase};
use crate::render;
use crate::schema::{EnumShape, SchemaKind, SchemaNode};
use crate::transform::BOTTOM_TYPE;

impl TransformationContext<'_> {
    pub fn generate_enum(&mut self, name: &str, node: &SchemaNode) -> Result<GeneratedEnum, LoweringError> {
        let type_name = naming::to_pascal_case(name);
        let empty = EnumShape::default();
        let shape = match &node.kind {
            SchemaKind::Enum(shape) => shape,
            _ => &empty,
        };

        self.with_segment(&type_name, |ctx| -> Result<GeneratedEnum, LoweringError> {
            let values = ctx.enum_values(shape);
            if values.is_empty() {
                ctx.degenerate(ctx.options().enums.empty_enum, "enum has no values")?;
                let content = format!("{}type {} = {};", ctx.options().export_prefix(), type_name, BOTTOM_TYPE);
                return Ok(GeneratedEnum {
                    declaration: Declaration::new(&type_name, DeclarationKind::TypeAlias, content),
                    name: type_name.clone(),
                    values,
                    companions: Vec::new(),
                    helpers: Vec::new(),
                    mappings: Vec::new(),
                });
            }

            let mut strategy = ctx.options().enum_type;
            let numeric_or_string = values
                .iter()
                .all(|v| v.original_value.is_string() || v.original_value.is_number());
            if strategy == EnumStrategy::Enum && !numeric_or_string {
                ctx.warn(format!("`{type_name}` has non string/number values; lowered as a literal union"));
                strategy = EnumStrategy::Union;
            }
            tracing::debug!(name = %type_name, ?strategy, values = values.len(), "lowering enum");

            let lowered = EnumRender {
                name: &type_name,
                values: &values,
                export: ctx.options().export_prefix(),
                docs: ctx.options().generate_comments,
            };
            let (declaration, companions) = match strategy {
                EnumStrategy::Union => lowered.literal_union(&node.meta),
                EnumStrategy::Enum => lowered.ts_enum(&node.meta),
                EnumStrategy::Const => lowered.const_tuple(&node.meta),
                EnumStrategy::Branded => lowered.branded(&node.meta),
            };

            let opts = &ctx.options().enums;
            let mut helpers = Vec::new();
            if opts.generate_helpers {
                if strategy != EnumStrategy::Const {
                    helpers.push(lowered.values_array());
                }
                helpers.push(lowered.guard());
                helpers.push(lowered.parser());
                helpers.push(lowered.parser_with_default(node.meta.default.as_ref()));
                if values.iter().any(|v| v.description.is_some()) {
                    helpers.push(lowered.description_lookup());
                }
            }
            if opts.generate_validation {
                helpers.push(lowered.assertion());
            }
            let mappings = if opts.generate_mapping { lowered.mappings() } else { Vec::new() };

            Ok(GeneratedEnum {
                name: type_name.clone(),
                values,
                declaration,
                companions,
                helpers,
                mappings,
            })
        })
    }

    /// Ordered values with derived keys. Keys are unique within one enum.
    pub fn enum_values(&self, shape: &EnumShape) -> Vec<EnumValue> {
        let opts = &self.options().enums;
        let mut values: Vec<EnumValue> = shape
            .values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let base = match shape.varnames.get(i) {
                    Some(varname) => varname.clone(),
                    None => match opts.key_case {
                        KeyCase::UpperSnake => naming::to_upper_snake(&naming::stringify(v)),
                        KeyCase::Preserve => naming::stringify(v),
                    },
                };
                EnumValue {
                    key: naming::sanitize_identifier(&format!("{}{}{}", opts.key_prefix, base, opts.key_suffix)),
                    value: naming::literal(v),
                    original_value: v.clone(),
                    description: shape.descriptions.get(i).cloned().flatten(),
                    deprecated: shape.deprecated.contains(v),
                }
            })
            .collect();

        if opts.sort_values {
            values.sort_by_key(|v| naming::stringify(&v.original_value));
        }

        let mut seen = std::collections::HashSet::new();
        for v in &mut values {
            if !seen.insert(v.key.clone()) {
                let mut n = 2;
                while !seen.insert(format!("{}_{n}", v.key)) {
                    n += 1;
                }
                v.key = format!("{}_{n}", v.key);
            }
        }
        values
    }
}

/// Text builders for one enum.
struct EnumRender<'a> {
    name: &'a str,
    values: &'a [EnumValue],
    export: &'static str,
    docs: bool,
}

impl EnumRender<'_> {
    fn header(&self, meta: &crate::schema::SchemaMeta) -> String {
        if !self.docs {
            return String::new();
        }
        let mut lines = Vec::new();
        lines.extend(meta.description.clone());
        if meta.deprecated {
            lines.push("@deprecated".to_string());
        }
        render::jsdoc(&lines, "")
    }

    fn member_doc(&self, v: &EnumValue) -> String {
        if !self.docs {
            return String::new();
        }
        let mut lines = Vec::new();
        lines.extend(v.description.clone());
        if v.deprecated {
            lines.push("@deprecated".to_string());
        }
        render::jsdoc(&lines, "  ")
    }

    fn literals(&self) -> Vec<String> {
        self.values.iter().map(|v| v.value.clone()).collect()
    }

    fn helper(&self, name: String, content: String) -> Declaration {
        Declaration::new(name, DeclarationKind::Function, content).with_dependencies(vec![self.name.to_string()])
    }

    /// `export const Name = { KEY: value, ... } as const;`
    fn value_map(&self, cast: bool) -> Declaration {
        let mut body = String::new();
        for v in self.values {
            body.push_str(&self.member_doc(v));
            if cast {
                body.push_str(&format!("  {}: {} as {},\n", v.key, v.value, self.name));
            } else {
                body.push_str(&format!("  {}: {},\n", v.key, v.value));
            }
        }
        let content = format!("{}const {} = {{\n{}}} as const;", self.export, self.name, body);
        Declaration::new(self.name, DeclarationKind::Const, content).with_dependencies(vec![self.name.to_string()])
    }

    fn literal_union(&self, meta: &crate::schema::SchemaMeta) -> (Declaration, Vec<Declaration>) {
        let content = format!(
            "{}{}type {} = {};",
            self.header(meta),
            self.export,
            self.name,
            render::union_of(&self.literals())
        );
        (Declaration::new(self.name, DeclarationKind::TypeAlias, content), vec![self.value_map(false)])
    }

    fn ts_enum(&self, meta: &crate::schema::SchemaMeta) -> (Declaration, Vec<Declaration>) {
        let mut body = String::new();
        for v in self.values {
            body.push_str(&self.member_doc(v));
            body.push_str(&format!("  {} = {},\n", v.key, v.value));
        }
        let content = format!("{}{}enum {} {{\n{}}}", self.header(meta), self.export, self.name, body);
        (Declaration::new(self.name, DeclarationKind::Enum, content), Vec::new())
    }

    fn const_tuple(&self, meta: &crate::schema::SchemaMeta) -> (Declaration, Vec<Declaration>) {
        let values_name = format!("{}Values", self.name);
        let tuple = format!(
            "{}const {} = [{}] as const;",
            self.export,
            values_name,
            self.literals().join(", ")
        );
        let content = format!(
            "{}{}type {} = (typeof {})[number];",
            self.header(meta),
            self.export,
            self.name,
            values_name
        );
        (
            Declaration::new(self.name, DeclarationKind::TypeAlias, content)
                .with_dependencies(vec![values_name.clone()]),
            vec![Declaration::new(values_name, DeclarationKind::Const, tuple), self.value_map(false)],
        )
    }

    fn branded(&self, meta: &crate::schema::SchemaMeta) -> (Declaration, Vec<Declaration>) {
        let brand = format!("{}Brand", naming::to_camel_case(self.name));
        let content = format!(
            "declare const {brand}: unique symbol;\n{}{}type {} = ({}) & {{ readonly [{brand}]: {} }};",
            self.header(meta),
            self.export,
            self.name,
            render::union_of(&self.literals()),
            naming::string_literal(self.name)
        );
        (Declaration::new(self.name, DeclarationKind::TypeAlias, content), vec![self.value_map(true)])
    }

    fn values_array(&self) -> Declaration {
        let name = format!("{}Values", self.name);
        let members: Vec<String> = self.values.iter().map(|v| format!("{}.{}", self.name, v.key)).collect();
        let content = format!(
            "{}const {}: readonly {}[] = [{}];",
            self.export,
            name,
            self.name,
            members.join(", ")
        );
        Declaration::new(name, DeclarationKind::Const, content).with_dependencies(vec![self.name.to_string()])
    }

    fn guard(&self) -> Declaration {
        let name = format!("is{}", self.name);
        let content = format!(
            "{}function {name}(value: unknown): value is {n} {{\n  return ({n}Values as readonly unknown[]).includes(value);\n}}",
            self.export,
            n = self.name
        );
        self.helper(name, content)
    }

    fn parser(&self) -> Declaration {
        let name = format!("parse{}", self.name);
        let content = format!(
            "{}function {name}(value: unknown): {n} | null {{\n  return is{n}(value) ? value : null;\n}}",
            self.export,
            n = self.name
        );
        self.helper(name, content)
    }

    /// Fallback is the schema `default` when it is one of the values, else the first value.
    fn parser_with_default(&self, default: Option<&Value>) -> Declaration {
        let name = format!("parse{}OrDefault", self.name);
        let fallback = default
            .and_then(|d| self.values.iter().find(|v| &v.original_value == d))
            .unwrap_or(&self.values[0]);
        let content = format!(
            "{}function {name}(value: unknown, fallback: {n} = {n}.{key}): {n} {{\n  return is{n}(value) ? value : fallback;\n}}",
            self.export,
            n = self.name,
            key = fallback.key
        );
        self.helper(name, content)
    }

    fn description_lookup(&self) -> Declaration {
        let name = format!("get{}Description", self.name);
        let mut cases = String::new();
        for v in self.values {
            if let Some(d) = &v.description {
                cases.push_str(&format!(
                    "    case {}.{}:\n      return {};\n",
                    self.name,
                    v.key,
                    naming::string_literal(d)
                ));
            }
        }
        let content = format!(
            "{}function {name}(value: {n}): string | undefined {{\n  switch (value) {{\n{cases}    default:\n      return undefined;\n  }}\n}}",
            self.export,
            n = self.name
        );
        self.helper(name, content)
    }

    fn assertion(&self) -> Declaration {
        let name = format!("assert{}", self.name);
        let content = format!(
            "{}function {name}(value: unknown): asserts value is {n} {{\n  if (!is{n}(value)) {{\n    throw new TypeError(`Invalid {n}: ${{String(value)}}`);\n  }}\n}}",
            self.export,
            n = self.name
        );
        self.helper(name, content)
    }

    /// Value → display name and value → key maps, keyed by the stringified value.
    fn mappings(&self) -> Vec<Declaration> {
        let display_name = format!("{}DisplayNames", self.name);
        let keys_name = format!("{}Keys", self.name);
        let mut display = String::new();
        let mut keys = String::new();
        for v in self.values {
            let raw = naming::stringify(&v.original_value);
            let prop = naming::property_key(&raw);
            display.push_str(&format!("  {prop}: {},\n", naming::string_literal(&naming::to_display_name(&raw))));
            keys.push_str(&format!("  {prop}: {},\n", naming::string_literal(&v.key)));
        }
        let deps = vec![self.name.to_string()];
        vec![
            Declaration::new(
                &display_name,
                DeclarationKind::Const,
                format!("{}const {display_name}: Readonly<Record<string, string>> = {{\n{display}}};", self.export),
            )
            .with_dependencies(deps.clone()),
            Declaration::new(
                &keys_name,
                DeclarationKind::Const,
                format!(
                    "{}const {keys_name}: Readonly<Record<string, keyof typeof {}>> = {{\n{keys}}};",
                    self.export, self.name
                ),
            )
            .with_dependencies(deps),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{DegeneratePolicy, Options};
    use crate::schema::SchemaDocument;
    use serde_json::json;

    fn run(opts: &Options, schema: Value) -> Result<GeneratedEnum, LoweringError> {
        let d = SchemaDocument::from_value(json!({"components": {"schemas": {"Status": schema}}})).unwrap();
        let node = d.get_named("Status").unwrap().node.clone();
        let mut ctx = TransformationContext::new(&d, opts);
        ctx.generate_enum("Status", &node)
    }

    fn names(e: &GeneratedEnum) -> Vec<String> {
        e.declarations().into_iter().map(|d| d.name).collect()
    }

    #[test]
    fn union_strategy_with_companion_map() {
        let e = run(&Options::default(), json!({"enum": ["active", "inactive"]})).unwrap();
        assert_eq!(e.declaration.content, "export type Status = \"active\" | \"inactive\";");
        let map = &e.companions[0].content;
        assert!(map.contains("  ACTIVE: \"active\",\n"));
        assert!(map.contains("  INACTIVE: \"inactive\",\n"));
        assert!(map.ends_with("} as const;"));
        assert_eq!(
            names(&e),
            vec!["Status", "Status", "StatusValues", "isStatus", "parseStatus", "parseStatusOrDefault"]
        );
    }

    #[test]
    fn enum_strategy_declares_members() {
        let opts = Options::default().enum_type(EnumStrategy::Enum);
        let e = run(&opts, json!({"enum": ["in-progress", 2]})).unwrap();
        assert_eq!(e.declaration.kind, DeclarationKind::Enum);
        assert_eq!(e.declaration.content, "export enum Status {\n  IN_PROGRESS = \"in-progress\",\n  _2 = 2,\n}");
        assert!(e.companions.is_empty());
    }

    #[test]
    fn enum_strategy_falls_back_for_booleans() {
        let opts = Options::default().enum_type(EnumStrategy::Enum);
        let d = SchemaDocument::from_value(json!({"$defs": {"Flag": {"enum": [true, false]}}})).unwrap();
        let node = d.get_named("Flag").unwrap().node.clone();
        let mut ctx = TransformationContext::new(&d, &opts);
        let e = ctx.generate_enum("Flag", &node).unwrap();
        assert_eq!(e.declaration.content, "export type Flag = true | false;");
        assert_eq!(ctx.warnings().len(), 1);
    }

    #[test]
    fn const_strategy_derives_type_from_tuple() {
        let opts = Options::default().enum_type(EnumStrategy::Const);
        let e = run(&opts, json!({"enum": ["a", "b"]})).unwrap();
        assert_eq!(e.declaration.content, "export type Status = (typeof StatusValues)[number];");
        assert_eq!(e.companions[0].content, "export const StatusValues = [\"a\", \"b\"] as const;");
        assert!(!e.helpers.iter().any(|h| h.name == "StatusValues"));
    }

    #[test]
    fn branded_strategy_casts_through_map() {
        let opts = Options::default().enum_type(EnumStrategy::Branded);
        let e = run(&opts, json!({"enum": ["a"]})).unwrap();
        assert_eq!(
            e.declaration.content,
            "declare const statusBrand: unique symbol;\nexport type Status = (\"a\") & { readonly [statusBrand]: \"Status\" };"
        );
        assert!(e.companions[0].content.contains("  A: \"a\" as Status,\n"));
    }

    #[test]
    fn keys_are_sanitized_and_unique() {
        let mut opts = Options::default();
        opts.enums.key_prefix = "K_".into();
        let e = run(&opts, json!({"enum": ["a b", "a-b", "1"]})).unwrap();
        let keys: Vec<&str> = e.values.iter().map(|v| v.key.as_str()).collect();
        assert_eq!(keys, vec!["K_A_B", "K_A_B_2", "K_1"]);

        let e = run(&Options::default(), json!({"enum": ["9lives"]})).unwrap();
        assert_eq!(e.values[0].key, "_9LIVES");
    }

    #[test]
    fn varnames_override_keys() {
        let e = run(&Options::default(), json!({"enum": [1, 2], "x-enum-varnames": ["Low", "High"]})).unwrap();
        let keys: Vec<&str> = e.values.iter().map(|v| v.key.as_str()).collect();
        assert_eq!(keys, vec!["Low", "High"]);
    }

    #[test]
    fn sorting_is_stable() {
        let mut opts = Options::default();
        opts.enums.sort_values = true;
        let e = run(&opts, json!({"enum": ["b", "a", "c"]})).unwrap();
        let vals: Vec<&str> = e.values.iter().map(|v| v.value.as_str()).collect();
        assert_eq!(vals, vec!["\"a\"", "\"b\"", "\"c\""]);
    }

    #[test]
    fn description_lookup_only_with_descriptions() {
        let e = run(
            &Options::default(),
            json!({"enum": ["a", "b"], "x-enum-descriptions": ["First", null]}),
        )
        .unwrap();
        let lookup = e.helpers.iter().find(|h| h.name == "getStatusDescription").unwrap();
        assert!(lookup.content.contains("    case Status.A:\n      return \"First\";\n"));
        assert!(!lookup.content.contains("Status.B"));
    }

    #[test]
    fn default_value_feeds_parser_fallback() {
        let e = run(&Options::default(), json!({"enum": ["a", "b"], "default": "b"})).unwrap();
        let parser = e.helpers.iter().find(|h| h.name == "parseStatusOrDefault").unwrap();
        assert!(parser.content.contains("fallback: Status = Status.B"));
    }

    #[test]
    fn mappings_and_validation_when_enabled() {
        let mut opts = Options::default();
        opts.enums.generate_mapping = true;
        opts.enums.generate_validation = true;
        let e = run(&opts, json!({"enum": ["in_progress"]})).unwrap();
        assert!(e.helpers.iter().any(|h| h.name == "assertStatus"));
        assert!(e.mappings[0].content.contains("  in_progress: \"In Progress\",\n"));
        assert!(e.mappings[1].content.contains("  in_progress: \"IN_PROGRESS\",\n"));
    }

    #[test]
    fn empty_enum_follows_policy() {
        let e = run(&Options::default(), json!({"enum": []})).unwrap();
        assert_eq!(e.declaration.content, "export type Status = never;");
        assert!(e.helpers.is_empty());

        let mut opts = Options::default();
        opts.enums.empty_enum = DegeneratePolicy::Error;
        let err = run(&opts, json!({"enum": []})).unwrap_err();
        assert_eq!(err.kind(), "DegenerateInputError");
    }
}
