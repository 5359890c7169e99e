//! Utility aliases and structural helpers derived for composed types.
use indexmap::IndexMap;

use crate::context::TransformationContext;
use crate::naming;
use crate::schema::{SchemaDocument, SchemaKind, SchemaNode};

/// Property view of an object-shaped composite, with `allOf` members and
/// `$ref`s flattened in declaration order.
#[derive(Debug, Default, PartialEq)]
pub struct FlatShape {
    pub properties: IndexMap<String, SchemaNode>,
    pub required: Vec<String>,
}

const MAX_HOPS: usize = 16;

/// `None` when the node is not object-shaped (or only reachable through
/// an alias chain longer than the hop bound).
pub fn flatten(doc: &SchemaDocument, node: &SchemaNode) -> Option<FlatShape> {
    flatten_bounded(doc, node, MAX_HOPS)
}

fn flatten_bounded(doc: &SchemaDocument, node: &SchemaNode, hops: usize) -> Option<FlatShape> {
    if hops == 0 {
        return None;
    }
    let node = doc.resolve_deep(node)?;
    match &node.kind {
        SchemaKind::Object(obj) => Some(FlatShape {
            properties: obj.properties.clone(),
            required: obj.required.clone(),
        }),
        SchemaKind::AllOf(members) => {
            let mut flat = FlatShape::default();
            let mut any = false;
            for member in members {
                if let Some(part) = flatten_bounded(doc, member, hops - 1) {
                    any = true;
                    flat.properties.extend(part.properties);
                    for r in part.required {
                        if !flat.required.contains(&r) {
                            flat.required.push(r);
                        }
                    }
                }
            }
            any.then_some(flat)
        }
        _ => None,
    }
}

impl FlatShape {
    /// Some property is itself object-shaped.
    fn has_nested_objects(&self, doc: &SchemaDocument) -> bool {
        self.properties.values().any(|p| flatten_bounded(doc, p, 2).is_some())
    }
}

impl TransformationContext<'_> {
    /// `Partial`/`Required`/`Readonly` aliases; for object shapes also the
    /// keys union, `Pick`/`Omit` constrained to it, and a deep partial when
    /// a property is object-shaped.
    pub fn utility_types(&self, name: &str, node: &SchemaNode) -> Vec<String> {
        let export = self.options().export_prefix();
        let mut out: Vec<String> = ["Partial", "Required", "Readonly"]
            .iter()
            .map(|u| format!("{export}type {u}{name} = {u}<{name}>;"))
            .collect();

        let Some(flat) = flatten(self.document(), node) else {
            return out;
        };
        if !flat.properties.is_empty() {
            let keys: Vec<String> = flat.properties.keys().map(|k| naming::string_literal(k)).collect();
            out.push(format!("{export}type {name}Keys = {};", keys.join(" | ")));
            out.push(format!("{export}type Pick{name}<K extends {name}Keys> = Pick<{name}, K>;"));
            out.push(format!("{export}type Omit{name}<K extends {name}Keys> = Omit<{name}, K>;"));
        }
        if flat.has_nested_objects(self.document()) {
            out.push(format!(
                "{export}type DeepPartial{name}<T = {name}> = {{\n  [P in keyof T]?: T[P] extends object ? DeepPartial{name}<T[P]> : T[P];\n}};"
            ));
        }
        out
    }

    /// Structural guard and merge for object shapes; deep clone when nested.
    pub fn structural_helpers(&self, name: &str, node: &SchemaNode) -> Vec<String> {
        let export = self.options().export_prefix();
        let Some(flat) = flatten(self.document(), node) else {
            return Vec::new();
        };
        let mut checks = vec![
            "typeof value === \"object\"".to_string(),
            "value !== null".to_string(),
            "!Array.isArray(value)".to_string(),
        ];
        checks.extend(flat.required.iter().map(|r| format!("{} in value", naming::string_literal(r))));

        let mut out = vec![format!(
            "{export}function is{name}(value: unknown): value is {name} {{\n  return {};\n}}",
            checks.join(" && ")
        )];
        if flat.has_nested_objects(self.document()) {
            out.push(format!(
                "{export}function clone{name}(value: {name}): {name} {{\n  return structuredClone(value);\n}}"
            ));
        }
        out.push(format!(
            "{export}function merge{name}(base: {name}, patch: Partial<{name}>): {name} {{\n  return {{ ...base, ...patch }};\n}}"
        ));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::declared_name;
    use crate::options::Options;
    use serde_json::json;

    fn doc() -> SchemaDocument {
        SchemaDocument::from_value(json!({"components": {"schemas": {
            "Base": {"properties": {"id": {"type": "string"}}, "required": ["id"]},
            "Pet": {"allOf": [
                {"$ref": "#/components/schemas/Base"},
                {"properties": {"owner": {"properties": {"name": {"type": "string"}}}}}
            ]},
            "Flat": {"properties": {"n": {"type": "number"}}},
            "Name": {"type": "string"}
        }}}))
        .unwrap()
    }

    #[test]
    fn flatten_merges_all_of_members_through_refs() {
        let d = doc();
        let flat = flatten(&d, &d.get_named("Pet").unwrap().node).unwrap();
        let keys: Vec<&str> = flat.properties.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["id", "owner"]);
        assert_eq!(flat.required, vec!["id"]);
        assert!(flatten(&d, &d.get_named("Name").unwrap().node).is_none());
    }

    #[test]
    fn utility_aliases_for_object_composites() {
        let d = doc();
        let opts = Options::default();
        let ctx = TransformationContext::new(&d, &opts);
        let out = ctx.utility_types("Pet", &d.get_named("Pet").unwrap().node);
        let names: Vec<String> = out.iter().filter_map(|t| declared_name(t)).collect();
        assert_eq!(
            names,
            vec!["PartialPet", "RequiredPet", "ReadonlyPet", "PetKeys", "PickPet", "OmitPet", "DeepPartialPet"]
        );
        assert_eq!(out[3], "export type PetKeys = \"id\" | \"owner\";");

        let flat = ctx.utility_types("Flat", &d.get_named("Flat").unwrap().node);
        assert!(!flat.iter().any(|t| t.contains("DeepPartial")));
        assert_eq!(ctx.utility_types("Name", &d.get_named("Name").unwrap().node).len(), 3);
    }

    #[test]
    fn helpers_guard_clone_merge() {
        let d = doc();
        let opts = Options::default();
        let ctx = TransformationContext::new(&d, &opts);
        let out = ctx.structural_helpers("Pet", &d.get_named("Pet").unwrap().node);
        assert_eq!(out.len(), 3);
        assert!(out[0].contains("!Array.isArray(value) && \"id\" in value;"));
        assert!(out[1].contains("structuredClone(value)"));
        assert!(out[2].contains("return { ...base, ...patch };"));

        let flat = ctx.structural_helpers("Flat", &d.get_named("Flat").unwrap().node);
        assert_eq!(flat.len(), 2);
        assert!(ctx.structural_helpers("Name", &d.get_named("Name").unwrap().node).is_empty());
    }
}
