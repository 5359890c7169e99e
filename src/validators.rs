//! Compiles [`ValidationRule`]s into TypeScript check expressions and
//! per-interface `validate<Name>` functions.
use crate::ir::{Declaration, DeclarationKind, GeneratedInterface, PropertyDecl, RuleKind, ValidationRule};
use crate::naming;

const EMAIL: &str = r"/^[^\s@]+@[^\s@]+\.[^\s@]+$/";
const URL: &str = r"/^[a-zA-Z][a-zA-Z\d+.-]*:\/\/[^\s]+$/";

/// Boolean expression that holds when `accessor` satisfies `rule`.
pub fn check_expression(rule: &ValidationRule, accessor: &str) -> String {
    match rule.kind {
        RuleKind::MinLength => format!("{accessor}.length >= {}", rule.value),
        RuleKind::MaxLength => format!("{accessor}.length <= {}", rule.value),
        RuleKind::Min => format!("{accessor} >= {}", rule.value),
        RuleKind::Max => format!("{accessor} <= {}", rule.value),
        RuleKind::Pattern => {
            let pattern = rule.value.as_str().unwrap_or_default();
            format!("new RegExp({}).test({accessor})", naming::string_literal(pattern))
        }
        RuleKind::Email => format!("{EMAIL}.test({accessor})"),
        RuleKind::Url => format!("{URL}.test({accessor})"),
    }
}

fn accessor(property: &str) -> String {
    if naming::is_identifier(property) {
        format!("value.{property}")
    } else {
        format!("value[{}]", naming::string_literal(property))
    }
}

fn property_checks(p: &PropertyDecl) -> String {
    let access = accessor(&p.name);
    let guard = if !p.required || p.descriptor.is_nullable { format!("{access} != null && ") } else { String::new() };
    let mut out = String::new();
    for rule in &p.rules {
        out.push_str(&format!(
            "  if ({guard}!({})) {{\n    errors.push({});\n  }}\n",
            check_expression(rule, &access),
            naming::string_literal(&rule.message)
        ));
    }
    out
}

/// `validate<Name>(value): string[]` collecting every failed rule's message.
/// `None` when no property carries rules.
pub fn validator_for(iface: &GeneratedInterface, export: &str) -> Option<Declaration> {
    validator_for_properties(&iface.name, &iface.properties, export)
}

/// Same as [`validator_for`], for interfaces whose body was rendered elsewhere
/// (composed types).
pub fn validator_for_properties(
    type_name: &str,
    properties: &[PropertyDecl],
    export: &str,
) -> Option<Declaration> {
    if properties.iter().all(|p| p.rules.is_empty()) {
        return None;
    }
    let name = format!("validate{type_name}");
    let body: String = properties.iter().map(property_checks).collect();
    let content = format!(
        "{export}function {name}(value: {type_name}): string[] {{\n  const errors: string[] = [];\n{body}  return errors;\n}}"
    );
    Some(Declaration::new(name, DeclarationKind::Function, content).with_dependencies(vec![type_name.to_string()]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TransformationContext;
    use crate::options::{InterfaceOptions, Options};
    use crate::schema::SchemaDocument;
    use serde_json::json;

    fn rule(kind: RuleKind, value: serde_json::Value) -> ValidationRule {
        ValidationRule { kind, value, message: String::new() }
    }

    #[test]
    fn one_expression_per_rule_kind() {
        assert_eq!(check_expression(&rule(RuleKind::MinLength, json!(2)), "v"), "v.length >= 2");
        assert_eq!(check_expression(&rule(RuleKind::MaxLength, json!(9)), "v"), "v.length <= 9");
        assert_eq!(check_expression(&rule(RuleKind::Min, json!(0.5)), "v"), "v >= 0.5");
        assert_eq!(check_expression(&rule(RuleKind::Max, json!(10.0)), "v"), "v <= 10.0");
        assert_eq!(
            check_expression(&rule(RuleKind::Pattern, json!("^a\\d$")), "v"),
            "new RegExp(\"^a\\\\d$\").test(v)"
        );
        assert!(check_expression(&rule(RuleKind::Email, json!(true)), "v").ends_with(".test(v)"));
        assert!(check_expression(&rule(RuleKind::Url, json!(true)), "v").ends_with(".test(v)"));
    }

    #[test]
    fn validator_guards_optional_properties() {
        let d = SchemaDocument::from_value(json!({"$defs": {"User": {
            "properties": {
                "name": {"type": "string", "minLength": 1},
                "content-type": {"type": "string", "pattern": "^text/"},
                "plain": {"type": "string"}
            },
            "required": ["name"]
        }}}))
        .unwrap();
        let opts = Options { interfaces: InterfaceOptions { generate_validation: true }, ..Options::default() };
        let mut ctx = TransformationContext::new(&d, &opts);
        let node = d.get_named("User").unwrap().node.clone();
        let iface = ctx.generate_interface("User", &node).unwrap();
        let v = validator_for(&iface, "export ").unwrap();
        assert_eq!(v.name, "validateUser");
        assert!(v.content.contains("  if (!(value.name.length >= 1)) {\n    errors.push(\"name must be at least 1 characters\");\n  }\n"));
        assert!(v.content.contains("if (value[\"content-type\"] != null && !(new RegExp(\"^text/\").test(value[\"content-type\"])))"));
        assert!(!v.content.contains("value.plain"));
    }

    #[test]
    fn no_rules_no_validator() {
        let d = SchemaDocument::from_value(json!({"$defs": {"T": {"properties": {"a": {"type": "string"}}}}})).unwrap();
        let opts = Options::default();
        let mut ctx = TransformationContext::new(&d, &opts);
        let node = d.get_named("T").unwrap().node.clone();
        let iface = ctx.generate_interface("T", &node).unwrap();
        assert!(validator_for(&iface, "export ").is_none());
    }
}
