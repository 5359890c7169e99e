//! Declaration ordering and module text.
//!
//! Declarations sharing a name (a type plus its companion value) stay
//! together. A referenced name is written before its referrer; a cycle is
//! cut at its first back edge.
use indexmap::{IndexMap, IndexSet};

use crate::ir::Declaration;

/// `// Generated ...` header stamped with the current UTC time.
pub fn banner(source: &str) -> String {
    let now = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    format!("// Generated by schema-lower from {source} at {now}.\n// Do not edit by hand.\n")
}

/// Declarations in dependency order, exact duplicates dropped.
pub fn order_declarations(declarations: &[Declaration]) -> Vec<&Declaration> {
    let mut groups: IndexMap<&str, Vec<&Declaration>> = IndexMap::new();
    for decl in declarations {
        let group = groups.entry(decl.name.as_str()).or_default();
        if !group.iter().any(|d| d.content == decl.content) {
            group.push(decl);
        }
    }

    let mut done: IndexSet<&str> = IndexSet::new();
    let mut on_stack: IndexSet<&str> = IndexSet::new();
    for name in groups.keys() {
        visit(*name, &groups, &mut done, &mut on_stack);
    }
    done.iter().flat_map(|name| groups[name].iter().copied()).collect()
}

fn visit<'d>(
    name: &'d str,
    groups: &IndexMap<&'d str, Vec<&'d Declaration>>,
    done: &mut IndexSet<&'d str>,
    on_stack: &mut IndexSet<&'d str>,
) {
    if done.contains(name) || on_stack.contains(name) {
        return;
    }
    on_stack.insert(name);
    if let Some(group) = groups.get(name) {
        for decl in group {
            for dep in &decl.dependencies {
                if let Some((key, _)) = groups.get_key_value(dep.as_str()) {
                    visit(*key, groups, done, on_stack);
                }
            }
        }
    }
    on_stack.shift_remove(name);
    done.insert(name);
}

/// One TypeScript module: optional banner, then ordered declarations
/// separated by blank lines.
pub fn render_module(declarations: &[Declaration], banner: Option<&str>) -> String {
    let mut out = String::new();
    if let Some(b) = banner {
        out.push_str(b);
        out.push('\n');
    }
    let ordered = order_declarations(declarations);
    let body: Vec<&str> = ordered.iter().map(|d| d.content.as_str()).collect();
    out.push_str(&body.join("\n\n"));
    if !body.is_empty() {
        out.push('\n');
    }
    out
}
