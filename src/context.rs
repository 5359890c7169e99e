//! Per-run transformation state.
//!
//! A [`TransformationContext`] is built fresh for every generation run and
//! threaded by `&mut` through every lowering call. Nothing here is global.
use std::collections::HashSet;

use indexmap::{IndexMap, IndexSet};

use crate::error::LoweringError;
use crate::ir::Declaration;
use crate::options::Options;
use crate::schema::SchemaDocument;

pub struct TransformationContext<'a> {
    document: &'a SchemaDocument,
    options: &'a Options,

    /// Name segments from the named schema down to the node being lowered.
    current_path: Vec<String>,
    /// Refs whose resolution is on the active call stack.
    visited_refs: IndexSet<String>,
    /// ref → resolved type name. Only grows during a run.
    generated_types: IndexMap<String, String>,
    /// Named types referenced by the declaration currently being built.
    dependencies: IndexSet<String>,
    /// Composition nesting below the current named schema.
    depth: usize,
    /// Type names already taken (named schemas + generated intermediates).
    used_names: HashSet<String>,
    /// Aliases emitted for refs that point below a named schema.
    pointer_declarations: Vec<Declaration>,
    warnings: Vec<String>,
}

/// The run-scoped results that outlive a context: the memo table plus
/// anything emitted on the side. Per-worker tables merge into one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoTable {
    pub generated_types: IndexMap<String, String>,
    pub pointer_declarations: Vec<Declaration>,
    pub warnings: Vec<String>,
}

impl MemoTable {
    /// Merge another worker's table. First writer wins for a ref; side
    /// declarations are de-duplicated by name. Deep-pointer alias names come
    /// from the document, so one name always means one pointer.
    pub fn merge(&mut self, other: MemoTable) {
        for (reference, name) in other.generated_types {
            self.generated_types.entry(reference).or_insert(name);
        }
        for decl in other.pointer_declarations {
            if !self.pointer_declarations.iter().any(|d| d.name == decl.name) {
                self.pointer_declarations.push(decl);
            }
        }
        self.warnings.extend(other.warnings);
    }
}

impl<'a> TransformationContext<'a> {
    pub fn new(document: &'a SchemaDocument, options: &'a Options) -> Self {
        let used_names = reserved_names(document);
        Self {
            document,
            options,
            current_path: Vec::new(),
            visited_refs: IndexSet::new(),
            generated_types: IndexMap::new(),
            dependencies: IndexSet::new(),
            depth: 0,
            used_names,
            pointer_declarations: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Clear every cache so the context can serve an independent run.
    pub fn reset(&mut self) {
        self.current_path.clear();
        self.visited_refs.clear();
        self.generated_types.clear();
        self.dependencies.clear();
        self.depth = 0;
        self.used_names = reserved_names(self.document);
        self.pointer_declarations.clear();
        self.warnings.clear();
    }

    pub fn document(&self) -> &'a SchemaDocument {
        self.document
    }

    pub fn options(&self) -> &'a Options {
        self.options
    }

    // -------------------------------- path --------------------------------- //

    pub fn current_path(&self) -> String {
        self.current_path.join(".")
    }

    /// Run `f` with `segment` appended to the current path.
    pub fn with_segment<T>(&mut self, segment: &str, f: impl FnOnce(&mut Self) -> T) -> T {
        self.current_path.push(segment.to_string());
        let out = f(self);
        self.current_path.pop();
        out
    }

    /// Descend one composition level. Fails once nesting passes `maxDepth`.
    pub fn descend<T>(
        &mut self,
        segment: &str,
        f: impl FnOnce(&mut Self) -> Result<T, LoweringError>,
    ) -> Result<T, LoweringError> {
        let next = self.depth + 1;
        if next > self.options.max_depth {
            let mut path = self.current_path();
            if !path.is_empty() {
                path.push('.');
            }
            path.push_str(segment);
            return Err(LoweringError::CompositionDepthExceeded {
                path,
                depth: next,
                max_depth: self.options.max_depth,
            });
        }
        self.depth = next;
        let out = self.with_segment(segment, f);
        self.depth -= 1;
        out
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Run `f` at composition depth zero. Used for named and pointer-aliased
    /// `$ref` targets, which are declarations of their own.
    pub fn at_declaration_root<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = std::mem::take(&mut self.depth);
        let out = f(self);
        self.depth = saved;
        out
    }

    // ----------------------------- cycle guard ----------------------------- //

    pub fn is_visiting(&self, reference: &str) -> bool {
        self.visited_refs.contains(reference)
    }

    /// Keep `reference` in the visited set exactly while `f` runs, on every
    /// exit path including errors.
    pub fn with_visited<T>(
        &mut self,
        reference: &str,
        f: impl FnOnce(&mut Self) -> Result<T, LoweringError>,
    ) -> Result<T, LoweringError> {
        let inserted = self.visited_refs.insert(reference.to_string());
        let out = f(self);
        if inserted {
            self.visited_refs.shift_remove(reference);
        }
        out
    }

    pub fn visited_refs(&self) -> impl Iterator<Item = &str> {
        self.visited_refs.iter().map(String::as_str)
    }

    // -------------------------------- memo --------------------------------- //

    pub fn cached_type(&self, reference: &str) -> Option<&str> {
        self.generated_types.get(reference).map(String::as_str)
    }

    pub fn record_type(&mut self, reference: &str, name: &str) {
        self.generated_types
            .entry(reference.to_string())
            .or_insert_with(|| name.to_string());
    }

    /// Drop a memo entry, so later referrers resolve the target again.
    pub fn forget_type(&mut self, reference: &str) {
        self.generated_types.shift_remove(reference);
    }

    pub fn generated_types(&self) -> &IndexMap<String, String> {
        &self.generated_types
    }

    // ---------------------------- dependencies ----------------------------- //

    pub fn add_dependency(&mut self, name: &str) {
        self.dependencies.insert(name.to_string());
    }

    /// Run `f` and return the names it depended on. They stay visible to the
    /// enclosing scope too.
    pub fn collect_dependencies<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> (T, Vec<String>) {
        let outer = std::mem::take(&mut self.dependencies);
        let out = f(self);
        let inner = std::mem::replace(&mut self.dependencies, outer);
        self.dependencies.extend(inner.iter().cloned());
        (out, inner.into_iter().collect())
    }

    /// Run `f` without letting its dependencies leak into the enclosing scope.
    pub fn isolate_dependencies<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let outer = std::mem::take(&mut self.dependencies);
        let out = f(self);
        self.dependencies = outer;
        out
    }

    // ------------------------------- naming -------------------------------- //

    /// Claim a fresh type name based on `base`, suffixing a counter on collision.
    pub fn claim_name(&mut self, base: &str) -> String {
        let base = crate::naming::to_pascal_case(base);
        if self.used_names.insert(base.clone()) {
            return base;
        }
        let mut counter = 2;
        loop {
            let name = format!("{base}{counter}");
            if self.used_names.insert(name.clone()) {
                return name;
            }
            counter += 1;
        }
    }

    // ---------------------------- side channel ----------------------------- //

    /// Emit a declaration at most once per run.
    pub fn emit_once(&mut self, decl: Declaration) -> bool {
        if self.pointer_declarations.iter().any(|d| d.name == decl.name) {
            return false;
        }
        self.pointer_declarations.push(decl);
        true
    }

    pub fn pointer_declarations(&self) -> &[Declaration] {
        &self.pointer_declarations
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(path = %self.current_path(), "{message}");
        self.warnings.push(message);
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn into_memo(self) -> MemoTable {
        MemoTable {
            generated_types: self.generated_types,
            pointer_declarations: self.pointer_declarations,
            warnings: self.warnings,
        }
    }
}

/// Names no generated intermediate may take: named schemas and the aliases
/// the document reserved for deep pointers.
fn reserved_names(document: &SchemaDocument) -> HashSet<String> {
    document
        .named()
        .map(|n| crate::naming::to_pascal_case(&n.name))
        .chain(document.pointer_aliases().map(|(_, name)| name.to_string()))
        .collect()
}
