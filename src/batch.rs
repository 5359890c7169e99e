//! Batch driver: lowers every named schema of a document, one failure never
//! blocking the rest.
//!
//! The parallel driver gives each task its own [`TransformationContext`] and
//! merges the per-task memo tables afterwards, so no memo is ever written
//! from two threads.
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use serde::Serialize;

use crate::context::{MemoTable, TransformationContext};
use crate::error::LoweringError;
use crate::ir::Declaration;
use crate::naming;
use crate::options::Options;
use crate::schema::{NamedSchema, SchemaDocument, SchemaKind, SchemaNode};
use crate::validators;

/// Top-level operation chosen for a named schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    Enum,
    Union,
    Compose,
    Interface,
    Alias,
}

impl Operation {
    pub fn select(node: &SchemaNode) -> Self {
        match &node.kind {
            SchemaKind::Enum(_) => Operation::Enum,
            SchemaKind::OneOf(_) | SchemaKind::AnyOf(_) => Operation::Union,
            SchemaKind::AllOf(_) => Operation::Compose,
            SchemaKind::Object(obj) if obj.properties.values().any(SchemaNode::is_composite) => Operation::Compose,
            SchemaKind::Object(_) => Operation::Interface,
            SchemaKind::Array(item) if item.is_composite() => Operation::Compose,
            SchemaKind::Ref(_) | SchemaKind::Array(_) | SchemaKind::Primitive(_) | SchemaKind::Any => Operation::Alias,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::Enum => "enum",
            Operation::Union => "union",
            Operation::Compose => "compose",
            Operation::Interface => "interface",
            Operation::Alias => "alias",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeOutput {
    pub name: String,
    pub pointer: String,
    pub operation: Operation,
    pub declarations: Vec<Declaration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeFailure {
    pub name: String,
    pub pointer: String,
    pub error: LoweringError,
}

impl fmt::Display for TypeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}: {}", self.name, self.pointer, self.error.kind(), self.error)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    /// Successful named types, in document order.
    pub outputs: Vec<TypeOutput>,
    pub failures: Vec<TypeFailure>,
    pub memo: MemoTable,
    /// The run stopped early; later named schemas were not attempted.
    pub cancelled: bool,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outputs.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }

    pub fn warnings(&self) -> &[String] {
        &self.memo.warnings
    }

    /// Every declaration: aliases for deep pointers first, then each named
    /// type's records.
    pub fn declarations(&self) -> Vec<Declaration> {
        self.memo
            .pointer_declarations
            .iter()
            .cloned()
            .chain(self.outputs.iter().flat_map(|o| o.declarations.iter().cloned()))
            .collect()
    }

    fn record(&mut self, named: &NamedSchema, result: Result<Vec<Declaration>, LoweringError>) {
        match result {
            Ok(declarations) => self.outputs.push(TypeOutput {
                name: named.name.clone(),
                pointer: named.pointer.clone(),
                operation: Operation::select(&named.node),
                declarations,
            }),
            Err(error) => {
                tracing::warn!(name = %named.name, kind = error.kind(), "{error}");
                self.failures.push(TypeFailure { name: named.name.clone(), pointer: named.pointer.clone(), error });
            }
        }
    }

    fn log_summary(&self) {
        tracing::info!(
            succeeded = self.succeeded(),
            failed = self.failed(),
            warnings = self.memo.warnings.len(),
            cancelled = self.cancelled,
            "lowering finished"
        );
    }
}

impl TransformationContext<'_> {
    /// Lower one named schema with the operation its shape selects. The
    /// schema's own pointer counts as visited while it is lowered; it is
    /// memoized only once its lowering succeeded.
    pub fn lower_named(&mut self, named: &NamedSchema) -> Result<Vec<Declaration>, LoweringError> {
        let type_name = naming::to_pascal_case(&named.name);
        let operation = Operation::select(&named.node);
        tracing::debug!(name = %named.name, %operation, "lowering named schema");
        let lowered = self.with_visited(&named.pointer, |ctx| {
            let node = &named.node;
            Ok(match operation {
                Operation::Enum => ctx.generate_enum(&type_name, node)?.declarations(),
                Operation::Union => ctx.generate_union(&type_name, node)?.declarations(),
                Operation::Compose => ctx.compose_type(&type_name, node)?.declarations(),
                Operation::Interface => {
                    let iface = ctx.generate_interface(&type_name, node)?;
                    let mut out = iface.declarations();
                    out.extend(validators::validator_for(&iface, ctx.options().export_prefix()));
                    out
                }
                Operation::Alias => vec![ctx.generate_alias(&type_name, node)?],
            })
        });
        match &lowered {
            Ok(_) => self.record_type(&named.pointer, &type_name),
            Err(_) => self.forget_type(&named.pointer),
        }
        lowered
    }
}

/// Lower every named schema with one context for the whole run.
pub fn lower_document(doc: &SchemaDocument, options: &Options) -> BatchReport {
    lower_document_cancellable(doc, options, &AtomicBool::new(false))
}

/// Like [`lower_document`], checking `cancel` between named schemas.
pub fn lower_document_cancellable(doc: &SchemaDocument, options: &Options, cancel: &AtomicBool) -> BatchReport {
    let mut ctx = TransformationContext::new(doc, options);
    let mut report = BatchReport::default();
    for named in doc.named() {
        if cancel.load(Ordering::Relaxed) {
            report.cancelled = true;
            break;
        }
        let result = ctx.lower_named(named);
        report.record(named, result);
    }
    report.memo = ctx.into_memo();
    report.log_summary();
    report
}

/// Lower named schemas on the rayon pool. Each task gets a fresh context;
/// memo tables are merged in document order.
pub fn lower_document_parallel(doc: &SchemaDocument, options: &Options) -> BatchReport {
    lower_document_parallel_cancellable(doc, options, &AtomicBool::new(false))
}

pub fn lower_document_parallel_cancellable(
    doc: &SchemaDocument,
    options: &Options,
    cancel: &AtomicBool,
) -> BatchReport {
    let named: Vec<&NamedSchema> = doc.named().collect();
    let results: Vec<Option<(Result<Vec<Declaration>, LoweringError>, MemoTable)>> = named
        .par_iter()
        .map(|named| {
            if cancel.load(Ordering::Relaxed) {
                return None;
            }
            let mut ctx = TransformationContext::new(doc, options);
            let result = ctx.lower_named(named);
            Some((result, ctx.into_memo()))
        })
        .collect();

    let mut report = BatchReport::default();
    for (named, outcome) in named.into_iter().zip(results) {
        match outcome {
            Some((result, memo)) => {
                report.record(named, result);
                report.memo.merge(memo);
            }
            None => report.cancelled = true,
        }
    }
    report.log_summary();
    report
}
