//! Lowers JSON-Schema / OpenAPI schema documents to TypeScript declarations.
//!
//! A [`SchemaDocument`] is parsed once; every lowering stage is a method on a
//! per-run [`TransformationContext`]. [`batch`] drives a whole document and
//! [`emit`] turns the resulting [`Declaration`]s into module text.
pub mod batch;
pub mod cli;
pub mod compose;
pub mod context;
pub mod emit;
pub mod enums;
pub mod error;
pub mod interface;
pub mod ir;
pub mod jq_exec;
pub mod naming;
pub mod options;
pub mod path_de;
pub mod render;
pub mod schema;
pub mod transform;
pub mod union;
pub mod validators;

pub use batch::{
    lower_document, lower_document_cancellable, lower_document_parallel, lower_document_parallel_cancellable,
    BatchReport, Operation, TypeFailure, TypeOutput,
};
pub use context::{MemoTable, TransformationContext};
pub use error::LoweringError;
pub use ir::{
    CompositionResult, Declaration, DeclarationKind, GeneratedEnum, GeneratedInterface, GeneratedUnion,
    TypeDescriptor,
};
pub use options::Options;
pub use schema::{DocumentError, NamedSchema, SchemaDocument, SchemaNode};
