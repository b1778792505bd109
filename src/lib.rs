//! POML: Prompt Orchestration Markup Language compiler.
//!
//! Pipeline (`spec.md` §2): lexer/parser → component registry → expression
//! evaluator → reader → stylesheet applier → writer dispatcher → speaker
//! assigner → source map builder → truncator. This crate exposes three
//! entry points: [`read`], [`write`], and [`write_with_source_map`].

pub mod ast;
pub mod error;
pub mod eval;
pub mod ir;
pub mod jsonbuf;
pub mod message;
pub mod reader;
pub mod registry;
pub mod resolver;
pub mod rpc;
pub mod schema;
pub mod sourcemap;
pub mod span;
pub mod speaker;
pub mod stylesheet;
pub mod tokenizer;
pub mod trace;
pub mod value;
pub mod writer;

use std::path::Path;

use error::{CompileError, ErrorCollection};
use ir::IrNode;
use reader::ReadOptions;
use resolver::SourceResolver;
use schema::SchemaInfo;
use speaker::SpeakerRun;
use stylesheet::Stylesheet;
use value::Context;
use writer::{WriteOptions, WriteResult};

/// Outcome of [`read`]: the produced IR plus everything the reader
/// accumulated along the way (`spec.md` §1 `read(source, options, context,
/// stylesheet) -> ir`).
pub struct CompileIr {
    pub ir: IrNode,
    pub errors: ErrorCollection,
    pub schema: SchemaInfo,
}

/// Phase 1-5: lex, parse, apply templating directives and component
/// renderers, then apply the stylesheet. Returns the finished IR tree.
pub fn read(
    source: &str,
    source_path: Option<&Path>,
    options: &ReadOptions,
    ctx: &mut Context,
    stylesheet: &Stylesheet,
    resolver: &dyn SourceResolver,
) -> CompileIr {
    let outcome = reader::read(source, source_path, options, ctx, resolver);
    let mut ir = outcome.ir;
    stylesheet.apply(&mut ir);
    CompileIr {
        ir,
        errors: outcome.errors,
        schema: outcome.schema,
    }
}

/// Phase 6 + 8: dispatch the IR's `env` root to the appropriate writer,
/// running the truncator before and after (`spec.md` §1
/// `write(ir, options) -> {output, mappings, multimedia}`).
pub fn write(ir: &IrNode, opts: &WriteOptions) -> (WriteResult, Vec<CompileError>) {
    let mut errors = Vec::new();
    let result = match ir {
        IrNode::Element(env) if env.tag == ir::IrTag::Env => writer::write_env(env, opts, &mut errors),
        other => writer::write_node(other, opts, &mut errors),
    };
    (result, errors)
}

/// Full output struct for [`write_with_source_map`]: the rendered text,
/// the speaker runs covering it, and the source-map segments sliced at
/// every mapping/multimedia boundary (`spec.md` §4.7, §4.8).
pub struct SourceMappedWrite {
    pub result: WriteResult,
    pub speaker_runs: Vec<SpeakerRun>,
    pub segments: Vec<sourcemap::SourceMapSegment>,
    pub messages: Vec<message::Message>,
    pub errors: Vec<CompileError>,
}

/// Phase 6-8 combined: write, assign speakers, and build the source map in
/// one call — what the Preview RPC and `--speaker-mode` CLI flag use
/// (`spec.md` §6).
pub fn write_with_source_map(ir: &IrNode, opts: &WriteOptions) -> SourceMappedWrite {
    let (result, mut errors) = write(ir, opts);
    let runs = speaker::assign(ir, &result.mappings, &mut errors, result.output.len());
    let segments = sourcemap::build(&result, &runs);
    let messages = message::build_messages(&result, &runs);
    SourceMappedWrite {
        result,
        speaker_runs: runs,
        segments,
        messages,
        errors,
    }
}
