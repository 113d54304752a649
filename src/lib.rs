//! Comment preservation for AST downlevel pipelines.
//!
//! Lowering passes rebuild statements out of reused fragments and lose the
//! comments glued to the original constructs. This crate keeps them: a
//! pre-pass lifts every comment out of the source text into synthesized
//! per-node lists and neutralizes the original ranges, the rewrite runs
//! freely in between, and a post-pass re-homes the comments stranded on
//! replaced declarations onto their lowered forms.
//!
//! [`pipeline::transform_source_file`] is the whole story for one file:
//!
//! ```
//! let out = trivia::transform_source_file("a.ts", "// doc\nexport var x = 1;\n").unwrap();
//! assert_eq!(out, "// doc\nexports.x = 1;\n");
//! ```

// Arena AST shared by the parser and the passes
pub mod ast;

// Source text, line table, comment scanning
pub mod source_file;
pub mod comments;
pub mod detach;

// Per-node emit side data and per-file session state
pub mod emit_info;
pub mod session;

// The passes, in pipeline order
pub mod parser;
pub mod pre_pass;
pub mod lowering;
pub mod post_pass;
pub mod printer;
pub mod pipeline;

pub mod tracing_config;

pub use ast::{Node, NodeArena, NodeIndex};
pub use comments::{CommentKind, CommentRange, SynthesizedComment};
pub use emit_info::{EmitFlags, EmitInfo, EmitInfoTable};
pub use pipeline::{Pipeline, PipelineError, transform_source_file};
pub use session::{FileSession, SessionError};
pub use source_file::SourceFile;
pub use tracing_config::init_tracing;
