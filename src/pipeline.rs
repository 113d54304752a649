//! Pass orchestration.
//!
//! `Pipeline` owns the per-file session for the duration of one transform
//! and enforces pass ordering: the pre-pass creates the session, the
//! rewrite and post-pass require it, and printing the output releases it.
//! Calling a later pass without the earlier ones is an illegal-state
//! error, not a silent no-op.

use std::fmt;

use tracing::debug;

use crate::ast::{NodeArena, NodeIndex};
use crate::lowering::LoweringPass;
use crate::parser::{ParseError, ParserState};
use crate::post_pass::PostPass;
use crate::pre_pass::PrePass;
use crate::printer::Printer;
use crate::session::{FileSession, SessionError};
use crate::source_file::SourceFile;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PipelineError {
    Parse(ParseError),
    Session(SessionError),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Parse(err) => write!(f, "parse error: {err}"),
            PipelineError::Session(err) => write!(f, "session error: {err}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Parse(err) => Some(err),
            PipelineError::Session(err) => Some(err),
        }
    }
}

impl From<ParseError> for PipelineError {
    fn from(err: ParseError) -> PipelineError {
        PipelineError::Parse(err)
    }
}

impl From<SessionError> for PipelineError {
    fn from(err: SessionError) -> PipelineError {
        PipelineError::Session(err)
    }
}

/// One transform run over one file. Single-threaded by construction; a
/// fresh `Pipeline` per file is the expected usage.
#[derive(Default)]
pub struct Pipeline {
    session: Option<FileSession>,
}

impl Pipeline {
    pub fn new() -> Pipeline {
        Pipeline { session: None }
    }

    fn session_for(&mut self, file: &SourceFile) -> Result<&mut FileSession, SessionError> {
        self.session.as_mut().ok_or_else(|| SessionError::Missing {
            file_name: file.file_name.clone(),
        })
    }

    /// Run the comment pre-pass, creating the session for this file.
    pub fn pre_pass(
        &mut self,
        file: &SourceFile,
        arena: &mut NodeArena,
        root: NodeIndex,
    ) -> Result<NodeIndex, PipelineError> {
        let session = self.session.insert(FileSession::new(file));
        let root = PrePass::new(file, arena, session).run(root)?;
        Ok(root)
    }

    /// Run the reference semantic rewrite.
    pub fn lower(
        &mut self,
        file: &SourceFile,
        arena: &mut NodeArena,
        root: NodeIndex,
    ) -> Result<NodeIndex, PipelineError> {
        let session = self.session_for(file)?;
        session.check_file(file)?;
        Ok(LoweringPass::new(arena, session).run(root))
    }

    /// Run the comment repair pass.
    pub fn post_pass(
        &mut self,
        file: &SourceFile,
        arena: &NodeArena,
        root: NodeIndex,
    ) -> Result<(), PipelineError> {
        let session = self.session_for(file)?;
        PostPass::new(file, arena, session).run(root)?;
        Ok(())
    }

    /// Print the output and release the session. The session never
    /// outlives the file it was built for.
    pub fn print(
        &mut self,
        file: &SourceFile,
        arena: &NodeArena,
        root: NodeIndex,
    ) -> Result<String, PipelineError> {
        let session = self.session_for(file)?;
        session.check_file(file)?;
        let out = Printer::new(file, arena, &session.emit).print_source_file(root);
        self.session = None;
        Ok(out)
    }
}

/// Parse, transform, and print a single file.
pub fn transform_source_file(
    file_name: &str,
    source_text: &str,
) -> Result<String, PipelineError> {
    let mut parser = ParserState::new(file_name, source_text);
    let root = parser.parse_source_file()?;
    let (file, mut arena) = parser.into_parts();

    let mut pipeline = Pipeline::new();
    let root = pipeline.pre_pass(&file, &mut arena, root)?;
    let root = pipeline.lower(&file, &mut arena, root)?;
    pipeline.post_pass(&file, &arena, root)?;
    let out = pipeline.print(&file, &arena, root)?;
    debug!(file = %file.file_name, bytes = out.len(), "transform complete");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_to_end_smoke() {
        let out = transform_source_file("a.ts", "var x = 1;\n").unwrap();
        assert_eq!(out, "var x = 1;\n");
    }

    #[test]
    fn post_pass_without_session_is_illegal() {
        let mut parser = ParserState::new("a.ts", "x;");
        let root = parser.parse_source_file().unwrap();
        let (file, arena) = parser.into_parts();
        let mut pipeline = Pipeline::new();
        let err = pipeline.post_pass(&file, &arena, root).unwrap_err();
        assert_eq!(
            err,
            PipelineError::Session(SessionError::Missing {
                file_name: "a.ts".to_string()
            })
        );
        assert!(err.to_string().contains("a.ts"));
    }

    #[test]
    fn session_does_not_leak_across_files() {
        let mut parser = ParserState::new("a.ts", "x;");
        let root = parser.parse_source_file().unwrap();
        let (file_a, mut arena) = parser.into_parts();
        let mut pipeline = Pipeline::new();
        let root = pipeline.pre_pass(&file_a, &mut arena, root).unwrap();
        let out = pipeline.print(&file_a, &arena, root).unwrap();
        assert_eq!(out, "x;\n");
        // Printing released the session.
        let err = pipeline.post_pass(&file_a, &arena, root).unwrap_err();
        assert!(matches!(err, PipelineError::Session(SessionError::Missing { .. })));
    }

    #[test]
    fn parse_errors_surface() {
        let err = transform_source_file("bad.ts", "class;").unwrap_err();
        assert!(matches!(err, PipelineError::Parse(_)));
    }
}
