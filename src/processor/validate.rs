//! Completeness check run between the walk and the packager.

use crate::error::{CompileError, CompileErrorKind};
use crate::model::ProjectModel;

/// Fails on the first missing piece. Errors carry line 0.
pub fn validate(model: &ProjectModel) -> Result<(), CompileError> {
    let fail = |kind| Err(CompileError::new(0, kind));

    if model.project.name.is_empty() {
        return fail(CompileErrorKind::MissingProjectName);
    }
    if model.project.program_class.is_empty() {
        return fail(CompileErrorKind::MissingProgram);
    }
    if !model.program_class_found {
        return fail(CompileErrorKind::ProgramClassNotFound);
    }
    if model.app.shell.is_empty() {
        return fail(CompileErrorKind::MissingShell);
    }
    if model.app.class.is_empty() {
        return fail(CompileErrorKind::MissingAppClass);
    }
    if !model.app_class_found {
        return fail(CompileErrorKind::AppClassNotFound);
    }
    Ok(())
}
