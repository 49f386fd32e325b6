//! The functional core of `cx build`.
//!
//! Source lines go through the lexer and statement parser (driven by
//! `crate::parser`), then `run` validates the resulting model and compresses
//! the two fixed package sections.
pub mod ast;
pub mod blob;
pub mod lexer;
pub mod script_parser;
pub mod validate;

use anyhow::{Context, Result};
use log::debug;

use crate::error::PackageError;
use crate::model::{ProcessedProject, ProjectModel};

/// Runs every processing pass and returns a read-only structure for writers.
pub fn run(model: &ProjectModel) -> Result<ProcessedProject> {
    validate::validate(model)?;

    let settings = model.settings();
    let settings_json =
        serde_json::to_string_pretty(&settings).context("Serializing settings record")?;

    let settings_blob = blob::deflate(settings_json.as_bytes()).map_err(|source| {
        PackageError::Compress {
            what: "settings",
            source,
        }
    })?;
    let script_blob =
        blob::deflate(model.script_body.as_bytes()).map_err(|source| PackageError::Compress {
            what: "code",
            source,
        })?;

    debug!(
        "settings {} -> {} bytes, script {} -> {} bytes",
        settings_json.len(),
        settings_blob.len(),
        model.script_body.len(),
        script_blob.len()
    );

    Ok(ProcessedProject {
        settings,
        settings_blob,
        script_blob,
        files: model.files.clone(),
        folders: model.folders.clone(),
        shell_commands: model.shell_commands.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CompileError, CompileErrorKind};

    #[test]
    fn test_run_rejects_incomplete_model() {
        let err = run(&ProjectModel::new()).unwrap_err();
        let compile = err.downcast_ref::<CompileError>().expect("compile error");
        assert_eq!(compile.kind, CompileErrorKind::MissingProjectName);
    }

    #[test]
    fn test_run_compresses_sections() {
        let mut model = ProjectModel::new();
        model.project.name = "Demo".into();
        model.project.program_class = "App".into();
        model.program_class_found = true;
        model.app.shell = "sh".into();
        model.app.class = "Main".into();
        model.app_class_found = true;
        model.script_body = "echo hi\n".into();

        let processed = run(&model).unwrap();
        let json = blob::inflate(&processed.settings_blob).unwrap();
        let text = String::from_utf8(json).unwrap();
        assert!(text.contains("\"shell\": \"sh\""), "{text}");
        assert_eq!(
            blob::inflate(&processed.script_blob).unwrap(),
            b"echo hi\n".to_vec()
        );
    }
}
