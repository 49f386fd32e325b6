//! Source walker: drives the lexer and statement parser over a whole
//! `main.cx` file and captures the app class body verbatim.

use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, info};

use crate::error::{CompileError, CompileErrorKind};
use crate::model::{MAX_LINE_LENGTH, ProjectModel};
use crate::processor::lexer::tokenize;
use crate::processor::script_parser::{self, Scope};

/// Default source file name looked up by `cx build`.
pub const SOURCE_FILE: &str = "main.cx";

/// Read and walk a source file. Relative `files.add` paths are resolved
/// against the file's directory.
pub fn load(path: &Path) -> Result<ProjectModel> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot open file {}", path.display()))?;
    info!("File loaded, size: {} bytes", source.len());

    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
    let model = walk(&source, base_dir)?;
    Ok(model)
}

/// Walk already loaded source text.
pub fn walk(source: &str, base_dir: &Path) -> Result<ProjectModel, CompileError> {
    let mut walker = Walker::new(base_dir);
    for (idx, line) in source.lines().enumerate() {
        walker.line(line, idx + 1)?;
    }
    walker.finish()
}

/// Indentation width: a space counts 1, a tab counts 4.
pub fn indent_level(line: &str) -> usize {
    line.chars()
        .map_while(|c| match c {
            ' ' => Some(1),
            '\t' => Some(4),
            _ => None,
        })
        .sum()
}

/// Remove one level of class indentation (one tab or four spaces).
pub fn strip_class_indent(line: &str) -> &str {
    if let Some(rest) = line.strip_prefix('\t') {
        rest
    } else if let Some(rest) = line.strip_prefix("    ") {
        rest
    } else {
        line
    }
}

struct Walker<'a> {
    model: ProjectModel,
    scope: Scope,
    base_dir: &'a Path,
}

impl<'a> Walker<'a> {
    fn new(base_dir: &'a Path) -> Self {
        Self {
            model: ProjectModel::new(),
            scope: Scope::default(),
            base_dir,
        }
    }

    fn in_app_class(&self) -> bool {
        self.scope.is_in(&self.model.app.class)
    }

    fn line(&mut self, raw: &str, line_no: usize) -> Result<(), CompileError> {
        if raw.len() > MAX_LINE_LENGTH {
            return Err(CompileError::new(
                line_no,
                CompileErrorKind::LineTooLong {
                    len: raw.len(),
                    max: MAX_LINE_LENGTH,
                },
            ));
        }

        let line = raw.trim_end();
        if line.trim_start().is_empty() {
            return Ok(());
        }

        if self.in_app_class() {
            return self.capture(line, line_no);
        }

        let tokens = tokenize(line.trim_start(), line_no)?;
        let program_scope = self.scope.is_in(&self.model.project.program_class);
        let stmt = script_parser::parse_statement(&tokens, line_no, program_scope)?;
        script_parser::apply(stmt, &mut self.model, &mut self.scope, self.base_dir, line_no)
    }

    /// Inside the app class every line is script text until `finish`.
    fn capture(&mut self, line: &str, line_no: usize) -> Result<(), CompileError> {
        let code = if indent_level(line) >= 4 {
            strip_class_indent(line)
        } else {
            line
        };

        if code.trim() == "finish" {
            debug!("app class body closed at line {line_no}");
            self.scope.current = None;
            self.model.app_class_found = true;
            return Ok(());
        }

        self.model
            .push_script_line(code)
            .map_err(|kind| CompileError::new(line_no, kind))
    }

    fn finish(self) -> Result<ProjectModel, CompileError> {
        if let Some(open) = self.scope.current {
            return Err(CompileError::new(
                open.opened_at,
                CompileErrorKind::UnterminatedClass {
                    name: open.name,
                    opened_at: open.opened_at,
                },
            ));
        }
        Ok(self.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MAX_DESCRIPTION_LEN, MAX_PATH_LEN};

    fn walk_str(src: &str) -> Result<ProjectModel, CompileError> {
        walk(src, Path::new("."))
    }

    const DEMO: &str = r#"? demo project
#get "math"
#from "std" get "io"
program "App"

define class "App"
    cx.project.name = "Demo"
    cx.project.version = "2.1"
    cx.app.shell = "bash"
    cx.app.class = "Runner"
    shell.run("make")
    files.add("folder", "assets")
finish

define class "Runner"
    echo "hello"

    if true; then
	echo tabbed
    fi
finish
"#;

    #[test]
    fn test_walk_demo() {
        let model = walk_str(DEMO).unwrap();
        assert_eq!(model.project.name, "Demo");
        assert_eq!(model.project.version, "2.1");
        assert_eq!(model.project.platform, "all");
        assert_eq!(model.modules, vec!["math"]);
        assert_eq!(model.from_modules, vec!["io"]);
        assert_eq!(model.app.shell, "bash");
        assert_eq!(model.app.class, "Runner");
        assert_eq!(model.shell_commands, vec!["make"]);
        assert_eq!(model.folders, vec!["assets"]);
        assert!(model.program_class_found);
        assert!(model.app_class_found);
        assert_eq!(
            model.script_body,
            "echo \"hello\"\nif true; then\necho tabbed\nfi\n"
        );
    }

    #[test]
    fn test_nested_indentation_is_kept() {
        let src = concat!(
            "program \"A\"\n",
            "define class \"A\"\n",
            "    cx.app.class = \"B\"\n",
            "finish\n",
            "define class \"B\"\n",
            "    for x in 1 2; do\n",
            "        echo $x\n",
            "    done\n",
            "finish\n",
        );
        let model = walk_str(src).unwrap();
        assert_eq!(model.script_body, "for x in 1 2; do\n    echo $x\ndone\n");
    }

    #[test]
    fn test_statements_outside_program_class_are_ignored() {
        let src = concat!(
            "program \"App\"\n",
            "define class \"Other\"\n",
            "    cx.project.name = \"Nope\"\n",
            "finish\n",
        );
        let model = walk_str(src).unwrap();
        assert!(model.project.name.is_empty());
        assert!(!model.program_class_found);
    }

    #[test]
    fn test_parse_error_reports_line() {
        let src = "program \"App\"\ndefine class \"App\"\n\n    cx.project.name = Demo\nfinish\n";
        let err = walk_str(src).unwrap_err();
        assert_eq!(err.line, 4);
        assert!(err.to_string().starts_with("CX Error at line 4:"));
    }

    #[test]
    fn test_unterminated_app_class_is_fatal() {
        let src = concat!(
            "program \"App\"\n",
            "define class \"App\"\n",
            "    cx.app.class = \"Run\"\n",
            "finish\n",
            "define class \"Run\"\n",
            "    echo hi\n",
        );
        let err = walk_str(src).unwrap_err();
        assert_eq!(
            err.kind,
            CompileErrorKind::UnterminatedClass {
                name: "Run".into(),
                opened_at: 5
            }
        );
        assert_eq!(err.line, 5);
    }

    #[test]
    fn test_unterminated_program_class_is_fatal() {
        let src = "program \"App\"\ndefine class \"App\"\n    cx.project.name = \"x\"\n";
        let err = walk_str(src).unwrap_err();
        assert!(matches!(err.kind, CompileErrorKind::UnterminatedClass { .. }));
    }

    #[test]
    fn test_finish_must_be_exact_inside_app_class() {
        let src = concat!(
            "program \"A\"\n",
            "define class \"A\"\n",
            "    cx.app.class = \"B\"\n",
            "finish\n",
            "define class \"B\"\n",
            "    finished_task\n",
            "  finish  \n",
        );
        let model = walk_str(src).unwrap();
        assert_eq!(model.script_body, "finished_task\n");
        assert!(model.app_class_found);
    }

    #[test]
    fn test_app_class_defined_twice_is_fatal() {
        let src = concat!(
            "program \"A\"\n",
            "define class \"A\"\n",
            "    cx.app.class = \"B\"\n",
            "finish\n",
            "define class \"B\"\n",
            "    one\n",
            "finish\n",
            "define class \"B\"\n",
            "    two\n",
            "finish\n",
        );
        let err = walk_str(src).unwrap_err();
        assert_eq!(err.line, 8);
        assert_eq!(err.kind, CompileErrorKind::DuplicateClass("B".into()));
    }

    #[test]
    fn test_unrecognised_hash_words_are_ignored() {
        let src = concat!(
            "#include \"x\"\n",
            "program \"App\"\n",
            "define class \"Util\"\n",
            "    #pragma once\n",
            "finish\n",
            "define class \"App\"\n",
            "    cx.project.name = \"Demo\"\n",
            "    #note \"ignored\"\n",
            "finish\n",
        );
        let model = walk_str(src).unwrap();
        assert_eq!(model.project.name, "Demo");
        assert!(model.modules.is_empty());
    }

    #[test]
    fn test_field_limits_are_reachable_through_walk() {
        let source_with = |desc: &str, path: &str| {
            format!(
                concat!(
                    "program \"App\"\n",
                    "define class \"App\"\n",
                    "    cx.project.description = \"{desc}\"\n",
                    "    files.add(\"file\", \"{path}\", \"out.bin\")\n",
                    "finish\n",
                ),
                desc = desc,
                path = path,
            )
        };

        let desc = "d".repeat(MAX_DESCRIPTION_LEN);
        let path = "p".repeat(MAX_PATH_LEN);
        let model = walk_str(&source_with(&desc, &path)).unwrap();
        assert_eq!(model.project.description.len(), MAX_DESCRIPTION_LEN);
        assert_eq!(model.files[0].src.len(), MAX_PATH_LEN);

        let long_desc = "d".repeat(MAX_DESCRIPTION_LEN + 1);
        let err = walk_str(&source_with(&long_desc, "a.bin")).unwrap_err();
        assert_eq!(err.line, 3);
        assert_eq!(
            err.kind,
            CompileErrorKind::FieldTooLong {
                field: "description",
                max: MAX_DESCRIPTION_LEN
            }
        );

        let long_path = "p".repeat(MAX_PATH_LEN + 1);
        let err = walk_str(&source_with("ok", &long_path)).unwrap_err();
        assert_eq!(err.line, 4);
        assert_eq!(
            err.kind,
            CompileErrorKind::FieldTooLong {
                field: "source path",
                max: MAX_PATH_LEN
            }
        );
    }

    #[test]
    fn test_indent_helpers() {
        assert_eq!(indent_level("  \tx"), 6);
        assert_eq!(indent_level("x"), 0);
        assert_eq!(strip_class_indent("\t\tx"), "\tx");
        assert_eq!(strip_class_indent("      x"), "  x");
        assert_eq!(strip_class_indent("  x"), "  x");
    }
}
