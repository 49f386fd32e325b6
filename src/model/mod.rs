pub mod package;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::CompileErrorKind;

// size limits for every bounded field / list of the project model
pub const MAX_LINE_LENGTH: usize = 1024;
pub const MAX_TOKEN_LENGTH: usize = 512;

pub const MAX_NAME_LEN: usize = 256;
pub const MAX_SHORT_FIELD_LEN: usize = 64; // platform, version
pub const MAX_DESCRIPTION_LEN: usize = 512;
pub const MAX_PATH_LEN: usize = 512;

pub const MAX_MODULES: usize = 50;
pub const MAX_FOLDERS: usize = 50;
pub const MAX_FILES: usize = 100;
pub const MAX_SHELL_COMMANDS: usize = 100;
pub const MAX_SCRIPT_BODY: usize = 65_536;

pub const DEFAULT_PLATFORM: &str = "all";
pub const DEFAULT_VERSION: &str = "1.0";
pub const DEFAULT_DESCRIPTION: &str = "Mi proyecto de amor";

/// `cx.project.*` plus the class named by `program`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    pub name: String,
    pub platform: String,
    pub description: String,
    pub version: String,
    pub program_class: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            platform: DEFAULT_PLATFORM.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            version: DEFAULT_VERSION.to_string(),
            program_class: String::new(),
        }
    }
}

/// `cx.app.*`: how the packaged script gets launched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    pub shell: String,
    pub class: String,
}

/// One `files.add("file", src, dest)` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Source path as written in the source file.
    pub src: String,
    /// `src` resolved against the directory holding the source file.
    pub resolved: PathBuf,
    /// Name inside the package / scratch directory.
    pub dest: String,
}

/// Everything the walker learns from one source file.
///
/// Lists only grow through the `push_*` helpers so that every capacity
/// limit is checked at insertion time instead of being silently truncated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectModel {
    pub project: ProjectConfig,
    pub app: AppConfig,
    pub modules: Vec<String>,
    pub from_modules: Vec<String>,
    pub folders: Vec<String>,
    pub files: Vec<FileEntry>,
    pub shell_commands: Vec<String>,
    pub script_body: String,
    pub program_class_found: bool,
    pub app_class_found: bool,
}

impl ProjectModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_module(&mut self, name: &str) -> Result<(), CompileErrorKind> {
        check_len("module name", name, MAX_NAME_LEN)?;
        push_bounded(&mut self.modules, name.to_string(), "modules", MAX_MODULES)
    }

    pub fn push_from_module(&mut self, name: &str) -> Result<(), CompileErrorKind> {
        check_len("module name", name, MAX_NAME_LEN)?;
        push_bounded(
            &mut self.from_modules,
            name.to_string(),
            "from-imports",
            MAX_MODULES,
        )
    }

    pub fn push_folder(&mut self, name: &str) -> Result<(), CompileErrorKind> {
        check_len("folder name", name, MAX_NAME_LEN)?;
        push_bounded(&mut self.folders, name.to_string(), "folders", MAX_FOLDERS)
    }

    pub fn push_file(&mut self, entry: FileEntry) -> Result<(), CompileErrorKind> {
        check_len("source path", &entry.src, MAX_PATH_LEN)?;
        check_len("destination path", &entry.dest, MAX_PATH_LEN)?;
        push_bounded(&mut self.files, entry, "files", MAX_FILES)
    }

    pub fn push_shell_command(&mut self, command: &str) -> Result<(), CompileErrorKind> {
        check_len("shell command", command, MAX_PATH_LEN)?;
        push_bounded(
            &mut self.shell_commands,
            command.to_string(),
            "shell commands",
            MAX_SHELL_COMMANDS,
        )
    }

    /// Append one script line plus its newline.
    pub fn push_script_line(&mut self, line: &str) -> Result<(), CompileErrorKind> {
        if self.script_body.len() + line.len() + 1 > MAX_SCRIPT_BODY {
            return Err(CompileErrorKind::FieldTooLong {
                field: "script body",
                max: MAX_SCRIPT_BODY,
            });
        }
        self.script_body.push_str(line);
        self.script_body.push('\n');
        Ok(())
    }

    pub fn set_program_class(&mut self, class: &str) -> Result<(), CompileErrorKind> {
        set_bounded(&mut self.project.program_class, "program class", class, MAX_NAME_LEN)
    }

    /// `cx.project.<prop> = value`; unknown properties are ignored.
    pub fn set_project_property(
        &mut self,
        prop: &str,
        value: &str,
    ) -> Result<bool, CompileErrorKind> {
        let p = &mut self.project;
        match prop {
            "name" => set_bounded(&mut p.name, "project name", value, MAX_NAME_LEN)?,
            "platform" => set_bounded(&mut p.platform, "platform", value, MAX_SHORT_FIELD_LEN)?,
            "description" => set_bounded(
                &mut p.description,
                "description",
                value,
                MAX_DESCRIPTION_LEN,
            )?,
            "version" => set_bounded(&mut p.version, "version", value, MAX_SHORT_FIELD_LEN)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// `cx.app.<prop> = value`; unknown properties are ignored.
    pub fn set_app_property(
        &mut self,
        prop: &str,
        value: &str,
    ) -> Result<bool, CompileErrorKind> {
        match prop {
            "shell" => set_bounded(&mut self.app.shell, "cx.app.shell", value, MAX_NAME_LEN)?,
            "class" => set_bounded(&mut self.app.class, "cx.app.class", value, MAX_NAME_LEN)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Settings record that travels inside the package.
    pub fn settings(&self) -> Settings {
        Settings {
            project: self.project.name.clone(),
            platform: self.project.platform.clone(),
            shell: self.app.shell.clone(),
            description: self.project.description.clone(),
            version: self.project.version.clone(),
        }
    }
}

/// ─────────────────────────────────────────────────────
/// Settings record (`settings.json` inside the package)
/// ─────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub project: String,
    pub platform: String,
    pub shell: String,
    pub description: String,
    pub version: String,
}

/// Fully processed output handed to `writer`.
#[derive(Debug, Clone)]
pub struct ProcessedProject {
    pub settings: Settings,
    /// zlib-compressed `settings.json`.
    pub settings_blob: Vec<u8>,
    /// zlib-compressed script body.
    pub script_blob: Vec<u8>,
    pub files: Vec<FileEntry>,
    // recorded for the build summary only, they are not packaged
    pub folders: Vec<String>,
    pub shell_commands: Vec<String>,
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<(), CompileErrorKind> {
    if value.len() > max {
        return Err(CompileErrorKind::FieldTooLong { field, max });
    }
    Ok(())
}

fn set_bounded(
    slot: &mut String,
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), CompileErrorKind> {
    check_len(field, value, max)?;
    *slot = value.to_string();
    Ok(())
}

fn push_bounded<T>(
    list: &mut Vec<T>,
    item: T,
    what: &'static str,
    max: usize,
) -> Result<(), CompileErrorKind> {
    if list.len() >= max {
        return Err(CompileErrorKind::CapacityExceeded { what, max });
    }
    list.push(item);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let model = ProjectModel::new();
        assert_eq!(model.project.platform, "all");
        assert_eq!(model.project.version, "1.0");
        assert!(model.project.name.is_empty());
        assert!(!model.program_class_found);
    }

    #[test]
    fn test_capacity_is_checked_on_insert() {
        let mut model = ProjectModel::new();
        for i in 0..MAX_FOLDERS {
            model.push_folder(&format!("dir{i}")).unwrap();
        }
        let err = model.push_folder("one_too_many").unwrap_err();
        assert_eq!(
            err,
            CompileErrorKind::CapacityExceeded {
                what: "folders",
                max: MAX_FOLDERS
            }
        );
        assert_eq!(model.folders.len(), MAX_FOLDERS);
    }

    #[test]
    fn test_overlong_fields_are_rejected_not_truncated() {
        let mut model = ProjectModel::new();
        let long_name = "n".repeat(MAX_NAME_LEN + 1);
        assert!(model.set_project_property("name", &long_name).is_err());
        assert!(model.project.name.is_empty());

        let exact = "n".repeat(MAX_NAME_LEN);
        assert!(model.set_project_property("name", &exact).unwrap());
        assert_eq!(model.project.name.len(), MAX_NAME_LEN);

        let long_desc = "d".repeat(MAX_DESCRIPTION_LEN + 1);
        assert!(model.set_project_property("description", &long_desc).is_err());
    }

    #[test]
    fn test_unknown_properties_are_ignored() {
        let mut model = ProjectModel::new();
        assert!(!model.set_project_property("colour", "blue").unwrap());
        assert!(!model.set_app_property("timeout", "5").unwrap());
        assert_eq!(model, ProjectModel::new());
    }

    #[test]
    fn test_script_body_limit() {
        let mut model = ProjectModel::new();
        let line = "x".repeat(MAX_SCRIPT_BODY - 1);
        model.push_script_line(&line).unwrap();
        assert_eq!(model.script_body.len(), MAX_SCRIPT_BODY);
        assert!(model.push_script_line("").is_err());
    }
}
