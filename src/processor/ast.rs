//! One parsed CX statement. Every source line maps to at most one `Stmt`.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    /// `#get "module"`
    Get { module: String },

    /// `#from "module" get "name"` – only `name` ends up in the model.
    From { module: String, name: String },

    /// `program "Class"` – names the class that configures the project.
    Program { class: String },

    /// `define class "Class"` – opens a class scope.
    DefineClass { name: String },

    /// `finish` – closes the current class scope.
    Finish,

    /// `cx.project.<prop> = "value"`
    ProjectProp { prop: String, value: String },

    /// `cx.app.<prop> = "value"`
    AppProp { prop: String, value: String },

    /// `shell.run("cmd", ...)` – recorded only, never executed.
    ShellRun { command: String },

    /// `files.add("folder", "name")`
    AddFolder { name: String },

    /// `files.add("file", "src", "dest")`
    AddFile { src: String, dest: String },

    /// Comments and lines the grammar does not care about.
    Other,
}

impl Stmt {
    /// Statements that are only honoured inside the program class.
    pub fn needs_program_scope(&self) -> bool {
        matches!(
            self,
            Stmt::ProjectProp { .. }
                | Stmt::AppProp { .. }
                | Stmt::ShellRun { .. }
                | Stmt::AddFolder { .. }
                | Stmt::AddFile { .. }
        )
    }
}
