//! Parser that turns one tokenized line into a `Stmt` and applies it to
//! the `ProjectModel`.
//!
//! Statements are matched by shape, not by token position: a line such as
//! `cx.log("x")` simply doesn't match the assignment shape and is ignored,
//! while `cx.project.name =` with no string after it is a fatal error.

use std::fs;
use std::path::Path;

use log::{debug, info, warn};

use super::ast::Stmt;
use super::lexer::{Token, TokenKind};
use crate::error::{CompileError, CompileErrorKind};
use crate::model::{FileEntry, ProjectModel};

/// Files above this size are accepted but flagged at parse time.
pub const LARGE_FILE_WARNING: u64 = 100 * 1024 * 1024;

/// The class scope the walker is currently in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    pub current: Option<OpenClass>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenClass {
    pub name: String,
    pub opened_at: usize,
}

impl Scope {
    /// True while inside `define class "<name>"` (never for an empty name).
    pub fn is_in(&self, name: &str) -> bool {
        !name.is_empty()
            && self
                .current
                .as_ref()
                .is_some_and(|open| open.name == name)
    }
}

/// Parse one line of tokens.
///
/// `program_scope` tells whether the line sits inside the program class;
/// the `cx` / `shell` / `files` forms are only recognised there.
pub fn parse_statement(
    tokens: &[Token],
    line: usize,
    program_scope: bool,
) -> Result<Stmt, CompileError> {
    Parser::new(tokens, line).parse(program_scope)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    line: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token], line: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            line,
        }
    }

    fn error(&self, kind: CompileErrorKind) -> CompileError {
        CompileError::new(self.line, kind)
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn next_token(&mut self) -> Option<&'a Token> {
        let tok = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(tok)
    }

    fn remaining(&self) -> usize {
        self.tokens.len() - self.pos
    }

    /// Consume the next token if it has the given kind.
    fn eat(&mut self, kind: TokenKind) -> bool {
        match self.peek() {
            Some(tok) if tok.kind == kind => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    /// Consume an identifier or keyword and return its text.
    fn word(&mut self) -> Option<&'a str> {
        match self.peek() {
            Some(tok) if is_word(tok.kind) => {
                self.pos += 1;
                Some(tok.text.as_str())
            }
            _ => None,
        }
    }

    fn eat_word(&mut self, text: &str) -> bool {
        match self.peek() {
            Some(tok) if is_word(tok.kind) && tok.text == text => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn found(&self) -> String {
        self.peek()
            .map(|t| t.text.clone())
            .unwrap_or_else(|| "end of line".to_string())
    }

    fn expect(
        &mut self,
        kind: TokenKind,
        expected: &'static str,
        context: &'static str,
    ) -> Result<(), CompileError> {
        if self.eat(kind) {
            return Ok(());
        }
        Err(self.error(CompileErrorKind::UnexpectedToken {
            expected,
            found: self.found(),
            context,
        }))
    }

    /// Next token must be a properly closed string literal.
    fn string(&mut self, what: &'static str) -> Result<String, CompileError> {
        match self.peek().and_then(Token::unquoted) {
            Some(value) => {
                self.pos += 1;
                Ok(value.to_string())
            }
            None => Err(self.error(CompileErrorKind::ExpectedString { what })),
        }
    }

    fn end(&self, context: &'static str) -> Result<(), CompileError> {
        if self.remaining() == 0 {
            return Ok(());
        }
        Err(self.error(CompileErrorKind::UnexpectedToken {
            expected: "end of line",
            found: self.found(),
            context,
        }))
    }

    fn parse(&mut self, program_scope: bool) -> Result<Stmt, CompileError> {
        let Some(first) = self.next_token() else {
            return Ok(Stmt::Other);
        };

        match first.kind {
            TokenKind::Comment => Ok(Stmt::Other),
            TokenKind::DirectiveGet => self.parse_get(),
            TokenKind::DirectiveFrom => self.parse_from(),
            TokenKind::KeywordProgram => {
                let class = self.string("after program")?;
                self.end("after program statement")?;
                Ok(Stmt::Program { class })
            }
            TokenKind::KeywordDefine => {
                self.expect(TokenKind::KeywordClass, "class", "after define")?;
                let name = self.string("after define class")?;
                self.end("after class name")?;
                Ok(Stmt::DefineClass { name })
            }
            TokenKind::KeywordFinish => {
                self.end("after finish")?;
                Ok(Stmt::Finish)
            }
            TokenKind::Identifier if program_scope => match first.text.as_str() {
                "cx" => self.parse_cx(),
                "shell" => self.parse_shell_run(),
                "files" => self.parse_files_add(),
                _ => Ok(Stmt::Other),
            },
            _ => Ok(Stmt::Other),
        }
    }

    fn parse_get(&mut self) -> Result<Stmt, CompileError> {
        if self.remaining() < 1 {
            return Err(self.error(CompileErrorKind::InvalidStatement("#get")));
        }
        let module = self.string("after #get")?;
        self.end("after #get module")?;
        Ok(Stmt::Get { module })
    }

    fn parse_from(&mut self) -> Result<Stmt, CompileError> {
        if self.remaining() < 3 {
            return Err(self.error(CompileErrorKind::InvalidStatement("#from")));
        }
        let module = self.string("after #from")?;
        if !self.eat_word("get") {
            return Err(self.error(CompileErrorKind::UnexpectedToken {
                expected: "get",
                found: self.found(),
                context: "in #from statement",
            }));
        }
        let name = self.string("after #from ... get")?;
        self.end("after #from statement")?;
        Ok(Stmt::From { module, name })
    }

    /// `cx . (project|app) . <prop> = "value"`
    fn parse_cx(&mut self) -> Result<Stmt, CompileError> {
        if !self.eat(TokenKind::Dot) {
            return Ok(Stmt::Other);
        }
        let section = match self.word() {
            Some(s @ ("project" | "app")) => s,
            _ => return Ok(Stmt::Other),
        };
        if !self.eat(TokenKind::Dot) {
            return Ok(Stmt::Other);
        }
        let Some(prop) = self.word() else {
            return Ok(Stmt::Other);
        };
        if !self.eat(TokenKind::Equals) {
            return Ok(Stmt::Other);
        }

        let value = self.string("value in assignment")?;
        self.end("after assignment")?;

        let prop = prop.to_string();
        Ok(match section {
            "project" => Stmt::ProjectProp { prop, value },
            _ => Stmt::AppProp { prop, value },
        })
    }

    /// `shell . run ( "cmd" [, ...] )`
    fn parse_shell_run(&mut self) -> Result<Stmt, CompileError> {
        if !(self.eat(TokenKind::Dot) && self.eat_word("run") && self.eat(TokenKind::LParen)) {
            return Ok(Stmt::Other);
        }
        let command = self.string("in shell.run()")?;

        // extra arguments are accepted and ignored
        while let Some(tok) = self.next_token() {
            if tok.kind == TokenKind::RParen {
                self.end("after shell.run()")?;
                return Ok(Stmt::ShellRun { command });
            }
        }
        Err(self.error(CompileErrorKind::UnexpectedToken {
            expected: ")",
            found: "end of line".to_string(),
            context: "to close shell.run()",
        }))
    }

    /// `files . add ( "folder" , "name" )` or
    /// `files . add ( "file" , "src" , "dest" )`
    fn parse_files_add(&mut self) -> Result<Stmt, CompileError> {
        if !(self.eat(TokenKind::Dot) && self.eat_word("add") && self.eat(TokenKind::LParen)) {
            return Ok(Stmt::Other);
        }
        let kind = self.string("in files.add()")?;

        let stmt = match kind.as_str() {
            "folder" => {
                self.expect(TokenKind::Comma, ",", "in files.add()")?;
                let name = self.string("folder name in files.add()")?;
                Stmt::AddFolder { name }
            }
            "file" => {
                self.expect(TokenKind::Comma, ",", "in files.add()")?;
                let src = self.string("source path in files.add()")?;
                self.expect(TokenKind::Comma, ",", "in files.add()")?;
                let dest = self.string("destination path in files.add()")?;
                Stmt::AddFile { src, dest }
            }
            _ => return Err(self.error(CompileErrorKind::UnknownFilesKind(kind))),
        };

        self.expect(TokenKind::RParen, ")", "to close files.add()")?;
        self.end("after files.add()")?;
        Ok(stmt)
    }
}

fn is_word(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Identifier
            | TokenKind::KeywordProgram
            | TokenKind::KeywordDefine
            | TokenKind::KeywordClass
            | TokenKind::KeywordFinish
    )
}

/// Apply a parsed statement to the model and the scope tracker.
///
/// Relative `files.add` sources are resolved against `base_dir`.
pub fn apply(
    stmt: Stmt,
    model: &mut ProjectModel,
    scope: &mut Scope,
    base_dir: &Path,
    line: usize,
) -> Result<(), CompileError> {
    let at = |kind: CompileErrorKind| CompileError::new(line, kind);

    if stmt.needs_program_scope() && !scope.is_in(&model.project.program_class) {
        debug!("line {line}: {stmt:?} outside the program class, ignored");
        return Ok(());
    }

    match stmt {
        Stmt::Get { module } => {
            model.push_module(&module).map_err(at)?;
            info!("Module \"{module}\" imported");
        }
        Stmt::From { module, name } => {
            model.push_from_module(&name).map_err(at)?;
            info!("Module \"{name}\" imported from \"{module}\"");
        }
        Stmt::Program { class } => {
            model.set_program_class(&class).map_err(at)?;
            info!("Program class set to \"{class}\"");
        }
        Stmt::DefineClass { name } => {
            if let Some(open) = &scope.current {
                return Err(at(CompileErrorKind::UnterminatedClass {
                    name: open.name.clone(),
                    opened_at: open.opened_at,
                }));
            }
            let is_program = !name.is_empty() && name == model.project.program_class;
            let is_app = !name.is_empty() && name == model.app.class;
            if (is_program && model.program_class_found) || (is_app && model.app_class_found) {
                return Err(at(CompileErrorKind::DuplicateClass(name)));
            }
            if is_program {
                model.program_class_found = true;
            }
            info!("Defining class \"{name}\"");
            scope.current = Some(OpenClass {
                name,
                opened_at: line,
            });
        }
        Stmt::Finish => match scope.current.take() {
            Some(open) => debug!("class \"{}\" finished at line {line}", open.name),
            None => debug!("line {line}: finish outside any class"),
        },
        Stmt::ProjectProp { prop, value } => {
            if model.set_project_property(&prop, &value).map_err(at)? {
                info!("Project {prop} set to \"{value}\"");
            } else {
                debug!("line {line}: unknown project property `{prop}` ignored");
            }
        }
        Stmt::AppProp { prop, value } => {
            if model.set_app_property(&prop, &value).map_err(at)? {
                info!("CX app {prop} set to \"{value}\"");
            } else {
                debug!("line {line}: unknown app property `{prop}` ignored");
            }
        }
        Stmt::ShellRun { command } => {
            model.push_shell_command(&command).map_err(at)?;
            info!("Shell command recorded: \"{command}\"");
        }
        Stmt::AddFolder { name } => {
            model.push_folder(&name).map_err(at)?;
            info!("Folder \"{name}\" added");
        }
        Stmt::AddFile { src, dest } => {
            let resolved = base_dir.join(&src);
            match fs::metadata(&resolved) {
                Err(_) => warn!("Source file \"{src}\" not found"),
                Ok(meta) => {
                    let size = meta.len();
                    info!(
                        "File \"{src}\" -> \"{dest}\" added (size: {size} bytes = {:.2} MB)",
                        size as f64 / (1024.0 * 1024.0)
                    );
                    if size > LARGE_FILE_WARNING {
                        warn!(
                            "Large file detected ({size} bytes). This may take time to compress."
                        );
                    }
                }
            }
            model
                .push_file(FileEntry {
                    src,
                    resolved,
                    dest,
                })
                .map_err(at)?;
        }
        Stmt::Other => {}
    }
    Ok(())
}
