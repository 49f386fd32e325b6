//! Start the packaged script with the configured interpreter.

use std::path::Path;
use std::process::{Command, ExitStatus};

use log::info;

use crate::error::PackageError;

/// Run `<shell...> <script>` with `cwd` as the child's working directory
/// and wait for it. The caller's own working directory is left alone.
///
/// `shell` may carry arguments (`"python3 -u"`); see [`split_shell`].
pub fn launch(shell: &str, script: &Path, cwd: &Path) -> Result<ExitStatus, PackageError> {
    let words = split_shell(shell)?;
    let (program, args) = words.split_first().ok_or(PackageError::MissingShell)?;

    info!("Shell command: {shell}");
    info!("Running application...");
    Command::new(program)
        .args(args)
        .arg(script)
        .current_dir(cwd)
        .status()
        .map_err(|e| PackageError::io(format!("Cannot launch `{shell}`"), e))
}

/// Split a shell setting into words. Whitespace separates words; single or
/// double quotes group text (spaces included) into one word and are
/// removed. There are no escapes or expansions.
pub fn split_shell(shell: &str) -> Result<Vec<String>, PackageError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote = None;

    for c in shell.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None => match c {
                '"' | '\'' => {
                    quote = Some(c);
                    in_word = true;
                }
                c if c.is_whitespace() => {
                    if in_word {
                        words.push(std::mem::take(&mut current));
                        in_word = false;
                    }
                }
                c => {
                    current.push(c);
                    in_word = true;
                }
            },
        }
    }

    if quote.is_some() {
        return Err(PackageError::UnbalancedQuote(shell.to_string()));
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_shell() {
        let test_cases = vec![
            ("bash", vec!["bash"]),
            ("  python3   -u ", vec!["python3", "-u"]),
            (r#""/opt/my py/python3" -u"#, vec!["/opt/my py/python3", "-u"]),
            ("sh -c 'echo a b'", vec!["sh", "-c", "echo a b"]),
            (r#"run"ner x""#, vec!["runner x"]),
            (r#"sh """#, vec!["sh", ""]),
            ("   ", vec![]),
        ];
        for (shell, expected) in test_cases {
            assert_eq!(split_shell(shell).unwrap(), expected, "shell: {shell}");
        }
    }

    #[test]
    fn test_unbalanced_quote() {
        assert!(matches!(
            split_shell(r#""/opt/py"#),
            Err(PackageError::UnbalancedQuote(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_launch_runs_in_cwd() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("s.sh");
        std::fs::write(&script, "pwd > where.txt\nexit 3\n").unwrap();

        let status = launch("sh", &script, dir.path()).unwrap();
        assert_eq!(status.code(), Some(3));

        let where_ = std::fs::read_to_string(dir.path().join("where.txt")).unwrap();
        let expected = dir.path().canonicalize().unwrap();
        assert_eq!(Path::new(where_.trim()).canonicalize().unwrap(), expected);
    }

    #[cfg(unix)]
    #[test]
    fn test_quoted_interpreter_path() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("my bin");
        std::fs::create_dir(&bin).unwrap();
        std::os::unix::fs::symlink("/bin/sh", bin.join("shell")).unwrap();

        let script = dir.path().join("s.sh");
        std::fs::write(&script, "exit 5\n").unwrap();
        let shell = format!("\"{}\"", bin.join("shell").display());
        let status = launch(&shell, &script, dir.path()).unwrap();
        assert_eq!(status.code(), Some(5));
    }

    #[test]
    fn test_empty_shell() {
        let dir = tempfile::tempdir().unwrap();
        let err = launch("  ", &dir.path().join("x"), dir.path()).unwrap_err();
        assert!(matches!(err, PackageError::MissingShell));
    }

    #[cfg(unix)]
    #[test]
    fn test_missing_interpreter() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("x");
        let err = launch("no-such-interpreter-cx", &script, dir.path()).unwrap_err();
        assert!(matches!(err, PackageError::Io { .. }));
    }
}
