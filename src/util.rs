use std::path::{Path, PathBuf};

const REDIRECTION_TOKENS: [&str; 5] = [">", ">>", "<", "2>", "2>&1"];

pub fn is_redirection(token: &str) -> bool {
    REDIRECTION_TOKENS.contains(&token)
}

/// Checks the final extension of `path`, ignoring case.
pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

/// Directory a file lives in, with a bare file name resolving to `.`.
pub fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Joins an argument vector into one command line for the host shell.
pub fn shell_line(argv: &[String]) -> String {
    argv.iter()
        .map(|arg| {
            if is_redirection(arg) {
                arg.clone()
            } else {
                quote(arg)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(not(windows))]
fn quote(arg: &str) -> String {
    let is_plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:+,@%".contains(c));

    if is_plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

#[cfg(windows)]
fn quote(arg: &str) -> String {
    if !arg.is_empty() && !arg.contains([' ', '\t', '"', '&', '|', '^', '(', ')', '%']) {
        arg.to_string()
    } else {
        // `%` is expanded even inside quotes; step outside them to escape it.
        let escaped = arg.replace('"', "\"\"").replace('%', "\"^%\"");
        format!("\"{escaped}\"")
    }
}

/// The line handed to `cmd /C`. cmd strips the outermost pair of quotes, so
/// one extra pair keeps a quoted first token intact.
#[cfg(windows)]
pub fn cmd_line(argv: &[String]) -> String {
    format!("\"{}\"", shell_line(argv))
}
