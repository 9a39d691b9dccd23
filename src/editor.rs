//! `--edit`: open the subscription file in the user's editor and check it.
//!
//! Lines that do not parse get a marker comment above them and the editor is
//! opened again, up to [`MAX_ATTEMPTS`] times.
use crate::storage::{atomic_write, is_comment_or_blank, parse_line, StorageError};
use std::path::Path;
use std::process::Command;
use thiserror::Error;

pub const MAX_ATTEMPTS: usize = 3;
pub const DEFAULT_EDITOR: &str = "vi";
pub const INVALID_LINE_MARKER: &str = "# the following line does not respect the pattern";

#[derive(Debug, Error)]
pub enum EditError {
    #[error("Failed to start editor '{editor}': {source}")]
    Spawn {
        editor: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Editor '{editor}' exited with {status}")]
    EditorFailed { editor: String, status: String },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Subscription file still has {invalid} invalid line(s) after {attempts} attempts")]
    TooManyAttempts { invalid: usize, attempts: usize },
}

/// `$EDITOR`, or `vi` when unset or blank.
pub fn editor_command() -> String {
    std::env::var("EDITOR")
        .ok()
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_EDITOR.to_string())
}

/// Run the edit/check cycle on `path`.
pub fn edit_subscriptions(path: &Path, editor: &str) -> Result<(), EditError> {
    for attempt in 1..=MAX_ATTEMPTS {
        run_editor(editor, path)?;

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "Editor left no subscription file");
                return Ok(());
            }
            Err(e) => return Err(StorageError::io(path, e).into()),
        };

        let (annotated, invalid) = annotate(&content);
        if annotated != content {
            atomic_write(path, annotated.as_bytes())?;
        }
        if invalid == 0 {
            tracing::info!(attempt, "Subscription file is valid");
            return Ok(());
        }

        tracing::warn!(attempt, invalid, "Subscription file has invalid lines");
        if attempt == MAX_ATTEMPTS {
            return Err(EditError::TooManyAttempts {
                invalid,
                attempts: MAX_ATTEMPTS,
            });
        }
    }
    Ok(())
}

fn run_editor(editor: &str, path: &Path) -> Result<(), EditError> {
    let mut words = editor.split_whitespace();
    let program = words.next().unwrap_or(DEFAULT_EDITOR);

    let status = Command::new(program)
        .args(words)
        .arg(path)
        .status()
        .map_err(|source| EditError::Spawn {
            editor: editor.to_string(),
            source,
        })?;

    if status.success() {
        Ok(())
    } else {
        Err(EditError::EditorFailed {
            editor: editor.to_string(),
            status: status.to_string(),
        })
    }
}

/// Drop markers left by a previous round, then put a fresh marker above
/// each line that does not parse. Returns the new text and the number of
/// invalid lines.
pub fn annotate(content: &str) -> (String, usize) {
    let mut out = String::with_capacity(content.len());
    let mut invalid = 0;

    for line in content.lines() {
        if line.trim_end() == INVALID_LINE_MARKER {
            continue;
        }
        if !is_comment_or_blank(line) && parse_line(line).is_none() {
            invalid += 1;
            out.push_str(INVALID_LINE_MARKER);
            out.push('\n');
        }
        out.push_str(line);
        out.push('\n');
    }

    (out, invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_valid_file_unchanged() {
        let content = "# news\nhttps://a.example.com/rss #\"A\"\n\nhttps://b.example.com/rss\n";
        assert_eq!(annotate(content), (content.to_string(), 0));
    }

    #[test]
    fn test_invalid_line_marked() {
        let (out, invalid) = annotate("https://a.example.com/rss\nnot a url\n");
        assert_eq!(invalid, 1);
        assert_eq!(
            out,
            format!("https://a.example.com/rss\n{}\nnot a url\n", INVALID_LINE_MARKER)
        );
    }

    #[test]
    fn test_old_markers_replaced() {
        let first = annotate("ftp://x\n").0;
        let (fixed, invalid) = annotate(&first.replace("ftp://x", "https://x.example.com"));
        assert_eq!(invalid, 0);
        assert_eq!(fixed, "https://x.example.com\n");
    }

    #[test]
    fn test_edit_cycle_with_scripted_editor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls");
        std::fs::write(&path, "https://a.example.com/rss\n").unwrap();

        // `true` leaves the file as it is.
        edit_subscriptions(&path, "true").unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "https://a.example.com/rss\n"
        );

        std::fs::write(&path, "garbage\n").unwrap();
        let err = edit_subscriptions(&path, "true").unwrap_err();
        assert!(matches!(
            err,
            EditError::TooManyAttempts {
                invalid: 1,
                attempts: MAX_ATTEMPTS
            }
        ));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            format!("{}\ngarbage\n", INVALID_LINE_MARKER)
        );
    }

    #[test]
    fn test_failing_editor_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls");
        assert!(matches!(
            edit_subscriptions(&path, "false"),
            Err(EditError::EditorFailed { .. })
        ));
    }
}
