use serde::de::DeserializeOwned;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

type InputResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Where a command's input record comes from.
#[derive(Debug, PartialEq, Eq)]
enum Source<'a> {
    File(&'a str),
    Stdin,
    Flags,
}

/// `--input` wins, then explicit flags, then piped stdin.
fn pick_source(path: Option<&str>, flags_given: bool, stdin_piped: bool) -> Source<'_> {
    match path {
        Some(path) => Source::File(path),
        None if flags_given => Source::Flags,
        None if stdin_piped => Source::Stdin,
        None => Source::Flags,
    }
}

/// Load a typed input record from `--input <file>` or, when no inline flags
/// were given, from JSON piped on stdin. `None` means the command should
/// build its input from flags.
pub fn load<T: DeserializeOwned>(
    path: Option<&str>,
    flags_given: bool,
) -> InputResult<Option<T>> {
    let stdin_piped = !atty::is(atty::Stream::Stdin);
    match pick_source(path, flags_given, stdin_piped) {
        Source::File(path) => read_json(path).map(Some),
        Source::Flags => {
            if flags_given && stdin_piped {
                tracing::warn!("inline flags given; ignoring piped stdin");
            }
            Ok(None)
        }
        Source::Stdin => match read_stdin()? {
            Some(contents) => {
                let value: T = serde_json::from_str(&contents)
                    .map_err(|e| format!("Failed to parse stdin: {}", e))?;
                Ok(Some(value))
            }
            None => Ok(None),
        },
    }
}

/// Read a JSON file and deserialise into a typed struct.
fn read_json<T: DeserializeOwned>(path: &str) -> InputResult<T> {
    let canonical = resolve_path(path)?;
    tracing::debug!(path = %canonical.display(), "reading input file");
    let contents = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    let value: T = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?;
    Ok(value)
}

/// Piped stdin contents, or `None` when it is empty.
fn read_stdin() -> InputResult<Option<String>> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;

    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    Ok(Some(trimmed.to_string()))
}

fn resolve_path(path: &str) -> InputResult<PathBuf> {
    let p = Path::new(path);
    let canonical = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };

    if !canonical.is_file() {
        return Err(format!("Input file not found: {}", canonical.display()).into());
    }
    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_file_wins() {
        assert_eq!(pick_source(Some("loan.json"), true, true), Source::File("loan.json"));
        assert_eq!(pick_source(Some("loan.json"), false, false), Source::File("loan.json"));
    }

    #[test]
    fn test_flags_take_precedence_over_piped_stdin() {
        assert_eq!(pick_source(None, true, true), Source::Flags);
    }

    #[test]
    fn test_piped_stdin_used_without_flags() {
        assert_eq!(pick_source(None, false, true), Source::Stdin);
        assert_eq!(pick_source(None, false, false), Source::Flags);
    }
}
