//! Name validation for create, rename and move targets.

use std::path::{Path, PathBuf};

use hyperplane_core::{FileHandle, OpsError, PathResolver};

/// Why a name was flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameIssue {
    /// The parent has no writable local path.
    NotWritable,
    /// `.` or `..`, or an empty name.
    ReservedName,
    /// The name contains a path separator or NUL.
    ContainsSeparator,
    /// A folder already sits at the target.
    FolderExists,
    /// A file already sits at the target.
    FileExists,
    /// The name starts with a dot.
    Hidden,
}

/// A message to show before performing the operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationMessage {
    Warning(String),
    Error(String),
}

impl ValidationMessage {
    /// The message text.
    pub fn text(&self) -> &str {
        match self {
            Self::Warning(text) | Self::Error(text) => text,
        }
    }
}

/// Outcome of validating a candidate name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    /// Whether the name may be used.
    pub is_valid: bool,
    /// Warning (when valid) or error (when invalid).
    pub message: Option<ValidationMessage>,
    /// Classification of the message.
    pub issue: Option<NameIssue>,
    /// The path the name would land on, once it could be computed.
    pub target: Option<PathBuf>,
}

impl ValidationResult {
    fn ok(target: PathBuf) -> Self {
        Self {
            is_valid: true,
            message: None,
            issue: None,
            target: Some(target),
        }
    }

    fn warning(issue: NameIssue, text: String, target: PathBuf) -> Self {
        Self {
            is_valid: true,
            message: Some(ValidationMessage::Warning(text)),
            issue: Some(issue),
            target: Some(target),
        }
    }

    fn error(issue: NameIssue, text: String, target: Option<PathBuf>) -> Self {
        Self {
            is_valid: false,
            message: Some(ValidationMessage::Error(text)),
            issue: Some(issue),
            target,
        }
    }

    /// Convert into a `Result`, keeping any warning text on success.
    pub fn into_result(self, name: &str) -> Result<Option<String>, OpsError> {
        let text = self.message.as_ref().map(|m| m.text().to_string());
        if self.is_valid {
            return Ok(text);
        }

        let reason = text.unwrap_or_default();
        Err(match self.issue {
            Some(NameIssue::NotWritable) => OpsError::NotWritable {
                path: self.target.unwrap_or_default(),
            },
            Some(NameIssue::FolderExists | NameIssue::FileExists) => OpsError::NameCollision {
                path: self.target.unwrap_or_default(),
            },
            _ => OpsError::InvalidName {
                name: name.to_string(),
                reason,
            },
        })
    }
}

/// Decides whether a name is acceptable inside (or next to) a location.
#[derive(Debug, Clone)]
pub struct NameValidator {
    resolver: PathResolver,
}

impl NameValidator {
    /// Create a validator using `resolver` to locate parents.
    pub fn new(resolver: PathResolver) -> Self {
        Self { resolver }
    }

    /// Validate `name` as a child of `handle`, or as its sibling when
    /// `siblings` is set (a rename in place).
    pub fn validate(&self, handle: &FileHandle, name: &str, siblings: bool) -> ValidationResult {
        let Ok(path) = self.resolver.resolve(handle) else {
            // Locations without a local path are assumed read-only.
            return ValidationResult::error(
                NameIssue::NotWritable,
                "The path is not writable.".into(),
                None,
            );
        };

        validate_at(&path, name, siblings)
    }
}

/// Validate `name` relative to an already resolved `path`.
pub fn validate_at(path: &Path, name: &str, siblings: bool) -> ValidationResult {
    let is_dir = path.is_dir();
    let is_file = !is_dir && path.exists();
    let noun = if is_dir { "folder" } else { "file" };
    let noun_plural = if is_dir { "Folders" } else { "Files" };

    if name.is_empty() || name == "." || name == ".." {
        return ValidationResult::error(
            NameIssue::ReservedName,
            format!("A {noun} cannot be called \"{name}\"."),
            None,
        );
    }

    if let Some(c) = name
        .chars()
        .find(|&c| std::path::is_separator(c) || c == '\0')
    {
        return ValidationResult::error(
            NameIssue::ContainsSeparator,
            format!("{} names cannot contain \"{}\".", capitalize(noun), c.escape_default()),
            None,
        );
    }

    let target = if siblings {
        path.parent().unwrap_or(Path::new("")).join(name)
    } else {
        path.join(name)
    };
    let target_is_dir = target.is_dir();
    let target_is_file = !target_is_dir && target.exists();

    if target_is_dir && is_dir && target != path {
        return ValidationResult::error(
            NameIssue::FolderExists,
            "A folder with that name already exists.".into(),
            Some(target),
        );
    }

    if target_is_file && is_file && target != path {
        return ValidationResult::error(
            NameIssue::FileExists,
            "A file with that name already exists.".into(),
            Some(target),
        );
    }

    if name.starts_with('.') {
        return ValidationResult::warning(
            NameIssue::Hidden,
            format!("{noun_plural} with \u{201c}.\u{201d} at the beginning of their name are hidden."),
            target,
        );
    }

    ValidationResult::ok(target)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
