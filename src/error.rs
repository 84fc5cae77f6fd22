//! Compilation error types.
//!
//! One error type covers the whole pipeline, tagged with a kind that
//! determines its blast radius: `Config` aborts the run before any board is
//! processed, every other kind aborts only the board being compiled.

use std::fmt;

/// Result alias for pipeline operations.
pub type CompileResult<T> = Result<T, CompileError>;

/// Category of compilation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileErrorKind {
    /// Malformed or incomplete source configuration. Aborts the whole run.
    Config,
    /// A key token references a behavior id absent from the alias registry.
    UnknownBehavior,
    /// Parameter arity mismatch between a token and its alias declaration.
    Translation,
    /// A layer, extension, or full layout resolved to the wrong length.
    LayoutShape,
    /// An auxiliary structure references a keycode, position, or layer not
    /// present in the compiled output.
    Reference,
}

impl fmt::Display for CompileErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Config => "configuration error",
            Self::UnknownBehavior => "unknown behavior",
            Self::Translation => "translation error",
            Self::LayoutShape => "layout shape error",
            Self::Reference => "reference error",
        };
        write!(f, "{name}")
    }
}

/// A single compilation error with optional source context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    /// Error category.
    pub kind: CompileErrorKind,
    /// Layer where the error occurred, if known.
    pub layer: Option<String>,
    /// Canonical key position where the error occurred, if known.
    pub position: Option<usize>,
    /// Human-readable description.
    pub message: String,
    /// Optional hint for fixing the error.
    pub suggestion: Option<String>,
}

impl CompileError {
    /// Creates a new error with the given kind and message.
    pub fn new(kind: CompileErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            layer: None,
            position: None,
            message: message.into(),
            suggestion: None,
        }
    }

    /// Creates a `Config` error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(CompileErrorKind::Config, message)
    }

    /// Creates an `UnknownBehavior` error.
    pub fn unknown_behavior(message: impl Into<String>) -> Self {
        Self::new(CompileErrorKind::UnknownBehavior, message)
    }

    /// Creates a `Translation` error.
    pub fn translation(message: impl Into<String>) -> Self {
        Self::new(CompileErrorKind::Translation, message)
    }

    /// Creates a `LayoutShape` error.
    pub fn layout_shape(message: impl Into<String>) -> Self {
        Self::new(CompileErrorKind::LayoutShape, message)
    }

    /// Creates a `Reference` error.
    pub fn reference(message: impl Into<String>) -> Self {
        Self::new(CompileErrorKind::Reference, message)
    }

    /// Attaches the layer this error occurred in.
    #[must_use]
    pub fn with_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = Some(layer.into());
        self
    }

    /// Attaches the canonical key position this error occurred at.
    #[must_use]
    pub const fn with_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    /// Attaches a fix suggestion.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;

        if let Some(layer) = &self.layer {
            write!(f, " [layer: {layer}")?;
            if let Some(position) = self.position {
                write!(f, ", position: {position}")?;
            }
            write!(f, "]")?;
        } else if let Some(position) = self.position {
            write!(f, " [position: {position}]")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, " (hint: {suggestion})")?;
        }

        Ok(())
    }
}

impl std::error::Error for CompileError {}
