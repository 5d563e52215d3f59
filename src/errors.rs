//! Error and trace model for loading and dumping
//!
//! One error family with three kinds:
//! - value-kind: shape or constraint violation (missing field, failed cast)
//! - type-kind: no handler recognizes the schema, or an incompatible outer shape
//! - attribute-kind: the input lacks an expected accessor (e.g. not an object)
//!
//! Every recursive load frame prepends a `TraceItem` while an error
//! propagates, so the final error carries the full root-to-leaf path.

use std::fmt;

use serde_json::Value;

/// Result type for load and dump operations
pub type LoadResult<T> = Result<T, Error>;

/// The three kinds of the error family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Shape or constraint violation
    Value,
    /// Unrecognized or incompatible type
    Type,
    /// Missing accessor on the input
    Attribute,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Value => write!(f, "value"),
            ErrorKind::Type => write!(f, "type"),
            ErrorKind::Attribute => write!(f, "attribute"),
        }
    }
}

/// What a recursing frame was doing when it descended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationKind {
    /// A named record field
    Field,
    /// A positional element of a sequence or tuple
    Index,
    /// A mapping key
    Key,
    /// A mapping value
    Value,
    /// A union member attempt
    Union,
    /// A forward-reference resolution
    ForwardRef,
}

/// The key attached to an annotation: a name or a numeric position
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationKey {
    Name(String),
    Index(usize),
}

/// Annotation supplied by the calling frame to describe a recursion step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub kind: AnnotationKind,
    pub key: AnnotationKey,
}

impl Annotation {
    pub fn field(name: impl Into<String>) -> Self {
        Self {
            kind: AnnotationKind::Field,
            key: AnnotationKey::Name(name.into()),
        }
    }

    pub fn index(i: usize) -> Self {
        Self {
            kind: AnnotationKind::Index,
            key: AnnotationKey::Index(i),
        }
    }

    pub fn key(name: impl Into<String>) -> Self {
        Self {
            kind: AnnotationKind::Key,
            key: AnnotationKey::Name(name.into()),
        }
    }

    pub fn value(name: impl Into<String>) -> Self {
        Self {
            kind: AnnotationKind::Value,
            key: AnnotationKey::Name(name.into()),
        }
    }

    pub fn union(member: impl Into<String>) -> Self {
        Self {
            kind: AnnotationKind::Union,
            key: AnnotationKey::Name(member.into()),
        }
    }

    pub fn forward_ref(name: impl Into<String>) -> Self {
        Self {
            kind: AnnotationKind::ForwardRef,
            key: AnnotationKey::Name(name.into()),
        }
    }

    /// Path segment for this annotation: `[n]` for numeric keys, the bare
    /// name otherwise.
    fn segment(&self) -> String {
        match &self.key {
            AnnotationKey::Index(i) => format!("[{}]", i),
            AnnotationKey::Name(n) => n.clone(),
        }
    }
}

/// One frame of the load recursion, recorded while an error propagates
#[derive(Debug, Clone)]
pub struct TraceItem {
    /// Snapshot of the value the frame was loading
    pub value: Value,
    /// Name of the schema type the frame was loading into
    pub type_name: String,
    /// Annotation supplied by the calling frame, `None` at the root
    pub annotation: Option<Annotation>,
}

impl TraceItem {
    pub fn new(value: Value, type_name: impl Into<String>, annotation: Option<Annotation>) -> Self {
        Self {
            value,
            type_name: type_name.into(),
            annotation,
        }
    }
}

/// Error raised by loaders and dumpers
///
/// `trace` is ordered root to leaf. `causes` is populated only by the
/// union resolver, one entry per failed candidate.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    description: String,
    value: Value,
    type_name: String,
    /// Recursion frames, outermost first
    pub trace: Vec<TraceItem>,
    /// Nested failures from union candidate attempts
    pub causes: Vec<Error>,
}

impl Error {
    fn new(
        kind: ErrorKind,
        description: impl Into<String>,
        value: &Value,
        type_name: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            description: description.into(),
            value: value.clone(),
            type_name: type_name.into(),
            trace: Vec::new(),
            causes: Vec::new(),
        }
    }

    /// Create a value-kind error
    pub fn value_error(
        description: impl Into<String>,
        value: &Value,
        type_name: impl Into<String>,
    ) -> Self {
        Self::new(ErrorKind::Value, description, value, type_name)
    }

    /// Create a type-kind error
    pub fn type_error(
        description: impl Into<String>,
        value: &Value,
        type_name: impl Into<String>,
    ) -> Self {
        Self::new(ErrorKind::Type, description, value, type_name)
    }

    /// Create an attribute-kind error
    pub fn attribute_error(
        description: impl Into<String>,
        value: &Value,
        type_name: impl Into<String>,
    ) -> Self {
        Self::new(ErrorKind::Attribute, description, value, type_name)
    }

    /// Attach nested candidate failures (union resolver)
    pub fn with_causes(mut self, causes: Vec<Error>) -> Self {
        self.causes = causes;
        self
    }

    /// Prepend a recursion frame; called by each frame as the error
    /// propagates outward, so the trace ends up ordered root to leaf.
    pub fn prepend_trace(&mut self, item: TraceItem) {
        self.trace.insert(0, item);
    }

    /// Returns the error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the value that could not be loaded
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Returns the name of the type the value could not be loaded into
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Renders the trace as a dotted/bracketed path, e.g. `.users.[2].name`.
    ///
    /// A leading unannotated root renders as an empty segment, so paths
    /// start with `.`. Unannotated inner frames (wrapper types such as
    /// optionals and aliases recursing in place) contribute no segment.
    pub fn path(&self) -> String {
        let segments: Vec<String> = self
            .trace
            .iter()
            .enumerate()
            .filter_map(|(i, item)| match &item.annotation {
                Some(a) => Some(a.segment()),
                None if i == 0 => Some(String::new()),
                None => None,
            })
            .collect();
        segments.join(".")
    }

    fn render(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        let pad = "  ".repeat(indent);
        writeln!(f, "{}{}", pad, self.description)?;
        writeln!(f, "{}Value: {}", pad, compress_value(&self.value))?;
        writeln!(f, "{}Type: {}", pad, self.type_name)?;
        if !self.trace.is_empty() {
            writeln!(f, "{}Load trace:", pad)?;
            for item in &self.trace {
                write!(f, "{}  Type: {} ", pad, item.type_name)?;
                if let Some(a) = &item.annotation {
                    write!(f, "Annotation: ({:?} {}) ", a.kind, a.segment())?;
                }
                writeln!(f, "Value: {}", compress_value(&item.value))?;
            }
            writeln!(f, "{}Path: {}", pad, self.path())?;
        }
        if !self.causes.is_empty() {
            writeln!(f, "{}Caused by:", pad)?;
            for cause in &self.causes {
                cause.render(f, indent + 1)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, 0)
    }
}

impl std::error::Error for Error {}

/// Truncates long value snapshots for error messages.
fn compress_value(value: &Value) -> String {
    let s = value.to_string();
    if s.chars().count() > 80 {
        let head: String = s.chars().take(77).collect();
        format!("{}...", head)
    } else {
        s
    }
}
