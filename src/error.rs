pub type TemplateResult<T> = std::result::Result<T, DecodeError>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DecodeErrorKind {
    UnknownNodeType {
        t: u64,
    },
    MissingField {
        field: &'static str,
    },
    UnexpectedType {
        field: &'static str,
        expected: &'static str,
    },
    Message(String),
}

impl std::fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownNodeType { t } => {
                write!(f, "Unknown node type {}", t)
            }
            Self::MissingField { field } => {
                write!(f, "Missing field '{}'", field)
            }
            Self::UnexpectedType { field, expected } => {
                write!(f, "Field '{}' is not {}", field, expected)
            }
            Self::Message(msg) => {
                write!(f, "Decode error: {}", msg)
            }
        }
    }
}

impl std::error::Error for DecodeErrorKind {}

/// Error produced while decoding a compiled template from its JSON wire
/// format, carrying the path of the offending node within the document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DecodeError {
    pub path: String,
    pub kind: DecodeErrorKind,
}

impl DecodeError {
    pub fn new<P: Into<String>>(path: P, kind: DecodeErrorKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Decode error at {}: {}", self.path, self.kind)
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}
