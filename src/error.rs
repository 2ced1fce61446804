use std::fmt;

#[derive(Debug)]
pub enum AcidError {
    Codec(CodecError),
    State(StateError),
}

#[derive(Debug)]
pub enum CodecError {
    Base64(base64::DecodeError),
    MissingGlobal,
    Truncated {
        block: u8,
        needed: usize,
        available: usize,
    },
}

#[derive(Debug)]
pub enum StateError {
    Json(serde_json::Error),
    UnsupportedVersion(u32),
}

impl fmt::Display for AcidError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcidError::Codec(e) => write!(f, "Codec error: {e}"),
            AcidError::State(e) => write!(f, "State error: {e}"),
        }
    }
}

impl std::error::Error for AcidError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AcidError::Codec(e) => Some(e),
            AcidError::State(e) => Some(e),
        }
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Base64(e) => write!(f, "Invalid base64: {e}"),
            CodecError::MissingGlobal => write!(f, "No GLOBAL block in pattern data"),
            CodecError::Truncated { block, needed, available } => write!(
                f,
                "Block {block} truncated: needed {needed} bytes, {available} available"
            ),
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CodecError::Base64(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateError::Json(e) => write!(f, "Invalid project JSON: {e}"),
            StateError::UnsupportedVersion(v) => write!(f, "Unsupported project version {v}"),
        }
    }
}

impl std::error::Error for StateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StateError::Json(e) => Some(e),
            StateError::UnsupportedVersion(_) => None,
        }
    }
}

impl From<base64::DecodeError> for CodecError {
    fn from(e: base64::DecodeError) -> Self {
        CodecError::Base64(e)
    }
}

impl From<serde_json::Error> for StateError {
    fn from(e: serde_json::Error) -> Self {
        StateError::Json(e)
    }
}

impl From<CodecError> for AcidError {
    fn from(e: CodecError) -> Self {
        AcidError::Codec(e)
    }
}

impl From<StateError> for AcidError {
    fn from(e: StateError) -> Self {
        AcidError::State(e)
    }
}
