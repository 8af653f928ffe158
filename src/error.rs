use std::path::PathBuf;

use thiserror::Error;


/// Main application error type that encompasses all possible failure modes
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    #[error("Registry load error: {0}")]
    Load(#[from] LoadError),

    #[error("Missing <{element}> in {context}")]
    MissingElement { context: String, element: String },

    #[error("Extension {extension} references unknown platform {platform}")]
    UnknownPlatform { extension: String, platform: String },

    #[error("Unknown bitmask storage type for {name}: {width}")]
    UnknownBitmaskWidth { name: String, width: String },

    #[error("Structure {name} extends other structures but has no structure type")]
    MissingStructureType { name: String },

    #[error("Unparseable externsync expression in {command}: {expression}")]
    ExternSyncFormat { command: String, expression: String },
}

/// LibXML2-specific error types
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Document parsing failed: {source_name}:{line}: {message}")]
    ParseFailed {
        source_name: String,
        line: i32,
        message: String,
    },

    #[error("Document has no root element: {source_name}")]
    EmptyDocument { source_name: String },

    #[error("Document too large for libxml2: {size} bytes")]
    DocumentTooLarge { size: usize },

    #[error("Memory allocation failed in libxml2")]
    MemoryAllocation,
}

impl RegistryError {
    pub(crate) fn missing(context: impl Into<String>, element: impl Into<String>) -> Self {
        RegistryError::MissingElement {
            context: context.into(),
            element: element.into(),
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, RegistryError>;

/// LibXML2 result type alias
pub type LoadResult<T> = std::result::Result<T, LoadError>;
