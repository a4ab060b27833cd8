use thiserror::Error;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("catalog error: {0}")]
    Catalog(#[from] rotasim_core::CatalogError),
    #[error("unknown rule list: {0}")]
    UnknownList(String),
    #[error("rule set has no entry list")]
    MissingEntryList,
    #[error("serialize error: {0}")]
    Serialize(String),
}

impl From<serde_json::Error> for PolicyError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialize(value.to_string())
    }
}
