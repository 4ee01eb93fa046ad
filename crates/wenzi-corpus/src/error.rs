use thiserror::Error;

/// Errors raised while fetching or parsing a corpus.
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    /// An unsupported tokenization mode was requested.
    #[error("cutter error, please use one of {{char, jieba, none}}, got {0:?}")]
    InvalidCutter(String),

    /// An unknown subset name was requested.
    #[error("unknown subset {0:?}, expected one of {{train, test, valid}}")]
    InvalidSubset(String),

    /// An optional component is not compiled in.
    #[error("{name} is not available, please install it: {hint}")]
    MissingDependency {
        name: &'static str,
        hint: &'static str,
    },

    /// The archive did not contain the expected file.
    #[error("corpus file missing: {0}")]
    MissingFile(String),

    #[error(transparent)]
    Core(#[from] wenzi_core::WenziError),
}

pub type Result<T> = std::result::Result<T, CorpusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = CorpusError::InvalidCutter("spacy".into());
        assert!(err.to_string().contains("char, jieba, none"));

        let err = CorpusError::MissingDependency {
            name: "jieba",
            hint: "build with `--features jieba`",
        };
        assert!(err.to_string().contains("please install"));
    }
}
