use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The buffer ended before a header, question or record field.
    #[error("message ended before all of its fields could be read")]
    TruncatedMessage,
    #[error("malformed record: {0}")]
    MalformedRecord(String),
    #[error("the {section} section holds {len} entries, more than a message can carry")]
    SectionOverflow { section: &'static str, len: usize },
}
