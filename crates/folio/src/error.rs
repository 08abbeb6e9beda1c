#[derive(thiserror::Error, Debug, serde::Deserialize, serde::Serialize)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    #[error("Bookmark title must not be empty")]
    EmptyTitle,

    #[error("Bookmark level must be 1 or greater, got {0}")]
    InvalidLevel(i32),

    #[error("Page {page} is out of range (document has {count} pages)")]
    PageOutOfRange { page: usize, count: usize },

    #[error("No bookmark #{index} on page {page}")]
    NoSuchBookmark { page: u32, index: usize },

    #[error("Invalid value {value:?}: {reason}")]
    InvalidArgument { value: String, reason: String },

    #[error("Nothing to do: {0}")]
    NothingToDo(String),
}
