use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("channel name {0:?} is already taken")]
    NameTaken(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}
