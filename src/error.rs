/// Failures the data layer can surface to its callers.
///
/// Referential-integrity violations and lookups of unknown conversations both
/// collapse into `ConversationNotFound`; everything the database engine
/// reports bubbles up as `Db`.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("No conversation with id {0}")]
    ConversationNotFound(i32),

    #[error("Db error {0}")]
    Db(#[from] sea_orm::DbErr),
}
