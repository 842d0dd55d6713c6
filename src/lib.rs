pub mod entities;
pub mod error;
pub mod migrations;
pub mod repository;
pub mod state;
pub mod store;

use std::path::Path;

use sea_orm::{Database, DatabaseConnection};
use tracing::{debug, info};

pub use crate::error::ChatError;
pub use crate::repository::ChatRepository;
pub use crate::state::ChatViewModel;
pub use crate::store::ChatStore;

/// Open (creating if necessary) the sqlite database at `path` and bring the
/// schema up to date.
pub async fn init_db(path: &Path) -> Result<DatabaseConnection, sea_orm::DbErr> {
    if !path.exists() {
        if let Some(dir) = path.parent() {
            debug!("Attempting to create dir {}", dir.display());
            std::fs::create_dir_all(dir)
                .map_err(|err| sea_orm::DbErr::Custom(format!("Could not create dir: {err}")))?;
        }
        std::fs::File::create(path)
            .map_err(|err| sea_orm::DbErr::Custom(format!("Could not create db file: {err}")))?;
    }

    use sea_orm_migration::MigratorTrait;
    let filename = format!("sqlite:{}", path.display());
    let db = Database::connect(filename).await?;
    migrations::Migrator::up(&db, None).await?;
    info!("Ran migrations");
    Ok(db)
}
