use sea_orm_migration::prelude::*;

#[tokio::main]
async fn main() {
    // Point the migration CLI at a local sqlite file by default.
    let key = "DATABASE_URL";
    let value = "sqlite:./chat.sqlite";
    let path = std::path::Path::new("./chat.sqlite");
    if !path.exists() {
        std::fs::File::create(path).expect("Could not create db file");
    }
    if std::env::var(key).is_err() {
        std::env::set_var(key, value);
    }
    cli::run_cli(delachat::migrations::Migrator).await;
}
