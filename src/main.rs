use std::fs::File;

use anyhow::Context;
use log::{error, info};
use medrecord_loader::{
    ClinicalSchemas, DocumentStore, LoaderConfig, MongoStore, provision_access, run_load,
};

fn init_logging(config: &LoaderConfig) -> anyhow::Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(path) = &config.log_file {
        let file = File::options()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut config = LoaderConfig::from_env().context("Invalid configuration")?;
    if let Some(path) = std::env::args().nth(1) {
        config = config.with_csv_path(path);
    }
    init_logging(&config)?;

    // Step 1: roles and users, on the administrative connection
    let admin = MongoStore::connect(&config.admin_mongo_uri, &config.db_name)
        .await
        .context("Failed to connect with the administrative URI")?;
    let provisioned = provision_access(&admin, &config.db_name, &config.access).await;
    admin.close().await?;
    provisioned.context("Failed to provision roles and users")?;

    // Step 2: the data load, on the loader connection
    let store = MongoStore::connect(&config.mongo_uri, &config.db_name)
        .await
        .context("Failed to connect with the loader URI")?;
    let schemas = ClinicalSchemas::new();
    let outcome = run_load(&store, &schemas, &config).await;
    store.close().await?;
    info!("Database connection closed");

    match outcome {
        Ok(summary) => {
            info!("Load complete: {}", serde_json::to_string(&summary)?);
            Ok(())
        }
        Err(err) => {
            error!("Fatal error: {err}");
            Err(err).context(format!("Failed to load {}", config.csv_path.display()))
        }
    }
}
