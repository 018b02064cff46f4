use factotum_core::config::{AppConfig, LoadOptions};
use factotum_core::init_logging;
use factotum_db::{connect_with_settings, migrations, SeedDataset};

use crate::commands::CommandResult;

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "setup-db",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };
    init_logging(&config.logging);

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "setup-db",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;
        let seeded =
            SeedDataset::apply(&pool).await.map_err(|error| ("seed", error.to_string(), 5u8))?;
        let verification = SeedDataset::verify(&pool)
            .await
            .map_err(|error| ("verification", error.to_string(), 5u8))?;
        if !verification.passed {
            return Err(("verification", verification.failures.join("; "), 6u8));
        }
        pool.close().await;
        Ok::<_, (&'static str, String, u8)>(seeded)
    });

    match result {
        Ok(seeded) => CommandResult::success(
            "setup-db",
            format!(
                "fact store ready at `{}`: {} employees, {} products, {} sales",
                config.database.url, seeded.employees, seeded.products, seeded.sales
            ),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("setup-db", error_class, message, exit_code)
        }
    }
}
