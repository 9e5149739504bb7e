use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use tracing_subscriber::{fmt, EnvFilter};

use foodgram::{
    config::{Cli, Command, ServeArgs, Settings},
    fixtures::{load_ingredients, load_tags},
    jwt::SessionKeys,
    routes::{app, AppState},
    MIGRATOR,
};

async fn migrate(pool: &Pool<Postgres>) -> Result<()> {
    MIGRATOR.run(pool).await.wrap_err("migration failed")?;
    log::info!("Database schema is up to date");
    Ok(())
}

async fn serve(args: ServeArgs, pool: Pool<Postgres>) -> Result<()> {
    migrate(&pool).await?;

    let keys = SessionKeys::new(args.jwt_secret.as_bytes(), args.token_lifetime_hours)
        .wrap_err("invalid signing secret")?;
    let settings = Settings::from(&args);
    let media_root = settings.media.root();
    tokio::fs::create_dir_all(media_root)
        .await
        .wrap_err_with(|| format!("cannot create media root {}", media_root.display()))?;

    let state = AppState::new(pool, keys, settings);
    let (addr, server) = warp::serve(app(state))
        .try_bind_with_graceful_shutdown(args.bind, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for shutdown signal: {e}");
            }
        })
        .wrap_err_with(|| format!("cannot bind {}", args.bind))?;

    log::info!("Listening on http://{addr}");
    server.await;
    log::info!("Server stopped");
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(cli.max_connections)
        .connect(&cli.database_url)
        .await
        .wrap_err("cannot connect to database")?;

    match cli.command {
        Command::Serve(args) => serve(args, pool).await,
        Command::Migrate => migrate(&pool).await,
        Command::LoadTags { path } => {
            let report = load_tags(&path, &pool).await?;
            println!("{} tags added, {} already present", report.created, report.existing);
            Ok(())
        }
        Command::LoadIngredients { path } => {
            let report = load_ingredients(&path, &pool).await?;
            println!(
                "{} ingredients added, {} already present",
                report.created, report.existing
            );
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let _ = dotenvy::dotenv();
    if let Err(e) = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("foodgram=info")),
        )
        .try_init()
    {
        eprintln!("tracing init failed: {e}");
    }

    run(Cli::parse()).await
}
