use std::{net::SocketAddr, path::PathBuf};

use clap::{Args, Parser, Subcommand};

use crate::{
    constants::{
        COOKING_TIME_MIN, INGREDIENT_AMOUNT_MIN, MAX_PAGE_SIZE, RECIPE_COUNT_PER_PAGE,
        TOKEN_LIFETIME_HOURS,
    },
    media::Media,
    validation::Limits,
};

/// Recipe sharing backend.
#[derive(Debug, Parser)]
#[command(name = "foodgram", version)]
pub struct Cli {
    /// PostgreSQL connection URL.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Upper bound on pooled database connections.
    #[arg(long, env = "FOODGRAM_MAX_CONNECTIONS", default_value_t = 10)]
    pub max_connections: u32,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Apply migrations and serve the HTTP API.
    Serve(ServeArgs),
    /// Apply migrations and exit.
    Migrate,
    /// Load tags from a JSON array of `{name, color, slug}`.
    LoadTags { path: PathBuf },
    /// Load ingredients from a JSON array of `{name, measurement_unit}`.
    LoadIngredients { path: PathBuf },
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    #[arg(long, env = "FOODGRAM_BIND", default_value = "127.0.0.1:8000")]
    pub bind: SocketAddr,

    /// Secret used to sign session tokens.
    #[arg(long, env = "FOODGRAM_JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    #[arg(long, env = "FOODGRAM_TOKEN_LIFETIME_HOURS", default_value_t = TOKEN_LIFETIME_HOURS)]
    pub token_lifetime_hours: i64,

    /// Directory uploaded images are written to and served from.
    #[arg(long, env = "FOODGRAM_MEDIA_ROOT", default_value = "media")]
    pub media_root: PathBuf,

    /// URL prefix under which `media_root` is exposed.
    #[arg(long, env = "FOODGRAM_MEDIA_URL", default_value = "/media")]
    pub media_url: String,

    #[arg(
        long,
        env = "FOODGRAM_PAGE_SIZE",
        default_value_t = RECIPE_COUNT_PER_PAGE,
        value_parser = clap::value_parser!(i64).range(1..=MAX_PAGE_SIZE)
    )]
    pub page_size: i64,

    #[arg(
        long,
        env = "FOODGRAM_COOKING_TIME_MIN",
        default_value_t = COOKING_TIME_MIN,
        value_parser = clap::value_parser!(i32).range(1..)
    )]
    pub cooking_time_min: i32,

    #[arg(
        long,
        env = "FOODGRAM_INGREDIENT_AMOUNT_MIN",
        default_value_t = INGREDIENT_AMOUNT_MIN,
        value_parser = clap::value_parser!(i32).range(1..)
    )]
    pub ingredient_amount_min: i32,
}

/// Request-independent settings shared by every handler.
#[derive(Debug, Clone)]
pub struct Settings {
    pub media: Media,
    pub page_size: i64,
    pub limits: Limits,
}

impl From<&ServeArgs> for Settings {
    fn from(args: &ServeArgs) -> Self {
        Self {
            media: Media::new(&args.media_root, &args.media_url),
            page_size: args.page_size,
            limits: Limits {
                cooking_time_min: args.cooking_time_min,
                ingredient_amount_min: args.ingredient_amount_min,
            },
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            media: Media::new("media", "/media"),
            page_size: RECIPE_COUNT_PER_PAGE,
            limits: Limits::default(),
        }
    }
}
