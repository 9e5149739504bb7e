use std::path::Path;

use serde::Deserialize;
use sqlx::{Pool, Postgres};

use crate::{
    actions::{create_ingredient, create_tag},
    error::Error,
};

#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("could not read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("could not parse {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    #[error("could not store fixture: {0}")]
    Store(Error),
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TagFixture {
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct IngredientFixture {
    pub name: String,
    pub measurement_unit: String,
}

/// Outcome of a load: rows inserted and rows that already existed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub created: usize,
    pub existing: usize,
}

async fn read_fixture<T>(path: &Path) -> Result<Vec<T>, FixtureError>
where
    T: for<'de> Deserialize<'de>,
{
    let display = path.display().to_string();
    let raw = tokio::fs::read(path).await.map_err(|source| FixtureError::Read {
        path: display.clone(),
        source,
    })?;
    serde_json::from_slice(&raw).map_err(|source| FixtureError::Parse {
        path: display,
        source,
    })
}

pub async fn load_tags(path: &Path, pool: &Pool<Postgres>) -> Result<LoadReport, FixtureError> {
    let tags: Vec<TagFixture> = read_fixture(path).await?;
    let mut report = LoadReport::default();

    for tag in &tags {
        let created = create_tag(&tag.name, &tag.color, &tag.slug, pool)
            .await
            .map_err(FixtureError::Store)?;
        if created {
            report.created += 1;
        } else {
            report.existing += 1;
        }
    }

    log::info!(
        "Loaded tags from {}: {} new, {} existing",
        path.display(),
        report.created,
        report.existing
    );
    Ok(report)
}

pub async fn load_ingredients(
    path: &Path,
    pool: &Pool<Postgres>,
) -> Result<LoadReport, FixtureError> {
    let ingredients: Vec<IngredientFixture> = read_fixture(path).await?;
    let mut report = LoadReport::default();

    for ingredient in &ingredients {
        let created = create_ingredient(&ingredient.name, &ingredient.measurement_unit, pool)
            .await
            .map_err(FixtureError::Store)?;
        if created {
            report.created += 1;
        } else {
            report.existing += 1;
        }
    }

    log::info!(
        "Loaded ingredients from {}: {} new, {} existing",
        path.display(),
        report.created,
        report.existing
    );
    Ok(report)
}
