//! `snapshot` command: read-only views of the latest aggregation.

use serde::Serialize;
use sportrend_core::EntityType;
use sportrend_db::PgRepository;
use sportrend_pipeline::{latest_entity_detail, latest_snapshot, latest_sport_trends, Lookup};

use crate::print_json;

const NO_DATA: &str = "no precomputed data";

fn print_lookup<T: Serialize>(lookup: &Lookup<T>) -> anyhow::Result<()> {
    match lookup {
        Lookup::Found(value) => print_json(value),
        Lookup::NoData => {
            println!("{NO_DATA}");
            Ok(())
        }
    }
}

/// Print the slice of the latest snapshot selected by the filters.
///
/// A sport filter selects that sport's breakdown, optionally narrowed to one
/// entity type; an entity type alone selects its detail section.
///
/// # Errors
///
/// Returns an error only if the repository cannot be read.
pub(crate) async fn run_snapshot(
    pool: &sqlx::PgPool,
    entity_type: Option<EntityType>,
    sport_type: Option<&str>,
) -> anyhow::Result<()> {
    let repo = PgRepository::new(pool.clone());
    match (entity_type, sport_type) {
        (_, Some(sport)) => print_lookup(&latest_sport_trends(&repo, sport, entity_type).await?),
        (Some(kind), None) => print_lookup(&latest_entity_detail(&repo, kind).await?),
        (None, None) => print_lookup(&latest_snapshot(&repo).await?),
    }
}
