use futures::{StreamExt as _, TryStreamExt as _};
use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::{error::Result, Batch, Error, ListingParams};

/// Radius cap, mirrors the page-size clamp: bigger requests are reduced, not rejected.
pub const MAX_NEARBY_DISTANCE_KM: f64 = 50.0;
pub const DEFAULT_NEARBY_DISTANCE_KM: f64 = 5.0;

const EARTH_RADIUS_M: f64 = 6_371_000.0;
// meters per degree of latitude (and of longitude at the equator)
const M_PER_DEG: f64 = std::f64::consts::PI * EARTH_RADIUS_M / 180.0;

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct CreateCinema {
    #[garde(length(min = 1, max = 120))]
    pub name: String,
    #[garde(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[garde(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, Validate)]
pub struct PatchCinema {
    #[garde(inner(length(min = 1, max = 120)))]
    pub name: Option<String>,
    #[garde(inner(range(min = -90.0, max = 90.0)))]
    pub latitude: Option<f64>,
    #[garde(inner(range(min = -180.0, max = 180.0)))]
    pub longitude: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Cinema {
    pub id: i64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Nearby-search projection: cinema plus its rounded distance from the reference point.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NearCinema {
    pub id: i64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub distance_m: f64,
}

/// Great-circle distance in meters between two points given in degrees.
pub fn haversine_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}

const VALID_ORDER_FIELDS: &[&str] = &["id", "name"];

pub type CinemaRepository = CinemaRepositoryImpl<crate::Pool>;

pub struct CinemaRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> CinemaRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn create(&self, payload: CreateCinema) -> Result<Cinema> {
        let result =
            sqlx::query("INSERT INTO cinema (name, latitude, longitude) VALUES (?, ?, ?)")
                .bind(&payload.name)
                .bind(payload.latitude)
                .bind(payload.longitude)
                .execute(&self.executor)
                .await?;

        let id = result.last_insert_rowid();
        self.get(id).await
    }

    pub async fn update(&self, id: i64, payload: CreateCinema) -> Result<Cinema> {
        let result =
            sqlx::query("UPDATE cinema SET name = ?, latitude = ?, longitude = ? WHERE id = ?")
                .bind(&payload.name)
                .bind(payload.latitude)
                .bind(payload.longitude)
                .bind(id)
                .execute(&self.executor)
                .await?;

        if result.rows_affected() == 0 {
            Err(Error::RecordNotFound(format!("Cinema {id}")))
        } else {
            self.get(id).await
        }
    }

    pub async fn patch(&self, id: i64, payload: PatchCinema) -> Result<Cinema> {
        let current = self.get(id).await?;
        let merged = CreateCinema {
            name: payload.name.unwrap_or(current.name),
            latitude: payload.latitude.unwrap_or(current.latitude),
            longitude: payload.longitude.unwrap_or(current.longitude),
        };
        merged.validate().map_err(Error::ValidationFailed)?;
        self.update(id, merged).await
    }

    pub async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT count(*) FROM cinema")
            .fetch_one(&self.executor)
            .await?;
        Ok(count as u64)
    }

    pub async fn list_all(&self) -> Result<Vec<Cinema>> {
        let records =
            sqlx::query_as::<_, Cinema>("SELECT id, name, latitude, longitude FROM cinema")
                .fetch(&self.executor)
                .take(crate::MAX_LIMIT)
                .try_collect::<Vec<_>>()
                .await?;
        Ok(records)
    }

    pub async fn list(&self, params: ListingParams) -> Result<Batch<Cinema>> {
        let order = params.order_clause(VALID_ORDER_FIELDS)?;
        let total = self.count().await?;
        let sql = format!(
            "SELECT id, name, latitude, longitude FROM cinema {order} LIMIT ? OFFSET ?"
        );
        let rows = sqlx::query_as::<_, Cinema>(&sql)
            .bind(params.limit)
            .bind(params.offset)
            .fetch_all(&self.executor)
            .await?;
        Ok(Batch {
            offset: params.offset,
            total,
            rows,
        })
    }

    pub async fn delete(&self, id: i64) -> Result<Cinema> {
        let record = self.get(id).await?;
        sqlx::query("DELETE FROM cinema WHERE id = ?")
            .bind(id)
            .execute(&self.executor)
            .await?;
        Ok(record)
    }

    pub async fn get(&self, id: i64) -> Result<Cinema> {
        let record = sqlx::query_as::<_, Cinema>(
            "SELECT id, name, latitude, longitude FROM cinema WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.executor)
        .await?
        .ok_or_else(|| Error::RecordNotFound(format!("Cinema {id}")))?;
        Ok(record)
    }

    /// Cinemas within the radius of the reference point, nearest first,
    /// distances rounded to whole meters. The radius is clamped to
    /// [`MAX_NEARBY_DISTANCE_KM`]. A latitude/longitude bounding box keeps
    /// the query on the index, the exact distance runs on the candidates.
    pub async fn nearby(
        &self,
        latitude: f64,
        longitude: f64,
        distance_km: f64,
    ) -> Result<Vec<NearCinema>> {
        let radius_m = distance_km.clamp(0.0, MAX_NEARBY_DISTANCE_KM) * 1000.0;
        let lat_delta = radius_m / M_PER_DEG;
        // degrees of longitude shrink with latitude; keep the divisor sane near the poles
        let lon_delta = radius_m / (M_PER_DEG * latitude.to_radians().cos().abs().max(0.01));

        let candidates = sqlx::query_as::<_, Cinema>(
            "SELECT id, name, latitude, longitude FROM cinema \
             WHERE latitude BETWEEN ? AND ? AND longitude BETWEEN ? AND ?",
        )
        .bind(latitude - lat_delta)
        .bind(latitude + lat_delta)
        .bind(longitude - lon_delta)
        .bind(longitude + lon_delta)
        .fetch_all(&self.executor)
        .await?;

        let mut nearby = candidates
            .into_iter()
            .filter_map(|c| {
                let distance =
                    haversine_distance_m(latitude, longitude, c.latitude, c.longitude);
                (distance <= radius_m).then(|| NearCinema {
                    id: c.id,
                    name: c.name,
                    latitude: c.latitude,
                    longitude: c.longitude,
                    distance_m: distance.round(),
                })
            })
            .collect::<Vec<_>>();
        nearby.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));
        Ok(nearby)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_known_distance() {
        // Prague centre to Brno centre is roughly 185 km
        let d = haversine_distance_m(50.0755, 14.4378, 49.1951, 16.6068);
        assert!((d - 185_000.0).abs() < 5_000.0, "got {d}");
    }

    #[test]
    fn test_haversine_zero() {
        let d = haversine_distance_m(50.0, 14.0, 50.0, 14.0);
        assert_eq!(d, 0.0);
    }

    #[test]
    fn test_haversine_one_degree_latitude() {
        // one degree of latitude is ~111.2 km everywhere
        let d = haversine_distance_m(10.0, 20.0, 11.0, 20.0);
        assert!((d - 111_195.0).abs() < 100.0, "got {d}");
    }
}
