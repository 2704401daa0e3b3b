//! PostgreSQL travel repository over the product's tables

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Postgres, Row};
use tracing::warn;
use uuid::Uuid;

use crate::domain::pricing::MICROS_PER_EURO;
use crate::domain::{
    AddressFields, DomainError, Money, PricingProfile, ProfessionalRecord, RequestStatus,
    ServiceRequestRecord, Supplement, SupplementKind, TieredRange, TravelInfo, TravelRepository,
};

const MICROS_PER_CENT: i64 = MICROS_PER_EURO / 100;

/// Reads `users`, `assistance_requests` and the `travel_cost_*` tables;
/// writes travel columns of `assistance_requests`.
#[derive(Debug, Clone)]
pub struct PostgresTravelRepository {
    pool: PgPool,
}

impl PostgresTravelRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_pricing(
        &self,
        professional_id: &str,
        legacy_rate_cents: Option<i32>,
    ) -> Result<Option<PricingProfile>, DomainError> {
        let settings = sqlx::query(
            r#"
            SELECT id, base_cost, free_distance_km, is_active
            FROM travel_cost_settings
            WHERE professional_id = $1
            LIMIT 1
            "#,
        )
        .bind(professional_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to load pricing settings: {}", e)))?;

        let Some(settings) = settings else {
            return Ok(assemble_pricing(None, Vec::new(), Vec::new(), legacy_rate_cents));
        };

        let settings = SettingsRow {
            id: column(&settings, "id")?,
            base_cost_cents: column(&settings, "base_cost")?,
            free_distance_km: column(&settings, "free_distance_km")?,
            is_active: column(&settings, "is_active")?,
        };

        let ranges = sqlx::query(
            r#"
            SELECT from_km, to_km, cost_per_km
            FROM travel_cost_ranges
            WHERE settings_id = $1
            ORDER BY order_index
            "#,
        )
        .bind(settings.id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to load cost ranges: {}", e)))?
        .iter()
        .map(|row| {
            Ok(RangeRow {
                from_km: column(row, "from_km")?,
                to_km: column(row, "to_km")?,
                cost_per_km_cents: column(row, "cost_per_km")?,
            })
        })
        .collect::<Result<Vec<_>, DomainError>>()?;

        let supplements = sqlx::query(
            r#"
            SELECT supplement_type, percentage, fixed_amount, is_active
            FROM travel_supplements
            WHERE settings_id = $1
            ORDER BY supplement_type
            "#,
        )
        .bind(settings.id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to load supplements: {}", e)))?
        .iter()
        .map(|row| {
            Ok(SupplementRow {
                kind: column(row, "supplement_type")?,
                percentage: column(row, "percentage")?,
                fixed_amount_cents: column(row, "fixed_amount")?,
                is_active: column(row, "is_active")?,
            })
        })
        .collect::<Result<Vec<_>, DomainError>>()?;

        Ok(assemble_pricing(
            Some(settings),
            ranges,
            supplements,
            legacy_rate_cents,
        ))
    }
}

fn column<T>(row: &PgRow, name: &str) -> Result<T, DomainError>
where
    T: for<'r> sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| DomainError::storage(format!("Invalid column '{}': {}", name, e)))
}

fn address_fields(row: &PgRow, prefix: &str) -> Result<AddressFields, DomainError> {
    let line_column = if prefix.is_empty() {
        "address".to_string()
    } else {
        format!("{}address", prefix)
    };

    Ok(AddressFields {
        line: column(row, &line_column)?,
        city: column(row, &format!("{}city", prefix))?,
        province: column(row, &format!("{}province", prefix))?,
        postal_code: column(row, &format!("{}postal_code", prefix))?,
        latitude: column(row, &format!("{}latitude", prefix))?,
        longitude: column(row, &format!("{}longitude", prefix))?,
    })
}

fn request_from_row(row: &PgRow) -> Result<ServiceRequestRecord, DomainError> {
    let status: String = column(row, "status")?;
    let status: RequestStatus = status
        .parse()
        .map_err(|e| DomainError::storage(format!("Invalid request status: {}", e)))?;

    Ok(ServiceRequestRecord {
        id: column(row, "id")?,
        status,
        professional_id: column(row, "professional_id")?,
        location: address_fields(row, "")?,
    })
}

#[derive(Debug)]
struct SettingsRow {
    id: Uuid,
    base_cost_cents: i32,
    free_distance_km: i32,
    is_active: bool,
}

#[derive(Debug)]
struct RangeRow {
    from_km: i32,
    to_km: Option<i32>,
    cost_per_km_cents: i32,
}

#[derive(Debug)]
struct SupplementRow {
    kind: String,
    percentage: i32,
    fixed_amount_cents: i32,
    is_active: bool,
}

/// Builds a profile from stored rows.
///
/// Active settings win; a professional with only the legacy per-km rate
/// column gets a flat profile; `None` leaves the choice to the caller.
fn assemble_pricing(
    settings: Option<SettingsRow>,
    ranges: Vec<RangeRow>,
    supplements: Vec<SupplementRow>,
    legacy_rate_cents: Option<i32>,
) -> Option<PricingProfile> {
    match settings {
        Some(settings) if settings.is_active => {
            let standard = PricingProfile::standard();

            let tiered_ranges = if ranges.is_empty() {
                standard.tiered_ranges
            } else {
                ranges
                    .into_iter()
                    .map(|r| TieredRange {
                        from_km: r.from_km as i64,
                        to_km: r.to_km.map(i64::from),
                        rate_per_km_micros: r.cost_per_km_cents as i64 * MICROS_PER_CENT,
                    })
                    .collect()
            };

            let supplements = if supplements.is_empty() {
                standard.supplements
            } else {
                supplements
                    .into_iter()
                    .filter_map(|s| match s.kind.parse::<SupplementKind>() {
                        Ok(kind) => Some(Supplement {
                            kind,
                            percentage: s.percentage as i64,
                            fixed_amount_micros: s.fixed_amount_cents as i64 * MICROS_PER_CENT,
                            active: s.is_active,
                        }),
                        Err(e) => {
                            warn!(error = %e, "Skipping unknown supplement type");
                            None
                        }
                    })
                    .collect()
            };

            Some(PricingProfile {
                base_cost_micros: Some(settings.base_cost_cents as i64 * MICROS_PER_CENT),
                free_km_allowance: Some(settings.free_distance_km as i64),
                flat_rate_per_km_micros: None,
                tiered_ranges,
                supplements,
            })
        }
        _ => legacy_rate_cents.map(|cents| PricingProfile::flat(cents as i64 * MICROS_PER_CENT)),
    }
}

#[async_trait]
impl TravelRepository for PostgresTravelRepository {
    async fn find_professional(&self, id: &str) -> Result<Option<ProfessionalRecord>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, address, city, province, postal_code, latitude, longitude,
                   work_address, work_city, work_province, work_postal_code,
                   work_latitude, work_longitude,
                   use_residence_as_work_address, travel_rate_per_km
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to load professional: {}", e)))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let use_residence: Option<bool> = column(&row, "use_residence_as_work_address")?;
        let legacy_rate: Option<i32> = column(&row, "travel_rate_per_km")?;

        let professional = ProfessionalRecord {
            id: column(&row, "id")?,
            residence: address_fields(&row, "")?,
            work: address_fields(&row, "work_")?,
            use_residence_as_work_address: use_residence.unwrap_or(true),
            pricing: self.load_pricing(id, legacy_rate).await?,
        };

        Ok(Some(professional))
    }

    async fn find_request(&self, id: &str) -> Result<Option<ServiceRequestRecord>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, status, professional_id, address, city, province, postal_code,
                   latitude, longitude
            FROM assistance_requests
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to load request: {}", e)))?;

        row.as_ref().map(request_from_row).transpose()
    }

    async fn list_active_requests(
        &self,
        professional_id: &str,
    ) -> Result<Vec<ServiceRequestRecord>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, status, professional_id, address, city, province, postal_code,
                   latitude, longitude
            FROM assistance_requests
            WHERE professional_id = $1
              AND status IN ('ASSIGNED', 'IN_PROGRESS')
            ORDER BY id
            "#,
        )
        .bind(professional_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to list active requests: {}", e)))?;

        rows.iter().map(request_from_row).collect()
    }

    async fn save_travel_info(&self, info: &TravelInfo) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE assistance_requests
            SET travel_distance = $2,
                travel_duration = $3,
                travel_distance_text = $4,
                travel_duration_text = $5,
                travel_cost = $6,
                travel_professional_id = $7,
                travel_calculated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(&info.request_id)
        .bind(info.distance_meters as i64)
        .bind(info.duration_seconds as i64)
        .bind(&info.distance_text)
        .bind(&info.duration_text)
        .bind(info.cost.cents())
        .bind(&info.professional_id)
        .bind(info.calculated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to save travel info: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!(
                "Request '{}' not found",
                info.request_id
            )));
        }

        Ok(())
    }

    async fn find_travel_info(&self, request_id: &str) -> Result<Option<TravelInfo>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, travel_professional_id,
                   travel_distance::BIGINT AS travel_distance,
                   travel_duration::BIGINT AS travel_duration,
                   travel_distance_text, travel_duration_text,
                   travel_cost::BIGINT AS travel_cost,
                   travel_calculated_at
            FROM assistance_requests
            WHERE id = $1 AND travel_calculated_at IS NOT NULL
            "#,
        )
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to load travel info: {}", e)))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let distance: i64 = column(&row, "travel_distance")?;
        let duration: i64 = column(&row, "travel_duration")?;
        let cost: i64 = column(&row, "travel_cost")?;
        let professional_id: Option<String> = column(&row, "travel_professional_id")?;

        Ok(Some(TravelInfo {
            request_id: column(&row, "id")?,
            professional_id: professional_id.unwrap_or_default(),
            distance_meters: distance.max(0) as u64,
            duration_seconds: duration.max(0) as u64,
            distance_text: column::<Option<String>>(&row, "travel_distance_text")?
                .unwrap_or_default(),
            duration_text: column::<Option<String>>(&row, "travel_duration_text")?
                .unwrap_or_default(),
            cost: Money::from_cents(cost),
            calculated_at: column(&row, "travel_calculated_at")?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(active: bool) -> SettingsRow {
        SettingsRow {
            id: Uuid::new_v4(),
            base_cost_cents: 1_000,
            free_distance_km: 10,
            is_active: active,
        }
    }

    #[test]
    fn test_active_settings_build_tiered_profile() {
        let ranges = vec![
            RangeRow {
                from_km: 0,
                to_km: Some(20),
                cost_per_km_cents: 50,
            },
            RangeRow {
                from_km: 20,
                to_km: None,
                cost_per_km_cents: 30,
            },
        ];
        let supplements = vec![SupplementRow {
            kind: "WEEKEND".to_string(),
            percentage: 20,
            fixed_amount_cents: 0,
            is_active: true,
        }];

        let profile = assemble_pricing(Some(settings(true)), ranges, supplements, Some(99)).unwrap();

        assert_eq!(profile.base_cost_micros, Some(10 * MICROS_PER_EURO));
        assert_eq!(profile.free_km_allowance, Some(10));
        assert_eq!(profile.tiered_ranges[1].rate_per_km_micros, 300_000);
        assert_eq!(profile.supplements.len(), 1);
        assert!(profile.supplements[0].active);
    }

    #[test]
    fn test_missing_ranges_use_standard_ranges() {
        let profile = assemble_pricing(Some(settings(true)), Vec::new(), Vec::new(), None).unwrap();

        assert_eq!(
            profile.tiered_ranges,
            PricingProfile::standard().tiered_ranges
        );
        assert_eq!(profile.supplements.len(), 4);
    }

    #[test]
    fn test_inactive_settings_fall_back_to_legacy_rate() {
        let profile = assemble_pricing(Some(settings(false)), Vec::new(), Vec::new(), Some(50)).unwrap();

        assert_eq!(profile, PricingProfile::flat(500_000));
    }

    #[test]
    fn test_nothing_configured() {
        assert!(assemble_pricing(None, Vec::new(), Vec::new(), None).is_none());
    }

    #[test]
    fn test_unknown_supplement_skipped() {
        let supplements = vec![SupplementRow {
            kind: "FULL_MOON".to_string(),
            percentage: 10,
            fixed_amount_cents: 0,
            is_active: true,
        }];

        let profile =
            assemble_pricing(Some(settings(true)), Vec::new(), supplements, None).unwrap();

        assert!(profile.supplements.is_empty());
    }
}
