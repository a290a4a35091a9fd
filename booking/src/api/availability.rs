//! Slot availability endpoint.
//!
//! - GET /api/appointments/availability?from=&to=&serviceIds= - Free slots per date

use crate::error::{BookingError, ValidationError, ValidationErrors};
use crate::server::state::AppState;
use autoshop_core::ids::ServiceId;
use autoshop_web::{ApiQuery, AppError};
use axum::{extract::State, Json};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Query string of the availability endpoint.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    /// First date, `YYYY-MM-DD`
    pub from: Option<String>,
    /// Last date (inclusive), `YYYY-MM-DD`
    pub to: Option<String>,
    /// Comma-separated service ids
    pub service_ids: Option<String>,
}

/// Validated query.
#[derive(Debug, PartialEq, Eq)]
struct ParsedQuery {
    from: NaiveDate,
    to: NaiveDate,
    service_ids: Vec<ServiceId>,
}

fn parse_date(field: &str, value: Option<&str>, errors: &mut ValidationErrors) -> Option<NaiveDate> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => {
            errors.push(ValidationError::field(field, "is required"));
            None
        }
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map_err(|_| errors.push(ValidationError::field(field, "must be a date (YYYY-MM-DD)")))
            .ok(),
    }
}

fn parse_query(query: &AvailabilityQuery) -> Result<ParsedQuery, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let from = parse_date("from", query.from.as_deref(), &mut errors);
    let to = parse_date("to", query.to.as_deref(), &mut errors);

    let mut service_ids = Vec::new();
    for part in query
        .service_ids
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
    {
        match part.parse::<ServiceId>() {
            Ok(id) if !service_ids.contains(&id) => service_ids.push(id),
            Ok(_) => {}
            Err(_) => {
                errors.push(ValidationError::field(
                    "serviceIds",
                    "must be a comma-separated list of ids",
                ));
                break;
            }
        }
    }

    match (from, to) {
        (Some(from), Some(to)) if errors.is_empty() => Ok(ParsedQuery {
            from,
            to,
            service_ids,
        }),
        _ => Err(errors),
    }
}

/// Free start times per date for a booking of the given services.
///
/// Dates without a free slot are left out of the response.
///
/// # Example
///
/// ```bash
/// curl "http://localhost:8080/api/appointments/availability?from=2024-06-10&to=2024-06-11&serviceIds=1,2"
/// # {"2024-06-10":["12:00","13:00"],"2024-06-11":["08:00","09:00"]}
/// ```
///
/// # Errors
///
/// Returns 422 for a missing, malformed or oversized range and for unknown
/// services.
pub async fn get_availability(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AvailabilityQuery>,
) -> Result<Json<BTreeMap<String, Vec<String>>>, AppError> {
    let query = parse_query(&query).map_err(BookingError::from)?;
    let slots = state
        .app
        .availability
        .get_available_slots(query.from, query.to, &query.service_ids)
        .await?;

    Ok(Json(
        slots
            .into_iter()
            .map(|(date, times)| {
                (
                    date.format("%Y-%m-%d").to_string(),
                    times
                        .into_iter()
                        .map(|time| time.format("%H:%M").to_string())
                        .collect(),
                )
            })
            .collect(),
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;

    fn query(from: &str, to: &str, service_ids: Option<&str>) -> AvailabilityQuery {
        AvailabilityQuery {
            from: Some(from.to_string()),
            to: Some(to.to_string()),
            service_ids: service_ids.map(str::to_string),
        }
    }

    #[test]
    fn test_parses_comma_list() {
        let parsed = parse_query(&query("2024-06-10", "2024-06-12", Some("1, 2,1,"))).unwrap();
        assert_eq!(parsed.service_ids, vec![ServiceId::new(1), ServiceId::new(2)]);
        assert_eq!(parsed.from, NaiveDate::from_ymd_opt(2024, 6, 10).unwrap());
    }

    #[test]
    fn test_reports_every_bad_field() {
        let errors = parse_query(&AvailabilityQuery {
            from: None,
            to: Some("June 12".to_string()),
            service_ids: Some("oil".to_string()),
        })
        .unwrap_err();
        let by_field = errors.by_field();
        assert!(by_field.contains_key("from"));
        assert!(by_field.contains_key("to"));
        assert!(by_field.contains_key("serviceIds"));
    }

    #[test]
    fn test_service_ids_are_optional() {
        let parsed = parse_query(&query("2024-06-10", "2024-06-10", None)).unwrap();
        assert!(parsed.service_ids.is_empty());
    }
}
