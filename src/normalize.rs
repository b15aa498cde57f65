//! Turns a [`Batch`] into a display [`Table`].

use tracing::debug;

use crate::category::classify;
use crate::types::{Batch, CityReading, Discard, DiscardReason, Row, Table};

/// Builds a classified table from a batch.
///
/// Readings without an AQI value or coordinates are dropped first, then the
/// AQI is coerced to a number (text that does not parse is dropped too), and
/// each surviving row gets its category label and color. Row order follows
/// the batch. The batch itself is not modified.
pub fn normalize(batch: &Batch) -> Table {
    let mut table = Table::default();

    for entry in &batch.readings {
        match to_row(entry) {
            Ok(row) => table.rows.push(row),
            Err(reason) => {
                debug!(city = %entry.city, %reason, "Dropping reading");
                table.discarded.push(Discard {
                    city: entry.city.clone(),
                    reason,
                });
            }
        }
    }

    table
}

fn to_row(entry: &CityReading) -> Result<Row, DiscardReason> {
    let reading = &entry.reading;

    let raw_aqi = reading.aqi.as_ref().ok_or(DiscardReason::MissingAqi)?;
    let (Some(latitude), Some(longitude)) = (reading.latitude, reading.longitude) else {
        return Err(DiscardReason::MissingCoordinates);
    };
    let aqi = raw_aqi.as_number().ok_or(DiscardReason::NonNumericAqi)?;

    let category = classify(Some(aqi));

    Ok(Row {
        city: entry.city.clone(),
        aqi,
        latitude,
        longitude,
        timestamp: reading.timestamp.clone(),
        category: category.label().to_string(),
        color: category.color().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AqiValue, RawReading};
    use chrono::Utc;

    fn reading(city: &str, aqi: Option<AqiValue>, geo: Option<(f64, f64)>) -> CityReading {
        CityReading {
            city: city.into(),
            reading: RawReading {
                aqi,
                latitude: geo.map(|g| g.0),
                longitude: geo.map(|g| g.1),
                timestamp: "2026-10-17 09:00:00".into(),
            },
        }
    }

    fn batch(readings: Vec<CityReading>) -> Batch {
        Batch {
            readings,
            failures: vec![],
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn test_preserves_input_order() {
        let b = batch(vec![
            reading("Delhi", Some(AqiValue::Number(310.0)), Some((28.6, 77.2))),
            reading("Mumbai", Some(AqiValue::Number(90.0)), Some((19.0, 72.8))),
            reading("Kolkata", Some(AqiValue::Number(150.0)), Some((22.5, 88.3))),
        ]);

        let table = normalize(&b);
        let cities: Vec<_> = table.rows.iter().map(|r| r.city.as_str()).collect();
        assert_eq!(cities, ["Delhi", "Mumbai", "Kolkata"]);
        assert!(table.discarded.is_empty());
    }

    #[test]
    fn test_attaches_category_and_color() {
        let b = batch(vec![reading(
            "Pune",
            Some(AqiValue::Number(75.0)),
            Some((18.5, 73.8)),
        )]);

        let row = &normalize(&b).rows[0];
        assert_eq!(row.aqi, 75.0);
        assert_eq!(row.category, "Moderate");
        assert_eq!(row.color, "#FFDE33");
        assert_eq!(row.latitude, 18.5);
        assert_eq!(row.longitude, 73.8);
        assert_eq!(row.timestamp, "2026-10-17 09:00:00");
    }

    #[test]
    fn test_drops_incomplete_rows_with_reasons() {
        let b = batch(vec![
            reading("Jaipur", None, Some((26.9, 75.8))),
            reading("Patna", Some(AqiValue::Number(120.0)), None),
            reading("Bhopal", Some(AqiValue::Text("-".into())), Some((23.2, 77.4))),
            reading("Lucknow", Some(AqiValue::Text("161".into())), Some((26.8, 80.9))),
        ]);

        let table = normalize(&b);
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0].city, "Lucknow");
        assert_eq!(table.rows[0].aqi, 161.0);
        assert_eq!(table.rows[0].category, "Unhealthy");

        let reasons: Vec<_> = table
            .discarded
            .iter()
            .map(|d| (d.city.as_str(), d.reason))
            .collect();
        assert_eq!(
            reasons,
            [
                ("Jaipur", DiscardReason::MissingAqi),
                ("Patna", DiscardReason::MissingCoordinates),
                ("Bhopal", DiscardReason::NonNumericAqi),
            ]
        );
    }

    #[test]
    fn test_never_adds_rows_or_touches_batch() {
        let b = batch(vec![
            reading("A", Some(AqiValue::Number(10.0)), Some((1.0, 1.0))),
            reading("B", None, None),
        ]);
        let before = b.clone();

        let table = normalize(&b);
        assert!(table.len() <= b.readings.len());
        assert_eq!(table.len() + table.discarded.len(), b.readings.len());
        assert_eq!(b, before);
    }

    #[test]
    fn test_empty_batch() {
        let table = normalize(&batch(vec![]));
        assert!(table.is_empty());
        assert!(table.discarded.is_empty());
    }
}
