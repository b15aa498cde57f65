//! AQI health categories.

use serde::Serialize;

use crate::types::AqiValue;

/// Health category for an AQI reading, with the color used to draw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    Good,
    Moderate,
    UnhealthyForSensitiveGroups,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
    Unknown,
}

impl Category {
    /// Every known band, lowest AQI first. `Unknown` is not a band.
    pub const ALL: [Category; 6] = [
        Category::Good,
        Category::Moderate,
        Category::UnhealthyForSensitiveGroups,
        Category::Unhealthy,
        Category::VeryUnhealthy,
        Category::Hazardous,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Good => "Good",
            Category::Moderate => "Moderate",
            Category::UnhealthyForSensitiveGroups => "Unhealthy for Sensitive Groups",
            Category::Unhealthy => "Unhealthy",
            Category::VeryUnhealthy => "Very Unhealthy",
            Category::Hazardous => "Hazardous",
            Category::Unknown => "Unknown",
        }
    }

    /// Hex color code used for map markers and table cells.
    pub fn color(self) -> &'static str {
        match self {
            Category::Good => "#009966",
            Category::Moderate => "#FFDE33",
            Category::UnhealthyForSensitiveGroups => "#FF9933",
            Category::Unhealthy => "#CC0033",
            Category::VeryUnhealthy => "#660099",
            Category::Hazardous => "#7E0023",
            Category::Unknown => "#808080",
        }
    }

    /// Index range shown in legends, e.g. `"0-50"`.
    pub fn range(self) -> &'static str {
        match self {
            Category::Good => "0-50",
            Category::Moderate => "51-100",
            Category::UnhealthyForSensitiveGroups => "101-150",
            Category::Unhealthy => "151-200",
            Category::VeryUnhealthy => "201-300",
            Category::Hazardous => ">300",
            Category::Unknown => "n/a",
        }
    }

    /// Short health-impact note for the legend.
    pub fn advisory(self) -> &'static str {
        match self {
            Category::Good => "Minimal impact.",
            Category::Moderate => "Minor breathing discomfort to sensitive people.",
            Category::UnhealthyForSensitiveGroups => {
                "Breathing discomfort to the sensitive population."
            }
            Category::Unhealthy => "Breathing discomfort to most people.",
            Category::VeryUnhealthy => "Respiratory illness on prolonged exposure.",
            Category::Hazardous => {
                "Affects healthy people and seriously impacts those with existing diseases."
            }
            Category::Unknown => "No usable reading.",
        }
    }
}

/// Maps an AQI value onto its health category.
///
/// | Range      | Category                       |
/// |------------|--------------------------------|
/// | none / NaN | Unknown                        |
/// | < 0        | Unknown                        |
/// | 0-50       | Good                           |
/// | 51-100     | Moderate                       |
/// | 101-150    | Unhealthy for Sensitive Groups |
/// | 151-200    | Unhealthy                      |
/// | 201-300    | Very Unhealthy                 |
/// | > 300      | Hazardous                      |
///
/// Upper bounds are inclusive, so fractional values between two bands
/// (e.g. `50.5`) land in the higher one.
pub fn classify(aqi: Option<f64>) -> Category {
    match aqi {
        None => Category::Unknown,
        Some(a) if a.is_nan() || a < 0.0 => Category::Unknown,
        Some(a) if a <= 50.0 => Category::Good,
        Some(a) if a <= 100.0 => Category::Moderate,
        Some(a) if a <= 150.0 => Category::UnhealthyForSensitiveGroups,
        Some(a) if a <= 200.0 => Category::Unhealthy,
        Some(a) if a <= 300.0 => Category::VeryUnhealthy,
        Some(_) => Category::Hazardous,
    }
}

/// Classifies a raw upstream value. Text that does not parse as a number
/// (the API reports `"-"` for offline stations) is `Unknown`.
pub fn classify_value(value: Option<&AqiValue>) -> Category {
    classify(value.and_then(AqiValue::as_number))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_boundaries() {
        assert_eq!(classify(Some(0.0)), Category::Good);
        assert_eq!(classify(Some(50.0)), Category::Good);
        assert_eq!(classify(Some(51.0)), Category::Moderate);
        assert_eq!(classify(Some(100.0)), Category::Moderate);
        assert_eq!(classify(Some(101.0)), Category::UnhealthyForSensitiveGroups);
        assert_eq!(classify(Some(150.0)), Category::UnhealthyForSensitiveGroups);
        assert_eq!(classify(Some(151.0)), Category::Unhealthy);
        assert_eq!(classify(Some(200.0)), Category::Unhealthy);
        assert_eq!(classify(Some(201.0)), Category::VeryUnhealthy);
        assert_eq!(classify(Some(300.0)), Category::VeryUnhealthy);
        assert_eq!(classify(Some(301.0)), Category::Hazardous);
        assert_eq!(classify(Some(999.0)), Category::Hazardous);
    }

    #[test]
    fn test_classify_documented_examples() {
        let c = classify(Some(75.0));
        assert_eq!((c.label(), c.color()), ("Moderate", "#FFDE33"));

        let c = classify(Some(305.0));
        assert_eq!((c.label(), c.color()), ("Hazardous", "#7E0023"));

        let c = classify(Some(50.0));
        assert_eq!((c.label(), c.color()), ("Good", "#009966"));
    }

    #[test]
    fn test_classify_missing_or_invalid() {
        for c in [
            classify(None),
            classify(Some(f64::NAN)),
            classify(Some(-1.0)),
            classify_value(None),
            classify_value(Some(&AqiValue::Text("x".into()))),
            classify_value(Some(&AqiValue::Text("-".into()))),
        ] {
            assert_eq!(c, Category::Unknown);
            assert_eq!(c.label(), "Unknown");
            assert_eq!(c.color(), "#808080");
        }
    }

    #[test]
    fn test_classify_value_coerces_numeric_text() {
        assert_eq!(
            classify_value(Some(&AqiValue::Text(" 120 ".into()))),
            Category::UnhealthyForSensitiveGroups
        );
        assert_eq!(
            classify_value(Some(&AqiValue::Number(42.0))),
            Category::Good
        );
    }

    #[test]
    fn test_bands_are_contiguous() {
        // Walk 0..=400 in tenths: every value lands in a band and the band
        // index never decreases.
        let mut last = 0;
        for i in 0..=4000 {
            let c = classify(Some(i as f64 / 10.0));
            let idx = Category::ALL
                .iter()
                .position(|b| *b == c)
                .expect("non-negative values always have a band");
            assert!(idx >= last, "band went backwards at {}", i as f64 / 10.0);
            assert!(idx - last <= 1, "band skipped at {}", i as f64 / 10.0);
            last = idx;
        }
        assert_eq!(last, Category::ALL.len() - 1);
    }

    #[test]
    fn test_fractional_gap_goes_up() {
        assert_eq!(classify(Some(50.5)), Category::Moderate);
        assert_eq!(classify(Some(300.1)), Category::Hazardous);
    }
}
