// Demographics split for the pie and stacked-area charts
use super::analytics::DemographicsBucket;
use super::series::{bucket_label, DemographicsPoint};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PercentSlice {
    pub name: &'static str,
    pub value: u32,
    pub color: &'static str,
}

const MALE_COLOR: &str = "#009688";
const FEMALE_COLOR: &str = "#e91e63";

/// Builds the per-bucket series and the overall percent split.
///
/// Each share is rounded on its own, so the two slices can sum to 99 or 101.
/// When no one was counted the split is empty.
pub fn split_demographics(
    buckets: &[DemographicsBucket],
) -> (Vec<DemographicsPoint>, Vec<PercentSlice>) {
    let mut total_male = 0.0;
    let mut total_female = 0.0;

    let series = buckets
        .iter()
        .map(|b| {
            total_male += b.male;
            total_female += b.female;
            DemographicsPoint {
                label: bucket_label(b.timestamp),
                male: b.male,
                female: b.female,
            }
        })
        .collect();

    if total_male <= 0.0 && total_female <= 0.0 {
        return (series, Vec::new());
    }

    let grand_total = total_male + total_female;
    let split = vec![
        PercentSlice {
            name: "Males",
            value: (total_male / grand_total * 100.0).round() as u32,
            color: MALE_COLOR,
        },
        PercentSlice {
            name: "Females",
            value: (total_female / grand_total * 100.0).round() as u32,
            color: FEMALE_COLOR,
        },
    ];

    (series, split)
}
