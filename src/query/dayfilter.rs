//! Day-of-week filtering for heatmap queries.

/// Which days of the week a query covers. Days use Sunday = 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayFilter {
    All,
    Weekdays,
    Weekend,
    Days(Vec<u32>),
}

const DAY_NAMES: [&str; 7] = ["sun", "mon", "tue", "wed", "thu", "fri", "sat"];

impl DayFilter {
    /// Parses a filter expression: `all`, `weekdays`, `weekend`, or a
    /// comma-separated list of day-name prefixes (`mon,wed,fri`). Anything
    /// unrecognized falls back to all days.
    pub fn parse(input: &str) -> Self {
        match input.trim().to_lowercase().as_str() {
            "" | "all" => DayFilter::All,
            "weekdays" => DayFilter::Weekdays,
            "weekend" => DayFilter::Weekend,
            list => {
                let days: Vec<u32> = list
                    .split(',')
                    .filter_map(|part| {
                        let part = part.trim();
                        DAY_NAMES
                            .iter()
                            .position(|name| part.starts_with(name))
                            .map(|i| i as u32)
                    })
                    .collect();

                if days.is_empty() {
                    DayFilter::All
                } else {
                    DayFilter::Days(days)
                }
            }
        }
    }

    pub fn matches(&self, day_of_week: u32) -> bool {
        match self {
            DayFilter::All => true,
            DayFilter::Weekdays => (1..=5).contains(&day_of_week),
            DayFilter::Weekend => day_of_week == 0 || day_of_week == 6,
            DayFilter::Days(days) => days.contains(&day_of_week),
        }
    }

    /// Stable key fragment for cache lookups.
    pub fn cache_key(&self) -> String {
        match self {
            DayFilter::All => "all".to_string(),
            DayFilter::Weekdays => "weekdays".to_string(),
            DayFilter::Weekend => "weekend".to_string(),
            DayFilter::Days(days) => {
                let mut sorted = days.clone();
                sorted.sort_unstable();
                sorted
                    .iter()
                    .map(|d| d.to_string())
                    .collect::<Vec<_>>()
                    .join(",")
            }
        }
    }
}
