/// Seasonal weather table for the energy bill predictor.
///
/// The model was trained with five seasonal degree-day averages. Callers
/// send a calendar month (or any integer), so this module owns both the
/// fixed table and the wraparound that maps an arbitrary month onto one
/// of its keys. This is the single source of truth for weather inputs;
/// no other module should hardcode degree-day values.

use crate::model::WeatherStats;

// ---------------------------------------------------------------------------
// Weather table
// ---------------------------------------------------------------------------

/// One row of the weather table.
pub struct WeatherEntry {
    /// Month key, 1-based.
    pub key: i64,
    pub stats: WeatherStats,
}

/// Degree-day averages per month key, computed when the model was fit.
///
/// Keys are contiguous from 1; months beyond the last key cycle back to 1.
pub static WEATHER_TABLE: &[WeatherEntry] = &[
    WeatherEntry {
        key: 1,
        stats: WeatherStats {
            temp_degree_days: 5816.356385018535,
            temp_cdd: 1516.2217819250927,
            temp_hdd: 4300.134603093443,
        },
    },
    WeatherEntry {
        key: 2,
        stats: WeatherStats {
            temp_degree_days: 5452.325102880658,
            temp_cdd: 1892.1604938271605,
            temp_hdd: 3560.1646090534978,
        },
    },
    WeatherEntry {
        key: 3,
        stats: WeatherStats {
            temp_degree_days: 5112.060606060606,
            temp_cdd: 1688.2727272727273,
            temp_hdd: 3423.787878787879,
        },
    },
    WeatherEntry {
        key: 4,
        stats: WeatherStats {
            temp_degree_days: 4837.25,
            temp_cdd: 1530.0,
            temp_hdd: 3307.25,
        },
    },
    WeatherEntry {
        key: 5,
        stats: WeatherStats {
            temp_degree_days: 5732.673550436854,
            temp_cdd: 1545.897537728356,
            temp_hdd: 4186.7760127084985,
        },
    },
];

/// Looks up a table entry by exact key. Returns `None` if not present.
pub fn find_entry(key: i64) -> Option<&'static WeatherEntry> {
    WEATHER_TABLE.iter().find(|e| e.key == key)
}

/// Largest key in the table; the wraparound modulus.
pub fn max_key() -> i64 {
    WEATHER_TABLE.iter().map(|e| e.key).max().unwrap_or(1)
}

/// Maps any integer month onto a table key.
///
/// Keys present in the table are used as-is. Anything else wraps with
/// `((month - 1) mod max_key) + 1` using Euclidean remainder, so zero and
/// negative months also land in `[1, max_key]`. The arithmetic is widened
/// to `i128` so the extremes of `i64` cannot overflow.
pub fn resolve_month(month: i64) -> i64 {
    if find_entry(month).is_some() {
        return month;
    }
    let modulus = i128::from(max_key());
    let mapped = (i128::from(month) - 1).rem_euclid(modulus) + 1;
    // mapped is in [1, max_key], which always fits back into i64
    mapped as i64
}

/// Weather statistics for an arbitrary month, after wraparound.
pub fn stats_for_month(month: i64) -> WeatherStats {
    let key = resolve_month(month);
    find_entry(key)
        .map(|e| e.stats)
        .unwrap_or(WEATHER_TABLE[0].stats)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
