//! Saturday-anchored week numbering
//!
//! The weekly request quota runs Saturday to Friday. Week 1 starts on the
//! year's first Saturday and also covers the leading partial week before it;
//! every later Saturday starts a new week.

use chrono::{Datelike, Duration, Local, NaiveDate};

/// Week number of `date` within its year.
pub fn week_number_for(date: NaiveDate) -> u32 {
    let jan1 = match NaiveDate::from_ymd_opt(date.year(), 1, 1) {
        Some(d) => d,
        None => return 1,
    };

    // Days from Jan 1 to the first Saturday of the year (0 if Jan 1 is one).
    let days_to_saturday = (6 - jan1.weekday().num_days_from_sunday() as i64).rem_euclid(7);
    let first_saturday = jan1 + Duration::days(days_to_saturday);

    if date < first_saturday {
        return 1;
    }

    ((date - first_saturday).num_days() / 7) as u32 + 1
}

/// Week number of today, in local time.
pub fn current_week_number() -> u32 {
    week_number_for(Local::now().date_naive())
}
