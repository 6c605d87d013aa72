use chrono::NaiveDate;

pub(crate) mod helper {
    #[cfg(not(test))]
    pub use super::get_utc_now;
    #[cfg(test)]
    pub use super::mock_chrono::{get_utc_now, set_mock_now};
}

/// calendar date orders are stamped with
pub(crate) fn today() -> NaiveDate {
    helper::get_utc_now().date_naive()
}


#[cfg(not(test))]
pub fn get_utc_now() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now()
}
