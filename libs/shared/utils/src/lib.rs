pub mod dates;
pub mod test_utils;

pub use dates::{format_dmy, parse_dmy, parse_flexible_date};
