pub mod http_utils;
pub mod sheet_utils;
pub mod xlsx;
