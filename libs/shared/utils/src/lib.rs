pub mod jwt;
pub mod extractor;
pub mod access;
pub mod test_utils;
