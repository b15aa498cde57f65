pub mod reading_source;
