pub const API_KEY: &str = "e2e-api-key";
pub const SERIES_ID: i64 = 12;
pub const MOVIE_ID: i64 = 40;
