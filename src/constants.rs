pub const MAX_NAME_LENGTH: usize = 255;
pub const MAX_TITLE_LENGTH: usize = 255;
pub const MAX_LINK_LENGTH: usize = 255;
pub const MIN_PASSWORD_LENGTH: usize = 5;

/// Exclusive upper bound; prices carry at most three integer digits.
pub const MAX_PRICE: f64 = 1000.;

pub const MAX_BODY_BYTES: u64 = 64 * 1024;
pub const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

pub const MEDIA_URL: &str = "/static/media/";
pub const RECIPE_IMAGE_DIR: &str = "uploads/recipe";

pub const SESSION_COOKIE: &str = "session";

pub const DEFAULT_PORT: &str = "8000";
pub const DEFAULT_SESSION_HOURS: &str = "24";
pub const DEFAULT_MEDIA_ROOT: &str = "./media";
pub const DEFAULT_MAX_CONNECTIONS: &str = "5";
