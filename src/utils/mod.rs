pub mod constants;
pub mod url_utils;

pub use constants::*;
pub use url_utils::{canonicalize_url, is_same_site, is_valid_url, normalize_discovered_url};
