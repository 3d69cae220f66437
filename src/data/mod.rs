//! Dataset sources.
//!
//! - `sample`: synthetic noisy datasets from a catalog model
//! - `remote`: datasets fetched over HTTP
//! - the Gaussian example shipped with the binary

pub mod remote;
pub mod sample;

pub use remote::*;
pub use sample::*;

use crate::error::AppError;
use crate::io::{ParsedColumns, parse_columns};

/// Text of the bundled example dataset (`x y sy`, Gaussian peak on 0..1).
pub const EXAMPLE_DATA: &str = include_str!("../../assets/gaussian_example.xye");

/// The bundled example, or the file at `FUNCFIT_EXAMPLE_URL` when that is set.
pub fn example_dataset() -> Result<ParsedColumns, AppError> {
    if let Some(url) = example_url_from_env() {
        log::info!("fetching example dataset from {url}");
        return fetch_columns(&url);
    }
    Ok(parse_columns(EXAMPLE_DATA)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_example_parses_with_sigma() {
        let parsed = parse_columns(EXAMPLE_DATA).unwrap();
        assert_eq!(parsed.len(), 101);
        assert!(parsed.has_sigma());
        assert!(parsed.x.windows(2).all(|w| w[0] < w[1]));
        assert!(parsed.sigma_y.iter().all(|s| *s > 0.0));
    }
}
