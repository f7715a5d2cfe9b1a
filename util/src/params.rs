//! Generic parameters functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::de::DeserializeOwned;
use std::fs::read_to_string;
use std::path::Path;
use thiserror::Error;
use toml;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// An error that occurs during loading of a parameter file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("The software root environment variable (DRIVE_SW_ROOT) is not set")]
    SwRootNotSet,

    #[error("Cannot load the parmeter file: {0}")]
    FileLoadError(std::io::Error),

    #[error("Cannot read the parameter file: {0}")]
    DeserialiseError(toml::de::Error),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Load a parameter file
///
/// The file path is relative to the "$DRIVE_SW_ROOT/params" directory
pub fn load<P>(param_file_path: &str) -> Result<P, LoadError>
where
    P: DeserializeOwned,
{
    let path = crate::host::get_sw_root()
        .map_err(|_| LoadError::SwRootNotSet)?
        .join("params")
        .join(param_file_path);

    load_path(path)
}

/// Load a parameter file from an explicit path.
pub fn load_path<P, A>(path: A) -> Result<P, LoadError>
where
    P: DeserializeOwned,
    A: AsRef<Path>,
{
    let params_str = read_to_string(path).map_err(LoadError::FileLoadError)?;

    toml::from_str(params_str.as_str()).map_err(LoadError::DeserialiseError)
}

#[cfg(test)]
mod test {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, Debug, PartialEq)]
    struct TestParams {
        k_p: f64,
        endpoint: String,
    }

    #[test]
    fn test_load_path() {
        let path = std::env::temp_dir().join("util_params_test_load_path.toml");
        std::fs::write(&path, "k_p = 0.19\nendpoint = \"tcp://*:4567\"\n").unwrap();

        let params: TestParams = load_path(&path).unwrap();
        assert_eq!(
            params,
            TestParams {
                k_p: 0.19,
                endpoint: "tcp://*:4567".into()
            }
        );

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_path_errors() {
        let missing = std::env::temp_dir().join("util_params_test_missing.toml");
        match load_path::<TestParams, _>(&missing) {
            Err(LoadError::FileLoadError(_)) => (),
            r => panic!("Expected FileLoadError, got {:?}", r),
        }

        let bad = std::env::temp_dir().join("util_params_test_bad.toml");
        std::fs::write(&bad, "k_p = \"not a number\"\n").unwrap();
        match load_path::<TestParams, _>(&bad) {
            Err(LoadError::DeserialiseError(_)) => (),
            r => panic!("Expected DeserialiseError, got {:?}", r),
        }
        std::fs::remove_file(&bad).ok();
    }
}
