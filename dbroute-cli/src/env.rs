//! Environment loading for commands.

use dbroute_config::MapEnvSource;

use crate::cli::EnvArgs;
use crate::error::CliResult;

/// Snapshot the process environment, with an optional dotenv file underneath.
pub fn load(args: &EnvArgs) -> CliResult<MapEnvSource> {
    let source = MapEnvSource::from_process();
    match &args.env_file {
        Some(path) => Ok(source.merge_env_file(path)?),
        None => Ok(source),
    }
}
