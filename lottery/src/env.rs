use std::path::PathBuf;

use anyhow::Context as _;

/// Loads the local `.env`, if any, so `LOTTERY_RPC_URL` and friends can live
/// next to the address book. Variables already set in the environment win.
///
/// Runs before logging is set up (the file may carry `RUST_LOG`), so the
/// outcome is returned for the caller to log. A missing file is `Ok(None)`.
pub fn load_dotenvy_vars_if_present() -> anyhow::Result<Option<PathBuf>> {
    match dotenvy::dotenv() {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(e).context("found a local `.env` file but was unable to parse it"),
    }
}
