//! `unlock` and `lock`.

use std::io::BufRead;
use std::time::Instant;

use ops_cost_core::gate::{AccessGate, DEFAULT_PIN, GateState, Pin, PinOutcome};

use super::CliError;
use super::flag::FileFlag;

/// Build a gate over the file flag with the configured PIN.
fn gate() -> Result<AccessGate<FileFlag>, CliError> {
    let pin = std::env::var("TRACKER_PIN")
        .ok()
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| DEFAULT_PIN.to_string());
    let pin = Pin::new(&pin).map_err(CliError::Pin)?;
    Ok(AccessGate::new(pin, FileFlag::from_env()?))
}

/// Check a PIN and persist the unlock.
///
/// Without an argument the PIN is read from the first line of stdin.
pub async fn unlock(pin: Option<String>) -> Result<(), CliError> {
    let mut gate = gate()?;
    if gate.restore().await? == GateState::Unlocked {
        println!("Already unlocked");
        return Ok(());
    }

    let code = match pin {
        Some(pin) => pin,
        None => {
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            line.trim().to_string()
        }
    };

    // Same rules as typing into the pad.
    match gate.paste(&code, Instant::now()).await? {
        PinOutcome::Accepted => {
            tracing::debug!(path = %gate.flag().path().display(), "Unlock flag stored");
            println!("Unlocked");
            Ok(())
        }
        PinOutcome::Rejected => Err(CliError::Rejected),
        PinOutcome::Pending | PinOutcome::Ignored => Err(CliError::IncompletePin),
    }
}

/// Clear the unlock flag.
pub async fn lock() -> Result<(), CliError> {
    gate()?.lock().await?;
    println!("Locked");
    Ok(())
}
