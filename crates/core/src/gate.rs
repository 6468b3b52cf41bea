//! PIN access gate.
//!
//! A shared four-digit PIN unlocks the tracker. The gate is a two-state
//! machine (`Locked`/`Unlocked`); a successful entry sets a persisted unlock
//! flag which stays set until [`AccessGate::lock`] clears it.
//!
//! Where the flag lives is up to the front end: the web server keeps it in the
//! browser session, the CLI in a state file. Both go through [`UnlockFlag`].

use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use thiserror::Error;

/// Number of digits in a PIN.
pub const PIN_LENGTH: usize = 4;

/// Storage key for the unlock flag.
pub const UNLOCK_FLAG_KEY: &str = "ops_cost_auth";

/// How long a rejected entry stays on screen before the pad clears.
pub const REJECT_RESET_DELAY: Duration = Duration::from_millis(500);

/// The secret used when none is configured.
pub const DEFAULT_PIN: &str = "1234";

/// Errors for an invalid configured PIN.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PinError {
    #[error("PIN must be exactly {PIN_LENGTH} digits, got {0} characters")]
    WrongLength(usize),

    #[error("PIN must contain only digits")]
    NonDigit,
}

/// The shared secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Pin(String);

impl Pin {
    /// Validate and wrap a PIN.
    ///
    /// # Errors
    ///
    /// Returns `PinError` unless `value` is exactly four ASCII digits.
    pub fn new(value: &str) -> Result<Self, PinError> {
        let count = value.chars().count();
        if count != PIN_LENGTH {
            return Err(PinError::WrongLength(count));
        }
        if !value.chars().all(|c| c.is_ascii_digit()) {
            return Err(PinError::NonDigit);
        }
        Ok(Self(value.to_string()))
    }

    /// Compare an attempt against the secret without short-circuiting.
    #[must_use]
    pub fn matches(&self, attempt: &str) -> bool {
        constant_time_compare(&self.0, attempt)
    }
}

impl Default for Pin {
    fn default() -> Self {
        Self(DEFAULT_PIN.to_string())
    }
}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Pin([REDACTED])")
    }
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

/// Gate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Locked,
    Unlocked,
}

/// Result of feeding input to the pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinOutcome {
    /// Input was not digits and was discarded.
    Ignored,
    /// Accepted into the pad; not enough digits to check yet.
    Pending,
    /// The entry matched.
    Accepted,
    /// The entry was wrong. The pad clears after [`REJECT_RESET_DELAY`].
    Rejected,
}

/// Four-slot digit entry.
///
/// The pad only collects input. Comparison against the secret happens in
/// [`AccessGate`], which owns both.
#[derive(Debug, Clone, Default)]
pub struct PinPad {
    slots: [Option<char>; PIN_LENGTH],
    error: bool,
    reset_at: Option<Instant>,
}

impl PinPad {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current slot contents; empty slots are `None`.
    #[must_use]
    pub const fn slots(&self) -> &[Option<char>; PIN_LENGTH] {
        &self.slots
    }

    /// Whether the error indicator is raised.
    #[must_use]
    pub const fn has_error(&self) -> bool {
        self.error
    }

    /// Whether a reset is scheduled.
    #[must_use]
    pub const fn reset_pending(&self) -> bool {
        self.reset_at.is_some()
    }

    /// The digits entered so far, in slot order, skipping empty slots.
    #[must_use]
    pub fn code(&self) -> String {
        self.slots.iter().flatten().collect()
    }

    /// Type into one slot.
    ///
    /// Input containing anything but digits is ignored. Otherwise the last
    /// character wins and an empty string clears the slot. Returns the code to
    /// check once the final slot has been filled.
    pub fn enter(&mut self, index: usize, value: &str) -> (PinOutcome, Option<String>) {
        if !value.chars().all(|c| c.is_ascii_digit()) {
            return (PinOutcome::Ignored, None);
        }
        let Some(slot) = self.slots.get_mut(index) else {
            return (PinOutcome::Ignored, None);
        };

        *slot = value.chars().last();
        self.error = false;

        if index == PIN_LENGTH - 1 && slot.is_some() {
            (PinOutcome::Pending, Some(self.code()))
        } else {
            (PinOutcome::Pending, None)
        }
    }

    /// Paste a block of text.
    ///
    /// Only the first four characters are considered, and only if they are all
    /// digits. A short paste fills the leading slots and waits for more input.
    /// Returns the pasted code when it fills every slot.
    pub fn paste(&mut self, text: &str) -> (PinOutcome, Option<String>) {
        let pasted: String = text.chars().take(PIN_LENGTH).collect();
        if pasted.is_empty() || !pasted.chars().all(|c| c.is_ascii_digit()) {
            return (PinOutcome::Ignored, None);
        }

        for (slot, c) in self.slots.iter_mut().zip(pasted.chars()) {
            *slot = Some(c);
        }

        if pasted.len() == PIN_LENGTH {
            (PinOutcome::Pending, Some(pasted))
        } else {
            (PinOutcome::Pending, None)
        }
    }

    /// Step back from an empty slot. Returns the slot that should take focus.
    #[must_use]
    pub fn backspace(&self, index: usize) -> usize {
        match self.slots.get(index) {
            Some(None) if index > 0 => index - 1,
            _ => index,
        }
    }

    /// Mark the current entry as wrong and schedule the reset.
    pub fn reject(&mut self, now: Instant) {
        self.error = true;
        self.reset_at = Some(now + REJECT_RESET_DELAY);
    }

    /// Apply a scheduled reset once its window has elapsed.
    ///
    /// The slots are cleared but the error indicator stays up until the next
    /// keystroke. Returns true if a reset happened.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.reset_at {
            Some(deadline) if now >= deadline => {
                self.slots = [None; PIN_LENGTH];
                self.reset_at = None;
                true
            }
            _ => false,
        }
    }

    /// Clear everything.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Persistence for the unlock flag.
pub trait UnlockFlag: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Whether the flag is currently set.
    fn is_set(&self) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    /// Set the flag.
    fn set(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Clear the flag.
    fn clear(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// In-process flag. Forgets everything when dropped.
#[derive(Debug, Default)]
pub struct MemoryFlag(AtomicBool);

impl MemoryFlag {
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }
}

impl UnlockFlag for MemoryFlag {
    type Error = Infallible;

    async fn is_set(&self) -> Result<bool, Infallible> {
        Ok(self.0.load(Ordering::SeqCst))
    }

    async fn set(&self) -> Result<(), Infallible> {
        self.0.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn clear(&self) -> Result<(), Infallible> {
        self.0.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// The gate itself: secret, pad and flag.
#[derive(Debug)]
pub struct AccessGate<F> {
    pin: Pin,
    pad: PinPad,
    flag: F,
    state: GateState,
}

impl<F: UnlockFlag> AccessGate<F> {
    /// Create a locked gate. Call [`restore`](Self::restore) to pick up a
    /// previously persisted unlock.
    pub fn new(pin: Pin, flag: F) -> Self {
        Self {
            pin,
            pad: PinPad::new(),
            flag,
            state: GateState::Locked,
        }
    }

    #[must_use]
    pub const fn state(&self) -> GateState {
        self.state
    }

    #[must_use]
    pub const fn pad(&self) -> &PinPad {
        &self.pad
    }

    #[must_use]
    pub const fn flag(&self) -> &F {
        &self.flag
    }

    /// Read the persisted flag and adopt its state.
    ///
    /// # Errors
    ///
    /// Propagates flag storage errors.
    pub async fn restore(&mut self) -> Result<GateState, F::Error> {
        self.state = if self.flag.is_set().await? {
            GateState::Unlocked
        } else {
            GateState::Locked
        };
        Ok(self.state)
    }

    /// Type one character into a slot.
    ///
    /// # Errors
    ///
    /// Propagates flag storage errors on a successful unlock.
    pub async fn enter_digit(
        &mut self,
        index: usize,
        value: &str,
        now: Instant,
    ) -> Result<PinOutcome, F::Error> {
        let (outcome, code) = self.pad.enter(index, value);
        self.check(outcome, code, now).await
    }

    /// Paste a block of digits.
    ///
    /// # Errors
    ///
    /// Propagates flag storage errors on a successful unlock.
    pub async fn paste(&mut self, text: &str, now: Instant) -> Result<PinOutcome, F::Error> {
        let (outcome, code) = self.pad.paste(text);
        self.check(outcome, code, now).await
    }

    /// Check a complete entry in one go, as a form submission does.
    ///
    /// Unlike [`paste`](Self::paste), anything that is not exactly the secret
    /// is a rejection, including short or non-digit input.
    ///
    /// # Errors
    ///
    /// Propagates flag storage errors on a successful unlock.
    pub async fn submit(&mut self, code: &str, now: Instant) -> Result<PinOutcome, F::Error> {
        self.pad.clear();
        self.check(PinOutcome::Pending, Some(code.to_string()), now)
            .await
    }

    /// Apply a pending reset. See [`PinPad::poll`].
    pub fn poll(&mut self, now: Instant) -> bool {
        self.pad.poll(now)
    }

    /// Lock the gate and clear the persisted flag.
    ///
    /// # Errors
    ///
    /// Propagates flag storage errors.
    pub async fn lock(&mut self) -> Result<(), F::Error> {
        self.flag.clear().await?;
        self.pad.clear();
        self.state = GateState::Locked;
        Ok(())
    }

    async fn check(
        &mut self,
        outcome: PinOutcome,
        code: Option<String>,
        now: Instant,
    ) -> Result<PinOutcome, F::Error> {
        let Some(code) = code else {
            return Ok(outcome);
        };

        if self.pin.matches(&code) {
            self.flag.set().await?;
            self.pad.clear();
            self.state = GateState::Unlocked;
            tracing::info!("access gate unlocked");
            Ok(PinOutcome::Accepted)
        } else {
            self.pad.reject(now);
            tracing::debug!("access gate rejected an entry");
            Ok(PinOutcome::Rejected)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn gate() -> AccessGate<MemoryFlag> {
        AccessGate::new(Pin::default(), MemoryFlag::new())
    }

    #[test]
    fn test_pin_validation() {
        assert!(Pin::new("0042").is_ok());
        assert_eq!(Pin::new("123"), Err(PinError::WrongLength(3)));
        assert_eq!(Pin::new("12345"), Err(PinError::WrongLength(5)));
        assert_eq!(Pin::new("12a4"), Err(PinError::NonDigit));
    }

    #[test]
    fn test_pin_debug_is_redacted() {
        let debug = format!("{:?}", Pin::default());
        assert!(!debug.contains("1234"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("1234", "1234"));
        assert!(!constant_time_compare("1234", "1235"));
        assert!(!constant_time_compare("1234", "123"));
    }

    #[test]
    fn test_pad_ignores_non_digits_and_keeps_last_char() {
        let mut pad = PinPad::new();
        assert_eq!(pad.enter(0, "a").0, PinOutcome::Ignored);
        assert_eq!(pad.slots()[0], None);

        pad.enter(0, "79");
        assert_eq!(pad.slots()[0], Some('9'));

        pad.enter(0, "");
        assert_eq!(pad.slots()[0], None);
    }

    #[test]
    fn test_pad_backspace_moves_to_previous_empty() {
        let mut pad = PinPad::new();
        pad.enter(0, "1");
        assert_eq!(pad.backspace(1), 0);
        assert_eq!(pad.backspace(0), 0);
        pad.enter(1, "2");
        assert_eq!(pad.backspace(1), 1);
    }

    #[tokio::test]
    async fn test_digit_by_digit_unlocks_and_persists() {
        let mut gate = gate();
        let now = Instant::now();

        for (i, d) in ["1", "2", "3"].iter().enumerate() {
            assert_eq!(gate.enter_digit(i, d, now).await.unwrap(), PinOutcome::Pending);
        }
        assert_eq!(gate.state(), GateState::Locked);

        assert_eq!(
            gate.enter_digit(3, "4", now).await.unwrap(),
            PinOutcome::Accepted
        );
        assert_eq!(gate.state(), GateState::Unlocked);
        assert!(gate.flag().is_set().await.unwrap());

        // A fresh gate over the same flag comes back unlocked.
        let AccessGate { flag, .. } = gate;
        let mut restored = AccessGate::new(Pin::default(), flag);
        assert_eq!(restored.restore().await.unwrap(), GateState::Unlocked);
    }

    #[tokio::test]
    async fn test_wrong_pin_rejects_then_resets() {
        let mut gate = gate();
        let start = Instant::now();

        for (i, d) in ["4", "3", "2", "1"].iter().enumerate() {
            gate.enter_digit(i, d, start).await.unwrap();
        }

        assert_eq!(gate.state(), GateState::Locked);
        assert!(gate.pad().has_error());
        assert!(!gate.flag().is_set().await.unwrap());
        assert_eq!(gate.pad().code(), "4321");

        assert!(!gate.poll(start + Duration::from_millis(499)));
        assert_eq!(gate.pad().code(), "4321");

        assert!(gate.poll(start + REJECT_RESET_DELAY));
        assert_eq!(gate.pad().code(), "");
        assert!(gate.pad().has_error());

        gate.enter_digit(0, "1", start + Duration::from_secs(1))
            .await
            .unwrap();
        assert!(!gate.pad().has_error());
    }

    #[tokio::test]
    async fn test_final_slot_with_gaps_is_rejected() {
        let mut gate = gate();
        let now = Instant::now();
        gate.enter_digit(0, "1", now).await.unwrap();
        assert_eq!(
            gate.enter_digit(3, "4", now).await.unwrap(),
            PinOutcome::Rejected
        );
        assert_eq!(gate.state(), GateState::Locked);
    }

    #[tokio::test]
    async fn test_paste() {
        let mut gate = gate();
        let now = Instant::now();

        assert_eq!(gate.paste("12ab", now).await.unwrap(), PinOutcome::Ignored);
        assert_eq!(gate.pad().code(), "");

        assert_eq!(gate.paste("12", now).await.unwrap(), PinOutcome::Pending);
        assert_eq!(gate.pad().code(), "12");

        assert_eq!(gate.paste("123456", now).await.unwrap(), PinOutcome::Accepted);
        assert_eq!(gate.state(), GateState::Unlocked);
    }

    #[tokio::test]
    async fn test_submit_and_lock() {
        let mut gate = gate();
        let now = Instant::now();

        assert_eq!(gate.submit("12", now).await.unwrap(), PinOutcome::Rejected);
        assert_eq!(gate.submit("1234", now).await.unwrap(), PinOutcome::Accepted);
        assert_eq!(gate.state(), GateState::Unlocked);

        gate.lock().await.unwrap();
        assert_eq!(gate.state(), GateState::Locked);
        assert!(!gate.flag().is_set().await.unwrap());
    }
}
