//! Concrete workflows shipped with the session core, and the collaborator
//! contracts they talk to.
//!
//! User-interface rendering and credential storage are external; workflows see
//! them only through [`DeviceUi`] and [`PinConfig`].

mod change_pin;

pub use change_pin::ChangePinFlow;

use crate::error::{Result, WireError};
use crate::handler::{BoxFuture, Context};
use crate::messages::{ButtonAck, ButtonRequest, ButtonRequestCode};
use crate::protocol::Wire;

/// Credential store surface for the device PIN.
pub trait PinConfig: Send + Sync {
    /// Whether a PIN is currently set.
    fn has_pin(&self) -> bool;
    /// Check a PIN against the stored one.
    fn check_pin(&self, pin: &str) -> bool;
    /// Replace the stored PIN; `new` empty removes it. Returns `false` when
    /// `current` does not match.
    fn change_pin(&self, current: &str, new: &str) -> bool;
}

/// On-device user interface surface.
///
/// The futures are owned by the UI implementation; workflows race them against
/// the wire via [`Context::wait`], so a new host request can interrupt any
/// prompt.
pub trait DeviceUi: Send + Sync {
    /// Show a PIN prompt; resolves to the entered PIN, or `None` when the
    /// user cancels.
    fn request_pin(&self, prompt: &str) -> BoxFuture<'static, Option<String>>;
    /// Show a confirmation dialog; resolves to `true` when confirmed.
    fn confirm_dialog(&self, title: &str) -> BoxFuture<'static, bool>;
    /// Tell the user two PIN entries did not match.
    fn pin_mismatch(&self) -> BoxFuture<'static, ()>;
}

/// Ask the user to confirm an action.
///
/// Two-step confirmation readiness: write `ButtonRequest{code}` and wait for
/// the host's `ButtonAck`, then race the on-device dialog against the wire.
/// Declining fails the workflow with `ActionCancelled`.
pub async fn require_confirm<W: Wire>(
    ctx: &mut Context<W>,
    ui: &dyn DeviceUi,
    code: ButtonRequestCode,
    title: &str,
) -> Result<()> {
    let _ack: ButtonAck = ctx.call(ButtonRequest { code }).await?;
    let confirmed = ctx.wait(ui.confirm_dialog(title)).await?;
    if confirmed {
        Ok(())
    } else {
        Err(WireError::action_cancelled())
    }
}

/// Prompt for a PIN after announcing the interaction to the host.
///
/// Cancellation of the prompt fails the workflow with `ActionCancelled`.
pub async fn request_pin_ack<W: Wire>(
    ctx: &mut Context<W>,
    ui: &dyn DeviceUi,
    prompt: &str,
) -> Result<String> {
    let _ack: ButtonAck = ctx
        .call(ButtonRequest {
            code: ButtonRequestCode::Other,
        })
        .await?;
    match ctx.wait(ui.request_pin(prompt)).await? {
        Some(pin) => Ok(pin),
        None => Err(WireError::action_cancelled()),
    }
}
