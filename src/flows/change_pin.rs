//! Set, change or remove the device PIN.

use std::sync::Arc;

use crate::error::{Result, WireError};
use crate::handler::{BoxFuture, Context, TypedHandler};
use crate::messages::{ButtonRequestCode, ChangePin, Success};
use crate::protocol::Wire;

use super::{DeviceUi, PinConfig, request_pin_ack, require_confirm};

/// Workflow for the `ChangePin` request.
pub struct ChangePinFlow {
    config: Arc<dyn PinConfig>,
    ui: Arc<dyn DeviceUi>,
}

impl ChangePinFlow {
    /// Bind the workflow to its credential store and UI collaborators.
    pub fn new(config: Arc<dyn PinConfig>, ui: Arc<dyn DeviceUi>) -> Self {
        Self { config, ui }
    }

    async fn require_confirm_change<W: Wire>(
        &self,
        ctx: &mut Context<W>,
        req: &ChangePin,
    ) -> Result<()> {
        let has_pin = self.config.has_pin();
        let title = match (req.remove, has_pin) {
            (true, true) => "Remove current PIN?",
            (false, true) => "Change current PIN?",
            (false, false) => "Set new PIN?",
            // removing a PIN that is not set; nothing to confirm
            (true, false) => return Ok(()),
        };
        require_confirm(ctx, self.ui.as_ref(), ButtonRequestCode::ProtectCall, title).await
    }

    /// Prompt for a new PIN twice until both entries match.
    async fn request_pin_confirm<W: Wire>(&self, ctx: &mut Context<W>) -> Result<String> {
        loop {
            let first = request_pin_ack(ctx, self.ui.as_ref(), "Enter new PIN").await?;
            let second = request_pin_ack(ctx, self.ui.as_ref(), "Re-enter new PIN").await?;
            if first == second {
                return Ok(first);
            }
            self.ui.pin_mismatch().await;
        }
    }
}

impl<W: Wire> TypedHandler<W> for ChangePinFlow {
    type Req = ChangePin;
    type Reply = Success;

    fn handle<'a>(
        &'a self,
        ctx: &'a mut Context<W>,
        req: ChangePin,
    ) -> BoxFuture<'a, Result<Option<Success>>> {
        Box::pin(async move {
            // confirm that the user wants to touch the PIN at all
            self.require_confirm_change(ctx, &req).await?;

            // verify the current PIN when one is set
            let current = if self.config.has_pin() {
                let pin = request_pin_ack(ctx, self.ui.as_ref(), "Enter current PIN").await?;
                if !self.config.check_pin(&pin) {
                    return Err(WireError::pin_invalid());
                }
                pin
            } else {
                String::new()
            };

            // collect the new PIN; the store is untouched until both entries
            // match
            let new = if req.remove {
                String::new()
            } else {
                self.request_pin_confirm(ctx).await?
            };

            if !self.config.change_pin(&current, &new) {
                return Err(WireError::pin_invalid());
            }

            let message = if new.is_empty() {
                "PIN removed"
            } else {
                "PIN changed"
            };
            Ok(Some(Success {
                message: message.to_string(),
            }))
        })
    }
}
