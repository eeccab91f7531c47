//! Credit charging for completed renders.
//!
//! Credits are charged after a render produced at least one clip, never
//! upfront. The decrement is not transactional with the render: a store
//! failure is logged and the rendered clips are still returned.

use std::time::Duration;

use tracing::{debug, warn};

use reelcut_models::Account;

use crate::accounts::AccountStore;
use crate::context::RequestContext;

/// Whether a successful render by this caller costs a credit.
pub fn is_chargeable(ctx: &RequestContext, account: &Account) -> bool {
    !ctx.is_admin() && !account.is_premium
}

/// Remove one credit from `email`, bounded by `timeout`.
///
/// Returns `true` when the store acknowledged the decrement.
pub async fn charge_render_credit(store: &dyn AccountStore, email: &str, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, store.decrement_credits(email)).await {
        Ok(Ok(remaining)) => {
            debug!(email = %email, remaining, "Charged render credit");
            true
        }
        Ok(Err(e)) => {
            warn!(email = %email, error = %e, "Failed to charge render credit");
            false
        }
        Err(_) => {
            warn!(email = %email, "Render credit charge timed out");
            false
        }
    }
}
