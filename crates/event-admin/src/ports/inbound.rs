//! # Inbound Port - EventAdminApi
//!
//! Primary driving port exposing event delivery to producers.
//!
//! | Method | Blocks caller | Fails when |
//! |--------|---------------|------------|
//! | `publish` | no | stopped |
//! | `send` | until every matched handler was attempted | stopped |
//! | `stop` | until pools drain (bounded by the shutdown grace) | never |

use crate::domain::Event;
use crate::error::Result;

/// Primary API of the event admin.
///
/// # Example
///
/// ```rust,ignore
/// use event_admin::ports::EventAdminApi;
///
/// fn notify(bus: &impl EventAdminApi) -> event_admin::Result<()> {
///     bus.publish(Event::with_topic("org/example/ITEM_ADDED")?)?;
///     Ok(())
/// }
/// ```
pub trait EventAdminApi: Send + Sync {
    /// Delivers `event` asynchronously; returns once it is queued.
    ///
    /// # Errors
    /// - `IllegalState`: the bus was stopped
    fn publish(&self, event: Event) -> Result<()>;

    /// Delivers `event` synchronously; returns once every matched handler
    /// completed or timed out.
    ///
    /// # Errors
    /// - `IllegalState`: the bus was stopped
    fn send(&self, event: Event) -> Result<()>;

    /// Irreversibly stops the bus. Idempotent.
    fn stop(&self);

    fn is_stopped(&self) -> bool;
}
