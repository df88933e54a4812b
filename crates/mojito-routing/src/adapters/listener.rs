use tokio::sync::mpsc;
use tracing::debug;

use crate::domain::RouteTableEvent;
use crate::ports::RouteTableListener;

// ============================================================================
// ChannelListener - hands events to an async consumer
// ============================================================================

/// Forwards every route table event into an unbounded tokio channel.
///
/// Listeners run on whatever thread mutated the table; this moves the real
/// work onto a task of the consumer's choosing.
///
/// # Example
///
/// ```rust,ignore
/// let (listener, mut events) = ChannelListener::new();
/// service.add_listener(Arc::new(listener));
/// tokio::spawn(async move {
///     while let Some(event) = events.recv().await {
///         println!("{event}");
///     }
/// });
/// ```
#[derive(Debug, Clone)]
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<RouteTableEvent>,
}

impl ChannelListener {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RouteTableEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl RouteTableListener for ChannelListener {
    fn handle_route_table_event(&self, event: &RouteTableEvent) {
        if self.tx.send(event.clone()).is_err() {
            debug!(event = %event, "event receiver dropped");
        }
    }
}
