//! Publish points in the convert/identify workflow.
//!
//! Extensions register a subscriber with the dispatcher and get a mutable view
//! of the arguments at each point they asked for.

use strum::{EnumString, IntoStaticStr, VariantArray};
use tracing::trace;

use crate::{arguments::ExecArguments, error::MagickError};

#[derive(EnumString, IntoStaticStr, VariantArray, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[strum(serialize_all = "snake_case")]
pub enum ExecutionEvent {
    /// Before the source is read. Subscribers can point the arguments at a
    /// local copy of a remote file.
    EnsureSourceLocalPath,
    PreIdentifyExecute,
    PreConvertExecute,
    /// After the destination has been written.
    PostSave,
}

pub trait EventSubscriber: Send + Sync {
    /// The events to receive, each with a priority. Higher runs first.
    fn subscribed_events(&self) -> Vec<(ExecutionEvent, i32)>;

    fn handle(
        &self,
        event: ExecutionEvent,
        arguments: &mut ExecArguments,
    ) -> Result<(), MagickError>;
}

struct Listener {
    event: ExecutionEvent,
    priority: i32,
    subscriber: usize,
}

#[derive(Default)]
pub struct EventDispatcher {
    subscribers: Vec<Box<dyn EventSubscriber>>,
    /// Sorted by descending priority; equal priorities keep registration order.
    listeners: Vec<Listener>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn subscribe(&mut self, subscriber: Box<dyn EventSubscriber>) {
        let index = self.subscribers.len();
        for (event, priority) in subscriber.subscribed_events() {
            self.listeners.push(Listener {
                event,
                priority,
                subscriber: index,
            });
        }
        self.subscribers.push(subscriber);
        // stable sort keeps registration order within a priority
        self.listeners.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    pub fn has_listeners(&self, event: ExecutionEvent) -> bool {
        self.listeners.iter().any(|l| l.event == event)
    }

    /// Calls every listener for `event`. The first error stops the dispatch.
    pub fn dispatch(
        &self,
        event: ExecutionEvent,
        arguments: &mut ExecArguments,
    ) -> Result<(), MagickError> {
        let name: &'static str = event.into();
        for listener in self.listeners.iter().filter(|l| l.event == event) {
            trace!(event = name, priority = listener.priority, "dispatching");
            self.subscribers[listener.subscriber].handle(event, arguments)?;
        }
        Ok(())
    }
}
