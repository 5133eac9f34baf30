use std::any::{Any, TypeId};
use std::marker::PhantomData;
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::Mutex;
use tracing::trace;

type SharedHandler = Arc<Mutex<Box<dyn EventHandler>>>;

/// Application-wide event bus
///
/// Handlers run without the bus lock held, so a handler may publish,
/// subscribe or touch state that publishes in turn.
#[derive(Clone, Default)]
pub struct EventBus {
    handlers: Arc<Mutex<AHashMap<TypeId, Vec<SharedHandler>>>>,
}

/// Event trait that all events must implement
pub trait Event: Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;
}

/// Handler trait for event handlers
pub trait EventHandler: Send + Sync {
    fn handle(&mut self, event: &dyn Event);
}

/// Common application events
pub mod events {
    use super::Event;
    use crate::annotations::AnnotationEvent;
    use crate::selection::SelectionSource;

    /// The dataset index was fetched
    #[derive(Debug, Clone)]
    pub struct DatasetIndexLoaded {
        pub dataset_count: usize,
    }

    /// A dataset document finished loading
    #[derive(Debug, Clone)]
    pub struct DatasetLoaded {
        pub dataset_id: String,
        pub entity_count: usize,
        pub event_count: usize,
        pub location_count: usize,
    }

    /// A dataset document failed to load
    #[derive(Debug, Clone)]
    pub struct DatasetLoadFailed {
        pub dataset_id: String,
        pub dataset_name: String,
        pub error: String,
    }

    /// The shared selection changed
    #[derive(Debug, Clone)]
    pub struct SelectionChanged {
        pub source: Option<SelectionSource>,
        pub selected_count: usize,
    }

    /// A preference was written, removed or cleared
    #[derive(Debug, Clone)]
    pub struct PreferenceChanged {
        pub key: String,
    }

    /// An annotation was created, edited, deleted or imported
    #[derive(Debug, Clone)]
    pub struct AnnotationChanged {
        pub change: AnnotationEvent,
    }

    // Implement Event trait for all event types
    macro_rules! impl_event {
        ($($t:ty),*) => {
            $(
                impl Event for $t {
                    fn as_any(&self) -> &dyn std::any::Any {
                        self
                    }
                }
            )*
        }
    }

    impl_event!(
        DatasetIndexLoaded,
        DatasetLoaded,
        DatasetLoadFailed,
        SelectionChanged,
        PreferenceChanged,
        AnnotationChanged
    );
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to events of a specific type
    pub fn subscribe<E: Event>(&self, handler: Box<dyn EventHandler>) {
        let type_id = TypeId::of::<E>();
        let mut handlers = self.handlers.lock();
        handlers
            .entry(type_id)
            .or_default()
            .push(Arc::new(Mutex::new(handler)));
    }

    /// Subscribe a closure taking the concrete event type
    pub fn on<E, F>(&self, f: F)
    where
        E: Event,
        F: FnMut(&E) + Send + Sync + 'static,
    {
        self.subscribe::<E>(Box::new(TypedEventHandler {
            handler: f,
            _event: PhantomData,
        }));
    }

    /// Publish an event to the handlers subscribed when the call starts
    ///
    /// A handler that is already running further up the stack is skipped,
    /// so an event that publishes its own type does not recurse into it.
    pub fn publish<E: Event>(&self, event: E) {
        let snapshot: Vec<SharedHandler> = self
            .handlers
            .lock()
            .get(&TypeId::of::<E>())
            .cloned()
            .unwrap_or_default();

        for handler in snapshot {
            match handler.try_lock() {
                Some(mut handler) => handler.handle(&event),
                None => trace!(
                    event = std::any::type_name::<E>(),
                    "Handler is already running, skipping nested dispatch"
                ),
            }
        }
    }

    /// Number of handlers for one event type
    pub fn handler_count<E: Event>(&self) -> usize {
        self.handlers
            .lock()
            .get(&TypeId::of::<E>())
            .map(Vec::len)
            .unwrap_or(0)
    }
}

/// Helper struct for creating event handlers from closures
pub struct ClosureEventHandler<F> {
    handler: F,
}

impl<F> EventHandler for ClosureEventHandler<F>
where
    F: FnMut(&dyn Event) + Send + Sync,
{
    fn handle(&mut self, event: &dyn Event) {
        (self.handler)(event);
    }
}

/// Create an event handler from a closure
pub fn handler_from_fn<F>(f: F) -> Box<dyn EventHandler>
where
    F: FnMut(&dyn Event) + Send + Sync + 'static,
{
    Box::new(ClosureEventHandler { handler: f })
}

struct TypedEventHandler<E, F> {
    handler: F,
    _event: PhantomData<fn(&E)>,
}

impl<E, F> EventHandler for TypedEventHandler<E, F>
where
    E: Event,
    F: FnMut(&E) + Send + Sync,
{
    fn handle(&mut self, event: &dyn Event) {
        if let Some(event) = event.as_any().downcast_ref::<E>() {
            (self.handler)(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::events::{DatasetLoadFailed, DatasetLoaded, PreferenceChanged};
    use super::*;

    #[test]
    fn test_typed_handlers_only_see_their_event() {
        let bus = EventBus::new();
        let failures = Arc::new(Mutex::new(Vec::new()));
        let sink = failures.clone();
        bus.on::<DatasetLoadFailed, _>(move |event| sink.lock().push(event.dataset_id.clone()));

        bus.publish(DatasetLoaded {
            dataset_id: "ok".into(),
            entity_count: 1,
            event_count: 0,
            location_count: 0,
        });
        bus.publish(DatasetLoadFailed {
            dataset_id: "broken".into(),
            dataset_name: "Broken".into(),
            error: "404".into(),
        });

        assert_eq!(failures.lock().as_slice(), &["broken".to_string()]);
        assert_eq!(bus.handler_count::<DatasetLoadFailed>(), 1);
        assert_eq!(bus.handler_count::<DatasetLoaded>(), 0);
    }

    #[test]
    fn test_untyped_handler() {
        let bus = EventBus::new();
        let count = Arc::new(Mutex::new(0));
        let sink = count.clone();
        bus.subscribe::<DatasetLoaded>(handler_from_fn(move |_| *sink.lock() += 1));

        bus.publish(DatasetLoaded {
            dataset_id: "a".into(),
            entity_count: 0,
            event_count: 0,
            location_count: 0,
        });
        assert_eq!(*count.lock(), 1);
    }

    #[test]
    fn test_handler_may_publish_and_subscribe() {
        let bus = EventBus::new();
        let keys = Arc::new(Mutex::new(Vec::new()));

        let inner_bus = bus.clone();
        let sink = keys.clone();
        bus.on::<DatasetLoaded, _>(move |event| {
            let late = sink.clone();
            inner_bus.on::<PreferenceChanged, _>(move |event| late.lock().push(event.key.clone()));
            inner_bus.publish(PreferenceChanged {
                key: event.dataset_id.clone(),
            });
        });

        bus.publish(DatasetLoaded {
            dataset_id: "ops".into(),
            entity_count: 0,
            event_count: 0,
            location_count: 0,
        });

        assert_eq!(keys.lock().as_slice(), &["ops".to_string()]);
        assert_eq!(bus.handler_count::<PreferenceChanged>(), 1);
    }

    #[test]
    fn test_nested_publish_of_same_type_skips_running_handler() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let inner_bus = bus.clone();
        let sink = seen.clone();
        bus.on::<PreferenceChanged, _>(move |event| {
            sink.lock().push(event.key.clone());
            inner_bus.publish(PreferenceChanged {
                key: format!("{}.again", event.key),
            });
        });
        let other = seen.clone();
        bus.on::<PreferenceChanged, _>(move |event| other.lock().push(format!("second:{}", event.key)));

        bus.publish(PreferenceChanged { key: "theme".into() });

        assert_eq!(
            seen.lock().as_slice(),
            &[
                "theme".to_string(),
                "second:theme.again".to_string(),
                "second:theme".to_string(),
            ]
        );
    }
}
