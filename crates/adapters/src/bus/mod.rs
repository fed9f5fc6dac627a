pub mod memory_event_bus;
pub mod rule_events;

pub use memory_event_bus::InMemoryEventBus;
pub use rule_events::LogRuleEventSink;
