use std::cell::RefCell;
use std::rc::Rc;

use ai_tools::{TraceEvent, TraceSink, Tracer};

#[derive(Clone, Default)]
struct RcSink(Rc<RefCell<Vec<TraceEvent>>>);

impl TraceSink for RcSink {
    fn emit(&mut self, event: TraceEvent) {
        self.0.borrow_mut().push(event);
    }
}

#[test]
fn disabled_tracer_drops_events() {
    let mut tracer = Tracer::new();
    assert!(!tracer.is_enabled());
    tracer.emit(TraceEvent::new(1, "bt.enter"));
    assert!(tracer.log().is_none());
}

#[test]
fn emit_writes_to_log_when_enabled() {
    let mut tracer = Tracer::new();
    tracer.enable_log();

    tracer.emit(TraceEvent::new(1, "bt.enter").with_a(10).with_b(20));

    let log = tracer.log().unwrap();
    assert_eq!(log.events.len(), 1);
    assert_eq!(log.events[0].tick, 1);
    assert_eq!(log.events[0].tag, "bt.enter");
    assert_eq!(log.events[0].a, 10);
    assert_eq!(log.events[0].b, 20);
    assert_eq!(log.count("bt.enter"), 1);
}

#[test]
fn emit_writes_to_both_log_and_sink_when_both_present() {
    let mut tracer = Tracer::new();
    tracer.enable_log();
    let handle = RcSink::default();
    let shared = handle.0.clone();
    tracer.set_sink(Box::new(handle));

    tracer.emit(TraceEvent::new(3, "both"));

    assert_eq!(tracer.log().unwrap().tags().collect::<Vec<_>>(), vec!["both"]);
    let events = shared.borrow();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].tag, "both");
}

#[test]
fn take_log_leaves_an_empty_log_behind() {
    let mut tracer = Tracer::new();
    tracer.enable_log();
    tracer.emit(TraceEvent::new(1, "a"));

    let taken = tracer.take_log().unwrap();
    assert_eq!(taken.events.len(), 1);
    assert!(tracer.log().unwrap().events.is_empty());
}

#[test]
fn taking_the_log_of_a_disabled_tracer_keeps_it_disabled() {
    let mut tracer = Tracer::new();
    assert!(tracer.take_log().is_none());
    assert!(!tracer.is_enabled());

    tracer.emit(TraceEvent::new(1, "bt.enter"));
    assert!(tracer.log().is_none());
}

#[test]
fn taking_the_log_leaves_an_empty_enabled_log() {
    let mut tracer = Tracer::new();
    tracer.enable_log();
    tracer.emit(TraceEvent::new(1, "bt.enter"));

    assert_eq!(tracer.take_log().unwrap().events.len(), 1);
    assert!(tracer.log().unwrap().events.is_empty());

    tracer.emit(TraceEvent::new(2, "bt.return"));
    assert_eq!(tracer.log().unwrap().count("bt.return"), 1);
}
