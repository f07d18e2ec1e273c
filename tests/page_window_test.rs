use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use pagepool::pdf::{IndexSet, Notification, PageRange, PageWindowService};
use pagepool::test_utils::{FakeDocument, RecordingSink, RenderLog};
use pagepool::WindowConfig;
use serial_test::serial;

const SETTLE: Duration = Duration::from_secs(10);

fn config(debounce_ms: u64) -> WindowConfig {
    WindowConfig {
        debounce_ms,
        ..WindowConfig::default()
    }
}

fn open(document: FakeDocument, debounce_ms: u64) -> (PageWindowService, RenderLog) {
    let log = document.render_log();
    let service = PageWindowService::open(document.opener(), config(debounce_ms)).expect("open");
    assert!(service.wait_until_settled(SETTLE));
    (service, log)
}

fn take_log(log: &RenderLog) -> Vec<usize> {
    std::mem::take(&mut *log.lock().unwrap())
}

fn scroll_to(service: &mut PageWindowService, position: usize) {
    service.on_viewport_changed(position);
    assert!(service.wait_until_settled(SETTLE));
}

fn assert_window_invariant(service: &PageWindowService) {
    let window = service.current_window();
    let loaded = service.loaded_pages();
    assert_eq!(loaded, IndexSet::from(window), "window {window}");
}

#[test]
#[serial]
fn scroll_burst_triggers_one_recompute_for_last_position() {
    let (mut service, log) = open(FakeDocument::new(200), 150);
    assert_eq!(take_log(&log), (0..=10).collect::<Vec<_>>());

    for position in 30..=90 {
        service.on_viewport_changed(position);
    }
    assert!(service.wait_until_settled(SETTLE));

    assert_eq!(service.current_window(), PageRange::new(86, 94));
    assert_eq!(take_log(&log), (86..=94).collect::<Vec<_>>());
    assert_window_invariant(&service);
}

#[test]
#[serial]
fn disjoint_jump_evicts_old_window_and_loads_new() {
    let (mut service, log) = open(FakeDocument::new(100), 5);
    take_log(&log);
    service.poll_notifications();

    scroll_to(&mut service, 90);

    assert_eq!(service.current_window(), PageRange::new(86, 94));
    assert_eq!(take_log(&log), (86..=94).collect::<Vec<_>>());
    assert_eq!(
        service.poll_notifications(),
        vec![
            Notification::RangeChanged { start: 0, count: 11 },
            Notification::RangeChanged { start: 86, count: 9 },
        ]
    );
    assert_window_invariant(&service);
}

#[test]
#[serial]
fn settled_position_repeated_does_no_work() {
    let (mut service, log) = open(FakeDocument::new(100), 5);
    scroll_to(&mut service, 50);
    take_log(&log);
    service.poll_notifications();

    assert!(!service.on_viewport_changed(50));
    assert!(service.wait_until_settled(SETTLE));

    assert!(take_log(&log).is_empty());
    assert!(service.poll_notifications().is_empty());
    assert_eq!(service.current_window(), PageRange::new(46, 54));
}

#[test]
#[serial]
fn returning_to_acted_position_within_quiet_period_is_skipped() {
    let (mut service, log) = open(FakeDocument::new(100), 150);
    scroll_to(&mut service, 50);
    take_log(&log);

    service.on_viewport_changed(51);
    service.on_viewport_changed(50);
    assert!(service.wait_until_settled(SETTLE));

    assert!(take_log(&log).is_empty());
    assert_eq!(service.current_window(), PageRange::new(46, 54));
    assert_window_invariant(&service);
}

#[test]
#[serial]
fn window_invariant_holds_after_each_settled_scroll() {
    let (mut service, _log) = open(FakeDocument::new(120), 5);
    for position in [3, 7, 8, 60, 58, 119, 0, 116, 40, 44] {
        scroll_to(&mut service, position);
        assert_window_invariant(&service);
        assert!(service.loaded_pages().len() <= 9);
    }
}

#[test]
#[serial]
fn failed_page_keeps_placeholder_and_batch_completes() {
    let document = FakeDocument::new(5).failing_on([3]);
    let (mut service, _log) = open(document, 5);

    for page in [0, 1, 2, 4] {
        let display = service.display(page).expect("in range");
        assert!(!display.loading, "page {page}");
    }
    let failed = service.display(3).expect("in range");
    assert!(failed.loading);
    assert!(std::sync::Arc::ptr_eq(&failed.bitmap, service.placeholder()));

    let mut sink = RecordingSink::default();
    service.dispatch_notifications(&mut sink);
    assert_eq!(
        sink.received,
        vec![
            Notification::AllChanged,
            Notification::RangeChanged { start: 0, count: 5 },
        ]
    );
}

#[test]
#[serial]
fn failed_page_is_retried_when_it_reenters_the_window() {
    let document = FakeDocument::new(100).failing_on([3]);
    let (mut service, log) = open(document, 5);
    assert!(take_log(&log).contains(&3));

    scroll_to(&mut service, 50);
    scroll_to(&mut service, 0);

    let renders = take_log(&log);
    assert_eq!(renders.iter().filter(|&&p| p == 3).count(), 1);
    assert!(!service.slot(3).expect("in range").is_loaded());
    assert_eq!(service.current_window(), PageRange::new(0, 4));
}

#[test]
#[serial]
fn in_flight_batch_finishes_before_next_window() {
    let document = FakeDocument::new(200).with_render_delay(Duration::from_millis(20));
    let (mut service, log) = open(document, 5);
    take_log(&log);
    service.poll_notifications();

    service.on_viewport_changed(60);
    let started = Instant::now();
    while !log.lock().unwrap().contains(&56) {
        assert!(started.elapsed() < SETTLE, "batch for anchor 60 never started");
        std::thread::sleep(Duration::from_millis(1));
    }
    service.on_viewport_changed(150);
    let rendered_before_jump = log.lock().unwrap().len();
    assert!(service.wait_until_settled(SETTLE));

    assert!(rendered_before_jump < 9, "batch had already finished");
    let expected: Vec<usize> = (56..=64).chain(146..=154).collect();
    assert_eq!(take_log(&log), expected);
    assert_eq!(
        service.poll_notifications(),
        vec![
            Notification::RangeChanged { start: 0, count: 11 },
            Notification::RangeChanged { start: 56, count: 9 },
            Notification::RangeChanged { start: 56, count: 9 },
            Notification::RangeChanged { start: 146, count: 9 },
        ]
    );
    assert_eq!(service.current_window(), PageRange::new(146, 154));
    assert_window_invariant(&service);
}

#[test]
#[serial]
fn replacing_document_closes_the_old_one() {
    let first = FakeDocument::new(30);
    let first_closed = first.closed_flag();
    let (mut service, _log) = open(first, 5);
    scroll_to(&mut service, 20);

    let second = FakeDocument::new(4).with_page_size(10, 20);
    service
        .replace_document(second.opener())
        .expect("replacement opens");
    assert!(service.wait_until_settled(SETTLE));

    assert!(first_closed.load(Ordering::SeqCst));
    assert_eq!(service.page_count(), 4);
    assert_eq!(service.placeholder().dimensions(), (10, 20));
    assert_eq!(service.current_window(), PageRange::new(0, 3));
    assert_eq!(service.poll_notifications()[0], Notification::AllChanged);
}

#[test]
#[serial]
fn failed_replacement_keeps_current_document() {
    let (mut service, _log) = open(FakeDocument::new(30), 5);

    assert!(
        service
            .replace_document(FakeDocument::failing_opener())
            .is_err()
    );

    assert_eq!(service.page_count(), 30);
    scroll_to(&mut service, 25);
    assert_eq!(service.current_window(), PageRange::new(21, 29));
}
