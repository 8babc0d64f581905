//! Integration tests for countdown emission order and cancellation.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use qrid_core::{
    CancellationToken, Countdown, CountdownEvent, CountdownOutcome, format_remaining,
    run_countdown,
};

fn labels(countdown: Countdown) -> Vec<String> {
    countdown
        .filter_map(|event| match event {
            CountdownEvent::Remaining(remaining) => Some(format_remaining(remaining)),
            CountdownEvent::Expired => None,
        })
        .collect()
}

#[test]
fn countdown_sequence_tests_thirty_seconds_emits_thirty_one_labels() {
    let countdown = Countdown::new(Duration::from_secs(30), Duration::from_secs(1))
        .expect("countdown should build");
    let labels = labels(countdown);

    assert_eq!(labels.len(), 31);
    assert_eq!(labels[0], "Time remaining: 00:30");
    assert_eq!(labels[15], "Time remaining: 00:15");
    assert_eq!(labels[30], "Time remaining: 00:00");
    for (index, label) in labels.iter().enumerate() {
        assert_eq!(*label, format!("Time remaining: 00:{:02}", 30 - index));
    }
}

#[test]
fn countdown_sequence_tests_expiry_is_emitted_exactly_once_and_last() {
    let countdown = Countdown::new(Duration::from_secs(3), Duration::from_secs(1))
        .expect("countdown should build");
    let events: Vec<CountdownEvent> = countdown.collect();

    let expiries = events
        .iter()
        .filter(|event| **event == CountdownEvent::Expired)
        .count();
    assert_eq!(expiries, 1);
    assert_eq!(events.last(), Some(&CountdownEvent::Expired));
    assert_eq!(
        events[events.len() - 2],
        CountdownEvent::Remaining(Duration::ZERO)
    );
}

#[test]
fn countdown_sequence_tests_partial_tick_saturates_to_zero() {
    let countdown = Countdown::new(Duration::from_millis(2_500), Duration::from_secs(1))
        .expect("countdown should build");
    let remaining: Vec<Duration> = countdown
        .filter_map(|event| match event {
            CountdownEvent::Remaining(remaining) => Some(remaining),
            CountdownEvent::Expired => None,
        })
        .collect();

    assert_eq!(
        remaining,
        vec![
            Duration::from_millis(2_500),
            Duration::from_millis(1_500),
            Duration::from_millis(500),
            Duration::ZERO,
        ]
    );
}

#[test]
fn countdown_sequence_tests_runner_delivers_all_events_when_not_cancelled() {
    let countdown = Countdown::new(Duration::from_millis(30), Duration::from_millis(10))
        .expect("countdown should build");
    let token = CancellationToken::new();
    let mut delivered = Vec::new();

    let outcome = run_countdown(countdown, &token, |event| delivered.push(event));

    assert_eq!(outcome, CountdownOutcome::Completed);
    assert_eq!(delivered.len(), 5);
    assert_eq!(delivered.last(), Some(&CountdownEvent::Expired));
}

#[test]
fn countdown_sequence_tests_runner_stops_after_cancel_without_expiry() {
    let countdown = Countdown::new(Duration::from_secs(30), Duration::from_millis(20))
        .expect("countdown should build");
    let token = CancellationToken::new();
    let delivered = Arc::new(Mutex::new(Vec::new()));

    let worker = {
        let token = token.clone();
        let delivered = Arc::clone(&delivered);
        thread::spawn(move || {
            run_countdown(countdown, &token, |event| {
                delivered.lock().expect("event lock").push(event);
            })
        })
    };

    thread::sleep(Duration::from_millis(70));
    token.cancel();
    let outcome = worker.join().expect("runner thread should join");
    let count_at_cancel = delivered.lock().expect("event lock").len();

    thread::sleep(Duration::from_millis(60));
    let delivered = delivered.lock().expect("event lock");
    assert_eq!(outcome, CountdownOutcome::Cancelled);
    assert_eq!(delivered.len(), count_at_cancel);
    assert!(!delivered.contains(&CountdownEvent::Expired));
    assert!(!delivered.is_empty());
}

#[test]
fn countdown_sequence_tests_pre_cancelled_token_delivers_nothing() {
    let countdown = Countdown::new(Duration::from_secs(5), Duration::from_secs(1))
        .expect("countdown should build");
    let token = CancellationToken::new();
    token.cancel();
    let mut delivered = Vec::new();

    let outcome = run_countdown(countdown, &token, |event| delivered.push(event));

    assert_eq!(outcome, CountdownOutcome::Cancelled);
    assert!(delivered.is_empty());
}
