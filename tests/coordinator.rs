//! Coordinator behavior under a paused tokio clock.
//!
//! Every test drives the real actor with a scripted client, so the timings
//! asserted here are the ones an editor would observe.

mod common;

use common::{settings, ScriptedClient, C1, C2, C3};
use resonnet::client::AnalyzeError;
use resonnet::coordinator::Coordinator;
use resonnet_core::models::{FindingKind, Phase, RawIssue};
use resonnet_core::scheduler::ANALYSIS_FAILED;
use std::time::Duration;
use tokio::time::sleep;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[tokio::test(start_paused = true)]
async fn short_content_never_calls_the_client() {
    let client = ScriptedClient::flags_vague(ms(100));
    let handle = Coordinator::spawn(client.clone(), settings());

    let mut content = String::new();
    for _ in 0..10 {
        content.push('x');
        handle.analyze_prompt(content.clone());
        sleep(ms(30)).await;
    }
    handle.analyze_prompt("   padded     ");

    let view = handle.wait_idle().await.unwrap();
    assert!(view.findings.is_empty());
    assert!(!view.is_analyzing);
    assert_eq!(view.phase, Phase::Idle);
    assert!(client.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn growing_past_threshold_triggers_one_call_after_the_delay() {
    let client = ScriptedClient::flags_vague(ms(100));
    let handle = Coordinator::spawn(client.clone(), settings());

    for n in 1..=20 {
        handle.analyze_prompt("x".repeat(n));
    }

    sleep(ms(700)).await;
    assert!(client.calls().is_empty(), "fired before the debounce delay");
    assert_eq!(handle.snapshot().phase, Phase::Debouncing);

    sleep(ms(200)).await;
    assert_eq!(client.calls(), vec!["x".repeat(20)]);

    handle.wait_idle().await.unwrap();
    assert_eq!(client.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn rapid_edits_collapse_into_one_call() {
    let client = ScriptedClient::flags_vague(ms(100));
    let handle = Coordinator::spawn(client.clone(), settings());

    for i in 0..5 {
        handle.analyze_prompt(format!("{C1} draft {i}"));
        sleep(ms(100)).await;
    }

    let view = handle.wait_idle().await.unwrap();
    assert_eq!(client.calls(), vec![format!("{C1} draft 4")]);
    assert_eq!(view.findings.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn finding_is_located_in_the_analyzed_content() {
    let client = ScriptedClient::flags_vague(ms(100));
    let handle = Coordinator::spawn(client.clone(), settings());

    handle.analyze_prompt(C1);
    let view = handle.wait_idle().await.unwrap();

    assert_eq!(view.findings.len(), 1);
    let finding = &view.findings[0];
    assert_eq!((finding.start, finding.end), (8, 13));
    assert_eq!(finding.kind, FindingKind::Ambiguity);
    assert_eq!(finding.text, "vague");
    assert!(view.error.is_none());
}

#[tokio::test(start_paused = true)]
async fn returning_to_analyzed_content_hits_the_cache() {
    let client = ScriptedClient::flags_vague(ms(100));
    let handle = Coordinator::spawn(client.clone(), settings());

    handle.analyze_prompt(C1);
    let first = handle.wait_idle().await.unwrap();
    assert_eq!(first.findings.len(), 1);

    handle.analyze_prompt("please describe the rollout plan");
    let second = handle.wait_idle().await.unwrap();
    assert!(second.findings.is_empty());

    handle.analyze_prompt(C1);
    sleep(ms(1)).await;
    let cached = handle.snapshot();
    assert_eq!(cached.findings, first.findings);
    assert!(!cached.is_analyzing);

    handle.wait_idle().await.unwrap();
    assert_eq!(
        client.calls(),
        vec![C1.to_string(), "please describe the rollout plan".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn edit_while_in_flight_is_queued_then_sent() {
    let client = ScriptedClient::flags_vague(ms(2000));
    let handle = Coordinator::spawn(client.clone(), settings());

    handle.analyze_prompt(C1);
    sleep(ms(900)).await;
    assert_eq!(client.calls(), vec![C1.to_string()]);
    let view = handle.snapshot();
    assert!(view.is_analyzing);
    assert_eq!(view.phase, Phase::InFlight);

    handle.analyze_prompt(C2);
    sleep(ms(900)).await;
    assert_eq!(handle.snapshot().phase, Phase::InFlightQueued);
    assert_eq!(client.calls().len(), 1, "second call started early");

    let view = handle.wait_idle().await.unwrap();
    assert_eq!(client.calls(), vec![C1.to_string(), C2.to_string()]);
    assert_eq!(client.max_concurrent(), 1);
    assert!(!view.is_analyzing);
    assert_eq!(view.findings.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn newest_queued_content_replaces_older() {
    let client = ScriptedClient::flags_vague(ms(3000));
    let handle = Coordinator::spawn(client.clone(), settings());

    handle.analyze_prompt(C1);
    sleep(ms(900)).await;
    handle.analyze_prompt(C2);
    sleep(ms(900)).await;
    handle.analyze_prompt(C3);
    sleep(ms(900)).await;
    assert_eq!(handle.snapshot().phase, Phase::InFlightQueued);

    handle.wait_idle().await.unwrap();
    assert_eq!(client.calls(), vec![C1.to_string(), C3.to_string()]);
}

#[tokio::test(start_paused = true)]
async fn cache_hit_during_flight_leaves_the_request_alone() {
    let client = ScriptedClient::flags_vague(ms(2000));
    let handle = Coordinator::spawn(client.clone(), settings());

    handle.analyze_prompt(C1);
    let first = handle.wait_idle().await.unwrap();

    handle.analyze_prompt("please describe the rollout plan");
    sleep(ms(900)).await;
    assert_eq!(handle.snapshot().phase, Phase::InFlight);

    handle.analyze_prompt(C1);
    sleep(ms(1)).await;
    let during = handle.snapshot();
    assert_eq!(during.findings, first.findings);
    assert!(during.is_analyzing);
    assert_eq!(during.phase, Phase::InFlight);

    let settled = handle.wait_idle().await.unwrap();
    assert!(settled.findings.is_empty());
    assert_eq!(client.calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn failure_sets_error_and_clears_findings() {
    let client = ScriptedClient::new(ms(100), |content| {
        if content.contains("timeout") {
            Err(AnalyzeError::Network(
                "Request timed out. Please try again.".to_string(),
            ))
        } else {
            Ok(vec![RawIssue::new(
                "vague",
                "AMBIGUOUS_INSTRUCTION",
                "Be specific",
            )])
        }
    });
    let handle = Coordinator::spawn(client.clone(), settings());

    handle.analyze_prompt(C1);
    let ok = handle.wait_idle().await.unwrap();
    assert_eq!(ok.findings.len(), 1);

    handle.analyze_prompt("this one will timeout upstream");
    let failed = handle.wait_idle().await.unwrap();
    assert_eq!(failed.error.as_deref(), Some(ANALYSIS_FAILED));
    assert!(failed.findings.is_empty());
    assert!(!failed.is_analyzing);

    handle.analyze_prompt(C2);
    let recovered = handle.wait_idle().await.unwrap();
    assert!(recovered.error.is_none());
    assert_eq!(recovered.findings.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_content_is_retried_on_the_next_edit() {
    let client = ScriptedClient::new(ms(100), |_| {
        Err(AnalyzeError::Api {
            status: 429,
            message: "Rate limit exceeded. Please try again later.".to_string(),
        })
    });
    let handle = Coordinator::spawn(client.clone(), settings());

    handle.analyze_prompt(C1);
    handle.wait_idle().await.unwrap();
    handle.analyze_prompt(C1);
    handle.wait_idle().await.unwrap();

    assert_eq!(client.calls(), vec![C1.to_string(), C1.to_string()]);
}

#[tokio::test(start_paused = true)]
async fn shrinking_below_threshold_cancels_pending_work() {
    let client = ScriptedClient::flags_vague(ms(100));
    let handle = Coordinator::spawn(client.clone(), settings());

    handle.analyze_prompt(C1);
    sleep(ms(400)).await;
    handle.analyze_prompt("too short");
    sleep(ms(2000)).await;

    let view = handle.wait_idle().await.unwrap();
    assert!(client.calls().is_empty());
    assert!(view.findings.is_empty());
    assert_eq!(view.phase, Phase::Idle);
}

#[tokio::test(start_paused = true)]
async fn at_most_one_request_under_interleaved_edits() {
    let client = ScriptedClient::flags_vague(ms(700));
    let handle = Coordinator::spawn(client.clone(), settings());

    let pauses = [120, 900, 50, 1300, 300, 850, 40, 2000, 810, 60];
    for (i, pause) in pauses.iter().cycle().take(40).enumerate() {
        handle.analyze_prompt(format!("{C1} revision {i}"));
        sleep(ms(*pause)).await;
    }

    handle.wait_idle().await.unwrap();
    assert!(!client.calls().is_empty());
    assert_eq!(client.max_concurrent(), 1);
}

#[tokio::test(start_paused = true)]
async fn debounce_delay_tracks_typing_speed_within_bounds() {
    let client = ScriptedClient::flags_vague(ms(0));
    let handle = Coordinator::spawn(client.clone(), settings());
    assert_eq!(handle.snapshot().debounce_ms, 800);

    // Fast typing across two retune ticks.
    for i in 0..240 {
        handle.analyze_prompt(format!("fast typing sample {i}"));
        sleep(ms(50)).await;
    }
    assert_eq!(handle.snapshot().debounce_ms, 900);

    // Stale fast samples keep pushing the delay up to its ceiling.
    sleep(Duration::from_secs(60)).await;
    assert_eq!(handle.snapshot().debounce_ms, 1200);

    // Slow typing brings it back down.
    for i in 0..20 {
        handle.analyze_prompt(format!("slow typing sample {i}"));
        sleep(ms(1500)).await;
    }
    let slowed = handle.snapshot().debounce_ms;
    assert!((500..1200).contains(&slowed), "got {slowed}");

    sleep(Duration::from_secs(120)).await;
    assert_eq!(handle.snapshot().debounce_ms, 500);
}

#[tokio::test(start_paused = true)]
async fn analyzing_flag_is_set_only_while_in_flight() {
    let client = ScriptedClient::flags_vague(ms(1000));
    let handle = Coordinator::spawn(client.clone(), settings());
    let mut views = handle.subscribe();

    handle.analyze_prompt(C1);
    let mut saw_analyzing = false;
    loop {
        views.changed().await.unwrap();
        let view = views.borrow_and_update().clone();
        if view.is_analyzing {
            saw_analyzing = true;
            assert_eq!(view.phase, Phase::InFlight);
        } else if saw_analyzing {
            assert_eq!(view.findings.len(), 1);
            assert_eq!(view.phase, Phase::Idle);
            break;
        }
    }
    assert!(saw_analyzing);
}

#[tokio::test(start_paused = true)]
async fn panicking_call_frees_the_slot() {
    let client = ScriptedClient::new(ms(1000), |content| {
        if content == C1 || content == C3 {
            panic!("client blew up");
        }
        Ok(Vec::new())
    });
    let handle = Coordinator::spawn(client.clone(), settings());

    handle.analyze_prompt(C1);
    sleep(ms(900)).await;
    handle.analyze_prompt(C2);

    let view = handle.wait_idle().await.unwrap();
    assert_eq!(client.calls(), vec![C1.to_string(), C2.to_string()]);
    assert!(!view.is_analyzing);
    assert!(view.error.is_none());
    assert_eq!(view.phase, Phase::Idle);

    handle.analyze_prompt(C3);
    let view = handle.wait_idle().await.unwrap();
    assert_eq!(view.error.as_deref(), Some(ANALYSIS_FAILED));
    assert!(!view.is_analyzing);
}

#[tokio::test(start_paused = true)]
async fn failure_that_drains_the_queue_publishes_no_error() {
    let client = ScriptedClient::new(ms(1000), |content| {
        if content == C1 {
            Err(AnalyzeError::Network(
                "Request timed out. Please try again.".to_string(),
            ))
        } else {
            Ok(vec![RawIssue::new(
                "vague",
                "AMBIGUOUS_INSTRUCTION",
                "Be specific",
            )])
        }
    });
    let handle = Coordinator::spawn(client.clone(), settings());
    let mut views = handle.subscribe();

    handle.analyze_prompt(C1);
    sleep(ms(900)).await;
    handle.analyze_prompt(C2);

    loop {
        views.changed().await.unwrap();
        let view = views.borrow_and_update().clone();
        assert!(view.error.is_none(), "error surfaced: {view:?}");
        if view.phase == Phase::Idle && !view.findings.is_empty() {
            break;
        }
    }
    assert_eq!(client.calls(), vec![C1.to_string(), C2.to_string()]);
}
