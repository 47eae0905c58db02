#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use formpilot_injector::EmergencyStop;
use formpilot_protocol::Action;
use formpilot_protocol::Point;
use formpilot_protocol::ViewportBounds;
use pretty_assertions::assert_eq;

use super::ActionEngine;
use super::ActionError;
use super::value_matches;
use crate::query::ProbeClient;
use crate::state::StateStore;
use crate::test_support::FakeProbe;
use crate::test_support::RecordingSink;
use crate::test_support::probe_timeout;
use crate::test_support::visible_snapshot;
use formpilot_injector::CommandSink;

fn engine_with(probe: Arc<FakeProbe>) -> (Arc<StateStore>, Arc<RecordingSink>, Arc<ActionEngine>) {
    let state = Arc::new(StateStore::new());
    state.set_viewport(ViewportBounds::new(0.0, 40.0, 1280.0, 840.0));
    let sink = Arc::new(RecordingSink::new());
    let engine = Arc::new(ActionEngine::new(
        Arc::clone(&state),
        probe as Arc<dyn ProbeClient>,
        Arc::clone(&sink) as Arc<dyn CommandSink>,
        EmergencyStop::new(),
    ));
    (state, sink, engine)
}

/// Reconstruct what the browser would hold after the TYPE/Backspace stream.
fn typed_text(lines: &[String]) -> String {
    let mut buffer = String::new();
    for line in lines {
        if let Some(rest) = line.strip_prefix("TYPE,") {
            buffer.push(rest.chars().next().unwrap());
        } else if line == "KEY,Backspace" {
            buffer.pop();
        }
    }
    buffer
}

#[tokio::test(start_paused = true)]
async fn short_move_click_flips_checked() {
    let probe = Arc::new(FakeProbe::new(|index, _, _| {
        let mut s = visible_snapshot(510.0, 505.0, 500.0, 500.0);
        // Prior query and the attempt query see it unchecked; the click
        // lands before the verify query.
        s.checked = Some(index >= 2);
        Ok(s)
    }));
    let (state, sink, engine) = engine_with(Arc::clone(&probe));
    state.set_cursor(Point::new(500.0, 500.0));

    engine
        .run(vec![Action::ClickSelector {
            selector: "#chk-a".to_string(),
        }])
        .await;

    assert!(!state.automating());
    assert_eq!(sink.count_of("CLICK"), 1);
    // A hop this short collapses to at most one corrective delta.
    let moves = sink.moves();
    assert!(moves.len() <= 1, "unexpected path {moves:?}");
    let (sum_x, sum_y) = moves
        .iter()
        .fold((0, 0), |(x, y), (dx, dy)| (x + dx, y + dy));
    assert_eq!((sum_x, sum_y), (10, 5));
}

#[tokio::test(start_paused = true)]
async fn long_move_emits_path_then_one_click() {
    let probe = Arc::new(FakeProbe::new(|_, _, _| {
        Ok(visible_snapshot(700.0, 400.0, 100.0, 100.0))
    }));
    let (state, sink, engine) = engine_with(probe);
    state.set_cursor(Point::new(100.0, 100.0));

    engine
        .run_action(&Action::ClickSelector {
            selector: "#submit".to_string(),
        })
        .await
        .unwrap();

    let moves = sink.moves();
    assert!(moves.len() > 1);
    let (sum_x, sum_y) = moves
        .iter()
        .fold((0, 0), |(x, y), (dx, dy)| (x + dx, y + dy));
    assert_eq!((sum_x, sum_y), (600, 300));
    assert_eq!(sink.count_of("CLICK"), 1);
}

#[tokio::test(start_paused = true)]
async fn off_view_field_scrolls_then_fills() {
    let probe = Arc::new(FakeProbe::new(|index, _, _| {
        let mut s = visible_snapshot(640.0, 600.0, 500.0, 500.0);
        match index {
            0..=2 => {
                s.in_viewport = false;
                s.scroll_delta_needed = if index < 2 { 420.0 } else { 300.0 };
            }
            3 | 4 => {}
            5 => s.focused = true,
            _ => {
                s.focused = true;
                s.value = "hello world".to_string();
            }
        }
        Ok(s)
    }));
    let (_state, sink, engine) = engine_with(probe);

    engine
        .run_action(&Action::FillField {
            selector: "textarea[name=\"q\"]".to_string(),
            text: "hello world".to_string(),
        })
        .await
        .unwrap();

    let lines = sink.lines();
    let scrolls: Vec<i32> = lines
        .iter()
        .filter_map(|line| line.strip_prefix("SCROLL,"))
        .map(|units| units.parse().unwrap())
        .collect();
    assert_eq!(scrolls.len(), 2);
    for units in scrolls {
        assert!((4..=8).contains(&units), "scroll step {units}");
    }
    assert_eq!(sink.count_of("CLICK"), 1);
    assert_eq!(sink.count_of("COMBO,ctrl+a"), 1);
    assert_eq!(typed_text(&lines), "hello world");
}

#[tokio::test(start_paused = true)]
async fn near_misses_skip_scrolling_entirely() {
    let probe = Arc::new(FakeProbe::new(|index, _, _| {
        let mut s = visible_snapshot(640.0, 810.0, 600.0, 700.0);
        match index {
            0 | 1 => {
                s.in_viewport = false;
                s.scroll_delta_needed = 30.0;
            }
            2 => s.focused = true,
            _ => {
                s.focused = true;
                s.value = "ok".to_string();
            }
        }
        Ok(s)
    }));
    let (_state, sink, engine) = engine_with(probe);

    engine
        .run_action(&Action::FillField {
            selector: "#tail".to_string(),
            text: "ok".to_string(),
        })
        .await
        .unwrap();

    // Thirty pixels shy is close enough: no wheel traffic at all.
    assert_eq!(sink.count_of("SCROLL"), 0);
    assert_eq!(sink.count_of("CLICK"), 1);
}

#[tokio::test(start_paused = true)]
async fn unfocused_field_gets_one_restrike() {
    let probe = Arc::new(FakeProbe::new(|index, _, _| {
        let mut s = visible_snapshot(400.0, 300.0, 380.0, 290.0);
        match index {
            0 => {}
            1 => s.focused = false,
            _ => {
                s.focused = true;
                s.value = "ok".to_string();
            }
        }
        Ok(s)
    }));
    let (_state, sink, engine) = engine_with(probe);

    engine
        .run_action(&Action::FillField {
            selector: "#name".to_string(),
            text: "ok".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(sink.count_of("CLICK"), 2);
}

#[tokio::test(start_paused = true)]
async fn already_checked_option_is_skipped() {
    let probe = Arc::new(FakeProbe::new(|_, _, _| {
        let mut s = visible_snapshot(300.0, 300.0, 100.0, 100.0);
        s.checked = Some(true);
        Ok(s)
    }));
    let (_state, sink, engine) = engine_with(Arc::clone(&probe));

    engine
        .run_action(&Action::ClickOption {
            container: "#q-1".to_string(),
            label: "Yes".to_string(),
        })
        .await
        .unwrap();

    // The pre-check alone decides; no motion, no click.
    assert_eq!(probe.call_count(), 1);
    assert_eq!(
        probe.calls(),
        vec![("#q-1".to_string(), Some("Yes".to_string()))]
    );
    assert!(sink.lines().is_empty());
}

#[tokio::test(start_paused = true)]
async fn wrong_hover_label_holds_the_click() {
    let probe = Arc::new(FakeProbe::new(|_, _, _| {
        let mut s = visible_snapshot(300.0, 300.0, 280.0, 290.0);
        s.checked = Some(false);
        s.hovered_label_text = Some("No".to_string());
        Ok(s)
    }));
    let (_state, sink, engine) = engine_with(probe);

    let err = engine.click_option("#q-2", "Yes").await.unwrap_err();
    assert!(matches!(
        err,
        ActionError::Unverified {
            action: "CLICK_OPTION",
            ..
        }
    ));
    assert_eq!(sink.count_of("CLICK"), 0);
}

#[tokio::test(start_paused = true)]
async fn unverified_option_halts_the_sequence() {
    let probe = Arc::new(FakeProbe::new(|_, _, _| {
        let mut s = visible_snapshot(600.0, 300.0, 500.0, 500.0);
        s.checked = Some(false);
        s.hovered_label_text = Some("Yes".to_string());
        Ok(s)
    }));
    let (state, sink, engine) = engine_with(probe);

    engine
        .run(vec![
            Action::ClickOption {
                container: "#q-3".to_string(),
                label: "Yes".to_string(),
            },
            Action::Raw("LED,on".to_string()),
        ])
        .await;

    // Twenty strikes, none verified, and the follow-up action never ran.
    assert_eq!(sink.count_of("CLICK"), 20);
    assert_eq!(sink.count_of("LED,on"), 0);
    assert!(!state.automating());
}

#[tokio::test(start_paused = true)]
async fn probe_timeouts_consume_attempts() {
    let probe = Arc::new(FakeProbe::new(|_, _, _| Err(probe_timeout())));
    let (_state, _sink, engine) = engine_with(Arc::clone(&probe));

    let err = engine.fill_field("#q", "x").await.unwrap_err();
    assert!(matches!(
        err,
        ActionError::Unverified {
            action: "FILL_FIELD",
            attempts: 4,
            ..
        }
    ));
    assert_eq!(probe.call_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn automating_is_true_exactly_while_running() {
    let probe = Arc::new(FakeProbe::new(|_, _, _| Err(probe_timeout())));
    let (state, _sink, engine) = engine_with(probe);
    assert!(!state.automating());

    let handle = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.run(vec![Action::Delay { ms: 1000 }]).await })
    };
    tokio::task::yield_now().await;
    assert!(state.automating());
    handle.await.unwrap();
    assert!(!state.automating());
}

#[tokio::test(start_paused = true)]
async fn raw_lines_forward_verbatim() {
    let probe = Arc::new(FakeProbe::new(|_, _, _| Err(probe_timeout())));
    let (_state, sink, engine) = engine_with(probe);

    engine
        .run_action(&Action::Raw("SCROLL,3".to_string()))
        .await
        .unwrap();
    assert_eq!(sink.lines(), vec!["SCROLL,3"]);
}

#[test]
fn value_matching_is_prefix_based_and_case_folded() {
    assert!(value_matches("Hello World", "hello world"));
    assert!(value_matches("  hello world extra  ", "hello world"));
    // Long targets only need their first 20 characters to land.
    let long = "this is a long answer that keeps going";
    assert!(value_matches("this is a long answe", long));
    assert!(!value_matches("different text", "hello"));
    assert!(value_matches("", ""));
}
