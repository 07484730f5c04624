mod common;

use common::Harness;
use expkit_core::stimulus::{ATTENTION_CHECK_STIMULUS_ID, FEEDBACK_SUBMIT_ID};
use expkit_core::{KeyChoices, TrialData};
use expkit_experiment::{
    AttentionCheck, AttentionCheckConfig, AttentionCheckParams, FeedbackParams,
    HtmlKeyboardResponse, KeyboardResponseParams, Plugin, PostBatteryFeedback, TrialEvent,
};
use serde_json::json;

fn attention_check(trial_duration: Option<u64>) -> AttentionCheck {
    let params: AttentionCheckParams = serde_json::from_value(json!({
        "question": "Press the Q key",
        "key_answer": 81,
        "trial_duration": trial_duration,
    }))
    .unwrap();
    AttentionCheck::new(AttentionCheckConfig::try_from(params).unwrap())
}

fn feedback(trial_duration: Option<u64>) -> PostBatteryFeedback {
    PostBatteryFeedback::new(FeedbackParams {
        prompt: Some("<p>Any comments?</p>".into()),
        html: Some("<textarea id='feedback_response'></textarea>".into()),
        trial_duration,
        choices: KeyChoices::NoKeys,
        response_ends_trial: true,
    })
}

#[test]
fn attention_check_scores_the_expected_key() {
    let mut h = Harness::new();
    let mut trial = attention_check(Some(10_000));
    h.start(&mut trial);
    assert!(h.surface.contains_element(ATTENTION_CHECK_STIMULUS_ID));

    h.press_at(&mut trial, 820, "Q");

    assert!(trial.is_done());
    let data = serde_json::to_value(&h.sink[0]).unwrap();
    assert_eq!(
        data,
        json!({
            "attention_check_question": "Press the Q key",
            "correct_response": "q",
            "correct_trial": 1,
            "response": "q",
            "rt": 820.0,
        })
    );
}

#[test]
fn attention_check_wrong_key_scores_zero() {
    let mut h = Harness::new();
    let mut trial = attention_check(None);
    h.start(&mut trial);
    h.press_at(&mut trial, 500, "w");

    match &h.sink[..] {
        [TrialData::AttentionCheck(o)] => {
            assert_eq!(o.correct_trial, 0);
            assert_eq!(o.response.as_deref(), Some("w"));
        }
        other => panic!("unexpected data {other:?}"),
    }
}

#[test]
fn attention_check_timeout_scores_zero() {
    let mut h = Harness::new();
    let mut trial = attention_check(Some(3000));
    h.start(&mut trial);
    h.advance_to(&mut trial, 3000);

    match &h.sink[..] {
        [TrialData::AttentionCheck(o)] => {
            assert_eq!(o.correct_trial, 0);
            assert_eq!(o.response, None);
            assert_eq!(o.rt, None);
        }
        other => panic!("unexpected data {other:?}"),
    }
}

#[test]
fn feedback_reports_text_and_time_to_submit() {
    let mut h = Harness::new();
    let mut trial = feedback(None);
    h.start(&mut trial);
    assert!(h.surface.markup().contains(FEEDBACK_SUBMIT_ID));
    assert_eq!(h.keyboard.active_listeners(), 0);

    h.advance_to(&mut trial, 1200);
    h.send(&mut trial, TrialEvent::Input("too".into()));
    h.send(&mut trial, TrialEvent::Input("too long".into()));
    h.advance_to(&mut trial, 2345);
    h.send(&mut trial, TrialEvent::Submit);

    assert!(trial.is_done());
    match &h.sink[..] {
        [TrialData::Feedback(o)] => {
            assert_eq!(o.response, "too long");
            assert_eq!(o.rt, 2345);
        }
        other => panic!("unexpected data {other:?}"),
    }
}

#[test]
fn feedback_times_out_with_partial_text() {
    let mut h = Harness::new();
    let mut trial = feedback(Some(60_000));
    h.start(&mut trial);
    h.send(&mut trial, TrialEvent::Input("half a thou".into()));
    h.advance_to(&mut trial, 60_000);
    h.send(&mut trial, TrialEvent::Submit);

    match &h.sink[..] {
        [TrialData::Feedback(o)] => {
            assert_eq!(o.response, "half a thou");
            assert_eq!(o.rt, 60_000);
        }
        other => panic!("unexpected data {other:?}"),
    }
}

#[test]
fn keyboard_response_without_keys_waits_for_its_deadline() {
    let mut h = Harness::new();
    let mut params = KeyboardResponseParams::new("<p>wait</p>", KeyChoices::NoKeys);
    params.trial_duration = Some(2000);
    params.response_ends_trial = false;
    let mut trial = HtmlKeyboardResponse::new(params);
    h.start(&mut trial);

    assert_eq!(h.keyboard.active_listeners(), 0);
    assert!(!h.press_at(&mut trial, 100, "t"));
    h.advance_to(&mut trial, 1999);
    assert!(!trial.is_done());
    h.advance_to(&mut trial, 2000);

    match &h.sink[..] {
        [TrialData::KeyboardResponse(o)] => {
            assert_eq!(o.stimulus, "<p>wait</p>");
            assert_eq!(o.response, None);
        }
        other => panic!("unexpected data {other:?}"),
    }
}
