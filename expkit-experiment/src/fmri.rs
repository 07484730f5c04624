//! Timeline nodes shared by scanner sessions: finger placement checks and
//! the waits around scanner setup and the trigger pulse.

use expkit_core::KeyChoices;

use crate::config::KeyboardResponseParams;
use crate::timeline::{PluginParams, TimelineNode, TrialSpec};

/// Length of the post-trigger block: 7 TRs of 1.49 s.
pub const TRIGGER_END_BLOCK_MS: u64 = 10_430;
pub const FINGER_CHECK_GAP_MS: u64 = 500;

const STAY_STILL: &str = "<h1>Stay as still as possible.</h1><h1>Do not swallow.</h1>";

fn keyboard(stimulus: String, choices: KeyChoices) -> KeyboardResponseParams {
    KeyboardResponseParams::new(stimulus, choices)
}

fn trial(params: KeyboardResponseParams, trial_id: &str) -> TrialSpec {
    TrialSpec::new(PluginParams::HtmlKeyboardResponse(params)).with_data("trial_id", trial_id)
}

pub fn check_index() -> TimelineNode {
    let params = keyboard(
        "<div><h1>Please press your index finger.</h1></div>".into(),
        KeyChoices::keys(["y"]),
    );
    TimelineNode::trial(trial(params, "check_index").with_gap(FINGER_CHECK_GAP_MS))
}

pub fn check_middle() -> TimelineNode {
    let params = keyboard(
        "<div><h1>Please press your middle finger.</h1></div>".into(),
        KeyChoices::keys(["g"]),
    );
    TimelineNode::trial(trial(params, "check_middle").with_gap(FINGER_CHECK_GAP_MS))
}

/// Index then middle finger.
pub fn check_fingers_node() -> TimelineNode {
    TimelineNode::group([check_index(), check_middle()])
}

/// Operator presses Enter once the scanner is set up.
pub fn fmri_wait_block_initial() -> TimelineNode {
    let params = keyboard(
        format!("<div><h1>Scanner setup.</h1>{STAY_STILL}</div>"),
        KeyChoices::keys(["Enter"]),
    );
    TimelineNode::trial(trial(params, "fmri_wait_block_initial"))
}

/// Ends on the scanner's trigger key.
pub fn fmri_wait_block_trigger_start() -> TimelineNode {
    let params = keyboard(
        format!("<div><h1>Task about to start!</h1>{STAY_STILL}</div>"),
        KeyChoices::keys(["t"]),
    );
    TimelineNode::trial(trial(params, "fmri_wait_block_trigger_start"))
}

/// Fixed wait after the trigger with no keys accepted.
pub fn fmri_wait_block_trigger_end() -> TimelineNode {
    let mut params = keyboard(
        format!("<div><h1>Task about to start!</h1>{STAY_STILL}</div>"),
        KeyChoices::NoKeys,
    );
    params.trial_duration = Some(TRIGGER_END_BLOCK_MS);
    params.response_ends_trial = false;
    TimelineNode::trial(
        trial(params, "fmri_wait_block_trigger_end")
            .with_data("block_duration", TRIGGER_END_BLOCK_MS),
    )
}

pub fn fmri_wait_block_trigger_node() -> TimelineNode {
    TimelineNode::group([fmri_wait_block_trigger_start(), fmri_wait_block_trigger_end()])
}

/// Setup wait, trigger wait, then the fixed post-trigger block.
pub fn fmri_wait_node() -> TimelineNode {
    TimelineNode::group([fmri_wait_block_initial(), fmri_wait_block_trigger_node()])
}

/// Looks up a built-in node by name.
pub fn builtin(name: &str) -> Option<TimelineNode> {
    match name {
        "check_fingers" | "check_fingers_node" => Some(check_fingers_node()),
        "fmri_wait" | "fmri_wait_node" => Some(fmri_wait_node()),
        _ => None,
    }
}
