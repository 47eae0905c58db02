use std::time::Duration;

use formpilot_protocol::InjectorCommand;
use rand::Rng;

/// Approximate per-position error rate. No smoothing, no per-word quotas;
/// runs of clean text and clustered typos are both expected.
const ERROR_RATE: f64 = 0.08;

/// One step of a typing program: the command to write and the pause to take
/// after writing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypingStep {
    pub command: InjectorCommand,
    pub pause: Duration,
}

fn step<R: Rng>(command: InjectorCommand, rng: &mut R, lo: u64, hi: u64) -> TypingStep {
    TypingStep {
        command,
        pause: Duration::from_millis(rng.random_range(lo..=hi)),
    }
}

fn type_ch(ch: char) -> InjectorCommand {
    InjectorCommand::Type { ch }
}

fn backspace() -> InjectorCommand {
    InjectorCommand::key("Backspace")
}

/// Turn a target string into a command stream with human-like mistakes:
/// occasionally a plausibly-adjacent wrong character (typed, noticed,
/// backspaced, corrected) or a swapped pair. Replaying the stream against a
/// text buffer always reproduces `text` exactly.
pub fn typing_program<R: Rng>(text: &str, rng: &mut R) -> Vec<TypingStep> {
    let chars: Vec<char> = text.chars().collect();
    let mut steps = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        if !ch.is_whitespace() && rng.random_bool(ERROR_RATE) {
            let next = chars.get(i + 1).copied();
            let swappable = next.is_some_and(|c| !c.is_whitespace());
            if swappable && rng.random_bool(0.5) {
                // Swapped pair: both out of order, a beat to notice, two
                // backspaces, then the pair again properly.
                let next = chars[i + 1];
                steps.push(step(type_ch(next), rng, 35, 70));
                steps.push(step(type_ch(ch), rng, 200, 500));
                steps.push(step(backspace(), rng, 30, 60));
                steps.push(step(backspace(), rng, 30, 60));
                steps.push(step(type_ch(ch), rng, 35, 70));
                steps.push(step(type_ch(next), rng, 35, 70));
                i += 2;
                continue;
            }
            if let Some(wrong) = adjacent_in_word(&chars, i, rng) {
                steps.push(step(type_ch(wrong), rng, 150, 500));
                steps.push(step(backspace(), rng, 80, 160));
                steps.push(step(type_ch(ch), rng, 35, 70));
                i += 1;
                continue;
            }
        }
        steps.push(step(type_ch(ch), rng, 35, 70));
        i += 1;
    }
    steps
}

/// Pick another letter from the word around `index`: never the correct
/// character, never whitespace. Words with no alternative produce no typo.
fn adjacent_in_word<R: Rng>(chars: &[char], index: usize, rng: &mut R) -> Option<char> {
    let mut start = index;
    while start > 0 && !chars[start - 1].is_whitespace() {
        start -= 1;
    }
    let mut end = index;
    while end + 1 < chars.len() && !chars[end + 1].is_whitespace() {
        end += 1;
    }
    let candidates: Vec<char> = chars[start..=end]
        .iter()
        .copied()
        .filter(|&c| c != chars[index] && !c.is_whitespace())
        .collect();
    if candidates.is_empty() {
        None
    } else {
        Some(candidates[rng.random_range(0..candidates.len())])
    }
}
