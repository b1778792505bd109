//! Phase 7a: Speaker Assigner (`spec.md` §4.7).

use crate::error::CompileError;
use crate::ir::IrNode;
use crate::writer::MappingNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Speaker {
    System,
    Human,
    Ai,
    Tool,
}

impl Speaker {
    fn parse(raw: &str) -> Option<Speaker> {
        match raw {
            "system" => Some(Speaker::System),
            "human" => Some(Speaker::Human),
            "ai" => Some(Speaker::Ai),
            "tool" => Some(Speaker::Tool),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Speaker::System => "system",
            Speaker::Human => "human",
            Speaker::Ai => "ai",
            Speaker::Tool => "tool",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SpeakerRun {
    pub start: usize,
    pub end: usize,
    pub speaker: Speaker,
}

/// Walk the IR, painting `[outStart, outEnd]` ranges with each element's
/// declared `speaker` attribute (tie-break: inner declarations override
/// outer), then flatten into a disjoint ordered run list. Defaults to
/// `system` unless any `human` element appears, in which case the default
/// becomes `human`; if only one speaker results and no `system` was ever
/// explicit, it is coerced to `human` (`spec.md` §3 invariants).
pub fn assign(root: &IrNode, mappings: &[MappingNode], errors: &mut Vec<CompileError>, output_len: usize) -> Vec<SpeakerRun> {
    let mut paints: Vec<(usize, usize, Speaker)> = Vec::new();
    let mut saw_human = false;
    let mut explicit_system = false;
    collect_paints(root, mappings, &mut paints, errors, &mut saw_human, &mut explicit_system);

    let default_speaker = if saw_human { Speaker::Human } else { Speaker::System };

    if output_len == 0 {
        return Vec::new();
    }

    let mut boundaries: Vec<usize> = paints
        .iter()
        .flat_map(|(s, e, _)| [*s, *e])
        .chain([0, output_len])
        .collect();
    boundaries.sort_unstable();
    boundaries.dedup();

    let mut runs = Vec::new();
    for w in boundaries.windows(2) {
        let (start, end) = (w[0], w[1]);
        if start >= end {
            continue;
        }
        // Inner (later-pushed, since traversal is depth-last) declarations
        // override outer ones for overlapping ranges.
        let speaker = paints
            .iter()
            .rev()
            .find(|(s, e, _)| *s <= start && end <= *e)
            .map(|(_, _, sp)| *sp)
            .unwrap_or(default_speaker);
        runs.push(SpeakerRun { start, end, speaker });
    }

    if !explicit_system && runs.iter().all(|r| r.speaker == runs[0].speaker) {
        for r in runs.iter_mut() {
            if r.speaker == Speaker::System {
                r.speaker = Speaker::Human;
            }
        }
    }

    merge_adjacent(runs)
}

fn collect_paints(
    node: &IrNode,
    mappings: &[MappingNode],
    paints: &mut Vec<(usize, usize, Speaker)>,
    errors: &mut Vec<CompileError>,
    saw_human: &mut bool,
    explicit_system: &mut bool,
) {
    if let IrNode::Element(el) = node {
        if let Some(raw) = el.speaker() {
            match Speaker::parse(raw) {
                Some(speaker) => {
                    if speaker == Speaker::Human {
                        *saw_human = true;
                    }
                    if speaker == Speaker::System {
                        *explicit_system = true;
                    }
                    if let Some((start, end)) = range_for(el.original_start_index, el.original_end_index, mappings) {
                        paints.push((start, end, speaker));
                    }
                }
                None => errors.push(CompileError::read(
                    format!("unknown speaker '{}', ignored", raw),
                    None,
                    None,
                )),
            }
        }
        for child in &el.children {
            collect_paints(child, mappings, paints, errors, saw_human, explicit_system);
        }
    }
}

fn range_for(start: Option<usize>, end: Option<usize>, mappings: &[MappingNode]) -> Option<(usize, usize)> {
    let (s, e) = (start?, end?);
    mappings
        .iter()
        .filter(|m| m.original_start == Some(s) && m.original_end == Some(e))
        .min_by_key(|m| m.out_end.saturating_sub(m.out_start))
        .map(|m| (m.out_start, m.out_end))
}

fn merge_adjacent(runs: Vec<SpeakerRun>) -> Vec<SpeakerRun> {
    let mut out: Vec<SpeakerRun> = Vec::with_capacity(runs.len());
    for run in runs {
        if let Some(last) = out.last_mut() {
            if last.speaker == run.speaker && last.end == run.start {
                last.end = run.end;
                continue;
            }
        }
        out.push(run);
    }
    out
}
