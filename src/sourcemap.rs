//! Phase 7b: Source Map Builder (`spec.md` §4.8). Slices a writer's output
//! into disjoint `SourceMapSegment`s at every mapping and multimedia
//! boundary, then groups segments by speaker run.

use crate::speaker::{Speaker, SpeakerRun};
use crate::writer::{MappingNode, Position, WriteResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentKind {
    Text,
    Multimedia,
}

#[derive(Debug, Clone)]
pub struct SourceMapSegment {
    pub out_start: usize,
    pub out_end: usize,
    pub kind: SegmentKind,
    pub original_start: Option<usize>,
    pub original_end: Option<usize>,
    pub speaker: Speaker,
}

/// Collect every mapping `out_start`/`out_end` + 1 and every multimedia
/// `index`/`index + 1`, plus the output's own `[0, len]` bounds, then cut
/// the output into segments at each boundary (`spec.md` §4.8: "slices the
/// output at every mapping/multimedia boundary").
pub fn build(result: &WriteResult, runs: &[SpeakerRun]) -> Vec<SourceMapSegment> {
    let len = result.output.len();
    if len == 0 {
        return Vec::new();
    }

    let mut boundaries: Vec<usize> = vec![0, len];
    for m in &result.mappings {
        boundaries.push(m.out_start);
        boundaries.push(m.out_end);
    }
    for mm in &result.multimedia {
        boundaries.push(mm.index);
        boundaries.push((mm.index + 1).min(len));
    }
    boundaries.sort_unstable();
    boundaries.dedup();

    let mut segments = Vec::new();
    for w in boundaries.windows(2) {
        let (start, end) = (w[0], w[1]);
        if start >= end {
            continue;
        }
        let is_multimedia = result.multimedia.iter().any(|mm| mm.index >= start && mm.index < end);
        let speaker = speaker_for(runs, start, end);
        if is_multimedia {
            segments.push(SourceMapSegment {
                out_start: start,
                out_end: end,
                kind: SegmentKind::Multimedia,
                original_start: None,
                original_end: None,
                speaker,
            });
        } else {
            let mapping = tightest_covering(&result.mappings, start, end);
            segments.push(SourceMapSegment {
                out_start: start,
                out_end: end,
                kind: SegmentKind::Text,
                original_start: mapping.and_then(|m| m.original_start),
                original_end: mapping.and_then(|m| m.original_end),
                speaker,
            });
        }
    }
    segments
}

/// Of every mapping whose `[out_start, out_end]` covers `[start, end]`, pick
/// the narrowest — the innermost element wins (`spec.md` §4.8: "tightest
/// covering mapping").
fn tightest_covering(mappings: &[MappingNode], start: usize, end: usize) -> Option<&MappingNode> {
    mappings
        .iter()
        .filter(|m| m.out_start <= start && end <= m.out_end)
        .min_by_key(|m| m.out_end - m.out_start)
}

fn speaker_for(runs: &[SpeakerRun], start: usize, end: usize) -> Speaker {
    runs.iter()
        .find(|r| r.start <= start && end <= r.end)
        .map(|r| r.speaker)
        .unwrap_or(Speaker::System)
}

/// Buckets a multimedia item's `Position` into where it lands relative to
/// its speaker's text run — used when assembling rich `Message` content
/// arrays (`spec.md` §4.8, §3).
pub fn bucket(position: Position) -> &'static str {
    match position {
        Position::Top => "top",
        Position::Here => "middle",
        Position::Bottom => "bottom",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::{MediaPayload, PositionalContentMultiMedia};

    fn run(start: usize, end: usize, speaker: Speaker) -> SpeakerRun {
        SpeakerRun { start, end, speaker }
    }

    #[test]
    fn segments_cover_the_whole_output_without_gaps_or_overlap() {
        let mut result = WriteResult::text("Hello World");
        result.mappings.push(MappingNode {
            original_start: Some(0),
            original_end: Some(5),
            ir_start: 0,
            ir_end: 5,
            out_start: 0,
            out_end: 5,
        });
        let runs = vec![run(0, 11, Speaker::Human)];
        let segments = build(&result, &runs);

        assert_eq!(segments.first().unwrap().out_start, 0);
        assert_eq!(segments.last().unwrap().out_end, result.output.len());
        for pair in segments.windows(2) {
            assert_eq!(pair[0].out_end, pair[1].out_start, "segments must be contiguous");
        }
    }

    #[test]
    fn tightest_covering_mapping_wins_over_a_wider_ancestor() {
        let mappings = vec![
            MappingNode { original_start: Some(0), original_end: Some(10), ir_start: 0, ir_end: 10, out_start: 0, out_end: 10 },
            MappingNode { original_start: Some(2), original_end: Some(4), ir_start: 2, ir_end: 4, out_start: 3, out_end: 5 },
        ];
        let found = tightest_covering(&mappings, 3, 5).unwrap();
        assert_eq!(found.original_start, Some(2));
    }

    #[test]
    fn multimedia_index_produces_a_single_char_segment() {
        let mut result = WriteResult::text("a\u{00C0}b");
        result.multimedia.push(PositionalContentMultiMedia {
            media_type: "image/*".to_string(),
            position: Position::Here,
            index: 1,
            payload: MediaPayload::Image { data: vec![], alt: String::new(), width: None, height: None },
        });
        let segments = build(&result, &[]);
        let media = segments.iter().find(|s| s.kind == SegmentKind::Multimedia).unwrap();
        assert_eq!((media.out_start, media.out_end), (1, 2));
    }

    #[test]
    fn empty_output_has_no_segments() {
        let result = WriteResult::text("");
        assert!(build(&result, &[]).is_empty());
    }

    #[test]
    fn bucket_maps_every_position() {
        assert_eq!(bucket(Position::Top), "top");
        assert_eq!(bucket(Position::Here), "middle");
        assert_eq!(bucket(Position::Bottom), "bottom");
    }
}
