//! Phase 7 output types: `Message` and rich content (`spec.md` §3).

use crate::sourcemap::{self, SegmentKind, SourceMapSegment};
use crate::speaker::Speaker;
use crate::writer::{PositionalContentMultiMedia, WriteResult};

#[derive(Debug, Clone)]
pub enum RichContent {
    /// A message whose content is plain rendered text, no multimedia.
    Text(String),
    /// A message whose content interleaves text chunks and multimedia
    /// items, in output order.
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone)]
pub enum ContentPart {
    Text(String),
    Media(PositionalContentMultiMedia),
}

#[derive(Debug, Clone)]
pub struct Message {
    pub speaker: Speaker,
    pub content: RichContent,
}

/// Partition a writer's output into one `Message` per speaker run, each
/// carrying either plain text or an interleaved parts list when multimedia
/// placeholders fall within that run (`spec.md` §4.8:
/// "writeMessagesWithSourceMap partitions segments by speaker run
/// membership").
pub fn build_messages(result: &WriteResult, runs: &[crate::speaker::SpeakerRun]) -> Vec<Message> {
    let segments = sourcemap::build(result, runs);
    let mut messages: Vec<Message> = Vec::with_capacity(runs.len());

    for run in runs {
        let run_segments: Vec<&SourceMapSegment> = segments
            .iter()
            .filter(|s| s.out_start >= run.start && s.out_end <= run.end)
            .collect();

        let has_media = run_segments.iter().any(|s| s.kind == SegmentKind::Multimedia);
        if !has_media {
            let text = result.output[run.start..run.end].to_string();
            messages.push(Message {
                speaker: run.speaker,
                content: RichContent::Text(text),
            });
            continue;
        }

        let mut parts = Vec::new();
        for seg in run_segments {
            match seg.kind {
                SegmentKind::Text => {
                    let text = &result.output[seg.out_start..seg.out_end];
                    if !text.is_empty() {
                        parts.push(ContentPart::Text(text.to_string()));
                    }
                }
                SegmentKind::Multimedia => {
                    if let Some(mm) = result
                        .multimedia
                        .iter()
                        .find(|m| m.index >= seg.out_start && m.index < seg.out_end)
                    {
                        parts.push(ContentPart::Media(mm.clone()));
                    }
                }
            }
        }
        messages.push(Message {
            speaker: run.speaker,
            content: RichContent::Parts(parts),
        });
    }

    messages
}
