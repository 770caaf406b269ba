use std::time::Duration;

use crate::captions::{CaptionSegment, CaptionTrack};

/// Flatten a track's cues into one line of plain text.
///
/// Cues are taken in start-offset order (a stable sort, so ties keep the order
/// the source delivered). Every run of whitespace, embedded newlines included,
/// becomes a single space; blank cues contribute nothing and a cue repeating
/// the previous one at the same offset is dropped. The result never starts or
/// ends with whitespace.
pub fn normalize(track: &CaptionTrack) -> String {
    let mut ordered: Vec<&CaptionSegment> = track.segments.iter().collect();
    ordered.sort_by_key(|segment| segment.start_offset);

    let mut text = String::new();
    let mut previous: Option<(Duration, &str)> = None;

    for segment in ordered {
        let fragment = segment.text.trim();
        if fragment.is_empty() {
            continue;
        }

        let key = (segment.start_offset, fragment);
        if previous == Some(key) {
            continue;
        }
        previous = Some(key);

        for word in fragment.split_whitespace() {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(word);
        }
    }

    text
}
