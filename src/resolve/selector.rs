use super::LanguagePreference;
use crate::captions::CaptionTrack;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("No transcript tracks available for this video")]
    NoCaptionsAvailable,
}

/// The track picked for a request and how it was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection<'a> {
    pub track: &'a CaptionTrack,

    /// False when no preferred language matched and the selector degraded
    pub matched_preference: bool,
}

/// Pick one caption track for the given preferences.
///
/// Preferences are walked in order and, within one language, a manual track
/// beats an auto-generated one. When nothing matches (or there are no
/// preferences) the first manual track wins, then the first track of any kind.
/// Only an empty track list fails.
pub fn select<'a>(
    tracks: &'a [CaptionTrack],
    preferences: &LanguagePreference,
) -> Result<Selection<'a>, SelectionError> {
    if tracks.is_empty() {
        return Err(SelectionError::NoCaptionsAvailable);
    }

    for language in preferences.iter() {
        if let Some(track) = find(tracks, |t| t.language_code == language && !t.is_auto_generated)
            .or_else(|| find(tracks, |t| t.language_code == language && t.is_auto_generated))
        {
            return Ok(Selection {
                track,
                matched_preference: true,
            });
        }
    }

    let track = find(tracks, |t| !t.is_auto_generated)
        .or_else(|| tracks.first())
        .ok_or(SelectionError::NoCaptionsAvailable)?;

    Ok(Selection {
        track,
        matched_preference: false,
    })
}

fn find<'a>(
    tracks: &'a [CaptionTrack],
    predicate: impl Fn(&CaptionTrack) -> bool,
) -> Option<&'a CaptionTrack> {
    tracks.iter().find(|track| predicate(track))
}
