//! Guesses the name a stalled download has on disk and the name it should get.
//!
//! Both guesses are heuristics over the queue entry's status messages and the
//! release title recorded in the history.

use lazy_static::lazy_static;
use regex::{NoExpand, Regex};
use thiserror::Error;

use super::item::MatchedItem;

lazy_static! {
    /// Season/episode tag between separators, e.g. `.2x05.` or `-S02E05_`.
    static ref EPISODE_TAG: Regex = Regex::new(r"[.\-_ ]([\-_0-9sSeExX]{1,10})[.\-_ ]")
        .expect("Invalid Regex, this should be fixed at compile time.");
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("impossible to guess file name for {0}")]
    CannotGuessFilename(String),

    #[error("unable to guess final episode name of {0}")]
    CannotGuessFinalName(String),

    #[error("invalid episode pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Both names needed to relocate an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedNames {
    /// Name of the file as it sits in the download folder.
    pub on_disk: String,
    /// Name the server expects, without extension.
    pub final_name: String,
}

pub fn resolve(item: &MatchedItem) -> Result<ResolvedNames, ResolveError> {
    let on_disk = guess_file_name(item)?;
    let final_name = guess_final_name(item, &on_disk)?;
    Ok(ResolvedNames {
        on_disk,
        final_name,
    })
}

/// Name of the downloaded file, taken from the queue entry's status messages.
///
/// A single message is the file itself. With several, the first one whose
/// title carries the season and episode numbers (at most 4 characters apart)
/// wins.
pub fn guess_file_name(item: &MatchedItem) -> Result<String, ResolveError> {
    let entry = &item.queue_entry;
    if let [only] = entry.status_messages.as_slice() {
        return Ok(only.title.clone());
    }

    let (season, episode) = entry
        .episode_key()
        .ok_or_else(|| ResolveError::CannotGuessFilename(entry.title.clone()))?;
    let pattern = Regex::new(&format!("{}.{{0,4}}{}", season, episode))?;

    entry
        .status_messages
        .iter()
        .find(|message| pattern.is_match(&message.title))
        .map(|message| message.title.clone())
        .ok_or_else(|| ResolveError::CannotGuessFilename(entry.title.clone()))
}

/// Release title with its season/episode tag rewritten to `.SxxEyy.`.
///
/// A queue entry with a single status message was already tagged correctly and
/// movies have no tag, in both cases the release title is used as is.
pub fn guess_final_name(item: &MatchedItem, filename: &str) -> Result<String, ResolveError> {
    let source_title = &item.history_record.source_title;
    if item.queue_entry.status_messages.len() == 1 {
        return Ok(source_title.clone());
    }
    let Some((season, episode)) = item.queue_entry.episode_key() else {
        return Ok(source_title.clone());
    };

    if !EPISODE_TAG.is_match(source_title) {
        return Err(ResolveError::CannotGuessFinalName(filename.to_string()));
    }
    let canonical = canonical_tag(season, episode);
    Ok(EPISODE_TAG
        .replacen(source_title, 1, NoExpand(&canonical))
        .into_owned())
}

fn canonical_tag(season: i32, episode: i32) -> String {
    format!(".S{:02}E{:02}.", season, episode)
}
