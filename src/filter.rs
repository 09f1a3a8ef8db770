//! Local filtering, sorting and pagination over the mirrored torrent set.

use std::cmp::Ordering;

use crate::models::{Torrent, TorrentState};
use crate::parameters::{TorrentFilter, TorrentFilterOptions, TorrentSort};

/// The filters each state satisfies. `All` is handled before the lookup, so
/// the rows only list the specific filters.
fn state_filters(state: TorrentState) -> &'static [TorrentFilter] {
    use TorrentFilter::*;

    match state {
        TorrentState::Error => &[Errored, Inactive],
        TorrentState::MissingFiles => &[Errored, Inactive],
        TorrentState::Uploading => &[Uploading, Seeding, Completed, Active, Resumed, Running],
        TorrentState::ForcedUp => &[Uploading, Seeding, Completed, Active, Resumed, Running],
        TorrentState::StalledUp => &[Seeding, Completed, Stalled, StalledUploading, Inactive],
        TorrentState::QueuedUp => &[Seeding, Completed, Inactive],
        TorrentState::CheckingUp => &[Seeding, Completed, Inactive],
        TorrentState::PausedUp => &[Paused, Stopped, Completed, Inactive],
        TorrentState::StoppedUp => &[Paused, Stopped, Completed, Inactive],
        TorrentState::Allocating => &[Downloading, Inactive],
        TorrentState::Downloading => &[Downloading, Active, Resumed, Running],
        TorrentState::MetaDl => &[Downloading, Active, Resumed, Running],
        TorrentState::ForcedMetaDl => &[Downloading, Active, Resumed, Running],
        TorrentState::ForcedDl => &[Downloading, Active, Resumed, Running],
        TorrentState::StalledDl => &[Downloading, Stalled, StalledDownloading, Inactive],
        TorrentState::QueuedDl => &[Downloading, Inactive],
        TorrentState::CheckingDl => &[Downloading, Inactive],
        TorrentState::PausedDl => &[Paused, Stopped, Inactive],
        TorrentState::StoppedDl => &[Paused, Stopped, Inactive],
        TorrentState::CheckingResumeData => &[Inactive],
        TorrentState::Moving => &[Active],
        TorrentState::Unknown => &[],
    }
}

/// Whether a torrent in `state` satisfies `filter`. `All` matches every
/// state, including states missing from the lookup table.
pub fn matches_state_filter(state: TorrentState, filter: TorrentFilter) -> bool {
    filter == TorrentFilter::All || state_filters(state).contains(&filter)
}

/// Exact-segment tag matching: `target` must equal one of the
/// comma-separated, whitespace-trimmed segments of `tags`. Substrings do not
/// match, and an empty haystack or needle never matches.
pub fn contains_exact_tag(tags: &str, target: &str) -> bool {
    if tags.is_empty() || target.is_empty() {
        return false;
    }
    tags.split(',').any(|segment| segment.trim() == target)
}

fn matches(torrent: &Torrent, options: &TorrentFilterOptions) -> bool {
    if let Some(hashes) = &options.hashes {
        if !hashes.iter().any(|h| h == &torrent.hash) {
            return false;
        }
    }
    if let Some(category) = &options.category {
        if &torrent.category != category {
            return false;
        }
    }
    if let Some(tag) = &options.tag {
        if !contains_exact_tag(&torrent.tags, tag) {
            return false;
        }
    }
    if let Some(filter) = options.filter {
        if !matches_state_filter(torrent.state, filter) {
            return false;
        }
    }
    true
}

fn compare_by(a: &Torrent, b: &Torrent, sort: TorrentSort) -> Ordering {
    match sort {
        TorrentSort::AddedOn => a.added_on.cmp(&b.added_on),
        TorrentSort::Availability => a.availability.total_cmp(&b.availability),
        TorrentSort::Category => a.category.cmp(&b.category),
        TorrentSort::Completed => a.completed.cmp(&b.completed),
        TorrentSort::CompletionOn => a.completion_on.cmp(&b.completion_on),
        TorrentSort::Dlspeed => a.dlspeed.cmp(&b.dlspeed),
        TorrentSort::Downloaded => a.downloaded.cmp(&b.downloaded),
        TorrentSort::Eta => a.eta.cmp(&b.eta),
        TorrentSort::Hash => a.hash.cmp(&b.hash),
        TorrentSort::LastActivity => a.last_activity.cmp(&b.last_activity),
        TorrentSort::Name => a.name.cmp(&b.name),
        TorrentSort::NumComplete => a.num_complete.cmp(&b.num_complete),
        TorrentSort::NumIncomplete => a.num_incomplete.cmp(&b.num_incomplete),
        TorrentSort::NumLeechs => a.num_leechs.cmp(&b.num_leechs),
        TorrentSort::NumSeeds => a.num_seeds.cmp(&b.num_seeds),
        TorrentSort::Priority => a.priority.cmp(&b.priority),
        TorrentSort::Progress => a.progress.total_cmp(&b.progress),
        TorrentSort::Ratio => a.ratio.total_cmp(&b.ratio),
        TorrentSort::Reannounce => a.reannounce.cmp(&b.reannounce),
        TorrentSort::SavePath => a.save_path.cmp(&b.save_path),
        TorrentSort::SeedingTime => a.seeding_time.cmp(&b.seeding_time),
        TorrentSort::Size => a.size.cmp(&b.size),
        TorrentSort::TimeActive => a.time_active.cmp(&b.time_active),
        TorrentSort::TotalSize => a.total_size.cmp(&b.total_size),
        TorrentSort::Uploaded => a.uploaded.cmp(&b.uploaded),
        TorrentSort::Upspeed => a.upspeed.cmp(&b.upspeed),
        // Not meaningfully comparable locally
        TorrentSort::State | TorrentSort::Tags => a.name.cmp(&b.name),
    }
}

/// Filter, sort and paginate a snapshot of the mirror.
///
/// Ties sort by hash so repeated calls over the same data paginate
/// consistently.
pub(crate) fn apply(torrents: &[Torrent], options: &TorrentFilterOptions) -> Vec<Torrent> {
    let mut result: Vec<Torrent> = torrents
        .iter()
        .filter(|t| matches(t, options))
        .cloned()
        .collect();

    if let Some(sort) = options.sort {
        result.sort_by(|a, b| {
            let ordering = compare_by(a, b, sort);
            let ordering = if options.reverse {
                ordering.reverse()
            } else {
                ordering
            };
            ordering.then_with(|| a.hash.cmp(&b.hash))
        });
    } else if options.reverse {
        result.reverse();
    }

    let offset = options.offset.unwrap_or(0).max(0) as usize;
    if offset >= result.len() {
        return Vec::new();
    }
    if offset > 0 {
        result.drain(..offset);
    }
    if let Some(limit) = options.limit {
        if limit >= 0 {
            result.truncate(limit as usize);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::TorrentFilterOptionsBuilder;

    fn torrent(hash: &str, size: i64) -> Torrent {
        Torrent {
            hash: hash.to_string(),
            name: format!("torrent-{hash}"),
            size,
            ..Default::default()
        }
    }

    #[test]
    fn all_filter_matches_every_state() {
        let states = [
            TorrentState::Error,
            TorrentState::MissingFiles,
            TorrentState::Uploading,
            TorrentState::PausedUp,
            TorrentState::StoppedUp,
            TorrentState::QueuedUp,
            TorrentState::StalledUp,
            TorrentState::CheckingUp,
            TorrentState::ForcedUp,
            TorrentState::Allocating,
            TorrentState::Downloading,
            TorrentState::MetaDl,
            TorrentState::ForcedMetaDl,
            TorrentState::PausedDl,
            TorrentState::StoppedDl,
            TorrentState::QueuedDl,
            TorrentState::StalledDl,
            TorrentState::CheckingDl,
            TorrentState::ForcedDl,
            TorrentState::CheckingResumeData,
            TorrentState::Moving,
            TorrentState::Unknown,
        ];
        for state in states {
            assert!(
                matches_state_filter(state, TorrentFilter::All),
                "all should match {state:?}"
            );
        }
    }

    #[test]
    fn state_filter_table_rows() {
        assert!(matches_state_filter(
            TorrentState::StalledUp,
            TorrentFilter::Completed
        ));
        assert!(!matches_state_filter(
            TorrentState::StalledUp,
            TorrentFilter::Downloading
        ));
        assert!(matches_state_filter(
            TorrentState::Error,
            TorrentFilter::Errored
        ));
        assert!(matches_state_filter(
            TorrentState::MetaDl,
            TorrentFilter::Downloading
        ));
        assert!(matches_state_filter(
            TorrentState::PausedDl,
            TorrentFilter::Inactive
        ));
        assert!(matches_state_filter(
            TorrentState::Uploading,
            TorrentFilter::Resumed
        ));
        assert!(!matches_state_filter(
            TorrentState::Unknown,
            TorrentFilter::Errored
        ));
    }

    #[test]
    fn tag_matching_is_exact() {
        assert!(!contains_exact_tag("foobar,baz", "foo"));
        assert!(contains_exact_tag("foo,bar", "foo"));
        assert!(contains_exact_tag("tag 1, tag 2", "tag 2"));
        assert!(!contains_exact_tag("", "foo"));
        assert!(!contains_exact_tag("foo,bar", ""));
    }

    #[test]
    fn sort_and_paginate() {
        let torrents = vec![
            torrent("h1", 100),
            torrent("h2", 200),
            torrent("h3", 300),
            torrent("h4", 400),
            torrent("h5", 500),
        ];
        let options = TorrentFilterOptionsBuilder::default()
            .sort(TorrentSort::Size)
            .reverse(true)
            .offset(1)
            .limit(2)
            .build()
            .unwrap();

        let page = apply(&torrents, &options);
        let sizes: Vec<i64> = page.iter().map(|t| t.size).collect();
        assert_eq!(sizes, vec![400, 300]);
    }

    #[test]
    fn offset_past_end_is_empty() {
        let torrents = vec![torrent("h1", 100), torrent("h2", 200)];
        let options = TorrentFilterOptionsBuilder::default()
            .offset(2)
            .build()
            .unwrap();
        assert!(apply(&torrents, &options).is_empty());
    }

    #[test]
    fn equal_keys_tie_break_by_hash() {
        let torrents = vec![torrent("b", 100), torrent("a", 100), torrent("c", 100)];
        let options = TorrentFilterOptionsBuilder::default()
            .sort(TorrentSort::Size)
            .build()
            .unwrap();
        let page = apply(&torrents, &options);
        let hashes: Vec<&str> = page.iter().map(|t| t.hash.as_str()).collect();
        assert_eq!(hashes, vec!["a", "b", "c"]);
    }

    #[test]
    fn hash_allowlist_and_category() {
        let mut torrents = vec![torrent("h1", 100), torrent("h2", 200)];
        torrents[0].category = "tv".to_string();
        torrents[1].category = "tv".to_string();

        let options = TorrentFilterOptionsBuilder::default()
            .hashes(vec!["h2".to_string()])
            .category("tv")
            .build()
            .unwrap();
        let result = apply(&torrents, &options);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].hash, "h2");
    }
}
