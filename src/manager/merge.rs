//! Field-level merging of `sync/maindata` payloads into the local mirror.

use crate::models::{Category, MainData, MainDataUpdate, ServerState, ServerStateUpdate, Torrent, TorrentUpdate};

/// Overwrite fields the delta carried; absent fields keep their value.
macro_rules! merge_fields {
    ($dst:expr, $src:expr, $($field:ident),+ $(,)?) => {
        $( if let Some(value) = $src.$field { $dst.$field = value; } )+
    };
}

/// Same, but an empty string is treated as "no report".
macro_rules! merge_nonempty {
    ($dst:expr, $src:expr, $($field:ident),+ $(,)?) => {
        $( if let Some(value) = $src.$field {
            if !value.is_empty() {
                $dst.$field = value;
            }
        } )+
    };
}

/// Same, for cumulative counters that only ever grow; zero never replaces a
/// real total.
macro_rules! merge_positive {
    ($dst:expr, $src:expr, $($field:ident),+ $(,)?) => {
        $( if let Some(value) = $src.$field {
            if value > 0 {
                $dst.$field = value;
            }
        } )+
    };
}

pub(crate) use {merge_fields, merge_nonempty, merge_positive};

/// Merge a `sync/maindata` reply into the mirror.
///
/// With `retain_removed`, removals reported by a delta stay visible in the
/// mirror for one cycle and are applied at the start of the next merge, so
/// diff consumers can observe what disappeared.
pub(crate) fn merge_main_data(data: &mut MainData, update: MainDataUpdate, retain_removed: bool) {
    if update.full_update {
        *data = MainData::default();
        data.full_update = true;
    } else {
        data.full_update = false;
        if retain_removed {
            let torrents_removed = std::mem::take(&mut data.torrents_removed);
            let categories_removed = std::mem::take(&mut data.categories_removed);
            let tags_removed = std::mem::take(&mut data.tags_removed);
            apply_torrent_removals(data, &torrents_removed);
            apply_category_removals(data, &categories_removed);
            apply_tag_removals(data, &tags_removed);
        }
    }

    data.rid = update.rid;

    if let Some(torrents) = update.torrents {
        for (hash, partial) in torrents {
            let entry = data.torrents.entry(hash.clone()).or_insert_with(|| Torrent {
                hash,
                ..Default::default()
            });
            merge_torrent(entry, partial);
            entry.normalize_hash();
        }
    }

    if let Some(categories) = update.categories {
        for (name, partial) in categories {
            let entry = data
                .categories
                .entry(name.clone())
                .or_insert_with(|| Category {
                    name,
                    ..Default::default()
                });
            merge_fields!(entry, partial, name, save_path);
        }
    }

    if let Some(tags) = update.tags {
        data.tags.extend(tags);
        data.tags.sort();
        data.tags.dedup();
    }

    if let Some(trackers) = update.trackers {
        // whole-value replace per hash
        for (hash, urls) in trackers {
            data.trackers.insert(hash, urls);
        }
    }

    if let Some(server_state) = update.server_state {
        merge_server_state(&mut data.server_state, server_state);
    }

    let torrents_removed = update.torrents_removed.unwrap_or_default();
    let categories_removed = update.categories_removed.unwrap_or_default();
    let tags_removed = update.tags_removed.unwrap_or_default();

    if !retain_removed {
        apply_torrent_removals(data, &torrents_removed);
        apply_category_removals(data, &categories_removed);
        apply_tag_removals(data, &tags_removed);
    }
    data.torrents_removed = torrents_removed;
    data.categories_removed = categories_removed;
    data.tags_removed = tags_removed;
}

fn apply_torrent_removals(data: &mut MainData, hashes: &[String]) {
    for hash in hashes {
        data.torrents.remove(hash);
        // a removed torrent must not linger in the trackers map
        data.trackers.remove(hash);
    }
}

fn apply_category_removals(data: &mut MainData, names: &[String]) {
    for name in names {
        data.categories.remove(name);
    }
}

fn apply_tag_removals(data: &mut MainData, tags: &[String]) {
    data.tags.retain(|tag| !tags.contains(tag));
}

fn merge_torrent(torrent: &mut Torrent, update: TorrentUpdate) {
    merge_fields!(
        torrent,
        update,
        added_on,
        amount_left,
        auto_tmm,
        availability,
        category,
        completed,
        completion_on,
        content_path,
        dl_limit,
        dlspeed,
        downloaded,
        downloaded_session,
        eta,
        f_l_piece_prio,
        force_start,
        hash,
        infohash_v1,
        infohash_v2,
        last_activity,
        magnet_uri,
        max_ratio,
        max_seeding_time,
        name,
        num_complete,
        num_incomplete,
        num_leechs,
        num_seeds,
        priority,
        private,
        progress,
        ratio,
        ratio_limit,
        reannounce,
        save_path,
        seeding_time,
        seeding_time_limit,
        seen_complete,
        seq_dl,
        size,
        state,
        super_seeding,
        tags,
        time_active,
        total_size,
        tracker,
        up_limit,
        uploaded,
        uploaded_session,
        upspeed,
    );
}

fn merge_server_state(state: &mut ServerState, update: ServerStateUpdate) {
    // Speeds and gauges may legitimately drop to zero.
    merge_fields!(
        state,
        update,
        average_time_queue,
        connection_status,
        dht_nodes,
        dl_info_speed,
        dl_rate_limit,
        free_space_on_disk,
        queued_io_jobs,
        queueing,
        refresh_interval,
        total_buffers_size,
        total_peer_connections,
        total_queued_size,
        up_info_speed,
        up_rate_limit,
        use_alt_speed_limits,
        use_subcategories,
    );
    // Cumulative totals only move forward.
    merge_positive!(
        state,
        update,
        alltime_dl,
        alltime_ul,
        dl_info_data,
        up_info_data,
        total_wasted_session,
    );
    merge_nonempty!(
        state,
        update,
        global_ratio,
        last_external_address_v4,
        last_external_address_v6,
        read_cache_hits,
        read_cache_overload,
        write_cache_overload,
    );
}
