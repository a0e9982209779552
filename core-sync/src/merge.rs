//! Conversion between library values and remote snapshots.

use bridge_traits::{RemoteSongSyncInfo, RemoteTagSyncInfo};
use core_library::{dedup_by_name, LibrarySong, Song, SongId, Tag, TagColor, TagKind};
use tracing::debug;

/// Snapshot pushed for a pending upload.
pub fn to_remote_snapshot(entry: &LibrarySong) -> RemoteSongSyncInfo {
    RemoteSongSyncInfo {
        id: entry.song.id.to_string(),
        catalog_id: entry.song.catalog_id.clone(),
        title: entry.song.title.clone(),
        artist: entry.song.artist.clone(),
        artwork_url: entry.song.artwork_url.clone(),
        tags: entry
            .tags
            .iter()
            .map(|tag| {
                RemoteTagSyncInfo::new(tag.name.clone(), tag.kind.as_str())
                    .with_color(tag.color.as_str())
            })
            .collect(),
    }
}

/// Song metadata carried by a remote snapshot.
///
/// The remote does not track album, genre or the date added, so a song
/// created from a snapshot is stamped with `date_added`.
pub fn song_from_remote(remote: &RemoteSongSyncInfo, date_added: i64) -> Song {
    let mut song = Song::new(SongId::new(remote.id.clone()), remote.title.clone(), remote.artist.clone())
        .with_date_added(date_added);
    song.catalog_id = remote.catalog_id.clone();
    song.artwork_url = remote.artwork_url.clone();
    song
}

/// Local tags for a snapshot's tag list, deduplicated by name.
///
/// Unknown kinds fall back to `User` and invalid colors to the name's palette
/// color; blank names are dropped.
pub fn tags_from_remote(remote: &[RemoteTagSyncInfo]) -> Vec<Tag> {
    dedup_by_name(remote.iter())
        .into_iter()
        .filter(|info| !info.name.trim().is_empty())
        .map(|info| {
            let kind = info.kind.parse::<TagKind>().unwrap_or_else(|_| {
                debug!(tag = %info.name, kind = %info.kind, "Unknown remote tag kind");
                TagKind::User
            });
            let tag = Tag::new(info.name.clone(), kind);
            match info.color.as_deref().map(TagColor::parse) {
                Some(Ok(color)) => tag.with_color(color),
                _ => tag,
            }
        })
        .collect()
}
