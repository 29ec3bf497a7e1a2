//! **Photos**: the photo library with its albums, tags and favourites.
//!
//! Contributes `photos` and `saved_images` (favourited photos) to cross-app totals.

use crate::text::{count, latest, mentions};
use chrono::{DateTime, Utc};
use pulse_core::value_path::{search_records, SearchIndex};
use pulse_core::{AdapterContext, AdapterError, AggregateContribution, AppDescriptor, AppSource, SearchMatch};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const PHOTOS_KEY: &str = "photos";

const UNSORTED_ALBUM: &str = "Unsorted";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub taken_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotosData {
    pub photos: Vec<PhotoRecord>,
    pub total: usize,
    pub favorites: usize,
    pub albums: BTreeMap<String, usize>,
    pub last_taken: Option<DateTime<Utc>>,
}

pub struct PhotosSource;

impl AppSource for PhotosSource {
    type Data = PhotosData;

    fn descriptor(&self) -> AppDescriptor {
        AppDescriptor::new("photos", "Photos", "📷")
            .capabilities(["count", "albums", "favorites", "search"])
            .keywords(["photo", "photos", "picture", "pictures", "album", "albums", "camera", "selfie"])
    }

    fn reload(&self, ctx: &AdapterContext) -> Result<PhotosData, AdapterError> {
        let photos: Vec<PhotoRecord> = ctx.load_or_default("photos", PHOTOS_KEY)?;
        let mut albums = BTreeMap::new();
        for photo in &photos {
            let album = photo
                .album
                .as_deref()
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .unwrap_or(UNSORTED_ALBUM);
            *albums.entry(album.to_string()).or_insert(0) += 1;
        }
        Ok(PhotosData {
            total: photos.len(),
            favorites: photos.iter().filter(|p| p.favorite).count(),
            last_taken: latest(ctx.clock.as_ref(), photos.iter().filter_map(|p| p.taken_at.as_deref())),
            albums,
            photos,
        })
    }

    fn summarize(&self, data: &PhotosData, _ctx: &AdapterContext) -> String {
        if data.total == 0 {
            return "No photos yet".to_string();
        }
        format!(
            "{} in {}, {} favourited",
            count(data.total, "photo", "photos"),
            count(data.albums.len(), "album", "albums"),
            data.favorites
        )
    }

    fn is_active(&self, data: &PhotosData) -> bool {
        data.total > 0
    }

    fn last_used(&self, data: &PhotosData, _ctx: &AdapterContext) -> Option<DateTime<Utc>> {
        data.last_taken
    }

    fn respond(&self, query: &str, data: &PhotosData, _ctx: &AdapterContext) -> Result<Option<String>, AdapterError> {
        if data.total == 0 {
            return Ok(Some("Your photo library is empty.".to_string()));
        }
        if mentions(query, &["favorite", "favourite", "starred", "liked"]) {
            return Ok(Some(format!(
                "You've favourited {} of {}.",
                data.favorites,
                count(data.total, "photo", "photos")
            )));
        }
        if mentions(query, &["album"]) {
            let listing = data
                .albums
                .iter()
                .map(|(name, n)| format!("{} ({})", name, n))
                .collect::<Vec<_>>()
                .join(", ");
            return Ok(Some(format!(
                "You have {}: {}.",
                count(data.albums.len(), "album", "albums"),
                listing
            )));
        }
        Ok(Some(format!("You have {} in your library.", count(data.total, "photo", "photos"))))
    }

    fn search(&self, query: &str, data: &PhotosData) -> Result<Vec<SearchMatch>, AdapterError> {
        let index = SearchIndex {
            kind: "photo",
            label_path: "name",
            fields: &["name", "album", "tags"],
        };
        Ok(search_records(&data.photos, &index, query))
    }

    fn supports_aggregation(&self) -> bool {
        true
    }

    fn aggregate(&self, data: &PhotosData) -> Vec<AggregateContribution> {
        vec![
            AggregateContribution::new("photos", data.total as u64, "Photos")
                .with_meta("albums", data.albums.len()),
            AggregateContribution::new("saved_images", data.favorites as u64, "Saved images")
                .with_meta("source", "favourited photos"),
        ]
    }

    fn watched_keys(&self) -> Vec<String> {
        vec![PHOTOS_KEY.to_string()]
    }
}
