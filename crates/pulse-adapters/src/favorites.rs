//! **Favourites galleries**: saved images from the image-browsing mini-apps.
//!
//! One source type serves every gallery; the shipped instances are the cat and dog galleries.
//! Both answer to "favorites", so a generic favourites question ties between them and the
//! router's registration order decides.

use crate::text::{count, latest, mentions};
use chrono::{DateTime, Utc};
use pulse_core::value_path::{search_records, SearchIndex};
use pulse_core::{AdapterContext, AdapterError, AggregateContribution, AppDescriptor, AppSource, SearchMatch};
use serde::{Deserialize, Serialize};

pub const CATS_KEY: &str = "gallery.cats.favorites";
pub const DOGS_KEY: &str = "gallery.dogs.favorites";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteImage {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub saved_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoritesData {
    pub images: Vec<FavoriteImage>,
    pub total: usize,
    pub last_saved: Option<DateTime<Utc>>,
}

pub struct FavoritesSource {
    app_name: String,
    display_name: String,
    icon: String,
    key: String,
    /// Singular subject, e.g. "cat".
    subject: String,
    keywords: Vec<String>,
}

impl FavoritesSource {
    pub fn new(
        app_name: impl Into<String>,
        display_name: impl Into<String>,
        icon: impl Into<String>,
        key: impl Into<String>,
        subject: impl Into<String>,
    ) -> Self {
        let subject = subject.into();
        let keywords = vec![
            subject.clone(),
            format!("{}s", subject),
            "favorites".to_string(),
            "favourites".to_string(),
            "gallery".to_string(),
            "saved images".to_string(),
        ];
        Self {
            app_name: app_name.into(),
            display_name: display_name.into(),
            icon: icon.into(),
            key: key.into(),
            subject,
            keywords,
        }
    }

    pub fn cats() -> Self {
        Self::new("cat-gallery", "Cat Gallery", "🐱", CATS_KEY, "cat").with_keywords(["kitten", "kitty"])
    }

    pub fn dogs() -> Self {
        Self::new("dog-gallery", "Dog Gallery", "🐶", DOGS_KEY, "dog").with_keywords(["puppy", "doggo"])
    }

    /// Adds extra keywords on top of the defaults.
    pub fn with_keywords<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords.extend(extra.into_iter().map(Into::into));
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl AppSource for FavoritesSource {
    type Data = FavoritesData;

    fn descriptor(&self) -> AppDescriptor {
        AppDescriptor::new(&self.app_name, &self.display_name, &self.icon)
            .capabilities(["favorites", "search"])
            .keywords(self.keywords.clone())
    }

    fn reload(&self, ctx: &AdapterContext) -> Result<FavoritesData, AdapterError> {
        let images: Vec<FavoriteImage> = ctx.load_or_default(&self.app_name, &self.key)?;
        Ok(FavoritesData {
            total: images.len(),
            last_saved: latest(ctx.clock.as_ref(), images.iter().filter_map(|i| i.saved_at.as_deref())),
            images,
        })
    }

    fn summarize(&self, data: &FavoritesData, _ctx: &AdapterContext) -> String {
        if data.total == 0 {
            return format!("No saved {} pictures", self.subject);
        }
        format!("{} saved", count(data.total, &format!("{} picture", self.subject), &format!("{} pictures", self.subject)))
    }

    fn is_active(&self, data: &FavoritesData) -> bool {
        data.total > 0
    }

    fn last_used(&self, data: &FavoritesData, _ctx: &AdapterContext) -> Option<DateTime<Utc>> {
        data.last_saved
    }

    fn respond(&self, query: &str, data: &FavoritesData, ctx: &AdapterContext) -> Result<Option<String>, AdapterError> {
        if data.total == 0 {
            return Ok(Some(format!("You haven't saved any {} pictures yet.", self.subject)));
        }
        let noun = count(data.total, &format!("{} picture", self.subject), &format!("{} pictures", self.subject));
        if mentions(query, &["latest", "last", "recent", "newest"]) {
            if let Some(at) = data.last_saved {
                return Ok(Some(format!("You have {} saved; the newest was added {}.", noun, ctx.clock.time_ago(&at))));
            }
        }
        Ok(Some(format!("You have {} saved in your {}.", noun, self.display_name)))
    }

    fn search(&self, query: &str, data: &FavoritesData) -> Result<Vec<SearchMatch>, AdapterError> {
        let index = SearchIndex {
            kind: "image",
            label_path: "caption",
            fields: &["caption", "url"],
        };
        Ok(search_records(&data.images, &index, query))
    }

    fn supports_aggregation(&self) -> bool {
        true
    }

    fn aggregate(&self, data: &FavoritesData) -> Vec<AggregateContribution> {
        vec![AggregateContribution::new("saved_images", data.total as u64, "Saved images")
            .with_meta("subject", self.subject.as_str())]
    }

    fn watched_keys(&self) -> Vec<String> {
        vec![self.key.clone()]
    }
}
