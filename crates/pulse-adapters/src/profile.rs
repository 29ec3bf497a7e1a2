//! **Profile**: who the user is (name, bio, location, interests).

use crate::text::mentions;
use pulse_core::{AdapterContext, AdapterError, AppDescriptor, AppSource, Clock};
use serde::{Deserialize, Serialize};

pub const PROFILE_KEY: &str = "profile";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub member_since: Option<String>,
}

impl ProfileRecord {
    fn is_empty(&self) -> bool {
        self.name.trim().is_empty() && self.bio.trim().is_empty() && self.interests.is_empty()
    }
}

pub struct ProfileSource;

impl AppSource for ProfileSource {
    type Data = ProfileRecord;

    fn descriptor(&self) -> AppDescriptor {
        AppDescriptor::new("profile", "Profile", "👤")
            .capabilities(["identity", "interests"])
            .keywords(["profile", "my name", "bio", "about me", "interests", "location", "who am i"])
    }

    fn reload(&self, ctx: &AdapterContext) -> Result<ProfileRecord, AdapterError> {
        Ok(ctx.load_or_default("profile", PROFILE_KEY)?)
    }

    fn summarize(&self, data: &ProfileRecord, ctx: &AdapterContext) -> String {
        if data.is_empty() {
            return "Profile not set up".to_string();
        }
        let mut parts = vec![if data.name.is_empty() { "Unnamed".to_string() } else { data.name.clone() }];
        if let Some(location) = data.location.as_deref().filter(|l| !l.is_empty()) {
            parts.push(location.to_string());
        }
        if !data.interests.is_empty() {
            parts.push(format!("into {}", data.interests.join(", ")));
        }
        if let Some(since) = data.member_since.as_deref().and_then(|s| ctx.clock.parse(s)) {
            parts.push(format!("joined {}", ctx.clock.time_ago(&since)));
        }
        parts.join(" · ")
    }

    fn is_active(&self, data: &ProfileRecord) -> bool {
        !data.is_empty()
    }

    fn respond(&self, query: &str, data: &ProfileRecord, ctx: &AdapterContext) -> Result<Option<String>, AdapterError> {
        if data.is_empty() {
            return Ok(Some("Your profile is empty. Add a name and some interests in Profile.".to_string()));
        }
        if mentions(query, &["name", "who am i"]) && !data.name.is_empty() {
            return Ok(Some(format!("Your profile name is {}.", data.name)));
        }
        if mentions(query, &["interest", "hobbies", "hobby"]) {
            return Ok(Some(if data.interests.is_empty() {
                "You haven't listed any interests yet.".to_string()
            } else {
                format!("You're interested in {}.", data.interests.join(", "))
            }));
        }
        if mentions(query, &["location", "where", "live"]) {
            return Ok(Some(match data.location.as_deref().filter(|l| !l.is_empty()) {
                Some(location) => format!("Your profile lists {} as your location.", location),
                None => "Your profile has no location set.".to_string(),
            }));
        }
        Ok(Some(self.summarize(data, ctx)))
    }
}
