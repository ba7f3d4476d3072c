use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A story as returned by the remote story service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub id: String,
    pub name: String,
    pub description: String,
    pub photo_url: String,
    pub created_at: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

/// A story the user chose to keep. Shares its id with [`Story`] but lives
/// independently of the story cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub id: String,
    pub name: String,
    pub description: String,
    pub photo_url: String,
}

impl From<&Story> for Bookmark {
    fn from(story: &Story) -> Self {
        Self {
            id: story.id.clone(),
            name: story.name.clone(),
            description: story.description.clone(),
            photo_url: story.photo_url.clone(),
        }
    }
}

/// Photo attached to a story submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl Photo {
    pub fn jpeg(data: impl Into<Bytes>) -> Self {
        Self {
            file_name: "photo.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            data: data.into(),
        }
    }
}

/// A story submission that has not reached the server yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewStory {
    pub description: String,
    pub photo: Photo,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// Key material of a push subscription.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

/// A platform push subscription. The endpoint is unique per subscription.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PushSubscription {
    pub endpoint: String,
    pub keys: SubscriptionKeys,
}

/// Raw VAPID application server key handed to the platform push service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationServerKey(pub Vec<u8>);

impl ApplicationServerKey {
    /// Decode a URL-safe base64 key. Trailing `=` padding is tolerated.
    pub fn from_base64url(s: &str) -> Result<Self, base64::DecodeError> {
        let trimmed = s.trim().trim_end_matches('=');
        URL_SAFE_NO_PAD.decode(trimmed).map(Self)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn story_parses_api_shape_with_null_location() {
        let json = r#"{
            "id": "story-FvU4u0Vp2S3PMsFg",
            "name": "Dimas",
            "description": "Lorem Ipsum",
            "photoUrl": "https://story-api.dicoding.dev/images/stories/photos-1641623658595_dummy-pic.png",
            "createdAt": "2022-01-08T06:34:18.598Z",
            "lat": null,
            "lon": -16.002
        }"#;
        let story: Story = serde_json::from_str(json).unwrap();
        assert_eq!(story.id, "story-FvU4u0Vp2S3PMsFg");
        assert_eq!(story.lat, None);
        assert_eq!(story.lon, Some(-16.002));
    }

    #[test]
    fn bookmark_from_story_copies_display_fields() {
        let story = Story {
            id: "s1".into(),
            name: "Ana".into(),
            description: "Sunset".into(),
            photo_url: "https://example.com/p.png".into(),
            created_at: "2024-01-01T00:00:00Z".into(),
            lat: Some(1.0),
            lon: Some(2.0),
        };
        let bookmark = Bookmark::from(&story);
        assert_eq!(bookmark.id, "s1");
        assert_eq!(bookmark.photo_url, story.photo_url);
    }

    #[test]
    fn subscription_json_has_no_expiration_time() {
        let sub = PushSubscription {
            endpoint: "https://push.example/abc".into(),
            keys: SubscriptionKeys {
                p256dh: "key".into(),
                auth: "secret".into(),
            },
        };
        let value = serde_json::to_value(&sub).unwrap();
        assert!(value.get("expirationTime").is_none());
        assert_eq!(value["keys"]["auth"], "secret");
    }

    #[test]
    fn application_key_decodes_with_and_without_padding() {
        let raw = ApplicationServerKey::from_base64url(crate::constants::DEFAULT_VAPID_PUBLIC_KEY)
            .unwrap();
        // Uncompressed P-256 point.
        assert_eq!(raw.as_bytes().len(), 65);
        assert_eq!(raw.as_bytes()[0], 0x04);

        let padded = ApplicationServerKey::from_base64url("AQID==").unwrap();
        assert_eq!(padded.as_bytes(), &[1, 2, 3]);
    }

    #[test]
    fn application_key_rejects_garbage() {
        assert!(ApplicationServerKey::from_base64url("not base64!").is_err());
    }
}
