//! Typed payload records for the universe content source
//!
//! Records model exactly the fields the pipeline consumes; everything else a
//! payload carries is preserved through `#[serde(flatten)]` maps so the
//! persisted aggregate stays faithful to the remote documents. A missing
//! consumed field or an unknown content-module kind is a decode error at the
//! fetch boundary, never a silent gap.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reference to a remote binary asset.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssetRef {
    /// Absolute URL of the asset
    pub uri: String,
    /// Unmodeled fields, preserved for the persisted aggregate
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Index entry naming one entity.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntitySummary {
    /// Slug the entity's payload is fetched under
    pub slug: String,
    /// Unmodeled fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Payload of the search index endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchIndex {
    /// Champion summaries
    pub champions: Vec<EntitySummary>,
    /// Faction summaries
    pub factions: Vec<EntitySummary>,
    /// Unmodeled fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Content module attached to an entity page.
///
/// The tag is the module's `type` field; extraction over the kinds is an
/// exhaustive match, so a new kind is a compile-time exercise here and a
/// decode error until it is added.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ContentModule {
    /// A featured video with its poster image
    FeaturedVideo {
        /// Poster image shown before playback
        #[serde(rename = "featured-image")]
        featured_image: AssetRef,
        /// The video resource
        video: AssetRef,
        /// Unmodeled fields
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    /// A gallery of images
    ImageGallery {
        /// Gallery members
        assets: Vec<AssetRef>,
        /// Unmodeled fields
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    /// A horizontally scrolled strip of images
    ImageScroller {
        /// Strip members
        assets: Vec<AssetRef>,
        /// Unmodeled fields
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    /// A teaser linking to a story
    StoryPreview {
        /// Slug of the referenced story
        #[serde(rename = "story-slug")]
        story_slug: String,
        /// Unmodeled fields
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
}

impl ContentModule {
    /// Asset URLs this module contributes.
    pub fn asset_links(&self) -> Vec<&str> {
        match self {
            ContentModule::FeaturedVideo {
                featured_image,
                video,
                ..
            } => vec![featured_image.uri.as_str(), video.uri.as_str()],
            ContentModule::ImageGallery { assets, .. }
            | ContentModule::ImageScroller { assets, .. } => {
                assets.iter().map(|asset| asset.uri.as_str()).collect()
            }
            ContentModule::StoryPreview { .. } => Vec::new(),
        }
    }

    /// Story slug this module references, if it is a story preview.
    pub fn story_slug(&self) -> Option<&str> {
        match self {
            ContentModule::StoryPreview { story_slug, .. } => Some(story_slug.as_str()),
            _ => None,
        }
    }
}

/// Payload of a faction endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FactionPage {
    /// The faction itself
    pub faction: Faction,
    /// Content modules attached to the page
    pub modules: Vec<ContentModule>,
    /// Unmodeled fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Core fields of a faction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Faction {
    /// Crest image
    pub image: AssetRef,
    /// Showcase video
    pub video: AssetRef,
    /// Unmodeled fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Payload of a champion endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChampionPage {
    /// The champion itself
    pub champion: Champion,
    /// Content modules attached to the page
    pub modules: Vec<ContentModule>,
    /// Unmodeled fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Core fields of a champion.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Champion {
    /// Splash image
    pub image: AssetRef,
    /// Showcase video; not every champion has one
    pub video: Option<AssetRef>,
    /// Unmodeled fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Payload of a story endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoryPage {
    /// The story itself
    pub story: Story,
    /// Unmodeled fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Core fields of a story.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Story {
    /// Ordered sections of the story
    #[serde(rename = "story-sections")]
    pub story_sections: Vec<StorySection>,
    /// Unmodeled fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One section of a story.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorySection {
    /// Backdrop image, when the section has one
    #[serde(rename = "background-image")]
    pub background_image: Option<AssetRef>,
    /// Subsections of this section
    #[serde(rename = "story-subsections")]
    pub story_subsections: Vec<StorySubsection>,
    /// Unmodeled fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One subsection of a story section.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorySubsection {
    /// Icon image, when the subsection has one
    #[serde(rename = "icon-image")]
    pub icon_image: Option<AssetRef>,
    /// Unmodeled fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
