//! Rules for the toolkit content model.
//!
//! | content type | strips | label | skip-copy |
//! |---|---|---|---|
//! | `toolkit` | `slug`, `category`, `titleArt`, `launchDate`, `distribution` | new title | no |
//! | `toolkitAsset` | `ctaUrl` | `name` | no |
//! | `contentModule` | `ctaUrl`, `images`, `twoColumnText1/2`, `twoColumnList1/2`, `video` | `contentType` | no |
//! | `imageMetadata` | | `name` | no |
//! | `tagRegion`, `tagLanguage`, `tagCreativeType` | | `name` | yes |
//!
//! Tags are shared taxonomy: a cloned toolkit keeps pointing at the same
//! region, language and creative-type tags as the original.

use super::{RuleContext, RuleOutcome, RuleRegistry, StripRule, TitleSpec, TransformRule};
use crate::models::{FieldValue, Fields};

const TOOLKIT_STRIPPED: [&str; 5] = ["slug", "category", "titleArt", "launchDate", "distribution"];

const CONTENT_MODULE_STRIPPED: [&str; 7] = [
    "ctaUrl",
    "images",
    "twoColumnText1",
    "twoColumnText2",
    "twoColumnList1",
    "twoColumnList2",
    "video",
];

const TAG_TYPES: [&str; 3] = ["tagRegion", "tagLanguage", "tagCreativeType"];

/// Root toolkit rule: resets identity fields and retitles the copy.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolkitRule;

impl ToolkitRule {
    fn title(fields: &Fields, ctx: &RuleContext) -> String {
        match &ctx.title {
            TitleSpec::Replace(title) => title.clone(),
            TitleSpec::Suffix(tag) => {
                let tag = tag.trim();
                let existing = fields.text("title", &ctx.locale).unwrap_or_default().trim_end();
                if tag.is_empty() {
                    existing.to_string()
                } else if existing.is_empty() {
                    tag.to_string()
                } else {
                    format!("{existing} {tag}")
                }
            }
        }
    }
}

impl TransformRule for ToolkitRule {
    fn apply(&self, mut fields: Fields, ctx: &RuleContext) -> RuleOutcome {
        for field in TOOLKIT_STRIPPED {
            fields.remove(field);
        }

        // Only the presentation locale is written; translations stay as they are
        let title = Self::title(&fields, ctx);
        fields.update_localized("title", &ctx.locale, FieldValue::text(title.clone()));
        if let TitleSpec::Replace(_) = ctx.title {
            fields.update_localized(
                "description",
                &ctx.locale,
                FieldValue::text(ctx.default_description.clone()),
            );
            fields.update_localized(
                "synopsis",
                &ctx.locale,
                FieldValue::text(ctx.default_synopsis.clone()),
            );
        }

        RuleOutcome {
            fields,
            skip_copy: false,
            label: Some(title),
        }
    }
}

/// Register the toolkit content model rules.
pub(super) fn register_defaults(registry: &mut RuleRegistry) {
    registry.register("toolkit", ToolkitRule);
    registry.register("toolkitAsset", StripRule::new().strip(["ctaUrl"]).label_field("name"));
    registry.register(
        "contentModule",
        StripRule::new().strip(CONTENT_MODULE_STRIPPED).label_field("contentType"),
    );
    registry.register("imageMetadata", StripRule::new().label_field("name"));
    for tag in TAG_TYPES {
        registry.register(tag, StripRule::new().label_field("name").skip_copy(true));
    }
}
