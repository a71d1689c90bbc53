//! Flex message card rendering. Pure JSON construction, no failure modes:
//! missing record fields degrade to placeholder text instead of erroring.

use crate::gemini::Recommendation;
use serde_json::{json, Value};

pub const CAROUSEL_ALT_TEXT: &str = "美食推薦清單";

const FALLBACK_NAME: &str = "未知店家";
const FALLBACK_RATING: &str = "N/A";
const FALLBACK_ADDRESS: &str = "無地址";

/// Wraps one micro bubble per record into a horizontally-scrollable carousel.
pub fn recommendation_carousel(stores: &[Recommendation]) -> Value {
    json!({
        "type": "carousel",
        "contents": stores.iter().map(recommendation_bubble).collect::<Vec<Value>>(),
    })
}

/// One venue card: name, star rating, address, description and a footer
/// button that opens a Google Maps search for the venue.
pub fn recommendation_bubble(store: &Recommendation) -> Value {
    let name = store.name.as_deref().unwrap_or(FALLBACK_NAME);
    let rating = match store.rating {
        Some(rating) => format!("⭐ {rating}"),
        None => format!("⭐ {FALLBACK_RATING}"),
    };
    let address = store.address.as_deref().unwrap_or(FALLBACK_ADDRESS);
    let description = store.description.as_deref().unwrap_or("");

    json!({
        "type": "bubble",
        "size": "micro",
        "body": {
            "type": "box",
            "layout": "vertical",
            "contents": [
                { "type": "text", "text": name, "weight": "bold", "size": "sm", "wrap": true },
                { "type": "text", "text": rating, "size": "xs", "color": "#ffc107", "margin": "xs" },
                { "type": "text", "text": address, "size": "xxs", "color": "#aaaaaa", "wrap": true, "margin": "xs" },
                { "type": "text", "text": description, "size": "xxs", "wrap": true, "margin": "md", "color": "#666666" }
            ]
        },
        "footer": {
            "type": "box",
            "layout": "vertical",
            "contents": [
                {
                    "type": "button",
                    "action": {
                        "type": "uri",
                        "label": "地圖",
                        "uri": maps_search_uri(name)
                    },
                    "height": "sm",
                    "style": "link"
                }
            ]
        }
    })
}

fn maps_search_uri(name: &str) -> String {
    format!(
        "https://www.google.com/maps/search/?api=1&query={}",
        urlencoding::encode(name)
    )
}
