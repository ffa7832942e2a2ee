//! Listing response schema.
//!
//! The listing API answers `GET <base>?page=<n>` with
//! `{"houses": [{"id", "address", "homeowner", "price", "photoURL"}], "ok": true}`.
//! Fields this crate does not use are ignored.

use serde::Deserialize;

/// One decoded listing page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HousePage {
    /// Records on this page, in the order the API returned them.
    #[serde(default)]
    pub houses: Vec<House>,

    /// Upstream success flag, when the API sends one.
    #[serde(default)]
    pub ok: Option<bool>,
}

impl HousePage {
    /// Number of records on the page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.houses.len()
    }

    /// Whether the page holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.houses.is_empty()
    }
}

/// One listing record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct House {
    /// Unique record identifier.
    pub id: i64,

    /// Street address, used verbatim in the photo's file name.
    pub address: String,

    /// Photo URL.
    #[serde(rename = "photoURL")]
    pub photo_url: String,

    /// Owner's name, when the API provides it.
    #[serde(default)]
    pub homeowner: Option<String>,

    /// Asking price, when the API provides it.
    #[serde(default)]
    pub price: Option<i64>,
}

/// Decodes a listing response body.
///
/// # Errors
///
/// Returns the `serde_json` error when the body is not a listing document.
pub fn decode_page(body: &[u8]) -> Result<HousePage, serde_json::Error> {
    serde_json::from_slice(body)
}
