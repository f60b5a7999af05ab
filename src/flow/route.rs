//! Screen locations as URL strings: `/flow/jobs/wages?collectionId=A`

use crate::error::FlowError;
use crate::flow::navigator::NextScreen;
use crate::path::ItemId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

const COLLECTION_ID_PARAM: &str = "collectionId";
const BASE: &str = "http://localhost/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteLocation {
    pub route: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<ItemId>,
}

impl RouteLocation {
    pub fn new(route: impl Into<String>, collection_id: Option<ItemId>) -> Self {
        Self {
            route: route.into(),
            collection_id,
        }
    }

    /// Parse a route with an optional `collectionId` query parameter
    pub fn parse(raw: &str) -> Result<Self, FlowError> {
        if !raw.starts_with('/') {
            return Err(FlowError::InvalidRoute(raw.to_string()));
        }
        let url = Url::parse(BASE)
            .and_then(|base| base.join(raw))
            .map_err(|_| FlowError::InvalidRoute(raw.to_string()))?;
        let collection_id = url
            .query_pairs()
            .find(|(key, _)| key == COLLECTION_ID_PARAM)
            .map(|(_, value)| ItemId::new(value.into_owned()))
            .transpose()?;
        Ok(Self {
            route: url.path().trim_end_matches('/').to_string(),
            collection_id,
        })
    }
}

impl fmt::Display for RouteLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.collection_id {
            None => write!(f, "{}", self.route),
            Some(id) => {
                let query = url::form_urlencoded::Serializer::new(String::new())
                    .append_pair(COLLECTION_ID_PARAM, id.as_str())
                    .finish();
                write!(f, "{}?{}", self.route, query)
            }
        }
    }
}

impl FromStr for RouteLocation {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<&NextScreen> for RouteLocation {
    fn from(next: &NextScreen) -> Self {
        Self::new(next.route.clone(), next.collection_id.clone())
    }
}
