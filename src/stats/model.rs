use serde::Deserialize;
use serde_json::Value;

use super::error::FetchError;

/// One entry of the `resultSets` array every stats.nba.com endpoint returns.
/// Headers and rows are passed through untouched.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ResultSet {
    pub name: String,
    pub headers: Vec<String>,
    #[serde(rename = "rowSet")]
    pub row_set: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct StatsResponse {
    #[serde(rename = "resultSets")]
    result_sets: Vec<ResultSet>,
}

/// The game log of one (player, season) item: the API's column headers plus
/// one row per game. No schema is enforced on the cells.
#[derive(Debug, Clone, PartialEq)]
pub struct GameLog {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// Extract the named result set from a response body.
pub fn parse_result_set(body: &str, name: &str) -> Result<ResultSet, FetchError> {
    let response: StatsResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;
    response
        .result_sets
        .into_iter()
        .find(|rs| rs.name == name)
        .ok_or_else(|| FetchError::Malformed(format!("result set '{}' missing", name)))
}

/// Render one JSON cell for CSV output. Strings lose their quotes, nulls
/// become empty cells, numbers keep the API's formatting.
pub fn cell_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Name-to-id lookup built from the `commonallplayers` result set.
pub struct PlayerIndex {
    // (player id, display name, lowercased display name)
    players: Vec<(i64, String, String)>,
}

impl PlayerIndex {
    pub fn from_result_set(rs: &ResultSet) -> Result<PlayerIndex, FetchError> {
        let id_col = column(rs, "PERSON_ID")?;
        let name_col = column(rs, "DISPLAY_FIRST_LAST")?;
        let mut players = Vec::with_capacity(rs.row_set.len());
        for row in &rs.row_set {
            let id = row
                .get(id_col)
                .and_then(Value::as_i64)
                .ok_or_else(|| FetchError::Malformed("non-numeric PERSON_ID".to_string()))?;
            let name = row
                .get(name_col)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let lower = name.to_lowercase();
            players.push((id, name, lower));
        }
        Ok(PlayerIndex { players })
    }

    /// Exact case-insensitive match first, then the first substring match,
    /// mirroring the lookup the original roster lists were built against.
    pub fn find(&self, name: &str) -> Option<i64> {
        let wanted = name.to_lowercase();
        if let Some((id, _, _)) = self.players.iter().find(|(_, _, lower)| *lower == wanted) {
            return Some(*id);
        }
        self.players
            .iter()
            .find(|(_, _, lower)| lower.contains(&wanted))
            .map(|(id, _, _)| *id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

fn column(rs: &ResultSet, header: &str) -> Result<usize, FetchError> {
    rs.headers
        .iter()
        .position(|h| h == header)
        .ok_or_else(|| FetchError::Malformed(format!("column '{}' missing", header)))
}
