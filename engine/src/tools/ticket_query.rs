//! Train ticket query tool
//!
//! Looks up train listings between two stations on a given date and keeps
//! the ones departing inside a time window. Listings come from a
//! [`TicketSource`]; the shipped source is a JSON HTTP endpoint.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

use sdk::tool::Tool;
use sdk::types::{ToolError, ToolInput, ToolOutput};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";
const DEFAULT_WINDOW_START: &str = "00:00";
const DEFAULT_WINDOW_END: &str = "23:59";

fn dash() -> String {
    "-".to_string()
}

/// One train as reported by the source. Missing fields read as "-".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketListing {
    #[serde(default = "dash")]
    pub train_number: String,
    #[serde(default = "dash")]
    pub origin: String,
    #[serde(default = "dash")]
    pub destination: String,
    #[serde(default = "dash")]
    pub departure_time: String,
    #[serde(default = "dash")]
    pub arrival_time: String,
    #[serde(default = "dash")]
    pub duration: String,
    #[serde(default = "dash")]
    pub business_seat: String,
    #[serde(default = "dash")]
    pub first_class_seat: String,
    #[serde(default = "dash")]
    pub second_class_seat: String,
}

impl TicketListing {
    fn departs_within(&self, start: NaiveTime, end: NaiveTime) -> bool {
        NaiveTime::parse_from_str(self.departure_time.trim(), TIME_FORMAT)
            .map(|departure| departure >= start && departure <= end)
            .unwrap_or(false)
    }
}

/// Validated query parameters
#[derive(Debug, Clone, PartialEq)]
pub struct TicketQuery {
    pub origin: String,
    pub destination: String,
    pub date: NaiveDate,
    pub window_start: NaiveTime,
    pub window_end: NaiveTime,
}

impl TicketQuery {
    fn from_input(input: &ToolInput) -> Result<Self, ToolError> {
        let origin = non_empty(input, "origin")?;
        let destination = non_empty(input, "destination")?;

        let date_text = input.param_str("date")?;
        let date = NaiveDate::parse_from_str(date_text.trim(), DATE_FORMAT).map_err(|_| {
            ToolError::InvalidParameter(format!("date must be YYYY-MM-DD, got '{}'", date_text))
        })?;

        let window_start = parse_time(input, "departure_time_start", DEFAULT_WINDOW_START)?;
        let window_end = parse_time(input, "departure_time_end", DEFAULT_WINDOW_END)?;
        if window_start > window_end {
            return Err(ToolError::InvalidParameter(format!(
                "departure_time_start ({}) is after departure_time_end ({})",
                window_start.format(TIME_FORMAT),
                window_end.format(TIME_FORMAT)
            )));
        }

        Ok(Self {
            origin,
            destination,
            date,
            window_start,
            window_end,
        })
    }
}

fn non_empty(input: &ToolInput, key: &str) -> Result<String, ToolError> {
    let value = input.param_str(key)?;
    let value = value.trim();
    if value.is_empty() {
        return Err(ToolError::InvalidParameter(format!("{} must not be empty", key)));
    }
    Ok(value.to_string())
}

fn parse_time(input: &ToolInput, key: &str, default: &str) -> Result<NaiveTime, ToolError> {
    let text = input.param_str_or(key, default)?;
    NaiveTime::parse_from_str(text.trim(), TIME_FORMAT).map_err(|_| {
        ToolError::InvalidParameter(format!("{} must be HH:MM, got '{}'", key, text))
    })
}

/// Where ticket listings come from
#[async_trait]
pub trait TicketSource: Send + Sync {
    /// All listings for the route and date, unfiltered
    async fn fetch(&self, query: &TicketQuery) -> Result<Vec<TicketListing>, ToolError>;
}

/// Fetches listings from a JSON endpoint:
/// `GET {endpoint}?origin=..&destination=..&date=YYYY-MM-DD` returning an array.
pub struct HttpTicketSource {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpTicketSource {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl TicketSource for HttpTicketSource {
    async fn fetch(&self, query: &TicketQuery) -> Result<Vec<TicketListing>, ToolError> {
        let date = query.date.format(DATE_FORMAT).to_string();
        debug!(
            "Fetching tickets {} -> {} on {} from {}",
            query.origin, query.destination, date, self.endpoint
        );

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("origin", query.origin.as_str()),
                ("destination", query.destination.as_str()),
                ("date", date.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ToolError::execution("NetworkError", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ToolError::execution(
                "HttpError",
                format!("ticket source returned {}: {}", status, body.trim()),
            ));
        }

        response
            .json::<Vec<TicketListing>>()
            .await
            .map_err(|e| ToolError::execution("DecodeError", e.to_string()))
    }
}

/// `query_train_tickets`
pub struct TicketQueryTool {
    source: Arc<dyn TicketSource>,
    max_results: usize,
}

impl TicketQueryTool {
    pub fn new(source: Arc<dyn TicketSource>, max_results: usize) -> Self {
        Self {
            source,
            max_results,
        }
    }
}

#[async_trait]
impl Tool for TicketQueryTool {
    fn name(&self) -> &str {
        "query_train_tickets"
    }

    fn description(&self) -> &str {
        "Query real train tickets between two stations on a date, optionally within a departure time window"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "origin": { "type": "string", "description": "departure station or city" },
                "destination": { "type": "string", "description": "arrival station or city" },
                "date": { "type": "string", "description": "travel date, YYYY-MM-DD" },
                "departure_time_start": { "type": "string", "description": "earliest departure, HH:MM", "default": DEFAULT_WINDOW_START },
                "departure_time_end": { "type": "string", "description": "latest departure, HH:MM", "default": DEFAULT_WINDOW_END }
            },
            "required": ["origin", "destination", "date"]
        })
    }

    async fn invoke(&self, input: ToolInput) -> Result<ToolOutput, ToolError> {
        let query = TicketQuery::from_input(&input)?;
        info!(
            "Querying trains {} -> {} on {}",
            query.origin, query.destination, query.date
        );

        let listings = self.source.fetch(&query).await?;
        let total = listings.len();
        let results: Vec<TicketListing> = listings
            .into_iter()
            .filter(|listing| listing.departs_within(query.window_start, query.window_end))
            .take(self.max_results)
            .collect();

        debug!("{} of {} listings kept", results.len(), total);

        Ok(ToolOutput::json(json!({
            "message": "query succeeded",
            "results": results,
        })))
    }
}
