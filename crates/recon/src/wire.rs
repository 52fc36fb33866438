//! Request/response form for running the engine off-process.
//!
//! A request carries both sources as CSV text, either inline or as staged
//! locations that a [`StagedSource`] resolves. The response is either the
//! full result with stats or, in indices mode, only row positions so the
//! caller can rebuild records from rows it already holds.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::config::{MatchingConfig, MAX_TOTAL_ROWS};
use crate::engine::run_assignment;
use crate::error::ReconError;
use crate::mapping::{load_transactions, IdGenerator};
use crate::model::{Assignment, ReconciliationResult, Side, Transaction};
use crate::source::ParsedSource;
use crate::stats::ReconStats;

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconRequest {
    #[serde(flatten)]
    pub payload: RequestPayload,
    pub config: MatchingConfig,
    #[serde(default)]
    pub response_mode: ResponseMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestPayload {
    Inline {
        #[serde(rename = "csvA")]
        csv_a: String,
        #[serde(rename = "csvB")]
        csv_b: String,
    },
    Staged {
        #[serde(rename = "storageUrlA")]
        storage_url_a: String,
        #[serde(rename = "storageUrlB")]
        storage_url_b: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    #[default]
    Full,
    Indices,
}

impl ReconRequest {
    /// Decode a request. The embedded config is validated like any other.
    pub fn from_json(input: &str) -> Result<Self, ReconError> {
        let request: ReconRequest =
            serde_json::from_str(input).map_err(|e| ReconError::RequestParse(e.to_string()))?;
        request.config.validate()?;
        Ok(request)
    }
}

/// Resolves a staged source location to its CSV text.
pub trait StagedSource {
    fn fetch(&self, url: &str) -> Result<String, ReconError>;
}

/// Rejects every staged location; for callers that only accept inline CSV.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineOnly;

impl StagedSource for InlineOnly {
    fn fetch(&self, url: &str) -> Result<String, ReconError> {
        Err(ReconError::StagedFetch {
            url: url.to_string(),
            message: "staged sources are not enabled".into(),
        })
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReconResponse {
    Full(FullResponse),
    Indices(IndicesResponse),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullResponse {
    #[serde(flatten)]
    pub result: ReconciliationResult,
    pub stats: ReconStats,
}

/// One A row paired with one B row.
///
/// Indices are 0-based data-record positions in the CSV: the header is not
/// counted and blank rows still occupy their position. Completely empty
/// lines are not records and are not counted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexPair {
    pub index_a: usize,
    pub index_b: usize,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicesResponse {
    pub matched_pairs: Vec<IndexPair>,
    pub unmatched_indices_a: Vec<usize>,
    pub unmatched_indices_b: Vec<usize>,
}

impl IndicesResponse {
    /// Project an assignment onto source row indices.
    ///
    /// A group match yields one pair per member, each carrying the group's
    /// confidence.
    pub fn from_assignment(
        assignment: &Assignment,
        transactions_a: &[Transaction],
        transactions_b: &[Transaction],
    ) -> Self {
        let matched_pairs = assignment
            .matched
            .iter()
            .flat_map(|m| {
                m.a.iter().flat_map(move |&ai| {
                    m.b.iter().map(move |&bi| IndexPair {
                        index_a: transactions_a[ai].row_index,
                        index_b: transactions_b[bi].row_index,
                        confidence: m.confidence,
                    })
                })
            })
            .collect();

        Self {
            matched_pairs,
            unmatched_indices_a: assignment
                .unmatched_a
                .iter()
                .map(|&i| transactions_a[i].row_index)
                .collect(),
            unmatched_indices_b: assignment
                .unmatched_b
                .iter()
                .map(|&i| transactions_b[i].row_index)
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Execute
// ---------------------------------------------------------------------------

/// Run a request end to end: fetch, parse, size-check, match, respond.
pub fn execute(request: &ReconRequest, staged: &dyn StagedSource) -> Result<ReconResponse, ReconError> {
    let started = Instant::now();

    let (csv_a, csv_b) = match &request.payload {
        RequestPayload::Inline { csv_a, csv_b } => (csv_a.clone(), csv_b.clone()),
        RequestPayload::Staged { storage_url_a, storage_url_b } => {
            (staged.fetch(storage_url_a)?, staged.fetch(storage_url_b)?)
        }
    };

    let source_a = ParsedSource::from_csv(Side::A, &csv_a)?;
    let source_b = ParsedSource::from_csv(Side::B, &csv_b)?;
    check_rows(source_a.len(), source_b.len())?;

    let config = &request.config;
    let mut ids = IdGenerator::new();
    let transactions_a = load_transactions(config, Side::A, &source_a, &mut ids);
    let transactions_b = load_transactions(config, Side::B, &source_b, &mut ids);

    let assignment = run_assignment(&transactions_a, &transactions_b, config)?;

    let response = match request.response_mode {
        ResponseMode::Full => {
            let result = assignment.resolve(&transactions_a, &transactions_b, config);
            let stats = ReconStats::from_result(&result, started.elapsed());
            ReconResponse::Full(FullResponse { result, stats })
        }
        ResponseMode::Indices => ReconResponse::Indices(IndicesResponse::from_assignment(
            &assignment,
            &transactions_a,
            &transactions_b,
        )),
    };
    log::debug!("request handled in {} ms", started.elapsed().as_millis());
    Ok(response)
}

/// Reject requests whose combined row count exceeds the platform cap.
pub fn check_rows(rows_a: usize, rows_b: usize) -> Result<(), ReconError> {
    let rows = rows_a.saturating_add(rows_b);
    if rows > MAX_TOTAL_ROWS {
        return Err(ReconError::TooManyRows { rows, limit: MAX_TOTAL_ROWS });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const CONFIG: &str = r#"{
        "rules": [
            {"id": "amt", "columnA": "amount", "columnB": "amount", "matchType": "tolerance_numeric",
             "weight": 1.0, "toleranceValue": 1}
        ],
        "minConfidenceThreshold": 0.9,
        "matchingType": "group"
    }"#;

    fn inline_request(mode: &str) -> String {
        format!(
            r#"{{"csvA": "amount\n300\n42\n", "csvB": "amount\n100\n100\n100\n7\n42\n",
                "config": {CONFIG}, "responseMode": "{mode}"}}"#
        )
    }

    struct MapStage(HashMap<String, String>);

    impl StagedSource for MapStage {
        fn fetch(&self, url: &str) -> Result<String, ReconError> {
            self.0.get(url).cloned().ok_or_else(|| ReconError::StagedFetch {
                url: url.to_string(),
                message: "missing".into(),
            })
        }
    }

    #[test]
    fn parses_inline_and_staged_payloads() {
        let inline = ReconRequest::from_json(&inline_request("full")).unwrap();
        assert!(matches!(inline.payload, RequestPayload::Inline { .. }));
        assert_eq!(inline.response_mode, ResponseMode::Full);

        let staged = ReconRequest::from_json(&format!(
            r#"{{"storageUrlA": "s3://a.csv", "storageUrlB": "s3://b.csv", "config": {CONFIG}}}"#
        ))
        .unwrap();
        assert_eq!(
            staged.payload,
            RequestPayload::Staged {
                storage_url_a: "s3://a.csv".into(),
                storage_url_b: "s3://b.csv".into()
            }
        );
        assert_eq!(staged.response_mode, ResponseMode::Full);
    }

    #[test]
    fn rejects_request_without_sources() {
        let err = ReconRequest::from_json(&format!(r#"{{"config": {CONFIG}}}"#)).unwrap_err();
        assert!(matches!(err, ReconError::RequestParse(_)));
    }

    #[test]
    fn full_response_shape() {
        let request = ReconRequest::from_json(&inline_request("full")).unwrap();
        let response = execute(&request, &InlineOnly).unwrap();
        let ReconResponse::Full(full) = &response else {
            panic!("expected full response");
        };
        assert_eq!(full.result.matched.len(), 2);
        assert_eq!(full.stats.total_a, 2);
        assert_eq!(full.stats.total_b, 5);
        assert_eq!(full.stats.unmatched_b_count, 1);

        let json = serde_json::to_value(&response).unwrap();
        for key in ["matched", "unmatchedA", "unmatchedB", "config", "stats"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert_eq!(json["stats"]["matchedCount"], 2);
    }

    #[test]
    fn indices_response_lists_member_pairs() {
        let request = ReconRequest::from_json(&inline_request("indices")).unwrap();
        let ReconResponse::Indices(indices) = execute(&request, &InlineOnly).unwrap() else {
            panic!("expected indices response");
        };
        // 42↔42 one-to-one, then 300 explained by the three 100s.
        assert_eq!(
            indices.matched_pairs,
            vec![
                IndexPair { index_a: 1, index_b: 4, confidence: 1.0 },
                IndexPair { index_a: 0, index_b: 0, confidence: 1.0 },
                IndexPair { index_a: 0, index_b: 1, confidence: 1.0 },
                IndexPair { index_a: 0, index_b: 2, confidence: 1.0 },
            ]
        );
        assert!(indices.unmatched_indices_a.is_empty());
        assert_eq!(indices.unmatched_indices_b, vec![3]);

        let json = serde_json::to_value(&indices).unwrap();
        assert!(json.get("matchedPairs").is_some());
        assert!(json.get("unmatchedIndicesA").is_some());
    }

    #[test]
    fn indices_keep_positions_across_blank_rows() {
        let request = ReconRequest::from_json(&format!(
            r#"{{"csvA": "amount\n ,\n42\n", "csvB": "amount\n7\n,\n,\n42\n",
                "config": {CONFIG}, "responseMode": "indices"}}"#
        ))
        .unwrap();
        let ReconResponse::Indices(indices) = execute(&request, &InlineOnly).unwrap() else {
            panic!("expected indices response");
        };
        assert_eq!(indices.matched_pairs, vec![IndexPair { index_a: 1, index_b: 3, confidence: 1.0 }]);
        assert_eq!(indices.unmatched_indices_b, vec![0]);
    }

    #[test]
    fn staged_sources_go_through_fetcher() {
        let stage = MapStage(
            [
                ("mem://a".to_string(), "amount\n10\n".to_string()),
                ("mem://b".to_string(), "amount\n10\n".to_string()),
            ]
            .into_iter()
            .collect(),
        );
        let request = ReconRequest::from_json(&format!(
            r#"{{"storageUrlA": "mem://a", "storageUrlB": "mem://b", "config": {CONFIG},
                "responseMode": "indices"}}"#
        ))
        .unwrap();
        let ReconResponse::Indices(indices) = execute(&request, &stage).unwrap() else {
            panic!("expected indices response");
        };
        assert_eq!(indices.matched_pairs.len(), 1);

        let err = execute(&request, &InlineOnly).unwrap_err();
        assert!(matches!(err, ReconError::StagedFetch { .. }));
    }

    #[test]
    fn row_cap() {
        assert!(check_rows(100_000, 100_000).is_ok());
        let err = check_rows(150_000, 50_001).unwrap_err();
        assert!(err.is_size_error());
        assert!(matches!(err, ReconError::TooManyRows { rows: 200_001, .. }));
    }
}
