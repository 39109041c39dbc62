//! Tests for the network traffic plugin and the scoring cycle

use super::*;
use crate::backend::MetricsSource;
use crate::config::NetworkTrafficArgs;
use crate::error::{BackendError, ConfigError, PluginError};
use crate::models::{BandwidthSample, MAX_NODE_SCORE, MIN_NODE_SCORE};
use crate::observability::{Diagnostics, NoopDiagnostics};
use crate::query::build_query;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Behaviour of the fake backend for one node
#[derive(Clone)]
enum Reply {
    Value(f64),
    Series(usize),
    Hang,
}

#[derive(Default)]
struct FakeSource {
    replies: HashMap<String, Reply>,
    queries: Mutex<Vec<String>>,
}

impl FakeSource {
    fn with(replies: &[(&str, Reply)]) -> Self {
        Self {
            replies: replies
                .iter()
                .map(|(node, reply)| (node.to_string(), reply.clone()))
                .collect(),
            queries: Mutex::new(Vec::new()),
        }
    }

    fn reply_for(&self, query: &str) -> Option<Reply> {
        self.replies
            .iter()
            .find(|(node, _)| query.contains(&format!("kubernetes_node=\"{}\"", node)))
            .map(|(_, reply)| reply.clone())
    }
}

#[async_trait]
impl MetricsSource for FakeSource {
    async fn instant_query(
        &self,
        query: &str,
        at: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<BandwidthSample, BackendError> {
        self.queries.lock().unwrap().push(query.to_string());
        match self.reply_for(query) {
            Some(Reply::Value(value)) => Ok(BandwidthSample {
                value,
                timestamp: at,
            }),
            Some(Reply::Series(count)) => Err(BackendError::AmbiguousResult { count }),
            Some(Reply::Hang) => {
                cancel.cancelled().await;
                Err(BackendError::Cancelled)
            }
            None => Err(BackendError::AmbiguousResult { count: 0 }),
        }
    }
}

#[derive(Default)]
struct RecordingDiagnostics {
    scored: Mutex<Vec<(String, i64)>>,
    failed: Mutex<Vec<String>>,
    normalized: Mutex<Vec<Vec<NodeScore>>>,
}

impl Diagnostics for RecordingDiagnostics {
    fn node_scored(&self, node: &str, _sample: &BandwidthSample, score: i64) {
        self.scored.lock().unwrap().push((node.to_string(), score));
    }

    fn node_score_failed(&self, node: &str, _error: &ScoringError) {
        self.failed.lock().unwrap().push(node.to_string());
    }

    fn scores_normalized(&self, scores: &[NodeScore]) {
        self.normalized.lock().unwrap().push(scores.to_vec());
    }
}

fn args() -> NetworkTrafficArgs {
    NetworkTrafficArgs::new("http://prometheus:9090")
}

fn plugin_with(source: Arc<FakeSource>, diagnostics: Arc<RecordingDiagnostics>) -> NetworkTraffic {
    NetworkTraffic::with_source(&args(), source, diagnostics).expect("valid args")
}

fn nodes(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

mod construction_tests {
    use super::*;

    #[test]
    fn test_invalid_args_rejected() {
        let mut bad = args();
        bad.time_range_in_minutes = 0;
        let result = NetworkTraffic::new(&bad, Arc::new(NoopDiagnostics));
        assert!(matches!(
            result,
            Err(PluginError::Config(ConfigError::InvalidTimeRange(0)))
        ));
    }

    #[test]
    fn test_overflowing_time_range_rejected() {
        let mut bad = args();
        bad.time_range_in_minutes = i64::MAX / 2;
        let result = NetworkTraffic::new(&bad, Arc::new(NoopDiagnostics));
        assert!(matches!(
            result,
            Err(PluginError::Config(ConfigError::InvalidTimeRange(_)))
        ));
    }

    #[test]
    fn test_malformed_address_is_init_error() {
        let result = NetworkTraffic::new(
            &NetworkTrafficArgs::new("::not-a-url::"),
            Arc::new(NoopDiagnostics),
        );
        assert!(matches!(result, Err(PluginError::ClientInit(_))));
    }

    #[test]
    fn test_configured_query() {
        let mut custom = args();
        custom.network_interface = "ens5".to_string();
        custom.time_range_in_minutes = 10;
        let plugin = NetworkTraffic::new(&custom, Arc::new(NoopDiagnostics)).unwrap();

        assert_eq!(plugin.name(), PLUGIN_NAME);
        assert_eq!(plugin.time_range(), Duration::from_secs(600));
        assert_eq!(
            plugin.query_for("worker-9"),
            build_query("worker-9", "ens5", Duration::from_secs(600))
        );
    }
}

mod score_tests {
    use super::*;

    #[tokio::test]
    async fn test_score_truncates_sample() {
        let source = Arc::new(FakeSource::with(&[("worker-1", Reply::Value(1234.99))]));
        let diagnostics = Arc::new(RecordingDiagnostics::default());
        let plugin = plugin_with(source.clone(), diagnostics.clone());

        let score = plugin
            .score("worker-1", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(score, 1234);
        assert_eq!(
            *diagnostics.scored.lock().unwrap(),
            vec![("worker-1".to_string(), 1234)]
        );
        assert_eq!(
            source.queries.lock().unwrap()[0],
            build_query("worker-1", "eth0", Duration::from_secs(300))
        );
    }

    #[tokio::test]
    async fn test_score_ambiguous_result_is_error() {
        let source = Arc::new(FakeSource::with(&[("worker-1", Reply::Series(2))]));
        let diagnostics = Arc::new(RecordingDiagnostics::default());
        let plugin = plugin_with(source, diagnostics.clone());

        let err = plugin
            .score("worker-1", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ScoringError::Backend {
                source: BackendError::AmbiguousResult { count: 2 },
                ..
            }
        ));
        assert_eq!(err.node(), Some("worker-1"));
        assert_eq!(*diagnostics.failed.lock().unwrap(), vec!["worker-1"]);
    }

    #[tokio::test]
    async fn test_empty_node_name() {
        let plugin = plugin_with(
            Arc::new(FakeSource::default()),
            Arc::new(RecordingDiagnostics::default()),
        );
        let err = plugin
            .score("", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ScoringError::InvalidNode));
    }

    #[tokio::test]
    async fn test_cancelled_score_records_nothing() {
        let source = Arc::new(FakeSource::with(&[("worker-1", Reply::Hang)]));
        let diagnostics = Arc::new(RecordingDiagnostics::default());
        let plugin = plugin_with(source, diagnostics.clone());

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = plugin.score("worker-1", &cancel).await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(diagnostics.scored.lock().unwrap().is_empty());
    }

    #[test]
    fn test_normalize_score_reports_batch() {
        let diagnostics = Arc::new(RecordingDiagnostics::default());
        let plugin = plugin_with(Arc::new(FakeSource::default()), diagnostics.clone());

        let mut scores = vec![NodeScore::new("a", 50), NodeScore::new("b", 50)];
        plugin.normalize_score(&mut scores).unwrap();

        assert_eq!(scores, vec![NodeScore::new("a", 52), NodeScore::new("b", 52)]);
        assert_eq!(diagnostics.normalized.lock().unwrap().len(), 1);
    }
}

mod cycle_tests {
    use super::*;

    #[tokio::test]
    async fn test_cycle_ranks_quiet_node_first() {
        let source = Arc::new(FakeSource::with(&[
            ("quiet", Reply::Value(10.0)),
            ("medium", Reply::Value(100.0)),
            ("busy", Reply::Value(1000.0)),
        ]));
        let plugin: Arc<dyn ScorePlugin> =
            Arc::new(plugin_with(source, Arc::new(RecordingDiagnostics::default())));

        let outcome = run_cycle(
            plugin,
            &nodes(&["busy", "quiet", "medium"]),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.raw_scores, vec![1000, 10, 100]);
        assert_eq!(
            outcome.scores,
            vec![
                NodeScore::new("busy", -900),
                NodeScore::new("quiet", 90),
                NodeScore::new("medium", 0),
            ]
        );
        assert!(outcome.scores[1].score > outcome.scores[0].score);
    }

    #[tokio::test]
    async fn test_failed_node_is_penalised_not_fatal() {
        let source = Arc::new(FakeSource::with(&[
            ("a", Reply::Value(50.0)),
            ("broken", Reply::Series(0)),
            ("b", Reply::Value(50.0)),
        ]));
        let plugin: Arc<dyn ScorePlugin> =
            Arc::new(plugin_with(source, Arc::new(RecordingDiagnostics::default())));

        let outcome = run_cycle(plugin, &nodes(&["a", "broken", "b"]), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].node_name, "broken");
        assert_eq!(
            outcome.host_priorities(),
            vec![
                NodeScore::new("a", 52),
                NodeScore::new("broken", MIN_NODE_SCORE),
                NodeScore::new("b", 52),
            ]
        );
        assert!(!outcome.all_failed());
    }

    #[tokio::test]
    async fn test_all_zero_bandwidth() {
        let source = Arc::new(FakeSource::with(&[
            ("a", Reply::Value(0.0)),
            ("b", Reply::Value(0.4)),
        ]));
        let plugin: Arc<dyn ScorePlugin> =
            Arc::new(plugin_with(source, Arc::new(RecordingDiagnostics::default())));

        let outcome = run_cycle(plugin, &nodes(&["a", "b"]), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            outcome.scores,
            vec![
                NodeScore::new("a", MAX_NODE_SCORE),
                NodeScore::new("b", MAX_NODE_SCORE)
            ]
        );
    }

    #[tokio::test]
    async fn test_cancelled_cycle() {
        let source = Arc::new(FakeSource::with(&[
            ("fast", Reply::Value(10.0)),
            ("slow", Reply::Hang),
        ]));
        let plugin: Arc<dyn ScorePlugin> =
            Arc::new(plugin_with(source, Arc::new(RecordingDiagnostics::default())));

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let outcome = run_cycle(plugin, &nodes(&["fast", "slow"]), &cancel)
            .await
            .unwrap();

        assert_eq!(outcome.scores.len(), 1);
        assert_eq!(outcome.scores[0].node_name, "fast");
        assert_eq!(outcome.failures.len(), 1);
        assert!(outcome.failures[0].error.is_cancelled());
    }

    #[tokio::test]
    async fn test_every_node_failing() {
        let plugin: Arc<dyn ScorePlugin> = Arc::new(plugin_with(
            Arc::new(FakeSource::default()),
            Arc::new(RecordingDiagnostics::default()),
        ));

        let outcome = run_cycle(plugin, &nodes(&["x", "y"]), &CancellationToken::new())
            .await
            .unwrap();

        assert!(outcome.all_failed());
        assert!(outcome.scores.is_empty());
        assert_eq!(outcome.host_priorities().len(), 2);
    }
}

mod end_to_end_tests {
    use super::*;
    use mockito::Matcher;

    fn vector_body(value: u64) -> String {
        format!(
            r#"{{"status":"success","data":{{"resultType":"vector","result":[{{"metric":{{}},"value":[1700000000,"{}"]}}]}}}}"#,
            value
        )
    }

    #[tokio::test]
    async fn test_prometheus_backed_cycle() {
        let mut server = mockito::Server::new_async().await;
        let mut mocks = Vec::new();
        for (node, bytes) in [("node-a", 10u64), ("node-b", 100), ("node-c", 1000)] {
            let query = build_query(node, "eth0", Duration::from_secs(5 * 60));
            mocks.push(
                server
                    .mock("GET", "/api/v1/query")
                    .match_query(Matcher::UrlEncoded("query".into(), query))
                    .with_status(200)
                    .with_header("content-type", "application/json")
                    .with_body(vector_body(bytes))
                    .create_async()
                    .await,
            );
        }

        let plugin: Arc<dyn ScorePlugin> = Arc::new(
            NetworkTraffic::new(&NetworkTrafficArgs::new(server.url()), Arc::new(NoopDiagnostics))
                .unwrap(),
        );

        let outcome = run_cycle(
            plugin,
            &nodes(&["node-a", "node-b", "node-c"]),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        for mock in &mocks {
            mock.assert_async().await;
        }
        let ranking = outcome.host_priorities();
        assert_eq!(ranking.len(), 3);
        assert!(ranking[0].score > ranking[2].score);
        assert_eq!(outcome.raw_scores, vec![10, 100, 1000]);
    }
}
