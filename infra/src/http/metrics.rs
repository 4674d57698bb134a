use std::time::Duration;

use axum::http::StatusCode;
use prometheus::{
    Encoder as _, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

use domain::{DomainError, DomainErrorKind, DomainResult};
use use_case::swift_code::CacheStatus;

/// メトリクス名の接頭辞
const NAMESPACE: &str = "swift_codes";

/// HTTPメトリクス
///
/// アプリケーションごとにレジストリを持ち、`GET /metrics`でPrometheusのテキスト形式で公開する。
pub struct HttpMetrics {
    registry: Registry,
    /// メソッド、ルート、ステータスコードごとのリクエスト数
    requests_total: IntCounterVec,
    /// メソッド、ルートごとの処理時間
    request_duration_seconds: HistogramVec,
    /// 結果（`hit`または`miss`）ごとのキャッシュの参照数
    cache_lookups_total: IntCounterVec,
}

impl HttpMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();
        let requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests").namespace(NAMESPACE),
            &["method", "path", "status"],
        )?;
        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "Time spent handling HTTP requests",
            )
            .namespace(NAMESPACE),
            &["method", "path"],
        )?;
        let cache_lookups_total = IntCounterVec::new(
            Opts::new("cache_lookups_total", "Total number of cache lookups").namespace(NAMESPACE),
            &["result"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration_seconds.clone()))?;
        registry.register(Box::new(cache_lookups_total.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            request_duration_seconds,
            cache_lookups_total,
        })
    }

    /// リクエストを記録する。
    ///
    /// `path`はリクエストのURIではなく、一致したルートのパターンを渡す。
    pub fn observe_request(&self, method: &str, path: &str, status: StatusCode, elapsed: Duration) {
        self.requests_total
            .with_label_values(&[method, path, status.as_str()])
            .inc();
        self.request_duration_seconds
            .with_label_values(&[method, path])
            .observe(elapsed.as_secs_f64());
    }

    /// キャッシュの参照結果を記録する。
    pub fn observe_cache(&self, status: CacheStatus) {
        let result = match status {
            CacheStatus::Hit => "hit",
            CacheStatus::Miss => "miss",
            CacheStatus::Disabled => return,
        };
        self.cache_lookups_total.with_label_values(&[result]).inc();
    }

    /// Prometheusのテキスト形式でメトリクスを出力する。
    pub fn encode(&self) -> DomainResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| DomainError {
                kind: DomainErrorKind::Unexpected,
                messages: vec!["Failed to encode the metrics".into()],
                source: e.into(),
            })?;
        String::from_utf8(buffer).map_err(|e| DomainError {
            kind: DomainErrorKind::Unexpected,
            messages: vec!["Failed to encode the metrics".into()],
            source: e.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_are_counted_by_route_pattern() -> anyhow::Result<()> {
        let metrics = HttpMetrics::new()?;
        for _ in 0..2 {
            metrics.observe_request(
                "GET",
                "/v1/swift-codes/{swift_code}",
                StatusCode::OK,
                Duration::from_millis(5),
            );
        }
        metrics.observe_request(
            "GET",
            "/v1/swift-codes/{swift_code}",
            StatusCode::NOT_FOUND,
            Duration::from_millis(1),
        );

        let text = metrics.encode()?;
        assert!(text.contains(
            r#"swift_codes_http_requests_total{method="GET",path="/v1/swift-codes/{swift_code}",status="200"} 2"#
        ));
        assert!(text.contains(
            r#"swift_codes_http_requests_total{method="GET",path="/v1/swift-codes/{swift_code}",status="404"} 1"#
        ));
        assert!(text.contains("swift_codes_http_request_duration_seconds_count"));

        Ok(())
    }

    #[test]
    fn cache_lookups_are_counted_when_the_cache_is_enabled() -> anyhow::Result<()> {
        let metrics = HttpMetrics::new()?;
        metrics.observe_cache(CacheStatus::Hit);
        metrics.observe_cache(CacheStatus::Miss);
        metrics.observe_cache(CacheStatus::Miss);
        metrics.observe_cache(CacheStatus::Disabled);

        let text = metrics.encode()?;
        assert!(text.contains(r#"swift_codes_cache_lookups_total{result="hit"} 1"#));
        assert!(text.contains(r#"swift_codes_cache_lookups_total{result="miss"} 2"#));

        Ok(())
    }
}
