//! Logging setup utilities for the Hiroba chat relay.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Library crates whose events are enabled at the default level.
const WORKSPACE_CRATES: [&str; 3] = ["hiroba_shared", "hiroba_server", "hiroba_client"];

/// Build the default `EnvFilter` directive string.
///
/// Every workspace crate plus the binary itself gets `default_log_level`.
pub fn default_filter(binary_name: &str, default_log_level: &str) -> String {
    let binary_target = binary_name.replace('-', "_");

    let mut directives: Vec<String> = WORKSPACE_CRATES
        .iter()
        .map(|krate| format!("{}={}", krate, default_log_level))
        .collect();
    if !WORKSPACE_CRATES.contains(&binary_target.as_str()) {
        directives.push(format!("{}={}", binary_target, default_log_level));
    }
    // history records emitted by the log backend
    directives.push(format!("hiroba::history={}", default_log_level));

    directives.join(",")
}

/// Initialize the tracing subscriber with the specified default log level.
///
/// The log level can be overridden using the `RUST_LOG` environment variable.
///
/// # Arguments
///
/// * `binary_name` - The name of the binary (e.g., "hiroba-server", "hiroba-client")
/// * `default_log_level` - The default log level (e.g., "debug", "info", "warn", "error")
///
/// # Examples
///
/// ```no_run
/// use hiroba_shared::logger::setup_logger;
///
/// setup_logger("hiroba-server", "info");
/// ```
pub fn setup_logger(binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(binary_name, default_log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_covers_workspace_crates() {
        // テスト項目: ワークスペースの全クレートにデフォルトレベルが設定される
        // given (前提条件):
        let binary_name = "hiroba-server";

        // when (操作):
        let filter = default_filter(binary_name, "debug");

        // then (期待する結果):
        assert!(filter.contains("hiroba_shared=debug"));
        assert!(filter.contains("hiroba_server=debug"));
        assert!(filter.contains("hiroba_client=debug"));
        assert!(filter.contains("hiroba::history=debug"));
    }

    #[test]
    fn test_default_filter_does_not_duplicate_binary_target() {
        // テスト項目: バイナリ名がライブラリ名と同じ場合、ディレクティブが重複しない
        // given (前提条件):
        let binary_name = "hiroba-client";

        // when (操作):
        let filter = default_filter(binary_name, "info");

        // then (期待する結果):
        assert_eq!(filter.matches("hiroba_client=info").count(), 1);
    }

    #[test]
    fn test_default_filter_adds_foreign_binary_target() {
        // テスト項目: ワークスペース外の名前のバイナリにもディレクティブが追加される
        // given (前提条件):
        let binary_name = "load-probe";

        // when (操作):
        let filter = default_filter(binary_name, "warn");

        // then (期待する結果):
        assert!(filter.contains("load_probe=warn"));
    }
}
