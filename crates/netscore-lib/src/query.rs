//! PromQL construction for node bandwidth measures
//!
//! The query sums the received-bytes counter of one interface on one node
//! over the configured window. Node and interface names are escaped as PromQL
//! string literals before interpolation.

use std::borrow::Cow;
use std::time::Duration;

/// Counter exported by node-exporter for received bytes per interface
pub const RECEIVE_BYTES_METRIC: &str = "node_network_receive_bytes_total";

/// Label carrying the Kubernetes node name on node-exporter series
pub const NODE_LABEL: &str = "kubernetes_node";

/// Label carrying the network interface name
pub const DEVICE_LABEL: &str = "device";

/// Inputs of a single bandwidth query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryParameters<'a> {
    pub node_name: &'a str,
    pub interface_name: &'a str,
    pub window: Duration,
}

impl<'a> QueryParameters<'a> {
    pub fn new(node_name: &'a str, interface_name: &'a str, window: Duration) -> Self {
        Self {
            node_name,
            interface_name,
            window,
        }
    }

    /// Render the PromQL expression for these parameters
    pub fn to_query(&self) -> String {
        build_query(self.node_name, self.interface_name, self.window)
    }
}

/// Build the bandwidth query for a node and interface over `window`
pub fn build_query(node_name: &str, interface_name: &str, window: Duration) -> String {
    format!(
        "sum_over_time({}{{{}=\"{}\",{}=\"{}\"}}[{}])",
        RECEIVE_BYTES_METRIC,
        NODE_LABEL,
        escape_label_value(node_name),
        DEVICE_LABEL,
        escape_label_value(interface_name),
        format_duration(window)
    )
}

/// Format a window using Prometheus duration syntax
pub fn format_duration(window: Duration) -> String {
    let millis = window.as_millis();
    if millis % 60_000 == 0 {
        format!("{}m", millis / 60_000)
    } else if millis % 1_000 == 0 {
        format!("{}s", millis / 1_000)
    } else {
        format!("{}ms", millis)
    }
}

/// Escape a label value for use inside a double-quoted PromQL string
pub fn escape_label_value(value: &str) -> Cow<'_, str> {
    if !value.contains(['\\', '"', '\n']) {
        return Cow::Borrowed(value);
    }

    let mut escaped = String::with_capacity(value.len() + 4);
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}
